use super::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context) -> anyhow::Result<()> {
    let state = ctx.state_manager().load().await?;

    if state.actions.is_empty() {
        println!("{}", "No managed actions".dimmed());
        return Ok(());
    }

    println!("{}", "Managed actions:".bold());
    for action in state.iter() {
        println!(
            "  {} {} ({} / {}, {})",
            "●".green(),
            action.id.cyan(),
            action.display_name,
            action.resource_name,
            action.environment_name
        );
    }
    Ok(())
}
