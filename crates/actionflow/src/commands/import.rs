use super::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context, id: &str, force: bool) -> anyhow::Result<()> {
    let manager = ctx.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    if let Some(existing) = state.get(id) {
        if !force {
            anyhow::bail!(
                "{} is already managed as {}; pass --force to replace its state",
                id,
                existing.display_name
            );
        }
        println!(
            "{} {}",
            "⚠".yellow(),
            format!("Replacing the existing state of {}", id).yellow()
        );
    }

    println!("{} {}", "Importing".blue(), id.cyan());
    let reconciler = ctx.kube_reconciler().await?;
    let outcome = reconciler.import(id).await?;

    println!("{}", "✓ Imported".green().bold());
    super::print_state(&outcome.state);
    println!();
    println!("{} {}", "⚠".yellow(), outcome.warning.message.yellow());

    state.upsert(outcome.state);
    manager.save(&state).await?;
    lock.release().await?;
    Ok(())
}
