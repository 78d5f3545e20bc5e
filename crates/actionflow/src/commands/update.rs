use super::Context;
use colored::Colorize;
use std::path::Path;

pub async fn handle(ctx: &Context, file: &Path, id: Option<String>) -> anyhow::Result<()> {
    let spec = super::load_action(file)?;
    let id = id.unwrap_or_else(|| super::action_id(&spec));

    let manager = ctx.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let Some(current) = state.get(&id).cloned() else {
        anyhow::bail!(
            "{} is not managed by actionflow; pass --id if the action names changed",
            id
        );
    };

    println!("{} {}", "Updating".blue(), id.cyan());
    let reconciler = ctx.kube_reconciler().await?;
    let updated = reconciler.update(&current, &spec).await?;

    println!("{}", "✓ Updated".green().bold());
    super::print_state(&updated);

    state.upsert(updated);
    manager.save(&state).await?;
    lock.release().await?;
    Ok(())
}
