use super::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let manager = ctx.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let Some(current) = state.get(id).cloned() else {
        anyhow::bail!("{} is not managed by actionflow", id);
    };

    println!("{} {}", "Deleting".blue(), id.cyan());
    let reconciler = ctx.kube_reconciler().await?;
    reconciler.delete(&current).await?;

    state.remove(id);
    manager.save(&state).await?;
    lock.release().await?;

    println!("{}", "✓ Deleted".green().bold());
    Ok(())
}
