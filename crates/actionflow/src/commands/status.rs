use super::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let manager = ctx.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let Some(current) = state.get(id).cloned() else {
        anyhow::bail!("{} is not managed by actionflow", id);
    };

    let reconciler = ctx.kube_reconciler().await?;
    match reconciler.read(&current).await? {
        Some(refreshed) => {
            println!("{} {}", "●".green(), "present".green().bold());
            super::print_state(&refreshed);
            state.upsert(refreshed);
        }
        None => {
            println!(
                "{} {} (removed from state)",
                "○".yellow(),
                "absent".yellow().bold()
            );
            state.remove(id);
        }
    }

    manager.save(&state).await?;
    lock.release().await?;
    Ok(())
}
