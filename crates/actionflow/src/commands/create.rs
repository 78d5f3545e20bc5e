use super::Context;
use colored::Colorize;
use std::path::Path;

pub async fn handle(ctx: &Context, file: &Path) -> anyhow::Result<()> {
    let spec = super::load_action(file)?;
    let id = super::action_id(&spec);

    let manager = ctx.state_manager();
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    if state.get(&id).is_some() {
        anyhow::bail!("{} is already managed; use `actionflow update` instead", id);
    }

    println!("{} {}", "Creating".blue(), id.cyan());
    let reconciler = ctx.kube_reconciler().await?;
    let action = reconciler.create(&spec).await?;

    println!("{}", "✓ Created".green().bold());
    super::print_state(&action);

    state.upsert(action);
    manager.save(&state).await?;
    lock.release().await?;
    Ok(())
}
