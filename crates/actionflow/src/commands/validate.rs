use actionflow_core::{generate_identity, validate_spec};
use colored::Colorize;
use std::path::Path;

pub fn handle(file: &Path) -> anyhow::Result<()> {
    println!("{}", "Validating action...".blue());

    let spec = super::load_action(file)?;
    if let Err(e) = validate_spec(&spec) {
        eprintln!();
        eprintln!("{}", "✗ Invalid action".red().bold());
        eprintln!("  {}", e);
        std::process::exit(1);
    }

    let identity = generate_identity(
        &spec.resource_name,
        &spec.environment_name,
        &spec.display_name,
    );

    println!("{}", "✓ Action is valid".green().bold());
    println!();
    println!("  Namespace:  {}", spec.namespace().cyan());
    println!("  Task:       {}", identity.task_id);
    println!("  StepAction: {}", identity.credential_setup_id);
    println!("  Steps:      {}", spec.steps.len());
    for step in &spec.steps {
        println!("    - {} ({})", step.name.cyan(), step.image);
    }
    if !spec.params.is_empty() {
        println!("  Params:     {}", spec.params.len());
        for param in &spec.params {
            println!("    - {} ({})", param.name.cyan(), param.param_type);
        }
    }
    Ok(())
}
