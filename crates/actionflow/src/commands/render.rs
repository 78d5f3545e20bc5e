use super::Context;
use actionflow_core::TektonObject;
use actionflow_store::MemoryStore;
use clap::ValueEnum;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Print the StepAction and Task an action file produces
pub fn handle(ctx: &Context, file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let spec = super::load_action(file)?;
    let reconciler = ctx.reconciler(Arc::new(MemoryStore::new()))?;
    let planned = reconciler.plan(&spec)?;

    let manifests = [
        planned.step_action.to_manifest()?.into_value(),
        planned.task.to_manifest()?.into_value(),
    ];

    match format {
        OutputFormat::Yaml => {
            for manifest in &manifests {
                print!("---\n{}", serde_yaml::to_string(manifest)?);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&manifests)?);
        }
    }
    Ok(())
}
