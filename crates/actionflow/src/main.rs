mod commands;

use clap::{Parser, Subcommand};
use commands::Context;
use commands::render::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "actionflow", version)]
#[command(about = "Tekton actions with credential setup built in", long_about = None)]
struct Cli {
    /// Provider config file (defaults to the ACTIONFLOW_CONFIG / actionflow.yaml search)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding .actionflow/state.json
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Cluster identifier written into every object's labels
    #[arg(long, global = true, env = "CLUSTER_ID")]
    cluster_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an action file and show the names it maps to
    Validate {
        /// Action file (YAML or JSON)
        file: PathBuf,
    },
    /// Print the StepAction and Task an action file produces
    Render {
        /// Action file (YAML or JSON)
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },
    /// Create the StepAction and Task for an action
    Create {
        /// Action file (YAML or JSON)
        file: PathBuf,
    },
    /// Refresh a managed action from the cluster
    #[command(alias = "read")]
    Status {
        /// Action ID (<namespace>/<task-name>)
        id: String,
    },
    /// Replace the StepAction and Task of a managed action
    Update {
        /// Action file (YAML or JSON)
        file: PathBuf,
        /// Action ID, when the action's names changed since it was created
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete the Task and StepAction of a managed action
    Delete {
        /// Action ID (<namespace>/<task-name>)
        id: String,
    },
    /// Adopt an existing Task
    Import {
        /// Action ID (<namespace>/<task-name>)
        id: String,
        /// Replace the state of an action that is already managed
        #[arg(long)]
        force: bool,
    },
    /// List managed actions
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries rendered manifests, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context {
        config_path: cli.config,
        project_dir: cli.project_dir,
        cluster_id: cli.cluster_id,
    };

    match cli.command {
        Commands::Validate { file } => commands::validate::handle(&file),
        Commands::Render { file, output } => commands::render::handle(&ctx, &file, output),
        Commands::Create { file } => commands::create::handle(&ctx, &file).await,
        Commands::Status { id } => commands::status::handle(&ctx, &id).await,
        Commands::Update { file, id } => commands::update::handle(&ctx, &file, id).await,
        Commands::Delete { id } => commands::delete::handle(&ctx, &id).await,
        Commands::Import { id, force } => commands::import::handle(&ctx, &id, force).await,
        Commands::List => commands::list::handle(&ctx).await,
    }
}
