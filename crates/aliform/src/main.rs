mod commands;
mod engine;
mod project;

use clap::{Parser, Subcommand};
use project::Project;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aliform")]
#[command(about = "Declarative Alibaba Cloud infrastructure from KDL files", long_about = None)]
struct Cli {
    /// Declaration file (default: infra.kdl found by searching the usual places)
    #[arg(short = 'f', long = "file", global = true)]
    file: Option<PathBuf>,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the declarations without calling the cloud
    Validate,
    /// Show what apply would change
    Plan,
    /// Create, update or delete resources to match the declarations
    Apply {
        /// Apply without asking for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Delete managed resources
    Destroy {
        /// Only this resource (type.name)
        address: Option<String>,
        /// Destroy without asking for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Bring an existing resource under management
    Import {
        /// Resource address (type.name)
        address: String,
        /// Remote id, e.g. vpc-bp1...
        id: String,
    },
    /// Re-read every managed resource into state
    Refresh,
    /// Inspect state
    #[command(subcommand)]
    State(StateCommands),
    /// Read one data source and print the result as JSON
    Data {
        /// Data source address (data.type.name)
        address: String,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum StateCommands {
    /// List managed resources
    List,
    /// Show one resource as JSON
    Show {
        /// Resource address
        address: String,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Version needs no declaration file
    if matches!(cli.command, Commands::Version) {
        println!("aliform {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project = Project::load(cli.file)?;

    match cli.command {
        Commands::Validate => commands::validate::handle(&project)?,
        Commands::Plan => commands::plan::handle(&project).await?,
        Commands::Apply { yes } => commands::apply::handle(&project, yes).await?,
        Commands::Destroy { address, yes } => {
            commands::destroy::handle(&project, address.as_deref(), yes).await?
        }
        Commands::Import { address, id } => {
            commands::import::handle(&project, &address, &id).await?
        }
        Commands::Refresh => commands::refresh::handle(&project).await?,
        Commands::State(StateCommands::List) => commands::state::list(&project).await?,
        Commands::State(StateCommands::Show { address }) => {
            commands::state::show(&project, &address).await?
        }
        Commands::Data { address } => commands::data::handle(&project, &address).await?,
        Commands::Version => unreachable!("Version is handled before loading declarations"),
    }

    Ok(())
}
