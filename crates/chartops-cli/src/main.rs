mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "chartops",
    about = "Upgrade and roll back Helm releases through a per-action tiller backend",
    version,
    propagate_version = true
)]
struct Cli {
    /// Catalog root (default: auto-detect from chartops.yaml or catalog/)
    #[arg(long, global = true, env = "CHARTOPS_ROOT")]
    root: Option<PathBuf>,

    /// Bearer token used to reach the cluster
    #[arg(long, global = true, env = "CHARTOPS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade an app's release to a catalog template version
    Upgrade {
        /// App id, e.g. p-xyz:my-app
        app: String,
        /// catalog://?catalog=<c>&template=<t>&version=<v>
        #[arg(long)]
        external_id: String,
    },

    /// Roll an app's release back to an earlier revision
    Rollback {
        /// App id
        app: String,
        #[arg(long)]
        revision: String,
    },

    /// Show one app
    Show { app: String },

    /// List apps in the catalog
    List,

    /// Inspect or validate chartops.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Serve the HTTP API
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let token = cli.token.as_deref();

    let result = match cli.command {
        Commands::Upgrade { app, external_id } => {
            cmd::action::upgrade(&root, &app, &external_id, token, cli.json)
        }
        Commands::Rollback { app, revision } => {
            cmd::action::rollback(&root, &app, &revision, token, cli.json)
        }
        Commands::Show { app } => cmd::app::show(&root, &app, cli.json),
        Commands::List => cmd::app::list(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
