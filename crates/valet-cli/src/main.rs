//! Valet CLI - declarative Kubernetes environments from YAML recipes

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "valet")]
#[command(author = "Valet Contributors")]
#[command(version)]
#[command(about = "Stand up and tear down Kubernetes environments from YAML recipes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Valet config file
    #[arg(short = 'f', long = "file", default_value = "valet.yaml")]
    pub file: PathBuf,

    /// Set values on command line (key=value)
    #[arg(long = "set")]
    pub set: Vec<String>,

    /// Activate flags, comma separated or repeated
    #[arg(long = "flags", value_delimiter = ',')]
    pub flags: Vec<String>,

    /// Add or replace a named registry (name=path)
    #[arg(long = "registry")]
    pub registries: Vec<String>,

    /// Global config file
    #[arg(long, env = "VALET_GLOBAL_CONFIG")]
    pub global_config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update everything the config describes
    Ensure(RunArgs),

    /// Remove everything the config describes, in reverse order
    Teardown(RunArgs),

    /// Print the documents ensure would apply, without applying them
    Render {
        #[command(flatten)]
        args: RunArgs,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Ensure(args) => commands::ensure::run(&args).await,
        Commands::Teardown(args) => commands::teardown::run(&args).await,
        Commands::Render { args, output } => commands::render::run(&args, output.as_deref()).await,
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
