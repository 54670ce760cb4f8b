mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use log::error;

/// filelist: load, resolve and rebuild list.xml plugin manifests
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Log provider activity at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the provider looks for plugins
#[derive(Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Plugin directory; may be repeated, searched in the given order
    #[arg(short, long = "path", value_name = "DIR")]
    pub paths: Vec<PathBuf>,

    /// Provider configuration file (.json, .toml, .yaml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a manifest and print its entries
    Validate {
        /// The manifest file to read
        manifest: PathBuf,
    },
    /// Find the library with the given identity
    Resolve {
        /// Strong identity of the library
        name: String,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Load every listed plugin and print the registry
    Load {
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Load every listed plugin, then write manifests from what loaded
    Rebuild {
        #[command(flatten)]
        search: SearchArgs,
    },
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let default_filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match args.command {
        Commands::Validate { manifest } => cli::validate(&manifest),
        Commands::Resolve { name, search } => cli::resolve(&name, &search),
        Commands::Load { search } => cli::load(&search),
        Commands::Rebuild { search } => cli::rebuild(&search),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
