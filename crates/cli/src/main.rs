mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::{OutputFormat, print_error};

/// natpack - pick, extract and load the host's build of a native library
#[derive(Parser)]
#[command(name = "natpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short = 'o', long, value_enum, default_value = "text", global = true)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show the detected platform and extraction settings
  Info,

  /// Print the resource path of a library for one platform
  Locate {
    /// Base library name
    library: String,

    /// Architecture alias (defaults to the host)
    #[arg(long)]
    arch: Option<String>,

    /// Operating system alias (defaults to the host)
    #[arg(long)]
    os: Option<String>,
  },

  /// List the resource path of a library for every supported platform
  Matrix {
    /// Base library name
    library: String,
  },

  /// Report which platform builds a package contains
  Check {
    /// Base library name
    library: String,

    /// Package directory or zip archive
    #[arg(short, long)]
    package: PathBuf,
  },

  /// Extract and load the host's build of a library
  Load {
    /// Base library name
    library: String,

    /// Package directory or zip archive
    #[arg(short, long)]
    package: PathBuf,

    /// Load this resource path instead of the host artifact
    #[arg(long)]
    resource: Option<String>,
  },
}

fn main() {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run(cli) {
    print_error(&format!("{e:#}"));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  match cli.command {
    Commands::Info => cmd::cmd_info(cli.output),
    Commands::Locate { library, arch, os } => cmd::cmd_locate(&library, arch.as_deref(), os.as_deref(), cli.output),
    Commands::Matrix { library } => cmd::cmd_matrix(&library, cli.output),
    Commands::Check { library, package } => cmd::cmd_check(&library, &package, cli.output),
    Commands::Load {
      library,
      package,
      resource,
    } => cmd::cmd_load(&library, &package, resource.as_deref(), cli.output),
  }
}
