//! Standalone kickstart split-and-distribute tool.
//!
//! Debug entry point for the kickstart distribution machinery: splits the
//! given kickstart document, hands the fragments to the built-in service
//! modules in configured order, and prints what came out - module errors in
//! original-document coordinates plus the unprocessed remainder as a JSON
//! report.
//!
//! ```bash
//! # split and distribute ks.cfg from the working directory
//! installer-boss
//!
//! # or an explicit document
//! installer-boss lab.ks.cfg
//! ```
//!
//! An `installer-boss.toml` in the working directory adjusts the split
//! options and the enabled-module list. A document that cannot be split
//! (unknown section, missing include) is reported with its file and line
//! and the process exits non-zero.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use installer_boss::config::{load_config_or_default, DEFAULT_CONFIG_FILE};
use installer_boss::modules::registry_from_names;
use installer_boss::KickstartManager;

#[derive(Parser)]
#[command(name = "installer-boss")]
#[command(version, about = "Split a kickstart document and distribute it to service modules")]
struct Cli {
    /// Kickstart document to split.
    #[arg(default_value = "ks.cfg")]
    kickstart: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every module accepted its fragment.
fn run(cli: &Cli) -> Result<bool> {
    let config = load_config_or_default(Path::new(DEFAULT_CONFIG_FILE))?;

    let mut manager = KickstartManager::new(config.split.clone());
    manager
        .split(&cli.kickstart)
        .with_context(|| format!("splitting kickstart '{}'", cli.kickstart.display()))?;

    let mut registry = registry_from_names(&config.modules)?;
    let errors = manager.distribute(&mut registry)?.to_vec();
    for error in &errors {
        eprintln!("{error}");
    }

    let report = manager.report().expect("distribution implies a report");
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(errors.is_empty())
}
