mod backend;
mod config;
mod distro;
mod error;
mod exec;
mod manager;
mod privilege;
mod resolver;
mod transaction;
mod ui;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::distro::Family;
use crate::error::Error;
use crate::manager::PackageManager;
use crate::transaction::Transaction;
use crate::ui::prelude::*;

/// unipkg main parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit machine-readable JSON events
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a package
    Install {
        /// Package name
        package: String,
        /// Exact version to pin (family-specific qualifier syntax)
        #[arg(long)]
        version: Option<String>,
    },
    /// Remove an installed package
    Remove { package: String },
    /// Refresh the package index
    Update,
    /// Upgrade all installed packages
    Upgrade,
    /// Search the package database
    Search { term: String },
    /// List installed packages
    List,
    /// Show the direct dependencies of a package
    Deps { package: String },
    /// Install every package listed in a YAML or JSON config
    Batch {
        /// Path to the config file
        file: PathBuf,
    },
    /// Apply installs and removes as one transaction with rollback
    Tx {
        /// Package to install, NAME or NAME=VERSION (repeatable)
        #[arg(long = "install", value_name = "PKG")]
        installs: Vec<String>,
        /// Package to remove (repeatable)
        #[arg(long = "remove", value_name = "PKG")]
        removes: Vec<String>,
    },
    /// Show the detected distribution family and backend
    Detect,
}

fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, !cli.json);
    ui::set_debug_mode(cli.debug);

    if let Err(err) = run(&cli) {
        emit(Level::Error, "unipkg.error", &format!("{err}"), None);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if matches!(cli.command, Commands::Detect) {
        return handle_detect();
    }

    let pm = PackageManager::new()?;

    match &cli.command {
        Commands::Install { package, version } => {
            pm.install(package, version.as_deref())?;
            emit(
                Level::Success,
                "install.done",
                &format!("Installed {package}"),
                None,
            );
        }
        Commands::Remove { package } => {
            pm.remove(package)?;
            emit(
                Level::Success,
                "remove.done",
                &format!("Removed {package}"),
                None,
            );
        }
        Commands::Update => {
            pm.update()?;
            emit(Level::Success, "update.done", "Update completed", None);
        }
        Commands::Upgrade => {
            pm.upgrade()?;
            emit(Level::Success, "upgrade.done", "Upgrade completed", None);
        }
        Commands::Search { term } => handle_search(&pm, term)?,
        Commands::List => handle_list(&pm),
        Commands::Deps { package } => handle_deps(&pm, package)?,
        Commands::Batch { file } => {
            let count = pm.batch_install(file)?;
            emit(
                Level::Success,
                "batch.done",
                &format!("Installed {count} package(s) from {}", file.display()),
                None,
            );
        }
        Commands::Tx { installs, removes } => handle_tx(&pm, installs, removes)?,
        Commands::Detect => unreachable!("handled above"),
    }

    Ok(())
}

fn handle_detect() -> Result<()> {
    let family = Family::detect();
    emit(
        Level::Info,
        "detect.family",
        &format!("Distribution family: {family}"),
        Some(json!({ "family": family.name() })),
    );
    match PackageManager::for_family(family) {
        Ok(pm) => {
            let backend = pm.backend();
            let availability = if backend.is_available() {
                "available"
            } else {
                "not in PATH"
            };
            emit(
                Level::Info,
                "detect.backend",
                &format!("Backend: {backend} ({availability})"),
                Some(json!({
                    "backend": backend.display_name(),
                    "available": backend.is_available(),
                })),
            );
        }
        Err(err) => emit(Level::Warn, "detect.backend", &err.to_string(), None),
    }
    Ok(())
}

fn handle_search(pm: &PackageManager, term: &str) -> Result<()> {
    let capture = pm.search(term);
    if !capture.success() {
        ui::debug(
            "search.query",
            &format!("search failed: {}", capture.failure_reason()),
        );
    }
    let text = capture.stdout.trim_end();
    if text.is_empty() {
        return Err(Error::PackageNotFound(term.to_string()).into());
    }
    match get_output_format() {
        OutputFormat::Json => emit(
            Level::Info,
            "search.results",
            &format!("Results for {term}"),
            Some(json!({ "term": term, "output": text })),
        ),
        OutputFormat::Text => println!("{text}"),
    }
    Ok(())
}

fn handle_list(pm: &PackageManager) {
    let capture = pm.list_installed();
    if !capture.success() {
        ui::debug(
            "list.query",
            &format!("listing failed: {}", capture.failure_reason()),
        );
    }
    let text = capture.stdout.trim_end();
    match get_output_format() {
        OutputFormat::Json => emit(
            Level::Info,
            "list.results",
            "Installed packages",
            Some(json!({ "output": text })),
        ),
        OutputFormat::Text => {
            if !text.is_empty() {
                println!("{text}");
            }
        }
    }
}

fn handle_deps(pm: &PackageManager, package: &str) -> Result<()> {
    let resolution = pm.resolve(package);
    if resolution.dependencies.is_empty() && !resolution.query.success() {
        return Err(Error::Dependency {
            package: package.to_string(),
            reason: resolution.query.failure_reason(),
        }
        .into());
    }
    match get_output_format() {
        OutputFormat::Json => emit(
            Level::Info,
            "deps.resolved",
            &format!("{} dependencies for {package}", resolution.dependencies.len()),
            Some(json!({ "package": package, "dependencies": resolution.dependencies })),
        ),
        OutputFormat::Text => {
            if resolution.dependencies.is_empty() {
                emit(
                    Level::Info,
                    "deps.none",
                    &format!("No dependencies reported for {package}"),
                    None,
                );
            } else {
                for dep in &resolution.dependencies {
                    println!("{dep}");
                }
            }
        }
    }
    Ok(())
}

fn handle_tx(pm: &PackageManager, installs: &[String], removes: &[String]) -> Result<()> {
    let mut tx = Transaction::new(pm);
    for item in installs {
        match item.split_once('=') {
            Some((name, version)) => tx.add_install(name, Some(version)),
            None => tx.add_install(item, None),
        }
    }
    for name in removes {
        tx.add_remove(name);
    }
    if tx.is_empty() {
        emit(
            Level::Warn,
            "tx.empty",
            "Nothing to do: no --install or --remove given",
            None,
        );
        return Ok(());
    }
    let applied = tx.commit()?;
    emit(
        Level::Success,
        "tx.done",
        &format!("Transaction committed ({applied} action(s))"),
        None,
    );
    Ok(())
}
