//! pkgflags CLI
//!
//! Edits the per-package flag files of a Gentoo-style configuration root
//! in place, keeping comments and formatting intact.

mod metadata;
mod repository;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::{env_vars, parse_actions, paths, FlagCache, PackageFiles, Settings};
use metadata::RepositoryMetadata;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const DIRECTIVES: &str = "\
Directives:
  +flag      explicitly enable flag
  -flag      explicitly disable flag
  %flag      reset flag to the default state (remove it completely)
  %          reset all package flags
  ?flag      print the status of a particular flag
  ?          print package flags

A flag may be prefixed with its domain to skip the lookup:
  use::  USE flags (package.use)
  kw::   keywords (package.accept_keywords)
  lic::  licenses (package.license)
  env::  environment files (package.env)

Examples:
  pkgflags dev-libs/foo +ssl -doc
  pkgflags app-misc/bar +kw::~amd64 +lic::EULA
  pkgflags foo %";

#[derive(Parser)]
#[command(
    name = "pkgflags",
    about = "Edit package.use, package.accept_keywords, package.license and package.env",
    version,
    author,
    after_help = DIRECTIVES
)]
struct Cli {
    /// Settings file path
    #[arg(short, long, env = env_vars::CONFIG)]
    config: Option<PathBuf>,

    /// Configuration root holding the package.* files
    #[arg(long, env = env_vars::PORTAGE_CONFIGROOT)]
    config_root: Option<PathBuf>,

    /// Ebuild repository used to look up flags and keywords
    #[arg(long, env = env_vars::REPO)]
    repo: Option<PathBuf>,

    /// Apply the directives but do not write any file
    #[arg(short, long)]
    pretend: bool,

    /// Move package.keywords entries into package.accept_keywords
    #[arg(long)]
    migrate: bool,

    /// Sort entries and flags in every file
    #[arg(long)]
    sort: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet output
    #[arg(short, long)]
    quiet: bool,

    /// Packages, each followed by the directives to apply to it
    #[arg(
        value_name = "PACKAGE|DIRECTIVE",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load_or_default(&paths::settings())
            .context("Failed to load default settings")?,
    };

    if let Some(root) = &cli.config_root {
        settings.config_root = root.clone();
    }
    Ok(settings)
}

fn run(cli: Cli) -> Result<()> {
    if cli.args.is_empty() && !cli.migrate && !cli.sort {
        bail!("No packages or directives given, see --help");
    }

    let settings = load_settings(&cli)?;
    debug!("Using configuration root {}", settings.config_root.display());

    let repositories = repository::detect_repositories(cli.repo.as_deref(), &settings.repositories)?;
    let metadata = RepositoryMetadata::new(repositories);
    debug!("Reading metadata from {:?}", metadata.repositories());

    let accept_keywords = settings.effective_accept_keywords()?;
    let mut files = PackageFiles::new(settings.config_root.clone(), &accept_keywords)
        .with_default_file_name(&settings.default_file_name);

    // resolve everything before touching any file
    let mut cache = FlagCache::new(&metadata);
    let sets = parse_actions(&cli.args, &mut cache, &metadata)?;

    if cli.migrate {
        files.migrate().context("Failed to migrate package.keywords")?;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for set in &sets {
        set.apply(&mut files, &mut out)?;
    }
    out.flush()?;

    if cli.sort {
        files.sort()?;
    }

    if !files.is_modified() {
        debug!("Nothing to write");
    } else if cli.pretend {
        info!("Pretend mode, not writing any changes");
    } else {
        files.write().context("Failed to write package files")?;
    }
    Ok(())
}
