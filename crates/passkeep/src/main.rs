//! passkeep - Passphrases for protected files, kept in the OS vault
//!
//! Commands:
//! - store <PATH>: Save the passphrase for a file (prompts, or --stdin)
//! - read <PATH>: Print the stored passphrase
//! - remove <PATH>: Forget the passphrase
//! - list: List files that have a stored passphrase
//! - info: Show namespace, backend and capabilities
//! - init: Write a default config file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use passkeep::Vault;
use passkeep_core::{BackendKind, Config, Paths};
use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;
use std::path::{Component, Path, PathBuf};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "passkeep")]
#[command(about = "Store passphrases for key files in the OS credential vault")]
#[command(version)]
#[command(after_help = r#"KEYS:
    Entries are keyed by absolute file path. Relative paths, `.` and `..`
    are resolved and existing directories are followed to their canonical
    form, so ./id_ed25519 and ~/.ssh/id_ed25519 refer to the same entry
    whether or not the file still exists.

CONFIGURATION:
    ~/.config/passkeep/config.json     namespace, canonicalize_paths
    PASSKEEP_NAMESPACE                 overrides the file
    RUST_LOG=passkeep=debug            trace every vault call"#)]
struct Cli {
    /// Vault namespace to use instead of the configured one
    #[arg(long, global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a passphrase (prompts securely unless --stdin is given)
    Store {
        /// File the passphrase unlocks
        path: String,
        /// Read one line from stdin instead of prompting
        #[arg(long)]
        stdin: bool,
    },

    /// Print a stored passphrase
    Read {
        /// Don't print trailing newline (useful for piping)
        #[arg(short = 'n')]
        no_newline: bool,
        /// File the passphrase unlocks
        path: String,
    },

    /// Remove a stored passphrase (succeeds if none is stored)
    Remove {
        /// File the passphrase unlocks
        path: String,
    },

    /// List files with a stored passphrase
    List {
        /// Stop after this many entries
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the active namespace and backend
    Info,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(namespace) = cli.namespace {
        if namespace.trim().is_empty() {
            bail!("Namespace cannot be empty");
        }
        config.namespace = namespace;
    }
    let vault = || open_vault(&config);

    match cli.command {
        Commands::Store { path, stdin } => cmd_store(&vault()?, &config, &path, stdin),
        Commands::Read { no_newline, path } => cmd_read(&vault()?, &config, &path, no_newline),
        Commands::Remove { path } => cmd_remove(&vault()?, &config, &path),
        Commands::List { limit, json } => cmd_list(&vault()?, limit, json),
        Commands::Info => cmd_info(&vault()?),
        Commands::Init { force } => cmd_init(&Paths::new().config_file(), force),
    }
}

/// Open the configured vault. Each run is a separate process, so only
/// stores that outlive it make sense here.
fn open_vault(config: &Config) -> Result<Vault> {
    if config.backend == BackendKind::Memory {
        bail!(
            "The memory backend forgets everything when the process exits; \
             the passkeep command needs the keyring backend"
        );
    }
    Ok(Vault::from_config(config)?)
}

/// Turn a path argument into the identifier it is stored under
fn resource_id(path: &str, canonicalize: bool) -> Result<String> {
    if path.is_empty() {
        bail!("Path cannot be empty");
    }
    if !canonicalize {
        return Ok(path.to_string());
    }

    let normalized = normalize_path(Path::new(path))
        .with_context(|| format!("Failed to resolve path: {}", path))?;
    Ok(normalized.to_string_lossy().into_owned())
}

/// Absolute, `.`/`..`-free form of `path` that does not depend on the file
/// itself existing. The deepest existing directory above it is resolved
/// through the filesystem; the remaining components are appended as given.
fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }

    let Some(file_name) = cleaned.file_name().map(OsString::from) else {
        return Ok(cleaned);
    };

    let mut base = cleaned.clone();
    base.pop();
    let mut missing = Vec::new();
    while !base.exists() {
        let Some(name) = base.file_name().map(OsString::from) else {
            break;
        };
        missing.push(name);
        base.pop();
    }

    let mut resolved = if base.exists() {
        std::fs::canonicalize(&base)?
    } else {
        base
    };
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    resolved.push(file_name);
    Ok(resolved)
}

/// Strip one trailing line ending
fn trim_line_ending(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

fn read_passphrase(stdin: bool) -> Result<Zeroizing<String>> {
    if stdin {
        let mut line = Zeroizing::new(String::new());
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read passphrase from stdin")?;
        trim_line_ending(&mut line);
        return Ok(line);
    }

    let first = Zeroizing::new(
        rpassword::prompt_password("Enter passphrase: ").context("Failed to read passphrase")?,
    );
    let second = Zeroizing::new(
        rpassword::prompt_password("Confirm passphrase: ").context("Failed to read passphrase")?,
    );
    if *first != *second {
        bail!("Passphrases do not match");
    }
    Ok(first)
}

/// Store a passphrase
fn cmd_store(vault: &Vault, config: &Config, path: &str, stdin: bool) -> Result<()> {
    let resource = resource_id(path, config.canonicalize_paths)?;
    let passphrase = read_passphrase(stdin)?;

    vault.store(&resource, passphrase.as_bytes())?;

    println!("success: Passphrase stored for {}", resource);
    Ok(())
}

/// Print a passphrase
fn cmd_read(vault: &Vault, config: &Config, path: &str, no_newline: bool) -> Result<()> {
    let resource = resource_id(path, config.canonicalize_paths)?;

    let Some(passphrase) = vault.read(&resource)? else {
        bail!("No passphrase stored for {}", resource);
    };

    let mut out = io::stdout().lock();
    out.write_all(passphrase.as_bytes())?;
    if !no_newline {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Remove a passphrase
fn cmd_remove(vault: &Vault, config: &Config, path: &str) -> Result<()> {
    let resource = resource_id(path, config.canonicalize_paths)?;
    vault.remove(&resource)?;
    println!("success: Passphrase removed for {}", resource);
    Ok(())
}

/// List stored entries
fn cmd_list(vault: &Vault, limit: Option<usize>, json: bool) -> Result<()> {
    if limit == Some(0) {
        if json {
            println!("[]");
        }
        return Ok(());
    }

    let mut names = Vec::new();
    let mut seen = 0;
    let summary = vault.enumerate(|identity| {
        seen += 1;
        if json {
            names.push(identity.resource().to_string());
        } else {
            println!("  {}", identity.resource());
        }
        match limit {
            Some(max) if seen >= max => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else if summary.visited == 0 {
        println!("No passphrases stored in {}", vault.namespace());
    }

    if summary.skipped > 0 {
        eprintln!(
            "warning: {} unreadable entries skipped (run with RUST_LOG=passkeep=warn for details)",
            summary.skipped
        );
    }

    Ok(())
}

/// Write a default config file
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("warning: Config already exists: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    Config::default()
        .save_to(path)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    println!("success: Config written to {}", path.display());
    Ok(())
}

/// Show namespace and backend
fn cmd_info(vault: &Vault) -> Result<()> {
    let paths = Paths::new();
    println!("namespace:   {}", vault.namespace());
    println!("backend:     {}", vault.backend_name());
    println!(
        "enumeration: {}",
        if vault.can_enumerate() {
            "supported"
        } else {
            "not supported"
        }
    );
    println!("config:      {}", paths.config_file().display());
    Ok(())
}
