use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nsforest_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use nsforest_core::telemetry;
use nsforest_core::{Config, ErrorKind, NamespaceError, NamespaceStore};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

mod request;

/// Exit codes for the four store error kinds
const EXIT_INVALID_VALUE: u8 = 47;
const EXIT_DOES_NOT_EXIST: u8 = 48;
const EXIT_ALREADY_EXISTS: u8 = 49;
const EXIT_STORAGE_ERROR: u8 = 40;

#[derive(Parser, Debug)]
#[command(name = "nsforest")]
#[command(author, version, about = "Hierarchical namespace store with inherited variables", long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the namespaces data file
    #[arg(long)]
    data_dir: Option<String>,

    /// Name of the namespaces data file
    #[arg(long)]
    file_name: Option<String>,

    /// Directory for timestamped copies of the data file
    #[arg(long)]
    archive_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a namespace
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Parent namespace; omit or pass "none" for a root
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Change a namespace's description or parent
    Modify {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// New parent namespace, or "none" to make it a root
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Delete a namespace or some of its variables
    Delete {
        name: String,
        /// Variable key to delete (repeatable)
        #[arg(long = "var", value_name = "KEY", conflicts_with = "confirm")]
        vars: Vec<String>,
        /// Delete the whole namespace; its children move to its parent
        #[arg(long)]
        confirm: bool,
    },
    /// List namespaces, a namespace's variables, or the store settings
    List {
        #[arg(short, long, conflicts_with = "settings")]
        namespace: Option<String>,
        /// Only the namespace's own variables
        #[arg(long, requires = "namespace")]
        only: bool,
        #[arg(long)]
        settings: bool,
    },
    /// Describe a namespace, or its whole subtree with --tree
    Query {
        name: String,
        #[arg(long)]
        tree: bool,
    },
    /// Set variables on a namespace
    Set {
        name: String,
        /// KEY=VALUE assignment (repeatable)
        #[arg(long = "var", value_name = "KEY=VALUE", required = true)]
        vars: Vec<String>,
    },
    /// Resolve a variable, falling back to ancestors
    Get {
        name: String,
        #[arg(long = "var", value_name = "KEY")]
        key: String,
    },
    /// Print the service version
    Version,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(args: Args) -> Result<()> {
    if let Command::Version = args.command {
        return print(&json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }

    let config = load_config(&args)?;

    let mut log_config = LogConfig::try_from(&config.logging)?;
    if let Some(level) = &args.log_level {
        log_config.level = level.parse::<LogLevel>()?;
    }
    init_logging_with_config(log_config.json_format(args.json_logs || config.logging.json_format))?;
    telemetry::init_metrics();

    debug!(config = ?config, "Loaded configuration");
    let store = NamespaceStore::open(&config.store)
        .with_context(|| format!("opening namespace store in {}", config.store.data_dir.display()))?;

    let outcome = execute(&store, args.command);
    store.shutdown()?;
    let output = outcome?;

    if let Some(output) = output {
        println!("{}", output);
    }
    info!("nsforest finished");
    Ok(())
}

/// Defaults, then the config file, then NSFOREST_* variables, then flags
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env()?;

    if let Some(dir) = &args.data_dir {
        config.store.data_dir = expand(dir)?;
    }
    if let Some(file_name) = &args.file_name {
        config.store.file_name = file_name.clone();
    }
    if let Some(dir) = &args.archive_dir {
        config.store.archive_dir = Some(expand(dir)?);
    }

    config.validate()?;
    Ok(config)
}

fn expand(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| format!("expanding path '{}'", path))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Run one operation; returns the JSON to print, if the operation has output
fn execute(store: &NamespaceStore, command: Command) -> Result<Option<String>> {
    let output = match command {
        Command::Create {
            name,
            description,
            parent,
        } => {
            store.create(&name, &description, request::create_parent(parent.as_deref()))?;
            None
        }
        Command::Modify {
            name,
            description,
            parent,
        } => {
            store.modify(&name, request::modify_request(description, parent.as_deref())?)?;
            None
        }
        Command::Delete {
            name,
            vars,
            confirm,
        } => {
            store.delete(&name, request::delete_target(vars, confirm)?)?;
            None
        }
        Command::List {
            namespace,
            only,
            settings,
        } => {
            let listing = store.list(request::list_request(namespace, only, settings)?)?;
            Some(render(&listing)?)
        }
        Command::Query { name, tree } => Some(render(&store.query(&name, tree)?)?),
        Command::Set { name, vars } => {
            store.set(&name, request::parse_assignments(&vars)?)?;
            None
        }
        Command::Get { name, key } => Some(render(&store.get(&name, &key)?)?),
        Command::Version => None,
    };
    Ok(output)
}

/// Typed results are rendered directly; a deep QUERY TREE never becomes a
/// nested `serde_json::Value`
fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", render(value)?);
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<NamespaceError>().map(NamespaceError::kind) {
        Some(ErrorKind::InvalidValue) => EXIT_INVALID_VALUE,
        Some(ErrorKind::DoesNotExist) => EXIT_DOES_NOT_EXIST,
        Some(ErrorKind::AlreadyExists) => EXIT_ALREADY_EXISTS,
        Some(ErrorKind::StorageError) => EXIT_STORAGE_ERROR,
        None => 1,
    }
}
