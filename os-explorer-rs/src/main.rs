use clap::{ArgAction, Parser, Subcommand};
use os_explorer::{
    format_timestamp, print_size, serialize_system_time, CommandKind, CoreError, ExitStatusLike,
    ExplorerConfig, PathCatalog, PathInfo, RealFileSystem, TrashEngine, ROOT_ENV_VAR,
};
use std::error::Error as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: u8) {
    // Default is WARN so skipped manifest records are visible.
    let level = match 1 + i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[derive(Parser)]
#[command(
    name = "os-explorer",
    version,
    about = "A simple OS file explorer with trash management."
)]
struct Opts {
    /// Increase verbosity (-v, -vv).
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Decrease verbosity (-q).
    #[arg(short = 'q', action = ArgAction::Count, global = true)]
    quiet: u8,
    /// Directory where the .trash folder is located.
    #[arg(long, global = true, env = ROOT_ENV_VAR, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List directory entries
    List {
        /// Path to list
        path: PathBuf,
        /// Include hidden files (names starting with .)
        #[arg(short = 'a', long = "all")]
        all: bool,
    },
    /// Show basic info about a file or directory
    Info {
        /// File or directory path
        path: PathBuf,
    },
    /// Print a simple directory tree
    Tree {
        /// Root directory path
        path: PathBuf,
    },
    /// Find files whose names contain a given substring
    Search {
        /// Where to start searching
        path: PathBuf,
        /// Substring to search for in file names (case-insensitive)
        name_substring: String,
    },
    /// Delete a file or directory (moves to trash)
    Rm {
        /// File or directory path to move to trash
        path: PathBuf,
    },
    /// Restore the most recently trashed item with this name
    Restore {
        /// Base name of the file or directory to restore
        name: String,
    },
    /// Show disk usage (bytes) of a file or directory
    Du {
        /// File or directory path
        path: PathBuf,
        /// Show disk usage for all files and subdirectories
        #[arg(short = 'a', long = "all")]
        all: bool,
    },
    /// List items currently in the trash
    Trashed,
}

impl Command {
    fn kind(&self) -> CommandKind {
        match self {
            Self::List { .. } => CommandKind::List,
            Self::Info { .. } => CommandKind::Info,
            Self::Tree { .. } => CommandKind::Tree,
            Self::Search { .. } => CommandKind::Search,
            Self::Rm { .. } => CommandKind::Remove,
            Self::Restore { .. } => CommandKind::Restore,
            Self::Du { .. } => CommandKind::DiskUsage,
            Self::Trashed => CommandKind::Trashed,
        }
    }
}

fn main() {
    let opts = Opts::parse();
    init_tracing(opts.verbose, opts.quiet);

    let status = match run(opts) {
        Ok(()) => ExitStatusLike::Ok,
        Err(err) => {
            report(&err);
            err.exit_status()
        }
    };
    std::process::exit(i32::from(status.as_code()));
}

fn run(opts: Opts) -> os_explorer::Result<()> {
    let kind = opts.command.kind();
    debug!(command = %kind, mutates = kind.mutates(), root = %opts.root.display(), "dispatching");

    let config = ExplorerConfig::new(opts.root);
    let catalog = PathCatalog::new(Arc::new(RealFileSystem));
    match opts.command {
        Command::List { path, all } => {
            for entry in catalog.list(&path, all)? {
                println!("{}", entry.display_name());
            }
        }
        Command::Info { path } => print_info(&catalog.info(&path)?),
        Command::Tree { path } => {
            for line in catalog.tree(&path)? {
                println!("{line}");
            }
        }
        Command::Search { path, name_substring } => {
            for found in catalog.search(&path, &name_substring)? {
                println!("{}", found.display());
            }
        }
        Command::Rm { path } => {
            let outcome = TrashEngine::open(&config)?.trash(&path)?;
            println!("{}", outcome.location.display());
        }
        Command::Restore { name } => {
            let outcome = TrashEngine::open(&config)?.restore(&name)?;
            if outcome.skipped_records > 0 {
                eprintln!(
                    "os-explorer: skipped {} malformed manifest record(s)",
                    outcome.skipped_records
                );
            }
            if outcome.disambiguated {
                eprintln!(
                    "os-explorer: {} is occupied, restored beside it",
                    outcome.original_path.display()
                );
            }
            println!("{}", outcome.destination.display());
        }
        Command::Du { path, all } => {
            let usage = catalog.disk_usage(&path, all)?;
            for entry in &usage.entries {
                println!("{:>12}  {}", entry.bytes, entry.path.display());
            }
            println!("{:>12}  {}", usage.total, path.display());
        }
        Command::Trashed => {
            let engine = TrashEngine::open(&config)?;
            for entry in engine.entries()?.entries {
                println!(
                    "{} {} -> {}",
                    format_timestamp(entry.timestamp),
                    entry.original_path.display(),
                    entry.trashed_name
                );
            }
        }
    }
    Ok(())
}

fn print_info(info: &PathInfo) {
    let when = |time: Option<std::time::SystemTime>| {
        time.map(serialize_system_time)
            .unwrap_or_else(|| "unavailable".to_string())
    };
    println!("path: {}", info.path.display());
    println!("type: {}", info.kind);
    println!("size: {} bytes ({})", info.size, print_size(info.size));
    println!("created: {}", when(info.created));
    println!("modified: {}", when(info.modified));
}

fn report(err: &CoreError) {
    eprintln!("os-explorer: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
