//! ctxforge CLI: the main entry point.
//!
//! Commands:
//! - `assemble`: Assemble and optimize context for one request
//! - `memory`: Inspect or clean up stored memory
//! - `config`: Print the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "ctxforge",
    about = "ctxforge: context assembly for coding assistants",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble an optimized context package for a request
    Assemble {
        /// The user's request
        input: String,

        /// Task type (architecture, feature, bugfix, refactor, decision, progress, general)
        #[arg(short, long, default_value = "general")]
        task: String,

        /// Priority (high, medium, low)
        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Session to read and record short-term memory under
        #[arg(short, long, default_value = "cli", env = "CTXFORGE_SESSION")]
        session: String,

        /// User whose long-term profile is applied
        #[arg(short, long, env = "CTXFORGE_USER")]
        user: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clean up stored memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Show a session's short-term memory, most recent first
    Show {
        #[arg(short, long, default_value = "cli")]
        session: String,
    },

    /// Show a user's long-term profile
    Profile {
        #[arg(short, long, default_value = "default")]
        user: String,
    },

    /// Remove short-term entries older than N days
    Cleanup {
        /// Defaults to the configured retention
        #[arg(short, long)]
        days: Option<u32>,
    },
}

/// Log level used when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays parseable
    let filter = default_filter(cli.verbose);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Assemble {
            input,
            task,
            priority,
            session,
            user,
            json,
        } => {
            let args = commands::assemble::AssembleArgs {
                input,
                task,
                priority,
                session,
                user,
                json,
            };
            commands::assemble::run(args).await?
        }
        Commands::Memory { action } => match action {
            MemoryAction::Show { session } => commands::memory::show(&session).await?,
            MemoryAction::Profile { user } => commands::memory::profile(&user).await?,
            MemoryAction::Cleanup { days } => commands::memory::cleanup(days).await?,
        },
        Commands::Config => commands::config_cmd::show()?,
    }

    Ok(())
}
