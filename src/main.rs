//! Telegram Session Keeper CLI - main entry point

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use telegram_session_keeper::commands::{self, AuthArgs, CreateArgs, ReadArgs};
use telegram_session_keeper::{ApiCredentials, Config, GrammersConnector, Workspace};

#[derive(Parser)]
#[command(name = "telegram_session_keeper")]
#[command(about = "A tool for creating and using Telegram backup sessions", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to YAML config file (default: config.yml if present)
    #[arg(long, global = true, env = "SESSION_KEEPER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct Credentials {
    /// Telegram application API ID
    #[arg(long, env = "TELEGRAM_API_ID")]
    api_id: i32,

    /// Telegram application API hash
    #[arg(long, env = "TELEGRAM_API_HASH", hide_env_values = true)]
    api_hash: String,
}

impl From<Credentials> for ApiCredentials {
    fn from(c: Credentials) -> Self {
        ApiCredentials {
            api_id: c.api_id,
            api_hash: c.api_hash,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new Telegram session and request for authentication code
    Create {
        #[command(flatten)]
        credentials: Credentials,

        /// Phone number in international format
        #[arg(long, env = "TELEGRAM_PHONE")]
        phone: String,

        /// Path to session file
        #[arg(long)]
        session: PathBuf,
    },

    /// Authenticate a newly created session with authentication code
    Auth {
        #[command(flatten)]
        credentials: Credentials,

        /// Path to session file
        #[arg(long)]
        session: PathBuf,

        /// Phone number in international format
        #[arg(long, env = "TELEGRAM_PHONE")]
        phone: String,

        /// Authentication code hash
        #[arg(long)]
        auth_hash: String,

        /// Authentication code
        #[arg(long)]
        auth_code: String,

        /// Two-step verification password
        #[arg(long, env = "TELEGRAM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Read messages from an authenticated Telegram session
    Read {
        #[command(flatten)]
        credentials: Credentials,

        /// Path to session file
        #[arg(long)]
        session: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Logs go to stderr, stdout carries command output only
    let filter = EnvFilter::from_default_env();
    let filter = match "telegram_session_keeper=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let workspace = Workspace::from_config(&config);
    let connector = GrammersConnector;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Create {
            credentials,
            phone,
            session,
        } => {
            let args = CreateArgs {
                credentials: credentials.into(),
                phone,
                session,
            };
            commands::create::run(&connector, &workspace, &args, &mut out).await?;
        }
        Commands::Auth {
            credentials,
            session,
            phone,
            auth_hash,
            auth_code,
            password,
        } => {
            let args = AuthArgs {
                credentials: credentials.into(),
                session,
                phone,
                auth_hash,
                auth_code,
                password,
            };
            commands::auth::run(&connector, &workspace, &args, &mut out).await?;
        }
        Commands::Read {
            credentials,
            session,
        } => {
            let args = ReadArgs {
                credentials: credentials.into(),
                session,
                history_limit: config.history_limit,
            };
            commands::read::run(&connector, &workspace, &args, &mut out).await?;
        }
    }

    Ok(())
}
