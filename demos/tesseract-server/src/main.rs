//! Standalone Tesseract server.
//!
//! Serves the request API and the persistent channel. Credentials live in
//! SQLite when `--database` is given, in memory otherwise.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tesseract::logging::{self, LogFormat};
use tesseract::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "tesseract-server")]
#[command(about = "Authentication and single-session presence server", long_about = None)]
struct Args {
    /// Bind address for the request API.
    #[arg(long = "http-addr", env = "TESSERACT_HTTP_ADDR", default_value = "0.0.0.0:3000")]
    http_addr: String,

    /// Bind address for the persistent WebSocket channel.
    #[arg(long = "ws-addr", env = "TESSERACT_WS_ADDR", default_value = "0.0.0.0:3001")]
    ws_addr: String,

    /// SQLite database file for credentials. Omit to keep them in memory.
    #[arg(long = "database", env = "TESSERACT_DATABASE")]
    database: Option<PathBuf>,

    /// How long issued tokens stay valid, in hours.
    #[arg(long = "token-ttl-hours", env = "TESSERACT_TOKEN_TTL_HOURS", default_value_t = 12)]
    token_ttl_hours: u64,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn builder(&self) -> TesseractServerBuilder {
        TesseractServerBuilder::new()
            .http_bind(&self.http_addr)
            .ws_bind(&self.ws_addr)
            .auth_config(AuthConfig {
                token_ttl: Duration::from_secs(self.token_ttl_hours.saturating_mul(60 * 60)),
                ..AuthConfig::default()
            })
    }
}

async fn serve<S: CredentialStore>(
    builder: TesseractServerBuilder,
    store: S,
) -> Result<(), TesseractError> {
    let server = builder.build(store).await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let format = if args.log_json {
        LogFormat::Json
    } else {
        LogFormat::Full
    };
    if let Err(e) = logging::init(format) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let builder = args.builder();
    match &args.database {
        Some(path) => {
            tracing::info!(path = %path.display(), "using SQLite credential store");
            serve(builder, SqliteCredentialStore::open(path)?).await?;
        }
        None => {
            tracing::warn!("using in-memory credential store; registrations are lost on exit");
            serve(builder, MemoryCredentialStore::new()).await?;
        }
    }
    Ok(())
}
