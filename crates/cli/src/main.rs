use clap::{Parser, Subcommand};
use relay::channels::TelegramClient;
use relay::config::{self, Config, ProcessEnv};
use relay::gateway::TELEGRAM_WEBHOOK_PATH;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "tg-relay")]
#[command(about = "Telegram <-> respond.io relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook gateway. Credentials are read from the environment on every request.
    Serve {
        /// Config file path (default: RELAY_CONFIG_PATH or ./relay.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 15151)
        #[arg(long, short)]
        port: Option<u16>,

        /// Bind address (default from config or 127.0.0.1)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Manage the Telegram webhook registration for TELEGRAM_BOT_TOKEN.
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
}

#[derive(Subcommand)]
enum WebhookAction {
    /// Point Telegram at <public url>/telegram/webhook (public url from RELAY_PUBLIC_URL or
    /// config).
    Set {
        /// Config file path (default: RELAY_CONFIG_PATH or ./relay.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Show the current registration.
    Info,
    /// Remove the registration.
    Delete,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("tg-relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port, bind }) => {
            if let Err(e) = run_serve(config, port, bind).await {
                log::error!("{}", failure_message("gateway", &e));
                std::process::exit(1);
            }
        }
        Some(Commands::Webhook { action }) => {
            if let Err(e) = run_webhook(action).await {
                log::error!("{}", failure_message("webhook command", &e));
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

/// One-line failure report including the whole context chain.
fn failure_message(what: &str, err: &anyhow::Error) -> String {
    format!("{} failed: {:#}", what, err)
}

/// Telegram echoes the registered secret verbatim, while the gateway checks for an
/// HMAC signature in that header.
fn registered_secret_warning(secret: Option<&str>) -> Option<String> {
    secret.map(|_| {
        format!(
            "{} is set: Telegram sends it back unchanged in the {} header, but the gateway \
             expects sha256=<HMAC of the body>; updates will get 401 unless a proxy signs them",
            config::TELEGRAM_SECRET_TOKEN,
            relay::gateway::TELEGRAM_SIGNATURE_HEADER
        )
    })
}

async fn run_serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    bind: Option<String>,
) -> anyhow::Result<()> {
    let mut server = config::load_server_config(config_path, &ProcessEnv)?;
    if let Some(p) = port {
        server.port = p;
    }
    if let Some(b) = bind {
        server.bind = b;
    }
    log::info!("starting gateway on {}:{}", server.bind, server.port);
    relay::gateway::run_gateway(server, Arc::new(ProcessEnv)).await
}

fn telegram_client() -> anyhow::Result<TelegramClient> {
    let credentials = Config::from_env(&ProcessEnv).telegram_credentials()?;
    Ok(TelegramClient::from_credentials(&credentials))
}

async fn run_webhook(action: WebhookAction) -> anyhow::Result<()> {
    let client = telegram_client()?;
    match action {
        WebhookAction::Set { config } => {
            let server = config::load_server_config(config, &ProcessEnv)?;
            let public = server
                .public_url
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!("{} environment variable is required", config::RELAY_PUBLIC_URL)
                })?;
            let url = format!("{}{}", public.trim_end_matches('/'), TELEGRAM_WEBHOOK_PATH);
            let secret = Config::from_env(&ProcessEnv).telegram.secret_token;
            if let Some(warning) = registered_secret_warning(secret.as_deref()) {
                log::warn!("{}", warning);
            }
            client.set_webhook(&url, secret.as_deref()).await?;
            println!("webhook set: {}", url);
        }
        WebhookAction::Info => {
            let info = client.get_webhook_info().await?;
            let url = if info.url.is_empty() {
                "(none)"
            } else {
                info.url.as_str()
            };
            println!("url: {}", url);
            println!("pending updates: {}", info.pending_update_count);
            if let Some(err) = info.last_error_message {
                println!("last error: {}", err);
            }
        }
        WebhookAction::Delete => {
            client.delete_webhook().await?;
            println!("webhook deleted");
        }
    }
    Ok(())
}
