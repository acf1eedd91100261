use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use bamboo_relay::bamboo::{
    DEFAULT_BAMBOO_PASSWORD, DEFAULT_BAMBOO_USERNAME, DEFAULT_REQUEST_TIMEOUT,
};
use bamboo_relay::utils::logging::init_logging;
use bamboo_relay::{
    create_app, BambooClient, BambooCredentials, BambooDispatcher, DryRunDispatcher, Relay,
    RelayConfig, ServerState, WebhookSecret,
};

#[derive(clap::Parser)]
struct Opts {
    /// Secret that webhooks have to send in the `x-hub-signature` header.
    #[arg(long, env = "SECRET", hide_env_values = true)]
    webhook_secret: String,

    /// TOML file that overrides the built-in project, label and user tables.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Bamboo user that queues the builds.
    #[arg(long, env = "BAMBOO_USERNAME", default_value = DEFAULT_BAMBOO_USERNAME)]
    bamboo_username: String,

    /// Password of the Bamboo user.
    #[arg(
        long,
        env = "BAMBOO_PASSWORD",
        default_value = DEFAULT_BAMBOO_PASSWORD,
        hide_env_values = true
    )]
    bamboo_password: String,

    /// How many seconds to wait for Bamboo before giving up.
    #[arg(
        long,
        env = "BAMBOO_REQUEST_TIMEOUT",
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs()
    )]
    request_timeout: u64,

    /// Port of the webhook server.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Only log the Bamboo requests instead of sending them.
    #[arg(long)]
    dry_run: bool,
}

async fn server(state: ServerState, port: u16) -> anyhow::Result<()> {
    let app = create_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

fn try_main(opts: Opts) -> anyhow::Result<()> {
    let config = match &opts.config {
        Some(path) => RelayConfig::load(path)
            .with_context(|| format!("Cannot load relay config from {path:?}"))?,
        None => RelayConfig::default(),
    };

    let dispatcher: Arc<dyn BambooDispatcher> = if opts.dry_run {
        tracing::warn!("Running in dry-run mode, Bamboo will not be contacted");
        Arc::new(DryRunDispatcher)
    } else {
        Arc::new(BambooClient::new(Duration::from_secs(opts.request_timeout))?)
    };
    let relay = Relay::new(
        Arc::new(config),
        BambooCredentials::new(opts.bamboo_username, opts.bamboo_password),
        dispatcher,
    );
    let state = ServerState::new(relay, WebhookSecret::new(opts.webhook_secret));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot build tokio runtime")?;
    runtime.block_on(server(state, opts.port))
}

fn main() {
    init_logging();

    let opts = Opts::parse();
    if let Err(error) = try_main(opts) {
        eprintln!("Error: {error:?}");
        std::process::exit(1);
    }
}
