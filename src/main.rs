use anyhow::Context;
use clubhouse_language_server::{
    ClubhouseLanguageServer,
    clubhouse::{
        api::{ClubhouseClient, TOKEN_ENV},
        cache::CacheStore,
        index::TicketIndex,
        loader::{LoadSettings, load_index},
    },
};
use std::{path::PathBuf, sync::Arc};
use structopt::StructOpt;
use tokio::net::TcpListener;
use tower_lsp_server::{LspService, Server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "clubhouse-language-server",
    about = "Completes Clubhouse story references in bullet lists"
)]
struct Opt {
    /// Serve over stdin/stdout instead of TCP.
    #[structopt(long)]
    stdio: bool,

    #[structopt(long, default_value = "127.0.0.1")]
    host: String,

    #[structopt(long, default_value = "45141")]
    port: u16,

    /// Directory holding cached API responses.
    #[structopt(long, parse(from_os_str))]
    cache_dir: Option<PathBuf>,

    #[structopt(long, default_value = "https://api.clubhouse.io")]
    api_url: String,

    /// Workflow ranked above the others; may be repeated.
    #[structopt(long = "main-workflow", number_of_values = 1)]
    main_workflows: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let opt = Opt::from_args();

    let index = Arc::new(build_index(&opt).await?);

    if opt.stdio {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let (service, socket) =
            LspService::build(move |client| ClubhouseLanguageServer::new(client, index)).finish();
        Server::new(stdin, stdout, socket).serve(service).await;
        return Ok(());
    }

    let listener = TcpListener::bind((opt.host.as_str(), opt.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", opt.host, opt.port))?;
    info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        info!(%peer, "client connected");
        let (read, write) = tokio::io::split(stream);
        let index = Arc::clone(&index);
        let (service, socket) =
            LspService::build(move |client| ClubhouseLanguageServer::new(client, index)).finish();
        Server::new(read, write, socket).serve(service).await;
        info!(%peer, "client disconnected");
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

async fn build_index(opt: &Opt) -> anyhow::Result<TicketIndex> {
    let client = Arc::new(ClubhouseClient::from_env(opt.api_url.as_str()));
    if !client.has_token() {
        warn!("{TOKEN_ENV} is not set, serving from cache only");
    }
    let cache_dir = opt.cache_dir.clone().unwrap_or_else(CacheStore::default_dir);
    let cache = CacheStore::open(&cache_dir)
        .with_context(|| format!("failed to open cache at {}", cache_dir.display()))?;
    info!(dir = %cache.dir().display(), "using cache");

    let mut settings = LoadSettings::default();
    if !opt.main_workflows.is_empty() {
        settings.main_workflows = opt.main_workflows.clone();
    }

    tokio::task::spawn_blocking(move || load_index(client, &cache, &settings))
        .await
        .context("index loader panicked")?
        .context("failed to load ticket index")
}
