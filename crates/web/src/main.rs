mod backends;
mod handlers;

use std::{
    fs::File,
    io::BufReader,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use axum::{
    Router,
    extract::{ConnectInfo, FromRef},
    http::{HeaderName, Request, StatusCode, header},
};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    ServiceBuilderExt,
    normalize_path::NormalizePathLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, MakeSpan, TraceLayer},
};
use tracing::{Level, Span};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};
use wpt_checks_core::config::Config;
use wpt_checks_db::Database;
use wpt_checks_dispatch::{Checks, Collaborators, ports::SecretStore};
use wpt_checks_github::{GitHub, GitHubChecks};

use crate::handlers::build_router;

#[derive(Clone, FromRef)]
pub struct AppState {
    checks: Arc<Checks>,
    secrets: Arc<dyn SecretStore>,
}

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::builder()
        // Default to info level
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config: Config = {
        let file = BufReader::new(File::open("config.yml").expect("Failed to open config file"));
        serde_yaml::from_reader(file).expect("Failed to parse config file")
    };
    let db = Database::new(&config.db).await.expect("Failed to open database");
    let github = GitHub::new(&config.github).await.expect("Failed to create GitHub client");
    let store = Arc::new(db.clone());
    let collaborators = Collaborators {
        flags: store.clone(),
        api: Arc::new(GitHubChecks::new(github, db.clone(), config.github.home.clone())),
        suites: store.clone(),
        runs: store.clone(),
        azure_pipelines: backends::create("Azure Pipelines", config.backends.azure_pipelines.as_ref())
            .expect("Failed to create Azure Pipelines backend"),
        taskcluster: backends::create("Taskcluster", config.backends.taskcluster.as_ref())
            .expect("Failed to create Taskcluster backend"),
    };
    let checks = Checks::new(&config.checks, config.github.home.repo_id, collaborators)
        .expect("Invalid checks configuration");
    let state = AppState { checks: Arc::new(checks), secrets: store };

    let router = app(state).into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.server.port));
    tracing::info!("Web server: Listening on {}", addr);
    let listener = TcpListener::bind(addr).await.expect("bind error");
    if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!("Web server error: {e}");
    }
    tracing::info!("Web server stopped");

    db.close().await;
    tracing::info!("Shut down gracefully");
}

fn app(state: AppState) -> Router {
    let sensitive_headers: Arc<[_]> =
        vec![header::AUTHORIZATION, HeaderName::from_static("x-hub-signature-256")].into();
    let middleware = ServiceBuilder::new()
        .sensitive_request_headers(sensitive_headers.clone())
        .sensitive_response_headers(sensitive_headers)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DeliverySpan)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(120),
        ))
        .layer(NormalizePathLayer::trim_trailing_slash());
    build_router().with_state(state).layer(middleware)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        tokio::select! {
            result = signal::ctrl_c() => result.expect("Failed to listen for Ctrl+C"),
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C")
    }
}

/// Request span carrying the client address and the GitHub delivery id, so every log
/// line of a delivery can be matched to GitHub's delivery log.
#[derive(Debug, Clone, Copy)]
struct DeliverySpan;

impl DeliverySpan {
    fn client_ip<B>(request: &Request<B>) -> IpAddr {
        let forwarded = request
            .headers()
            .get("CF-Connecting-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| IpAddr::from_str(s).ok());
        forwarded
            .or_else(|| request.extensions().get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip()))
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

impl<B> MakeSpan<B> for DeliverySpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let header = |name: &str| request.headers().get(name).and_then(|v| v.to_str().ok()).unwrap_or("-");
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            ip = %Self::client_ip(request),
            user_agent = header("User-Agent"),
            event = header("X-GitHub-Event"),
            delivery = header("X-GitHub-Delivery"),
        )
    }
}
