use std::{
    io,
    sync::{Arc, OnceLock},
    time,
};

use application::{api, graphql, Args, Authenticator, Config};
use axum::{
    extract::MatchedPath,
    routing::{on, MethodFilter},
    Extension, Router,
};
use axum_client_ip::InsecureClientIp;
use common::clock;
use secrecy::ExposeSecret as _;
use service::{
    infra::{postgres, Postgres},
    Service,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::MakeWriter,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
    Registry,
};

/// Levels written to stderr rather than stdout.
const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    init_logging();

    _ = start().await;
}

/// Installs the global [`tracing`] subscriber, splitting events between
/// stdout and stderr by their level.
fn init_logging() {
    fn output<W>(
        writer: W,
        to_stderr: bool,
    ) -> impl tracing_subscriber::Layer<Registry> + Send + Sync + 'static
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(true)
            .with_thread_names(true)
            .with_writer(writer)
            .with_filter(filter_fn(move |meta| {
                let max = LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO);
                meta.is_span()
                    || (STDERR_LEVELS.contains(meta.level()) == to_stderr
                        && max >= *meta.level())
            }))
    }

    tracing_subscriber::registry()
        .with(output(io::stdout, false).and_then(output(io::stderr, true)))
        .init();
}

/// Runs the migrations and, unless asked to stop there, serves the GraphQL
/// API until failure.
async fn start() -> Result<(), ()> {
    let Args {
        config,
        migrate_only,
    } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        server,
        auth,
        service,
        postgres,
        log,
    } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let mut postgres = Postgres::new(&postgres.into()).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
    })?;

    let report = migrations::runner()
        .run_async(&mut postgres)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;
    for m in report.applied_migrations() {
        log::info!("applied migration `{m}`");
    }
    if migrate_only {
        log::info!("migrations are applied, exiting");
        return Ok(());
    }

    let mut cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::OPTIONS,
            http::Method::POST,
        ])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
        ]);
    for origin in &server.cors.origins {
        cors = cors.allow_origin(
            origin.parse::<http::header::HeaderValue>().map_err(|e| {
                log::error!("`{origin}` is not a valid CORS origin: {e}");
            })?,
        );
    }

    let app = router(
        Service::new(service, postgres, clock::System),
        Authenticator::new(auth.jwt_secret.expose_secret().as_bytes()),
    )
    .layer(TimeoutLayer::new(server.request_timeout))
    .layer(cors)
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(|r: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    http.client_ip =
                        InsecureClientIp::from(r.headers(), r.extensions())
                            .map(|ip| ip.0.to_string())
                            .ok(),
                    http.flavor = ?r.version(),
                    http.host = r.uri().host(),
                    http.method = r.method().as_str(),
                    http.route = r
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str),
                    http.target = r
                        .uri()
                        .path_and_query()
                        .map(http::uri::PathAndQuery::as_str),
                    http.user_agent = r
                        .headers()
                        .get(http::header::USER_AGENT)
                        .and_then(|h| h.to_str().ok()),
                    http.status_code = tracing::field::Empty,
                )
            })
            .on_response(
                |r: &http::Response<_>,
                 dur: time::Duration,
                 span: &tracing::Span| {
                    let status = r.status();
                    span.record(
                        "http.status_code",
                        tracing::field::display(status.as_u16()),
                    );

                    let duration = format!("{}ms", dur.as_millis());
                    if status.is_server_error() {
                        tracing::error!(duration = duration.as_str());
                    } else if status.is_client_error() {
                        tracing::warn!(duration = duration.as_str());
                    } else {
                        tracing::info!(duration = duration.as_str());
                    }
                },
            ),
    );

    let addr = (server.host.as_str(), server.port);
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        log::error!("failed to listen on `{}:{}`: {e}", addr.0, addr.1);
    })?;

    log::info!("listening on `{}:{}`", addr.0, addr.1);

    axum::serve(listener, app)
        .await
        .map_err(|e| log::error!("webserver failed: {e}"))
}

/// Builds the [`Router`] serving the GraphQL API on `/graphql`.
fn router(
    service: application::Service,
    authenticator: Authenticator,
) -> Router {
    Router::new()
        .route(
            "/graphql",
            on(MethodFilter::GET.or(MethodFilter::POST), graphql),
        )
        .layer(Extension(Arc::new(api::schema())))
        .layer(Extension(service))
        .layer(Extension(authenticator))
}
