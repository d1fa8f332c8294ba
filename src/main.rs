use std::{process, sync::Arc};

use shopfront::{
    application::{
        catalog::{ProductSource, WarmScope},
        error::AppError,
        warm::CatalogWarmer,
    },
    cache::{
        CacheConfig, Clock, CollectionLookup, CollectionWriter, FileStore, KeyValueStore,
        MemoryStore, SystemClock,
    },
    config,
    domain::products::ProductRecord,
    infra::{
        error::InfraError,
        graphql::GraphQlProductSource,
        http::{self, ApiState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Warm(args) => run_warm(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let secret = settings
        .rebuild
        .secret
        .clone()
        .ok_or_else(|| InfraError::configuration("rebuild secret is not configured"))
        .map_err(AppError::from)?;

    let store = build_store(&settings);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache_config = CacheConfig::from(&settings.cache);

    let lookup = Arc::new(CollectionLookup::<ProductRecord>::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        cache_config,
    ));
    let writer = Arc::new(CollectionWriter::<ProductRecord>::new(
        Arc::clone(&store),
        Arc::clone(&clock),
    ));
    let warmer = Arc::new(CatalogWarmer::new(
        build_source(&settings)?,
        Arc::clone(&writer),
    ));

    let state = ApiState {
        lookup,
        writer,
        warmer,
        rebuild_secret: Arc::from(secret.as_str()),
    };

    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "shopfront::serve",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_warm(settings: config::Settings, args: config::WarmArgs) -> Result<(), AppError> {
    let scope = WarmScope::parse(&args.scope)
        .ok_or_else(|| AppError::validation("scope must be `full` or `category:<slug>`"))?;

    let store = build_store(&settings);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let writer = Arc::new(CollectionWriter::<ProductRecord>::new(store, clock));
    let warmer = CatalogWarmer::new(build_source(&settings)?, writer);

    let receipt = warmer
        .warm(&scope)
        .await
        .map_err(|err| AppError::unexpected(format!("warm failed: {err}")))?;

    info!(
        target = "shopfront::warm",
        products = receipt.products_count,
        timestamp = receipt.written_at_ms,
        "warm completed"
    );

    Ok(())
}

fn build_store(settings: &config::Settings) -> Arc<dyn KeyValueStore> {
    match settings.store.backend {
        config::StoreBackend::Memory => Arc::new(MemoryStore::new()),
        config::StoreBackend::File => Arc::new(FileStore::new(settings.store.directory.clone())),
    }
}

fn build_source(settings: &config::Settings) -> Result<Arc<dyn ProductSource>, AppError> {
    let endpoint = settings
        .source
        .endpoint
        .clone()
        .ok_or_else(|| InfraError::configuration("source endpoint is not configured"))
        .map_err(AppError::from)?;

    let source = GraphQlProductSource::new(
        endpoint,
        settings.source.page_size.get(),
        settings.source.timeout,
    )
    .map_err(|err| AppError::unexpected(format!("failed to build product source: {err}")))?;

    Ok(Arc::new(source))
}
