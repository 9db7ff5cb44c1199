//! Catalog gRPC server.
//!
//! Wires the Postgres adapters, the outbox dispatcher, and the Catalog
//! service together and serves until interrupted.

mod config;

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use catalog_application::{DispatcherSettings, LibraryService, OutboxDispatcher};
use catalog_infrastructure::{
    PgTransactor, PostgresCatalogRepository, PostgresOutboxStore, StaticHandlerRegistry,
};
use catalog_interface::CatalogService;
use catalog_proto::catalog_server::CatalogServer;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cfg = AppConfig::load()?;
    let addr = format!("0.0.0.0:{}", cfg.grpc.port).parse()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.postgres.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&cfg.postgres.url())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    info!("connected to database");

    let repository_impl = PostgresCatalogRepository::new(pool.clone());
    repository_impl.run_migrations().await?;
    let repository = Arc::new(repository_impl);

    let outbox_store_impl = PostgresOutboxStore::new(pool.clone());
    outbox_store_impl.run_migrations().await?;
    let outbox_store = Arc::new(outbox_store_impl);

    let transactor = Arc::new(PgTransactor::new(pool.clone()));

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(30))
        .build()?;
    let registry = Arc::new(StaticHandlerRegistry::new(
        http_client,
        cfg.outbox.book_send_url.clone(),
        cfg.outbox.author_send_url.clone(),
    ));

    let dispatcher = OutboxDispatcher::new(
        transactor.clone(),
        outbox_store.clone(),
        registry,
        DispatcherSettings {
            enabled: cfg.outbox.enabled,
            workers: cfg.outbox.workers,
            batch_size: cfg.outbox.batch_size,
            wait_time: cfg.outbox.wait_time(),
            in_progress_ttl: cfg.outbox.in_progress_ttl(),
        },
    );

    let shutdown = CancellationToken::new();
    let dispatcher_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { dispatcher.start(shutdown).await }
    });

    let library = Arc::new(LibraryService::new(
        transactor,
        outbox_store,
        repository.clone(),
        repository,
    ));
    let catalog = CatalogService::new(library.clone(), library);

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(catalog_proto::FILE_DESCRIPTOR_SET)
        .build_v1()?;

    info!(%addr, "catalog gRPC server listening");

    Server::builder()
        .add_service(CatalogServer::new(catalog))
        .add_service(reflection)
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    shutdown.cancel();
    let _ = dispatcher_task.await;
    info!("catalog server stopped");

    Ok(())
}
