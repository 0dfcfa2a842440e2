use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use product_grouping as app;
use product_grouping::services::grouping_scheduler::GroupingScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = app::config::load_config().context("failed to load configuration")?;
    app::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = app::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        app::db::run_migrations_with_retry(&db_pool, cfg.migration_retry_attempts)
            .await
            .map_err(|e| {
                error!("Failed running migrations: {}", e);
                e
            })?;
    }
    let db = Arc::new(db_pool);

    // Init events
    let (event_sender, event_rx) = app::events::channel(app::events::DEFAULT_EVENT_CHANNEL_CAPACITY);
    let event_processor = tokio::spawn(app::events::process_events(event_rx));

    let services = app::handlers::AppServices::new(db.clone(), Some(event_sender));
    let shutdown = CancellationToken::new();

    let scheduler = if cfg.grouping_enabled {
        let scheduler = GroupingScheduler::new(services.grouping.clone(), cfg.grouping_interval());
        Some(scheduler.spawn(shutdown.child_token()))
    } else {
        info!("Background grouping disabled");
        None
    };

    let app_state = app::AppState {
        db: db.clone(),
        config: cfg.clone(),
        services,
        shutdown: shutdown.clone(),
    };
    let router = app::app_router(app_state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!("product-grouping listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let serve_shutdown = shutdown.clone();
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            serve_shutdown.cancel();
        })
        .await
        .context("server error")?;

    // The server may also stop on its own; make sure background work follows.
    shutdown.cancel();
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            warn!(error = %e, "Grouping scheduler task ended abnormally");
        }
    }

    // The router and the scheduler held the last event senders.
    if let Err(e) = event_processor.await {
        warn!(error = %e, "Event processor task ended abnormally");
    }

    match Arc::try_unwrap(db) {
        Ok(pool) => app::db::close_pool(pool).await?,
        Err(_) => warn!("Database pool still shared at shutdown, leaving it to drop"),
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
