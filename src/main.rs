use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use pizzeria_engine::{
    batching::{BATCH_SIZE, BATCH_TIMEOUT, Controller},
    catalog::{Catalog, default_station_layout, repository_sqlx::SqlxCatalogRepository},
    config::AppConfig,
    db::Db,
    error::AppError,
    logger::init_tracing,
    production::ProductionManager,
    stats::{SharedContext, Stats},
};
use socket2::{Domain, Socket, Type};
use tokio::net::{TcpListener, UdpSocket};

/// Binds a UDP socket with `SO_REUSEADDR` set before binding, since
/// `tokio::net::UdpSocket` has no builder for this, so a raw `socket2`
/// handle sets it before the socket is handed to tokio.
fn bind_udp_reuseaddr(addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(UdpSocket::from_std(socket.into())?)
}

/// Binds a TCP listener with `SO_REUSEADDR` set before binding.
fn bind_tcp_reuseaddr(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    Ok(TcpListener::from_std(socket.into())?)
}

/// Stands in for the authoritative store when the initial connection
/// attempt fails: every lookup is a miss, so orders are refused rather
/// than the process crashing.
struct UnreachableRepository;

#[async_trait::async_trait]
impl pizzeria_engine::catalog::repository::CatalogRepository for UnreachableRepository {
    async fn fetch_all_clients(&self) -> anyhow::Result<Vec<pizzeria_engine::catalog::Client>> {
        Ok(Vec::new())
    }
    async fn fetch_all_pizzas(&self) -> anyhow::Result<Vec<pizzeria_engine::catalog::Pizza>> {
        Ok(Vec::new())
    }
    async fn fetch_all_stations(&self) -> anyhow::Result<Vec<pizzeria_engine::station::Station>> {
        Ok(Vec::new())
    }
    async fn fetch_client(&self, _id: i64) -> anyhow::Result<Option<pizzeria_engine::catalog::Client>> {
        Ok(None)
    }
    async fn fetch_pizza(
        &self,
        _name: &str,
        _size: pizzeria_engine::station::Size,
    ) -> anyhow::Result<Option<pizzeria_engine::catalog::Pizza>> {
        Ok(None)
    }
}

/// Connects to the authoritative store, migrates it, and bulk-loads the
/// catalog. Falls back to the documented default station layout, and to
/// an all-miss repository, if the store is unreachable at startup —
/// client/pizza misses in that mode refuse the order rather than crash
/// the process.
async fn init_catalog(cfg: &AppConfig) -> (Arc<Catalog>, Arc<ProductionManager>) {
    let db = match Db::connect(&cfg.database_url).await {
        Ok(db) => db,
        Err(e) => {
            let err = AppError::StoreUnavailable(e.to_string());
            tracing::error!(error = %err, "using default station layout");
            return (
                Arc::new(Catalog::empty(Arc::new(UnreachableRepository))),
                Arc::new(ProductionManager::new(default_station_layout())),
            );
        }
    };

    if let Err(e) = db.migrate().await {
        tracing::error!(error = %e, "catalog store migration failed");
    }

    let repo = Arc::new(SqlxCatalogRepository::new((*db.pool).clone()));

    let stations = match repo.fetch_all_stations().await {
        Ok(stations) if !stations.is_empty() => stations,
        Ok(_) => {
            tracing::warn!("no stations in authoritative store; using default station layout");
            default_station_layout()
        }
        Err(e) => {
            tracing::error!(error = %e, "station load failed; using default station layout");
            default_station_layout()
        }
    };

    let catalog = match Catalog::load(repo.clone()).await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(error = %e, "client/pizza bulk load failed; starting with an empty catalog");
            Catalog::empty(repo)
        }
    };

    (Arc::new(catalog), Arc::new(ProductionManager::new(stations)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("starting pizzeria production controller");

    let cfg = AppConfig::from_env();

    let (catalog, production) = init_catalog(&cfg).await;
    let stats = Stats::default();
    let ctx = SharedContext {
        catalog,
        production,
        stats,
    };

    let order_addr: SocketAddr = cfg.order_listen_addr.parse()?;
    let udp_socket = match bind_udp_reuseaddr(order_addr) {
        Ok(s) => s,
        Err(e) => {
            let err = AppError::BindFailure(e.to_string());
            tracing::error!(error = %err, addr = %order_addr, "failed to bind order socket");
            std::process::exit(1);
        }
    };

    let dashboard_addr: SocketAddr = cfg.dashboard_listen_addr.parse()?;
    let tcp_listener = match bind_tcp_reuseaddr(dashboard_addr) {
        Ok(l) => l,
        Err(e) => {
            let err = AppError::BindFailure(e.to_string());
            tracing::error!(error = %err, addr = %dashboard_addr, "failed to bind dashboard socket");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, mut order_shutdown_rx) = tokio::sync::watch::channel(false);

    let batch_size = if cfg.batch_size == 0 { BATCH_SIZE } else { cfg.batch_size };
    let batch_timeout = if cfg.batch_timeout_secs == 0 {
        BATCH_TIMEOUT
    } else {
        std::time::Duration::from_secs(cfg.batch_timeout_secs)
    };

    let order_ctx = ctx.clone();
    let order_task = tokio::spawn(async move {
        let mut controller = Controller::new(udp_socket, batch_size, batch_timeout, order_ctx);
        controller.run(&mut order_shutdown_rx).await;
    });

    let web_asset_dir = PathBuf::from(&cfg.web_asset_dir);
    let dashboard_ctx = ctx.clone();
    tokio::spawn(async move {
        pizzeria_engine::dashboard::serve(tcp_listener, web_asset_dir, dashboard_ctx).await;
    });

    tracing::info!(
        order_addr = %order_addr,
        dashboard_addr = %dashboard_addr,
        "controller started; waiting for shutdown signal"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = order_task.await;

    Ok(())
}
