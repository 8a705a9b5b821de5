#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string for the authoritative catalog store.
    pub database_url: String,

    /// UDP address the order source streams CSV datagrams to.
    pub order_listen_addr: String,

    /// TCP address the dashboard endpoint listens on.
    pub dashboard_listen_addr: String,

    /// Directory served for any dashboard path other than `/api/stats`.
    pub web_asset_dir: String,

    // =========================
    // Batching controller configuration
    // =========================
    /// Orders are flushed once the buffer reaches this size.
    ///
    /// Purpose:
    /// - bound the LSTF sort cost per flush
    /// - bound worst-case admission latency for the first order in a batch
    pub batch_size: usize,

    /// Orders are flushed once this many seconds have elapsed since the
    /// first order was buffered, even if `batch_size` has not been reached.
    ///
    /// Purpose:
    /// - bound worst-case admission latency under light load
    pub batch_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://pizzeria_dev.db".to_string());

        let order_listen_addr =
            std::env::var("ORDER_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:40100".to_string());

        let dashboard_listen_addr = std::env::var("DASHBOARD_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:10000".to_string());

        let web_asset_dir = std::env::var("WEB_ASSET_DIR").unwrap_or_else(|_| "web".to_string());

        Self {
            database_url,
            order_listen_addr,
            dashboard_listen_addr,
            web_asset_dir,

            // Batching defaults, may be overridden via env.
            batch_size: 4,
            batch_timeout_secs: 12,
        }
    }
}
