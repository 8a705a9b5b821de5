use anyhow::Result;
use async_trait::async_trait;

use crate::catalog::{Client, Pizza};
use crate::station::{Size, Station};

/// Authoritative-store access for the catalog's bulk load and miss-refill
/// paths. Bulk methods back the one-time startup load; the single-row
/// fetches back the synchronous miss-then-refill lookup path.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn fetch_all_clients(&self) -> Result<Vec<Client>>;
    async fn fetch_all_pizzas(&self) -> Result<Vec<Pizza>>;
    async fn fetch_all_stations(&self) -> Result<Vec<Station>>;

    async fn fetch_client(&self, id: i64) -> Result<Option<Client>>;
    async fn fetch_pizza(&self, name: &str, size: Size) -> Result<Option<Pizza>>;
}
