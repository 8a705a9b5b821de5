pub mod repository;
pub mod repository_sqlx;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use parking_lot::Mutex;
use tracing::{instrument, warn};

use crate::logger::warn_if_slow;
use crate::station::{Size, Station};
use repository::CatalogRepository;

const SLOW_REFILL_THRESHOLD: StdDuration = StdDuration::from_millis(100);

/// `id: integer, distance: integer minutes`. Immutable once loaded or
/// refilled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Client {
    pub id: i64,
    pub distance_minutes: i64,
}

/// `name, size, composition, productionTime, price`. Identity is the
/// `(name, size)` pair; immutable once loaded or refilled.
#[derive(Clone, Debug, PartialEq)]
pub struct Pizza {
    pub name: String,
    pub size: Size,
    pub composition: String,
    pub production_time_minutes: i64,
    pub price: f64,
}

/// In-memory snapshot of clients, pizzas, and stations, backed by a
/// lazy-refill path to the authoritative store.
///
/// Stations are loaded once at startup and never refilled: the floor
/// layout is static for the process lifetime. Clients and pizzas grow
/// monotonically via miss-then-refill, serialized through a single mutex
/// shared with every other mutation here.
pub struct Catalog {
    repo: Arc<dyn CatalogRepository>,
    clients: Mutex<HashMap<i64, Client>>,
    pizzas: Mutex<HashMap<(String, Size), Pizza>>,
}

impl Catalog {
    /// Bulk-loads clients and pizzas from the authoritative store. Does
    /// not load stations; callers construct the station list separately
    /// (startup may fall back to a default layout when the store is
    /// unreachable).
    pub async fn load(repo: Arc<dyn CatalogRepository>) -> anyhow::Result<Self> {
        let clients: HashMap<i64, Client> = repo
            .fetch_all_clients()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let pizzas: HashMap<(String, Size), Pizza> = repo
            .fetch_all_pizzas()
            .await?
            .into_iter()
            .map(|p| ((p.name.clone(), p.size), p))
            .collect();

        Ok(Self {
            repo,
            clients: Mutex::new(clients),
            pizzas: Mutex::new(pizzas),
        })
    }

    /// Used when the authoritative store is unreachable at startup: an
    /// empty catalog that still serves lookups (all misses) and refills
    /// opportunistically if the store comes back.
    pub fn empty(repo: Arc<dyn CatalogRepository>) -> Self {
        Self {
            repo,
            clients: Mutex::new(HashMap::new()),
            pizzas: Mutex::new(HashMap::new()),
        }
    }

    /// In-memory-only lookup: never triggers a refill on miss. Used where a
    /// miss must stay a miss for this call (e.g. slack computation ahead of
    /// LSTF sort), so cache warmth from an unrelated earlier lookup can't
    /// change the outcome.
    pub fn peek_client(&self, id: i64) -> Option<Client> {
        self.clients.lock().get(&id).copied()
    }

    /// In-memory-only lookup for pizzas; see [`Catalog::peek_client`].
    pub fn peek_pizza(&self, name: &str, size: Size) -> Option<Pizza> {
        self.pizzas.lock().get(&(name.to_string(), size)).cloned()
    }

    /// O(1) lookup, then a synchronous single-row refill on miss.
    #[instrument(skip(self))]
    pub async fn get_client(&self, id: i64) -> Option<Client> {
        if let Some(c) = self.clients.lock().get(&id).copied() {
            return Some(c);
        }
        let fetched = warn_if_slow("catalog_fetch_client", SLOW_REFILL_THRESHOLD, self.repo.fetch_client(id)).await;
        match fetched {
            Ok(Some(c)) => {
                self.clients.lock().insert(c.id, c);
                Some(c)
            }
            Ok(None) => None,
            Err(e) => {
                // Availability over strict consistency: a transient store
                // failure during refill is surfaced as a miss, not a crash.
                warn!(client_id = id, error = %e, "client refill failed; treating as miss");
                None
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_pizza(&self, name: &str, size: Size) -> Option<Pizza> {
        if let Some(p) = self.pizzas.lock().get(&(name.to_string(), size)).cloned() {
            return Some(p);
        }
        let fetched = warn_if_slow(
            "catalog_fetch_pizza",
            SLOW_REFILL_THRESHOLD,
            self.repo.fetch_pizza(name, size),
        )
        .await;
        match fetched {
            Ok(Some(p)) => {
                self.pizzas
                    .lock()
                    .insert((p.name.clone(), p.size), p.clone());
                Some(p)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(pizza_name = name, error = %e, "pizza refill failed; treating as miss");
                None
            }
        }
    }
}

/// Default built-in station layout used when the authoritative store is
/// unreachable at startup.
pub fn default_station_layout() -> Vec<Station> {
    vec![
        Station::new(1, 30, true, Size::Any, "Veggie,Chevre"),
        Station::new(2, 25, true, Size::Any, ""),
        Station::new(3, 18, true, Size::G, "Chevre,4_Fromages"),
        Station::new(4, 20, true, Size::M, ""),
        Station::new(5, 27, false, Size::M, ""),
        Station::new(6, 15, true, Size::Any, ""),
    ]
}

/// Count of ingredient tokens `{R, J, V, B}` in a pizza's composition
/// string, multiplied by the accepted order's quantity.
pub fn ingredient_tally(composition: &str, quantity: u32) -> HashMap<char, u64> {
    let mut out = HashMap::new();
    for c in composition.chars() {
        if matches!(c, 'R' | 'J' | 'V' | 'B') {
            *out.entry(c).or_insert(0) += quantity as u64;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRepository {
        fetch_client_calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogRepository for CountingRepository {
        async fn fetch_all_clients(&self) -> anyhow::Result<Vec<Client>> {
            Ok(Vec::new())
        }
        async fn fetch_all_pizzas(&self) -> anyhow::Result<Vec<Pizza>> {
            Ok(Vec::new())
        }
        async fn fetch_all_stations(&self) -> anyhow::Result<Vec<crate::station::Station>> {
            Ok(Vec::new())
        }
        async fn fetch_client(&self, id: i64) -> anyhow::Result<Option<Client>> {
            self.fetch_client_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Client {
                id,
                distance_minutes: 7,
            }))
        }
        async fn fetch_pizza(&self, _name: &str, _size: Size) -> anyhow::Result<Option<Pizza>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn peek_client_never_refills_on_miss() {
        let catalog = Catalog::empty(Arc::new(CountingRepository::default()));
        assert_eq!(catalog.peek_client(42), None);
    }

    #[tokio::test]
    async fn peek_pizza_never_refills_on_miss() {
        let catalog = Catalog::empty(Arc::new(CountingRepository::default()));
        assert_eq!(catalog.peek_pizza("Reine", Size::G), None);
    }

    #[tokio::test]
    async fn get_client_refills_and_caches_so_a_later_peek_sees_it() {
        let catalog = Catalog::empty(Arc::new(CountingRepository::default()));
        assert_eq!(catalog.peek_client(42), None);
        let fetched = catalog.get_client(42).await;
        assert_eq!(fetched.map(|c| c.distance_minutes), Some(7));
        assert_eq!(catalog.peek_client(42).map(|c| c.distance_minutes), Some(7));
    }

    #[test]
    fn default_layout_matches_documented_table() {
        let stations = default_station_layout();
        assert_eq!(stations.len(), 6);
        assert_eq!(stations[0].id, 1);
        assert_eq!(stations[0].max_capacity, 30);
        assert!(stations[4].available == false);
    }

    #[test]
    fn ingredient_tally_counts_only_rjvb_tokens() {
        let tally = ingredient_tally("R-J--VBx", 3);
        assert_eq!(tally.get(&'R'), Some(&3));
        assert_eq!(tally.get(&'J'), Some(&3));
        assert_eq!(tally.get(&'V'), Some(&3));
        assert_eq!(tally.get(&'B'), Some(&3));
        assert_eq!(tally.get(&'x'), None);
        assert_eq!(tally.get(&'-'), None);
    }
}
