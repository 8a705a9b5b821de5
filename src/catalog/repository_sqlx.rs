use anyhow::Result;
use async_trait::async_trait;
use sqlx::{AnyPool, Row};

use crate::catalog::repository::CatalogRepository;
use crate::catalog::{Client, Pizza};
use crate::station::{Size, Station};

/// `sqlx`-backed implementation of [`CatalogRepository`] against the
/// `Client`, `Pizza`, and `Production` tables. Responsible only for
/// persistence and row mapping.
pub struct SqlxCatalogRepository {
    pool: AnyPool,
}

impl SqlxCatalogRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for SqlxCatalogRepository {
    async fn fetch_all_clients(&self) -> Result<Vec<Client>> {
        let rows = sqlx::query("SELECT ID, Distance FROM Client;")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_client).collect())
    }

    async fn fetch_all_pizzas(&self) -> Result<Vec<Pizza>> {
        let rows = sqlx::query("SELECT Nom, Taille, Composition, TPsProd, Prix FROM Pizza;")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_pizza).collect())
    }

    async fn fetch_all_stations(&self) -> Result<Vec<Station>> {
        let rows = sqlx::query(
            "SELECT Poste, Capacite, Disponibilite, Taille, Restriction FROM Production ORDER BY Poste;",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_station).collect())
    }

    async fn fetch_client(&self, id: i64) -> Result<Option<Client>> {
        let row = sqlx::query("SELECT ID, Distance FROM Client WHERE ID = ?;")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_client))
    }

    async fn fetch_pizza(&self, name: &str, size: Size) -> Result<Option<Pizza>> {
        let row = sqlx::query(
            "SELECT Nom, Taille, Composition, TPsProd, Prix FROM Pizza WHERE Nom = ? AND Taille = ?;",
        )
        .bind(name)
        .bind(size.as_wire_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_pizza))
    }
}

fn row_to_client(r: &sqlx::any::AnyRow) -> Client {
    Client {
        id: r.get("ID"),
        distance_minutes: r.get("Distance"),
    }
}

fn row_to_pizza(r: &sqlx::any::AnyRow) -> Pizza {
    Pizza {
        name: r.get("Nom"),
        size: Size::parse(&r.get::<String, _>("Taille")),
        composition: r.get("Composition"),
        production_time_minutes: r.get("TPsProd"),
        price: r.get("Prix"),
    }
}

fn row_to_station(r: &sqlx::any::AnyRow) -> Station {
    let disponibilite: bool = any_bool(r, "Disponibilite");
    Station::new(
        r.get("Poste"),
        r.get::<i64, _>("Capacite") as u32,
        disponibilite,
        Size::parse(&r.get::<String, _>("Taille")),
        &r.get::<String, _>("Restriction"),
    )
}

/// `sqlx::Any` maps booleans inconsistently across Postgres/SQLite
/// backends; read as `i64` and normalize, falling back to a native
/// `bool` read for backends that report one directly.
fn any_bool(r: &sqlx::any::AnyRow, col: &str) -> bool {
    r.try_get::<i64, _>(col).map(|v| v != 0).unwrap_or_else(|_| {
        r.try_get::<bool, _>(col).unwrap_or(false)
    })
}
