use sqlx::AnyPool;

/// Creates the authoritative-store tables the catalog reads from, if absent.
///
/// Column names match the interface documented for the upstream database:
/// `Client(ID, Distance)`, `Pizza(Nom, Taille, Composition, TPsProd, Prix)`,
/// `Production(Poste, Capacite, Disponibilite, Taille, Restriction)`.
pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS Client (
  ID INTEGER PRIMARY KEY,
  Distance INTEGER NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS Pizza (
  Nom TEXT NOT NULL,
  Taille TEXT NOT NULL,
  Composition TEXT NOT NULL,
  TPsProd INTEGER NOT NULL,
  Prix DOUBLE PRECISION NOT NULL,
  PRIMARY KEY (Nom, Taille)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS Production (
  Poste INTEGER PRIMARY KEY,
  Capacite INTEGER NOT NULL,
  Disponibilite BOOLEAN NOT NULL,
  Taille TEXT NOT NULL,
  Restriction TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
