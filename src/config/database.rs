//! Database configuration module for the keyed (`SQLite`) store.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{Category, Order, Product};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info};

/// Establishes a connection to the `SQLite` database at `database_url`.
///
/// For file-backed URLs (`sqlite://path/to/file.sqlite?mode=rwc`) the parent directory is
/// created first so a fresh deployment can start without manual setup.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_parent(database_url) {
        debug!("Ensuring database directory {:?} exists", parent);
        tokio::fs::create_dir_all(parent).await?;
    }

    let db = Database::connect(database_url).await?;
    info!("Connected to database");
    Ok(db)
}

/// Creates all necessary tables if they do not exist yet.
///
/// Categories are created before products because products reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Category).await?;
    create_table(db, &schema, Product).await?;
    create_table(db, &schema, Order).await?;

    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}

fn sqlite_file_parent(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}
