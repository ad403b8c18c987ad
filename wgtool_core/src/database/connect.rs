// Sea orm
use sea_orm::{Database, DatabaseConnection};
use std::path::Path;
use wgtool_migration::{Migrator, MigratorTrait};

// Error Handling
use log::{debug, info};
use wgtool_error::WgError;

/// Sqlite url of a database file, created if missing.
pub fn get_database_url(path: &Path) -> Result<String, WgError> {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    Ok(url)
}

pub async fn connect_db(url: &str) -> Result<DatabaseConnection, WgError> {
    debug!("connecting to database {}", url);
    let db = Database::connect(url).await;
    match db {
        Err(e) => Err(e.into()),
        Ok(db) => Ok(db),
    }
}

/*
* Connect to the database file,
* and bring its tables up to date.
*/
pub async fn connect_or_fresh_db(path: &Path) -> Result<DatabaseConnection, WgError> {
    if !path.exists() {
        info!("creating database {}", path.display());
    }
    let db = connect_db(&get_database_url(path)?).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/*
* Create a fresh database and ovewrite the old one.
*/
pub async fn fresh_db(path: &Path) -> Result<DatabaseConnection, WgError> {
    let db = connect_db(&get_database_url(path)?).await?;
    Migrator::fresh(&db).await?;
    Ok(db)
}

/// A migrated in-memory database.
pub async fn connect_memory_db() -> Result<DatabaseConnection, WgError> {
    let db = connect_db("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}
