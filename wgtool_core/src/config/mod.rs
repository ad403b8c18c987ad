pub mod load;

use crate::database;
use crate::wireguard::{Provisioner, WgCommand};

use miette::Report;
use owo_colors::OwoColorize;
use sea_orm::DatabaseConnection;

// Config
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

// Error Handling
use log::info;
use wgtool_error::{WgError, WrapError};

pub const MANAGED_DIR: &str = "/var/lib/wgtool";
pub const CONFIG_DIR: &str = "/etc/wgtool";

/*
* The wgtool daemon configuration.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WgToolConfig {
    /// Sqlite database file.
    pub database: Option<PathBuf>,
    /// Where rendered wireguard configurations are written.
    pub wireguard_dir: Option<PathBuf>,
    /// A `RUST_LOG` like filter, used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
}

impl WgToolConfig {
    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) => path.to_owned(),
            None => PathBuf::from(MANAGED_DIR).join("wgtool.sqlite"),
        }
    }
    pub fn wireguard_dir(&self) -> PathBuf {
        match &self.wireguard_dir {
            Some(path) => path.to_owned(),
            None => PathBuf::from(MANAGED_DIR).join("wireguard"),
        }
    }
    /// A provisioner driving this host through `ip` and `wg`.
    pub fn provisioner(&self) -> Provisioner<WgCommand> {
        Provisioner::new(WgCommand::new(&self.wireguard_dir()))
    }
    /*
     * Directories the daemon writes to.
     * The managed directory only shows up through the defaults.
     */
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut directories = vec![self.wireguard_dir()];
        if let Some(parent) = self.database_path().parent() {
            if !directories.iter().any(|e| e == parent) {
                directories.push(parent.to_owned());
            }
        }
        directories
    }
    /// Ensure wgtool working directories exists.
    pub fn ensure_directories(&self) -> Result<(), WgError> {
        for directory in self.directories() {
            if !directory.exists() {
                fs::create_dir_all(&directory)?;
            }
        }
        info!("{} created wgtool filetree.", "[init]".yellow());
        Ok(())
    }
    /// Connect to the database, creating and migrating it if needed.
    pub async fn ensure_database(&self) -> Result<DatabaseConnection, WgError> {
        let path = self.database_path();
        let db = match database::connect_or_fresh_db(&path).await {
            Ok(db) => db,
            Err(e) => {
                let message = format!("Couldn't open the database {}", path.display());
                let help = "Check that the database directory exists and is writable.";
                return Err(WrapError::builder()
                    .msg(&message)
                    .help(help)
                    .origin(Report::new(e))
                    .build()
                    .into());
            }
        };
        info!("{} ensured wgtool database.", "[init]".yellow());
        Ok(db)
    }
}
