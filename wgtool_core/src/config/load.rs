use super::WgToolConfig;

// Config
use std::fs;
use std::path::{Path, PathBuf};

// Error Handling
use log::{debug, info};
use wgtool_error::{CastError, TomlError, WgError};

impl WgToolConfig {
    /*
     * Get config from crate directory
     */
    fn debug_path() -> PathBuf {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("wgtool.config.toml");
        path
    }
    /*
     * Get config from FHS path.
     */
    fn release_path() -> PathBuf {
        PathBuf::from(super::CONFIG_DIR).join("config.toml")
    }
    /// Read the configuration file, or fall back to defaults when there is none.
    pub fn get() -> Result<Self, WgError> {
        info!("Search config file.");

        #[cfg(debug_assertions)]
        let path = Self::debug_path();

        #[cfg(not(debug_assertions))]
        let path = Self::release_path();

        if !path.exists() {
            debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }
    pub fn from_file(path: &Path) -> Result<Self, WgError> {
        let string = fs::read_to_string(path)?;
        Self::from_toml(&string)
    }
    pub fn from_toml(string: &str) -> Result<Self, WgError> {
        let res = toml::from_str::<Self>(string);
        let item = match res {
            Ok(res) => res,
            Err(e) => {
                let err = CastError::TomlError(TomlError::new(e, string));
                return Err(err.into());
            }
        };
        Ok(item)
    }
}
