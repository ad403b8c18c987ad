use wgtool_core::topology::NodeRecord;
use wgtool_core::WgToolConfig;

use env_logger::{Builder, Env};
use owo_colors::OwoColorize;

// Error Handling
use log::{info, trace};
use miette::Result;

/**
The binary entrypoint.
Loads the configuration, sets up logging,
and ensures the wgtool filetree and database.
*/
#[tokio::main]
async fn main() -> Result<()> {
    make_handler()?;
    let config = WgToolConfig::get()?;

    // RUST_LOG first, then the configured level.
    let level = config.log_level.clone().unwrap_or("info".to_owned());
    Builder::from_env(Env::default().default_filter_or(level)).init();
    trace!("Launch process.");

    config.ensure_directories()?;
    let db = config.ensure_database().await?;

    let nodes = NodeRecord::get_all(&db).await?;
    let uplinks = nodes.iter().filter(|e| e.is_uplink).count();
    info!(
        "{} wgtool started with {} node(s), {} uplink(s).",
        "[start]".green(),
        nodes.len(),
        uplinks
    );
    trace!("Process clean exit.");
    Ok(())
}

/**
The make handler functions is executed right after the main function
to set up a verbose and colorful error/panic handler.
*/
pub fn make_handler() -> Result<()> {
    miette::set_panic_hook();
    Ok(())
}
