//! Config path resolution
//!
//! Everything strafe reads lives in a `strafe/` directory next to the host
//! executable.

use std::path::{Path, PathBuf};

use super::{ConfigError, ConfigResult};

/// Directory name next to the executable
const DIR_NAME: &str = "strafe";

/// Returns `<exe dir>/strafe/`
pub fn base_dir() -> ConfigResult<PathBuf> {
    let exe = std::env::current_exe().map_err(ConfigError::IoError)?;
    base_dir_for(&exe).ok_or(ConfigError::NoConfigDirectory)
}

fn base_dir_for(exe: &Path) -> Option<PathBuf> {
    exe.parent().map(|dir| dir.join(DIR_NAME))
}

/// Path: `<exe dir>/strafe/strafe.toml`
pub fn config_path() -> ConfigResult<PathBuf> {
    Ok(base_dir()?.join("strafe.toml"))
}

/// Path: `<exe dir>/strafe/gamedata.json`
pub fn gamedata_path() -> ConfigResult<PathBuf> {
    Ok(base_dir()?.join("gamedata.json"))
}
