use std::path::PathBuf;

const CACHE_DIR_NAME: &str = "airbox_cache";

/// `<system cache dir>/airbox_cache`, if the platform has a cache dir.
pub fn get_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join(CACHE_DIR_NAME))
}
