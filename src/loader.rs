use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex, OnceLock};

use tracing::{error, info};

use crate::config::Configuration;
use crate::error::Result;

/// Fixed config location, relative to the working directory.
pub const CONFIG_FILE: &str = "config.json";

static GLOBAL: LazyLock<ConfigLoader> = LazyLock::new(|| ConfigLoader::new(CONFIG_FILE));

/// Loads a configuration file at most once and hands out the cached record.
///
/// Concurrent first callers block on the same load; once populated, reads
/// go through the `OnceLock` without locking. A failed load is not cached.
pub struct ConfigLoader {
    path: PathBuf,
    config: OnceLock<Configuration>,
    init: Mutex<()>,
    reads: AtomicUsize,
}

impl ConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: OnceLock::new(),
            init: Mutex::new(()),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<&Configuration> {
        if let Some(config) = self.config.get() {
            return Ok(config);
        }

        // a poisoned guard only means another loader panicked; the cell is still consistent
        let _guard = self.init.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(config) = self.config.get() {
            return Ok(config);
        }

        let attempt = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        info!("load config, path={}, attempt={attempt}", self.path.display());
        let config = Configuration::from_file(&self.path)?;
        Ok(self.config.get_or_init(|| config))
    }

    /// The cached record, if a load has already succeeded.
    pub fn get(&self) -> Option<&Configuration> {
        self.config.get()
    }

    /// How many times the file has been opened, failed attempts included.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// Load `config.json` from the working directory once per process.
pub fn load_config() -> Result<&'static Configuration> {
    GLOBAL.load()
}

/// Startup variant of [`load_config`]: the bot cannot run without its
/// configuration, so any failure is logged and ends the process.
pub fn load_config_or_exit() -> &'static Configuration {
    match load_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_second_load_returns_cached_record() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"api_key":"first","gpt_limit_per_minute":7}"#);
        let loader = ConfigLoader::new(&path);
        assert!(loader.get().is_none());

        let first = loader.load().unwrap();
        fs::write(&path, r#"{"api_key":"second","gpt_limit_per_minute":9}"#).unwrap();
        let second = loader.load().unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(loader.reads(), 1);
        assert_eq!(second.api_key, "first");
        assert_eq!(second.gpt_limit_per_minute, 7);
        assert!(loader.get().is_some());
    }

    #[test]
    fn test_file_removed_after_load_is_not_reread() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"api_key":"k"}"#);
        let loader = ConfigLoader::new(&path);
        loader.load().unwrap();

        fs::remove_file(&path).unwrap();
        assert_eq!(loader.load().unwrap().api_key, "k");
    }

    #[test]
    fn test_failed_load_is_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let loader = ConfigLoader::new(&path);
        assert!(loader.load().is_err());
        assert!(loader.get().is_none());

        fs::write(&path, r#"{"api_key":"late"}"#).unwrap();
        assert_eq!(loader.load().unwrap().api_key, "late");
        assert_eq!(loader.reads(), 2);
    }

    #[test]
    fn test_path() {
        let loader = ConfigLoader::new("conf/bot.json");
        assert_eq!(loader.path(), Path::new("conf/bot.json"));
    }
}
