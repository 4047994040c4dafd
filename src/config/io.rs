use std::env::current_exe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use directories_next::ProjectDirs;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use serde_json;
use fd_lock::{RwLock, RwLockWriteGuard};
use log::{debug, info, warn};
use std::fs::OpenOptions;
use std::str;

use crate::config::types::Config;
use crate::error::ConfigError;

// <exe>.json next to the executable, for running from a usb stick
fn get_portable_config_path() -> Option<PathBuf> {
    match current_exe() {
        Ok(mut path) => {
            if !path.set_extension("json") {
                warn!("current exe has no filename: {}", path.to_string_lossy());
                return None
            }

            Some(path)
        },
        Err(err) => {
            warn!("failed to get current exe path: {:?}", err);
            None
        },
    }
}

// ble-broadcast.json in an os dependent standard directory, such as %AppData% on windows.
fn get_local_config_path() -> Option<PathBuf> {
    ProjectDirs::from("study", "boringkm", "ble-broadcast").map(|dirs| {
        dirs.config_dir().join("ble-broadcast.json")
    })
}

fn get_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = get_portable_config_path() {
        match std::fs::metadata(&path) {
            Ok(attr) if attr.is_file() => return Ok(path),
            Ok(_) => {},
            Err(err) => {
                debug!("No portable config at {}; Using local path instead. ({:?})", path.to_string_lossy(), err);
            },
        }
    }

    match get_local_config_path() {
        None => Err(ConfigError::NoConfigPath),
        Some(path) => Ok(path),
    }
}

pub struct ConfigIOLocker {
    rw_lock: RwLock<std::fs::File>,
}

impl ConfigIOLocker {
    /// Holding the returned guard marks this process as the one driving the radio.
    pub fn lock(&mut self) -> Result<RwLockWriteGuard<std::fs::File>, ConfigError> {
        self.rw_lock.try_write().map_err(|source| ConfigError::CanNotLock { source })
    }
}

struct ConfigIOInner {
    path: PathBuf,
    file: std::fs::File,
}

#[derive(Clone)]
pub struct ConfigIO {
    inner: Arc<Mutex<ConfigIOInner>>,
}

impl ConfigIO {
    /// Opens (creating if needed) the config file at `path`, or at the default location.
    pub fn new_sync(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path,
            None => get_config_path()?,
        };
        info!("Using config file {}", path.to_string_lossy());

        if let Some(directory) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(directory)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .truncate(false)
            .append(false)
            .create(true)
            .open(&path)?;

        let inner = ConfigIOInner {
            path,
            file,
        };
        Ok(ConfigIO { inner: Arc::new(Mutex::new(inner)) })
    }

    pub fn path(&self) -> PathBuf {
        let inner = self.inner.lock().expect("Failed to lock ConfigIO inner");
        inner.path.clone()
    }

    pub fn is_empty(&self) -> Result<bool, ConfigError> {
        let inner = self.inner.lock().expect("Failed to lock ConfigIO inner");
        Ok(inner.file.metadata()?.len() == 0)
    }

    pub fn locker(&self) -> Result<ConfigIOLocker, ConfigError> {
        let inner = self.inner.lock().expect("Failed to lock ConfigIO inner");

        Ok(ConfigIOLocker {
            rw_lock: RwLock::new(inner.file.try_clone()?),
        })
    }

    // The File returned from here should never be closed!
    fn get_file(&self) -> Result<File, ConfigError> {
        let inner = self.inner.lock().expect("Failed to lock ConfigIO inner");
        let file = inner.file.try_clone()?; // std File
        Ok(File::from_std(file)) // tokio File
    }

    /// An empty file yields the default config.
    pub async fn read(&self) -> Result<Config, ConfigError> {
        let mut file = self.get_file()?;
        debug!("Reading config file");

        let mut content = vec![];
        file.rewind().await?;
        file.read_to_end(&mut content).await?;

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Config::default());
        }

        let content = str::from_utf8(&content)?;

        let mut config: Config = serde_json::from_str(content)?;
        config.validate()?;
        config.normalize();
        Ok(config)
    }

    pub async fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let mut file = self.get_file()?;
        debug!("Saving config");

        let content = serde_json::to_string_pretty(config)?;
        file.rewind().await?;
        file.set_len(0).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::types::RepeatStartPolicy;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ble-broadcast-test-{}", std::process::id()))
            .join(format!("{}.json", name))
    }

    #[tokio::test]
    async fn empty_file_reads_as_default() {
        let path = temp_config_path("empty");
        let _ = std::fs::remove_file(&path);

        let config_io = ConfigIO::new_sync(Some(path.clone())).unwrap();

        assert!(config_io.is_empty().unwrap());
        assert_eq!(config_io.read().await.unwrap(), Config::default());
        assert_eq!(config_io.path(), path);
    }

    #[tokio::test]
    async fn saved_config_is_read_back() {
        let path = temp_config_path("saved");
        let _ = std::fs::remove_file(&path);
        let config_io = ConfigIO::new_sync(Some(path.clone())).unwrap();

        let config = Config {
            scan_period_ms: 5000,
            repeat_start: RepeatStartPolicy::Reject,
            ..Config::default()
        };
        config_io.save(&config).await.unwrap();
        assert!(!config_io.is_empty().unwrap());
        // every save replaces the whole file
        config_io.save(&Config::default()).await.unwrap();
        config_io.save(&config).await.unwrap();

        assert_eq!(config_io.read().await.unwrap(), config);
        let reopened = ConfigIO::new_sync(Some(path)).unwrap();
        assert_eq!(reopened.read().await.unwrap(), config);
    }

    #[tokio::test]
    async fn invalid_scan_period_fails_to_read() {
        let path = temp_config_path("invalid");
        let _ = std::fs::remove_file(&path);
        let config_io = ConfigIO::new_sync(Some(path)).unwrap();

        config_io.save(&Config { scan_period_ms: 0, ..Config::default() }).await.unwrap();

        assert!(matches!(config_io.read().await, Err(ConfigError::InvalidScanPeriod)));
    }
}
