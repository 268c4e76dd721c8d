use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::settings::error::{Result, SettingsError};
use crate::settings::types::PipelineSettings;

/// Persistent pipeline settings with debounced saving.
pub struct SettingsStore {
    path: PathBuf,
    data: Mutex<PipelineSettings>,
    save_notify: Notify,
    is_dirty: AtomicBool,
}

impl SettingsStore {
    /// Open the store at `path`, loading and validating the file if it exists.
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = Self::load(&path)?;
        data.validate()?;
        Ok(Self {
            path,
            data: Mutex::new(data),
            save_notify: Notify::new(),
            is_dirty: AtomicBool::new(false),
        })
    }

    /// Load settings from a JSON file, returning defaults on a missing file.
    pub fn load(path: &Path) -> Result<PipelineSettings> {
        if !path.exists() {
            return Ok(PipelineSettings::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save current settings to disk atomically (write .tmp then rename).
    pub fn save(&self) -> Result<()> {
        let data = self.data.lock().clone();
        let json = serde_json::to_string_pretty(&data).map_err(SettingsError::Serialise)?;
        let io_err = |source: std::io::Error| SettingsError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(io_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        Ok(())
    }

    /// Snapshot of the current settings.
    pub fn get(&self) -> PipelineSettings {
        self.data.lock().clone()
    }

    /// Remember the device bound last, so the next run binds it again.
    /// Triggers a debounced save.
    pub fn set_device_path(&self, path: Option<String>) {
        {
            let mut data = self.data.lock();
            if data.device_path == path {
                return;
            }
            data.device_path = path;
        }
        self.mark_dirty();
    }

    fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Release);
        self.save_notify.notify_one();
    }

    /// Save now if anything changed since the last save.
    pub fn flush(&self) -> Result<()> {
        if self.is_dirty.swap(false, Ordering::AcqRel) {
            self.save()?;
        }
        Ok(())
    }

    /// Start the debounce task — waits for dirty notification, sleeps 500ms, then saves.
    ///
    /// Uses an `AtomicBool` dirty flag to avoid losing notifications that arrive
    /// between `save()` completing and `notified().await` re-registering.
    /// Must be called from within a tokio runtime.
    pub fn start_debounce_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                store.save_notify.notified().await;
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                if let Err(e) = store.flush() {
                    tracing::warn!("Failed to save settings: {e}");
                }
            }
        })
    }
}
