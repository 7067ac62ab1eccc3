use std::path::PathBuf;
use std::sync::Arc;

use crate::allocator::DutyAllocator;
use crate::config::Config;
use crate::core::persist::{load_state_or_default, save_state};
use crate::core::store::MemoryStore;
use crate::errors::Result;
use crate::logging::LogSettings;

#[derive(Debug)]
pub struct AppContext {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl AppContext {
    pub fn new_with_paths(
        config_path: PathBuf,
        state_path: PathBuf,
        logs_dir: PathBuf,
    ) -> Result<Self> {
        let config = Config::load_from(&config_path)?;
        let store = Arc::new(load_state_or_default(&state_path)?);
        Ok(Self {
            config,
            store,
            config_path,
            state_path,
            logs_dir,
        })
    }

    /// An allocator over the shared store with the current policy snapshot.
    pub fn allocator(&self) -> DutyAllocator<MemoryStore> {
        DutyAllocator::new(Arc::clone(&self.store), self.config.allocation_policy())
    }

    pub fn log_settings(&self) -> LogSettings {
        self.config.log_settings(&self.logs_dir)
    }

    pub fn save(&self) -> Result<PathBuf> {
        save_state(&self.store, &self.state_path)
    }
}
