pub mod chat;
pub mod config_cmd;
pub mod export;
pub mod init;
pub mod layout;
pub mod pack;
pub mod serve;
pub mod status;

use bentofolio_config::AppConfig;
use bentofolio_core::PortfolioStore;
use bentofolio_storage::{FileMediaStore, JsonFileRepository};
use std::path::{Path, PathBuf};

/// Load the config from `path`, or the default location with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env();
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}

pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map_or_else(AppConfig::config_path, Path::to_path_buf)
}

/// The stored portfolio of the configured identity plus its collaborators.
pub struct Session {
    pub store: PortfolioStore,
    pub repository: JsonFileRepository,
    pub media: FileMediaStore,
    pub found: bool,
}

impl Session {
    pub async fn open(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let repository = JsonFileRepository::new(&config.storage.data_dir);
        let media = FileMediaStore::new(&config.storage.assets_dir);
        let store = PortfolioStore::default();
        let found = bentofolio_gateway::load_portfolio(
            &store,
            &repository,
            &config.storage.identity,
            config.grid.grid_config(),
        )
        .await?;
        Ok(Self { store, repository, media, found })
    }
}
