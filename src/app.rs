use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::SqliteCatalog;
use crate::cli::{Cli, OutputMode};
use crate::config::Config;
use crate::error::{CsError, Result};
use crate::search::{Embedder, SearchService, build_embedder};

pub struct AppContext {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
    pub catalog: Arc<SqliteCatalog>,
    pub embedder: Arc<dyn Embedder>,
    pub output: OutputMode,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = Self::find_root()?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| default_config_path(&root));
        let config = Config::load(cli.config.as_deref(), &root)?;

        let catalog_path = config
            .catalog
            .path
            .clone()
            .unwrap_or_else(|| root.join("catalog.db"));
        tracing::debug!(root = %root.display(), catalog = %catalog_path.display(), "opening catalog");

        Ok(Self {
            catalog: Arc::new(SqliteCatalog::open(&catalog_path)?),
            embedder: build_embedder(&config.embedding)?,
            root,
            config_path,
            config,
            output: cli.output_mode(),
            verbosity: cli.verbose,
        })
    }

    #[must_use]
    pub const fn robot_mode(&self) -> bool {
        matches!(self.output, OutputMode::Robot)
    }

    /// Search service wired to this context's catalog and embedder.
    #[must_use]
    pub fn search_service(&self) -> SearchService {
        SearchService::new(
            self.catalog.clone(),
            Arc::clone(&self.embedder),
            &self.config.search,
        )
    }

    fn find_root() -> Result<PathBuf> {
        if let Ok(root) = std::env::var("CS_ROOT") {
            return Ok(PathBuf::from(root));
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| CsError::MissingConfig("data directory not found".to_string()))?;
        Ok(data_dir.join("campus-search"))
    }
}

fn default_config_path(root: &Path) -> PathBuf {
    let project = root.join("config.toml");
    if project.exists() {
        return project;
    }
    dirs::config_dir()
        .map_or(project, |dir| dir.join("campus-search/config.toml"))
}
