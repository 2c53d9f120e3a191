use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub database_path: String,
    pub uploads_dir: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_size: usize,
    pub render_timeout_secs: u64,
    pub resume_retention_secs: u64,
    pub resume_sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:9080".to_string(),
            database_path: "./cirqle.sqlite3".to_string(),
            uploads_dir: "./uploads".to_string(),
            allowed_origins: vec!["*".to_string()],
            max_upload_size: 20 * 1024 * 1024,
            render_timeout_secs: 30,
            resume_retention_secs: 24 * 60 * 60,
            resume_sweep_interval_secs: 60 * 60,
        }
    }
}

impl Config {
    /// Reads `path`, or writes the defaults there when it does not exist yet.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
        } else {
            let default_config = Config::default();
            let toml_string = toml::to_string_pretty(&default_config)
                .context("failed to serialize default config")?;
            std::fs::write(path, toml_string)
                .with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("wrote default configuration to {}", path.display());
            Ok(default_config)
        }
    }

    pub fn from_env_config() -> anyhow::Result<Self> {
        let path = std::env::var("CIRQLE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let cfg = Self::load_from(Path::new(&path))?;
        std::fs::create_dir_all(&cfg.uploads_dir)
            .with_context(|| format!("create uploads dir {}", cfg.uploads_dir))?;
        Ok(cfg)
    }

    pub fn uploads_path(&self) -> PathBuf {
        PathBuf::from(&self.uploads_dir)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn resume_retention(&self) -> Duration {
        Duration::from_secs(self.resume_retention_secs)
    }

    pub fn resume_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.resume_sweep_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.uploads_dir, "./uploads");

        let again = Config::load_from(&path).unwrap();
        assert_eq!(again.listen, cfg.listen);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "uploads_dir = \"/srv/uploads\"\nrender_timeout_secs = 5\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.uploads_dir, "/srv/uploads");
        assert_eq!(cfg.render_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.resume_retention_secs, 24 * 60 * 60);
    }
}
