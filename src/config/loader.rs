use super::SolveConfig;
use anyhow::{anyhow, Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::fs;
use tokio::sync::mpsc;

/// Loads a configuration file and keeps the parsed document behind a
/// shared handle, optionally re-parsing it when the file changes.
#[derive(Debug)]
pub struct ConfigLoader {
    config: Arc<RwLock<SolveConfig>>,
    path: PathBuf,
    watcher: Option<notify::RecommendedWatcher>,
    reload_tx: Option<mpsc::Sender<PathBuf>>,
}

impl ConfigLoader {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = read_config(&path).await?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            path,
            watcher: None,
            reload_tx: None,
        })
    }

    pub async fn enable_hot_reload(&mut self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel(10);
        self.reload_tx = Some(tx);

        let config = self.config.clone();
        tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                match read_config(&path).await {
                    Ok(reloaded) => {
                        let mut cfg = config.write().unwrap();
                        *cfg = reloaded;
                        tracing::info!("Reloaded configuration from {}", path.display());
                    }
                    Err(e) => {
                        // Keep serving the previous document on a bad edit.
                        tracing::warn!("Ignoring invalid configuration update: {e:#}");
                    }
                }
            }
        });

        Ok(())
    }

    pub fn watch_config_file(&mut self) -> Result<()> {
        let tx = self
            .reload_tx
            .clone()
            .ok_or_else(|| anyhow!("Hot reload not enabled"))?;

        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if matches!(event.kind, EventKind::Modify(_)) {
                        for path in event.paths {
                            if path
                                .extension()
                                .is_some_and(|ext| ext == "yaml" || ext == "yml")
                            {
                                let _ = tx.blocking_send(path);
                            }
                        }
                    }
                }
            })?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        self.watcher = Some(watcher);

        Ok(())
    }

    pub fn get_config(&self) -> SolveConfig {
        self.config.read().unwrap().clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn read_config(path: &Path) -> Result<SolveConfig> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut config = SolveConfig::from_yaml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.merge_env_vars();
    config.resolve();
    Ok(config)
}
