//! Configuration file watcher for hot reload.
//!
//! Only the terminator and the debug flag can change while the server runs.
//! Edits to anything else are reported and ignored until restart.
//!
//! The parent directory is watched so saves that replace the file by rename
//! are still seen.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RouterConfig;

/// The part of the configuration a running server picks up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub terminator: String,
    pub debug: bool,
}

impl From<&RouterConfig> for RuntimeSettings {
    fn from(config: &RouterConfig) -> Self {
        Self {
            terminator: config.server.terminator.clone(),
            debug: config.server.debug,
        }
    }
}

/// Fields that differ between `old` and `new` but only apply after a restart.
pub fn restart_required(old: &RouterConfig, new: &RouterConfig) -> Vec<&'static str> {
    let (a, b) = (&old.server, &new.server);
    let checks = [
        ("server.port", a.port != b.port),
        ("server.timeout_secs", a.timeout_secs != b.timeout_secs),
        ("server.bind_mode", a.bind_mode != b.bind_mode),
        ("server.match_mode", a.match_mode != b.match_mode),
        ("server.shutdown_grace_ms", a.shutdown_grace_ms != b.shutdown_grace_ms),
        ("interfaces", old.interfaces != new.interfaces),
        ("paths", old.paths != new.paths),
    ];
    checks
        .into_iter()
        .filter_map(|(field, changed)| changed.then_some(field))
        .collect()
}

/// Watches the config file and forwards changed runtime settings.
pub struct ConfigWatcher {
    path: PathBuf,
    current: RouterConfig,
    update_tx: mpsc::UnboundedSender<RuntimeSettings>,
}

impl ConfigWatcher {
    /// `current` is the configuration the server was started with.
    pub fn new(path: &Path, current: RouterConfig) -> (Self, mpsc::UnboundedReceiver<RuntimeSettings>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching in a background thread. Watching stops when the
    /// returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            current,
            update_tx,
        } = self;
        let mut applied = RuntimeSettings::from(&current);
        let file = path.clone();

        let handler = move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "Watch error");
                    return;
                }
            };
            if !(event.kind.is_modify() || event.kind.is_create()) {
                return;
            }
            if !event.paths.iter().any(|p| p.file_name() == file.file_name()) {
                return;
            }

            let new_config = match load_config(&file) {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reload config, keeping current settings");
                    return;
                }
            };
            for field in restart_required(&current, &new_config) {
                tracing::warn!(field, "Config change needs a restart to take effect");
            }

            let settings = RuntimeSettings::from(&new_config);
            if settings != applied {
                applied = settings.clone();
                let _ = update_tx.send(settings);
            }
        };

        let mut watcher = RecommendedWatcher::new(handler, Config::default().with_poll_interval(Duration::from_secs(2)))?;
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathConfig;

    #[test]
    fn runtime_fields_need_no_restart() {
        let old = RouterConfig::default();
        let mut new = old.clone();
        new.server.terminator = "\n\n".into();
        new.server.debug = true;

        assert!(restart_required(&old, &new).is_empty());
        assert_ne!(RuntimeSettings::from(&old), RuntimeSettings::from(&new));
    }

    #[test]
    fn fixed_fields_are_reported() {
        let old = RouterConfig::default();
        let mut new = old.clone();
        new.server.port = 9090;
        new.paths.push(PathConfig {
            pattern: "/x".into(),
            response: Some("x".into()),
            ..Default::default()
        });

        assert_eq!(restart_required(&old, &new), ["server.port", "paths"]);
    }

    /// Replace the file in one step so the watcher never sees a partial write.
    fn save(path: &Path, content: &str) {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content).unwrap();
        std::fs::rename(&tmp, path).unwrap();
    }

    async fn next_update(updates: &mut mpsc::UnboundedReceiver<RuntimeSettings>) -> RuntimeSettings {
        tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .expect("no settings forwarded")
            .expect("watcher dropped")
    }

    #[tokio::test]
    async fn file_edits_forward_changed_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.toml");
        save(&path, "[server]\nport = 8080\n");

        let (watcher, mut updates) = ConfigWatcher::new(&path, load_config(&path).unwrap());
        let _guard = watcher.run().unwrap();

        save(&path, "[server]\nterminator = \"\\n\\n\"\ndebug = true\n");
        let expected = RuntimeSettings {
            terminator: "\n\n".into(),
            debug: true,
        };
        assert_eq!(next_update(&mut updates).await, expected);

        // Invalid, then unchanged runtime settings: nothing is forwarded
        save(&path, "[server]\ntimeout_secs = 9000\n");
        save(&path, "[server]\nterminator = \"\\n\\n\"\ndebug = true\nport = 9090\n");

        save(&path, "[server]\ndebug = false\n");
        let expected = RuntimeSettings {
            terminator: "\r\n\r\n".into(),
            debug: false,
        };
        assert_eq!(next_update(&mut updates).await, expected);
    }
}
