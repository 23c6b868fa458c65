use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Watches one Markdown document and reports when it changes.
pub struct DocumentWatcher {
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for DocumentWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DocumentWatcher")
    }
}

impl DocumentWatcher {
    /// Watch the file's directory, not the file: editors often save by
    /// replacing it.
    pub fn new(document: &Path, tx: mpsc::Sender<PathBuf>) -> Result<Self> {
        let document = document
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", document.display()))?;
        let dir = document
            .parent()
            .map(Path::to_path_buf)
            .context("Document has no parent directory")?;

        let (sync_tx, sync_rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(sync_tx, Config::default())
            .context("Failed to create file watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;

        // Bridge blocking notify -> async tokio.
        std::thread::spawn(move || {
            for res in sync_rx {
                match res {
                    Ok(event) => {
                        if touches_document(&event, &document)
                            && tx.blocking_send(document.clone()).is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => tracing::error!("Watch error: {:?}", e),
                }
            }
        });

        Ok(Self { _watcher: watcher })
    }
}

/// A content change (write, create, rename) to the watched document.
pub fn touches_document(event: &Event, document: &Path) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_)
    );
    relevant
        && event
            .paths
            .iter()
            .any(|p| p == document || p.file_name() == document.file_name())
}
