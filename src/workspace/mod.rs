//! Per-request working directories.
//!
//! Each request gets its own `mashup-<id>` directory under the configured
//! root, so concurrent pipelines never share staging files.

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::validation::Variant;

pub const DOWNLOADS_DIR: &str = "downloads";
pub const AUDIOS_DIR: &str = "audios";
pub const TRIMMED_DIR: &str = "trimmed";
pub const OUTPUT_DIR: &str = "output";

/// Transient directory set for one pipeline run
#[derive(Debug, Clone)]
pub struct Workspace {
    id: Uuid,
    base: PathBuf,
    dirs: Vec<&'static str>,
}

impl Workspace {
    /// Allocate a fresh workspace under `root` (nothing is created until `prepare`)
    pub fn new(root: impl AsRef<Path>, variant: Variant) -> Self {
        let id = Uuid::new_v4();
        let base = root.as_ref().join(format!("mashup-{}", id));
        Self {
            id,
            base,
            dirs: layout(variant).to_vec(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Directory holding this request's subdirectories
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn downloads(&self) -> PathBuf {
        self.base.join(DOWNLOADS_DIR)
    }

    pub fn audios(&self) -> PathBuf {
        self.base.join(AUDIOS_DIR)
    }

    pub fn trimmed(&self) -> PathBuf {
        self.base.join(TRIMMED_DIR)
    }

    pub fn output(&self) -> PathBuf {
        self.base.join(OUTPUT_DIR)
    }

    /// Names of the directories managed for this layout, in creation order
    pub fn dir_names(&self) -> &[&'static str] {
        &self.dirs
    }

    /// Remove any stale copy of each directory and recreate it empty
    pub fn prepare(&self) -> Result<()> {
        for name in &self.dirs {
            let dir = self.base.join(name);
            remove_dir_if_present(&dir)?;
            fs_err::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        tracing::debug!("Prepared workspace {} ({})", self.id, self.dirs.join(", "));
        Ok(())
    }

    /// Remove every directory of the layout; safe to call repeatedly or before `prepare`
    pub fn teardown(&self) -> Result<()> {
        for name in &self.dirs {
            remove_dir_if_present(&self.base.join(name))?;
        }
        remove_dir_if_present(&self.base)?;

        tracing::debug!("Removed workspace {}", self.id);
        Ok(())
    }
}

fn layout(variant: Variant) -> &'static [&'static str] {
    match variant {
        Variant::Cli => &[DOWNLOADS_DIR, AUDIOS_DIR, TRIMMED_DIR],
        Variant::Web => &[DOWNLOADS_DIR, AUDIOS_DIR, TRIMMED_DIR, OUTPUT_DIR],
    }
}

/// Remove whatever occupies `path`; a path that cannot be looked up has nothing to remove
fn remove_dir_if_present(path: &Path) -> Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                tracing::debug!("Nothing to remove at {}: {}", path.display(), e);
            }
            return Ok(());
        }
    };

    let removed = if metadata.is_dir() {
        fs_err::remove_dir_all(path)
    } else {
        fs_err::remove_file(path)
    };

    match removed {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_creates_empty_directories() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(root.path(), Variant::Web);
        workspace.prepare().unwrap();

        for name in workspace.dir_names() {
            let dir = workspace.base().join(name);
            assert!(dir.is_dir());
            assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        }
        assert!(workspace.output().is_dir());
    }

    #[test]
    fn test_prepare_clears_stale_files() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(root.path(), Variant::Cli);
        workspace.prepare().unwrap();
        std::fs::write(workspace.downloads().join("stale.mp3"), b"old").unwrap();

        workspace.prepare().unwrap();
        assert_eq!(std::fs::read_dir(workspace.downloads()).unwrap().count(), 0);
    }

    #[test]
    fn test_cli_layout_has_no_output_dir() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(root.path(), Variant::Cli);
        assert_eq!(workspace.dir_names(), &[DOWNLOADS_DIR, AUDIOS_DIR, TRIMMED_DIR]);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(root.path(), Variant::Web);

        // Never prepared
        workspace.teardown().unwrap();

        workspace.prepare().unwrap();
        std::fs::write(workspace.trimmed().join("trimmed_a.mp3"), b"x").unwrap();
        workspace.teardown().unwrap();
        workspace.teardown().unwrap();

        assert!(!workspace.base().exists());
    }

    #[test]
    fn test_teardown_after_interrupted_prepare() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(root.path(), Variant::Web);

        // Only the first directory made it, plus a stray file where the next one goes
        std::fs::create_dir_all(workspace.downloads()).unwrap();
        std::fs::write(workspace.downloads().join("partial.mp3.part"), b"x").unwrap();
        std::fs::write(workspace.audios(), b"not a directory").unwrap();

        workspace.teardown().unwrap();
        assert!(!workspace.base().exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_replaces_stray_file() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(root.path(), Variant::Cli);
        std::fs::create_dir_all(workspace.base()).unwrap();
        std::fs::write(workspace.trimmed(), b"stale").unwrap();

        workspace.prepare().unwrap();
        assert!(workspace.trimmed().is_dir());
    }

    #[test]
    fn test_failed_prepare_leaves_nothing_to_tear_down() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, b"file").unwrap();
        let workspace = Workspace::new(&root, Variant::Cli);

        assert!(workspace.prepare().is_err());
        workspace.teardown().unwrap();
        assert!(root.is_file());
    }

    #[test]
    fn test_workspaces_are_unique_per_request() {
        let root = tempfile::tempdir().unwrap();
        let first = Workspace::new(root.path(), Variant::Web);
        let second = Workspace::new(root.path(), Variant::Web);
        assert_ne!(first.base(), second.base());

        first.prepare().unwrap();
        second.prepare().unwrap();
        first.teardown().unwrap();
        assert!(second.downloads().is_dir());
    }
}
