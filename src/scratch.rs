//! Local artifact store: per-job scratch workspaces under one root.
//!
//! Every job renders inside its own `<root>/<uuid>/` directory, so two
//! concurrent jobs can request the same output filename without colliding.
//! Uniqueness comes from a random identifier, never a counter. The workspace
//! removes whatever is left of itself when dropped, so scratch space is
//! reclaimed on success and failure alike.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Root of the scratch filesystem area.
///
/// The store only ever hands out paths underneath its root; nothing outside
/// it is read or written.
#[derive(Debug, Clone)]
pub struct ScratchStore {
    root: PathBuf,
}

impl ScratchStore {
    /// Opens (creating if needed) a scratch store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The scratch root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a fresh, uniquely named workspace for one job.
    pub fn workspace(&self) -> io::Result<Workspace> {
        let dir = self.root.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Created scratch workspace");
        Ok(Workspace { dir })
    }
}

/// One job's private scratch directory.
///
/// All intermediates and the final artifact for a job live here. Dropping the
/// workspace removes the directory and anything still in it; removal failure
/// is logged, never raised.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// The workspace directory itself.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of a named file inside the workspace.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// A uniquely named path inside the workspace, for stage intermediates.
    pub fn unique_path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}-{}", Uuid::new_v4(), suffix))
    }

    /// Writes `content` under `name` and returns the full path.
    pub fn save(&self, content: &[u8], name: &str) -> io::Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Deletes a file. Deleting a path that no longer exists is not an error.
    pub fn delete(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(
                    dir = %self.dir.display(),
                    error = %e,
                    "Failed to remove scratch workspace"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_writes_under_workspace() {
        let root = TempDir::new().unwrap();
        let store = ScratchStore::new(root.path()).unwrap();
        let ws = store.workspace().unwrap();

        let path = ws.save(b"<svg/>", "input.svg").unwrap();
        assert!(path.starts_with(root.path()));
        assert_eq!(fs::read(&path).unwrap(), b"<svg/>");
    }

    #[test]
    fn workspaces_never_share_paths() {
        let root = TempDir::new().unwrap();
        let store = ScratchStore::new(root.path()).unwrap();

        let a = store.workspace().unwrap();
        let b = store.workspace().unwrap();
        assert_ne!(a.path("out.png"), b.path("out.png"));
        assert_ne!(a.unique_path("pre.pdf"), a.unique_path("pre.pdf"));
    }

    #[test]
    fn delete_is_idempotent() {
        let root = TempDir::new().unwrap();
        let store = ScratchStore::new(root.path()).unwrap();
        let ws = store.workspace().unwrap();

        let path = ws.save(b"x", "a.json").unwrap();
        ws.delete(&path).unwrap();
        ws.delete(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_workspace_and_contents() {
        let root = TempDir::new().unwrap();
        let store = ScratchStore::new(root.path()).unwrap();

        let dir = {
            let ws = store.workspace().unwrap();
            ws.save(b"x", "kept.pdf").unwrap();
            ws.dir().to_path_buf()
        };
        assert!(!dir.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
