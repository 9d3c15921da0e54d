//! Project storage abstraction
//!
//! The editing engine never talks to a concrete backend directly: everything
//! it persists goes through [`ProjectStore`]. Failures propagate to the
//! caller unmodified; retry policy belongs to whoever schedules the writes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{StoreError, StoreResult};

/// Storage backend for project files
///
/// Paths are project-relative, `/`-separated strings. `list` returns them in
/// a stable (lexicographic) order.
pub trait ProjectStore: Send + Sync {
    /// Write a file, replacing any previous content
    fn save(&self, project: &str, path: &str, bytes: &[u8], content_type: &str) -> StoreResult<()>;

    /// Read a file; `None` if it does not exist
    fn load(&self, project: &str, path: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Move a file to a new path within the same project
    fn rename(&self, project: &str, old_path: &str, new_path: &str) -> StoreResult<()>;

    /// Delete a file
    fn remove(&self, project: &str, path: &str) -> StoreResult<()>;

    /// List all file paths in a project
    fn list(&self, project: &str) -> StoreResult<Vec<String>>;
}

#[derive(Debug, Clone)]
struct StoredFile {
    bytes: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
}

/// In-memory store, for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<(String, String), StoredFile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryStore {
    fn save(&self, project: &str, path: &str, bytes: &[u8], content_type: &str) -> StoreResult<()> {
        let mut files = self.files.lock().unwrap();
        files.insert(
            (project.to_string(), path.to_string()),
            StoredFile {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn load(&self, project: &str, path: &str) -> StoreResult<Option<Vec<u8>>> {
        let files = self.files.lock().unwrap();
        Ok(files
            .get(&(project.to_string(), path.to_string()))
            .map(|f| f.bytes.clone()))
    }

    fn rename(&self, project: &str, old_path: &str, new_path: &str) -> StoreResult<()> {
        let mut files = self.files.lock().unwrap();
        let old_key = (project.to_string(), old_path.to_string());
        let file = files
            .remove(&old_key)
            .ok_or_else(|| StoreError::NotFound(old_path.to_string()))?;
        files.insert((project.to_string(), new_path.to_string()), file);
        Ok(())
    }

    fn remove(&self, project: &str, path: &str) -> StoreResult<()> {
        let mut files = self.files.lock().unwrap();
        files
            .remove(&(project.to_string(), path.to_string()))
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        Ok(())
    }

    fn list(&self, project: &str) -> StoreResult<Vec<String>> {
        let files = self.files.lock().unwrap();
        Ok(files
            .keys()
            .filter(|(p, _)| p == project)
            .map(|(_, path)| path.clone())
            .collect())
    }
}

/// Directory-backed store: one subdirectory per project under `root`
///
/// The content type is not persisted separately; on disk it is implied by
/// the file extension.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, project: &str, path: &str) -> PathBuf {
        let mut full = self.root.join(project);
        for part in path.split('/').filter(|p| !p.is_empty()) {
            full.push(part);
        }
        full
    }
}

impl ProjectStore for DirStore {
    fn save(&self, project: &str, path: &str, bytes: &[u8], _content_type: &str) -> StoreResult<()> {
        let full = self.file_path(project, path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, bytes)?;
        Ok(())
    }

    fn load(&self, project: &str, path: &str) -> StoreResult<Option<Vec<u8>>> {
        let full = self.file_path(project, path);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn rename(&self, project: &str, old_path: &str, new_path: &str) -> StoreResult<()> {
        let old_full = self.file_path(project, old_path);
        if !old_full.exists() {
            return Err(StoreError::NotFound(old_path.to_string()));
        }
        let new_full = self.file_path(project, new_path);
        if let Some(parent) = new_full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&old_full, &new_full)?;
        Ok(())
    }

    fn remove(&self, project: &str, path: &str) -> StoreResult<()> {
        let full = self.file_path(project, path);
        if !full.exists() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        std::fs::remove_file(&full)?;
        Ok(())
    }

    fn list(&self, project: &str) -> StoreResult<Vec<String>> {
        let dir = self.root.join(project);
        let mut paths = Vec::new();
        if dir.is_dir() {
            collect_files(&dir, String::new(), &mut paths)?;
        }
        paths.sort();
        Ok(paths)
    }
}

fn collect_files(dir: &Path, prefix: String, out: &mut Vec<String>) -> StoreResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };
        if entry.file_type()?.is_dir() {
            collect_files(&entry.path(), rel, out)?;
        } else {
            out.push(rel);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        store
            .save("site", "pages/index.html", b"<html>", "text/html")
            .unwrap();

        let bytes = store.load("site", "pages/index.html").unwrap();
        assert_eq!(bytes.as_deref(), Some(b"<html>".as_slice()));
        assert!(store.load("site", "missing.html").unwrap().is_none());
    }

    #[test]
    fn memory_store_rename_and_remove() {
        let store = MemoryStore::new();
        store.save("site", "a.html", b"a", "text/html").unwrap();
        store.rename("site", "a.html", "b.html").unwrap();

        assert!(store.load("site", "a.html").unwrap().is_none());
        assert_eq!(store.load("site", "b.html").unwrap(), Some(b"a".to_vec()));

        store.remove("site", "b.html").unwrap();
        assert!(matches!(
            store.remove("site", "b.html"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn memory_store_list_is_ordered_and_scoped() {
        let store = MemoryStore::new();
        store.save("site", "pages/b.html", b"", "text/html").unwrap();
        store.save("site", "pages/a.html", b"", "text/html").unwrap();
        store.save("other", "x.html", b"", "text/html").unwrap();

        assert_eq!(
            store.list("site").unwrap(),
            vec!["pages/a.html".to_string(), "pages/b.html".to_string()]
        );
    }

    #[test]
    fn dir_store_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirStore::new(tmp.path());

        store
            .save("site", "pages/index.html", b"<html>", "text/html")
            .unwrap();
        assert_eq!(
            store.load("site", "pages/index.html").unwrap(),
            Some(b"<html>".to_vec())
        );

        store
            .rename("site", "pages/index.html", "pages/home.html")
            .unwrap();
        assert!(store.load("site", "pages/index.html").unwrap().is_none());

        assert_eq!(store.list("site").unwrap(), vec!["pages/home.html"]);

        store.remove("site", "pages/home.html").unwrap();
        assert!(store.list("site").unwrap().is_empty());
    }
}
