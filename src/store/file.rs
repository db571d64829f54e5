//! JSON file store backend

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::StoreBackend;

/// Persists the whole key space as one JSON object in a single file.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StoreBackend for JsonFileBackend {
    fn load(&mut self) -> io::Result<HashMap<String, Value>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|err| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("corrupt store file {}: {err}", self.path.display()),
                )
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err),
        }
    }

    fn flush(&mut self, data: &HashMap<String, Value>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let encoded = serde_json::to_vec_pretty(data)?;
        // Write to a sibling then rename so a crash never leaves a torn file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreHandle;
    use serde_json::json;

    #[test]
    fn test_reopen_restores_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");

        let store = StoreHandle::open(&path).expect("open store");
        store.set("ns:departments", json!(["ICU", "ER"]));
        drop(store);

        let reopened = StoreHandle::open(&path).expect("reopen store");
        assert_eq!(reopened.get("ns:departments"), Some(json!(["ICU", "ER"])));
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StoreHandle::open(dir.path().join("absent.json")).expect("open store");
        assert_eq!(store.get("anything"), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.json");
        fs::write(&path, b"{ not json").expect("write");
        assert!(StoreHandle::open(&path).is_err());
    }
}
