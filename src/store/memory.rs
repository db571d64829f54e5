//! In-memory store backend

use std::collections::HashMap;
use std::io;

use serde_json::Value;

use super::StoreBackend;

/// Volatile backend; the shared map in the handle is the only copy.
pub struct MemoryBackend;

impl StoreBackend for MemoryBackend {
    fn load(&mut self) -> io::Result<HashMap<String, Value>> {
        Ok(HashMap::new())
    }

    fn flush(&mut self, _data: &HashMap<String, Value>) -> io::Result<()> {
        Ok(())
    }
}
