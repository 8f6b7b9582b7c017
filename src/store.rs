//! Durable node positions, one record per diagram under the key
//! `cld-positions-{diagram_id}`. Last write wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::layout::Positions;

pub fn storage_key(diagram_id: &str) -> String {
    format!("cld-positions-{diagram_id}")
}

/// Read and write failures never reach the caller: a record that cannot be
/// read is treated as absent, and a failed write is logged.
pub trait LayoutStore {
    fn load(&mut self, diagram_id: &str) -> Option<Positions>;
    fn save(&mut self, diagram_id: &str, positions: &Positions);
}

fn encode(positions: &Positions) -> Result<String> {
    Ok(serde_json::to_string(positions)?)
}

fn decode(diagram_id: &str, raw: &str) -> Option<Positions> {
    match serde_json::from_str(raw) {
        Ok(positions) => Some(positions),
        Err(err) => {
            warn!(diagram = diagram_id, error = %err, "discarding unreadable saved layout");
            None
        }
    }
}

/// Key-value store kept in memory, with the same string records a browser
/// store would hold.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayoutStore {
    records: HashMap<String, String>,
}

impl MemoryLayoutStore {
    pub fn raw(&self, diagram_id: &str) -> Option<&str> {
        self.records.get(&storage_key(diagram_id)).map(String::as_str)
    }

    pub fn insert_raw(&mut self, diagram_id: &str, raw: &str) {
        self.records.insert(storage_key(diagram_id), raw.to_string());
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn load(&mut self, diagram_id: &str) -> Option<Positions> {
        if diagram_id.is_empty() {
            return None;
        }
        decode(diagram_id, self.raw(diagram_id)?)
    }

    fn save(&mut self, diagram_id: &str, positions: &Positions) {
        if diagram_id.is_empty() {
            return;
        }
        match encode(positions) {
            Ok(raw) => self.insert_raw(diagram_id, &raw),
            Err(err) => warn!(diagram = diagram_id, error = %err, "failed to encode layout"),
        }
    }
}

/// Escapes an id into a file name: `_` doubles, and any byte outside
/// `[A-Za-z0-9.-]` becomes `_XX` hex. Distinct ids never share a file.
fn file_safe(diagram_id: &str) -> String {
    let mut out = String::with_capacity(diagram_id.len());
    for byte in diagram_id.bytes() {
        match byte {
            b'_' => out.push_str("__"),
            b'-' | b'.' => out.push(byte as char),
            _ if byte.is_ascii_alphanumeric() => out.push(byte as char),
            _ => out.push_str(&format!("_{byte:02X}")),
        }
    }
    out
}

/// One JSON file per diagram inside `dir`, with a read-through cache.
#[derive(Debug, Clone)]
pub struct FileLayoutStore {
    dir: PathBuf,
    cache: HashMap<String, Positions>,
}

impl FileLayoutStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, diagram_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", storage_key(&file_safe(diagram_id))))
    }

    fn write(&self, diagram_id: &str, positions: &Positions) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(diagram_id), encode(positions)?)?;
        Ok(())
    }
}

impl LayoutStore for FileLayoutStore {
    fn load(&mut self, diagram_id: &str) -> Option<Positions> {
        if diagram_id.is_empty() {
            return None;
        }
        if let Some(positions) = self.cache.get(diagram_id) {
            return Some(positions.clone());
        }
        let raw = fs::read_to_string(self.path_for(diagram_id)).ok()?;
        let positions = decode(diagram_id, &raw)?;
        self.cache.insert(diagram_id.to_string(), positions.clone());
        Some(positions)
    }

    fn save(&mut self, diagram_id: &str, positions: &Positions) {
        if diagram_id.is_empty() {
            return;
        }
        self.cache.insert(diagram_id.to_string(), positions.clone());
        if let Err(err) = self.write(diagram_id, positions) {
            warn!(diagram = diagram_id, error = %err, "failed to persist layout");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Point;
    use tracing_test::traced_test;

    fn sample() -> Positions {
        let mut positions = Positions::new();
        positions.insert("a".into(), Point::new(-35.0, 0.0));
        positions.insert("b".into(), Point::new(85.125, 12.5));
        positions.insert("c".into(), Point::new(0.1 + 0.2, -1e-7));
        positions
    }

    #[test]
    fn key_format() {
        assert_eq!(storage_key("d1"), "cld-positions-d1");
    }

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryLayoutStore::default();
        store.save("d1", &sample());
        assert_eq!(store.load("d1"), Some(sample()));
        assert!(store.load("d2").is_none());
    }

    #[test]
    fn file_store_survives_a_fresh_instance_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = FileLayoutStore::new(dir.path());
        first.save("d1", &sample());
        let bytes = fs::read(first.path_for("d1")).unwrap();
        drop(first);

        let mut second = FileLayoutStore::new(dir.path());
        let loaded = second.load("d1").unwrap();
        assert_eq!(loaded, sample());
        assert_eq!(serde_json::to_vec(&loaded).unwrap(), bytes);
    }

    #[traced_test]
    #[test]
    fn corrupt_record_reads_as_absent() {
        let mut store = MemoryLayoutStore::default();
        store.insert_raw("d1", "{not json");
        assert!(store.load("d1").is_none());
        assert!(logs_contain("discarding unreadable saved layout"));
    }

    #[test]
    fn similar_ids_keep_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let ids = ["team a", "team_a", "a/b", "a_b", "a_2Fb"];
        let mut store = FileLayoutStore::new(dir.path());
        for (idx, id) in ids.iter().enumerate() {
            let mut positions = Positions::new();
            positions.insert("n".into(), Point::new(idx as f64, 0.0));
            store.save(id, &positions);
        }
        drop(store);

        let mut fresh = FileLayoutStore::new(dir.path());
        for (idx, id) in ids.iter().enumerate() {
            let loaded = fresh.load(id).unwrap();
            assert_eq!(loaded["n"], Point::new(idx as f64, 0.0), "{id}");
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), ids.len());
    }

    #[test]
    fn file_names_escape_unsafe_bytes() {
        let store = FileLayoutStore::new("layouts");
        assert_eq!(
            store.path_for("team a"),
            Path::new("layouts").join("cld-positions-team_20a.json")
        );
        assert_eq!(
            store.path_for("team_a"),
            Path::new("layouts").join("cld-positions-team__a.json")
        );
        assert_eq!(
            store.path_for("d1"),
            Path::new("layouts").join("cld-positions-d1.json")
        );
    }

    #[test]
    fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileLayoutStore::new(dir.path().join("nested"));
        assert!(store.load("nope").is_none());
    }

    #[test]
    fn empty_id_is_never_stored() {
        let mut store = MemoryLayoutStore::default();
        store.save("", &sample());
        assert!(store.raw("").is_none());
    }

    #[test]
    fn ids_are_sanitized_into_file_names() {
        let store = FileLayoutStore::new("/tmp/layouts");
        let path = store.path_for("../evil id");
        assert_eq!(path.file_name().unwrap(), "cld-positions-.._evil_id.json");
    }
}
