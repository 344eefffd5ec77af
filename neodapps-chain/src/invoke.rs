//! Invoke files: JSON arrays of `{contract, operation, args}` steps
//!
//! Every loaded item gets a fresh [`ItemId`] that lives only in memory. The id
//! lets a caller keep track of an item across edits; it is never written back
//! to the file and a reload hands out new ids.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt, fs,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ChainError, Result};
use crate::stamp::FileStamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemId(Uuid);

impl ItemId {
    fn fresh() -> Self {
        ItemId(Uuid::new_v4())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvokeFileItem {
    #[serde(skip, default = "ItemId::fresh")]
    id: ItemId,
    pub contract: String,
    pub operation: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl InvokeFileItem {
    pub fn new(contract: impl Into<String>, operation: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: ItemId::fresh(),
            contract: contract.into(),
            operation: operation.into(),
            args,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }
}

// Identity is the in-memory id only.
impl PartialEq for InvokeFileItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for InvokeFileItem {}

impl Hash for InvokeFileItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

struct InvokeState {
    items: HashMap<ItemId, InvokeFileItem>,
    stamp: FileStamp,
}

pub struct InvokeFile {
    path: PathBuf,
    state: Mutex<InvokeState>,
    reloads: AtomicUsize,
}

impl InvokeFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let file = Self {
            path: path.into(),
            state: Mutex::new(InvokeState {
                items: HashMap::new(),
                stamp: FileStamp::default(),
            }),
            reloads: AtomicUsize::new(0),
        };
        file.refresh(&mut file.state.lock())?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current items, reparsed first if the file changed on disk.
    pub fn items(&self) -> Result<HashMap<ItemId, InvokeFileItem>> {
        let mut state = self.state.lock();
        self.refresh(&mut state)?;
        Ok(state.items.clone())
    }

    pub fn get(&self, id: &ItemId) -> Result<Option<InvokeFileItem>> {
        let mut state = self.state.lock();
        self.refresh(&mut state)?;
        Ok(state.items.get(id).cloned())
    }

    pub fn add_item(&self, item: InvokeFileItem) -> ItemId {
        let id = item.id();
        self.state.lock().items.insert(id, item);
        id
    }

    pub fn remove_item(&self, id: &ItemId) -> Option<InvokeFileItem> {
        self.state.lock().items.remove(id)
    }

    /// Replaces the item with the same id. Returns false if it is unknown.
    pub fn update_item(&self, item: InvokeFileItem) -> bool {
        let mut state = self.state.lock();
        match state.items.get_mut(&item.id()) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Rewrites the whole file from the in-memory items.
    pub fn save_changes(&self) -> Result<()> {
        let mut state = self.state.lock();
        let values: Vec<&InvokeFileItem> = state.items.values().collect();
        let data =
            serde_json::to_string_pretty(&values).map_err(|e| ChainError::invoke_parse(&self.path, e))?;
        fs::write(&self.path, data).map_err(|e| ChainError::io(&self.path, e))?;

        // Our own write must not look like an external edit.
        let modified = FileStamp::observe(&self.path).map_err(|e| ChainError::io(&self.path, e))?;
        state.stamp.record(modified);
        debug!(path = %self.path.display(), items = state.items.len(), "saved invoke file");
        Ok(())
    }

    /// Number of successful parses so far.
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::Relaxed)
    }

    fn refresh(&self, state: &mut InvokeState) -> Result<()> {
        let modified = FileStamp::observe(&self.path).map_err(|e| ChainError::io(&self.path, e))?;
        if !state.stamp.is_stale(modified) {
            return Ok(());
        }

        let text = fs::read_to_string(&self.path).map_err(|e| ChainError::io(&self.path, e))?;
        let items: Vec<InvokeFileItem> =
            serde_json::from_str(&text).map_err(|e| ChainError::invoke_parse(&self.path, e))?;
        state.items = items.into_iter().map(|item| (item.id(), item)).collect();
        state.stamp.record(modified);
        self.reloads.fetch_add(1, Ordering::Relaxed);
        debug!(path = %self.path.display(), items = state.items.len(), "parsed invoke file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::{
        collections::HashSet,
        fs::File,
        sync::Barrier,
        thread,
        time::{Duration, SystemTime},
    };

    fn tuples(items: &HashMap<ItemId, InvokeFileItem>) -> HashSet<(String, String, String)> {
        items
            .values()
            .map(|i| {
                (
                    i.contract.clone(),
                    i.operation.clone(),
                    Value::Array(i.args.clone()).to_string(),
                )
            })
            .collect()
    }

    fn write_two_items(path: &Path) {
        let body = json!([
            { "contract": "Token", "operation": "transfer", "args": ["alice", "bob", 10] },
            { "contract": "Registry", "operation": "register", "args": [{ "type": "String", "value": "x" }] }
        ]);
        fs::write(path, body.to_string()).unwrap();
    }

    #[test]
    fn edit_save_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoke.json");
        write_two_items(&path);

        let file = InvokeFile::open(&path).unwrap();
        let before = file.items().unwrap();
        assert_eq!(before.len(), 2);

        let token_id = before
            .values()
            .find(|i| i.contract == "Token")
            .map(InvokeFileItem::id)
            .unwrap();
        file.add_item(InvokeFileItem::new("Oracle", "request", vec![json!("https://x"), json!(null)]));
        assert!(file.remove_item(&token_id).is_some());
        file.save_changes().unwrap();

        let old_ids: HashSet<ItemId> = file.items().unwrap().keys().copied().collect();
        let reopened = InvokeFile::open(&path).unwrap().items().unwrap();

        let expected: HashSet<_> = [
            ("Registry".to_string(), "register".to_string(), json!([{ "type": "String", "value": "x" }]).to_string()),
            ("Oracle".to_string(), "request".to_string(), json!(["https://x", null]).to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(tuples(&reopened), expected);
        assert!(reopened.keys().all(|id| !old_ids.contains(id)));
    }

    #[test]
    fn saved_file_has_no_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoke.json");
        fs::write(&path, "[]").unwrap();

        let file = InvokeFile::open(&path).unwrap();
        file.add_item(InvokeFileItem::new("C", "op", vec![]));
        file.save_changes().unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, json!([{ "contract": "C", "operation": "op", "args": [] }]));
    }

    #[test]
    fn ids_are_stable_until_the_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoke.json");
        write_two_items(&path);

        let file = InvokeFile::open(&path).unwrap();
        let first: HashSet<ItemId> = file.items().unwrap().keys().copied().collect();
        let second: HashSet<ItemId> = file.items().unwrap().keys().copied().collect();
        assert_eq!(first, second);
        assert_eq!(file.reload_count(), 1);

        // Saving our own edits keeps the ids too.
        file.save_changes().unwrap();
        let third: HashSet<ItemId> = file.items().unwrap().keys().copied().collect();
        assert_eq!(first, third);

        // An external edit with a newer mtime forces a reparse.
        write_two_items(&path);
        let later = SystemTime::now() + Duration::from_secs(30);
        File::options().write(true).open(&path).unwrap().set_modified(later).unwrap();
        let fourth: HashSet<ItemId> = file.items().unwrap().keys().copied().collect();
        assert!(first.is_disjoint(&fourth));
        assert_eq!(file.reload_count(), 2);
    }

    #[test]
    fn concurrent_readers_see_one_reparse() {
        const READERS: usize = 8;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoke.json");
        fs::write(&path, "[]").unwrap();
        let file = InvokeFile::open(&path).unwrap();
        assert_eq!(file.reload_count(), 1);

        write_two_items(&path);
        let later = SystemTime::now() + Duration::from_secs(30);
        File::options().write(true).open(&path).unwrap().set_modified(later).unwrap();

        let barrier = Barrier::new(READERS);
        let seen: Vec<HashSet<ItemId>> = thread::scope(|s| {
            let handles: Vec<_> = (0..READERS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        file.items().unwrap().keys().copied().collect()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(file.reload_count(), 2);
        assert_eq!(seen[0].len(), 2);
        assert!(seen.iter().all(|ids| *ids == seen[0]));
    }

    #[test]
    fn update_replaces_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoke.json");
        write_two_items(&path);
        let file = InvokeFile::open(&path).unwrap();

        let mut item = file.items().unwrap().into_values().next().unwrap();
        item.operation = "renamed".into();
        assert!(file.update_item(item.clone()));
        assert_eq!(file.get(&item.id()).unwrap().unwrap().operation, "renamed");

        assert!(!file.update_item(InvokeFileItem::new("X", "y", vec![])));
    }

    #[test]
    fn equality_is_by_id_only() {
        let a = InvokeFileItem::new("C", "op", vec![]);
        let b = InvokeFileItem::new("C", "op", vec![]);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoke.json");
        fs::write(&path, r#"[{"contract": 1}]"#).unwrap();

        assert!(matches!(
            InvokeFile::open(&path),
            Err(ChainError::InvokeFileParse { .. })
        ));
    }
}
