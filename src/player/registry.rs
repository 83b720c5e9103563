//! Process-wide table of shared native objects keyed by integer handles
//!
//! Native callbacks that may outlive the object they refer to (OpenSL ES
//! buffer-queue callbacks in particular) carry an id instead of a pointer and
//! look it up here; once removed, an id never resolves again.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct Table<T> {
  next_id: i64,
  entries: BTreeMap<i64, Arc<T>>,
}

/// Mutex-guarded map from handle ids to shared entries
pub struct HandleTable<T> {
  inner: Mutex<Table<T>>,
}

impl<T> Default for HandleTable<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> HandleTable<T> {
  pub const fn new() -> Self {
    Self {
      inner: Mutex::new(Table {
        next_id: 1,
        entries: BTreeMap::new(),
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Table<T>> {
    // Entries stay consistent even if a holder panicked
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Store `value` and return its id; ids start at 1 and are never reused
  pub fn add(&self, value: Arc<T>) -> i64 {
    let mut table = self.lock();
    let id = table.next_id;
    table.next_id += 1;
    table.entries.insert(id, value);
    id
  }

  pub fn get(&self, id: i64) -> Option<Arc<T>> {
    self.lock().entries.get(&id).cloned()
  }

  pub fn remove(&self, id: i64) -> Option<Arc<T>> {
    self.lock().entries.remove(&id)
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<T> std::fmt::Debug for HandleTable<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HandleTable").field("len", &self.len()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ids_are_distinct_and_start_at_one() {
    let table = HandleTable::new();
    let a = table.add(Arc::new("a"));
    let b = table.add(Arc::new("b"));
    assert_eq!(a, 1);
    assert_ne!(a, b);
    assert_eq!(table.get(a).as_deref(), Some(&"a"));
    assert_eq!(table.get(b).as_deref(), Some(&"b"));
    assert_eq!(table.len(), 2);
  }

  #[test]
  fn test_unknown_and_removed_ids() {
    let table = HandleTable::new();
    assert!(table.get(42).is_none());
    let id = table.add(Arc::new(7u32));
    assert_eq!(table.remove(id).as_deref(), Some(&7));
    assert!(table.get(id).is_none());
    assert!(table.remove(id).is_none());
    assert!(table.is_empty());
  }

  #[test]
  fn test_ids_are_not_reused() {
    let table = HandleTable::new();
    let first = table.add(Arc::new(()));
    table.remove(first);
    let second = table.add(Arc::new(()));
    assert!(second > first);
  }

  #[test]
  fn test_entry_outlives_removal_while_borrowed() {
    static TABLE: HandleTable<String> = HandleTable::new();
    let id = TABLE.add(Arc::new("callback".to_string()));
    let held = TABLE.get(id).unwrap();
    TABLE.remove(id);
    assert_eq!(held.as_str(), "callback");
    assert!(TABLE.get(id).is_none());
  }

  #[test]
  fn test_concurrent_adds() {
    let table = Arc::new(HandleTable::new());
    let handles: Vec<_> = (0..4)
      .map(|_| {
        let table = Arc::clone(&table);
        std::thread::spawn(move || (0..100).map(|i| table.add(Arc::new(i))).collect::<Vec<_>>())
      })
      .collect();
    let mut ids: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 400);
  }
}
