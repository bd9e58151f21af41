// paygate/src/store/keyed.rs

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// A map of independently lockable cells.
///
/// The outer `RwLock` is held only long enough to find or insert a cell; all work on a
/// value happens under that value's own `Mutex`, so two keys never contend with each other
/// and two writers on the same key are strictly serialized.
///
/// IMPORTANT: the closures passed to [`KeyedCells::with`] run under a blocking lock and
/// MUST NOT be turned into anything that awaits.
#[derive(Debug)]
pub struct KeyedCells<K, V> {
  cells: RwLock<HashMap<K, Arc<Mutex<V>>>>,
}

impl<K, V> Default for KeyedCells<K, V> {
  fn default() -> Self {
    KeyedCells {
      cells: RwLock::new(HashMap::new()),
    }
  }
}

impl<K: Eq + Hash + Clone, V> KeyedCells<K, V> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts only if the key is vacant. Returns `false` when a cell already exists.
  pub fn insert_new(&self, key: K, value: V) -> bool {
    let mut cells = self.cells.write();
    if cells.contains_key(&key) {
      return false;
    }
    cells.insert(key, Arc::new(Mutex::new(value)));
    true
  }

  fn cell(&self, key: &K) -> Option<Arc<Mutex<V>>> {
    self.cells.read().get(key).cloned()
  }

  /// Runs `f` with exclusive access to one value. `None` if the key is unknown.
  pub fn with<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
    let cell = self.cell(key)?; // outer lock released here
    let mut guard = cell.lock();
    Some(f(&mut guard))
  }

  pub fn len(&self) -> usize {
    self.cells.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<K: Eq + Hash + Clone, V: Clone> KeyedCells<K, V> {
  pub fn get(&self, key: &K) -> Option<V> {
    self.with(key, |value| value.clone())
  }

  /// Clones every value whose cell passes `keep`. Each cell is locked briefly and on its own.
  pub fn collect(&self, mut keep: impl FnMut(&V) -> bool) -> Vec<V> {
    let cells: Vec<Arc<Mutex<V>>> = self.cells.read().values().cloned().collect();
    cells
      .iter()
      .filter_map(|cell| {
        let guard = cell.lock();
        keep(&*guard).then(|| (*guard).clone())
      })
      .collect()
  }
}
