//! Prefetch coordination: hands cells that are about to appear to prefetch plugins
use crate::model::{Cell, List};
use crate::types::IndexPath;
use log::trace;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Cancels an in-flight prefetch when dropped or cancelled explicitly.
pub struct PrefetchHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl PrefetchHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        PrefetchHandle {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for PrefetchHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for PrefetchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchHandle")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Starts loading resources for a cell before it is rendered.
///
/// Returns `None` when the cell has nothing worth prefetching.
pub trait PrefetchPlugin: Send + Sync {
    fn prefetch(&self, cell: &Cell) -> Option<PrefetchHandle>;
}

/// Tracks prefetch operations per index path.
#[derive(Default)]
pub struct Prefetcher {
    plugins: Vec<Arc<dyn PrefetchPlugin>>,
    operations: Mutex<HashMap<IndexPath, Vec<PrefetchHandle>>>,
}

impl Prefetcher {
    pub fn new(plugins: Vec<Arc<dyn PrefetchPlugin>>) -> Self {
        Prefetcher {
            plugins,
            operations: Mutex::new(HashMap::new()),
        }
    }

    /// Without plugins there is nothing to prefetch.
    pub fn is_enabled(&self) -> bool {
        !self.plugins.is_empty()
    }

    /// Starts prefetching every cell of `list` found at `paths`. Returns the
    /// number of operations started. Existing operations for a path are
    /// replaced and thereby cancelled.
    pub fn prefetch_items(&self, list: &List, paths: &[IndexPath]) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        let mut started = Vec::new();
        for &path in paths {
            let Some(cell) = list.cell(path) else {
                continue;
            };
            let handles: Vec<PrefetchHandle> = self
                .plugins
                .iter()
                .filter_map(|plugin| plugin.prefetch(cell))
                .collect();
            if !handles.is_empty() {
                trace!("Prefetcher: {} operations for cell '{}' at {}", handles.len(), cell.id, path);
                started.push((path, handles));
            }
        }

        let count: usize = started.iter().map(|(_, handles)| handles.len()).sum();
        let replaced: Vec<Vec<PrefetchHandle>> = {
            let mut operations = self.operations.lock().unwrap_or_else(PoisonError::into_inner);
            started
                .into_iter()
                .filter_map(|(path, handles)| operations.insert(path, handles))
                .collect()
        };
        // Dropping cancels; keep that outside the lock.
        drop(replaced);
        count
    }

    pub fn cancel_prefetching(&self, paths: &[IndexPath]) {
        let cancelled: Vec<PrefetchHandle> = {
            let mut operations = self.operations.lock().unwrap_or_else(PoisonError::into_inner);
            paths
                .iter()
                .filter_map(|path| operations.remove(path))
                .flatten()
                .collect()
        };
        // Cancel callbacks run outside the lock.
        for handle in cancelled {
            handle.cancel();
        }
    }

    /// Index paths with at least one operation in flight.
    pub fn in_flight(&self) -> usize {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for Prefetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prefetcher")
            .field("plugins", &self.plugins.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// The next `count` cells in reading order after `after`, skipping empty sections.
pub fn upcoming_index_paths(list: &List, after: IndexPath, count: usize) -> Vec<IndexPath> {
    let mut paths = Vec::with_capacity(count);
    let mut section = after.section;
    let mut item = after.item + 1;
    while paths.len() < count {
        let Some(current) = list.section(section) else {
            break;
        };
        if item < current.cells.len() {
            paths.push(IndexPath::new(section, item));
            item += 1;
        } else {
            section += 1;
            item = 0;
        }
    }
    paths
}
