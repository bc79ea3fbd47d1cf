//! Reuse registry: content kinds a surface must be able to instantiate
use crate::model::{List, Section};
use crate::reconciler::EditBatch;
use crate::types::ContentKind;
use indexmap::IndexSet;
use log::debug;
use std::sync::{Arc, Mutex, PoisonError};

/// Told about every content kind before a batch referencing it is applied.
///
/// `register` is called repeatedly for the same kind and must be idempotent.
pub trait ReuseRegistry: Send + Sync {
    fn register(&self, kind: &ContentKind);
}

impl<R: ReuseRegistry + ?Sized> ReuseRegistry for Arc<R> {
    fn register(&self, kind: &ContentKind) {
        (**self).register(kind)
    }
}

/// In-memory registry remembering kinds in first-registration order.
#[derive(Debug, Default)]
pub struct KindRegistry {
    kinds: Mutex<IndexSet<ContentKind>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        KindRegistry::default()
    }

    pub fn contains(&self, kind: &ContentKind) -> bool {
        self.kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(kind)
    }

    pub fn registered(&self) -> Vec<ContentKind> {
        self.kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl ReuseRegistry for KindRegistry {
    fn register(&self, kind: &ContentKind) {
        let mut kinds = self.kinds.lock().unwrap_or_else(PoisonError::into_inner);
        if kinds.insert(kind.clone()) {
            debug!("KindRegistry: registered '{}'", kind);
        }
    }
}

fn push_section_kinds(kinds: &mut IndexSet<ContentKind>, section: &Section) {
    if let Some(header) = &section.header {
        kinds.insert(header.kind());
    }
    for cell in &section.cells {
        kinds.insert(cell.component.kind());
    }
    if let Some(footer) = &section.footer {
        kinds.insert(footer.kind());
    }
}

/// Kinds of every piece of content `batch` brings onto the surface: inserted
/// sections, inserted or reloaded cells, and reloaded headers and footers.
pub fn introduced_kinds(batch: &EditBatch, target: &List) -> IndexSet<ContentKind> {
    let mut kinds = IndexSet::new();
    for insert in &batch.sections.inserts {
        if let Some(section) = target.section(insert.index) {
            push_section_kinds(&mut kinds, section);
        }
    }
    for update in &batch.sections.updates {
        if let Some(section) = target.section(update.new) {
            kinds.extend(section.header.iter().chain(section.footer.iter()).map(|c| c.kind()));
        }
    }
    for edits in &batch.section_cells {
        let Some(section) = target.section(edits.new_section) else {
            continue;
        };
        let touched = edits
            .cells
            .inserts
            .iter()
            .map(|insert| insert.index)
            .chain(edits.cells.updates.iter().map(|update| update.new));
        for item in touched {
            if let Some(cell) = section.cells.get(item) {
                kinds.insert(cell.component.kind());
            }
        }
    }
    kinds
}
