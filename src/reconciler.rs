//! Tree reconciler: composes section-level and per-section cell-level edit scripts
use crate::diff_engine::{self, DuplicateId, EditScript};
use crate::errors::ReconcilerError;
use crate::model::{List, Section};
use crate::types::{IndexPath, ItemId};
use log::trace;
use serde::Serialize;
use std::collections::HashMap;

/// Cell-level edits of one section present in both versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionCellEdits {
    pub section_id: ItemId,
    /// Index of the section in the old list; frame for deletes, moves' sources and updates.
    pub old_section: usize,
    /// Index of the section in the new list; frame for inserts and moves' targets.
    pub new_section: usize,
    /// Header or footer content changed.
    pub supplementary_changed: bool,
    pub cells: EditScript<ItemId>,
}

impl SectionCellEdits {
    fn is_empty(&self) -> bool {
        !self.supplementary_changed && self.cells.is_empty()
    }
}

/// Everything a surface needs to move from one list version to the next.
///
/// Section deletes and updates index the old list, section inserts the new
/// list. Retained sections without changes have no entry in `section_cells`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditBatch {
    pub sections: EditScript<ItemId>,
    pub section_cells: Vec<SectionCellEdits>,
}

impl EditBatch {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.section_cells.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.sections.change_count()
            + self
                .section_cells
                .iter()
                .map(|edits| edits.cells.change_count())
                .sum::<usize>()
    }

    /// Old indices of sections whose header or footer must be reloaded.
    pub fn reloaded_sections(&self) -> Vec<usize> {
        self.sections.updates.iter().map(|u| u.old).collect()
    }

    pub fn deleted_items(&self) -> Vec<IndexPath> {
        self.section_cells
            .iter()
            .flat_map(|edits| {
                edits
                    .cells
                    .deletes
                    .iter()
                    .map(move |&item| IndexPath::new(edits.old_section, item))
            })
            .collect()
    }

    pub fn inserted_items(&self) -> Vec<IndexPath> {
        self.section_cells
            .iter()
            .flat_map(|edits| {
                edits
                    .cells
                    .inserts
                    .iter()
                    .map(move |insert| IndexPath::new(edits.new_section, insert.index))
            })
            .collect()
    }

    pub fn moved_items(&self) -> Vec<(IndexPath, IndexPath)> {
        self.section_cells
            .iter()
            .flat_map(|edits| {
                edits.cells.moves.iter().map(move |m| {
                    (
                        IndexPath::new(edits.old_section, m.from),
                        IndexPath::new(edits.new_section, m.to),
                    )
                })
            })
            .collect()
    }

    /// Old index paths of cells whose content changed.
    pub fn reloaded_items(&self) -> Vec<IndexPath> {
        self.section_cells
            .iter()
            .flat_map(|edits| {
                edits
                    .cells
                    .updates
                    .iter()
                    .map(move |u| IndexPath::new(edits.old_section, u.old))
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, ReconcilerError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Replays the batch against `old`, taking inserted and updated content from `new`.
    ///
    /// A surface that mirrors its rows in memory applies batches this way.
    ///
    /// # Panics
    ///
    /// Panics if the batch was not produced by [`reconcile`] for `old` and `new`.
    pub fn replay(&self, old: &List, new: &List) -> List {
        let edits_by_old: HashMap<usize, &SectionCellEdits> = self
            .section_cells
            .iter()
            .map(|edits| (edits.old_section, edits))
            .collect();

        let staged: Vec<Section> = old
            .sections
            .iter()
            .enumerate()
            .map(|(i, section)| match edits_by_old.get(&i) {
                Some(edits) => {
                    let target = &new.sections[edits.new_section];
                    let mut section = section.clone();
                    section.cells = edits
                        .cells
                        .replay(&section.cells, |insert| target.cells[insert.index].clone());
                    for update in &edits.cells.updates {
                        section.cells[update.new] = target.cells[update.new].clone();
                    }
                    section
                }
                None => section.clone(),
            })
            .collect();

        let mut sections = self
            .sections
            .replay(&staged, |insert| new.sections[insert.index].clone());
        for update in &self.sections.updates {
            let target = &new.sections[update.new];
            sections[update.new].header = target.header.clone();
            sections[update.new].footer = target.footer.clone();
        }
        List::new(sections)
    }
}

/// Diffs two list versions into one composite batch.
///
/// Sections are matched by id; cells only within a section matched in both
/// versions, so a cell changing sections is a delete plus an insert.
pub fn reconcile(old: &List, new: &List) -> Result<EditBatch, ReconcilerError> {
    new.validate()?;

    let sections = diff_engine::diff(&old.sections, &new.sections)
        .map_err(|DuplicateId(id)| ReconcilerError::duplicate_section(&id))?;

    let old_key_to_idx: HashMap<&ItemId, usize> = old
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| (&section.id, i))
        .collect();

    let mut section_cells = Vec::new();
    for (new_section, section) in new.sections.iter().enumerate() {
        let Some(&old_section) = old_key_to_idx.get(&section.id) else {
            continue;
        };
        let previous = &old.sections[old_section];
        let cells = diff_engine::diff(&previous.cells, &section.cells)
            .map_err(|DuplicateId(id)| ReconcilerError::duplicate_cell(&section.id, &id))?;
        let edits = SectionCellEdits {
            section_id: section.id.clone(),
            old_section,
            new_section,
            supplementary_changed: !previous.is_supplementary_equal(section),
            cells,
        };
        if !edits.is_empty() {
            section_cells.push(edits);
        }
    }

    let batch = EditBatch {
        sections,
        section_cells,
    };
    trace!(
        "reconcile: {} -> {} sections, {} changes",
        old.sections.len(),
        new.sections.len(),
        batch.change_count()
    );
    Ok(batch)
}
