//! Identity differ: keyed, LIS-based diff of two ordered sequences
use crate::model::{Cell, Section};
use crate::types::ItemId;
use log::trace;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// An item the differ can match across versions.
pub trait Diffable {
    type Id: Clone + Eq + Hash + fmt::Debug;

    fn diff_id(&self) -> &Self::Id;

    /// Whether a retained item can be left untouched on the surface.
    fn is_content_equal(&self, other: &Self) -> bool;
}

impl Diffable for Cell {
    type Id = ItemId;

    fn diff_id(&self) -> &ItemId {
        &self.id
    }

    fn is_content_equal(&self, other: &Self) -> bool {
        self.component.is_content_equal(&other.component)
    }
}

/// Sections compare by header and footer only; their cells are diffed separately.
impl Diffable for Section {
    type Id = ItemId;

    fn diff_id(&self) -> &ItemId {
        &self.id
    }

    fn is_content_equal(&self, other: &Self) -> bool {
        self.is_supplementary_equal(other)
    }
}

impl<K, V> Diffable for (K, V)
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: PartialEq,
{
    type Id = K;

    fn diff_id(&self) -> &K {
        &self.0
    }

    fn is_content_equal(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}

/// Two items on one side of a diff share this id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateId<Id>(pub Id);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insert<Id> {
    /// Position in the new sequence.
    pub index: usize,
    pub id: Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Move {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Update {
    pub old: usize,
    pub new: usize,
}

/// Whole-item edits turning one sequence into another.
///
/// `deletes` and `Update::old` index the old sequence, `inserts` and
/// `Update::new` index the new one. All lists are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditScript<Id> {
    pub deletes: Vec<usize>,
    pub inserts: Vec<Insert<Id>>,
    pub moves: Vec<Move>,
    pub updates: Vec<Update>,
}

impl<Id> Default for EditScript<Id> {
    fn default() -> Self {
        EditScript {
            deletes: Vec::new(),
            inserts: Vec::new(),
            moves: Vec::new(),
            updates: Vec::new(),
        }
    }
}

impl<Id> EditScript<Id> {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty()
            && self.inserts.is_empty()
            && self.moves.is_empty()
            && self.updates.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.deletes.len() + self.inserts.len() + self.moves.len() + self.updates.len()
    }

    /// Applies the structural part of the script to `old`: deletes, then moves,
    /// then inserts in ascending position. `inserted` produces each new item.
    ///
    /// # Panics
    ///
    /// Panics if the script was not produced for a sequence shaped like `old`.
    pub fn replay<T: Clone>(&self, old: &[T], mut inserted: impl FnMut(&Insert<Id>) -> T) -> Vec<T> {
        let detached: HashSet<usize> = self
            .deletes
            .iter()
            .copied()
            .chain(self.moves.iter().map(|m| m.from))
            .collect();

        let mut result: Vec<T> = old
            .iter()
            .enumerate()
            .filter(|(i, _)| !detached.contains(i))
            .map(|(_, item)| item.clone())
            .collect();

        let mut placements: BTreeMap<usize, T> = self
            .moves
            .iter()
            .map(|m| (m.to, old[m.from].clone()))
            .collect();
        for insert in &self.inserts {
            placements.insert(insert.index, inserted(insert));
        }

        // Ascending order: every slot before `index` is already final.
        for (index, item) in placements {
            result.insert(index, item);
        }
        result
    }
}

fn index_by_id<T: Diffable>(items: &[T]) -> Result<HashMap<&T::Id, usize>, DuplicateId<T::Id>> {
    let mut index = HashMap::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        if index.insert(item.diff_id(), i).is_some() {
            return Err(DuplicateId(item.diff_id().clone()));
        }
    }
    Ok(index)
}

/// Diffs `old` against `new` by identity.
///
/// Retained items whose old positions form the longest increasing run stay
/// in place; every other retained item is reported as a move.
pub fn diff<T: Diffable>(old: &[T], new: &[T]) -> Result<EditScript<T::Id>, DuplicateId<T::Id>> {
    let old_key_to_idx = index_by_id(old)?;
    let new_key_to_idx = index_by_id(new)?;

    let mut script = EditScript::default();

    if old.is_empty() && new.is_empty() {
        return Ok(script);
    }

    script.deletes = old
        .iter()
        .enumerate()
        .filter(|(_, item)| !new_key_to_idx.contains_key(item.diff_id()))
        .map(|(i, _)| i)
        .collect();

    // (new index, old index) for every retained item, in new order
    let mut retained = Vec::new();
    for (new_idx, item) in new.iter().enumerate() {
        match old_key_to_idx.get(item.diff_id()) {
            Some(&old_idx) => {
                retained.push((new_idx, old_idx));
                if !old[old_idx].is_content_equal(item) {
                    script.updates.push(Update {
                        old: old_idx,
                        new: new_idx,
                    });
                }
            }
            None => script.inserts.push(Insert {
                index: new_idx,
                id: item.diff_id().clone(),
            }),
        }
    }

    let sequence_for_lis: Vec<usize> = retained.iter().map(|&(_, old_idx)| old_idx).collect();
    let lis_old_indices: HashSet<usize> = longest_increasing_subsequence(&sequence_for_lis)
        .into_iter()
        .map(|i| sequence_for_lis[i])
        .collect();

    script.moves = retained
        .iter()
        .filter(|(_, old_idx)| !lis_old_indices.contains(old_idx))
        .map(|&(new_idx, old_idx)| Move {
            from: old_idx,
            to: new_idx,
        })
        .collect();

    trace!(
        "diff: old={} new={} deletes={} inserts={} moves={} updates={}",
        old.len(),
        new.len(),
        script.deletes.len(),
        script.inserts.len(),
        script.moves.len(),
        script.updates.len()
    );

    Ok(script)
}

/// O(n log n) longest strictly increasing subsequence; returns indices into `seq`.
pub(crate) fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    if seq.is_empty() {
        return Vec::new();
    }

    let mut predecessors = vec![0; seq.len()];
    let mut indices = vec![0; seq.len()];
    let mut length = 0;

    for (i, &value) in seq.iter().enumerate() {
        let mut low = 0;
        let mut high = length;

        while low < high {
            let mid = low + (high - low) / 2;
            if seq[indices[mid]] < value {
                low = mid + 1;
            } else {
                high = mid;
            }
        }

        if low > 0 {
            predecessors[i] = indices[low - 1];
        }
        indices[low] = i;

        if low == length {
            length += 1;
        }
    }

    let mut lis = Vec::with_capacity(length);
    let mut k = indices[length - 1];
    for _ in 0..length {
        lis.push(k);
        k = predecessors[k];
    }
    lis.reverse();
    lis
}
