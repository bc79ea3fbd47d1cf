//! Property tests for the identity differ and the tree reconciler.

mod common;

use common::TextComponent;
use list_reconciler::{Cell, List, Section, diff, reconcile};
use proptest::prelude::*;
use std::collections::HashMap;

/// Uniquely identified items: a permutation of a subset of ids with small content values.
fn arb_items() -> impl Strategy<Value = Vec<(u8, u8)>> {
    proptest::sample::subsequence((0u8..24).collect::<Vec<_>>(), 0..24)
        .prop_shuffle()
        .prop_flat_map(|ids| {
            let len = ids.len();
            (Just(ids), prop::collection::vec(0u8..3, len))
        })
        .prop_map(|(ids, values)| ids.into_iter().zip(values).collect())
}

fn arb_list() -> impl Strategy<Value = List> {
    proptest::sample::subsequence(vec!["a", "b", "c", "d", "e"], 0..5)
        .prop_shuffle()
        .prop_flat_map(|section_ids| {
            let len = section_ids.len();
            (
                Just(section_ids),
                prop::collection::vec(arb_items(), len),
                prop::collection::vec(proptest::option::of(0u8..2), len),
            )
        })
        .prop_map(|(section_ids, cells, headers)| {
            List::new(
                section_ids
                    .into_iter()
                    .zip(cells)
                    .zip(headers)
                    .map(|((id, cells), header)| {
                        let section = Section::new(
                            id,
                            cells
                                .into_iter()
                                .map(|(cid, v)| Cell::new(cid.to_string(), TextComponent(v.to_string())))
                                .collect(),
                        );
                        match header {
                            Some(h) => section.with_header(TextComponent(h.to_string())),
                            None => section,
                        }
                    })
                    .collect(),
            )
        })
}

proptest! {
    #[test]
    fn replay_reaches_new_sequence(old in arb_items(), new in arb_items()) {
        let script = diff(&old, &new).unwrap();
        let new_values: HashMap<u8, u8> = new.iter().copied().collect();
        let replayed = script.replay(&old, |insert| (insert.id, new_values[&insert.id]));
        let replayed_ids: Vec<u8> = replayed.iter().map(|(id, _)| *id).collect();
        let new_ids: Vec<u8> = new.iter().map(|(id, _)| *id).collect();
        prop_assert_eq!(replayed_ids, new_ids);
    }

    #[test]
    fn diff_against_self_is_empty(items in arb_items()) {
        prop_assert!(diff(&items, &items).unwrap().is_empty());
    }

    #[test]
    fn updates_are_exactly_changed_content(old in arb_items(), new in arb_items()) {
        let script = diff(&old, &new).unwrap();
        for update in &script.updates {
            prop_assert_eq!(old[update.old].0, new[update.new].0);
            prop_assert_ne!(old[update.old].1, new[update.new].1);
        }
        let old_values: HashMap<u8, u8> = old.iter().copied().collect();
        let changed = new
            .iter()
            .filter(|(id, v)| old_values.get(id).is_some_and(|old_v| old_v != v))
            .count();
        prop_assert_eq!(script.updates.len(), changed);
    }

    #[test]
    fn reorder_without_change_is_moves_only(items in arb_items()) {
        let mut reversed = items.clone();
        reversed.reverse();
        let script = diff(&items, &reversed).unwrap();
        prop_assert!(script.updates.is_empty());
        prop_assert!(script.inserts.is_empty() && script.deletes.is_empty());
        prop_assert_eq!(script.moves.len(), items.len().saturating_sub(1));
    }

    #[test]
    fn batch_replay_reaches_new_list(old in arb_list(), new in arb_list()) {
        let batch = reconcile(&old, &new).unwrap();
        prop_assert_eq!(batch.replay(&old, &new), new);
    }

    #[test]
    fn cell_edits_stay_inside_their_section(old in arb_list(), new in arb_list()) {
        let batch = reconcile(&old, &new).unwrap();
        for edits in &batch.section_cells {
            prop_assert_eq!(&old.sections[edits.old_section].id, &edits.section_id);
            prop_assert_eq!(&new.sections[edits.new_section].id, &edits.section_id);
            let old_len = old.sections[edits.old_section].cells.len();
            let new_len = new.sections[edits.new_section].cells.len();
            prop_assert!(edits.cells.deletes.iter().all(|&i| i < old_len));
            prop_assert!(edits.cells.inserts.iter().all(|insert| insert.index < new_len));
        }
    }
}
