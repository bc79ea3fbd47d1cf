//! The List → Section → Cell model, one immutable value per version
use crate::errors::ReconcilerError;
use crate::types::{AnyComponent, Component, ContentKind, IndexPath, ItemId};
use indexmap::IndexSet;
use std::collections::HashSet;

/// A single identified row.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: ItemId,
    pub component: AnyComponent,
}

impl Cell {
    pub fn new(id: impl Into<ItemId>, component: impl Component) -> Self {
        Cell {
            id: id.into(),
            component: AnyComponent::new(component),
        }
    }
}

/// An identified group of cells with optional header and footer content.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: ItemId,
    pub cells: Vec<Cell>,
    pub header: Option<AnyComponent>,
    pub footer: Option<AnyComponent>,
}

impl Section {
    pub fn new(id: impl Into<ItemId>, cells: Vec<Cell>) -> Self {
        Section {
            id: id.into(),
            cells,
            header: None,
            footer: None,
        }
    }

    pub fn with_header(mut self, header: impl Component) -> Self {
        self.header = Some(AnyComponent::new(header));
        self
    }

    pub fn with_footer(mut self, footer: impl Component) -> Self {
        self.footer = Some(AnyComponent::new(footer));
        self
    }

    /// Header and footer content equality, ignoring cells.
    pub fn is_supplementary_equal(&self, other: &Section) -> bool {
        self.header == other.header && self.footer == other.footer
    }
}

/// A full model version.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    pub sections: Vec<Section>,
}

impl List {
    pub fn new(sections: Vec<Section>) -> Self {
        List { sections }
    }

    pub fn empty() -> Self {
        List::default()
    }

    pub fn is_content_equal(&self, other: &List) -> bool {
        self == other
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    pub fn cell(&self, path: IndexPath) -> Option<&Cell> {
        self.sections.get(path.section)?.cells.get(path.item)
    }

    pub fn cell_count(&self) -> usize {
        self.sections.iter().map(|s| s.cells.len()).sum()
    }

    pub fn index_path_of(&self, section_id: &ItemId, cell_id: &ItemId) -> Option<IndexPath> {
        let section = self.sections.iter().position(|s| &s.id == section_id)?;
        let item = self.sections[section]
            .cells
            .iter()
            .position(|c| &c.id == cell_id)?;
        Some(IndexPath::new(section, item))
    }

    /// Every content kind referenced by cells, headers and footers, in first-seen order.
    pub fn content_kinds(&self) -> IndexSet<ContentKind> {
        let mut kinds = IndexSet::new();
        for section in &self.sections {
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
        kinds
    }

    /// Checks that section ids are unique and that cell ids are unique within each section.
    pub fn validate(&self) -> Result<(), ReconcilerError> {
        let mut section_ids = HashSet::with_capacity(self.sections.len());
        for section in &self.sections {
            if !section_ids.insert(&section.id) {
                return Err(ReconcilerError::duplicate_section(&section.id));
            }
            let mut cell_ids = HashSet::with_capacity(section.cells.len());
            for cell in &section.cells {
                if !cell_ids.insert(&cell.id) {
                    return Err(ReconcilerError::duplicate_cell(&section.id, &cell.id));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IdentityScope;

    #[derive(Debug)]
    struct Text(String);

    impl Component for Text {
        type ViewModel = String;

        fn view_model(&self) -> &String {
            &self.0
        }
    }

    fn text(s: &str) -> Text {
        Text(s.to_string())
    }

    #[test]
    fn cell_ids_may_repeat_across_sections() {
        let list = List::new(vec![
            Section::new("A", vec![Cell::new("C", text("1"))]),
            Section::new("B", vec![Cell::new("C", text("2"))]),
        ]);
        assert!(list.validate().is_ok());
        assert_eq!(
            list.index_path_of(&"B".into(), &"C".into()),
            Some(IndexPath::new(1, 0))
        );
    }

    #[test]
    fn duplicate_section_ids_rejected() {
        let list = List::new(vec![Section::new("A", vec![]), Section::new("A", vec![])]);
        assert_eq!(
            list.validate(),
            Err(ReconcilerError::DuplicateIdentity {
                scope: IdentityScope::Sections,
                id: "A".into(),
            })
        );
    }

    #[test]
    fn duplicate_cell_ids_rejected() {
        let list = List::new(vec![Section::new(
            "A",
            vec![Cell::new("C", text("1")), Cell::new("C", text("2"))],
        )]);
        assert!(matches!(
            list.validate(),
            Err(ReconcilerError::DuplicateIdentity {
                scope: IdentityScope::Cells { .. },
                ..
            })
        ));
    }

    #[test]
    fn content_equality_covers_headers() {
        let plain = List::new(vec![Section::new("A", vec![])]);
        let with_header = List::new(vec![Section::new("A", vec![]).with_header(text("h"))]);
        assert!(!plain.is_content_equal(&with_header));
        assert!(with_header.is_content_equal(&with_header.clone()));
    }

    #[test]
    fn content_kinds_are_deduplicated() {
        let list = List::new(vec![
            Section::new("A", vec![Cell::new("1", text("x")), Cell::new("2", text("y"))])
                .with_footer(text("f")),
        ]);
        let kinds = list.content_kinds();
        assert_eq!(kinds.len(), 1);
        assert_eq!(list.cell_count(), 2);
    }
}
