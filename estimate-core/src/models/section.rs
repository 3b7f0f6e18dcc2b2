use serde::{Deserialize, Serialize};

use super::line_item::LineItem;

/// One named bucket of line items.
///
/// `name` is the grouping key that items reference; renames touch only
/// `display_label` so the item→section association can never be orphaned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_label: Option<String>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_label: None,
        }
    }

    /// Label shown to the user; falls back to the key when never renamed.
    pub fn label(&self) -> &str {
        self.display_label.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered collection of sections; position is the index in the backing Vec.
///
/// The registry defines the iteration order the pricing cascade consumes and
/// the `section_order` persisted with the estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRegistry {
    sections: Vec<Section>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a persisted canonical order.
    pub fn from_order<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.add(name, None);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    /// Canonical order of section names, as persisted.
    pub fn order(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.name.clone()).collect()
    }

    /// Appends a section to the end of the canonical order.
    /// Silent no-op when the name is already present.
    pub fn add(&mut self, name: impl Into<String>, display_label: Option<String>) {
        let name = name.into();
        if self.contains(&name) {
            return;
        }
        self.sections.push(Section {
            name,
            display_label,
        });
    }

    /// Changes the display label only; the grouping key never changes.
    /// Silent no-op when the section is unknown.
    pub fn rename(&mut self, name: &str, new_label: impl Into<String>) {
        if let Some(section) = self.sections.iter_mut().find(|s| s.name == name) {
            section.display_label = Some(new_label.into());
        }
    }

    /// Moves one entry from `from` to `to` as a stable remove-then-insert.
    /// Out-of-range indices are a no-op.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from >= self.sections.len() || to >= self.sections.len() {
            return;
        }
        let section = self.sections.remove(from);
        self.sections.insert(to, section);
    }

    /// Removes a section from the canonical order.
    ///
    /// Returns whether the section existed. Cascading removal of the
    /// section's items is the aggregate's job; see `Estimate::remove_section`.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.sections.remove(index);
                true
            }
            None => false,
        }
    }

    /// Appends every distinct section name referenced by `items` that is not
    /// yet in the canonical order. Existing entries are never reordered.
    pub fn sync_new_sections(&mut self, items: &[LineItem]) {
        for item in items {
            if !self.contains(&item.section) {
                self.add(item.section.clone(), None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use crate::models::line_item::ItemKind;

    use super::*;

    fn item_in(section: &str) -> LineItem {
        LineItem {
            id: None,
            name: "x".to_string(),
            description: String::new(),
            section: section.to_string(),
            unit: String::new(),
            quantity: dec!(1),
            unit_price: dec!(1),
            markup_override: None,
            taxable: true,
            kind: ItemKind::Miscellaneous,
        }
    }

    fn registry(names: &[&str]) -> SectionRegistry {
        SectionRegistry::from_order(names.iter().copied())
    }

    #[test]
    fn add_appends_in_insertion_order() {
        let reg = registry(&["Roof System", "Labour", "Shop"]);

        assert_eq!(reg.order(), vec!["Roof System", "Labour", "Shop"]);
    }

    #[test]
    fn add_duplicate_is_a_silent_noop() {
        let mut reg = registry(&["Roof System", "Labour"]);

        reg.add("Roof System", Some("Duplicate".to_string()));

        assert_eq!(reg.order(), vec!["Roof System", "Labour"]);
        assert_eq!(reg.iter().next().unwrap().display_label, None);
    }

    #[test]
    fn rename_changes_label_but_not_key() {
        let mut reg = registry(&["Roof System"]);

        reg.rename("Roof System", "Main Roof");

        let section = reg.iter().next().unwrap();
        assert_eq!(section.name, "Roof System");
        assert_eq!(section.label(), "Main Roof");
    }

    #[test]
    fn rename_unknown_section_is_a_noop() {
        let mut reg = registry(&["Roof System"]);

        reg.rename("Gutters", "Eaves");

        assert_eq!(reg.order(), vec!["Roof System"]);
    }

    #[test]
    fn label_falls_back_to_name() {
        let section = Section::new("Shop");

        assert_eq!(section.label(), "Shop");
    }

    #[test]
    fn reorder_is_a_stable_move_not_a_swap() {
        let mut reg = registry(&["A", "B", "C", "D"]);

        reg.reorder(0, 2);

        // A stable move shifts B and C left; a swap would have produced
        // ["C", "B", "A", "D"].
        assert_eq!(reg.order(), vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn reorder_toward_front() {
        let mut reg = registry(&["A", "B", "C", "D"]);

        reg.reorder(3, 1);

        assert_eq!(reg.order(), vec!["A", "D", "B", "C"]);
    }

    #[test]
    fn reorder_out_of_range_is_a_noop() {
        let mut reg = registry(&["A", "B"]);

        reg.reorder(0, 5);
        reg.reorder(9, 0);

        assert_eq!(reg.order(), vec!["A", "B"]);
    }

    #[test]
    fn remove_drops_the_section_and_reports_existence() {
        let mut reg = registry(&["A", "B", "C"]);

        assert!(reg.remove("B"));
        assert!(!reg.remove("B"));
        assert_eq!(reg.order(), vec!["A", "C"]);
    }

    #[test]
    fn sync_new_sections_appends_without_reordering() {
        let mut reg = registry(&["Labour"]);
        let items = vec![item_in("Roof System"), item_in("Labour"), item_in("Shop")];

        reg.sync_new_sections(&items);

        assert_eq!(reg.order(), vec!["Labour", "Roof System", "Shop"]);
    }

    #[test]
    fn sync_new_sections_is_idempotent() {
        let mut reg = registry(&[]);
        let items = vec![item_in("Shop"), item_in("Shop")];

        reg.sync_new_sections(&items);
        reg.sync_new_sections(&items);

        assert_eq!(reg.order(), vec!["Shop"]);
    }
}
