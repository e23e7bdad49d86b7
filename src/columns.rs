/// Column registry
///
/// Tracks the columns of the loaded dataset and which of them are shown.
/// The selection is always a non-empty subset of the dataset's columns, kept
/// in dataset order; users include or exclude columns but cannot reorder them.
use crate::error::ViewError;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnRegistry {
    all_columns: Vec<String>,
    selected: Vec<String>,
}

impl ColumnRegistry {
    /// Registry for a freshly loaded dataset: every column selected.
    pub fn new(columns: &[String]) -> Self {
        ColumnRegistry {
            all_columns: columns.to_vec(),
            selected: columns.to_vec(),
        }
    }

    pub fn all_columns(&self) -> &[String] {
        &self.all_columns
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.all_columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.all_columns.iter().any(|c| c == column)
    }

    pub fn is_selected(&self, column: &str) -> bool {
        self.selected.iter().any(|c| c == column)
    }

    /// Replace the selection.
    ///
    /// Rejected without any change if a name is unknown or if nothing would
    /// remain selected.
    pub fn select<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<(), ViewError> {
        let requested: HashSet<&str> = columns.iter().map(AsRef::as_ref).collect();
        if let Some(unknown) = requested.iter().find(|name| !self.contains(name)) {
            return Err(ViewError::UnknownColumn(unknown.to_string()));
        }

        let selected: Vec<String> = self
            .all_columns
            .iter()
            .filter(|c| requested.contains(c.as_str()))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(ViewError::EmptySelection);
        }

        self.selected = selected;
        Ok(())
    }

    /// Positions of the selected columns within the full column list.
    pub fn selected_positions(&self) -> Vec<usize> {
        self.all_columns
            .iter()
            .enumerate()
            .filter(|(_, c)| self.is_selected(c))
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ColumnRegistry {
        ColumnRegistry::new(&["Name".to_string(), "Age".to_string(), "Status".to_string()])
    }

    #[test]
    fn test_defaults_to_full_projection() {
        let reg = registry();
        assert_eq!(reg.selected(), reg.all_columns());
        assert_eq!(reg.selected_positions(), vec![0, 1, 2]);
    }

    #[test]
    fn test_select_keeps_dataset_order() {
        let mut reg = registry();
        reg.select(&["Status", "Name"]).unwrap();
        assert_eq!(reg.selected(), &["Name", "Status"]);
        assert_eq!(reg.selected_positions(), vec![0, 2]);
    }

    #[test]
    fn test_empty_selection_rejected() {
        let mut reg = registry();
        reg.select(&["Age"]).unwrap();
        let empty: [&str; 0] = [];
        assert_eq!(reg.select(&empty), Err(ViewError::EmptySelection));
        assert_eq!(reg.selected(), &["Age"]);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let mut reg = registry();
        assert_eq!(
            reg.select(&["Name", "Nope"]),
            Err(ViewError::UnknownColumn("Nope".to_string()))
        );
        assert_eq!(reg.selected().len(), 3);
    }

    #[test]
    fn test_empty_dataset_registry() {
        let reg = ColumnRegistry::new(&[]);
        assert!(reg.is_empty());
        assert!(reg.selected().is_empty());
    }
}
