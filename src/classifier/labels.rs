// Label table - class index to genre label mapping

use std::collections::HashSet;

use crate::error::StartupError;

/// Ordered genre labels; position is the classifier's class index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Build a table, rejecting empty tables and duplicate labels
    pub fn new<I, S>(labels: I) -> Result<Self, StartupError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(StartupError::EmptyLabelTable);
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(StartupError::DuplicateLabel {
                    label: label.clone(),
                });
            }
        }

        Ok(Self { labels })
    }

    /// Require the table to cover exactly the classifier's outputs
    pub fn validate_against(&self, output_dim: usize) -> Result<(), StartupError> {
        if self.labels.len() != output_dim {
            return Err(StartupError::LabelMismatch {
                labels: self.labels.len(),
                outputs: output_dim,
            });
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_index() {
        let table = LabelTable::new(["rock", "pop", "jazz"]).unwrap();
        assert_eq!(table.get(0), Some("rock"));
        assert_eq!(table.get(2), Some("jazz"));
        assert_eq!(table.get(3), None);
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["rock", "pop", "jazz"]);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert_eq!(
            LabelTable::new(Vec::<String>::new()).unwrap_err(),
            StartupError::EmptyLabelTable
        );
    }

    #[test]
    fn test_duplicate_label_rejected() {
        assert!(matches!(
            LabelTable::new(["rock", "pop", "rock"]),
            Err(StartupError::DuplicateLabel { .. })
        ));
    }

    #[test]
    fn test_validate_against_output_dim() {
        let table = LabelTable::new(["a", "b"]).unwrap();
        assert!(table.validate_against(2).is_ok());
        assert_eq!(
            table.validate_against(10).unwrap_err(),
            StartupError::LabelMismatch {
                labels: 2,
                outputs: 10
            }
        );
    }
}
