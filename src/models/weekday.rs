use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Source-locale label, target-locale label.
const LABELS: &[(Weekday, &str, &str)] = &[
    (Weekday::Monday, "Monday", "Montag"),
    (Weekday::Tuesday, "Tuesday", "Dienstag"),
    (Weekday::Wednesday, "Wednesday", "Mittwoch"),
    (Weekday::Thursday, "Thursday", "Donnerstag"),
    (Weekday::Friday, "Friday", "Freitag"),
    (Weekday::Saturday, "Saturday", "Samstag"),
    (Weekday::Sunday, "Sunday", "Sonntag"),
];

impl Weekday {
    pub fn from_source_label(label: &str) -> Option<Self> {
        LABELS
            .iter()
            .find(|(_, source, _)| *source == label)
            .map(|(day, _, _)| *day)
    }

    pub fn from_target_label(label: &str) -> Option<Self> {
        LABELS
            .iter()
            .find(|(_, _, target)| *target == label)
            .map(|(day, _, _)| *day)
    }

    pub fn source_label(&self) -> &'static str {
        LABELS[self.index()].1
    }

    pub fn target_label(&self) -> &'static str {
        LABELS[self.index()].2
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self, Weekday::Saturday | Weekday::Sunday)
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// Translate a source label, failing on anything outside the closed
    /// source vocabulary (already translated labels included).
    pub fn translate(column: &str, label: &str) -> Result<&'static str> {
        Self::from_source_label(label)
            .map(|day| day.target_label())
            .ok_or_else(|| ProcessingError::UnknownCategory {
                column: column.to_string(),
                label: label.to_string(),
            })
    }
}
