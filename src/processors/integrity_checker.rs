use crate::models::schema::TIME_FROM;
use crate::models::{Table, Value};
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;

/// Outcome of a join, used to spot key formats that failed to line up.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinIntegrityReport {
    pub left_rows: usize,
    pub right_rows: usize,
    pub left_null_keys: usize,
    pub right_null_keys: usize,
    pub left_unparsed_times: usize,
    pub right_unparsed_times: usize,
    pub distinct_left_keys: usize,
    pub distinct_right_keys: usize,
    pub shared_keys: usize,
    pub merged_rows: usize,
}

impl JoinIntegrityReport {
    /// Both inputs had rows but nothing joined.
    pub fn is_silent_empty_join(&self) -> bool {
        self.merged_rows == 0 && self.left_rows > 0 && self.right_rows > 0
    }

    pub fn match_rate(&self) -> f64 {
        if self.distinct_left_keys == 0 {
            return 0.0;
        }
        self.shared_keys as f64 / self.distinct_left_keys as f64
    }
}

/// One join input: the table as handed to the merger, the same table after
/// key harmonisation, and its per-row join keys (`None` when a part is null).
pub struct JoinSide<'a, K> {
    pub raw: &'a Table,
    pub harmonized: &'a Table,
    pub keys: &'a [Option<K>],
}

pub struct IntegrityChecker {
    time_key: String,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            time_key: TIME_FROM.to_string(),
        }
    }

    /// Compare the key sets of both join inputs with the joined result.
    pub fn check_join<K>(
        &self,
        left: JoinSide<'_, K>,
        right: JoinSide<'_, K>,
        merged: &Table,
    ) -> JoinIntegrityReport
    where
        K: Eq + Hash,
    {
        let left_set: HashSet<&K> = left.keys.iter().flatten().collect();
        let right_set: HashSet<&K> = right.keys.iter().flatten().collect();

        JoinIntegrityReport {
            left_rows: left.harmonized.height(),
            right_rows: right.harmonized.height(),
            left_null_keys: left.keys.iter().filter(|k| k.is_none()).count(),
            right_null_keys: right.keys.iter().filter(|k| k.is_none()).count(),
            left_unparsed_times: self.unparsed_times(left.raw, left.harmonized),
            right_unparsed_times: self.unparsed_times(right.raw, right.harmonized),
            distinct_left_keys: left_set.len(),
            distinct_right_keys: right_set.len(),
            shared_keys: left_set.intersection(&right_set).count(),
            merged_rows: merged.height(),
        }
    }

    /// Time keys present in `raw` that did not come out of harmonisation as
    /// `HH:MM`.
    pub fn unparsed_times(&self, raw: &Table, harmonized: &Table) -> usize {
        match (raw.column(&self.time_key), harmonized.column(&self.time_key)) {
            (Some(before), Some(after)) => before
                .values()
                .iter()
                .zip(after.values())
                .filter(|(b, a)| !b.is_null() && !is_canonical_time(a))
                .count(),
            _ => 0,
        }
    }

    pub fn generate_summary(&self, report: &JoinIntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Join Integrity Report ===\n");
        summary.push_str(&format!(
            "Input Rows: {} left, {} right\n",
            report.left_rows, report.right_rows
        ));
        summary.push_str(&format!(
            "Null Keys: {} left, {} right\n",
            report.left_null_keys, report.right_null_keys
        ));
        summary.push_str(&format!(
            "Unparsed Times: {} left, {} right\n",
            report.left_unparsed_times, report.right_unparsed_times
        ));
        summary.push_str(&format!(
            "Distinct Keys: {} left, {} right, {} shared ({:.1}% of left)\n",
            report.distinct_left_keys,
            report.distinct_right_keys,
            report.shared_keys,
            100.0 * report.match_rate()
        ));
        summary.push_str(&format!("Merged Rows: {}\n", report.merged_rows));

        if report.is_silent_empty_join() {
            summary.push_str("\nWarning: both inputs have rows but the join is empty\n");
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// `HH:MM`, zero padded, within the 24-hour clock.
pub fn is_canonical_time(value: &Value) -> bool {
    let Some(s) = value.as_str() else {
        return false;
    };
    let bytes = s.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let digits = |a: u8, b: u8| -> Option<u32> {
        (a.is_ascii_digit() && b.is_ascii_digit())
            .then(|| u32::from(a - b'0') * 10 + u32::from(b - b'0'))
    };
    matches!(
        (digits(bytes[0], bytes[1]), digits(bytes[3], bytes[4])),
        (Some(h), Some(m)) if h < 24 && m < 60
    )
}
