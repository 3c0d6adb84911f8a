use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, sync::Arc};

pub const BATCH_PREFIX: &str = "batch_";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Arc<str>);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Arc::from(id.into()))
    }

    /// Fresh random identifier for a single executor run.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Identifier of a materialized batch, `batch_<index>`.
///
/// Ordering follows the numeric index so that `batch_10` sorts after
/// `batch_2`; ids without a parsable index sort after all indexed ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(Arc<str>);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Arc::from(id.into()))
    }

    pub fn from_index(index: usize) -> Self {
        Self::new(format!("{BATCH_PREFIX}{index}"))
    }

    /// Numeric index of a canonical `batch_<index>` id. Spellings such as
    /// `batch_01` or `batch_+1` have none, so two ids share an index only
    /// when they are equal.
    pub fn index(&self) -> Option<usize> {
        let digits = self.0.strip_prefix(BATCH_PREFIX)?;
        let canonical = digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'));
        if !canonical {
            return None;
        }
        digits.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for BatchId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.index(), other.index()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for BatchId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<String> for BatchId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for BatchId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_ids_sort_by_numeric_index() {
        let mut ids: Vec<BatchId> = ["batch_10", "batch_2", "notes", "batch_0"]
            .into_iter()
            .map(BatchId::from)
            .collect();
        ids.sort();

        let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(names, vec!["batch_0", "batch_2", "batch_10", "notes"]);
    }

    #[test]
    fn index_round_trips_through_from_index() {
        assert_eq!(BatchId::from_index(7).index(), Some(7));
        assert_eq!(BatchId::from("batch_x").index(), None);
    }

    #[test]
    fn zero_padded_ids_are_not_indexed() {
        let padded = BatchId::from("batch_01");
        let plain = BatchId::from("batch_1");
        assert_eq!(padded.index(), None);
        assert_eq!(BatchId::from("batch_+1").index(), None);
        assert_eq!(BatchId::from("batch_0").index(), Some(0));

        assert_ne!(padded.cmp(&plain), Ordering::Equal);
        assert!(plain < padded);
    }
}
