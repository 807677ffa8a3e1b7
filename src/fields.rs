//! Enumerations and field types for task management.
//!
//! This module defines the small closed sets used to classify and select tasks:
//! priorities and the status filters offered by both the CLI and the TUI.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Priority classification for task importance.
///
/// Ordering is only ever taken from [`Priority::rank`], never from the
/// declaration order of the variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[serde(alias = "low", alias = "Low")]
    Low,
    #[default]
    #[serde(alias = "medium", alias = "Medium")]
    Medium,
    #[serde(alias = "high", alias = "High")]
    High,
}

impl Priority {
    /// Sort rank, higher is more important.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    /// Wire name as used in the snapshot and by the task parser.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }

    /// Parse a wire name, accepting any letter case.
    pub fn from_wire(s: &str) -> Option<Priority> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Some(Priority::Low),
            "MEDIUM" => Some(Priority::Medium),
            "HIGH" => Some(Priority::High),
            _ => None,
        }
    }

    /// The next priority in the cycle used by form selectors.
    pub fn cycle(self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }
}

/// Completion status filter applied by the view projection.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum Filter {
    All,
    #[default]
    Active,
    Completed,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    /// Whether a task with the given completion flag passes this filter.
    pub fn admits(self, completed: bool) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !completed,
            Filter::Completed => completed,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Filter::All => 0,
            Filter::Active => 1,
            Filter::Completed => 2,
        }
    }

    pub fn next(self) -> Filter {
        Filter::ALL[(self.index() + 1) % Filter::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rank_is_explicit() {
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
    }

    #[test]
    fn test_priority_wire_names() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"HIGH\"");
        let p: Priority = serde_json::from_str("\"LOW\"").unwrap();
        assert_eq!(p, Priority::Low);
        assert_eq!(Priority::from_wire("medium"), Some(Priority::Medium));
        assert_eq!(Priority::from_wire("urgent"), None);
    }

    #[test]
    fn test_filter_admits() {
        assert!(Filter::All.admits(true) && Filter::All.admits(false));
        assert!(Filter::Active.admits(false) && !Filter::Active.admits(true));
        assert!(Filter::Completed.admits(true) && !Filter::Completed.admits(false));
        assert_eq!(Filter::Completed.next(), Filter::All);
    }
}
