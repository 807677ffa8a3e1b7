//! View projection: the filtered, searched and sorted slice of tasks that a
//! surface displays, plus aggregate counters. Pure; recomputed on every render.

use std::cmp::Reverse;

use crate::fields::Filter;
use crate::task::Task;

/// Counters over the whole collection, independent of filter and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub active: usize,
    pub completed: usize,
    pub total: usize,
    /// Whole percentage of completed tasks, 0 for an empty collection.
    pub completion_rate: u8,
}

impl TaskStats {
    pub fn compute(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        let total = tasks.len();
        let completion_rate = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u8
        };
        TaskStats {
            active: total - completed,
            completed,
            total,
            completion_rate,
        }
    }
}

/// What a surface shows for one filter/search combination.
#[derive(Debug, Clone)]
pub struct TaskView<'a> {
    pub tasks: Vec<&'a Task>,
    pub stats: TaskStats,
}

/// Project the collection for display.
///
/// 1. keep tasks admitted by `filter`;
/// 2. keep tasks whose title or description contains `search`, ignoring case;
/// 3. order open before done, then by priority rank, then newest first.
pub fn project<'a>(tasks: &'a [Task], filter: Filter, search: &str) -> TaskView<'a> {
    let needle = search.to_lowercase();
    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|t| filter.admits(t.completed))
        .filter(|t| t.matches_search(&needle))
        .collect();
    visible.sort_by_key(|t| (t.completed, Reverse(t.priority.rank()), Reverse(t.created_at)));

    TaskView {
        tasks: visible,
        stats: TaskStats::compute(tasks),
    }
}
