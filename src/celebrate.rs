//! Cosmetic feedback fired by the task store.
//!
//! Creating a task earns a small celebration, completing one a large one.
//! Sinks carry no state the store depends on and are never retried.

use std::cell::RefCell;
use std::rc::Rc;

/// Intensity of a celebration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Celebration {
    Small,
    Large,
}

impl Celebration {
    /// One-line cheer used by the CLI and the TUI status bar.
    pub fn message(self) -> &'static str {
        match self {
            Celebration::Small => "✨ Task added",
            Celebration::Large => "🎉 Task completed! Great work!",
        }
    }
}

/// Observer of celebration events.
pub trait CelebrationSink {
    fn celebrate(&self, celebration: Celebration);
}

/// Discards every event.
#[cfg(test)]
pub struct Quiet;

#[cfg(test)]
impl CelebrationSink for Quiet {
    fn celebrate(&self, _celebration: Celebration) {}
}

/// Prints the cheer to stdout.
pub struct PrintCheer;

impl CelebrationSink for PrintCheer {
    fn celebrate(&self, celebration: Celebration) {
        println!("{}", celebration.message());
    }
}

/// Keeps events until the owner drains them. Clones share the same queue,
/// so one clone can be handed to the store while another is polled by the UI.
#[derive(Clone, Default)]
pub struct CelebrationQueue {
    events: Rc<RefCell<Vec<Celebration>>>,
}

impl CelebrationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return all pending events, oldest first.
    pub fn drain(&self) -> Vec<Celebration> {
        self.events.borrow_mut().drain(..).collect()
    }
}

impl CelebrationSink for CelebrationQueue {
    fn celebrate(&self, celebration: Celebration) {
        self.events.borrow_mut().push(celebration);
    }
}
