//! Terminal interaction: progress bars and the selector

mod progress;
mod selector;

pub use progress::{format_committed, ProgressReporter};
pub use selector::{parse_choices, Selector, TermSelector};
