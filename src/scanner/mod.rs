//! Directory walking and exclusion rules

mod exclude;
mod walker;

pub use exclude::ExclusionRules;
pub use walker::{canonical_roots, TreeWalker};
