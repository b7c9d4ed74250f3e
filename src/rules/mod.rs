//! Rule engine.
//!
//! Maps track metadata to a wallpaper through an ordered, priority-ranked
//! set of match rules. Patterns are compiled when the rules are loaded, so a
//! bad regex is a startup error and selection itself cannot fail.

mod predicate;
mod ruleset;

pub use predicate::{Condition, Predicate};
pub use ruleset::{MatchRule, RuleSet};
