//! Data a review renders from, and the task actions taken while reviewing.

pub mod actions;
pub mod aggregator;
pub mod suggestions;

pub use actions::TaskActionDispatcher;
pub use aggregator::{ReviewDataAggregator, ReviewWorldView};
pub use suggestions::{StalenessPolicy, Suggestion, SuggestionPolicy};
