//! Read path: query plans, their translation to native search requests,
//! the relevance threshold protocol, listings and suggestions.

pub mod filter_parser;
pub mod listing;
pub mod plan;
pub mod relevance;
pub mod suggest;
pub mod translate;

pub use listing::{GroupValue, Listing, DEFAULT_PAGE_SIZE, MAX_RESULT_WINDOW};
pub use plan::{CompareOp, Condition, OrderBy, QueryPlan, SortDirection, VariantMode};
pub use relevance::RELEVANCE_RETENTION;
pub use suggest::{Suggestion, SUGGESTION_CONFIDENCE_FLOOR};
pub use translate::{translate, TranslatedQuery};
