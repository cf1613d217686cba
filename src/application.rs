//! Application layer module
//!
//! The pipeline steps and the logic that orchestrates the domain rules over
//! the infrastructure adapters.

pub mod caption;
pub mod collector;
pub mod digest;
pub mod links;
pub mod pipeline;
pub mod publisher;
pub mod reporter;

pub use collector::{CollectionSummary, Collector, read_category_list};
pub use links::{LinkBuilder, LinkRow};
pub use pipeline::{PublishOptions, PublishOutcome, run_all, run_collect, run_links, run_publish, run_report};
pub use publisher::{PublishSummary, Publisher};
pub use reporter::{CommissionPolicy, Reporter};
