//! Domain module - products, report rows and the rules that derive one from the other
//!
//! Everything in here is pure: no I/O, no clocks. The infrastructure and
//! application layers build on these types.

pub mod constants;
pub mod price;
pub mod product;
pub mod report;
pub mod services;
pub mod sku;

// Re-export commonly used items for convenience
pub use price::{format_price, normalize_price, round_to_cents};
pub use product::{CardCandidate, Product};
pub use report::ReportRow;
pub use services::{ChannelError, FetchError, MessageChannel, PageFetcher};
pub use sku::{derive_sku, normalize_url};
