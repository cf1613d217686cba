//! TRM affiliate pipeline
//!
//! Scrapes product listings from category pages, turns them into a commission
//! report and posts the report to a Telegram chat without repeating itself.

pub mod application;
pub mod domain;
pub mod infrastructure;
