//! Acquisition core for a feed reader: fetch pages and feeds, extract items
//! with CSS selectors, deduplicate them and page through what was stored.

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod pagination;
pub mod services;
pub mod sources;
pub mod storage;
