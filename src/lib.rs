//! Safety data sheet ingestion: page splitting, boilerplate removal, section
//! parsing and product name extraction, producing records that can be looked
//! up and returned verbatim.

pub mod answer;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod signature;
pub mod store;
pub mod util;
