//! Hosted-database tools for docforge
//!
//! A thin Notion REST client: pages are created, updated, archived, and
//! queried against a database, with page properties forwarded as raw JSON.
//! Property mapping stays with the caller.

mod notion;

pub use notion::{NotionClient, NotionError};
