//! Request handlers.
//!
//! Thin glue between the HTTP surface and the core components: the
//! verified upload pipeline lives in [`upload`], metadata and content
//! lookups (including the legacy `/testing` endpoints) in [`retrieve`].

pub mod retrieve;
pub mod upload;
