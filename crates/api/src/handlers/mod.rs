//! HTTP request handlers.

pub mod instances;
