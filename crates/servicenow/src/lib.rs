//! ServiceNow integration: REST client, dataset collection, and the
//! instance sync pipeline.

pub mod client;
pub mod collector;
pub mod sync;
