//! Core domain logic for the ComplianceIQ instance service.
//!
//! Pure types and functions with no database or HTTP dependencies:
//! the error taxonomy, credential blobs and their vault, instance
//! validation rules, and the ServiceNow configuration value injected
//! into the sync pipeline.

pub mod credentials;
pub mod error;
pub mod instance;
pub mod servicenow_config;
pub mod status;
pub mod types;
pub mod vault;
