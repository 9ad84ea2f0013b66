//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod dataset_repo;
pub mod instance_repo;
pub mod sync_history_repo;

pub use dataset_repo::DatasetRepo;
pub use instance_repo::InstanceRepo;
pub use sync_history_repo::SyncHistoryRepo;
