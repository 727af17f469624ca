mod backoff;
pub(crate) mod engine;

pub use backoff::Backoff;
pub use engine::SyncState;
