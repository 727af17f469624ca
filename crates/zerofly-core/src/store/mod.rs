mod change;
pub(crate) mod collection;
mod data_store;
mod refresh;
pub(crate) mod writer;

pub use change::{Change, ChangeSet};
pub use data_store::{DataStore, ModelSnapshot};
pub(crate) use refresh::RefreshSnapshot;
