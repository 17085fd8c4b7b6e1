//! Hierarchical variable store.
//!
//! A [`VarStore`] binds fully qualified names such as `"encoder.layer1.weight"`
//! to tensors on a single device. Names are built by descending a [`Path`]
//! tree; creation goes through get-or-create initializers so each name is
//! backed by exactly one tensor for the lifetime of the store. Stores can be
//! saved to, and loaded from, an archive atomically.

pub mod archive;
pub mod config;
pub mod entry;
pub mod path;
pub mod store;
pub mod summary;
pub mod var;

pub use config::VarStoreConfig;
pub use entry::Entry;
pub use path::{Path, SEPARATOR};
pub use store::VarStore;
pub use summary::{VarInfo, VarSummary};
pub use var::Var;

pub use varstore_core::{DType, Init, StorageDevice, Tensor, VarStoreError};
