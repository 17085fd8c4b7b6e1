//! Minimal CPU tensor engine used by the variable store.
//!
//! Only what a parameter registry needs: typed contiguous buffers, creation
//! and initialization, in-place overwrite, host byte extraction and explicit
//! release. No arithmetic kernels, no autograd.

pub mod buffer;
pub mod device;
pub mod error;
pub mod init;
pub mod tensor;
pub mod tensor_data;
pub mod types;

pub use device::StorageDevice;
pub use error::VarStoreError;
pub use init::Init;
pub use tensor::Tensor;
pub use types::DType;
