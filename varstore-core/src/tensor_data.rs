// src/tensor_data.rs
use std::fmt::Debug;

use crate::buffer::{Buffer, CpuBuffer};
use crate::device::StorageDevice;
use crate::error::VarStoreError;
use crate::types::DType;

/// Internal storage and metadata for a Tensor.
///
/// Wrapped in `Arc<RwLock<TensorData>>` by the `Tensor` struct so that every
/// alias of a tensor observes in-place writes and releases.
#[derive(Debug)]
pub struct TensorData {
    /// The underlying data buffer (host memory or released).
    pub(crate) buffer: Buffer,
    /// The device where the buffer resides.
    pub(crate) device: StorageDevice,
    /// The data type of the elements in the buffer.
    pub(crate) dtype: DType,
    /// The shape (dimensions) of the tensor. Always contiguous, row-major.
    pub(crate) shape: Vec<usize>,
    /// Flag indicating if the tensor is a trainable parameter.
    pub(crate) requires_grad: bool,
}

impl TensorData {
    /// Creates a new CPU `TensorData` from an already typed buffer.
    ///
    /// # Errors
    /// Returns `VarStoreError::TensorCreationError` if the buffer length does not match
    /// the total number of elements specified by `shape`.
    pub fn new(buffer: CpuBuffer, shape: Vec<usize>) -> Result<Self, VarStoreError> {
        let numel: usize = shape.iter().product();
        let data_len = buffer.len();
        if data_len != numel {
            return Err(VarStoreError::TensorCreationError { data_len, shape });
        }
        Ok(TensorData {
            dtype: buffer.dtype(),
            buffer: Buffer::Cpu(buffer),
            device: StorageDevice::CPU,
            shape,
            requires_grad: false,
        })
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}
