// src/tensor/mod.rs

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::CpuBuffer;
use crate::device::StorageDevice;
use crate::error::VarStoreError;
use crate::tensor_data::TensorData;
use crate::types::DType;

pub mod create;
mod inplace_ops;

pub use create::{from_host_bytes, full, kaiming_uniform, ones, randn, uniform, validate_shape, zeros};

/// A contiguous multi-dimensional array.
///
/// `Tensor` uses `Arc<RwLock<TensorData>>` internally:
/// 1.  **Shared Ownership:** clones are aliases of the same storage, so an
///     in-place write through one alias is visible through all of them.
/// 2.  **Interior Mutability:** contents, dtype and the trainable flag can be
///     changed through a shared reference; the `RwLock` keeps that thread safe.
pub struct Tensor {
    pub(crate) data: Arc<RwLock<TensorData>>,
}

impl Tensor {
    /// Creates a new f32 tensor on the CPU from row-major data.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, VarStoreError> {
        Self::from_buffer(CpuBuffer::F32(data_vec), shape)
    }

    /// Creates a new f64 tensor on the CPU from row-major data.
    pub fn new_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, VarStoreError> {
        Self::from_buffer(CpuBuffer::F64(data_vec), shape)
    }

    /// Creates a new i64 tensor on the CPU from row-major data.
    pub fn new_i64(data_vec: Vec<i64>, shape: Vec<usize>) -> Result<Self, VarStoreError> {
        Self::from_buffer(CpuBuffer::I64(data_vec), shape)
    }

    pub(crate) fn from_buffer(buffer: CpuBuffer, shape: Vec<usize>) -> Result<Self, VarStoreError> {
        let tensor_data = TensorData::new(buffer, shape)?;
        Ok(Tensor {
            data: Arc::new(RwLock::new(tensor_data)),
        })
    }

    /// Acquires a read lock on the tensor's data.
    ///
    /// `TensorData` holds plain values, so a lock poisoned by a panicking
    /// writer is recovered rather than propagated.
    pub fn read_data(&self) -> RwLockReadGuard<'_, TensorData> {
        self.data.read().unwrap_or_else(|poisoned: PoisonError<_>| {
            log::warn!("RwLock for tensor data was poisoned. Recovering read guard.");
            poisoned.into_inner()
        })
    }

    /// Acquires a write lock on the tensor's data. See [`Tensor::read_data`].
    pub fn write_data(&self) -> RwLockWriteGuard<'_, TensorData> {
        self.data.write().unwrap_or_else(|poisoned: PoisonError<_>| {
            log::warn!("RwLock for tensor data was poisoned. Recovering write guard.");
            poisoned.into_inner()
        })
    }

    pub fn dtype(&self) -> DType {
        self.read_data().dtype
    }

    pub fn device(&self) -> StorageDevice {
        self.read_data().device
    }

    pub fn shape(&self) -> Vec<usize> {
        self.read_data().shape.clone()
    }

    pub fn numel(&self) -> usize {
        self.read_data().numel()
    }

    pub fn requires_grad(&self) -> bool {
        self.read_data().requires_grad
    }

    pub fn set_requires_grad(&self, requires_grad: bool) {
        self.write_data().requires_grad = requires_grad;
    }

    /// Returns `true` once [`Tensor::release`] has run on any alias.
    pub fn is_released(&self) -> bool {
        self.read_data().buffer.is_released()
    }

    /// Returns `true` if both tensors are aliases of the same storage.
    pub fn same_storage(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Attempts to get the tensor data as a `Vec<f32>`.
    /// Returns an error if the tensor is not on the CPU, not F32, or released.
    pub fn get_f32_data(&self) -> Result<Vec<f32>, VarStoreError> {
        match self.read_data().buffer.try_cpu("get_f32_data")? {
            CpuBuffer::F32(v) => Ok(v.clone()),
            other => Err(VarStoreError::DataTypeMismatch {
                expected: DType::F32,
                actual: other.dtype(),
                operation: "get_f32_data".to_string(),
            }),
        }
    }

    /// Attempts to get the tensor data as a `Vec<f64>`.
    pub fn get_f64_data(&self) -> Result<Vec<f64>, VarStoreError> {
        match self.read_data().buffer.try_cpu("get_f64_data")? {
            CpuBuffer::F64(v) => Ok(v.clone()),
            other => Err(VarStoreError::DataTypeMismatch {
                expected: DType::F64,
                actual: other.dtype(),
                operation: "get_f64_data".to_string(),
            }),
        }
    }

    /// Attempts to get the tensor data as a `Vec<i64>`.
    pub fn get_i64_data(&self) -> Result<Vec<i64>, VarStoreError> {
        match self.read_data().buffer.try_cpu("get_i64_data")? {
            CpuBuffer::I64(v) => Ok(v.clone()),
            other => Err(VarStoreError::DataTypeMismatch {
                expected: DType::I64,
                actual: other.dtype(),
                operation: "get_i64_data".to_string(),
            }),
        }
    }

    /// Extracts the contents as raw little-endian bytes, copying off-device if needed.
    ///
    /// # Errors
    /// `Serialization` if the storage was released or lives on a device the
    /// host cannot read.
    pub fn to_host_bytes(&self) -> Result<Vec<u8>, VarStoreError> {
        let guard = self.read_data();
        let cpu = guard
            .buffer
            .try_cpu("to_host_bytes")
            .map_err(|e| VarStoreError::Serialization(format!("cannot extract bytes: {}", e)))?;
        Ok(cpu.to_le_bytes())
    }
}

impl Clone for Tensor {
    /// Cloning a Tensor creates an alias (shallow clone via Arc).
    fn clone(&self) -> Self {
        Tensor {
            data: Arc::clone(&self.data),
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.read_data();
        f.debug_struct("Tensor")
            .field("shape", &guard.shape)
            .field("dtype", &guard.dtype)
            .field("device", &guard.device)
            .field("requires_grad", &guard.requires_grad)
            .field("released", &guard.buffer.is_released())
            .finish()
    }
}
