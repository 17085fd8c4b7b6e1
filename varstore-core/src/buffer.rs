use std::fmt::Debug;

use num_traits::{NumCast, ToPrimitive};

use crate::error::VarStoreError;
use crate::types::DType;

/// Storage of a tensor. Only host memory can be allocated.
#[derive(Debug, Clone)]
pub enum Buffer {
    /// Data resides on the CPU.
    Cpu(CpuBuffer),
    /// Storage was explicitly released; any access is an error.
    Released,
}

/// Enum for CPU-specific buffer types.
#[derive(Debug, Clone, PartialEq)]
pub enum CpuBuffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
}

impl Buffer {
    /// Borrows the CPU buffer, failing for released storage.
    pub fn try_cpu(&self, operation: &str) -> Result<&CpuBuffer, VarStoreError> {
        match self {
            Buffer::Cpu(cpu) => Ok(cpu),
            Buffer::Released => Err(VarStoreError::StorageReleased(operation.to_string())),
        }
    }

    /// Mutable variant of [`Buffer::try_cpu`].
    pub fn try_cpu_mut(&mut self, operation: &str) -> Result<&mut CpuBuffer, VarStoreError> {
        match self {
            Buffer::Cpu(cpu) => Ok(cpu),
            Buffer::Released => Err(VarStoreError::StorageReleased(operation.to_string())),
        }
    }

    pub fn is_released(&self) -> bool {
        matches!(self, Buffer::Released)
    }
}

impl CpuBuffer {
    /// Allocates a buffer of `len` elements, each set to `value` converted to `dtype`.
    pub fn filled<V: ToPrimitive>(dtype: DType, len: usize, value: V) -> Result<Self, VarStoreError> {
        Ok(match dtype {
            DType::F32 => CpuBuffer::F32(vec![cast_scalar(value, dtype)?; len]),
            DType::F64 => CpuBuffer::F64(vec![cast_scalar(value, dtype)?; len]),
            DType::I64 => CpuBuffer::I64(vec![cast_scalar(value, dtype)?; len]),
            DType::Bool => return Err(unsupported_dtype(dtype)),
        })
    }

    /// Builds a buffer of `dtype` from f64 samples (used by the random initializers).
    pub fn from_f64_samples(dtype: DType, samples: Vec<f64>) -> Result<Self, VarStoreError> {
        Ok(match dtype {
            DType::F32 => CpuBuffer::F32(samples.into_iter().map(|x| x as f32).collect()),
            DType::F64 => CpuBuffer::F64(samples),
            DType::I64 => CpuBuffer::I64(samples.into_iter().map(|x| x as i64).collect()),
            DType::Bool => return Err(unsupported_dtype(dtype)),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            CpuBuffer::F32(v) => v.len(),
            CpuBuffer::F64(v) => v.len(),
            CpuBuffer::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            CpuBuffer::F32(_) => DType::F32,
            CpuBuffer::F64(_) => DType::F64,
            CpuBuffer::I64(_) => DType::I64,
        }
    }

    /// Overwrites every element with `value`.
    pub fn fill<V: ToPrimitive + Copy>(&mut self, value: V) -> Result<(), VarStoreError> {
        let dtype = self.dtype();
        match self {
            CpuBuffer::F32(v) => v.fill(cast_scalar(value, dtype)?),
            CpuBuffer::F64(v) => v.fill(cast_scalar(value, dtype)?),
            CpuBuffer::I64(v) => v.fill(cast_scalar(value, dtype)?),
        }
        Ok(())
    }

    /// Applies `f` element-wise, computing in f64 and converting back.
    pub fn map_inplace<F: Fn(f64) -> f64>(&mut self, f: F) {
        match self {
            CpuBuffer::F32(v) => v.iter_mut().for_each(|x| *x = f(*x as f64) as f32),
            CpuBuffer::F64(v) => v.iter_mut().for_each(|x| *x = f(*x)),
            CpuBuffer::I64(v) => v.iter_mut().for_each(|x| *x = f(*x as f64) as i64),
        }
    }

    /// Returns a copy of this buffer converted to `dtype`.
    pub fn cast(&self, dtype: DType) -> Result<CpuBuffer, VarStoreError> {
        if dtype == self.dtype() {
            return Ok(self.clone());
        }
        Ok(match (self, dtype) {
            (CpuBuffer::F32(v), DType::F64) => CpuBuffer::F64(v.iter().map(|&x| x as f64).collect()),
            (CpuBuffer::F32(v), DType::I64) => CpuBuffer::I64(v.iter().map(|&x| x as i64).collect()),
            (CpuBuffer::F64(v), DType::F32) => CpuBuffer::F32(v.iter().map(|&x| x as f32).collect()),
            (CpuBuffer::F64(v), DType::I64) => CpuBuffer::I64(v.iter().map(|&x| x as i64).collect()),
            (CpuBuffer::I64(v), DType::F32) => CpuBuffer::F32(v.iter().map(|&x| x as f32).collect()),
            (CpuBuffer::I64(v), DType::F64) => CpuBuffer::F64(v.iter().map(|&x| x as f64).collect()),
            _ => return Err(unsupported_dtype(dtype)),
        })
    }

    /// Raw little-endian bytes of the buffer.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            CpuBuffer::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            CpuBuffer::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            CpuBuffer::I64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    /// Decodes little-endian bytes produced by [`CpuBuffer::to_le_bytes`].
    ///
    /// # Errors
    /// `Serialization` if the byte count is not a multiple of the element size.
    pub fn from_le_bytes(bytes: &[u8], dtype: DType) -> Result<Self, VarStoreError> {
        let elem = dtype.size_of();
        if !dtype.is_storable() {
            return Err(unsupported_dtype(dtype));
        }
        if bytes.len() % elem != 0 {
            return Err(VarStoreError::Serialization(format!(
                "{} bytes is not a whole number of {:?} elements",
                bytes.len(),
                dtype
            )));
        }
        let chunks = bytes.chunks_exact(elem);
        Ok(match dtype {
            DType::F32 => CpuBuffer::F32(
                chunks.map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect(),
            ),
            DType::F64 => CpuBuffer::F64(
                chunks
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            DType::I64 => CpuBuffer::I64(
                chunks
                    .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            DType::Bool => return Err(unsupported_dtype(dtype)),
        })
    }
}

fn cast_scalar<V: ToPrimitive, T: NumCast>(value: V, dtype: DType) -> Result<T, VarStoreError> {
    T::from(value).ok_or_else(|| {
        VarStoreError::Validation(format!("value is not representable as {:?}", dtype))
    })
}

pub(crate) fn unsupported_dtype(dtype: DType) -> VarStoreError {
    VarStoreError::Validation(format!("unsupported dtype {:?}", dtype))
}
