// In-place operations. Identity is preserved: every alias sees the new contents.

use num_traits::ToPrimitive;

use crate::buffer::Buffer;
use crate::error::VarStoreError;
use crate::tensor::Tensor;
use crate::types::DType;

impl Tensor {
    /// Fills the tensor with `value`, converted to the tensor's dtype.
    pub fn fill_<V: ToPrimitive + Copy>(&self, value: V) -> Result<(), VarStoreError> {
        let mut guard = self.write_data();
        guard.buffer.try_cpu_mut("fill_")?.fill(value)
    }

    /// Adds `value` to every element.
    pub fn add_scalar_(&self, value: f64) -> Result<(), VarStoreError> {
        let mut guard = self.write_data();
        guard.buffer.try_cpu_mut("add_scalar_")?.map_inplace(|x| x + value);
        Ok(())
    }

    /// Multiplies every element by `value`.
    pub fn mul_scalar_(&self, value: f64) -> Result<(), VarStoreError> {
        let mut guard = self.write_data();
        guard.buffer.try_cpu_mut("mul_scalar_")?.map_inplace(|x| x * value);
        Ok(())
    }

    /// Overwrites this tensor's contents with `src`, converting to this tensor's dtype.
    ///
    /// # Errors
    /// `ShapeMismatch` if the shapes differ; `StorageReleased` if either side was released.
    pub fn copy_(&self, src: &Tensor) -> Result<(), VarStoreError> {
        if self.same_storage(src) {
            return Ok(());
        }
        // Snapshot the source first so the two locks are never held together.
        let (src_shape, src_buffer) = {
            let guard = src.read_data();
            (guard.shape.clone(), guard.buffer.try_cpu("copy_")?.clone())
        };
        let mut guard = self.write_data();
        if guard.shape != src_shape {
            return Err(VarStoreError::ShapeMismatch {
                name: "copy_".to_string(),
                expected: guard.shape.clone(),
                actual: src_shape,
            });
        }
        let dtype = guard.dtype;
        let dst = guard.buffer.try_cpu_mut("copy_")?;
        *dst = src_buffer.cast(dtype)?;
        Ok(())
    }

    /// Converts the storage to `dtype` in place.
    pub fn cast_(&self, dtype: DType) -> Result<(), VarStoreError> {
        let mut guard = self.write_data();
        if guard.dtype == dtype {
            return Ok(());
        }
        let converted = guard.buffer.try_cpu("cast_")?.cast(dtype)?;
        guard.buffer = Buffer::Cpu(converted);
        guard.dtype = dtype;
        Ok(())
    }

    /// Frees the storage. Every alias observes the release; later reads fail
    /// with `StorageReleased`. Releasing twice is a no-op.
    pub fn release(&self) {
        let mut guard = self.write_data();
        guard.buffer = Buffer::Released;
        guard.requires_grad = false;
    }
}

#[cfg(test)]
#[path = "inplace_ops_test.rs"]
mod tests;
