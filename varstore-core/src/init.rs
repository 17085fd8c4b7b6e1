use crate::device::StorageDevice;
use crate::error::VarStoreError;
use crate::tensor::{self, Tensor};
use crate::types::DType;

/// Variable initializations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// Constant value.
    Const(f64),
    /// Uniform distribution on `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// Normal distribution.
    Randn { mean: f64, stdev: f64 },
    /// Kaiming uniform, bound derived from the fan-in of the shape.
    KaimingUniform,
}

/// Creates a new tensor of `shape` initialized according to `init`.
///
/// # Errors
/// `Validation` for zero dimensions, unsupported dtypes, invalid
/// distribution parameters, or random inits on an integer dtype.
pub fn init(init: &Init, shape: &[usize], dtype: DType, device: StorageDevice) -> Result<Tensor, VarStoreError> {
    match *init {
        Init::Const(value) => tensor::full(shape, value, dtype, device),
        Init::Uniform { low, high } => tensor::uniform(shape, low, high, dtype, device),
        Init::Randn { mean, stdev } => tensor::randn(shape, mean, stdev, dtype, device),
        Init::KaimingUniform => tensor::kaiming_uniform(shape, dtype, device),
    }
}

/// Re-initializes an existing tensor in place with `init`.
pub fn init_(tensor: &Tensor, init: &Init) -> Result<(), VarStoreError> {
    let fresh = self::init(init, &tensor.shape(), tensor.dtype(), tensor.device())?;
    tensor.copy_(&fresh)
}

#[cfg(test)]
#[path = "init_test.rs"]
mod tests;
