// src/tensor/create.rs

use rand::distributions::{Distribution, Uniform};
use rand_distr::Normal;

use crate::buffer::{unsupported_dtype, CpuBuffer};
use crate::device::StorageDevice;
use crate::error::VarStoreError;
use crate::tensor::Tensor;
use crate::types::DType;

/// Checks that every dimension is strictly positive.
///
/// A rank-0 shape (scalar) is accepted.
pub fn validate_shape(shape: &[usize]) -> Result<(), VarStoreError> {
    if shape.iter().any(|&d| d == 0) {
        return Err(VarStoreError::Validation(format!(
            "shape {:?} has a non-positive dimension",
            shape
        )));
    }
    Ok(())
}

/// Common checks for every allocation: shape, dtype, device.
fn check_alloc(shape: &[usize], dtype: DType, device: StorageDevice) -> Result<(), VarStoreError> {
    validate_shape(shape)?;
    if !dtype.is_storable() {
        return Err(unsupported_dtype(dtype));
    }
    if !device.is_host() {
        return Err(VarStoreError::UnsupportedOperation(format!(
            "no backend available to allocate on {:?}",
            device
        )));
    }
    Ok(())
}

fn check_float(dtype: DType, operation: &str) -> Result<(), VarStoreError> {
    if !dtype.is_float() {
        return Err(VarStoreError::Validation(format!(
            "{} requires a floating point dtype, got {:?}",
            operation, dtype
        )));
    }
    Ok(())
}

/// Creates a tensor filled with `value` converted to `dtype`.
pub fn full(shape: &[usize], value: f64, dtype: DType, device: StorageDevice) -> Result<Tensor, VarStoreError> {
    check_alloc(shape, dtype, device)?;
    let numel = shape.iter().product();
    Tensor::from_buffer(CpuBuffer::filled(dtype, numel, value)?, shape.to_vec())
}

/// Creates a tensor filled with zeros.
pub fn zeros(shape: &[usize], dtype: DType, device: StorageDevice) -> Result<Tensor, VarStoreError> {
    full(shape, 0.0, dtype, device)
}

/// Creates a tensor filled with ones.
pub fn ones(shape: &[usize], dtype: DType, device: StorageDevice) -> Result<Tensor, VarStoreError> {
    full(shape, 1.0, dtype, device)
}

/// Creates a tensor with values drawn from `U(low, high)`.
///
/// # Errors
/// `Validation` if the bounds are not finite with `low < high`, if `high - low`
/// overflows, or if the dtype is not a float type.
pub fn uniform(
    shape: &[usize],
    low: f64,
    high: f64,
    dtype: DType,
    device: StorageDevice,
) -> Result<Tensor, VarStoreError> {
    check_alloc(shape, dtype, device)?;
    check_float(dtype, "uniform")?;
    if !(low.is_finite() && high.is_finite() && low < high) {
        return Err(VarStoreError::Validation(format!(
            "uniform requires finite low < high, got [{}, {})",
            low, high
        )));
    }
    if !(high - low).is_finite() {
        return Err(VarStoreError::Validation(format!(
            "uniform range [{}, {}) is too wide",
            low, high
        )));
    }
    let numel: usize = shape.iter().product();
    let dist = Uniform::new(low, high);
    let mut rng = rand::thread_rng();
    let samples: Vec<f64> = (0..numel).map(|_| dist.sample(&mut rng)).collect();
    Tensor::from_buffer(CpuBuffer::from_f64_samples(dtype, samples)?, shape.to_vec())
}

/// Creates a tensor with values drawn from `N(mean, stdev^2)`.
///
/// # Errors
/// `Validation` if `mean` or `stdev` is not finite, `stdev < 0`, or the dtype is not a float type.
pub fn randn(
    shape: &[usize],
    mean: f64,
    stdev: f64,
    dtype: DType,
    device: StorageDevice,
) -> Result<Tensor, VarStoreError> {
    check_alloc(shape, dtype, device)?;
    check_float(dtype, "randn")?;
    if !(mean.is_finite() && stdev.is_finite() && stdev >= 0.0) {
        return Err(VarStoreError::Validation(format!(
            "randn requires finite mean and stdev >= 0, got mean {} stdev {}",
            mean, stdev
        )));
    }
    let dist = Normal::new(mean, stdev)
        .map_err(|e| VarStoreError::Validation(format!("invalid normal distribution: {}", e)))?;
    let numel: usize = shape.iter().product();
    let mut rng = rand::thread_rng();
    let samples: Vec<f64> = (0..numel).map(|_| dist.sample(&mut rng)).collect();
    Tensor::from_buffer(CpuBuffer::from_f64_samples(dtype, samples)?, shape.to_vec())
}

/// Kaiming uniform initialization: `U(-b, b)` with `b = sqrt(1 / fan_in)`.
///
/// `fan_in` is the product of every dimension but the first (1 for rank <= 1).
pub fn kaiming_uniform(shape: &[usize], dtype: DType, device: StorageDevice) -> Result<Tensor, VarStoreError> {
    let fan_in: usize = shape.iter().skip(1).product();
    let bound = (1.0 / fan_in as f64).sqrt();
    uniform(shape, -bound, bound, dtype, device)
}

/// Rebuilds a tensor from raw little-endian bytes.
///
/// # Errors
/// `Serialization` if `bytes.len() != product(shape) * size_of(dtype)`.
pub fn from_host_bytes(
    bytes: &[u8],
    shape: &[usize],
    dtype: DType,
    device: StorageDevice,
) -> Result<Tensor, VarStoreError> {
    check_alloc(shape, dtype, device)?;
    let numel: usize = shape.iter().product();
    let expected = numel * dtype.size_of();
    if bytes.len() != expected {
        return Err(VarStoreError::Serialization(format!(
            "expected {} bytes for shape {:?} of {:?}, got {}",
            expected,
            shape,
            dtype,
            bytes.len()
        )));
    }
    Tensor::from_buffer(CpuBuffer::from_le_bytes(bytes, dtype)?, shape.to_vec())
}

#[cfg(test)]
#[path = "create_test.rs"]
mod tests;
