use crate::device::StorageDevice;
use crate::types::DType;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

/// Error type shared by the tensor engine and the variable store.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum VarStoreError {
    /// An illegal request: bad segment name, zero dimension, unsupported dtype,
    /// or a factory that returned something other than what was asked for.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Shape mismatch for '{name}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error on {path}: {message}")]
    Io {
        kind: ErrorKind,
        path: String,
        message: String,
    },

    #[error("Variable store has been destroyed")]
    UseAfterDestroy,

    #[error("Cannot find variable '{0}'")]
    MissingVariable(String),

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Data type mismatch for operation '{operation}': expected {expected:?}, got {actual:?}")]
    DataTypeMismatch {
        expected: DType,
        actual: DType,
        operation: String,
    },

    #[error("Device mismatch for operation '{operation}': expected {expected:?}, got {actual:?}")]
    DeviceMismatch {
        expected: StorageDevice,
        actual: StorageDevice,
        operation: String,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Tensor storage has been released (operation '{0}')")]
    StorageReleased(String),
}

impl VarStoreError {
    /// Wraps an `std::io::Error` together with the path it was raised for.
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        VarStoreError::Io {
            kind: err.kind(),
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
