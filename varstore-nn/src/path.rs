use varstore_core::{Init, StorageDevice, Tensor, VarStoreError};

use crate::entry::Entry;
use crate::store::VarStore;
use crate::var::Var;

/// Separator between the segments of a fully qualified name.
pub const SEPARATOR: char = '.';

/// A position in the variable hierarchy of a [`VarStore`].
///
/// Paths are immutable: [`Path::sub`] returns a new path. All creation goes
/// through the store's `get_or_create`.
#[derive(Debug, Clone)]
pub struct Path<'a> {
    path: Vec<String>,
    var_store: &'a VarStore,
}

pub(crate) fn validate_segment(name: &str) -> Result<(), VarStoreError> {
    if name.is_empty() {
        return Err(VarStoreError::Validation("empty path segment".to_string()));
    }
    if name.contains(SEPARATOR) {
        return Err(VarStoreError::Validation(format!(
            "segment '{}' contains the separator '{}'",
            name, SEPARATOR
        )));
    }
    Ok(())
}

impl<'a> Path<'a> {
    pub(crate) fn new(var_store: &'a VarStore, path: Vec<String>) -> Self {
        Path { path, var_store }
    }

    /// Returns the sub-path `self.name`.
    ///
    /// # Errors
    /// `Validation` if `name` is empty or contains the separator.
    pub fn sub<T: AsRef<str>>(&self, name: T) -> Result<Path<'a>, VarStoreError> {
        let name = name.as_ref();
        validate_segment(name)?;
        let mut path = self.path.clone();
        path.push(name.to_string());
        Ok(Path::new(self.var_store, path))
    }

    /// Deferred handle on the variable `name` under this path. Allocates nothing.
    pub fn entry<T: AsRef<str>>(&self, name: T) -> Result<Entry<'a>, VarStoreError> {
        let full_name = self.full_name(name.as_ref())?;
        Ok(Entry::new(self.var_store, full_name))
    }

    pub(crate) fn full_name(&self, name: &str) -> Result<String, VarStoreError> {
        validate_segment(name)?;
        if self.path.is_empty() {
            Ok(name.to_string())
        } else {
            Ok(format!("{}{}{}", self.name(), SEPARATOR, name))
        }
    }

    /// The joined segments of this path (empty for the root).
    pub fn name(&self) -> String {
        self.path.join(&SEPARATOR.to_string())
    }

    pub fn device(&self) -> StorageDevice {
        self.var_store.device()
    }

    pub fn store(&self) -> &'a VarStore {
        self.var_store
    }

    /// Looks up an existing variable `name` under this path.
    pub fn get(&self, name: &str) -> Result<Option<Var>, VarStoreError> {
        Ok(self.var_store.get(&self.full_name(name)?))
    }

    pub fn zeros(&self, name: &str, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_zeros(shape)
    }

    pub fn ones(&self, name: &str, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_ones(shape)
    }

    /// Non trainable variable initialized with zeros.
    pub fn zeros_no_train(&self, name: &str, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_zeros_no_train(shape)
    }

    /// Non trainable variable initialized with ones.
    pub fn ones_no_train(&self, name: &str, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_ones_no_train(shape)
    }

    pub fn uniform(&self, name: &str, shape: &[usize], low: f64, high: f64) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_uniform(shape, low, high)
    }

    pub fn randn(&self, name: &str, shape: &[usize], mean: f64, stdev: f64) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_randn(shape, mean, stdev)
    }

    pub fn randn_standard(&self, name: &str, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_randn_standard(shape)
    }

    pub fn kaiming_uniform(&self, name: &str, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_kaiming(shape)
    }

    pub fn var(&self, name: &str, shape: &[usize], init: Init) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_var(shape, init)
    }

    /// Trainable variable holding a copy of `tensor`.
    pub fn var_copy(&self, name: &str, tensor: &Tensor) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_var_copy(tensor)
    }

    /// Registers a copy of `tensor` under `name`.
    pub fn add(&self, name: &str, tensor: &Tensor, trainable: bool) -> Result<Var, VarStoreError> {
        self.entry(name)?.or_add(tensor, trainable)
    }
}

#[cfg(test)]
#[path = "path_test.rs"]
mod tests;
