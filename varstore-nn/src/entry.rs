use varstore_core::init::init;
use varstore_core::tensor;
use varstore_core::{Init, Tensor, VarStoreError};

use crate::store::VarStore;
use crate::var::Var;

/// Deferred handle on one fully qualified name.
///
/// Every `or_*` initializer is idempotent per name: the first call creates
/// the variable, later calls return it and ignore their own arguments.
#[derive(Debug, Clone)]
pub struct Entry<'a> {
    name: String,
    var_store: &'a VarStore,
}

impl<'a> Entry<'a> {
    pub(crate) fn new(var_store: &'a VarStore, name: String) -> Self {
        Entry { name, var_store }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the existing variable or creates it with `init`.
    pub fn or_var(&self, shape: &[usize], strategy: Init) -> Result<Var, VarStoreError> {
        self.or_var_with(shape, strategy, true)
    }

    fn or_var_with(&self, shape: &[usize], strategy: Init, trainable: bool) -> Result<Var, VarStoreError> {
        self.var_store
            .get_or_create(&self.name, shape, trainable, |shape, dtype, device| {
                init(&strategy, shape, dtype, device)
            })
    }

    pub fn or_zeros(&self, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.or_var(shape, Init::Const(0.0))
    }

    pub fn or_ones(&self, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.or_var(shape, Init::Const(1.0))
    }

    pub fn or_zeros_no_train(&self, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.or_var_with(shape, Init::Const(0.0), false)
    }

    pub fn or_ones_no_train(&self, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.or_var_with(shape, Init::Const(1.0), false)
    }

    pub fn or_uniform(&self, shape: &[usize], low: f64, high: f64) -> Result<Var, VarStoreError> {
        self.or_var(shape, Init::Uniform { low, high })
    }

    pub fn or_kaiming(&self, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.or_var(shape, Init::KaimingUniform)
    }

    pub fn or_randn(&self, shape: &[usize], mean: f64, stdev: f64) -> Result<Var, VarStoreError> {
        self.or_var(shape, Init::Randn { mean, stdev })
    }

    pub fn or_randn_standard(&self, shape: &[usize]) -> Result<Var, VarStoreError> {
        self.or_randn(shape, 0.0, 1.0)
    }

    /// Trainable variable holding a copy of `src`, converted to the store dtype.
    pub fn or_var_copy(&self, src: &Tensor) -> Result<Var, VarStoreError> {
        self.or_add(src, true)
    }

    /// Registers a copy of `src`; the store never aliases caller tensors.
    pub fn or_add(&self, src: &Tensor, trainable: bool) -> Result<Var, VarStoreError> {
        let shape = src.shape();
        self.var_store
            .get_or_create(&self.name, &shape, trainable, |shape, dtype, device| {
                let t = tensor::zeros(shape, dtype, device)?;
                t.copy_(src)?;
                Ok(t)
            })
    }
}
