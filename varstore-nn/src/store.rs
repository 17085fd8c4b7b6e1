use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use varstore_core::tensor::{self, validate_shape};
use varstore_core::{DType, StorageDevice, Tensor, VarStoreError};

use crate::archive::{self, ArchiveWriter};
use crate::config::VarStoreConfig;
use crate::path::Path;
use crate::summary::{VarInfo, VarSummary};
use crate::var::Var;

/// One registry slot. Slots are never removed individually.
#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) name: String,
    pub(crate) tensor: Tensor,
    pub(crate) trainable: bool,
}

/// Arena of slots plus the name index, guarded by the store's mutex.
#[derive(Debug)]
pub(crate) struct Registry {
    pub(crate) slots: Vec<Slot>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) dtype: DType,
    pub(crate) generation: u64,
    pub(crate) destroyed: bool,
}

/// Locks the registry. The registry is only mutated in short, non-panicking
/// sections, so a poisoned lock is recovered.
pub(crate) fn lock_registry(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn!("Mutex for the variable registry was poisoned. Recovering.");
        poisoned.into_inner()
    })
}

/// A registry binding fully qualified names to tensors on one device.
///
/// All mutation (`get_or_create`, `save`, `load`, `destroy`, ...) is
/// serialized behind a single mutex, so disjoint sub-trees of a model can be
/// built from several threads at once. Iteration order is first-insertion
/// order; under a creation race for the same name the winner is unspecified
/// and every racer receives the winner's variable.
pub struct VarStore {
    registry: Arc<Mutex<Registry>>,
    config: VarStoreConfig,
}

impl VarStore {
    /// Creates an empty store bound to `device`.
    pub fn new(device: StorageDevice) -> Self {
        Self::with_config(VarStoreConfig::new(device))
    }

    pub fn with_config(config: VarStoreConfig) -> Self {
        let registry = Registry {
            slots: Vec::new(),
            index: HashMap::new(),
            dtype: config.dtype,
            generation: 0,
            destroyed: false,
        };
        VarStore {
            registry: Arc::new(Mutex::new(registry)),
            config,
        }
    }

    /// The root path: no segments.
    pub fn root(&self) -> Path<'_> {
        Path::new(self, Vec::new())
    }

    pub fn device(&self) -> StorageDevice {
        self.config.device
    }

    /// Data type used by the initializers.
    pub fn dtype(&self) -> DType {
        lock_registry(&self.registry).dtype
    }

    pub fn len(&self) -> usize {
        lock_registry(&self.registry).slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_live(&self) -> Result<MutexGuard<'_, Registry>, VarStoreError> {
        let guard = lock_registry(&self.registry);
        if guard.destroyed {
            return Err(VarStoreError::UseAfterDestroy);
        }
        Ok(guard)
    }

    fn handle(&self, reg: &Registry, index: usize) -> Var {
        Var::new(&self.registry, index, reg.generation, &reg.slots[index].name)
    }

    /// Returns the variable registered under `name`, creating it with `factory` if absent.
    ///
    /// On a repeated name the existing variable is returned unchanged: the
    /// factory, `shape` and `trainable` of the later request are ignored.
    /// The factory runs under the store lock and must only allocate.
    ///
    /// # Errors
    /// * `Validation` for an empty name, a zero dimension, an unsupported store
    ///   dtype, or a factory result whose shape or dtype differs from the request.
    /// * `DeviceMismatch` if the factory allocated on another device.
    /// * `UseAfterDestroy` once the store is destroyed.
    pub fn get_or_create<F>(
        &self,
        name: &str,
        shape: &[usize],
        trainable: bool,
        factory: F,
    ) -> Result<Var, VarStoreError>
    where
        F: FnOnce(&[usize], DType, StorageDevice) -> Result<Tensor, VarStoreError>,
    {
        if name.is_empty() {
            return Err(VarStoreError::Validation("variable name is empty".to_string()));
        }
        validate_shape(shape)?;
        let mut reg = self.lock_live()?;
        let dtype = reg.dtype;
        if !dtype.is_storable() {
            return Err(VarStoreError::Validation(format!("unsupported dtype {:?}", dtype)));
        }

        if let Some(&index) = reg.index.get(name) {
            let existing = reg.slots[index].tensor.shape();
            if existing.as_slice() != shape {
                debug!(
                    "VarStore: '{}' already exists with shape {:?}, ignoring requested shape {:?}",
                    name, existing, shape
                );
            }
            return Ok(self.handle(&reg, index));
        }

        let device = self.config.device;
        let tensor = factory(shape, dtype, device)?;
        if tensor.shape().as_slice() != shape {
            return Err(VarStoreError::Validation(format!(
                "factory for '{}' returned shape {:?}, expected {:?}",
                name,
                tensor.shape(),
                shape
            )));
        }
        if tensor.dtype() != dtype {
            return Err(VarStoreError::Validation(format!(
                "factory for '{}' returned dtype {:?}, expected {:?}",
                name,
                tensor.dtype(),
                dtype
            )));
        }
        if tensor.device() != device {
            return Err(VarStoreError::DeviceMismatch {
                expected: device,
                actual: tensor.device(),
                operation: format!("get_or_create '{}'", name),
            });
        }
        tensor.set_requires_grad(trainable);

        let index = reg.slots.len();
        reg.slots.push(Slot {
            name: name.to_string(),
            tensor,
            trainable,
        });
        reg.index.insert(name.to_string(), index);
        debug!("VarStore: created '{}' with shape {:?} (slot {})", name, shape, index);
        Ok(self.handle(&reg, index))
    }

    /// Looks up an existing variable by fully qualified name.
    pub fn get(&self, name: &str) -> Option<Var> {
        let reg = lock_registry(&self.registry);
        let index = *reg.index.get(name)?;
        Some(self.handle(&reg, index))
    }

    /// All variables in insertion order.
    pub fn variables(&self) -> Vec<(String, Var)> {
        let reg = lock_registry(&self.registry);
        (0..reg.slots.len())
            .map(|i| (reg.slots[i].name.clone(), self.handle(&reg, i)))
            .collect()
    }

    /// Trainable variables in insertion order.
    pub fn trainable_variables(&self) -> Vec<Var> {
        let reg = lock_registry(&self.registry);
        (0..reg.slots.len())
            .filter(|&i| reg.slots[i].trainable)
            .map(|i| self.handle(&reg, i))
            .collect()
    }

    /// Snapshot of `(name, shape, dtype, trainable)` rows in insertion order.
    /// Empty once the store is destroyed.
    pub fn summary(&self) -> VarSummary {
        let reg = lock_registry(&self.registry);
        reg.slots
            .iter()
            .map(|slot| VarInfo {
                name: slot.name.clone(),
                shape: slot.tensor.shape(),
                dtype: slot.tensor.dtype(),
                trainable: slot.trainable,
            })
            .collect()
    }

    /// Stops gradient tracking on every trainable variable.
    pub fn freeze(&self) -> Result<(), VarStoreError> {
        self.set_requires_grad(false)
    }

    /// Re-enables gradient tracking on every trainable variable.
    pub fn unfreeze(&self) -> Result<(), VarStoreError> {
        self.set_requires_grad(true)
    }

    fn set_requires_grad(&self, requires_grad: bool) -> Result<(), VarStoreError> {
        let reg = self.lock_live()?;
        for slot in reg.slots.iter().filter(|s| s.trainable) {
            slot.tensor.set_requires_grad(requires_grad);
        }
        Ok(())
    }

    /// Saves every variable to `path`, in insertion order.
    ///
    /// The archive is written to a temporary file in the same directory and
    /// renamed into place, so `path` never holds a partial archive.
    ///
    /// # Errors
    /// `Serialization` if a variable's bytes cannot be extracted, `Io` on
    /// filesystem failure. In both cases `path` is left untouched.
    pub fn save<P: AsRef<FsPath>>(&self, path: P) -> Result<(), VarStoreError> {
        let path = path.as_ref();
        let reg = self.lock_live()?;
        archive::write_atomic(path, self.config.sync_on_save, |w| {
            let mut writer = ArchiveWriter::new(w, reg.slots.len())?;
            for slot in &reg.slots {
                let data = slot.tensor.to_host_bytes().map_err(|e| match e {
                    VarStoreError::Serialization(msg) => {
                        VarStoreError::Serialization(format!("'{}': {}", slot.name, msg))
                    }
                    other => other,
                })?;
                writer.write_record(&slot.name, slot.tensor.dtype(), &slot.tensor.shape(), &data)?;
            }
            writer.finish()?;
            Ok(())
        })?;
        debug!("VarStore: saved {} variables to {}", reg.slots.len(), path.display());
        Ok(())
    }

    /// Loads variable values from `path`, overwriting in place by name.
    ///
    /// Records without a matching variable are skipped. Variables absent from
    /// the archive keep their values.
    ///
    /// # Errors
    /// `ShapeMismatch` if a matching variable has another shape; nothing is
    /// modified in that case. `Io`/`Serialization` if the archive cannot be read.
    pub fn load<P: AsRef<FsPath>>(&self, path: P) -> Result<(), VarStoreError> {
        let missing = self.load_partial(path)?;
        for name in &missing {
            warn!("VarStore: variable '{}' not found in archive, keeping its value", name);
        }
        Ok(())
    }

    /// Like [`VarStore::load`], returning the names of the variables that
    /// were absent from the archive.
    pub fn load_partial<P: AsRef<FsPath>>(&self, path: P) -> Result<Vec<String>, VarStoreError> {
        let path = path.as_ref();
        if self.is_destroyed() {
            return Err(VarStoreError::UseAfterDestroy);
        }
        // Read outside the lock; destruction in between is caught by lock_live.
        let records = archive::read_file(path)?;
        let reg = self.lock_live()?;

        let mut updates = Vec::new();
        for record in &records {
            let Some(&index) = reg.index.get(&record.name) else {
                debug!("VarStore: skipping archived '{}', no such variable", record.name);
                continue;
            };
            let slot = &reg.slots[index];
            let shape = slot.tensor.shape();
            if shape != record.shape {
                return Err(VarStoreError::ShapeMismatch {
                    name: record.name.clone(),
                    expected: shape,
                    actual: record.shape.clone(),
                });
            }
            if slot.tensor.is_released() {
                return Err(VarStoreError::StorageReleased(format!("load '{}'", slot.name)));
            }
            let src = tensor::from_host_bytes(&record.data, &record.shape, record.dtype, self.config.device)?;
            updates.push((index, src));
        }

        let archived: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
        let missing: Vec<String> = reg
            .slots
            .iter()
            .filter(|s| !archived.contains(s.name.as_str()))
            .map(|s| s.name.clone())
            .collect();

        for (index, src) in &updates {
            reg.slots[*index].tensor.copy_(src)?;
        }
        debug!(
            "VarStore: loaded {} of {} archived variables from {}",
            updates.len(),
            records.len(),
            path.display()
        );
        Ok(missing)
    }

    /// Copies the value of every variable of this store from the variable of
    /// the same name in `src`.
    ///
    /// # Errors
    /// `MissingVariable` if `src` lacks one of the names, `ShapeMismatch` on a
    /// shape conflict. Nothing is modified on error.
    pub fn copy_from(&self, src: &VarStore) -> Result<(), VarStoreError> {
        if Arc::ptr_eq(&self.registry, &src.registry) {
            return Ok(());
        }
        // Snapshot the source under its own lock so both stores are never locked together.
        let src_vars: HashMap<String, Tensor> = {
            let src_reg = src.lock_live()?;
            src_reg
                .slots
                .iter()
                .map(|s| (s.name.clone(), s.tensor.clone()))
                .collect()
        };

        let reg = self.lock_live()?;
        let mut updates = Vec::with_capacity(reg.slots.len());
        for (index, slot) in reg.slots.iter().enumerate() {
            let src_tensor = src_vars
                .get(&slot.name)
                .ok_or_else(|| VarStoreError::MissingVariable(slot.name.clone()))?;
            let shape = slot.tensor.shape();
            if shape != src_tensor.shape() {
                return Err(VarStoreError::ShapeMismatch {
                    name: slot.name.clone(),
                    expected: shape,
                    actual: src_tensor.shape(),
                });
            }
            let staged = tensor::zeros(&shape, src_tensor.dtype(), self.config.device)?;
            staged.copy_(src_tensor)?;
            updates.push((index, staged));
        }
        for (index, staged) in &updates {
            reg.slots[*index].tensor.copy_(staged)?;
        }
        debug!("VarStore: copied {} variables from another store", updates.len());
        Ok(())
    }

    /// Casts every variable to `dtype` in place and makes it the store dtype.
    pub fn to_dtype(&self, dtype: DType) -> Result<(), VarStoreError> {
        if !dtype.is_storable() {
            return Err(VarStoreError::Validation(format!("unsupported dtype {:?}", dtype)));
        }
        let mut reg = self.lock_live()?;
        if let Some(slot) = reg.slots.iter().find(|s| s.tensor.is_released()) {
            return Err(VarStoreError::StorageReleased(format!("to_dtype '{}'", slot.name)));
        }
        for slot in &reg.slots {
            slot.tensor.cast_(dtype)?;
        }
        reg.dtype = dtype;
        Ok(())
    }

    /// Releases every variable's storage and empties the registry.
    ///
    /// Every later `get_or_create`, `save`, `load` and every `Var` access
    /// fails with `UseAfterDestroy`. Calling it again is a no-op.
    pub fn destroy(&self) {
        let mut reg = lock_registry(&self.registry);
        if reg.destroyed {
            return;
        }
        for slot in &reg.slots {
            slot.tensor.release();
        }
        let count = reg.slots.len();
        reg.slots.clear();
        reg.index.clear();
        reg.generation += 1;
        reg.destroyed = true;
        debug!("VarStore: destroyed, released {} variables", count);
    }

    pub fn is_destroyed(&self) -> bool {
        lock_registry(&self.registry).destroyed
    }
}

impl Drop for VarStore {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for VarStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reg = lock_registry(&self.registry);
        f.debug_struct("VarStore")
            .field("device", &self.config.device)
            .field("dtype", &reg.dtype)
            .field("len", &reg.slots.len())
            .field("destroyed", &reg.destroyed)
            .finish()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
