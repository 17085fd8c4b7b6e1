use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use varstore_core::{DType, StorageDevice, Tensor, VarStoreError};

use crate::store::{lock_registry, Registry, Slot};

/// Handle to a variable owned by a [`crate::VarStore`].
///
/// A `Var` is an arena index tagged with the generation of the store that
/// created it. Every access re-checks the generation, so once the store is
/// destroyed (or dropped) all handles fail with `UseAfterDestroy`.
#[derive(Clone)]
pub struct Var {
    registry: Weak<Mutex<Registry>>,
    index: usize,
    generation: u64,
    name: Arc<str>,
}

impl Var {
    pub(crate) fn new(registry: &Arc<Mutex<Registry>>, index: usize, generation: u64, name: &str) -> Self {
        Var {
            registry: Arc::downgrade(registry),
            index,
            generation,
            name: Arc::from(name),
        }
    }

    fn with_slot<R>(&self, f: impl FnOnce(&Slot) -> R) -> Result<R, VarStoreError> {
        let registry = self.registry.upgrade().ok_or(VarStoreError::UseAfterDestroy)?;
        let guard = lock_registry(&registry);
        if guard.destroyed || guard.generation != self.generation {
            return Err(VarStoreError::UseAfterDestroy);
        }
        let slot = guard.slots.get(self.index).ok_or(VarStoreError::UseAfterDestroy)?;
        Ok(f(slot))
    }

    /// Fully qualified name of the variable.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `false` once the owning store is destroyed or dropped.
    pub fn is_alive(&self) -> bool {
        self.with_slot(|_| ()).is_ok()
    }

    /// Returns an alias of the store-owned tensor.
    ///
    /// The alias shares storage with the store: in-place writes through it are
    /// what `save` persists. After `destroy` its storage is released and any
    /// read through it fails with `StorageReleased`.
    pub fn tensor(&self) -> Result<Tensor, VarStoreError> {
        self.with_slot(|slot| slot.tensor.clone())
    }

    pub fn shape(&self) -> Result<Vec<usize>, VarStoreError> {
        self.with_slot(|slot| slot.tensor.shape())
    }

    pub fn dtype(&self) -> Result<DType, VarStoreError> {
        self.with_slot(|slot| slot.tensor.dtype())
    }

    pub fn device(&self) -> Result<StorageDevice, VarStoreError> {
        self.with_slot(|slot| slot.tensor.device())
    }

    pub fn trainable(&self) -> Result<bool, VarStoreError> {
        self.with_slot(|slot| slot.trainable)
    }

    pub fn to_f32_vec(&self) -> Result<Vec<f32>, VarStoreError> {
        self.with_slot(|slot| slot.tensor.get_f32_data())?
    }

    pub fn to_f64_vec(&self) -> Result<Vec<f64>, VarStoreError> {
        self.with_slot(|slot| slot.tensor.get_f64_data())?
    }

    pub fn to_i64_vec(&self) -> Result<Vec<i64>, VarStoreError> {
        self.with_slot(|slot| slot.tensor.get_i64_data())?
    }

    /// Whether both handles designate the same storage.
    pub fn same_storage(&self, other: &Var) -> Result<bool, VarStoreError> {
        let mine = self.tensor()?;
        let theirs = other.tensor()?;
        Ok(mine.same_storage(&theirs))
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}
