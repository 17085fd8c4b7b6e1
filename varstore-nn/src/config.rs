use varstore_core::{DType, StorageDevice};

/// Construction options for a [`crate::VarStore`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarStoreConfig {
    /// Device every variable of the store is allocated on.
    pub device: StorageDevice,
    /// Data type used by the initializers.
    pub dtype: DType,
    /// Whether `save` flushes the temporary archive to disk before renaming it into place.
    pub sync_on_save: bool,
}

impl Default for VarStoreConfig {
    fn default() -> Self {
        Self {
            device: StorageDevice::CPU,
            dtype: DType::F32,
            sync_on_save: true,
        }
    }
}

impl VarStoreConfig {
    pub fn new(device: StorageDevice) -> Self {
        Self {
            device,
            ..Self::default()
        }
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn with_sync_on_save(mut self, sync_on_save: bool) -> Self {
        self.sync_on_save = sync_on_save;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builders() {
        let config = VarStoreConfig::default();
        assert_eq!(config.device, StorageDevice::CPU);
        assert_eq!(config.dtype, DType::F32);
        assert!(config.sync_on_save);

        let config = VarStoreConfig::new(StorageDevice::CPU)
            .with_dtype(DType::F64)
            .with_sync_on_save(false);
        assert_eq!(config.dtype, DType::F64);
        assert!(!config.sync_on_save);
    }
}
