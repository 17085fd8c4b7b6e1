use std::fmt::Debug;

/// Represents the physical location where tensor data is stored.
///
/// Every tensor owned by a variable store lives on the store's device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageDevice {
    /// Data is stored in main system memory (RAM).
    /// This is the default device.
    #[default]
    CPU,
    /// Data is stored on a CUDA-enabled GPU.
    ///
    /// No GPU backend is compiled in: allocating on this device fails with
    /// `UnsupportedOperation`.
    GPU,
}

impl StorageDevice {
    /// Returns `true` if buffers on this device can be read directly by the host.
    pub fn is_host(&self) -> bool {
        matches!(self, StorageDevice::CPU)
    }
}
