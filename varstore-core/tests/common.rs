use varstore_core::{DType, StorageDevice, Tensor};

// Helper function to create a CPU f32 tensor for testing.
#[allow(dead_code)]
pub(crate) fn create_test_tensor(data: Vec<f32>, shape: Vec<usize>) -> Tensor {
    Tensor::new(data, shape).expect("Test tensor creation failed")
}

#[allow(dead_code)]
pub(crate) const CPU: StorageDevice = StorageDevice::CPU;

#[allow(dead_code)]
pub(crate) const F32: DType = DType::F32;
