use super::*;
use approx::assert_relative_eq;

#[test]
fn test_zeros_and_ones() {
    let z = zeros(&[2, 3], DType::F32, StorageDevice::CPU).unwrap();
    assert_eq!(z.shape(), vec![2, 3]);
    assert_eq!(z.numel(), 6);
    assert_eq!(z.device(), StorageDevice::CPU);
    assert!(z.get_f32_data().unwrap().iter().all(|&x| x == 0.0));

    let o = ones(&[3], DType::I64, StorageDevice::CPU).unwrap();
    assert_eq!(o.dtype(), DType::I64);
    assert_eq!(o.get_i64_data().unwrap(), vec![1, 1, 1]);
}

#[test]
fn test_full_f64() {
    let t = full(&[2], 2.5, DType::F64, StorageDevice::CPU).unwrap();
    assert_eq!(t.get_f64_data().unwrap(), vec![2.5, 2.5]);
}

#[test]
fn test_zero_dimension_is_rejected() {
    let result = zeros(&[2, 0], DType::F32, StorageDevice::CPU);
    assert!(matches!(result, Err(VarStoreError::Validation(_))));
}

#[test]
fn test_unsupported_dtype_and_device() {
    assert!(matches!(
        zeros(&[2], DType::Bool, StorageDevice::CPU),
        Err(VarStoreError::Validation(_))
    ));
    assert!(matches!(
        zeros(&[2], DType::F32, StorageDevice::GPU),
        Err(VarStoreError::UnsupportedOperation(_))
    ));
}

#[test]
fn test_every_allocator_rejects_gpu() {
    let gpu = StorageDevice::GPU;
    let results = [
        full(&[2], 3.0, DType::F32, gpu),
        ones(&[2], DType::F64, gpu),
        uniform(&[2], 0.0, 1.0, DType::F32, gpu),
        randn(&[2], 0.0, 1.0, DType::F32, gpu),
        kaiming_uniform(&[2, 2], DType::F32, gpu),
        from_host_bytes(&[0u8; 8], &[2], DType::F32, gpu),
    ];
    for result in results {
        assert!(matches!(result, Err(VarStoreError::UnsupportedOperation(_))));
    }
}

#[test]
fn test_uniform_bounds() {
    let t = uniform(&[1000], -0.5, 0.25, DType::F32, StorageDevice::CPU).unwrap();
    assert!(t.get_f32_data().unwrap().iter().all(|&x| (-0.5..0.25).contains(&x)));
    assert!(uniform(&[2], 1.0, 1.0, DType::F32, StorageDevice::CPU).is_err());
    assert!(uniform(&[2], 0.0, 1.0, DType::I64, StorageDevice::CPU).is_err());
}

#[test]
fn test_randn_statistics() {
    let t = randn(&[10_000], 3.0, 0.5, DType::F64, StorageDevice::CPU).unwrap();
    let data = t.get_f64_data().unwrap();
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    assert_relative_eq!(mean, 3.0, epsilon = 0.05);
    assert!(randn(&[2], 0.0, -1.0, DType::F64, StorageDevice::CPU).is_err());
}

#[test]
fn test_uniform_rejects_overflowing_range() {
    let err = uniform(&[2], -1e308, 1e308, DType::F64, StorageDevice::CPU).unwrap_err();
    assert!(matches!(err, VarStoreError::Validation(_)));
    let err = uniform(&[2], f64::MIN, f64::MAX, DType::F32, StorageDevice::CPU).unwrap_err();
    assert!(matches!(err, VarStoreError::Validation(_)));
}

#[test]
fn test_randn_rejects_invalid_parameters() {
    let err = randn(&[2], 0.0, -1.0, DType::F64, StorageDevice::CPU).unwrap_err();
    assert!(matches!(err, VarStoreError::Validation(_)));
    assert!(randn(&[2], f64::NAN, 1.0, DType::F64, StorageDevice::CPU).is_err());
    assert!(randn(&[2], 0.0, f64::INFINITY, DType::F64, StorageDevice::CPU).is_err());
    // A zero deviation is a constant fill.
    let t = randn(&[3], 2.0, 0.0, DType::F64, StorageDevice::CPU).unwrap();
    assert_eq!(t.get_f64_data().unwrap(), vec![2.0; 3]);
}

#[test]
fn test_kaiming_uniform_bound() {
    // fan_in = 4 * 4 = 16 -> bound = 0.25
    let t = kaiming_uniform(&[8, 4, 4], DType::F32, StorageDevice::CPU).unwrap();
    assert!(t.get_f32_data().unwrap().iter().all(|&x| x.abs() <= 0.25));
    // rank-1: fan_in = 1 -> bound = 1
    let b = kaiming_uniform(&[5], DType::F64, StorageDevice::CPU).unwrap();
    assert!(b.get_f64_data().unwrap().iter().all(|&x| x.abs() <= 1.0));
}

#[test]
fn test_from_host_bytes() {
    let src = Tensor::new(vec![1.5, -2.0, 3.25], vec![3]).unwrap();
    let bytes = src.to_host_bytes().unwrap();
    let t = from_host_bytes(&bytes, &[3], DType::F32, StorageDevice::CPU).unwrap();
    assert_eq!(t.get_f32_data().unwrap(), vec![1.5, -2.0, 3.25]);
    assert!(!t.same_storage(&src));

    let short = from_host_bytes(&bytes[..8], &[3], DType::F32, StorageDevice::CPU);
    assert!(matches!(short, Err(VarStoreError::Serialization(_))));
}
