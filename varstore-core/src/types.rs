/// Defines the possible data types for Tensor elements.
///
/// This enum allows the framework to handle tensors with different
/// numerical types dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating-point type.
    F32,
    /// 64-bit floating-point type.
    F64,
    /// 64-bit integer type.
    I64,
    /// Boolean type. Declared for completeness, the CPU engine has no storage for it.
    Bool,
}

impl DType {
    /// Size in bytes of one element.
    pub fn size_of(&self) -> usize {
        match self {
            DType::F32 => std::mem::size_of::<f32>(),
            DType::F64 => std::mem::size_of::<f64>(),
            DType::I64 => std::mem::size_of::<i64>(),
            DType::Bool => std::mem::size_of::<bool>(),
        }
    }

    /// Whether the engine can allocate buffers of this type.
    pub fn is_storable(&self) -> bool {
        matches!(self, DType::F32 | DType::F64 | DType::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    /// Stable one-byte tag used by on-disk formats.
    pub fn tag(&self) -> u8 {
        match self {
            DType::F32 => 0,
            DType::F64 => 1,
            DType::I64 => 2,
            DType::Bool => 3,
        }
    }

    /// Inverse of [`DType::tag`].
    pub fn from_tag(tag: u8) -> Option<DType> {
        match tag {
            0 => Some(DType::F32),
            1 => Some(DType::F64),
            2 => Some(DType::I64),
            3 => Some(DType::Bool),
            _ => None,
        }
    }
}
