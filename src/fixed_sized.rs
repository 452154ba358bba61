use crate::sys::CDataType;

/// Trait implemented by fixed size C types a [`crate::Field`] can decode a value into.
///
/// # Safety
///
/// `C_DATA_TYPE` must describe the memory layout of `Self`. The driver writes `size_of::<Self>()`
/// bytes into values of this type.
pub unsafe trait FixedSizedCType: Default + Clone + Copy {
    /// C data type used to request values of this type from the driver.
    const C_DATA_TYPE: CDataType;
}

unsafe impl FixedSizedCType for f64 {
    const C_DATA_TYPE: CDataType = CDataType::Double;
}

unsafe impl FixedSizedCType for f32 {
    const C_DATA_TYPE: CDataType = CDataType::Float;
}

unsafe impl FixedSizedCType for i16 {
    const C_DATA_TYPE: CDataType = CDataType::SShort;
}

unsafe impl FixedSizedCType for u16 {
    const C_DATA_TYPE: CDataType = CDataType::UShort;
}

unsafe impl FixedSizedCType for i32 {
    const C_DATA_TYPE: CDataType = CDataType::SLong;
}

unsafe impl FixedSizedCType for u32 {
    const C_DATA_TYPE: CDataType = CDataType::ULong;
}
