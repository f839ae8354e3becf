//! Typed n-dimensional payloads.

use ndarray::{ArrayD, Dimension, IxDyn};
use thiserror::Error;

use crate::dtype::{DType, Element};

/// A value that could not be represented in the target dtype.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("value {value} at index {index:?} does not fit in {target}")]
pub struct CastError {
    pub value: String,
    pub index: Vec<usize>,
    pub target: DType,
}

/// An n-dimensional array tagged with its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Int8(ArrayD<i8>),
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    UInt8(ArrayD<u8>),
    UInt16(ArrayD<u16>),
    UInt32(ArrayD<u32>),
    UInt64(ArrayD<u64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
}

/// Applies `$body` to the inner array of every variant.
#[macro_export]
macro_rules! with_array {
    ($data:expr, $a:ident => $body:expr) => {
        match $data {
            $crate::ArrayData::Int8($a) => $body,
            $crate::ArrayData::Int16($a) => $body,
            $crate::ArrayData::Int32($a) => $body,
            $crate::ArrayData::Int64($a) => $body,
            $crate::ArrayData::UInt8($a) => $body,
            $crate::ArrayData::UInt16($a) => $body,
            $crate::ArrayData::UInt32($a) => $body,
            $crate::ArrayData::UInt64($a) => $body,
            $crate::ArrayData::Float32($a) => $body,
            $crate::ArrayData::Float64($a) => $body,
        }
    };
}

/// Conversion from a concrete array into the tagged enum.
pub trait IntoArrayData {
    fn into_array_data(self) -> ArrayData;
}

macro_rules! into_array_data {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl IntoArrayData for ArrayD<$t> {
                fn into_array_data(self) -> ArrayData {
                    ArrayData::$variant(self)
                }
            }

            impl From<ArrayD<$t>> for ArrayData {
                fn from(array: ArrayD<$t>) -> Self {
                    ArrayData::$variant(array)
                }
            }
        )*
    };
}

into_array_data! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}

impl ArrayData {
    /// An array of `shape` filled with `value`, converted exactly into `dtype`.
    pub fn filled(shape: &[usize], dtype: DType, value: f64) -> Result<Self, CastError> {
        ArrayData::Float64(ArrayD::from_elem(IxDyn(shape), value)).try_cast(dtype)
    }

    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        match dtype {
            DType::Int8 => ArrayData::Int8(ArrayD::zeros(IxDyn(shape))),
            DType::Int16 => ArrayData::Int16(ArrayD::zeros(IxDyn(shape))),
            DType::Int32 => ArrayData::Int32(ArrayD::zeros(IxDyn(shape))),
            DType::Int64 => ArrayData::Int64(ArrayD::zeros(IxDyn(shape))),
            DType::UInt8 => ArrayData::UInt8(ArrayD::zeros(IxDyn(shape))),
            DType::UInt16 => ArrayData::UInt16(ArrayD::zeros(IxDyn(shape))),
            DType::UInt32 => ArrayData::UInt32(ArrayD::zeros(IxDyn(shape))),
            DType::UInt64 => ArrayData::UInt64(ArrayD::zeros(IxDyn(shape))),
            DType::Float32 => ArrayData::Float32(ArrayD::zeros(IxDyn(shape))),
            DType::Float64 => ArrayData::Float64(ArrayD::zeros(IxDyn(shape))),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::Int8(_) => DType::Int8,
            ArrayData::Int16(_) => DType::Int16,
            ArrayData::Int32(_) => DType::Int32,
            ArrayData::Int64(_) => DType::Int64,
            ArrayData::UInt8(_) => DType::UInt8,
            ArrayData::UInt16(_) => DType::UInt16,
            ArrayData::UInt32(_) => DType::UInt32,
            ArrayData::UInt64(_) => DType::UInt64,
            ArrayData::Float32(_) => DType::Float32,
            ArrayData::Float64(_) => DType::Float64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        with_array!(self, a => a.ndim())
    }

    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index` widened to `f64`, `None` when out of bounds.
    pub fn get_f64(&self, index: &[usize]) -> Option<f64> {
        with_array!(self, a => a.get(IxDyn(index)).map(|v| v.to_f64()))
    }

    /// Sum of all elements, accumulated in `f64`.
    pub fn sum(&self) -> f64 {
        with_array!(self, a => a.iter().map(|v| v.to_f64()).sum())
    }

    /// A float64 copy of the payload.
    pub fn to_f64(&self) -> ArrayD<f64> {
        with_array!(self, a => a.mapv(|v| v.to_f64()))
    }

    /// Casts into `target`, failing on the first element that would not
    /// survive the round trip. `self` is never modified.
    pub fn try_cast(&self, target: DType) -> Result<ArrayData, CastError> {
        if target == self.dtype() {
            return Ok(self.clone());
        }
        let cast = match target {
            DType::Int8 => ArrayData::Int8(self.cast_to()?),
            DType::Int16 => ArrayData::Int16(self.cast_to()?),
            DType::Int32 => ArrayData::Int32(self.cast_to()?),
            DType::Int64 => ArrayData::Int64(self.cast_to()?),
            DType::UInt8 => ArrayData::UInt8(self.cast_to()?),
            DType::UInt16 => ArrayData::UInt16(self.cast_to()?),
            DType::UInt32 => ArrayData::UInt32(self.cast_to()?),
            DType::UInt64 => ArrayData::UInt64(self.cast_to()?),
            DType::Float32 => ArrayData::Float32(self.cast_to()?),
            DType::Float64 => ArrayData::Float64(self.cast_to()?),
        };
        Ok(cast)
    }

    fn cast_to<T: Element>(&self) -> Result<ArrayD<T>, CastError> {
        with_array!(self, a => cast_array(a))
    }
}

fn cast_array<S: Element, T: Element>(source: &ArrayD<S>) -> Result<ArrayD<T>, CastError> {
    let mut failure = None;
    let cast = ArrayD::from_shape_fn(source.raw_dim(), |index: IxDyn| {
        let value = source[index.slice()];
        let converted = match value.to_i128() {
            Some(int) if S::DTYPE.is_integer() => T::from_i128(int),
            _ => T::from_f64(value.to_f64()),
        };
        converted.unwrap_or_else(|| {
            failure.get_or_insert_with(|| CastError {
                value: format!("{:?}", value),
                index: index.slice().to_vec(),
                target: T::DTYPE,
            });
            T::ZERO
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(cast),
    }
}
