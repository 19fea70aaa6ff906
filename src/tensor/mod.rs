//! Borrowed tensor views over model output buffers.
//!
//! `TensorView` is a read-only view into a contiguous row-major buffer with
//! an explicit shape and element type. The buffers themselves are owned by
//! the model-execution layer; the view only borrows them for the duration of
//! a decode call. Integer tensors may carry quantization parameters which
//! decoders use to dequantize samples on the fly.

use crate::util::{DetPostError, DetPostResult};

/// Element types a tensor buffer can hold.
///
/// Mirrors the numeric types produced by the runtimes this crate decodes
/// for. `F16` is declared for completeness but not accepted by any decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TensorType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F16,
    F32,
    F64,
}

impl TensorType {
    /// Returns the element size in bytes.
    pub fn size_of(self) -> usize {
        match self {
            TensorType::I8 | TensorType::U8 => 1,
            TensorType::I16 | TensorType::U16 | TensorType::F16 => 2,
            TensorType::I32 | TensorType::U32 | TensorType::F32 => 4,
            TensorType::I64 | TensorType::U64 | TensorType::F64 => 8,
        }
    }
}

/// Affine quantization parameters for integer tensors.
///
/// A quantized sample `q` dequantizes to `(q - zero_point) * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantization {
    pub scale: f32,
    pub zero_point: i32,
}

impl Quantization {
    /// Creates validated quantization parameters.
    pub fn new(scale: f32, zero_point: i32) -> DetPostResult<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(DetPostError::InvalidQuant("scale must be finite and positive"));
        }
        Ok(Self { scale, zero_point })
    }
}

/// Typed borrowed tensor storage.
#[derive(Clone, Copy, Debug)]
pub enum TensorData<'a> {
    I8(&'a [i8]),
    U8(&'a [u8]),
    I16(&'a [i16]),
    U16(&'a [u16]),
    I32(&'a [i32]),
    U32(&'a [u32]),
    I64(&'a [i64]),
    U64(&'a [u64]),
    F16(&'a [half::f16]),
    F32(&'a [f32]),
    F64(&'a [f64]),
}

impl TensorData<'_> {
    fn len(&self) -> usize {
        match self {
            TensorData::I8(d) => d.len(),
            TensorData::U8(d) => d.len(),
            TensorData::I16(d) => d.len(),
            TensorData::U16(d) => d.len(),
            TensorData::I32(d) => d.len(),
            TensorData::U32(d) => d.len(),
            TensorData::I64(d) => d.len(),
            TensorData::U64(d) => d.len(),
            TensorData::F16(d) => d.len(),
            TensorData::F32(d) => d.len(),
            TensorData::F64(d) => d.len(),
        }
    }

    fn dtype(&self) -> TensorType {
        match self {
            TensorData::I8(_) => TensorType::I8,
            TensorData::U8(_) => TensorType::U8,
            TensorData::I16(_) => TensorType::I16,
            TensorData::U16(_) => TensorType::U16,
            TensorData::I32(_) => TensorType::I32,
            TensorData::U32(_) => TensorType::U32,
            TensorData::I64(_) => TensorType::I64,
            TensorData::U64(_) => TensorType::U64,
            TensorData::F16(_) => TensorType::F16,
            TensorData::F32(_) => TensorType::F32,
            TensorData::F64(_) => TensorType::F64,
        }
    }
}

/// Read-only view over a contiguous row-major tensor buffer.
///
/// The view validates on construction that the buffer holds exactly the
/// number of elements the shape describes, so accessors can index without
/// re-checking bounds against the shape.
#[derive(Clone, Copy, Debug)]
pub struct TensorView<'a> {
    shape: &'a [usize],
    data: TensorData<'a>,
    quant: Option<Quantization>,
}

impl<'a> TensorView<'a> {
    /// Creates a view over `data` with the given shape.
    pub fn new(shape: &'a [usize], data: TensorData<'a>) -> DetPostResult<Self> {
        if shape.is_empty() {
            return Err(DetPostError::InvalidShape {
                context: "tensor rank must be at least 1",
                shape: shape.to_vec(),
            });
        }
        let elements: usize = shape.iter().product();
        if elements == 0 || data.len() == 0 {
            return Err(DetPostError::TensorNoData);
        }
        if data.len() != elements {
            return Err(DetPostError::InvalidShape {
                context: "element count does not match buffer length",
                shape: shape.to_vec(),
            });
        }
        Ok(Self {
            shape,
            data,
            quant: None,
        })
    }

    /// Convenience constructor for `f32` buffers.
    pub fn from_f32(shape: &'a [usize], data: &'a [f32]) -> DetPostResult<Self> {
        Self::new(shape, TensorData::F32(data))
    }

    /// Attaches quantization parameters. Only meaningful for `i8`/`u8` data.
    pub fn with_quant(mut self, quant: Quantization) -> DetPostResult<Self> {
        match self.dtype() {
            TensorType::I8 | TensorType::U8 => {
                self.quant = Some(quant);
                Ok(self)
            }
            other => Err(DetPostError::UnsupportedTensorType(other)),
        }
    }

    /// Returns the tensor shape.
    pub fn shape(&self) -> &'a [usize] {
        self.shape
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the size of dimension `axis`.
    pub fn dim(&self, axis: usize) -> DetPostResult<usize> {
        self.shape
            .get(axis)
            .copied()
            .ok_or(DetPostError::InvalidAxis {
                axis,
                rank: self.shape.len(),
            })
    }

    /// Returns the total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the view holds no elements. Construction rejects
    /// empty buffers, so this is always false for a valid view.
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Returns the element type.
    pub fn dtype(&self) -> TensorType {
        self.data.dtype()
    }

    /// Returns the quantization parameters, if attached.
    pub fn quant(&self) -> Option<Quantization> {
        self.quant
    }

    /// Returns the raw `f32` slice, or a type mismatch error.
    pub fn as_f32(&self) -> DetPostResult<&'a [f32]> {
        match self.data {
            TensorData::F32(d) => Ok(d),
            _ => Err(DetPostError::TypeMismatch {
                expected: TensorType::F32,
                got: self.dtype(),
            }),
        }
    }

    /// Returns a dequantizing sample reader over the buffer.
    ///
    /// Supported inputs are `f32` tensors and quantized `i8`/`u8` tensors.
    /// Integer tensors without quantization parameters are rejected, as are
    /// the remaining element types.
    pub fn samples(&self) -> DetPostResult<Samples<'a>> {
        match self.data {
            TensorData::F32(d) => Ok(Samples::F32(d)),
            TensorData::U8(d) => {
                let quant = self.quant.ok_or(DetPostError::InvalidQuant(
                    "integer tensor is missing quantization parameters",
                ))?;
                Ok(Samples::QuantU8 { data: d, quant })
            }
            TensorData::I8(d) => {
                let quant = self.quant.ok_or(DetPostError::InvalidQuant(
                    "integer tensor is missing quantization parameters",
                ))?;
                Ok(Samples::QuantI8 { data: d, quant })
            }
            _ => Err(DetPostError::UnsupportedTensorType(self.dtype())),
        }
    }
}

/// Sample reader yielding dequantized `f32` values.
#[derive(Clone, Copy)]
pub enum Samples<'a> {
    F32(&'a [f32]),
    QuantU8 { data: &'a [u8], quant: Quantization },
    QuantI8 { data: &'a [i8], quant: Quantization },
}

impl Samples<'_> {
    /// Returns the dequantized value at `idx`.
    ///
    /// Indexing past the buffer panics; callers index within the shape the
    /// owning view was validated against.
    #[inline]
    pub fn get(&self, idx: usize) -> f32 {
        match self {
            Samples::F32(d) => d[idx],
            Samples::QuantU8 { data, quant } => {
                (data[idx] as i32 - quant.zero_point) as f32 * quant.scale
            }
            Samples::QuantI8 { data, quant } => {
                (data[idx] as i32 - quant.zero_point) as f32 * quant.scale
            }
        }
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        match self {
            Samples::F32(d) => d.len(),
            Samples::QuantU8 { data, .. } => data.len(),
            Samples::QuantI8 { data, .. } => data.len(),
        }
    }

    /// Returns true if the reader holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
