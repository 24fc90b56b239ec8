// Self-describing typed scalars.
//
// Raw layout: a type tag byte, an empty field-name byte, then a type-specific
// fixed-width value payload, little-endian for all numeric types:
//
//     [type: u8] [name: u8 = 0x00] [payload ...]
//
// The end-of-sequence sentinel is the single byte 0x00 (no name, no payload).
// Values are held in a small inline buffer and copied by value, so yielded
// scalars carry no lifetime.

/// Byte offset of the value payload (type tag + empty name byte).
pub const VALUE_OFFSET: usize = 2;

/// Largest value payload of any scalar type.
pub const MAX_VALUE_SIZE: usize = 16;

/// Largest raw scalar: header plus the widest payload.
pub const MAX_SCALAR_SIZE: usize = VALUE_OFFSET + MAX_VALUE_SIZE;

// ---------------------------------------------------------------------------
// Scalar types
// ---------------------------------------------------------------------------

/// Scalar type tags. Tags at or below 0x0F are embedded in the stream via
/// `Literal0` opcodes, tags 0x10..=0x1F via `Literal1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScalarType {
    /// End-of-sequence sentinel.
    Eoo = 0x00,
    Double = 0x01,
    ObjectId = 0x07,
    Bool = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    Decimal128 = 0x13,
}

impl ScalarType {
    /// Look up a type by its tag byte.
    pub fn from_tag(tag: u8) -> Option<ScalarType> {
        match tag {
            0x00 => Some(ScalarType::Eoo),
            0x01 => Some(ScalarType::Double),
            0x07 => Some(ScalarType::ObjectId),
            0x08 => Some(ScalarType::Bool),
            0x09 => Some(ScalarType::DateTime),
            0x0A => Some(ScalarType::Null),
            0x10 => Some(ScalarType::Int32),
            0x11 => Some(ScalarType::Timestamp),
            0x12 => Some(ScalarType::Int64),
            0x13 => Some(ScalarType::Decimal128),
            _ => None,
        }
    }

    /// Fixed payload width in bytes.
    pub fn value_size(self) -> usize {
        match self {
            ScalarType::Eoo | ScalarType::Null => 0,
            ScalarType::Bool => 1,
            ScalarType::Int32 => 4,
            ScalarType::Double
            | ScalarType::DateTime
            | ScalarType::Timestamp
            | ScalarType::Int64 => 8,
            ScalarType::ObjectId => 12,
            ScalarType::Decimal128 => 16,
        }
    }

    /// Human-readable type name, used by the disassembler.
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Eoo => "EOO",
            ScalarType::Double => "Double",
            ScalarType::ObjectId => "ObjectId",
            ScalarType::Bool => "Bool",
            ScalarType::DateTime => "DateTime",
            ScalarType::Null => "Null",
            ScalarType::Int32 => "Int32",
            ScalarType::Timestamp => "Timestamp",
            ScalarType::Int64 => "Int64",
            ScalarType::Decimal128 => "Decimal128",
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar value
// ---------------------------------------------------------------------------

/// An owned typed scalar in its raw stream encoding.
#[derive(Clone, Copy)]
pub struct Scalar {
    data: [u8; MAX_SCALAR_SIZE],
    len: u8,
}

impl Scalar {
    pub(crate) fn from_parts(ty: ScalarType, payload: &[u8]) -> Scalar {
        debug_assert_eq!(payload.len(), ty.value_size());
        let mut data = [0u8; MAX_SCALAR_SIZE];
        data[0] = ty as u8;
        data[VALUE_OFFSET..VALUE_OFFSET + payload.len()].copy_from_slice(payload);
        Scalar {
            data,
            len: (VALUE_OFFSET + payload.len()) as u8,
        }
    }

    /// The end-of-sequence sentinel: a lone zero byte.
    pub fn eoo() -> Scalar {
        Scalar {
            data: [0u8; MAX_SCALAR_SIZE],
            len: 1,
        }
    }

    pub fn double(v: f64) -> Scalar {
        Scalar::from_parts(ScalarType::Double, &v.to_le_bytes())
    }

    pub fn int32(v: i32) -> Scalar {
        Scalar::from_parts(ScalarType::Int32, &v.to_le_bytes())
    }

    pub fn int64(v: i64) -> Scalar {
        Scalar::from_parts(ScalarType::Int64, &v.to_le_bytes())
    }

    pub fn boolean(v: bool) -> Scalar {
        Scalar::from_parts(ScalarType::Bool, &[v as u8])
    }

    /// Milliseconds since the epoch.
    pub fn datetime(millis: i64) -> Scalar {
        Scalar::from_parts(ScalarType::DateTime, &millis.to_le_bytes())
    }

    pub fn timestamp(v: u64) -> Scalar {
        Scalar::from_parts(ScalarType::Timestamp, &v.to_le_bytes())
    }

    pub fn null() -> Scalar {
        Scalar::from_parts(ScalarType::Null, &[])
    }

    pub fn object_id(bytes: [u8; 12]) -> Scalar {
        Scalar::from_parts(ScalarType::ObjectId, &bytes)
    }

    /// Raw 128-bit decimal bits, little-endian.
    pub fn decimal128(bits: [u8; 16]) -> Scalar {
        Scalar::from_parts(ScalarType::Decimal128, &bits)
    }

    /// Parse a self-describing scalar from the front of `buf`.
    pub fn read(buf: &[u8]) -> Result<Scalar, ScalarError> {
        let Some(&tag) = buf.first() else {
            return Err(ScalarError::Truncated);
        };
        let Some(ty) = ScalarType::from_tag(tag) else {
            return Err(ScalarError::UnknownType(tag));
        };
        if ty == ScalarType::Eoo {
            return Ok(Scalar::eoo());
        }
        if buf.len() < VALUE_OFFSET + ty.value_size() {
            return Err(ScalarError::Truncated);
        }
        if buf[1] != 0 {
            return Err(ScalarError::NonEmptyName(buf[1]));
        }
        Ok(Scalar::from_parts(
            ty,
            &buf[VALUE_OFFSET..VALUE_OFFSET + ty.value_size()],
        ))
    }

    /// The type tag byte.
    #[inline]
    pub fn type_tag(&self) -> u8 {
        self.data[0]
    }

    /// The scalar's type.
    pub fn scalar_type(&self) -> ScalarType {
        // Only constructors and `read` build scalars, so the tag is known.
        ScalarType::from_tag(self.data[0]).unwrap_or(ScalarType::Eoo)
    }

    /// Full raw bytes: type tag, name byte, payload.
    #[inline]
    pub fn raw(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// The value payload slice (empty for EOO and Null).
    #[inline]
    pub fn value(&self) -> &[u8] {
        if self.is_eoo() {
            &[]
        } else {
            &self.data[VALUE_OFFSET..self.len as usize]
        }
    }

    /// Payload length in bytes.
    #[inline]
    pub fn value_size(&self) -> usize {
        self.value().len()
    }

    /// Total raw length in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_eoo(&self) -> bool {
        self.data[0] == 0
    }

    fn value_as_8_bytes(&self, ty: ScalarType) -> Option<[u8; 8]> {
        if self.scalar_type() != ty {
            return None;
        }
        self.value().try_into().ok()
    }

    pub fn as_double(&self) -> Option<f64> {
        self.value_as_8_bytes(ScalarType::Double).map(f64::from_le_bytes)
    }

    pub fn as_int32(&self) -> Option<i32> {
        if self.scalar_type() != ScalarType::Int32 {
            return None;
        }
        let bytes: [u8; 4] = self.value().try_into().ok()?;
        Some(i32::from_le_bytes(bytes))
    }

    pub fn as_int64(&self) -> Option<i64> {
        self.value_as_8_bytes(ScalarType::Int64).map(i64::from_le_bytes)
    }

    pub fn as_bool(&self) -> Option<bool> {
        if self.scalar_type() != ScalarType::Bool {
            return None;
        }
        self.value().first().map(|&b| b != 0)
    }

    pub fn as_datetime(&self) -> Option<i64> {
        self.value_as_8_bytes(ScalarType::DateTime).map(i64::from_le_bytes)
    }

    pub fn as_timestamp(&self) -> Option<u64> {
        self.value_as_8_bytes(ScalarType::Timestamp).map(u64::from_le_bytes)
    }
}

impl PartialEq for Scalar {
    /// Binary equality over the full raw bytes.
    fn eq(&self, other: &Scalar) -> bool {
        self.raw() == other.raw()
    }
}

impl Eq for Scalar {}

impl std::fmt::Debug for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Scalar({self})")
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scalar_type() {
            ScalarType::Eoo => write!(f, "EOO"),
            ScalarType::Null => write!(f, "null"),
            ScalarType::Double => write!(f, "{}", self.as_double().unwrap_or(f64::NAN)),
            ScalarType::Bool => write!(f, "{}", self.as_bool().unwrap_or(false)),
            ScalarType::Int32 => write!(f, "{}", self.as_int32().unwrap_or(0)),
            ScalarType::Int64 => write!(f, "{}", self.as_int64().unwrap_or(0)),
            ScalarType::DateTime => write!(f, "DateTime({})", self.as_datetime().unwrap_or(0)),
            ScalarType::Timestamp => write!(f, "Timestamp({})", self.as_timestamp().unwrap_or(0)),
            ScalarType::ObjectId | ScalarType::Decimal128 => {
                write!(f, "{}(", self.scalar_type().name())?;
                for b in self.value() {
                    write!(f, "{b:02x}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarError {
    /// Input ended inside the scalar header or payload.
    Truncated,
    /// The type tag byte does not name a known scalar type.
    UnknownType(u8),
    /// The field-name byte must be empty.
    NonEmptyName(u8),
}

impl std::fmt::Display for ScalarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarError::Truncated => write!(f, "truncated scalar"),
            ScalarError::UnknownType(tag) => write!(f, "unknown scalar type tag {tag:#04X}"),
            ScalarError::NonEmptyName(b) => {
                write!(f, "expected empty field name, found byte {b:#04X}")
            }
        }
    }
}

impl std::error::Error for ScalarError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
