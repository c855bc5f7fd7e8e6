use std::fmt::Display;

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::exif::Scope;

/// Represent a decoded tag value.
///
/// Integer formats of every width are widened to 32 bits: `Ubyte`, `Ushort`
/// and `Ulong` all decode to [`Value::Unsigned`], and their signed
/// counterparts to [`Value::Signed`]. The originating [`DataFormat`] is kept
/// on the enclosing [`Tag`].
#[cfg_attr(feature = "json_dump", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Signed(Vec<i32>),
    Unsigned(Vec<u32>),
    IRationals(Vec<IRational>),
    URationals(Vec<URational>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Undefined(Vec<u8>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_unsigned(&self) -> Option<&[u32]> {
        match self {
            Value::Unsigned(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_signed(&self) -> Option<&[i32]> {
        match self {
            Value::Signed(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_urationals(&self) -> Option<&[URational]> {
        if let Value::URationals(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_irationals(&self) -> Option<&[IRational]> {
        if let Value::IRationals(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_f32s(&self) -> Option<&[f32]> {
        match self {
            Value::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64s(&self) -> Option<&[f64]> {
        match self {
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Undefined(v) => Some(v),
            _ => None,
        }
    }

    /// First element of an unsigned integer value, the common case for
    /// single-component tags such as `ImageWidth` or `Orientation`.
    pub fn first_u32(&self) -> Option<u32> {
        self.as_unsigned().and_then(|v| v.first().copied())
    }

    /// Number of components held by this value. A string counts as one.
    pub fn len(&self) -> usize {
        match self {
            Value::Text(_) => 1,
            Value::Signed(v) => v.len(),
            Value::Unsigned(v) => v.len(),
            Value::IRationals(v) => v.len(),
            Value::URationals(v) => v.len(),
            Value::F32(v) => v.len(),
            Value::F64(v) => v.len(),
            Value::Undefined(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u32>> for Value {
    fn from(value: Vec<u32>) -> Self {
        Value::Unsigned(value)
    }
}

impl From<Vec<i32>> for Value {
    fn from(value: Vec<i32>) -> Self {
        Value::Signed(value)
    }
}

impl From<Vec<URational>> for Value {
    fn from(value: Vec<URational>) -> Self {
        Value::URationals(value)
    }
}

impl From<Vec<IRational>> for Value {
    fn from(value: Vec<IRational>) -> Self {
        Value::IRationals(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(v) => f.write_str(v),
            Value::Unsigned(v) => f.write_str(&join_limited(v.iter().map(u32::to_string), 16)),
            Value::Signed(v) => f.write_str(&join_limited(v.iter().map(i32::to_string), 16)),
            Value::F32(v) => f.write_str(&join_limited(v.iter().map(f32::to_string), 16)),
            Value::F64(v) => f.write_str(&join_limited(v.iter().map(f64::to_string), 16)),
            Value::URationals(v) => f.write_str(&join_limited(v.iter().map(|r| r.to_string()), 3)),
            Value::IRationals(v) => f.write_str(&join_limited(v.iter().map(|r| r.to_string()), 3)),
            Value::Undefined(v) => {
                let s = join_limited(v.iter().map(|x| format!("0x{x:02x}")), 8);
                write!(f, "Undefined[{s}]")
            }
        }
    }
}

// Display up to `max` components, and replace the rest with ellipsis
fn join_limited(items: impl Iterator<Item = String>, max: usize) -> String {
    items
        .take(max + 1)
        .enumerate()
        .map(|(i, x)| if i >= max { "...".to_owned() } else { x })
        .collect::<Vec<String>>()
        .join(", ")
}

/// A decoded tag: the directory entry's identity, stored once, plus its
/// value.
#[cfg_attr(feature = "json_dump", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: u16,
    pub name: &'static str,
    /// Registry scope the name was resolved in.
    pub scope: Scope,
    pub format: DataFormat,
    pub value: Value,
}

/// # TIFF Data format
///
/// ```txt
/// | Value           |             1 |             2 |              3 |               4 |                 5 |            6 |
/// |-----------------+---------------+---------------+----------------+-----------------+-------------------+--------------|
/// | Format          | unsigned byte | ascii strings | unsigned short |   unsigned long | unsigned rational |  signed byte |
/// | Bytes/component |             1 |             1 |              2 |               4 |                 8 |            1 |
///
/// | Value           |             7 |             8 |              9 |              10 |                11 |           12 |
/// |-----------------+---------------+---------------+----------------+-----------------+-------------------+--------------|
/// | Format          |     undefined |  signed short |    signed long | signed rational |      single float | double float |
/// | Bytes/component |             1 |             2 |              4 |               8 |                 4 |            8 |
/// ```
#[cfg_attr(feature = "json_dump", derive(Serialize))]
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataFormat {
    Ubyte = 1,
    AsciiString = 2,
    Ushort = 3,
    Ulong = 4,
    Urational = 5,
    Sbyte = 6,
    Undefined = 7,
    Sshort = 8,
    Slong = 9,
    Srational = 10,
    Sfloat = 11,
    Dfloat = 12,
}

impl DataFormat {
    pub fn element_size(&self) -> u64 {
        match self {
            Self::Ubyte | Self::Sbyte | Self::AsciiString | Self::Undefined => 1,
            Self::Ushort | Self::Sshort => 2,
            Self::Ulong | Self::Slong | Self::Sfloat => 4,
            Self::Urational | Self::Srational | Self::Dfloat => 8,
        }
    }

    pub fn code(&self) -> u16 {
        *self as u16
    }
}

impl TryFrom<u16> for DataFormat {
    type Error = crate::Error;
    fn try_from(v: u16) -> Result<Self, Self::Error> {
        use DataFormat::*;
        Ok(match v {
            1 => Ubyte,
            2 => AsciiString,
            3 => Ushort,
            4 => Ulong,
            5 => Urational,
            6 => Sbyte,
            7 => Undefined,
            8 => Sshort,
            9 => Slong,
            10 => Srational,
            11 => Sfloat,
            12 => Dfloat,
            x => {
                return Err(crate::Error::UnsupportedFeature(format!(
                    "data format {x}"
                )))
            }
        })
    }
}

impl Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataFormat::Ubyte => "unsigned byte",
            DataFormat::AsciiString => "ascii string",
            DataFormat::Ushort => "unsigned short",
            DataFormat::Ulong => "unsigned long",
            DataFormat::Urational => "unsigned rational",
            DataFormat::Sbyte => "signed byte",
            DataFormat::Undefined => "undefined",
            DataFormat::Sshort => "signed short",
            DataFormat::Slong => "signed long",
            DataFormat::Srational => "signed rational",
            DataFormat::Sfloat => "single float",
            DataFormat::Dfloat => "double float",
        };
        f.write_str(s)
    }
}

#[cfg_attr(feature = "json_dump", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rational<T>(pub T, pub T);

pub type IRational = Rational<i32>;
pub type URational = Rational<u32>;

impl<T> Rational<T>
where
    T: Copy + Into<f64>,
{
    pub fn to_f64(&self) -> f64 {
        self.0.into() / self.1.into()
    }
}

impl<T> Display for Rational<T>
where
    T: Display + Copy + Into<f64>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({:.04})", self.0, self.1, self.to_f64())
    }
}

impl<T> From<(T, T)> for Rational<T> {
    fn from(value: (T, T)) -> Self {
        Self(value.0, value.1)
    }
}

impl<T: Copy> From<Rational<T>> for (T, T) {
    fn from(value: Rational<T>) -> Self {
        (value.0, value.1)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(1, DataFormat::Ubyte, 1)]
    #[test_case(2, DataFormat::AsciiString, 1)]
    #[test_case(3, DataFormat::Ushort, 2)]
    #[test_case(4, DataFormat::Ulong, 4)]
    #[test_case(5, DataFormat::Urational, 8)]
    #[test_case(6, DataFormat::Sbyte, 1)]
    #[test_case(7, DataFormat::Undefined, 1)]
    #[test_case(8, DataFormat::Sshort, 2)]
    #[test_case(9, DataFormat::Slong, 4)]
    #[test_case(10, DataFormat::Srational, 8)]
    #[test_case(11, DataFormat::Sfloat, 4)]
    #[test_case(12, DataFormat::Dfloat, 8)]
    fn data_format(code: u16, df: DataFormat, size: u64) {
        let parsed: DataFormat = code.try_into().unwrap();
        assert_eq!(parsed, df);
        assert_eq!(parsed.element_size(), size);
        assert_eq!(parsed.code(), code);
    }

    #[test_case(0)]
    #[test_case(13)]
    #[test_case(0xFFFF)]
    fn bad_data_format(code: u16) {
        let e = DataFormat::try_from(code).unwrap_err();
        assert!(matches!(e, crate::Error::UnsupportedFeature(_)));
    }

    #[test]
    fn accessors() {
        let v: Value = vec![3072u32, 4096].into();
        assert_eq!(v.first_u32(), Some(3072));
        assert_eq!(v.len(), 2);
        assert!(v.as_str().is_none());

        let v: Value = "vivo".into();
        assert_eq!(v.as_str(), Some("vivo"));
        assert_eq!(v.first_u32(), None);

        let v: Value = vec![URational::from((1, 2))].into();
        assert_eq!(v.as_urationals().unwrap()[0].to_f64(), 0.5);
        assert!(Value::Undefined(vec![]).is_empty());
        assert_eq!(DataFormat::Urational.to_string(), "unsigned rational");
    }

    #[test_case(Value::Text("Acme".into()), "Acme")]
    #[test_case(Value::Unsigned(vec![8, 16]), "8, 16")]
    #[test_case(Value::Signed(vec![-7]), "-7")]
    #[test_case(Value::URationals(vec![(1, 4).into()]), "1/4 (0.2500)")]
    #[test_case(
        Value::IRationals(vec![(-1, 2).into(), (1, 2).into(), (3, 2).into(), (5, 2).into()]),
        "-1/2 (-0.5000), 1/2 (0.5000), 3/2 (1.5000), ..."
    )]
    #[test_case(Value::Undefined(b"0230".to_vec()), "Undefined[0x30, 0x32, 0x33, 0x30]")]
    #[test_case(Value::F64(vec![2.5]), "2.5")]
    fn display(v: Value, expect: &str) {
        assert_eq!(v.to_string(), expect);
    }
}
