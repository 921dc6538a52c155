//! Voxel element types and their on-disk encoding

use crate::io::error::{Result, invalid_parameter};
use num_traits::{NumCast, Zero};
use std::fmt;
use std::str::FromStr;

/// Element type of a voxel channel, using the WKW header codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoxelType {
    /// Unsigned 8 bit
    U8 = 1,
    /// Unsigned 16 bit
    U16 = 2,
    /// Unsigned 32 bit
    U32 = 3,
    /// Unsigned 64 bit
    U64 = 4,
    /// 32 bit float
    F32 = 5,
    /// 64 bit float
    F64 = 6,
    /// Signed 8 bit
    I8 = 7,
    /// Signed 16 bit
    I16 = 8,
    /// Signed 32 bit
    I32 = 9,
    /// Signed 64 bit
    I64 = 10,
}

impl VoxelType {
    /// All voxel types in header code order
    pub const ALL: [Self; 10] = [
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
    ];

    /// Size of one element in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Header code of this type
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a type by its header code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|vt| vt.code() == code)
    }

    /// Element class name as stored in `datasource-properties.json`
    pub const fn element_class(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
        }
    }
}

impl fmt::Display for VoxelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_class())
    }
}

impl FromStr for VoxelType {
    type Err = crate::io::error::CubingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "float" => return Ok(Self::F32),
            "double" => return Ok(Self::F64),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|vt| vt.element_class() == s)
            .ok_or_else(|| invalid_parameter("dtype", &s, &"unknown element class"))
    }
}

impl serde::Serialize for VoxelType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.element_class())
    }
}

impl<'de> serde::Deserialize<'de> for VoxelType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A primitive type that can be stored as a WKW voxel channel
pub trait Element: Copy + Default + PartialEq + Zero + NumCast + Send + Sync + 'static {
    /// Voxel type tag written to the header
    const VOXEL_TYPE: VoxelType;

    /// Encode into the first `VOXEL_TYPE.size()` bytes of `out`
    fn write_le(self, out: &mut [u8]);

    /// Decode from the first `VOXEL_TYPE.size()` bytes of `bytes`
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($t:ty => $vt:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const VOXEL_TYPE: VoxelType = VoxelType::$vt;

                fn write_le(self, out: &mut [u8]) {
                    let encoded = self.to_le_bytes();
                    if let Some(dst) = out.get_mut(..encoded.len()) {
                        dst.copy_from_slice(&encoded);
                    }
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    if let Some(src) = bytes.get(..raw.len()) {
                        raw.copy_from_slice(src);
                    }
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
);

/// Run a generic expression with `$t` bound to the element type for `$voxel_type`
#[macro_export]
macro_rules! with_element_type {
    ($voxel_type:expr, $t:ident => $body:expr) => {
        match $voxel_type {
            $crate::format::voxel::VoxelType::U8 => {
                type $t = u8;
                $body
            }
            $crate::format::voxel::VoxelType::U16 => {
                type $t = u16;
                $body
            }
            $crate::format::voxel::VoxelType::U32 => {
                type $t = u32;
                $body
            }
            $crate::format::voxel::VoxelType::U64 => {
                type $t = u64;
                $body
            }
            $crate::format::voxel::VoxelType::F32 => {
                type $t = f32;
                $body
            }
            $crate::format::voxel::VoxelType::F64 => {
                type $t = f64;
                $body
            }
            $crate::format::voxel::VoxelType::I8 => {
                type $t = i8;
                $body
            }
            $crate::format::voxel::VoxelType::I16 => {
                type $t = i16;
                $body
            }
            $crate::format::voxel::VoxelType::I32 => {
                type $t = i32;
                $body
            }
            $crate::format::voxel::VoxelType::I64 => {
                type $t = i64;
                $body
            }
        }
    };
}
