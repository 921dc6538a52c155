//! Magnification (resolution level) of a layer

use crate::io::error::{CubingError, Result, invalid_parameter};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Per-axis downsampling factor, every component a power of two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MagRepr", into = "[u32; 3]")]
pub struct Mag([u32; 3]);

// Accepted JSON spellings: `1`, `"2-2-1"`, `[2, 2, 1]`
#[derive(Deserialize)]
#[serde(untagged)]
enum MagRepr {
    Scalar(u32),
    Name(String),
    Array([u32; 3]),
}

impl TryFrom<MagRepr> for Mag {
    type Error = CubingError;

    fn try_from(repr: MagRepr) -> Result<Self> {
        match repr {
            MagRepr::Scalar(factor) => Self::new([factor; 3]),
            MagRepr::Name(name) => name.parse(),
            MagRepr::Array(factors) => Self::new(factors),
        }
    }
}

impl From<Mag> for [u32; 3] {
    fn from(mag: Mag) -> Self {
        mag.0
    }
}

impl Mag {
    /// Full resolution
    pub const ONE: Self = Self([1, 1, 1]);

    /// Create a magnification from per-axis factors
    ///
    /// # Errors
    ///
    /// Returns an error if a factor is not a power of two
    pub fn new(factors: [u32; 3]) -> Result<Self> {
        if let Some(bad) = factors.iter().find(|f| !f.is_power_of_two()) {
            return Err(invalid_parameter(
                "mag",
                &format!("{factors:?}"),
                &format!("factor {bad} is not a power of two"),
            ));
        }
        Ok(Self(factors))
    }

    /// Per-axis factors
    pub const fn to_array(self) -> [u32; 3] {
        self.0
    }

    /// Largest factor
    pub fn max_dim(self) -> u32 {
        self.0.into_iter().max().unwrap_or(1)
    }

    /// Directory name: `"2"` for isotropic, `"2-2-1"` otherwise
    pub fn to_layer_name(self) -> String {
        let [x, y, z] = self.0;
        if x == y && y == z {
            x.to_string()
        } else {
            format!("{x}-{y}-{z}")
        }
    }
}

impl Default for Mag {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Mag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_layer_name())
    }
}

impl FromStr for Mag {
    type Err = CubingError;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| invalid_parameter("mag", &s, &e))
        };

        let parts: Vec<&str> = s.split('-').collect();
        match parts.as_slice() {
            [single] => {
                let factor = parse(single)?;
                Self::new([factor; 3])
            }
            [x, y, z] => Self::new([parse(x)?, parse(y)?, parse(z)?]),
            _ => Err(invalid_parameter(
                "mag",
                &s,
                &"expected a single factor or three factors joined by '-'",
            )),
        }
    }
}

impl Ord for Mag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max_dim()
            .cmp(&other.max_dim())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Mag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
