use crate::error::Error;
use byteordered::Endianness;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NativeByteOrder {
    #[serde(alias = "little")]
    #[serde(alias = "le")]
    LittleEndian,
    #[default]
    #[serde(alias = "big")]
    #[serde(alias = "be")]
    BigEndian,
}

impl From<NativeByteOrder> for Endianness {
    fn from(value: NativeByteOrder) -> Self {
        match value {
            NativeByteOrder::LittleEndian => Endianness::Little,
            NativeByteOrder::BigEndian => Endianness::Big,
        }
    }
}

/// When the serializable proxy of a slot's error is built.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThrownProxyConstruction {
    /// On first access, or when the slot is serialized.
    #[default]
    Lazy,
    /// While the slot is populated, on the producer thread.
    Eager,
}

/// The event slot configuration object.
///
/// Every key is optional, so an empty yaml document yields [`Config::default`].
#[derive(Clone, Eq, PartialEq, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Byte order of the frame header integers.
    #[serde(default)]
    pub byte_order: NativeByteOrder,
    /// Largest event body (bytes) the codec will accept or produce.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// Proxy construction policy for populated errors.
    #[serde(default)]
    pub thrown_proxy: ThrownProxyConstruction,
}

impl Config {
    pub fn from_yaml<S: AsRef<str>>(s: S) -> Result<Self, Error> {
        let s = s.as_ref();
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            byte_order: NativeByteOrder::default(),
            max_frame_size: default_max_frame_size(),
            thrown_proxy: ThrownProxyConstruction::default(),
        }
    }
}

/// 16 MiB
const fn default_max_frame_size() -> usize {
    16 * 1024 * 1024
}
