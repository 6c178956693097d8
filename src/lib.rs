#![doc = include_str!("../README.md")]

pub use crate::codec::EventCodec;
pub use crate::config::*;
pub use crate::error::Error;
pub use crate::slot::{AsyncLoggerRef, EventValues, RingBufferLogEvent};
pub use crate::types::*;

pub mod codec;
pub mod config;
pub mod error;
pub mod slot;
pub mod types;
