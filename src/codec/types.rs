use crate::{
    config::NativeByteOrder,
    error::Error,
    slot::{EventValues, RingBufferLogEvent},
    types::{
        ContextMap, ContextStack, Level, LogRecord, Location, Marker, PortableMessage,
        ThrowableProxy, TimeMillis,
    },
};
use byteordered::{ByteOrdered, Endianness};
use internment::Intern;
use serde::{Deserialize, Serialize};
use std::{
    io::{Read, Write},
    sync::Arc,
};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FrameHeader {
    pub magic: u32,
    pub version: u8,
    pub body_len: u32,
}

impl FrameHeader {
    pub const MAGIC: u32 = 0x524C_4556;
    pub const VERSION: u8 = 1;
    /// Size of the header on the wire (bytes)
    pub const SIZE: usize = 4 + 1 + 4;

    pub fn new(body_len: u32) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            body_len,
        }
    }

    pub fn frame_size(&self) -> usize {
        Self::SIZE + self.body_len as usize
    }

    pub fn read<R: Read>(r: R, byte_order: NativeByteOrder) -> Result<Self, Error> {
        let mut r = ByteOrdered::runtime(r, Endianness::from(byte_order));
        let magic = r.read_u32()?;
        if magic != Self::MAGIC {
            return Err(Error::BadMagic(magic));
        }
        let version = r.read_u8()?;
        if version != Self::VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let body_len = r.read_u32()?;
        Ok(Self {
            magic,
            version,
            body_len,
        })
    }

    pub fn write<W: Write>(&self, w: W, byte_order: NativeByteOrder) -> Result<(), Error> {
        let mut w = ByteOrdered::runtime(w, Endianness::from(byte_order));
        w.write_u32(self.magic)?;
        w.write_u8(self.version)?;
        w.write_u32(self.body_len)?;
        Ok(())
    }
}

/// Encodable form of a populated slot. The live error is not part of it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct PortableEvent {
    pub logger_name: Option<Intern<String>>,
    pub marker: Option<Marker>,
    pub logger_fqcn: Option<Intern<String>>,
    pub level: Option<Level>,
    pub message: Option<PortableMessage>,
    pub thrown_proxy: Option<ThrowableProxy>,
    pub context_map: Option<Arc<ContextMap>>,
    pub context_stack: Option<Arc<ContextStack>>,
    pub thread_name: Option<Intern<String>>,
    pub source: Option<Location>,
    pub time_millis: TimeMillis,
    pub end_of_batch: bool,
    pub include_location: bool,
}

impl PortableEvent {
    pub fn from_slot(evt: &RingBufferLogEvent) -> Result<Self, Error> {
        let values = evt.values();
        let message = values
            .message
            .as_ref()
            .map(|m| m.to_portable())
            .transpose()?;
        Ok(Self {
            logger_name: values.logger_name,
            marker: values.marker,
            logger_fqcn: values.logger_fqcn,
            level: values.level,
            message,
            // Built here if it wasn't yet
            thrown_proxy: evt.thrown_proxy().cloned(),
            context_map: values.context_map,
            context_stack: values.context_stack,
            thread_name: values.thread_name,
            source: values.source,
            time_millis: values.time_millis,
            end_of_batch: evt.is_end_of_batch(),
            include_location: evt.is_include_location(),
        })
    }

    pub fn into_slot(self) -> Result<RingBufferLogEvent, Error> {
        if let Some(proxy) = self.thrown_proxy.as_ref() {
            if proxy.causes.len() > ThrowableProxy::MAX_CAUSE_DEPTH {
                return Err(Error::CauseChainTooDeep(
                    proxy.causes.len(),
                    ThrowableProxy::MAX_CAUSE_DEPTH,
                ));
            }
        }
        let values = EventValues {
            async_logger: None,
            logger_name: self.logger_name,
            marker: self.marker,
            logger_fqcn: self.logger_fqcn,
            level: self.level,
            message: self.message.map(PortableMessage::into_message),
            thrown: None,
            context_map: self.context_map,
            context_stack: self.context_stack,
            thread_name: self.thread_name,
            source: self.source,
            time_millis: self.time_millis,
        };
        let mut evt = RingBufferLogEvent::from_decoded(values, self.thrown_proxy);
        evt.set_end_of_batch(self.end_of_batch);
        evt.set_include_location(self.include_location);
        Ok(evt)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_byte_orders() {
        let header = FrameHeader::new(0x0102_0304);

        let mut be = Vec::new();
        header.write(&mut be, NativeByteOrder::BigEndian).unwrap();
        assert_eq!(be, vec![0x52, 0x4C, 0x45, 0x56, 1, 1, 2, 3, 4]);

        let mut le = Vec::new();
        header.write(&mut le, NativeByteOrder::LittleEndian).unwrap();
        assert_eq!(le, vec![0x56, 0x45, 0x4C, 0x52, 1, 4, 3, 2, 1]);

        assert_eq!(
            FrameHeader::read(le.as_slice(), NativeByteOrder::LittleEndian).unwrap(),
            header
        );
        assert_eq!(header.frame_size(), FrameHeader::SIZE + 0x0102_0304);
    }

    #[test]
    fn header_rejects_mismatched_schema() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF, 1, 0, 0, 0, 0];
        assert!(matches!(
            FrameHeader::read(&bytes[..], NativeByteOrder::BigEndian),
            Err(Error::BadMagic(0xDEAD_BEEF))
        ));

        let bytes = [0x52, 0x4C, 0x45, 0x56, 9, 0, 0, 0, 0];
        assert!(matches!(
            FrameHeader::read(&bytes[..], NativeByteOrder::BigEndian),
            Err(Error::UnsupportedVersion(9))
        ));
    }
}
