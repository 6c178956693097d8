use self::types::{FrameHeader, PortableEvent};
use crate::{
    config::{Config, NativeByteOrder},
    error::Error,
    slot::RingBufferLogEvent,
};
use bincode::Options;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::{Read, Write};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

pub mod types;

/// Frames [`RingBufferLogEvent`]s for a byte stream.
///
/// Each frame is a [`FrameHeader`] followed by the encoded event body.
#[derive(Copy, Clone, Debug)]
pub struct EventCodec {
    byte_order: NativeByteOrder,
    max_frame_size: usize,
    pending: Option<FrameHeader>,
}

impl EventCodec {
    pub fn new(cfg: &Config) -> Self {
        Self {
            byte_order: cfg.byte_order,
            max_frame_size: cfg.max_frame_size,
            pending: None,
        }
    }

    fn check_body_size(&self, body_len: usize) -> Result<(), Error> {
        if body_len > self.max_frame_size || u32::try_from(body_len).is_err() {
            warn!(
                body_len,
                max_frame_size = self.max_frame_size,
                "Rejecting oversized event frame"
            );
            return Err(Error::FrameTooLarge(body_len, self.max_frame_size));
        }
        Ok(())
    }

    /// Body encoding: fixed-width little-endian integers, and the body
    /// must be consumed exactly
    fn body_options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .reject_trailing_bytes()
    }

    fn encode_body(&self, evt: &RingBufferLogEvent) -> Result<Vec<u8>, Error> {
        let portable = PortableEvent::from_slot(evt)?;
        let body = Self::body_options().serialize(&portable)?;
        self.check_body_size(body.len())?;
        Ok(body)
    }

    fn decode_body(body: &[u8]) -> Result<RingBufferLogEvent, Error> {
        let portable: PortableEvent = Self::body_options().deserialize(body)?;
        portable.into_slot()
    }

    /// Write one framed event to a blocking writer.
    pub fn write<W: Write>(&self, evt: &RingBufferLogEvent, mut w: W) -> Result<(), Error> {
        let body = self.encode_body(evt)?;
        // Fits, checked above
        FrameHeader::new(body.len() as u32).write(&mut w, self.byte_order)?;
        w.write_all(&body)?;
        Ok(())
    }

    /// Read one framed event from a blocking reader.
    ///
    /// A reader that is exhausted before the header starts yields an
    /// [`std::io::ErrorKind::UnexpectedEof`] I/O error; a frame cut short
    /// yields [`Error::Truncated`].
    pub fn read<R: Read>(&self, mut r: R) -> Result<RingBufferLogEvent, Error> {
        let mut header_bytes = [0_u8; FrameHeader::SIZE];
        let mut filled = 0;
        while filled < FrameHeader::SIZE {
            let n = r.read(&mut header_bytes[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
                }
                return Err(Error::Truncated(FrameHeader::SIZE, filled));
            }
            filled += n;
        }
        let header = FrameHeader::read(&header_bytes[..], self.byte_order)?;
        self.check_body_size(header.body_len as usize)?;

        let mut body = Vec::with_capacity(header.body_len as usize);
        r.take(header.body_len.into()).read_to_end(&mut body)?;
        if body.len() != header.body_len as usize {
            return Err(Error::Truncated(header.frame_size(), FrameHeader::SIZE + body.len()));
        }
        Self::decode_body(&body)
    }
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Encoder<&RingBufferLogEvent> for EventCodec {
    type Error = Error;

    fn encode(&mut self, evt: &RingBufferLogEvent, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = self.encode_body(evt)?;
        dst.reserve(FrameHeader::SIZE + body.len());
        FrameHeader::new(body.len() as u32).write((&mut *dst).writer(), self.byte_order)?;
        dst.put_slice(&body);
        debug!(body_len = body.len(), "Encoded event frame");
        Ok(())
    }
}

impl Decoder for EventCodec {
    type Item = RingBufferLogEvent;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let header = match self.pending.take() {
            Some(h) => h,
            None => {
                if src.len() < FrameHeader::SIZE {
                    // Not enough data for the header
                    return Ok(None);
                }
                let header = FrameHeader::read(&src[..FrameHeader::SIZE], self.byte_order)?;
                self.check_body_size(header.body_len as usize)?;
                src.advance(FrameHeader::SIZE);
                header
            }
        };

        let body_len = header.body_len as usize;
        if src.len() < body_len {
            // Not enough data for the body
            src.reserve(body_len - src.len());
            self.pending = Some(header);
            return Ok(None);
        }

        let body = src.split_to(body_len);
        let evt = Self::decode_body(&body)?;
        debug!(body_len, "Decoded event frame");
        Ok(Some(evt))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(evt) => Ok(Some(evt)),
            None => match self.pending.take() {
                Some(header) => {
                    warn!("Event stream ended inside a frame body");
                    Err(Error::Truncated(
                        header.frame_size(),
                        FrameHeader::SIZE + src.len(),
                    ))
                }
                None if !src.is_empty() => {
                    warn!("Event stream ended inside a frame header");
                    Err(Error::Truncated(FrameHeader::SIZE, src.len()))
                }
                None => Ok(None),
            },
        }
    }
}

impl RingBufferLogEvent {
    /// Encode the slot as a single frame using the default [`Config`].
    ///
    /// The live error is not encoded, its proxy is built if needed and encoded instead.
    pub fn serialize(&self) -> Result<Bytes, Error> {
        let mut dst = BytesMut::new();
        EventCodec::default().encode(self, &mut dst)?;
        Ok(dst.freeze())
    }

    /// Decode a slot from a frame produced by [`RingBufferLogEvent::serialize`].
    ///
    /// `bytes` must hold exactly one frame.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut src = BytesMut::from(bytes);
        let mut codec = EventCodec::default();
        match codec.decode_eof(&mut src)? {
            Some(_) if !src.is_empty() => Err(Error::TrailingBytes(src.len())),
            Some(evt) => Ok(evt),
            None => Err(Error::Truncated(FrameHeader::SIZE, 0)),
        }
    }

    pub fn write_to<W: Write>(&self, w: W) -> Result<(), Error> {
        EventCodec::default().write(self, w)
    }

    pub fn read_from<R: Read>(r: R) -> Result<Self, Error> {
        EventCodec::default().read(r)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        slot::EventValues,
        types::{
            LogRecord, Marker, Parameter, ParameterizedMessage, SimpleMessage, ThrowableCause,
            ThrowableProxy,
        },
    };
    use std::sync::Arc;

    fn frame(portable: &PortableEvent) -> Vec<u8> {
        let body = EventCodec::body_options().serialize(portable).unwrap();
        let mut bytes = Vec::new();
        FrameHeader::new(body.len() as u32)
            .write(&mut bytes, NativeByteOrder::BigEndian)
            .unwrap();
        bytes.extend_from_slice(&body);
        bytes
    }

    fn populated() -> RingBufferLogEvent {
        let mut evt = RingBufferLogEvent::new();
        evt.set_values(EventValues {
            message: Some(Arc::new(SimpleMessage::new("message"))),
            time_millis: 12345,
            ..Default::default()
        });
        evt
    }

    #[test]
    fn decode_in_pieces() {
        let bytes = populated().serialize().unwrap();
        let mut codec = EventCodec::default();
        let mut src = BytesMut::new();

        let (head, tail) = bytes.split_at(FrameHeader::SIZE + 2);
        src.extend_from_slice(&head[..3]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(&head[3..]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(tail);
        let evt = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(evt.time_millis(), 12345);
        assert!(src.is_empty());
    }

    #[test]
    fn truncated_frames() {
        let bytes = populated().serialize().unwrap();
        let err = RingBufferLogEvent::deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::Truncated(..)));
        assert!(err.is_format_error());

        let err = RingBufferLogEvent::deserialize(&bytes[..4]).unwrap_err();
        assert!(matches!(err, Error::Truncated(FrameHeader::SIZE, 4)));

        let err = RingBufferLogEvent::read_from(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::Truncated(..)));
    }

    #[test]
    fn oversized_frames() {
        let cfg = Config {
            max_frame_size: 8,
            ..Default::default()
        };
        let mut codec = EventCodec::new(&cfg);
        let mut dst = BytesMut::new();
        let err = codec.encode(&populated(), &mut dst).unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge(_, 8)));
        assert!(dst.is_empty());

        let bytes = populated().serialize().unwrap();
        let mut src = BytesMut::from(&bytes[..]);
        assert!(matches!(
            codec.decode(&mut src),
            Err(Error::FrameTooLarge(_, 8))
        ));
    }

    #[test]
    fn unencodable_message() {
        let mut evt = populated();
        evt.set_values(EventValues {
            message: Some(Arc::new(ParameterizedMessage::new(
                "{}",
                vec![Parameter::opaque(&std::thread::current().id())],
            ))),
            ..Default::default()
        });
        let err = evt.serialize().unwrap_err();
        assert!(matches!(err, Error::UnencodableParameter(0, _)));
        assert!(err.is_format_error());
    }

    #[test]
    fn corrupt_body() {
        let mut bytes = populated().serialize().unwrap().to_vec();
        // Two byte body starting with an invalid option tag
        bytes.truncate(FrameHeader::SIZE);
        bytes[FrameHeader::SIZE - 1] = 2;
        bytes.extend_from_slice(&[7, 7]);
        let err = RingBufferLogEvent::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn deep_cause_chain() {
        let mut portable = PortableEvent::from_slot(&populated()).unwrap();
        portable.thrown_proxy = Some(ThrowableProxy {
            name: "io::Error".to_owned(),
            message: "outer".to_owned(),
            stack_trace: Vec::new(),
            causes: vec![
                ThrowableCause {
                    message: "c".to_owned()
                };
                100_000
            ],
        });
        let err = RingBufferLogEvent::deserialize(&frame(&portable)).unwrap_err();
        assert!(matches!(
            err,
            Error::CauseChainTooDeep(100_000, ThrowableProxy::MAX_CAUSE_DEPTH)
        ));
        assert!(err.is_format_error());

        // At the limit is fine
        if let Some(proxy) = portable.thrown_proxy.as_mut() {
            proxy.causes.truncate(ThrowableProxy::MAX_CAUSE_DEPTH);
        }
        let evt = RingBufferLogEvent::deserialize(&frame(&portable)).unwrap();
        assert_eq!(
            evt.thrown_proxy().map(|p| p.causes.len()),
            Some(ThrowableProxy::MAX_CAUSE_DEPTH)
        );
    }

    #[test]
    fn deep_marker_ancestry() {
        let mut marker = Marker::new("m0");
        for idx in 1..=Marker::MAX_DEPTH {
            marker = Marker::with_parents(format!("m{idx}"), vec![marker]);
        }
        let mut portable = PortableEvent::from_slot(&populated()).unwrap();
        portable.marker = Some(marker);
        let err = RingBufferLogEvent::deserialize(&frame(&portable)).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert!(err.is_format_error());

        let shallow = Marker::with_parents("child", vec![Marker::new("parent")]);
        portable.marker = Some(shallow);
        let evt = RingBufferLogEvent::deserialize(&frame(&portable)).unwrap();
        assert_eq!(evt.marker(), Some(&shallow));
    }

    #[test]
    fn trailing_bytes() {
        let mut bytes = populated().serialize().unwrap().to_vec();
        bytes.extend_from_slice(&[0, 0]);
        let err = RingBufferLogEvent::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, Error::TrailingBytes(2)));
        assert!(err.is_format_error());

        // Padding inside the body
        let mut header = FrameHeader::read(&bytes[..FrameHeader::SIZE], NativeByteOrder::BigEndian)
            .unwrap();
        header.body_len += 2;
        header
            .write(&mut bytes[..FrameHeader::SIZE], NativeByteOrder::BigEndian)
            .unwrap();
        let err = RingBufferLogEvent::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn little_endian_streams() {
        let cfg = Config {
            byte_order: NativeByteOrder::LittleEndian,
            ..Default::default()
        };
        let codec = EventCodec::new(&cfg);
        let mut buf = Vec::new();
        codec.write(&populated(), &mut buf).unwrap();
        codec.write(&populated(), &mut buf).unwrap();

        let mut r = buf.as_slice();
        assert_eq!(codec.read(&mut r).unwrap().time_millis(), 12345);
        assert_eq!(codec.read(&mut r).unwrap().time_millis(), 12345);
        assert!(matches!(codec.read(&mut r), Err(Error::Io(_))));

        // Big-endian reader rejects it
        assert!(matches!(
            RingBufferLogEvent::read_from(buf.as_slice()),
            Err(Error::BadMagic(_))
        ));
    }
}
