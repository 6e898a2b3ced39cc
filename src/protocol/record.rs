//! Classic message sets (message format v0 and v1).
//!
//! A message set is a raw concatenation of `offset | size | message` entries
//! with no count prefix, wrapped in an `INT32` byte length wherever it is
//! embedded in a request or response. Message format v1 ([KIP-32]) inserts a
//! timestamp between the attributes and the key; the magic byte selects the
//! format.
//!
//! # CRC
//! The checksum guarding each message is CRC-32 (IEEE, the zlib polynomial)
//! over everything following the crc field. This is *not* the CRC-32C used by
//! the v2 record-batch format.
//!
//! # References
//! - <https://kafka.apache.org/documentation/#messageset>
//!
//! [KIP-32]: https://cwiki.apache.org/confluence/display/KAFKA/KIP-32+-+Add+timestamps+to+Kafka+message

use std::io::{Cursor, Read, Write};

use super::{
    primitives::{Int32, Int64, Int8, NullableBytes},
    traits::{read_exact_bytes, ReadError, ReadType, WriteError, WriteType},
};

/// Mask of the attribute bits that select a compression codec.
const COMPRESSION_MASK: i8 = 0x07;

/// A single message of format v0 or v1.
///
/// The magic byte is not stored: a message carrying a timestamp is v1, one
/// without is v0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Log offset. Producers may write any value here, the broker assigns the
    /// real offset on append.
    pub offset: Int64,

    /// Attribute bits. The compression bits must be zero, this client only
    /// speaks uncompressed sets.
    pub attributes: Int8,

    /// Message timestamp in milliseconds, present iff format v1.
    pub timestamp: Option<Int64>,

    /// Optional message key, used for partition assignment.
    pub key: NullableBytes,

    /// The payload.
    pub value: NullableBytes,
}

impl Message {
    fn check_attributes(attributes: Int8) -> Result<(), String> {
        if attributes.0 & COMPRESSION_MASK != 0 {
            return Err(format!(
                "Unsupported compression codec in attributes: {}",
                attributes.0 & COMPRESSION_MASK
            ));
        }
        Ok(())
    }

    /// Parse one message given its declared body (everything after the size
    /// field).
    fn read_body(body: &[u8], offset: Int64) -> Result<Self, ReadError> {
        let mut reader = Cursor::new(body);

        let crc = Int32::read(&mut reader)?;
        let crc = u32::from_be_bytes(crc.0.to_be_bytes());
        let actual_crc = crc32fast::hash(&body[4..]);
        if crc != actual_crc {
            return Err(ReadError::Malformed(
                format!("CRC error, got 0x{actual_crc:x}, expected 0x{crc:x}").into(),
            ));
        }

        let magic = Int8::read(&mut reader)?;
        let attributes = Int8::read(&mut reader)?;
        Self::check_attributes(attributes).map_err(|e| ReadError::Malformed(e.into()))?;

        let timestamp = match magic.0 {
            0 => None,
            1 => Some(Int64::read(&mut reader)?),
            m => {
                return Err(ReadError::Malformed(
                    format!("Invalid message magic: {m}").into(),
                ))
            }
        };
        let key = NullableBytes::read(&mut reader)?;
        let value = NullableBytes::read(&mut reader)?;

        Ok(Self {
            offset,
            attributes,
            timestamp,
            key,
            value,
        })
    }

    /// Serialize `offset | size | crc | body` into `writer`.
    fn write_entry<W>(&self, writer: &mut W) -> Result<(), WriteError>
    where
        W: Write,
    {
        Self::check_attributes(self.attributes).map_err(|e| WriteError::Malformed(e.into()))?;

        let mut body = vec![];
        let magic = Int8(self.timestamp.is_some() as i8);
        magic.write(&mut body)?;
        self.attributes.write(&mut body)?;
        if let Some(timestamp) = self.timestamp {
            timestamp.write(&mut body)?;
        }
        self.key.write(&mut body)?;
        self.value.write(&mut body)?;

        let crc = crc32fast::hash(&body);
        let crc = Int32(i32::from_be_bytes(crc.to_be_bytes()));

        let size = i32::try_from(body.len() + 4)?;
        self.offset.write(writer)?;
        Int32(size).write(writer)?;
        crc.write(writer)?;
        writer.write_all(&body)?;

        Ok(())
    }
}

/// A sequence of [`Message`]s, length-prefixed like NULLABLE_BYTES.
///
/// Brokers cut fetch responses at `max_bytes`, so the final entry of a
/// fetched set is frequently truncated. The decoder keeps every complete
/// message and silently drops the partial tail, as every pre-KIP-74 client
/// does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSet(pub Vec<Message>);

impl<R> ReadType<R> for MessageSet
where
    R: Read,
{
    fn read(reader: &mut R) -> Result<Self, ReadError> {
        let buf = NullableBytes::read(reader)?.0.unwrap_or_default();
        let len = buf.len() as u64;
        let mut buf = Cursor::new(buf);

        let mut messages = vec![];
        loop {
            let remaining = len - buf.position();
            if remaining < 12 {
                // not even room for offset + size
                break;
            }
            let offset = Int64::read(&mut buf)?;
            let size = Int32::read(&mut buf)?;
            let size = usize::try_from(size.0)
                .map_err(|e| ReadError::Malformed(Box::new(e)))?;
            if (len - buf.position()) < size as u64 {
                // truncated tail
                break;
            }
            let body = read_exact_bytes(&mut buf, size)?;
            messages.push(Message::read_body(&body, offset)?);
        }

        Ok(Self(messages))
    }
}

impl<W> WriteType<W> for MessageSet
where
    W: Write,
{
    fn write(&self, writer: &mut W) -> Result<(), WriteError> {
        let mut buf = vec![];
        for message in &self.0 {
            message.write_entry(&mut buf)?;
        }
        NullableBytes(Some(buf)).write(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn message_v0(offset: i64, key: Option<&[u8]>, value: &[u8]) -> Message {
        Message {
            offset: Int64(offset),
            attributes: Int8(0),
            timestamp: None,
            key: NullableBytes(key.map(|k| k.to_vec())),
            value: NullableBytes(Some(value.to_vec())),
        }
    }

    fn roundtrip(set: &MessageSet) -> MessageSet {
        let mut buf = Cursor::new(vec![]);
        set.write(&mut buf).unwrap();
        buf.set_position(0);
        MessageSet::read(&mut buf).unwrap()
    }

    #[test]
    fn test_crc_is_ieee_not_castagnoli() {
        // CRC-32/ISO-HDLC check value, see the reveng catalogue.
        assert_eq!(crc32fast::hash(b"123456789"), 0xcbf4_3926);
    }

    #[test]
    fn test_roundtrip_v0() {
        let set = MessageSet(vec![
            message_v0(0, None, b"hey"),
            message_v0(1, Some(b"k"), b"there"),
        ]);
        assert_eq!(roundtrip(&set), set);
    }

    #[test]
    fn test_roundtrip_v1_timestamp() {
        let set = MessageSet(vec![Message {
            offset: Int64(42),
            attributes: Int8(0),
            timestamp: Some(Int64(1_499_999_999_999)),
            key: NullableBytes(None),
            value: NullableBytes(Some(b"hello".to_vec())),
        }]);
        assert_eq!(roundtrip(&set), set);
    }

    #[test]
    fn test_empty_set() {
        let set = MessageSet(vec![]);
        assert_eq!(roundtrip(&set), set);
    }

    #[test]
    fn test_wire_layout_v0() {
        let set = MessageSet(vec![message_v0(0, None, b"hey")]);
        let mut buf = vec![];
        set.write(&mut buf).unwrap();

        // byte length | offset | size | crc | magic | attributes | key(-1) | value(3)
        assert_eq!(buf.len(), 4 + 8 + 4 + 4 + 1 + 1 + 4 + 4 + 3);
        assert_eq!(&buf[..4], &(buf.len() as i32 - 4).to_be_bytes());
        assert_eq!(&buf[4..12], &0i64.to_be_bytes());
        assert_eq!(&buf[12..16], &((4 + 1 + 1 + 4 + 4 + 3) as i32).to_be_bytes());
        let crc = crc32fast::hash(&buf[20..]);
        assert_eq!(&buf[16..20], &crc.to_be_bytes());
        assert_eq!(buf[20], 0); // magic
        assert_eq!(buf[21], 0); // attributes
        assert_eq!(&buf[22..26], &(-1i32).to_be_bytes());
        assert_eq!(&buf[26..30], &3i32.to_be_bytes());
        assert_eq!(&buf[30..], b"hey");
    }

    #[test]
    fn test_truncated_tail_dropped() {
        let set = MessageSet(vec![
            message_v0(0, None, b"first"),
            message_v0(1, None, b"second"),
        ]);
        let mut full = vec![];
        set.write(&mut full).unwrap();

        // Re-frame with 5 bytes chopped off the second message.
        let inner = &full[4..full.len() - 5];
        let mut cut = Cursor::new(vec![]);
        NullableBytes(Some(inner.to_vec())).write(&mut cut).unwrap();
        cut.set_position(0);

        let decoded = MessageSet::read(&mut cut).unwrap();
        assert_eq!(decoded, MessageSet(vec![message_v0(0, None, b"first")]));
    }

    #[test]
    fn test_corrupt_crc_rejected() {
        let set = MessageSet(vec![message_v0(0, None, b"hey")]);
        let mut buf = vec![];
        set.write(&mut buf).unwrap();
        buf[17] ^= 0xff; // flip a crc byte

        let err = MessageSet::read(&mut Cursor::new(buf)).unwrap_err();
        assert_matches!(err, ReadError::Malformed(_));
    }

    #[test]
    fn test_compressed_set_rejected() {
        let mut msg = message_v0(0, None, b"hey");
        msg.attributes = Int8(1); // gzip bit

        let mut buf = vec![];
        let err = MessageSet(vec![msg]).write(&mut buf).unwrap_err();
        assert_matches!(err, WriteError::Malformed(_));
    }
}
