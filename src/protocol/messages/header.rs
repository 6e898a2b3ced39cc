use std::io::{Read, Write};

use crate::protocol::{
    api_key::ApiKey,
    api_version::ApiVersion,
    primitives::{Int16, Int32, NullableString},
    traits::{ReadType, WriteType},
};

use super::{ReadVersionedError, ReadVersionedType, WriteVersionedError, WriteVersionedType};

/// The common prefix of every request.
///
/// This client always sends header version 1: api key, api version,
/// correlation id, client id. (Header v2 with tagged fields belongs to the
/// flexible-version era, which the v0/v1 APIs never reach.)
#[derive(Debug, PartialEq, Eq)]
pub struct RequestHeader {
    /// The API key of this request.
    pub request_api_key: ApiKey,

    /// The API version of this request.
    pub request_api_version: ApiVersion,

    /// The correlation ID of this request.
    pub correlation_id: Int32,

    /// The client ID string.
    pub client_id: NullableString,
}

impl<W> WriteVersionedType<W> for RequestHeader
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        let v = version.0 .0;
        if v > 1 {
            return Err(WriteVersionedError::InvalidVersion { version });
        }

        Int16::from(self.request_api_key).write(writer)?;
        self.request_api_version.0.write(writer)?;
        self.correlation_id.write(writer)?;

        if v >= 1 {
            self.client_id.write(writer)?;
        }

        Ok(())
    }
}

impl<R> ReadVersionedType<R> for RequestHeader
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        let v = version.0 .0;
        if v > 1 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            request_api_key: Int16::read(reader)?.into(),
            request_api_version: ApiVersion(Int16::read(reader)?),
            correlation_id: Int32::read(reader)?,
            client_id: if v >= 1 {
                NullableString::read(reader)?
            } else {
                NullableString(None)
            },
        })
    }
}

/// The common prefix of every response: the echoed correlation id.
#[derive(Debug, PartialEq, Eq)]
pub struct ResponseHeader {
    /// The correlation ID of this response.
    pub correlation_id: Int32,
}

impl<R> ReadVersionedType<R> for ResponseHeader
where
    R: Read,
{
    fn read_versioned(reader: &mut R, version: ApiVersion) -> Result<Self, ReadVersionedError> {
        if version.0 .0 > 0 {
            return Err(ReadVersionedError::InvalidVersion { version });
        }

        Ok(Self {
            correlation_id: Int32::read(reader)?,
        })
    }
}

impl<W> WriteVersionedType<W> for ResponseHeader
where
    W: Write,
{
    fn write_versioned(
        &self,
        writer: &mut W,
        version: ApiVersion,
    ) -> Result<(), WriteVersionedError> {
        if version.0 .0 > 0 {
            return Err(WriteVersionedError::InvalidVersion { version });
        }

        self.correlation_id.write(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_request_header_v1_layout() {
        let header = RequestHeader {
            request_api_key: ApiKey::Metadata,
            request_api_version: ApiVersion(Int16(0)),
            correlation_id: Int32(7),
            client_id: NullableString(Some("kafka_ex".to_string())),
        };

        let mut buf = vec![];
        header
            .write_versioned(&mut buf, ApiVersion(Int16(1)))
            .unwrap();

        let expected: Vec<u8> = [
            &3i16.to_be_bytes()[..],
            &0i16.to_be_bytes()[..],
            &7i32.to_be_bytes()[..],
            &8i16.to_be_bytes()[..],
            b"kafka_ex",
        ]
        .concat();
        assert_eq!(buf, expected);

        let restored =
            RequestHeader::read_versioned(&mut Cursor::new(buf), ApiVersion(Int16(1))).unwrap();
        assert_eq!(restored, header);
    }
}
