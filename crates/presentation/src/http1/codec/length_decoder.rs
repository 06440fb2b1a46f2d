//! Body decoder for messages delimited by `Content-Length`.

use std::cmp;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::error::ParseError;
use crate::http1::codec::PayloadItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LengthDecoder {
    /// bytes of the body not read yet
    remaining: u64,
}

impl LengthDecoder {
    pub(crate) fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let read_size = usize::try_from(self.remaining).map_or(src.len(), |remaining| cmp::min(remaining, src.len()));
        self.remaining -= read_size as u64;
        Ok(Some(PayloadItem::Chunk(src.split_to(read_size).freeze())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_length() {
        let mut buffer = BytesMut::from(&b"hello world"[..]);
        let mut decoder = LengthDecoder::new(5);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item, PayloadItem::Chunk(bytes::Bytes::from_static(b"hello")));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
        assert_eq!(&buffer[..], b" world");
    }

    #[test]
    fn waits_for_more_bytes() {
        let mut decoder = LengthDecoder::new(6);

        let mut buffer = BytesMut::from(&b"abc"[..]);
        assert!(decoder.decode(&mut buffer).unwrap().unwrap() == PayloadItem::Chunk(bytes::Bytes::from_static(b"abc")));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(b"defg");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Chunk(bytes::Bytes::from_static(b"def"))));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
        assert_eq!(&buffer[..], b"g");
    }
}
