//! Picks the body decoder matching how the message delimits its body.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::error::ParseError;
use crate::http1::codec::chunked_decoder::ChunkedDecoder;
use crate::http1::codec::length_decoder::LengthDecoder;
use crate::http1::codec::{PayloadItem, PayloadSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    NoBody,
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        let kind = match payload_size {
            PayloadSize::Length(length) => Kind::Length(LengthDecoder::new(length)),
            PayloadSize::Chunked => Kind::Chunked(ChunkedDecoder::new()),
            PayloadSize::Empty => Kind::NoBody,
        };
        Self { kind }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_ends_immediately() {
        let mut src = BytesMut::from(&b"next request"[..]);
        let mut decoder = PayloadDecoder::from(PayloadSize::Empty);

        assert_eq!(decoder.decode(&mut src).unwrap(), Some(PayloadItem::Eof));
        assert_eq!(&src[..], b"next request");
    }

    #[test]
    fn dispatches_on_payload_size() {
        assert!(matches!(PayloadDecoder::from(PayloadSize::Length(3)).kind, Kind::Length(_)));
        assert!(matches!(PayloadDecoder::from(PayloadSize::Chunked).kind, Kind::Chunked(_)));
        assert!(matches!(PayloadDecoder::from(PayloadSize::Empty).kind, Kind::NoBody));
    }
}
