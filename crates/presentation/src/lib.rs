//! Presentations: structured values over byte-stream sessions
//!
//! This crate is the presentation layer sitting on `micro-session`. A
//! [`Presentation`] owns a tuple of typed values, shares a session and uses a
//! [`Codec`] to read values out of the session's read buffer and to write
//! them into its write buffer. [`Presentations`] owns presentations the way a
//! server owns sessions.
//!
//! # HTTP
//!
//! [`http1`] provides the HTTP/1.x codec. Its messages keep cursors over their
//! headers and body chunks, so one response can be written over many calls
//! without anything being sent twice:
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::header::{HeaderValue, TRANSFER_ENCODING};
//! use micro_presentation::http1::HttpPresentations;
//! use micro_session::unix::UnixServer;
//! use micro_session::Session;
//!
//! # async fn run() -> Result<(), micro_presentation::PresentationError> {
//! let server = UnixServer::builder().path("/tmp/http.sock").build();
//! let presentations = HttpPresentations::new();
//!
//! let session = server.accept_one().await?;
//! let presentation = presentations.create(session);
//!
//! presentation.session().read().await?;
//! presentation.read().await?;
//!
//! presentation
//!     .update(|(_, response)| {
//!         response.push_header(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
//!         response.push_chunk(Bytes::from_static(b"partial "));
//!     })
//!     .await;
//! presentation.write().await?;
//!
//! presentation
//!     .update(|(_, response)| {
//!         response.push_chunk(Bytes::from_static(b"answer"));
//!         response.finish();
//!     })
//!     .await;
//! presentation.write().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod presentation;
mod presentations;
mod utils;

pub mod http1;

pub use error::{ParseError, PresentationError, SendError};
pub use presentation::{Codec, Presentation};
pub use presentations::Presentations;

pub(crate) use utils::ensure;
