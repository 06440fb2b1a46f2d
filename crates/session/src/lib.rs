//! Byte-stream sessions and the servers that own them
//!
//! This crate is the session layer of the stack: it owns transports and their
//! byte buffers, and nothing else. Turning those bytes into typed values is the
//! job of the presentation layer (`micro-presentation`).
//!
//! # Architecture
//!
//! - [`Session`]: the contract every transport satisfies. It owns a read and
//!   a write [`Buffers`] pair behind the session lock and moves bytes between
//!   them and the transport, either awaited to completion or through a
//!   single-shot [`Completion`] callback.
//! - [`Server`]: owns every session of one transport kind in a [`Registry`],
//!   opens new ones and closes them.
//! - [`Handle`]: the stable identity of a session. Sessions compare equal only
//!   to themselves.
//! - [`unix`]: the local-socket transport, [`unix::UnixServer`] and
//!   [`unix::UnixSession`].
//!
//! # Example
//!
//! ```no_run
//! use micro_session::unix::UnixServer;
//! use micro_session::{Server, Session};
//!
//! # async fn run() -> Result<(), micro_session::SessionError> {
//! let server = UnixServer::builder().path("/tmp/echo.sock").build();
//! server.open().await?;
//!
//! let session = server.accept_one().await?;
//! session.read().await?;
//!
//! {
//!     let mut buffers = session.buffers().lock().await;
//!     let request = buffers.read.split();
//!     buffers.write.extend_from_slice(&request);
//! }
//! session.write().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod handle;
mod registry;
mod session;

pub mod unix;

pub use config::SessionConfig;
pub use config::SessionConfigBuilder;
pub use config::{DEFAULT_MAX_DRAIN_PAGES, DEFAULT_PAGE_SIZE};
pub use error::SessionError;
pub use handle::Handle;
pub use registry::Registered;
pub use registry::Registry;
pub use session::Buffers;
pub use session::Completion;
pub use session::Server;
pub use session::Session;
