//! Local-socket transport.
//!
//! [`UnixServer`] owns [`UnixSession`]s created by accepting on, or
//! connecting to, a filesystem socket path. Sessions pump bytes with
//! non-blocking `try_read`/`try_write` calls driven by tokio readiness
//! notifications:
//!
//! - reads drain up to `max_drain_pages` pages per notification and stop at
//!   the first would-block, error or end of stream
//! - writes send the write buffer page by page, waiting for writability
//!   whenever the socket pushes back
//!
//! Shutting a server down (or dropping it) closes every session it owns and
//! unlinks the socket file it bound.

mod unix_server;
mod unix_session;

pub use unix_server::UnixServer;
pub use unix_server::UnixServerBuilder;
pub use unix_session::UnixSession;
