// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HDDS Datagram - pooled UDP framing
//!
//! A low-allocation framing layer over UDP sockets. An [`Endpoint`] exchanges
//! fixed-capacity binary payloads with peers while:
//!
//! - filtering out datagrams that do not carry its protocol's filter hash
//! - optionally stamping outgoing datagrams with a sequence number
//! - reusing a bounded set of buffers instead of allocating per datagram
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hdds_datagram::{Endpoint, Protocol, Result};
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     let protocol = Protocol::new(256)
//!         .with_filter_hash(Protocol::hash_name("telemetry/v1"))
//!         .with_sequencing(true);
//!     let endpoint = Endpoint::new(protocol, 0, 8)?;
//!
//!     let mut writer = endpoint.acquire_writer();
//!     writer.write_bytes(b"hello world")?;
//!     writer.write_f64(2.5e-3)?;
//!     endpoint.send(writer, "127.0.0.1:9000".parse().unwrap(), Duration::ZERO)?;
//!
//!     if let Some(mut received) = endpoint.receive(Duration::from_millis(100))? {
//!         let text = received.reader.read_bytes()?.to_vec();
//!         let value = received.reader.read_f64()?;
//!         received.reader.close()?;
//!         println!("#{} from {}: {:?} {}", received.sequence, received.from, text, value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  Endpoint   acquire_writer / send / receive, sequence counter |
//! +-------------------------------+-------------------------------+
//! |  Writer (append, bounded)     |  Reader (consume, close)      |
//! +-------------------------------+-------------------------------+
//! |  Protocol   filter hash + sequence header framing             |
//! +---------------------------------------------------------------+
//! |  Pool       lock-free recycling of buffers and writers        |
//! +---------------------------------------------------------------+
//! ```
//!
//! There is no retransmission, ordering enforcement, congestion control,
//! stream multiplexing or encryption: sequence numbers are handed to the
//! caller, never interpreted.

/// Size constants and endpoint configuration.
pub mod config;
/// UDP endpoint orchestrating framing, pools and the socket.
pub mod endpoint;
/// Error taxonomy (overflow, closed-use, transport).
pub mod error;
/// Recyclable object pool and scoped buffer guard.
pub mod pool;
/// Protocol descriptor and header framing.
pub mod protocol;
/// Datagram body reader.
pub mod reader;
/// Datagram body writer.
pub mod writer;

pub use config::{EndpointConfig, MAX_PAYLOAD};
pub use endpoint::{Endpoint, EndpointStats, Received};
pub use error::{is_timeout, Error, Result};
pub use pool::{Pool, Pooled, PooledBuffer};
pub use protocol::{HeaderCheck, Protocol};
pub use reader::Reader;
pub use writer::Writer;
