// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP endpoint: socket ownership, pooled writers/readers and header framing.
//!
//! Sending a datagram:
//! - [`Endpoint::acquire_writer`] hands out a writer with the header in place
//! - the writer methods append the body
//! - [`Endpoint::send`] transmits it and recycles the writer and its buffer
//!
//! Receiving a datagram:
//! - [`Endpoint::receive`] returns a [`Received`] (reader, sender, sequence),
//!   or `None` when the datagram does not belong to this protocol
//! - the reader methods extract the body
//! - [`Reader::close`] returns the buffer

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::pool::Pool;
use crate::protocol::{HeaderCheck, Protocol};
use crate::reader::Reader;
use crate::writer::Writer;
use parking_lot::Mutex;
use socket2::{Domain, Socket, Type};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A datagram accepted by [`Endpoint::receive`].
#[derive(Debug)]
pub struct Received {
    /// Reader positioned at the start of the body
    pub reader: Reader,
    /// Address of the sending peer
    pub from: SocketAddr,
    /// Sequence number carried by the datagram (0 if the protocol is not sequenced)
    pub sequence: u64,
}

/// Snapshot of endpoint counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    /// Datagrams transmitted successfully
    pub sent: u64,
    /// Datagrams read from the socket (accepted or filtered)
    pub received: u64,
    /// Datagrams dropped for a filter-hash mismatch or a truncated header
    pub filtered: u64,
    /// Buffers fabricated because the pool was empty
    pub buffers_created: u64,
    /// Buffers dropped because the pool was full on return
    pub buffers_discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
    filtered: AtomicU64,
}

/// An endpoint for exchanging framed datagrams over UDP.
///
/// All methods take `&self`; an endpoint can be shared between threads
/// (e.g. behind an `Arc`). Buffers and writers come from lock-free pools and
/// the sequence counter is atomic, so concurrent writers each get a distinct
/// sequence number. Sequence order reflects acquisition order, not
/// transmission order.
pub struct Endpoint {
    protocol: Protocol,
    socket: UdpSocket,
    /// Zero-filled template of `payload_size` bytes
    zero: Box<[u8]>,
    buffers: Arc<Pool<Vec<u8>>>,
    writers: Pool<Writer>,
    /// Last sequence number handed out
    sequence: AtomicU64,
    /// Deadlines currently applied to the socket
    read_timeout: Mutex<Option<Duration>>,
    write_timeout: Mutex<Option<Duration>>,
    counters: Counters,
}

// ===== Construction =====

impl Endpoint {
    /// Bind an endpoint on all interfaces.
    ///
    /// `port` 0 selects any available port; `pool` is the number of buffers
    /// (and writers) kept for recycling.
    ///
    /// # Panics
    /// Panics if the protocol fails [`Protocol::validate`] or `pool` is zero.
    pub fn new(protocol: Protocol, port: u16, pool: usize) -> Result<Self> {
        Self::with_config(protocol, &EndpointConfig::new(port, pool))
    }

    /// Bind an endpoint with full socket configuration.
    ///
    /// # Panics
    /// Panics if the protocol fails [`Protocol::validate`] or the pool
    /// capacity is zero. These are configuration bugs, not runtime errors.
    pub fn with_config(protocol: Protocol, config: &EndpointConfig) -> Result<Self> {
        if let Err(reason) = protocol.validate() {
            panic!("invalid protocol: {}", reason);
        }
        assert!(
            config.pool_capacity > 0,
            "Endpoint pool capacity must be at least 1"
        );

        let socket = bind_socket(config)?;
        let payload = protocol.payload_size as usize;

        let buffers: Arc<Pool<Vec<u8>>> = Arc::new(Pool::new(
            config.pool_capacity,
            move || Vec::with_capacity(payload),
            Vec::clear,
        ));
        let writers = Pool::new(config.pool_capacity, Writer::closed, Writer::detach);

        log::debug!(
            "[datagram] endpoint bound addr={} payload={} hash={:#018x} sequenced={} pool={}",
            socket
                .local_addr()
                .map_or_else(|_| "?".to_string(), |addr| addr.to_string()),
            protocol.payload_size,
            protocol.filter_hash,
            protocol.sequenced,
            config.pool_capacity
        );

        Ok(Self {
            protocol,
            socket,
            zero: vec![0u8; payload].into_boxed_slice(),
            buffers,
            writers,
            sequence: AtomicU64::new(0),
            read_timeout: Mutex::new(None),
            write_timeout: Mutex::new(None),
            counters: Counters::default(),
        })
    }
}

// ===== Send operations =====

impl Endpoint {
    /// Get a writer with the protocol header (filter hash, sequence) written.
    ///
    /// When sequencing is on, each call consumes exactly one sequence number;
    /// the first is 1.
    pub fn acquire_writer(&self) -> Writer {
        let mut writer = self.writers.acquire();
        writer.attach(self.buffers.checkout(), self.protocol.payload_size as usize);

        let sequence = if self.protocol.sequenced {
            self.sequence.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
        } else {
            0
        };
        let (header, len) = self.protocol.encode_header(sequence);
        writer.put_header(&header[..len]);
        writer
    }

    /// Transmit the writer's datagram to `dest`.
    ///
    /// A zero `timeout` blocks without deadline. The writer and its buffer are
    /// recycled whatever the outcome. Returns the number of bytes sent.
    ///
    /// # Errors
    /// `Error::ClosedWriter` for a discarded writer, `Error::Io` on socket
    /// failure (check [`Error::is_timeout`] for an expired deadline).
    pub fn send(&self, writer: Writer, dest: SocketAddr, timeout: Duration) -> Result<usize> {
        let result = self.transmit(&writer, dest, timeout);
        self.writers.release(writer);
        result
    }

    fn transmit(&self, writer: &Writer, dest: SocketAddr, timeout: Duration) -> Result<usize> {
        if writer.is_closed() {
            return Err(Error::ClosedWriter);
        }
        apply_timeout(&self.write_timeout, timeout, |t| {
            self.socket.set_write_timeout(t)
        })?;

        let data = writer.as_bytes();
        let sent = match self.socket.send_to(data, dest) {
            Ok(n) => n,
            Err(err) => {
                log::debug!(
                    "[datagram] send error={} dest={} len={}",
                    err,
                    dest,
                    data.len()
                );
                return Err(Error::Io(err));
            }
        };
        self.counters.sent.fetch_add(1, Ordering::Relaxed);
        log::trace!("[datagram] send -> {} len={}", dest, sent);
        Ok(sent)
    }
}

// ===== Receive operations =====

impl Endpoint {
    /// Receive one datagram.
    ///
    /// Returns `Ok(None)` when the datagram does not match the protocol
    /// (wrong filter hash, or too short for the header); it is dropped
    /// silently and the caller should simply receive again. A zero `timeout`
    /// blocks without deadline.
    ///
    /// Datagrams longer than `payload_size` are truncated by the socket.
    ///
    /// # Errors
    /// `Error::Io` on socket failure; [`Error::is_timeout`] identifies an
    /// expired deadline, which is retryable.
    pub fn receive(&self, timeout: Duration) -> Result<Option<Received>> {
        apply_timeout(&self.read_timeout, timeout, |t| {
            self.socket.set_read_timeout(t)
        })?;

        let mut buffer = self.buffers.checkout();
        buffer.extend_from_slice(&self.zero);
        let (len, from) = self.socket.recv_from(&mut buffer[..])?;
        buffer.truncate(len);
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        match self.protocol.check_header(&buffer) {
            HeaderCheck::Accept { offset, sequence } => Ok(Some(Received {
                reader: Reader::new(buffer, offset),
                from,
                sequence,
            })),
            HeaderCheck::Mismatch { found } => {
                self.counters.filtered.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "[datagram] dropped stranger datagram from={} hash={:#018x} expected={:#018x}",
                    from,
                    found,
                    self.protocol.filter_hash
                );
                Ok(None)
            }
            HeaderCheck::Truncated { len } => {
                self.counters.filtered.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "[datagram] dropped short datagram from={} len={} header={}",
                    from,
                    len,
                    self.protocol.header_size()
                );
                Ok(None)
            }
        }
    }
}

// ===== Accessors =====

impl Endpoint {
    #[must_use]
    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Last sequence number handed to a writer (0 before the first).
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Reseed the counter; the next writer carries `sequence + 1`.
    pub fn set_sequence(&self, sequence: u64) {
        self.sequence.store(sequence, Ordering::Release);
    }

    #[must_use]
    pub fn stats(&self) -> EndpointStats {
        EndpointStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            received: self.counters.received.load(Ordering::Relaxed),
            filtered: self.counters.filtered.load(Ordering::Relaxed),
            buffers_created: self.buffers.created(),
            buffers_discarded: self.buffers.discarded(),
        }
    }

    /// Idle buffers currently held by the pool.
    #[must_use]
    pub fn available_buffers(&self) -> usize {
        self.buffers.available()
    }

    /// Close the socket.
    ///
    /// Outstanding readers and writers stay valid; their buffers return to a
    /// pool that is freed once the last of them is dropped.
    pub fn close(self) {
        log::debug!(
            "[datagram] endpoint closed sent={} received={} filtered={}",
            self.counters.sent.load(Ordering::Relaxed),
            self.counters.received.load(Ordering::Relaxed),
            self.counters.filtered.load(Ordering::Relaxed)
        );
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("protocol", &self.protocol)
            .field("local_addr", &self.socket.local_addr().ok())
            .field("last_sequence", &self.last_sequence())
            .field("buffers", &self.buffers)
            .finish_non_exhaustive()
    }
}

// ===== Helper functions =====

/// Create and bind the endpoint socket.
fn bind_socket(config: &EndpointConfig) -> io::Result<UdpSocket> {
    let bind_addr = config.bind_addr();
    let socket = Socket::new(
        Domain::for_address(bind_addr),
        Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;
    if config.reuse_address {
        socket.set_reuse_address(true)?;
    }
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    if config.reuse_port {
        socket.set_reuse_port(true)?;
        log::info!("[datagram] SO_REUSEPORT enabled (multi-process mode)");
    }
    socket.bind(&bind_addr.into())?;
    Ok(socket.into())
}

/// Apply a socket deadline only when it differs from the cached one.
///
/// A zero duration clears the deadline.
fn apply_timeout<F>(cache: &Mutex<Option<Duration>>, timeout: Duration, set: F) -> io::Result<()>
where
    F: FnOnce(Option<Duration>) -> io::Result<()>,
{
    let wanted = if timeout.is_zero() {
        None
    } else {
        Some(timeout)
    };
    let mut current = cache.lock();
    if *current != wanted {
        set(wanted)?;
        *current = wanted;
    }
    Ok(())
}

// ===== Tests =====
