// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded append-only writer for one outgoing datagram.

use crate::config::LENGTH_PREFIX_SIZE;
use crate::error::{Error, Result};
use crate::pool::PooledBuffer;

/// Generate big-endian write methods for fixed-width types.
///
/// Each generated method fails with `Error::ClosedWriter` once the buffer is
/// released and with `Error::Overflow` (buffer untouched) if the value does
/// not fit in the remaining space.
macro_rules! impl_write_be {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) -> Result<()> {
            self.append(&value.to_be_bytes())
        }
    };
}

/// Writes the payload of one datagram into a pooled buffer.
///
/// Obtained only from [`Endpoint::acquire_writer`](crate::Endpoint::acquire_writer),
/// with the protocol header already in place. The writer is consumed by
/// [`Endpoint::send`](crate::Endpoint::send); dropping it instead returns the
/// buffer to the pool without sending.
#[derive(Debug)]
pub struct Writer {
    buffer: Option<PooledBuffer>,
    /// Declared datagram size (the protocol payload size)
    capacity: usize,
}

impl Writer {
    /// A writer with no buffer (the pool factory).
    pub(crate) fn closed() -> Self {
        Self {
            buffer: None,
            capacity: 0,
        }
    }

    /// Bind a fresh buffer to this writer.
    pub(crate) fn attach(&mut self, buffer: PooledBuffer, capacity: usize) {
        self.buffer = Some(buffer);
        self.capacity = capacity;
    }

    /// Release the buffer (back to its pool) and leave the writer closed.
    pub(crate) fn detach(&mut self) {
        self.buffer = None;
        self.capacity = 0;
    }

    /// Append the protocol header; the descriptor guarantees it fits.
    pub(crate) fn put_header(&mut self, header: &[u8]) {
        if let Some(buffer) = self.buffer.as_mut() {
            debug_assert!(header.len() <= self.capacity);
            buffer.extend_from_slice(header);
        }
    }

    /// Bytes that can still be written before the declared capacity is reached.
    pub fn remaining(&self) -> usize {
        match &self.buffer {
            Some(buffer) => self.capacity.saturating_sub(buffer.len()),
            None => 0,
        }
    }

    /// Bytes written so far, header included.
    pub fn len(&self) -> usize {
        self.buffer.as_ref().map_or(0, |buffer| buffer.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the buffer has been released.
    pub fn is_closed(&self) -> bool {
        self.buffer.is_none()
    }

    /// The datagram bytes written so far (empty once closed).
    pub fn as_bytes(&self) -> &[u8] {
        match &self.buffer {
            Some(buffer) => buffer.as_slice(),
            None => &[],
        }
    }

    /// Give the buffer back without sending. Later writes fail with `ClosedWriter`.
    pub fn discard(&mut self) {
        self.detach();
    }

    impl_write_be!(write_u16, u16);
    impl_write_be!(write_u64, u64);
    impl_write_be!(write_i64, i64);
    impl_write_be!(write_f64, f64);

    /// Write a byte string preceded by its 2-byte big-endian length.
    ///
    /// The prefix and the bytes must fit in the remaining space together.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let buffer = self.buffer.as_mut().ok_or(Error::ClosedWriter)?;
        let remaining = self.capacity.saturating_sub(buffer.len());
        let requested = LENGTH_PREFIX_SIZE + data.len();
        if requested > remaining {
            return Err(Error::Overflow {
                requested,
                remaining,
            });
        }
        // remaining <= MAX_PAYLOAD, so the length always fits in u16
        let length = data.len() as u16;
        buffer.extend_from_slice(&length.to_be_bytes());
        buffer.extend_from_slice(data);
        Ok(())
    }

    fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let buffer = self.buffer.as_mut().ok_or(Error::ClosedWriter)?;
        let remaining = self.capacity.saturating_sub(buffer.len());
        if bytes.len() > remaining {
            return Err(Error::Overflow {
                requested: bytes.len(),
                remaining,
            });
        }
        buffer.extend_from_slice(bytes);
        Ok(())
    }
}
