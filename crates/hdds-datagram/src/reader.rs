// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded reader for one received datagram.

use crate::config::MAX_PAYLOAD;
use crate::error::{Error, Result};
use crate::pool::PooledBuffer;

/// Generate big-endian read methods for fixed-width types.
///
/// Each generated method fails with `Error::ClosedReader` once the buffer is
/// returned and with `Error::Truncated` (position unchanged) on a short read.
macro_rules! impl_read_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.take($size)?);
            Ok(<$type>::from_be_bytes(bytes))
        }
    };
}

/// Reads the body of one received datagram.
///
/// The header has already been consumed by the endpoint. Call [`close`](Self::close)
/// when done to return the buffer; dropping the reader returns it as well.
#[derive(Debug)]
pub struct Reader {
    buffer: Option<PooledBuffer>,
    offset: usize,
}

impl Reader {
    /// Wrap a filled buffer, positioned at `offset` (just past the header).
    pub(crate) fn new(buffer: PooledBuffer, offset: usize) -> Self {
        Self {
            buffer: Some(buffer),
            offset,
        }
    }

    impl_read_be!(read_u16, u16, 2);
    impl_read_be!(read_u64, u64, 8);
    impl_read_be!(read_i64, i64, 8);
    impl_read_be!(read_f64, f64, 8);

    /// Read a byte string written by [`Writer::write_bytes`](crate::Writer::write_bytes).
    ///
    /// A length prefix above [`MAX_PAYLOAD`] is rejected as `LengthOverflow`
    /// before any bytes are consumed past the prefix.
    pub fn read_bytes(&mut self) -> Result<&[u8]> {
        let length = self.read_u16()?;
        if length > MAX_PAYLOAD {
            return Err(Error::LengthOverflow { length });
        }
        self.take(length as usize)
    }

    /// Unread bytes left in the datagram (0 once closed).
    pub fn remaining(&self) -> usize {
        self.buffer
            .as_ref()
            .map_or(0, |buffer| buffer.len().saturating_sub(self.offset))
    }

    pub fn is_closed(&self) -> bool {
        self.buffer.is_none()
    }

    /// Return the buffer to the endpoint's pool.
    ///
    /// # Errors
    /// `Error::ClosedReader` if the reader was already closed.
    pub fn close(&mut self) -> Result<()> {
        match self.buffer.take() {
            Some(buffer) => {
                drop(buffer);
                Ok(())
            }
            None => Err(Error::ClosedReader),
        }
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        let buffer = self.buffer.as_ref().ok_or(Error::ClosedReader)?;
        let available = buffer.len().saturating_sub(self.offset);
        if len > available {
            return Err(Error::Truncated {
                needed: len,
                available,
            });
        }
        let start = self.offset;
        self.offset += len;
        Ok(&buffer[start..start + len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;
    use std::sync::Arc;

    fn reader(bytes: &[u8], offset: usize) -> (Arc<Pool<Vec<u8>>>, Reader) {
        let pool = Arc::new(Pool::new(4, || Vec::with_capacity(64), Vec::clear));
        let mut buffer = pool.checkout();
        buffer.extend_from_slice(bytes);
        (pool, Reader::new(buffer, offset))
    }

    #[test]
    fn test_read_fixed_width_big_endian() {
        let mut bytes = vec![0xAB, 0xCD];
        bytes.extend_from_slice(&0x0102_0304_0506_0708u64.to_be_bytes());
        bytes.extend_from_slice(&(-9i64).to_be_bytes());
        bytes.extend_from_slice(&std::f64::consts::E.to_be_bytes());
        let (_pool, mut r) = reader(&bytes, 0);

        assert_eq!(r.read_u16().expect("u16"), 0xABCD);
        assert_eq!(r.read_u64().expect("u64"), 0x0102_0304_0506_0708);
        assert_eq!(r.read_i64().expect("i64"), -9);
        assert_eq!(r.read_f64().expect("f64"), std::f64::consts::E);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_offset_skips_header() {
        let mut bytes = 77u64.to_be_bytes().to_vec();
        bytes.extend_from_slice(&5u16.to_be_bytes());
        let (_pool, mut r) = reader(&bytes, 8);
        assert_eq!(r.remaining(), 2);
        assert_eq!(r.read_u16().expect("u16"), 5);
    }

    #[test]
    fn test_read_bytes_and_short_read() {
        let bytes = [0u8, 5, b'h', b'e', b'l', b'l', b'o', 0, 9, b'x'];
        let (_pool, mut r) = reader(&bytes, 0);

        assert_eq!(r.read_bytes().expect("first string"), b"hello");
        assert!(matches!(
            r.read_bytes(),
            Err(Error::Truncated {
                needed: 9,
                available: 1
            })
        ));
    }

    #[test]
    fn test_truncated_fixed_read_keeps_position() {
        let (_pool, mut r) = reader(&[1, 2, 3], 0);
        assert!(matches!(
            r.read_u64(),
            Err(Error::Truncated {
                needed: 8,
                available: 3
            })
        ));
        assert_eq!(r.read_u16().expect("u16 still readable"), 0x0102);
    }

    #[test]
    fn test_length_prefix_above_max_payload() {
        let (_pool, mut r) = reader(&[0xFF, 0xFF, 0, 0], 0);
        assert!(matches!(
            r.read_bytes(),
            Err(Error::LengthOverflow { length: 0xFFFF })
        ));
    }

    #[test]
    fn test_close_twice_reports_closed() {
        let (pool, mut r) = reader(&[0, 1], 0);
        r.close().expect("first close succeeds");
        assert_eq!(pool.available(), 1);

        assert!(matches!(r.close(), Err(Error::ClosedReader)));
        assert!(matches!(r.read_u16(), Err(Error::ClosedReader)));
        assert!(r.is_closed());
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_drop_returns_buffer() {
        let (pool, r) = reader(&[1, 2, 3, 4], 0);
        drop(r);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.recycled(), 1);
    }
}
