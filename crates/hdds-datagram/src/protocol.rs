// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protocol descriptor and datagram header framing.
//!
//! # Wire Format (big-endian)
//!
//! ```text
//! +---------------------------+  present iff filter_hash != 0
//! | filter hash (8 bytes)     |
//! +---------------------------+  present iff sequenced
//! | sequence number (8 bytes) |
//! +---------------------------+
//! | payload body ...          |
//! +---------------------------+
//! ```
//!
//! Both peers must use identical descriptors, otherwise framing desynchronizes.

use crate::config::{HEADER_FIELD_SIZE, MAX_PAYLOAD};

/// Largest header the framing can produce (hash + sequence).
pub const MAX_HEADER_SIZE: usize = 2 * HEADER_FIELD_SIZE;

/// Describes how datagrams are framed for one application protocol.
///
/// A non-zero `filter_hash` is written first into every sent datagram and
/// checked first on every received one, so "stranger" datagrams are dropped.
/// `payload_size` is the full datagram size including the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protocol {
    pub filter_hash: u64,
    pub sequenced: bool,
    pub payload_size: u16,
}

/// Result of checking a received datagram against the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderCheck {
    /// Header matched; body starts at `offset`.
    Accept { offset: usize, sequence: u64 },
    /// Leading bytes carry a different filter hash.
    Mismatch { found: u64 },
    /// Datagram is shorter than the configured header.
    Truncated { len: usize },
}

impl Protocol {
    /// Descriptor with no filter hash and no sequencing.
    #[must_use]
    pub const fn new(payload_size: u16) -> Self {
        Self {
            filter_hash: 0,
            sequenced: false,
            payload_size,
        }
    }

    #[must_use]
    pub const fn with_filter_hash(mut self, filter_hash: u64) -> Self {
        self.filter_hash = filter_hash;
        self
    }

    #[must_use]
    pub const fn with_sequencing(mut self, sequenced: bool) -> Self {
        self.sequenced = sequenced;
        self
    }

    /// Derive a stable, non-zero filter hash from a protocol name.
    ///
    /// Uses the first 8 bytes of the MD5 digest (big-endian), so every process
    /// computes the same value for e.g. `"my-protocol/v1"`.
    #[must_use]
    pub fn hash_name(name: &str) -> u64 {
        use md5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        match u64::from_be_bytes(bytes) {
            0 => 1,
            hash => hash,
        }
    }

    /// Bytes consumed by the header on every datagram.
    #[must_use]
    pub const fn header_size(&self) -> usize {
        let mut size = 0;
        if self.filter_hash != 0 {
            size += HEADER_FIELD_SIZE;
        }
        if self.sequenced {
            size += HEADER_FIELD_SIZE;
        }
        size
    }

    /// Bytes left for the body once the header is written.
    #[must_use]
    pub const fn body_capacity(&self) -> usize {
        (self.payload_size as usize).saturating_sub(self.header_size())
    }

    /// Check the descriptor invariants.
    ///
    /// # Errors
    /// Returns a static reason if the payload size is zero, exceeds
    /// [`MAX_PAYLOAD`], or leaves no room for the configured header.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.payload_size == 0 {
            return Err("payload size must be non-zero");
        }
        if self.payload_size > MAX_PAYLOAD {
            return Err("payload size exceeds MAX_PAYLOAD (65507)");
        }
        if self.filter_hash != 0 && (self.payload_size as usize) < HEADER_FIELD_SIZE {
            return Err("payload size too small for filter hash (need 8 bytes)");
        }
        if (self.payload_size as usize) < self.header_size() {
            return Err("payload size too small for filter hash and sequence number");
        }
        Ok(())
    }

    /// Encode the header for an outgoing datagram.
    ///
    /// `sequence` is ignored unless the descriptor is sequenced. Returns the
    /// scratch array and the number of bytes used.
    #[must_use]
    pub fn encode_header(&self, sequence: u64) -> ([u8; MAX_HEADER_SIZE], usize) {
        let mut header = [0u8; MAX_HEADER_SIZE];
        let mut len = 0;
        if self.filter_hash != 0 {
            header[..HEADER_FIELD_SIZE].copy_from_slice(&self.filter_hash.to_be_bytes());
            len += HEADER_FIELD_SIZE;
        }
        if self.sequenced {
            header[len..len + HEADER_FIELD_SIZE].copy_from_slice(&sequence.to_be_bytes());
            len += HEADER_FIELD_SIZE;
        }
        (header, len)
    }

    /// Validate and strip the header of a received datagram.
    ///
    /// The sequence number is returned verbatim (0 when not sequenced); no
    /// gap or ordering checks are made.
    #[must_use]
    pub fn check_header(&self, datagram: &[u8]) -> HeaderCheck {
        if datagram.len() < self.header_size() {
            return HeaderCheck::Truncated {
                len: datagram.len(),
            };
        }
        let mut offset = 0;
        if self.filter_hash != 0 {
            let found = read_field(datagram, offset);
            if found != self.filter_hash {
                return HeaderCheck::Mismatch { found };
            }
            offset += HEADER_FIELD_SIZE;
        }
        let mut sequence = 0;
        if self.sequenced {
            sequence = read_field(datagram, offset);
            offset += HEADER_FIELD_SIZE;
        }
        HeaderCheck::Accept { offset, sequence }
    }
}

/// Read one big-endian header field; caller guarantees bounds.
fn read_field(datagram: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; HEADER_FIELD_SIZE];
    bytes.copy_from_slice(&datagram[offset..offset + HEADER_FIELD_SIZE]);
    u64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_payload_bounds() {
        assert!(Protocol::new(0).validate().is_err());
        assert!(Protocol::new(1).validate().is_ok());
        assert!(Protocol::new(MAX_PAYLOAD).validate().is_ok());
        assert!(Protocol::new(MAX_PAYLOAD + 1).validate().is_err());
    }

    #[test]
    fn test_validate_room_for_header() {
        let hashed = Protocol::new(7).with_filter_hash(42);
        assert_eq!(
            hashed.validate(),
            Err("payload size too small for filter hash (need 8 bytes)")
        );
        assert!(Protocol::new(8).with_filter_hash(42).validate().is_ok());

        let both = Protocol::new(15).with_filter_hash(42).with_sequencing(true);
        assert!(both.validate().is_err());
        assert!(Protocol::new(16)
            .with_filter_hash(42)
            .with_sequencing(true)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_header_size() {
        assert_eq!(Protocol::new(256).header_size(), 0);
        assert_eq!(Protocol::new(256).with_filter_hash(1).header_size(), 8);
        assert_eq!(Protocol::new(256).with_sequencing(true).header_size(), 8);
        let both = Protocol::new(256).with_filter_hash(1).with_sequencing(true);
        assert_eq!(both.header_size(), 16);
        assert_eq!(both.body_capacity(), 240);
    }

    #[test]
    fn test_encode_header_layout() {
        let protocol = Protocol::new(64)
            .with_filter_hash(0x0102_0304_0506_0708)
            .with_sequencing(true);
        let (header, len) = protocol.encode_header(0x1122_3344_5566_7788);
        assert_eq!(len, 16);
        assert_eq!(
            &header[..len],
            &[
                0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x11, 0x22, 0x33, 0x44, 0x55,
                0x66, 0x77, 0x88
            ]
        );
    }

    #[test]
    fn test_check_header_accept_mismatch_truncated() {
        let protocol = Protocol::new(64).with_filter_hash(7).with_sequencing(true);
        let (header, len) = protocol.encode_header(99);

        let mut datagram = header[..len].to_vec();
        datagram.extend_from_slice(b"body");
        assert_eq!(
            protocol.check_header(&datagram),
            HeaderCheck::Accept {
                offset: 16,
                sequence: 99
            }
        );

        let stranger = Protocol::new(64).with_filter_hash(8).with_sequencing(true);
        let (other, other_len) = stranger.encode_header(1);
        assert_eq!(
            protocol.check_header(&other[..other_len]),
            HeaderCheck::Mismatch { found: 8 }
        );

        assert_eq!(
            protocol.check_header(&datagram[..10]),
            HeaderCheck::Truncated { len: 10 }
        );
    }

    #[test]
    fn test_unframed_protocol_accepts_anything() {
        let protocol = Protocol::new(32);
        assert_eq!(
            protocol.check_header(&[]),
            HeaderCheck::Accept {
                offset: 0,
                sequence: 0
            }
        );
    }

    #[test]
    fn test_hash_name_is_stable_and_non_zero() {
        let a = Protocol::hash_name("my-protocol/v1");
        let b = Protocol::hash_name("my-protocol/v1");
        let c = Protocol::hash_name("my-protocol/v2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, 0);
    }
}
