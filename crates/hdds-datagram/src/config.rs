// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Size constants and endpoint configuration.
//!
//! # Environment Variables
//!
//! `HDDS_DATAGRAM_BIND=<ip>` - Local IP to bind (default `0.0.0.0`)
//! `HDDS_DATAGRAM_PORT=<port>` - Local port to bind (default `0`, any available)
//! `HDDS_DATAGRAM_POOL=<n>` - Buffers/writers kept for recycling (default 8)
//! `HDDS_REUSEPORT=1` - Enable SO_REUSEPORT on the endpoint socket (Unix only)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// UDP header overhead in bytes.
pub const UDP_HEADER_SIZE: u16 = 8;

/// Minimum IPv4 header size in bytes.
pub const IPV4_HEADER_SIZE: u16 = 20;

/// Largest payload a regular (non-jumbo) UDP datagram can carry: 65507 bytes.
pub const MAX_PAYLOAD: u16 = u16::MAX - UDP_HEADER_SIZE - IPV4_HEADER_SIZE;

/// Width of each header field (filter hash, sequence number).
pub const HEADER_FIELD_SIZE: usize = 8;

/// Width of the length prefix in front of a byte string.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Default number of buffers and writers kept for recycling.
pub const DEFAULT_POOL_CAPACITY: usize = 8;

/// Socket-level configuration for an [`Endpoint`](crate::Endpoint).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Local IP to bind
    pub bind_ip: IpAddr,
    /// Local port to bind (0 = ephemeral)
    pub port: u16,
    /// Capacity of the buffer pool and of the writer pool
    pub pool_capacity: usize,
    /// Set SO_REUSEADDR before binding
    pub reuse_address: bool,
    /// Set SO_REUSEPORT before binding (ignored on non-Unix targets)
    pub reuse_port: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            reuse_address: false,
            reuse_port: false,
        }
    }
}

impl EndpointConfig {
    /// Configuration binding `port` on all interfaces with `pool_capacity` recyclable objects.
    #[must_use]
    pub fn new(port: u16, pool_capacity: usize) -> Self {
        Self {
            port,
            pool_capacity,
            ..Self::default()
        }
    }

    /// Configuration bound to the IPv4 loopback interface (tests, local IPC).
    #[must_use]
    pub fn loopback(port: u16, pool_capacity: usize) -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..Self::new(port, pool_capacity)
        }
    }

    /// Create from environment variables, falling back to defaults.
    ///
    /// Values that fail to parse are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HDDS_DATAGRAM_BIND") {
            if let Ok(ip) = val.parse::<IpAddr>() {
                config.bind_ip = ip;
            }
        }

        if let Ok(val) = std::env::var("HDDS_DATAGRAM_PORT") {
            if let Ok(port) = val.parse::<u16>() {
                config.port = port;
            }
        }

        if let Ok(val) = std::env::var("HDDS_DATAGRAM_POOL") {
            if let Ok(n) = val.parse::<usize>() {
                config.pool_capacity = n;
            }
        }

        config.reuse_port = std::env::var("HDDS_REUSEPORT")
            .map(|v| v == "1")
            .unwrap_or(false);

        config
    }

    /// Socket address to bind.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }
}
