// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Flow identifiers and the 32-bit hash functions that address sketch registers.
//!
//! Every depth of an FCM sketch is addressed by its own [`FlowHasher`]. The
//! hashers of different depths must be independent so that the collisions seen
//! by one depth tell nothing about the collisions seen by another; this is what
//! makes the minimum across depths a sound estimate.
//!
//! # Usage
//!
//! ```rust
//! use fcmsketch::hash::Crc32;
//! use fcmsketch::hash::FlowHasher;
//! use fcmsketch::hash::FlowId;
//!
//! let flow: FlowId = "192.168.1.1".parse().unwrap();
//! assert_eq!(Crc32::ISO_HDLC.hash32(flow.as_bytes()) % 524288, 408597);
//! assert_eq!(Crc32::MPEG_2.hash32(flow.as_bytes()) % 524288, 465664);
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::Error;

mod crc;
mod murmurhash;
mod router;

pub use self::crc::Crc32;
pub use self::murmurhash::Murmur3Hasher;
pub use self::router::HashRouter;
pub(crate) use self::router::level_index;

/// Number of octets in a canonical flow identifier.
pub const FLOW_ID_LEN: usize = 4;

/// A keyed 32-bit hash over the canonical bytes of a flow identifier.
pub trait FlowHasher: fmt::Debug + Send + Sync {
    /// Hashes the given bytes to a 32-bit value.
    fn hash32(&self, bytes: &[u8]) -> u32;
}

/// Adapts a plain function or closure into a [`FlowHasher`].
///
/// # Examples
///
/// ```
/// use fcmsketch::hash::FlowHasher;
/// use fcmsketch::hash::hasher_fn;
///
/// let first_octet = hasher_fn(|bytes| bytes[0] as u32);
/// assert_eq!(first_octet.hash32(&[7, 1, 2, 3]), 7);
/// ```
pub fn hasher_fn<F>(f: F) -> FnHasher<F>
where
    F: Fn(&[u8]) -> u32 + Send + Sync,
{
    FnHasher(f)
}

/// A [`FlowHasher`] backed by a function, see [`hasher_fn`].
pub struct FnHasher<F>(F);

impl<F> fmt::Debug for FnHasher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHasher")
    }
}

impl<F> FlowHasher for FnHasher<F>
where
    F: Fn(&[u8]) -> u32 + Send + Sync,
{
    fn hash32(&self, bytes: &[u8]) -> u32 {
        (self.0)(bytes)
    }
}

/// A flow identifier canonicalized to four raw octets (e.g. an IPv4 source address).
///
/// The octets are hashed as-is; textual forms are parsed first, never hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FlowId([u8; FLOW_ID_LEN]);

impl FlowId {
    /// Creates a flow identifier from its octets.
    pub const fn new(octets: [u8; FLOW_ID_LEN]) -> Self {
        Self(octets)
    }

    /// Returns the octets of this identifier.
    pub const fn octets(&self) -> [u8; FLOW_ID_LEN] {
        self.0
    }

    /// Returns the canonical bytes fed to the hash functions.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; FLOW_ID_LEN]> for FlowId {
    fn from(octets: [u8; FLOW_ID_LEN]) -> Self {
        Self(octets)
    }
}

/// Network byte order: `0xC0A80101` is `192.168.1.1`.
impl From<u32> for FlowId {
    fn from(value: u32) -> Self {
        Self(value.to_be_bytes())
    }
}

impl From<FlowId> for u32 {
    fn from(flow: FlowId) -> Self {
        u32::from_be_bytes(flow.0)
    }
}

impl From<Ipv4Addr> for FlowId {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr.octets())
    }
}

impl From<FlowId> for Ipv4Addr {
    fn from(flow: FlowId) -> Self {
        Ipv4Addr::from(flow.0)
    }
}

impl FromStr for FlowId {
    type Err = Error;

    /// Parses a dotted-quad identifier such as `192.168.1.1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Ipv4Addr>().map(FlowId::from).map_err(|err| {
            Error::invalid_argument("flow id must be a dotted-quad of four octets")
                .with_context("input", s)
                .set_source(err)
        })
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_flow_id_conversions() {
        let flow: FlowId = "192.168.1.1".parse().unwrap();
        assert_eq!(flow.octets(), [192, 168, 1, 1]);
        assert_eq!(u32::from(flow), 0xC0A8_0101);
        assert_eq!(FlowId::from(0xC0A8_0101u32), flow);
        assert_eq!(FlowId::from(Ipv4Addr::new(192, 168, 1, 1)), flow);
        assert_eq!(flow.to_string(), "192.168.1.1");
    }

    #[test]
    fn test_flow_id_rejects_non_dotted_quad() {
        for input in ["", "192.168.1", "192.168.1.256", "flow-1"] {
            let err = input.parse::<FlowId>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
            assert_eq!(err.context("input"), Some(input));
        }
    }
}
