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

use std::sync::Arc;

use crate::error::Error;
use crate::fcm::SketchConfig;
use crate::hash::Crc32;
use crate::hash::FlowHasher;
use crate::hash::FlowId;
use crate::hash::Murmur3Hasher;

/// Seed of the MurmurHash3 hasher for the third depth; later depths add one per depth.
const EXTRA_DEPTH_SEED: u32 = 9001;

/// Maps a flow identifier to one register index per depth and level.
///
/// Each depth owns one hash function, evaluated once per flow. The index at
/// level `k` is that single hash value reduced modulo the level width, so a
/// flow's overflow chain stays addressable without hashing again at deeper
/// levels.
#[derive(Debug, Clone)]
pub struct HashRouter {
    hashers: Vec<Arc<dyn FlowHasher>>,
}

impl HashRouter {
    /// Creates a router with one hasher per depth, in depth order.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// if `hashers` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use fcmsketch::hash::Crc32;
    /// use fcmsketch::hash::HashRouter;
    ///
    /// let router = HashRouter::new(vec![Arc::new(Crc32::ISO_HDLC), Arc::new(Crc32::ISCSI)]).unwrap();
    /// assert_eq!(router.num_depths(), 2);
    /// ```
    pub fn new(hashers: Vec<Arc<dyn FlowHasher>>) -> Result<Self, Error> {
        if hashers.is_empty() {
            return Err(Error::config_invalid(
                "hash router requires at least one hasher",
            ));
        }
        Ok(HashRouter { hashers })
    }

    /// Creates a router using the hash units of the reference switch pipeline.
    ///
    /// Depth 0 uses CRC-32/ISO-HDLC, depth 1 uses CRC-32/MPEG-2, and any further
    /// depth uses MurmurHash3 with its own seed.
    ///
    /// # Panics
    ///
    /// Panics if `depths` is 0.
    pub fn with_default_hashers(depths: usize) -> Self {
        assert!(depths > 0, "depths must be at least 1");
        let hashers = (0..depths)
            .map(|depth| -> Arc<dyn FlowHasher> {
                match depth {
                    0 => Arc::new(Crc32::ISO_HDLC),
                    1 => Arc::new(Crc32::MPEG_2),
                    _ => Arc::new(Murmur3Hasher::with_seed(
                        EXTRA_DEPTH_SEED + (depth as u32 - 2),
                    )),
                }
            })
            .collect();
        HashRouter { hashers }
    }

    /// Returns the number of depths this router addresses.
    pub fn num_depths(&self) -> usize {
        self.hashers.len()
    }

    /// Returns the hash of `flow` for the given depth.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is not less than [`num_depths`](Self::num_depths).
    pub fn hash(&self, flow: FlowId, depth: usize) -> u32 {
        assert!(
            depth < self.hashers.len(),
            "depth {depth} out of range for {} depths",
            self.hashers.len()
        );
        self.hashers[depth].hash32(flow.as_bytes())
    }

    /// Returns the register index of `flow` at `(depth, level)`, in `[0, width)` of that level.
    ///
    /// # Panics
    ///
    /// Panics if `depth` or `level` is out of range for this router or `config`.
    pub fn index(&self, config: &SketchConfig, flow: FlowId, depth: usize, level: usize) -> usize {
        level_index(self.hash(flow, depth), config.level(level).width())
    }

    /// Verifies this router addresses exactly the depths of `config`.
    pub(crate) fn check_compatible(&self, config: &SketchConfig) -> Result<(), Error> {
        if self.num_depths() != config.depths() {
            return Err(Error::config_invalid("hash router and sketch disagree on depths")
                .with_context("router_depths", self.num_depths())
                .with_context("config_depths", config.depths()));
        }
        Ok(())
    }
}

/// Reduces a depth hash to an index of a level with `width` registers.
#[inline]
pub(crate) fn level_index(hash: u32, width: usize) -> usize {
    (hash as u64 % width as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hasher_fn;

    fn fixed_router() -> HashRouter {
        HashRouter::new(vec![
            Arc::new(hasher_fn(|_| 1_000_003)),
            Arc::new(hasher_fn(|bytes| bytes[3] as u32)),
        ])
        .unwrap()
    }

    #[test]
    fn test_levels_subsample_one_hash() {
        let config = SketchConfig::default();
        let router = fixed_router();
        let flow = FlowId::new([10, 0, 0, 7]);

        assert_eq!(router.index(&config, flow, 0, 0), 1_000_003 % 524_288);
        assert_eq!(router.index(&config, flow, 0, 1), 1_000_003 % 65_536);
        assert_eq!(router.index(&config, flow, 0, 2), 1_000_003 % 8_192);
        assert_eq!(router.index(&config, flow, 1, 0), 7);
        assert_eq!(router.index(&config, flow, 1, 2), 7);
    }

    #[test]
    fn test_depths_use_their_own_hasher() {
        let router = fixed_router();
        let a = FlowId::new([1, 2, 3, 4]);
        let b = FlowId::new([9, 9, 9, 4]);
        // Depth 0 collides every flow, depth 1 only those sharing the last octet.
        assert_eq!(router.hash(a, 0), router.hash(b, 0));
        assert_eq!(router.hash(a, 1), router.hash(b, 1));
        assert_ne!(router.hash(a, 1), router.hash(FlowId::new([1, 2, 3, 5]), 1));
    }

    #[test]
    fn test_default_hashers_are_independent() {
        let router = HashRouter::with_default_hashers(4);
        let flow: FlowId = "192.168.1.1".parse().unwrap();
        let config = SketchConfig::default();
        assert_eq!(router.index(&config, flow, 0, 0), 408_597);
        assert_eq!(router.index(&config, flow, 1, 0), 465_664);
        let hashes: Vec<u32> = (0..4).map(|d| router.hash(flow, d)).collect();
        for i in 0..hashes.len() {
            for j in i + 1..hashes.len() {
                assert_ne!(hashes[i], hashes[j]);
            }
        }
    }

    #[test]
    fn test_empty_router_rejected() {
        assert!(HashRouter::new(vec![]).is_err());
    }

    #[test]
    #[should_panic(expected = "depth 2 out of range")]
    fn test_depth_out_of_range_panics() {
        let _ = fixed_router().hash(FlowId::default(), 2);
    }
}
