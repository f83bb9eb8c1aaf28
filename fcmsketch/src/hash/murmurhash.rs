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

use crate::hash::FlowHasher;

/// MurmurHash3 x86 32-bit keyed by a seed.
///
/// Different seeds give hash functions suitable for extra depths beyond the
/// two CRC variants a switch pipeline usually provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Murmur3Hasher {
    seed: u32,
}

impl Murmur3Hasher {
    /// Creates a hasher keyed by `seed`.
    pub fn with_seed(seed: u32) -> Self {
        Murmur3Hasher { seed }
    }

    /// Returns the seed this hasher was created with.
    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl FlowHasher for Murmur3Hasher {
    fn hash32(&self, bytes: &[u8]) -> u32 {
        mur3::murmurhash3_x86_32(bytes, self.seed)
    }
}
