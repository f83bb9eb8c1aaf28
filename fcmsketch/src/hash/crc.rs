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

/// A bitwise CRC-32 with configurable polynomial, initial value, reflection and output xor.
///
/// Switch ASICs expose CRC-32 variants as their hash units, so the presets here
/// are the ones a data plane can be programmed with. `ISO_HDLC` is the zlib
/// `crc32`; `MPEG_2` is the unreflected variant with no output xor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    poly: u32,
    init: u32,
    reflect: bool,
    xorout: u32,
}

impl Crc32 {
    /// CRC-32/ISO-HDLC, the zlib and Ethernet CRC.
    pub const ISO_HDLC: Crc32 = Crc32::new(0x04C1_1DB7, 0xFFFF_FFFF, true, 0xFFFF_FFFF);
    /// CRC-32/MPEG-2.
    pub const MPEG_2: Crc32 = Crc32::new(0x04C1_1DB7, 0xFFFF_FFFF, false, 0);
    /// CRC-32/XFER.
    pub const XFER: Crc32 = Crc32::new(0x0000_00AF, 0, false, 0);
    /// CRC-32/AIXM (CRC-32Q).
    pub const AIXM: Crc32 = Crc32::new(0x8141_41AB, 0, false, 0);
    /// CRC-32/ISCSI (CRC-32C, Castagnoli).
    pub const ISCSI: Crc32 = Crc32::new(0x1EDC_6F41, 0xFFFF_FFFF, true, 0xFFFF_FFFF);

    /// Creates a CRC with the given normal-form polynomial.
    ///
    /// `reflect` applies to both input bytes and the output register.
    pub const fn new(poly: u32, init: u32, reflect: bool, xorout: u32) -> Self {
        Self {
            poly,
            init,
            reflect,
            xorout,
        }
    }

    /// Computes the checksum of `bytes`.
    pub fn checksum(&self, bytes: &[u8]) -> u32 {
        let crc = if self.reflect {
            let poly = self.poly.reverse_bits();
            let mut crc = self.init.reverse_bits();
            for &b in bytes {
                crc ^= b as u32;
                for _ in 0..8 {
                    crc = if crc & 1 != 0 { (crc >> 1) ^ poly } else { crc >> 1 };
                }
            }
            crc
        } else {
            let mut crc = self.init;
            for &b in bytes {
                crc ^= (b as u32) << 24;
                for _ in 0..8 {
                    crc = if crc & 0x8000_0000 != 0 {
                        (crc << 1) ^ self.poly
                    } else {
                        crc << 1
                    };
                }
            }
            crc
        };
        crc ^ self.xorout
    }
}

impl FlowHasher for Crc32 {
    fn hash32(&self, bytes: &[u8]) -> u32 {
        self.checksum(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK_INPUT: &[u8] = b"123456789";

    #[test]
    fn test_catalogue_check_values() {
        assert_eq!(Crc32::ISO_HDLC.checksum(CHECK_INPUT), 0xCBF4_3926);
        assert_eq!(Crc32::MPEG_2.checksum(CHECK_INPUT), 0x0376_E6E7);
        assert_eq!(Crc32::XFER.checksum(CHECK_INPUT), 0xBD0B_E338);
        assert_eq!(Crc32::AIXM.checksum(CHECK_INPUT), 0x3010_BF7F);
        assert_eq!(Crc32::ISCSI.checksum(CHECK_INPUT), 0xE306_9283);
    }

    #[test]
    fn test_ipv4_source_address() {
        // 192.168.1.1 as raw octets, against a 2^19-wide leaf level.
        let bytes = [192, 168, 1, 1];
        assert_eq!(Crc32::ISO_HDLC.checksum(&bytes), 4_001_250_325);
        assert_eq!(Crc32::ISO_HDLC.checksum(&bytes) % 524_288, 408_597);
        assert_eq!(Crc32::MPEG_2.checksum(&bytes), 3_215_923_968);
        assert_eq!(Crc32::MPEG_2.checksum(&bytes) % 524_288, 465_664);
        assert_eq!(Crc32::ISCSI.checksum(&bytes) % 524_288, 161_017);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Crc32::ISO_HDLC.checksum(&[]), 0);
        assert_eq!(Crc32::MPEG_2.checksum(&[]), 0xFFFF_FFFF);
    }
}
