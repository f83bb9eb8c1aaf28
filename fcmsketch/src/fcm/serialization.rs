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

//! Binary snapshots of a [`RegisterBank`].
//!
//! Layout (little-endian):
//!
//! ```text
//! byte 0      serial version
//! byte 1      family id
//! byte 2      number of levels
//! byte 3      flags (bit 0: empty, no counters follow)
//! bytes 4..8  number of depths (u32)
//! per level   width (u32), counter bits (u8), 3 unused bytes
//! counters    u32 per register, level-major then depth-major
//! ```

use std::io::Cursor;
use std::io::Read;

use byteorder::LE;
use byteorder::ReadBytesExt;
use log::debug;

use crate::error::Error;
use crate::fcm::RegisterBank;
use crate::fcm::SketchConfig;

const SERIAL_VERSION: u8 = 1;
const REGISTER_BANK_FAMILY_ID: u8 = 0xF1;
const FLAGS_IS_EMPTY: u8 = 1 << 0;

impl RegisterBank {
    /// Serializes the bank into its binary snapshot form.
    pub fn serialize(&self) -> Vec<u8> {
        let config = self.config();
        let is_empty = self.is_empty();
        let num_counters: usize = if is_empty {
            0
        } else {
            config.levels().iter().map(|l| l.width()).sum::<usize>() * config.depths()
        };
        let mut bytes = Vec::with_capacity(8 + 8 * config.num_levels() + 4 * num_counters);

        // build() caps levels at u8::MAX and depths * width at u32::MAX, so the casts are lossless.
        bytes.push(SERIAL_VERSION);
        bytes.push(REGISTER_BANK_FAMILY_ID);
        bytes.push(config.num_levels() as u8);
        bytes.push(if is_empty { FLAGS_IS_EMPTY } else { 0 });
        bytes.extend_from_slice(&(config.depths() as u32).to_le_bytes());
        for level in config.levels() {
            bytes.extend_from_slice(&(level.width() as u32).to_le_bytes());
            bytes.push(level.counter_bits());
            bytes.extend_from_slice(&[0u8; 3]);
        }

        if is_empty {
            return bytes;
        }
        for level in 0..config.num_levels() {
            for counter in self.level_counters(level) {
                bytes.extend_from_slice(&counter.to_le_bytes());
            }
        }
        bytes
    }

    /// Deserializes a bank from its binary snapshot form.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`](crate::error::ErrorKind::MalformedDeserializeData)
    /// if the bytes are truncated, carry the wrong family or version, describe an
    /// invalid layout, or hold a counter wider than its level allows.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = Cursor::new(bytes);
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let num_levels = cursor.read_u8().map_err(make_error("num_levels"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let depths = cursor.read_u32::<LE>().map_err(make_error("depths"))?;

        if family_id != REGISTER_BANK_FAMILY_ID {
            return Err(Error::invalid_family(
                REGISTER_BANK_FAMILY_ID,
                family_id,
                "RegisterBank",
            ));
        }
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }

        let mut builder = SketchConfig::builder().depths(depths as usize);
        for _ in 0..num_levels {
            let width = cursor.read_u32::<LE>().map_err(make_error("width"))?;
            let counter_bits = cursor.read_u8().map_err(make_error("counter_bits"))?;
            let mut unused = [0u8; 3];
            cursor
                .read_exact(&mut unused)
                .map_err(make_error("unused24"))?;
            builder = builder.level(width as usize, counter_bits);
        }
        let config = builder.build().map_err(|err| {
            Error::deserial(format!("invalid register layout: {}", err.message()))
        })?;

        if (flags & FLAGS_IS_EMPTY) != 0 {
            return Ok(RegisterBank::new(config));
        }

        let remaining = bytes.len() - cursor.position() as usize;
        let expected = config
            .levels()
            .iter()
            .map(|l| l.width())
            .sum::<usize>()
            .checked_mul(config.depths())
            .and_then(|n| n.checked_mul(4));
        if expected.is_none_or(|expected| remaining < expected) {
            return Err(Error::insufficient_data("counters"));
        }

        let mut bank = RegisterBank::new(config);

        for level in 0..bank.config().num_levels() {
            let max = bank.config().level(level).max_value();
            for counter in bank.level_counters_mut(level).iter_mut() {
                let value = cursor.read_u32::<LE>().map_err(make_error("counters"))?;
                if value as u64 > max {
                    return Err(Error::deserial(format!(
                        "counter value {value} exceeds level {level} maximum {max}"
                    )));
                }
                *counter = value;
            }
        }
        debug!(
            "decoded register bank: {} depths, {} levels, {} occupied leaves",
            bank.config().depths(),
            bank.config().num_levels(),
            bank.occupied_count()
        );
        Ok(bank)
    }
}
