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

//! Binary form of a [`CardinalityStepTable`], for shipping a precomputed table
//! to the process that programs the switch.
//!
//! Layout (little-endian):
//!
//! ```text
//! byte 0       serial version
//! byte 1       family id
//! bytes 2..4   unused
//! bytes 4..8   number of steps (u32)
//! bytes 8..16  n_leaf (u64)
//! bytes 16..24 epsilon (f64)
//! per step     low (u64), high (u64), cardinality (u64)
//! ```

use std::io::Cursor;

use byteorder::LE;
use byteorder::ReadBytesExt;
use log::debug;

use crate::cardinality::CardinalityStepTable;
use crate::cardinality::StepEntry;
use crate::error::Error;

const SERIAL_VERSION: u8 = 1;
const STEP_TABLE_FAMILY_ID: u8 = 0xF2;
const HEADER_BYTES: usize = 24;
const STEP_BYTES: usize = 24;

impl CardinalityStepTable {
    /// Serializes the table into its binary form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_BYTES + STEP_BYTES * self.num_entries());
        bytes.push(SERIAL_VERSION);
        bytes.push(STEP_TABLE_FAMILY_ID);
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&(self.num_entries() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.n_leaf().to_le_bytes());
        bytes.extend_from_slice(&self.epsilon().to_le_bytes());
        for entry in self.entries() {
            bytes.extend_from_slice(&entry.low.to_le_bytes());
            bytes.extend_from_slice(&entry.high.to_le_bytes());
            bytes.extend_from_slice(&entry.cardinality.to_le_bytes());
        }
        bytes
    }

    /// Deserializes a table, verifying it is a gap-free monotone cover of `[0, n_leaf)`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`](crate::error::ErrorKind::MalformedDeserializeData)
    /// if the bytes are truncated, carry the wrong family or version, or describe
    /// a table that breaks any step-table invariant.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = Cursor::new(bytes);
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        cursor.read_u16::<LE>().map_err(make_error("unused16"))?;
        let num_entries = cursor.read_u32::<LE>().map_err(make_error("num_entries"))?;
        let n_leaf = cursor.read_u64::<LE>().map_err(make_error("n_leaf"))?;
        let epsilon = cursor.read_f64::<LE>().map_err(make_error("epsilon"))?;

        if family_id != STEP_TABLE_FAMILY_ID {
            return Err(Error::invalid_family(
                STEP_TABLE_FAMILY_ID,
                family_id,
                "CardinalityStepTable",
            ));
        }
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        let remaining = bytes.len().saturating_sub(HEADER_BYTES);
        if remaining / STEP_BYTES < num_entries as usize {
            return Err(Error::insufficient_data("steps"));
        }

        let mut entries = Vec::with_capacity(num_entries as usize);
        for _ in 0..num_entries {
            let low = cursor.read_u64::<LE>().map_err(make_error("low"))?;
            let high = cursor.read_u64::<LE>().map_err(make_error("high"))?;
            let cardinality = cursor.read_u64::<LE>().map_err(make_error("cardinality"))?;
            entries.push(StepEntry {
                low,
                high,
                cardinality,
            });
        }

        let table = CardinalityStepTable::from_parts(n_leaf, epsilon, entries)
            .map_err(|msg| Error::deserial(format!("invalid step table: {msg}")))?;
        debug!(
            "decoded cardinality step table: n_leaf={n_leaf}, entries={}",
            table.num_entries()
        );
        Ok(table)
    }
}
