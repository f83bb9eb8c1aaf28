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

use crate::error::Error;
use crate::fcm::SketchConfig;

/// Read access to the registers of an FCM sketch.
///
/// In production the registers live on the switch and an implementation of
/// this trait wraps the device's register RPCs; it must read from a snapshot
/// taken after the data plane has been synchronized, so that all reads of one
/// query observe the same state. [`RegisterBank`] is the in-memory
/// implementation used for simulation.
///
/// Failed or malformed reads must surface as
/// [`ErrorKind::ExternalRead`](crate::error::ErrorKind::ExternalRead). Reporting
/// them as zero would silently corrupt both flow size and cardinality estimates.
pub trait RegisterReader {
    /// Reads the counter at `index` of `level` in `depth`.
    fn read_counter(&self, depth: usize, level: usize, index: usize) -> Result<u64, Error>;

    /// Reads the number of non-zero leaf registers, summed over all depths.
    ///
    /// Callers divide by the number of depths to get a per-depth occupancy.
    fn read_occupied_count(&self) -> Result<u64, Error>;
}

impl<R: RegisterReader + ?Sized> RegisterReader for &R {
    fn read_counter(&self, depth: usize, level: usize, index: usize) -> Result<u64, Error> {
        (**self).read_counter(depth, level, index)
    }

    fn read_occupied_count(&self) -> Result<u64, Error> {
        (**self).read_occupied_count()
    }
}

/// In-memory register storage for every depth and level of a sketch layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBank {
    config: SketchConfig,
    /// One array per level, holding `depths * width` counters laid out depth-major.
    counters: Vec<Vec<u32>>,
}

impl RegisterBank {
    /// Creates a bank with every counter set to zero.
    ///
    /// Allocates `depths * width` counters per level, at most
    /// [`MAX_LEVEL_REGISTERS`](crate::fcm::MAX_LEVEL_REGISTERS) each.
    pub fn new(config: SketchConfig) -> Self {
        let counters = config
            .levels()
            .iter()
            .map(|level| vec![0u32; config.depths() * level.width()])
            .collect();
        RegisterBank { config, counters }
    }

    /// Returns the layout of this bank.
    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    /// Returns the counter at the given position, or `None` if it is out of range.
    pub fn get(&self, depth: usize, level: usize, index: usize) -> Option<u64> {
        self.slot(depth, level, index)
            .map(|slot| self.counters[level][slot] as u64)
    }

    /// Overwrites the counter at the given position.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if the position is out of range or `value` does not fit the level's counter width.
    pub fn set(&mut self, depth: usize, level: usize, index: usize, value: u64) -> Result<(), Error> {
        let slot = self.slot(depth, level, index).ok_or_else(|| {
            Error::invalid_argument("register position out of range")
                .with_context("depth", depth)
                .with_context("level", level)
                .with_context("index", index)
        })?;
        let max = self.config.level(level).max_value();
        if value > max {
            return Err(
                Error::invalid_argument("value does not fit the counter width")
                    .with_context("level", level)
                    .with_context("value", value)
                    .with_context("max", max),
            );
        }
        self.counters[level][slot] = value as u32;
        Ok(())
    }

    /// Number of non-zero leaf registers, summed over all depths.
    pub fn occupied_count(&self) -> u64 {
        self.counters[0].iter().filter(|&&c| c != 0).count() as u64
    }

    /// Number of non-zero leaf registers of one depth.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is out of range.
    pub fn occupied_count_at(&self, depth: usize) -> u64 {
        assert!(depth < self.config.depths(), "depth {depth} out of range");
        let width = self.config.leaf_width();
        self.counters[0][depth * width..(depth + 1) * width]
            .iter()
            .filter(|&&c| c != 0)
            .count() as u64
    }

    /// Returns true if no counter has been incremented.
    pub fn is_empty(&self) -> bool {
        self.counters.iter().all(|level| level.iter().all(|&c| c == 0))
    }

    /// Resets every counter to zero.
    pub fn clear(&mut self) {
        for level in self.counters.iter_mut() {
            level.fill(0);
        }
    }

    pub(super) fn level_counters(&self, level: usize) -> &[u32] {
        &self.counters[level]
    }

    pub(super) fn level_counters_mut(&mut self, level: usize) -> &mut [u32] {
        &mut self.counters[level]
    }

    pub(super) fn counter_mut(&mut self, depth: usize, level: usize, index: usize) -> &mut u32 {
        let width = self.config.level(level).width();
        &mut self.counters[level][depth * width + index]
    }

    fn slot(&self, depth: usize, level: usize, index: usize) -> Option<usize> {
        let spec = self.config.levels().get(level)?;
        if depth >= self.config.depths() || index >= spec.width() {
            return None;
        }
        Some(depth * spec.width() + index)
    }
}

impl RegisterReader for RegisterBank {
    fn read_counter(&self, depth: usize, level: usize, index: usize) -> Result<u64, Error> {
        self.get(depth, level, index).ok_or_else(|| {
            Error::external_read("register position out of range")
                .with_context("depth", depth)
                .with_context("level", level)
                .with_context("index", index)
        })
    }

    fn read_occupied_count(&self) -> Result<u64, Error> {
        Ok(self.occupied_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn small_config() -> SketchConfig {
        SketchConfig::new(2, &[4, 2, 1], &[2, 3, 4]).unwrap()
    }

    #[test]
    fn test_set_and_read() {
        let mut bank = RegisterBank::new(small_config());
        assert!(bank.is_empty());
        bank.set(1, 0, 3, 3).unwrap();
        bank.set(1, 2, 0, 15).unwrap();
        assert_eq!(bank.read_counter(1, 0, 3).unwrap(), 3);
        assert_eq!(bank.read_counter(0, 0, 3).unwrap(), 0);
        assert_eq!(bank.read_counter(1, 2, 0).unwrap(), 15);
        assert_eq!(bank.occupied_count(), 1);
        assert_eq!(bank.occupied_count_at(0), 0);
        assert_eq!(bank.occupied_count_at(1), 1);

        bank.clear();
        assert!(bank.is_empty());
    }

    #[test]
    fn test_out_of_range_is_an_external_read_error() {
        let bank = RegisterBank::new(small_config());
        for (depth, level, index) in [(2, 0, 0), (0, 3, 0), (0, 1, 2)] {
            let err = bank.read_counter(depth, level, index).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ExternalRead);
        }
    }

    #[test]
    fn test_set_rejects_values_wider_than_counter() {
        let mut bank = RegisterBank::new(small_config());
        let err = bank.set(0, 0, 0, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.context("max"), Some("3"));
        assert!(bank.set(0, 9, 0, 0).is_err());
    }
}
