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

use crate::cardinality::CardinalityStepTable;
use crate::error::Error;

/// Narrowest supported counter, in bits.
pub const MIN_COUNTER_BITS: u8 = 2;
/// Widest supported counter, in bits.
pub const MAX_COUNTER_BITS: u8 = 32;
/// Largest number of levels in one layout.
pub const MAX_LEVELS: usize = u8::MAX as usize;
/// Largest number of registers one level may hold across all depths.
pub const MAX_LEVEL_REGISTERS: usize = u32::MAX as usize;

const DEFAULT_DEPTHS: usize = 2;
const DEFAULT_LEVELS: [(usize, u8); 3] = [(524_288, 8), (65_536, 16), (8_192, 32)];

/// Width and counter size of one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    width: usize,
    counter_bits: u8,
}

impl LevelSpec {
    /// Number of registers in this level.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Bits per counter in this level.
    pub fn counter_bits(&self) -> u8 {
        self.counter_bits
    }

    /// Largest value a counter of this level can encode, `2^bits - 1`.
    pub fn max_value(&self) -> u64 {
        (1u64 << self.counter_bits) - 1
    }

    /// Value held by a non-final counter once it has overflowed into the next level.
    pub fn overflow_marker(&self) -> u64 {
        self.max_value()
    }

    /// Number of increments a non-final counter absorbs before overflowing, `2^bits - 2`.
    pub fn capacity(&self) -> u64 {
        self.max_value() - 1
    }
}

/// Immutable register layout of an FCM sketch.
///
/// Use [`SketchConfig::builder`] for custom layouts. The default is the
/// switch layout: 2 depths of `[524288 x 8-bit, 65536 x 16-bit, 8192 x 32-bit]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SketchConfig {
    depths: usize,
    levels: Vec<LevelSpec>,
}

impl Default for SketchConfig {
    fn default() -> Self {
        SketchConfig {
            depths: DEFAULT_DEPTHS,
            levels: DEFAULT_LEVELS
                .iter()
                .map(|&(width, counter_bits)| LevelSpec {
                    width,
                    counter_bits,
                })
                .collect(),
        }
    }
}

impl SketchConfig {
    /// Returns a builder with no levels and the default number of depths.
    pub fn builder() -> SketchConfigBuilder {
        SketchConfigBuilder::default()
    }

    /// Creates a config from parallel sequences of level widths and counter bits.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// if the sequences differ in length or violate the layout rules of
    /// [`SketchConfigBuilder::build`].
    ///
    /// # Examples
    ///
    /// ```
    /// use fcmsketch::fcm::SketchConfig;
    ///
    /// let config = SketchConfig::new(2, &[4, 2, 1], &[2, 3, 4]).unwrap();
    /// assert_eq!(config.num_levels(), 3);
    /// assert!(SketchConfig::new(2, &[4, 2], &[2]).is_err());
    /// ```
    pub fn new(
        depths: usize,
        level_widths: &[usize],
        level_counter_bits: &[u8],
    ) -> Result<Self, Error> {
        if level_widths.len() != level_counter_bits.len() {
            return Err(
                Error::config_invalid("level widths and counter bits differ in length")
                    .with_context("widths", level_widths.len())
                    .with_context("counter_bits", level_counter_bits.len()),
            );
        }
        level_widths
            .iter()
            .zip(level_counter_bits)
            .fold(SketchConfig::builder().depths(depths), |b, (&w, &bits)| {
                b.level(w, bits)
            })
            .build()
    }

    /// Number of independent depths.
    pub fn depths(&self) -> usize {
        self.depths
    }

    /// Number of levels in each depth.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// All levels, leaf first.
    pub fn levels(&self) -> &[LevelSpec] {
        &self.levels
    }

    /// Returns the given level.
    ///
    /// # Panics
    ///
    /// Panics if `level` is not less than [`num_levels`](Self::num_levels).
    pub fn level(&self, level: usize) -> &LevelSpec {
        assert!(
            level < self.levels.len(),
            "level {level} out of range for {} levels",
            self.levels.len()
        );
        &self.levels[level]
    }

    /// Register count per level, leaf first.
    pub fn level_widths(&self) -> Vec<usize> {
        self.levels.iter().map(LevelSpec::width).collect()
    }

    /// Counter bits per level, leaf first.
    pub fn level_counter_bits(&self) -> Vec<u8> {
        self.levels.iter().map(LevelSpec::counter_bits).collect()
    }

    /// Number of leaf registers per depth; the `n_leaf` of cardinality estimation.
    pub fn leaf_width(&self) -> usize {
        self.levels[0].width
    }

    /// Value added to a counter read at `level`: the summed capacity of all shallower levels.
    ///
    /// # Panics
    ///
    /// Panics if `level` is not less than [`num_levels`](Self::num_levels).
    pub fn cumulative_offset(&self, level: usize) -> u64 {
        assert!(
            level < self.levels.len(),
            "level {level} out of range for {} levels",
            self.levels.len()
        );
        self.levels[..level].iter().map(LevelSpec::capacity).sum()
    }

    /// Largest per-depth value the sketch can represent before the last level saturates.
    pub fn max_estimate(&self) -> u64 {
        let last = self.levels.len() - 1;
        self.cumulative_offset(last) + self.levels[last].max_value()
    }

    /// Builds the cardinality step table for this layout's leaf level.
    ///
    /// # Errors
    ///
    /// See [`CardinalityStepTable::build`].
    pub fn build_step_table(&self, epsilon: f64) -> Result<CardinalityStepTable, Error> {
        CardinalityStepTable::build(self.leaf_width() as u64, epsilon)
    }
}

/// Builder for [`SketchConfig`].
///
/// # Examples
///
/// ```
/// use fcmsketch::fcm::SketchConfig;
///
/// let config = SketchConfig::builder()
///     .depths(2)
///     .level(524288, 8)
///     .level(65536, 16)
///     .level(8192, 32)
///     .build()
///     .unwrap();
/// assert_eq!(config, SketchConfig::default());
/// ```
#[derive(Debug, Clone)]
pub struct SketchConfigBuilder {
    depths: usize,
    levels: Vec<LevelSpec>,
}

impl Default for SketchConfigBuilder {
    fn default() -> Self {
        Self {
            depths: DEFAULT_DEPTHS,
            levels: Vec::new(),
        }
    }
}

impl SketchConfigBuilder {
    /// Sets the number of depths.
    pub fn depths(mut self, depths: usize) -> Self {
        self.depths = depths;
        self
    }

    /// Appends a level below the ones added so far.
    pub fn level(mut self, width: usize, counter_bits: u8) -> Self {
        self.levels.push(LevelSpec {
            width,
            counter_bits,
        });
        self
    }

    /// Validates and builds the config.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) unless
    /// there is at least one depth and one level, every width is positive and
    /// strictly smaller than the previous level's, and every counter width lies
    /// in `[MIN_COUNTER_BITS, MAX_COUNTER_BITS]` and is no smaller than the
    /// previous level's. There may be at most [`MAX_LEVELS`] levels, and no
    /// level may hold more than [`MAX_LEVEL_REGISTERS`] registers across all
    /// depths.
    pub fn build(self) -> Result<SketchConfig, Error> {
        if self.depths == 0 {
            return Err(Error::config_invalid("depths must be at least 1"));
        }
        if self.levels.is_empty() {
            return Err(Error::config_invalid("at least one level is required"));
        }
        if self.levels.len() > MAX_LEVELS {
            return Err(Error::config_invalid(format!("at most {MAX_LEVELS} levels are supported"))
                .with_context("levels", self.levels.len()));
        }
        for (i, level) in self.levels.iter().enumerate() {
            if level.width == 0 {
                return Err(
                    Error::config_invalid("level width must be positive").with_context("level", i)
                );
            }
            let registers = level.width.checked_mul(self.depths);
            if registers.is_none_or(|n| n > MAX_LEVEL_REGISTERS) {
                return Err(Error::config_invalid("level holds too many registers")
                    .with_context("level", i)
                    .with_context("width", level.width)
                    .with_context("depths", self.depths));
            }
            if !(MIN_COUNTER_BITS..=MAX_COUNTER_BITS).contains(&level.counter_bits) {
                return Err(Error::config_invalid(format!(
                    "counter bits must be in [{MIN_COUNTER_BITS}, {MAX_COUNTER_BITS}]"
                ))
                .with_context("level", i)
                .with_context("counter_bits", level.counter_bits));
            }
        }
        for (i, pair) in self.levels.windows(2).enumerate() {
            if pair[1].width >= pair[0].width {
                return Err(
                    Error::config_invalid("level widths must strictly decrease")
                        .with_context("level", i + 1)
                        .with_context("width", pair[1].width),
                );
            }
            if pair[1].counter_bits < pair[0].counter_bits {
                return Err(
                    Error::config_invalid("counter bits must not decrease")
                        .with_context("level", i + 1)
                        .with_context("counter_bits", pair[1].counter_bits),
                );
            }
        }
        Ok(SketchConfig {
            depths: self.depths,
            levels: self.levels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_layout_offsets() {
        let config = SketchConfig::default();
        assert_eq!(config.depths(), 2);
        assert_eq!(config.level_widths(), vec![524_288, 65_536, 8_192]);
        assert_eq!(config.level_counter_bits(), vec![8, 16, 32]);
        assert_eq!(config.level(0).capacity(), 254);
        assert_eq!(config.level(0).overflow_marker(), 255);
        assert_eq!(config.cumulative_offset(0), 0);
        assert_eq!(config.cumulative_offset(1), 254);
        assert_eq!(config.cumulative_offset(2), 65_788);
        assert_eq!(config.max_estimate(), 65_788 + u32::MAX as u64);
    }

    #[test]
    fn test_rejects_invalid_layouts() {
        let cases = [
            SketchConfig::builder().depths(0).level(8, 8),
            SketchConfig::builder(),
            SketchConfig::builder().level(0, 8),
            SketchConfig::builder().level(8, 1),
            SketchConfig::builder().level(8, 33),
            SketchConfig::builder().level(8, 8).level(8, 16),
            SketchConfig::builder().level(8, 16).level(4, 8),
        ];
        for builder in cases {
            let err = builder.build().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        }
    }

    #[test]
    fn test_rejects_layouts_too_large_to_snapshot() {
        let too_many_levels = (0..=MAX_LEVELS)
            .fold(SketchConfig::builder().depths(1), |b, i| b.level(MAX_LEVELS + 1 - i, 2));
        let err = too_many_levels.build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert_eq!(err.context("levels"), Some("256"));

        let err = SketchConfig::new(2, &[MAX_LEVEL_REGISTERS / 2 + 1], &[8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(SketchConfig::new(1, &[usize::MAX], &[8]).is_err());
        assert!(SketchConfig::new(usize::MAX, &[2], &[8]).is_err());

        let widest = SketchConfig::new(1, &[MAX_LEVEL_REGISTERS], &[8]).unwrap();
        assert_eq!(widest.leaf_width(), MAX_LEVEL_REGISTERS);
    }

    #[test]
    fn test_equal_counter_bits_are_valid() {
        let config = SketchConfig::new(1, &[4, 2, 1], &[2, 2, 2]).unwrap();
        assert_eq!(config.cumulative_offset(2), 4);
        assert_eq!(config.max_estimate(), 7);
    }

    #[test]
    fn test_single_level_is_valid() {
        let config = SketchConfig::builder().level(16, 32).build().unwrap();
        assert_eq!(config.leaf_width(), 16);
        assert_eq!(config.max_estimate(), u32::MAX as u64);
    }
}
