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

use log::debug;

use crate::cardinality::delta_spacing;
use crate::cardinality::lc_cardinality;
use crate::cardinality::linear_counting::check_epsilon;
use crate::error::Error;

/// Default relative error budget of the step collapse, 0.3%.
pub const DEFAULT_EPSILON: f64 = 0.003;

/// Largest leaf width a table can be built for, the widest level a
/// [`SketchConfig`](crate::fcm::SketchConfig) accepts.
pub const MAX_N_LEAF: u64 = crate::fcm::MAX_LEVEL_REGISTERS as u64;

/// Match priority given to every range entry. Entries never overlap, so one
/// priority suffices.
pub const DEFAULT_RANGE_PRIORITY: u32 = 1;

/// One step: occupancies in `[low, high)` map to `cardinality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEntry {
    /// First occupancy covered, inclusive.
    pub low: u64,
    /// End of the covered occupancies, exclusive.
    pub high: u64,
    /// Estimated number of distinct flows.
    pub cardinality: u64,
}

impl StepEntry {
    /// Returns true if `occupied` falls in this step.
    pub fn contains(&self, occupied: u64) -> bool {
        self.low <= occupied && occupied < self.high
    }

    /// Number of occupancies covered.
    pub fn width(&self) -> u64 {
        self.high - self.low
    }
}

/// A record for a range-match table: match `occupied` in `[match_low, match_high)`
/// and output `cardinality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeEntry {
    pub priority: u32,
    pub match_low: u64,
    pub match_high: u64,
    pub cardinality: u64,
}

/// Which steps are programmed into a range-match table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeCoverage {
    /// Every step, including the empty-sketch step and the final step.
    #[default]
    All,
    /// Every step except the first and the last, leaving those occupancies to
    /// the table's default action. This matches switch programs that install a
    /// zero-cardinality default and never query a saturated sketch.
    InteriorOnly,
}

/// Monotone step function from occupied leaf registers to estimated cardinality.
///
/// The steps cover `[0, n_leaf)` without gaps or overlaps, the first step is
/// always `[0, 1) -> 0`, and cardinalities never decrease. Each step reports
/// the estimate at its left edge, so within a step the table under-estimates
/// by at most the `epsilon` budget.
#[derive(Debug, Clone, PartialEq)]
pub struct CardinalityStepTable {
    n_leaf: u64,
    epsilon: f64,
    entries: Vec<StepEntry>,
}

impl CardinalityStepTable {
    /// Builds the table for `n_leaf` leaf registers and relative error budget `epsilon`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if `n_leaf` is 0 or above [`MAX_N_LEAF`], or `epsilon` is not a positive
    /// finite number.
    ///
    /// # Examples
    ///
    /// ```
    /// use fcmsketch::cardinality::CardinalityStepTable;
    /// use fcmsketch::cardinality::StepEntry;
    ///
    /// let table = CardinalityStepTable::build(8, 0.01).unwrap();
    /// assert_eq!(table.entries()[0], StepEntry { low: 0, high: 1, cardinality: 0 });
    /// assert_eq!(table.entries().last().unwrap().high, 8);
    /// ```
    pub fn build(n_leaf: u64, epsilon: f64) -> Result<Self, Error> {
        if n_leaf == 0 || n_leaf > MAX_N_LEAF {
            return Err(Error::invalid_argument(format!("n_leaf must be in [1, {MAX_N_LEAF}]"))
                .with_context("n_leaf", n_leaf));
        }
        check_epsilon(epsilon)?;

        let mut entries = vec![StepEntry {
            low: 0,
            high: 1,
            cardinality: 0,
        }];
        let mut occupied = 1;
        while occupied < n_leaf {
            let delta = delta_spacing(occupied, n_leaf, epsilon)?;
            let cardinality = lc_cardinality(occupied, n_leaf)?.floor() as u64;
            let high = occupied.saturating_add(delta).min(n_leaf);
            entries.push(StepEntry {
                low: occupied,
                high,
                cardinality,
            });
            occupied = high;
        }

        debug!(
            "built cardinality step table: n_leaf={n_leaf}, epsilon={epsilon}, entries={}",
            entries.len()
        );
        Ok(CardinalityStepTable {
            n_leaf,
            epsilon,
            entries,
        })
    }

    /// Rebuilds a table from stored parts, checking every table invariant.
    pub(super) fn from_parts(
        n_leaf: u64,
        epsilon: f64,
        entries: Vec<StepEntry>,
    ) -> Result<Self, String> {
        check_epsilon(epsilon).map_err(|err| err.message().to_string())?;
        if n_leaf > MAX_N_LEAF {
            return Err(format!("n_leaf {n_leaf} exceeds {MAX_N_LEAF}"));
        }
        match entries.first() {
            Some(first) if first.low == 0 && first.high == 1 && first.cardinality == 0 => {}
            _ => return Err("first step must be [0, 1) -> 0".to_string()),
        }
        for (i, pair) in entries.windows(2).enumerate() {
            if pair[0].high != pair[1].low {
                return Err(format!("steps {i} and {} are not contiguous", i + 1));
            }
            if pair[1].cardinality < pair[0].cardinality {
                return Err(format!("cardinality decreases at step {}", i + 1));
            }
        }
        if let Some(step) = entries.iter().find(|e| e.low >= e.high) {
            return Err(format!("empty step starting at {}", step.low));
        }
        if entries.last().map(|e| e.high) != Some(n_leaf) {
            return Err(format!("steps do not end at n_leaf {n_leaf}"));
        }
        Ok(CardinalityStepTable {
            n_leaf,
            epsilon,
            entries,
        })
    }

    /// Number of leaf registers the table was built for.
    pub fn n_leaf(&self) -> u64 {
        self.n_leaf
    }

    /// Relative error budget the table was built with.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// All steps ordered by occupancy.
    pub fn entries(&self) -> &[StepEntry] {
        &self.entries
    }

    /// Number of steps; also the number of range-table entries needed for full coverage.
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Returns the step covering `occupied`, if `occupied < n_leaf`.
    pub fn entry_for(&self, occupied: u64) -> Option<&StepEntry> {
        if occupied >= self.n_leaf {
            return None;
        }
        let pos = self.entries.partition_point(|e| e.high <= occupied);
        self.entries.get(pos)
    }

    /// Returns the estimated cardinality for `occupied` leaf registers.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if `occupied >= n_leaf`.
    pub fn lookup(&self, occupied: u64) -> Result<u64, Error> {
        self.entry_for(occupied)
            .map(|e| e.cardinality)
            .ok_or_else(|| {
                Error::invalid_argument("occupied registers out of range")
                    .with_context("occupied", occupied)
                    .with_context("n_leaf", self.n_leaf)
            })
    }

    /// Expands the steps into one cardinality per occupancy in `[0, n_leaf)`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if `n_leaf` values cannot be allocated.
    pub fn to_match_table(&self) -> Result<Vec<u64>, Error> {
        let too_large = || {
            Error::invalid_argument("match table does not fit in memory")
                .with_context("n_leaf", self.n_leaf)
        };
        let len = usize::try_from(self.n_leaf).map_err(|_| too_large())?;
        let mut table = Vec::new();
        table
            .try_reserve_exact(len)
            .map_err(|err| too_large().set_source(err))?;
        for entry in &self.entries {
            table.extend((entry.low..entry.high).map(|_| entry.cardinality));
        }
        Ok(table)
    }

    /// Returns the records to program into a range-match table.
    pub fn range_entries(&self, coverage: RangeCoverage) -> Vec<RangeEntry> {
        let steps: &[StepEntry] = match coverage {
            RangeCoverage::All => &self.entries[..],
            RangeCoverage::InteriorOnly if self.entries.len() > 2 => {
                &self.entries[1..self.entries.len() - 1]
            }
            RangeCoverage::InteriorOnly => &[],
        };
        steps
            .iter()
            .map(|e| RangeEntry {
                priority: DEFAULT_RANGE_PRIORITY,
                match_low: e.low,
                match_high: e.high,
                cardinality: e.cardinality,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_table_has_one_step_per_occupancy() {
        let table = CardinalityStepTable::build(8, 0.01).unwrap();
        let cardinalities: Vec<u64> = table.entries().iter().map(|e| e.cardinality).collect();
        assert_eq!(cardinalities, vec![0, 1, 2, 3, 5, 7, 11, 16]);
        assert!(table.entries().iter().all(|e| e.width() == 1));
    }

    #[test]
    fn test_rejects_leaf_width_beyond_limit() {
        let err = CardinalityStepTable::build(MAX_N_LEAF + 1, 0.01).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_single_register() {
        let table = CardinalityStepTable::build(1, 0.5).unwrap();
        assert_eq!(table.num_entries(), 1);
        assert_eq!(table.lookup(0).unwrap(), 0);
        assert!(table.lookup(1).is_err());
    }

    #[test]
    fn test_from_parts_rejects_broken_tables() {
        let good = CardinalityStepTable::build(16, 0.01).unwrap();
        assert!(
            CardinalityStepTable::from_parts(16, 0.01, good.entries().to_vec()).is_ok()
        );

        let mut gap = good.entries().to_vec();
        gap[3].low += 1;
        assert!(CardinalityStepTable::from_parts(16, 0.01, gap).is_err());

        let mut decreasing = good.entries().to_vec();
        decreasing[5].cardinality = 0;
        assert!(CardinalityStepTable::from_parts(16, 0.01, decreasing).is_err());

        assert!(CardinalityStepTable::from_parts(17, 0.01, good.entries().to_vec()).is_err());
        assert!(CardinalityStepTable::from_parts(16, 0.01, vec![]).is_err());

        for epsilon in [f64::NAN, 0.0, -1.0] {
            let err = CardinalityStepTable::from_parts(16, epsilon, good.entries().to_vec())
                .unwrap_err();
            assert!(err.contains("epsilon"));
        }

        let huge = vec![
            StepEntry { low: 0, high: 1, cardinality: 0 },
            StepEntry { low: 1, high: 1 << 62, cardinality: 1 },
        ];
        let err = CardinalityStepTable::from_parts(1 << 62, 0.01, huge).unwrap_err();
        assert!(err.contains("exceeds"));
    }

    #[test]
    fn test_interior_only_of_tiny_tables_is_empty() {
        let table = CardinalityStepTable::build(2, 0.01).unwrap();
        assert_eq!(table.num_entries(), 2);
        assert!(table.range_entries(RangeCoverage::InteriorOnly).is_empty());
    }
}
