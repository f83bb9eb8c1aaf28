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

//! Cardinality estimation from leaf-register occupancy, compiled into range tables.
//!
//! A switch cannot evaluate the linear-counting formula
//! `n * ln(n / (n - occupied))` at line rate, so the formula is precomputed
//! into a step table and loaded into a range-match (TCAM) table keyed on the
//! number of occupied leaf registers. A step of width `delta` collapses
//! `delta` consecutive occupancies into one output. The width grows with
//! occupancy, chosen so that each collapse adds a relative error of at most
//! `epsilon`, which keeps the entry count far below `n`.
//!
//! # Usage
//!
//! ```rust
//! use fcmsketch::cardinality::CardinalityStepTable;
//! use fcmsketch::cardinality::RangeCoverage;
//!
//! let table = CardinalityStepTable::build(524288, 0.003).unwrap();
//! assert!(table.num_entries() < 524288 / 10);
//!
//! let estimate = table.lookup(1000).unwrap();
//! assert!((997..=1001).contains(&estimate));
//!
//! let ranges = table.range_entries(RangeCoverage::All);
//! assert_eq!(ranges.len(), table.num_entries());
//! ```

mod linear_counting;
mod serialization;
mod step_table;

pub use self::linear_counting::delta_spacing;
pub use self::linear_counting::lc_cardinality;
pub use self::step_table::CardinalityStepTable;
pub use self::step_table::DEFAULT_EPSILON;
pub use self::step_table::DEFAULT_RANGE_PRIORITY;
pub use self::step_table::MAX_N_LEAF;
pub use self::step_table::RangeCoverage;
pub use self::step_table::RangeEntry;
pub use self::step_table::StepEntry;
