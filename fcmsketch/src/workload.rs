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

//! Synthetic traffic for exercising a sketch against known ground truth.
//!
//! # Usage
//!
//! ```rust
//! use fcmsketch::fcm::OverflowSketch;
//! use fcmsketch::fcm::SketchConfig;
//! use fcmsketch::workload::Workload;
//!
//! let workload = Workload::generate(100, 10, 7);
//! let mut sketch = OverflowSketch::new(SketchConfig::default());
//! workload.replay(&mut sketch);
//! assert_eq!(sketch.total_weight(), workload.num_packets());
//! for (flow, size) in workload.ground_truth() {
//!     assert!(sketch.query(flow) >= size);
//! }
//! ```

use std::collections::HashMap;

use log::debug;

use crate::common::random::RandomSource;
use crate::common::random::XorShift64;
use crate::fcm::OverflowSketch;
use crate::hash::FlowId;

/// Default number of flows in a generated workload.
pub const DEFAULT_NUM_FLOWS: usize = 1000;
/// Default upper bound on a generated flow's size.
pub const DEFAULT_MAX_FLOW_SIZE: u64 = 10;
/// Default generator seed.
pub const DEFAULT_SEED: u64 = 30669;

/// A list of flows with their true sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    flows: Vec<(FlowId, u64)>,
}

impl Workload {
    /// Generates `num_flows` random flow identifiers, each with a size drawn
    /// uniformly from `1..=max_flow_size`.
    ///
    /// Identifiers may repeat; [`Workload::ground_truth`] merges repeats.
    ///
    /// # Panics
    ///
    /// Panics if `max_flow_size` is 0.
    pub fn generate(num_flows: usize, max_flow_size: u64, seed: u64) -> Self {
        assert!(max_flow_size > 0, "max_flow_size must be positive");
        let mut rng = XorShift64::seeded(seed);
        let flows = (0..num_flows)
            .map(|_| {
                let flow = FlowId::new(rng.next_octets());
                let size = rng.next_below(max_flow_size) + 1;
                (flow, size)
            })
            .collect::<Vec<_>>();
        debug!("generated workload of {num_flows} flows with seed {seed}");
        Self { flows }
    }

    /// Builds a workload from explicit flows.
    pub fn from_flows(flows: Vec<(FlowId, u64)>) -> Self {
        Self { flows }
    }

    /// Flows in generation order, repeats included.
    pub fn flows(&self) -> &[(FlowId, u64)] {
        &self.flows
    }

    /// Total packets across all flows.
    pub fn num_packets(&self) -> u64 {
        self.flows.iter().map(|(_, size)| size).sum()
    }

    /// True size of every distinct flow.
    pub fn ground_truth(&self) -> HashMap<FlowId, u64> {
        let mut truth = HashMap::with_capacity(self.flows.len());
        for (flow, size) in &self.flows {
            *truth.entry(*flow).or_insert(0) += size;
        }
        truth
    }

    /// Number of distinct flow identifiers.
    pub fn num_distinct_flows(&self) -> usize {
        self.ground_truth().len()
    }

    /// Feeds every packet of the workload into `sketch`, one observation per packet.
    pub fn replay(&self, sketch: &mut OverflowSketch) {
        for (flow, size) in &self.flows {
            for _ in 0..*size {
                sketch.observe(*flow);
            }
        }
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self::generate(DEFAULT_NUM_FLOWS, DEFAULT_MAX_FLOW_SIZE, DEFAULT_SEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcm::SketchConfig;

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(Workload::generate(50, 10, 1), Workload::generate(50, 10, 1));
        assert_ne!(Workload::generate(50, 10, 1), Workload::generate(50, 10, 2));
    }

    #[test]
    fn test_sizes_within_bounds() {
        let workload = Workload::default();
        assert_eq!(workload.flows().len(), DEFAULT_NUM_FLOWS);
        for (_, size) in workload.flows() {
            assert!((1..=DEFAULT_MAX_FLOW_SIZE).contains(size));
        }
    }

    #[test]
    fn test_ground_truth_merges_repeats() {
        let flow = FlowId::new([1, 2, 3, 4]);
        let workload = Workload::from_flows(vec![(flow, 3), (FlowId::new([5, 6, 7, 8]), 1), (flow, 2)]);
        assert_eq!(workload.num_packets(), 6);
        assert_eq!(workload.num_distinct_flows(), 2);
        assert_eq!(workload.ground_truth()[&flow], 5);
    }

    #[test]
    fn test_replay_counts_every_packet() {
        let workload = Workload::generate(20, 5, 3);
        let mut sketch = OverflowSketch::new(SketchConfig::default());
        workload.replay(&mut sketch);
        assert_eq!(sketch.total_weight(), workload.num_packets());
    }

    #[test]
    #[should_panic(expected = "max_flow_size must be positive")]
    fn test_zero_max_flow_size_panics() {
        Workload::generate(1, 0, 1);
    }
}
