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

//! Per-query estimation over registers read from a switch or a simulation.
//!
//! A [`QueryPipeline`] ties together the immutable pieces built at
//! configuration time (the [`SketchConfig`], the [`HashRouter`] and the
//! [`CardinalityStepTable`]) with a [`RegisterReader`]. Every query is a pure
//! computation over the reader's snapshot, so one pipeline can serve any
//! number of callers concurrently when the reader is `Sync`.
//!
//! # Usage
//!
//! ```rust
//! use fcmsketch::cardinality::DEFAULT_EPSILON;
//! use fcmsketch::fcm::OverflowSketch;
//! use fcmsketch::fcm::SketchConfig;
//! use fcmsketch::hash::FlowId;
//! use fcmsketch::pipeline::QueryPipeline;
//!
//! let config = SketchConfig::default();
//! let table = config.build_step_table(DEFAULT_EPSILON).unwrap();
//! let mut sketch = OverflowSketch::new(config.clone());
//! let flow = FlowId::new([10, 1, 2, 3]);
//! sketch.observe_with_weight(flow, 42);
//!
//! let pipeline = QueryPipeline::new(&config, sketch.router(), &table, sketch.registers()).unwrap();
//! assert_eq!(pipeline.estimate_flow_size(flow).unwrap(), 42);
//! assert_eq!(pipeline.estimate_cardinality_from_registers().unwrap(), 1);
//! ```

use log::debug;

use crate::cardinality::CardinalityStepTable;
use crate::error::Error;
use crate::fcm::RegisterReader;
use crate::fcm::SketchConfig;
use crate::fcm::estimate_depth;
use crate::hash::FlowId;
use crate::hash::HashRouter;

/// Reconstructed counts of one flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowQueryResult {
    pub flow_id: FlowId,
    /// Count reconstructed in each depth, in depth order.
    pub depth_estimates: Vec<u64>,
    /// Minimum of `depth_estimates`.
    pub final_estimate: u64,
}

/// How [`RegisterReader::read_occupied_count`] relates to the per-depth occupancy
/// the step table is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OccupancyConvention {
    /// The reported count sums all depths; divide by the depth count, rounding down.
    #[default]
    AveragedOverDepths,
    /// The reported count is already a per-depth occupancy.
    Raw,
}

/// Flow size and cardinality queries over one register snapshot.
#[derive(Debug)]
pub struct QueryPipeline<'a, R> {
    config: &'a SketchConfig,
    router: &'a HashRouter,
    table: &'a CardinalityStepTable,
    reader: R,
    convention: OccupancyConvention,
}

impl<'a, R: RegisterReader> QueryPipeline<'a, R> {
    /// Creates a pipeline reading registers through `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// if the router does not have one hasher per depth, or the table was not
    /// built for the config's leaf width.
    pub fn new(
        config: &'a SketchConfig,
        router: &'a HashRouter,
        table: &'a CardinalityStepTable,
        reader: R,
    ) -> Result<Self, Error> {
        router.check_compatible(config)?;
        if table.n_leaf() != config.leaf_width() as u64 {
            return Err(
                Error::config_invalid("step table was built for a different leaf width")
                    .with_context("table_n_leaf", table.n_leaf())
                    .with_context("leaf_width", config.leaf_width()),
            );
        }
        debug!(
            "query pipeline ready: {} depths, {} levels, {} cardinality steps",
            config.depths(),
            config.num_levels(),
            table.num_entries()
        );
        Ok(QueryPipeline {
            config,
            router,
            table,
            reader,
            convention: OccupancyConvention::default(),
        })
    }

    /// Sets how the reader's occupied count is interpreted.
    pub fn with_occupancy_convention(mut self, convention: OccupancyConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Returns the register reader.
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Reconstructs `flow` in every depth and combines them.
    ///
    /// # Errors
    ///
    /// Propagates any register read error.
    pub fn query_flow(&self, flow: FlowId) -> Result<FlowQueryResult, Error> {
        let depth_estimates = (0..self.config.depths())
            .map(|depth| estimate_depth(&self.reader, self.config, self.router, flow, depth))
            .collect::<Result<Vec<_>, _>>()?;
        let final_estimate = depth_estimates.iter().copied().min().unwrap_or(0);
        Ok(FlowQueryResult {
            flow_id: flow,
            depth_estimates,
            final_estimate,
        })
    }

    /// Returns the estimated packet count of `flow`, the minimum over depths.
    ///
    /// # Errors
    ///
    /// Propagates any register read error.
    pub fn estimate_flow_size(&self, flow: FlowId) -> Result<u64, Error> {
        self.query_flow(flow).map(|result| result.final_estimate)
    }

    /// Looks up the cardinality for a per-depth count of occupied leaf registers.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if `occupied` is not less than the leaf width.
    pub fn estimate_cardinality(&self, occupied: u64) -> Result<u64, Error> {
        self.table.lookup(occupied)
    }

    /// Reads the occupied count from the registers and applies the occupancy convention.
    ///
    /// # Errors
    ///
    /// Propagates any register read error.
    pub fn observed_occupancy(&self) -> Result<u64, Error> {
        let raw = self.reader.read_occupied_count()?;
        Ok(match self.convention {
            OccupancyConvention::AveragedOverDepths => raw / self.config.depths() as u64,
            OccupancyConvention::Raw => raw,
        })
    }

    /// Estimates the number of distinct flows from the registers' occupancy.
    ///
    /// # Errors
    ///
    /// Propagates any register read error, and returns
    /// [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument) if
    /// the observed occupancy reaches the leaf width.
    pub fn estimate_cardinality_from_registers(&self) -> Result<u64, Error> {
        let occupied = self.observed_occupancy()?;
        self.estimate_cardinality(occupied)
    }
}
