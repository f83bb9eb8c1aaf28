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

use std::convert::Infallible;

use log::trace;

use crate::error::Error;
use crate::fcm::RegisterBank;
use crate::fcm::RegisterReader;
use crate::fcm::SketchConfig;
use crate::hash::FlowId;
use crate::hash::HashRouter;
use crate::hash::level_index;

/// Software FCM sketch: a register bank driven by a hash router.
///
/// Counts saturate at [`SketchConfig::max_estimate`] per depth. That ceiling is
/// the designed range of the sketch, so it undercounts silently rather than
/// failing.
#[derive(Debug, Clone)]
pub struct OverflowSketch {
    router: HashRouter,
    registers: RegisterBank,
    total_weight: u64,
}

impl OverflowSketch {
    /// Creates an empty sketch addressed by [`HashRouter::with_default_hashers`].
    pub fn new(config: SketchConfig) -> Self {
        let router = HashRouter::with_default_hashers(config.depths());
        OverflowSketch {
            router,
            registers: RegisterBank::new(config),
            total_weight: 0,
        }
    }

    /// Creates an empty sketch addressed by the given router.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// if the router does not have one hasher per depth of `config`.
    pub fn with_router(config: SketchConfig, router: HashRouter) -> Result<Self, Error> {
        router.check_compatible(&config)?;
        Ok(OverflowSketch {
            router,
            registers: RegisterBank::new(config),
            total_weight: 0,
        })
    }

    /// Returns the register layout.
    pub fn config(&self) -> &SketchConfig {
        self.registers.config()
    }

    /// Returns the router addressing this sketch.
    pub fn router(&self) -> &HashRouter {
        &self.router
    }

    /// Returns the registers of this sketch.
    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    /// Consumes the sketch, returning its registers.
    pub fn into_registers(self) -> RegisterBank {
        self.registers
    }

    /// Returns the number of packets observed.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Returns true if nothing has been observed.
    pub fn is_empty(&self) -> bool {
        self.total_weight == 0
    }

    /// Counts one packet of `flow`.
    pub fn observe(&mut self, flow: FlowId) {
        self.observe_with_weight(flow, 1);
    }

    /// Counts `weight` packets of `flow`.
    ///
    /// The result is the same as calling [`observe`](Self::observe) `weight` times.
    pub fn observe_with_weight(&mut self, flow: FlowId, weight: u64) {
        if weight == 0 {
            return;
        }
        self.total_weight = self.total_weight.saturating_add(weight);
        for depth in 0..self.config().depths() {
            let hash = self.router.hash(flow, depth);
            self.carry(depth, hash, weight);
        }
    }

    /// Returns the estimated packet count of `flow`, the minimum over depths.
    pub fn query(&self, flow: FlowId) -> u64 {
        self.query_depths(flow).into_iter().min().unwrap_or(0)
    }

    /// Returns the reconstructed count of `flow` in every depth.
    pub fn query_depths(&self, flow: FlowId) -> Vec<u64> {
        (0..self.config().depths())
            .map(|depth| {
                let hash = self.router.hash(flow, depth);
                let read = |level: usize, index: usize| -> Result<u64, Infallible> {
                    let width = self.config().level(level).width();
                    Ok(self.registers.level_counters(level)[depth * width + index] as u64)
                };
                match reconstruct(self.config(), hash, read) {
                    Ok(value) => value,
                    Err(never) => match never {},
                }
            })
            .collect()
    }

    /// Number of non-zero leaf registers, summed over all depths.
    pub fn occupied_count(&self) -> u64 {
        self.registers.occupied_count()
    }

    /// Resets the sketch for a new measurement session.
    pub fn clear(&mut self) {
        self.registers.clear();
        self.total_weight = 0;
    }

    fn carry(&mut self, depth: usize, hash: u32, weight: u64) {
        let num_levels = self.config().num_levels();
        let mut remaining = weight;
        for level in 0..num_levels {
            let spec = *self.config().level(level);
            let index = level_index(hash, spec.width());
            let counter = self.registers.counter_mut(depth, level, index);
            let value = *counter as u64;

            if level + 1 == num_levels {
                *counter = value.saturating_add(remaining).min(spec.max_value()) as u32;
                return;
            }
            if value == spec.overflow_marker() {
                continue;
            }
            let room = spec.capacity() - value;
            if remaining <= room {
                *counter = (value + remaining) as u32;
                return;
            }
            *counter = spec.overflow_marker() as u32;
            remaining -= room;
            trace!("depth {depth} level {level} index {index} overflowed, carrying {remaining}");
        }
    }
}

/// Reconstructs the count of `flow` in one depth from externally held registers.
///
/// Walks the levels from the leaf: the first counter that does not hold its
/// level's overflow marker (or the last level's counter) is added to the
/// capacity of every level before it.
///
/// # Errors
///
/// Propagates read errors, and returns
/// [`ErrorKind::ExternalRead`](crate::error::ErrorKind::ExternalRead) if a read
/// value does not fit the level's counter width.
///
/// # Panics
///
/// Panics if `depth` is out of range for `router`.
pub fn estimate_depth<R: RegisterReader + ?Sized>(
    reader: &R,
    config: &SketchConfig,
    router: &HashRouter,
    flow: FlowId,
    depth: usize,
) -> Result<u64, Error> {
    let hash = router.hash(flow, depth);
    reconstruct(config, hash, |level, index| {
        let value = reader.read_counter(depth, level, index)?;
        let max = config.level(level).max_value();
        if value > max {
            return Err(Error::external_read("register value exceeds counter width")
                .with_context("depth", depth)
                .with_context("level", level)
                .with_context("index", index)
                .with_context("value", value)
                .with_context("max", max));
        }
        Ok(value)
    })
}

fn reconstruct<E>(
    config: &SketchConfig,
    hash: u32,
    mut read: impl FnMut(usize, usize) -> Result<u64, E>,
) -> Result<u64, E> {
    let levels = config.levels();
    let mut offset = 0u64;
    for (level, spec) in levels.iter().enumerate() {
        let value = read(level, level_index(hash, spec.width()))?;
        if level + 1 == levels.len() || value != spec.overflow_marker() {
            return Ok(offset + value);
        }
        offset += spec.capacity();
    }
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::hash::hasher_fn;

    fn tiny_sketch() -> OverflowSketch {
        let config = SketchConfig::new(1, &[4, 2, 1], &[2, 3, 4]).unwrap();
        let router = HashRouter::new(vec![Arc::new(hasher_fn(|bytes| bytes[3] as u32))]).unwrap();
        OverflowSketch::with_router(config, router).unwrap()
    }

    #[test]
    fn test_carry_fills_each_level_before_overflowing() {
        let mut sketch = tiny_sketch();
        let flow = FlowId::new([0, 0, 0, 1]);
        // capacities: 2, 6; last level max 15
        for n in 1..=8 {
            sketch.observe(flow);
            assert_eq!(sketch.query(flow), n);
        }
        assert_eq!(sketch.registers().get(0, 0, 1), Some(3));
        assert_eq!(sketch.registers().get(0, 1, 1), Some(6));
        assert_eq!(sketch.registers().get(0, 2, 0), Some(0));

        sketch.observe(flow);
        assert_eq!(sketch.registers().get(0, 1, 1), Some(7));
        assert_eq!(sketch.registers().get(0, 2, 0), Some(1));
        assert_eq!(sketch.query(flow), 9);
    }

    #[test]
    fn test_last_level_saturates() {
        let mut sketch = tiny_sketch();
        let flow = FlowId::new([0, 0, 0, 2]);
        sketch.observe_with_weight(flow, 1_000);
        assert_eq!(sketch.query(flow), sketch.config().max_estimate());
        assert_eq!(sketch.config().max_estimate(), 2 + 6 + 15);
        assert_eq!(sketch.total_weight(), 1_000);
    }

    #[test]
    fn test_zero_weight_is_ignored() {
        let mut sketch = tiny_sketch();
        sketch.observe_with_weight(FlowId::new([0, 0, 0, 3]), 0);
        assert!(sketch.is_empty());
        assert!(sketch.registers().is_empty());
    }

    #[test]
    fn test_router_must_match_depths() {
        let config = SketchConfig::default();
        let router = HashRouter::with_default_hashers(3);
        assert!(OverflowSketch::with_router(config, router).is_err());
    }
}
