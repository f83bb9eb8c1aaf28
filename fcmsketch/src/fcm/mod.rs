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

//! FCM: a multi-level overflow count sketch for per-flow packet counts.
//!
//! Each depth is a chain of register arrays of decreasing width and increasing
//! counter width. A flow increments its leaf counter until the counter fills;
//! the counter then holds an overflow marker and the counter of the next level,
//! addressed by the same hash value, takes over. Reading walks the chain and
//! adds the capacity of every overflowed level, so the per-depth value is exact
//! unless the last level saturates. The final estimate is the minimum over
//! depths, since every depth can only over-count.
//!
//! # Usage
//!
//! ```rust
//! use fcmsketch::fcm::OverflowSketch;
//! use fcmsketch::fcm::SketchConfig;
//! use fcmsketch::hash::FlowId;
//!
//! let mut sketch = OverflowSketch::new(SketchConfig::default());
//! let flow: FlowId = "10.0.0.1".parse().unwrap();
//!
//! for _ in 0..300 {
//!     sketch.observe(flow);
//! }
//! assert_eq!(sketch.query(flow), 300);
//! ```
//!
//! # Custom layouts
//!
//! ```rust
//! use fcmsketch::fcm::SketchConfig;
//!
//! let config = SketchConfig::builder()
//!     .depths(3)
//!     .level(4096, 4)
//!     .level(512, 12)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.cumulative_offset(1), 14);
//! ```

mod config;
mod registers;
mod serialization;
mod sketch;

pub use self::config::LevelSpec;
pub use self::config::MAX_COUNTER_BITS;
pub use self::config::MAX_LEVEL_REGISTERS;
pub use self::config::MAX_LEVELS;
pub use self::config::MIN_COUNTER_BITS;
pub use self::config::SketchConfig;
pub use self::config::SketchConfigBuilder;
pub use self::registers::RegisterBank;
pub use self::registers::RegisterReader;
pub use self::sketch::OverflowSketch;
pub use self::sketch::estimate_depth;
