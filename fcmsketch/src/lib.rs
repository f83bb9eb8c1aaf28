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

//! # FCM sketch
//!
//! Flow-size and flow-cardinality estimation with a multi-level, tree-shaped
//! counter sketch, designed for registers that live in a programmable switch
//! and are read back by a control plane.
//!
//! * [`fcm`]: sketch geometry, the register bank and in-memory updates.
//! * [`hash`]: flow identifiers and per-depth hash functions.
//! * [`cardinality`]: linear counting and the step table that turns leaf
//!   occupancy into a cardinality estimate with bounded relative error.
//! * [`pipeline`]: per-flow and cardinality queries over any register source.
//! * [`accuracy`] and [`workload`]: evaluation against ground truth.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod accuracy;
pub mod cardinality;
pub mod error;
pub mod fcm;
pub mod hash;
pub mod pipeline;
pub mod workload;

mod common;
