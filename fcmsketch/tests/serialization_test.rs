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

use fcmsketch::cardinality::CardinalityStepTable;
use fcmsketch::error::ErrorKind;
use fcmsketch::fcm::OverflowSketch;
use fcmsketch::fcm::RegisterBank;
use fcmsketch::fcm::SketchConfig;
use fcmsketch::hash::FlowId;
use fcmsketch::workload::Workload;
use fcmsketch::fcm::MAX_LEVELS;
use googletest::assert_that;
use googletest::prelude::contains_substring;

fn tiny_bank() -> RegisterBank {
    let config = SketchConfig::new(1, &[4, 2, 1], &[2, 3, 4]).unwrap();
    let mut sketch = OverflowSketch::new(config);
    sketch.observe(FlowId::new([10, 0, 0, 1]));
    sketch.into_registers()
}

#[test]
fn test_register_bank_round_trip() {
    let config = SketchConfig::new(2, &[4_096, 512, 64], &[8, 16, 32]).unwrap();
    let mut sketch = OverflowSketch::new(config);
    Workload::generate(300, 600, 5).replay(&mut sketch);

    let bytes = sketch.registers().serialize();
    let decoded = RegisterBank::deserialize(&bytes).unwrap();
    assert_eq!(&decoded, sketch.registers());
    assert_eq!(decoded.serialize(), bytes);
}

#[test]
fn test_empty_register_bank_is_header_only() {
    let bank = RegisterBank::new(SketchConfig::default());
    let bytes = bank.serialize();
    assert_eq!(bytes.len(), 8 + 8 * 3);

    let decoded = RegisterBank::deserialize(&bytes).unwrap();
    assert!(decoded.is_empty());
    assert_eq!(decoded.config(), &SketchConfig::default());
}

#[test]
fn test_register_bank_rejects_malformed_bytes() {
    let bytes = tiny_bank().serialize();

    let err = RegisterBank::deserialize(&bytes[..bytes.len() - 1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    assert_that!(err.message(), contains_substring("insufficient data"));

    let mut wrong_family = bytes.clone();
    wrong_family[1] = 0xF2;
    let err = RegisterBank::deserialize(&wrong_family).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid family"));

    let mut wrong_version = bytes.clone();
    wrong_version[0] = 9;
    let err = RegisterBank::deserialize(&wrong_version).unwrap_err();
    assert_that!(err.message(), contains_substring("unsupported serial version"));

    let mut wide_counter = bytes.clone();
    wide_counter[32] = 4;
    let err = RegisterBank::deserialize(&wide_counter).unwrap_err();
    assert_that!(err.message(), contains_substring("exceeds level 0 maximum"));

    let mut bad_layout = bytes;
    bad_layout[16] = 8;
    let err = RegisterBank::deserialize(&bad_layout).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid register layout"));
}

#[test]
fn test_register_bank_rejects_oversized_empty_layout() {
    let mut bytes = vec![1, 0xF1, 1, 1];
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend_from_slice(&[8, 0, 0, 0]);

    let err = RegisterBank::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    assert_that!(err.message(), contains_substring("invalid register layout"));
    assert_that!(err.message(), contains_substring("too many registers"));
}

#[test]
fn test_register_bank_round_trips_at_level_limit() {
    let builder = (0..MAX_LEVELS).fold(SketchConfig::builder().depths(1), |b, i| {
        b.level(MAX_LEVELS - i, 2)
    });
    let mut sketch = OverflowSketch::new(builder.build().unwrap());
    sketch.observe_with_weight(FlowId::new([10, 0, 0, 1]), 1_000);

    let bytes = sketch.registers().serialize();
    assert_eq!(bytes[2], u8::MAX);
    let decoded = RegisterBank::deserialize(&bytes).unwrap();
    assert_eq!(decoded.config().num_levels(), MAX_LEVELS);
    assert_eq!(&decoded, sketch.registers());
}

#[test]
fn test_step_table_round_trip() {
    let table = CardinalityStepTable::build(65_536, 0.01).unwrap();
    let bytes = table.serialize();
    assert_eq!(bytes.len(), 24 + 24 * table.num_entries());

    let decoded = CardinalityStepTable::deserialize(&bytes).unwrap();
    assert_eq!(decoded, table);
}

#[test]
fn test_step_table_rejects_unbounded_leaf_width() {
    let mut bytes = vec![1, 0xF2, 0, 0];
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&(1u64 << 62).to_le_bytes());
    bytes.extend_from_slice(&0.01f64.to_le_bytes());
    for (low, high, cardinality) in [(0u64, 1u64, 0u64), (1, 1 << 62, 1)] {
        bytes.extend_from_slice(&low.to_le_bytes());
        bytes.extend_from_slice(&high.to_le_bytes());
        bytes.extend_from_slice(&cardinality.to_le_bytes());
    }

    let err = CardinalityStepTable::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    assert_that!(err.message(), contains_substring("exceeds"));
}

#[test]
fn test_step_table_rejects_malformed_bytes() {
    let bytes = CardinalityStepTable::build(8, 0.01).unwrap().serialize();

    let err = CardinalityStepTable::deserialize(&bytes[..bytes.len() - 8]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    assert_that!(err.message(), contains_substring("insufficient data"));

    let mut wrong_family = bytes.clone();
    wrong_family[1] = 0xF1;
    let err = CardinalityStepTable::deserialize(&wrong_family).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid family"));

    // third step's cardinality (2) replaced by 0
    let mut decreasing = bytes.clone();
    decreasing[24 + 2 * 24 + 16] = 0;
    let err = CardinalityStepTable::deserialize(&decreasing).unwrap_err();
    assert_that!(err.message(), contains_substring("cardinality decreases"));

    let mut nan_epsilon = bytes.clone();
    nan_epsilon[16..24].copy_from_slice(&f64::NAN.to_le_bytes());
    let err = CardinalityStepTable::deserialize(&nan_epsilon).unwrap_err();
    assert_that!(err.message(), contains_substring("epsilon"));

    // first step's high bound moved from 1 to 2
    let mut gap = bytes;
    gap[24 + 8] = 2;
    let err = CardinalityStepTable::deserialize(&gap).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid step table"));
}
