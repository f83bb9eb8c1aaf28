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

//! Accuracy metrics for comparing sketch estimates with ground truth.

use crate::error::Error;

/// Accumulates per-flow size errors.
///
/// # Examples
///
/// ```
/// use fcmsketch::accuracy::FlowSizeAccuracy;
///
/// let mut accuracy = FlowSizeAccuracy::new();
/// accuracy.record(4, 5).unwrap();
/// accuracy.record(10, 10).unwrap();
/// assert_eq!(accuracy.average_absolute_error(), 0.5);
/// assert_eq!(accuracy.average_relative_error(), 0.125);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSizeAccuracy {
    num_flows: u64,
    sum_absolute: f64,
    sum_relative: f64,
}

impl FlowSizeAccuracy {
    /// Creates an accumulator with no flows recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one flow's true size and its estimate.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if `truth` is 0, for which relative error is undefined.
    pub fn record(&mut self, truth: u64, estimate: u64) -> Result<(), Error> {
        if truth == 0 {
            return Err(Error::invalid_argument("true flow size must be positive"));
        }
        let absolute = truth.abs_diff(estimate) as f64;
        self.num_flows += 1;
        self.sum_absolute += absolute;
        self.sum_relative += absolute / truth as f64;
        Ok(())
    }

    /// Number of flows recorded.
    pub fn num_flows(&self) -> u64 {
        self.num_flows
    }

    /// Average absolute error (AAE); 0 if nothing was recorded.
    pub fn average_absolute_error(&self) -> f64 {
        if self.num_flows == 0 {
            return 0.0;
        }
        self.sum_absolute / self.num_flows as f64
    }

    /// Average relative error (ARE); 0 if nothing was recorded.
    pub fn average_relative_error(&self) -> f64 {
        if self.num_flows == 0 {
            return 0.0;
        }
        self.sum_relative / self.num_flows as f64
    }
}

/// Relative error of a cardinality estimate, `|estimate - truth| / truth`.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
/// if `truth` is 0.
pub fn cardinality_relative_error(estimate: u64, truth: u64) -> Result<f64, Error> {
    if truth == 0 {
        return Err(Error::invalid_argument("true cardinality must be positive"));
    }
    Ok(truth.abs_diff(estimate) as f64 / truth as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_accuracy_is_zero() {
        let accuracy = FlowSizeAccuracy::new();
        assert_eq!(accuracy.num_flows(), 0);
        assert_eq!(accuracy.average_absolute_error(), 0.0);
        assert_eq!(accuracy.average_relative_error(), 0.0);
    }

    #[test]
    fn test_zero_truth_rejected() {
        let mut accuracy = FlowSizeAccuracy::new();
        assert!(accuracy.record(0, 3).is_err());
        assert_eq!(accuracy.num_flows(), 0);
        assert!(cardinality_relative_error(10, 0).is_err());
    }

    #[test]
    fn test_cardinality_relative_error() {
        assert_eq!(cardinality_relative_error(990, 1000).unwrap(), 0.01);
        assert_eq!(cardinality_relative_error(1000, 1000).unwrap(), 0.0);
    }
}
