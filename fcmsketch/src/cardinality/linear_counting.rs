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

use crate::error::Error;

/// Linear-counting cardinality estimate for `occupied` of `n_leaf` registers.
///
/// # Errors
///
/// Returns [`ErrorKind::Domain`](crate::error::ErrorKind::Domain) if
/// `occupied >= n_leaf`, where the estimate diverges.
///
/// # Examples
///
/// ```
/// use fcmsketch::cardinality::lc_cardinality;
///
/// assert_eq!(lc_cardinality(0, 8).unwrap(), 0.0);
/// assert!((lc_cardinality(4, 8).unwrap() - 8.0 * 2f64.ln()).abs() < 1e-12);
/// assert!(lc_cardinality(8, 8).is_err());
/// ```
pub fn lc_cardinality(occupied: u64, n_leaf: u64) -> Result<f64, Error> {
    check_domain(occupied, n_leaf)?;
    let m = n_leaf as f64;
    Ok(m * (m / (m - occupied as f64)).ln())
}

/// Largest number of consecutive occupancies, starting at `occupied`, that may
/// share one estimate while adding at most `epsilon` relative error.
///
/// Computed as `floor(max((n - occupied) * ln(n / (n - occupied)) * epsilon, 1))`,
/// so it is never less than 1.
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
/// if `epsilon` is not a positive finite number, and
/// [`ErrorKind::Domain`](crate::error::ErrorKind::Domain) if `occupied >= n_leaf`.
pub fn delta_spacing(occupied: u64, n_leaf: u64, epsilon: f64) -> Result<u64, Error> {
    check_epsilon(epsilon)?;
    check_domain(occupied, n_leaf)?;
    let m = n_leaf as f64;
    let empty = m - occupied as f64;
    let spacing = empty * (m / empty).ln() * epsilon;
    Ok(spacing.max(1.0).floor() as u64)
}

pub(super) fn check_epsilon(epsilon: f64) -> Result<(), Error> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(
            Error::invalid_argument("epsilon must be a positive finite number")
                .with_context("epsilon", epsilon),
        );
    }
    Ok(())
}

fn check_domain(occupied: u64, n_leaf: u64) -> Result<(), Error> {
    if occupied >= n_leaf {
        return Err(
            Error::domain("linear counting is undefined once every register is occupied")
                .with_context("occupied", occupied)
                .with_context("n_leaf", n_leaf),
        );
    }
    Ok(())
}
