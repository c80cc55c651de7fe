//! Cross-sectional outlier treatment.

use crate::registry::{Bound, OutlierPolicy};
use polars::prelude::*;

fn bound(column: &str, group: &str, bound: Bound) -> Option<Expr> {
    match bound {
        Bound::Unbounded => None,
        Bound::Percentile(p) => Some(
            col(column)
                .quantile(lit(p / 100.0), QuantileMethod::Linear)
                .over([col(group)]),
        ),
        Bound::Absolute(v) => Some(lit(v)),
    }
}

/// Expression applying `policy` to `column` within each `group` cross-section.
///
/// Percentile bounds are computed over the present values of the cross-section. The result
/// keeps the name `column`.
pub fn treat(policy: OutlierPolicy, column: &str, group: &str) -> Expr {
    let v = col(column);
    let treated = match policy {
        OutlierPolicy::None => v,
        OutlierPolicy::TrimAbove(p) => {
            let cap = col(column)
                .quantile(lit(p / 100.0), QuantileMethod::Linear)
                .over([col(group)]);
            when(v.clone().gt(cap))
                .then(lit(NULL))
                .otherwise(v)
        }
        OutlierPolicy::Clamp { lower, upper } => {
            match (bound(column, group, lower), bound(column, group, upper)) {
                (None, None) => v,
                (Some(lo), None) => when(v.clone().lt(lo.clone())).then(lo).otherwise(v),
                (None, Some(hi)) => when(v.clone().gt(hi.clone())).then(hi).otherwise(v),
                (Some(lo), Some(hi)) => when(v.clone().lt(lo.clone()))
                    .then(lo)
                    .when(v.clone().gt(hi.clone()))
                    .then(hi)
                    .otherwise(v),
            }
        }
    };
    treated.alias(column)
}
