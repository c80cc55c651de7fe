//! Sort specifications, bucket keys and labels.

use crate::breakpoints::BucketScheme;
use crate::error::{PortfolioError, Result};
use hanover_characteristics::{Characteristic, Refresh};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Most dimensions a sort may have.
pub const MAX_DIMENSIONS: usize = 3;

/// Zero-based bucket index per sort dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey(pub Vec<usize>);

/// How breakpoints are refreshed for a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMode {
    /// Once per formation year
    Annual,
    /// Every period
    Periodic,
}

/// Characteristics and bucket counts of a one- to three-dimensional sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    characteristics: Vec<Characteristic>,
    schemes: Vec<BucketScheme>,
}

impl SortSpec {
    /// Validate and build a sort.
    pub fn new(characteristics: &[Characteristic], counts: &[usize]) -> Result<Self> {
        if characteristics.len() != counts.len() {
            return Err(PortfolioError::DimensionMismatch {
                characteristics: characteristics.len(),
                counts: counts.len(),
            });
        }
        if characteristics.is_empty() {
            return Err(PortfolioError::EmptySort);
        }
        if characteristics.len() > MAX_DIMENSIONS {
            return Err(PortfolioError::TooManyDimensions(characteristics.len()));
        }
        for (i, c) in characteristics.iter().enumerate() {
            if characteristics[..i].contains(c) {
                return Err(PortfolioError::DuplicateCharacteristic(c.code()));
            }
        }
        let schemes = counts
            .iter()
            .map(|&k| BucketScheme::new(k))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            characteristics: characteristics.to_vec(),
            schemes,
        })
    }

    /// Sort dimensions in order.
    pub fn characteristics(&self) -> &[Characteristic] {
        &self.characteristics
    }

    /// Bucket schemes in dimension order.
    pub fn schemes(&self) -> &[BucketScheme] {
        &self.schemes
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.characteristics.len()
    }

    /// Periodic when any dimension is re-measured every period.
    pub fn mode(&self) -> SortMode {
        if self
            .characteristics
            .iter()
            .any(|c| c.refresh() == Refresh::Periodic)
        {
            SortMode::Periodic
        } else {
            SortMode::Annual
        }
    }

    /// All bucket keys in row-major order (the last dimension varies fastest).
    pub fn bucket_keys(&self) -> Vec<BucketKey> {
        let mut keys = vec![Vec::new()];
        for scheme in &self.schemes {
            keys = keys
                .into_iter()
                .flat_map(|prefix| {
                    (0..scheme.count()).map(move |i| {
                        let mut key = prefix.clone();
                        key.push(i);
                        key
                    })
                })
                .collect();
        }
        keys.into_iter().map(BucketKey).collect()
    }

    /// Label of a bucket, e.g. `me0-50_bm70-100`.
    pub fn label(&self, key: &BucketKey) -> String {
        self.characteristics
            .iter()
            .zip(&self.schemes)
            .zip(&key.0)
            .map(|((c, scheme), &i)| {
                let (lo, hi) = scheme.edges(i);
                format!("{}{}-{}", c.label(), lo, hi)
            })
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Labels of all buckets in row-major order.
    pub fn labels(&self) -> Vec<String> {
        self.bucket_keys().iter().map(|k| self.label(k)).collect()
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .characteristics
            .iter()
            .zip(&self.schemes)
            .map(|(c, s)| format!("{}({})", c.code(), s.count()))
            .collect();
        f.write_str(&parts.join("x"))
    }
}

/// Bucket of `value` given a lower bound and interior breakpoints.
///
/// Bucket 0 holds `lower <= x <= b[0]`, bucket `i` holds `b[i-1] < x <= b[i]` and the top
/// bucket holds `x > b[last]`. Values below `lower` are unassigned.
pub fn assign_bucket(value: f64, lower: f64, boundaries: &[f64]) -> Option<usize> {
    if !value.is_finite() || value < lower {
        return None;
    }
    Some(boundaries.partition_point(|&b| b < value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_spec_validation() {
        use Characteristic::{Bm, Me, Op};
        assert!(SortSpec::new(&[Me, Bm], &[2, 3]).is_ok());
        assert!(matches!(
            SortSpec::new(&[Me, Bm], &[2]),
            Err(PortfolioError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            SortSpec::new(&[], &[]),
            Err(PortfolioError::EmptySort)
        ));
        assert!(matches!(
            SortSpec::new(&[Me, Bm, Op, Characteristic::Inv], &[2, 2, 2, 2]),
            Err(PortfolioError::TooManyDimensions(4))
        ));
        assert!(matches!(
            SortSpec::new(&[Me, Me], &[2, 2]),
            Err(PortfolioError::DuplicateCharacteristic(_))
        ));
        assert!(matches!(
            SortSpec::new(&[Me], &[7]),
            Err(PortfolioError::UnsupportedBucketCount(7))
        ));
    }

    #[test]
    fn test_labels_row_major() {
        let spec = SortSpec::new(&[Characteristic::Me, Characteristic::Bm], &[2, 3]).unwrap();
        assert_eq!(
            spec.labels(),
            vec![
                "me0-50_bm0-30",
                "me0-50_bm30-70",
                "me0-50_bm70-100",
                "me50-100_bm0-30",
                "me50-100_bm30-70",
                "me50-100_bm70-100",
            ]
        );
        assert_eq!(spec.to_string(), "ME(2)xBM(3)");
        assert_eq!(spec.mode(), SortMode::Annual);
    }

    #[test]
    fn test_fractional_labels_and_periodic_mode() {
        let spec = SortSpec::new(&[Characteristic::Me, Characteristic::MOM], &[8, 2]).unwrap();
        assert_eq!(spec.label(&BucketKey(vec![0, 1])), "me0-12.5_mom50-100");
        assert_eq!(spec.mode(), SortMode::Periodic);
        assert_eq!(spec.bucket_keys().len(), 16);
    }

    #[rstest]
    #[case(0.0, Some(0))]
    #[case(1.9, Some(0))]
    #[case(2.0, Some(1))]
    #[case(2.1, Some(1))]
    #[case(2.5, Some(2))]
    #[case(-0.1, None)]
    #[case(f64::NAN, None)]
    fn test_assign_bucket(#[case] value: f64, #[case] expected: Option<usize>) {
        assert_eq!(assign_bucket(value, 0.0, &[1.9, 2.1]), expected);
    }

    #[test]
    fn test_assign_bucket_real_domain() {
        assert_eq!(assign_bucket(-50.0, f64::NEG_INFINITY, &[0.0]), Some(0));
        assert_eq!(assign_bucket(0.0, f64::NEG_INFINITY, &[0.0]), Some(0));
        assert_eq!(assign_bucket(0.1, f64::NEG_INFINITY, &[0.0]), Some(1));
    }
}
