//! Engine configuration.

use crate::error::Result;
use hanover_characteristics::{DerivationConfig, RollingWindow};
use hanover_data::Frequency;
use hanover_portfolios::{FormationConfig, UniverseConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Rolling regression and variance windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Beta window on daily panels
    pub beta_daily: RollingWindow,
    /// Beta window on monthly panels
    pub beta_monthly: RollingWindow,
    /// Return and residual variance window on daily returns
    pub variance: RollingWindow,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            beta_daily: RollingWindow::beta(Frequency::Daily),
            beta_monthly: RollingWindow::beta(Frequency::Monthly),
            variance: RollingWindow::VARIANCE,
        }
    }
}

impl WindowConfig {
    /// Beta window at a panel frequency.
    pub const fn beta(&self, frequency: Frequency) -> RollingWindow {
        if frequency.is_daily_based() {
            self.beta_daily
        } else {
            self.beta_monthly
        }
    }
}

/// Everything the engine needs besides the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reference and sample universes
    pub universe: UniverseConfig,
    /// Formation month and history requirement
    pub formation: FormationConfig,
    /// Fundamentals derivation settings
    pub derivation: DerivationConfig,
    /// Rolling windows
    pub windows: WindowConfig,
}

impl EngineConfig {
    /// Parse a JSON configuration; omitted sections take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Frequency::Daily, 60, 20)]
    #[case(Frequency::Weekly, 60, 20)]
    #[case(Frequency::Monthly, 60, 24)]
    #[case(Frequency::Annual, 60, 24)]
    fn test_beta_window(#[case] frequency: Frequency, #[case] length: usize, #[case] min: usize) {
        let window = WindowConfig::default().beta(frequency);
        assert_eq!(window.length, length);
        assert_eq!(window.min_periods, min);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{"universe": {"reference_exchanges": [1, 2], "sample_exchanges": [1, 2, 3], "share_codes": [10, 11]}}"#,
        )
        .unwrap();
        assert_eq!(config.universe.reference_exchanges, vec![1, 2]);
        assert_eq!(config.formation.formation_month, 6);
        assert_eq!(config.windows.beta(Frequency::Monthly).min_periods, 24);
        assert_eq!(config.windows.beta(Frequency::Weekly).min_periods, 20);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::default();
        let parsed = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_json() {
        assert!(EngineConfig::from_json("{\"formation\": 3}").is_err());
    }
}
