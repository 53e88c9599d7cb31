//! FILENAME: core/engine/src/config.rs
//! PURPOSE: Dashboard-wide settings: display zone, theme date formats,
//! custom granularities and heat grid options.
//! CONTEXT: Everything here used to be read from ambient globals by the
//! components. It is now loaded once from JSON, validated, and passed in.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::date_pattern::parse_date_pattern;
use crate::error::{EngineError, EngineResult};
use crate::granularity::{granularity_options, Granularity, GranularityOption};
use crate::log_info;
use crate::timezone::ZoneOffset;

/// Date pattern per granularity, as chosen by the theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormats {
    pub year: String,
    pub quarter: String,
    pub month: String,
    pub day: String,
    pub week: String,
    pub hour: String,
    pub minute: String,
    pub second: String,
}

impl Default for DateFormats {
    fn default() -> Self {
        DateFormats {
            year: "yyyy".to_string(),
            quarter: "MMM yy".to_string(),
            month: "MMM yy".to_string(),
            day: "d MMM".to_string(),
            week: "d MMM".to_string(),
            hour: "eee HH:mm".to_string(),
            minute: "eee HH:mm".to_string(),
            second: "HH:mm:ss".to_string(),
        }
    }
}

impl DateFormats {
    pub fn format_for(&self, granularity: Granularity) -> &str {
        match granularity {
            Granularity::Year => &self.year,
            Granularity::Quarter => &self.quarter,
            Granularity::Month => &self.month,
            Granularity::Day => &self.day,
            Granularity::Week => &self.week,
            Granularity::Hour => &self.hour,
            Granularity::Minute => &self.minute,
            Granularity::Second => &self.second,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        for granularity in Granularity::ALL {
            parse_date_pattern(self.format_for(granularity)).map_err(|e| {
                EngineError::InvalidConfig(format!("date format for {}: {}", granularity, e))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatGridConfig {
    /// Count zero-valued days in the average (and min) of the heat grid.
    pub include_zero_in_average: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    /// Display zone. `None` means UTC.
    pub time_zone: Option<ZoneOffset>,
    pub date_formats: DateFormats,
    /// Extra granularity names offered after the built-in ones.
    pub custom_granularities: Vec<String>,
    pub heat_grid: HeatGridConfig,
}

impl DashboardConfig {
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: DashboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log_info!("CONFIG", "loaded dashboard config from {}", path.display());
        Ok(config)
    }

    /// Date patterns must tokenize; custom granularity names must be
    /// non-empty, unique and not shadow a built-in.
    pub fn validate(&self) -> EngineResult<()> {
        self.date_formats.validate()?;

        let mut seen = HashSet::new();
        for name in &self.custom_granularities {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(EngineError::InvalidConfig(
                    "custom granularity name is empty".to_string(),
                ));
            }
            if trimmed.parse::<Granularity>().is_ok() {
                return Err(EngineError::InvalidConfig(format!(
                    "custom granularity '{}' shadows a built-in",
                    trimmed
                )));
            }
            if !seen.insert(trimmed) {
                return Err(EngineError::InvalidConfig(format!(
                    "duplicate custom granularity '{}'",
                    trimmed
                )));
            }
        }
        Ok(())
    }

    pub fn zone(&self) -> ZoneOffset {
        self.time_zone.unwrap_or_else(ZoneOffset::utc)
    }

    /// Granularity picker entries: `enabled` built-ins, then the custom ones.
    pub fn granularity_options(&self, enabled: &[Granularity]) -> Vec<GranularityOption> {
        granularity_options(enabled, &self.custom_granularities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_theme() {
        let config = DashboardConfig::default();
        assert_eq!(config.date_formats.format_for(Granularity::Hour), "eee HH:mm");
        assert_eq!(config.date_formats.format_for(Granularity::Year), "yyyy");
        assert_eq!(config.zone(), ZoneOffset::utc());
        assert!(!config.heat_grid.include_zero_in_average);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = DashboardConfig::from_json_str(
            r#"{"timeZone": "UTC+5:30", "dateFormats": {"day": "dd/MM"}, "heatGrid": {"includeZeroInAverage": true}}"#,
        )
        .unwrap();
        assert_eq!(config.zone().minutes(), 330);
        assert_eq!(config.date_formats.day, "dd/MM");
        assert_eq!(config.date_formats.month, "MMM yy");
        assert!(config.heat_grid.include_zero_in_average);
    }

    #[test]
    fn test_rejects_bad_pattern() {
        let err = DashboardConfig::from_json_str(r#"{"dateFormats": {"day": "d MMM X"}}"#);
        assert!(matches!(err, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_zone() {
        let err = DashboardConfig::from_json_str(r#"{"timeZone": "Mars/Olympus"}"#);
        assert!(err.is_err());
        let err = DashboardConfig::from_json_str(r#"{"timeZone": "UTC+1é2"}"#);
        assert!(matches!(err, Err(EngineError::Json(_))));
    }

    #[test]
    fn test_custom_granularity_rules() {
        let mut config = DashboardConfig::default();
        config.custom_granularities = vec!["fortnight".to_string(), "fortnight".to_string()];
        assert!(config.validate().is_err());

        config.custom_granularities = vec!["day".to_string()];
        assert!(config.validate().is_err());

        config.custom_granularities = vec!["  ".to_string()];
        assert!(config.validate().is_err());

        config.custom_granularities = vec!["fortnight".to_string(), "fiscal year".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"customGranularities": ["fortnight"]}}"#).unwrap();
        let config = DashboardConfig::load(file.path()).unwrap();
        assert_eq!(config.custom_granularities, vec!["fortnight".to_string()]);

        let values: Vec<String> = config
            .granularity_options(&[Granularity::Week])
            .into_iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(values, vec!["week".to_string(), "fortnight".to_string()]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DashboardConfig::load(&dir.path().join("missing.json"));
        assert!(matches!(err, Err(EngineError::Io(_))));
    }
}
