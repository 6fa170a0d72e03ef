//! Configuration file management for ais-track.
//!
//! Reads/writes `~/.ais-track/config.yaml` with track reconstruction
//! settings and the default output format.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::tracker::TrackerConfig;
use crate::types::{AisError, Result};

/// Full configuration structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// How the CLI renders messages and track points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => f.write_str("table"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(AisError::Config(format!("unknown output format: {other}"))),
        }
    }
}

/// Get the config directory path (`~/.ais-track/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".ais-track")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.ais-track/config.yaml`.
///
/// Returns default config if the file doesn't exist or can't be read.
pub fn load_config() -> Config {
    let path = config_file();
    if !path.exists() {
        return Config::default();
    }
    load_config_from(&path).unwrap_or_default()
}

/// Load config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
        .ok_or_else(|| AisError::Config(format!("could not parse {}", path.display())))
}

/// Save config to `~/.ais-track/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let path = config_file();
    save_config_to(&path, config)?;
    Ok(path)
}

/// Save config to an explicit path, creating parent directories.
pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| AisError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config)).map_err(|e| AisError::Config(e.to_string()))
}

/// Parse simple YAML-like config text.
///
/// Unknown sections and keys are ignored; malformed values keep the default.
pub fn parse_config(text: &str) -> Option<Config> {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = strip_comment(line).trim();
        if stripped.is_empty() {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        match current_section.as_deref() {
            Some("tracker") => match key {
                "max_gap_secs" => {
                    if let Some(v) = val.parse::<i64>().ok().filter(|v| *v > 0) {
                        config.tracker.max_gap_secs = v;
                    }
                }
                "flat_earth_limit_km" => {
                    if let Some(v) = parse_float_value(val).filter(|v| *v >= 0.0) {
                        config.tracker.flat_earth_limit_km = v;
                    }
                }
                "verify_checksum" => {
                    if let Some(v) = parse_bool_value(val) {
                        config.tracker.verify_checksum = v;
                    }
                }
                _ => {}
            },
            Some("output") => {
                if key == "format" {
                    if let Some(v) = parse_string_value(val).and_then(|v| v.parse().ok()) {
                        config.output.format = v;
                    }
                }
            }
            _ => {}
        }
    }

    Some(config)
}

fn strip_comment(line: &str) -> &str {
    match line.find(" #") {
        Some(idx) => &line[..idx],
        None if line.trim_start().starts_with('#') => "",
        None => line,
    }
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

fn parse_bool_value(val: &str) -> Option<bool> {
    match val.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# ais-track configuration".to_string(), String::new()];

    lines.push("tracker:".into());
    lines.push(format!("  max_gap_secs: {}", config.tracker.max_gap_secs));
    lines.push(format!(
        "  flat_earth_limit_km: {:?}",
        config.tracker.flat_earth_limit_km
    ));
    lines.push(format!(
        "  verify_checksum: {}",
        config.tracker.verify_checksum
    ));
    lines.push(String::new());

    lines.push("output:".into());
    lines.push(format!("  format: \"{}\"", config.output.format));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracker.max_gap_secs, 3600);
        assert_eq!(config.tracker.flat_earth_limit_km, 100.0);
        assert!(!config.tracker.verify_checksum);
        assert_eq!(config.output.format, OutputFormat::Table);
    }

    #[test]
    fn test_parse_config() {
        let text = r#"
# local overrides
tracker:
  max_gap_secs: 1800
  flat_earth_limit_km: 50.5   # metres would be too fine
  verify_checksum: true

output:
  format: "json"
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.tracker.max_gap_secs, 1800);
        assert_eq!(config.tracker.flat_earth_limit_km, 50.5);
        assert!(config.tracker.verify_checksum);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_config_bad_values_keep_defaults() {
        let text = r#"
tracker:
  max_gap_secs: -5
  flat_earth_limit_km: ~
  verify_checksum: maybe

output:
  format: xml

unknown:
  key: value
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_keys_outside_section_ignored() {
        let text = "max_gap_secs: 10\ntracker:\n  max_gap_secs: 20\nformat: json\n  format: json\n";
        let config = parse_config(text).unwrap();
        assert_eq!(config.tracker.max_gap_secs, 20);
        assert_eq!(config.output.format, OutputFormat::Table);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert!("csv".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_roundtrip() {
        let config = Config {
            tracker: TrackerConfig {
                max_gap_secs: 900,
                flat_earth_limit_km: 25.0,
                verify_checksum: true,
            },
            output: OutputConfig {
                format: OutputFormat::Json,
            },
        };
        let text = serialize_config(&config);
        assert!(text.contains("flat_earth_limit_km: 25.0"));
        assert_eq!(parse_config(&text).unwrap(), config);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.tracker.max_gap_secs = 600;
        save_config_to(&path, &config).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.tracker.max_gap_secs, 600);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_from(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, AisError::Io(_)));
    }
}
