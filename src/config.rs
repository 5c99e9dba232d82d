/*
 *  config.rs
 *
 *  ilipanel - ILI8960 panel control
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

/// spidev node used when neither YAML nor CLI names one
pub const DEFAULT_BUS: &str = "/dev/spidev0.0";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub panel: Option<PanelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PanelConfig {
    pub bus: Option<String>,             // e.g. "/dev/spidev0.0"
    pub speed_hz: Option<u32>,
    pub brightness: Option<u8>,          // 0-255, written after attach
    pub contrast: Option<u8>,            // 0-255, written after attach
    pub power_management: Option<bool>,  // wire suspend/resume, default on
}

impl Config {
    pub fn bus(&self) -> &str {
        self.panel
            .as_ref()
            .and_then(|p| p.bus.as_deref())
            .unwrap_or(DEFAULT_BUS)
    }

    pub fn speed_hz(&self) -> Option<u32> {
        self.panel.as_ref().and_then(|p| p.speed_hz)
    }

    pub fn brightness(&self) -> Option<u8> {
        self.panel.as_ref().and_then(|p| p.brightness)
    }

    pub fn contrast(&self) -> Option<u8> {
        self.panel.as_ref().and_then(|p| p.contrast)
    }

    pub fn power_management(&self) -> bool {
        self.panel
            .as_ref()
            .and_then(|p| p.power_management)
            .unwrap_or(true)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "ilipanel", version, about = "ILI8960 panel control console")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// spidev node, e.g. /dev/spidev0.0
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub bus: Option<String>,
    #[arg(long)]
    pub speed_hz: Option<u32>,
    #[arg(long)]
    pub brightness: Option<u8>,
    #[arg(long)]
    pub contrast: Option<u8>,
    #[arg(long, action = ArgAction::Set)]
    pub power_management: Option<bool>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = resolve(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layer defaults, YAML and `cli`, then validate.
pub fn resolve(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/ilipanel/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/ilipanel/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/ilipanel.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["ilipanel.yaml", "config/ilipanel.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.panel, src.panel) {
        (None, Some(c)) => dst.panel = Some(c),
        (Some(d), Some(s)) => merge_panel(d, s),
        _ => {}
    }
}

fn merge_panel(dst: &mut PanelConfig, src: PanelConfig) {
    if src.bus.is_some()              { dst.bus = src.bus; }
    if src.speed_hz.is_some()         { dst.speed_hz = src.speed_hz; }
    if src.brightness.is_some()       { dst.brightness = src.brightness; }
    if src.contrast.is_some()         { dst.contrast = src.contrast; }
    if src.power_management.is_some() { dst.power_management = src.power_management; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    let any_panel = cli.bus.is_some()
        || cli.speed_hz.is_some()
        || cli.brightness.is_some()
        || cli.contrast.is_some()
        || cli.power_management.is_some();

    if any_panel && cfg.panel.is_none() {
        cfg.panel = Some(PanelConfig::default());
    }
    if let Some(panel) = cfg.panel.as_mut() {
        if cli.bus.is_some()              { panel.bus = cli.bus.clone(); }
        if cli.speed_hz.is_some()         { panel.speed_hz = cli.speed_hz; }
        if cli.brightness.is_some()       { panel.brightness = cli.brightness; }
        if cli.contrast.is_some()         { panel.contrast = cli.contrast; }
        if cli.power_management.is_some() { panel.power_management = cli.power_management; }
    }
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(level) = cfg.log_level.as_deref() {
        match level {
            "error" | "warn" | "info" | "debug" | "trace" | "off" => {},
            _ => return Err(ConfigError::Validation(format!("unknown log_level '{}'", level))),
        }
    }
    if let Some(panel) = cfg.panel.as_ref() {
        if let Some(bus) = panel.bus.as_deref() {
            if bus.trim().is_empty() {
                return Err(ConfigError::Validation("panel bus must not be empty".into()));
            }
        }
        if panel.speed_hz == Some(0) {
            return Err(ConfigError::Validation("panel speed_hz must be > 0".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.bus(), DEFAULT_BUS);
        assert_eq!(cfg.log_level(), "info");
        assert!(cfg.power_management());
        assert_eq!(cfg.brightness(), None);
    }

    #[test]
    fn test_parse_yaml() {
        let cfg = parse_yaml(
            "log_level: debug\n\
             panel:\n  \
               bus: /dev/spidev1.0\n  \
               speed_hz: 1000000\n  \
               brightness: 200\n  \
               power_management: false\n",
        ).unwrap();

        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.bus(), "/dev/spidev1.0");
        assert_eq!(cfg.speed_hz(), Some(1_000_000));
        assert_eq!(cfg.brightness(), Some(200));
        assert!(!cfg.power_management());
    }

    #[test]
    fn test_yaml_brightness_out_of_range() {
        assert!(matches!(
            parse_yaml("panel:\n  brightness: 300\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut dst = parse_yaml("panel:\n  bus: /dev/spidev0.1\n  contrast: 10\n").unwrap();
        let src = parse_yaml("panel:\n  contrast: 20\n").unwrap();

        merge(&mut dst, src);
        assert_eq!(dst.bus(), "/dev/spidev0.1");
        assert_eq!(dst.contrast(), Some(20));
    }

    #[test]
    fn test_cli_overrides_yaml() {
        let mut cfg = parse_yaml("panel:\n  brightness: 10\n").unwrap();
        let cli = Cli {
            brightness: Some(99),
            log_level: Some("warn".to_string()),
            ..Cli::default()
        };

        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.brightness(), Some(99));
        assert_eq!(cfg.log_level(), "warn");
    }

    #[test]
    fn test_cli_creates_panel_section() {
        let mut cfg = Config::default();
        let cli = Cli { bus: Some("/dev/spidev2.0".to_string()), ..Cli::default() };

        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.bus(), "/dev/spidev2.0");
    }

    #[test]
    fn test_validate() {
        assert!(validate(&Config::default()).is_ok());
        assert!(validate(&parse_yaml("panel:\n  speed_hz: 0\n").unwrap()).is_err());
        assert!(validate(&parse_yaml("panel:\n  bus: ''\n").unwrap()).is_err());
        assert!(validate(&parse_yaml("log_level: loud\n").unwrap()).is_err());
    }

    #[test]
    fn test_missing_explicit_config() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/ilipanel.yaml")),
            ..Cli::default()
        };
        assert!(matches!(resolve(&cli), Err(ConfigError::Validation(_))));
    }
}
