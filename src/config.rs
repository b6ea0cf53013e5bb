/*
 * This file is part of Pentafan.
 *
 * Copyright (C) 2025 Pentafan contributors
 *
 * Pentafan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Pentafan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Pentafan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Startup configuration.
//!
//! Settings come from an optional JSON file and are then overridden by
//! environment-style key/value pairs. Recognised keys:
//!
//! | key                   | meaning                                   | default          |
//! |-----------------------|-------------------------------------------|------------------|
//! | `HARDWARE_PWM`        | `1` selects sysfs PWM, anything else GPIO | software         |
//! | `PWMCHIP`             | sysfs chip, `N` or `pwmchipN`             | `0`              |
//! | `FAN_CHIP`            | GPIO chip for software PWM                | required         |
//! | `FAN_LINE`            | GPIO line offset for software PWM         | required         |
//! | `PENTAFAN_SYSFS_ROOT` | PWM class directory                       | `/sys/class/pwm` |
//! | `PENTAFAN_GPIO_ROOT`  | directory of gpiochip devices             | `/dev`           |

use std::fs;
use std::path::{Path, PathBuf};

use pf_error::{FanError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{env, hardware, paths, software};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FanConfig {
    pub hardware_pwm: bool,
    pub pwm_chip: String,
    pub fan_chip: Option<String>,
    pub fan_line: Option<u32>,
    pub sysfs_root: PathBuf,
    pub gpio_dev_root: PathBuf,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            hardware_pwm: false,
            pwm_chip: hardware::DEFAULT_CHIP.to_string(),
            fan_chip: None,
            fan_line: None,
            sysfs_root: PathBuf::from(hardware::SYSFS_ROOT),
            gpio_dev_root: PathBuf::from(software::GPIO_DEV_ROOT),
        }
    }
}

fn is_safe_chip(s: &str) -> bool {
    if s.is_empty() || s.len() > 64 || s.contains("..") {
        return false;
    }
    s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

impl FanConfig {
    /// Defaults overridden by `vars`.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        config.apply_vars(vars)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| FanError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: FanConfig = serde_json::from_str(&data).map_err(|e| FanError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// File (explicit path, or the system file when present) overlaid with `vars`.
    pub fn load<I, K, V>(explicit: Option<&Path>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let system_file = Path::new(paths::CONFIG_FILE);
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if system_file.exists() => Self::from_file(system_file)?,
            None => Self::default(),
        };
        config.apply_vars(vars)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply recognised keys; unrelated keys are ignored.
    pub fn apply_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                env::HARDWARE_PWM => self.hardware_pwm = value == "1",
                env::PWM_CHIP => self.pwm_chip = value.to_string(),
                env::FAN_CHIP => {
                    self.fan_chip = (!value.is_empty()).then(|| value.to_string());
                }
                env::FAN_LINE => {
                    self.fan_line = if value.is_empty() {
                        None
                    } else {
                        Some(value.parse().map_err(|_| {
                            FanError::invalid_config(env::FAN_LINE, format!("not a line number: {:?}", value))
                        })?)
                    };
                }
                env::SYSFS_ROOT => self.sysfs_root = PathBuf::from(value),
                env::GPIO_DEV_ROOT => self.gpio_dev_root = PathBuf::from(value),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        // The sysfs selector is only read in hardware mode.
        if self.hardware_pwm && !is_safe_chip(self.pwm_chip.trim()) {
            return Err(FanError::invalid_config(env::PWM_CHIP, format!("invalid chip selector {:?}", self.pwm_chip)));
        }
        if let Some(chip) = &self.fan_chip {
            // Absolute device paths are allowed here, unlike the sysfs selector.
            let name = chip.trim().trim_start_matches('/');
            if name.is_empty() || name.contains("..") {
                return Err(FanError::invalid_config(env::FAN_CHIP, format!("invalid chip {:?}", chip)));
            }
        }
        Ok(())
    }

    /// GPIO chip and line for software PWM.
    pub fn gpio_identifiers(&self) -> Result<(&str, u32)> {
        match (self.fan_chip.as_deref(), self.fan_line) {
            (Some(chip), Some(line)) => Ok((chip, line)),
            _ => Err(FanError::MissingGpioIdentifiers),
        }
    }
}
