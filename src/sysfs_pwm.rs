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

//! Hardware PWM through the kernel sysfs interface.
//!
//! Layout of the control surface:
//!
//! ```text
//! /sys/class/pwm/pwmchipN/export        write "0" to create pwm0/
//! /sys/class/pwm/pwmchipN/pwm0/period     nanoseconds
//! /sys/class/pwm/pwmchipN/pwm0/duty_cycle nanoseconds, must stay below period
//! /sys/class/pwm/pwmchipN/pwm0/enable     "0" or "1"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use pf_error::{FanError, Result};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::constants::hardware::{self, attr};
use crate::controller::{ControllerMode, PwmController};
use crate::logger;

/// Turn a chip selector into a directory name: "0" -> "pwmchip0", "pwmchip1" stays.
pub fn resolve_chip_name(chip: &str) -> String {
    let chip = chip.trim();
    match chip.parse::<u32>() {
        Ok(index) => format!("pwmchip{}", index),
        Err(_) => chip.to_string(),
    }
}

/// Duty in nanoseconds for a fraction of `period_ns`, never reaching the period.
pub fn duty_ns_for(period_ns: u64, fraction: f64) -> u64 {
    let fraction = fraction.clamp(0.0, hardware::DUTY_CEILING);
    let duty = (period_ns as f64 * fraction).floor() as u64;
    duty.min(period_ns.saturating_sub(1))
}

fn write_attr(path: &Path, value: impl ToString) -> Result<()> {
    fs::write(path, value.to_string()).map_err(|e| FanError::attribute_write(path, e))
}

/// Channel 0 of a sysfs PWM chip
#[derive(Debug)]
pub struct SysfsPwm {
    chip_dir: PathBuf,
    channel_dir: PathBuf,
    period_ns: Option<u64>,
    duty_ns: Option<u64>,
    enabled: bool,
    torn_down: bool,
}

impl SysfsPwm {
    /// Export channel 0 of `chip` under `sysfs_root` and wait for it to appear.
    pub fn open(sysfs_root: &Path, chip: &str) -> Result<Self> {
        let chip_dir = sysfs_root.join(resolve_chip_name(chip));
        let channel_dir = chip_dir.join(format!("pwm{}", hardware::CHANNEL));

        if !channel_dir.is_dir() {
            // EBUSY/EACCES here are common when already exported; readiness decides.
            if let Err(e) = fs::write(chip_dir.join(attr::EXPORT), hardware::CHANNEL.to_string()) {
                debug!("export on {} failed: {}", chip_dir.display(), e);
            }
        }

        for _ in 0..hardware::READY_POLL_ATTEMPTS {
            if channel_dir.is_dir() {
                break;
            }
            thread::sleep(hardware::READY_POLL_INTERVAL);
        }
        if !channel_dir.is_dir() {
            return Err(FanError::ChannelNotReady { path: channel_dir });
        }

        info!("PWM channel ready at {}", channel_dir.display());
        Ok(Self {
            chip_dir,
            channel_dir,
            period_ns: None,
            duty_ns: None,
            enabled: false,
            torn_down: false,
        })
    }

    pub fn chip_dir(&self) -> &Path {
        &self.chip_dir
    }

    pub fn channel_dir(&self) -> &Path {
        &self.channel_dir
    }

    pub fn period_ns(&self) -> Option<u64> {
        self.period_ns
    }

    /// Last duty written, in nanoseconds
    pub fn duty_ns(&self) -> Option<u64> {
        self.duty_ns
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Write the PWM period. Required before the first [`SysfsPwm::write`].
    pub fn set_period(&mut self, period_ns: u64) -> Result<()> {
        if period_ns == 0 {
            return Err(FanError::invalid_config("period", "must be greater than zero"));
        }
        write_attr(&self.channel_dir.join(attr::PERIOD), period_ns)?;
        self.period_ns = Some(period_ns);
        debug!("period := {}ns", period_ns);
        Ok(())
    }

    pub fn set_period_us(&mut self, period_us: u64) -> Result<()> {
        self.set_period(period_us.saturating_mul(1000))
    }

    pub fn enable(&mut self, enable: bool) -> Result<()> {
        write_attr(&self.channel_dir.join(attr::ENABLE), if enable { 1 } else { 0 })?;
        self.enabled = enable;
        debug!("enable := {}", enable);
        Ok(())
    }

    /// Set the duty cycle as a fraction of the period, capped below 100 %.
    pub fn write(&mut self, fraction: f64) -> Result<()> {
        let period_ns = self.period_ns.ok_or(FanError::PeriodNotSet)?;
        let duty_ns = duty_ns_for(period_ns, fraction);
        write_attr(&self.channel_dir.join(attr::DUTY_CYCLE), duty_ns)?;
        self.duty_ns = Some(duty_ns);

        logger::log_event(
            "duty_write",
            json!({
                "mode": "hardware",
                "path": self.channel_dir.display().to_string(),
                "requested": fraction,
                "duty_ns": duty_ns,
                "period_ns": period_ns,
            }),
        );
        Ok(())
    }

    /// Drop to zero duty and disable output. Never fails.
    pub fn teardown(&mut self) {
        if let Err(e) = self.write(0.0) {
            warn!("teardown: could not zero duty on {}: {}", self.channel_dir.display(), e);
        }
        if let Err(e) = self.enable(false) {
            warn!("teardown: could not disable {}: {}", self.channel_dir.display(), e);
        }
        if !self.torn_down {
            logger::log_event("teardown", json!({ "mode": "hardware" }));
        }
        self.torn_down = true;
    }
}

impl PwmController for SysfsPwm {
    fn mode(&self) -> ControllerMode {
        ControllerMode::Hardware
    }

    fn write(&mut self, duty: f64) -> Result<()> {
        SysfsPwm::write(self, duty)
    }

    fn teardown(&mut self) {
        SysfsPwm::teardown(self)
    }

    fn describe(&self) -> String {
        let khz = self
            .period_ns
            .map(|p| format!(", {} kHz", 1_000_000 / p))
            .unwrap_or_default();
        format!("Hardware PWM ({}){}", self.chip_dir.display(), khz)
    }
}

impl Drop for SysfsPwm {
    fn drop(&mut self) {
        if !self.torn_down {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{create_mock_pwm_chip, read_attr};
    use tempfile::TempDir;

    #[test]
    fn test_resolve_chip_name() {
        assert_eq!(resolve_chip_name("0"), "pwmchip0");
        assert_eq!(resolve_chip_name(" 3 "), "pwmchip3");
        assert_eq!(resolve_chip_name("pwmchip1"), "pwmchip1");
    }

    #[test]
    fn test_duty_ns_for() {
        assert_eq!(duty_ns_for(40_000, 0.5), 20_000);
        assert_eq!(duty_ns_for(40_000, 1.0), 39_960);
        assert_eq!(duty_ns_for(40_000, 1.5), 39_960);
        assert_eq!(duty_ns_for(40_000, -0.2), 0);
        assert_eq!(duty_ns_for(40_000, 0.12345), 4_938);
    }

    #[test]
    fn test_duty_always_below_period() {
        for period in [1u64, 2, 3, 999, 40_000, 1_000_000] {
            for step in 0..=120 {
                let f = step as f64 / 100.0;
                let duty = duty_ns_for(period, f);
                assert!(duty < period, "period {} fraction {} gave {}", period, f, duty);
            }
        }
    }

    #[test]
    fn test_open_existing_channel() {
        let root = create_mock_pwm_chip(0, true);
        let pwm = SysfsPwm::open(root.path(), "0").unwrap();
        assert_eq!(pwm.channel_dir(), root.path().join("pwmchip0/pwm0"));
        assert_eq!(pwm.period_ns(), None);
    }

    #[test]
    fn test_open_accepts_qualified_chip_name() {
        let root = create_mock_pwm_chip(2, true);
        assert!(SysfsPwm::open(root.path(), "pwmchip2").is_ok());
    }

    #[test]
    fn test_open_writes_export_when_missing() {
        let root = create_mock_pwm_chip(0, false);
        let result = SysfsPwm::open(root.path(), "0");
        // The mock tree never materialises pwm0, so readiness must fail...
        assert!(matches!(result, Err(FanError::ChannelNotReady { .. })));
        // ...but the export request was still made.
        assert_eq!(read_attr(&root.path().join("pwmchip0/export")), "0");
    }

    #[test]
    fn test_open_missing_chip_is_not_ready() {
        let root = TempDir::new().unwrap();
        match SysfsPwm::open(root.path(), "7") {
            Err(FanError::ChannelNotReady { path }) => {
                assert_eq!(path, root.path().join("pwmchip7/pwm0"));
            }
            other => panic!("expected ChannelNotReady, got {:?}", other),
        }
    }

    #[test]
    fn test_open_waits_for_channel_to_appear() {
        let root = create_mock_pwm_chip(0, false);
        let channel = root.path().join("pwmchip0/pwm0");
        let creator = {
            let channel = channel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(60));
                fs::create_dir_all(channel).unwrap();
            })
        };
        let pwm = SysfsPwm::open(root.path(), "0");
        creator.join().unwrap();
        assert!(pwm.is_ok());
    }

    #[test]
    fn test_write_before_period_fails() {
        let root = create_mock_pwm_chip(0, true);
        let mut pwm = SysfsPwm::open(root.path(), "0").unwrap();
        assert!(matches!(pwm.write(0.5), Err(FanError::PeriodNotSet)));
        assert!(!root.path().join("pwmchip0/pwm0/duty_cycle").exists());
    }

    #[test]
    fn test_set_period_and_write() {
        let root = create_mock_pwm_chip(0, true);
        let mut pwm = SysfsPwm::open(root.path(), "0").unwrap();
        pwm.set_period_us(40).unwrap();
        pwm.enable(true).unwrap();
        pwm.write(0.5).unwrap();

        let channel = root.path().join("pwmchip0/pwm0");
        assert_eq!(read_attr(&channel.join("period")), "40000");
        assert_eq!(read_attr(&channel.join("enable")), "1");
        assert_eq!(read_attr(&channel.join("duty_cycle")), "20000");
        assert_eq!(pwm.duty_ns(), Some(20_000));

        pwm.write(1.5).unwrap();
        assert_eq!(read_attr(&channel.join("duty_cycle")), "39960");
    }

    #[test]
    fn test_zero_period_rejected() {
        let root = create_mock_pwm_chip(0, true);
        let mut pwm = SysfsPwm::open(root.path(), "0").unwrap();
        assert!(matches!(pwm.set_period(0), Err(FanError::InvalidConfig { .. })));
        assert_eq!(pwm.period_ns(), None);
    }

    #[test]
    fn test_teardown_zeroes_and_disables() {
        let root = create_mock_pwm_chip(0, true);
        let mut pwm = SysfsPwm::open(root.path(), "0").unwrap();
        pwm.set_period_us(40).unwrap();
        pwm.enable(true).unwrap();
        pwm.write(0.8).unwrap();
        pwm.teardown();

        let channel = root.path().join("pwmchip0/pwm0");
        assert_eq!(read_attr(&channel.join("duty_cycle")), "0");
        assert_eq!(read_attr(&channel.join("enable")), "0");
        assert!(!pwm.is_enabled());
    }

    #[test]
    fn test_teardown_without_period_still_disables() {
        let root = create_mock_pwm_chip(0, true);
        let mut pwm = SysfsPwm::open(root.path(), "0").unwrap();
        pwm.teardown();
        assert_eq!(read_attr(&root.path().join("pwmchip0/pwm0/enable")), "0");
    }

    #[test]
    fn test_teardown_survives_vanished_channel() {
        let root = create_mock_pwm_chip(0, true);
        let mut pwm = SysfsPwm::open(root.path(), "0").unwrap();
        pwm.set_period_us(40).unwrap();
        fs::remove_dir_all(root.path().join("pwmchip0/pwm0")).unwrap();
        pwm.teardown();
        assert!(matches!(pwm.write(0.3), Err(FanError::AttributeWrite { .. })));
    }

    #[test]
    fn test_drop_runs_teardown() {
        let root = create_mock_pwm_chip(0, true);
        {
            let mut pwm = SysfsPwm::open(root.path(), "0").unwrap();
            pwm.set_period_us(40).unwrap();
            pwm.enable(true).unwrap();
            pwm.write(0.6).unwrap();
        }
        let channel = root.path().join("pwmchip0/pwm0");
        assert_eq!(read_attr(&channel.join("duty_cycle")), "0");
        assert_eq!(read_attr(&channel.join("enable")), "0");
    }

    #[test]
    fn test_describe_reports_frequency() {
        let root = create_mock_pwm_chip(0, true);
        let mut pwm = SysfsPwm::open(root.path(), "0").unwrap();
        pwm.set_period_us(40).unwrap();
        assert!(pwm.describe().ends_with(", 25 kHz"));
        assert_eq!(PwmController::mode(&pwm), ControllerMode::Hardware);
    }
}
