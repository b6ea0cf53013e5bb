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

//! Controller abstraction and strategy selection.
//!
//! The strategy is chosen once from [`FanConfig`] and never changes; there is
//! no fallback from hardware to software PWM or back.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use pf_error::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::config::FanConfig;
use crate::constants::hardware;
use crate::logger;
use crate::sysfs_pwm::SysfsPwm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerMode {
    Hardware,
    Software,
}

impl fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerMode::Hardware => write!(f, "hardware"),
            ControllerMode::Software => write!(f, "software"),
        }
    }
}

/// Something that can drive the fan at a duty cycle
pub trait PwmController: Send {
    fn mode(&self) -> ControllerMode;

    /// Apply a duty fraction. Each strategy enforces its own ceiling.
    fn write(&mut self, duty: f64) -> Result<()>;

    /// Best-effort shutdown: zero the fan and release the output.
    /// Must not fail and must be safe to call more than once.
    fn teardown(&mut self);

    /// One-line description for the startup banner
    fn describe(&self) -> String;
}

/// Build the controller the configuration asks for.
pub fn select(config: &FanConfig) -> Result<(Box<dyn PwmController>, ControllerMode)> {
    let controller: Box<dyn PwmController> = if config.hardware_pwm {
        let mut pwm = SysfsPwm::open(&config.sysfs_root, &config.pwm_chip)?;
        pwm.set_period_us(hardware::PERIOD_US)?;
        pwm.enable(true)?;
        Box::new(pwm)
    } else {
        open_software(config)?
    };

    let mode = controller.mode();
    info!("selected {} PWM: {}", mode, controller.describe());
    logger::log_event("mode_selected", json!({ "mode": mode, "describe": controller.describe() }));
    Ok((controller, mode))
}

#[cfg(feature = "gpio")]
fn open_software(config: &FanConfig) -> Result<Box<dyn PwmController>> {
    let pwm = crate::gpio_pwm::SoftPwm::open(config, crate::constants::software::PERIOD)?;
    Ok(Box::new(pwm))
}

#[cfg(not(feature = "gpio"))]
fn open_software(config: &FanConfig) -> Result<Box<dyn PwmController>> {
    config.gpio_identifiers()?;
    Err(pf_error::FanError::SoftwarePwmUnavailable)
}

/// Controller shared between the session and the interrupt handler
pub type SharedController = Arc<Mutex<Box<dyn PwmController>>>;

pub fn share(controller: Box<dyn PwmController>) -> SharedController {
    Arc::new(Mutex::new(controller))
}

/// Runs [`PwmController::teardown`] when dropped, whichever way the scope is left.
pub struct TeardownGuard {
    controller: SharedController,
}

impl TeardownGuard {
    pub fn new(controller: SharedController) -> Self {
        Self { controller }
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        self.controller.lock().teardown();
    }
}
