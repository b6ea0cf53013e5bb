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

//! Duty cycle parsing and per-mode capping.
//!
//! Operators type either a percentage (`35`, `35%`) or a fraction (`0.35`).
//! Anything above 1.0 is read as a percentage, so `1.0` means full speed and
//! never 1 %. Existing users rely on that, so it stays.

use pf_error::ParseError;

use crate::constants::{commands, hardware};
use crate::controller::ControllerMode;

/// A line of operator input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Quit,
    /// Uncapped fraction as returned by [`parse_duty`]
    SetDuty(f64),
}

impl Command {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let token = text.trim().to_lowercase();
        if commands::QUIT.contains(&token.as_str()) {
            return Ok(Command::Quit);
        }
        parse_duty(text).map(Command::SetDuty)
    }
}

impl TryFrom<&str> for Command {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Command::parse(value)
    }
}

/// Parse free-form operator text into a duty fraction.
///
/// The result is not clamped; see [`cap_for_mode`].
pub fn parse_duty(text: &str) -> Result<f64, ParseError> {
    let lowered = text.trim().to_lowercase();
    let number = lowered.trim_end_matches('%').trim_end();
    if number.is_empty() {
        return Err(ParseError::Empty);
    }

    let value: f64 = number
        .parse()
        .map_err(|_| ParseError::NotNumeric(number.to_string()))?;
    if !value.is_finite() {
        return Err(ParseError::NotNumeric(number.to_string()));
    }

    if value > 1.0 {
        Ok(value / 100.0)
    } else {
        Ok(value)
    }
}

/// Duty cycle after mode limits were applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CappedDuty {
    pub duty: f64,
    /// Set when a hardware request for full speed was lowered to the ceiling
    pub capped: bool,
}

/// Clamp to [0, 1] and apply the hardware ceiling.
pub fn cap_for_mode(value: f64, mode: ControllerMode) -> CappedDuty {
    let duty = value.clamp(0.0, 1.0);
    if mode == ControllerMode::Hardware && duty >= 1.0 {
        return CappedDuty { duty: hardware::DUTY_CEILING, capped: true };
    }
    CappedDuty { duty, capped: false }
}

/// Duty as a percentage rounded to one decimal place
pub fn percent_label(duty: f64) -> f64 {
    (duty * 1000.0).round() / 10.0
}
