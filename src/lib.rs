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

//! Pentafan - manual fan speed control for single-board computers
//!
//! The fan is driven either by a hardware PWM channel exposed through
//! `/sys/class/pwm`, or by a software-generated waveform on a GPIO line.
//! Both sit behind [`controller::PwmController`]; [`controller::select`]
//! picks one from [`config::FanConfig`] and [`session::run_session`] feeds it
//! operator input.

pub mod config;
pub mod constants;
pub mod controller;
pub mod duty;
pub mod gpio_pwm;
pub mod logger;
pub mod session;
pub mod sysfs_pwm;

#[cfg(test)]
pub mod test_utils;

pub use controller::{select, ControllerMode, PwmController};
pub use pf_error::{ErrorKind, FanError, ParseError, Result};
