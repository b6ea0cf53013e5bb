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

//! Software PWM by toggling a GPIO line from a timing thread.
//!
//! The command path only ever replaces the [`Waveform`]; the timing thread owns
//! all sleeping and reads the waveform once per cycle, so a new duty is in
//! effect at the next period boundary. Stop requests wake the thread through a
//! condition variable instead of waiting out the current phase.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use pf_error::{FanError, Result};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::constants::software;
use crate::controller::{ControllerMode, PwmController};
use crate::logger;

/// A GPIO line configured as output
#[cfg_attr(test, mockall::automock)]
pub trait OutputLine {
    fn set_value(&mut self, value: u8) -> Result<()>;
}

/// GPIO line requested through the Linux character device
#[cfg(feature = "gpio")]
pub struct GpioLine {
    handle: gpio_cdev::LineHandle,
}

#[cfg(feature = "gpio")]
impl GpioLine {
    /// Claim `line` on `chip_path` as an output, starting low.
    pub fn request(chip_path: &Path, line: u32) -> Result<Self> {
        use gpio_cdev::{Chip, LineRequestFlags};

        let request_error = |e: gpio_cdev::Error| FanError::GpioRequest {
            chip: chip_path.to_path_buf(),
            line,
            reason: e.to_string(),
        };
        let mut chip = Chip::new(chip_path).map_err(request_error)?;
        let handle = chip
            .get_line(line)
            .and_then(|l| l.request(LineRequestFlags::OUTPUT, 0, software::CONSUMER))
            .map_err(request_error)?;
        Ok(Self { handle })
    }
}

#[cfg(feature = "gpio")]
impl OutputLine for GpioLine {
    fn set_value(&mut self, value: u8) -> Result<()> {
        self.handle.set_value(value).map_err(FanError::gpio_write)
    }
}

/// Character device path for a chip identifier: "0", "gpiochip0" or "/dev/gpiochip0".
pub fn resolve_gpio_chip(dev_root: &Path, chip: &str) -> PathBuf {
    let chip = chip.trim();
    if let Ok(index) = chip.parse::<u32>() {
        return dev_root.join(format!("gpiochip{}", index));
    }
    let path = Path::new(chip);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dev_root.join(chip)
    }
}

/// One PWM cycle split into high and low phases. `high + low == period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waveform {
    pub period: Duration,
    pub high: Duration,
    pub low: Duration,
}

impl Waveform {
    pub fn with_duty(period: Duration, duty: f64) -> Self {
        let duty = duty.clamp(0.0, 1.0);
        let period_ns = period.as_nanos() as u64;
        let high_ns = ((period_ns as f64 * duty).round() as u64).min(period_ns);
        let high = Duration::from_nanos(high_ns);
        Self { period, high, low: period - high }
    }

    pub fn duty(&self) -> f64 {
        if self.period.is_zero() {
            return 0.0;
        }
        self.high.as_secs_f64() / self.period.as_secs_f64()
    }
}

struct LoopState {
    waveform: Waveform,
    stop: bool,
}

struct Shared {
    state: Mutex<LoopState>,
    wake: Condvar,
}

impl Shared {
    fn next_waveform(&self) -> Option<Waveform> {
        let state = self.state.lock();
        if state.stop {
            None
        } else {
            Some(state.waveform)
        }
    }

    /// Sleep for `duration` or until stopped. Returns true when stop was requested.
    fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut state = self.state.lock();
        while !state.stop {
            if self.wake.wait_until(&mut state, deadline).timed_out() {
                return state.stop;
            }
        }
        true
    }

    fn request_stop(&self) {
        self.state.lock().stop = true;
        self.wake.notify_all();
    }
}

fn drive<L: OutputLine>(line: &Mutex<L>, value: u8, failures: &mut u32) {
    match line.lock().set_value(value) {
        Ok(()) => *failures = 0,
        Err(e) => {
            if *failures == 0 {
                warn!("software PWM: failed to drive line {}: {}", value, e);
            } else {
                debug!("software PWM: failed to drive line {} ({} in a row): {}", value, *failures + 1, e);
            }
            *failures = failures.saturating_add(1);
        }
    }
}

fn run_timing_loop<L: OutputLine>(shared: Arc<Shared>, line: Arc<Mutex<L>>) {
    let mut failures = 0u32;
    while let Some(waveform) = shared.next_waveform() {
        // Zero-length phases are skipped so 0% and 100% hold a steady level.
        if !waveform.high.is_zero() {
            drive(&line, 1, &mut failures);
            if shared.wait(waveform.high) {
                break;
            }
        }
        if !waveform.low.is_zero() {
            drive(&line, 0, &mut failures);
            if shared.wait(waveform.low) {
                break;
            }
        }
    }
    drive(&line, 0, &mut failures);
    debug!("software PWM timing thread exited");
}

/// Software PWM controller owning one timing thread
pub struct SoftPwm<L: OutputLine + Send + 'static> {
    shared: Arc<Shared>,
    line: Arc<Mutex<L>>,
    worker: Option<JoinHandle<()>>,
    period: Duration,
    torn_down: bool,
}

impl<L: OutputLine + Send + 'static> SoftPwm<L> {
    /// Start generating a waveform on `line`. Returns without waiting for the first cycle.
    pub fn start(line: L, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(FanError::invalid_config("period", "software PWM period must be greater than zero"));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(LoopState {
                waveform: Waveform::with_duty(period, software::INITIAL_DUTY),
                stop: false,
            }),
            wake: Condvar::new(),
        });
        let line = Arc::new(Mutex::new(line));

        let worker = {
            let shared = Arc::clone(&shared);
            let line = Arc::clone(&line);
            thread::Builder::new()
                .name(software::THREAD_NAME.to_string())
                .spawn(move || run_timing_loop(shared, line))?
        };

        info!("software PWM started, period {:?}", period);
        Ok(Self {
            shared,
            line,
            worker: Some(worker),
            period,
            torn_down: false,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// The waveform the timing thread will use for its next cycle
    pub fn waveform(&self) -> Waveform {
        self.shared.state.lock().waveform
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().map_or(false, |w| !w.is_finished())
    }

    /// Set the duty cycle. Full 100 % is allowed.
    pub fn write(&mut self, fraction: f64) -> Result<()> {
        let waveform = Waveform::with_duty(self.period, fraction);
        self.shared.state.lock().waveform = waveform;

        logger::log_event(
            "duty_write",
            json!({
                "mode": "software",
                "requested": fraction,
                "high_us": waveform.high.as_micros() as u64,
                "low_us": waveform.low.as_micros() as u64,
            }),
        );
        Ok(())
    }

    /// Stop the timing thread and force the line low. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.shared.request_stop();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("software PWM timing thread panicked");
            }
        }
        if let Err(e) = self.line.lock().set_value(0) {
            debug!("stop: could not drive line low: {}", e);
        }
    }

    /// Zero the duty, then stop. Never fails.
    pub fn teardown(&mut self) {
        let _ = self.write(0.0);
        self.stop();
        if !self.torn_down {
            logger::log_event("teardown", json!({ "mode": "software" }));
        }
        self.torn_down = true;
    }
}

#[cfg(feature = "gpio")]
impl SoftPwm<GpioLine> {
    /// Claim the configured fan line and start the timing thread.
    pub fn open(config: &crate::config::FanConfig, period: Duration) -> Result<Self> {
        let (chip, line) = config.gpio_identifiers()?;
        let chip_path = resolve_gpio_chip(&config.gpio_dev_root, chip);
        let gpio = GpioLine::request(&chip_path, line)?;
        info!("claimed GPIO line {} on {}", line, chip_path.display());
        Self::start(gpio, period)
    }
}

impl<L: OutputLine + Send + 'static> PwmController for SoftPwm<L> {
    fn mode(&self) -> ControllerMode {
        ControllerMode::Software
    }

    fn write(&mut self, duty: f64) -> Result<()> {
        SoftPwm::write(self, duty)
    }

    fn teardown(&mut self) {
        SoftPwm::teardown(self)
    }

    fn describe(&self) -> String {
        let hz = 1.0 / self.period.as_secs_f64();
        format!("Software PWM (gpio), {} Hz", hz.round())
    }
}

impl<L: OutputLine + Send + 'static> Drop for SoftPwm<L> {
    fn drop(&mut self) {
        if !self.torn_down {
            self.teardown();
        }
    }
}
