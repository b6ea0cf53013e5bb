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

//! Constants and configuration defaults for Pentafan
//!
//! Operating points, sysfs/GPIO locations and recognised configuration keys.

use std::time::Duration;

/// Hardware PWM through /sys/class/pwm
pub mod hardware {
    use super::Duration;

    /// Default sysfs PWM class directory
    pub const SYSFS_ROOT: &str = "/sys/class/pwm";

    /// Default chip selector ("0" resolves to pwmchip0)
    pub const DEFAULT_CHIP: &str = "0";

    /// Only channel 0 of the chip is driven
    pub const CHANNEL: u32 = 0;

    /// Operating period in microseconds (25 kHz)
    pub const PERIOD_US: u64 = 40;

    /// sysfs rejects duty_cycle >= period, so full speed is capped just below
    pub const DUTY_CEILING: f64 = 0.999;

    /// Readiness polling after export
    pub const READY_POLL_ATTEMPTS: u32 = 50;
    pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// Attribute names of a PWM channel
    pub mod attr {
        pub const EXPORT: &str = "export";
        pub const PERIOD: &str = "period";
        pub const DUTY_CYCLE: &str = "duty_cycle";
        pub const ENABLE: &str = "enable";
    }
}

/// Software PWM by toggling a GPIO line
pub mod software {
    use super::Duration;

    /// Directory holding gpiochipN character devices
    pub const GPIO_DEV_ROOT: &str = "/dev";

    /// Operating period (40 Hz)
    pub const PERIOD: Duration = Duration::from_millis(25);

    /// Duty cycle the timing thread starts with before the first write
    pub const INITIAL_DUTY: f64 = 0.5;

    /// Consumer label shown by gpioinfo for the claimed line
    pub const CONSUMER: &str = "fan";

    /// Name of the timing thread
    pub const THREAD_NAME: &str = "pentafan-softpwm";
}

/// Environment keys understood by the configuration layer
pub mod env {
    pub const HARDWARE_PWM: &str = "HARDWARE_PWM";
    pub const PWM_CHIP: &str = "PWMCHIP";
    pub const FAN_CHIP: &str = "FAN_CHIP";
    pub const FAN_LINE: &str = "FAN_LINE";
    pub const SYSFS_ROOT: &str = "PENTAFAN_SYSFS_ROOT";
    pub const GPIO_DEV_ROOT: &str = "PENTAFAN_GPIO_ROOT";
    pub const LOG_FILTER: &str = "PENTAFAN_LOG";
}

/// Filesystem locations
pub mod paths {
    /// Optional configuration file read at startup
    pub const CONFIG_FILE: &str = "/etc/pentafan/config.json";

    /// JSON event log written with --logging
    pub const EVENT_LOG: &str = "/var/log/pentafan/events.json";

    /// Used when the event log directory is not writable
    pub const EVENT_LOG_FALLBACK: &str = "/tmp/pentafan_events.json";
}

/// Operator command tokens
pub mod commands {
    pub const QUIT: &[&str] = &["q", "quit", "exit"];
}
