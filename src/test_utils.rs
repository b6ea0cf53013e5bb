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

//! Test utilities and fixtures for Pentafan tests

#[cfg(test)]
pub mod test_utils {
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use pf_error::Result;
    use tempfile::{NamedTempFile, TempDir};

    use crate::config::FanConfig;
    use crate::gpio_pwm::OutputLine;

    /// Creates a temporary sysfs PWM class directory with `pwmchip{index}`.
    /// When `with_channel` is set, `pwm0/` already exists as if exported.
    pub fn create_mock_pwm_chip(index: u32, with_channel: bool) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let chip = temp_dir.path().join(format!("pwmchip{}", index));
        fs::create_dir_all(&chip).unwrap();
        fs::write(chip.join("npwm"), "1").unwrap();
        if with_channel {
            let channel = chip.join("pwm0");
            fs::create_dir_all(&channel).unwrap();
            fs::write(channel.join("period"), "0").unwrap();
            fs::write(channel.join("enable"), "0").unwrap();
        }
        temp_dir
    }

    /// Reads a control surface attribute, trimmed
    pub fn read_attr(path: &Path) -> String {
        fs::read_to_string(path).unwrap().trim().to_string()
    }

    /// Config whose sysfs and GPIO roots both point at `root`
    pub fn test_config(root: &Path) -> FanConfig {
        FanConfig {
            sysfs_root: root.to_path_buf(),
            gpio_dev_root: root.to_path_buf(),
            ..FanConfig::default()
        }
    }

    /// Creates a temporary file with JSON content
    pub fn create_temp_json_file<T: serde::Serialize>(data: &T) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        let json = serde_json::to_string_pretty(data).unwrap();
        temp_file.write_all(json.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    /// Output line that remembers every value driven onto it
    #[derive(Clone, Default)]
    pub struct RecordingLine {
        values: Arc<Mutex<Vec<u8>>>,
    }

    impl RecordingLine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn values(&self) -> Vec<u8> {
            self.values.lock().clone()
        }

        pub fn last(&self) -> Option<u8> {
            self.values.lock().last().copied()
        }

        pub fn clear(&self) {
            self.values.lock().clear();
        }
    }

    impl OutputLine for RecordingLine {
        fn set_value(&mut self, value: u8) -> Result<()> {
            self.values.lock().push(value);
            Ok(())
        }
    }

    /// Asserts that two floating point numbers are approximately equal
    pub fn assert_approx_eq(a: f64, b: f64, tolerance: f64) {
        assert!(
            (a - b).abs() < tolerance,
            "Values {} and {} are not approximately equal (tolerance: {})",
            a, b, tolerance
        );
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use crate::gpio_pwm::OutputLine;

    #[test]
    fn test_mock_pwm_chip_layout() {
        let root = create_mock_pwm_chip(1, true);
        assert!(root.path().join("pwmchip1/pwm0").is_dir());
        assert_eq!(read_attr(&root.path().join("pwmchip1/npwm")), "1");

        let bare = create_mock_pwm_chip(0, false);
        assert!(!bare.path().join("pwmchip0/pwm0").exists());
    }

    #[test]
    fn test_recording_line() {
        let line = RecordingLine::new();
        let mut writer = line.clone();
        writer.set_value(1).unwrap();
        writer.set_value(0).unwrap();
        assert_eq!(line.values(), vec![1, 0]);
        assert_eq!(line.last(), Some(0));
        line.clear();
        assert_eq!(line.last(), None);
    }

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(0.35, 35.0 / 100.0, 1e-12);
    }

    #[test]
    #[should_panic]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq(0.35, 0.36, 1e-6);
    }
}
