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

//! Diagnostics: `tracing` output on stderr plus an optional JSON event log.
//!
//! The event log is one JSON object per line and is only written after
//! [`init_logging`] was called (`--logging` on the command line).

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serde_json::{json, Value};

use crate::constants::{env, paths};

lazy_static! {
    static ref LOG_FILE: Mutex<Option<(PathBuf, File)>> = Mutex::new(None);
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Install the stderr `tracing` subscriber. Filter comes from `PENTAFAN_LOG`.
pub fn init_tracing() {
    let filter = std::env::var(env::LOG_FILTER).unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn open_append(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Start the JSON event log at the default location, falling back to /tmp.
/// Returns the path actually in use.
pub fn init_logging() -> Option<PathBuf> {
    init_logging_at(Path::new(paths::EVENT_LOG))
        .or_else(|| init_logging_at(Path::new(paths::EVENT_LOG_FALLBACK)))
}

pub fn init_logging_at(path: &Path) -> Option<PathBuf> {
    let file = open_append(path)?;
    match LOG_FILE.lock() {
        Ok(mut guard) => *guard = Some((path.to_path_buf(), file)),
        Err(poisoned) => *poisoned.into_inner() = Some((path.to_path_buf(), file)),
    }
    Some(path.to_path_buf())
}

/// Stop writing events and close the file
pub fn shutdown_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = None;
    }
}

pub fn log_event(event: &str, data: Value) {
    let Ok(mut guard) = LOG_FILE.lock() else { return };
    let Some((_, file)) = guard.as_mut() else { return };

    let line = json!({
        "ts_ms": now_millis(),
        "event": event,
        "data": data,
    });
    let _ = writeln!(file, "{}", line);
}
