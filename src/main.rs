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

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tracing::{info, warn};

use pentafan::config::FanConfig;
use pentafan::controller::{self, TeardownGuard};
use pentafan::{logger, session, FanError};

fn print_help() {
    println!("pentafan {}", env!("CARGO_PKG_VERSION"));
    println!("Manual fan speed control (sysfs PWM or software PWM over GPIO)");
    println!();
    println!("Usage: pentafan [--config PATH] [--logging]");
    println!();
    println!("  --config PATH   read settings from PATH instead of /etc/pentafan/config.json");
    println!("  --logging       append JSON events to /var/log/pentafan/events.json");
    println!("  -h, --help      show this help");
    println!();
    println!("Environment: HARDWARE_PWM=1 PWMCHIP=0 | FAN_CHIP=<chip> FAN_LINE=<line>");
}

/// Report an error raised before the session starts and exit with status 1.
fn startup_failure(stage: &str, err: FanError) -> ! {
    logger::log_event(
        "startup_failed",
        json!({ "stage": stage, "kind": format!("{:?}", err.kind()), "fatal": err.is_fatal() }),
    );
    if err.is_fatal() {
        eprintln!("{} error: {}", stage, err);
    } else {
        eprintln!("{} error: {} (channel setup rejected)", stage, err);
    }
    logger::shutdown_logging();
    std::process::exit(1);
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut logging_enabled = false;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--logging" => logging_enabled = true,
            "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(PathBuf::from(&args[i]));
            }
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    logger::init_tracing();
    if logging_enabled {
        match logger::init_logging() {
            Some(path) => info!("event log: {}", path.display()),
            None => warn!("could not open an event log file; continuing without it"),
        }
        logger::log_event("startup", json!({ "args": args }));
    }

    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        warn!("not running as root; PWM and GPIO writes may be refused");
    }

    let config = FanConfig::load(config_path.as_deref(), std::env::vars())
        .unwrap_or_else(|e| startup_failure("Config", e));

    let (controller, mode) = controller::select(&config).unwrap_or_else(|e| startup_failure("Init", e));
    println!("Mode: {}", controller.describe());

    let controller = controller::share(controller);
    let guard = TeardownGuard::new(Arc::clone(&controller));

    {
        let controller = Arc::clone(&controller);
        if let Err(e) = ctrlc::set_handler(move || {
            info!("interrupted, stopping fan output");
            controller.lock().teardown();
            println!("\nExiting.");
            std::process::exit(0);
        }) {
            warn!("Failed to set signal handler: {}. Interrupting may leave the fan running.", e);
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let result = session::run_session(&controller, stdin.lock(), &mut stdout);

    drop(guard);
    println!("\nExiting.");

    let stats = result.context("reading operator input")?;
    info!(mode = %mode, applied = stats.applied, rejected = stats.rejected, "session ended");
    Ok(())
}
