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

//! Operator session: read a line, apply it, echo the result.

use std::io::{self, BufRead, Write};

use parking_lot::Mutex;
use pf_error::ErrorKind;
use tracing::{error, warn};

use crate::controller::{ControllerMode, PwmController};
use crate::duty::{cap_for_mode, percent_label, Command};

pub const PROMPT: &str = "Enter duty cycle (0-100 for %, or 0.0-1.0). 'q' to quit: ";

/// What to do after one line of input
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Quit,
    /// Duty applied; messages to show the operator
    Applied { duty: f64, messages: Vec<String> },
    /// Nothing changed; messages explain why
    Rejected { messages: Vec<String> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub applied: usize,
    pub rejected: usize,
}

/// Apply one line of operator input to the controller.
pub fn handle_line(controller: &Mutex<Box<dyn PwmController>>, mode: ControllerMode, line: &str) -> Outcome {
    let requested = match Command::parse(line) {
        Ok(Command::Quit) => return Outcome::Quit,
        Ok(Command::SetDuty(value)) => value,
        Err(_) => {
            return Outcome::Rejected {
                messages: vec!["Invalid number. Try e.g. 35 or 0.35 or 35%.".to_string()],
            }
        }
    };

    let mut messages = Vec::new();
    let capped = cap_for_mode(requested, mode);
    if capped.capped {
        messages.push("Capped at 99.9% for hardware PWM.".to_string());
    }

    match controller.lock().write(capped.duty) {
        Ok(()) => {
            messages.push(format!("Set duty: {:.1}%", percent_label(capped.duty)));
            Outcome::Applied { duty: capped.duty, messages }
        }
        Err(e) => {
            if e.kind() == ErrorKind::Prerequisite {
                error!("duty write out of sequence: {}", e);
            } else {
                warn!("duty write failed: {}", e);
            }
            messages.push(format!("Write error: {}", e));
            Outcome::Rejected { messages }
        }
    }
}

/// Prompt on `output` and process `input` until a quit token or end of input.
pub fn run_session<R: BufRead, W: Write>(
    controller: &Mutex<Box<dyn PwmController>>,
    mut input: R,
    output: &mut W,
) -> io::Result<SessionStats> {
    let mode = controller.lock().mode();
    let mut stats = SessionStats::default();
    let mut line = String::new();

    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let messages = match handle_line(controller, mode, &line) {
            Outcome::Quit => break,
            Outcome::Applied { messages, .. } => {
                stats.applied += 1;
                messages
            }
            Outcome::Rejected { messages } => {
                stats.rejected += 1;
                messages
            }
        };
        for message in messages {
            writeln!(output, "{}", message)?;
        }
    }

    Ok(stats)
}
