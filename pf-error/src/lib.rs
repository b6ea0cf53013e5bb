//! Unified error handling for Pentafan
//!
//! A single error type used by both PWM strategies, the configuration layer
//! and the operator session. Errors are grouped by how the caller should react:
//! initialization failures abort startup, everything else is reported and the
//! session carries on.

use std::io;
use std::path::PathBuf;

/// Result type alias using FanError
pub type Result<T> = std::result::Result<T, FanError>;

/// Reasons operator input could not be turned into a duty cycle
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,

    #[error("not a number: {0:?}")]
    NotNumeric(String),
}

/// Broad class of a [`FanError`], used by the driver to decide whether to keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Startup could not complete; the process should exit
    Init,
    /// Operator typed something unusable
    Parse,
    /// Operations were called out of order
    Prerequisite,
    /// The hardware rejected a write; the fan may keep its previous duty
    Write,
}

/// Unified error type for all Pentafan operations
#[derive(thiserror::Error, Debug)]
pub enum FanError {
    // ============================================================================
    // Initialization Errors
    // ============================================================================
    #[error("PWM path not found: {}", path.display())]
    ChannelNotReady {
        path: PathBuf,
    },

    #[error("FAN_CHIP and FAN_LINE are required for software PWM mode")]
    MissingGpioIdentifiers,

    #[error("software PWM support was not compiled in (enable the `gpio` feature)")]
    SoftwarePwmUnavailable,

    #[error("Failed to request GPIO line {line} on {}: {reason}", chip.display())]
    GpioRequest {
        chip: PathBuf,
        line: u32,
        reason: String,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Failed to load config {}: {reason}", path.display())]
    ConfigFile {
        path: PathBuf,
        reason: String,
    },

    // ============================================================================
    // Operator Input Errors
    // ============================================================================
    #[error("Invalid duty cycle: {0}")]
    Parse(#[from] ParseError),

    // ============================================================================
    // Sequencing Errors
    // ============================================================================
    #[error("PWM period not set")]
    PeriodNotSet,

    // ============================================================================
    // Hardware Write Errors
    // ============================================================================
    #[error("Failed to write {}: {source}", path.display())]
    AttributeWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to set GPIO value: {0}")]
    GpioWrite(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FanError {
    /// Create an invalid config error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an attribute write error for a control surface file
    pub fn attribute_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::AttributeWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a GPIO write error from anything displayable
    pub fn gpio_write(reason: impl std::fmt::Display) -> Self {
        Self::GpioWrite(reason.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ChannelNotReady { .. }
            | Self::MissingGpioIdentifiers
            | Self::SoftwarePwmUnavailable
            | Self::GpioRequest { .. }
            | Self::InvalidConfig { .. }
            | Self::ConfigFile { .. } => ErrorKind::Init,
            Self::Parse(_) => ErrorKind::Parse,
            Self::PeriodNotSet => ErrorKind::Prerequisite,
            Self::AttributeWrite { .. } | Self::GpioWrite(_) | Self::Io(_) => ErrorKind::Write,
        }
    }

    /// Whether the process should stop rather than report and continue
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Init
    }
}
