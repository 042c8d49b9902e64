//! Error taxonomy and process exit codes.
//!
//! Every fatal error the crate can produce maps onto one of three exit codes:
//! `0` clean, `1` findings present, `2` execution error. Findings themselves
//! are not errors; the CLI derives exit code 1 from scan results. Everything
//! in [`ScoutError`] therefore maps to exit code 2.
//!
//! Messages are user-safe and never contain match text. The optional `detail`
//! field may carry underlying error output and should be treated as debug
//! output.

use thiserror::Error;

/// Process exit codes for CI gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    Findings = 1,
    Error = 2,
}

impl ExitCode {
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Fatal errors raised before or outside a running scan.
///
/// Errors that occur *during* a scan are recoverable and recorded as
/// [`crate::model::ScanError`] entries on the result instead.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Config file unparseable or semantically invalid.
    #[error("{message}")]
    Config {
        message: String,
        detail: Option<String>,
    },

    /// Rule pack failed schema or cross-field validation.
    #[error("{message}")]
    Rules {
        message: String,
        detail: Option<String>,
    },

    /// A required external tool (e.g. `git`) is missing.
    #[error("{message}")]
    Dependency {
        message: String,
        detail: Option<String>,
    },

    /// Fatal engine error.
    #[error("{message}")]
    ScanExecution {
        message: String,
        detail: Option<String>,
    },

    /// Transport-level error at the hosted-provider boundary.
    #[error("{message}")]
    Provider {
        message: String,
        status: Option<u16>,
        detail: Option<String>,
    },
}

impl ScoutError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            detail: None,
        }
    }

    pub fn config_with(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn rules(message: impl Into<String>) -> Self {
        Self::Rules {
            message: message.into(),
            detail: None,
        }
    }

    pub fn rules_with(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Rules {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency {
            message: message.into(),
            detail: None,
        }
    }

    pub fn scan(message: impl Into<String>) -> Self {
        Self::ScanExecution {
            message: message.into(),
            detail: None,
        }
    }

    pub fn scan_with(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ScanExecution {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn provider(message: impl Into<String>, status: Option<u16>, detail: Option<String>) -> Self {
        Self::Provider {
            message: message.into(),
            status,
            detail,
        }
    }

    /// The debug detail attached to this error, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Config { detail, .. }
            | Self::Rules { detail, .. }
            | Self::Dependency { detail, .. }
            | Self::ScanExecution { detail, .. }
            | Self::Provider { detail, .. } => detail.as_deref(),
        }
    }

    /// All fatal errors map to exit code 2.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        ExitCode::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(ExitCode::Ok.code(), 0);
        assert_eq!(ExitCode::Findings.code(), 1);
        assert_eq!(ExitCode::Error.code(), 2);
    }

    #[test]
    fn every_variant_maps_to_error_exit() {
        let errs = [
            ScoutError::config("bad config"),
            ScoutError::rules("bad rules"),
            ScoutError::dependency("git missing"),
            ScoutError::scan("engine failure"),
            ScoutError::provider("forbidden", Some(403), None),
        ];
        for e in errs {
            assert_eq!(e.exit_code(), ExitCode::Error);
        }
    }

    #[test]
    fn detail_is_preserved() {
        let e = ScoutError::rules_with("invalid regex", "unclosed group");
        assert_eq!(e.to_string(), "invalid regex");
        assert_eq!(e.detail(), Some("unclosed group"));
    }
}
