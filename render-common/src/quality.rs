//! Rendering quality tiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality tier requested for a render.
///
/// The wire form is the renderer's own flag (`-ql`, `-qm`, ...). Single-letter
/// codes and the long names are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Quality {
    /// 480p15
    Low,
    /// 720p30
    #[default]
    Medium,
    /// 1080p60
    High,
    /// 1440p60
    Production,
    /// 2160p60
    FourK,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized quality tier '{0}' (expected one of -ql, -qm, -qh, -qp, -qk)")]
pub struct ParseQualityError(pub String);

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::Low,
        Quality::Medium,
        Quality::High,
        Quality::Production,
        Quality::FourK,
    ];

    /// Command-line flag understood by the renderer inside the container.
    pub fn as_flag(self) -> &'static str {
        match self {
            Quality::Low => "-ql",
            Quality::Medium => "-qm",
            Quality::High => "-qh",
            Quality::Production => "-qp",
            Quality::FourK => "-qk",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
            Quality::Production => "production",
            Quality::FourK => "4k",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

impl FromStr for Quality {
    type Err = ParseQualityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-ql" | "l" | "low" => Ok(Quality::Low),
            "-qm" | "m" | "medium" => Ok(Quality::Medium),
            "-qh" | "h" | "high" => Ok(Quality::High),
            "-qp" | "p" | "production" => Ok(Quality::Production),
            "-qk" | "k" | "4k" => Ok(Quality::FourK),
            other => Err(ParseQualityError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Quality {
    type Error = ParseQualityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quality> for String {
    fn from(quality: Quality) -> Self {
        quality.as_flag().to_string()
    }
}
