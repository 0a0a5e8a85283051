use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar version reported by `mise version`, e.g. `2026.1.2`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MiseVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl MiseVersion {
    /// Sentinel for an absent or unparsable version.
    pub const ZERO: MiseVersion = MiseVersion::new(0, 0, 0);

    /// First release that accepts `--env`; older ones take `--profile`.
    pub const ENV_FLAG: MiseVersion = MiseVersion::new(2024, 12, 2);

    /// First release where `--offline` is passed to `ls`.
    pub const OFFLINE_FLAG: MiseVersion = MiseVersion::new(2024, 11, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the first whitespace-separated token as `major.minor.patch`.
    ///
    /// `2026.1.2 windows-x64 (2026-01-13)` parses; banner lines and log lines
    /// do not.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?;
        let mut parts = token.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }

    /// Version of the first line that parses, scanning top to bottom.
    pub fn find_in_output(output: &str) -> Option<Self> {
        output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .find_map(Self::parse)
    }
}

impl fmt::Display for MiseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for MiseVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("'{s}' is not a mise version"))
    }
}
