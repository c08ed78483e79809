use crate::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::process::Command;

lazy_static! {
    static ref PERF_VERSION: Regex = Regex::new(r"perf version (\d+)\.(\d+)").unwrap();
}

/// Oldest `perf` release the collector accepts on the target.
const MIN_SUPPORTED: (u32, u32) = (6, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// Details of the userspace `perf` tool version.
pub struct PerfVersion {
    /// Major version.
    major: u32,
    /// Minor version.
    minor: u32,
}

impl PerfVersion {
    /// Create a new PerfVersion structure directly
    pub fn new(major: u32, minor: u32) -> Self {
        PerfVersion { major, minor }
    }

    /// Parse the output of `perf --version`, e.g. `perf version 6.2.16.g8ff1`.
    pub fn parse(output: &str) -> Result<Self> {
        let invalid = || Error::format("perf --version", output.trim());
        let caps = PERF_VERSION.captures(output).ok_or_else(invalid)?;
        let major = caps[1].parse::<u32>().map_err(|_| invalid())?;
        let minor = caps[2].parse::<u32>().map_err(|_| invalid())?;
        Ok(PerfVersion { major, minor })
    }

    /// Create `perf` version structure by running `perf --version` from `PATH`.
    pub fn get_details_from_tool() -> Result<Self> {
        let output = Command::new("perf").arg("--version").output()?.stdout;
        PerfVersion::parse(&String::from_utf8_lossy(&output))
    }

    /// Get major version.
    #[inline]
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Get minor version
    #[inline]
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Is this version `major.minor` or later.
    #[inline]
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }

    /// Recent enough to run the collection.
    #[inline]
    pub fn is_supported(&self) -> bool {
        self.at_least(MIN_SUPPORTED.0, MIN_SUPPORTED.1)
    }
}
