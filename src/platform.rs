//! Description of the platform events are collected on.
//!
//! Everything here is gathered by the caller (locally or from a remote target) and handed to the
//! loaders as a read-only snapshot.

use std::collections::BTreeMap;

/// Capabilities and identity of the platform whose counters are sampled.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Metadata {
    /// Architecture as reported by `uname -m`, e.g. `x86_64` or `aarch64`.
    pub architecture: String,
    /// CPU vendor identifier, e.g. `GenuineIntel` or `AuthenticAMD`.
    pub vendor: String,
    /// Microarchitecture label, e.g. `SPR_XCC` or `Neoverse V2`.
    pub microarchitecture: String,
    /// Fixed counters for top-down microarchitecture analysis are available.
    pub supports_fixed_tma: bool,
    /// Precise event based sampling is available.
    pub supports_pebs: bool,
    /// Off-core response events are available.
    pub supports_ocr: bool,
    /// Uncore PMUs are exposed.
    pub supports_uncore: bool,
    /// The `ref-cycles` event is available.
    pub supports_ref_cycles: bool,
    /// Event listing reported by the sampling tool (`perf list`).
    pub perf_supported_events: String,
    /// Uncore device type (e.g. `cha`) to the ids of its instances.
    pub uncore_device_ids: BTreeMap<String, Vec<u32>>,
}

impl Metadata {
    /// Check if this is an ARM platform.
    pub fn is_arm(&self) -> bool {
        self.architecture == "arm64" || self.architecture == "aarch64"
    }

    /// Check if the CPU vendor is AMD.
    pub fn is_amd(&self) -> bool {
        self.vendor == "AuthenticAMD"
    }

    /// Key used to name x86 definition files.
    ///
    /// Lower cased label up to the first `_` or space, e.g. `SPR_XCC` gives `spr`.
    pub fn uarch_key(&self) -> String {
        let uarch = self.microarchitecture.split('_').next().unwrap_or("");
        uarch.split(' ').next().unwrap_or("").to_lowercase()
    }
}

/// Granularity of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionScope {
    /// All CPUs of the system.
    System,
    /// A list of processes.
    Process,
    /// A list of cgroups.
    Cgroup,
}

impl Default for CollectionScope {
    fn default() -> Self {
        CollectionScope::System
    }
}

impl CollectionScope {
    /// Check if collection is restricted to processes or cgroups.
    ///
    /// Uncore, off-core response and power events are only visible system wide.
    #[inline]
    pub fn is_restricted(self) -> bool {
        self != CollectionScope::System
    }
}

/// Everything the event filter and uncore expander need to know about a collection.
#[derive(Debug, Clone, Copy)]
pub struct CollectionContext<'a> {
    /// Target platform.
    pub metadata: &'a Metadata,
    /// Scope of the collection.
    pub scope: CollectionScope,
}

impl<'a> CollectionContext<'a> {
    /// Create a new context.
    pub fn new(metadata: &'a Metadata, scope: CollectionScope) -> Self {
        CollectionContext { metadata, scope }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uarch_key() {
        let mut metadata = Metadata::default();
        for (label, key) in &[
            ("SPR_XCC", "spr"),
            ("EMR_MCC", "emr"),
            ("ICX", "icx"),
            ("Genoa", "genoa"),
            ("Neoverse V2", "neoverse"),
        ] {
            metadata.microarchitecture = String::from(*label);
            assert_eq!(metadata.uarch_key(), *key);
        }
    }

    #[test]
    fn test_architecture() {
        let mut metadata = Metadata::default();
        metadata.architecture = "aarch64".into();
        assert!(metadata.is_arm());
        metadata.architecture = "arm64".into();
        assert!(metadata.is_arm());
        metadata.architecture = "x86_64".into();
        assert!(!metadata.is_arm());
        assert!(!CollectionScope::default().is_restricted());
        assert!(CollectionScope::Cgroup.is_restricted());
    }
}
