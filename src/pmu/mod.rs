//! Utilities to load PMU event catalogs and metric definitions.

use crate::platform::{CollectionContext, Metadata};
use crate::{Error, Result};
use derive_more::{Index, IntoIterator};
use log::warn;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub mod abbrev;

mod events;
pub use events::{EventDefinition, EventLine, GroupDefinition, Rule};

pub mod filter;
pub use filter::is_collectable;

pub mod uncore;
pub use uncore::expand_uncore_groups;

pub mod x86;

pub mod arm;

mod conditional;
pub use conditional::transform_conditional;

pub mod metrics;
pub use metrics::{load_metric_definitions, MetricDefinition};

/// Environment variable pointing at a directory of definition files to use instead of the ones
/// packaged with this crate.
pub const RESOURCES_ENV: &str = "PMU_RESOURCES";

/// Microarchitectures that ship alternate definitions for platforms without fixed TMA counters.
const NO_FIXED_TMA_UARCHS: &[&str] = &["icx", "spr", "emr"];

/// Location of the packaged event and metric definition files.
///
/// The root holds an `events/` and a `metrics/` tree, each laid out as
/// `<architecture>/<vendor>/<uarch>.<ext>` for x86 and `<architecture>/<variant>/*.json` for ARM.
#[derive(Debug, Clone, PartialEq)]
pub struct Resources {
    root: PathBuf,
}

impl Default for Resources {
    fn default() -> Self {
        Resources::from_env()
    }
}

impl Resources {
    /// Use the definition files found under `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Resources { root: root.into() }
    }

    /// Definition files shipped with this crate.
    pub fn bundled() -> Self {
        Resources::new(concat!(env!("CARGO_MANIFEST_DIR"), "/resources"))
    }

    /// Use the directory named by `PMU_RESOURCES`, falling back to the bundled files.
    pub fn from_env() -> Self {
        match std::env::var(RESOURCES_ENV) {
            Ok(root) => Resources::new(root),
            Err(_) => Resources::bundled(),
        }
    }

    /// Root directory of the definition files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the x86 `kind` (`events` or `metrics`) file for the platform.
    pub fn x86_file(&self, kind: &str, metadata: &Metadata, extension: &str) -> Result<PathBuf> {
        let uarch = metadata.uarch_key();
        if uarch.is_empty() || metadata.vendor.is_empty() {
            return Err(Error::Lookup(format!(
                "no definitions for vendor '{}' microarchitecture '{}'",
                metadata.vendor, metadata.microarchitecture
            )));
        }
        // e.g. AWS VM instances
        let alternate = if NO_FIXED_TMA_UARCHS.contains(&uarch.as_str()) && !metadata.supports_fixed_tma {
            "_nofixedtma"
        } else {
            ""
        };
        Ok(self
            .root
            .join(kind)
            .join(&metadata.architecture)
            .join(&metadata.vendor)
            .join(format!("{}{}.{}", uarch, alternate, extension)))
    }

    /// Directory of the ARM `kind` (`events` or `metrics`) files for the platform.
    pub fn arm_dir(&self, kind: &str, metadata: &Metadata) -> Result<PathBuf> {
        let variant = arm::lookup_arm_variant(metadata)?;
        Ok(self.root.join(kind).join(&metadata.architecture).join(variant))
    }
}

/// Resolve the directory of ARM `kind` files, either `override_dir` or the packaged one.
pub(crate) fn arm_definition_dir(
    resources: &Resources,
    kind: &str,
    override_dir: Option<&Path>,
    metadata: &Metadata,
) -> Result<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => resources.arm_dir(kind, metadata)?,
    };
    let md = std::fs::metadata(&dir).map_err(|e| Error::resource(&dir, e))?;
    if !md.is_dir() {
        return Err(Error::resource(&dir, "ARM definitions must be a directory of JSON files"));
    }
    Ok(dir)
}

/// Regular files in `dir` whose names end in `.json`, any case, sorted by name.
pub(crate) fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.json", glob::Pattern::escape(&dir.to_string_lossy()));
    let options = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    let mut files = Vec::new();
    for entry in glob::glob_with(&pattern, options)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Could not read directory entry -- {}", e),
        }
    }
    Ok(files)
}

/// Read and decode a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::resource(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Names of events that were dropped because they cannot be collected.
///
/// Each name is kept once, in the order it was first seen.
#[derive(Debug, Default)]
pub(crate) struct Uncollectable {
    seen: HashSet<String>,
    names: Vec<String>,
}

impl Uncollectable {
    pub(crate) fn add(&mut self, name: &str) {
        if self.seen.insert(String::from(name)) {
            self.names.push(String::from(name));
        }
    }

    pub(crate) fn finish(self) -> Vec<String> {
        if !self.names.is_empty() {
            warn!("Events not collectable on target -- {}", self.names.join(", "));
        }
        self.names
    }
}

/// Event groups ready to be handed to the sampling tool.
#[derive(Debug, Default, Clone, PartialEq, Index, IntoIterator)]
pub struct EventCatalog {
    /// Groups of collectable events, in catalog order.
    #[index]
    #[into_iterator(owned, ref)]
    pub groups: Vec<GroupDefinition>,
    /// Names of the catalog events that cannot be collected on the target.
    pub uncollectable: Vec<String>,
}

impl EventCatalog {
    /// Load the event catalog for the platform described by `ctx`.
    ///
    /// `override_path` replaces the packaged definitions: a file for x86, a directory of JSON
    /// files for ARM.
    pub fn load(
        resources: &Resources,
        override_path: Option<&Path>,
        ctx: &CollectionContext,
    ) -> Result<Self> {
        if ctx.metadata.is_arm() {
            arm::load_arm_event_groups(resources, override_path, ctx)
        } else {
            x86::load_x86_event_groups(resources, override_path, ctx)
        }
    }

    /// Iterate over the events of all groups.
    pub fn events(&self) -> impl Iterator<Item = &EventDefinition> {
        self.groups.iter().flat_map(|g| g.iter())
    }

    /// Filter all `EventDefinition`s using `predicate`.
    pub fn filter_events<F>(&self, predicate: F) -> Vec<&EventDefinition>
    where
        F: FnMut(&&EventDefinition) -> bool,
    {
        self.events().filter(predicate).collect()
    }

    /// Search for `EventDefinition`s by name.
    ///
    /// The `name` field of the function serves as a regex.
    pub fn find_events_by_name(&self, name: &str) -> Result<Vec<&EventDefinition>> {
        let re = Regex::new(name)?;
        Ok(self.filter_events(|e| re.is_match(&e.name)))
    }
}
