//! Loader for the ARM event catalog, a directory of JSON files in the format of the kernel's
//! `tools/perf/pmu-events/arch/arm64` tree.

use crate::platform::{CollectionContext, Metadata};
use crate::pmu::{
    arm_definition_dir, is_collectable, json_files, read_json, EventCatalog, EventDefinition,
    GroupDefinition, Resources, Uncollectable,
};
use crate::{Error, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::path::Path;

/// Map from the microarchitecture label to the directory holding its definitions.
const ARM_VARIANTS: &[(&str, &str)] = &[
    ("Neoverse V2", "neoverse-n2-v2"),
    ("Neoverse N2", "neoverse-n2-v2"),
];

/// Name of the definition directory for the ARM microarchitecture of `metadata`.
pub fn lookup_arm_variant(metadata: &Metadata) -> Result<&'static str> {
    ARM_VARIANTS
        .iter()
        .find(|(label, _)| *label == metadata.microarchitecture)
        .map(|(_, variant)| *variant)
        .ok_or_else(|| Error::Lookup(format!("unknown ARM variant: {}", metadata.microarchitecture)))
}

/// One record of an ARM event file. Other fields are ignored.
#[derive(Debug, Deserialize)]
struct ArmEvent {
    #[serde(rename = "ArchStdEvent", default)]
    arch_std_event: String,
    #[serde(rename = "PublicDescription", default)]
    public_description: String,
}

impl From<ArmEvent> for EventDefinition {
    fn from(event: ArmEvent) -> Self {
        EventDefinition {
            raw: event.arch_std_event.clone(),
            name: event.arch_std_event,
            device: String::from("cpu"),
            description: event.public_description,
        }
    }
}

/// Load the ARM event catalog from the directory `override_dir` or from the packaged variant
/// directory.
///
/// Every JSON file contributes at most one group. Files that cannot be read or decoded are
/// skipped.
pub fn load_arm_event_groups(
    resources: &Resources,
    override_dir: Option<&Path>,
    ctx: &CollectionContext,
) -> Result<EventCatalog> {
    let dir = arm_definition_dir(resources, "events", override_dir, ctx.metadata)?;
    info!("Loading event definitions from {}", dir.display());

    let mut groups = Vec::new();
    let mut uncollectable = Uncollectable::default();
    for path in json_files(&dir)? {
        let events: Vec<ArmEvent> = match read_json(&path) {
            Ok(events) => events,
            Err(e) => {
                warn!("Skipping ARM event file -- {}: {}", path.display(), e);
                continue;
            }
        };
        let mut group = GroupDefinition::default();
        for event in events.into_iter().map(EventDefinition::from) {
            if event.name.is_empty() {
                debug!("Skipping ARM event record without ArchStdEvent in {}", path.display());
                continue;
            }
            if is_collectable(&event, ctx) {
                group.push(event);
            } else {
                debug!("Event not collectable on target -- {}", event.name);
                uncollectable.add(&event.name);
            }
        }
        if group.is_empty() {
            warn!("No collectable ARM events in file {}", path.display());
        } else {
            groups.push(group);
        }
    }

    Ok(EventCatalog {
        groups,
        uncollectable: uncollectable.finish(),
    })
}
