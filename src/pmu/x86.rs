//! Loader for the line oriented x86 event files.
//!
//! ```text
//! # comment
//! cpu/event=0xc0,umask=0x00,name='INST_RETIRED.ANY'/,
//! cpu-cycles;
//! ```
//!
//! Every line holds one event and ends with `,` when more events of the same group follow, or
//! with `;` when it is the last event of its group.

use crate::platform::CollectionContext;
use crate::pmu::{
    expand_uncore_groups, is_collectable, EventCatalog, EventDefinition, GroupDefinition,
    Resources, Uncollectable,
};
use crate::{Error, Result};
use log::{debug, error, info, warn};
use std::path::Path;

/// Load the x86 event catalog from `override_path` or from the packaged file of the platform.
pub fn load_x86_event_groups(
    resources: &Resources,
    override_path: Option<&Path>,
    ctx: &CollectionContext,
) -> Result<EventCatalog> {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => resources.x86_file("events", ctx.metadata, "txt")?,
    };
    info!("Loading event definitions from {}", path.display());
    let text = std::fs::read_to_string(&path).map_err(|e| {
        error!("Failed to read event definition file -- {}: {}", path.display(), e);
        Error::resource(&path, e)
    })?;
    parse_event_groups(&text, &path, ctx)
}

/// Parse the content of an x86 event file read from `path`.
///
/// A single malformed line fails the whole catalog.
pub fn parse_event_groups(
    text: &str,
    path: &Path,
    ctx: &CollectionContext,
) -> Result<EventCatalog> {
    let mut groups = Vec::new();
    let mut group = GroupDefinition::default();
    let mut uncollectable = Uncollectable::default();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (body, end_of_group) = if let Some(body) = line.strip_suffix(';') {
            (body, true)
        } else if let Some(body) = line.strip_suffix(',') {
            (body, false)
        } else {
            error!("Event definition without group separator -- {}", line);
            return Err(Error::format(path, line));
        };
        let event = match EventDefinition::from_line(body) {
            // shorten the eventual command line
            Ok(event) => event.abbreviated(),
            Err(e) => {
                error!("Failed to parse event definition -- {}: {}", line, e);
                return Err(Error::format(path, line));
            }
        };
        if is_collectable(&event, ctx) {
            group.push(event);
        } else {
            debug!("Event not collectable on target -- {}", event.name);
            uncollectable.add(&event.name);
        }
        if end_of_group {
            if group.is_empty() {
                warn!("No collectable events in group ending with {}", line);
            } else {
                groups.push(std::mem::take(&mut group));
            }
        }
    }
    if !group.is_empty() {
        warn!("Last event group in {} is not terminated by ';'", path.display());
        groups.push(group);
    }

    Ok(EventCatalog {
        groups: expand_uncore_groups(groups, ctx.metadata)?,
        uncollectable: uncollectable.finish(),
    })
}
