//! Decide whether an event can be collected on the target platform.

use crate::platform::CollectionContext;
use crate::pmu::EventDefinition;
use log::debug;

/// Event counted by the fixed TMA slots counter.
const TOPDOWN_SLOTS: &str = "TOPDOWN.SLOTS";
/// Prefix of the fixed TMA metric events.
const PERF_METRICS_PREFIX: &str = "PERF_METRICS.";
/// Events that can only be counted with PEBS.
const PEBS_EVENTS: &[&str] = &["INT_MISC.UNKNOWN_BRANCH_CYCLES", "UOPS_RETIRED.MS"];
/// Prefixes of off-core response events.
const OCR_PREFIXES: &[&str] = &["OCR", "OFFCORE_REQUESTS_OUTSTANDING"];
/// Prefix of uncore event names.
pub(crate) const UNCORE_PREFIX: &str = "UNC";

fn is_ocr(name: &str) -> bool {
    OCR_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Check if `event` can be collected within `ctx`.
///
/// Rules are evaluated in order and the first one that applies decides.
pub fn is_collectable(event: &EventDefinition, ctx: &CollectionContext) -> bool {
    let metadata = ctx.metadata;
    let name = event.name.as_str();

    // fixed-counter TMA
    if name == TOPDOWN_SLOTS || name.starts_with(PERF_METRICS_PREFIX) {
        if !metadata.supports_fixed_tma {
            debug!("Fixed counter TMA not supported on target -- {}", name);
            return false;
        }
    }
    if PEBS_EVENTS.contains(&name) && !metadata.supports_pebs {
        debug!("PEBS events not supported on target -- {}", name);
        return false;
    }

    if event.device == "cpu" {
        if !is_ocr(name) {
            return true;
        }
        if !(metadata.supports_ocr && metadata.supports_uncore) {
            debug!("Off-core response events not supported on target -- {}", name);
            return false;
        }
        if ctx.scope.is_restricted() {
            debug!("Off-core response events not supported in {:?} scope -- {}", ctx.scope, name);
            return false;
        }
        return true;
    }

    if name.starts_with(UNCORE_PREFIX) && !metadata.supports_uncore {
        debug!("Uncore events not supported on target -- {}", name);
        return false;
    }

    if !event.device.is_empty() {
        if ctx.scope.is_restricted() {
            debug!("Uncore events not supported in {:?} scope -- {}", ctx.scope, name);
            return false;
        }
        if !metadata.uncore_device_ids.contains_key(&event.device) {
            debug!("Uncore device not found -- {}", event.device);
            return false;
        }
        if !(event.raw.contains("umask") && event.raw.contains("event")) {
            debug!("Uncore event missing umask or event -- {}", name);
            return false;
        }
        return true;
    }

    if name.contains("ref-cycles") && !metadata.supports_ref_cycles {
        debug!("ref-cycles not supported on target -- {}", name);
        return false;
    }
    if ctx.scope.is_restricted() && (name.contains("cstate_") || name.contains("power/energy")) {
        debug!("Cstate and power events not supported in {:?} scope -- {}", ctx.scope, name);
        return false;
    }
    let base_name = event.base_name();
    if !metadata.perf_supported_events.contains(base_name) {
        debug!("Event not supported by perf -- {}", base_name);
        return false;
    }
    true
}
