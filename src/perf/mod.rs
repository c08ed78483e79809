//! Helpers for assembling the `perf stat` invocation that collects an event catalog.

use crate::pmu::GroupDefinition;
use log::{debug, warn};

mod version;
pub use version::PerfVersion;

/// Events that can be counted on the fixed cycles counter.
const CYCLES_EVENTS: &[&str] = &["cycles", "cpu-cycles"];

/// Render `groups` as the value of the `-e` option, e.g. `{a,b},{c}`.
pub fn event_groups_arg(groups: &[GroupDefinition]) -> String {
    groups
        .iter()
        .map(|group| {
            let raw: Vec<&str> = group.iter().map(|e| e.raw.as_str()).collect();
            format!("{{{}}}", raw.join(","))
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Indices of the groups holding more events than there are counters to count them.
///
/// A group with a cycles event gets the fixed cycles counter on top of the `num_gp_counters`
/// general purpose ones.
pub fn oversized_groups(groups: &[GroupDefinition], num_gp_counters: usize) -> Vec<usize> {
    let mut oversized = Vec::new();
    for (idx, group) in groups.iter().enumerate() {
        let has_cycles = group
            .iter()
            .any(|e| CYCLES_EVENTS.contains(&e.name.to_lowercase().as_str()));
        let available = if has_cycles {
            num_gp_counters + 1
        } else {
            num_gp_counters
        };
        debug!("Group {} has {} events, {} counters available", idx, group.len(), available);
        if group.len() > available {
            let names: Vec<&str> = group.iter().map(|e| e.name.as_str()).collect();
            warn!(
                "Event group {} exceeds the {} available counters by {}, events may not be counted -- {}",
                idx,
                available,
                group.len() - available,
                names.join(",")
            );
            oversized.push(idx);
        }
    }
    oversized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pmu::EventDefinition;

    fn group(lines: &[&str]) -> GroupDefinition {
        lines
            .iter()
            .map(|l| EventDefinition::from_line(l).unwrap())
            .collect()
    }

    #[test]
    fn test_event_groups_arg() {
        let groups = vec![
            group(&["cpu/event=0xc0,umask=0x00,name='INST_RETIRED.ANY'/", "cpu-cycles"]),
            group(&["instructions"]),
        ];
        assert_eq!(
            event_groups_arg(&groups),
            "{cpu/event=0xc0,umask=0x00,name='INST_RETIRED.ANY'/,cpu-cycles},{instructions}"
        );
        assert_eq!(event_groups_arg(&[]), "");
    }

    #[test]
    fn test_oversized_groups() {
        let _ = env_logger::builder().is_test(true).try_init();
        let groups = vec![
            group(&["a", "b", "c"]),
            group(&["a", "b", "c", "d"]),
            group(&["a", "b", "c", "CPU-CYCLES"]),
            group(&["a", "b", "c", "d", "cycles"]),
        ];
        assert_eq!(oversized_groups(&groups, 3), vec![1, 3]);
        assert_eq!(oversized_groups(&groups, 8), Vec::<usize>::new());
    }
}
