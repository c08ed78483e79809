//! Expansion of uncore event groups into one group per uncore device.

use crate::platform::Metadata;
use crate::pmu::{EventDefinition, GroupDefinition};
use crate::{Error, Result};
use lazy_static::lazy_static;
use log::warn;
use regex::{Captures, Regex};

lazy_static! {
    /// Captures unit type, event code, umask (with any trailing parameters) and name of an uncore
    /// event, e.g. `cha/event=0x35,umask=0xc80ffe01,name='UNC_CHA_TOR_INSERTS.IA_MISS_CRD'/`.
    static ref UNCORE_EVENT: Regex =
        Regex::new(r"(\w+)/event=(0x[0-9a-fA-F]+),umask=(0x[0-9a-fA-F]+.*),name='(.*)'").unwrap();
}

/// How a vendor names the PMU unit and event of one uncore device.
#[derive(Debug)]
struct UncoreRewrite {
    /// Vendor the rule applies to, `None` matches every vendor.
    vendor: Option<&'static str>,
    /// Template of the unit, `{type}` and `{id}` are substituted.
    unit: &'static str,
    /// Template of the event name, `{name}` and `{id}` are substituted.
    name: &'static str,
}

/// Rewrite rules, the first rule matching the vendor is used.
const UNCORE_REWRITES: &[UncoreRewrite] = &[
    UncoreRewrite {
        vendor: Some("AuthenticAMD"),
        unit: "amd_{type}",
        name: "{name}",
    },
    UncoreRewrite {
        vendor: None,
        unit: "uncore_{type}_{id}",
        name: "{name}.{id}",
    },
];

impl UncoreRewrite {
    fn for_vendor(vendor: &str) -> &'static UncoreRewrite {
        UNCORE_REWRITES
            .iter()
            .find(|r| r.vendor.map_or(true, |v| v == vendor))
            .unwrap_or(&UNCORE_REWRITES[UNCORE_REWRITES.len() - 1])
    }

    /// Rewrite one matched event for device `id`.
    fn apply(&self, caps: &Captures, id: u32, device: &str) -> EventDefinition {
        let id = id.to_string();
        let name = self.name.replace("{name}", &caps[4]).replace("{id}", &id);
        let unit = self.unit.replace("{type}", &caps[1]).replace("{id}", &id);
        EventDefinition {
            raw: format!(
                "{}/event={},umask={},name='{}'/",
                unit, &caps[2], &caps[3], name
            ),
            name,
            device: String::from(device),
            description: String::default(),
        }
    }
}

/// Clone `group` once for every id in `ids`, retargeting each event at that device.
fn expand_group(group: &GroupDefinition, ids: &[u32], vendor: &str) -> Result<Vec<GroupDefinition>> {
    let rewrite = UncoreRewrite::for_vendor(vendor);
    ids.iter()
        .map(|&id| {
            group
                .iter()
                .map(|event| match UNCORE_EVENT.captures(&event.raw) {
                    Some(caps) => Ok(rewrite.apply(&caps, id, &event.device)),
                    None => Err(Error::format("uncore group", &event.raw)),
                })
                .collect::<Result<GroupDefinition>>()
        })
        .collect()
}

/// Expand every uncore group into one group per known device of its type.
///
/// A group's device type is read from its first event; groups of other types pass through
/// unchanged. Groups whose type has no known devices are dropped.
pub fn expand_uncore_groups(
    groups: Vec<GroupDefinition>,
    metadata: &Metadata,
) -> Result<Vec<GroupDefinition>> {
    let mut expanded = Vec::with_capacity(groups.len());
    for group in groups {
        let ids = match group.device().and_then(|d| metadata.uncore_device_ids.get(d)) {
            Some(ids) => ids,
            None => {
                expanded.push(group);
                continue;
            }
        };
        if ids.is_empty() {
            warn!("No uncore devices found -- {}", group.device().unwrap_or(""));
            continue;
        }
        expanded.extend(expand_group(&group, ids, &metadata.vendor)?);
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(vendor: &str) -> Metadata {
        let mut metadata = Metadata {
            vendor: vendor.into(),
            ..Default::default()
        };
        metadata.uncore_device_ids.insert("cha".into(), vec![0, 1, 2]);
        metadata.uncore_device_ids.insert("l3".into(), vec![0, 1]);
        metadata.uncore_device_ids.insert("upi".into(), vec![]);
        metadata
    }

    fn group(lines: &[&str]) -> GroupDefinition {
        lines
            .iter()
            .map(|l| EventDefinition::from_line(l).unwrap())
            .collect()
    }

    #[test]
    fn test_expand_intel() {
        let cha = group(&[
            "cha/event=0x35,umask=0xc80ffe01,name='UNC_CHA_TOR_INSERTS.IA_MISS_CRD'/",
            "cha/event=0x36,umask=0x21,config1=0x4043300000000,name='UNC_CHA_TOR_OCCUPANCY.IA_MISS.0x40433'/",
        ]);
        let groups = expand_uncore_groups(vec![cha], &metadata("GenuineIntel")).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(
            groups[0][0].raw,
            "uncore_cha_0/event=0x35,umask=0xc80ffe01,name='UNC_CHA_TOR_INSERTS.IA_MISS_CRD.0'/"
        );
        assert_eq!(groups[0][0].name, "UNC_CHA_TOR_INSERTS.IA_MISS_CRD.0");
        assert_eq!(
            groups[2][1].raw,
            "uncore_cha_2/event=0x36,umask=0x21,config1=0x4043300000000,name='UNC_CHA_TOR_OCCUPANCY.IA_MISS.0x40433.2'/"
        );
        let mut raws: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.iter().map(|e| e.raw.as_str()))
            .collect();
        raws.sort();
        raws.dedup();
        assert_eq!(raws.len(), 6);
        for g in &groups {
            assert_eq!(g.len(), 2);
            assert!(g.iter().all(|e| e.device == "cha"));
        }
    }

    #[test]
    fn test_expand_amd() {
        let l3 = group(&["l3/event=0x04,umask=0xff,name='L3_LOOKUP_STATE.ALL_COHERENT_ACCESSES_TO_L3'/"]);
        let groups = expand_uncore_groups(vec![l3], &metadata("AuthenticAMD")).unwrap();
        assert_eq!(groups.len(), 2);
        for g in &groups {
            assert_eq!(
                g[0].raw,
                "amd_l3/event=0x04,umask=0xff,name='L3_LOOKUP_STATE.ALL_COHERENT_ACCESSES_TO_L3'/"
            );
            assert_eq!(g[0].name, "L3_LOOKUP_STATE.ALL_COHERENT_ACCESSES_TO_L3");
        }
    }

    #[test]
    fn test_expand_preserves_order() {
        let core = group(&["cpu-cycles", "instructions"]);
        let cha = group(&["cha/event=0x01,umask=0x00,name='UNC_CHA_CLOCKTICKS'/"]);
        let upi = group(&["upi/event=0x02,umask=0x0f,name='UNC_UPI_TxL_FLITS.ALL_DATA'/"]);
        let tail = group(&["ref-cycles"]);
        let groups = expand_uncore_groups(
            vec![core.clone(), cha, upi, tail.clone()],
            &metadata("GenuineIntel"),
        )
        .unwrap();
        // upi has no devices
        assert_eq!(groups.len(), 5);
        assert_eq!(groups[0], core);
        let names: Vec<&str> = groups[1..4].iter().map(|g| g[0].name.as_str()).collect();
        assert_eq!(
            names,
            vec!["UNC_CHA_CLOCKTICKS.0", "UNC_CHA_CLOCKTICKS.1", "UNC_CHA_CLOCKTICKS.2"]
        );
        assert_eq!(groups[4], tail);
    }

    #[test]
    fn test_expand_unexpected_format() {
        let bad = group(&["cha/event=0x01,period=1,name='UNC_CHA_CLOCKTICKS'/"]);
        match expand_uncore_groups(vec![bad], &metadata("GenuineIntel")) {
            Err(Error::Format { content, .. }) => assert!(content.contains("UNC_CHA_CLOCKTICKS")),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
