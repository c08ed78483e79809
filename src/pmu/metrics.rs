//! Loader for metric definitions.

use crate::platform::Metadata;
use crate::pmu::{arm_definition_dir, json_files, read_json, transform_conditional, Resources};
use crate::{Error, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// A named formula over event counts.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct MetricDefinition {
    /// Name of the metric.
    pub name: String,
    /// Formula, with conditionals already in ternary form.
    pub expression: String,
    /// Free text description.
    #[serde(default)]
    pub description: String,
}

/// One record of an ARM metric file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArmMetric {
    #[serde(default)]
    metric_name: String,
    #[serde(default)]
    metric_expr: String,
    #[serde(default)]
    brief_description: String,
    #[serde(default)]
    public_description: String,
}

impl ArmMetric {
    fn into_definition(self) -> Option<MetricDefinition> {
        if self.metric_name.is_empty() || self.metric_expr.is_empty() {
            return None;
        }
        let description = if self.public_description.is_empty() {
            self.brief_description
        } else {
            self.public_description
        };
        Some(MetricDefinition {
            name: self.metric_name,
            expression: self.metric_expr,
            description,
        })
    }
}

fn load_x86_metrics(
    resources: &Resources,
    override_path: Option<&Path>,
    metadata: &Metadata,
) -> Result<Vec<MetricDefinition>> {
    let path = match override_path {
        Some(path) => path.to_path_buf(),
        None => resources.x86_file("metrics", metadata, "json")?,
    };
    info!("Loading metric definitions from {}", path.display());
    read_json(&path)
}

fn load_arm_metrics(
    resources: &Resources,
    override_dir: Option<&Path>,
    metadata: &Metadata,
) -> Result<Vec<MetricDefinition>> {
    let dir = arm_definition_dir(resources, "metrics", override_dir, metadata)?;
    info!("Loading metric definitions from {}", dir.display());
    let mut metrics = Vec::new();
    for path in json_files(&dir)? {
        match read_json::<Vec<ArmMetric>>(&path) {
            Ok(records) => {
                for record in records {
                    match record.into_definition() {
                        Some(metric) => metrics.push(metric),
                        None => debug!("Skipping incomplete metric record in {}", path.display()),
                    }
                }
            }
            Err(e) => warn!("Skipping ARM metric file -- {}: {}", path.display(), e),
        }
    }
    Ok(metrics)
}

/// Load the metric definitions of the platform, or from `override_path`.
///
/// When `selected` is not empty only the named metrics are returned, in catalog order. Every
/// expression is rewritten by [`transform_conditional`].
pub fn load_metric_definitions(
    resources: &Resources,
    override_path: Option<&Path>,
    selected: &[String],
    metadata: &Metadata,
) -> Result<Vec<MetricDefinition>> {
    let mut metrics = if metadata.is_arm() {
        load_arm_metrics(resources, override_path, metadata)?
    } else {
        load_x86_metrics(resources, override_path, metadata)?
    };

    if !selected.is_empty() {
        let known: HashSet<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
        if let Some(missing) = selected.iter().find(|s| !known.contains(s.as_str())) {
            return Err(Error::Lookup(format!("metric not found: {}", missing)));
        }
        metrics.retain(|m| selected.contains(&m.name));
    }

    for metric in metrics.iter_mut() {
        metric.expression = transform_conditional(&metric.expression)?;
    }
    debug!("Loaded {} metric definitions", metrics.len());
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn intel() -> Metadata {
        Metadata {
            architecture: "x86_64".into(),
            vendor: "GenuineIntel".into(),
            microarchitecture: "SPR_XCC".into(),
            supports_fixed_tma: true,
            ..Default::default()
        }
    }

    fn neoverse() -> Metadata {
        Metadata {
            architecture: "aarch64".into(),
            vendor: "ARM".into(),
            microarchitecture: "Neoverse V2".into(),
            ..Default::default()
        }
    }

    fn override_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_x86_override() {
        let file = override_file(
            r#"[
                {"name": "metric_CPI", "expression": "a / b", "description": "cycles per instruction"},
                {"name": "metric_kernel_utilization", "expression": "(x if y > 0 else 0) / z"}
            ]"#,
        );
        let resources = Resources::new("/nonexistent");
        let metrics = load_metric_definitions(&resources, Some(file.path()), &[], &intel()).unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].description, "cycles per instruction");
        assert_eq!(metrics[1].expression, "( y > 0 ? x : 0)  / z");
        assert_eq!(metrics[1].description, "");
    }

    #[test]
    fn test_x86_fail_fast() {
        let resources = Resources::new("/nonexistent");
        let file = override_file(r#"[{"name": "metric_CPI"}]"#);
        match load_metric_definitions(&resources, Some(file.path()), &[], &intel()) {
            Err(Error::Json(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
        let file = override_file(r#"[{"name": "metric_bad", "expression": "a if b"}]"#);
        match load_metric_definitions(&resources, Some(file.path()), &[], &intel()) {
            Err(Error::ConditionalSyntax(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
        match load_metric_definitions(&resources, None, &[], &intel()) {
            Err(Error::Resource { .. }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_selected() {
        let file = override_file(
            r#"[
                {"name": "a", "expression": "1"},
                {"name": "b", "expression": "2"},
                {"name": "c", "expression": "3"}
            ]"#,
        );
        let resources = Resources::new("/nonexistent");
        let selected = vec![String::from("c"), String::from("a")];
        let metrics =
            load_metric_definitions(&resources, Some(file.path()), &selected, &intel()).unwrap();
        let names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);

        let selected = vec![String::from("d")];
        match load_metric_definitions(&resources, Some(file.path()), &selected, &intel()) {
            Err(Error::Lookup(msg)) => assert!(msg.contains('d')),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_packaged_x86() {
        let resources = Resources::bundled();
        for (vendor, uarch, fixed_tma) in &[
            ("GenuineIntel", "SPR_XCC", true),
            ("GenuineIntel", "SPR_XCC", false),
            ("GenuineIntel", "EMR_MCC", true),
            ("GenuineIntel", "EMR_MCC", false),
            ("GenuineIntel", "ICX", true),
            ("GenuineIntel", "ICX", false),
            ("AuthenticAMD", "Genoa", false),
        ] {
            let mut md = intel();
            md.vendor = String::from(*vendor);
            md.microarchitecture = String::from(*uarch);
            md.supports_fixed_tma = *fixed_tma;
            let metrics = load_metric_definitions(&resources, None, &[], &md).unwrap();
            assert!(!metrics.is_empty());
            for metric in &metrics {
                assert!(!metric.name.is_empty());
                assert!(!metric.expression.contains(" if "), "{}", metric.expression);
                assert!(!metric.expression.contains(" else "), "{}", metric.expression);
            }
        }
    }

    #[test]
    fn test_packaged_arm() {
        let metrics = load_metric_definitions(&Resources::bundled(), None, &[], &neoverse()).unwrap();
        for (name, expression, description) in &[
            (
                "branch_percentage",
                "(BR_IMMED_SPEC + BR_INDIRECT_SPEC) / INST_SPEC * 100",
                "This metric measures branch operations as a percentage of operations speculatively executed.",
            ),
            (
                "branch_misprediction_ratio",
                "BR_MIS_PRED_RETIRED / BR_RETIRED",
                "This metric measures the ratio of branches mispredicted to the total number of branches architecturally executed. This gives an indication of the effectiveness of the branch prediction unit.",
            ),
            (
                "backend_stalled_cycles",
                "STALL_BACKEND / CPU_CYCLES * 100",
                "This metric is the percentage of cycles that were stalled due to resource constraints in the backend unit of the processor.",
            ),
        ] {
            let metric = metrics
                .iter()
                .find(|m| m.name == *name)
                .unwrap_or_else(|| panic!("{} not loaded", name));
            assert_eq!(metric.expression, *expression);
            assert_eq!(metric.description, *description);
        }
    }

    #[test]
    fn test_arm_override_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("metrics.json"),
            r#"[
                {"MetricName": "ipc", "MetricExpr": "INST_RETIRED / CPU_CYCLES", "BriefDescription": "Instructions per cycle", "MetricGroup": "General"},
                {"MetricName": "no_expr", "BriefDescription": "skipped"},
                {"ArchStdEvent": "CPU_CYCLES"}
            ]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.json"), "not json").unwrap();
        let resources = Resources::new("/nonexistent");
        let metrics = load_metric_definitions(&resources, Some(dir.path()), &[], &neoverse()).unwrap();
        assert_eq!(
            metrics,
            vec![MetricDefinition {
                name: "ipc".into(),
                expression: "INST_RETIRED / CPU_CYCLES".into(),
                description: "Instructions per cycle".into(),
            }]
        );
    }
}
