//! Core data models for usage batches

use crate::schema::{self, MetricColumn, MetricValues};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One per-container usage sample as reported upstream
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleRow {
    pub namespace: String,
    pub owner_kind: String,
    pub owner_name: String,
    pub workload: String,
    pub workload_type: String,
    pub container_name: String,
    pub image_name: String,
    /// Kept verbatim; grouping compares interval bounds as exact strings
    pub interval_start: String,
    pub interval_end: String,
    pub metrics: MetricValues,
}

/// A sample with its resolved workload identity
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow {
    pub sample: SampleRow,
    pub k8s_object_type: String,
    pub k8s_object_name: String,
}

/// Workload-owning controller kinds that receive recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    DaemonSet,
    Deployment,
    DeploymentConfig,
    ReplicaSet,
    ReplicationController,
    StatefulSet,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 6] = [
        WorkloadKind::DaemonSet,
        WorkloadKind::Deployment,
        WorkloadKind::DeploymentConfig,
        WorkloadKind::ReplicaSet,
        WorkloadKind::ReplicationController,
        WorkloadKind::StatefulSet,
    ];

    /// Literal used by the upstream producer for this kind
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadKind::DaemonSet => "daemonset",
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::DeploymentConfig => "deploymentconfig",
            WorkloadKind::ReplicaSet => "replicaset",
            WorkloadKind::ReplicationController => "replicationcontroller",
            WorkloadKind::StatefulSet => "statefulset",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for object types outside the supported controller set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedKind(pub String);

impl fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported workload kind `{}`", self.0)
    }
}

impl std::error::Error for UnsupportedKind {}

impl FromStr for WorkloadKind {
    type Err = UnsupportedKind;

    /// Exact match on the producer literals; no case folding
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnsupportedKind(s.to_string()))
    }
}

/// A classified sample whose object type is a supported controller kind
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadRow {
    pub sample: SampleRow,
    pub kind: WorkloadKind,
    pub k8s_object_name: String,
}

impl WorkloadRow {
    pub fn grouping_key(&self) -> GroupingKey {
        GroupingKey {
            namespace: self.sample.namespace.clone(),
            k8s_object_type: self.kind,
            k8s_object_name: self.k8s_object_name.clone(),
            workload: self.sample.workload.clone(),
            container_name: self.sample.container_name.clone(),
            image_name: self.sample.image_name.clone(),
            interval_start: self.sample.interval_start.clone(),
            interval_end: self.sample.interval_end.clone(),
        }
    }
}

/// Rows sharing all eight fields fold into one aggregate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupingKey {
    pub namespace: String,
    pub k8s_object_type: WorkloadKind,
    pub k8s_object_name: String,
    pub workload: String,
    pub container_name: String,
    pub image_name: String,
    pub interval_start: String,
    pub interval_end: String,
}

impl GroupingKey {
    /// Key fields as strings, in [`schema::GROUPING_COLUMNS`] order
    pub fn fields(&self) -> [&str; 8] {
        [
            self.namespace.as_str(),
            self.k8s_object_type.as_str(),
            self.k8s_object_name.as_str(),
            self.workload.as_str(),
            self.container_name.as_str(),
            self.image_name.as_str(),
            self.interval_start.as_str(),
            self.interval_end.as_str(),
        ]
    }
}

/// One workload container over one interval, with reduced metrics
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub key: GroupingKey,
    pub metrics: MetricValues,
}

impl AggregatedRow {
    pub fn get(&self, column: MetricColumn) -> Option<f64> {
        self.metrics.get(column)
    }
}

impl Serialize for AggregatedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(
            schema::GROUPING_COLUMNS.len() + MetricColumn::ALL.len(),
        ))?;
        for (name, value) in schema::GROUPING_COLUMNS.iter().zip(self.key.fields()) {
            map.serialize_entry(name, value)?;
        }
        for (column, value) in self.metrics.iter() {
            map.serialize_entry(column.name(), &value)?;
        }
        map.end()
    }
}

/// Raw input batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBatch {
    rows: Vec<SampleRow>,
}

impl SampleBatch {
    pub fn new(rows: Vec<SampleRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleRow> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<SampleRow> {
        self.rows
    }
}

impl From<Vec<SampleRow>> for SampleBatch {
    fn from(rows: Vec<SampleRow>) -> Self {
        Self::new(rows)
    }
}

/// Pipeline output handed to the recommendation engine
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregatedBatch {
    rows: Vec<AggregatedRow>,
}

impl AggregatedBatch {
    pub fn new(rows: Vec<AggregatedRow>) -> Self {
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregatedRow> {
        self.rows.iter()
    }

    /// Find the aggregate for a given key
    pub fn find(&self, key: &GroupingKey) -> Option<&AggregatedRow> {
        self.rows.iter().find(|r| &r.key == key)
    }

    pub fn into_rows(self) -> Vec<AggregatedRow> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_kind_literals() {
        for kind in WorkloadKind::ALL {
            assert_eq!(kind.as_str().parse::<WorkloadKind>(), Ok(kind));
            assert_eq!(kind.to_string(), kind.as_str());
        }
        assert_eq!(
            "Deployment".parse::<WorkloadKind>(),
            Err(UnsupportedKind("Deployment".to_string()))
        );
        assert!("job".parse::<WorkloadKind>().is_err());
        assert!("pod".parse::<WorkloadKind>().is_err());
        assert!("".parse::<WorkloadKind>().is_err());
    }

    #[test]
    fn test_workload_kind_serde() {
        let json = serde_json::to_string(&WorkloadKind::DeploymentConfig).unwrap();
        assert_eq!(json, "\"deploymentconfig\"");
        let kind: WorkloadKind = serde_json::from_str("\"statefulset\"").unwrap();
        assert_eq!(kind, WorkloadKind::StatefulSet);
    }

    #[test]
    fn test_aggregated_row_serializes_flat() {
        let row = AggregatedRow {
            key: GroupingKey {
                namespace: "ns".to_string(),
                k8s_object_type: WorkloadKind::ReplicaSet,
                k8s_object_name: "rs-123".to_string(),
                workload: "<none>".to_string(),
                container_name: "app".to_string(),
                image_name: "quay.io/app:1".to_string(),
                interval_start: "2023-01-01 00:00:00 +0000 UTC".to_string(),
                interval_end: "2023-01-01 00:14:59 +0000 UTC".to_string(),
            },
            metrics: MetricValues::new().with(MetricColumn::CpuUsageContainerSum, 8.0),
        };

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["k8s_object_type"], "replicaset");
        assert_eq!(value["k8s_object_name"], "rs-123");
        assert_eq!(value["cpu_usage_container_sum"], 8.0);
        assert!(value["cpu_usage_container_avg"].is_null());
        assert_eq!(
            value.as_object().unwrap().len(),
            schema::GROUPING_COLUMNS.len() + MetricColumn::ALL.len()
        );
    }
}
