//! Column schema for container usage batches
//!
//! Column names are shared with the upstream CSV producer and the downstream
//! recommendation engine, so every name here is reproduced verbatim.

use crate::error::{PipelineError, Result};
use csv::StringRecord;
use std::ops::{Index, IndexMut};

pub const NAMESPACE: &str = "namespace";
pub const OWNER_KIND: &str = "owner_kind";
pub const OWNER_NAME: &str = "owner_name";
pub const WORKLOAD: &str = "workload";
pub const WORKLOAD_TYPE: &str = "workload_type";
pub const CONTAINER_NAME: &str = "container_name";
pub const IMAGE_NAME: &str = "image_name";
pub const INTERVAL_START: &str = "interval_start";
pub const INTERVAL_END: &str = "interval_end";

/// Derived by the classifier, never read from input
pub const K8S_OBJECT_TYPE: &str = "k8s_object_type";
pub const K8S_OBJECT_NAME: &str = "k8s_object_name";

/// Identity columns every input batch must carry
pub const IDENTITY_COLUMNS: [&str; 9] = [
    NAMESPACE,
    OWNER_KIND,
    OWNER_NAME,
    WORKLOAD,
    WORKLOAD_TYPE,
    CONTAINER_NAME,
    IMAGE_NAME,
    INTERVAL_START,
    INTERVAL_END,
];

/// Columns of the grouping key, in output order
pub const GROUPING_COLUMNS: [&str; 8] = [
    NAMESPACE,
    K8S_OBJECT_TYPE,
    K8S_OBJECT_NAME,
    WORKLOAD,
    CONTAINER_NAME,
    IMAGE_NAME,
    INTERVAL_START,
    INTERVAL_END,
];

/// One resource dimension reported per container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    CpuRequest,
    CpuLimit,
    CpuUsage,
    CpuThrottle,
    MemoryRequest,
    MemoryLimit,
    MemoryUsage,
    MemoryRssUsage,
}

impl MetricFamily {
    pub fn column_prefix(self) -> &'static str {
        match self {
            MetricFamily::CpuRequest => "cpu_request_container",
            MetricFamily::CpuLimit => "cpu_limit_container",
            MetricFamily::CpuUsage => "cpu_usage_container",
            MetricFamily::CpuThrottle => "cpu_throttle_container",
            MetricFamily::MemoryRequest => "memory_request_container",
            MetricFamily::MemoryLimit => "memory_limit_container",
            MetricFamily::MemoryUsage => "memory_usage_container",
            MetricFamily::MemoryRssUsage => "memory_rss_usage_container",
        }
    }

    /// Families whose every statistic must be present and non-negative
    pub fn is_validated(self) -> bool {
        matches!(
            self,
            MetricFamily::CpuUsage | MetricFamily::MemoryUsage | MetricFamily::MemoryRssUsage
        )
    }
}

/// Per-interval statistic reported by the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Avg,
    Sum,
    Min,
    Max,
}

impl Statistic {
    pub fn suffix(self) -> &'static str {
        match self {
            Statistic::Avg => "avg",
            Statistic::Sum => "sum",
            Statistic::Min => "min",
            Statistic::Max => "max",
        }
    }

    /// Operator used to fold this statistic across samples of a group
    pub fn reduction(self) -> Reduction {
        match self {
            Statistic::Avg => Reduction::Mean,
            Statistic::Sum => Reduction::Sum,
            Statistic::Min => Reduction::Min,
            Statistic::Max => Reduction::Max,
        }
    }
}

/// Statistical reduction applied per column, per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reduction {
    Mean,
    Sum,
    Min,
    Max,
}

impl Reduction {
    pub fn as_str(self) -> &'static str {
        match self {
            Reduction::Mean => "mean",
            Reduction::Sum => "sum",
            Reduction::Min => "min",
            Reduction::Max => "max",
        }
    }
}

/// Every metric column that is read, validated and aggregated.
///
/// The discriminant doubles as the slot index inside [`MetricValues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricColumn {
    CpuRequestContainerAvg,
    CpuRequestContainerSum,
    CpuLimitContainerAvg,
    CpuLimitContainerSum,
    CpuUsageContainerAvg,
    CpuUsageContainerSum,
    CpuUsageContainerMin,
    CpuUsageContainerMax,
    CpuThrottleContainerAvg,
    CpuThrottleContainerSum,
    CpuThrottleContainerMax,
    MemoryRequestContainerAvg,
    MemoryRequestContainerSum,
    MemoryLimitContainerAvg,
    MemoryLimitContainerSum,
    MemoryUsageContainerAvg,
    MemoryUsageContainerSum,
    MemoryUsageContainerMin,
    MemoryUsageContainerMax,
    MemoryRssUsageContainerAvg,
    MemoryRssUsageContainerSum,
    MemoryRssUsageContainerMin,
    MemoryRssUsageContainerMax,
}

/// Number of metric columns in the aggregation table
pub const METRIC_COLUMN_COUNT: usize = 23;

impl MetricColumn {
    pub const ALL: [MetricColumn; METRIC_COLUMN_COUNT] = [
        MetricColumn::CpuRequestContainerAvg,
        MetricColumn::CpuRequestContainerSum,
        MetricColumn::CpuLimitContainerAvg,
        MetricColumn::CpuLimitContainerSum,
        MetricColumn::CpuUsageContainerAvg,
        MetricColumn::CpuUsageContainerSum,
        MetricColumn::CpuUsageContainerMin,
        MetricColumn::CpuUsageContainerMax,
        MetricColumn::CpuThrottleContainerAvg,
        MetricColumn::CpuThrottleContainerSum,
        MetricColumn::CpuThrottleContainerMax,
        MetricColumn::MemoryRequestContainerAvg,
        MetricColumn::MemoryRequestContainerSum,
        MetricColumn::MemoryLimitContainerAvg,
        MetricColumn::MemoryLimitContainerSum,
        MetricColumn::MemoryUsageContainerAvg,
        MetricColumn::MemoryUsageContainerSum,
        MetricColumn::MemoryUsageContainerMin,
        MetricColumn::MemoryUsageContainerMax,
        MetricColumn::MemoryRssUsageContainerAvg,
        MetricColumn::MemoryRssUsageContainerSum,
        MetricColumn::MemoryRssUsageContainerMin,
        MetricColumn::MemoryRssUsageContainerMax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricColumn::CpuRequestContainerAvg => "cpu_request_container_avg",
            MetricColumn::CpuRequestContainerSum => "cpu_request_container_sum",
            MetricColumn::CpuLimitContainerAvg => "cpu_limit_container_avg",
            MetricColumn::CpuLimitContainerSum => "cpu_limit_container_sum",
            MetricColumn::CpuUsageContainerAvg => "cpu_usage_container_avg",
            MetricColumn::CpuUsageContainerSum => "cpu_usage_container_sum",
            MetricColumn::CpuUsageContainerMin => "cpu_usage_container_min",
            MetricColumn::CpuUsageContainerMax => "cpu_usage_container_max",
            MetricColumn::CpuThrottleContainerAvg => "cpu_throttle_container_avg",
            MetricColumn::CpuThrottleContainerSum => "cpu_throttle_container_sum",
            MetricColumn::CpuThrottleContainerMax => "cpu_throttle_container_max",
            MetricColumn::MemoryRequestContainerAvg => "memory_request_container_avg",
            MetricColumn::MemoryRequestContainerSum => "memory_request_container_sum",
            MetricColumn::MemoryLimitContainerAvg => "memory_limit_container_avg",
            MetricColumn::MemoryLimitContainerSum => "memory_limit_container_sum",
            MetricColumn::MemoryUsageContainerAvg => "memory_usage_container_avg",
            MetricColumn::MemoryUsageContainerSum => "memory_usage_container_sum",
            MetricColumn::MemoryUsageContainerMin => "memory_usage_container_min",
            MetricColumn::MemoryUsageContainerMax => "memory_usage_container_max",
            MetricColumn::MemoryRssUsageContainerAvg => "memory_rss_usage_container_avg",
            MetricColumn::MemoryRssUsageContainerSum => "memory_rss_usage_container_sum",
            MetricColumn::MemoryRssUsageContainerMin => "memory_rss_usage_container_min",
            MetricColumn::MemoryRssUsageContainerMax => "memory_rss_usage_container_max",
        }
    }

    pub fn family(self) -> MetricFamily {
        use MetricColumn::*;
        match self {
            CpuRequestContainerAvg | CpuRequestContainerSum => MetricFamily::CpuRequest,
            CpuLimitContainerAvg | CpuLimitContainerSum => MetricFamily::CpuLimit,
            CpuUsageContainerAvg | CpuUsageContainerSum | CpuUsageContainerMin
            | CpuUsageContainerMax => MetricFamily::CpuUsage,
            CpuThrottleContainerAvg | CpuThrottleContainerSum | CpuThrottleContainerMax => {
                MetricFamily::CpuThrottle
            }
            MemoryRequestContainerAvg | MemoryRequestContainerSum => MetricFamily::MemoryRequest,
            MemoryLimitContainerAvg | MemoryLimitContainerSum => MetricFamily::MemoryLimit,
            MemoryUsageContainerAvg | MemoryUsageContainerSum | MemoryUsageContainerMin
            | MemoryUsageContainerMax => MetricFamily::MemoryUsage,
            MemoryRssUsageContainerAvg
            | MemoryRssUsageContainerSum
            | MemoryRssUsageContainerMin
            | MemoryRssUsageContainerMax => MetricFamily::MemoryRssUsage,
        }
    }

    pub fn statistic(self) -> Statistic {
        use MetricColumn::*;
        match self {
            CpuRequestContainerAvg
            | CpuLimitContainerAvg
            | CpuUsageContainerAvg
            | CpuThrottleContainerAvg
            | MemoryRequestContainerAvg
            | MemoryLimitContainerAvg
            | MemoryUsageContainerAvg
            | MemoryRssUsageContainerAvg => Statistic::Avg,
            CpuRequestContainerSum
            | CpuLimitContainerSum
            | CpuUsageContainerSum
            | CpuThrottleContainerSum
            | MemoryRequestContainerSum
            | MemoryLimitContainerSum
            | MemoryUsageContainerSum
            | MemoryRssUsageContainerSum => Statistic::Sum,
            CpuUsageContainerMin | MemoryUsageContainerMin | MemoryRssUsageContainerMin => {
                Statistic::Min
            }
            CpuUsageContainerMax
            | CpuThrottleContainerMax
            | MemoryUsageContainerMax
            | MemoryRssUsageContainerMax => Statistic::Max,
        }
    }

    pub fn reduction(self) -> Reduction {
        self.statistic().reduction()
    }

    pub fn from_name(name: &str) -> Option<MetricColumn> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Columns checked by the validity filter: every statistic of the
/// cpu usage, memory usage and memory RSS families.
pub const VALIDATED_COLUMNS: [MetricColumn; 12] = [
    MetricColumn::MemoryRssUsageContainerSum,
    MetricColumn::MemoryRssUsageContainerMax,
    MetricColumn::MemoryRssUsageContainerMin,
    MetricColumn::MemoryRssUsageContainerAvg,
    MetricColumn::MemoryUsageContainerSum,
    MetricColumn::MemoryUsageContainerMax,
    MetricColumn::MemoryUsageContainerMin,
    MetricColumn::MemoryUsageContainerAvg,
    MetricColumn::CpuUsageContainerSum,
    MetricColumn::CpuUsageContainerMax,
    MetricColumn::CpuUsageContainerMin,
    MetricColumn::CpuUsageContainerAvg,
];

/// One optional value per metric column
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricValues([Option<f64>; METRIC_COLUMN_COUNT]);

impl MetricValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: MetricColumn) -> Option<f64> {
        self.0[column.slot()]
    }

    pub fn set(&mut self, column: MetricColumn, value: Option<f64>) {
        self.0[column.slot()] = value;
    }

    /// Builder-style setter, mostly for fixtures
    pub fn with(mut self, column: MetricColumn, value: f64) -> Self {
        self.set(column, Some(value));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricColumn, Option<f64>)> + '_ {
        MetricColumn::ALL.iter().map(move |c| (*c, self.get(*c)))
    }
}

impl Index<MetricColumn> for MetricValues {
    type Output = Option<f64>;

    fn index(&self, column: MetricColumn) -> &Self::Output {
        &self.0[column.slot()]
    }
}

impl IndexMut<MetricColumn> for MetricValues {
    fn index_mut(&mut self, column: MetricColumn) -> &mut Self::Output {
        &mut self.0[column.slot()]
    }
}

/// Column positions resolved from a batch header.
///
/// Built once per batch so rows are decoded positionally afterwards.
#[derive(Debug, Clone)]
pub struct Schema {
    identity: [usize; IDENTITY_COLUMNS.len()],
    metrics: [usize; METRIC_COLUMN_COUNT],
}

impl Schema {
    /// Resolve every required column against a header row.
    ///
    /// Extra columns are ignored; the first missing one is reported.
    pub fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
        };

        let mut identity = [0usize; IDENTITY_COLUMNS.len()];
        for (slot, name) in IDENTITY_COLUMNS.iter().enumerate() {
            identity[slot] = position(name)?;
        }

        let mut metrics = [0usize; METRIC_COLUMN_COUNT];
        for column in MetricColumn::ALL {
            metrics[column.slot()] = position(column.name())?;
        }

        Ok(Self { identity, metrics })
    }

    /// Position of an identity column, `None` for names outside [`IDENTITY_COLUMNS`]
    pub fn identity_position(&self, name: &str) -> Option<usize> {
        IDENTITY_COLUMNS
            .iter()
            .position(|c| *c == name)
            .map(|slot| self.identity[slot])
    }

    pub fn metric_position(&self, column: MetricColumn) -> usize {
        self.metrics[column.slot()]
    }
}
