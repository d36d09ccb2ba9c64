//! Workload identity resolution
//!
//! Each sample names its direct owner (`owner_kind`/`owner_name`) and the
//! top-level controller the producer resolved (`workload`/`workload_type`).
//! A ReplicaSet or ReplicationController with no managing controller is
//! reported with the workload sentinel [`UNOWNED_WORKLOAD`]; such an owner is
//! itself the workload.

use crate::models::{ClassifiedRow, SampleBatch, SampleRow, WorkloadKind};

/// Producer value for `workload` when the owner has no managing controller
pub const UNOWNED_WORKLOAD: &str = "<none>";

/// Resolved object type and name for a sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub object_type: String,
    pub object_name: String,
}

/// Whether a sample carries every field the classifier reads
pub fn has_owner_info(row: &SampleRow) -> bool {
    !row.owner_kind.is_empty()
        && !row.owner_name.is_empty()
        && !row.workload.is_empty()
        && !row.workload_type.is_empty()
}

/// Resolve the workload a sample belongs to.
///
/// Pure; rows are classified independently of each other.
pub fn classify(row: &SampleRow) -> ObjectRef {
    let owner_kind = row.owner_kind.to_lowercase();
    let unowned = row.workload == UNOWNED_WORKLOAD;

    let bare_controller = [WorkloadKind::ReplicaSet, WorkloadKind::ReplicationController]
        .into_iter()
        .find(|kind| unowned && owner_kind == kind.as_str());

    match bare_controller {
        Some(kind) => ObjectRef {
            object_type: kind.as_str().to_string(),
            object_name: row.owner_name.clone(),
        },
        None => ObjectRef {
            object_type: row.workload_type.clone(),
            object_name: row.workload.clone(),
        },
    }
}

/// Drop samples missing owner information and classify the rest.
///
/// Returns the classified rows and the number of rows dropped.
pub fn classify_batch(batch: SampleBatch) -> (Vec<ClassifiedRow>, usize) {
    let input = batch.len();
    let classified: Vec<ClassifiedRow> = batch
        .into_rows()
        .into_iter()
        .filter(has_owner_info)
        .map(|sample| {
            let object = classify(&sample);
            ClassifiedRow {
                sample,
                k8s_object_type: object.object_type,
                k8s_object_name: object.object_name,
            }
        })
        .collect();

    let dropped = input - classified.len();
    (classified, dropped)
}
