//! Availability derivation: per-record readiness computed from the tag
//! state of its files and file-indices, plus outstanding stage activity
//! (spec §4.9).

use std::collections::HashMap;

use crate::model::files::Availability;
use crate::model::records::RecordSnapshot;

pub struct DerivedAvailability {
    pub availability: Availability,
    pub details: HashMap<Availability, i64>,
}

/// Collapses the per-file/per-index histogram into a record-level state,
/// then overrides to `Requested` if stage activity (a submitted stage
/// Request or an unfinished stage Transfer) is outstanding for this record.
///
/// Archive activity never projects into availability — only `stage`
/// (resolved Open Question, spec §9; ground: `service.py`'s `check_running`
/// special-cases only `ColdStorageActions.STAGE`).
pub fn derive_record_availability(record: &RecordSnapshot) -> DerivedAvailability {
    let mut histogram: HashMap<Availability, i64> = HashMap::new();

    for file in &record.files {
        *histogram.entry(file.availability()).or_insert(0) += 1;
    }
    for index in &record.file_indices {
        for (state, count) in index.availability_histogram() {
            *histogram.entry(state).or_insert(0) += count;
        }
    }

    let availability = match histogram.len() {
        0 => Availability::Online,
        1 => *histogram.keys().next().unwrap(),
        _ => Availability::Partial,
    };

    DerivedAvailability {
        availability,
        details: histogram,
    }
}

/// Applies the `requested` override given outstanding stage activity.
pub fn apply_requested_override(
    derived: &mut DerivedAvailability,
    has_submitted_stage_request: bool,
    has_unfinished_stage_transfer: bool,
) {
    if has_submitted_stage_request || has_unfinished_stage_transfer {
        derived.availability = Availability::Requested;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::file_indices::FileIndex;
    use crate::model::files::File;
    use chrono::Utc;
    use uuid::Uuid;

    fn file(hot_deleted: bool) -> File {
        File {
            file_id: Uuid::new_v4(),
            record_uuid: Uuid::new_v4(),
            file_index_id: None,
            key: "f".into(),
            uri_hot: "hot://X/f".into(),
            size: 10,
            checksum: "adler32:deadbeef".into(),
            uri_cold: None,
            hot_deleted: if hot_deleted {
                Some(Utc::now().naive_utc())
            } else {
                None
            },
        }
    }

    fn snapshot(files: Vec<File>, indices: Vec<FileIndex>) -> RecordSnapshot {
        RecordSnapshot {
            uuid: Uuid::new_v4(),
            recid: "1".into(),
            files,
            file_indices: indices,
            availability: Availability::Online,
            availability_details: HashMap::new(),
            distribution: None,
        }
    }

    #[test]
    fn empty_record_is_online() {
        let derived = derive_record_availability(&snapshot(vec![], vec![]));
        assert_eq!(derived.availability, Availability::Online);
    }

    #[test]
    fn uniform_state_collapses_to_that_state() {
        let derived = derive_record_availability(&snapshot(vec![file(true), file(true)], vec![]));
        assert_eq!(derived.availability, Availability::OnDemand);
    }

    #[test]
    fn mixed_states_yield_partial() {
        let derived = derive_record_availability(&snapshot(vec![file(true), file(false)], vec![]));
        assert_eq!(derived.availability, Availability::Partial);
    }

    #[test]
    fn file_index_histogram_is_folded_in() {
        let index = FileIndex {
            file_index_id: Uuid::new_v4(),
            record_uuid: Uuid::new_v4(),
            key: "idx".into(),
            bucket: Uuid::new_v4(),
            description: None,
            files: vec![file(true)],
        };
        let derived = derive_record_availability(&snapshot(vec![file(false)], vec![index]));
        assert_eq!(derived.availability, Availability::Partial);
    }

    #[test]
    fn requested_override_applies_only_for_stage_activity() {
        let mut derived = derive_record_availability(&snapshot(vec![file(false)], vec![]));
        assert_eq!(derived.availability, Availability::Online);
        apply_requested_override(&mut derived, true, false);
        assert_eq!(derived.availability, Availability::Requested);
    }
}
