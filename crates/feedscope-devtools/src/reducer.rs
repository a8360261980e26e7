//! Materialize a mutation history into the latest record per object.
//!
//! Records are applied in input order and a later record for an id replaces
//! the earlier one. There is no merging.

use feedscope_core::{MutationRecord, ObjectId};
use indexmap::IndexMap;
use tracing::debug;

use crate::errors::{Result, ValidationError};

/// Latest record per object id, in first-seen order of ids.
pub type MaterializedMap = IndexMap<String, MutationRecord>;

/// Reduce `records` to the latest record per id.
///
/// Every record is validated before anything is returned: the first record
/// with a malformed id or no derivable typename fails the whole batch.
pub fn reduce_mutations(records: &[MutationRecord]) -> Result<MaterializedMap> {
    for (index, record) in records.iter().enumerate() {
        validate(index, record)?;
    }

    let mut map = MaterializedMap::with_capacity(records.len());
    for record in records {
        let _ = map.insert(record.id.clone(), record.clone());
    }
    debug!(records = records.len(), objects = map.len(), "mutations reduced");
    Ok(map)
}

fn validate(index: usize, record: &MutationRecord) -> Result<()> {
    if !ObjectId::is_valid(&record.id) {
        return Err(ValidationError::InvalidObjectId {
            index,
            id: record.id.clone(),
        });
    }
    if record.typename().is_none() {
        return Err(ValidationError::MissingTypename {
            index,
            id: record.id.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(id: &str, version: u64) -> MutationRecord {
        MutationRecord::new(id, "example.Task", json!({ "version": version }))
    }

    #[test]
    fn later_record_wins() {
        let a = ObjectId::new().to_string();
        let b = ObjectId::new().to_string();
        let map = reduce_mutations(&[record(&a, 1), record(&b, 1), record(&a, 2)]).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&a].payload["version"], 2);
        assert_eq!(map.keys().cloned().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn empty_batch_is_empty_map() {
        assert!(reduce_mutations(&[]).unwrap().is_empty());
    }

    #[test]
    fn invalid_id_rejects_batch() {
        let good = record(&ObjectId::new().to_string(), 1);
        let bad = record("not-an-id", 1);
        assert_matches!(
            reduce_mutations(&[good, bad]),
            Err(ValidationError::InvalidObjectId { index: 1, .. })
        );
    }

    #[test]
    fn missing_typename_rejects_batch() {
        let id = ObjectId::new().to_string();
        let untyped = MutationRecord {
            id: id.clone(),
            typename: None,
            payload: json!({}),
        };
        assert_matches!(
            reduce_mutations(&[record(&id, 1), untyped]),
            Err(ValidationError::MissingTypename { index: 1, .. })
        );
    }

    #[test]
    fn payload_type_counts_as_typename() {
        let untyped = MutationRecord {
            id: ObjectId::new().to_string(),
            typename: None,
            payload: json!({ "@type": "example.Note" }),
        };
        assert_eq!(reduce_mutations(&[untyped]).unwrap().len(), 1);
    }

    proptest! {
        #[test]
        fn one_entry_per_distinct_id(picks in prop::collection::vec(0usize..5, 0..40)) {
            let ids: Vec<String> = (0..5).map(|_| ObjectId::new().to_string()).collect();
            let records: Vec<MutationRecord> = picks
                .iter()
                .enumerate()
                .map(|(i, &p)| record(&ids[p], i as u64))
                .collect();

            let map = reduce_mutations(&records).unwrap();

            let mut distinct = picks.clone();
            distinct.sort_unstable();
            distinct.dedup();
            prop_assert_eq!(map.len(), distinct.len());

            for (i, &p) in picks.iter().enumerate() {
                let last = picks.iter().rposition(|&q| q == p).unwrap();
                if i == last {
                    prop_assert_eq!(&map[&ids[p]].payload["version"], &json!(i as u64));
                }
            }
        }
    }
}
