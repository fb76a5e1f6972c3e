//! Three-way merge reconciliation
//!
//! [`TableStore::merge`] reconciles an incoming record set against the
//! region's current records in one pass: records are matched by a hash of
//! the `use_keys` fields, matched pairs are compared field by field,
//! unmatched incoming records become inserts, and unmatched current records
//! become delete candidates. What "differs", how an update is applied, and
//! whether anything is ever deleted are all decided by a [`MergePolicy`];
//! the engine itself only groups, matches, and batches the resulting
//! mutations.
//!
//! The default policy never deletes. Absence from an incoming set is weak
//! evidence (a partial export, a filtered feed), so destruction requires a
//! caller to opt in with a policy that says so.

use std::collections::HashSet;

use super::errors::{StoreError, StoreResult};
use super::mutate::InsertPosition;
use super::TableStore;
use crate::observability::{Logger, Severity};
use crate::record::Record;
use crate::schema::SchemaError;

/// How a merge matches, compares, and places records.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Fields whose hash identifies a record; must be non-empty
    pub use_keys: Vec<String>,
    /// Fields excluded from difference detection (volatile columns such as
    /// timestamps or counters)
    pub ignore_keys: Vec<String>,
    /// Where unmatched incoming records are inserted
    pub position: InsertPosition,
}

impl MergeOptions {
    /// Options that match on `use_keys`, compare everything else, and
    /// append inserts.
    pub fn by_keys<I, S>(use_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            use_keys: use_keys.into_iter().map(Into::into).collect(),
            ignore_keys: Vec::new(),
            position: InsertPosition::Append,
        }
    }

    /// Exclude `fields` from difference detection
    pub fn ignoring<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_keys = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Place unmatched incoming records at `position`
    pub fn inserting_at(mut self, position: InsertPosition) -> Self {
        self.position = position;
        self
    }
}

/// Counts of the row-level effects of one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Matched records whose fields changed
    pub updated: usize,
    /// Incoming records with no current match
    pub inserted: usize,
    /// Current records removed by the policy
    pub deleted: usize,
}

impl MergeOutcome {
    /// True iff the merge changed nothing
    pub fn is_noop(&self) -> bool {
        self.updated == 0 && self.inserted == 0 && self.deleted == 0
    }
}

/// Read-only merge state handed to policy callbacks.
pub struct MergeContext<'a> {
    /// Region being merged into
    pub region: &'a str,
    /// Identity fields for this merge
    pub use_keys: &'a [String],
    /// Fields excluded from difference detection
    pub ignore_keys: &'a [String],
}

impl MergeContext<'_> {
    /// Whether `field` takes part in difference detection
    pub fn is_compared(&self, field: &str) -> bool {
        !self.use_keys.iter().any(|k| k == field)
            && !self.ignore_keys.iter().any(|k| k == field)
    }
}

/// Strategy hooks for a merge.
///
/// Each hook has a conservative default: compare every non-key,
/// non-ignored field the incoming record carries, copy differing fields
/// onto the current record, and never delete. Implementors override only
/// what their reconciliation semantics change.
pub trait MergePolicy {
    /// Whether a matched pair differs enough to warrant a write.
    ///
    /// The default compares only fields the incoming record explicitly
    /// carries: a field the incoming set never mentions is unknown, not
    /// empty, and must not clobber current data.
    fn needs_update(&self, ctx: &MergeContext<'_>, current: &Record, incoming: &Record) -> bool {
        incoming
            .fields()
            .filter(|(name, _)| ctx.is_compared(name))
            .any(|(name, value)| current.value(name) != value)
    }

    /// Fold the incoming record into the current one before the write.
    fn apply_update(&self, ctx: &MergeContext<'_>, current: &mut Record, incoming: &Record) {
        for (name, value) in incoming.fields() {
            if ctx.is_compared(name) && current.value(name) != value {
                current.set(name, value.clone());
            }
        }
    }

    /// Whether a current record absent from the incoming set is deleted.
    /// Defaults to never.
    fn delete_eligible(&self, _ctx: &MergeContext<'_>, _current: &Record) -> bool {
        false
    }
}

/// The conservative defaults and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMergePolicy;

impl MergePolicy for DefaultMergePolicy {}

impl TableStore {
    /// Reconcile `incoming` against the region with the default policy.
    pub fn merge(&mut self, incoming: &[Record], options: &MergeOptions) -> StoreResult<MergeOutcome> {
        self.merge_with(incoming, options, &DefaultMergePolicy)
    }

    /// Reconcile `incoming` against the region's current records.
    ///
    /// Runs as: materialize and group current records by the `use_keys`
    /// hash, walk `incoming` in order splitting it into updates and
    /// inserts, collect policy-approved deletes from the unmatched
    /// remainder, then apply updates, deletes, and inserts as batched
    /// mutations in that order so earlier steps never shift the row
    /// numbers later steps rely on. Duplicate identities on either side
    /// fail the merge before anything is written.
    pub fn merge_with(
        &mut self,
        incoming: &[Record],
        options: &MergeOptions,
        policy: &dyn MergePolicy,
    ) -> StoreResult<MergeOutcome> {
        if options.use_keys.is_empty() {
            return Err(StoreError::Schema(SchemaError::EmptyKeySpec {
                region: self.region_name().to_string(),
            }));
        }
        self.require_fields(&options.use_keys)?;
        self.require_fields(&options.ignore_keys)?;

        let region_name = self.region_name().to_string();
        let ctx = MergeContext {
            region: &region_name,
            use_keys: &options.use_keys,
            ignore_keys: &options.ignore_keys,
        };

        let mut current = self.records_by_key(&options.use_keys)?;

        let mut updates: Vec<Record> = Vec::new();
        let mut inserts: Vec<Record> = Vec::new();
        let mut seen: HashSet<String> = HashSet::with_capacity(incoming.len());
        for record in incoming {
            let key = record.hash_key(&options.use_keys);
            if !seen.insert(key.clone()) {
                return Err(StoreError::IdentityCollision {
                    region: self.region_name().to_string(),
                    key,
                });
            }
            match current.remove(&key) {
                Some(mut matched) => {
                    if policy.needs_update(&ctx, &matched, record) {
                        policy.apply_update(&ctx, &mut matched, record);
                        updates.push(matched);
                    }
                }
                None => {
                    let mut candidate = record.clone();
                    candidate.clear_row();
                    inserts.push(candidate);
                }
            }
        }

        let deletes: Vec<Record> = current
            .into_values()
            .filter(|record| record.row().is_some() && policy.delete_eligible(&ctx, record))
            .collect();

        let updated = self.update_records(&updates)?;
        let deleted = self.delete_records(&deletes)?;
        let inserted = self.insert(&inserts, options.position)?;

        let outcome = MergeOutcome {
            updated,
            inserted,
            deleted,
        };
        Logger::log(
            Severity::Info,
            "store.merge",
            &[
                ("region", region_name.as_str()),
                ("updated", &outcome.updated.to_string()),
                ("inserted", &outcome.inserted.to_string()),
                ("deleted", &outcome.deleted.to_string()),
            ],
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridRegion, InMemoryGrid};
    use crate::record::CellValue;
    use crate::store::TableConfig;
    use std::sync::Arc;

    fn seeded() -> (Arc<InMemoryGrid>, TableStore) {
        let grid = Arc::new(InMemoryGrid::from_rows(
            vec![
                vec!["sku".into(), "qty".into(), "note".into()],
                vec!["A".into(), CellValue::Number(5.0), "old".into()],
                vec!["B".into(), CellValue::Number(3.0), CellValue::Empty],
            ],
            3,
        ));
        let store = TableStore::new(
            Arc::clone(&grid) as Arc<dyn GridRegion>,
            "stock",
            TableConfig::default(),
        )
        .unwrap();
        (grid, store)
    }

    fn sku_options() -> MergeOptions {
        MergeOptions::by_keys(["sku"])
    }

    #[test]
    fn test_merge_updates_matched_and_inserts_unmatched() {
        let (grid, mut store) = seeded();
        let incoming = vec![
            Record::from_fields([("sku", CellValue::from("A")), ("qty", CellValue::from(9i64))]),
            Record::from_fields([("sku", CellValue::from("B")), ("qty", CellValue::from(3i64))]),
            Record::from_fields([("sku", CellValue::from("C")), ("qty", CellValue::from(1i64))]),
        ];
        let outcome = store.merge(&incoming, &sku_options()).unwrap();
        assert_eq!(
            outcome,
            MergeOutcome {
                updated: 1,
                inserted: 1,
                deleted: 0
            }
        );
        assert_eq!(grid.cell(2, 2), CellValue::Number(9.0));
        // Untouched field on the updated row survives.
        assert_eq!(grid.cell(2, 3), CellValue::Text("old".into()));
        assert_eq!(grid.cell(4, 1), CellValue::Text("C".into()));
    }

    #[test]
    fn test_merge_identity_is_a_noop() {
        let (grid, mut store) = seeded();
        let current = store.records().unwrap();
        grid.clear_ops();
        let outcome = store.merge(&current, &sku_options()).unwrap();
        assert!(outcome.is_noop());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (_grid, mut store) = seeded();
        let incoming = vec![
            Record::from_fields([("sku", CellValue::from("A")), ("qty", CellValue::from(9i64))]),
            Record::from_fields([("sku", CellValue::from("C")), ("qty", CellValue::from(1i64))]),
        ];
        let first = store.merge(&incoming, &sku_options()).unwrap();
        assert!(!first.is_noop());
        let second = store.merge(&incoming, &sku_options()).unwrap();
        assert!(second.is_noop(), "second identical merge must change nothing");
    }

    #[test]
    fn test_default_policy_never_deletes() {
        let (_grid, mut store) = seeded();
        let incoming = vec![Record::from_fields([
            ("sku", CellValue::from("A")),
            ("qty", CellValue::from(5i64)),
        ])];
        let outcome = store.merge(&incoming, &sku_options()).unwrap();
        assert_eq!(outcome.deleted, 0);
        assert_eq!(store.records().unwrap().len(), 2, "B must survive");
    }

    #[test]
    fn test_policy_opt_in_deletion() {
        struct Reaper;
        impl MergePolicy for Reaper {
            fn delete_eligible(&self, _ctx: &MergeContext<'_>, _current: &Record) -> bool {
                true
            }
        }

        let (_grid, mut store) = seeded();
        let incoming = vec![Record::from_fields([
            ("sku", CellValue::from("A")),
            ("qty", CellValue::from(5i64)),
        ])];
        let outcome = store
            .merge_with(&incoming, &sku_options(), &Reaper)
            .unwrap();
        assert_eq!(outcome.deleted, 1);
        let survivors = store.records().unwrap();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].value("sku"), &CellValue::Text("A".into()));
    }

    #[test]
    fn test_ignored_fields_do_not_trigger_updates() {
        let (_grid, mut store) = seeded();
        let incoming = vec![Record::from_fields([
            ("sku", CellValue::from("A")),
            ("qty", CellValue::from(5i64)),
            ("note", CellValue::from("changed")),
        ])];
        let options = sku_options().ignoring(["note"]);
        let outcome = store.merge(&incoming, &options).unwrap();
        assert!(outcome.is_noop());
    }

    #[test]
    fn test_fields_absent_from_incoming_are_not_compared() {
        let (grid, mut store) = seeded();
        // Incoming carries no "note" field; the current note must survive.
        let incoming = vec![Record::from_fields([
            ("sku", CellValue::from("A")),
            ("qty", CellValue::from(9i64)),
        ])];
        store.merge(&incoming, &sku_options()).unwrap();
        assert_eq!(grid.cell(2, 3), CellValue::Text("old".into()));
    }

    #[test]
    fn test_duplicate_incoming_identity_fails_before_writing() {
        let (grid, mut store) = seeded();
        store.records().unwrap();
        grid.clear_ops();
        let incoming = vec![
            Record::from_fields([("sku", "X"), ("qty", "1")]),
            Record::from_fields([("sku", "X"), ("qty", "2")]),
        ];
        let result = store.merge(&incoming, &sku_options());
        assert!(matches!(result, Err(StoreError::IdentityCollision { .. })));
        assert!(grid.ops().is_empty(), "failed merge must not touch the medium");
    }

    #[test]
    fn test_empty_use_keys_is_rejected() {
        let (_grid, mut store) = seeded();
        let options = MergeOptions::by_keys(Vec::<String>::new());
        let result = store.merge(&[], &options);
        assert!(matches!(
            result,
            Err(StoreError::Schema(SchemaError::EmptyKeySpec { .. }))
        ));
    }

    #[test]
    fn test_empty_incoming_with_default_policy_is_noop() {
        let (grid, mut store) = seeded();
        store.records().unwrap();
        grid.clear_ops();
        let outcome = store.merge(&[], &sku_options()).unwrap();
        assert!(outcome.is_noop());
        assert!(grid.ops().is_empty());
    }
}
