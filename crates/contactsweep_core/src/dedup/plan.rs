//! Duplicate grouping and deletion planning.
//!
//! # Invariants
//! - Every valid record contributes exactly one entry to exactly one group.
//! - A group is a duplicate group when it holds more than one distinct owner.
//! - Per duplicate group the plan receives its distinct owners except the
//!   maximum, in descending order. Groups are visited in key order.
//! - An owner planned by an earlier group is not planned again.

use crate::model::contact::{ContactRecord, NormalizedKey, OwnerId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Owner ids per matching key, in snapshot order within each key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateGroups {
    groups: BTreeMap<NormalizedKey, Vec<OwnerId>>,
}

impl DuplicateGroups {
    pub fn from_records<'r>(records: impl IntoIterator<Item = &'r ContactRecord>) -> Self {
        let mut groups: BTreeMap<NormalizedKey, Vec<OwnerId>> = BTreeMap::new();
        for record in records {
            groups.entry(record.key()).or_default().push(record.owner_id);
        }
        Self { groups }
    }

    /// Number of keys, duplicate or not.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total entries across all groups; equals the number of records grouped.
    pub fn owner_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn get(&self, key: &NormalizedKey) -> Option<&[OwnerId]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NormalizedKey, &[OwnerId])> {
        self.groups.iter().map(|(key, owners)| (key, owners.as_slice()))
    }

    /// Duplicate groups with their distinct owners sorted descending.
    ///
    /// The first owner of each returned list is the survivor.
    pub fn duplicates(&self) -> impl Iterator<Item = (&NormalizedKey, Vec<OwnerId>)> {
        self.groups.iter().filter_map(|(key, owners)| {
            let ranked = ranked_distinct(owners);
            (ranked.len() > 1).then_some((key, ranked))
        })
    }

    pub fn duplicate_count(&self) -> usize {
        self.duplicates().count()
    }
}

/// Ordered owner ids selected for removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeletionPlan {
    owners: Vec<OwnerId>,
}

impl DeletionPlan {
    pub fn from_groups(groups: &DuplicateGroups) -> Self {
        let mut planned = BTreeSet::new();
        let mut owners = Vec::new();
        for (_, ranked) in groups.duplicates() {
            for owner_id in ranked.into_iter().skip(1) {
                if planned.insert(owner_id) {
                    owners.push(owner_id);
                }
            }
        }
        Self { owners }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn contains(&self, owner_id: OwnerId) -> bool {
        self.owners.contains(&owner_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = OwnerId> + '_ {
        self.owners.iter().copied()
    }

    pub fn as_slice(&self) -> &[OwnerId] {
        &self.owners
    }
}

fn ranked_distinct(owners: &[OwnerId]) -> Vec<OwnerId> {
    let mut ranked = owners.to_vec();
    ranked.sort_unstable_by(|left, right| right.cmp(left));
    ranked.dedup();
    ranked
}

#[cfg(test)]
mod tests {
    use super::{DeletionPlan, DuplicateGroups};
    use crate::model::contact::{ContactRecord, NormalizedKey, OwnerId};

    fn record(owner: i64, name: &str, number: &str) -> ContactRecord {
        ContactRecord::new(OwnerId(owner), name, number)
    }

    #[test]
    fn groups_preserve_insertion_order_and_count() {
        let records = vec![
            record(6, "Ann", "1-2"),
            record(2, "Ann", "12"),
            record(9, "Ann", "(1)2"),
            record(4, "Bo", "12"),
        ];
        let groups = DuplicateGroups::from_records(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.owner_count(), records.len());
        assert_eq!(
            groups.get(&NormalizedKey::new("12", "Ann")),
            Some(&[OwnerId(6), OwnerId(2), OwnerId(9)][..])
        );
        assert_eq!(groups.duplicate_count(), 1);
    }

    #[test]
    fn plan_keeps_maximum_and_orders_descending() {
        let records = vec![
            record(5, "Eve", "777"),
            record(7, "Eve", "7-7-7"),
            record(6, "Eve", "+777"),
        ];
        let plan = DeletionPlan::from_groups(&DuplicateGroups::from_records(&records));

        assert_eq!(plan.as_slice(), &[OwnerId(6), OwnerId(5)]);
        assert!(!plan.contains(OwnerId(7)));
    }

    #[test]
    fn same_owner_listed_twice_is_not_a_duplicate() {
        let records = vec![record(3, "Kim", "555-0100"), record(3, "Kim", "5550100")];
        let groups = DuplicateGroups::from_records(&records);

        assert_eq!(groups.owner_count(), 2);
        assert_eq!(groups.duplicate_count(), 0);
        assert!(DeletionPlan::from_groups(&groups).is_empty());
    }

    #[test]
    fn owner_planned_by_two_groups_appears_once() {
        let records = vec![
            record(1, "Lee", "100"),
            record(9, "Lee", "100"),
            record(1, "Lee", "200"),
            record(8, "Lee", "200"),
        ];
        let plan = DeletionPlan::from_groups(&DuplicateGroups::from_records(&records));
        assert_eq!(plan.as_slice(), &[OwnerId(1)]);
    }

    #[test]
    fn same_number_with_different_names_is_not_grouped() {
        let records = vec![record(10, "Alice", "5551234"), record(11, "Bob", "5551234")];
        let groups = DuplicateGroups::from_records(&records);
        assert_eq!(groups.duplicate_count(), 0);
        assert!(DeletionPlan::from_groups(&groups).is_empty());
    }
}
