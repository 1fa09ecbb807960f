use contactsweep_core::db::open_db_in_memory;
use contactsweep_core::{
    CancelToken, ContactRecord, DedupEngine, DeletionPlan, DuplicateGroups, GrantedCapabilities,
    NewContact, OutcomeStatus, OwnerId, SqliteContactStore,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

const NAMES: &[&str] = &["Alice", " Alice", "alice", "Bob", ""];
const NUMBERS: &[&str] = &["555-1234", "5551234", "+1 555 1234", "(555) 9999", "n/a"];

/// Records with unique owner ids drawn from a small key space so groups form.
fn records() -> impl Strategy<Value = Vec<ContactRecord>> {
    prop::collection::vec((0..NAMES.len(), 0..NUMBERS.len()), 0..24).prop_flat_map(|pairs| {
        let len = pairs.len();
        (
            Just(pairs),
            Just((1..=len as i64).collect::<Vec<_>>()).prop_shuffle(),
        )
            .prop_map(|(pairs, owners)| {
                pairs
                    .into_iter()
                    .zip(owners)
                    .map(|((name, number), owner)| {
                        ContactRecord::new(OwnerId(owner), NAMES[name], NUMBERS[number])
                    })
                    .collect::<Vec<_>>()
            })
    })
}

proptest! {
    #[test]
    fn grouping_keeps_every_record(records in records()) {
        let groups = DuplicateGroups::from_records(&records);
        prop_assert_eq!(groups.owner_count(), records.len());
    }

    #[test]
    fn plan_removes_all_but_group_maximum(records in records()) {
        let groups = DuplicateGroups::from_records(&records);
        let plan = DeletionPlan::from_groups(&groups);

        let mut expected = 0;
        for (_, ranked) in groups.duplicates() {
            let survivor = ranked[0];
            prop_assert!(!plan.contains(survivor));
            for owner in &ranked[1..] {
                prop_assert!(plan.contains(*owner));
            }
            expected += ranked.len() - 1;
        }
        // Owner ids are unique per record here, so groups never overlap.
        prop_assert_eq!(plan.len(), expected);

        let distinct: BTreeSet<_> = plan.iter().collect();
        prop_assert_eq!(distinct.len(), plan.len());
    }

    #[test]
    fn record_order_does_not_change_the_plan(records in records()) {
        let forward = DeletionPlan::from_groups(&DuplicateGroups::from_records(&records));
        let reversed_records: Vec<_> = records.iter().rev().cloned().collect();
        let reversed = DeletionPlan::from_groups(&DuplicateGroups::from_records(&reversed_records));
        prop_assert_eq!(forward, reversed);
    }

    #[test]
    fn second_run_never_succeeds_again(records in records()) {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteContactStore::new(&conn);
        for record in &records {
            store
                .insert_contact(&NewContact {
                    owner_id: record.owner_id,
                    display_name: Some(record.display_name.clone()),
                    numbers: vec![record.phone_number.clone()],
                })
                .unwrap();
        }
        let capabilities = GrantedCapabilities::all();
        let engine = DedupEngine::new(&store, &capabilities);

        let first = engine.run(&CancelToken::new());
        prop_assert!(matches!(
            first,
            OutcomeStatus::Success { .. } | OutcomeStatus::NoDuplicatesFound
        ), "unexpected first outcome: {:?}", first);
        let second = engine.run(&CancelToken::new());
        prop_assert!(matches!(second, OutcomeStatus::NoDuplicatesFound));
    }
}
