use crate::hash::DefaultHashBuilder;
use crate::table::Table;

fn table(capacity: usize) -> Table<u64, DefaultHashBuilder> {
    Table::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
}

#[test]
fn chain_places_until_full() {
    // Capacity 1 means one slot per table: two keys fit, a third must
    // be rejected.
    let mut t = table(1);
    assert!(t.insert_chain(1).is_ok());
    assert!(t.insert_chain(2).is_ok());
    assert_eq!(t.insert_chain(3), Err(3));
    assert_eq!(t.len(), 2);
}

#[test]
fn exhausted_chain_unwinds_completely() {
    let mut t = table(1);
    t.insert_chain(10).unwrap();
    t.insert_chain(20).unwrap();
    // The rejected insert displaced both residents mid-walk; the
    // unwind must have put them back.
    assert_eq!(t.insert_chain(30), Err(30));
    assert!(t.contains(&10));
    assert!(t.contains(&20));
    assert!(!t.contains(&30));
}

#[test]
fn take_clears_exactly_one_slot() {
    let mut t = table(8);
    t.insert_chain(5).unwrap();
    t.insert_chain(6).unwrap();
    assert_eq!(t.take(&5), Some(5));
    assert_eq!(t.take(&5), None);
    assert!(t.contains(&6));
    assert_eq!(t.len(), 1);
}

#[test]
fn grown_successor_doubles_and_keeps_keys() {
    let mut t = table(4);
    let mut resident = Vec::new();
    for key in 0..6u64 {
        if t.insert_chain(key).is_ok() {
            resident.push(key);
        }
    }
    let grown = t.grown_successor();
    assert_eq!(grown.capacity(), 8);
    assert_eq!(grown.max_displacements(), 4);
    assert_eq!(grown.len(), resident.len());
    for key in &resident {
        assert!(grown.contains(key));
    }
    // The donor was drained, not copied.
    assert_eq!(t.len(), 0);
}

#[test]
fn placement_invariant_holds_through_churn() {
    let mut t = table(4);
    let mut next_key = 0u64;
    for _ in 0..6 {
        for _ in 0..8 {
            let mut key = next_key;
            while let Err(rejected) = t.insert_chain(key) {
                t = t.grown_successor();
                key = rejected;
            }
            next_key += 1;
        }
        // Thin the population so later rounds mix takes and inserts.
        for key in (0..next_key).step_by(3) {
            t.take(&key);
        }
        t.assert_placement();
    }
}

#[test]
fn racy_probe_agrees_with_exclusive_lookup() {
    let mut t = table(16);
    for key in 0..10u64 {
        t.insert_chain(key).unwrap();
    }
    for key in 0..20u64 {
        assert_eq!(t.probe_racy(&key), t.contains(&key));
    }
    assert_eq!(t.len_racy(), t.len());
}
