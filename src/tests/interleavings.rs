//! Shuttle interleaving checks for the concurrent backends. Tiny
//! capacities so displacement, relocation and resize all happen inside
//! the explored schedules.

use shuttle::{sync::Arc, thread};

use crate::locked::LockedSet;
use crate::set::CuckooSet;
use crate::txn::TransactionalSet;

fn concurrent_adds_all_land<S>(set: S)
where
    S: CuckooSet<u64> + Send + Sync + 'static,
{
    let set = Arc::new(set);
    let mut handles = Vec::new();
    for t in 0..3u64 {
        let set = Arc::clone(&set);
        handles.push(thread::spawn(move || {
            for k in 0..4u64 {
                assert!(set.add(t * 10 + k));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(set.size(), 12);
    for t in 0..3u64 {
        for k in 0..4u64 {
            assert!(set.contains(&(t * 10 + k)));
        }
    }
}

fn racing_add_keeps_one_winner<S>(set: S)
where
    S: CuckooSet<u64> + Send + Sync + 'static,
{
    let set = Arc::new(set);
    set.add(1);
    set.add(2);
    let first = {
        let set = Arc::clone(&set);
        thread::spawn(move || (set.add(3) as i64) - (set.remove(&1) as i64))
    };
    let second = {
        let set = Arc::clone(&set);
        thread::spawn(move || (set.add(3) as i64) - (set.remove(&2) as i64))
    };
    let delta = first.join().unwrap() + second.join().unwrap();
    // Exactly one add(3) may win, so the size law pins the outcome.
    assert_eq!(set.size() as i64, 2 + delta);
    assert!(set.contains(&3));
}

fn add_remove_pairs_settle<S>(set: S)
where
    S: CuckooSet<u64> + Send + Sync + 'static,
{
    let set = Arc::new(set);
    for k in 0..4u64 {
        set.add(k);
    }
    let mut handles = Vec::new();
    for t in 0..2u64 {
        let set = Arc::clone(&set);
        handles.push(thread::spawn(move || {
            let key = 100 + t;
            for _ in 0..3 {
                assert!(set.add(key));
                assert!(set.remove(&key));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(set.size(), 4);
    for k in 0..4u64 {
        assert!(set.contains(&k));
    }
}

#[test]
fn shuttle_locked_concurrent_adds() {
    shuttle::check_random(|| concurrent_adds_all_land(LockedSet::new(2)), 500);
}

#[test]
fn shuttle_locked_racing_add() {
    shuttle::check_random(|| racing_add_keeps_one_winner(LockedSet::new(2)), 500);
}

#[test]
fn shuttle_locked_add_remove_pairs() {
    shuttle::check_random(|| add_remove_pairs_settle(LockedSet::new(2)), 500);
}

#[test]
fn shuttle_txn_concurrent_adds() {
    shuttle::check_random(|| concurrent_adds_all_land(TransactionalSet::new(2)), 500);
}

#[test]
fn shuttle_txn_racing_add() {
    shuttle::check_random(|| racing_add_keeps_one_winner(TransactionalSet::new(2)), 500);
}

#[test]
fn shuttle_txn_add_remove_pairs() {
    let mut config = shuttle::Config::default();
    config.max_steps = shuttle::MaxSteps::None;
    let mut runner = shuttle::PortfolioRunner::new(true, config);
    runner.add(shuttle::scheduler::PctScheduler::new(5, 400));
    runner.add(shuttle::scheduler::PctScheduler::new(5, 400));
    runner.run(|| add_remove_pairs_settle(TransactionalSet::new(2)));
}
