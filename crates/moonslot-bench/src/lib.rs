//! Workload generators for benchmarking the moonslot containers.
//!
//! - [`churn_pattern`]: deterministic insert/erase sequence via seed
//! - [`run_dense_churn`] / [`run_ordered_churn`]: replay a pattern
//!   against a container and return the surviving handles

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use moonslot_map::SlotMap;
use moonslot_ordered::OrderedSlotMap;

/// One step of a churn workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChurnOp {
    /// Insert this value.
    Insert(u64),
    /// Erase the live handle at this index, modulo the live count.
    Erase(usize),
}

/// Generate `len` churn operations.
///
/// Roughly `insert_percent` of the steps insert; the rest erase. The
/// sequence depends only on `seed`.
pub fn churn_pattern(len: usize, insert_percent: u64, seed: u64) -> Vec<ChurnOp> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        state >> 33
    };
    (0..len)
        .map(|_| {
            let roll = next();
            if roll % 100 < insert_percent {
                ChurnOp::Insert(next())
            } else {
                ChurnOp::Erase(next() as usize)
            }
        })
        .collect()
}

/// Replay `ops` against a dense map.
pub fn run_dense_churn(
    map: &SlotMap<u64>,
    ops: &[ChurnOp],
) -> Vec<moonslot_map::Handle<u64>> {
    let mut live = Vec::new();
    for op in ops {
        match *op {
            ChurnOp::Insert(value) => live.push(map.insert(value)),
            ChurnOp::Erase(at) if !live.is_empty() => {
                let mut handle = live.swap_remove(at % live.len());
                map.erase(&mut handle);
            }
            ChurnOp::Erase(_) => {}
        }
    }
    live
}

/// Replay `ops` against an ordered map.
pub fn run_ordered_churn(
    map: &OrderedSlotMap<u64>,
    ops: &[ChurnOp],
) -> Vec<moonslot_ordered::Handle<u64>> {
    let mut live = Vec::new();
    for op in ops {
        match *op {
            ChurnOp::Insert(value) => live.push(map.insert(value)),
            ChurnOp::Erase(at) if !live.is_empty() => {
                let mut handle = live.swap_remove(at % live.len());
                map.erase(&mut handle);
            }
            ChurnOp::Erase(_) => {}
        }
    }
    live
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn churn_pattern_deterministic() {
        assert_eq!(churn_pattern(200, 60, 42), churn_pattern(200, 60, 42));
        assert_ne!(churn_pattern(200, 60, 42), churn_pattern(200, 60, 7));
    }

    #[test]
    fn churn_pattern_respects_extremes() {
        assert!(churn_pattern(100, 100, 1)
            .iter()
            .all(|op| matches!(op, ChurnOp::Insert(_))));
        assert!(churn_pattern(100, 0, 1)
            .iter()
            .all(|op| matches!(op, ChurnOp::Erase(_))));
    }

    #[test]
    fn dense_churn_leaves_only_returned_handles() {
        let map = SlotMap::with_capacity(8);
        let ops = churn_pattern(500, 60, 3);
        let live = run_dense_churn(&map, &ops);
        assert_eq!(map.len(), live.len());
        assert!(live.iter().all(|h| map.is_valid(h)));
    }

    #[test]
    fn ordered_churn_stays_sorted() {
        let map = OrderedSlotMap::with_capacity(8);
        let ops = churn_pattern(500, 60, 3);
        let live = run_ordered_churn(&map, &ops);
        assert_eq!(map.len(), live.len());
        let values: Vec<u64> = map.view().iter().copied().collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }
}
