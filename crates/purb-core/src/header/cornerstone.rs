//! Cornerstone placement.
//!
//! Every suite gets exactly one primary slot among its allowed positions.
//! Two layouts drive the search:
//!
//! - the main layout holds the nonce and every primary slot, exclusively;
//! - the secondary layout holds the nonce and *all* allowed positions of the
//!   suites placed so far, so a later suite never takes a slot an earlier
//!   suite might have used.
//!
//! The secondary layout only grows, and it gains the same ranges whichever
//! position a suite takes, so a later suite that is blocked stays blocked
//! under every earlier choice. The search is therefore greedy in effect:
//! retrying an earlier suite never recovers a dead end, it only spends steps
//! from a fixed budget.
//!
//! Non-primary positions are not reserved in the main layout. Entrypoints
//! and filler may sit there; the XOR pass in the encoder folds whatever ends
//! up in those bytes into the primary slot.

use std::cmp::Reverse;

use tracing::{debug, trace, warn};

use super::Header;
use crate::{
    config::{NONCE_LENGTH, SuiteId, SuiteInfo, SuiteInfoMap},
    error::PurbError,
    layout::RegionLayout,
};

/// Candidate positions examined before the search gives up
pub const MAX_PLACEMENT_STEPS: usize = 1 << 16;

/// Assign a primary slot to every cornerstone in `header`.
///
/// Suites are tried longest cornerstone first, ties broken by id, and each
/// suite's positions in listed order. On success the header's layout holds
/// the nonce and every primary slot, and its placement order is recorded.
///
/// # Errors
///
/// - `MissingSuiteInfo`: if a cornerstone's suite is not configured.
/// - `UnsatisfiableCornerstonePlacement`: if no collision-free assignment
///   exists or the step budget runs out.
pub fn place_cornerstones(header: &mut Header, suites: &SuiteInfoMap) -> Result<(), PurbError> {
    let mut order: Vec<(SuiteId, usize)> = Vec::with_capacity(header.cornerstones.len());
    for &suite in header.cornerstones.keys() {
        order.push((suite, suites.require(suite)?.cornerstone_length));
    }
    order.sort_by_key(|&(suite, len)| (Reverse(len), suite));
    let order: Vec<SuiteId> = order.into_iter().map(|(suite, _)| suite).collect();

    let mut main = RegionLayout::new();
    main.reserve(0, NONCE_LENGTH, true, "nonce");
    let secondary = main.clone();

    let mut search = Search { order: &order, suites, steps_left: MAX_PLACEMENT_STEPS };
    let mut chosen = Vec::with_capacity(order.len());

    let Some(layout) = search.solve(0, &main, &secondary, &mut chosen)? else {
        warn!(
            suites = order.len(),
            steps = MAX_PLACEMENT_STEPS - search.steps_left,
            "cornerstone placement unsatisfiable"
        );
        return Err(PurbError::UnsatisfiableCornerstonePlacement { suites: order.len() });
    };

    for (&suite, &offset) in order.iter().zip(&chosen) {
        if let Some(cornerstone) = header.cornerstones.get_mut(&suite) {
            cornerstone.offset = Some(offset);
        }
        debug!(%suite, offset, "cornerstone placed");
    }

    header.layout = layout;
    header.placement_order = order;
    Ok(())
}

/// XOR together the bytes at every allowed position of `info`.
///
/// Positions are clipped to `data`; a position starting past the end
/// contributes nothing. `skip` leaves one position out, which is how the
/// encoder computes the value to write into the primary slot.
pub fn fold_positions(data: &[u8], info: &SuiteInfo, skip: Option<usize>) -> Vec<u8> {
    let mut acc = vec![0u8; info.cornerstone_length];

    for &start in &info.allowed_positions {
        if Some(start) == skip || start >= data.len() {
            continue;
        }
        let end = start.saturating_add(info.cornerstone_length).min(data.len());
        for (a, b) in acc.iter_mut().zip(&data[start..end]) {
            *a ^= b;
        }
    }

    acc
}

struct Search<'a> {
    order: &'a [SuiteId],
    suites: &'a SuiteInfoMap,
    steps_left: usize,
}

impl Search<'_> {
    /// Place `order[depth..]`, returning the main layout of the first
    /// complete assignment.
    ///
    /// Each candidate works on clones of both layouts. A failed candidate is
    /// retried with the suite's next position, which cannot change whether
    /// later suites fit; the step budget bounds that repeated work.
    fn solve(
        &mut self,
        depth: usize,
        main: &RegionLayout,
        secondary: &RegionLayout,
        chosen: &mut Vec<usize>,
    ) -> Result<Option<RegionLayout>, PurbError> {
        let Some(&suite) = self.order.get(depth) else {
            return Ok(Some(main.clone()));
        };
        let info = self.suites.require(suite)?;
        let label = format!("{suite} cornerstone");

        for &start in &info.allowed_positions {
            if self.steps_left == 0 {
                return Ok(None);
            }
            self.steps_left -= 1;

            let Some(end) = start.checked_add(info.cornerstone_length) else {
                continue;
            };
            if !secondary.is_free(start, end) {
                trace!(%suite, start, "position blocked");
                continue;
            }

            let mut next_main = main.clone();
            if !next_main.reserve(start, end, true, label.as_str()) {
                continue;
            }

            let mut next_secondary = secondary.clone();
            for range in info.position_ranges() {
                next_secondary.reserve(range.start, range.end, false, label.as_str());
            }

            chosen.push(start);
            if let Some(done) = self.solve(depth + 1, &next_main, &next_secondary, chosen)? {
                return Ok(Some(done));
            }
            chosen.pop();
            trace!(%suite, start, "backtracking");
        }

        Ok(None)
    }
}
