// collage-core/src/search.rs
//! Bounded search for the largest feasible compaction factor
//!
//! Every compaction pass moves something by a factor `t` in `[0, upper]`,
//! where `t = 0` is the identity move. The feasible set is not guaranteed to
//! be an interval (a box can jump over an obstacle at large `t`), so the
//! search marches outward from 0 and stops at the first infeasible step,
//! then bisects between the last feasible and first infeasible factor.
//! The result is always a factor the predicate accepted, or 0.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorSearch {
    /// Number of equal steps between 0 and `upper`
    pub steps: usize,
    /// Bisection rounds once an infeasible step is found
    pub refinements: usize,
    /// Largest factor tried
    pub upper: f64,
}

impl Default for FactorSearch {
    fn default() -> Self {
        Self {
            steps: 20,
            refinements: 24,
            upper: 1.0,
        }
    }
}

impl FactorSearch {
    pub fn new(steps: usize, refinements: usize, upper: f64) -> Self {
        Self {
            steps: steps.max(1),
            refinements,
            upper,
        }
    }

    /// Largest factor reachable from 0 without crossing an infeasible step.
    pub fn max_feasible<F>(&self, mut feasible: F) -> f64
    where
        F: FnMut(f64) -> bool,
    {
        let steps = self.steps.max(1);
        let step = self.upper / steps as f64;

        let mut lo = 0.0;
        let mut hi = None;
        for i in 1..=steps {
            let t = if i == steps { self.upper } else { step * i as f64 };
            if feasible(t) {
                lo = t;
            } else {
                hi = Some(t);
                break;
            }
        }

        let Some(mut hi) = hi else {
            return lo;
        };

        for _ in 0..self.refinements {
            let mid = 0.5 * (lo + hi);
            if feasible(mid) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }
}
