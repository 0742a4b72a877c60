//! Figures derived from a list of donations, recomputed on every request.

use entity::donation::{Model, Status};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Summary {
    pub count: usize,
    pub total_amount: f64,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_donations(donations: &[Model]) -> Self {
        donations.iter().fold(Self::default(), |mut s, d| {
            s.count += 1;
            s.total_amount += d.amount;
            match d.status {
                Status::Pending => s.pending += 1,
                Status::Completed => s.completed += 1,
                Status::Failed => s.failed += 1,
            }
            s
        })
    }
}

pub fn matches_donor(donation: &Model, term: &str) -> bool {
    donation
        .donor_name
        .to_lowercase()
        .contains(&term.to_lowercase())
}

/// Local search filter, an empty term keeps everything.
pub fn filter_by_donor<'a>(donations: &'a [Model], term: &str) -> Vec<&'a Model> {
    donations
        .iter()
        .filter(|d| term.is_empty() || matches_donor(d, term))
        .collect()
}
