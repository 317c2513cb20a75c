//! Statistics derived from a cluster's latent space when the upstream file omits them.

use crate::types::RepresentativeBill;
use ndarray::{Array2, Axis};
use std::cmp::Ordering;
use votematch_protocol::BillId;

/// Representative bills kept per dimension.
pub const REPRESENTATIVES_PER_DIMENSION: usize = 3;

/// Per-bill variance of the member scores reconstructed from the latent space
/// (`member_vector · loading`).
///
/// Fewer than two members, or members that no bill separates, leave nothing to
/// discriminate; every bill then gets `1.0` so selection falls back to loadings.
pub fn discriminative_power(
    member_vectors: &[&[f32]],
    bill_loadings: &[Vec<f32>],
    dimensions: usize,
) -> Vec<f32> {
    let n_bills = bill_loadings.len();
    if member_vectors.len() < 2 || dimensions == 0 || n_bills == 0 {
        return vec![1.0; n_bills];
    }

    let members = Array2::from_shape_fn((member_vectors.len(), dimensions), |(i, d)| {
        member_vectors[i][d]
    });
    let loadings = Array2::from_shape_fn((n_bills, dimensions), |(b, d)| bill_loadings[b][d]);

    // members x bills
    let scores = members.dot(&loadings.t());
    let power: Vec<f32> = scores
        .var_axis(Axis(0), 0.0)
        .iter()
        .map(|v| if v.is_finite() { v.max(0.0) } else { 0.0 })
        .collect();

    if power.iter().all(|p| *p <= 0.0) {
        return vec![1.0; n_bills];
    }
    power
}

/// Top bills by absolute loading for each dimension. Ties go to the lower bill id.
pub fn representative_bills(
    bill_ids: &[BillId],
    bill_loadings: &[Vec<f32>],
    dimensions: usize,
) -> Vec<Vec<RepresentativeBill>> {
    (0..dimensions)
        .map(|dim| {
            let mut ranked: Vec<(BillId, f32)> = bill_ids
                .iter()
                .zip(bill_loadings.iter())
                .map(|(id, loading)| (*id, loading[dim]))
                .collect();
            ranked.sort_by(|a, b| {
                b.1.abs()
                    .partial_cmp(&a.1.abs())
                    .unwrap_or(Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
            ranked
                .into_iter()
                .take(REPRESENTATIVES_PER_DIMENSION)
                .map(|(bill_id, loading)| RepresentativeBill {
                    bill_id,
                    title: String::new(),
                    passed: false,
                    deliberation_completed: false,
                    loading,
                    abs_loading: loading.abs(),
                })
                .collect()
        })
        .collect()
}
