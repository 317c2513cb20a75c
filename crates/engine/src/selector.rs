use crate::config::EngineConfig;
use crate::state::MatchingState;
use votematch_protocol::{BillId, Question};
use votematch_vector_store::{BillCatalog, ClusterVectorData};

/// Pick the most informative unanswered bill, or `None` when the cluster is done.
///
/// ```text
/// info(b) = power(b) * Σ_d |L_b[d]| * uncertainty[d]
/// ```
///
/// Bills that speak to still-uncertain dimensions win; bills that barely
/// separate members are scaled down by their discriminative power. Ties go
/// to the lowest bill id. `bills` only decorates the returned question.
///
/// `state` must come from [`MatchingState::for_cluster`] on `cluster`. A state
/// of another dimensionality is a caller bug: debug builds panic, release
/// builds log it and return `None` (`update` reports the same mismatch as
/// `EngineError::DimensionMismatch`).
pub fn select_next_question(
    state: &MatchingState,
    cluster: &ClusterVectorData,
    bills: &BillCatalog,
    config: &EngineConfig,
) -> Option<Question> {
    if state.is_complete() {
        return None;
    }

    let question_limit = config.question_limit(cluster.bill_count());
    if state.question_count() >= question_limit {
        return None;
    }

    debug_assert_eq!(
        state.dimensions(),
        cluster.dimensions(),
        "state built for another cluster"
    );
    if state.dimensions() != cluster.dimensions() {
        log::warn!(
            "State has {} dimensions but cluster {} has {}",
            state.dimensions(),
            cluster.label(),
            cluster.dimensions()
        );
        return None;
    }

    let uncertainty = state.dimension_uncertainty();
    let mut best: Option<Candidate> = None;

    for (bill_id, loading, power) in cluster.bills() {
        if state.has_answered(bill_id) {
            continue;
        }

        let (pull, dimension_target) = weighted_pull(loading, uncertainty);
        let candidate = Candidate {
            bill_id,
            informativeness: pull * power,
            dimension_target,
        };

        best = match best {
            Some(current) if !candidate.beats(&current) => Some(current),
            _ => Some(candidate),
        };
    }

    let best = best?;
    log::debug!(
        "Next question for cluster {}: bill {} (info={:.4}, dimension={})",
        cluster.label(),
        best.bill_id,
        best.informativeness,
        best.dimension_target
    );

    Some(Question {
        bill_id: best.bill_id,
        title: bill_title(cluster, bills, best.bill_id),
        description: bills
            .get(best.bill_id)
            .and_then(|bill| bill.description.clone()),
        dimension_target: best.dimension_target,
        reason: reason_for(cluster, bills, best.dimension_target),
        informativeness: best.informativeness,
        question_number: state.question_count() + 1,
        question_limit,
    })
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    bill_id: BillId,
    informativeness: f32,
    dimension_target: usize,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        self.informativeness > other.informativeness
            || (self.informativeness == other.informativeness && self.bill_id < other.bill_id)
    }
}

/// Uncertainty-weighted L1 norm of a loading, plus the dimension contributing most.
fn weighted_pull(loading: &[f32], uncertainty: &[f32]) -> (f32, usize) {
    let mut total = 0.0;
    let mut target = 0;
    let mut target_weight = f32::NEG_INFINITY;

    for (d, (l, u)) in loading.iter().zip(uncertainty.iter()).enumerate() {
        let weight = l.abs() * u;
        total += weight;
        if weight > target_weight {
            target = d;
            target_weight = weight;
        }
    }

    (total, target)
}

/// Catalog title, then representative-bill title, then a generic label.
pub fn bill_title(cluster: &ClusterVectorData, bills: &BillCatalog, bill_id: BillId) -> String {
    if let Some(bill) = bills.get(bill_id).filter(|bill| !bill.title.is_empty()) {
        return bill.title.clone();
    }
    cluster
        .all_representative_bills()
        .find(|rep| rep.bill_id == bill_id && !rep.title.is_empty())
        .map_or_else(|| format!("Bill {bill_id}"), |rep| rep.title.clone())
}

fn reason_for(cluster: &ClusterVectorData, bills: &BillCatalog, dimension: usize) -> String {
    let axis = dimension + 1;
    let share = cluster
        .explained_variance()
        .get(dimension)
        .copied()
        .unwrap_or(0.0);

    match cluster.representative_bills(dimension).first() {
        Some(rep) if share > 0.0 => format!(
            "Probes policy axis {axis} ({:.0}% of variance), anchored by \"{}\"",
            share * 100.0,
            bill_title(cluster, bills, rep.bill_id)
        ),
        Some(rep) => format!(
            "Probes policy axis {axis}, anchored by \"{}\"",
            bill_title(cluster, bills, rep.bill_id)
        ),
        None => format!("Probes policy axis {axis}"),
    }
}
