use votematch_engine::{validate_importance, EngineError, Matcher};
use votematch_protocol::{AnswerSheet, ClusterReport, RankReport};
use votematch_vector_store::ClusterCatalog;

/// Replay every cluster of a recorded answer sheet and rank members.
///
/// `top_n` of `0` keeps every member. Clusters without bills are skipped;
/// clusters without answers are reported but carry no weight globally.
pub fn build_rank_report(
    matcher: &Matcher,
    catalog: &ClusterCatalog,
    sheet: &AnswerSheet,
    top_n: usize,
) -> Result<RankReport, EngineError> {
    let limit = Some(top_n);
    let default_importance = matcher.config().default_importance;

    let mut clusters = Vec::with_capacity(sheet.clusters.len());
    let mut answered = Vec::new();

    for (label, recorded) in &sheet.clusters {
        let cluster = catalog
            .get(label)
            .ok_or_else(|| EngineError::UnknownCluster(label.clone()))?;
        if cluster.is_empty() {
            log::warn!("Skipping cluster {label}: nothing to ask about");
            continue;
        }

        let importance = match recorded.importance {
            Some(value) => validate_importance(value)?,
            None => default_importance,
        };
        let state = matcher.replay(cluster, &recorded.answers)?;
        log::debug!(
            "Replayed {} answers for cluster {label} ({} applied)",
            recorded.answers.len(),
            state.question_count()
        );

        clusters.push(ClusterReport {
            label: label.clone(),
            status: state.status(),
            question_count: state.question_count(),
            aggregate_uncertainty: state.aggregate_uncertainty(),
            importance,
            user_vector: state.user_vector().to_vec(),
            answers: state.answered_bills().to_vec(),
            matches: matcher.rank(state.user_vector(), cluster, limit),
        });

        if state.question_count() > 0 {
            answered.push((state, importance));
        }
    }

    let mut global = matcher.aggregate(&answered, catalog.clusters())?;
    if top_n > 0 {
        global.truncate(top_n);
    }

    Ok(RankReport { clusters, global })
}
