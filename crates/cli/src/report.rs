use votematch_engine::bill_title;
use votematch_protocol::{AnswerChoice, ClusterSummary, MatchStatus, RankReport};
use votematch_vector_store::{BillCatalog, ClusterCatalog};

pub fn render_inspect(clustering_id: Option<i64>, summaries: &[ClusterSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Clustering {} ({} clusters)\n",
        clustering_id.map_or_else(|| "n/a".to_string(), |id| id.to_string()),
        summaries.len()
    ));

    for summary in summaries {
        out.push_str(&format!(
            "\n[{}] {} members, {} bills, {} dimensions\n",
            summary.label, summary.member_count, summary.bill_count, summary.dimensions
        ));
        for (dim, title) in summary.representative_titles.iter().enumerate() {
            let share = summary.explained_variance.get(dim).copied().unwrap_or(0.0);
            out.push_str(&format!(
                "  axis {} ({:>4.1}%): {}\n",
                dim + 1,
                share * 100.0,
                truncate_one_line(title, 80)
            ));
        }
    }

    out
}

pub fn render_rank_report(
    report: &RankReport,
    catalog: &ClusterCatalog,
    bills: &BillCatalog,
) -> String {
    let mut out = String::new();

    for cluster_report in &report.clusters {
        out.push_str(&format!(
            "Cluster {} (importance {}, {} answers, uncertainty {:.2}, {})\n",
            cluster_report.label,
            cluster_report.importance,
            cluster_report.question_count,
            cluster_report.aggregate_uncertainty,
            match cluster_report.status {
                MatchStatus::Active => "in progress",
                MatchStatus::Complete => "complete",
            }
        ));

        if let Some(cluster) = catalog.get(&cluster_report.label) {
            for answer in &cluster_report.answers {
                out.push_str(&format!(
                    "  {:<8} {}\n",
                    AnswerChoice::from_score(answer.score).label(),
                    truncate_one_line(&bill_title(cluster, bills, answer.bill_id), 72)
                ));
            }
        }

        for result in &cluster_report.matches {
            out.push_str(&format!(
                "  #{:<3} member {:<8} {:+.3}\n",
                result.rank, result.member_id, result.similarity
            ));
        }
        out.push('\n');
    }

    out.push_str("Global ranking\n");
    if report.global.is_empty() {
        out.push_str("  (no answered clusters)\n");
    }
    for (idx, score) in report.global.iter().enumerate() {
        out.push_str(&format!(
            "  #{:<3} member {:<8} {:+.3}\n",
            idx + 1,
            score.member_id,
            score.global_score
        ));
    }

    out
}

fn truncate_one_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
