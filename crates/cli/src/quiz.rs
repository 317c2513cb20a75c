use anyhow::{Context as AnyhowContext, Result};
use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use votematch_engine::{InMemorySessionStore, MatchService, SessionId, MAX_IMPORTANCE};
use votematch_protocol::{AnswerChoice, GlobalMemberScore, MatchResult, Question, UserAnswer};

const IMPORTANCE_LABELS: [&str; 5] = [
    "1 - barely matters to me",
    "2 - minor",
    "3 - moderate",
    "4 - important",
    "5 - decisive",
];

enum Reply {
    Answer(AnswerChoice),
    SkipCluster,
}

/// Walk the user through every cluster of a fresh session, then print the global ranking.
pub async fn run(
    service: &MatchService<InMemorySessionStore>,
    labels: Option<Vec<String>>,
    top_n: usize,
) -> Result<()> {
    let term = Term::stdout();
    let theme = ColorfulTheme::default();

    let id = service.start_session(labels).await?;
    let session = service.session(&id).await?;
    let labels: Vec<String> = session.labels().map(str::to_string).collect();
    if labels.is_empty() {
        term.write_line("No clusters with bills to ask about.")?;
        return Ok(());
    }

    for label in &labels {
        ask_cluster(service, &id, label, &term, &theme).await?;
    }

    let ranking = service.global_ranking(&id).await?;
    term.write_line("")?;
    term.write_line(&style("Overall closest legislators").bold().to_string())?;
    print_global(&term, &ranking, top_n)?;

    service.end_session(&id).await;
    Ok(())
}

async fn ask_cluster(
    service: &MatchService<InMemorySessionStore>,
    id: &SessionId,
    label: &str,
    term: &Term,
    theme: &ColorfulTheme,
) -> Result<()> {
    let cluster = service.clusters().require(label)?;
    term.write_line("")?;
    term.write_line(&format!(
        "{} {}",
        style(format!("Cluster {label}")).bold().cyan(),
        style(format!(
            "({} legislators, {} bills)",
            cluster.member_count(),
            cluster.bill_count()
        ))
        .dim()
    ))?;

    let default_index = usize::from(service.matcher().config().default_importance.saturating_sub(1));
    let picked = Select::with_theme(theme)
        .with_prompt("How much does this topic matter to you?")
        .items(&IMPORTANCE_LABELS)
        .default(default_index)
        .interact()
        .context("Failed to read importance")?;
    let importance = u8::try_from(picked + 1).unwrap_or(MAX_IMPORTANCE);
    service.set_importance(id, label, importance).await?;

    while let Some(question) = service.next_question(id, label).await? {
        let choice = match ask(&question, term, theme)? {
            Reply::Answer(choice) => choice,
            Reply::SkipCluster => break,
        };

        let outcome = service
            .submit_answer(id, label, UserAnswer::from_choice(question.bill_id, choice))
            .await?;
        term.write_line(&format!(
            "{}",
            style(format!(
                "uncertainty {:.2} after {} answers",
                outcome.aggregate_uncertainty, outcome.question_count
            ))
            .dim()
        ))?;
        print_live(term, &outcome.live_matches)?;
    }

    Ok(())
}

fn ask(question: &Question, term: &Term, theme: &ColorfulTheme) -> Result<Reply> {
    term.write_line("")?;
    term.write_line(&format!(
        "{} {}",
        style(format!(
            "Q{}/{}",
            question.question_number, question.question_limit
        ))
        .yellow(),
        style(&question.title).bold()
    ))?;
    if let Some(description) = &question.description {
        term.write_line(description)?;
    }
    term.write_line(&style(&question.reason).dim().to_string())?;

    let items = ["Agree", "Neutral", "Disagree", "Skip the rest of this cluster"];
    let picked = Select::with_theme(theme)
        .with_prompt("Your position")
        .items(&items)
        .default(1)
        .interact()
        .context("Failed to read answer")?;

    Ok(match picked {
        0 => Reply::Answer(AnswerChoice::Agree),
        1 => Reply::Answer(AnswerChoice::Neutral),
        2 => Reply::Answer(AnswerChoice::Disagree),
        _ => Reply::SkipCluster,
    })
}

fn print_live(term: &Term, matches: &[MatchResult]) -> Result<()> {
    for result in matches {
        term.write_line(&format!(
            "  #{:<2} member {:<8} {}",
            result.rank,
            result.member_id,
            style(format!("{:+.3}", result.similarity)).green()
        ))?;
    }
    Ok(())
}

fn print_global(term: &Term, ranking: &[GlobalMemberScore], top_n: usize) -> Result<()> {
    if ranking.is_empty() {
        term.write_line("  (no answers given)")?;
        return Ok(());
    }

    let shown = if top_n == 0 { ranking.len() } else { top_n };
    for (idx, score) in ranking.iter().take(shown).enumerate() {
        let clusters: Vec<String> = score
            .cluster_scores
            .iter()
            .map(|(label, similarity)| format!("{label}={similarity:+.2}"))
            .collect();
        term.write_line(&format!(
            "  #{:<3} member {:<8} {} {}",
            idx + 1,
            score.member_id,
            style(format!("{:+.3}", score.global_score)).green().bold(),
            style(clusters.join(" ")).dim()
        ))?;
    }
    Ok(())
}
