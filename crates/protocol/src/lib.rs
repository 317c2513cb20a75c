use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ANSWER_SHEET_SCHEMA_VERSION: u32 = 1;

/// Upstream database id of a bill.
pub type BillId = u64;

/// Upstream database id of a legislator.
pub type MemberId = u64;

/// The three answers a user can give to a bill.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerChoice {
    Agree,
    Disagree,
    Neutral,
}

impl AnswerChoice {
    #[must_use]
    pub fn score(self) -> f32 {
        match self {
            Self::Agree => 1.0,
            Self::Disagree => -1.0,
            Self::Neutral => 0.0,
        }
    }

    /// Nearest choice for a raw score; anything strictly between the halves is neutral.
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score >= 0.5 {
            Self::Agree
        } else if score <= -0.5 {
            Self::Disagree
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Agree => "agree",
            Self::Disagree => "disagree",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub bill_id: BillId,
    /// Agreement in `[-1, 1]`: agree = 1, disagree = -1, neutral = 0.
    pub score: f32,
}

impl UserAnswer {
    #[must_use]
    pub fn new(bill_id: BillId, score: f32) -> Self {
        Self { bill_id, score }
    }

    #[must_use]
    pub fn from_choice(bill_id: BillId, choice: AnswerChoice) -> Self {
        Self::new(bill_id, choice.score())
    }

    #[must_use]
    pub fn choice(&self) -> AnswerChoice {
        AnswerChoice::from_score(self.score)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Active,
    Complete,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub bill_id: BillId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Latent dimension this question mostly probes.
    pub dimension_target: usize,
    pub reason: String,
    pub informativeness: f32,
    /// 1-based position of this question in the cluster's questionnaire.
    pub question_number: usize,
    pub question_limit: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub member_id: MemberId,
    pub similarity: f32,
    pub rank: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMemberScore {
    pub member_id: MemberId,
    pub global_score: f32,
    pub cluster_scores: BTreeMap<String, f32>,
}

/// What the caller gets back after submitting one answer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub cluster_label: String,
    pub status: MatchStatus,
    pub question_count: usize,
    pub aggregate_uncertainty: f32,
    pub next_question: Option<Question>,
    pub live_matches: Vec<MatchResult>,
}

/// A recorded set of answers, replayable without a live session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSheet {
    #[serde(default)]
    pub schema_version: Option<u32>,
    pub clusters: BTreeMap<String, ClusterAnswers>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAnswers {
    /// 1-5; the configured default applies when absent.
    #[serde(default)]
    pub importance: Option<u8>,
    #[serde(default)]
    pub answers: Vec<UserAnswer>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterReport {
    pub label: String,
    pub status: MatchStatus,
    pub question_count: usize,
    pub aggregate_uncertainty: f32,
    pub importance: u8,
    pub user_vector: Vec<f32>,
    /// Answers the replay applied, in order; recorded answers past completion are left out.
    pub answers: Vec<UserAnswer>,
    pub matches: Vec<MatchResult>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankReport {
    pub clusters: Vec<ClusterReport>,
    pub global: Vec<GlobalMemberScore>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub label: String,
    pub dimensions: usize,
    pub member_count: usize,
    pub bill_count: usize,
    pub explained_variance: Vec<f32>,
    /// Title of the strongest representative bill per dimension.
    pub representative_titles: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn schema_json<T: JsonSchema>() -> Result<String> {
    let schema = schemars::schema_for!(T);
    serde_json::to_string_pretty(&schema).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn choice_scores_round_to_nearest_choice() {
        assert_eq!(AnswerChoice::Agree.score(), 1.0);
        assert_eq!(AnswerChoice::from_score(0.7), AnswerChoice::Agree);
        assert_eq!(AnswerChoice::from_score(-0.9), AnswerChoice::Disagree);
        assert_eq!(AnswerChoice::from_score(0.2), AnswerChoice::Neutral);
    }

    #[test]
    fn answer_sheet_uses_camel_case_and_optional_importance() {
        let raw = r#"{
            "clusters": {
                "3": { "answers": [ { "billId": 12, "score": -1.0 } ] },
                "7": { "importance": 5, "answers": [] }
            }
        }"#;
        let sheet: AnswerSheet = serde_json::from_str(raw).unwrap();
        assert_eq!(sheet.clusters["3"].importance, None);
        assert_eq!(
            sheet.clusters["3"].answers,
            vec![UserAnswer::new(12, -1.0)]
        );
        assert_eq!(sheet.clusters["7"].importance, Some(5));
    }

    #[test]
    fn question_skips_missing_description() {
        let question = Question {
            bill_id: 4,
            title: "Budget".to_string(),
            description: None,
            dimension_target: 0,
            reason: "r".to_string(),
            informativeness: 1.0,
            question_number: 1,
            question_limit: 3,
        };
        let json = serialize_json(&question).unwrap();
        assert!(json.contains("\"billId\":4"));
        assert!(!json.contains("description"));
    }

    #[test]
    fn schema_mentions_answer_fields() {
        let schema = schema_json::<AnswerSheet>().unwrap();
        assert!(schema.contains("billId"));
        assert!(schema.contains("importance"));
    }
}
