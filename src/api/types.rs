//! Response types for the grading-service `/api/v1` endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `GET /user`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

/// `GET /courses`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub semester: String,
    #[serde(default)]
    pub late_slack: i64,
    #[serde(default)]
    pub grace_days: i64,
    #[serde(default)]
    pub auth_level: String,
}

/// `GET /courses/:course/assessments`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "start_at", default)]
    pub assigned: Option<String>,
    #[serde(rename = "due_at", default)]
    pub due: Option<String>,
    #[serde(rename = "end_at", default)]
    pub closed: Option<String>,
    #[serde(rename = "category_name", default)]
    pub category: Option<String>,
}

/// A single problem score; the server reports `"unreleased"` until grades
/// are published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Points(f64),
    Pending(String),
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Points(points) => write!(f, "{points}"),
            Self::Pending(label) => f.write_str(label),
        }
    }
}

/// `GET /courses/:course/assessments/:assessment/submissions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub version: u32,
    #[serde(default)]
    pub filename: String,
    #[serde(rename = "created_at", default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub scores: BTreeMap<String, Score>,
}

impl Submission {
    pub fn is_graded(&self) -> bool {
        !self.scores.is_empty()
    }

    /// Scores ordered by numeric problem id where possible.
    pub fn sorted_scores(&self) -> Vec<(&str, &Score)> {
        let mut scores: Vec<_> = self
            .scores
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        scores.sort_by(|(a, _), (b, _)| match (a.parse::<i64>(), b.parse::<i64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.cmp(b),
        });
        scores
    }
}

/// `POST /courses/:course/assessments/:assessment/submit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub version: u32,
    #[serde(default)]
    pub filename: String,
}

/// Highest-version submission in `submissions`.
pub fn latest(submissions: &[Submission]) -> Option<&Submission> {
    submissions.iter().max_by_key(|s| s.version)
}
