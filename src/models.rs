use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub faculty: String,
}

/// Faculty input form. Cleared after a successful `add_assignment`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssignmentDraft {
    pub title: String,
    pub faculty: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionFile {
    pub name: String,
    #[serde(skip)]
    pub contents: Vec<u8>,
}

/// Student input form. The file is taken on submit, the name stays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionDraft {
    pub student_name: String,
    pub file: Option<SubmissionFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubmissionStatus {
    Pending,
    Analyzed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Analyzed,
}

impl StatusFilter {
    pub fn matches(self, status: SubmissionStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == SubmissionStatus::Pending,
            StatusFilter::Analyzed => status == SubmissionStatus::Analyzed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub id: u64,
    pub assignment_id: u64,
    pub student_name: String,
    pub file: SubmissionFile,
    pub ai_usage: Option<u8>,
    pub feedback: Option<String>,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Version<'a> {
    pub number: usize,
    pub submission: &'a Submission,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentGroup<'a> {
    pub student_name: &'a str,
    pub versions: Vec<Version<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentGroup<'a> {
    pub assignment: &'a Assignment,
    pub students: Vec<StudentGroup<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hostel {
    pub id: u64,
    pub name: String,
    pub occupancy: u8,
    pub facilities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AlertLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityAlert {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub level: AlertLevel,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognizedStudent {
    pub id: u32,
    pub name: String,
    pub hostel_id: u64,
    pub recognized: bool,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "Pending"),
            SubmissionStatus::Analyzed => write!(f, "Analyzed"),
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::High => write!(f, "High"),
            AlertLevel::Medium => write!(f, "Medium"),
            AlertLevel::Low => write!(f, "Low"),
        }
    }
}
