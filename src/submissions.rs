use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use crate::models::{
    Assignment, AssignmentDraft, AssignmentGroup, StatusFilter, StudentGroup, Submission,
    SubmissionDraft, SubmissionStatus, Version,
};

pub const HIGH_USAGE_FEEDBACK: &str = "High AI usage detected";
pub const MODERATE_USAGE_FEEDBACK: &str = "Moderate AI usage detected";
pub const LOW_USAGE_FEEDBACK: &str = "Low AI usage detected";

pub fn feedback_for(ai_usage: u8) -> &'static str {
    match ai_usage {
        71.. => HIGH_USAGE_FEEDBACK,
        41..=70 => MODERATE_USAGE_FEEDBACK,
        _ => LOW_USAGE_FEEDBACK,
    }
}

#[derive(Debug, Default)]
pub struct SubmissionTracker {
    assignments: Vec<Assignment>,
    submissions: Vec<Submission>,
    last_assignment_id: u64,
    last_submission_id: u64,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an assignment from the faculty form and clears it.
    /// Returns `None` (leaving the form untouched) when title or faculty is empty.
    pub fn add_assignment(&mut self, draft: &mut AssignmentDraft) -> Option<u64> {
        if draft.title.is_empty() || draft.faculty.is_empty() {
            debug!("ignoring assignment without title or faculty");
            return None;
        }

        self.last_assignment_id += 1;
        let form = std::mem::take(draft);
        let assignment = Assignment {
            id: self.last_assignment_id,
            title: form.title,
            description: form.description,
            faculty: form.faculty,
        };
        debug!("created assignment {} '{}'", assignment.id, assignment.title);
        self.assignments.push(assignment);
        Some(self.last_assignment_id)
    }

    /// Records a new pending version. The file is taken out of the draft,
    /// the student name is kept for the next upload.
    pub fn submit_assignment(
        &mut self,
        assignment_id: u64,
        draft: &mut SubmissionDraft,
    ) -> Option<u64> {
        if draft.student_name.is_empty() || draft.file.is_none() {
            debug!("ignoring submission without student name or file");
            return None;
        }
        if self.assignment(assignment_id).is_none() {
            debug!("ignoring submission for unknown assignment {}", assignment_id);
            return None;
        }
        let file = draft.file.take()?;

        self.last_submission_id += 1;
        let submission = Submission {
            id: self.last_submission_id,
            assignment_id,
            student_name: draft.student_name.clone(),
            file,
            ai_usage: None,
            feedback: None,
            status: SubmissionStatus::Pending,
            submitted_at: Utc::now(),
        };
        debug!(
            "{} submitted '{}' for assignment {} as submission {}",
            submission.student_name, submission.file.name, assignment_id, submission.id
        );
        self.submissions.push(submission);
        Some(self.last_submission_id)
    }

    /// Applies an analysis score to a submission in place and returns the
    /// updated record. Re-applying to an analyzed submission overwrites it.
    pub fn record_analysis(&mut self, submission_id: u64, ai_usage: u8) -> Option<Submission> {
        let ai_usage = ai_usage.min(100);
        let submission = self
            .submissions
            .iter_mut()
            .find(|submission| submission.id == submission_id)?;

        submission.ai_usage = Some(ai_usage);
        submission.feedback = Some(feedback_for(ai_usage).to_string());
        submission.status = SubmissionStatus::Analyzed;
        debug!("submission {} analyzed at {}% AI usage", submission_id, ai_usage);
        Some(submission.clone())
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn assignment(&self, id: u64) -> Option<&Assignment> {
        self.assignments.iter().find(|assignment| assignment.id == id)
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn submission(&self, id: u64) -> Option<&Submission> {
        self.submissions.iter().find(|submission| submission.id == id)
    }

    pub fn pending_ids(&self) -> Vec<u64> {
        self.submissions
            .iter()
            .filter(|submission| submission.status == SubmissionStatus::Pending)
            .map(|submission| submission.id)
            .collect()
    }

    pub fn filtered(&self, filter: StatusFilter) -> impl Iterator<Item = &Submission> {
        self.submissions
            .iter()
            .filter(move |submission| filter.matches(submission.status))
    }

    pub fn grouped(&self, filter: StatusFilter) -> Vec<AssignmentGroup<'_>> {
        self.assignments
            .iter()
            .map(|assignment| {
                let mut students: Vec<StudentGroup<'_>> = Vec::new();
                let mut index: HashMap<&str, usize> = HashMap::new();

                for submission in self
                    .filtered(filter)
                    .filter(|submission| submission.assignment_id == assignment.id)
                {
                    let name = submission.student_name.as_str();
                    let slot = *index.entry(name).or_insert_with(|| {
                        students.push(StudentGroup {
                            student_name: name,
                            versions: Vec::new(),
                        });
                        students.len() - 1
                    });
                    let group = &mut students[slot];
                    group.versions.push(Version {
                        number: group.versions.len() + 1,
                        submission,
                    });
                }

                AssignmentGroup {
                    assignment,
                    students,
                }
            })
            .collect()
    }
}
