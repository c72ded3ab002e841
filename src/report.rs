use std::fmt::Write;

use serde::Serialize;

use crate::models::{AssignmentGroup, Hostel, RecognizedStudent, SecurityAlert, StatusFilter};
use crate::recognition::OccupancyRecognizer;
use crate::submissions::SubmissionTracker;

#[derive(Serialize)]
pub struct PortalSnapshot<'a> {
    pub filter: StatusFilter,
    pub assignments: Vec<AssignmentGroup<'a>>,
    pub hostels: &'a [Hostel],
    pub recognized: &'a [RecognizedStudent],
    pub alerts: &'a [SecurityAlert],
}

impl<'a> PortalSnapshot<'a> {
    pub fn capture(
        tracker: &'a SubmissionTracker,
        recognizer: &'a OccupancyRecognizer,
        filter: StatusFilter,
    ) -> Self {
        Self {
            filter,
            assignments: tracker.grouped(filter),
            hostels: recognizer.hostels(),
            recognized: recognizer.students(),
            alerts: recognizer.alerts(),
        }
    }
}

pub fn build_json(snapshot: &PortalSnapshot<'_>) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn render_submissions(groups: &[AssignmentGroup<'_>]) -> String {
    let mut output = String::new();

    if groups.is_empty() {
        let _ = writeln!(output, "No assignments available.");
        return output;
    }

    for group in groups {
        let _ = writeln!(
            output,
            "### {} ({})",
            group.assignment.title, group.assignment.faculty
        );
        if group.students.is_empty() {
            let _ = writeln!(output, "No submissions yet.");
        }
        for student in &group.students {
            let _ = writeln!(output, "- {}", student.student_name);
            for version in &student.versions {
                let submission = version.submission;
                let usage = submission
                    .ai_usage
                    .map(|usage| format!("{usage}%"))
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(
                    output,
                    "  - Version {} ({}) {} {} AI usage {} {}",
                    version.number,
                    submission.file.name,
                    submission.submitted_at.format("%Y-%m-%d %H:%M:%S"),
                    submission.status,
                    usage,
                    submission.feedback.as_deref().unwrap_or("")
                );
            }
        }
        let _ = writeln!(output);
    }

    output
}

pub fn render_hostels(recognizer: &OccupancyRecognizer) -> String {
    let mut output = String::new();

    for hostel in recognizer.hostels() {
        let marker = if recognizer.is_crowded(hostel) { " (crowded)" } else { "" };
        let _ = writeln!(
            output,
            "- {}: {}%{} [{}]",
            hostel.name,
            hostel.occupancy,
            marker,
            hostel.facilities.join(", ")
        );
        let names: Vec<&str> = recognizer
            .students_in(hostel.id)
            .map(|student| student.name.as_str())
            .collect();
        if !names.is_empty() {
            let _ = writeln!(output, "  recognized: {}", names.join(", "));
        }
    }

    output
}

pub fn render_alerts(alerts: &[SecurityAlert]) -> String {
    let mut output = String::new();

    if alerts.is_empty() {
        let _ = writeln!(output, "No security updates.");
    }
    for alert in alerts {
        let state = if alert.read { "read" } else { "unread" };
        let _ = writeln!(
            output,
            "- [{}] #{} {}: {} ({})",
            alert.level, alert.id, alert.title, alert.description, state
        );
    }

    output
}

pub fn build_report(snapshot: &PortalSnapshot<'_>, recognizer: &OccupancyRecognizer) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Campus Portal Report");
    let _ = writeln!(output, "Submissions shown: {:?}", snapshot.filter);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Assignments");
    output.push_str(&render_submissions(&snapshot.assignments));

    let _ = writeln!(output, "## Hostel Occupancy");
    output.push_str(&render_hostels(recognizer));
    let _ = writeln!(output);

    let _ = writeln!(
        output,
        "## Security Alerts ({} unread)",
        recognizer.unread_alerts()
    );
    output.push_str(&render_alerts(snapshot.alerts));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentDraft, SubmissionDraft, SubmissionFile};
    use crate::recognition::{default_alerts, default_hostels};

    fn sample_tracker() -> SubmissionTracker {
        let mut tracker = SubmissionTracker::new();
        tracker.add_assignment(&mut AssignmentDraft {
            title: "HW1".to_string(),
            faculty: "Dr.X".to_string(),
            description: String::new(),
        });
        tracker.add_assignment(&mut AssignmentDraft {
            title: "HW2".to_string(),
            faculty: "Dr.Y".to_string(),
            description: String::new(),
        });
        let mut form = SubmissionDraft {
            student_name: "Alice".to_string(),
            file: Some(SubmissionFile {
                name: "alice.pdf".to_string(),
                contents: vec![0; 4],
            }),
        };
        tracker.submit_assignment(1, &mut form);
        tracker.record_analysis(1, 64);
        tracker
    }

    #[test]
    fn submissions_render_versions_and_empty_assignments() {
        let tracker = sample_tracker();
        let rendered = render_submissions(&tracker.grouped(StatusFilter::All));
        assert!(rendered.contains("### HW1 (Dr.X)"));
        assert!(rendered.contains("- Alice"));
        assert!(rendered.contains("Version 1 (alice.pdf)"));
        assert!(rendered.contains("AI usage 64% Moderate AI usage detected"));
        assert!(rendered.contains("### HW2 (Dr.Y)\nNo submissions yet."));
    }

    #[test]
    fn report_lists_hostels_and_unread_alerts() {
        let tracker = sample_tracker();
        let mut recognizer = OccupancyRecognizer::new(default_hostels(), default_alerts());
        recognizer.mark_alert_as_read(1);

        let snapshot = PortalSnapshot::capture(&tracker, &recognizer, StatusFilter::Pending);
        let report = build_report(&snapshot, &recognizer);
        assert!(report.contains("Submissions shown: Pending"));
        assert!(report.contains("- Boys Hostel A: 80% (crowded) [WiFi, Canteen, Gym]"));
        assert!(report.contains("- Girls Hostel B: 50% [WiFi, Laundry]"));
        assert!(report.contains("## Security Alerts (1 unread)"));
        assert!(report.contains("- [High] #2 Suspicious Activity: Near Sports Complex (unread)"));
        assert!(!report.contains("- Alice"));
    }

    #[test]
    fn json_snapshot_omits_file_contents() {
        let tracker = sample_tracker();
        let recognizer = OccupancyRecognizer::new(default_hostels(), default_alerts());
        let snapshot = PortalSnapshot::capture(&tracker, &recognizer, StatusFilter::All);

        let json: serde_json::Value = serde_json::from_str(&build_json(&snapshot).unwrap()).unwrap();
        let version = &json["assignments"][0]["students"][0]["versions"][0];
        assert_eq!(version["number"], 1);
        assert_eq!(version["submission"]["status"], "Analyzed");
        assert_eq!(version["submission"]["file"]["name"], "alice.pdf");
        assert!(version["submission"]["file"].get("contents").is_none());
        assert_eq!(json["hostels"].as_array().unwrap().len(), 3);
    }
}
