use std::io::Read;

use anyhow::Context;
use tracing::info;

use crate::models::AssignmentDraft;
use crate::submissions::SubmissionTracker;

/// Feeds every `title,faculty,description` row through `add_assignment`.
/// Rows missing a title or faculty are skipped the same way the form skips
/// them. Returns the number of assignments created.
pub fn import_assignments<R: Read>(
    tracker: &mut SubmissionTracker,
    source: R,
) -> anyhow::Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<AssignmentDraft>().enumerate() {
        let mut draft = result.with_context(|| format!("invalid assignment row {}", line + 1))?;
        if tracker.add_assignment(&mut draft).is_some() {
            inserted += 1;
        }
    }

    info!("imported {} assignments", inserted);
    Ok(inserted)
}

pub fn import_assignments_from_path(
    tracker: &mut SubmissionTracker,
    path: &std::path::Path,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    import_assignments(tracker, file)
}
