use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::api::QcBackend;
use crate::api::types::ArchiveGenerateResponse;
use crate::cli::status::fetch_milestone_statuses;
use crate::{Milestone, approved_archive_request};

/// `archive/<milestone>.tar.gz`, with characters unsafe in file names
/// replaced by dashes.
pub fn generate_archive_name(milestone: &Milestone) -> PathBuf {
    let name = milestone
        .title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '-',
            c => c,
        })
        .collect::<String>()
        // Remove consecutive dashes
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    PathBuf::from("archive").join(format!("{name}.tar.gz"))
}

/// Bundle every approved file of `milestone` at its approved commit.
pub async fn archive_milestone(
    backend: &impl QcBackend,
    milestone_number: u64,
    output: Option<PathBuf>,
    flatten: bool,
) -> Result<ArchiveGenerateResponse> {
    let milestones = backend.get_milestones().await?;
    let Some(milestone) = milestones.iter().find(|m| m.number == milestone_number) else {
        bail!("Milestone {milestone_number} not found");
    };

    let statuses = fetch_milestone_statuses(backend, milestone).await?;
    let output = output.unwrap_or_else(|| generate_archive_name(milestone));
    let request = approved_archive_request(&statuses, &output.to_string_lossy(), flatten)?;
    let skipped = statuses.len() - request.files.len();
    if skipped > 0 {
        println!("⚠️  Skipping {skipped} file(s) without an approval");
    }

    Ok(backend.generate_archive(&request).await?)
}
