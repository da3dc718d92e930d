use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::api::types::{ArchiveFileRequest, ArchiveGenerateRequest};
use crate::issue::IssueStatus;

/// Path a repository file takes inside the archive.
pub fn archive_path(file: &Path, flatten: bool) -> Result<PathBuf, ArchiveError> {
    if flatten {
        file.file_name()
            .map(PathBuf::from)
            .ok_or_else(|| ArchiveError::InvalidFileName(file.to_path_buf()))
    } else {
        Ok(file.strip_prefix("/").unwrap_or(file).to_path_buf())
    }
}

/// Build the archive request for every approved issue among `statuses`,
/// each file pinned at its approved commit.
///
/// Issues without an approval, or approved without a recorded commit, are
/// skipped.
pub fn approved_archive_request(
    statuses: &[IssueStatus],
    output_path: &str,
    flatten: bool,
) -> Result<ArchiveGenerateRequest, ArchiveError> {
    let mut files = Vec::new();
    for status in statuses {
        let Some(commit) = status
            .is_approved()
            .then_some(status.qc_status.approved_commit.as_ref())
            .flatten()
        else {
            log::debug!("Skipping {} from archive: not approved", status.issue);
            continue;
        };
        files.push(ArchiveFileRequest {
            repository_file: PathBuf::from(&status.issue.title),
            commit: commit.clone(),
            milestone: status.issue.milestone.clone(),
            approved: Some(true),
        });
    }

    if files.is_empty() {
        return Err(ArchiveError::NoApprovedFiles);
    }
    check_conflicts(&files, flatten)?;

    log::debug!("Archiving {} approved file(s) to {output_path}", files.len());
    Ok(ArchiveGenerateRequest {
        output_path: output_path.to_string(),
        flatten,
        files,
    })
}

// Collect every archive path claimed by more than one repository file
fn check_conflicts(files: &[ArchiveFileRequest], flatten: bool) -> Result<(), ArchiveError> {
    let mut path_to_sources: BTreeMap<PathBuf, Vec<&Path>> = BTreeMap::new();
    for file in files {
        path_to_sources
            .entry(archive_path(&file.repository_file, flatten)?)
            .or_default()
            .push(&file.repository_file);
    }

    let conflict_descriptions = path_to_sources
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(archive_path, sources)| {
            let sources_str = sources
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" + ");
            format!("{} -> {}", sources_str, archive_path.display())
        })
        .collect::<Vec<_>>();

    if conflict_descriptions.is_empty() {
        Ok(())
    } else {
        Err(ArchiveError::FileConflict(format!(
            "Conflicts detected:\n{}",
            conflict_descriptions.join("\n")
        )))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("No approved files to archive")]
    NoApprovedFiles,
    #[error("Cannot create archive: multiple files have the same archive name. {0}")]
    FileConflict(String),
    #[error("Cannot determine the file name of {0}")]
    InvalidFileName(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QCStatusEnum::{Approved, ChangesAfterApproval, InProgress};
    use crate::test_utils::issue_status;

    fn titled(number: u64, title: &str) -> IssueStatus {
        let mut status = issue_status(number, Approved);
        status.issue.title = title.to_string();
        status
    }

    #[test]
    fn test_only_approved_files_are_archived() {
        let mut no_commit = issue_status(3, ChangesAfterApproval);
        no_commit.qc_status.approved_commit = None;
        let statuses = vec![
            issue_status(1, Approved),
            issue_status(2, InProgress),
            no_commit,
            issue_status(4, ChangesAfterApproval),
        ];

        let request = approved_archive_request(&statuses, "out/v1.0.tar.gz", false).unwrap();
        assert_eq!(request.output_path, "out/v1.0.tar.gz");
        assert_eq!(
            request
                .files
                .iter()
                .map(|f| f.repository_file.clone())
                .collect::<Vec<_>>(),
            vec![PathBuf::from("file_1.R"), PathBuf::from("file_4.R")]
        );
        assert_eq!(
            Some(&request.files[0].commit),
            statuses[0].qc_status.approved_commit.as_ref()
        );
        assert_eq!(request.files[0].milestone.as_deref(), Some("v1.0"));
        assert_eq!(request.files[0].approved, Some(true));
    }

    #[test]
    fn test_nothing_approved() {
        let statuses = vec![issue_status(2, InProgress)];
        assert!(matches!(
            approved_archive_request(&statuses, "out.tar.gz", false),
            Err(ArchiveError::NoApprovedFiles)
        ));
    }

    #[test]
    fn test_flatten_conflicts_are_all_reported() {
        let statuses = vec![
            titled(1, "analysis/a/model.R"),
            titled(2, "analysis/b/model.R"),
            titled(3, "scripts/plot.R"),
            titled(4, "old/plot.R"),
        ];

        assert!(approved_archive_request(&statuses, "out.tar.gz", false).is_ok());

        let err = approved_archive_request(&statuses, "out.tar.gz", true).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @r"
        Cannot create archive: multiple files have the same archive name. Conflicts detected:
        analysis/a/model.R + analysis/b/model.R -> model.R
        scripts/plot.R + old/plot.R -> plot.R
        ");
    }

    #[test]
    fn test_archive_path() {
        assert_eq!(
            archive_path(Path::new("/abs/file.R"), false).unwrap(),
            PathBuf::from("abs/file.R")
        );
        assert_eq!(
            archive_path(Path::new("dir/file.R"), true).unwrap(),
            PathBuf::from("file.R")
        );
        assert!(archive_path(Path::new("/"), true).is_err());
    }
}
