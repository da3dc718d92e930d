use anyhow::{Result, bail};

use crate::api::QcBackend;
use crate::cli::interactive::prompt_existing_milestone;
use crate::{IssueStatus, Milestone, QCStatusEnum};

pub async fn interactive_status(backend: &impl QcBackend) -> Result<()> {
    println!("📊 Welcome to GHQC Review Status Mode!");

    let milestones = backend.get_milestones().await?;
    let milestone = prompt_existing_milestone(&milestones)?;
    milestone_status(backend, &milestone).await
}

pub async fn milestone_status(backend: &impl QcBackend, milestone: &Milestone) -> Result<()> {
    let statuses = fetch_milestone_statuses(backend, milestone).await?;
    if statuses.is_empty() {
        bail!("No issues found in milestone '{}'", milestone.title);
    }

    let rows = status_rows(&milestone.title, &statuses);
    print!("{}", render_status_table(&rows, true));
    Ok(())
}

/// Current QC status of every issue in `milestone`, in the milestone's order.
pub async fn fetch_milestone_statuses(
    backend: &impl QcBackend,
    milestone: &Milestone,
) -> Result<Vec<IssueStatus>> {
    let issues = backend.get_milestone_issues(milestone.number).await?;
    log::debug!(
        "Found {} total issues in milestone '{}'",
        issues.len(),
        milestone.title
    );
    if issues.is_empty() {
        return Ok(Vec::new());
    }

    let numbers = issues.iter().map(|i| i.number).collect::<Vec<_>>();
    Ok(backend.get_issue_statuses(&numbers).await?)
}

pub fn milestone_list(milestones: &[Milestone]) -> String {
    if milestones.is_empty() {
        return "No milestones found in repository\n".to_string();
    }
    milestones
        .iter()
        .map(|m| format!("🎯 {:>3}  {m}\n", m.number))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub number: u64,
    pub file: String,
    pub milestone: String,
    pub issue_state: String,
    pub status: QCStatusEnum,
    pub detail: String,
}

pub fn status_rows(milestone: &str, statuses: &[IssueStatus]) -> Vec<StatusRow> {
    let mut rows = statuses
        .iter()
        .map(|s| StatusRow {
            number: s.number(),
            file: s.issue.title.clone(),
            milestone: s
                .issue
                .milestone
                .clone()
                .unwrap_or_else(|| milestone.to_string()),
            issue_state: s.issue.state.clone(),
            status: s.qc_status.status,
            detail: s.qc_status.status_detail.clone(),
        })
        .collect::<Vec<_>>();

    // Sort by milestone name, then by file name
    rows.sort_by(|a, b| {
        a.milestone
            .cmp(&b.milestone)
            .then_with(|| a.file.cmp(&b.file))
    });
    rows
}

/// Aligned status table. With `color`, each QC status cell is painted in the
/// color of its lane after padding so the columns stay aligned.
pub fn render_status_table(rows: &[StatusRow], color: bool) -> String {
    if rows.is_empty() {
        return "No issues found in selected milestones.\n".to_string();
    }

    let status_texts = rows.iter().map(|r| r.status.to_string()).collect::<Vec<_>>();
    let issue_width = rows
        .iter()
        .map(|r| r.number.to_string().len() + 1)
        .max()
        .unwrap_or(5)
        .max(5);
    let file_width = rows.iter().map(|r| r.file.len()).max().unwrap_or(4).max(4);
    let milestone_width = rows
        .iter()
        .map(|r| r.milestone.len())
        .max()
        .unwrap_or(9)
        .max(9);
    let state_width = rows
        .iter()
        .map(|r| r.issue_state.len())
        .max()
        .unwrap_or(11)
        .max(11);
    let status_width = status_texts.iter().map(String::len).max().unwrap_or(9).max(9);

    let mut out = vec![
        format!(
            "{:<issue_width$} | {:<file_width$} | {:<milestone_width$} | {:<state_width$} | {:<status_width$} | Detail",
            "Issue", "File", "Milestone", "Issue State", "QC Status",
        ),
        format!(
            "{:-<issue_width$}-+-{:-<file_width$}-+-{:-<milestone_width$}-+-{:-<state_width$}-+-{:-<status_width$}-+-------",
            "", "", "", "", "",
        ),
    ];

    for (row, status_text) in rows.iter().zip(&status_texts) {
        let padded_status = format!("{status_text:<status_width$}");
        let status_cell = if color {
            row.status.lane_color().paint(&padded_status)
        } else {
            padded_status
        };
        let line = format!(
            "{:<issue_width$} | {:<file_width$} | {:<milestone_width$} | {:<state_width$} | {} | {}",
            format!("#{}", row.number),
            row.file,
            row.milestone,
            row.issue_state,
            status_cell,
            row.detail,
        );
        out.push(line.trim_end().to_string());
    }

    let approved = rows.iter().filter(|r| r.status.is_approved()).count();
    out.push(format!("\n{approved}/{} approved", rows.len()));
    out.join("\n") + "\n"
}
