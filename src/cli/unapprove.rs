use std::fmt;

use anyhow::{Result, bail};

use crate::api::QcBackend;
use crate::cli::interactive::{prompt_choice, prompt_confirm, prompt_reason};
use crate::unapprove::{Partitions, PlannerState, Session, SubmissionOutcome, TreeNode};

/// One entry of the planner menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerChoice {
    Add(u64),
    Remove(u64),
    Expand(u64),
    Collapse(u64),
    Uncollapse(u64),
    Retry(u64),
    Continue,
    Cancel,
}

impl fmt::Display for PlannerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerChoice::Add(n) => write!(f, "➕ Unapprove #{n} too"),
            PlannerChoice::Remove(n) => write!(f, "➖ Keep approval of #{n}"),
            PlannerChoice::Expand(n) => write!(f, "🔽 Show issues blocked by #{n}"),
            PlannerChoice::Collapse(n) => write!(f, "🔼 Hide issues blocked by #{n}"),
            PlannerChoice::Uncollapse(n) => write!(f, "🔽 Show issues blocked by #{n} again"),
            PlannerChoice::Retry(n) => write!(f, "🔄 Retry loading issues blocked by #{n}"),
            PlannerChoice::Continue => write!(f, "✅ Continue"),
            PlannerChoice::Cancel => write!(f, "❌ Cancel"),
        }
    }
}

/// Menu entries offered for the current state, in lane order.
///
/// Only queued issues can be expanded: an approval that stays in place
/// impacts nothing further down.
pub fn planner_choices(state: &PlannerState, partitions: &Partitions) -> Vec<PlannerChoice> {
    let mut choices = Vec::new();

    for &n in &partitions.to_unapprove {
        if state.error(n).is_some() {
            choices.push(PlannerChoice::Retry(n));
        } else if !state.expansion().is_expanded(n) {
            if !partitions.impacted_by(n).is_empty() {
                choices.push(PlannerChoice::Expand(n));
            }
        } else if state.expansion().is_collapsed(n) {
            choices.push(PlannerChoice::Uncollapse(n));
        } else if partitions.can_collapse(state, n) && state.children().has_loaded(n) {
            choices.push(PlannerChoice::Collapse(n));
        }
        if state.can_remove(n) {
            choices.push(PlannerChoice::Remove(n));
        }
    }
    for &n in &partitions.impacted_approvals {
        choices.push(PlannerChoice::Add(n));
    }

    choices.push(PlannerChoice::Continue);
    choices.push(PlannerChoice::Cancel);
    choices
}

fn describe(state: &PlannerState, number: u64) -> String {
    match state.nodes().get(number) {
        Some(status) => format!(
            "#{} {} [{}]",
            number, status.issue.title, status.qc_status.status
        ),
        None => format!("#{number}"),
    }
}

fn paint(state: &PlannerState, number: u64, text: String, color: bool) -> String {
    match state.nodes().get(number) {
        Some(status) if color => status.qc_status.lane_color().paint(&text),
        _ => text,
    }
}

/// The three lanes as text, each entry annotated with the parents that
/// make it impacted.
pub fn render_lanes(state: &PlannerState, partitions: &Partitions, color: bool) -> String {
    let mut out = Vec::new();

    if state.is_blocked_unavailable() {
        out.push(format!(
            "⚠️  Blocked issue lookup is not available on this server; only #{} will be unapproved",
            state.root()
        ));
        out.push(String::new());
    }

    let line = |n: u64| {
        let mut text = describe(state, n);
        let parents = partitions.impacted_by(n);
        if !parents.is_empty() && n != state.root() {
            let parents = parents
                .iter()
                .map(|p| format!("#{p}"))
                .collect::<Vec<_>>()
                .join(", ");
            text.push_str(&format!(" ← blocked by {parents}"));
        }
        if state.children().is_loading(n) {
            text.push_str(" (loading...)");
        }
        if let Some(error) = state.error(n) {
            text.push_str(&format!(" (failed to load blocked issues: {})", error.user_message()));
        }
        format!("  {}", paint(state, n, text, color))
    };

    out.push(format!("🔓 To unapprove ({})", partitions.to_unapprove.len()));
    out.extend(partitions.to_unapprove.iter().map(|n| line(*n)));

    out.push(format!(
        "⚠️  Impacted approvals ({})",
        partitions.impacted_approvals.len()
    ));
    out.extend(partitions.impacted_approvals.iter().map(|n| line(*n)));

    let not_approved = partitions
        .root_not_approved
        .iter()
        .chain(&partitions.not_approved)
        .copied()
        .collect::<Vec<_>>();
    out.push(format!("⏳ Not approved ({})", not_approved.len()));
    out.extend(not_approved.into_iter().map(line));

    out.join("\n") + "\n"
}

/// Interactive unapprove planner: settle the root's blocked issues, let the
/// user pick what else to unapprove, collect reasons and submit.
pub async fn run_unapprove<B: QcBackend + 'static>(
    session: &mut Session<B>,
    reason: Option<String>,
    skip_confirm: bool,
) -> Result<Option<SubmissionOutcome>> {
    session.settle().await;
    let root = session.state().root();

    if !session.state().is_root_approved() {
        let status = session
            .state()
            .root_status()
            .map(|s| s.qc_status.status.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        bail!("Issue #{root} is not approved ({status}); there is nothing to unapprove");
    }
    if let Some(reason) = reason {
        session.set_reason(root, reason);
    }

    println!("🔓 Welcome to GHQC Unapprove Mode!");
    while !session.state().is_blocked_unavailable() {
        let partitions = session.partitions();
        println!("\n{}", render_lanes(session.state(), &partitions, true));

        match prompt_choice(
            "What would you like to do?",
            planner_choices(session.state(), &partitions),
        )? {
            PlannerChoice::Add(n) => {
                session.add_to_unapprove(n);
            }
            PlannerChoice::Remove(n) => {
                session.remove_from_unapprove(n);
            }
            PlannerChoice::Expand(n) => {
                session.expand(n);
                session.settle().await;
            }
            PlannerChoice::Collapse(n) => {
                session.collapse(n);
            }
            PlannerChoice::Uncollapse(n) => {
                session.uncollapse(n);
            }
            PlannerChoice::Retry(n) => {
                session.request_children(n);
                session.settle().await;
            }
            PlannerChoice::Continue => break,
            PlannerChoice::Cancel => return Ok(None),
        }
    }
    if session.state().is_blocked_unavailable() {
        println!("\n{}", render_lanes(session.state(), &session.partitions(), true));
    }

    let working_set = session.submission_plan().map_or_else(
        |_| {
            if session.state().is_blocked_unavailable() {
                vec![root]
            } else {
                session.state().to_unapprove().to_vec()
            }
        },
        |plan| plan.issues().collect(),
    );
    for n in &working_set {
        let current = session.state().reason(*n).map(str::to_string);
        if current.as_deref().is_some_and(|r| !r.trim().is_empty()) {
            continue;
        }
        let label = describe(session.state(), *n);
        let reason = prompt_reason(&label, current.as_deref())?;
        session.set_reason(*n, reason);
    }

    match session.preview(root).await {
        Ok(preview) => println!("\n📄 Comment preview for #{root}:\n{preview}\n"),
        Err(e) => log::warn!("Failed to render unapproval preview: {e}"),
    }

    if !skip_confirm
        && !prompt_confirm(&format!("Unapprove {} issue(s)?", working_set.len()))?
    {
        return Ok(None);
    }

    Ok(Some(session.submit().await?))
}

/// Print the blocked-issue tree of `root`, expanded up to `max_depth` levels.
pub async fn print_tree<B: QcBackend + 'static>(
    session: &mut Session<B>,
    max_depth: usize,
) -> Result<()> {
    session.expand_all(max_depth).await;
    if session.state().is_blocked_unavailable() {
        bail!("Blocked issue lookup is not available on this server");
    }
    let tree = TreeNode::build(session.state());
    print!("{}", tree.render(session.state()));
    Ok(())
}
