mod archive;
mod commits;
mod interactive;
mod issue_arg;
mod status;
mod unapprove;

pub use archive::{archive_milestone, generate_archive_name};
pub use commits::{list_commits, render_commits};
pub use interactive::{prompt_confirm, prompt_existing_milestone, prompt_reason};
pub use issue_arg::{IssueArg, IssueArgParser};
pub use status::{
    StatusRow, fetch_milestone_statuses, interactive_status, milestone_list, milestone_status,
    render_status_table, status_rows,
};
pub use unapprove::{PlannerChoice, planner_choices, print_tree, render_lanes, run_unapprove};
