pub mod api;
mod archive;
mod configuration;
mod issue;
mod qc_status;
pub mod unapprove;
pub mod utils;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod test_utils;

pub use archive::{ArchiveError, approved_archive_request, archive_path};
pub use configuration::{
    ClientConfiguration, ConfigurationError, URL_ENV_VAR, determine_config_dir,
};
pub use issue::{Issue, IssueStatus, Milestone};
pub use qc_status::{LaneColor, QCStatus, QCStatusEnum};
