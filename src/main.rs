#[cfg(feature = "cli")]
use anyhow::{Result, bail};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use clap_verbosity_flag::{InfoLevel, Verbosity};
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use ghqc_review::api::types::CommitsQuery;
#[cfg(feature = "cli")]
use ghqc_review::api::{HttpBackend, QcBackend};
#[cfg(feature = "cli")]
use ghqc_review::cli::{
    IssueArg, IssueArgParser, archive_milestone, interactive_status, list_commits, milestone_list,
    milestone_status, print_tree, run_unapprove,
};
#[cfg(feature = "cli")]
use ghqc_review::unapprove::Session;
#[cfg(feature = "cli")]
use ghqc_review::utils::StdEnvProvider;
#[cfg(feature = "cli")]
use ghqc_review::{ClientConfiguration, IssueStatus};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the ghqc server (overrides GHQC_URL and client.yaml)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Configuration directory path
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// List the repository's milestones
    Milestones,
    /// Show the QC status of every issue in a milestone
    Status {
        /// Milestone number (will prompt if not provided)
        #[arg(short, long)]
        milestone: Option<u64>,
    },
    /// List commits on the current branch
    Commits {
        /// Only mark commits touching this file
        #[arg(short, long)]
        file: Option<String>,

        /// Page to show, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Commits per page (server default if not provided)
        #[arg(long)]
        page_size: Option<usize>,

        /// Jump to the page containing this commit hash prefix
        #[arg(short, long)]
        locate: Option<String>,
    },
    /// Show the tree of issues blocked by an issue
    Tree {
        /// Issue number or issue URL
        #[arg(value_parser = IssueArgParser)]
        issue: IssueArg,

        /// Maximum depth to expand
        #[arg(long, default_value = "10")]
        depth: usize,
    },
    /// Unapprove an issue and, optionally, the approvals it impacts
    Unapprove {
        /// Issue number or issue URL
        #[arg(value_parser = IssueArgParser)]
        issue: IssueArg,

        /// Reason for unapproving the issue (will prompt if not provided)
        #[arg(short, long)]
        reason: Option<String>,

        /// Submit without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Archive the approved files of a milestone at their approved commits
    Archive {
        /// Milestone number
        #[arg(short, long)]
        milestone: u64,

        /// Archive path (defaults to archive/<milestone>.tar.gz)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Place all files at the archive root
        #[arg(long)]
        flatten: bool,
    },
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.verbose.log_level_filter();
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Off) // Turn off all logs by default
        .filter(Some("ghqc_review"), log_level) // Allow logs from this crate
        .init();

    let env = StdEnvProvider;
    let configuration =
        ClientConfiguration::load(cli.config_dir.as_deref(), cli.url.as_deref(), &env)?;
    log::debug!("Using ghqc server at {}", configuration.base_url);
    let backend = HttpBackend::new(&configuration)?;

    match cli.command {
        Commands::Milestones => {
            let milestones = backend.get_milestones().await?;
            print!("{}", milestone_list(&milestones));
        }
        Commands::Status { milestone } => match milestone {
            Some(number) => {
                let milestones = backend.get_milestones().await?;
                let Some(milestone) = milestones.iter().find(|m| m.number == number) else {
                    bail!("Milestone {number} not found");
                };
                milestone_status(&backend, milestone).await?;
            }
            None => interactive_status(&backend).await?,
        },
        Commands::Commits {
            file,
            page,
            page_size,
            locate,
        } => {
            let query = CommitsQuery {
                file,
                page: page.saturating_sub(1),
                page_size,
                locate,
            };
            list_commits(&backend, &query).await?;
        }
        Commands::Tree {
            issue: IssueArg(number),
            depth,
        } => {
            let mut session = Session::new(Arc::new(backend), number);
            session.open().await?;
            print_tree(&mut session, depth).await?;
            session.close();
        }
        Commands::Unapprove {
            issue: IssueArg(number),
            reason,
            yes,
        } => {
            let mut session = Session::new(Arc::new(backend), number)
                .with_unavailable_listener(|parent| {
                    log::warn!(
                        "Server cannot list issues blocked by #{parent}; unapproving the selected issue only"
                    )
                })
                .with_status_listener(|status: &IssueStatus| {
                    println!("🔄 #{} is now: {}", status.number(), status.qc_status)
                });
            session.open().await?;

            match run_unapprove(&mut session, reason, yes).await? {
                Some(outcome) => {
                    println!("{outcome}");
                    if !outcome.is_complete_success() {
                        bail!("{} unapproval(s) failed", outcome.failures.len());
                    }
                }
                None => println!("Unapproval cancelled"),
            }
            session.close();
        }
        Commands::Archive {
            milestone,
            output,
            flatten,
        } => {
            let response = archive_milestone(&backend, milestone, output, flatten).await?;
            println!("✅ Archive created at {}", response.output_path);
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Build with --features cli to use the CLI.");
}
