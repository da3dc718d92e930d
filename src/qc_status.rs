use owo_colors::{AnsiColors, OwoColorize};
use serde::{Deserialize, Serialize};

/// QC status enum values, as reported by the ghqc server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QCStatusEnum {
    Approved,
    ChangesAfterApproval,
    AwaitingReview,
    // closed without approval
    ApprovalRequired,
    ChangeRequested,
    InProgress,
    ChangesToComment,
}

impl std::fmt::Display for QCStatusEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status_text = match self {
            QCStatusEnum::Approved => "Approved",
            QCStatusEnum::ChangesAfterApproval => "Approved; subsequent file changes",
            QCStatusEnum::AwaitingReview => "Awaiting review",
            QCStatusEnum::InProgress => "In progress",
            QCStatusEnum::ApprovalRequired => "Approval required",
            QCStatusEnum::ChangeRequested => "Changes requested",
            QCStatusEnum::ChangesToComment => "Changes to comment",
        };
        write!(f, "{}", status_text)
    }
}

impl QCStatusEnum {
    /// Returns true if this status represents an approved issue
    /// (either pure Approved or ChangesAfterApproval)
    pub fn is_approved(&self) -> bool {
        matches!(
            self,
            QCStatusEnum::Approved | QCStatusEnum::ChangesAfterApproval
        )
    }

    pub fn lane_color(&self) -> LaneColor {
        match self {
            QCStatusEnum::Approved => LaneColor::Green,
            QCStatusEnum::ChangesAfterApproval => LaneColor::Yellow,
            QCStatusEnum::AwaitingReview => LaneColor::Blue,
            QCStatusEnum::ApprovalRequired => LaneColor::Orange,
            QCStatusEnum::ChangeRequested => LaneColor::Red,
            QCStatusEnum::InProgress => LaneColor::Gray,
            QCStatusEnum::ChangesToComment => LaneColor::Orange,
        }
    }
}

/// Display color of the lane a status is grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneColor {
    Green,
    Yellow,
    Blue,
    Orange,
    Red,
    Gray,
}

impl LaneColor {
    fn ansi(&self) -> AnsiColors {
        match self {
            LaneColor::Green => AnsiColors::Green,
            LaneColor::Yellow => AnsiColors::Yellow,
            LaneColor::Blue => AnsiColors::Blue,
            // closest 16-color approximation
            LaneColor::Orange => AnsiColors::BrightRed,
            LaneColor::Red => AnsiColors::Red,
            LaneColor::Gray => AnsiColors::BrightBlack,
        }
    }

    /// Paint `text` in this lane's terminal color.
    pub fn paint(&self, text: &str) -> String {
        text.color(self.ansi()).to_string()
    }
}

/// QC status information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QCStatus {
    pub status: QCStatusEnum,
    #[serde(default)]
    pub status_detail: String,
    #[serde(default)]
    pub approved_commit: Option<String>,
    pub latest_commit: String,
}

impl QCStatus {
    pub fn is_approved(&self) -> bool {
        self.status.is_approved()
    }

    pub fn lane_color(&self) -> LaneColor {
        self.status.lane_color()
    }

    /// The commit an archive or a resolver should pin the file to: the
    /// approved commit when there is one, the latest otherwise.
    pub fn resolved_commit(&self) -> &str {
        self.approved_commit.as_deref().unwrap_or(&self.latest_commit)
    }
}

impl std::fmt::Display for QCStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.status_detail.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{}", self.status_detail)
        }
    }
}
