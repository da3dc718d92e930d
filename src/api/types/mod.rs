mod requests;
mod responses;

pub use requests::{ArchiveFileRequest, ArchiveGenerateRequest, CommitsQuery, UnapproveRequest};
pub use responses::{
    ArchiveGenerateResponse, BranchCommit, IssueStatusResponse, PagedCommitsResponse,
    UnapprovalResponse,
};
