use anyhow::Result;

use crate::api::QcBackend;
use crate::api::types::{CommitsQuery, PagedCommitsResponse};

pub async fn list_commits(backend: &impl QcBackend, query: &CommitsQuery) -> Result<()> {
    let page = backend.get_commits(query).await?;
    print!("{}", render_commits(&page, query.locate.as_deref()));
    Ok(())
}

/// One commit per line, newest first. Commits touching the requested file
/// are starred and the located commit is marked.
pub fn render_commits(page: &PagedCommitsResponse, locate: Option<&str>) -> String {
    if page.commits.is_empty() {
        return "No commits found\n".to_string();
    }

    let mut out = String::new();
    for commit in &page.commits {
        let marker = if commit.file_changed { "*" } else { " " };
        let first_line = commit.message.lines().next().unwrap_or_default();
        let located =
            locate.is_some_and(|prefix| !prefix.is_empty() && commit.hash.starts_with(prefix));
        out.push_str(&format!(
            "{marker} {} {first_line}{}\n",
            commit.short_hash(),
            if located { "  ◀" } else { "" }
        ));
    }
    out.push_str(&format!(
        "\nPage {} of {} ({} commits)",
        page.page + 1,
        page.page_count(),
        page.total
    ));
    if page.has_next() {
        out.push_str(&format!(" - next: --page {}", page.page + 2));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeBackend;

    #[tokio::test]
    async fn test_render_located_page() {
        let backend = FakeBackend::builder()
            .with_commit("aaaaaaa111", "latest change\n\nbody", true)
            .with_commit("bbbbbbb222", "refactor", false)
            .with_commit("ccccccc333", "initial", true)
            .build();
        let query = CommitsQuery {
            page_size: Some(2),
            locate: Some("ccccccc".to_string()),
            ..Default::default()
        };

        let page = backend.get_commits(&query).await.unwrap();
        assert_eq!(page.page, 1);
        insta::assert_snapshot!(render_commits(&page, query.locate.as_deref()), @r"
        * ccccccc initial  ◀

        Page 2 of 2 (3 commits)
        ");
    }

    #[tokio::test]
    async fn test_render_first_page() {
        let backend = FakeBackend::builder()
            .with_commit("aaaaaaa111", "latest change\n\nbody", true)
            .with_commit("bbbbbbb222", "refactor", false)
            .with_commit("ccccccc333", "initial", true)
            .build();
        let query = CommitsQuery {
            page_size: Some(2),
            ..Default::default()
        };

        let page = backend.get_commits(&query).await.unwrap();
        insta::assert_snapshot!(render_commits(&page, None), @r"
        * aaaaaaa latest change
          bbbbbbb refactor

        Page 1 of 2 (3 commits) - next: --page 2
        ");
    }
}
