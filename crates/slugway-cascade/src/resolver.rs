use crate::error::{CascadeError, Result};
use slugway_core::{LanguageId, PageId, PageRecord, PageRepository, WorkspaceId, DEFAULT_LANGUAGE};
use std::collections::HashSet;
use tracing::trace;

/// Default bound on the depth of a resolved sub-page tree.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Collects every descendant of a page in one language.
///
/// The tree is always walked along the default-language `pid` links; in
/// other languages each level is swapped for the localized rows of that
/// level. Default-language pages without a localized row are skipped
/// together with their subtree.
pub struct SubPageResolver<'a> {
    pages: &'a dyn PageRepository,
    workspace: WorkspaceId,
    max_depth: usize,
}

impl<'a> SubPageResolver<'a> {
    pub fn new(pages: &'a dyn PageRepository, workspace: WorkspaceId, max_depth: usize) -> Self {
        Self {
            pages,
            workspace,
            max_depth,
        }
    }

    /// Descendants of the default-language page `page_id`, depth-first in
    /// pre-order with siblings ordered by `uid`.
    pub async fn resolve(
        &self,
        page_id: PageId,
        language_id: LanguageId,
    ) -> Result<Vec<PageRecord>> {
        let mut visited = HashSet::from([page_id]);
        let mut results = Vec::new();
        let mut stack = self.push_level(Vec::new(), page_id, language_id, 1).await?;

        while let Some((page, depth)) = stack.pop() {
            // the walk continues along the default-language tree
            let next = if language_id == DEFAULT_LANGUAGE {
                page.live_id()
            } else {
                page.l10n_parent
            };
            results.push(page);

            if !visited.insert(next) {
                return Err(CascadeError::CyclicPageTree { page_id: next });
            }
            stack = self.push_level(stack, next, language_id, depth + 1).await?;
        }

        Ok(results)
    }

    async fn push_level(
        &self,
        mut stack: Vec<(PageRecord, usize)>,
        page_id: PageId,
        language_id: LanguageId,
        depth: usize,
    ) -> Result<Vec<(PageRecord, usize)>> {
        let level = self.level(page_id, language_id).await?;
        if level.is_empty() {
            return Ok(stack);
        }
        if depth > self.max_depth {
            return Err(CascadeError::TreeTooDeep {
                page_id,
                max_depth: self.max_depth,
            });
        }

        trace!(page_id, language_id, depth, count = level.len(), "resolved sub-pages");
        stack.extend(level.into_iter().rev().map(|page| (page, depth)));
        Ok(stack)
    }

    /// The direct children of `page_id` in `language_id`.
    async fn level(&self, page_id: PageId, language_id: LanguageId) -> Result<Vec<PageRecord>> {
        let mut rows = self.pages.children(page_id, self.workspace).await?;

        if language_id > DEFAULT_LANGUAGE && !rows.is_empty() {
            let parents: Vec<PageId> = rows.iter().map(|page| page.uid).collect();
            rows = self
                .pages
                .overlays(&parents, language_id, self.workspace)
                .await?;
        }

        if rows.is_empty() {
            return Ok(rows);
        }
        Ok(self.pages.workspace_overlay(rows, self.workspace).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slugway_core::LIVE_WORKSPACE;
    use slugway_storage::InMemoryStore;

    fn uids(pages: &[PageRecord]) -> Vec<PageId> {
        pages.iter().map(|page| page.uid).collect()
    }

    fn tree() -> InMemoryStore {
        InMemoryStore::with_pages([
            PageRecord::new(1, 0, "/"),
            PageRecord::new(2, 1, "/a"),
            PageRecord::new(5, 2, "/a/y"),
            PageRecord::new(4, 2, "/a/x"),
            PageRecord::new(6, 4, "/a/x/deep"),
            PageRecord::new(3, 1, "/b"),
            PageRecord::localized(10, 1, 2, 1, "/a"),
            PageRecord::localized(11, 2, 4, 1, "/a/x"),
            PageRecord::localized(12, 4, 6, 1, "/a/x/deep"),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn default_language_walk_is_pre_order_by_uid() {
        let store = tree();
        let resolver = SubPageResolver::new(&store, LIVE_WORKSPACE, DEFAULT_MAX_DEPTH);

        let pages = resolver.resolve(2, 0).await.unwrap();
        assert_eq!(uids(&pages), [4, 6, 5]);

        let pages = resolver.resolve(1, 0).await.unwrap();
        assert_eq!(uids(&pages), [2, 4, 6, 5, 3]);
    }

    #[tokio::test]
    async fn localized_walk_follows_default_tree_and_drops_untranslated_pages() {
        let store = tree();
        let resolver = SubPageResolver::new(&store, LIVE_WORKSPACE, DEFAULT_MAX_DEPTH);

        let pages = resolver.resolve(2, 1).await.unwrap();
        assert_eq!(uids(&pages), [11, 12]);
        assert!(pages.iter().all(|page| page.language_id == 1));
    }

    #[tokio::test]
    async fn leaf_has_no_sub_pages() {
        let store = tree();
        let resolver = SubPageResolver::new(&store, LIVE_WORKSPACE, DEFAULT_MAX_DEPTH);

        assert!(resolver.resolve(6, 0).await.unwrap().is_empty());
        assert!(resolver.resolve(404, 0).await.unwrap().is_empty());
        assert!(resolver.resolve(3, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cyclic_tree_is_reported() {
        let store = InMemoryStore::with_pages([
            PageRecord::new(1, 3, "/a"),
            PageRecord::new(2, 1, "/a/b"),
            PageRecord::new(3, 2, "/a/b/c"),
        ])
        .unwrap();
        let resolver = SubPageResolver::new(&store, LIVE_WORKSPACE, DEFAULT_MAX_DEPTH);

        let err = resolver.resolve(1, 0).await.unwrap_err();
        assert!(matches!(err, CascadeError::CyclicPageTree { page_id: 1 }));
    }

    #[tokio::test]
    async fn depth_bound_is_enforced() {
        let store = tree();
        let resolver = SubPageResolver::new(&store, LIVE_WORKSPACE, 2);

        let err = resolver.resolve(1, 0).await.unwrap_err();
        assert!(matches!(
            err,
            CascadeError::TreeTooDeep {
                page_id: 4,
                max_depth: 2
            }
        ));

        let pages = SubPageResolver::new(&store, LIVE_WORKSPACE, 2)
            .resolve(2, 0)
            .await
            .unwrap();
        assert_eq!(uids(&pages), [4, 6, 5]);
    }

    #[tokio::test]
    async fn workspace_versions_replace_live_rows() {
        let store = tree();
        store
            .insert_page(PageRecord {
                workspace_id: 9,
                live_uid: 4,
                ..PageRecord::new(40, 2, "/a/x-draft")
            })
            .unwrap();
        let resolver = SubPageResolver::new(&store, 9, DEFAULT_MAX_DEPTH);

        let pages = resolver.resolve(2, 0).await.unwrap();
        assert_eq!(uids(&pages), [40, 6, 5]);
        assert_eq!(pages[0].slug, "/a/x-draft");
    }
}
