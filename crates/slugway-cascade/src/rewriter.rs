use crate::error::Result;
use crate::guard::InFlightPages;
use slugway_core::slug::{self, MAX_NUMERIC_SUFFIX};
use slugway_core::{
    CorrelationId, PageRecord, PageRepository, PageWriter, Propagation, Site, SiteRegistry,
    SlugUpdate, WorkspaceId,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Moves sub-page slugs below a renamed parent and persists them.
pub struct SlugRewriter<'a> {
    pub(crate) pages: &'a dyn PageRepository,
    pub(crate) writer: &'a dyn PageWriter,
    pub(crate) sites: &'a dyn SiteRegistry,
    pub(crate) in_flight: &'a Arc<InFlightPages>,
    pub(crate) site: &'a Site,
    pub(crate) correlation_id: &'a CorrelationId,
    pub(crate) workspace: WorkspaceId,
    pub(crate) actor: u32,
    /// Unix seconds.
    pub(crate) now: i64,
}

impl SlugRewriter<'_> {
    /// Rewrites the slug of `page` if it lives below `old_parent_slug`.
    ///
    /// Returns the persisted slug, or `None` when the page was left alone.
    pub async fn update_slug(
        &self,
        page: &PageRecord,
        old_parent_slug: &str,
        new_parent_slug: &str,
    ) -> Result<Option<String>> {
        let Some(candidate) = slug::rewrite_prefix(&page.slug, old_parent_slug, new_parent_slug)
        else {
            trace!(page_id = page.uid, slug = %page.slug, "slug not below renamed parent");
            return Ok(None);
        };

        let new_slug = self.unique_in_site(&candidate, page).await?;
        if new_slug != candidate {
            debug!(page_id = page.uid, candidate = %candidate, slug = %new_slug, "slug collision resolved");
        }

        self.persist(page, &new_slug).await?;
        Ok(Some(new_slug))
    }

    /// Whether no other page of the same site and language uses `candidate`.
    ///
    /// Live rows are compared with their version in the rewriter's workspace,
    /// so a page whose draft moved away from `candidate` does not collide.
    pub async fn is_unique_in_site(&self, candidate: &str, page: &PageRecord) -> Result<bool> {
        let found = self
            .pages
            .find_by_slug(candidate, page.language_id, self.workspace)
            .await?;
        let others = self.pages.workspace_overlay(found, self.workspace).await?;

        for other in others {
            if other.slug != candidate
                || other.uid == page.uid
                || other.live_id() == page.live_id()
            {
                continue;
            }
            let other_site = self
                .sites
                .site_for_page(other.default_language_uid())
                .await?;
            if other_site.is_some_and(|site| site.identifier == self.site.identifier) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn unique_in_site(&self, candidate: &str, page: &PageRecord) -> Result<String> {
        if self.is_unique_in_site(candidate, page).await? {
            return Ok(candidate.to_string());
        }

        for attempt in 1..MAX_NUMERIC_SUFFIX {
            let variant = slug::with_numeric_suffix(candidate, attempt);
            if self.is_unique_in_site(&variant, page).await? {
                return Ok(variant);
            }
        }

        Ok(slug::with_hash_suffix(
            candidate,
            &format!("{}:{}", page.uid, self.now),
        ))
    }

    async fn persist(&self, page: &PageRecord, new_slug: &str) -> Result<()> {
        let _guard = self.in_flight.hold(self.correlation_id, page.uid);

        self.writer
            .update_slug(SlugUpdate {
                uid: page.uid,
                slug: new_slug.to_string(),
                correlation_id: self.correlation_id.clone(),
                propagation: Propagation::Suppressed,
                workspace: self.workspace,
                actor: self.actor,
                tstamp: self.now,
            })
            .await?;

        debug!(page_id = page.uid, old_slug = %page.slug, new_slug = %new_slug, "slug updated");
        Ok(())
    }
}
