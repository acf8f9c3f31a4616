use crate::correlation::CorrelationId;
use crate::error::Result;
use crate::page::{LanguageId, PageId, PageRecord, WorkspaceId};
use crate::redirect::{NewRedirect, RedirectRecord};
use async_trait::async_trait;

/// Read access to the page tree.
///
/// Every query skips deleted rows. Tree queries only return rows that are
/// live or were created in `workspace`; workspace versions of live rows are
/// applied separately through [`PageRepository::workspace_overlay`].
#[async_trait]
pub trait PageRepository: Send + Sync + 'static {
    /// Retrieves a page by id. Returns `None` if the page does not exist.
    async fn find_by_uid(&self, uid: PageId) -> Result<Option<PageRecord>>;

    /// Default-language children of `pid`, ordered by `uid`.
    async fn children(&self, pid: PageId, workspace: WorkspaceId) -> Result<Vec<PageRecord>>;

    /// Rows in `language_id` localizing any of `parents`, ordered by `uid`.
    async fn overlays(
        &self,
        parents: &[PageId],
        language_id: LanguageId,
        workspace: WorkspaceId,
    ) -> Result<Vec<PageRecord>>;

    /// Rows in `language_id` carrying exactly `slug`.
    async fn find_by_slug(
        &self,
        slug: &str,
        language_id: LanguageId,
        workspace: WorkspaceId,
    ) -> Result<Vec<PageRecord>>;

    /// Replaces rows by their version in `workspace`, if any.
    ///
    /// Rows whose version is marked deleted are dropped. Order is preserved.
    async fn workspace_overlay(
        &self,
        pages: Vec<PageRecord>,
        workspace: WorkspaceId,
    ) -> Result<Vec<PageRecord>>;
}

/// Whether a write may trigger another slug cascade downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Hooks listening for slug changes run as usual.
    Cascade,
    /// The write is itself part of a cascade; hooks must not re-run it.
    Suppressed,
}

/// A single slug write handed to the record-editing pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugUpdate {
    pub uid: PageId,
    pub slug: String,
    pub correlation_id: CorrelationId,
    pub propagation: Propagation,
    pub workspace: WorkspaceId,
    /// Backend user performing the change, `0` for none.
    pub actor: u32,
    /// Unix seconds.
    pub tstamp: i64,
}

/// Write access to pages, the way the editing pipeline persists field changes.
#[async_trait]
pub trait PageWriter: Send + Sync + 'static {
    /// Persists a new slug and records it in the history log.
    ///
    /// Outside the live workspace the change lands on the page's workspace
    /// version, which is created on first write.
    async fn update_slug(&self, update: SlugUpdate) -> Result<()>;
}

#[async_trait]
pub trait RedirectRepository: Send + Sync + 'static {
    /// Inserts a redirect row and returns it with its assigned id.
    ///
    /// No duplicate check is performed.
    async fn insert(&self, redirect: NewRedirect) -> Result<RedirectRecord>;

    /// Non-deleted redirects whose source matches `source_host` and `source_path`.
    async fn find_by_source(
        &self,
        source_host: &str,
        source_path: &str,
    ) -> Result<Vec<RedirectRecord>>;
}
