use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use slugway_core::error::{Result, StorageError};
use slugway_core::history::{HistoryAction, HistoryEntry, RecordHistory, PAGES_TABLE};
use slugway_core::page::{LanguageId, PageId, PageRecord, WorkspaceId, LIVE_WORKSPACE};
use slugway_core::redirect::{NewRedirect, RedirectId, RedirectRecord};
use slugway_core::repository::{PageRepository, PageWriter, RedirectRepository, SlugUpdate};
use slugway_core::CorrelationId;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::trace;

/// In-memory implementation of every storage port.
///
/// Pages and redirects live in DashMaps keyed by uid; the history log and
/// the record of slug writes are append-only vectors. Share one store
/// between the service and the caller through an `Arc`.
#[derive(Debug)]
pub struct InMemoryStore {
    pages: DashMap<PageId, PageRecord>,
    redirects: DashMap<RedirectId, RedirectRecord>,
    history: Mutex<Vec<HistoryEntry>>,
    slug_writes: Mutex<Vec<SlugUpdate>>,
    next_page_uid: AtomicU32,
    next_redirect_uid: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            redirects: DashMap::new(),
            history: Mutex::new(Vec::new()),
            slug_writes: Mutex::new(Vec::new()),
            next_page_uid: AtomicU32::new(1),
            next_redirect_uid: AtomicU64::new(1),
        }
    }

    /// Creates a store holding `pages`.
    pub fn with_pages(pages: impl IntoIterator<Item = PageRecord>) -> Result<Self> {
        let store = Self::new();
        for page in pages {
            store.insert_page(page)?;
        }
        Ok(store)
    }

    /// Adds or replaces a page row after validating it.
    pub fn insert_page(&self, page: PageRecord) -> Result<()> {
        let page = page.validate()?;
        self.next_page_uid.fetch_max(page.uid + 1, Ordering::SeqCst);
        self.pages.insert(page.uid, page);
        Ok(())
    }

    /// Returns a page row regardless of its deleted flag.
    pub fn page(&self, uid: PageId) -> Option<PageRecord> {
        self.pages.get(&uid).map(|entry| entry.clone())
    }

    /// All page rows, ordered by uid.
    pub fn pages(&self) -> Vec<PageRecord> {
        sorted_by_uid(self.pages.iter().map(|entry| entry.clone()).collect())
    }

    /// All redirect rows, ordered by uid.
    pub fn redirects(&self) -> Vec<RedirectRecord> {
        let mut redirects: Vec<_> = self.redirects.iter().map(|entry| entry.clone()).collect();
        redirects.sort_by_key(|redirect| redirect.uid);
        redirects
    }

    /// All history entries in insertion order.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().clone()
    }

    /// Every slug write received through [`PageWriter`], in order.
    pub fn slug_writes(&self) -> Vec<SlugUpdate> {
        self.slug_writes.lock().clone()
    }

    fn visible_in(page: &PageRecord, workspace: WorkspaceId) -> bool {
        !page.deleted
            && (page.workspace_id == LIVE_WORKSPACE || page.workspace_id == workspace)
    }

    fn tree_rows(&self, workspace: WorkspaceId, filter: impl Fn(&PageRecord) -> bool) -> Vec<PageRecord> {
        sorted_by_uid(
            self.pages
                .iter()
                .filter(|entry| {
                    let page = entry.value();
                    Self::visible_in(page, workspace) && !page.is_workspace_version() && filter(page)
                })
                .map(|entry| entry.clone())
                .collect(),
        )
    }

    fn version_of(&self, live_uid: PageId, workspace: WorkspaceId) -> Option<PageRecord> {
        self.pages
            .iter()
            .find(|entry| entry.live_uid == live_uid && entry.workspace_id == workspace)
            .map(|entry| entry.clone())
    }

    /// Picks the row a write in `workspace` lands on, creating a version when needed.
    fn writable_row(&self, uid: PageId, workspace: WorkspaceId) -> Result<PageId> {
        let page = self
            .pages
            .get(&uid)
            .filter(|entry| !entry.deleted)
            .map(|entry| entry.clone())
            .ok_or_else(|| StorageError::NotFound(format!("page {uid}")))?;

        if workspace == LIVE_WORKSPACE || page.workspace_id == workspace {
            return Ok(page.uid);
        }

        if let Some(version) = self.version_of(page.uid, workspace) {
            return Ok(version.uid);
        }

        let version_uid = self.next_page_uid.fetch_add(1, Ordering::SeqCst);
        trace!(page_id = uid, version_uid, workspace, "creating workspace version");
        self.pages.insert(
            version_uid,
            PageRecord {
                uid: version_uid,
                workspace_id: workspace,
                live_uid: page.uid,
                ..page
            },
        );
        Ok(version_uid)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_by_uid(mut pages: Vec<PageRecord>) -> Vec<PageRecord> {
    pages.sort_by_key(|page| page.uid);
    pages
}

#[async_trait]
impl PageRepository for InMemoryStore {
    async fn find_by_uid(&self, uid: PageId) -> Result<Option<PageRecord>> {
        Ok(self
            .pages
            .get(&uid)
            .filter(|entry| !entry.deleted)
            .map(|entry| entry.clone()))
    }

    async fn children(&self, pid: PageId, workspace: WorkspaceId) -> Result<Vec<PageRecord>> {
        Ok(self.tree_rows(workspace, |page| page.pid == pid && !page.is_localized()))
    }

    async fn overlays(
        &self,
        parents: &[PageId],
        language_id: LanguageId,
        workspace: WorkspaceId,
    ) -> Result<Vec<PageRecord>> {
        Ok(self.tree_rows(workspace, |page| {
            page.language_id == language_id && parents.contains(&page.l10n_parent)
        }))
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        language_id: LanguageId,
        workspace: WorkspaceId,
    ) -> Result<Vec<PageRecord>> {
        Ok(sorted_by_uid(
            self.pages
                .iter()
                .filter(|entry| {
                    Self::visible_in(entry.value(), workspace)
                        && entry.language_id == language_id
                        && entry.slug == slug
                })
                .map(|entry| entry.clone())
                .collect(),
        ))
    }

    async fn workspace_overlay(
        &self,
        pages: Vec<PageRecord>,
        workspace: WorkspaceId,
    ) -> Result<Vec<PageRecord>> {
        if workspace == LIVE_WORKSPACE {
            return Ok(pages);
        }

        Ok(pages
            .into_iter()
            .filter_map(|page| match self.version_of(page.uid, workspace) {
                Some(version) if version.deleted => None,
                Some(version) => Some(version),
                None => Some(page),
            })
            .collect())
    }
}

#[async_trait]
impl PageWriter for InMemoryStore {
    async fn update_slug(&self, update: SlugUpdate) -> Result<()> {
        let target = self.writable_row(update.uid, update.workspace)?;

        if let Some(mut page) = self.pages.get_mut(&target) {
            page.slug = update.slug.clone();
        }

        self.history.lock().push(HistoryEntry {
            table: PAGES_TABLE.to_string(),
            record_uid: u64::from(target),
            action: HistoryAction::Update,
            payload: serde_json::json!({ "slug": update.slug }),
            correlation_id: update.correlation_id.clone(),
            tstamp: update.tstamp,
            actor: update.actor,
        });
        self.slug_writes.lock().push(update);
        Ok(())
    }
}

#[async_trait]
impl RedirectRepository for InMemoryStore {
    async fn insert(&self, redirect: NewRedirect) -> Result<RedirectRecord> {
        let uid = self.next_redirect_uid.fetch_add(1, Ordering::SeqCst);
        let record = redirect.with_uid(uid);
        self.redirects.insert(uid, record.clone());
        Ok(record)
    }

    async fn find_by_source(
        &self,
        source_host: &str,
        source_path: &str,
    ) -> Result<Vec<RedirectRecord>> {
        let mut found: Vec<_> = self
            .redirects
            .iter()
            .filter(|entry| {
                let r = &entry.redirect;
                !r.deleted && r.source_host == source_host && r.source_path == source_path
            })
            .map(|entry| entry.clone())
            .collect();
        found.sort_by_key(|redirect| redirect.uid);
        Ok(found)
    }
}

#[async_trait]
impl RecordHistory for InMemoryStore {
    async fn add_record(&self, entry: HistoryEntry) -> Result<()> {
        self.history.lock().push(entry);
        Ok(())
    }

    async fn find_by_correlation(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .history
            .lock()
            .iter()
            .filter(|entry| &entry.correlation_id == correlation_id)
            .cloned()
            .collect())
    }
}
