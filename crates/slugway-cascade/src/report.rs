use serde::Serialize;
use slugway_core::{PageId, RedirectRecord, RedirectSettings, SlugChangeCorrelations};

/// How a slug change request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStatus {
    Completed,
    /// The page does not exist or is deleted.
    PageNotFound,
    /// Both slug updates and redirect creation are switched off for the site.
    Disabled,
    /// The saved slug is one of a running cascade's own writes.
    AlreadyRunning,
    /// Old and new slug are equal.
    Unchanged,
}

/// A sub-page slug rewritten by a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedSlug {
    pub uid: PageId,
    pub old_slug: String,
    pub new_slug: String,
}

/// Everything one slug change request wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub page_id: PageId,
    pub status: CascadeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<RedirectSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlations: Option<SlugChangeCorrelations>,
    /// Created redirects, the edited page's first.
    pub redirects: Vec<RedirectRecord>,
    /// Rewritten sub-pages in tree order.
    pub updated_pages: Vec<UpdatedSlug>,
}

impl CascadeReport {
    /// A request that wrote nothing.
    pub fn skipped(page_id: PageId, status: CascadeStatus) -> Self {
        Self {
            page_id,
            status,
            settings: None,
            correlations: None,
            redirects: Vec::new(),
            updated_pages: Vec::new(),
        }
    }

    pub(crate) fn started(
        page_id: PageId,
        settings: RedirectSettings,
        correlations: SlugChangeCorrelations,
    ) -> Self {
        Self {
            settings: Some(settings),
            correlations: Some(correlations),
            ..Self::skipped(page_id, CascadeStatus::Completed)
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.status != CascadeStatus::Completed
    }
}
