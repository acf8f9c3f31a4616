use crate::error::CoreError;
use crate::slug;
use serde::{Deserialize, Serialize};

/// Numeric id of a page row.
pub type PageId = u32;

/// Language of a page row, `0` is the default language.
pub type LanguageId = u32;

/// Workspace a row belongs to, `0` is the live workspace.
pub type WorkspaceId = u32;

/// The default language of every site.
pub const DEFAULT_LANGUAGE: LanguageId = 0;

/// The published workspace.
pub const LIVE_WORKSPACE: WorkspaceId = 0;

/// A page row as loaded from the content repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub uid: PageId,
    /// Parent page in the default-language tree.
    pub pid: PageId,
    /// Default-language counterpart of a localized row, `0` otherwise.
    pub l10n_parent: PageId,
    pub language_id: LanguageId,
    pub slug: String,
    #[serde(default)]
    pub deleted: bool,
    /// Workspace this row lives in.
    #[serde(default)]
    pub workspace_id: WorkspaceId,
    /// Live row this row is a workspace version of, `0` for live rows.
    #[serde(default)]
    pub live_uid: PageId,
}

impl PageRecord {
    /// Builds a live default-language page.
    pub fn new(uid: PageId, pid: PageId, slug: impl Into<String>) -> Self {
        Self {
            uid,
            pid,
            l10n_parent: 0,
            language_id: 0,
            slug: slug.into(),
            deleted: false,
            workspace_id: 0,
            live_uid: 0,
        }
    }

    /// Builds a live localized overlay of `l10n_parent`.
    pub fn localized(
        uid: PageId,
        pid: PageId,
        l10n_parent: PageId,
        language_id: LanguageId,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            l10n_parent,
            language_id,
            ..Self::new(uid, pid, slug)
        }
    }

    pub fn is_localized(&self) -> bool {
        self.language_id > DEFAULT_LANGUAGE
    }

    pub fn is_workspace_version(&self) -> bool {
        self.live_uid > 0
    }

    /// The uid of the live row, which differs from `uid` for workspace versions.
    pub fn live_id(&self) -> PageId {
        if self.is_workspace_version() {
            self.live_uid
        } else {
            self.uid
        }
    }

    /// The id of the default-language page this row belongs to.
    pub fn default_language_uid(&self) -> PageId {
        if self.is_localized() {
            self.l10n_parent
        } else {
            self.live_id()
        }
    }

    /// Checks the invariants every loaded row must hold.
    pub fn validate(self) -> Result<Self, CoreError> {
        if self.uid == 0 {
            return Err(CoreError::InvalidPage {
                uid: self.uid,
                reason: "uid must be positive".to_string(),
            });
        }
        if self.is_localized() && self.l10n_parent == 0 {
            return Err(CoreError::InvalidPage {
                uid: self.uid,
                reason: format!(
                    "localized row in language {} has no l10n_parent",
                    self.language_id
                ),
            });
        }
        slug::validate(&self.slug).map_err(|e| CoreError::InvalidPage {
            uid: self.uid,
            reason: e.to_string(),
        })?;
        Ok(self)
    }
}
