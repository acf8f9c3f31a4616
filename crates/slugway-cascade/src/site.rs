use crate::error::ConfigError;
use async_trait::async_trait;
use serde::Deserialize;
use slugway_core::{PageId, PageRepository, Site, SiteRegistry, StorageError};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SiteDocument {
    sites: Vec<Site>,
}

/// Site registry backed by a static list of sites.
///
/// A page belongs to the site whose root page is found first when walking
/// up its rootline through `pid` (localized pages through `l10n_parent`).
pub struct ConfiguredSiteRegistry {
    sites: HashMap<PageId, Site>,
    pages: Arc<dyn PageRepository>,
}

impl ConfiguredSiteRegistry {
    pub fn new(sites: Vec<Site>, pages: Arc<dyn PageRepository>) -> Result<Self, ConfigError> {
        let mut identifiers = HashSet::new();
        let mut by_root: HashMap<PageId, Site> = HashMap::new();

        for site in sites {
            validate(&site)?;
            if !identifiers.insert(site.identifier.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate site identifier '{}'",
                    site.identifier
                )));
            }
            if let Some(other) = by_root.get(&site.root_page_id) {
                return Err(ConfigError::Invalid(format!(
                    "sites '{}' and '{}' share root page {}",
                    other.identifier, site.identifier, site.root_page_id
                )));
            }
            by_root.insert(site.root_page_id, site);
        }

        Ok(Self {
            sites: by_root,
            pages,
        })
    }

    /// Parses a `{"sites": [...]}` document.
    pub fn from_json(json: &str, pages: Arc<dyn PageRepository>) -> Result<Self, ConfigError> {
        let document: SiteDocument = serde_json::from_str(json)?;
        Self::new(document.sites, pages)
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        pages: Arc<dyn PageRepository>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Self::from_json(&json, pages)?;
        info!(path = %path.display(), sites = registry.sites.len(), "loaded site configuration");
        Ok(registry)
    }

    pub fn sites(&self) -> impl Iterator<Item = &Site> {
        self.sites.values()
    }
}

fn validate(site: &Site) -> Result<(), ConfigError> {
    if site.identifier.is_empty() {
        return Err(ConfigError::Invalid("site identifier is empty".to_string()));
    }
    if site.root_page_id == 0 {
        return Err(ConfigError::Invalid(format!(
            "site '{}' has no root page",
            site.identifier
        )));
    }

    let mut language_ids = HashSet::new();
    for language in &site.languages {
        if !language_ids.insert(language.language_id) {
            return Err(ConfigError::Invalid(format!(
                "site '{}' lists language {} twice",
                site.identifier, language.language_id
            )));
        }
        language
            .base_path()
            .and_then(|_| language.host())
            .map_err(|e| ConfigError::Invalid(format!("site '{}': {e}", site.identifier)))?;
    }
    Ok(())
}

#[async_trait]
impl SiteRegistry for ConfiguredSiteRegistry {
    async fn site_for_page(&self, page_id: PageId) -> slugway_core::Result<Option<Site>> {
        let mut seen = HashSet::new();
        let mut current = page_id;

        loop {
            if let Some(site) = self.sites.get(&current) {
                debug!(page_id, site = %site.identifier, "resolved site");
                return Ok(Some(site.clone()));
            }
            if current == 0 {
                break;
            }
            seen.insert(current);
            let Some(page) = self.pages.find_by_uid(current).await? else {
                break;
            };
            current = if page.is_localized() {
                page.l10n_parent
            } else {
                page.pid
            };
            if seen.contains(&current) {
                return Err(StorageError::InvalidData(format!(
                    "rootline of page {page_id} loops at page {current}"
                )));
            }
        }

        debug!(page_id, "page outside of any site");
        Ok(None)
    }
}
