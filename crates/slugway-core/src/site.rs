use crate::error::CoreError;
use crate::page::{LanguageId, PageId};
use crate::settings::RedirectSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

/// Wildcard host used for redirects of sites without a configured host.
pub const ANY_HOST: &str = "*";

/// One language of a site and the base URL pages are served under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteLanguage {
    pub language_id: LanguageId,
    /// Absolute (`https://example.com/en/`) or host-relative (`/en/`) base.
    pub base: String,
}

impl SiteLanguage {
    /// Host of the base URL, `None` for host-relative bases.
    pub fn host(&self) -> Result<Option<String>, CoreError> {
        if self.base.starts_with('/') || self.base.is_empty() {
            return Ok(None);
        }
        let url = self.parse_base()?;
        Ok(url.host_str().map(ToString::to_string))
    }

    /// Path of the base URL without the trailing `/`.
    pub fn base_path(&self) -> Result<String, CoreError> {
        let path = if self.base.starts_with('/') || self.base.is_empty() {
            self.base.split(['?', '#']).next().unwrap_or_default().to_string()
        } else {
            self.parse_base()?.path().to_string()
        };
        Ok(path.trim_end_matches('/').to_string())
    }

    /// The `source_host` value of redirects created for this language.
    pub fn redirect_host(&self) -> Result<String, CoreError> {
        Ok(self.host()?.unwrap_or_else(|| ANY_HOST.to_string()))
    }

    fn parse_base(&self) -> Result<Url, CoreError> {
        Url::parse(&self.base).map_err(|e| CoreError::InvalidSiteBase {
            base: self.base.clone(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default)]
    pub redirects: RedirectSettings,
}

/// A site rooted at a page of the default-language tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub identifier: String,
    pub root_page_id: PageId,
    pub languages: Vec<SiteLanguage>,
    #[serde(default)]
    pub settings: SiteSettings,
}

impl Site {
    pub fn language(&self, language_id: LanguageId) -> Option<&SiteLanguage> {
        self.languages
            .iter()
            .find(|language| language.language_id == language_id)
    }

    pub fn redirect_settings(&self) -> RedirectSettings {
        self.settings.redirects
    }
}

/// Resolves the site a page belongs to.
#[async_trait]
pub trait SiteRegistry: Send + Sync + 'static {
    /// Returns `None` when the page is not part of any configured site.
    async fn site_for_page(&self, page_id: PageId) -> crate::Result<Option<Site>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn language(base: &str) -> SiteLanguage {
        SiteLanguage {
            language_id: 0,
            base: base.to_string(),
        }
    }

    #[test]
    fn absolute_base() {
        let lang = language("https://example.com/en/");
        assert_eq!(lang.host().unwrap().as_deref(), Some("example.com"));
        assert_eq!(lang.base_path().unwrap(), "/en");
        assert_eq!(lang.redirect_host().unwrap(), "example.com");
    }

    #[test]
    fn absolute_base_without_path() {
        let lang = language("https://example.com");
        assert_eq!(lang.base_path().unwrap(), "");
    }

    #[test]
    fn relative_base_uses_wildcard_host() {
        let lang = language("/de/");
        assert_eq!(lang.host().unwrap(), None);
        assert_eq!(lang.base_path().unwrap(), "/de");
        assert_eq!(lang.redirect_host().unwrap(), "*");

        assert_eq!(language("/").base_path().unwrap(), "");
    }

    #[test]
    fn invalid_absolute_base() {
        let lang = language("not a url");
        assert!(matches!(
            lang.base_path(),
            Err(CoreError::InvalidSiteBase { .. })
        ));
    }

    #[test]
    fn site_deserializes_with_default_settings() {
        let site: Site = serde_json::from_str(
            r#"{
                "identifier": "main",
                "rootPageId": 1,
                "languages": [{"languageId": 0, "base": "https://example.com/"}]
            }"#,
        )
        .unwrap();
        assert_eq!(site.redirect_settings(), RedirectSettings::default());
        assert!(site.language(0).is_some());
        assert!(site.language(1).is_none());
    }
}
