use crate::page::{WorkspaceId, LIVE_WORKSPACE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HTTP_STATUS_CODE: u16 = 307;

/// The `settings.redirects` block of a site.
///
/// Every key is optional in the site configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RedirectSettings {
    pub auto_update_slugs: bool,
    pub auto_create_redirects: bool,
    /// Lifetime of created redirects in days, `0` keeps them forever.
    #[serde(rename = "redirectTTL")]
    pub redirect_ttl: u32,
    pub http_status_code: u16,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            auto_update_slugs: true,
            auto_create_redirects: true,
            redirect_ttl: 0,
            http_status_code: DEFAULT_HTTP_STATUS_CODE,
        }
    }
}

impl RedirectSettings {
    /// The settings in effect for a change made in `workspace`.
    ///
    /// Redirects only exist for published content.
    pub fn effective_for(mut self, workspace: WorkspaceId) -> Self {
        if workspace != LIVE_WORKSPACE {
            self.auto_create_redirects = false;
        }
        self
    }

    /// Whether a slug change has anything to do at all.
    pub fn is_active(&self) -> bool {
        self.auto_update_slugs || self.auto_create_redirects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let settings: RedirectSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, RedirectSettings::default());
        assert!(settings.auto_update_slugs);
        assert!(settings.auto_create_redirects);
        assert_eq!(settings.redirect_ttl, 0);
        assert_eq!(settings.http_status_code, 307);
    }

    #[test]
    fn reads_camel_case_keys() {
        let settings: RedirectSettings = serde_json::from_str(
            r#"{"autoUpdateSlugs": false, "redirectTTL": 10, "httpStatusCode": 301}"#,
        )
        .unwrap();
        assert!(!settings.auto_update_slugs);
        assert!(settings.auto_create_redirects);
        assert_eq!(settings.redirect_ttl, 10);
        assert_eq!(settings.http_status_code, 301);
    }

    #[test]
    fn redirects_are_disabled_outside_live_workspace() {
        let settings = RedirectSettings::default();
        assert!(settings.effective_for(LIVE_WORKSPACE).auto_create_redirects);

        let draft = settings.effective_for(3);
        assert!(!draft.auto_create_redirects);
        assert!(draft.auto_update_slugs);
        assert!(draft.is_active());
    }

    #[test]
    fn inactive_when_both_switches_are_off() {
        let settings = RedirectSettings {
            auto_update_slugs: false,
            auto_create_redirects: false,
            ..RedirectSettings::default()
        };
        assert!(!settings.is_active());
    }
}
