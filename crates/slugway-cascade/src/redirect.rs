use crate::error::{CascadeError, Result};
use jiff::{SignedDuration, Timestamp};
use slugway_core::history::REDIRECT_TABLE;
use slugway_core::{
    CorrelationId, HistoryAction, HistoryEntry, LanguageId, NewRedirect, RecordHistory,
    RedirectRecord, RedirectRepository, RedirectSettings, Site,
};
use tracing::info;

/// Creates redirects from an old slug to its replacement and records them in
/// the audit log.
pub struct RedirectCreator<'a> {
    pub(crate) redirects: &'a dyn RedirectRepository,
    pub(crate) history: &'a dyn RecordHistory,
    pub(crate) site: &'a Site,
    pub(crate) settings: RedirectSettings,
    pub(crate) correlation_id: &'a CorrelationId,
    pub(crate) actor: u32,
    pub(crate) now: Timestamp,
}

impl RedirectCreator<'_> {
    pub async fn create_redirect(
        &self,
        old_slug: &str,
        new_slug: &str,
        language_id: LanguageId,
    ) -> Result<RedirectRecord> {
        let language =
            self.site
                .language(language_id)
                .ok_or_else(|| CascadeError::LanguageNotFound {
                    site: self.site.identifier.clone(),
                    language_id,
                })?;
        let base_path = language.base_path()?;
        let source_host = language.redirect_host()?;
        let now = self.now.as_second();

        let redirect = NewRedirect::builder()
            .createdon(now)
            .updatedon(now)
            .createdby(self.actor)
            .endtime(self.endtime()?)
            .source_host(source_host)
            .source_path(format!("{base_path}{old_slug}"))
            .target(format!("{base_path}{new_slug}"))
            .target_statuscode(self.settings.http_status_code)
            .build();

        let record = self.redirects.insert(redirect).await?;

        let payload = serde_json::to_value(&record)
            .map_err(|e| CascadeError::Serialization(e.to_string()))?;
        self.history
            .add_record(HistoryEntry {
                table: REDIRECT_TABLE.to_string(),
                record_uid: record.uid,
                action: HistoryAction::Insert,
                payload,
                correlation_id: self.correlation_id.clone(),
                tstamp: now,
                actor: self.actor,
            })
            .await?;

        info!(
            redirect_id = record.uid,
            source_host = %record.redirect.source_host,
            source_path = %record.redirect.source_path,
            target = %record.redirect.target,
            status = record.redirect.target_statuscode,
            endtime = record.redirect.endtime,
            "redirect created"
        );
        Ok(record)
    }

    /// Expiry of new redirects in Unix seconds, `0` when they never expire.
    fn endtime(&self) -> Result<i64> {
        let days = self.settings.redirect_ttl;
        if days == 0 {
            return Ok(0);
        }
        let ttl = SignedDuration::from_hours(i64::from(days) * 24);
        self.now
            .checked_add(ttl)
            .map(|expiry| expiry.as_second())
            .map_err(|_| CascadeError::RedirectTtlOverflow { days })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slugway_core::{SiteLanguage, SiteSettings};
    use slugway_storage::InMemoryStore;

    const NOW: i64 = 1_700_000_000;

    fn site(base: &str) -> Site {
        Site {
            identifier: "main".to_string(),
            root_page_id: 1,
            languages: vec![
                SiteLanguage {
                    language_id: 0,
                    base: base.to_string(),
                },
                SiteLanguage {
                    language_id: 1,
                    base: "/de/".to_string(),
                },
            ],
            settings: SiteSettings::default(),
        }
    }

    fn correlation_id() -> CorrelationId {
        CorrelationId::for_subject("s").with_aspects(["slugway", "redirect"])
    }

    fn creator<'a>(
        store: &'a InMemoryStore,
        site: &'a Site,
        settings: RedirectSettings,
        correlation_id: &'a CorrelationId,
    ) -> RedirectCreator<'a> {
        RedirectCreator {
            redirects: store,
            history: store,
            site,
            settings,
            correlation_id,
            actor: 7,
            now: Timestamp::from_second(NOW).unwrap(),
        }
    }

    #[tokio::test]
    async fn creates_redirect_under_site_base() {
        let store = InMemoryStore::new();
        let site = site("https://example.com/en/");
        let correlation_id = correlation_id();

        let record = creator(&store, &site, RedirectSettings::default(), &correlation_id)
            .create_redirect("/a", "/b", 0)
            .await
            .unwrap();

        let redirect = &record.redirect;
        assert_eq!(redirect.source_host, "example.com");
        assert_eq!(redirect.source_path, "/en/a");
        assert_eq!(redirect.target, "/en/b");
        assert_eq!(redirect.target_statuscode, 307);
        assert_eq!(redirect.endtime, 0);
        assert_eq!(redirect.createdon, NOW);
        assert_eq!(redirect.updatedon, NOW);
        assert_eq!(redirect.createdby, 7);
        assert_eq!(redirect.hitcount, 0);
        assert!(!redirect.is_regexp && !redirect.force_https);
        assert_eq!(store.redirects(), vec![record]);
    }

    #[tokio::test]
    async fn relative_base_uses_wildcard_host() {
        let store = InMemoryStore::new();
        let site = site("/");
        let correlation_id = correlation_id();

        let record = creator(&store, &site, RedirectSettings::default(), &correlation_id)
            .create_redirect("/a", "/b", 1)
            .await
            .unwrap();

        assert_eq!(record.redirect.source_host, "*");
        assert_eq!(record.redirect.source_path, "/de/a");
        assert_eq!(record.redirect.target, "/de/b");
    }

    #[tokio::test]
    async fn ttl_and_status_code_come_from_settings() {
        let store = InMemoryStore::new();
        let site = site("/");
        let correlation_id = correlation_id();
        let settings = RedirectSettings {
            redirect_ttl: 10,
            http_status_code: 301,
            ..RedirectSettings::default()
        };

        let record = creator(&store, &site, settings, &correlation_id)
            .create_redirect("/a", "/b", 0)
            .await
            .unwrap();

        assert_eq!(record.redirect.endtime, NOW + 864_000);
        assert_eq!(record.redirect.target_statuscode, 301);
    }

    #[tokio::test]
    async fn history_records_the_redirect() {
        let store = InMemoryStore::new();
        let site = site("/");
        let correlation_id = correlation_id();

        let record = creator(&store, &site, RedirectSettings::default(), &correlation_id)
            .create_redirect("/a", "/b", 0)
            .await
            .unwrap();

        let history = store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].table, REDIRECT_TABLE);
        assert_eq!(history[0].record_uid, record.uid);
        assert_eq!(history[0].action, HistoryAction::Insert);
        assert_eq!(history[0].correlation_id, correlation_id);
        assert_eq!(history[0].payload["target"], "/b");
        assert_eq!(history[0].actor, 7);
    }

    #[tokio::test]
    async fn unknown_language_is_an_error() {
        let store = InMemoryStore::new();
        let site = site("/");
        let correlation_id = correlation_id();

        let err = creator(&store, &site, RedirectSettings::default(), &correlation_id)
            .create_redirect("/a", "/b", 5)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CascadeError::LanguageNotFound { language_id: 5, .. }
        ));
        assert!(store.redirects().is_empty());
    }

    #[tokio::test]
    async fn ttl_overflow_is_an_error() {
        let store = InMemoryStore::new();
        let site = site("/");
        let correlation_id = correlation_id();
        let settings = RedirectSettings {
            redirect_ttl: u32::MAX,
            ..RedirectSettings::default()
        };

        let err = creator(&store, &site, settings, &correlation_id)
            .create_redirect("/a", "/b", 0)
            .await
            .unwrap_err();

        assert!(matches!(err, CascadeError::RedirectTtlOverflow { .. }));
    }
}
