use crate::error::{CascadeError, Result};
use crate::guard::InFlightPages;
use crate::notify::NotificationEmitter;
use crate::redirect::RedirectCreator;
use crate::report::{CascadeReport, CascadeStatus, UpdatedSlug};
use crate::resolver::{SubPageResolver, DEFAULT_MAX_DEPTH};
use crate::rewriter::SlugRewriter;
use slugway_core::{
    Clock, CorrelationId, EventSink, PageId, PageRepository, PageWriter, Propagation,
    RecordHistory, RedirectRepository, SiteRegistry, SlugChangeCorrelations, SlugUpdate,
    SystemClock, WorkspaceId, LIVE_WORKSPACE,
};
use std::sync::Arc;
use tracing::{debug, info};
use typed_builder::TypedBuilder;

/// Aspect namespace of the correlation ids this service derives.
pub const CORRELATION_NAMESPACE: &str = "slugway";
pub const REDIRECT_ASPECT: &str = "redirect";
pub const SLUG_ASPECT: &str = "slug";

/// The collaborators a [`SlugService`] reads from and writes to.
#[derive(Clone, TypedBuilder)]
pub struct Ports {
    pub pages: Arc<dyn PageRepository>,
    pub writer: Arc<dyn PageWriter>,
    pub redirects: Arc<dyn RedirectRepository>,
    pub history: Arc<dyn RecordHistory>,
    pub sites: Arc<dyn SiteRegistry>,
    pub events: Arc<dyn EventSink>,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct ServiceOptions {
    /// Workspace the changes are made in.
    #[builder(default = LIVE_WORKSPACE)]
    pub workspace: WorkspaceId,
    /// Backend user recorded on created redirects and history entries.
    #[builder(default)]
    pub backend_user: u32,
    #[builder(default = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Reacts to a changed page slug by creating redirects and moving the slugs
/// of the page's sub-pages along.
#[derive(Clone)]
pub struct SlugService {
    ports: Ports,
    options: ServiceOptions,
    in_flight: Arc<InFlightPages>,
}

impl SlugService {
    pub fn new(ports: Ports, options: ServiceOptions) -> Self {
        Self {
            ports,
            options,
            in_flight: InFlightPages::new(),
        }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Runs the redirect and sub-page updates for a slug change of `page_id`
    /// from `old_slug` to `new_slug`.
    ///
    /// The page itself is expected to carry `new_slug` already. A page that
    /// does not exist is ignored.
    pub async fn rebuild_slugs_for_slug_change(
        &self,
        page_id: PageId,
        old_slug: &str,
        new_slug: &str,
        correlation_id: CorrelationId,
    ) -> Result<CascadeReport> {
        let Some(page) = self.ports.pages.find_by_uid(page_id).await? else {
            debug!(page_id, "page not found, nothing to do");
            return Ok(CascadeReport::skipped(page_id, CascadeStatus::PageNotFound));
        };
        let default_page_id = page.default_language_uid();
        let site = self
            .ports
            .sites
            .site_for_page(default_page_id)
            .await?
            .ok_or(CascadeError::SiteNotFound(page_id))?;
        let settings = site
            .redirect_settings()
            .effective_for(self.options.workspace);
        if !settings.is_active() {
            debug!(page_id, site = %site.identifier, "slug updates and redirects disabled");
            return Ok(CascadeReport::skipped(page_id, CascadeStatus::Disabled));
        }

        let correlation_id = if correlation_id.subject().is_some() {
            correlation_id
        } else {
            correlation_id.with_subject(CorrelationId::page_subject(page_id))
        };
        let correlations = SlugChangeCorrelations {
            correlation_id_slug_update: correlation_id
                .with_aspects([CORRELATION_NAMESPACE, SLUG_ASPECT]),
            correlation_id_redirect_creation: correlation_id
                .with_aspects([CORRELATION_NAMESPACE, REDIRECT_ASPECT]),
        };
        let now = self.ports.clock.now();

        info!(
            page_id,
            old_slug,
            new_slug,
            language_id = page.language_id,
            site = %site.identifier,
            workspace = self.options.workspace,
            auto_update_slugs = settings.auto_update_slugs,
            auto_create_redirects = settings.auto_create_redirects,
            correlation_id = %correlation_id,
            "processing slug change"
        );

        let mut report = CascadeReport::started(page_id, settings, correlations.clone());
        let redirects = RedirectCreator {
            redirects: self.ports.redirects.as_ref(),
            history: self.ports.history.as_ref(),
            site: &site,
            settings,
            correlation_id: &correlations.correlation_id_redirect_creation,
            actor: self.options.backend_user,
            now,
        };

        if settings.auto_create_redirects {
            let redirect = redirects
                .create_redirect(old_slug, new_slug, page.language_id)
                .await?;
            report.redirects.push(redirect);
        }

        if settings.auto_update_slugs {
            let sub_pages = SubPageResolver::new(
                self.ports.pages.as_ref(),
                self.options.workspace,
                self.options.max_depth,
            )
            .resolve(default_page_id, page.language_id)
            .await?;

            let rewriter = SlugRewriter {
                pages: self.ports.pages.as_ref(),
                writer: self.ports.writer.as_ref(),
                sites: self.ports.sites.as_ref(),
                in_flight: &self.in_flight,
                site: &site,
                correlation_id: &correlations.correlation_id_slug_update,
                workspace: self.options.workspace,
                actor: self.options.backend_user,
                now: now.as_second(),
            };

            for sub_page in sub_pages {
                let Some(updated) = rewriter.update_slug(&sub_page, old_slug, new_slug).await?
                else {
                    continue;
                };
                if settings.auto_create_redirects {
                    let redirect = redirects
                        .create_redirect(&sub_page.slug, &updated, sub_page.language_id)
                        .await?;
                    report.redirects.push(redirect);
                }
                report.updated_pages.push(UpdatedSlug {
                    uid: sub_page.uid,
                    old_slug: sub_page.slug,
                    new_slug: updated,
                });
            }
        }

        NotificationEmitter::new(Arc::clone(&self.ports.events))
            .slug_changed(
                correlations,
                settings.auto_update_slugs,
                settings.auto_create_redirects,
            )
            .await;

        info!(
            page_id,
            redirects = report.redirects.len(),
            updated_pages = report.updated_pages.len(),
            "slug change processed"
        );
        Ok(report)
    }

    /// Entry point for the page editing pipeline after it persisted a slug.
    ///
    /// Writes made by a cascade carry [`Propagation::Suppressed`] and are
    /// never cascaded again, even when a pipeline drops that flag and the
    /// write is only recognised by its correlation id.
    pub async fn after_slug_saved(
        &self,
        update: &SlugUpdate,
        old_slug: &str,
    ) -> Result<CascadeReport> {
        if update.propagation == Propagation::Suppressed
            || self.in_flight.contains(&update.correlation_id, update.uid)
        {
            debug!(page_id = update.uid, "slug change is part of a running cascade");
            return Ok(CascadeReport::skipped(
                update.uid,
                CascadeStatus::AlreadyRunning,
            ));
        }
        if update.slug == old_slug {
            return Ok(CascadeReport::skipped(update.uid, CascadeStatus::Unchanged));
        }

        self.rebuild_slugs_for_slug_change(
            update.uid,
            old_slug,
            &update.slug,
            update.correlation_id.clone(),
        )
        .await
    }
}
