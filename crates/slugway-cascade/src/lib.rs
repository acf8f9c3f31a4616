//! Slug cascade service.
//!
//! When a page slug changes, [`SlugService`] creates a redirect from the old
//! URL to the new one, moves the slugs of all sub-pages below the old slug
//! along and publishes a `slugChanged` notification. Core types are
//! re-exported from `slugway_core`.

pub mod error;
pub mod guard;
pub mod notify;
pub mod redirect;
pub mod report;
pub mod resolver;
pub mod rewriter;
pub mod service;
pub mod site;

pub use error::{CascadeError, ConfigError, Result};
pub use guard::{InFlightPages, ReentrancyGuard};
pub use notify::{BroadcastEventSink, NotificationEmitter, RecordingEventSink, TracingEventSink};
pub use redirect::RedirectCreator;
pub use report::{CascadeReport, CascadeStatus, UpdatedSlug};
pub use resolver::{SubPageResolver, DEFAULT_MAX_DEPTH};
pub use rewriter::SlugRewriter;
pub use service::{Ports, ServiceOptions, SlugService};
pub use site::ConfiguredSiteRegistry;
