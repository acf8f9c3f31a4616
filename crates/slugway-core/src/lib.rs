//! Core types and traits for the Slugway slug cascade service.
//!
//! This crate provides the page, redirect and correlation types together
//! with the storage, site and notification traits the cascade service is
//! written against.

pub mod clock;
pub mod correlation;
pub mod error;
pub mod event;
pub mod history;
pub mod page;
pub mod redirect;
pub mod repository;
pub mod settings;
pub mod site;
pub mod slug;

pub use clock::{Clock, FixedClock, SystemClock};
pub use correlation::CorrelationId;
pub use error::{CoreError, Result, StorageError};
pub use event::{EventSink, EventSinkError, SlugChangeCorrelations, SlugChangedEvent};
pub use history::{HistoryAction, HistoryEntry, RecordHistory};
pub use page::{LanguageId, PageId, PageRecord, WorkspaceId, DEFAULT_LANGUAGE, LIVE_WORKSPACE};
pub use redirect::{NewRedirect, RedirectId, RedirectRecord};
pub use repository::{PageRepository, PageWriter, Propagation, RedirectRepository, SlugUpdate};
pub use settings::RedirectSettings;
pub use site::{Site, SiteLanguage, SiteRegistry, SiteSettings};
