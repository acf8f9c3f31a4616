use clap::{Parser, ValueEnum};
use slugway_cascade::DEFAULT_MAX_DEPTH;
use slugway_core::{CorrelationId, PageId, WorkspaceId};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const MYSQL_DSN_ENV: &str = "SLUGWAY_MYSQL_DSN";
pub const SITES_FILE_ENV: &str = "SLUGWAY_SITES_FILE";
pub const WORKSPACE_ENV: &str = "SLUGWAY_WORKSPACE";
pub const BACKEND_USER_ENV: &str = "SLUGWAY_BACKEND_USER";
pub const MAX_DEPTH_ENV: &str = "SLUGWAY_MAX_DEPTH";
pub const LOG_FORMAT_ENV: &str = "SLUGWAY_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormatArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormatArg::Text => write!(f, "text"),
            LogFormatArg::Json => write!(f, "json"),
        }
    }
}

/// Applies a page slug change: creates redirects and moves sub-page slugs.
#[derive(Debug, Parser)]
#[command(name = "slugway")]
pub struct CLI {
    /// Page whose slug changed.
    #[arg(long)]
    pub page_id: PageId,

    #[arg(long)]
    pub old_slug: String,

    #[arg(long)]
    pub new_slug: String,

    /// Correlation id of the originating edit, e.g. `0400$edit-42`.
    #[arg(long)]
    pub correlation_id: Option<CorrelationId>,

    #[arg(long, env = MYSQL_DSN_ENV)]
    pub mysql_dsn: String,

    #[arg(long, env = SITES_FILE_ENV)]
    pub sites_file: PathBuf,

    #[arg(long, env = WORKSPACE_ENV, default_value_t = 0)]
    pub workspace: WorkspaceId,

    #[arg(long, env = BACKEND_USER_ENV, default_value_t = 0)]
    pub backend_user: u32,

    #[arg(long, env = MAX_DEPTH_ENV, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormatArg::Text
    )]
    pub log_format: LogFormatArg,
}
