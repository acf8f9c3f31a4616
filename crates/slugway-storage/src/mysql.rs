use async_trait::async_trait;
use slugway_core::error::{Result, StorageError};
use slugway_core::history::{HistoryAction, HistoryEntry, RecordHistory, PAGES_TABLE};
use slugway_core::page::{LanguageId, PageId, PageRecord, WorkspaceId, LIVE_WORKSPACE};
use slugway_core::redirect::{NewRedirect, RedirectRecord};
use slugway_core::repository::{PageRepository, PageWriter, RedirectRepository, SlugUpdate};
use slugway_core::CorrelationId;
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};
use tracing::trace;

const PAGE_COLUMNS: &str =
    "uid, pid, l10n_parent, sys_language_uid, slug, deleted, t3ver_wsid, t3ver_oid";

const REDIRECT_COLUMNS: &str = "uid, pid, createdon, updatedon, createdby, deleted, disabled, \
     starttime, endtime, source_host, source_path, is_regexp, force_https, \
     respect_query_parameters, target, target_statuscode, hitcount, lasthiton, disable_hitcount";

/// MySQL implementation of every storage port.
///
/// Works on the `pages`, `sys_redirect` and `sys_history` tables (see
/// `ddl/mysql`). Deletion is a flag; reads skip flagged rows. Slug updates
/// and their history entry are written in one transaction.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StorageError::InvalidData(message),
        sqlx::Error::RowNotFound => StorageError::NotFound(message),
        _ => StorageError::Query(message),
    }
}

fn page_from_row(row: &MySqlRow) -> Result<PageRecord> {
    let page = PageRecord {
        uid: row.try_get("uid").map_err(map_sqlx_error)?,
        pid: row.try_get("pid").map_err(map_sqlx_error)?,
        l10n_parent: row.try_get("l10n_parent").map_err(map_sqlx_error)?,
        language_id: row.try_get("sys_language_uid").map_err(map_sqlx_error)?,
        slug: row.try_get("slug").map_err(map_sqlx_error)?,
        deleted: row.try_get("deleted").map_err(map_sqlx_error)?,
        workspace_id: row.try_get("t3ver_wsid").map_err(map_sqlx_error)?,
        live_uid: row.try_get("t3ver_oid").map_err(map_sqlx_error)?,
    };
    Ok(page.validate()?)
}

fn pages_from_rows(rows: &[MySqlRow]) -> Result<Vec<PageRecord>> {
    rows.iter().map(page_from_row).collect()
}

fn redirect_from_row(row: &MySqlRow) -> Result<RedirectRecord> {
    let redirect = NewRedirect {
        pid: row.try_get("pid").map_err(map_sqlx_error)?,
        createdon: row.try_get("createdon").map_err(map_sqlx_error)?,
        updatedon: row.try_get("updatedon").map_err(map_sqlx_error)?,
        createdby: row.try_get("createdby").map_err(map_sqlx_error)?,
        deleted: row.try_get("deleted").map_err(map_sqlx_error)?,
        disabled: row.try_get("disabled").map_err(map_sqlx_error)?,
        starttime: row.try_get("starttime").map_err(map_sqlx_error)?,
        endtime: row.try_get("endtime").map_err(map_sqlx_error)?,
        source_host: row.try_get("source_host").map_err(map_sqlx_error)?,
        source_path: row.try_get("source_path").map_err(map_sqlx_error)?,
        is_regexp: row.try_get("is_regexp").map_err(map_sqlx_error)?,
        force_https: row.try_get("force_https").map_err(map_sqlx_error)?,
        respect_query_parameters: row.try_get("respect_query_parameters").map_err(map_sqlx_error)?,
        target: row.try_get("target").map_err(map_sqlx_error)?,
        target_statuscode: row.try_get("target_statuscode").map_err(map_sqlx_error)?,
        hitcount: row.try_get("hitcount").map_err(map_sqlx_error)?,
        lasthiton: row.try_get("lasthiton").map_err(map_sqlx_error)?,
        disable_hitcount: row.try_get("disable_hitcount").map_err(map_sqlx_error)?,
    };
    Ok(redirect.with_uid(row.try_get("uid").map_err(map_sqlx_error)?))
}

fn history_from_row(row: &MySqlRow) -> Result<HistoryEntry> {
    let action: String = row.try_get("actiontype").map_err(map_sqlx_error)?;
    let action = match action.as_str() {
        "insert" => HistoryAction::Insert,
        "update" => HistoryAction::Update,
        other => {
            return Err(StorageError::InvalidData(format!(
                "unknown history action '{other}'"
            )))
        }
    };
    let payload: String = row.try_get("history_data").map_err(map_sqlx_error)?;
    let correlation_id: String = row.try_get("correlation_id").map_err(map_sqlx_error)?;

    Ok(HistoryEntry {
        table: row.try_get("tablename").map_err(map_sqlx_error)?,
        record_uid: row.try_get("recuid").map_err(map_sqlx_error)?,
        action,
        payload: serde_json::from_str(&payload)
            .map_err(|e| StorageError::InvalidData(format!("invalid history payload: {e}")))?,
        correlation_id: correlation_id.parse()?,
        tstamp: row.try_get("tstamp").map_err(map_sqlx_error)?,
        actor: row.try_get("userid").map_err(map_sqlx_error)?,
    })
}

async fn insert_history<'e, E>(executor: E, entry: &HistoryEntry) -> Result<()>
where
    E: sqlx::Executor<'e, Database = MySql>,
{
    let payload = serde_json::to_string(&entry.payload)
        .map_err(|e| StorageError::InvalidData(format!("history payload: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO sys_history
            (tstamp, actiontype, userid, tablename, recuid, history_data, correlation_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.tstamp)
    .bind(entry.action.as_str())
    .bind(entry.actor)
    .bind(&entry.table)
    .bind(entry.record_uid)
    .bind(payload)
    .bind(entry.correlation_id.to_string())
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

#[async_trait]
impl PageRepository for MySqlStore {
    async fn find_by_uid(&self, uid: PageId) -> Result<Option<PageRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE uid = ? AND deleted = 0 LIMIT 1"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(page_from_row).transpose()
    }

    async fn children(&self, pid: PageId, workspace: WorkspaceId) -> Result<Vec<PageRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAGE_COLUMNS}
            FROM pages
            WHERE pid = ?
              AND sys_language_uid = 0
              AND deleted = 0
              AND t3ver_oid = 0
              AND t3ver_wsid IN (0, ?)
            ORDER BY uid ASC
            "#
        ))
        .bind(pid)
        .bind(workspace)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        pages_from_rows(&rows)
    }

    async fn overlays(
        &self,
        parents: &[PageId],
        language_id: LanguageId,
        workspace: WorkspaceId,
    ) -> Result<Vec<PageRecord>> {
        if parents.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<MySql>::new(format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE l10n_parent IN ("
        ));
        let mut separated = query.separated(", ");
        for parent in parents {
            separated.push_bind(*parent);
        }
        query
            .push(") AND sys_language_uid = ")
            .push_bind(language_id)
            .push(" AND deleted = 0 AND t3ver_oid = 0 AND t3ver_wsid IN (0, ")
            .push_bind(workspace)
            .push(") ORDER BY uid ASC");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        pages_from_rows(&rows)
    }

    async fn find_by_slug(
        &self,
        slug: &str,
        language_id: LanguageId,
        workspace: WorkspaceId,
    ) -> Result<Vec<PageRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PAGE_COLUMNS}
            FROM pages
            WHERE slug = ?
              AND sys_language_uid = ?
              AND deleted = 0
              AND t3ver_wsid IN (0, ?)
            ORDER BY uid ASC
            "#
        ))
        .bind(slug)
        .bind(language_id)
        .bind(workspace)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        pages_from_rows(&rows)
    }

    async fn workspace_overlay(
        &self,
        pages: Vec<PageRecord>,
        workspace: WorkspaceId,
    ) -> Result<Vec<PageRecord>> {
        if workspace == LIVE_WORKSPACE || pages.is_empty() {
            return Ok(pages);
        }

        let mut query = QueryBuilder::<MySql>::new(format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE t3ver_wsid = "
        ));
        query.push_bind(workspace).push(" AND t3ver_oid IN (");
        let mut separated = query.separated(", ");
        for page in &pages {
            separated.push_bind(page.uid);
        }
        query.push(")");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let versions = pages_from_rows(&rows)?;

        Ok(pages
            .into_iter()
            .filter_map(|page| {
                match versions.iter().find(|version| version.live_uid == page.uid) {
                    Some(version) if version.deleted => None,
                    Some(version) => Some(version.clone()),
                    None => Some(page),
                }
            })
            .collect())
    }
}

#[async_trait]
impl PageWriter for MySqlStore {
    async fn update_slug(&self, update: SlugUpdate) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE uid = ? AND deleted = 0 FOR UPDATE"
        ))
        .bind(update.uid)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        let page = row
            .as_ref()
            .map(page_from_row)
            .transpose()?
            .ok_or_else(|| StorageError::NotFound(format!("page {}", update.uid)))?;

        let target: PageId =
            if update.workspace == LIVE_WORKSPACE || page.workspace_id == update.workspace {
                page.uid
            } else {
                let existing: Option<PageId> = sqlx::query_scalar(
                    "SELECT uid FROM pages WHERE t3ver_oid = ? AND t3ver_wsid = ? LIMIT 1",
                )
                .bind(page.uid)
                .bind(update.workspace)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

                match existing {
                    Some(uid) => uid,
                    None => {
                        let created = sqlx::query(
                            r#"
                            INSERT INTO pages
                                (pid, l10n_parent, sys_language_uid, slug, deleted,
                                 t3ver_wsid, t3ver_oid, tstamp)
                            SELECT pid, l10n_parent, sys_language_uid, slug, 0, ?, uid, ?
                            FROM pages
                            WHERE uid = ?
                            "#,
                        )
                        .bind(update.workspace)
                        .bind(update.tstamp)
                        .bind(page.uid)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?;
                        let version_uid = PageId::try_from(created.last_insert_id())
                            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
                        trace!(page_id = page.uid, version_uid, "created workspace version");
                        version_uid
                    }
                }
            };

        sqlx::query("UPDATE pages SET slug = ?, tstamp = ? WHERE uid = ?")
            .bind(&update.slug)
            .bind(update.tstamp)
            .bind(target)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let entry = HistoryEntry {
            table: PAGES_TABLE.to_string(),
            record_uid: u64::from(target),
            action: HistoryAction::Update,
            payload: serde_json::json!({ "slug": update.slug }),
            correlation_id: update.correlation_id.clone(),
            tstamp: update.tstamp,
            actor: update.actor,
        };
        insert_history(&mut *tx, &entry).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl RedirectRepository for MySqlStore {
    async fn insert(&self, redirect: NewRedirect) -> Result<RedirectRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO sys_redirect
                (pid, createdon, updatedon, createdby, deleted, disabled, starttime, endtime,
                 source_host, source_path, is_regexp, force_https, respect_query_parameters,
                 target, target_statuscode, hitcount, lasthiton, disable_hitcount)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(redirect.pid)
        .bind(redirect.createdon)
        .bind(redirect.updatedon)
        .bind(redirect.createdby)
        .bind(redirect.deleted)
        .bind(redirect.disabled)
        .bind(redirect.starttime)
        .bind(redirect.endtime)
        .bind(&redirect.source_host)
        .bind(&redirect.source_path)
        .bind(redirect.is_regexp)
        .bind(redirect.force_https)
        .bind(redirect.respect_query_parameters)
        .bind(&redirect.target)
        .bind(redirect.target_statuscode)
        .bind(redirect.hitcount)
        .bind(redirect.lasthiton)
        .bind(redirect.disable_hitcount)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(redirect.with_uid(result.last_insert_id()))
    }

    async fn find_by_source(
        &self,
        source_host: &str,
        source_path: &str,
    ) -> Result<Vec<RedirectRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {REDIRECT_COLUMNS}
            FROM sys_redirect
            WHERE source_host = ?
              AND source_path = ?
              AND deleted = 0
            ORDER BY uid ASC
            "#
        ))
        .bind(source_host)
        .bind(source_path)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(redirect_from_row).collect()
    }
}

#[async_trait]
impl RecordHistory for MySqlStore {
    async fn add_record(&self, entry: HistoryEntry) -> Result<()> {
        insert_history(&self.pool, &entry).await
    }

    async fn find_by_correlation(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT tstamp, actiontype, userid, tablename, recuid, history_data, correlation_id
            FROM sys_history
            WHERE correlation_id = ?
            ORDER BY uid ASC
            "#,
        )
        .bind(correlation_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(history_from_row).collect()
    }
}
