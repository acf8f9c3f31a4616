use slugway_cascade::{
    CascadeStatus, ConfiguredSiteRegistry, Ports, RecordingEventSink, ServiceOptions, SlugService,
};
use slugway_core::{
    CorrelationId, FixedClock, PageRecord, PageRepository, RecordHistory, RedirectRepository,
    LIVE_WORKSPACE,
};
use slugway_storage::MySqlStore;
use slugway_test_infra::mysql::{MySqlServer, MysqlConfig};
use std::sync::Arc;

const SCHEMA: [&str; 3] = [
    include_str!("../../slugway-storage/ddl/mysql/pages.sql"),
    include_str!("../../slugway-storage/ddl/mysql/sys_redirect.sql"),
    include_str!("../../slugway-storage/ddl/mysql/sys_history.sql"),
];

const SITES: &str = r#"{
    "sites": [{
        "identifier": "main",
        "rootPageId": 1,
        "languages": [
            {"languageId": 0, "base": "https://example.com/"},
            {"languageId": 1, "base": "https://example.com/de/"}
        ],
        "settings": {"redirects": {"redirectTTL": 1, "httpStatusCode": 301}}
    }]
}"#;

const NOW: i64 = 1_700_000_000;

async fn seed(pool: &sqlx::MySqlPool, page: PageRecord) {
    sqlx::query(
        r#"
        INSERT INTO pages
            (uid, pid, l10n_parent, sys_language_uid, slug, deleted, t3ver_wsid, t3ver_oid)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(page.uid)
    .bind(page.pid)
    .bind(page.l10n_parent)
    .bind(page.language_id)
    .bind(page.slug)
    .bind(page.deleted)
    .bind(page.workspace_id)
    .bind(page.live_uid)
    .execute(pool)
    .await
    .expect("seed page");
}

#[tokio::test]
async fn cascade_against_mysql() {
    let mysql = MySqlServer::new(MysqlConfig::builder().build())
        .await
        .expect("start mysql");
    let pool = mysql.pool().await.expect("connect mysql");
    MySqlServer::apply_schema(&pool, &SCHEMA)
        .await
        .expect("create schema");

    for page in [
        PageRecord::new(1, 0, "/"),
        PageRecord::new(2, 1, "/new"),
        PageRecord::new(3, 2, "/old/x"),
        PageRecord::new(4, 3, "/old/x/deep"),
        PageRecord::new(5, 1, "/new/x"),
    ] {
        seed(&pool, page).await;
    }

    let store = Arc::new(MySqlStore::new(pool));
    let events = Arc::new(RecordingEventSink::new());
    let sites = ConfiguredSiteRegistry::from_json(SITES, store.clone()).expect("sites");
    let ports = Ports::builder()
        .pages(store.clone())
        .writer(store.clone())
        .redirects(store.clone())
        .history(store.clone())
        .sites(Arc::new(sites))
        .events(events.clone())
        .clock(Arc::new(FixedClock::at_second(NOW)))
        .build();
    let service = SlugService::new(ports, ServiceOptions::builder().backend_user(3).build());

    let report = service
        .rebuild_slugs_for_slug_change(2, "/old", "/new", CorrelationId::new())
        .await
        .expect("cascade");
    assert_eq!(report.status, CascadeStatus::Completed);

    let slug = |page: Option<PageRecord>| page.expect("page").slug;
    assert_eq!(slug(store.find_by_uid(3).await.unwrap()), "/new/x-1");
    assert_eq!(slug(store.find_by_uid(4).await.unwrap()), "/new/x/deep");
    assert_eq!(slug(store.find_by_uid(5).await.unwrap()), "/new/x");

    let redirects = store
        .find_by_source("example.com", "/old/x")
        .await
        .unwrap();
    assert_eq!(redirects.len(), 1);
    assert_eq!(redirects[0].redirect.target, "/new/x-1");
    assert_eq!(redirects[0].redirect.target_statuscode, 301);
    assert_eq!(redirects[0].redirect.endtime, NOW + 86_400);
    assert_eq!(redirects[0].redirect.createdby, 3);

    let correlations = report.correlations.expect("correlations");
    let page_history = store
        .find_by_correlation(&correlations.correlation_id_slug_update)
        .await
        .unwrap();
    assert_eq!(page_history.len(), 2);
    let redirect_history = store
        .find_by_correlation(&correlations.correlation_id_redirect_creation)
        .await
        .unwrap();
    assert_eq!(redirect_history.len(), 3);

    let children = store.children(2, LIVE_WORKSPACE).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(events.events().len(), 1);
}
