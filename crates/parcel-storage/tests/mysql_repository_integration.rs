use jiff::{SignedDuration, Timestamp};
use parcel_core::{
    AccessKind, AccessLogEntry, AccessLogStore, AccessTarget, AdmissionDenied, BlobPath,
    ChargeOutcome, CodeLookup, ContentId, ContentRepository, Limits, LinkRepository, LiveUsage,
    LogScope, NewContent, NewLink, OwnerId, RequestMeta, ShortCode, StorageError, UsageDelta,
    UsageRepository,
};
use parcel_storage::mysql::migrate;
use parcel_storage::{
    MySqlAccessLog, MySqlContentRepository, MySqlLinkRepository, MySqlUsageRepository,
};
use parcel_test_infra::mysql::{MySqlServer, MysqlConfig};

struct Fixture {
    _mysql: MySqlServer,
    contents: MySqlContentRepository,
    links: MySqlLinkRepository,
    usage: MySqlUsageRepository,
    access_log: MySqlAccessLog,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::new(MysqlConfig::builder().build())
            .await
            .expect("start mysql");
        let pool = mysql.connect().await.expect("connect mysql");
        migrate(&pool).await.expect("create schema");

        Self {
            _mysql: mysql,
            contents: MySqlContentRepository::new(pool.clone()),
            links: MySqlLinkRepository::new(pool.clone()),
            usage: MySqlUsageRepository::new(pool.clone()),
            access_log: MySqlAccessLog::new(pool),
        }
    }
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn at(second: i64) -> Timestamp {
    Timestamp::from_second(second).unwrap()
}

fn content(short_code: &str, owner: Option<i64>, size: u64) -> NewContent {
    NewContent {
        owner: owner.map(OwnerId),
        code: code(short_code),
        file_name: "report.pdf".to_string(),
        content_type: Some("application/pdf".to_string()),
        size,
        storage_path: BlobPath::new(format!("{short_code}.pdf")),
        thumbnail_path: None,
        expires_at: None,
        max_views: None,
        created_at: at(1_700_000_000),
    }
}

const DEFAULTS: Limits = Limits {
    storage_bytes: 1_000,
    files: 10,
};

#[tokio::test]
#[ignore = "requires docker"]
async fn content_round_trips_through_mysql() {
    let fixture = Fixture::start().await;

    let mut new = content("abc123", Some(1), 512);
    new.max_views = Some(3);
    new.thumbnail_path = Some(BlobPath::new("thumb.png"));
    let inserted = fixture.contents.insert(new).await.unwrap();

    let got = fixture.contents.get(inserted.id).await.unwrap().unwrap();
    assert_eq!(got, inserted);
    assert!(fixture.contents.code_exists(&code("abc123")).await.unwrap());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn codes_are_case_sensitive_and_unique() {
    let fixture = Fixture::start().await;

    fixture.contents.insert(content("AbCdEf", None, 1)).await.unwrap();
    fixture.contents.insert(content("abcdef", None, 1)).await.unwrap();
    let err = fixture
        .contents
        .insert(content("AbCdEf", None, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn content_and_link_namespaces_are_separate() {
    let fixture = Fixture::start().await;

    fixture.contents.insert(content("shared1", None, 1)).await.unwrap();
    let link = fixture
        .links
        .insert(NewLink {
            owner: None,
            code: code("shared1"),
            target_url: "https://example.com".to_string(),
            expires_at: None,
            created_at: at(1_700_000_000),
        })
        .await
        .unwrap();

    fixture.links.increment_clicks(link.id).await.unwrap();
    let got = fixture.links.get_by_code(&code("shared1")).await.unwrap().unwrap();
    assert_eq!(got.click_count, 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn reapable_rows_cover_expiry_and_view_limits() {
    let fixture = Fixture::start().await;
    let now = at(1_800_000_000);

    let mut expired = content("expired1", Some(1), 1);
    expired.expires_at = Some(now - SignedDuration::from_secs(1));
    let mut limited = content("limited1", Some(1), 1);
    limited.max_views = Some(1);
    let mut alive = content("alive001", Some(1), 1);
    alive.expires_at = Some(now + SignedDuration::from_hours(1));

    let expired = fixture.contents.insert(expired).await.unwrap();
    let limited = fixture.contents.insert(limited).await.unwrap();
    fixture.contents.insert(alive).await.unwrap();
    fixture
        .contents
        .increment_counter(limited.id, AccessKind::View)
        .await
        .unwrap();

    let ids: Vec<ContentId> = fixture
        .contents
        .find_reapable(now)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();

    assert_eq!(ids, vec![expired.id, limited.id]);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn live_usage_sums_owner_rows() {
    let fixture = Fixture::start().await;

    fixture.contents.insert(content("own00001", Some(7), 300)).await.unwrap();
    fixture.contents.insert(content("own00002", Some(7), 200)).await.unwrap();
    fixture.contents.insert(content("oth00001", Some(8), 50)).await.unwrap();

    let usage = fixture.contents.live_usage(OwnerId(7)).await.unwrap();

    assert_eq!(usage, LiveUsage { bytes: 500, files: 2 });
}

#[tokio::test]
#[ignore = "requires docker"]
async fn conditional_charge_respects_limits() {
    let fixture = Fixture::start().await;
    let owner = OwnerId(1);

    assert!(matches!(
        fixture.usage.try_charge(owner, 900, DEFAULTS).await.unwrap(),
        ChargeOutcome::Charged(_)
    ));
    assert_eq!(
        fixture.usage.try_charge(owner, 101, DEFAULTS).await.unwrap(),
        ChargeOutcome::Denied(AdmissionDenied::StorageLimit {
            used: 900,
            incoming: 101,
            limit: 1_000
        })
    );

    fixture.usage.set_limits(owner, Some(2_000), None).await.unwrap();
    let ChargeOutcome::Charged(counters) =
        fixture.usage.try_charge(owner, 101, DEFAULTS).await.unwrap()
    else {
        panic!("override should admit the upload");
    };
    assert_eq!(counters.storage_used, 1_001);
    assert_eq!(counters.file_count, 2);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn deltas_clamp_at_zero_and_overwrite_replaces() {
    let fixture = Fixture::start().await;
    let owner = OwnerId(2);

    fixture
        .usage
        .apply_delta(owner, UsageDelta::upload(10))
        .await
        .unwrap();
    let clamped = fixture
        .usage
        .apply_delta(owner, UsageDelta::removal(50) + UsageDelta::removal(50))
        .await
        .unwrap();
    assert_eq!((clamped.storage_used, clamped.file_count), (0, 0));

    let overwritten = fixture
        .usage
        .overwrite(owner, LiveUsage { bytes: 42, files: 3 })
        .await
        .unwrap();
    assert_eq!((overwritten.storage_used, overwritten.file_count), (42, 3));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn access_log_queries_and_prunes() {
    let fixture = Fixture::start().await;
    let meta = RequestMeta {
        ip: Some("203.0.113.9".to_string()),
        user_agent: Some("curl/8.0".to_string()),
        referrer: None,
    };

    for (target, second) in [
        (AccessTarget::Content(ContentId(1)), 100),
        (AccessTarget::Content(ContentId(1)), 200),
        (AccessTarget::Link(parcel_core::LinkId(1)), 150),
    ] {
        fixture
            .access_log
            .append(AccessLogEntry::new(
                target,
                Some(OwnerId(1)),
                AccessKind::View,
                at(second),
                meta.clone(),
            ))
            .await
            .unwrap();
    }

    let content = fixture
        .access_log
        .query(LogScope::Content(ContentId(1)), at(100), at(200))
        .await
        .unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].ip.as_deref(), Some("203.0.113.9"));

    let owner = fixture
        .access_log
        .query(LogScope::Owner(OwnerId(1)), at(0), at(1_000))
        .await
        .unwrap();
    assert_eq!(owner.len(), 3);

    assert_eq!(fixture.access_log.prune_before(at(160)).await.unwrap(), 2);
}
