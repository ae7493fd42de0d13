//! Contribution Log Store Integration Tests
//!
//! Tests for the complete write and read paths including:
//! - Sentence history ordering and license visibility
//! - Bot exclusion in feeds
//! - Estimated vs exact pagination counts
//! - Today's count, language propagation and attribution
//! - Statistics refresh and read timeouts

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use contribution_log::log_store::IP_USAGE_LIMIT;
use contribution_log::utils::ManualClock;
use contribution_log::{
    Actor, ContributionAction, ContributionError, ContributionFilter, ContributionRecorder,
    ContributionStore, ContributionType, LinkAction, LinkChanged, RowEstimator, SentenceSaved,
    SentenceSnapshot, StoreConfig, Visibility,
};
use tempfile::TempDir;

const BOT: i64 = 900;

struct Fixture {
    store: ContributionStore,
    clock: Arc<ManualClock>,
    _temp_dir: TempDir,
}

async fn open_store(config: impl FnOnce(StoreConfig) -> StoreConfig) -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let config = config(StoreConfig::with_path(temp_dir.path().join("contributions.db")));
    let clock = Arc::new(ManualClock::starting_now());
    let store = ContributionStore::open(config)
        .await
        .expect("Failed to open store")
        .with_clock(clock.clone());

    Fixture {
        store,
        clock,
        _temp_dir: temp_dir,
    }
}

async fn store_with_bots() -> Fixture {
    open_store(|c| c.bot_user_ids([BOT])).await
}

async fn drop_statistics(store: &ContributionStore) {
    sqlx::query("DELETE FROM sqlite_stat1")
        .execute(store.pool())
        .await
        .unwrap();
}

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 0, 2, last))
}

fn user(id: i64) -> Actor {
    Actor::user(id, ip(1))
}

fn sentence(id: i64, lang: &str, text: &str) -> SentenceSnapshot {
    SentenceSnapshot {
        sentence_id: id,
        lang: Some(lang.to_string()),
        script: None,
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_history_returns_every_visible_write_in_order() {
    let f = store_with_bots().await;

    f.store
        .record_sentence_contribution(sentence(1, "eng", "Hi."), ContributionAction::Insert, &user(5))
        .await
        .unwrap();
    f.clock.advance(Duration::seconds(1));
    f.store
        .record_link_contribution(1, 2, LinkAction::Insert, &user(6))
        .await
        .unwrap();
    f.clock.advance(Duration::seconds(1));
    f.store
        .record_license_change(1, &user(5), "CC BY 2.0 FR", true)
        .await
        .unwrap();
    f.clock.advance(Duration::seconds(1));
    f.store
        .record_sentence_contribution(sentence(1, "eng", "Hi!"), ContributionAction::Update, &user(5))
        .await
        .unwrap();
    // Another sentence's history stays separate
    f.store
        .record_sentence_contribution(sentence(2, "fra", "Salut."), ContributionAction::Insert, &user(6))
        .await
        .unwrap();

    let public = f
        .store
        .contributions_related_to_sentence(1, Visibility::Public)
        .await
        .unwrap();
    assert_eq!(public.len(), 3);
    assert!(public.iter().all(|e| e.kind != ContributionType::License));
    assert!(public.windows(2).all(|w| w[0].datetime <= w[1].datetime));
    assert_eq!(public[0].action, ContributionAction::Insert);
    assert_eq!(public[1].translation_id, Some(2));
    assert_eq!(public[2].text.as_deref(), Some("Hi!"));

    let privileged = f
        .store
        .contributions_related_to_sentence(1, Visibility::Privileged)
        .await
        .unwrap();
    assert_eq!(privileged.len(), 4);
    assert_eq!(privileged[2].kind, ContributionType::License);
}

#[tokio::test]
async fn test_last_contributions_rejects_non_numeric_limit() {
    let f = store_with_bots().await;
    f.store
        .record_sentence_contribution(sentence(1, "eng", "Hi."), ContributionAction::Insert, &user(5))
        .await
        .unwrap();

    assert!(f.store.last_contributions("abc", "und").await.unwrap().is_empty());
    assert!(f.store.last_contributions("0", "und").await.unwrap().is_empty());
    assert!(f.store.last_contributions("5", "en'g").await.unwrap().is_empty());
    assert!(f.store.last_contributions("5", "zh-Hant").await.unwrap().is_empty());
    assert_eq!(f.store.last_contributions("5", "und").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_last_contributions_excludes_bots_newest_first() {
    let f = store_with_bots().await;

    // 10 writes, every third one by the bot: bots at i = 0, 3, 6
    let mut human_ids = Vec::new();
    for i in 0..10i64 {
        let author = if i % 3 == 0 && i < 9 { BOT } else { 100 + i };
        let entry = f
            .store
            .record_sentence_contribution(
                sentence(i, "eng", &format!("Sentence {}", i)),
                ContributionAction::Insert,
                &user(author),
            )
            .await
            .unwrap();
        if author != BOT {
            human_ids.push(entry.id);
        }
        f.clock.advance(Duration::seconds(1));
    }
    assert_eq!(human_ids.len(), 7);

    let feed = f.store.last_contributions("5", "und").await.unwrap();
    let expected: Vec<i64> = human_ids.iter().rev().take(5).copied().collect();

    assert_eq!(feed.iter().map(|e| e.id).collect::<Vec<_>>(), expected);
    assert!(feed.iter().all(|e| e.user_id != Some(BOT)));
}

#[tokio::test]
async fn test_last_contributions_by_language_applies_exclusion() {
    let f = store_with_bots().await;

    f.store
        .record_sentence_contribution(sentence(1, "fra", "Un."), ContributionAction::Insert, &user(BOT))
        .await
        .unwrap();
    f.clock.advance(Duration::seconds(1));
    f.store
        .record_sentence_contribution(sentence(2, "fra", "Deux."), ContributionAction::Insert, &user(4))
        .await
        .unwrap();
    f.clock.advance(Duration::seconds(1));
    f.store
        .record_sentence_contribution(sentence(3, "eng", "Three."), ContributionAction::Insert, &user(4))
        .await
        .unwrap();
    f.store
        .record_link_contribution(2, 3, LinkAction::Insert, &user(4))
        .await
        .unwrap();

    let feed = f.store.last_contributions("10", "fra").await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].sentence_id, 2);

    // Anonymous contributions are not bot contributions
    f.store
        .record_sentence_contribution(sentence(4, "fra", "Quatre."), ContributionAction::Insert, &Actor::anonymous(ip(9)))
        .await
        .unwrap();
    let feed = f.store.last_contributions("10", "fra").await.unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].user_id, None);
}

#[tokio::test]
async fn test_paginate_count_uses_statistics_for_unfiltered_views() {
    let f = store_with_bots().await;

    for i in 0..12i64 {
        let author = if i < 2 { BOT } else { 42 + i % 2 };
        f.store
            .record_sentence_contribution(sentence(i, "eng", "x"), ContributionAction::Insert, &user(author))
            .await
            .unwrap();
    }

    // Without statistics the count falls back to exact
    drop_statistics(&f.store).await;
    assert_eq!(f.store.paginate_count(&ContributionFilter::new()).await.unwrap(), 12);

    f.store.refresh_statistics().await.unwrap();
    for i in 12..15i64 {
        f.store
            .record_sentence_contribution(sentence(i, "eng", "x"), ContributionAction::Insert, &user(42))
            .await
            .unwrap();
    }

    // Estimates lag until the next refresh
    let bots_only = f.store.bots().apply(ContributionFilter::new());
    assert_eq!(f.store.paginate_count(&ContributionFilter::new()).await.unwrap(), 12);
    assert_eq!(f.store.paginate_count(&bots_only).await.unwrap(), 12);

    // Narrowed queries are exact
    let by_user = ContributionFilter::new().user(42);
    assert_eq!(f.store.paginate_count(&by_user).await.unwrap(), 8);
    let by_user = f.store.bots().apply(by_user);
    assert_eq!(f.store.paginate_count(&by_user).await.unwrap(), 8);

    f.store.refresh_statistics().await.unwrap();
    assert_eq!(f.store.paginate_count(&ContributionFilter::new()).await.unwrap(), 15);
}

#[tokio::test]
async fn test_exact_estimator_never_lags() {
    let f = open_store(|c| c.bot_user_ids([BOT]).row_estimator(RowEstimator::Exact)).await;

    for i in 0..4i64 {
        f.store
            .record_sentence_contribution(sentence(i, "eng", "x"), ContributionAction::Insert, &user(1))
            .await
            .unwrap();
    }
    f.store.refresh_statistics().await.unwrap();
    f.store
        .record_link_contribution(0, 1, LinkAction::Insert, &user(1))
        .await
        .unwrap();

    assert_eq!(f.store.paginate_count(&ContributionFilter::new()).await.unwrap(), 5);
}

#[tokio::test]
async fn test_today_counts_only_new_sentences_since_midnight() {
    let f = store_with_bots().await;
    let now = Utc::now();

    f.clock.set(now - Duration::days(2));
    for i in 0..2i64 {
        f.store
            .record_sentence_contribution(sentence(i, "eng", "old"), ContributionAction::Insert, &user(1))
            .await
            .unwrap();
    }

    f.clock.set(now);
    for i in 10..13i64 {
        f.store
            .record_sentence_contribution(sentence(i, "eng", "new"), ContributionAction::Insert, &user(1))
            .await
            .unwrap();
    }
    f.store
        .record_sentence_contribution(sentence(10, "eng", "edited"), ContributionAction::Update, &user(1))
        .await
        .unwrap();
    f.store
        .record_link_contribution(10, 11, LinkAction::Insert, &user(1))
        .await
        .unwrap();
    f.store
        .record_license_change(12, &user(1), "CC0 1.0", true)
        .await
        .unwrap();

    assert_eq!(f.store.today_contributions().await.unwrap(), 3);
}

#[tokio::test]
async fn test_update_language_relabels_whole_history() {
    let f = store_with_bots().await;

    f.store
        .record_sentence_contribution(sentence(1, "eng", "Bonjour"), ContributionAction::Insert, &user(1))
        .await
        .unwrap();
    f.clock.advance(Duration::seconds(1));
    f.store
        .record_sentence_contribution(sentence(1, "eng", "Bonjour !"), ContributionAction::Update, &user(2))
        .await
        .unwrap();
    f.store
        .record_sentence_contribution(sentence(2, "eng", "Hello"), ContributionAction::Insert, &user(1))
        .await
        .unwrap();

    let relabelled = f.store.update_language(1, "fra").await.unwrap();
    assert_eq!(relabelled, 2);

    let history = f
        .store
        .contributions_related_to_sentence(1, Visibility::Public)
        .await
        .unwrap();
    assert!(history
        .iter()
        .filter(|e| e.kind == ContributionType::Sentence)
        .all(|e| e.sentence_lang.as_deref() == Some("fra")));

    // Other sentences keep their language
    let other = f
        .store
        .contributions_related_to_sentence(2, Visibility::Public)
        .await
        .unwrap();
    assert_eq!(other[0].sentence_lang.as_deref(), Some("eng"));

    // Feeds by language follow the relabel
    assert_eq!(f.store.last_contributions("10", "fra").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_original_creator_is_earliest_insert() {
    let f = store_with_bots().await;

    assert_eq!(f.store.original_creator_of(1).await.unwrap(), None);

    f.store
        .record_sentence_contribution(sentence(1, "eng", "Hi."), ContributionAction::Insert, &user(11))
        .await
        .unwrap();
    f.clock.advance(Duration::seconds(1));
    f.store
        .record_sentence_contribution(sentence(1, "eng", "Hi!"), ContributionAction::Update, &user(12))
        .await
        .unwrap();
    f.clock.advance(Duration::seconds(1));
    f.store
        .record_sentence_contribution(sentence(1, "eng", "Hi!"), ContributionAction::Delete, &user(12))
        .await
        .unwrap();
    f.clock.advance(Duration::seconds(1));
    f.store
        .record_sentence_contribution(sentence(1, "eng", "Hi!"), ContributionAction::Insert, &user(13))
        .await
        .unwrap();

    assert_eq!(f.store.original_creator_of(1).await.unwrap(), Some(11));
}

#[tokio::test]
async fn test_anonymous_creator_resolves_to_none() {
    let f = store_with_bots().await;
    f.store
        .record_sentence_contribution(sentence(1, "eng", "Hi."), ContributionAction::Insert, &Actor::anonymous(ip(3)))
        .await
        .unwrap();

    assert_eq!(f.store.original_creator_of(1).await.unwrap(), None);
}

#[tokio::test]
async fn test_user_counts_and_ip_usage() {
    let f = store_with_bots().await;

    for (n, last) in [(3, 10u8), (5, 20), (1, 30)] {
        for _ in 0..n {
            f.store
                .record_sentence_contribution(sentence(1, "eng", "x"), ContributionAction::Update, &Actor::user(42, ip(last)))
                .await
                .unwrap();
        }
    }
    f.store
        .record_sentence_contribution(sentence(2, "eng", "x"), ContributionAction::Insert, &user(43))
        .await
        .unwrap();

    assert_eq!(f.store.number_of_contributions_by(42).await.unwrap(), 9);
    assert_eq!(f.store.number_of_contributions_by(7).await.unwrap(), 0);

    let usage = f.store.ip_usage_of(42).await.unwrap();
    assert_eq!(usage.len(), 3);
    assert_eq!(usage[0].ip.as_deref(), Some("192.0.2.20"));
    assert_eq!(usage[0].count, 5);
    assert_eq!(usage[1].count, 3);
    assert_eq!(usage[2].count, 1);
}

#[tokio::test]
async fn test_ip_usage_is_capped() {
    let f = store_with_bots().await;

    for last in 1..=12u8 {
        f.store
            .record_link_contribution(1, i64::from(last) + 1, LinkAction::Insert, &Actor::user(42, ip(last)))
            .await
            .unwrap();
    }

    let usage = f.store.ip_usage_of(42).await.unwrap();
    assert_eq!(usage.len() as i64, IP_USAGE_LIMIT);
}

#[tokio::test]
async fn test_list_contributions_pages_newest_first() {
    let f = store_with_bots().await;

    for i in 0..7i64 {
        f.store
            .record_sentence_contribution(sentence(i, "eng", "x"), ContributionAction::Insert, &user(42))
            .await
            .unwrap();
        f.clock.advance(Duration::seconds(1));
    }

    let filter = f.store.bots().apply(ContributionFilter::new().user(42));
    let first = f.store.list_contributions(&filter, 1, 3).await.unwrap();
    let last = f.store.list_contributions(&filter, 3, 3).await.unwrap();

    assert_eq!(first.total, 7);
    assert_eq!(
        first.entries.iter().map(|e| e.sentence_id).collect::<Vec<_>>(),
        vec![6, 5, 4]
    );
    assert_eq!(last.entries.len(), 1);
    assert_eq!(last.entries[0].sentence_id, 0);
}

#[tokio::test]
async fn test_recorder_handles_domain_events() {
    let f = store_with_bots().await;
    let store = Arc::new(f.store);
    let recorder = ContributionRecorder::new(store.clone());

    let no_license = recorder
        .on_sentence_saved(
            &SentenceSaved {
                sentence_id: 1,
                was_newly_created: true,
                license: None,
            },
            &user(5),
        )
        .await
        .unwrap();
    assert!(no_license.is_none());

    let license = recorder
        .on_sentence_saved(
            &SentenceSaved {
                sentence_id: 1,
                was_newly_created: false,
                license: Some("CC BY 2.0 FR".to_string()),
            },
            &user(5),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(license.kind, ContributionType::License);
    assert_eq!(license.action, ContributionAction::Update);

    let link = recorder
        .on_link_changed(
            &LinkChanged {
                sentence_id: 1,
                translation_id: 9,
                action: LinkAction::Delete,
            },
            &user(5),
        )
        .await
        .unwrap();
    assert_eq!(link.translation_id, Some(9));

    let history = store
        .contributions_related_to_sentence(1, Visibility::Privileged)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn test_stats_reports_counts_by_type() {
    let f = store_with_bots().await;

    f.store
        .record_sentence_contribution(sentence(1, "eng", "x"), ContributionAction::Insert, &user(1))
        .await
        .unwrap();
    f.store
        .record_link_contribution(1, 2, LinkAction::Insert, &user(1))
        .await
        .unwrap();

    drop_statistics(&f.store).await;
    let stats = f.store.stats().await.unwrap();
    assert_eq!(stats.estimated_rows, None);
    assert_eq!(stats.exact_rows, 2);
    assert_eq!(stats.entries_by_type.get(&ContributionType::Link), Some(&1));
    assert_eq!(stats.bot_accounts, 1);

    f.store.refresh_statistics().await.unwrap();
    let stats = f.store.stats().await.unwrap();
    assert_eq!(stats.estimated_rows, Some(2));
}

#[tokio::test]
async fn test_reopened_store_has_row_estimate() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("contributions.db");

    let store = ContributionStore::open(StoreConfig::with_path(&path).bot_user_ids([BOT]))
        .await
        .unwrap();
    for i in 0..20i64 {
        let author = if i % 5 == 0 { BOT } else { 42 };
        store
            .record_sentence_contribution(sentence(i, "eng", "x"), ContributionAction::Insert, &user(author))
            .await
            .unwrap();
    }
    store.close().await;

    let store = ContributionStore::open(StoreConfig::with_path(&path).bot_user_ids([BOT]))
        .await
        .unwrap();
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.estimated_rows, Some(20));

    let bots_only = store.bots().apply(ContributionFilter::new());
    let approximate = RowEstimator::EngineStatistics
        .approximate_rows(store.pool(), "contributions")
        .await
        .unwrap();
    assert_eq!(approximate, 20);
    assert_eq!(store.paginate_count(&bots_only).await.unwrap(), 20);
}

#[tokio::test]
async fn test_background_refresh_catches_up_with_inserts() {
    let f = store_with_bots().await;
    let store = Arc::new(f.store);

    for i in 0..6i64 {
        store
            .record_sentence_contribution(sentence(i, "eng", "x"), ContributionAction::Insert, &user(42))
            .await
            .unwrap();
    }

    let refresher = store.clone();
    let task = tokio::spawn(async move {
        refresher
            .run_statistics_refresh(StdDuration::from_millis(20))
            .await
    });
    tokio::time::sleep(StdDuration::from_millis(300)).await;
    task.abort();

    assert_eq!(store.stats().await.unwrap().estimated_rows, Some(6));
    assert_eq!(store.paginate_count(&ContributionFilter::new()).await.unwrap(), 6);
}

#[tokio::test]
async fn test_reads_time_out_when_pool_is_exhausted() {
    let f = open_store(|c| {
        c.bot_user_ids([BOT])
            .max_connections(1)
            .query_timeout(StdDuration::from_millis(100))
    })
    .await;
    f.store
        .record_sentence_contribution(sentence(1, "eng", "x"), ContributionAction::Insert, &user(42))
        .await
        .unwrap();

    let held = f.store.pool().acquire().await.unwrap();

    let feed = f.store.last_contributions("10", "und").await;
    assert!(matches!(feed, Err(ContributionError::Timeout(_))));
    let count = f.store.paginate_count(&ContributionFilter::new()).await;
    assert!(matches!(count, Err(ContributionError::Timeout(_))));
    let stats = f.store.stats().await;
    assert!(matches!(stats, Err(ContributionError::Timeout(_))));

    // The store recovers once the connection is released
    drop(held);
    assert_eq!(f.store.last_contributions("10", "und").await.unwrap().len(), 1);
}
