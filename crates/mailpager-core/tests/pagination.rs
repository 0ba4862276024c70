//! Integration tests for paging, growth, push merges and selection.
//!
//! These tests drive the public API against the in-memory gateway, which
//! stands in for a real mail server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use mailpager_core::{
    AccountId, CacheKey, EmailHeaderRecord, ErrorKind, GatewayError, HeaderCache, LoadOutcome,
    MailboxCacheEntry, MailboxSession, MemoryGateway, Pager, PagerConfig, PushOutcome, Rejection,
    SelectionMode, Uid, merge_new_mail,
};

const PAGE_SIZE: u32 = 50;

fn header(uid: u32) -> EmailHeaderRecord {
    let date = Utc
        .timestamp_opt(1_700_000_000 - i64::from(uid) * 60, 0)
        .unwrap();
    EmailHeaderRecord::new(uid, format!("Message {uid}"), "sender@example.com", date)
}

fn account() -> AccountId {
    AccountId::new("work")
}

fn inbox() -> CacheKey {
    CacheKey::new("work", "INBOX").unwrap()
}

/// Gateway holding 120 messages (UIDs 1-120, in server order) and a pager over it.
fn fixture() -> (Arc<MemoryGateway>, Arc<Pager<MemoryGateway>>) {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.seed(&account(), "INBOX", (1..=120).map(header).collect());
    let pager = Arc::new(Pager::new(
        Arc::clone(&gateway),
        Arc::new(HeaderCache::new()),
        PagerConfig::default(),
    ));
    (gateway, pager)
}

fn uids(entry: &MailboxCacheEntry) -> Vec<u32> {
    entry.records.iter().map(|r| r.uid.get()).collect()
}

/// A loaded entry's first record sits at its base offset, which matches its page.
fn assert_page_consistent(entry: &MailboxCacheEntry) {
    assert_eq!(entry.base_offset, (entry.current_page - 1) * PAGE_SIZE);
    if let Some(first) = entry.records.first() {
        assert_eq!(first.uid.get(), entry.base_offset + 1);
    }
}

#[tokio::test]
async fn first_load_commits_page_one() {
    let (_, pager) = fixture();
    let key = inbox();

    assert!(pager.open(&key).await.is_applied());
    let entry = pager.entry(&key).unwrap();
    assert_eq!(uids(&entry), (1..=50).collect::<Vec<_>>());
    assert_eq!(entry.total_count, 120);
    assert!(entry.has_more);
    assert_eq!(entry.current_page, 1);

    // Re-requesting the visible page changes nothing
    assert_eq!(
        pager.jump(&key, 1).await,
        LoadOutcome::Rejected(Rejection::AlreadyVisible)
    );
    assert_eq!(pager.entry(&key).unwrap(), entry);
}

#[tokio::test]
async fn jump_to_last_partial_page() {
    let (_, pager) = fixture();
    let key = inbox();
    pager.open(&key).await;

    assert_eq!(pager.jump(&key, 3).await, LoadOutcome::Applied { count: 20 });
    let entry = pager.entry(&key).unwrap();
    assert_eq!(entry.records.len(), 20);
    assert!(!entry.has_more);
    assert_eq!(entry.current_page, 3);
    assert_page_consistent(&entry);
}

#[tokio::test]
async fn scroll_growth_keeps_page() {
    let (_, pager) = fixture();
    let key = inbox();
    pager.open(&key).await;

    assert_eq!(pager.grow(&key).await, LoadOutcome::Applied { count: 50 });
    let entry = pager.entry(&key).unwrap();
    assert_eq!(uids(&entry), (1..=100).collect::<Vec<_>>());
    assert_eq!(entry.current_page, 1);
    assert!(entry.has_more);
}

#[tokio::test]
async fn checkbox_cycle_ends_idle() {
    let (_, pager) = fixture();
    let mut session = MailboxSession::new(pager);
    session
        .switch_mailbox(Some(&account()), Some("INBOX"))
        .await;
    session.open_row(Uid(3));

    session.toggle_checkbox(Uid(7));
    assert!(matches!(session.selection().mode(), SelectionMode::MultiSelect(_)));
    session.toggle_checkbox(Uid(7));
    assert_eq!(session.selection().mode(), SelectionMode::Idle);
    assert!(!session.selection().multi_select_active());
}

#[tokio::test]
async fn push_update_prepends_new_rows_on_any_page() {
    let (gateway, pager) = fixture();
    let key = inbox();
    pager.open(&key).await;
    pager.jump(&key, 2).await;
    let before = pager.entry(&key).unwrap();

    // Three announced messages; one of them is already on the visible page
    gateway.seed(
        &account(),
        "INBOX",
        vec![header(1001), header(1000), header(51)],
    );
    let notice = mailpager_core::NewMailNotice {
        account: account(),
        mailbox: "INBOX".into(),
        count: 3,
    };
    let outcome = merge_new_mail(&pager, Some(&key), &notice).await;
    assert_eq!(outcome, PushOutcome::Merged { added: 2 });

    let after = pager.entry(&key).unwrap();
    assert_eq!(after.records.len(), before.records.len() + 2);
    assert_eq!(&uids(&after)[..3], &[1001, 1000, 51]);
    assert_eq!(after.current_page, 2);
}

/// Deliver three messages, merge them into `key` and grow once.
///
/// Returns the cached UIDs and the server's full order afterwards.
async fn push_then_grow(
    gateway: &MemoryGateway,
    pager: &Pager<MemoryGateway>,
    key: &CacheKey,
) -> (Vec<u32>, Vec<u32>) {
    use mailpager_core::MailGateway;

    gateway.deliver(
        &account(),
        "INBOX",
        vec![header(1003), header(1002), header(1001)],
    );
    let notice = mailpager_core::NewMailNotice {
        account: account(),
        mailbox: "INBOX".into(),
        count: 3,
    };
    assert_eq!(
        merge_new_mail(pager, Some(key), &notice).await,
        PushOutcome::Merged { added: 3 }
    );
    assert!(pager.grow(key).await.is_applied());

    let server = gateway
        .list_page(&account(), "INBOX", 0, 1000)
        .await
        .unwrap()
        .iter()
        .map(|r| r.uid.get())
        .collect();
    (uids(&pager.entry(key).unwrap()), server)
}

fn assert_no_duplicates(cached: &[u32]) {
    let unique: std::collections::HashSet<_> = cached.iter().collect();
    assert_eq!(unique.len(), cached.len());
}

#[tokio::test]
async fn growth_after_push_continues_on_page_one() {
    let (gateway, pager) = fixture();
    let key = inbox();
    pager.open(&key).await;

    let (cached, server) = push_then_grow(&gateway, &pager, &key).await;
    assert_no_duplicates(&cached);
    assert_eq!(cached, server[..103]);
    assert_eq!(cached.last(), Some(&100));
}

#[tokio::test]
async fn growth_after_push_continues_on_jumped_page() {
    let (gateway, pager) = fixture();
    let key = inbox();
    pager.open(&key).await;
    pager.jump(&key, 2).await;

    let (cached, server) = push_then_grow(&gateway, &pager, &key).await;
    assert_no_duplicates(&cached);
    // New rows on top, then the server's rows from the old page-2 start onward
    let expected: Vec<u32> = server[..3].iter().chain(&server[53..]).copied().collect();
    assert_eq!(cached, expected);
    assert_eq!(&cached[3..5], &[51, 52]);
    assert_eq!(cached.last(), Some(&120));
    assert!(!pager.entry(&key).unwrap().has_more);
}

#[tokio::test]
async fn failed_jump_keeps_visible_page() {
    let (gateway, pager) = fixture();
    let key = inbox();
    pager.open(&key).await;
    pager.jump(&key, 2).await;

    gateway.fail_next(GatewayError::Connection("read timed out".into()));
    let LoadOutcome::Failed(notice) = pager.jump(&key, 3).await else {
        panic!("jump should fail");
    };
    assert_eq!(notice.kind, ErrorKind::Connection);

    let entry = pager.entry(&key).unwrap();
    assert_eq!(entry.current_page, 2);
    assert!(entry.is_failed());
    assert!(entry.records.is_empty());
    assert!(!entry.has_more);
    assert_eq!(pager.last_error(&key), Some(notice));
    assert!(!pager.is_loading(&key));
}

#[tokio::test]
async fn in_flight_jump_blocks_other_loads_and_stays_invisible() {
    let (gateway, pager) = fixture();
    let key = inbox();
    pager.open(&key).await;

    let gate = gateway.pause();
    let jumping = {
        let pager = Arc::clone(&pager);
        let key = key.clone();
        tokio::spawn(async move { pager.jump(&key, 2).await })
    };
    gate.entered().await;

    // The target page is pending, but page 1 data is still what is shown
    assert!(pager.is_loading(&key));
    assert_eq!(pager.pending_page(&key), Some(2));
    let during = pager.entry(&key).unwrap();
    assert_eq!(during.current_page, 1);
    assert_page_consistent(&during);

    assert_eq!(
        pager.jump(&key, 3).await,
        LoadOutcome::Rejected(Rejection::Busy)
    );
    assert_eq!(pager.grow(&key).await, LoadOutcome::Rejected(Rejection::Busy));
    assert_eq!(pager.refresh(&key).await, LoadOutcome::Rejected(Rejection::Busy));

    gateway.resume();
    gate.release();
    assert!(jumping.await.unwrap().is_applied());

    let after = pager.entry(&key).unwrap();
    assert_eq!(after.current_page, 2);
    assert_page_consistent(&after);
    assert!(!pager.is_loading(&key));
    assert_eq!(pager.pending_page(&key), None);
}

#[tokio::test]
async fn other_keys_load_while_one_is_busy() {
    let (gateway, pager) = fixture();
    gateway.seed(&account(), "Sent", (1..=10).map(header).collect());
    let key = inbox();
    let sent = CacheKey::new("work", "Sent").unwrap();
    pager.open(&key).await;

    let gate = gateway.pause();
    let growing = {
        let pager = Arc::clone(&pager);
        let key = key.clone();
        tokio::spawn(async move { pager.grow(&key).await })
    };
    gate.entered().await;
    gateway.resume();

    assert!(pager.open(&sent).await.is_applied());
    assert!(!pager.entry(&sent).unwrap().has_more);

    gate.release();
    assert!(growing.await.unwrap().is_applied());
}

#[tokio::test]
async fn bounds_are_validated_against_total() {
    let (gateway, pager) = fixture();
    let key = inbox();
    pager.open(&key).await;
    let calls = gateway.calls();

    for page in [0, 4, 100] {
        assert_eq!(
            pager.jump(&key, page).await,
            LoadOutcome::Rejected(Rejection::OutOfRange)
        );
    }
    assert_eq!(gateway.calls(), calls);
    assert!(pager.last_error(&key).is_none());
}

#[tokio::test]
async fn has_more_only_after_full_page() {
    let (_, pager) = fixture();
    let key = inbox();
    pager.open(&key).await;

    for _ in 0..5 {
        let outcome = pager.grow(&key).await;
        let entry = pager.entry(&key).unwrap();
        if let LoadOutcome::Applied { count } = outcome {
            assert_eq!(entry.has_more, count == PAGE_SIZE as usize);
        }
    }
    let entry = pager.entry(&key).unwrap();
    assert_eq!(entry.records.len(), 120);
    assert!(!entry.has_more);
}

#[tokio::test]
async fn session_push_listener_follows_active_mailbox() {
    let (gateway, pager) = fixture();
    gateway.seed(&account(), "Sent", (1..=5).map(header).collect());
    let mut session = MailboxSession::new(pager);
    session.start_push();
    session
        .switch_mailbox(Some(&account()), Some("INBOX"))
        .await;

    gateway.deliver(&account(), "INBOX", vec![header(900)]);
    gateway.deliver(&account(), "Sent", vec![header(901)]);
    for _ in 0..100 {
        if session.entry().unwrap().records.len() == 51 {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(session.visible_records()[0].uid, Uid(900));
    assert_eq!(session.entry().unwrap().total_count, 121);

    session.stop_push();
}
