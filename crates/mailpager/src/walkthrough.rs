//! Scripted session against the in-memory gateway.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use mailpager_core::{
    AccountId, EmailHeaderRecord, GatewayError, LoadOutcome, MailboxSession, MemoryGateway,
    MessageFlag,
};
use tracing::warn;

const ACCOUNT: &str = "demo";
const SUBJECTS: &[&str] = &[
    "Invoice for March",
    "Team lunch on Friday",
    "Release notes",
    "Re: design review",
    "Your order has shipped",
];
const SENDERS: &[&str] = &[
    "Billing <billing@shop.example>",
    "Alice <alice@example.com>",
    "CI <ci@build.example>",
    "Bob <bob@example.com>",
];

fn header(uid: u32) -> EmailHeaderRecord {
    let idx = uid as usize;
    let mut record = EmailHeaderRecord::new(
        uid,
        format!("{} #{uid}", SUBJECTS[idx % SUBJECTS.len()]),
        SENDERS[idx % SENDERS.len()],
        Utc::now() - ChronoDuration::minutes(i64::from(uid)),
    );
    record.seen = uid % 3 != 0;
    if uid % 7 == 0 {
        record.flags.insert(MessageFlag::Flagged);
    }
    record.snippet = Some(format!("Preview text of message {uid}"));
    record
}

fn inbox_len(page_size: u32) -> u32 {
    page_size.saturating_mul(2).saturating_add(page_size / 2)
}

/// Fill the gateway with two and a half pages of INBOX and a small Archive.
pub fn seed(gateway: &MemoryGateway, page_size: u32) {
    let account = AccountId::new(ACCOUNT);
    gateway.seed(
        &account,
        "INBOX",
        (1..=inbox_len(page_size)).map(header).collect(),
    );
    gateway.seed(&account, "Archive", (5000..5007).map(header).collect());
}

fn describe(label: &str, outcome: &LoadOutcome) {
    match outcome {
        LoadOutcome::Applied { count } => println!("{label}: applied ({count} records)"),
        LoadOutcome::Rejected(reason) => println!("{label}: ignored ({reason:?})"),
        LoadOutcome::Failed(notice) => println!("{label}: failed - {notice}"),
    }
}

fn print_state(session: &MailboxSession<MemoryGateway>) {
    let Some(entry) = session.entry() else {
        println!("  (nothing loaded)");
        return;
    };
    let first = entry.records.first().map(|r| r.uid.get());
    let last = entry.records.last().map(|r| r.uid.get());
    println!(
        "  page {}/{} | {} rows (uid {:?}..{:?}) | has_more={} | total={} | {:?}",
        entry.current_page,
        session.total_pages(),
        entry.records.len(),
        first,
        last,
        entry.has_more,
        entry.total_count,
        session.selection().mode(),
    );
}

/// Walk a session through every coordinator and selection operation.
pub async fn run(gateway: &MemoryGateway, session: &mut MailboxSession<MemoryGateway>) {
    let account = AccountId::new(ACCOUNT);

    if let Some(outcome) = session.switch_mailbox(Some(&account), Some("INBOX")).await {
        describe("open INBOX", &outcome);
    }
    print_state(session);

    describe("jump to page 2", &session.jump(2).await);
    print_state(session);

    describe("jump to page 99", &session.jump(99).await);
    describe("scroll growth", &session.grow().await);
    print_state(session);

    gateway.deliver(&account, "INBOX", vec![header(9001), header(9002), header(9003)]);
    let before = session.entry().map_or(0, |e| e.records.len());
    for _ in 0..50 {
        if session.entry().map_or(0, |e| e.records.len()) > before {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    println!("new mail arrived");
    print_state(session);

    session.set_search("invoice");
    session.select_all();
    println!(
        "selected {} invoices out of {} visible rows",
        session.selection().selected().len(),
        session.visible_records().len()
    );
    match session.delete_selected().await {
        Ok(removed) => println!("deleted {removed} messages"),
        Err(notice) => warn!(%notice, "Delete failed"),
    }
    session.set_search("");
    print_state(session);

    gateway.fail_next(GatewayError::Connection("read timed out".into()));
    describe("jump to page 1", &session.jump(1).await);
    print_state(session);
    if let Some(notice) = session.last_error() {
        println!("  error guidance: {}", notice.guidance);
    }

    describe("refresh", &session.refresh().await);
    print_state(session);

    if let Some(outcome) = session.switch_mailbox(Some(&account), Some("Archive")).await {
        describe("open Archive", &outcome);
    }
    session.toggle_checkbox(mailpager_core::Uid(5001));
    print_state(session);
    session.toggle_checkbox(mailpager_core::Uid(5001));
    print_state(session);
}
