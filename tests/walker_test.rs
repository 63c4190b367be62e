//! End-to-end runs of the pagination walker against a scripted workspace

mod common;

use common::{FakePage, FakeSurface, message, pages_of, test_config, test_config_builder};
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;

use slack_search_export::auth::{AuthSession, AuthSessionStore, StoredCookie};
use slack_search_export::export::{ExportFormat, ExportSink, INCOMPLETE_MARKER_SUFFIX};
use slack_search_export::extract::MessageRecord;
use slack_search_export::harvest::{PaginationWalker, RunReport, RunState, RunStatus, StopReason};
use slack_search_export::interrupt::CancelFlag;
use slack_search_export::HarvestConfig;

async fn run_walker(
    surface: &FakeSurface,
    config: &HarvestConfig,
    cancel: CancelFlag,
) -> RunReport {
    let store = AuthSessionStore::new(config.auth_file());
    let mut sink = ExportSink::create(config.output_path(), config.format())
        .await
        .unwrap();
    let mut state = RunState::new(cancel);
    let request = config.search_request();
    PaginationWalker::new(surface, &store, config, &mut sink)
        .run(&request, &mut state)
        .await
}

fn read_json(path: &Path) -> Vec<MessageRecord> {
    let content = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&content).unwrap()
}

async fn save_valid_session(config: &HarvestConfig) {
    let session = AuthSession::new(
        vec![StoredCookie {
            name: "d".to_string(),
            value: "xoxd-stored".to_string(),
            domain: ".slack.com".to_string(),
            path: "/".to_string(),
            expires: None,
            http_only: true,
            secure: true,
            same_site: None,
        }],
        Vec::new(),
    );
    AuthSessionStore::new(config.auth_file())
        .save(&session)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_three_pages_export_all_records_oldest_first() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Json);
    let surface = FakeSurface::new(pages_of(&[20, 20, 5])).with_result_count("45 results");

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert_eq!(report.stop_reason, StopReason::EndOfResults);
    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.records_written, 45);
    assert_eq!(report.reported_total, Some(45));
    assert!(report.sort_applied);

    let records = read_json(config.output_path());
    assert_eq!(records.len(), 45);
    let keys: HashSet<_> = records.iter().map(|r| r.key.clone()).collect();
    assert_eq!(keys.len(), 45);
    assert!(
        records
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp)
    );
    assert_eq!(records[0].body, "message **0**");
}

#[tokio::test]
async fn test_page_cap_stops_even_with_next_control() {
    let dir = TempDir::new().unwrap();
    let config = test_config_builder(dir.path(), ExportFormat::Text)
        .page_cap(5)
        .build()
        .unwrap();
    let surface = FakeSurface::new(pages_of(&[2; 8]));

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert_eq!(report.stop_reason, StopReason::PageCap);
    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(report.pages_visited, 5);
    assert_eq!(report.records_written, 10);
    assert!(
        !surface
            .clicks()
            .iter()
            .any(|c| c.contains("Page 6")),
        "walker must not click past the cap"
    );
}

#[tokio::test]
async fn test_page_timeout_keeps_partial_content_and_reports_partial() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Json);
    let mut pages = pages_of(&[3, 2, 3]);
    pages[1] = FakePage::stalled(pages[1].messages.clone());
    let surface = FakeSurface::new(pages);

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert_eq!(report.stop_reason, StopReason::PartialTimeout);
    assert_eq!(report.status(), RunStatus::Partial);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.records_written, 5);
    assert_eq!(read_json(config.output_path()).len(), 5);
}

#[tokio::test]
async fn test_interrupt_after_page_two_finalizes_valid_json() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Json);
    let cancel = CancelFlag::new();
    let surface = FakeSurface::new(pages_of(&[4, 4, 4, 4])).cancelling_on(2, cancel.clone());

    let report = run_walker(&surface, &config, cancel).await;

    assert_eq!(report.stop_reason, StopReason::Interrupted);
    assert_eq!(report.status(), RunStatus::Partial);
    assert_eq!(report.pages_visited, 2);

    let records = read_json(config.output_path());
    let expected: Vec<_> = (0..8).map(|n| message(n).permalink.unwrap()).collect();
    let actual: Vec<_> = records.iter().filter_map(|r| r.permalink.clone()).collect();
    assert_eq!(actual, expected);

    let mut marker = config.output_path().as_os_str().to_owned();
    marker.push(INCOMPLETE_MARKER_SUFFIX);
    assert!(!Path::new(&marker).exists());
}

#[tokio::test]
async fn test_rerendered_page_ends_the_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let mut pages = pages_of(&[3, 3, 3]);
    // Page 3 re-renders page 2 under a new number
    pages[2] = pages[1].clone();
    pages.push(FakePage::new(vec![message(100)]));
    let surface = FakeSurface::new(pages);

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert_eq!(report.stop_reason, StopReason::EndOfResults);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.records_written, 6);
}

#[tokio::test]
async fn test_slow_page_swap_is_waited_for() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Json);
    // The first read after each pager click still shows the previous page
    let surface = FakeSurface::new(pages_of(&[20, 20, 5])).lagging_after_click(1);

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert_eq!(report.stop_reason, StopReason::EndOfResults);
    assert_eq!(report.status(), RunStatus::Complete);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.records_written, 45);
    assert_eq!(read_json(config.output_path()).len(), 45);
}

#[tokio::test]
async fn test_page_that_never_swaps_in_is_partial() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let surface = FakeSurface::new(pages_of(&[3, 3, 3])).lagging_after_click(u32::MAX);

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert_eq!(report.stop_reason, StopReason::PartialTimeout);
    assert_eq!(report.status(), RunStatus::Partial);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.records_written, 3);
}

#[tokio::test]
async fn test_session_expiry_relogs_once_and_resumes() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Json);
    save_valid_session(&config).await;
    let surface = FakeSurface::new(pages_of(&[2, 2, 2])).expiring_on(&[3]);

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert_eq!(report.stop_reason, StopReason::EndOfResults);
    assert_eq!(report.records_written, 6);
    assert_eq!(surface.logins(), 1, "exactly one interactive re-login");
    assert_eq!(surface.typed_queries().len(), 2);

    let keys: Vec<_> = read_json(config.output_path())
        .into_iter()
        .map(|r| r.key)
        .collect();
    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(keys.len(), 6);
    assert_eq!(unique.len(), 6);
}

#[tokio::test]
async fn test_second_session_expiry_is_fatal_but_keeps_data() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Json);
    save_valid_session(&config).await;
    let surface = FakeSurface::new(pages_of(&[2, 2, 2])).expiring_on(&[2, 2]);

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert!(matches!(report.stop_reason, StopReason::Fatal(_)));
    assert_eq!(report.status(), RunStatus::Fatal);
    assert_eq!(report.records_written, 2);
    // Finalized despite the fatal error
    assert_eq!(read_json(config.output_path()).len(), 2);
}

#[tokio::test]
async fn test_missing_sort_control_degrades_but_completes() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Text);
    let surface = FakeSurface::new(pages_of(&[2, 1])).without_sort_control();

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert_eq!(report.status(), RunStatus::Complete);
    assert!(!report.sort_applied);
    assert_eq!(report.records_written, 3);
}

#[tokio::test]
async fn test_login_timeout_is_fatal_and_file_is_still_finalized() {
    let dir = TempDir::new().unwrap();
    let config = test_config_builder(dir.path(), ExportFormat::Json)
        .login_timeout(std::time::Duration::from_millis(50))
        .build()
        .unwrap();
    let surface = FakeSurface::new(pages_of(&[2])).with_human_login_after(None);

    let report = run_walker(&surface, &config, CancelFlag::new()).await;

    assert_eq!(report.status(), RunStatus::Fatal);
    assert_eq!(report.records_written, 0);
    assert!(read_json(config.output_path()).is_empty());
}

#[tokio::test]
async fn test_truncated_message_is_expanded_or_flagged() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), ExportFormat::Json);

    let mut short = message(0);
    short.truncated = true;
    short.body_html = "<p>start of a long</p>".to_string();
    let mut full = message(0);
    full.body_html = "<p>start of a long message, now complete</p>".to_string();
    let mut stuck = message(1);
    stuck.truncated = true;

    let surface = FakeSurface::new(vec![FakePage::new(vec![short, stuck])])
        .with_expansion(1, 0, full);

    let report = run_walker(&surface, &config, CancelFlag::new()).await;
    assert_eq!(report.records_written, 2);

    let records = read_json(config.output_path());
    assert_eq!(records[0].body, "start of a long message, now complete");
    assert!(!records[0].truncated);
    assert!(records[1].truncated);
}

fn overlapping_pages() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0usize..30, 1..8), 1..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_exported_keys_are_unique(page_ids in overlapping_pages()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (records, pages) = runtime.block_on(async {
            let dir = TempDir::new().unwrap();
            let config = test_config(dir.path(), ExportFormat::Json);
            let pages: Vec<FakePage> = page_ids
                .iter()
                .map(|ids| FakePage::new(ids.iter().copied().map(message).collect()))
                .collect();
            let surface = FakeSurface::new(pages);
            let report = run_walker(&surface, &config, CancelFlag::new()).await;
            (read_json(config.output_path()), report.pages_visited)
        });

        let keys: HashSet<_> = records.iter().map(|r| r.key.clone()).collect();
        prop_assert_eq!(keys.len(), records.len());
        prop_assert!(pages as usize <= page_ids.len());
    }
}
