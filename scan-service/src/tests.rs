use crate::{
    handle_message, BrowserHost, Notifier, ScanKind, ScanOrchestrator, ScanReport, ScanService,
    TabInfo,
};
use alert_core::{
    now_millis, AppConfig, BrowserError, CoreError, MatchRecord, ScanRequest, ScanResponse,
    Settings, StorageError, TabId, WebhookError, WebhookPayload,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage::{KeyValueStore, MemoryStore, SettingsRepository, SEEN_POSTS_KEY};
use tokio::sync::Notify;
use tokio::time::Instant;
use webhook_client::{WebhookSink, WebhookTransport};

const HOOK: &str = "https://example.test/hook";
const G1: &str = "https://fb.test/groups/g1";
const G2: &str = "https://fb.test/groups/g2";
const G3: &str = "https://fb.test/groups/g3";

#[derive(Clone)]
enum Reply {
    Matches(Vec<MatchRecord>),
    Error(String),
    ScriptError(String),
    Hang,
    Block(Arc<Notify>),
}

#[derive(Default)]
struct FakeBrowser {
    tabs: Mutex<Vec<TabInfo>>,
    replies: Mutex<HashMap<TabId, Reply>>,
    scans: Mutex<Vec<TabId>>,
    opened: Mutex<Vec<(Instant, String)>>,
    closed: Mutex<Vec<TabId>>,
    reloaded: Mutex<Vec<TabId>>,
    query_fails: AtomicBool,
}

impl FakeBrowser {
    fn with_tabs(tabs: Vec<TabInfo>) -> Arc<Self> {
        let browser = Self::default();
        *browser.tabs.lock().unwrap() = tabs;
        Arc::new(browser)
    }

    fn reply(&self, tab_id: TabId, reply: Reply) {
        self.replies.lock().unwrap().insert(tab_id, reply);
    }

    fn scans(&self) -> Vec<TabId> {
        self.scans.lock().unwrap().clone()
    }

    async fn wait_for_scans(&self, count: usize) {
        while self.scans.lock().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl BrowserHost for FakeBrowser {
    async fn query_tabs(&self) -> Result<Vec<TabInfo>, CoreError> {
        if self.query_fails.load(Ordering::SeqCst) {
            return Err(CoreError::Internal {
                message: "tabs api unavailable".to_string(),
            });
        }
        Ok(self.tabs.lock().unwrap().clone())
    }

    async fn send_scan(
        &self,
        tab_id: TabId,
        _request: &ScanRequest,
    ) -> Result<ScanResponse, CoreError> {
        self.scans.lock().unwrap().push(tab_id);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&tab_id)
            .cloned()
            .unwrap_or(Reply::Matches(Vec::new()));

        match reply {
            Reply::Matches(matches) => Ok(ScanResponse {
                matches,
                error: None,
            }),
            Reply::Error(reason) => Err(BrowserError::ChannelClosed { tab_id, reason }.into()),
            Reply::ScriptError(reason) => Ok(ScanResponse {
                matches: Vec::new(),
                error: Some(reason),
            }),
            Reply::Hang => std::future::pending().await,
            Reply::Block(release) => {
                release.notified().await;
                Ok(ScanResponse::default())
            }
        }
    }

    async fn open_tab(&self, url: &str) -> Result<TabId, CoreError> {
        let mut opened = self.opened.lock().unwrap();
        let tab_id = 100 + opened.len() as TabId;
        opened.push((Instant::now(), url.to_string()));
        self.tabs.lock().unwrap().push(TabInfo::new(tab_id, url));
        Ok(tab_id)
    }

    async fn close_tab(&self, tab_id: TabId) -> Result<(), CoreError> {
        self.closed.lock().unwrap().push(tab_id);
        self.tabs.lock().unwrap().retain(|t| t.id != tab_id);
        Ok(())
    }

    async fn reload_tab(&self, tab_id: TabId) -> Result<(), CoreError> {
        self.reloaded.lock().unwrap().push(tab_id);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingTransport {
    payloads: Mutex<Vec<WebhookPayload>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    fn payloads(&self) -> Vec<WebhookPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookTransport for RecordingTransport {
    async fn post_json(&self, _url: &str, payload: &WebhookPayload) -> Result<(), CoreError> {
        self.payloads.lock().unwrap().push(payload.clone());
        if self.failing.load(Ordering::SeqCst) {
            Err(WebhookError::Status { status_code: 500 }.into())
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
    shown_at: Mutex<Vec<Instant>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), CoreError> {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        self.shown_at.lock().unwrap().push(Instant::now());
        Ok(())
    }
}

/// Memory store whose ledger key can be made to report a locked database.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    ledger_locked: AtomicBool,
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CoreError> {
        if key == SEEN_POSTS_KEY && self.ledger_locked.load(Ordering::SeqCst) {
            return Err(StorageError::DatabaseLocked.into());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CoreError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.inner.remove(key).await
    }
}

struct Harness {
    orchestrator: Arc<ScanOrchestrator>,
    browser: Arc<FakeBrowser>,
    transport: Arc<RecordingTransport>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    async fn ledger_len(&self) -> usize {
        self.orchestrator
            .ledger()
            .load(now_millis())
            .await
            .unwrap()
            .len()
    }
}

fn settings() -> Settings {
    Settings {
        keywords: vec!["wilmington".to_string()],
        webhook_url: HOOK.to_string(),
        ..Settings::default()
    }
}

fn config() -> AppConfig {
    AppConfig {
        site_hosts: vec!["fb.test".to_string()],
        ..AppConfig::default()
    }
}

fn post(group: &str, n: u32) -> MatchRecord {
    MatchRecord::new(
        "wilmington",
        group,
        Some(format!("https://fb.test/groups/{}/posts/{}", group, n)),
        "Two bedroom in wilmington, available now",
    )
}

async fn harness(settings: Settings, tabs: Vec<TabInfo>) -> Harness {
    harness_with_store(settings, tabs, Arc::new(MemoryStore::new())).await
}

async fn harness_with_store(
    settings: Settings,
    tabs: Vec<TabInfo>,
    store: Arc<dyn KeyValueStore>,
) -> Harness {
    SettingsRepository::new(store.clone())
        .save(&settings)
        .await
        .unwrap();

    let browser = FakeBrowser::with_tabs(tabs);
    let transport = Arc::new(RecordingTransport::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let orchestrator = Arc::new(ScanOrchestrator::new(
        browser.clone(),
        store,
        WebhookSink::new(transport.clone()),
        notifier.clone(),
        config(),
    ));

    Harness {
        orchestrator,
        browser,
        transport,
        notifier,
    }
}

#[tokio::test]
async fn test_fresh_match_is_sent_once_across_passes() {
    let h = harness(settings(), vec![TabInfo::new(1, G1)]).await;
    h.browser.reply(1, Reply::Matches(vec![post("g1", 1)]));

    let first = h.orchestrator.on_timer().await;
    let summary = first.summary().unwrap();
    assert_eq!(summary.fresh_matches, 1);

    let payloads = h.transport.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].matches.len(), 1);
    assert_eq!(payloads[0].source, "chrome_extension");
    assert_eq!(h.ledger_len().await, 1);

    let second = h.orchestrator.on_timer().await;
    let summary = second.summary().unwrap();
    assert_eq!(summary.matches_found, 1);
    assert_eq!(summary.fresh_matches, 0);
    assert_eq!(h.transport.payloads().len(), 1);
    assert_eq!(h.browser.scans(), vec![1, 1]);

    let notes = h.notifier.messages.lock().unwrap().clone();
    assert_eq!(
        notes,
        vec![(
            "Facebook Keyword Alert".to_string(),
            "Found 1 new match".to_string()
        )]
    );
}

#[tokio::test]
async fn test_allow_list_limits_batch_to_monitored_groups() {
    let settings = Settings {
        monitored_group_urls: vec![G1.to_string()],
        ..settings()
    };
    let h = harness(
        settings,
        vec![
            TabInfo::new(1, format!("{}/posts/5", G1)),
            TabInfo::new(2, G2),
            TabInfo::new(3, "https://fb.test/groups/g10"),
        ],
    )
    .await;

    h.orchestrator.on_timer().await;

    assert_eq!(h.browser.scans(), vec![1]);
}

#[tokio::test]
async fn test_second_batch_while_busy_is_a_no_op() {
    let h = harness(settings(), vec![TabInfo::new(1, G1)]).await;
    let release = Arc::new(Notify::new());
    h.browser.reply(1, Reply::Block(release.clone()));

    let running = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move { orchestrator.on_timer().await })
    };
    h.browser.wait_for_scans(1).await;

    assert_eq!(h.orchestrator.on_timer().await, ScanReport::Busy);
    assert_eq!(h.browser.scans().len(), 1);
    assert!(h.orchestrator.status().await.scanning);

    release.notify_one();
    let report = running.await.unwrap();
    assert_eq!(report.summary().unwrap().tabs_scanned, 1);
    assert!(!h.orchestrator.status().await.scanning);
}

#[tokio::test]
async fn test_failing_tab_does_not_abort_pass() {
    let h = harness(settings(), vec![TabInfo::new(1, G1), TabInfo::new(2, G2)]).await;
    h.browser.reply(
        1,
        Reply::Error("Could not establish connection".to_string()),
    );
    h.browser.reply(2, Reply::Matches(vec![post("g2", 7)]));

    let report = h.orchestrator.on_timer().await;
    let summary = report.summary().unwrap();

    assert_eq!(summary.tabs_failed, 1);
    assert_eq!(summary.tabs_scanned, 1);
    assert_eq!(summary.fresh_matches, 1);
    assert_eq!(h.transport.payloads().len(), 1);
}

#[tokio::test]
async fn test_script_error_reply_counts_as_failure() {
    let h = harness(settings(), vec![TabInfo::new(1, G1), TabInfo::new(2, G2)]).await;
    h.browser
        .reply(1, Reply::ScriptError("feed container not found".to_string()));

    let report = h.orchestrator.on_timer().await;
    let summary = report.summary().unwrap();

    assert_eq!(summary.tabs_failed, 1);
    assert_eq!(summary.tabs_scanned, 1);
    assert!(h.transport.payloads().is_empty());
    assert_eq!(h.ledger_len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unresponsive_tab_times_out() {
    let h = harness(settings(), vec![TabInfo::new(1, G1), TabInfo::new(2, G2)]).await;
    h.browser.reply(1, Reply::Hang);
    h.browser.reply(2, Reply::Matches(vec![post("g2", 1)]));
    let start = Instant::now();

    let report = h.orchestrator.on_timer().await;
    let summary = report.summary().unwrap();

    assert_eq!(summary.tabs_failed, 1);
    assert_eq!(summary.fresh_matches, 1);
    assert_eq!(Instant::now() - start, Duration::from_secs(30));
}

#[tokio::test]
async fn test_closing_tab_cancels_its_scan() {
    let h = harness(settings(), vec![TabInfo::new(1, G1), TabInfo::new(2, G2)]).await;
    h.browser.reply(1, Reply::Hang);
    h.browser.reply(2, Reply::Matches(vec![post("g2", 1)]));

    let running = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move { orchestrator.on_timer().await })
    };
    h.browser.wait_for_scans(1).await;
    h.orchestrator.on_tab_removed(1).await;

    let report = running.await.unwrap();
    let summary = report.summary().unwrap();
    assert_eq!(summary.tabs_cancelled, 1);
    assert_eq!(summary.fresh_matches, 1);
    assert_eq!(h.browser.scans(), vec![1, 2]);
}

#[tokio::test]
async fn test_cancelled_session_stops_before_next_tab() {
    let h = harness(settings(), vec![TabInfo::new(1, G1), TabInfo::new(2, G2)]).await;
    h.browser.reply(1, Reply::Hang);

    let running = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move { orchestrator.on_timer().await })
    };
    h.browser.wait_for_scans(1).await;
    assert!(h.orchestrator.cancel_scan());

    let report = running.await.unwrap();
    assert_eq!(report.summary().unwrap().tabs_cancelled, 1);
    assert_eq!(h.browser.scans(), vec![1]);
}

#[tokio::test]
async fn test_manual_scan_ignores_allow_list() {
    let settings = Settings {
        monitored_group_urls: vec![G1.to_string()],
        ..settings()
    };
    let h = harness(settings, vec![TabInfo::new(1, G1), TabInfo::new(5, G2)]).await;
    h.browser.reply(5, Reply::Matches(vec![post("g2", 3)]));

    let report = h.orchestrator.manual_scan(5).await;

    assert_eq!(report.summary().unwrap().kind, ScanKind::Tab);
    assert_eq!(h.browser.scans(), vec![5]);
    assert_eq!(h.transport.payloads().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_scan_waits_for_running_session() {
    let h = harness(settings(), vec![TabInfo::new(1, G1)]).await;
    let held = h.orchestrator.gate().try_begin(ScanKind::Periodic).unwrap();

    let manual = {
        let orchestrator = h.orchestrator.clone();
        tokio::spawn(async move { orchestrator.manual_scan(1).await })
    };
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.browser.scans().is_empty());

    drop(held);
    let report = manual.await.unwrap();
    assert_eq!(report.summary().unwrap().tabs_scanned, 1);
    assert_eq!(h.browser.scans(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_manual_scan_gives_up_after_scan_timeout() {
    let h = harness(settings(), vec![TabInfo::new(1, G1)]).await;
    let _held = h.orchestrator.gate().try_begin(ScanKind::Periodic).unwrap();

    assert_eq!(h.orchestrator.manual_scan(1).await, ScanReport::Busy);
    assert!(h.browser.scans().is_empty());
}

#[tokio::test]
async fn test_missing_configuration_skips_pass() {
    let no_hook = Settings {
        webhook_url: String::new(),
        ..settings()
    };
    let h = harness(no_hook, vec![TabInfo::new(1, G1)]).await;

    let report = h.orchestrator.on_timer().await;

    assert!(matches!(report, ScanReport::Skipped { .. }));
    assert!(h.browser.scans().is_empty());
    assert!(!h.orchestrator.status().await.scanning);

    let no_keywords = Settings {
        keywords: Vec::new(),
        ..settings()
    };
    let h = harness(no_keywords, vec![TabInfo::new(1, G1)]).await;
    assert!(matches!(
        h.orchestrator.manual_scan(1).await,
        ScanReport::Skipped { .. }
    ));
    assert!(h.browser.scans().is_empty());
}

#[tokio::test]
async fn test_notifications_can_be_disabled() {
    let quiet = Settings {
        notifications_enabled: false,
        ..settings()
    };
    let h = harness(quiet, vec![TabInfo::new(1, G1)]).await;
    h.browser.reply(1, Reply::Matches(vec![post("g1", 1), post("g1", 2)]));

    h.orchestrator.on_timer().await;

    assert_eq!(h.transport.payloads()[0].matches.len(), 2);
    assert!(h.notifier.messages.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_delivery_still_marks_matches_seen() {
    let h = harness(settings(), vec![TabInfo::new(1, G1)]).await;
    h.transport.failing.store(true, Ordering::SeqCst);
    h.browser.reply(1, Reply::Matches(vec![post("g1", 1)]));

    let report = h.orchestrator.on_timer().await;
    assert_eq!(report.summary().unwrap().webhook_failures, 1);
    assert_eq!(h.transport.payloads().len(), 4);
    assert_eq!(h.ledger_len().await, 1);

    h.orchestrator.on_timer().await;
    assert_eq!(h.transport.payloads().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_notification_does_not_wait_for_webhook_retries() {
    let h = harness(settings(), vec![TabInfo::new(1, G1)]).await;
    h.transport.failing.store(true, Ordering::SeqCst);
    h.browser.reply(1, Reply::Matches(vec![post("g1", 1)]));
    let start = Instant::now();

    h.orchestrator.on_timer().await;

    assert_eq!(*h.notifier.shown_at.lock().unwrap(), vec![start]);
    assert_eq!(h.transport.payloads().len(), 4);
    assert!(Instant::now() > start);
}

#[tokio::test]
async fn test_unreadable_ledger_skips_pass_and_keeps_history() {
    let store = Arc::new(FlakyStore::default());
    let h = harness_with_store(settings(), vec![TabInfo::new(1, G1)], store.clone()).await;
    h.browser.reply(1, Reply::Matches(vec![post("g1", 1)]));

    h.orchestrator.on_timer().await;
    assert_eq!(h.transport.payloads().len(), 1);

    store.ledger_locked.store(true, Ordering::SeqCst);
    assert!(matches!(
        h.orchestrator.on_timer().await,
        ScanReport::Skipped { .. }
    ));
    assert!(matches!(
        h.orchestrator.manual_scan(1).await,
        ScanReport::Skipped { .. }
    ));
    assert_eq!(h.browser.scans(), vec![1]);
    assert!(!h.orchestrator.status().await.scanning);

    store.ledger_locked.store(false, Ordering::SeqCst);
    assert_eq!(h.ledger_len().await, 1);

    let report = h.orchestrator.on_timer().await;
    assert_eq!(report.summary().unwrap().fresh_matches, 0);
    assert_eq!(h.transport.payloads().len(), 1);
}

#[tokio::test]
async fn test_tab_listing_failure_skips_pass() {
    let h = harness(settings(), vec![TabInfo::new(1, G1)]).await;
    h.browser.query_fails.store(true, Ordering::SeqCst);

    assert_eq!(
        h.orchestrator.on_timer().await,
        ScanReport::Skipped {
            reason: "Could not list open tabs.".to_string()
        }
    );
    assert!(h.browser.scans().is_empty());

    let err = h.orchestrator.group_tab_count().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Browser(BrowserError::QueryFailed { .. })
    ));
}

#[tokio::test]
async fn test_manual_scan_of_unknown_tab_is_not_tracked() {
    let h = harness(settings(), vec![TabInfo::new(1, G1)]).await;
    h.orchestrator.on_timer().await;
    assert_eq!(h.orchestrator.status().await.tracked_tabs, 1);

    let report = h.orchestrator.manual_scan(999).await;

    assert_eq!(report.summary().unwrap().tabs_scanned, 1);
    assert_eq!(h.browser.scans(), vec![1, 999]);
    assert_eq!(h.orchestrator.status().await.tracked_tabs, 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_open_staggers_and_scans_on_load() {
    let settings = Settings {
        monitored_group_urls: vec![G1.to_string(), G2.to_string(), G3.to_string()],
        ..settings()
    };
    let h = harness(settings, vec![TabInfo::new(2, G2)]).await;

    let opened = h.orchestrator.open_group_tabs().await.unwrap();
    assert_eq!(opened, 2);

    let log = h.browser.opened.lock().unwrap().clone();
    assert_eq!(log[0].1, G1);
    assert_eq!(log[1].1, G3);
    assert_eq!(log[1].0 - log[0].0, Duration::from_millis(800));

    h.browser.reply(100, Reply::Matches(vec![post("g1", 1)]));
    let report = h.orchestrator.on_tab_loaded(100, G1).await.unwrap();
    assert_eq!(report.summary().unwrap().kind, ScanKind::AutoOpen);
    assert_eq!(h.browser.scans(), vec![100]);

    assert!(h.orchestrator.on_tab_loaded(100, G1).await.is_none());
    assert!(h.orchestrator.on_tab_loaded(2, G2).await.is_none());
}

#[tokio::test]
async fn test_group_tab_maintenance() {
    let h = harness(
        settings(),
        vec![
            TabInfo::new(1, G1),
            TabInfo::new(2, G2),
            TabInfo::new(3, "https://fb.test/marketplace"),
        ],
    )
    .await;

    assert_eq!(h.orchestrator.group_tab_count().await.unwrap(), 2);
    assert_eq!(h.orchestrator.refresh_group_tabs().await.unwrap(), 2);
    assert_eq!(*h.browser.reloaded.lock().unwrap(), vec![1, 2]);

    assert_eq!(h.orchestrator.close_group_tabs().await.unwrap(), 2);
    assert_eq!(*h.browser.closed.lock().unwrap(), vec![1, 2]);
    assert_eq!(h.orchestrator.group_tab_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_actions_dispatch_by_name() {
    let h = harness(settings(), vec![TabInfo::new(1, G1), TabInfo::new(2, G2)]).await;

    let reply = handle_message(&h.orchestrator, json!({ "action": "getGroupTabCount" })).await;
    assert!(reply.success);
    assert_eq!(reply.data, Some(json!(2)));

    let reply = handle_message(&h.orchestrator, json!({ "action": "testWebhook" })).await;
    assert!(reply.success);
    assert_eq!(h.transport.payloads()[0].source, "test");

    let reply = handle_message(
        &h.orchestrator,
        json!({ "action": "saveSettings", "settings": { "keywords": " rent ,rent, lease" } }),
    )
    .await;
    assert!(reply.success);
    let reply = handle_message(&h.orchestrator, json!({ "action": "getSettings" })).await;
    assert_eq!(reply.data.unwrap()["keywords"], json!(["rent", "lease"]));

    let reply = handle_message(&h.orchestrator, json!({ "action": "getScanStatus" })).await;
    assert_eq!(reply.data.unwrap()["scanning"], json!(false));

    let reply = handle_message(&h.orchestrator, json!({ "action": "explode" })).await;
    assert!(!reply.success);
}

#[tokio::test]
async fn test_save_settings_changes_only_given_keys() {
    let current = Settings {
        monitored_group_urls: vec![G1.to_string()],
        scan_interval_minutes: 5,
        notifications_enabled: false,
        ..Settings::default()
    };
    let h = harness(current, vec![TabInfo::new(1, G1), TabInfo::new(2, G2)]).await;

    let reply = handle_message(
        &h.orchestrator,
        json!({
            "action": "saveSettings",
            "settings": { "keywords": "wilmington", "webhookUrl": HOOK }
        }),
    )
    .await;
    assert!(reply.success);

    let saved = h.orchestrator.settings().load().await.unwrap();
    assert_eq!(saved.keywords, vec!["wilmington"]);
    assert_eq!(saved.webhook_url, HOOK);
    assert_eq!(saved.monitored_group_urls, vec![G1]);
    assert_eq!(saved.scan_interval_minutes, 5);
    assert!(!saved.notifications_enabled);

    h.orchestrator.on_timer().await;
    assert_eq!(h.browser.scans(), vec![1]);

    let reply = handle_message(
        &h.orchestrator,
        json!({ "action": "saveSettings", "settings": { "scanInterval": 1 } }),
    )
    .await;
    assert!(!reply.success);
    assert_eq!(h.orchestrator.settings().load().await.unwrap(), saved);
}

#[tokio::test(start_paused = true)]
async fn test_service_runs_periodic_passes() {
    let h = harness(settings(), vec![TabInfo::new(1, G1)]).await;
    let mut service = ScanService::new(h.orchestrator.clone());

    service.start();
    assert!(service.is_running());

    tokio::time::sleep(Duration::from_secs(2 * 60 + 1)).await;
    assert_eq!(h.browser.scans(), vec![1]);

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert_eq!(h.browser.scans(), vec![1, 1]);

    service.stop().await.unwrap();
    assert!(!service.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_disables_scheduler() {
    let disabled = Settings {
        scan_interval_minutes: 0,
        ..settings()
    };
    let h = harness(disabled, vec![TabInfo::new(1, G1)]).await;
    let mut service = ScanService::new(h.orchestrator.clone());

    service.start();
    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
    assert!(h.browser.scans().is_empty());

    service.stop().await.unwrap();
}
