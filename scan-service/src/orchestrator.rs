//! Scan orchestration: which tabs to scan, when, and what to do with the
//! fresh matches.

use crate::browser::{BrowserHost, ScanOutcome, TabInfo};
use crate::notifier::{match_summary, Notifier, NOTIFICATION_TITLE};
use crate::registry::TabRegistry;
use crate::session::{ScanGate, ScanKind, ScanSession, SessionInfo};
use alert_core::pages::{url_has_prefix, SitePattern};
use alert_core::{
    now_millis, AppConfig, BrowserError, CoreError, ErrorExt, MatchRecord, ScanRequest, Settings,
    TabId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use storage::{KeyValueStore, LedgerRepository, SettingsRepository};
use tokio::sync::RwLock;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;
use webhook_client::{WebhookSink, WebhookTarget};

/// Counters for one scan session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    pub session_id: Uuid,
    pub kind: ScanKind,
    pub tabs_scanned: usize,
    pub tabs_failed: usize,
    pub tabs_cancelled: usize,
    pub matches_found: usize,
    pub fresh_matches: usize,
    pub webhook_failures: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassSummary {
    fn start(info: &SessionInfo) -> Self {
        Self {
            session_id: info.id,
            kind: info.kind,
            tabs_scanned: 0,
            tabs_failed: 0,
            tabs_cancelled: 0,
            matches_found: 0,
            fresh_matches: 0,
            webhook_failures: 0,
            started_at: info.started_at,
            finished_at: info.started_at,
        }
    }
}

/// What a scan trigger ended up doing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ScanReport {
    /// Another session held the gate.
    Busy,
    /// Nothing was scanned; `reason` is meant for the UI.
    Skipped { reason: String },
    Completed(PassSummary),
}

impl ScanReport {
    pub fn summary(&self) -> Option<&PassSummary> {
        match self {
            ScanReport::Completed(summary) => Some(summary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatus {
    pub scanning: bool,
    pub session: Option<SessionInfo>,
    pub last_report: Option<ScanReport>,
    pub tracked_tabs: usize,
}

pub struct ScanOrchestrator {
    browser: Arc<dyn BrowserHost>,
    settings: SettingsRepository,
    ledger: LedgerRepository,
    webhook: WebhookSink,
    notifier: Arc<dyn Notifier>,
    config: AppConfig,
    site: SitePattern,
    gate: ScanGate,
    registry: RwLock<TabRegistry>,
    last_report: RwLock<Option<ScanReport>>,
}

impl ScanOrchestrator {
    pub fn new(
        browser: Arc<dyn BrowserHost>,
        store: Arc<dyn KeyValueStore>,
        webhook: WebhookSink,
        notifier: Arc<dyn Notifier>,
        config: AppConfig,
    ) -> Self {
        let site = config.site_pattern();
        Self {
            browser,
            settings: SettingsRepository::new(store.clone()),
            ledger: LedgerRepository::new(store),
            webhook,
            notifier,
            config,
            site,
            gate: ScanGate::new(),
            registry: RwLock::new(TabRegistry::new()),
            last_report: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &SettingsRepository {
        &self.settings
    }

    pub fn ledger(&self) -> &LedgerRepository {
        &self.ledger
    }

    pub fn gate(&self) -> &ScanGate {
        &self.gate
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Scheduler tick. A no-op while any other session holds the gate.
    pub async fn on_timer(&self) -> ScanReport {
        self.scan_all(ScanKind::Periodic).await
    }

    /// Full pass over eligible tabs, skipped (not queued) when busy.
    pub async fn scan_all(&self, kind: ScanKind) -> ScanReport {
        let Some(session) = self.gate.try_begin(kind) else {
            info!("Scan already in progress, skipping {} pass", kind);
            return ScanReport::Busy;
        };

        let report = match self.load_scan_settings().await {
            Ok(settings) => match self.refresh_registry(&settings).await {
                Ok(()) => {
                    let targets = self.registry.read().await.eligible();
                    debug!("{} eligible tab(s) for {} pass", targets.len(), kind);
                    self.run_pass(&session, &settings, targets).await
                }
                Err(e) => skipped(e),
            },
            Err(report) => report,
        };

        self.remember(&report).await;
        report
    }

    /// Scans exactly one tab, ignoring eligibility. Waits for a running
    /// session to finish, bounded by the scan timeout.
    pub async fn manual_scan(&self, tab_id: TabId) -> ScanReport {
        self.scan_single(tab_id, ScanKind::Tab).await
    }

    /// Browser reported `tab_id` finished loading `url`.
    ///
    /// Returns the scan report when the tab was opened by auto-open and
    /// still owed its first scan.
    pub async fn on_tab_loaded(&self, tab_id: TabId, url: &str) -> Option<ScanReport> {
        let settings = self.settings.load().await.unwrap_or_else(|e| {
            e.log_warn();
            Settings::default()
        });
        let pending = {
            let mut registry = self.registry.write().await;
            registry.update(tab_id, url, &self.site, &settings.monitored_groups());
            registry.take_pending(tab_id)
        };

        if !pending {
            return None;
        }
        info!("Auto-opened tab {} loaded, scanning", tab_id);
        Some(self.scan_single(tab_id, ScanKind::AutoOpen).await)
    }

    /// Browser reported `tab_id` closed. Cancels its scan if one is waiting.
    pub async fn on_tab_removed(&self, tab_id: TabId) {
        self.registry.write().await.remove(tab_id);
    }

    /// Stops the running session after its current tab.
    pub fn cancel_scan(&self) -> bool {
        self.gate.cancel_current()
    }

    /// Opens a background tab for each monitored group not already open,
    /// one at a time with a fixed stagger. Returns how many were opened.
    pub async fn open_group_tabs(&self) -> Result<usize, CoreError> {
        let settings = self.settings.load().await?;
        let monitored = settings.monitored_groups();
        if monitored.is_empty() {
            info!("No monitored groups configured, nothing to open");
            return Ok(0);
        }

        let tabs = self.query_tabs().await?;
        let mut opened = 0;

        for url in monitored {
            if tabs.iter().any(|t| url_has_prefix(&t.url, url)) {
                debug!("Group already open: {}", url);
                continue;
            }
            if opened > 0 {
                sleep(self.config.open_stagger()).await;
            }
            match self.browser.open_tab(url).await {
                Ok(tab_id) => {
                    self.registry.write().await.mark_pending(tab_id, url);
                    debug!("Opened tab {} for {}", tab_id, url);
                    opened += 1;
                }
                Err(e) => {
                    BrowserError::OpenFailed {
                        url: url.to_string(),
                        reason: e.to_string(),
                    }
                    .log_warn();
                }
            }
        }

        info!("Opened {} group tab(s)", opened);
        Ok(opened)
    }

    /// Closes every eligible group tab.
    pub async fn close_group_tabs(&self) -> Result<usize, CoreError> {
        let targets = self.current_group_tabs().await?;
        let mut closed = 0;
        for tab in targets {
            match self.browser.close_tab(tab.id).await {
                Ok(()) => {
                    self.registry.write().await.remove(tab.id);
                    closed += 1;
                }
                Err(e) => {
                    e.log_warn();
                }
            }
        }
        info!("Closed {} group tab(s)", closed);
        Ok(closed)
    }

    /// Reloads every eligible group tab.
    pub async fn refresh_group_tabs(&self) -> Result<usize, CoreError> {
        let targets = self.current_group_tabs().await?;
        let mut reloaded = 0;
        for tab in targets {
            match self.browser.reload_tab(tab.id).await {
                Ok(()) => reloaded += 1,
                Err(e) => {
                    e.log_warn();
                }
            }
        }
        info!("Reloaded {} group tab(s)", reloaded);
        Ok(reloaded)
    }

    pub async fn group_tab_count(&self) -> Result<usize, CoreError> {
        Ok(self.current_group_tabs().await?.len())
    }

    pub async fn status(&self) -> ScanStatus {
        ScanStatus {
            scanning: self.gate.is_busy(),
            session: self.gate.current(),
            last_report: self.last_report.read().await.clone(),
            tracked_tabs: self.registry.read().await.len(),
        }
    }

    /// Sends the sample match to the configured webhook.
    pub async fn test_webhook(&self) -> Result<(), CoreError> {
        let settings = self.settings.load().await?;
        self.webhook
            .send_test(&WebhookTarget::from_settings(&settings))
            .await
    }

    async fn scan_single(&self, tab_id: TabId, kind: ScanKind) -> ScanReport {
        let session = match self.gate.begin(kind, self.config.scan_timeout()).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Could not start {} scan of tab {}: {}", kind, tab_id, e);
                return ScanReport::Busy;
            }
        };

        let report = match self.load_scan_settings().await {
            Ok(settings) => self.run_pass(&session, &settings, vec![tab_id]).await,
            Err(report) => report,
        };

        self.remember(&report).await;
        report
    }

    /// Loads settings and checks they are usable for scanning. Problems are
    /// logged and turned into a `Skipped` report.
    async fn load_scan_settings(&self) -> Result<Settings, ScanReport> {
        let settings = match self.settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                e.log_error();
                return Err(ScanReport::Skipped {
                    reason: e.user_friendly_message(),
                });
            }
        };

        if let Err(e) = settings.validate_for_scan() {
            let e = CoreError::from(e);
            info!("Scan skipped: {}", e);
            return Err(ScanReport::Skipped {
                reason: e.user_friendly_message(),
            });
        }
        Ok(settings)
    }

    /// Host tab listing; failures that are not already browser errors
    /// become `QueryFailed`.
    async fn query_tabs(&self) -> Result<Vec<TabInfo>, CoreError> {
        self.browser.query_tabs().await.map_err(|e| match e {
            e @ CoreError::Browser(_) => e,
            other => BrowserError::QueryFailed {
                reason: other.to_string(),
            }
            .into(),
        })
    }

    async fn refresh_registry(&self, settings: &Settings) -> Result<(), CoreError> {
        let tabs = self.query_tabs().await?;
        self.registry
            .write()
            .await
            .sync(&tabs, &self.site, &settings.monitored_groups());
        Ok(())
    }

    async fn current_group_tabs(&self) -> Result<Vec<TabInfo>, CoreError> {
        let settings = self.settings.load().await?;
        let monitored = settings.monitored_groups();
        let tabs = self.query_tabs().await?;
        self.registry
            .write()
            .await
            .sync(&tabs, &self.site, &monitored);

        let eligible = self.registry.read().await.eligible();
        Ok(tabs.into_iter().filter(|t| eligible.contains(&t.id)).collect())
    }

    /// Scans `targets` one after another, loading the ledger before the
    /// first tab and writing it back after the last. A ledger that cannot be
    /// read skips the pass and is left untouched in the store.
    async fn run_pass(
        &self,
        session: &ScanSession,
        settings: &Settings,
        targets: Vec<TabId>,
    ) -> ScanReport {
        let mut ledger = match self.ledger.load(now_millis()).await {
            Ok(ledger) => ledger,
            Err(e) => return skipped(e),
        };
        let mut summary = PassSummary::start(session.info());
        let request = ScanRequest::from_settings(settings);
        let target = WebhookTarget::from_settings(settings);

        for tab_id in targets {
            if session.is_cancelled() {
                info!("Scan session {} cancelled, stopping pass", session.id());
                break;
            }

            let outcome = self.scan_tab(session, tab_id, &request).await;
            debug!("Tab {} scan {}", tab_id, outcome.label());

            match outcome {
                ScanOutcome::Matches(records) => {
                    summary.tabs_scanned += 1;
                    summary.matches_found += records.len();
                    let fresh = ledger.filter_fresh(records, now_millis());
                    if fresh.is_empty() {
                        continue;
                    }
                    summary.fresh_matches += fresh.len();
                    if !self.dispatch(&target, settings, fresh).await {
                        summary.webhook_failures += 1;
                    }
                }
                ScanOutcome::Empty => summary.tabs_scanned += 1,
                ScanOutcome::Failed(error) => {
                    error.log_warn();
                    summary.tabs_failed += 1;
                }
                ScanOutcome::TimedOut => {
                    warn!(
                        "Scan of tab {} timed out after {}s",
                        tab_id, self.config.scan_timeout_secs
                    );
                    summary.tabs_failed += 1;
                }
                ScanOutcome::Cancelled => summary.tabs_cancelled += 1,
            }
        }

        if let Err(e) = self.ledger.save(&mut ledger, now_millis()).await {
            e.log_error();
        }

        summary.finished_at = Utc::now();
        info!(
            "Scan pass {} done: {} scanned, {} failed, {} fresh of {} match(es)",
            summary.session_id,
            summary.tabs_scanned,
            summary.tabs_failed,
            summary.fresh_matches,
            summary.matches_found
        );
        ScanReport::Completed(summary)
    }

    /// One bounded request/response with the page scanner in `tab_id`.
    async fn scan_tab(
        &self,
        session: &ScanSession,
        tab_id: TabId,
        request: &ScanRequest,
    ) -> ScanOutcome {
        let tab_closed = self.registry.read().await.cancel_handle(tab_id);

        tokio::select! {
            _ = session.cancelled() => ScanOutcome::Cancelled,
            _ = tab_closed.notified() => ScanOutcome::Cancelled,
            result = timeout(self.config.scan_timeout(), self.browser.send_scan(tab_id, request)) => {
                match result {
                    Ok(Ok(response)) => ScanOutcome::from_response(tab_id, response),
                    Ok(Err(e)) => ScanOutcome::from_error(tab_id, e),
                    Err(_) => ScanOutcome::TimedOut,
                }
            }
        }
    }

    /// Notification first, then the webhook. Matches stay recorded in the
    /// ledger whatever the webhook outcome.
    async fn dispatch(
        &self,
        target: &WebhookTarget,
        settings: &Settings,
        fresh: Vec<MatchRecord>,
    ) -> bool {
        if settings.notifications_enabled {
            if let Err(e) = self
                .notifier
                .notify(NOTIFICATION_TITLE, &match_summary(fresh.len()))
                .await
            {
                e.log_warn();
            }
        }

        self.webhook
            .send(target, fresh, &self.config.webhook_source)
            .await
    }

    async fn remember(&self, report: &ScanReport) {
        *self.last_report.write().await = Some(report.clone());
    }
}

fn skipped(error: CoreError) -> ScanReport {
    error.log_warn();
    ScanReport::Skipped {
        reason: error.user_friendly_message(),
    }
}
