use crate::browser::TabInfo;
use alert_core::pages::{is_monitored, SitePattern};
use alert_core::TabId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug)]
struct TabEntry {
    url: String,
    /// Matches the site's group-page pattern.
    group_page: bool,
    /// Group page that also passes the monitored-group allow-list.
    eligible: bool,
    /// Opened by auto-open and waiting for its first load.
    pending_scan: bool,
    cancel: Arc<Notify>,
}

impl TabEntry {
    fn new(url: String) -> Self {
        Self {
            url,
            group_page: false,
            eligible: false,
            pending_scan: false,
            cancel: Arc::new(Notify::new()),
        }
    }

    fn classify(&mut self, site: &SitePattern, monitored: &[&str]) {
        self.group_page = site.is_group_page(&self.url);
        self.eligible = self.group_page && is_monitored(&self.url, monitored);
    }
}

/// Known tabs and their scan eligibility, keyed by tab id.
///
/// Each entry carries a cancel handle; removing the entry fires it so a scan
/// in flight for that tab stops waiting.
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: BTreeMap<TabId, TabEntry>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registry's view with `tabs`, keeping per-tab state for
    /// tabs that are still open.
    pub fn sync(&mut self, tabs: &[TabInfo], site: &SitePattern, monitored: &[&str]) {
        let open: BTreeMap<TabId, &str> = tabs.iter().map(|t| (t.id, t.url.as_str())).collect();

        let closed: Vec<TabId> = self
            .tabs
            .keys()
            .filter(|id| !open.contains_key(id))
            .copied()
            .collect();
        for tab_id in closed {
            self.remove(tab_id);
        }

        for (tab_id, url) in open {
            self.update(tab_id, url, site, monitored);
        }
    }

    /// Records a new URL for `tab_id`. A tab that stops being eligible has
    /// its pending scan cancelled.
    pub fn update(&mut self, tab_id: TabId, url: &str, site: &SitePattern, monitored: &[&str]) {
        let entry = self
            .tabs
            .entry(tab_id)
            .or_insert_with(|| TabEntry::new(url.to_string()));
        let was_eligible = entry.eligible;
        entry.url = url.to_string();
        entry.classify(site, monitored);

        if was_eligible && !entry.eligible {
            debug!("Tab {} is no longer eligible ({})", tab_id, url);
            entry.cancel.notify_one();
            entry.cancel = Arc::new(Notify::new());
        }
    }

    /// Forgets `tab_id` and cancels any scan waiting on it.
    pub fn remove(&mut self, tab_id: TabId) -> bool {
        match self.tabs.remove(&tab_id) {
            Some(entry) => {
                entry.cancel.notify_one();
                debug!("Tab {} removed from registry", tab_id);
                true
            }
            None => false,
        }
    }

    /// Cancel handle for `tab_id`. Unknown tabs get a detached handle that
    /// never fires; the registry is not changed.
    pub fn cancel_handle(&self, tab_id: TabId) -> Arc<Notify> {
        self.tabs
            .get(&tab_id)
            .map(|entry| entry.cancel.clone())
            .unwrap_or_else(|| Arc::new(Notify::new()))
    }

    pub fn mark_pending(&mut self, tab_id: TabId, url: &str) {
        let entry = self
            .tabs
            .entry(tab_id)
            .or_insert_with(|| TabEntry::new(url.to_string()));
        entry.pending_scan = true;
    }

    /// Clears the pending flag, returning whether it was set.
    pub fn take_pending(&mut self, tab_id: TabId) -> bool {
        self.tabs
            .get_mut(&tab_id)
            .map(|entry| std::mem::take(&mut entry.pending_scan))
            .unwrap_or(false)
    }

    /// Eligible tabs in id order.
    pub fn eligible(&self) -> Vec<TabId> {
        self.tabs
            .iter()
            .filter(|(_, e)| e.eligible)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn url(&self, tab_id: TabId) -> Option<&str> {
        self.tabs.get(&tab_id).map(|e| e.url.as_str())
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.contains_key(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
