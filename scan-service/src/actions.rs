//! Named actions sent by the popup and options pages.

use crate::orchestrator::ScanOrchestrator;
use crate::session::ScanKind;
use alert_core::{CoreError, ErrorExt, TabId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    GetSettings,
    /// Only the keys present in `settings` are changed.
    SaveSettings {
        settings: Map<String, Value>,
    },
    Scan,
    #[serde(rename_all = "camelCase")]
    ManualScan {
        tab_id: TabId,
    },
    GetScanStatus,
    CancelScan,
    OpenGroupTabs,
    CloseGroupTabs,
    RefreshGroupTabs,
    GetGroupTabCount,
    TestWebhook,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionReply {
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                success: true,
                data: Some(value),
                error: None,
            },
            Err(e) => Self::failed(&CoreError::from(e)),
        }
    }

    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failed(error: &CoreError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.user_friendly_message()),
        }
    }

    fn from_result<T: Serialize>(result: Result<T, CoreError>) -> Self {
        match result {
            Ok(data) => Self::ok(&data),
            Err(e) => {
                e.log_warn();
                Self::failed(&e)
            }
        }
    }
}

/// Parses a raw message and runs it.
pub async fn handle_message(orchestrator: &ScanOrchestrator, message: Value) -> ActionReply {
    match serde_json::from_value::<Action>(message) {
        Ok(action) => handle_action(orchestrator, action).await,
        Err(e) => ActionReply::failed(&CoreError::InvalidInput {
            message: format!("unrecognized action: {}", e),
        }),
    }
}

pub async fn handle_action(orchestrator: &ScanOrchestrator, action: Action) -> ActionReply {
    debug!("Handling action {:?}", action);
    match action {
        Action::GetSettings => ActionReply::from_result(orchestrator.settings().load().await),
        Action::SaveSettings { settings } => {
            ActionReply::from_result(orchestrator.settings().update(&settings).await)
        }
        Action::Scan => ActionReply::ok(&orchestrator.scan_all(ScanKind::Requested).await),
        Action::ManualScan { tab_id } => ActionReply::ok(&orchestrator.manual_scan(tab_id).await),
        Action::GetScanStatus => ActionReply::ok(&orchestrator.status().await),
        Action::CancelScan => ActionReply::ok(&orchestrator.cancel_scan()),
        Action::OpenGroupTabs => ActionReply::from_result(orchestrator.open_group_tabs().await),
        Action::CloseGroupTabs => ActionReply::from_result(orchestrator.close_group_tabs().await),
        Action::RefreshGroupTabs => {
            ActionReply::from_result(orchestrator.refresh_group_tabs().await)
        }
        Action::GetGroupTabCount => ActionReply::from_result(orchestrator.group_tab_count().await),
        Action::TestWebhook => match orchestrator.test_webhook().await {
            Ok(()) => ActionReply::done(),
            Err(e) => {
                e.log_warn();
                ActionReply::failed(&e)
            }
        },
    }
}
