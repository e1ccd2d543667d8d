//! Out-of-band alerting on journal writes.
//!
//! [`AlertingJournal`] wraps any [`OperationJournal`]. After a successful
//! create or update it looks the event up in its rules and raises at most one
//! [`Alert`]. An `outcome_detail` rule takes precedence; only when none
//! matches are (`event_type`, `outcome`) rules consulted. The wrapped
//! journal's result is always returned unchanged, and a failing alert
//! service is only logged.

use std::sync::Arc;

use arkiv_core::{OperationId, StatusCode, TenantContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::{OperationEntry, OperationParameters};
use crate::error::{JournalError, JournalResult};
use crate::indexation::{IndexParameters, ReindexationResult};
use crate::journal::OperationJournal;

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Informational.
    Info,
    /// Needs attention.
    #[default]
    Warn,
    /// Needs action.
    Error,
}

/// One alerting rule.
///
/// A rule with `outcome_detail` matches on that code alone. Otherwise both
/// `event_type` and `outcome` must be set and must match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlertRule {
    /// Event type to match.
    #[serde(default)]
    pub event_type: Option<String>,
    /// Outcome to match together with `event_type`.
    #[serde(default)]
    pub outcome: Option<StatusCode>,
    /// Outcome detail code to match.
    #[serde(default)]
    pub outcome_detail: Option<String>,
    /// Severity of raised alerts.
    #[serde(default)]
    pub level: AlertLevel,
}

impl AlertRule {
    /// Rule matching an outcome detail code.
    #[must_use]
    pub fn on_outcome_detail(outcome_detail: impl Into<String>, level: AlertLevel) -> Self {
        Self {
            outcome_detail: Some(outcome_detail.into()),
            level,
            ..Self::default()
        }
    }

    /// Rule matching an event type and outcome.
    #[must_use]
    pub fn on_event_outcome(
        event_type: impl Into<String>,
        outcome: StatusCode,
        level: AlertLevel,
    ) -> Self {
        Self {
            event_type: Some(event_type.into()),
            outcome: Some(outcome),
            level,
            ..Self::default()
        }
    }

    fn matches_event_outcome(&self, params: &OperationParameters) -> bool {
        self.outcome_detail.is_none()
            && self.event_type.as_deref() == Some(params.event_type.as_str())
            && self.outcome == Some(params.outcome)
    }
}

/// An alert raised for a journal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Severity.
    pub level: AlertLevel,
    /// Tenant of the operation.
    pub tenant: u32,
    /// Operation the event belongs to.
    pub operation_id: OperationId,
    /// Event type.
    pub event_type: String,
    /// Event outcome.
    pub outcome: StatusCode,
    /// Event outcome detail.
    pub outcome_detail: String,
    /// Rendered message.
    pub message: String,
}

/// Destination of alerts.
pub trait AlertService: Send + Sync {
    /// Deliver an alert.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails.
    fn send(&self, alert: &Alert) -> JournalResult<()>;
}

/// [`AlertService`] writing alerts to the `arkiv::alert` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertService;

impl AlertService for LogAlertService {
    fn send(&self, alert: &Alert) -> JournalResult<()> {
        match alert.level {
            AlertLevel::Info => tracing::info!(
                target: "arkiv::alert",
                tenant = alert.tenant,
                operation_id = %alert.operation_id,
                "{}",
                alert.message
            ),
            AlertLevel::Warn => tracing::warn!(
                target: "arkiv::alert",
                tenant = alert.tenant,
                operation_id = %alert.operation_id,
                "{}",
                alert.message
            ),
            AlertLevel::Error => tracing::error!(
                target: "arkiv::alert",
                tenant = alert.tenant,
                operation_id = %alert.operation_id,
                "{}",
                alert.message
            ),
        }
        Ok(())
    }
}

/// Alerting decorator around an [`OperationJournal`].
pub struct AlertingJournal<J> {
    inner: J,
    alerts: Arc<dyn AlertService>,
    rules: Vec<AlertRule>,
}

impl<J> std::fmt::Debug for AlertingJournal<J> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertingJournal")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl<J: OperationJournal> AlertingJournal<J> {
    /// Wrap a journal.
    pub fn new(inner: J, alerts: Arc<dyn AlertService>, rules: Vec<AlertRule>) -> Self {
        Self {
            inner,
            alerts,
            rules,
        }
    }

    /// The wrapped journal.
    pub fn inner(&self) -> &J {
        &self.inner
    }

    /// The rule an event triggers, if any.
    #[must_use]
    pub fn matching_rule(&self, params: &OperationParameters) -> Option<&AlertRule> {
        let detail = params.outcome_detail();
        self.rules
            .iter()
            .find(|rule| rule.outcome_detail.as_deref() == Some(detail.as_str()))
            .or_else(|| self.rules.iter().find(|rule| rule.matches_event_outcome(params)))
    }

    fn raise(&self, ctx: &TenantContext, params: &OperationParameters) {
        let Some(rule) = self.matching_rule(params) else {
            return;
        };
        let outcome_detail = params.outcome_detail();
        let alert = Alert {
            level: rule.level,
            tenant: ctx.tenant_id(),
            operation_id: params.operation_id,
            event_type: params.event_type.clone(),
            outcome: params.outcome,
            outcome_detail: outcome_detail.clone(),
            message: format!(
                "{} {} ({}): {} [operation {}, tenant {}]",
                params.event_type,
                params.outcome,
                outcome_detail,
                params.message,
                params.operation_id,
                ctx.tenant_id()
            ),
        };
        if let Err(e) = self.alerts.send(&alert) {
            tracing::error!(operation_id = %params.operation_id, error = %e, "Failed to deliver alert");
        }
    }

    fn raise_applied(
        &self,
        ctx: &TenantContext,
        items: &[OperationParameters],
        result: &JournalResult<()>,
    ) {
        let applied = match result {
            Ok(()) => items.len(),
            Err(JournalError::Bulk { applied, .. }) => *applied,
            Err(_) => 0,
        };
        for item in items.iter().take(applied) {
            self.raise(ctx, item);
        }
    }
}

impl<J: OperationJournal> OperationJournal for AlertingJournal<J> {
    fn create(&self, ctx: &TenantContext, params: &OperationParameters) -> JournalResult<()> {
        let result = self.inner.create(ctx, params);
        if result.is_ok() {
            self.raise(ctx, params);
        }
        result
    }

    fn update(&self, ctx: &TenantContext, params: &OperationParameters) -> JournalResult<()> {
        let result = self.inner.update(ctx, params);
        if result.is_ok() {
            self.raise(ctx, params);
        }
        result
    }

    fn create_bulk(
        &self,
        ctx: &TenantContext,
        items: &[OperationParameters],
    ) -> JournalResult<()> {
        let result = self.inner.create_bulk(ctx, items);
        self.raise_applied(ctx, items, &result);
        result
    }

    fn update_bulk(
        &self,
        ctx: &TenantContext,
        items: &[OperationParameters],
    ) -> JournalResult<()> {
        let result = self.inner.update_bulk(ctx, items);
        self.raise_applied(ctx, items, &result);
        result
    }

    fn select(&self, ctx: &TenantContext, query: &Value) -> JournalResult<Vec<Value>> {
        self.inner.select(ctx, query)
    }

    fn get_by_id(&self, ctx: &TenantContext, id: OperationId) -> JournalResult<OperationEntry> {
        self.inner.get_by_id(ctx, id)
    }

    fn reindex(&self, params: &IndexParameters) -> ReindexationResult {
        self.inner.reindex(params)
    }

    fn switch_index(&self, alias: &str, new_index: &str) -> JournalResult<()> {
        self.inner.switch_index(alias, new_index)
    }
}
