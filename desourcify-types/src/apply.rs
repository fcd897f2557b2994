use crate::tool::ToolInfo;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of replacing selected checkouts with binary packages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub schema: String,
    pub tool: ToolInfo,

    /// The scan this apply acted on.
    pub scan_id: String,

    pub dry_run: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub results: Vec<CheckoutApplyResult>,

    pub summary: ApplySummary,

    /// Packages handed to the build-tool clean step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleaned_packages: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_error: Option<String>,
}

impl ApplyReport {
    pub fn new(tool: ToolInfo, scan_id: String, dry_run: bool) -> Self {
        Self {
            schema: crate::schema::DESOURCIFY_APPLY_V1.to_string(),
            tool,
            scan_id,
            dry_run,
            started_at: None,
            ended_at: None,
            results: vec![],
            summary: ApplySummary::default(),
            cleaned_packages: vec![],
            clean_error: None,
        }
    }

    /// Record a result and bump the matching summary counter.
    pub fn push(&mut self, result: CheckoutApplyResult) {
        match result.status {
            ApplyStatus::Reconciled => self.summary.reconciled += 1,
            ApplyStatus::Skipped => self.summary.skipped += 1,
            ApplyStatus::Failed => self.summary.failed += 1,
        }
        self.summary.selected += 1;
        self.results.push(result);
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0 || self.clean_error.is_some()
    }

    pub fn reconciled(&self) -> impl Iterator<Item = &CheckoutApplyResult> {
        self.results
            .iter()
            .filter(|r| r.status == ApplyStatus::Reconciled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutApplyResult {
    pub path: Utf8PathBuf,
    pub status: ApplyStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Binary packages installed for this checkout.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installed: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_installs: Vec<String>,

    #[serde(default)]
    pub manifest_entry_removed: bool,

    #[serde(default)]
    pub sources_deleted: bool,
}

impl CheckoutApplyResult {
    pub fn new(path: Utf8PathBuf, status: ApplyStatus) -> Self {
        Self {
            path,
            status,
            message: None,
            installed: vec![],
            failed_installs: vec![],
            manifest_entry_removed: false,
            sources_deleted: false,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Reconciled,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub selected: u64,
    pub reconciled: u64,
    pub skipped: u64,
    pub failed: u64,
}
