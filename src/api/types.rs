//! Shared types for the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_state::CoreState;
use crate::models::enums::LanguagePreference;
use crate::models::Report;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Report bodies, shared by the interview and stateless routes
// ═══════════════════════════════════════════════════════════

/// Options accepted when generating a report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOptions {
    #[serde(default)]
    pub language_preference: LanguagePreference,
    /// Archive the report together with the patient details.
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub report: Report,
    /// Archive id when the report was saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<Uuid>,
}
