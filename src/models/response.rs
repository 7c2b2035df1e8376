use serde::{Deserialize, Serialize};

use super::{ActionRecord, Analysis, CompactContext, PredictionSet};

/// Everything one `handle` call produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    pub session_id: String,
    pub analysis: Analysis,
    pub compact_context: CompactContext,
    pub predictions: PredictionSet,
    pub action_records: Vec<ActionRecord>,
}
