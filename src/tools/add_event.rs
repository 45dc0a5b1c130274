//! `add_event` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `add_event` tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddEventParams {
    /// Description of the event that occurred (the effect).
    #[schemars(
        description = "Description of the event that occurred (the effect). Should be a clear, concise statement from the agent's perspective. The system will analyze this against recent events to detect causal relationships."
    )]
    pub effect: String,
}
