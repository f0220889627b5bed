use schemars::schema_for;

use crate::json::types;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Route,
    Batch,
    Compare,
    Scenario,
    Deviation,
}

pub fn generate_json_schema(kind: RequestKind) -> Result<String, serde_json::Error> {
    let schema = match kind {
        RequestKind::Route => schema_for!(types::JsonRouteRequest),
        RequestKind::Batch => schema_for!(types::JsonBatchRequest),
        RequestKind::Compare => schema_for!(types::JsonCompareRequest),
        RequestKind::Scenario => schema_for!(types::JsonScenarioRequest),
        RequestKind::Deviation => schema_for!(types::JsonDeviationRequest),
    };

    serde_json::to_string_pretty(&schema)
}
