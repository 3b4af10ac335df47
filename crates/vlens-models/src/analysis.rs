//! Model output and result records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::{self, FieldMap};

/// The JSON object the model is asked to return.
///
/// Both fields are lenient: a string is taken as-is, an array of strings
/// is joined line by line, any other value is kept as compact JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp_analysis: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub overall_summary: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Array(items) if items.iter().all(Value::is_string) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => Some(other.to_string()),
    })
}

/// One persona's analysis of one task, as written to the result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub task_id: String,
    pub persona_id: String,
    pub timestamp_analysis: Option<String>,
    pub overall_summary: Option<String>,
}

impl ResultRecord {
    pub fn new(
        task_id: impl Into<String>,
        persona_id: impl Into<String>,
        output: AnalysisOutput,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            persona_id: persona_id.into(),
            timestamp_analysis: output.timestamp_analysis,
            overall_summary: output.overall_summary,
        }
    }

    /// Create payload for the result table. Absent texts are omitted.
    pub fn to_fields(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(fields::result::TASK.into(), fields::link_to(&self.task_id));
        map.insert(fields::result::PERSONA.into(), fields::link_to(&self.persona_id));
        if let Some(text) = &self.timestamp_analysis {
            map.insert(fields::result::TIMESTAMP_ANALYSIS.into(), text.clone().into());
        }
        if let Some(text) = &self.overall_summary {
            map.insert(fields::result::OVERALL_SUMMARY.into(), text.clone().into());
        }
        map
    }
}
