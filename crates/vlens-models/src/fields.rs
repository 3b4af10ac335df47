//! Table column names and cell decoding.
//!
//! Cells come back from the table store as loosely typed JSON: a text
//! column may be a plain string or a list of rich-text segments, a link
//! column may carry `record_id`, `record_ids` or `link_record_ids`. The
//! helpers here flatten those shapes into plain Rust values.

use serde_json::{Map, Value};

/// Field map of a single table record.
pub type FieldMap = Map<String, Value>;

/// Columns of the task table.
pub mod task {
    pub const STATUS: &str = "分析状态";
    pub const VIDEO_ATTACHMENT: &str = "上传视频";
    pub const VIDEO_URL: &str = "视频链接";
    pub const PERSONAS: &str = "分析视角 (多选)";
}

/// Columns of the persona table.
pub mod persona {
    pub const DESCRIPTION: &str = "AI提示词描述";
}

/// Columns of the result table.
pub mod result {
    pub const TASK: &str = "关联任务";
    pub const PERSONA: &str = "分析视角";
    pub const TIMESTAMP_ANALYSIS: &str = "时间点分析";
    pub const OVERALL_SUMMARY: &str = "综合评价与建议";
}

/// Decode a text cell.
///
/// Accepts a plain string or an array of rich-text segments. Empty text
/// is treated as absent; whitespace is kept as written.
pub fn text_value(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.clone(),
        Value::Array(segments) => segments
            .iter()
            .filter_map(|seg| match seg {
                Value::String(s) => Some(s.as_str()),
                Value::Object(obj) => obj.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect::<String>(),
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Decode a URL cell (plain string or `{link, text}` object).
pub fn url_value(value: Option<&Value>) -> Option<String> {
    let url = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Object(obj) => obj
            .get("link")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())?,
        _ => return None,
    };

    (!url.is_empty()).then_some(url)
}

/// File token of the first attachment in an attachment cell.
pub fn first_file_token(value: Option<&Value>) -> Option<String> {
    value?
        .as_array()?
        .first()?
        .get("file_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Linked record ids of a link cell, in cell order.
pub fn linked_record_ids(value: Option<&Value>) -> Vec<String> {
    let mut ids = Vec::new();
    match value {
        Some(Value::Array(items)) => {
            for item in items {
                collect_ids(item, &mut ids);
            }
        }
        Some(item) if item.is_object() => collect_ids(item, &mut ids),
        _ => {}
    }
    ids
}

fn collect_ids(item: &Value, ids: &mut Vec<String>) {
    match item {
        Value::String(id) if !id.is_empty() => ids.push(id.clone()),
        Value::Object(obj) => {
            if let Some(id) = obj.get("record_id").and_then(Value::as_str) {
                if !id.is_empty() {
                    ids.push(id.to_string());
                }
            }
            for key in ["record_ids", "link_record_ids"] {
                if let Some(list) = obj.get(key).and_then(Value::as_array) {
                    ids.extend(
                        list.iter()
                            .filter_map(Value::as_str)
                            .filter(|id| !id.is_empty())
                            .map(str::to_string),
                    );
                }
            }
        }
        _ => {}
    }
}

/// Link cell payload for writing a single linked record.
pub fn link_to(record_id: &str) -> Value {
    serde_json::json!([{ "record_id": record_id }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_value_shapes() {
        assert_eq!(text_value(Some(&json!("hello"))), Some("hello".into()));
        assert_eq!(
            text_value(Some(&json!([{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]))),
            Some("ab".into())
        );
        assert_eq!(text_value(Some(&json!(""))), None);
        assert_eq!(text_value(Some(&json!("   "))), Some("   ".into()));
        assert_eq!(text_value(Some(&json!([]))), None);
        assert_eq!(text_value(Some(&json!(42))), None);
        assert_eq!(text_value(None), None);
    }

    #[test]
    fn test_url_value_shapes() {
        assert_eq!(
            url_value(Some(&json!("https://cdn.test/v.mp4"))),
            Some("https://cdn.test/v.mp4".into())
        );
        assert_eq!(
            url_value(Some(&json!({"link": "https://cdn.test/v.mp4", "text": "video"}))),
            Some("https://cdn.test/v.mp4".into())
        );
        assert_eq!(url_value(Some(&json!(""))), None);
        assert_eq!(url_value(Some(&json!({"text": "no link"}))), None);
    }

    #[test]
    fn test_first_file_token() {
        let cell = json!([
            {"file_token": "boxA", "name": "a.mp4"},
            {"file_token": "boxB", "name": "b.mp4"}
        ]);
        assert_eq!(first_file_token(Some(&cell)), Some("boxA".into()));
        assert_eq!(first_file_token(Some(&json!([]))), None);
        assert_eq!(first_file_token(Some(&json!([{"name": "x"}]))), None);
    }

    #[test]
    fn test_linked_record_ids_shapes() {
        let per_item = json!([{"record_id": "rec1"}, {"record_id": "rec2"}]);
        assert_eq!(linked_record_ids(Some(&per_item)), vec!["rec1", "rec2"]);

        let grouped = json!([{"record_ids": ["rec1", "rec2"], "table_id": "tbl"}]);
        assert_eq!(linked_record_ids(Some(&grouped)), vec!["rec1", "rec2"]);

        let object = json!({"link_record_ids": ["rec3"]});
        assert_eq!(linked_record_ids(Some(&object)), vec!["rec3"]);

        let plain = json!(["rec4", ""]);
        assert_eq!(linked_record_ids(Some(&plain)), vec!["rec4"]);

        assert!(linked_record_ids(None).is_empty());
        assert!(linked_record_ids(Some(&json!(null))).is_empty());
    }

    #[test]
    fn test_link_to() {
        assert_eq!(link_to("rec9"), json!([{"record_id": "rec9"}]));
    }
}
