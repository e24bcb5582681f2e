//! Typed views of the service's JSON payloads
//!
//! Responses are kept as `serde_json::Value` for the report; these types are
//! used to validate their shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Column schema of an online form task
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Schema {
    #[serde(deserialize_with = "loose_string")]
    pub title: String,
    pub columns: Vec<Column>,
    #[serde(rename = "allowAttachmentUpload", default, deserialize_with = "loose_bool")]
    pub allow_attachment_upload: bool,
}

/// A single form column
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Column {
    #[serde(deserialize_with = "loose_string")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "loose_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "loose_bool")]
    pub required: bool,
}

/// Attachment published with an online form task
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AttachmentInfo {
    pub id: Value,
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "fileSize", default)]
    pub file_size: Option<u64>,
}

impl AttachmentInfo {
    /// The id as it appears in the download URL
    pub fn id_segment(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// File name to save the download under
    ///
    /// Only the last path segment of the served name is kept, so the file
    /// always lands directly inside the download directory.
    pub fn save_name(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(plain_file_name)
            .or_else(|| plain_file_name(&format!("attachment_{}", self.id_segment())))
            .unwrap_or_else(|| "attachment".to_string())
    }
}

/// Last segment of `name` split on either separator, unless it is empty or
/// a relative component
fn plain_file_name(name: &str) -> Option<String> {
    name.rsplit(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .map(str::to_string)
}

/// Envelope of the attachment list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentList {
    pub attachments: Vec<AttachmentInfo>,
}

/// Task kind as reported by `taskType`
pub const TASK_TYPE_FILE_COLLECTION: i64 = 0;

/// Keys every task info body carries; their values may be loosely typed
pub const TASK_INFO_FIELDS: [&str; 6] = [
    "id",
    "slug",
    "title",
    "taskType",
    "hasPassword",
    "isActive",
];

/// Description of a file collection task
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskInfo {
    pub id: Value,
    #[serde(deserialize_with = "loose_string")]
    pub slug: String,
    #[serde(deserialize_with = "loose_string")]
    pub title: String,
    #[serde(rename = "taskType")]
    pub task_type: Value,
    #[serde(rename = "hasPassword", deserialize_with = "loose_bool")]
    pub has_password: bool,
    #[serde(rename = "isActive", deserialize_with = "loose_bool")]
    pub is_active: bool,
    #[serde(rename = "allowedExtensions", default, deserialize_with = "loose_strings")]
    pub allowed_extensions: Vec<String>,
    #[serde(rename = "allowAttachmentUpload", default, deserialize_with = "loose_bool")]
    pub allow_attachment_upload: bool,
    #[serde(rename = "versioningMode", default)]
    pub versioning_mode: Option<Value>,
}

impl TaskInfo {
    /// Check the required keys on the raw body, then build the typed view
    pub fn from_body(body: &Value) -> Result<Self, String> {
        let missing = missing_fields(body, &TASK_INFO_FIELDS);
        if !missing.is_empty() {
            return Err(format!("missing fields: {}", missing.join(", ")));
        }
        serde_json::from_value(body.clone()).map_err(|e| e.to_string())
    }

    /// Human readable task kind
    pub fn kind_label(&self) -> &'static str {
        task_kind_label(task_type_code(&self.task_type).unwrap_or(-1))
    }
}

/// Keys of `fields` that `body` lacks; a non-object body lacks all of them
pub fn missing_fields<'a>(body: &Value, fields: &[&'a str]) -> Vec<&'a str> {
    fields
        .iter()
        .copied()
        .filter(|field| body.get(*field).is_none())
        .collect()
}

/// Numeric `taskType`, also when it is sent as a string
pub fn task_type_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Label for a raw `taskType` value
pub fn task_kind_label(task_type: i64) -> &'static str {
    if task_type == TASK_TYPE_FILE_COLLECTION {
        "file collection"
    } else {
        "online form"
    }
}

/// Truthiness of a JSON value: null, false, zero and empty values are false
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(truthy(&Value::deserialize(deserializer)?))
}

fn loose_strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

/// Successful form submission
#[derive(Debug, Clone, Deserialize)]
pub struct FormSubmitResponse {
    pub message: String,
    pub filename: String,
    #[serde(default)]
    pub submitter: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(rename = "attachmentCount", default)]
    pub attachment_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_requires_name_and_type() {
        let ok = json!({
            "title": "报名表",
            "columns": [{"name": "姓名", "type": "Text", "required": true}],
            "allowAttachmentUpload": true
        });
        let schema: Schema = serde_json::from_value(ok).unwrap();
        assert!(schema.allow_attachment_upload);
        assert!(schema.columns[0].required);

        let missing_type = json!({"title": "t", "columns": [{"name": "x"}]});
        assert!(serde_json::from_value::<Schema>(missing_type).is_err());
    }

    #[test]
    fn test_task_info_required_fields() {
        let info = json!({
            "id": 7, "slug": "abc", "title": "收集", "taskType": 0,
            "hasPassword": true, "isActive": true,
            "allowedExtensions": [".xlsx"]
        });
        let info = TaskInfo::from_body(&info).unwrap();
        assert_eq!(info.kind_label(), "file collection");
        assert_eq!(info.allowed_extensions, vec![".xlsx"]);
        assert!(!info.allow_attachment_upload);

        let partial = json!({"id": 7, "slug": "abc", "title": "收集"});
        let err = TaskInfo::from_body(&partial).unwrap_err();
        assert_eq!(err, "missing fields: taskType, hasPassword, isActive");

        let err = TaskInfo::from_body(&json!([1, 2])).unwrap_err();
        assert!(err.contains("id"));
    }

    #[test]
    fn test_task_info_accepts_loose_values() {
        let body = json!({
            "id": "t-7", "slug": 42, "title": null, "taskType": "1",
            "hasPassword": 1, "isActive": "yes",
            "allowedExtensions": null
        });
        let info = TaskInfo::from_body(&body).unwrap();
        assert_eq!(info.title, "");
        assert_eq!(info.slug, "42");
        assert_eq!(info.kind_label(), "online form");
        assert!(info.has_password);
        assert!(info.is_active);
        assert!(info.allowed_extensions.is_empty());

        let body = json!({
            "id": 1, "slug": "s", "title": "t", "taskType": "0",
            "hasPassword": null, "isActive": false
        });
        let info = TaskInfo::from_body(&body).unwrap();
        assert_eq!(info.kind_label(), "file collection");
        assert!(!info.has_password);
    }

    #[test]
    fn test_schema_accepts_loose_values() {
        let body = json!({
            "title": null,
            "columns": [
                {"name": "年龄", "type": "Number", "required": "true"},
                {"name": 2024, "type": "Text", "required": null}
            ],
            "allowAttachmentUpload": 1
        });
        let schema: Schema = serde_json::from_value(body).unwrap();
        assert_eq!(schema.title, "");
        assert!(schema.columns[0].required);
        assert_eq!(schema.columns[1].name, "2024");
        assert!(!schema.columns[1].required);
        assert!(schema.allow_attachment_upload);

        let missing_columns = json!({"title": "t"});
        assert!(serde_json::from_value::<Schema>(missing_columns).is_err());
    }

    #[test]
    fn test_attachment_save_name_stays_in_directory() {
        let names = [
            ("../../escape.txt", "escape.txt"),
            ("/etc/passwd", "passwd"),
            ("..\\..\\win.ini", "win.ini"),
            ("guide.pdf", "guide.pdf"),
        ];
        for (served, expected) in names {
            let att: AttachmentInfo =
                serde_json::from_value(json!({"id": 1, "fileName": served})).unwrap();
            assert_eq!(att.save_name(), expected);

            let dir = std::path::Path::new("/tmp/dl");
            let joined = dir.join(att.save_name());
            assert_eq!(joined.parent(), Some(dir), "{} escapes", served);
        }

        for served in ["..", "dir/", "."] {
            let att: AttachmentInfo =
                serde_json::from_value(json!({"id": 4, "fileName": served})).unwrap();
            assert_eq!(att.save_name(), "attachment_4");
        }

        let att: AttachmentInfo =
            serde_json::from_value(json!({"id": "../x", "fileName": null})).unwrap();
        assert_eq!(att.save_name(), "x");
    }

    #[test]
    fn test_attachment_save_name_fallback() {
        let att: AttachmentInfo = serde_json::from_value(json!({"id": 3})).unwrap();
        assert_eq!(att.id_segment(), "3");
        assert_eq!(att.save_name(), "attachment_3");
    }
}
