//! Row generator for online form tasks

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use super::field::{self, FieldKind};
use crate::api::types::{Column, Schema};

/// Column type as declared by the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Boolean,
    /// Yes/no checkbox, submitted as the strings `true` / `false`
    YesNo,
}

impl ColumnType {
    /// Map the schema's type string; unknown types are treated as text
    pub fn parse(raw: &str) -> Self {
        match raw {
            "数字" | "Number" => ColumnType::Number,
            "日期" | "Date" => ColumnType::Date,
            "布尔值" | "Boolean" => ColumnType::Boolean,
            "双选框(是/否)" => ColumnType::YesNo,
            _ => ColumnType::Text,
        }
    }

    /// Value used when a required field comes out empty
    pub fn default_value(self) -> Value {
        match self {
            ColumnType::Number => Value::from(1),
            ColumnType::Date => Value::from("2026-01-10"),
            ColumnType::Boolean => Value::Bool(true),
            ColumnType::YesNo => Value::from("true"),
            ColumnType::Text => Value::from("测试"),
        }
    }
}

/// Generates JSON rows that satisfy a form schema
pub struct FormDataGenerator {
    columns: Vec<Column>,
    rng: StdRng,
}

impl FormDataGenerator {
    pub fn new(schema: &Schema) -> Self {
        Self::with_rng(schema, StdRng::from_entropy())
    }

    pub fn with_rng(schema: &Schema, rng: StdRng) -> Self {
        Self {
            columns: schema.columns.clone(),
            rng,
        }
    }

    /// Generate a value for one column
    pub fn field_value(&mut self, column: &Column) -> Value {
        let column_type = ColumnType::parse(&column.kind);
        let value = match column_type {
            ColumnType::Number => Value::from(self.rng.gen_range(1..=100)),
            ColumnType::Date => Value::from(field::recent_date(&mut self.rng, 30)),
            ColumnType::Boolean => Value::Bool(self.rng.gen_bool(0.5)),
            ColumnType::YesNo => Value::from(if self.rng.gen_bool(0.5) { "true" } else { "false" }),
            ColumnType::Text => self.text_value(&column.name),
        };

        if column.required && is_empty(&value) {
            column_type.default_value()
        } else {
            value
        }
    }

    /// Text columns are filled according to what their name suggests
    fn text_value(&mut self, name: &str) -> Value {
        match FieldKind::infer(name) {
            FieldKind::Text => Value::from(field::sentence(&mut self.rng)),
            FieldKind::Age => Value::from(self.rng.gen_range(18..=65).to_string()),
            kind => kind.generate(&mut self.rng),
        }
    }

    /// Generate one complete row keyed by column name
    pub fn row(&mut self) -> Map<String, Value> {
        let columns = self.columns.clone();
        columns
            .iter()
            .map(|column| (column.name.clone(), self.field_value(column)))
            .collect()
    }

    pub fn rows(&mut self, count: usize) -> Vec<Map<String, Value>> {
        (0..count).map(|_| self.row()).collect()
    }
}

/// Whether a generated value counts as empty for required-field checks
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        serde_json::from_value(serde_json::json!({
            "title": "报名",
            "columns": [
                {"name": "姓名", "type": "Text", "required": true},
                {"name": "人数", "type": "数字"},
                {"name": "日期", "type": "Date"},
                {"name": "已确认", "type": "Boolean"},
                {"name": "是否参加", "type": "双选框(是/否)", "required": true},
                {"name": "说明", "type": "Unknown"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_row_covers_every_column() {
        let mut gen = FormDataGenerator::with_rng(&schema(), StdRng::seed_from_u64(11));
        let row = gen.row();
        assert_eq!(row.len(), 6);

        let count = row["人数"].as_i64().unwrap();
        assert!((1..=100).contains(&count));
        assert!(row["已确认"].is_boolean());
        let yes_no = row["是否参加"].as_str().unwrap();
        assert!(yes_no == "true" || yes_no == "false");
        assert!(!row["说明"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_column_type_parse() {
        assert_eq!(ColumnType::parse("Number"), ColumnType::Number);
        assert_eq!(ColumnType::parse("布尔值"), ColumnType::Boolean);
        assert_eq!(ColumnType::parse("Whatever"), ColumnType::Text);
        assert_eq!(ColumnType::Date.default_value(), Value::from("2026-01-10"));
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&Value::from("")));
        assert!(is_empty(&Value::Bool(false)));
        assert!(!is_empty(&Value::Bool(true)));
        assert!(!is_empty(&Value::from(0)));
    }

    fn single_column(column: serde_json::Value) -> Schema {
        serde_json::from_value(serde_json::json!({ "title": "t", "columns": [column] })).unwrap()
    }

    #[test]
    fn test_required_boolean_always_true() {
        let schema = single_column(serde_json::json!(
            {"name": "同意", "type": "Boolean", "required": true}
        ));
        for seed in 0..50 {
            let mut gen = FormDataGenerator::with_rng(&schema, StdRng::seed_from_u64(seed));
            assert_eq!(gen.row()["同意"], Value::Bool(true), "seed {}", seed);
        }
    }

    #[test]
    fn test_optional_boolean_varies() {
        let schema = single_column(serde_json::json!({"name": "同意", "type": "Boolean"}));
        let mut gen = FormDataGenerator::with_rng(&schema, StdRng::seed_from_u64(3));
        let values: Vec<Value> = gen.rows(50).into_iter().map(|r| r["同意"].clone()).collect();
        assert!(values.contains(&Value::Bool(true)));
        assert!(values.contains(&Value::Bool(false)));
    }

    #[test]
    fn test_unknown_type_uses_name_inference() {
        let schema: Schema = serde_json::from_value(serde_json::json!({
            "title": "t",
            "columns": [
                {"name": "联系邮箱", "type": "自定义"},
                {"name": "手机号码", "type": "自定义"},
                {"name": "所在部门", "type": "自定义"},
                {"name": "备注", "type": "自定义"}
            ]
        }))
        .unwrap();
        let mut gen = FormDataGenerator::with_rng(&schema, StdRng::seed_from_u64(5));
        let row = gen.row();

        assert!(row["联系邮箱"].as_str().unwrap().contains('@'));
        let phone = row["手机号码"].as_str().unwrap();
        assert_eq!(phone.len(), 11);
        assert!(phone.chars().all(|c| c.is_ascii_digit()));
        let department = row["所在部门"].as_str().unwrap();
        assert!(field::DEPARTMENTS.contains(&department));
        assert!(!row["备注"].as_str().unwrap().is_empty());
    }
}
