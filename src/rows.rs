//! UI 条件行与类型化条件之间的转换
//!
//! ## 行格式
//!
//! ```text
//! { "key": "status", "param": "EQUALS", "value": "open", "metadata": { "transformed": "wi_" } }
//! ```
//!
//! ### value 支持的形状
//! - **字符串**: `"open"`
//! - **字符串数组**: `["open", "closed"]`
//! - **绝对区间**: `{ "lowerBound": "1690000000", "upperBound": "1690086400" }` 或 `{ "$gt": .., "$lt": .. }`
//! - **相对区间**: `{ "ageSeconds": "86400" }` 或 `{ "$age": .. }`
//! - **缺省/null**: 视为空字符串
//!
//! 输出方向统一使用 camelCase 形式。

use crate::condition::{bound_text, string_items, ConditionMetadata, ConditionValue, FilterCondition, Operator};
use crate::wire;
use serde_json::{Map, Value};

const LOWER_BOUND: &str = "lowerBound";
const UPPER_BOUND: &str = "upperBound";
const AGE_SECONDS: &str = "ageSeconds";

/// 行解析错误, `index` 为出错行的下标（从 0 开始）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("condition #{index}: invalid operator `{param}`")]
    InvalidOperator { index: usize, param: String },
    #[error("condition #{index}: malformed row: {reason}")]
    MalformedRow { index: usize, reason: String },
}

/// 解析一组条件行；遇到第一行错误即整体失败
pub fn parse_rows(rows: &Value) -> Result<Vec<FilterCondition>, RowError> {
    let items = rows.as_array().ok_or_else(|| RowError::MalformedRow {
        index: 0,
        reason: "expected an array of condition rows".to_string(),
    })?;
    items
        .iter()
        .enumerate()
        .map(|(index, row)| parse_row(index, row))
        .collect()
}

/// 解析单个条件行
pub fn parse_row(index: usize, row: &Value) -> Result<FilterCondition, RowError> {
    let malformed = |reason: &str| RowError::MalformedRow {
        index,
        reason: reason.to_string(),
    };

    let obj = row.as_object().ok_or_else(|| malformed("row must be an object"))?;

    let key = obj
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing string `key`"))?;

    let param = obj
        .get("param")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing string `param`"))?;
    let operator: Operator = param.parse().map_err(|_| RowError::InvalidOperator {
        index,
        param: param.to_string(),
    })?;

    let value = obj.get("value").map(parse_value).unwrap_or_else(|| ConditionValue::scalar(""));
    // rollback 字段的字符串值按布尔字面量处理
    let value = match value {
        ConditionValue::Scalar(s) if key == wire::ROLLBACK_KEY => ConditionValue::BooleanAsString(s),
        other => other,
    };

    // metadata.transformed 为空字符串时等同于未设置
    let transformed_prefix = obj
        .get("metadata")
        .and_then(|m| m.get("transformed"))
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    Ok(FilterCondition {
        field_key: key.to_string(),
        operator,
        value,
        metadata: ConditionMetadata { transformed_prefix },
    })
}

/// 解析行中的 value，同时接受 camelCase 与线上格式的区间写法
fn parse_value(value: &Value) -> ConditionValue {
    match value {
        Value::Null => ConditionValue::scalar(""),
        Value::Array(items) => match string_items(items) {
            Some(list) => ConditionValue::List(list),
            None => ConditionValue::Opaque(value.clone()),
        },
        Value::Object(map) if map.contains_key(AGE_SECONDS) => ConditionValue::RelativeAge {
            age_seconds: bound_text(map.get(AGE_SECONDS)),
        },
        Value::Object(map) if map.contains_key(LOWER_BOUND) || map.contains_key(UPPER_BOUND) => {
            ConditionValue::Range {
                lower_bound: bound_text(map.get(LOWER_BOUND)),
                upper_bound: bound_text(map.get(UPPER_BOUND)),
            }
        }
        other => ConditionValue::from_wire(other),
    }
}

/// 将条件渲染为 UI 行
pub fn to_row(condition: &FilterCondition) -> Value {
    let mut row = Map::new();
    row.insert("key".to_string(), Value::String(condition.field_key.clone()));
    row.insert("param".to_string(), Value::String(condition.operator.as_param().to_string()));
    row.insert("value".to_string(), render_value(&condition.value));
    if let Some(prefix) = &condition.metadata.transformed_prefix {
        let mut metadata = Map::new();
        metadata.insert("transformed".to_string(), Value::String(prefix.clone()));
        row.insert("metadata".to_string(), Value::Object(metadata));
    }
    Value::Object(row)
}

pub fn to_rows(conditions: &[FilterCondition]) -> Value {
    Value::Array(conditions.iter().map(to_row).collect())
}

fn render_value(value: &ConditionValue) -> Value {
    match value {
        ConditionValue::Range { lower_bound, upper_bound } => {
            let mut map = Map::new();
            map.insert(LOWER_BOUND.to_string(), Value::String(lower_bound.clone()));
            map.insert(UPPER_BOUND.to_string(), Value::String(upper_bound.clone()));
            Value::Object(map)
        }
        ConditionValue::RelativeAge { age_seconds } => {
            let mut map = Map::new();
            map.insert(AGE_SECONDS.to_string(), Value::String(age_seconds.clone()));
            Value::Object(map)
        }
        other => other.to_wire(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_basic_rows() {
        let rows = json!([
            {"key": "status", "param": "EQUALS", "value": "open"},
            {"key": "teams", "param": "DOES_NOT_EQUAL", "value": ["a", "b"]},
            {"key": "wi_storypoints", "param": "IS_BETWEEN", "value": {"lowerBound": "1", "upperBound": "8"},
             "metadata": {"transformed": "wi_"}}
        ]);
        let conditions = parse_rows(&rows).unwrap();
        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions[0], FilterCondition::new("status", Operator::Equals, ConditionValue::scalar("open")));
        assert_eq!(conditions[1].value, ConditionValue::List(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(conditions[2].value, ConditionValue::range("1", "8"));
        assert_eq!(conditions[2].metadata.transformed_prefix.as_deref(), Some("wi_"));
    }

    #[test]
    fn test_wire_spelled_ranges_are_accepted() {
        let row = json!({"key": "created_at", "param": "IS_BETWEEN", "value": {"$gt": 1690000000, "$lt": "1690086400"}});
        let condition = parse_row(0, &row).unwrap();
        assert_eq!(condition.value, ConditionValue::range("1690000000", "1690086400"));

        let row = json!({"key": "created_at", "param": "IS_BETWEEN", "value": {"ageSeconds": "86400"}});
        assert_eq!(
            parse_row(0, &row).unwrap().value,
            ConditionValue::RelativeAge { age_seconds: "86400".to_string() }
        );
    }

    #[test]
    fn test_missing_value_is_empty_scalar() {
        let condition = parse_row(0, &json!({"key": "status", "param": "EQUALS"})).unwrap();
        assert_eq!(condition.value, ConditionValue::scalar(""));
        let condition = parse_row(0, &json!({"key": "age", "param": "IS_BETWEEN", "value": {}})).unwrap();
        assert!(condition.value.is_empty());
    }

    #[test]
    fn test_invalid_operator_names_the_row() {
        let rows = json!([
            {"key": "status", "param": "EQUALS", "value": "open"},
            {"key": "priority", "param": "GREATER_THAN", "value": "2"}
        ]);
        assert_eq!(
            parse_rows(&rows),
            Err(RowError::InvalidOperator { index: 1, param: "GREATER_THAN".to_string() })
        );
    }

    #[test]
    fn test_malformed_rows() {
        assert!(matches!(parse_rows(&json!({})), Err(RowError::MalformedRow { index: 0, .. })));
        assert!(matches!(
            parse_rows(&json!([{"param": "EQUALS"}])),
            Err(RowError::MalformedRow { index: 0, .. })
        ));
        assert!(matches!(
            parse_rows(&json!([{"key": "a", "param": "EQUALS"}, "oops"])),
            Err(RowError::MalformedRow { index: 1, .. })
        ));
    }

    #[test]
    fn test_render_rows() {
        let condition = FilterCondition::new("wi_storypoints", Operator::Between, ConditionValue::range("1", "8"))
            .with_transformed_prefix("wi_");
        assert_eq!(
            to_row(&condition),
            json!({
                "key": "wi_storypoints",
                "param": "IS_BETWEEN",
                "value": {"lowerBound": "1", "upperBound": "8"},
                "metadata": {"transformed": "wi_"}
            })
        );
        let parsed = parse_rows(&to_rows(&[condition.clone()])).unwrap();
        assert_eq!(parsed, vec![condition]);
    }

    #[test]
    fn test_rollback_row_is_boolean_literal() {
        let condition = parse_row(0, &json!({"key": "rollback", "param": "EQUALS", "value": "true"})).unwrap();
        assert_eq!(condition.value, ConditionValue::BooleanAsString("true".to_string()));

        // 其他字段不受影响
        let condition = parse_row(0, &json!({"key": "status", "param": "EQUALS", "value": "true"})).unwrap();
        assert_eq!(condition.value, ConditionValue::scalar("true"));
    }
}
