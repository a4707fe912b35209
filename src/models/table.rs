//! Tabular JSON helpers

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A JSON object used as one table row.
pub type Row = Map<String, Value>;

/// Give every row the same columns: the union of keys across all rows,
/// with missing cells set to null. Row order is kept.
pub fn normalize_rows(rows: Vec<Row>) -> Vec<Row> {
    let keys: BTreeSet<String> = rows.iter().flat_map(|row| row.keys().cloned()).collect();

    rows.into_iter()
        .map(|mut row| {
            keys.iter()
                .map(|key| {
                    let value = row.remove(key).unwrap_or(Value::Null);
                    (key.clone(), value)
                })
                .collect()
        })
        .collect()
}

/// `report_id` -> `Report Id`
pub fn title_case_key(key: &str) -> String {
    key.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_normalize_fills_union_of_keys() {
        let rows = vec![
            row(json!({"campaignId": 1, "clicks": 4})),
            row(json!({"campaignId": 2, "cost": 1.5})),
            row(json!({})),
        ];

        let fixed = normalize_rows(rows);
        assert_eq!(fixed.len(), 3);
        for r in &fixed {
            let keys: Vec<&str> = r.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["campaignId", "clicks", "cost"]);
        }
        assert_eq!(fixed[0]["cost"], Value::Null);
        assert_eq!(fixed[1]["clicks"], Value::Null);
        assert_eq!(fixed[1]["cost"], json!(1.5));
        assert_eq!(fixed[2]["campaignId"], Value::Null);
    }

    #[test]
    fn test_normalize_keeps_row_order_and_values() {
        let rows: Vec<Row> = (0..5).map(|i| row(json!({ "n": i }))).collect();
        let fixed = normalize_rows(rows);
        let ns: Vec<i64> = fixed.iter().map(|r| r["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_normalize_keeps_explicit_nulls() {
        let fixed = normalize_rows(vec![row(json!({"a": null})), row(json!({"b": true}))]);
        assert_eq!(fixed[0]["a"], Value::Null);
        assert_eq!(fixed[0]["b"], Value::Null);
        assert_eq!(fixed[1]["b"], json!(true));
    }

    #[test]
    fn test_normalize_empty() {
        assert!(normalize_rows(Vec::new()).is_empty());
    }

    #[test]
    fn test_title_case_key() {
        assert_eq!(title_case_key("report_id"), "Report Id");
        assert_eq!(title_case_key("ad_type"), "Ad Type");
        assert_eq!(title_case_key("status"), "Status");
        assert_eq!(title_case_key("_data_path_"), "Data Path");
    }
}
