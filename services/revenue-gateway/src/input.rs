//! Form validation: raw submitted strings to an [`InputRecord`].

use crate::schema::{FeatureSchema, InputRecord};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing value for {field}")]
    Missing { field: &'static str },
    #[error("Invalid numeric value for {field}: '{raw}'")]
    InvalidNumber { field: &'static str, raw: String },
    #[error("Malformed form body: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::Missing { field } | ValidationError::InvalidNumber { field, .. } => Some(*field),
            ValidationError::MalformedBody(_) => None,
        }
    }
}

/// Walk the schema in order; the first bad field wins. Extra form keys are ignored.
pub fn build_input_record(schema: &FeatureSchema, form: &HashMap<String, String>) -> Result<InputRecord, ValidationError> {
    let mut columns = Vec::with_capacity(schema.len());
    for &field in schema.fields() {
        let raw = form.get(field).map(|v| v.trim()).unwrap_or("");
        if raw.is_empty() { return Err(ValidationError::Missing { field }); }
        let value = parse_number(raw).ok_or_else(|| ValidationError::InvalidNumber { field, raw: raw.to_string() })?;
        columns.push((field, value));
    }
    Ok(InputRecord::from_columns(columns))
}

// NaN and infinities parse as f64 but cannot be emitted as JSON numbers.
fn parse_number(raw: &str) -> Option<f64> {
    ungroup_digits(raw)?.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accept `1_000`-style grouping: each underscore must sit between two digits.
fn ungroup_digits(raw: &str) -> Option<std::borrow::Cow<'_, str>> {
    if !raw.contains('_') { return Some(raw.into()); }
    let bytes = raw.as_bytes();
    let grouped = bytes.iter().enumerate().filter(|(_, b)| **b == b'_').all(|(i, _)| {
        i > 0 && bytes[i - 1].is_ascii_digit() && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
    });
    grouped.then(|| raw.replace('_', "").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical() -> HashMap<String, String> {
        [
            ("Number_of_Customers_Per_Day", "100"),
            ("Average_Order_Value", "5.5"),
            ("Operating_Hours_Per_Day", "10"),
            ("Number_of_Employees", "3"),
            ("Marketing_Spend_Per_Day", "20"),
            ("Location_Foot_Traffic", "200"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn valid_form_yields_values_in_schema_order() {
        let rec = build_input_record(&FeatureSchema::default(), &canonical()).unwrap();
        assert_eq!(rec.values(), vec![100.0, 5.5, 10.0, 3.0, 20.0, 200.0]);
        assert_eq!(rec.names().collect::<Vec<_>>(), FeatureSchema::default().fields().to_vec());
    }

    #[test]
    fn whitespace_negative_zero_and_exponent_are_accepted() {
        let mut form = canonical();
        form.insert("Average_Order_Value".into(), "  -2.25 ".into());
        form.insert("Number_of_Employees".into(), "0".into());
        form.insert("Location_Foot_Traffic".into(), "1e3".into());
        form.insert("Unrelated".into(), "ignored".into());
        let rec = build_input_record(&FeatureSchema::default(), &form).unwrap();
        assert_eq!(rec.get("Average_Order_Value"), Some(-2.25));
        assert_eq!(rec.get("Number_of_Employees"), Some(0.0));
        assert_eq!(rec.get("Location_Foot_Traffic"), Some(1000.0));
        assert_eq!(rec.len(), 6);
    }

    #[test]
    fn digit_grouping_underscores_are_accepted_only_between_digits() {
        let mut form = canonical();
        form.insert("Location_Foot_Traffic".into(), "1_000".into());
        form.insert("Marketing_Spend_Per_Day".into(), "1_2.5e1_0".into());
        let rec = build_input_record(&FeatureSchema::default(), &form).unwrap();
        assert_eq!(rec.get("Location_Foot_Traffic"), Some(1000.0));
        assert_eq!(rec.get("Marketing_Spend_Per_Day"), Some(12.5e10));

        for raw in ["_1", "1_", "1__0", "1_.5", "1._5"] {
            let mut form = canonical();
            form.insert("Location_Foot_Traffic".into(), raw.into());
            let err = build_input_record(&FeatureSchema::default(), &form).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid numeric value for Location_Foot_Traffic: '{raw}'"));
        }
    }

    #[test]
    fn missing_and_blank_fields_are_named() {
        for &field in FeatureSchema::default().fields() {
            let mut absent = canonical();
            absent.remove(field);
            let err = build_input_record(&FeatureSchema::default(), &absent).unwrap_err();
            assert_eq!(err, ValidationError::Missing { field });
            assert_eq!(err.to_string(), format!("Missing value for {field}"));

            let mut blank = canonical();
            blank.insert(field.to_string(), "   ".into());
            let err = build_input_record(&FeatureSchema::default(), &blank).unwrap_err();
            assert_eq!(err.field(), Some(field));
        }
    }

    #[test]
    fn non_numeric_value_is_echoed() {
        let mut form = canonical();
        form.insert("Operating_Hours_Per_Day".into(), " abc ".into());
        let err = build_input_record(&FeatureSchema::default(), &form).unwrap_err();
        assert_eq!(err.to_string(), "Invalid numeric value for Operating_Hours_Per_Day: 'abc'");
    }

    #[test]
    fn non_finite_values_are_rejected() {
        for raw in ["nan", "inf", "-infinity"] {
            let mut form = canonical();
            form.insert("Marketing_Spend_Per_Day".into(), raw.into());
            let err = build_input_record(&FeatureSchema::default(), &form).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidNumber { field: "Marketing_Spend_Per_Day", .. }));
        }
    }

    #[test]
    fn first_failing_field_in_schema_order_wins() {
        let mut form = canonical();
        form.remove("Location_Foot_Traffic");
        form.insert("Average_Order_Value".into(), "x".into());
        let err = build_input_record(&FeatureSchema::default(), &form).unwrap_err();
        assert_eq!(err.field(), Some("Average_Order_Value"));
    }
}
