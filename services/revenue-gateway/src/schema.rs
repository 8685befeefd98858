//! Feature schema and the single-row input record built from it.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Column order the coffee shop revenue model was trained on.
pub const COFFEE_SHOP_FEATURES: [&str; 6] = [
    "Number_of_Customers_Per_Day",
    "Average_Order_Value",
    "Operating_Hours_Per_Day",
    "Number_of_Employees",
    "Marketing_Spend_Per_Day",
    "Location_Foot_Traffic",
];

/// Ordered, immutable list of input field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSchema { fields: &'static [&'static str] }

impl FeatureSchema {
    pub const fn new(fields: &'static [&'static str]) -> Self { Self { fields } }
    pub const fn coffee_shop() -> Self { Self::new(&COFFEE_SHOP_FEATURES) }
    pub fn fields(&self) -> &'static [&'static str] { self.fields }
    pub fn len(&self) -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

impl Default for FeatureSchema {
    fn default() -> Self { Self::coffee_shop() }
}

/// One row of validated values, keyed by schema field and kept in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord { columns: Vec<(&'static str, f64)> }

impl InputRecord {
    pub(crate) fn from_columns(columns: Vec<(&'static str, f64)>) -> Self { Self { columns } }

    pub fn len(&self) -> usize { self.columns.len() }
    pub fn is_empty(&self) -> bool { self.columns.is_empty() }
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ { self.columns.iter().map(|(n, _)| *n) }
    pub fn values(&self) -> Vec<f64> { self.columns.iter().map(|(_, v)| *v).collect() }
    pub fn get(&self, name: &str) -> Option<f64> { self.columns.iter().find(|(n, _)| *n == name).map(|(_, v)| *v) }
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ { self.columns.iter().copied() }
}

// Serialized as a JSON object whose keys follow schema order.
impl Serialize for InputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns { map.serialize_entry(name, value)?; }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coffee_shop_schema_has_six_ordered_fields() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.len(), 6);
        assert_eq!(schema.fields()[0], "Number_of_Customers_Per_Day");
        assert_eq!(schema.fields()[5], "Location_Foot_Traffic");
    }

    #[test]
    fn record_serializes_in_schema_order() {
        let rec = InputRecord::from_columns(vec![("b", 2.0), ("a", 1.0)]);
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"b":2.0,"a":1.0}"#);
        assert_eq!(rec.get("a"), Some(1.0));
        assert_eq!(rec.values(), vec![2.0, 1.0]);
    }
}
