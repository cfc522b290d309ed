use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type Fields = BTreeMap<String, FieldValue>;

/// A single stored value.
///
/// Serialized untagged, so a date travels as a plain `YYYY-MM-DD` string. On
/// the way back only a string in exactly that form becomes a `Date`; anything
/// else stays `Text` byte for byte.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Date(NaiveDate),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Integer(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match StoredValue::deserialize(deserializer)? {
            StoredValue::Integer(n) => FieldValue::Integer(n),
            StoredValue::Text(s) => FieldValue::from_stored_text(s),
        })
    }
}

impl FieldValue {
    fn from_stored_text(s: String) -> Self {
        match NaiveDate::parse_from_str(&s, DATE_FORMAT) {
            Ok(d) if d.format(DATE_FORMAT).to_string() == s => FieldValue::Date(d),
            _ => FieldValue::Text(s),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Text(s) => NaiveDate::parse_from_str(s, DATE_FORMAT).ok(),
            FieldValue::Integer(_) => None,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }

    /// Equality as a store sees it: integers by value, everything else by its
    /// stored text. Dates therefore match by calendar day.
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Integer(_), _) | (_, FieldValue::Integer(_)) => false,
            _ => self.to_text() == other.to_text(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

/// `field == value`. The only predicate the store collaborator supports.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: FieldValue,
}

impl Filter {
    pub fn equals(field: &str, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        fields
            .get(&self.field)
            .map(|v| v.matches(&self.value))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    pub created_at: NaiveDateTime,
}

impl Document {
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).map(FieldValue::to_text)
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.fields.get(field).and_then(FieldValue::as_date)
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(FieldValue::as_integer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_date_serializes_as_plain_day() {
        let json = serde_json::to_string(&FieldValue::Date(date("2024-01-05"))).unwrap();
        assert_eq!(json, r#""2024-01-05""#);
    }

    #[test]
    fn test_stored_fields_read_back_typed() {
        let json = r#"{"date":"2024-01-05","name":"Ada","queue_number":7}"#;
        let fields: Fields = serde_json::from_str(json).unwrap();
        assert_eq!(fields["date"], FieldValue::Date(date("2024-01-05")));
        assert_eq!(fields["name"], FieldValue::Text("Ada".to_string()));
        assert_eq!(fields["queue_number"], FieldValue::Integer(7));
    }

    #[test]
    fn test_date_like_text_reads_back_unchanged() {
        let json = r#"{"message":"2024-01-05 ","name":"2024-1-5","phone":" 2024-01-05"}"#;
        let fields: Fields = serde_json::from_str(json).unwrap();
        assert_eq!(fields["name"], FieldValue::Text("2024-1-5".to_string()));
        assert_eq!(fields["phone"], FieldValue::Text(" 2024-01-05".to_string()));
        assert_eq!(fields["message"], FieldValue::Text("2024-01-05 ".to_string()));
        assert_eq!(serde_json::to_string(&fields).unwrap(), json);
    }

    #[test]
    fn test_date_matches_text_of_same_day() {
        let stored = FieldValue::Text("2024-01-05".to_string());
        assert!(FieldValue::Date(date("2024-01-05")).matches(&stored));
        assert!(!FieldValue::Date(date("2024-01-06")).matches(&stored));
    }

    #[test]
    fn test_integer_never_matches_text() {
        assert!(!FieldValue::Integer(5).matches(&FieldValue::Text("5".to_string())));
        assert!(FieldValue::Integer(5).matches(&FieldValue::Integer(5)));
    }

    #[test]
    fn test_filter_on_missing_field_does_not_match() {
        let mut fields = Fields::new();
        fields.insert("time_slot".to_string(), "2-3 PM".into());
        assert!(Filter::equals("time_slot", "2-3 PM").matches(&fields));
        assert!(!Filter::equals("date", date("2024-01-05")).matches(&fields));
    }
}
