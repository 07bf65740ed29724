//! Extracted feature fields and their numeric normalization.

mod normalize;
mod parser;

pub use normalize::{format_measurement, parse_numeric, Measure, Measurements};
pub use parser::{FieldParser, SUSPICIOUS_BBOX_LENGTH};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Field names read from the CAM tool's feature panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldName {
    FeatureType,
    Diameter,
    Depth,
    BboxWidth,
    BboxLength,
    SmallestRadius,
    ChamferDiameter,
    BoreDiameter,
    ElementType,
    ElementNumber,
    Name,
}

impl FieldName {
    /// Every field of the vocabulary, in panel order.
    pub const ALL: [FieldName; 11] = [
        FieldName::ElementType,
        FieldName::ElementNumber,
        FieldName::BboxWidth,
        FieldName::BboxLength,
        FieldName::Depth,
        FieldName::Diameter,
        FieldName::FeatureType,
        FieldName::Name,
        FieldName::SmallestRadius,
        FieldName::ChamferDiameter,
        FieldName::BoreDiameter,
    ];

    /// The label as it appears on screen and in field maps.
    pub fn label(self) -> &'static str {
        match self {
            FieldName::FeatureType => "Feature-Typ",
            FieldName::Diameter => "Durchmesser",
            FieldName::Depth => "Tiefe",
            FieldName::BboxWidth => "Begrenzungsbox Breite",
            FieldName::BboxLength => "Begrenzungsbox Länge",
            FieldName::SmallestRadius => "Kleinster Radius",
            FieldName::ChamferDiameter => "Fasendurchmesser",
            FieldName::BoreDiameter => "Bohrdurchmesser",
            FieldName::ElementType => "Elementtyp",
            FieldName::ElementNumber => "Elementnummer",
            FieldName::Name => "Name",
        }
    }

    /// Whether the field carries a measurement.
    pub fn is_numeric(self) -> bool {
        Measure::from_field(self).is_some()
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FieldName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FieldName::ALL
            .into_iter()
            .find(|field| field.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown field name: {}", s))
    }
}

/// Field values produced by the text recognizer.
///
/// Keys are field labels; values are the raw strings as recognized, `None`
/// when the field was seen but empty. Unknown keys are kept untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFields {
    values: BTreeMap<String, Option<String>>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, field: FieldName, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: FieldName, value: impl Into<String>) {
        self.values.insert(field.label().to_string(), Some(value.into()));
    }

    /// Insert a value under an arbitrary key.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: Option<String>) {
        self.values.insert(key.into(), value);
    }

    /// Raw value of a field, if present.
    pub fn get(&self, field: FieldName) -> Option<&str> {
        self.values
            .get(field.label())
            .and_then(|v| v.as_deref())
    }

    /// Lower-cased, trimmed feature type; `None` when missing or blank.
    pub fn feature_type(&self) -> Option<String> {
        self.get(FieldName::FeatureType)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Parse from a JSON object of label to string (or null).
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl FromIterator<(FieldName, String)> for ExtractedFields {
    fn from_iter<I: IntoIterator<Item = (FieldName, String)>>(iter: I) -> Self {
        let mut fields = ExtractedFields::new();
        for (field, value) in iter {
            fields.set(field, value);
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_name_roundtrip() {
        for field in FieldName::ALL {
            assert_eq!(field.label().parse::<FieldName>(), Ok(field));
        }
        assert!("Drehzahl".parse::<FieldName>().is_err());
    }

    #[test]
    fn test_feature_type_is_lowercased() {
        let fields = ExtractedFields::new().with(FieldName::FeatureType, "  Nuten Rückzug ");
        assert_eq!(fields.feature_type(), Some("nuten rückzug".to_string()));

        let blank = ExtractedFields::new().with(FieldName::FeatureType, "   ");
        assert_eq!(blank.feature_type(), None);
    }

    #[test]
    fn test_from_json_keeps_nulls_and_unknown_keys() {
        let fields = ExtractedFields::from_json(
            r#"{"Feature-Typ": "Bohrung", "Durchmesser": "9,500000", "Tiefe": null, "Werkzeug": "T12"}"#,
        )
        .unwrap();

        assert_eq!(fields.len(), 4);
        assert_eq!(fields.get(FieldName::Diameter), Some("9,500000"));
        assert_eq!(fields.get(FieldName::Depth), None);
        assert!(fields.iter().any(|(k, v)| k == "Werkzeug" && v == Some("T12")));
    }
}
