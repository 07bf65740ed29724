//! Line-based parser turning recognized panel text into field values.

use regex::Regex;
use tracing::{debug, info, warn};

use super::normalize::{clean_numeric, format_measurement, number_text};
use super::{ExtractedFields, FieldName};
use crate::patterns::*;

/// Value the recognizer is known to produce for a misread bounding-box length.
pub const SUSPICIOUS_BBOX_LENGTH: &str = "10.000000";

/// Parses the feature panel text into [`ExtractedFields`].
pub struct FieldParser {
    /// Bounding-box length value that triggers a correction pass.
    suspicious_bbox_length: String,
}

impl FieldParser {
    pub fn new() -> Self {
        Self {
            suspicious_bbox_length: SUSPICIOUS_BBOX_LENGTH.to_string(),
        }
    }

    /// Set the bounding-box length value treated as a misread.
    pub fn with_suspicious_bbox_length(mut self, value: impl Into<String>) -> Self {
        self.suspicious_bbox_length = value.into();
        self
    }

    /// Parse recognized text. Every known field is present in the result,
    /// `None` when it was not found.
    pub fn parse(&self, text: &str) -> ExtractedFields {
        let mut fields = ExtractedFields::new();
        for (field, _) in label_patterns() {
            fields.insert_raw(field.label(), None);
        }

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            for (field, pattern) in label_patterns() {
                if fields.get(field).is_some() {
                    continue;
                }

                let Some(caps) = pattern.captures(line) else {
                    continue;
                };
                let raw = caps[1].trim();

                if let Some(value) = normalize_value(field, raw) {
                    debug!("Found {} = '{}' (raw: '{}')", field, value, raw);
                    fields.set(field, value);
                }
            }
        }

        let found = fields.iter().filter(|(_, v)| v.is_some()).count();
        info!("Parsed {} of {} panel fields", found, fields.len());
        fields
    }

    /// Whether the bounding-box length looks like the known misread.
    pub fn needs_correction(&self, fields: &ExtractedFields) -> bool {
        fields.get(FieldName::BboxLength) == Some(self.suspicious_bbox_length.as_str())
    }

    /// Replace a misread bounding-box length with the value from a second
    /// recognition pass. Returns `true` when the value was corrected.
    pub fn correct_suspicious(&self, fields: &mut ExtractedFields, second_pass: &str) -> bool {
        if !self.needs_correction(fields) {
            return false;
        }

        warn!(
            "Bounding-box length is '{}', trying second-pass text",
            self.suspicious_bbox_length
        );

        for line in second_pass.lines() {
            let Some(caps) = BBOX_LENGTH.captures(line) else {
                continue;
            };

            match normalize_value(FieldName::BboxLength, caps[1].trim()) {
                Some(value) if value != self.suspicious_bbox_length => {
                    info!(
                        "Corrected bounding-box length from '{}' to '{}'",
                        self.suspicious_bbox_length, value
                    );
                    fields.set(FieldName::BboxLength, value);
                    return true;
                }
                _ => continue,
            }
        }

        false
    }
}

impl Default for FieldParser {
    fn default() -> Self {
        Self::new()
    }
}

fn label_patterns() -> [(FieldName, &'static Regex); 11] {
    [
        (FieldName::ElementType, &*ELEMENT_TYPE),
        (FieldName::ElementNumber, &*ELEMENT_NUMBER),
        (FieldName::Depth, &*DEPTH),
        (FieldName::Diameter, &*DIAMETER),
        (FieldName::BboxWidth, &*BBOX_WIDTH),
        (FieldName::BboxLength, &*BBOX_LENGTH),
        (FieldName::FeatureType, &*FEATURE_TYPE),
        (FieldName::Name, &*NAME),
        (FieldName::SmallestRadius, &*SMALLEST_RADIUS),
        (FieldName::ChamferDiameter, &*CHAMFER_DIAMETER),
        (FieldName::BoreDiameter, &*BORE_DIAMETER),
    ]
}

fn normalize_value(field: FieldName, raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    if field.is_numeric() {
        let cleaned = clean_numeric(raw);
        let precision = if field == FieldName::Diameter { None } else { Some(6) };

        return match number_text(&cleaned) {
            Some(num) => match (num.parse::<f64>(), precision) {
                (Ok(value), Some(_)) => Some(format_measurement(value, precision)),
                _ => Some(num.to_string()),
            },
            None if cleaned.is_empty() => None,
            None => Some(cleaned),
        };
    }

    if field == FieldName::ElementNumber {
        return DIGIT_RUN
            .captures(raw)
            .map(|caps| caps[1].to_string())
            .or_else(|| Some(raw.to_string()));
    }

    Some(raw.to_string())
}
