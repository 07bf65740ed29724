//! Numeric normalization of recognized field values.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ExtractedFields, FieldName};
use crate::patterns::{LEADING_NOISE, SIGNED_DECIMAL, TRAILING_NOISE};

/// A numeric quantity a rule can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Diameter,
    Depth,
    BboxWidth,
    BboxLength,
    SmallestRadius,
    ChamferDiameter,
    BoreDiameter,
}

impl Measure {
    pub const ALL: [Measure; 7] = [
        Measure::Diameter,
        Measure::Depth,
        Measure::BboxWidth,
        Measure::BboxLength,
        Measure::SmallestRadius,
        Measure::ChamferDiameter,
        Measure::BoreDiameter,
    ];

    /// The field this measure is read from.
    pub fn field(self) -> FieldName {
        match self {
            Measure::Diameter => FieldName::Diameter,
            Measure::Depth => FieldName::Depth,
            Measure::BboxWidth => FieldName::BboxWidth,
            Measure::BboxLength => FieldName::BboxLength,
            Measure::SmallestRadius => FieldName::SmallestRadius,
            Measure::ChamferDiameter => FieldName::ChamferDiameter,
            Measure::BoreDiameter => FieldName::BoreDiameter,
        }
    }

    pub fn from_field(field: FieldName) -> Option<Self> {
        Measure::ALL.into_iter().find(|m| m.field() == field)
    }
}

/// Parsed numeric view of the extracted fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub diameter: Option<f64>,
    pub depth: Option<f64>,
    pub bbox_width: Option<f64>,
    pub bbox_length: Option<f64>,
    pub smallest_radius: Option<f64>,
    pub chamfer_diameter: Option<f64>,
    pub bore_diameter: Option<f64>,
}

impl Measurements {
    /// Parse every numeric field independently.
    ///
    /// Unparsable values are logged and treated as missing.
    pub fn from_fields(fields: &ExtractedFields) -> Self {
        let mut measurements = Measurements::default();

        for measure in Measure::ALL {
            let field = measure.field();
            let Some(raw) = fields.get(field) else {
                continue;
            };

            let value = parse_numeric(raw);
            if value.is_none() && !raw.trim().is_empty() {
                warn!("Could not convert {} '{}' to a number", field, raw);
            }
            measurements.set(measure, value);
        }

        measurements
    }

    pub fn get(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::Diameter => self.diameter,
            Measure::Depth => self.depth,
            Measure::BboxWidth => self.bbox_width,
            Measure::BboxLength => self.bbox_length,
            Measure::SmallestRadius => self.smallest_radius,
            Measure::ChamferDiameter => self.chamfer_diameter,
            Measure::BoreDiameter => self.bore_diameter,
        }
    }

    pub fn set(&mut self, measure: Measure, value: Option<f64>) {
        let slot = match measure {
            Measure::Diameter => &mut self.diameter,
            Measure::Depth => &mut self.depth,
            Measure::BboxWidth => &mut self.bbox_width,
            Measure::BboxLength => &mut self.bbox_length,
            Measure::SmallestRadius => &mut self.smallest_radius,
            Measure::ChamferDiameter => &mut self.chamfer_diameter,
            Measure::BoreDiameter => &mut self.bore_diameter,
        };
        *slot = value;
    }

    /// Builder-style setter, mostly for tests.
    pub fn with(mut self, measure: Measure, value: f64) -> Self {
        self.set(measure, Some(value));
        self
    }
}

/// Parse a noisy recognized number (e.g. "9,500000", "Ø 12.3 mm").
///
/// Returns `None` for empty input or when no number can be found.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned = clean_numeric(raw);
    number_text(&cleaned).and_then(|s| s.parse::<f64>().ok())
}

/// Normalize the decimal separator and strip leading/trailing noise.
pub(crate) fn clean_numeric(raw: &str) -> String {
    let cleaned = raw.replace(',', ".");
    let cleaned = TRAILING_NOISE.replace(cleaned.trim(), "");
    let cleaned = LEADING_NOISE.replace(cleaned.trim(), "");
    cleaned.trim().to_string()
}

/// First signed decimal in an already cleaned string.
pub(crate) fn number_text(cleaned: &str) -> Option<&str> {
    SIGNED_DECIMAL
        .captures(cleaned)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Render a value the way the field parser stores it.
///
/// `None` keeps the shortest representation.
pub fn format_measurement(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(p) => format!("{:.*}", p, value),
        None => value.to_string(),
    }
}
