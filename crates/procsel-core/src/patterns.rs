//! Common regex patterns for field parsing.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Numeric cleanup (values use ',' or '.' as decimal separator)
    pub static ref TRAILING_NOISE: Regex = Regex::new(r"[^\d.\s-]*$").unwrap();

    pub static ref LEADING_NOISE: Regex = Regex::new(r"^[^\d-]*").unwrap();

    pub static ref SIGNED_DECIMAL: Regex = Regex::new(r"(-?\d+(?:\.\d+)?)").unwrap();

    pub static ref DIGIT_RUN: Regex = Regex::new(r"(\d+)").unwrap();

    // Panel labels, tolerant to the recognizer's usual misreads
    pub static ref ELEMENT_TYPE: Regex = Regex::new(
        r"(?i).*Elementtyp\s*[:.\-–\s|]*([^\n]+)"
    ).unwrap();

    pub static ref ELEMENT_NUMBER: Regex = Regex::new(
        r"(?i).*Elementnummer\s*[:.\-–\s|]*(\d+)"
    ).unwrap();

    pub static ref DEPTH: Regex = Regex::new(
        r"(?i).*Tiefe\s*[:.\-–\s|]*,?\s*([^\n]+)"
    ).unwrap();

    pub static ref DIAMETER: Regex = Regex::new(
        r"(?i)^(?:[^\S\n]*(?:Durchmesser|Duahmaser|Duchmesser|Durchmeser|Bohezurchmaser|Durngangg|Boden))\s*[:.\-–\s|]*([^\n]+)"
    ).unwrap();

    pub static ref BBOX_WIDTH: Regex = Regex::new(
        r"(?i).*Begrenzungsbox\s+Breite\s*[:.\-–\s|]*([^\n]+)"
    ).unwrap();

    pub static ref BBOX_LENGTH: Regex = Regex::new(
        r"(?i).*Begrenzungsbox\s+Länge\s*[:.\-–\s|]*([^\n]+)"
    ).unwrap();

    pub static ref FEATURE_TYPE: Regex = Regex::new(
        r"(?i).*(?:F?eature|Festure|Feauture|Fenture)[-\s]*Typ\s*[:.\-–\s|]*([^\n]+)"
    ).unwrap();

    pub static ref NAME: Regex = Regex::new(
        r"(?i).*Name\s*[:.\-–\s|]*([^\n]+)"
    ).unwrap();

    pub static ref SMALLEST_RADIUS: Regex = Regex::new(
        r"(?i).*Kleinster\s+Radius\s*[:.\-–\s|]*([^\n]+)"
    ).unwrap();

    pub static ref CHAMFER_DIAMETER: Regex = Regex::new(
        r"(?i).*Fasen\s*durchmesser\s*[:.\-–\s|]*([^\n]+)"
    ).unwrap();

    pub static ref BORE_DIAMETER: Regex = Regex::new(
        r"(?i).*Bohr\s*durchmesser\s*[:.\-–\s|]*([^\n]+)"
    ).unwrap();
}
