//! Field lookup rules for vendor report pages.
//!
//! The report pages lay most data out as label/value table rows. The rules
//! here are ordered synonym lists per canonical field, matched against
//! header cells case-insensitively, plus the fallback helpers (page title,
//! meta description) used when a field has no table row at all.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

// ── Header synonyms ─────────────────────────────────────────────────────────
//
// Listed in priority order. Matching is case-insensitive on the trimmed
// header text with any trailing colon removed.

pub(crate) const MAKE_LABELS: &[&str] = &["make", "manufacturer"];
pub(crate) const MODEL_LABELS: &[&str] = &["model", "model variant"];
pub(crate) const COLOUR_LABELS: &[&str] = &["colour", "color"];
pub(crate) const YEAR_LABELS: &[&str] = &["year of manufacture", "manufacture year", "year"];

pub(crate) const TOP_SPEED_LABELS: &[&str] = &["top speed"];
pub(crate) const ZERO_TO_SIXTY_LABELS: &[&str] = &["0 - 60 mph", "0-60 mph", "0 to 60 mph"];
pub(crate) const GEARBOX_LABELS: &[&str] = &["gearbox", "transmission"];

pub(crate) const POWER_LABELS: &[&str] = &["power", "engine power", "power output"];
pub(crate) const CAPACITY_LABELS: &[&str] =
    &["engine capacity", "cylinder capacity", "engine size", "capacity"];
pub(crate) const CYLINDER_LABELS: &[&str] = &["cylinders", "number of cylinders"];
pub(crate) const FUEL_TYPE_LABELS: &[&str] = &["fuel type", "fuel"];

pub(crate) const CITY_MPG_LABELS: &[&str] = &["city driving", "urban driving", "urban"];
pub(crate) const EXTRA_URBAN_MPG_LABELS: &[&str] = &["extra urban driving", "extra urban"];
pub(crate) const COMBINED_MPG_LABELS: &[&str] = &["combined driving", "combined"];

pub(crate) const CO2_LABELS: &[&str] = &["co2 emissions", "co2 output", "co2"];
pub(crate) const CO2_LABEL_LABELS: &[&str] = &["co2 label", "co2 band", "emission band"];

pub(crate) const MOT_EXPIRY_LABELS: &[&str] = &["mot expiry date", "mot expiry", "expiry date"];
pub(crate) const MOT_PASS_RATE_LABELS: &[&str] = &["mot pass rate", "pass rate"];

pub(crate) const TAX_STATUS_LABELS: &[&str] = &["tax status", "taxed"];
pub(crate) const TAX_DUE_LABELS: &[&str] = &["tax due date", "tax due", "due date"];
pub(crate) const TAX_COST_LABELS: &[&str] =
    &["12 month tax", "12 months tax", "annual tax", "tax 12 months"];

pub(crate) const REPORT_DATE_LABELS: &[&str] = &["report date", "date of report"];

// ── Table index ─────────────────────────────────────────────────────────────

/// Every table row in the document reduced to its cell texts, in document
/// order. Built once per page so each field lookup is a scan over strings
/// rather than a fresh DOM walk.
pub(crate) struct TableIndex {
    rows: Vec<Vec<String>>,
}

impl TableIndex {
    pub(crate) fn build(doc: &Html) -> Self {
        let table_sel = Selector::parse("table").unwrap();
        let row_sel = Selector::parse("tr").unwrap();
        let cell_sel = Selector::parse("th, td").unwrap();

        let mut rows = Vec::new();
        for table in doc.select(&table_sel) {
            for row in table.select(&row_sel) {
                let cells: Vec<String> = row.select(&cell_sel).map(element_text).collect();
                if cells.len() >= 2 {
                    rows.push(cells);
                }
            }
        }
        Self { rows }
    }

    /// Value of the first cell that follows a header cell matching any of
    /// `labels`. Rows with more than two cells are scanned pairwise, so
    /// `Label | Value | Label | Value` layouts work too. Empty values are
    /// treated as not found.
    pub(crate) fn value_for(&self, labels: &[&str]) -> Option<String> {
        for row in &self.rows {
            for pair in row.windows(2) {
                let header = normalize_label(&pair[0]);
                if labels.iter().any(|l| header == *l) {
                    let value = pair[1].trim();
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
        None
    }
}

/// Header text reduced to comparison form: trimmed, lowercased, trailing
/// colon dropped.
fn normalize_label(text: &str) -> String {
    text.trim().trim_end_matches(':').trim().to_lowercase()
}

/// Visible text of an element with all whitespace collapsed to single spaces.
pub(crate) fn element_text(el: ElementRef) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Numeric parsing ─────────────────────────────────────────────────────────

/// First run of digits in `text`, with an optional decimal part. Thousands
/// separators are stripped first so `"1,998 cc"` parses as 1998, and unit
/// suffixes like `"250 km/h (claimed)"` are ignored. No digits means `None`,
/// never a default of zero.
pub(crate) fn first_number(text: &str) -> Option<f64> {
    let re = Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid");
    let cleaned = text.replace(',', "");
    re.find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Integer form of [`first_number`], truncating any decimal part.
pub(crate) fn first_int(text: &str) -> Option<i64> {
    first_number(text).map(|v| v.trunc() as i64)
}

// ── Page-level fallbacks ────────────────────────────────────────────────────

pub(crate) fn page_title(doc: &Html) -> Option<String> {
    let sel = Selector::parse("title").unwrap();
    let text = doc.select(&sel).next().map(element_text)?;
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

pub(crate) fn meta_description(doc: &Html) -> Option<String> {
    let sel = Selector::parse(r#"meta[name="description"]"#).unwrap();
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Guess make and model from a page title like
/// `"HONDA CIVIC | AB12 CDE | Free Car Check"`. The requested identifier is
/// stripped first, boilerplate segments are skipped, and the first remaining
/// segment is read as `MAKE MODEL...`.
pub(crate) fn make_model_from_title(
    title: &str,
    identifier: &str,
) -> (Option<String>, Option<String>) {
    let cleaned = strip_identifier(title, identifier);
    // Split on pipes and spaced dashes only. A bare hyphen stays put so
    // model names like CR-V survive.
    let segments = cleaned.replace(" - ", "|").replace(" \u{2013} ", "|");

    for segment in segments.split('|') {
        let segment = segment.trim();
        if segment.is_empty() || is_boilerplate_segment(segment) || looks_like_plate(segment) {
            continue;
        }
        let mut tokens = segment.split_whitespace();
        let make = match tokens.next() {
            Some(t) if t.chars().any(|c| c.is_alphabetic()) => t.to_string(),
            _ => continue,
        };
        let model: String = tokens.collect::<Vec<_>>().join(" ");
        let model = if model.is_empty() { None } else { Some(model) };
        return (Some(make), model);
    }
    (None, None)
}

/// Pull a make out of a meta description written in label style, e.g.
/// `"Make: HONDA, Model: CIVIC, Colour: Blue"`.
pub(crate) fn make_from_description(description: &str) -> Option<String> {
    let re = Regex::new(r"(?i)\b(?:make|manufacturer)\s*:\s*([^,.;\n]+)")
        .expect("make pattern is valid");
    re.captures(description)
        .map(|c| c[1].trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn model_from_description(description: &str) -> Option<String> {
    let re = Regex::new(r"(?i)\bmodel\s*:\s*([^,.;\n]+)").expect("model pattern is valid");
    re.captures(description)
        .map(|c| c[1].trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Remove the requested identifier from `text`, matching both the compact
/// form (`AB12CDE`) and the display form with a space before the final three
/// characters (`AB12 CDE`).
fn strip_identifier(text: &str, identifier: &str) -> String {
    if identifier.len() > 3 && identifier.is_ascii() {
        let (prefix, suffix) = identifier.split_at(identifier.len() - 3);
        let pattern = format!(r"(?i){}\s*{}", regex::escape(prefix), regex::escape(suffix));
        let re = Regex::new(&pattern).expect("identifier pattern is valid");
        re.replace_all(text, " ").into_owned()
    } else if identifier.is_empty() {
        text.to_string()
    } else {
        let pattern = format!(r"(?i){}", regex::escape(identifier));
        let re = Regex::new(&pattern).expect("identifier pattern is valid");
        re.replace_all(text, " ").into_owned()
    }
}

fn is_boilerplate_segment(segment: &str) -> bool {
    const NOISE: &[&str] = &[
        "check", "details", "report", "history", "free", "online", "dvla", "gov.uk",
    ];
    let lowered = segment.to_lowercase();
    NOISE.iter().any(|w| lowered.contains(w))
}

/// A segment that reads as a registration plate rather than a vehicle name:
/// short, alphanumeric, and containing at least one digit.
fn looks_like_plate(segment: &str) -> bool {
    let compact: String = segment.chars().filter(|c| !c.is_whitespace()).collect();
    (2..=8).contains(&compact.len())
        && compact.chars().all(|c| c.is_ascii_alphanumeric())
        && compact.chars().any(|c| c.is_ascii_digit())
}
