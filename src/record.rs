//! Vehicle record document model.
//!
//! A [`VehicleReport`] is the output of extraction: the registration
//! identifier plus whatever fields the report page actually yielded. Every
//! field besides the identifier is optional, and optional groups are only
//! attached when at least one of their sub-fields was found, so a serialized
//! record never carries empty `{}` placeholders.
//!
//! A [`VehicleRecord`] is a report as the store returns it, stamped with the
//! time it was last written. Only the store constructs records; extraction
//! stays timestamp-free so the same markup always yields the same document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance marker written into every record.
pub const DATA_SOURCE: &str = "checkcardetails";

/// Canonical form of a registration identifier: uppercase with all
/// whitespace removed, so `"ab12 cde"` and `"AB12CDE"` address the same
/// stored record.
pub fn normalize_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

// ── Report document ─────────────────────────────────────────────────────────

/// Fields extracted from a single vendor report page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleReport {
    /// Normalized registration identifier the caller asked about. Always the
    /// requested identifier, never a plate scraped off the page.
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacture_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<Performance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<Engine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_consumption: Option<FuelConsumption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissions: Option<Emissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mot_status: Option<MotStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_status: Option<TaxStatus>,
    /// Which upstream source this report came from.
    pub data_source: String,
    /// Date printed on the report page itself, kept as scraped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
}

impl VehicleReport {
    /// An empty report for `identifier`. Extraction fills in whatever the
    /// page offers; a page that yields nothing leaves the report like this.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            make: None,
            model: None,
            colour: None,
            manufacture_year: None,
            performance: None,
            engine: None,
            fuel_consumption: None,
            emissions: None,
            mot_status: None,
            tax_status: None,
            data_source: DATA_SOURCE.to_string(),
            report_date: None,
        }
    }

    /// How many data fields were actually populated, counting each group
    /// sub-field individually. Used for log lines and nothing else.
    pub fn field_count(&self) -> usize {
        let mut n = 0;
        n += usize::from(self.make.is_some());
        n += usize::from(self.model.is_some());
        n += usize::from(self.colour.is_some());
        n += usize::from(self.manufacture_year.is_some());
        n += usize::from(self.report_date.is_some());
        if let Some(p) = &self.performance {
            n += usize::from(p.top_speed_mph.is_some());
            n += usize::from(p.zero_to_sixty_seconds.is_some());
            n += usize::from(p.gearbox_type.is_some());
        }
        if let Some(e) = &self.engine {
            n += usize::from(e.power_bhp.is_some());
            n += usize::from(e.capacity_cc.is_some());
            n += usize::from(e.cylinder_count.is_some());
            n += usize::from(e.fuel_type.is_some());
        }
        if let Some(f) = &self.fuel_consumption {
            n += usize::from(f.city_mpg.is_some());
            n += usize::from(f.extra_urban_mpg.is_some());
            n += usize::from(f.combined_mpg.is_some());
        }
        if let Some(e) = &self.emissions {
            n += usize::from(e.co2_grams_per_km.is_some());
            n += usize::from(e.co2_label.is_some());
        }
        if let Some(m) = &self.mot_status {
            n += usize::from(m.expiry_date.is_some());
            n += usize::from(m.pass_rate_percent.is_some());
        }
        if let Some(t) = &self.tax_status {
            n += usize::from(t.status.is_some());
            n += usize::from(t.due_date.is_some());
            n += usize::from(t.annual_cost.is_some());
        }
        n
    }
}

// ── Optional field groups ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_speed_mph: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_to_sixty_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gearbox_type: Option<String>,
}

impl Performance {
    pub fn is_empty(&self) -> bool {
        self.top_speed_mph.is_none()
            && self.zero_to_sixty_seconds.is_none()
            && self.gearbox_type.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_bhp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_cc: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cylinder_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
}

impl Engine {
    pub fn is_empty(&self) -> bool {
        self.power_bhp.is_none()
            && self.capacity_cc.is_none()
            && self.cylinder_count.is_none()
            && self.fuel_type.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelConsumption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_mpg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_urban_mpg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_mpg: Option<f64>,
}

impl FuelConsumption {
    pub fn is_empty(&self) -> bool {
        self.city_mpg.is_none() && self.extra_urban_mpg.is_none() && self.combined_mpg.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emissions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2_grams_per_km: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2_label: Option<String>,
}

impl Emissions {
    pub fn is_empty(&self) -> bool {
        self.co2_grams_per_km.is_none() && self.co2_label.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotStatus {
    /// Expiry date as printed on the page, not reparsed into a date type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_rate_percent: Option<f64>,
}

impl MotStatus {
    pub fn is_empty(&self) -> bool {
        self.expiry_date.is_none() && self.pass_rate_percent.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_cost: Option<f64>,
}

impl TaxStatus {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.due_date.is_none() && self.annual_cost.is_none()
    }
}

// ── Stored record ───────────────────────────────────────────────────────────

/// A report as persisted: the extracted document plus the write timestamp
/// the freshness window is measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    #[serde(flatten)]
    pub report: VehicleReport,
    pub last_updated: DateTime<Utc>,
}
