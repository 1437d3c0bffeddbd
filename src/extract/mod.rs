//! Structured extraction of vehicle data from report page markup.
//!
//! ## How extraction works
//!
//! The page is parsed once, every table row is indexed as label/value cell
//! pairs, and each canonical field is resolved through the synonym tables in
//! [`rules`]. Make and model additionally fall back to the page title and
//! the meta description when no table row matches. Extraction is
//! best-effort: any subset of fields may be missing and the result is still
//! a usable report, down to one that carries only the identifier.
//!
//! Parsing never touches the network and holds no parser state across
//! function boundaries, so the same markup and identifier always produce
//! the same report.

mod rules;

use scraper::Html;
use thiserror::Error;

use crate::record::{
    Emissions, Engine, FuelConsumption, MotStatus, Performance, TaxStatus, VehicleReport,
};

/// Markup that cannot even be attempted. Structural oddities inside
/// otherwise-HTML input are not errors; the parser recovers from those and
/// extraction simply finds fewer fields.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("report body is empty")]
    EmptyBody,
    #[error("report body does not look like HTML markup")]
    NotHtml,
}

/// Extract a [`VehicleReport`] for `identifier` from `html`.
///
/// The returned report always carries the requested identifier, regardless
/// of any registration printed on the page itself.
pub fn extract_report(html: &str, identifier: &str) -> Result<VehicleReport, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::EmptyBody);
    }
    if !html.contains('<') {
        return Err(ExtractError::NotHtml);
    }

    let doc = Html::parse_document(html);
    let tables = rules::TableIndex::build(&doc);
    let mut report = VehicleReport::new(identifier);

    report.make = tables.value_for(rules::MAKE_LABELS);
    report.model = tables.value_for(rules::MODEL_LABELS);
    report.colour = tables.value_for(rules::COLOUR_LABELS);
    report.manufacture_year = tables
        .value_for(rules::YEAR_LABELS)
        .as_deref()
        .and_then(rules::first_int)
        .and_then(|y| i32::try_from(y).ok());
    report.report_date = tables.value_for(rules::REPORT_DATE_LABELS);

    // Title and description fallbacks only fill gaps the tables left.
    if report.make.is_none() || report.model.is_none() {
        if let Some(title) = rules::page_title(&doc) {
            let (make, model) = rules::make_model_from_title(&title, identifier);
            if report.make.is_none() {
                report.make = make;
            }
            if report.model.is_none() {
                report.model = model;
            }
        }
    }
    if report.make.is_none() || report.model.is_none() {
        if let Some(description) = rules::meta_description(&doc) {
            if report.make.is_none() {
                report.make = rules::make_from_description(&description);
            }
            if report.model.is_none() {
                report.model = rules::model_from_description(&description);
            }
        }
    }

    let performance = Performance {
        top_speed_mph: int_field(&tables, rules::TOP_SPEED_LABELS),
        zero_to_sixty_seconds: number_field(&tables, rules::ZERO_TO_SIXTY_LABELS),
        gearbox_type: tables.value_for(rules::GEARBOX_LABELS),
    };
    if !performance.is_empty() {
        report.performance = Some(performance);
    }

    let engine = Engine {
        power_bhp: number_field(&tables, rules::POWER_LABELS),
        capacity_cc: int_field(&tables, rules::CAPACITY_LABELS),
        cylinder_count: int_field(&tables, rules::CYLINDER_LABELS),
        fuel_type: tables.value_for(rules::FUEL_TYPE_LABELS),
    };
    if !engine.is_empty() {
        report.engine = Some(engine);
    }

    let fuel_consumption = FuelConsumption {
        city_mpg: number_field(&tables, rules::CITY_MPG_LABELS),
        extra_urban_mpg: number_field(&tables, rules::EXTRA_URBAN_MPG_LABELS),
        combined_mpg: number_field(&tables, rules::COMBINED_MPG_LABELS),
    };
    if !fuel_consumption.is_empty() {
        report.fuel_consumption = Some(fuel_consumption);
    }

    let emissions = Emissions {
        co2_grams_per_km: int_field(&tables, rules::CO2_LABELS),
        co2_label: tables.value_for(rules::CO2_LABEL_LABELS),
    };
    if !emissions.is_empty() {
        report.emissions = Some(emissions);
    }

    let mot_status = MotStatus {
        expiry_date: tables.value_for(rules::MOT_EXPIRY_LABELS),
        pass_rate_percent: number_field(&tables, rules::MOT_PASS_RATE_LABELS),
    };
    if !mot_status.is_empty() {
        report.mot_status = Some(mot_status);
    }

    let tax_status = TaxStatus {
        status: tables.value_for(rules::TAX_STATUS_LABELS),
        due_date: tables.value_for(rules::TAX_DUE_LABELS),
        annual_cost: number_field(&tables, rules::TAX_COST_LABELS),
    };
    if !tax_status.is_empty() {
        report.tax_status = Some(tax_status);
    }

    Ok(report)
}

fn number_field(tables: &rules::TableIndex, labels: &[&str]) -> Option<f64> {
    tables.value_for(labels).as_deref().and_then(rules::first_number)
}

fn int_field(tables: &rules::TableIndex, labels: &[&str]) -> Option<u32> {
    tables
        .value_for(labels)
        .as_deref()
        .and_then(rules::first_int)
        .and_then(|v| u32::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPORT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>HONDA CIVIC | AB12 CDE | Free Car Check</title>
  <meta name="description" content="Make: HONDA, Model: CIVIC. Free vehicle report.">
</head>
<body>
  <h1>Vehicle Report</h1>
  <table>
    <tr><th>Make</th><td>HONDA</td></tr>
    <tr><th>Model</th><td>CIVIC</td></tr>
    <tr><th>Colour</th><td>Blue</td></tr>
    <tr><th>Year of manufacture</th><td>2019</td></tr>
    <tr><th>Fuel type</th><td>Petrol</td></tr>
  </table>
  <table>
    <tr><td>Top speed</td><td>137 mph</td></tr>
    <tr><td>0 - 60 mph</td><td>7.9 secs</td></tr>
    <tr><td>Gearbox</td><td>6 speed Manual</td></tr>
    <tr><td>Power</td><td>180 BHP</td></tr>
    <tr><td>Engine capacity</td><td>1,998 cc</td></tr>
    <tr><td>Cylinders</td><td>4</td></tr>
  </table>
  <table>
    <tr><td>City driving</td><td>35.3 mpg</td></tr>
    <tr><td>Extra urban driving</td><td>50.4 mpg</td></tr>
    <tr><td>Combined driving</td><td>42.8 mpg</td></tr>
    <tr><td>CO2 emissions</td><td>150 g/km</td></tr>
    <tr><td>CO2 label</td><td>F</td></tr>
  </table>
  <table>
    <tr><td>MOT expiry date</td><td>12 March 2027</td></tr>
    <tr><td>MOT pass rate</td><td>74.3%</td></tr>
    <tr><td>Tax status</td><td>Taxed</td></tr>
    <tr><td>Tax due date</td><td>1 October 2026</td></tr>
    <tr><td>12 month tax</td><td>£180.00</td></tr>
    <tr><td>Report date</td><td>26 August 2026</td></tr>
  </table>
</body>
</html>"#;

    #[test]
    fn test_extracts_every_field_group_from_a_full_page() {
        let report = extract_report(FULL_REPORT_PAGE, "AB12CDE").unwrap();

        assert_eq!(report.identifier, "AB12CDE");
        assert_eq!(report.make.as_deref(), Some("HONDA"));
        assert_eq!(report.model.as_deref(), Some("CIVIC"));
        assert_eq!(report.colour.as_deref(), Some("Blue"));
        assert_eq!(report.manufacture_year, Some(2019));
        assert_eq!(report.report_date.as_deref(), Some("26 August 2026"));

        let performance = report.performance.unwrap();
        assert_eq!(performance.top_speed_mph, Some(137));
        assert_eq!(performance.zero_to_sixty_seconds, Some(7.9));
        assert_eq!(performance.gearbox_type.as_deref(), Some("6 speed Manual"));

        let engine = report.engine.unwrap();
        assert_eq!(engine.power_bhp, Some(180.0));
        assert_eq!(engine.capacity_cc, Some(1998));
        assert_eq!(engine.cylinder_count, Some(4));
        assert_eq!(engine.fuel_type.as_deref(), Some("Petrol"));

        let fuel = report.fuel_consumption.unwrap();
        assert_eq!(fuel.city_mpg, Some(35.3));
        assert_eq!(fuel.extra_urban_mpg, Some(50.4));
        assert_eq!(fuel.combined_mpg, Some(42.8));

        let emissions = report.emissions.unwrap();
        assert_eq!(emissions.co2_grams_per_km, Some(150));
        assert_eq!(emissions.co2_label.as_deref(), Some("F"));

        let mot = report.mot_status.unwrap();
        assert_eq!(mot.expiry_date.as_deref(), Some("12 March 2027"));
        assert_eq!(mot.pass_rate_percent, Some(74.3));

        let tax = report.tax_status.unwrap();
        assert_eq!(tax.status.as_deref(), Some("Taxed"));
        assert_eq!(tax.due_date.as_deref(), Some("1 October 2026"));
        assert_eq!(tax.annual_cost, Some(180.0));
    }

    #[test]
    fn test_partial_page_yields_partial_report() {
        let html = r#"<html><body><table>
            <tr><td>Make</td><td>Honda</td></tr>
            <tr><td>Year of manufacture</td><td>2019</td></tr>
        </table></body></html>"#;
        let report = extract_report(html, "AB12CDE").unwrap();

        assert_eq!(report.make.as_deref(), Some("Honda"));
        assert_eq!(report.manufacture_year, Some(2019));
        assert_eq!(report.model, None);
        assert!(report.performance.is_none());
        assert!(report.engine.is_none());
        assert!(report.mot_status.is_none());
    }

    #[test]
    fn test_page_without_tables_yields_identifier_only() {
        let html = "<html><body><p>Nothing here.</p></body></html>";
        let report = extract_report(html, "AB12CDE").unwrap();

        assert_eq!(report.identifier, "AB12CDE");
        assert_eq!(report.field_count(), 0);
        assert_eq!(report.data_source, crate::record::DATA_SOURCE);
    }

    #[test]
    fn test_requested_identifier_wins_over_page_registration() {
        let html = r#"<html><body><table>
            <tr><td>Registration</td><td>ZZ99ZZZ</td></tr>
            <tr><td>Make</td><td>Ford</td></tr>
        </table></body></html>"#;
        let report = extract_report(html, "AB12CDE").unwrap();

        assert_eq!(report.identifier, "AB12CDE");
        assert_eq!(report.make.as_deref(), Some("Ford"));
    }

    #[test]
    fn test_title_fallback_fills_missing_make_and_model() {
        let html = r#"<html><head>
            <title>VAUXHALL CORSA | AB12 CDE | Free Car Check</title>
        </head><body><table>
            <tr><td>Colour</td><td>Silver</td></tr>
        </table></body></html>"#;
        let report = extract_report(html, "AB12CDE").unwrap();

        assert_eq!(report.make.as_deref(), Some("VAUXHALL"));
        assert_eq!(report.model.as_deref(), Some("CORSA"));
        assert_eq!(report.colour.as_deref(), Some("Silver"));
    }

    #[test]
    fn test_table_value_beats_title_fallback() {
        let html = r#"<html><head>
            <title>FORD FIESTA | AB12 CDE</title>
        </head><body><table>
            <tr><td>Make</td><td>VAUXHALL</td></tr>
        </table></body></html>"#;
        let report = extract_report(html, "AB12CDE").unwrap();

        assert_eq!(report.make.as_deref(), Some("VAUXHALL"));
        // Model still comes from the title because no table row offered one.
        assert_eq!(report.model.as_deref(), Some("FIESTA"));
    }

    #[test]
    fn test_meta_description_fallback_when_title_is_useless() {
        let html = r#"<html><head>
            <title>Free Car Check</title>
            <meta name="description" content="Make: SKODA, Model: OCTAVIA, Colour: Grey">
        </head><body></body></html>"#;
        let report = extract_report(html, "AB12CDE").unwrap();

        assert_eq!(report.make.as_deref(), Some("SKODA"));
        assert_eq!(report.model.as_deref(), Some("OCTAVIA"));
    }

    #[test]
    fn test_unparsable_numbers_leave_fields_absent() {
        let html = r#"<html><body><table>
            <tr><td>Top speed</td><td>N/A</td></tr>
            <tr><td>Gearbox</td><td>Automatic</td></tr>
            <tr><td>CO2 emissions</td><td>unknown</td></tr>
        </table></body></html>"#;
        let report = extract_report(html, "AB12CDE").unwrap();

        let performance = report.performance.unwrap();
        assert_eq!(performance.top_speed_mph, None);
        assert_eq!(performance.gearbox_type.as_deref(), Some("Automatic"));
        // No parsable sub-field at all means the group is dropped entirely.
        assert!(report.emissions.is_none());
    }

    #[test]
    fn test_annotated_numbers_parse_to_leading_value() {
        let html = r#"<html><body><table>
            <tr><td>Top speed</td><td>250 km/h (claimed)</td></tr>
        </table></body></html>"#;
        let report = extract_report(html, "AB12CDE").unwrap();

        assert_eq!(report.performance.unwrap().top_speed_mph, Some(250));
    }

    #[test]
    fn test_malformed_markup_still_extracts() {
        let html = r#"<html><body><table>
            <tr><td>Make<td>Honda
            <tr><td>Colour</td><td>Red"#;
        let report = extract_report(html, "AB12CDE").unwrap();

        assert_eq!(report.make.as_deref(), Some("Honda"));
        assert_eq!(report.colour.as_deref(), Some("Red"));
    }

    #[test]
    fn test_empty_body_is_rejected() {
        assert!(matches!(
            extract_report("", "AB12CDE"),
            Err(ExtractError::EmptyBody)
        ));
        assert!(matches!(
            extract_report("   \n  ", "AB12CDE"),
            Err(ExtractError::EmptyBody)
        ));
    }

    #[test]
    fn test_non_markup_body_is_rejected() {
        assert!(matches!(
            extract_report("plain text, no markup at all", "AB12CDE"),
            Err(ExtractError::NotHtml)
        ));
    }

    #[test]
    fn test_same_markup_always_yields_identical_reports() {
        let first = extract_report(FULL_REPORT_PAGE, "AB12CDE").unwrap();
        let second = extract_report(FULL_REPORT_PAGE, "AB12CDE").unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
