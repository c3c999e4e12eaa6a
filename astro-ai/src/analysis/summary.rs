//! Morphology text and the persisted report

use super::measure::Measurements;
use serde_json::{Map, Value};

/// One-sentence description of the measured structure
pub fn summarize(m: &Measurements) -> String {
    format!(
        "Detected galaxy-like structure with area ~{:.0} pixels, ellipticity {:.2}, and mean intensity {:.2}.",
        m.area_pixels, m.ellipticity, m.mean_intensity
    )
}

/// Plain-text report stored as `report.txt`
pub fn build_report(request_id: &str, summary: &str, results: &Map<String, Value>) -> String {
    let results = serde_json::to_string_pretty(results).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Galaxy Analysis Report\nrequest_id: {}\nsummary: {}\nresults: {}\n",
        request_id, summary, results
    )
}
