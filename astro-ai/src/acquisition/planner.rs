//! Attempt planning
//!
//! Pure function of the hints; no I/O. Bands are validated here so an
//! unmapped band fails before any network call.

use super::{survey_for_band, AcquisitionAttempt, FAST_PATH_CATALOG};
use crate::types::PipelineResult;

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Ordered, non-empty attempt list
///
/// 1. catalog hint → that catalog only (no fallback)
/// 2. visible/optical band → fast-path catalog, then the band's survey
/// 3. other band → the band's survey
/// 4. nothing → fast-path catalog
pub fn plan_attempts(
    catalog: Option<&str>,
    band: Option<&str>,
) -> PipelineResult<Vec<AcquisitionAttempt>> {
    if let Some(catalog) = non_blank(catalog) {
        return Ok(vec![AcquisitionAttempt::Catalog(catalog.to_string())]);
    }

    let Some(band) = non_blank(band) else {
        return Ok(vec![AcquisitionAttempt::Catalog(FAST_PATH_CATALOG.to_string())]);
    };

    let survey = survey_for_band(band)?;
    if survey == "DSS" {
        Ok(vec![
            AcquisitionAttempt::Catalog(FAST_PATH_CATALOG.to_string()),
            AcquisitionAttempt::Band(band.to_string()),
        ])
    } else {
        Ok(vec![AcquisitionAttempt::Band(band.to_string())])
    }
}
