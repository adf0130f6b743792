use crate::MonthlySeries;
use chrono::NaiveDate;

/// Parses a FEC monetary field. Amounts arrive as strings and frequently use
/// the French comma decimal separator ("1234,56"). Malformed or absent
/// values degrade to 0.0 rather than failing the batch.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Derives a "YYYY-MM" month key from a FEC `YYYYMMDD` date string.
/// Dates shorter than six characters yield an empty key; callers exclude
/// those entries from monthly buckets while still counting them in totals.
pub fn month_key(ecriture_date: &str) -> String {
    let trimmed = ecriture_date.trim();
    match (trimmed.get(..4), trimmed.get(4..6)) {
        (Some(year), Some(month)) => format!("{}-{}", year, month),
        _ => String::new(),
    }
}

/// Parses a FEC `YYYYMMDD` date into a calendar date, when it is one.
pub fn parse_entry_date(ecriture_date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(ecriture_date.trim(), "%Y%m%d").ok()
}

/// Replaces each month's value with the running sum over sorted month keys.
/// This is the stock-account transform: a balance as of each month rather
/// than the movement within it.
pub fn cumulative(series: &MonthlySeries) -> MonthlySeries {
    let mut running = 0.0;
    series
        .iter()
        .map(|(month, value)| {
            running += value;
            (month.clone(), running)
        })
        .collect()
}

/// Adds every bucket of `source` into `target`, creating months as needed.
pub fn add_series(target: &mut MonthlySeries, source: &MonthlySeries) {
    for (month, value) in source {
        *target.entry(month.clone()).or_default() += value;
    }
}
