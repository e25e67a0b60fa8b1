//! Data collection period from `collDate` elements.

use cmm_indexer_shared::DataCollectionPeriod;

use crate::xml::Element;

/// Four digit year at the start of a date string, if any.
pub fn leading_year(date: &str) -> Option<i32> {
    let date = date.trim();
    let digits = date.get(..4)?;
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // "20210" is not a year
    if date[4..].chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Build the collection period from `collDate` elements.
///
/// The first `start` (or `single`) and the first `end` event win. A
/// `single` event without an explicit end also closes the period.
pub fn collection_period<'a>(elements: impl IntoIterator<Item = &'a Element>) -> DataCollectionPeriod {
    let mut period = DataCollectionPeriod::default();
    let mut single = None;

    for element in elements {
        let Some(date) = element
            .non_empty_attribute("date")
            .map(str::trim)
            .map(str::to_string)
        else {
            continue;
        };

        match element.attribute("event").map(str::trim) {
            Some("start") if period.start_date.is_none() => period.start_date = Some(date),
            Some("end") if period.end_date.is_none() => period.end_date = Some(date),
            Some("single") if single.is_none() => single = Some(date),
            _ => {}
        }
    }

    if let Some(date) = single {
        if period.start_date.is_none() {
            period.start_date = Some(date.clone());
        }
        if period.end_date.is_none() {
            period.end_date = Some(date);
        }
    }

    period.start_year = period.start_date.as_deref().and_then(leading_year);
    period.end_year = period.end_date.as_deref().and_then(leading_year);
    period
}
