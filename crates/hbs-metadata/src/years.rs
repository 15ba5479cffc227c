//! Parsing user year selections.

use hbs_model::Year;

use crate::defaults::parse_year_range;
use crate::error::{MetadataError, Result};

/// Parses a year selection against the available years.
///
/// Accepts `all`, `last`, a single year, an inclusive range such as
/// `1390-1395`, or a comma-separated list of years and ranges. The result is
/// sorted and free of duplicates.
pub fn parse_years(spec: &str, available: &[Year]) -> Result<Vec<Year>> {
    let invalid = |message: String| MetadataError::InvalidYears {
        spec: spec.to_string(),
        message,
    };

    let trimmed = spec.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "all" => {
            let mut years = available.to_vec();
            years.sort_unstable();
            years.dedup();
            return Ok(years);
        }
        "last" => {
            return available
                .iter()
                .copied()
                .max()
                .map(|year| vec![year])
                .ok_or_else(|| invalid("no years are available".to_string()));
        }
        "" => return Err(invalid("empty selection".to_string())),
        _ => {}
    }

    let mut years = Vec::new();
    for part in trimmed.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if part.contains('-') {
            years.extend(parse_year_range(part).map_err(invalid)?);
        } else {
            let year = part
                .parse::<Year>()
                .map_err(|_| invalid(format!("'{part}' is not a year")))?;
            years.push(year);
        }
    }
    years.sort_unstable();
    years.dedup();

    if let Some(missing) = years.iter().find(|year| !available.contains(year)) {
        return Err(invalid(format!("year {missing} is not available")));
    }
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> Vec<Year> {
        (1363..=1402).collect()
    }

    #[test]
    fn keywords() {
        assert_eq!(parse_years("all", &available()).unwrap().len(), 40);
        assert_eq!(parse_years("LAST", &available()).unwrap(), vec![1402]);
    }

    #[test]
    fn lists_and_ranges() {
        assert_eq!(
            parse_years("1390-1392, 1380,1391", &available()).unwrap(),
            vec![1380, 1390, 1391, 1392]
        );
        assert_eq!(parse_years(" 1399 ", &available()).unwrap(), vec![1399]);
    }

    #[test]
    fn unavailable_year_is_rejected() {
        let err = parse_years("1350-1365", &available()).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"invalid year selection '1350-1365': year 1350 is not available"
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_years("soon", &available()).is_err());
        assert!(parse_years("", &available()).is_err());
    }
}
