//! Value formatting for stamped text and output filenames

use crate::{ApplicantRecord, FormsError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use std::fmt::Write;

/// Check that a strftime pattern can format a calendar date
///
/// Rejects invalid specifiers and time specifiers such as `%H`
/// that a `NaiveDate` cannot supply.
pub fn check_date_format(pattern: &str) -> Result<()> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(FormsError::Registry(format!(
            "invalid date format {pattern:?}"
        )));
    }
    format_date(NaiveDate::MIN, pattern).map(|_| ())
}

/// Format a date with a strftime pattern, e.g. `%B %-d, %Y` -> "July 1, 2025"
pub fn format_date(date: NaiveDate, pattern: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(pattern)).map_err(|_| {
        FormsError::Registry(format!("invalid date format {pattern:?}"))
    })?;
    Ok(out)
}

/// Whole amount with thousands separators, e.g. 3500 -> "3,500"
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Expand an output filename pattern
///
/// Placeholders: `{code}`, `{studentNumber}`, `{studentName}`. Substituted
/// values have path separators replaced with `_`.
pub fn render_filename(pattern: &str, code: &str, record: &ApplicantRecord) -> String {
    pattern
        .replace("{code}", &sanitize(code))
        .replace("{studentNumber}", &sanitize(&record.filename_student_number))
        .replace("{studentName}", &sanitize(&record.filename_student_name))
}

fn sanitize(value: &str) -> String {
    value.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApplicantForm;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        assert_eq!(format_date(date, "%B %-d, %Y").unwrap(), "July 1, 2025");
        assert_eq!(format_date(date, "%m/%d/%Y").unwrap(), "07/01/2025");
    }

    #[test]
    fn test_check_date_format() {
        assert!(check_date_format("%B %-d, %Y").is_ok());
        assert!(check_date_format("%d/%m/%Y").is_ok());
        assert!(check_date_format("%Q").is_err());
        assert!(check_date_format("%H:%M").is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(3500), "3,500");
        assert_eq!(format_amount(1234567), "1,234,567");
    }

    #[test]
    fn test_render_filename_placeholders() {
        let record = ApplicantForm::new().finalize().unwrap();
        assert_eq!(
            render_filename("{code}_{studentNumber}_{studentName}.pdf", "ADF", &record),
            "ADF_1234_Sample.pdf"
        );
    }

    #[test]
    fn test_render_filename_replaces_separators() {
        let mut form = ApplicantForm::new();
        form.set_field("studentNumber", "2021/12345").unwrap();
        form.set_field("studentFirstName", "Ana").unwrap();
        form.set_field("studentLastName", "Reyes\\Cruz").unwrap();
        let record = form.finalize().unwrap();

        assert_eq!(
            render_filename("{code}_{studentNumber}_{studentName}.pdf", "RA", &record),
            "RA_2021_12345_Ana Reyes_Cruz.pdf"
        );
    }
}
