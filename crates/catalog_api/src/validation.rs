//! Form validation and sanitization.
//!
//! A [`Pipeline`] holds an ordered list of fields, each with an ordered list
//! of [`Rule`]s. Every field is checked independently: the first failing
//! rule of a field records one [`FieldError`] and stops that field, then the
//! next field runs. Sanitized values are produced whether or not the field
//! passes, so a failed form can be echoed back safely.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use shared::{
    domain::AuthorFields,
    protocol::{AuthorForm, FieldError, FORM_DATE_FORMAT},
};

pub const FIRST_NAME: &str = "first_name";
pub const FAMILY_NAME: &str = "family_name";
pub const DATE_OF_BIRTH: &str = "date_of_birth";
pub const DATE_OF_DEATH: &str = "date_of_death";

/// Anything raw form values can be read from by field name.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<&str>;
}

impl FieldSource for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Author form exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthorForm {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub date_of_death: Option<String>,
}

impl FieldSource for RawAuthorForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            FIRST_NAME => self.first_name.as_deref(),
            FAMILY_NAME => self.family_name.as_deref(),
            DATE_OF_BIRTH => self.date_of_birth.as_deref(),
            DATE_OF_DEATH => self.date_of_death.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Trimmed value must be non-empty.
    Required,
    /// Escaped value must be ASCII letters and digits only.
    Alphanumeric,
    /// Empty means absent; anything else must be an ISO-8601 date.
    OptionalDate,
}

impl Rule {
    fn message(self, label: &str) -> String {
        match self {
            Rule::Required => format!("{label} must be specified."),
            Rule::Alphanumeric => format!("{label} has non-alphanumeric characters."),
            Rule::OptionalDate => format!("Invalid {}.", label.to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Absent,
    Text(String),
    Date(NaiveDate),
}

impl FieldValue {
    fn echo(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Date(date) => date.format(FORM_DATE_FORMAT).to_string(),
        }
    }
}

/// Sanitized values in field declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedFields {
    values: Vec<(&'static str, FieldValue)>,
}

impl SanitizedFields {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    pub fn text(&self, field: &str) -> String {
        match self.get(field) {
            Some(FieldValue::Text(text)) => text.clone(),
            _ => String::new(),
        }
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        match self.get(field) {
            Some(FieldValue::Date(date)) => Some(*date),
            _ => None,
        }
    }

    pub fn echo(&self, field: &str) -> String {
        self.get(field).map(FieldValue::echo).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid(SanitizedFields),
    Invalid {
        sanitized: SanitizedFields,
        errors: Vec<FieldError>,
    },
}

#[derive(Debug, Clone)]
struct FieldRules {
    field: &'static str,
    label: &'static str,
    rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    fields: Vec<FieldRules>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: &'static str, label: &'static str, rules: &[Rule]) -> Self {
        self.fields.push(FieldRules {
            field,
            label,
            rules: rules.to_vec(),
        });
        self
    }

    pub fn run(&self, source: &dyn FieldSource) -> ValidationResult {
        let mut sanitized = SanitizedFields::default();
        let mut errors = Vec::new();

        for entry in &self.fields {
            let (value, error) = check_field(entry, source.field(entry.field));
            sanitized.values.push((entry.field, value));
            if let Some(message) = error {
                errors.push(FieldError::new(entry.field, message));
            }
        }

        if errors.is_empty() {
            ValidationResult::Valid(sanitized)
        } else {
            ValidationResult::Invalid { sanitized, errors }
        }
    }
}

fn check_field(entry: &FieldRules, raw: Option<&str>) -> (FieldValue, Option<String>) {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    let escaped = escape_markup(trimmed);
    let mut value = match raw {
        None => FieldValue::Absent,
        Some(_) => FieldValue::Text(escaped.clone()),
    };

    for rule in &entry.rules {
        match rule {
            Rule::Required if trimmed.is_empty() => {
                return (value, Some(rule.message(entry.label)));
            }
            Rule::Alphanumeric
                if escaped.is_empty() || !escaped.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                return (value, Some(rule.message(entry.label)));
            }
            Rule::OptionalDate => {
                if trimmed.is_empty() {
                    return (FieldValue::Absent, None);
                }
                match parse_iso_date(trimmed) {
                    Some(date) => value = FieldValue::Date(date),
                    None => return (value, Some(rule.message(entry.label))),
                }
            }
            Rule::Required | Rule::Alphanumeric => {}
        }
    }

    (value, None)
}

/// HTML-escapes `& < > " ' /`, plus backslash and backtick.
fn escape_markup(value: &str) -> String {
    html_escape::encode_safe(value)
        .replace('\\', "&#x5C;")
        .replace('`', "&#96;")
}

/// Accepts `YYYY-MM-DD`, basic `YYYYMMDD`, a local date-time with minutes,
/// seconds or fractional seconds, or an RFC 3339 timestamp. Only the
/// calendar date is kept; offset timestamps are read in UTC.
fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let digits = |range: std::ops::Range<usize>| {
        bytes
            .get(range)
            .is_some_and(|part| part.iter().all(u8::is_ascii_digit))
    };

    if bytes.len() == 8 && digits(0..8) {
        let year = value[0..4].parse().ok()?;
        let month = value[4..6].parse().ok()?;
        let day = value[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let extended = digits(0..4)
        && bytes.get(4) == Some(&b'-')
        && digits(5..7)
        && bytes.get(7) == Some(&b'-')
        && digits(8..10);
    if !extended {
        return None;
    }
    if bytes.len() == 10 {
        return NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
    }

    let timed = bytes.get(10) == Some(&b'T')
        && digits(11..13)
        && bytes.get(13) == Some(&b':')
        && digits(14..16);
    if !timed {
        return None;
    }

    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

pub fn author_pipeline() -> Pipeline {
    Pipeline::new()
        .field(FIRST_NAME, "First name", &[Rule::Required, Rule::Alphanumeric])
        .field(FAMILY_NAME, "Family name", &[Rule::Required, Rule::Alphanumeric])
        .field(DATE_OF_BIRTH, "Date of birth", &[Rule::OptionalDate])
        .field(DATE_OF_DEATH, "Date of death", &[Rule::OptionalDate])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorValidation {
    Valid(AuthorFields),
    Invalid {
        form: AuthorForm,
        errors: Vec<FieldError>,
    },
}

/// Runs the author pipeline and the birth/death ordering check.
pub fn validate_author(source: &dyn FieldSource) -> AuthorValidation {
    let (sanitized, mut errors) = match author_pipeline().run(source) {
        ValidationResult::Valid(sanitized) => (sanitized, Vec::new()),
        ValidationResult::Invalid { sanitized, errors } => (sanitized, errors),
    };

    if let (Some(born), Some(died)) = (
        sanitized.date(DATE_OF_BIRTH),
        sanitized.date(DATE_OF_DEATH),
    ) {
        if died < born && !errors.iter().any(|e| e.field == DATE_OF_DEATH) {
            errors.push(FieldError::new(
                DATE_OF_DEATH,
                "Date of death must not precede date of birth.",
            ));
        }
    }

    if errors.is_empty() {
        return AuthorValidation::Valid(AuthorFields {
            first_name: sanitized.text(FIRST_NAME),
            family_name: sanitized.text(FAMILY_NAME),
            date_of_birth: sanitized.date(DATE_OF_BIRTH),
            date_of_death: sanitized.date(DATE_OF_DEATH),
        });
    }

    AuthorValidation::Invalid {
        form: AuthorForm {
            id: None,
            first_name: sanitized.echo(FIRST_NAME),
            family_name: sanitized.echo(FAMILY_NAME),
            date_of_birth: sanitized.echo(DATE_OF_BIRTH),
            date_of_death: sanitized.echo(DATE_OF_DEATH),
        },
        errors,
    }
}
