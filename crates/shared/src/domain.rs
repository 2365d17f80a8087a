use std::{fmt, num::ParseIntError, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

id_newtype!(AuthorId);
id_newtype!(BookId);

/// Display format for dates in derived author attributes, e.g. `Jun 2, 1923`.
const LIFESPAN_DATE_FORMAT: &str = "%b %-d, %Y";

/// Everything an author record holds except its identity.
///
/// This is what create and update persist after validation; the id is
/// assigned by storage and never travels in this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorFields {
    pub first_name: String,
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub first_name: String,
    pub family_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    /// `"<family name>, <first name>"`, or empty when either part is missing.
    pub fn name(&self) -> String {
        if self.first_name.is_empty() || self.family_name.is_empty() {
            return String::new();
        }
        format!("{}, {}", self.family_name, self.first_name)
    }

    /// Birth and death dates as a `start - end` range; absent ends render empty.
    pub fn lifespan(&self) -> String {
        let format = |date: Option<NaiveDate>| {
            date.map(|d| d.format(LIFESPAN_DATE_FORMAT).to_string())
                .unwrap_or_default()
        };
        format!(
            "{} - {}",
            format(self.date_of_birth),
            format(self.date_of_death)
        )
    }

    pub fn url(&self) -> String {
        author_url(self.id)
    }
}

pub fn author_url(id: AuthorId) -> String {
    format!("/catalog/author/{id}")
}

pub fn author_list_url() -> &'static str {
    "/catalog/authors"
}

/// A book as seen from the author lifecycle: it points at its author by id
/// and is otherwise opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub summary: String,
    pub author_id: AuthorId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tolkien() -> Author {
        Author {
            id: AuthorId(7),
            first_name: "John".into(),
            family_name: "Tolkien".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1892, 1, 3),
            date_of_death: NaiveDate::from_ymd_opt(1973, 9, 2),
        }
    }

    #[test]
    fn name_joins_family_and_first_name() {
        assert_eq!(tolkien().name(), "Tolkien, John");
    }

    #[test]
    fn name_is_empty_when_a_part_is_missing() {
        let author = Author {
            first_name: String::new(),
            ..tolkien()
        };
        assert_eq!(author.name(), "");
    }

    #[test]
    fn lifespan_formats_both_ends() {
        assert_eq!(tolkien().lifespan(), "Jan 3, 1892 - Sep 2, 1973");
    }

    #[test]
    fn lifespan_leaves_missing_dates_blank() {
        let author = Author {
            date_of_death: None,
            ..tolkien()
        };
        assert_eq!(author.lifespan(), "Jan 3, 1892 - ");
    }

    #[test]
    fn url_is_derived_from_id() {
        assert_eq!(tolkien().url(), "/catalog/author/7");
    }

    #[test]
    fn ids_parse_from_path_segments() {
        assert_eq!("42".parse::<AuthorId>().expect("id"), AuthorId(42));
        assert!("abc".parse::<AuthorId>().is_err());
    }
}
