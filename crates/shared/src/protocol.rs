use serde::{Deserialize, Serialize};

use crate::domain::{Author, AuthorId, Book};

/// Date format used when a stored date is written back into a form.
pub const FORM_DATE_FORMAT: &str = "%Y-%m-%d";

/// One failed rule, keyed by the form field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Values shown in the author form. On a failed submission these are the
/// sanitized values the user sent, so markup never comes back unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AuthorId>,
    pub first_name: String,
    pub family_name: String,
    pub date_of_birth: String,
    pub date_of_death: String,
}

impl From<&Author> for AuthorForm {
    fn from(author: &Author) -> Self {
        let format = |date: Option<chrono::NaiveDate>| {
            date.map(|d| d.format(FORM_DATE_FORMAT).to_string())
                .unwrap_or_default()
        };
        Self {
            id: Some(author.id),
            first_name: author.first_name.clone(),
            family_name: author.family_name.clone(),
            date_of_birth: format(author.date_of_birth),
            date_of_death: format(author.date_of_death),
        }
    }
}

/// An author together with its computed display attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorCard {
    #[serde(flatten)]
    pub author: Author,
    pub name: String,
    pub lifespan: String,
    pub url: String,
}

impl From<Author> for AuthorCard {
    fn from(author: Author) -> Self {
        Self {
            name: author.name(),
            lifespan: author.lifespan(),
            url: author.url(),
            author,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum View {
    AuthorList {
        title: String,
        author_list: Vec<AuthorCard>,
    },
    AuthorDetail {
        title: String,
        author: AuthorCard,
        author_books: Vec<Book>,
    },
    AuthorForm {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<AuthorForm>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        errors: Vec<FieldError>,
    },
    AuthorDelete {
        title: String,
        author: AuthorCard,
        author_books: Vec<Book>,
    },
}

impl View {
    /// Template name of this payload; matches the serialized `view` tag.
    pub fn name(&self) -> &'static str {
        match self {
            View::AuthorList { .. } => "author_list",
            View::AuthorDetail { .. } => "author_detail",
            View::AuthorForm { .. } => "author_form",
            View::AuthorDelete { .. } => "author_delete",
        }
    }
}

/// What a lifecycle operation asks the presentation layer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Render(View),
    Redirect(String),
}
