use std::collections::HashMap;

use crate::core::models::{Book, Genre, MediaDetails, MediaItem, Movie};
use crate::core::view::ViewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
}

const fn field(key: &'static str, label: &'static str, required: bool) -> FormField {
    FormField { key, label, required }
}

const NAME: FormField = field("name", "Name", true);
const DESCRIPTION: FormField = field("description", "Description", false);
const PICTURE: FormField = field("picture", "Picture URL", false);
const GENRE: FormField = field("genre", "Genre (Horror/Fantastic/Thriller/Romance/Fiction)", true);

/// Raw values typed into a "new item" form, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemForm {
    values: HashMap<&'static str, String>,
}

impl ItemForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(|v| v.trim()).unwrap_or("")
    }

    fn required(&self, field: &FormField) -> Result<&str, ViewError> {
        let value = self.get(field.key);
        if field.required && value.is_empty() {
            return Err(ViewError::Invalid(format!("{} is required", field.label)));
        }
        Ok(value)
    }

    fn details(&self) -> Result<MediaDetails, ViewError> {
        let name = self.required(&NAME)?;
        let genre: Genre = self
            .required(&GENRE)?
            .parse()
            .map_err(ViewError::Invalid)?;
        Ok(MediaDetails::new(
            name,
            self.get(DESCRIPTION.key),
            self.get(PICTURE.key),
            genre,
        ))
    }
}

/// Item types that can be built from a filled-in form.
pub trait FormItem: MediaItem {
    const FIELDS: &'static [FormField];

    fn from_form(form: &ItemForm) -> Result<Self, ViewError>;
}

const AUTHOR: FormField = field("author", "Author", true);
const PAGES: FormField = field("pages", "Number of pages", true);

impl FormItem for Book {
    const FIELDS: &'static [FormField] = &[NAME, AUTHOR, GENRE, PAGES, PICTURE, DESCRIPTION];

    fn from_form(form: &ItemForm) -> Result<Self, ViewError> {
        let details = form.details()?;
        let author = form.required(&AUTHOR)?;
        let pages: u32 = form
            .required(&PAGES)?
            .parse()
            .map_err(|_| ViewError::Invalid("Number of pages must be a non-negative integer".into()))?;
        Ok(Book::new(details, author, pages))
    }
}

const DURATION: FormField = field("duration", "Duration", false);
const DIRECTOR: FormField = field("director", "Director", true);

impl FormItem for Movie {
    const FIELDS: &'static [FormField] = &[NAME, DIRECTOR, GENRE, DURATION, PICTURE, DESCRIPTION];

    fn from_form(form: &ItemForm) -> Result<Self, ViewError> {
        let details = form.details()?;
        let director = form.required(&DIRECTOR)?;
        Ok(Movie::new(details, form.get(DURATION.key), director))
    }
}
