use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

const IDENTIFIER_LEN: usize = 9;

/// Short random token used for both items and collections.
pub fn generate_identifier() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(IDENTIFIER_LEN);
    for _ in 0..IDENTIFIER_LEN {
        let digit = (n % 36) as u32;
        n /= 36;
        out.push(char::from_digit(digit, 36).unwrap_or('0'));
    }
    out
}

/// Item records stored without a genre read back as `Fiction`.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Genre {
    Horror,
    Fantastic,
    Thriller,
    Romance,
    #[default]
    Fiction,
}

impl Genre {
    pub const ALL: [Genre; 5] = [
        Genre::Horror,
        Genre::Fantastic,
        Genre::Thriller,
        Genre::Romance,
        Genre::Fiction,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Genre::Horror => "Horror",
            Genre::Fantastic => "Fantastic",
            Genre::Thriller => "Thriller",
            Genre::Romance => "Romance",
            Genre::Fiction => "Fiction",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Genre::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown genre: {s}"))
    }
}

/// Discriminator stored with every collection so the persistence layer knows
/// which concrete item type to rebuild.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum MediaType {
    Book,
    Movie,
}

impl MediaType {
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Book => "Book",
            MediaType::Movie => "Movie",
        }
    }

    /// Namespace of this type's store inside the shared engine.
    pub fn store_name(&self) -> String {
        format!("media-man-{}", self.label())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Attributes shared by every kind of media item.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MediaDetails {
    #[serde(default = "generate_identifier")]
    identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub picture_location: String,
    #[serde(default)]
    pub genre: Genre,
}

impl MediaDetails {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        picture_location: impl Into<String>,
        genre: Genre,
    ) -> Self {
        Self {
            identifier: generate_identifier(),
            name: name.into(),
            description: description.into(),
            picture_location: picture_location.into(),
            genre,
        }
    }

    /// Keeps a caller-supplied identifier; blank input falls back to a fresh one.
    #[allow(dead_code)]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        if !identifier.trim().is_empty() {
            self.identifier = identifier;
        }
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

pub trait MediaItem:
    fmt::Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const MEDIA_TYPE: MediaType;

    fn details(&self) -> &MediaDetails;

    fn identifier(&self) -> &str {
        self.details().identifier()
    }

    fn name(&self) -> &str {
        &self.details().name
    }

    /// One-line description used by views.
    fn summary(&self) -> String;
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(flatten)]
    pub details: MediaDetails,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub number_of_pages: u32,
}

impl Book {
    pub fn new(details: MediaDetails, author: impl Into<String>, number_of_pages: u32) -> Self {
        Self {
            details,
            author: author.into(),
            number_of_pages,
        }
    }
}

impl MediaItem for Book {
    const MEDIA_TYPE: MediaType = MediaType::Book;

    fn details(&self) -> &MediaDetails {
        &self.details
    }

    fn summary(&self) -> String {
        format!(
            "{} by {} ({} pages, {})",
            self.details.name, self.author, self.number_of_pages, self.details.genre
        )
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(flatten)]
    pub details: MediaDetails,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub director: String,
}

impl Movie {
    pub fn new(
        details: MediaDetails,
        duration: impl Into<String>,
        director: impl Into<String>,
    ) -> Self {
        Self {
            details,
            duration: duration.into(),
            director: director.into(),
        }
    }
}

impl MediaItem for Movie {
    const MEDIA_TYPE: MediaType = MediaType::Movie;

    fn details(&self) -> &MediaDetails {
        &self.details
    }

    fn summary(&self) -> String {
        format!(
            "{} directed by {} ({}, {})",
            self.details.name, self.director, self.duration, self.details.genre
        )
    }
}

/// Named, ordered group of items of one type.
///
/// The item sequence is an immutable snapshot: `add_media` and `remove_media`
/// swap in a new one, so a snapshot handed out by [`items`](Self::items) never
/// observes later changes.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCollection<T: MediaItem> {
    identifier: String,
    pub name: String,
    items: Arc<[T]>,
}

impl<T: MediaItem> MediaCollection<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identifier: generate_identifier(),
            name: name.into(),
            items: Arc::from(Vec::new()),
        }
    }

    pub fn with_identifier(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: String::new(),
            items: Arc::from(Vec::new()),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn items(&self) -> Arc<[T]> {
        Arc::clone(&self.items)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find_media(&self, item_id: &str) -> Option<&T> {
        self.items.iter().find(|m| m.identifier() == item_id)
    }

    #[allow(dead_code)]
    pub fn position_of(&self, item_id: &str) -> Option<usize> {
        self.items.iter().position(|m| m.identifier() == item_id)
    }

    /// Appends without checking for duplicate identifiers.
    pub fn add_media(&mut self, media: T) {
        let mut next = self.items.to_vec();
        next.push(media);
        self.items = next.into();
    }

    /// Drops every item with this identifier; returns how many were dropped.
    pub fn remove_media(&mut self, item_id: &str) -> usize {
        if item_id.is_empty() {
            return 0;
        }
        let before = self.items.len();
        let next: Vec<T> = self
            .items
            .iter()
            .filter(|m| m.identifier() != item_id)
            .cloned()
            .collect();
        let removed = before - next.len();
        if removed > 0 {
            self.items = next.into();
        }
        removed
    }

    pub fn remove_media_at(&mut self, index: usize) -> Option<T> {
        let mut next = self.items.to_vec();
        if index >= next.len() {
            return None;
        }
        let removed = next.remove(index);
        self.items = next.into();
        Some(removed)
    }

    pub fn insert_media_at(&mut self, index: usize, media: T) {
        let mut next = self.items.to_vec();
        next.insert(index.min(next.len()), media);
        self.items = next.into();
    }

    pub(crate) fn replace_items(&mut self, items: Vec<T>) {
        self.items = items.into();
    }
}
