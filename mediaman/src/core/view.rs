use thiserror::Error;

use crate::core::models::{MediaCollection, MediaItem};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ViewError {
    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Missing form: {0}")]
    Missing(String),
}

/// Everything the controller needs from whatever renders the collections.
///
/// Rendering calls are best effort and report nothing back; the two `new_*`
/// readers return the user's pending input or why it was rejected.
pub trait CollectionView<T: MediaItem>: Send {
    fn new_collection_name(&mut self) -> Result<String, ViewError>;
    fn new_item_details(&mut self, collection_id: &str) -> Result<T, ViewError>;

    fn render_collection(&mut self, collection: &MediaCollection<T>);
    fn render_item(&mut self, collection_id: &str, item: &T);
    fn remove_collection(&mut self, collection_id: &str);
    fn remove_item(&mut self, collection_id: &str, item_id: &str);
    fn clear_collections(&mut self);
    fn clear_new_item_form(&mut self, collection_id: &str);
    fn clear_new_collection_form(&mut self);
    fn display_error_message(&mut self, message: &str);
}
