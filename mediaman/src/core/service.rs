use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::models::{MediaCollection, MediaItem, MediaType};
use crate::core::storage::{KeyValueStore, StorageError};

/// What gets written for a collection.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionRecordRef<'a, T> {
    identifier: &'a str,
    name: &'a str,
    media_type: MediaType,
    collection: &'a [T],
}

/// What gets read back. Every field is optional: whatever is present is merged
/// onto a freshly built empty collection.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionRecord<T> {
    identifier: Option<String>,
    name: Option<String>,
    media_type: Option<MediaType>,
    collection: Option<Vec<T>>,
}

/// Persistence adapter for one media type. Each type gets its own store
/// namespace, so identifiers never collide across types.
pub struct MediaService<T: MediaItem> {
    store: Arc<dyn KeyValueStore>,
    store_name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: MediaItem> MediaService<T> {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let store_name = T::MEDIA_TYPE.store_name();
        info!("Initializing media service for {} ({store_name})", T::MEDIA_TYPE);
        Self {
            store,
            store_name,
            _marker: PhantomData,
        }
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Loads a collection. An absent key is not an error: the result is an
    /// empty collection carrying the requested identifier.
    pub async fn load_collection(
        &self,
        identifier: &str,
    ) -> Result<MediaCollection<T>, StorageError> {
        match self.find_collection(identifier).await? {
            Some(collection) => Ok(collection),
            None => {
                warn!(
                    "No stored {} collection for identifier {identifier}; returning an empty one",
                    T::MEDIA_TYPE
                );
                Ok(MediaCollection::with_identifier(identifier))
            }
        }
    }

    pub async fn find_collection(
        &self,
        identifier: &str,
    ) -> Result<Option<MediaCollection<T>>, StorageError> {
        debug!("Loading media collection {identifier} from {}", self.store_name());
        let raw = self.store.get_item(self.store_name(), identifier).await?;
        match raw {
            Some(raw) => Ok(Some(self.decode(identifier, &raw)?)),
            None => Ok(None),
        }
    }

    fn decode(&self, identifier: &str, raw: &str) -> Result<MediaCollection<T>, StorageError> {
        let record: CollectionRecord<T> = serde_json::from_str(raw)?;

        if let Some(tag) = record.media_type {
            if tag != T::MEDIA_TYPE {
                return Err(StorageError::Corruption(format!(
                    "Record {identifier} holds {tag} items, expected {}",
                    T::MEDIA_TYPE
                )));
            }
        }

        if let Some(stored) = record.identifier.as_deref() {
            if stored != identifier {
                return Err(StorageError::Corruption(format!(
                    "Record {identifier} carries the identifier {stored}"
                )));
            }
        }

        let mut collection = MediaCollection::with_identifier(identifier);
        if let Some(name) = record.name {
            collection.name = name;
        }
        if let Some(items) = record.collection {
            collection.replace_items(items);
        }
        Ok(collection)
    }

    pub async fn save_collection(&self, collection: &MediaCollection<T>) -> Result<(), StorageError> {
        let identifier = collection.identifier();
        if identifier.trim().is_empty() {
            return Err(StorageError::InvalidArgument(
                "A collection without identifier cannot be saved".into(),
            ));
        }

        debug!("Saving media collection {:?} ({identifier})", collection.name);
        let record = CollectionRecordRef {
            identifier,
            name: &collection.name,
            media_type: T::MEDIA_TYPE,
            collection: collection.as_slice(),
        };
        let serialized = serde_json::to_string(&record)?;

        self.store
            .set_item(&self.store_name, identifier, &serialized)
            .await
            .inspect_err(|e| {
                error!(
                    "Failed to save the {:?} collection with identifier {identifier}: {e}",
                    collection.name
                )
            })?;
        info!("Saved the {:?} collection ({identifier})", collection.name);
        Ok(())
    }

    pub async fn list_collection_identifiers(&self) -> Result<Vec<String>, StorageError> {
        let keys = self
            .store
            .keys(&self.store_name)
            .await
            .inspect_err(|e| error!("Failed to list collection identifiers: {e}"))?;
        debug!("Found {} collection identifiers in {}", keys.len(), self.store_name);
        Ok(keys)
    }

    pub async fn remove_collection(&self, identifier: &str) -> Result<(), StorageError> {
        if identifier.trim().is_empty() {
            return Err(StorageError::InvalidArgument(
                "The identifier must be provided".into(),
            ));
        }
        self.store
            .remove_item(&self.store_name, identifier)
            .await
            .inspect_err(|e| error!("Failed to remove the {identifier} collection: {e}"))?;
        info!("Removed the {identifier} collection");
        Ok(())
    }
}
