use futures::future::join_all;
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use crate::core::models::{MediaCollection, MediaItem};
use crate::core::service::MediaService;
use crate::core::storage::StorageError;
use crate::core::view::CollectionView;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("The {0} identifier is required")]
    MissingIdentifier(&'static str),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Item {item} is not part of collection {collection}")]
    UnknownItem { collection: String, item: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ControllerError {
    /// True for caller bugs; false for failures of the store itself.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(self, ControllerError::Storage(_))
    }
}

struct CollectionCache<T: MediaItem> {
    collections: HashMap<String, MediaCollection<T>>,
    /// Bumped by every reload; loads started under an older epoch are dropped.
    epoch: u64,
    /// Identifiers the current reload is still fetching.
    pending: HashSet<String>,
}

impl<T: MediaItem> Default for CollectionCache<T> {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
            epoch: 0,
            pending: HashSet::new(),
        }
    }
}

/// Session cache of one media type's collections, kept in step with the
/// store and the view.
///
/// Mutations hit the cache and view first and are then persisted. When the
/// store refuses a write the change is undone and the view shows an error.
///
/// Lock order is cache, then view. Neither guard is held across a store call.
pub struct MediaController<T: MediaItem, V: CollectionView<T>> {
    service: MediaService<T>,
    view: Mutex<V>,
    cache: Mutex<CollectionCache<T>>,
}

impl<T: MediaItem, V: CollectionView<T>> MediaController<T, V> {
    pub fn new(service: MediaService<T>, view: V) -> Self {
        Self {
            service,
            view: Mutex::new(view),
            cache: Mutex::new(CollectionCache::default()),
        }
    }

    pub async fn view(&self) -> MutexGuard<'_, V> {
        self.view.lock().await
    }

    pub async fn collection(&self, identifier: &str) -> Option<MediaCollection<T>> {
        self.cache.lock().await.collections.get(identifier).cloned()
    }

    /// Cached collections ordered by name.
    pub async fn collections(&self) -> Vec<MediaCollection<T>> {
        let cache = self.cache.lock().await;
        let mut all: Vec<_> = cache.collections.values().cloned().collect();
        all.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.identifier().cmp(b.identifier()))
        });
        all
    }

    /// Whether a reload is still fetching this identifier.
    #[allow(dead_code)]
    pub async fn is_loading(&self, identifier: &str) -> bool {
        self.cache.lock().await.pending.contains(identifier)
    }

    async fn report(&self, message: String) {
        error!("{message}");
        self.view.lock().await.display_error_message(&message);
    }

    /// Drops the cache and the rendered list, then fetches every stored
    /// collection. Returns how many collections made it into the cache.
    pub async fn reload_collections(&self) -> Result<usize, ControllerError> {
        info!("Reloading the {} collections", T::MEDIA_TYPE);
        let epoch = {
            let mut cache = self.cache.lock().await;
            cache.epoch += 1;
            cache.collections.clear();
            cache.pending.clear();
            cache.epoch
        };
        self.view.lock().await.clear_collections();

        let keys = match self.service.list_collection_identifiers().await {
            Ok(keys) => keys,
            Err(e) => {
                self.report(format!("Failed to load the {} collections: {e}", T::MEDIA_TYPE))
                    .await;
                return Err(e.into());
            }
        };

        {
            let mut cache = self.cache.lock().await;
            if cache.epoch != epoch {
                debug!("Reload {epoch} superseded before its loads started");
                return Ok(0);
            }
            cache.pending.extend(keys.iter().cloned());
        }

        let applied = join_all(keys.iter().map(|key| self.load_into_cache(epoch, key))).await;
        Ok(applied.into_iter().filter(|ok| *ok).count())
    }

    async fn load_into_cache(&self, epoch: u64, identifier: &str) -> bool {
        match self.service.load_collection(identifier).await {
            Ok(collection) => {
                let mut cache = self.cache.lock().await;
                if cache.epoch != epoch || !cache.pending.remove(identifier) {
                    debug!("Discarding stale load of collection {identifier}");
                    return false;
                }
                self.view.lock().await.render_collection(&collection);
                cache.collections.insert(identifier.to_string(), collection);
                true
            }
            Err(e) => {
                {
                    let mut cache = self.cache.lock().await;
                    if cache.epoch == epoch {
                        cache.pending.remove(identifier);
                    }
                }
                self.report(format!("Failed to load the collection {identifier}: {e}"))
                    .await;
                false
            }
        }
    }

    /// Creates an empty collection named by the view. `Ok(None)` means the
    /// view had no acceptable name.
    pub async fn create_collection(&self) -> Result<Option<String>, ControllerError> {
        let requested = self.view.lock().await.new_collection_name();
        let name = match requested {
            Ok(name) => name,
            Err(e) => {
                warn!("Rejected new collection name: {e}");
                self.report(format!("Cannot create the collection: {e}")).await;
                return Ok(None);
            }
        };

        info!("Creating a new {} collection: {name}", T::MEDIA_TYPE);
        let collection = MediaCollection::new(name);
        let identifier = collection.identifier().to_string();
        self.cache
            .lock()
            .await
            .collections
            .insert(identifier.clone(), collection.clone());

        match self.service.save_collection(&collection).await {
            Ok(()) => {
                let mut view = self.view.lock().await;
                view.clear_new_collection_form();
                view.render_collection(&collection);
                Ok(Some(identifier))
            }
            Err(e) => {
                self.cache.lock().await.collections.remove(&identifier);
                self.report(format!(
                    "Failed to save the new {} collection called {}",
                    T::MEDIA_TYPE,
                    collection.name
                ))
                .await;
                Err(e.into())
            }
        }
    }

    pub async fn remove_collection(&self, identifier: &str) -> Result<(), ControllerError> {
        if identifier.trim().is_empty() {
            return Err(ControllerError::MissingIdentifier("collection"));
        }
        info!("Removing {} collection {identifier}", T::MEDIA_TYPE);

        let removed = {
            let mut cache = self.cache.lock().await;
            let was_loading = cache.pending.remove(identifier);
            let removed = cache.collections.remove(identifier);
            if removed.is_none() && !was_loading {
                return Err(ControllerError::UnknownCollection(identifier.to_string()));
            }
            removed
        };
        self.view.lock().await.remove_collection(identifier);

        if let Err(e) = self.service.remove_collection(identifier).await {
            if let Some(collection) = removed {
                let mut cache = self.cache.lock().await;
                self.view.lock().await.render_collection(&collection);
                cache.collections.insert(identifier.to_string(), collection);
            }
            self.report(format!("Failed to remove the collection {identifier}"))
                .await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Appends the item the view has ready for `collection_id`.
    ///
    /// `Ok(None)` covers input the view rejected and a target collection that
    /// is not cached; both are reported rather than raised.
    pub async fn create_item(&self, collection_id: &str) -> Result<Option<String>, ControllerError> {
        if collection_id.trim().is_empty() {
            return Err(ControllerError::MissingIdentifier("collection"));
        }

        let details = self.view.lock().await.new_item_details(collection_id);
        let item = match details {
            Ok(item) => item,
            Err(e) => {
                error!("Failed to retrieve the new {} details: {e}", T::MEDIA_TYPE);
                return Ok(None);
            }
        };
        let item_id = item.identifier().to_string();

        let snapshot = {
            let mut cache = self.cache.lock().await;
            cache.collections.get_mut(collection_id).map(|c| {
                c.add_media(item.clone());
                c.clone()
            })
        };
        let Some(snapshot) = snapshot else {
            error!("Tried to add an item to unknown collection {collection_id}");
            self.report(format!("Failed to create the new {}", T::MEDIA_TYPE))
                .await;
            return Ok(None);
        };

        match self.service.save_collection(&snapshot).await {
            Ok(()) => {
                info!("Collection {:?} updated with {item_id}", snapshot.name);
                let mut view = self.view.lock().await;
                view.clear_new_item_form(collection_id);
                view.render_item(collection_id, &item);
                Ok(Some(item_id))
            }
            Err(e) => {
                {
                    let mut cache = self.cache.lock().await;
                    if let Some(c) = cache.collections.get_mut(collection_id) {
                        if let Some(pos) =
                            c.as_slice().iter().rposition(|m| m.identifier() == item_id)
                        {
                            c.remove_media_at(pos);
                        }
                    }
                }
                self.report(format!(
                    "Failed to update the existing {} collection called {}",
                    T::MEDIA_TYPE,
                    snapshot.name
                ))
                .await;
                Err(e.into())
            }
        }
    }

    pub async fn remove_item(
        &self,
        collection_id: &str,
        item_id: &str,
    ) -> Result<(), ControllerError> {
        if collection_id.trim().is_empty() {
            return Err(ControllerError::MissingIdentifier("collection"));
        }
        if item_id.trim().is_empty() {
            return Err(ControllerError::MissingIdentifier("item"));
        }
        info!("Removing {} {item_id} from collection {collection_id}", T::MEDIA_TYPE);

        let (snapshot, removed) = {
            let mut cache = self.cache.lock().await;
            let Some(c) = cache.collections.get_mut(collection_id) else {
                return Err(ControllerError::UnknownCollection(collection_id.to_string()));
            };
            let removed: Vec<(usize, T)> = c
                .as_slice()
                .iter()
                .enumerate()
                .filter(|(_, m)| m.identifier() == item_id)
                .map(|(i, m)| (i, m.clone()))
                .collect();
            if removed.is_empty() {
                return Err(ControllerError::UnknownItem {
                    collection: collection_id.to_string(),
                    item: item_id.to_string(),
                });
            }
            c.remove_media(item_id);
            (c.clone(), removed)
        };

        match self.service.save_collection(&snapshot).await {
            Ok(()) => {
                self.view.lock().await.remove_item(collection_id, item_id);
                Ok(())
            }
            Err(e) => {
                {
                    let mut cache = self.cache.lock().await;
                    if let Some(c) = cache.collections.get_mut(collection_id) {
                        for (pos, item) in removed {
                            c.insert_media_at(pos, item);
                        }
                    }
                }
                self.report(format!(
                    "Failed to save the changes to the {} collection (removal of {item_id})",
                    snapshot.name
                ))
                .await;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{Book, Genre, MediaDetails};
    use crate::core::testing::{FlakyStore, RecordingView, ViewEvent};
    use crate::core::view::ViewError;
    use std::sync::Arc;

    type BookController = MediaController<Book, RecordingView<Book>>;

    fn setup() -> (Arc<FlakyStore>, BookController) {
        let store = Arc::new(FlakyStore::new());
        let controller = MediaController::new(
            MediaService::new(store.clone()),
            RecordingView::default(),
        );
        (store, controller)
    }

    fn dune() -> Book {
        Book::new(
            MediaDetails::new("Dune", "", "", Genre::Fiction),
            "Herbert",
            412,
        )
    }

    async fn create_named(controller: &BookController, name: &str) -> String {
        controller
            .view()
            .await
            .names
            .push_back(Ok(name.to_string()));
        controller.create_collection().await.unwrap().unwrap()
    }

    async fn add_book(controller: &BookController, collection_id: &str, book: Book) -> String {
        controller.view().await.items.push_back(Ok(book));
        controller.create_item(collection_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn create_collection_caches_renders_and_persists() {
        let (_, controller) = setup();
        let id = create_named(&controller, "SciFi").await;

        let cached = controller.collections().await;
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].name, "SciFi");
        assert!(!id.is_empty());

        let stored = controller.service.find_collection(&id).await.unwrap().unwrap();
        assert_eq!(stored.name, "SciFi");

        let view = controller.view().await;
        assert_eq!(view.count(&ViewEvent::ClearCollectionForm), 1);
        assert_eq!(view.count(&ViewEvent::RenderCollection(id.clone())), 1);
    }

    #[tokio::test]
    async fn rejected_name_creates_nothing() {
        let (store, controller) = setup();
        controller
            .view()
            .await
            .names
            .push_back(Err(ViewError::Invalid("empty".into())));

        assert!(controller.create_collection().await.unwrap().is_none());
        assert!(controller.collections().await.is_empty());
        assert_eq!(store.write_count(), 0);
        assert_eq!(controller.view().await.errors.len(), 1);
    }

    #[tokio::test]
    async fn failed_create_is_rolled_back() {
        let (store, controller) = setup();
        store.set_fail_writes(true);
        controller.view().await.names.push_back(Ok("SciFi".into()));

        let err = controller.create_collection().await.unwrap_err();
        assert!(!err.is_contract_violation());
        assert!(controller.collections().await.is_empty());

        let view = controller.view().await;
        assert_eq!(view.errors.len(), 1);
        assert!(!view.events.iter().any(|e| matches!(e, ViewEvent::RenderCollection(_))));
    }

    #[tokio::test]
    async fn add_book_grows_collection_and_record() {
        let (_, controller) = setup();
        let id = create_named(&controller, "SciFi").await;
        let book_id = add_book(&controller, &id, dune()).await;

        let cached = controller.collection(&id).await.unwrap();
        assert_eq!(cached.len(), 1);

        let stored = controller.service.load_collection(&id).await.unwrap();
        let book = stored.find_media(&book_id).unwrap();
        assert_eq!(book.author, "Herbert");
        assert_eq!(book.number_of_pages, 412);
        assert_eq!(book.details.genre, Genre::Fiction);

        let view = controller.view().await;
        assert_eq!(view.count(&ViewEvent::ClearItemForm(id.clone())), 1);
        assert_eq!(view.count(&ViewEvent::RenderItem(id, book_id)), 1);
    }

    #[tokio::test]
    async fn invalid_item_details_abort_quietly() {
        let (store, controller) = setup();
        let id = create_named(&controller, "SciFi").await;
        let writes = store.write_count();
        controller
            .view()
            .await
            .items
            .push_back(Err(ViewError::Invalid("pages".into())));

        assert!(controller.create_item(&id).await.unwrap().is_none());
        assert_eq!(store.write_count(), writes);
        assert!(controller.view().await.errors.is_empty());
    }

    #[tokio::test]
    async fn item_for_unknown_collection_is_reported() {
        let (store, controller) = setup();
        controller.view().await.items.push_back(Ok(dune()));

        assert!(controller.create_item("ghost").await.unwrap().is_none());
        assert_eq!(store.write_count(), 0);
        assert_eq!(controller.view().await.errors.len(), 1);
    }

    #[tokio::test]
    async fn failed_item_save_is_rolled_back() {
        let (store, controller) = setup();
        let id = create_named(&controller, "SciFi").await;
        store.set_fail_writes(true);
        controller.view().await.items.push_back(Ok(dune()));

        assert!(controller.create_item(&id).await.is_err());
        assert!(controller.collection(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_item_twice_fails_the_second_time() {
        let (_, controller) = setup();
        let id = create_named(&controller, "SciFi").await;
        let book_id = add_book(&controller, &id, dune()).await;

        controller.remove_item(&id, &book_id).await.unwrap();
        assert!(controller.collection(&id).await.unwrap().is_empty());
        assert_eq!(
            controller
                .view()
                .await
                .count(&ViewEvent::RemoveItem(id.clone(), book_id.clone())),
            1
        );

        let err = controller.remove_item(&id, &book_id).await.unwrap_err();
        assert!(matches!(err, ControllerError::UnknownItem { .. }));
        assert!(err.is_contract_violation());
    }

    #[tokio::test]
    async fn remove_item_requires_known_collection_and_ids() {
        let (_, controller) = setup();
        assert!(matches!(
            controller.remove_item("", "x").await,
            Err(ControllerError::MissingIdentifier("collection"))
        ));
        assert!(matches!(
            controller.remove_item("c", " ").await,
            Err(ControllerError::MissingIdentifier("item"))
        ));
        assert!(matches!(
            controller.remove_item("c", "x").await,
            Err(ControllerError::UnknownCollection(_))
        ));
    }

    #[tokio::test]
    async fn failed_item_removal_restores_position() {
        let (store, controller) = setup();
        let id = create_named(&controller, "SciFi").await;
        let first = add_book(&controller, &id, dune()).await;
        let second = add_book(&controller, &id, dune()).await;

        store.set_fail_writes(true);
        assert!(controller.remove_item(&id, &first).await.is_err());

        let cached = controller.collection(&id).await.unwrap();
        let ids: Vec<&str> = cached.as_slice().iter().map(|b| b.identifier()).collect();
        assert_eq!(ids, vec![first.as_str(), second.as_str()]);
    }

    #[tokio::test]
    async fn removing_unknown_collection_touches_no_store() {
        let (store, controller) = setup();
        let err = controller.remove_collection("ghost").await.unwrap_err();
        assert!(matches!(err, ControllerError::UnknownCollection(_)));
        assert_eq!(store.write_count(), 0);

        assert!(matches!(
            controller.remove_collection("  ").await,
            Err(ControllerError::MissingIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn remove_collection_evicts_everywhere() {
        let (_, controller) = setup();
        let id = create_named(&controller, "SciFi").await;
        controller.remove_collection(&id).await.unwrap();

        assert!(controller.collection(&id).await.is_none());
        assert!(controller.service.find_collection(&id).await.unwrap().is_none());
        assert_eq!(
            controller.view().await.count(&ViewEvent::RemoveCollection(id)),
            1
        );
    }

    #[tokio::test]
    async fn failed_collection_removal_is_rolled_back() {
        let (store, controller) = setup();
        let id = create_named(&controller, "SciFi").await;
        store.set_fail_writes(true);

        assert!(controller.remove_collection(&id).await.is_err());
        assert!(controller.collection(&id).await.is_some());
        let view = controller.view().await;
        assert_eq!(view.count(&ViewEvent::RenderCollection(id)), 2);
        assert_eq!(view.errors.len(), 1);
    }

    #[tokio::test]
    async fn reload_rebuilds_cache_from_store() {
        let (_, controller) = setup();
        let a = create_named(&controller, "A").await;
        let b = create_named(&controller, "B").await;
        add_book(&controller, &a, dune()).await;

        assert_eq!(controller.reload_collections().await.unwrap(), 2);
        let names: Vec<String> = controller
            .collections()
            .await
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(controller.collection(&a).await.unwrap().len(), 1);
        assert!(controller.collection(&b).await.unwrap().is_empty());
        assert_eq!(controller.view().await.count(&ViewEvent::ClearCollections), 1);
    }

    #[tokio::test]
    async fn reload_reports_listing_failure() {
        let (store, controller) = setup();
        store.set_fail_reads(true);
        assert!(controller.reload_collections().await.is_err());
        assert_eq!(controller.view().await.errors.len(), 1);
    }

    #[tokio::test]
    async fn overlapping_reloads_cache_each_collection_once() {
        let (_, controller) = setup();
        let a = create_named(&controller, "A").await;
        let b = create_named(&controller, "B").await;

        let (first, second) = futures::join!(
            controller.reload_collections(),
            controller.reload_collections()
        );
        first.unwrap();
        second.unwrap();

        assert_eq!(controller.collections().await.len(), 2);
        let view = controller.view().await;
        let renders_after_last_clear: Vec<&ViewEvent> = view
            .events
            .iter()
            .rev()
            .take_while(|e| **e != ViewEvent::ClearCollections)
            .collect();
        assert_eq!(renders_after_last_clear.len(), 2);
        assert!(renders_after_last_clear.contains(&&ViewEvent::RenderCollection(a)));
        assert!(renders_after_last_clear.contains(&&ViewEvent::RenderCollection(b)));
    }

    #[tokio::test]
    async fn reload_started_while_loads_are_in_flight_supersedes_them() {
        let (store, controller) = setup();
        let a = create_named(&controller, "A").await;
        let b = create_named(&controller, "B").await;
        store.hold_reads();

        let second = async {
            while !controller.is_loading(&a).await {
                tokio::task::yield_now().await;
            }
            let releaser = async {
                // Two loads from each reload.
                while store.parked_reads() < 4 {
                    tokio::task::yield_now().await;
                }
                store.release_reads();
            };
            let (reloaded, ()) = futures::join!(controller.reload_collections(), releaser);
            reloaded
        };
        let (first, second) = futures::join!(controller.reload_collections(), second);

        assert_eq!(first.unwrap(), 0);
        assert_eq!(second.unwrap(), 2);
        assert_eq!(controller.collections().await.len(), 2);

        let view = controller.view().await;
        let renders_after_last_clear: Vec<&ViewEvent> = view
            .events
            .iter()
            .rev()
            .take_while(|e| **e != ViewEvent::ClearCollections)
            .collect();
        assert_eq!(renders_after_last_clear.len(), 2);
        assert!(renders_after_last_clear.contains(&&ViewEvent::RenderCollection(a)));
        assert!(renders_after_last_clear.contains(&&ViewEvent::RenderCollection(b)));
    }

    #[tokio::test]
    async fn collection_removed_mid_reload_stays_removed() {
        let (store, controller) = setup();
        let id = create_named(&controller, "Doomed").await;
        store.hold_reads();

        let remover = async {
            while !controller.is_loading(&id).await {
                tokio::task::yield_now().await;
            }
            let result = controller.remove_collection(&id).await;
            store.release_reads();
            result
        };
        let (reloaded, removed) = futures::join!(controller.reload_collections(), remover);

        removed.unwrap();
        assert_eq!(reloaded.unwrap(), 0);
        assert!(controller.collection(&id).await.is_none());
        assert!(controller.service.find_collection(&id).await.unwrap().is_none());
    }
}
