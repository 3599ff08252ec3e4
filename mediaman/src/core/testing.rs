//! Test doubles shared by the unit tests: a store with failure and pause
//! switches, and a view that records what it was asked to do.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use crate::core::models::{MediaCollection, MediaItem};
use crate::core::storage::{KeyValueStore, StorageError};
use crate::core::view::{CollectionView, ViewError};
use crate::infra::memory::MemoryStore;

pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    hold_reads: AtomicBool,
    gate: Semaphore,
    parked: AtomicUsize,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            hold_reads: AtomicBool::new(false),
            gate: Semaphore::new(0),
            parked: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Park every `get_item` until [`release_reads`](Self::release_reads).
    pub fn hold_reads(&self) {
        self.hold_reads.store(true, Ordering::SeqCst);
    }

    pub fn release_reads(&self) {
        self.hold_reads.store(false, Ordering::SeqCst);
        self.gate.add_permits(1024);
    }

    /// Reads parked on the gate so far.
    pub fn parked_reads(&self) -> usize {
        self.parked.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writes(&self) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Database("write refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get_item(&self, store: &str, key: &str) -> Result<Option<String>, StorageError> {
        tokio::task::yield_now().await;
        if self.hold_reads.load(Ordering::SeqCst) {
            self.parked.fetch_add(1, Ordering::SeqCst);
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| StorageError::Database(e.to_string()))?;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Database("read refused".into()));
        }
        self.inner.get_item(store, key).await
    }

    async fn set_item(&self, store: &str, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.check_writes()?;
        self.inner.set_item(store, key, value).await
    }

    async fn remove_item(&self, store: &str, key: &str) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.check_writes()?;
        self.inner.remove_item(store, key).await
    }

    async fn keys(&self, store: &str) -> Result<Vec<String>, StorageError> {
        tokio::task::yield_now().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Database("read refused".into()));
        }
        self.inner.keys(store).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    RenderCollection(String),
    RenderItem(String, String),
    RemoveCollection(String),
    RemoveItem(String, String),
    ClearCollections,
    ClearItemForm(String),
    ClearCollectionForm,
}

pub struct RecordingView<T> {
    pub names: VecDeque<Result<String, ViewError>>,
    pub items: VecDeque<Result<T, ViewError>>,
    pub events: Vec<ViewEvent>,
    pub errors: Vec<String>,
}

impl<T> Default for RecordingView<T> {
    fn default() -> Self {
        Self {
            names: VecDeque::new(),
            items: VecDeque::new(),
            events: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> RecordingView<T> {
    pub fn count(&self, event: &ViewEvent) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }
}

impl<T: MediaItem> CollectionView<T> for RecordingView<T> {
    fn new_collection_name(&mut self) -> Result<String, ViewError> {
        self.names
            .pop_front()
            .unwrap_or_else(|| Err(ViewError::Missing("no collection name queued".into())))
    }

    fn new_item_details(&mut self, _collection_id: &str) -> Result<T, ViewError> {
        self.items
            .pop_front()
            .unwrap_or_else(|| Err(ViewError::Missing("no item queued".into())))
    }

    fn render_collection(&mut self, collection: &MediaCollection<T>) {
        self.events
            .push(ViewEvent::RenderCollection(collection.identifier().to_string()));
    }

    fn render_item(&mut self, collection_id: &str, item: &T) {
        self.events.push(ViewEvent::RenderItem(
            collection_id.to_string(),
            item.identifier().to_string(),
        ));
    }

    fn remove_collection(&mut self, collection_id: &str) {
        self.events
            .push(ViewEvent::RemoveCollection(collection_id.to_string()));
    }

    fn remove_item(&mut self, collection_id: &str, item_id: &str) {
        self.events.push(ViewEvent::RemoveItem(
            collection_id.to_string(),
            item_id.to_string(),
        ));
    }

    fn clear_collections(&mut self) {
        self.events.push(ViewEvent::ClearCollections);
    }

    fn clear_new_item_form(&mut self, collection_id: &str) {
        self.events
            .push(ViewEvent::ClearItemForm(collection_id.to_string()));
    }

    fn clear_new_collection_form(&mut self) {
        self.events.push(ViewEvent::ClearCollectionForm);
    }

    fn display_error_message(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
