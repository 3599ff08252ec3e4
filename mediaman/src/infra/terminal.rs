use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::marker::PhantomData;

use crate::core::forms::{FormItem, ItemForm};
use crate::core::input::{InputError, InputProvider};
use crate::core::models::MediaCollection;
use crate::core::view::{CollectionView, ViewError};

/// Real terminal-based input provider for production use.
pub struct TerminalInput;

impl InputProvider for TerminalInput {
    fn read_line(&mut self, prompt: &str) -> Result<String, InputError> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut buf = String::new();
        if io::stdin().read_line(&mut buf)? == 0 {
            return Err(InputError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed",
            )));
        }
        Ok(buf.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCollection {
    pub name: String,
    /// (item identifier, summary) in display order.
    pub items: Vec<(String, String)>,
}

/// Terminal rendering of one media type's collections.
///
/// Holds the pending "new collection" / "new item" form input and a mirror of
/// what has been rendered, the way a page holds its forms and DOM nodes.
pub struct TerminalView<T: FormItem> {
    collection_form: Option<String>,
    item_forms: HashMap<String, ItemForm>,
    rendered: BTreeMap<String, RenderedCollection>,
    last_error: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FormItem> Default for TerminalView<T> {
    fn default() -> Self {
        Self {
            collection_form: None,
            item_forms: HashMap::new(),
            rendered: BTreeMap::new(),
            last_error: None,
            _marker: PhantomData,
        }
    }
}

impl<T: FormItem> TerminalView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_collection_form(&mut self, name: impl Into<String>) {
        self.collection_form = Some(name.into());
    }

    pub fn fill_item_form(&mut self, collection_id: &str, form: ItemForm) {
        self.item_forms.insert(collection_id.to_string(), form);
    }

    #[cfg(test)]
    pub fn rendered(&self, collection_id: &str) -> Option<&RenderedCollection> {
        self.rendered.get(collection_id)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn print_collections(&self) {
        if self.rendered.is_empty() {
            println!("No {} collections.", T::MEDIA_TYPE);
            return;
        }
        let mut sorted: Vec<(&String, &RenderedCollection)> = self.rendered.iter().collect();
        sorted.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        for (id, collection) in sorted {
            println!("\n  {} [{id}]", collection.name);
            if collection.items.is_empty() {
                println!("    (empty)");
            }
            for (item_id, summary) in &collection.items {
                println!("    - {summary} [{item_id}]");
            }
        }
    }
}

impl<T: FormItem> CollectionView<T> for TerminalView<T> {
    fn new_collection_name(&mut self) -> Result<String, ViewError> {
        match self.collection_form.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            Some(_) => Err(ViewError::Invalid("The collection name is required".into())),
            None => Err(ViewError::Missing("new collection form".into())),
        }
    }

    fn new_item_details(&mut self, collection_id: &str) -> Result<T, ViewError> {
        self.last_error = None;
        let form = self
            .item_forms
            .get(collection_id)
            .ok_or_else(|| ViewError::Missing(format!("new item form for {collection_id}")))?;
        T::from_form(form)
    }

    fn render_collection(&mut self, collection: &MediaCollection<T>) {
        let items = collection
            .as_slice()
            .iter()
            .map(|m| (m.identifier().to_string(), m.summary()))
            .collect();
        self.rendered.insert(
            collection.identifier().to_string(),
            RenderedCollection {
                name: collection.name.clone(),
                items,
            },
        );
        debug!("Rendered collection {}", collection.identifier());
    }

    fn render_item(&mut self, collection_id: &str, item: &T) {
        match self.rendered.get_mut(collection_id) {
            Some(node) => {
                node.items
                    .push((item.identifier().to_string(), item.summary()));
                println!("Added: {}", item.summary());
            }
            None => warn!("No rendered collection {collection_id} to add an item to"),
        }
    }

    fn remove_collection(&mut self, collection_id: &str) {
        if self.rendered.remove(collection_id).is_none() {
            debug!("Collection {collection_id} was not rendered");
        }
    }

    fn remove_item(&mut self, collection_id: &str, item_id: &str) {
        match self.rendered.get_mut(collection_id) {
            Some(node) => node.items.retain(|(id, _)| id != item_id),
            None => warn!("No rendered collection {collection_id} to remove an item from"),
        }
    }

    fn clear_collections(&mut self) {
        self.rendered.clear();
    }

    fn clear_new_item_form(&mut self, collection_id: &str) {
        self.item_forms.remove(collection_id);
    }

    fn clear_new_collection_form(&mut self) {
        self.collection_form = None;
    }

    fn display_error_message(&mut self, message: &str) {
        eprintln!("Error: {message}");
        self.last_error = Some(message.to_string());
    }
}
