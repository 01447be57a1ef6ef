use crate::traits::TextStore;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Process-lifetime store. Each `put` swaps the whole entry under the write
/// lock, so a reader sees either the previous text or the new one.
#[derive(Debug, Default)]
pub struct InMemoryTextStore {
    documents: RwLock<HashMap<String, String>>,
}

impl InMemoryTextStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextStore for InMemoryTextStore {
    fn put(&self, document_id: &str, text: String) {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        documents.insert(document_id.to_string(), text);
    }

    fn get(&self, document_id: &str) -> Option<String> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(document_id)
            .cloned()
    }

    fn contains(&self, document_id: &str) -> bool {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(document_id)
    }

    fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn document_ids(&self) -> Vec<String> {
        let mut ids = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }
}

impl<T: TextStore + ?Sized> TextStore for Arc<T> {
    fn put(&self, document_id: &str, text: String) {
        (**self).put(document_id, text)
    }

    fn get(&self, document_id: &str) -> Option<String> {
        (**self).get(document_id)
    }

    fn contains(&self, document_id: &str) -> bool {
        (**self).contains(document_id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn document_ids(&self) -> Vec<String> {
        (**self).document_ids()
    }
}

impl<T: TextStore + ?Sized> TextStore for &T {
    fn put(&self, document_id: &str, text: String) {
        (**self).put(document_id, text)
    }

    fn get(&self, document_id: &str) -> Option<String> {
        (**self).get(document_id)
    }

    fn contains(&self, document_id: &str) -> bool {
        (**self).contains(document_id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn document_ids(&self) -> Vec<String> {
        (**self).document_ids()
    }
}
