use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{Book, BookId, BookStatus, CategoryId, Page, PageRequest};
use tokio::sync::RwLock;

use crate::{
    InventoryError, Result,
    store::{BookStore, NewBook, check_transition},
};

#[derive(Debug, Default)]
struct InMemoryBookState {
    books: BTreeMap<BookId, Book>,
    next_id: u64,
}

/// In-memory book store.
///
/// Every operation runs inside one lock critical section, which gives
/// `try_transition` the same all-or-nothing behavior as the SQL conditional
/// update.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookStore {
    state: Arc<RwLock<InMemoryBookState>>,
    fail_on_transition: Arc<AtomicBool>,
}

impl InMemoryBookStore {
    /// Creates a new empty in-memory book store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `try_transition` fail with a storage error.
    pub fn set_fail_on_transition(&self, fail: bool) {
        self.fail_on_transition.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of books stored.
    pub async fn book_count(&self) -> usize {
        self.state.read().await.books.len()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn insert(&self, book: NewBook) -> Result<Book> {
        book.validate()?;

        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = BookId::new(state.next_id);
        let book = Book {
            id,
            title: book.title,
            author: book.author,
            category_id: book.category_id,
            location: book.location,
            status: BookStatus::Available,
        };
        state.books.insert(id, book.clone());
        Ok(book)
    }

    async fn get(&self, id: BookId) -> Result<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn list_by_category(&self, category_id: CategoryId) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .filter(|b| b.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Book>> {
        let state = self.state.read().await;
        Ok(Page::from_sorted(
            state.books.values().cloned().collect(),
            page,
        ))
    }

    async fn try_transition(&self, id: BookId, from: BookStatus, to: BookStatus) -> Result<bool> {
        check_transition(from, to)?;

        if self.fail_on_transition.load(Ordering::SeqCst) {
            return Err(InventoryError::Unavailable(
                "book transition rejected by storage".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(&id)
            .ok_or(InventoryError::BookNotFound(id))?;

        if book.status != from {
            tracing::debug!(book_id = %id, current = %book.status, %to, "conditional transition lost");
            return Ok(false);
        }
        book.status = to;
        Ok(true)
    }

    async fn update(&self, id: BookId, details: NewBook) -> Result<Book> {
        details.validate()?;

        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(&id)
            .ok_or(InventoryError::BookNotFound(id))?;
        book.title = details.title;
        book.author = details.author;
        book.category_id = details.category_id;
        book.location = details.location;
        Ok(book.clone())
    }

    async fn try_delete(&self, id: BookId) -> Result<bool> {
        let mut state = self.state.write().await;
        let status = state
            .books
            .get(&id)
            .map(|b| b.status)
            .ok_or(InventoryError::BookNotFound(id))?;

        if status != BookStatus::Available {
            return Ok(false);
        }
        state.books.remove(&id);
        Ok(true)
    }

    async fn force_status(&self, id: BookId, to: BookStatus) -> Result<Book> {
        let mut state = self.state.write().await;
        let book = state
            .books
            .get_mut(&id)
            .ok_or(InventoryError::BookNotFound(id))?;
        book.status = to;
        Ok(book.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> NewBook {
        NewBook::new("Dune", "Frank Herbert", CategoryId::new(1), "A-12")
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids_and_available_status() {
        let store = InMemoryBookStore::new();
        let b1 = store.insert(dune()).await.unwrap();
        let b2 = store.insert(dune()).await.unwrap();

        assert_eq!(b1.id, BookId::new(1));
        assert_eq!(b2.id, BookId::new(2));
        assert_eq!(b1.status, BookStatus::Available);
        assert_eq!(store.book_count().await, 2);
    }

    #[tokio::test]
    async fn test_transition_applies_when_status_matches() {
        let store = InMemoryBookStore::new();
        let book = store.insert(dune()).await.unwrap();

        let applied = store
            .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
            .await
            .unwrap();

        assert!(applied);
        let stored = store.get(book.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookStatus::Placed);
    }

    #[tokio::test]
    async fn test_transition_is_noop_when_status_differs() {
        let store = InMemoryBookStore::new();
        let book = store.insert(dune()).await.unwrap();
        store
            .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
            .await
            .unwrap();

        let applied = store
            .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
            .await
            .unwrap();

        assert!(!applied);
        let stored = store.get(book.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookStatus::Placed);
    }

    #[tokio::test]
    async fn test_illegal_transition_is_rejected() {
        let store = InMemoryBookStore::new();
        let book = store.insert(dune()).await.unwrap();

        let result = store
            .try_transition(book.id, BookStatus::Available, BookStatus::Taken)
            .await;

        assert!(matches!(
            result,
            Err(InventoryError::IllegalTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_transition_on_missing_book() {
        let store = InMemoryBookStore::new();
        let result = store
            .try_transition(BookId::new(99), BookStatus::Available, BookStatus::Placed)
            .await;
        assert!(matches!(result, Err(InventoryError::BookNotFound(_))));
    }

    #[tokio::test]
    async fn test_fail_on_transition() {
        let store = InMemoryBookStore::new();
        let book = store.insert(dune()).await.unwrap();
        store.set_fail_on_transition(true);

        let result = store
            .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
            .await;

        assert!(matches!(result, Err(InventoryError::Unavailable(_))));
        let stored = store.get(book.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookStatus::Available);
    }

    #[tokio::test]
    async fn test_force_status_ignores_current_value() {
        let store = InMemoryBookStore::new();
        let book = store.insert(dune()).await.unwrap();

        let forced = store
            .force_status(book.id, BookStatus::Available)
            .await
            .unwrap();
        assert_eq!(forced.status, BookStatus::Available);

        let forced = store.force_status(book.id, BookStatus::Taken).await.unwrap();
        assert_eq!(forced.status, BookStatus::Taken);
    }

    #[tokio::test]
    async fn test_update_keeps_status() {
        let store = InMemoryBookStore::new();
        let book = store.insert(dune()).await.unwrap();
        store
            .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
            .await
            .unwrap();

        let updated = store
            .update(
                book.id,
                NewBook::new("Dune Messiah", "Frank Herbert", CategoryId::new(3), "A-13"),
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.category_id, CategoryId::new(3));
        assert_eq!(updated.status, BookStatus::Placed);

        let missing = store.update(BookId::new(99), dune()).await;
        assert!(matches!(missing, Err(InventoryError::BookNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_only_when_available() {
        let store = InMemoryBookStore::new();
        let book = store.insert(dune()).await.unwrap();
        store
            .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
            .await
            .unwrap();

        assert!(!store.try_delete(book.id).await.unwrap());
        assert!(store.get(book.id).await.unwrap().is_some());

        store
            .force_status(book.id, BookStatus::Available)
            .await
            .unwrap();
        assert!(store.try_delete(book.id).await.unwrap());
        assert!(store.get(book.id).await.unwrap().is_none());
        assert!(matches!(
            store.try_delete(book.id).await,
            Err(InventoryError::BookNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_category_and_pages() {
        let store = InMemoryBookStore::new();
        store.insert(dune()).await.unwrap();
        store
            .insert(NewBook::new("Emma", "Jane Austen", CategoryId::new(2), "B-1"))
            .await
            .unwrap();
        store.insert(dune()).await.unwrap();

        let scifi = store.list_by_category(CategoryId::new(1)).await.unwrap();
        assert_eq!(scifi.len(), 2);

        let page = store.list(PageRequest::new(2, 2).unwrap()).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, BookId::new(3));
    }
}
