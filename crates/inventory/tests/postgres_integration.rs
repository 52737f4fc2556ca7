//! PostgreSQL integration tests for the book store.
//!
//! These tests use a shared PostgreSQL container. Run with:
//!
//! ```bash
//! cargo test -p inventory --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use inventory::{
    BookId, BookStatus, BookStore, CategoryId, InventoryError, NewBook, PageRequest,
    PostgresBookStore,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_books_and_receipts.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresBookStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE receipts, books RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresBookStore::new(pool)
}

fn dune() -> NewBook {
    NewBook::new("Dune", "Frank Herbert", CategoryId::new(1), "A-12")
}

#[tokio::test]
async fn insert_and_get_book() {
    let store = get_test_store().await;

    let book = store.insert(dune()).await.unwrap();
    assert_eq!(book.status, BookStatus::Available);

    let loaded = store.get(book.id).await.unwrap().unwrap();
    assert_eq!(loaded, book);
    assert!(store.get(BookId::new(9999)).await.unwrap().is_none());
}

#[tokio::test]
async fn conditional_transition_applies_once() {
    let store = get_test_store().await;
    let book = store.insert(dune()).await.unwrap();

    assert!(
        store
            .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
            .await
            .unwrap()
    );
    assert!(
        !store
            .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
            .await
            .unwrap()
    );

    let loaded = store.get(book.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, BookStatus::Placed);
}

#[tokio::test]
async fn transition_on_missing_book_is_not_found() {
    let store = get_test_store().await;

    let result = store
        .try_transition(BookId::new(4242), BookStatus::Available, BookStatus::Placed)
        .await;

    assert!(matches!(result, Err(InventoryError::BookNotFound(_))));
}

#[tokio::test]
async fn concurrent_transitions_have_single_winner() {
    let store = get_test_store().await;
    let book = store.insert(dune()).await.unwrap();

    let attempts = (0..16).map(|_| {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
                .await
                .unwrap()
        })
    });

    let winners = join_all(attempts)
        .await
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count();

    assert_eq!(winners, 1);
}

#[tokio::test]
async fn force_status_overrides_current_value() {
    let store = get_test_store().await;
    let book = store.insert(dune()).await.unwrap();
    store
        .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
        .await
        .unwrap();

    let forced = store
        .force_status(book.id, BookStatus::Available)
        .await
        .unwrap();
    assert_eq!(forced.status, BookStatus::Available);

    let missing = store
        .force_status(BookId::new(777), BookStatus::Available)
        .await;
    assert!(matches!(missing, Err(InventoryError::BookNotFound(_))));
}

#[tokio::test]
async fn list_pages_and_categories() {
    let store = get_test_store().await;
    for _ in 0..3 {
        store.insert(dune()).await.unwrap();
    }
    store
        .insert(NewBook::new("Emma", "Jane Austen", CategoryId::new(2), "B-1"))
        .await
        .unwrap();

    let page = store
        .list(PageRequest::new(2, 3).unwrap())
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.items.len(), 1);

    let classics = store.list_by_category(CategoryId::new(2)).await.unwrap();
    assert_eq!(classics.len(), 1);
    assert_eq!(classics[0].title, "Emma");
}

#[tokio::test]
async fn update_edits_details_but_not_status() {
    let store = get_test_store().await;
    let book = store.insert(dune()).await.unwrap();
    store
        .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
        .await
        .unwrap();

    let updated = store
        .update(
            book.id,
            NewBook::new("Children of Dune", "Frank Herbert", CategoryId::new(4), "A-14"),
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Children of Dune");
    assert_eq!(updated.location, "A-14");
    assert_eq!(updated.status, BookStatus::Placed);
    assert!(matches!(
        store.update(BookId::new(999), dune()).await,
        Err(InventoryError::BookNotFound(_))
    ));
}

#[tokio::test]
async fn delete_hides_book_only_when_available() {
    let store = get_test_store().await;
    let book = store.insert(dune()).await.unwrap();
    store
        .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
        .await
        .unwrap();

    assert!(!store.try_delete(book.id).await.unwrap());

    store
        .force_status(book.id, BookStatus::Available)
        .await
        .unwrap();
    assert!(store.try_delete(book.id).await.unwrap());

    assert!(store.get(book.id).await.unwrap().is_none());
    assert!(matches!(
        store
            .try_transition(book.id, BookStatus::Available, BookStatus::Placed)
            .await,
        Err(InventoryError::BookNotFound(_))
    ));
    let page = store.list(PageRequest::new(1, 10).unwrap()).await.unwrap();
    assert_eq!(page.total, 0);
}
