//! SQLite-backed repository shared by every catalog entity

use std::marker::PhantomData;
use std::sync::Arc;

use sqlx::{query::QueryAs, sqlite::SqliteArguments, Sqlite, SqlitePool};
use tracing::instrument;

use super::entity::{CatalogEntity, ColumnValue, EntityDescriptor};
use super::error::{is_foreign_key_failure, RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::pagination::{PageRequest, PaginatedList};
use super::traits::{References, RelationLoader, Repository, RepositoryResult};

/// SQL rendered once from an [`EntityDescriptor`]
#[derive(Debug)]
struct Statements {
    select_by_id: String,
    select_page: String,
    count: String,
    insert: String,
    update: String,
    delete: String,
}

impl Statements {
    fn render(descriptor: &EntityDescriptor) -> Self {
        let table = descriptor.table;
        let select_list = descriptor.select_list();
        let placeholders = vec!["?"; descriptor.columns.len()].join(", ");
        let assignments = descriptor
            .columns
            .iter()
            .map(|column| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            select_by_id: format!("SELECT {} FROM {} WHERE id = ?", select_list, table),
            select_page: format!(
                "SELECT {} FROM {} ORDER BY id LIMIT ? OFFSET ?",
                select_list, table
            ),
            count: format!("SELECT COUNT(*) FROM {}", table),
            insert: format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                table,
                descriptor.columns.join(", "),
                placeholders,
                select_list
            ),
            // A single conditional statement: a missing row yields no RETURNING
            // row and nothing is written.
            update: format!(
                "UPDATE {} SET {} WHERE id = ? RETURNING {}",
                table, assignments, select_list
            ),
            delete: format!("DELETE FROM {} WHERE id = ?", table),
        }
    }
}

/// Generic repository over one SQLite table
///
/// Cloning is cheap: the pool and the rendered statements are shared.
pub struct SqlRepository<E> {
    pool: SqlitePool,
    statements: Arc<Statements>,
    entity: PhantomData<fn() -> E>,
}

impl<E> Clone for SqlRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            statements: Arc::clone(&self.statements),
            entity: PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for SqlRepository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlRepository")
            .field("statements", &self.statements)
            .finish_non_exhaustive()
    }
}

impl<E: CatalogEntity> SqlRepository<E> {
    /// Create a repository for `E` on top of a shared pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            statements: Arc::new(Statements::render(&E::DESCRIPTOR)),
            entity: PhantomData,
        }
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Classify a driver error and attach entity context
    fn classify(
        &self,
        operation: RepositoryOperation,
        err: sqlx::Error,
        id: Option<i64>,
    ) -> RepositoryError {
        let descriptor = E::DESCRIPTOR;
        let foreign_key = is_foreign_key_failure(&err);

        let mut error = RepositoryError::from_sqlx(operation, err);
        error = match id {
            Some(id) => error.with_entity(descriptor.name, id),
            None => error.with_entity_type(descriptor.name),
        };

        if foreign_key {
            error = match (operation, id) {
                (RepositoryOperation::Delete, Some(id)) if !descriptor.referenced_by.is_empty() => {
                    error.with_message(descriptor.still_referenced_message(id))
                }
                (RepositoryOperation::Create | RepositoryOperation::Update, _)
                    if !descriptor.foreign_keys.is_empty() =>
                {
                    error.with_message(descriptor.dangling_reference_message())
                }
                _ => error,
            };
        }

        match error.kind {
            RepositoryErrorKind::StorageUnavailable | RepositoryErrorKind::DatabaseError => {
                tracing::error!(
                    operation = %error.operation,
                    kind = %error.kind,
                    entity_type = descriptor.name,
                    entity_id = ?error.entity_id,
                    retriable = error.is_retriable(),
                    "Storage failure: {}", error.message
                );
            }
            _ => {
                tracing::warn!(
                    operation = %error.operation,
                    kind = %error.kind,
                    entity_type = descriptor.name,
                    entity_id = ?error.entity_id,
                    "Storage rejected request: {}", error.message
                );
            }
        }

        error
    }
}

/// Bind mutable column values in descriptor order
fn bind_values<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    values: Vec<ColumnValue>,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            ColumnValue::Text(text) => query.bind(text),
            ColumnValue::Integer(number) => query.bind(number),
        };
    }
    query
}

impl<E: CatalogEntity> Repository<E> for SqlRepository<E> {
    #[instrument(skip(self, draft), fields(entity = E::DESCRIPTOR.name))]
    async fn create(&self, draft: E::Draft) -> RepositoryResult<E> {
        let query = bind_values(
            sqlx::query_as::<_, E>(&self.statements.insert),
            E::draft_values(draft),
        );
        let created = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.classify(RepositoryOperation::Create, e, None))?;

        tracing::debug!(id = created.id(), "Entity created");
        Ok(created)
    }

    #[instrument(skip(self), fields(entity = E::DESCRIPTOR.name))]
    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<E>> {
        sqlx::query_as::<_, E>(&self.statements.select_by_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.classify(RepositoryOperation::GetById, e, Some(id)))
    }

    #[instrument(skip(self), fields(entity = E::DESCRIPTOR.name))]
    async fn list(&self, page: i64, page_size: i64) -> RepositoryResult<PaginatedList<E>> {
        let request = PageRequest::new(page, page_size)
            .map_err(|e| e.with_entity_type(E::DESCRIPTOR.name))?;
        let classify = |e: sqlx::Error| self.classify(RepositoryOperation::List, e, None);

        // Count and page are read from the same snapshot.
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let total: i64 = sqlx::query_scalar(&self.statements.count)
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;
        let window = request.window(u64::try_from(total).unwrap_or_default());

        let items = sqlx::query_as::<_, E>(&self.statements.select_page)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&mut *tx)
            .await
            .map_err(classify)?;

        tx.commit().await.map_err(classify)?;

        tracing::debug!(
            total,
            returned = items.len(),
            total_pages = window.total_pages,
            "Page fetched"
        );
        Ok(PaginatedList::new(items, request.page(), window.total_pages))
    }

    #[instrument(skip(self, entity), fields(entity = E::DESCRIPTOR.name, id = entity.id()))]
    async fn update(&self, entity: E) -> RepositoryResult<E> {
        let id = entity.id();
        let query = bind_values(
            sqlx::query_as::<_, E>(&self.statements.update),
            entity.into_values(),
        )
        .bind(id);

        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.classify(RepositoryOperation::Update, e, Some(id)))?
            .ok_or_else(|| {
                RepositoryError::not_found(RepositoryOperation::Update, E::DESCRIPTOR.name, id)
            })
    }

    #[instrument(skip(self), fields(entity = E::DESCRIPTOR.name))]
    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query(&self.statements.delete)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.classify(RepositoryOperation::Delete, e, Some(id)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(
                RepositoryOperation::Delete,
                E::DESCRIPTOR.name,
                id,
            ));
        }

        tracing::debug!("Entity deleted");
        Ok(())
    }
}

impl<P, C> RelationLoader<P, C> for SqlRepository<C>
where
    C: References<P>,
{
    #[instrument(skip(self), fields(entity = C::DESCRIPTOR.name, column = C::COLUMN))]
    async fn load_many(&self, parent_id: i64) -> RepositoryResult<Vec<C>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY id",
            C::DESCRIPTOR.select_list(),
            C::DESCRIPTOR.table,
            C::COLUMN
        );
        sqlx::query_as::<_, C>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.classify(RepositoryOperation::LoadRelated, e, None))
    }

    #[instrument(skip(self), fields(entity = C::DESCRIPTOR.name, column = C::COLUMN))]
    async fn count(&self, parent_id: i64) -> RepositoryResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            C::DESCRIPTOR.table,
            C::COLUMN
        );
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(parent_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.classify(RepositoryOperation::LoadRelated, e, None))?;
        Ok(u64::try_from(total).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::{apply_schema, connect_in_memory, create_pool};
    use crate::model::{Author, Book, Category, NewAuthor, NewBook, NewCategory, Price};

    struct Catalog {
        authors: SqlRepository<Author>,
        categories: SqlRepository<Category>,
        books: SqlRepository<Book>,
    }

    async fn catalog() -> Catalog {
        let pool = connect_in_memory().await.unwrap();
        Catalog {
            authors: SqlRepository::new(pool.clone()),
            categories: SqlRepository::new(pool.clone()),
            books: SqlRepository::new(pool),
        }
    }

    fn new_author(name: &str) -> NewAuthor {
        NewAuthor {
            name: name.to_string(),
        }
    }

    fn book(title: &str, author_id: i64, category_id: i64) -> NewBook {
        NewBook {
            title: title.to_string(),
            price: Price::from_cents(1299),
            author_id,
            category_id,
        }
    }

    async fn seeded() -> (Catalog, Author, Category) {
        let catalog = catalog().await;
        let author = catalog.authors.create(new_author("Octavia Butler")).await.unwrap();
        let category = catalog
            .categories
            .create(NewCategory {
                name: "Science Fiction".to_string(),
            })
            .await
            .unwrap();
        (catalog, author, category)
    }

    #[test]
    fn test_statements_render_from_descriptor() {
        let statements = Statements::render(&Book::DESCRIPTOR);
        assert_eq!(
            statements.insert,
            "INSERT INTO books (title, price_cents, author_id, category_id) VALUES (?, ?, ?, ?) \
             RETURNING id, title, price_cents, author_id, category_id"
        );
        assert_eq!(
            statements.update,
            "UPDATE books SET title = ?, price_cents = ?, author_id = ?, category_id = ? \
             WHERE id = ? RETURNING id, title, price_cents, author_id, category_id"
        );
        assert_eq!(statements.delete, "DELETE FROM books WHERE id = ?");
        assert_eq!(statements.count, "SELECT COUNT(*) FROM books");
    }

    #[tokio::test]
    async fn test_list_empty_table() {
        let catalog = catalog().await;
        let page = catalog.authors.list(1, 10).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let catalog = catalog().await;
        let mut created = Vec::new();
        for name in ["Le Guin", "Herbert", "Asimov", "Banks"] {
            created.push(catalog.authors.create(new_author(name)).await.unwrap());
        }

        let page = catalog.authors.list(1, 10).await.unwrap();
        assert_eq!(page.items, created);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_list_second_page_and_past_end() {
        let catalog = catalog().await;
        for n in 0..5 {
            catalog
                .authors
                .create(new_author(&format!("Author {}", n)))
                .await
                .unwrap();
        }

        let page = catalog.authors.list(2, 2).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Author 2", "Author 3"]);
        assert_eq!(page.total_pages, 3);

        let beyond = catalog.authors.list(9, 2).await.unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.page, 9);
        assert_eq!(beyond.total_pages, 3);
    }

    #[tokio::test]
    async fn test_list_rejects_invalid_arguments() {
        let catalog = catalog().await;
        let err = catalog.books.list(0, 10).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
        assert_eq!(err.entity_type.as_deref(), Some("Book"));

        let err = catalog.books.list(1, 0).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let (catalog, author, category) = seeded().await;
        let created = catalog
            .books
            .create(book("Kindred", author.id, category.id))
            .await
            .unwrap();

        let fetched = catalog.books.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched.as_ref(), Some(&created));
        assert_eq!(created.title, "Kindred");
        assert_eq!(created.price, Price::from_cents(1299));

        let again = catalog.books.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched, again);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let catalog = catalog().await;
        assert_eq!(catalog.authors.get_by_id(1).await.unwrap(), None);
        assert_eq!(catalog.authors.get_by_id(-5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_book_with_missing_author_is_constraint_violation() {
        let (catalog, _, category) = seeded().await;
        let err = catalog
            .books
            .create(book("Orphan", 999, category.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
        assert_eq!(err.operation, RepositoryOperation::Create);
        assert!(err.message.contains("does not exist"));
        assert_eq!(catalog.books.list(1, 10).await.unwrap().total_pages, 0);
    }

    #[tokio::test]
    async fn test_storage_rejects_overlong_name() {
        let catalog = catalog().await;
        let err = catalog
            .authors
            .create(new_author(&"x".repeat(51)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
    }

    #[tokio::test]
    async fn test_update_overwrites_fields_and_keeps_id() {
        let (catalog, author, category) = seeded().await;
        let other = catalog.authors.create(new_author("N. K. Jemisin")).await.unwrap();
        let created = catalog
            .books
            .create(book("Dawn", author.id, category.id))
            .await
            .unwrap();

        let updated = catalog
            .books
            .update(Book {
                title: "The Fifth Season".to_string(),
                price: Price::from_cents(1850),
                author_id: other.id,
                ..created.clone()
            })
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "The Fifth Season");
        assert_eq!(updated.author_id, other.id);
        assert_eq!(
            catalog.books.get_by_id(created.id).await.unwrap(),
            Some(updated)
        );
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found_and_writes_nothing() {
        let (catalog, _, _) = seeded().await;
        let err = catalog
            .authors
            .update(Author {
                id: 42,
                name: "Ghost".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.entity_id, Some(42));

        let page = catalog.authors.list(1, 10).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.items.iter().all(|a| a.name != "Ghost"));
    }

    #[tokio::test]
    async fn test_update_book_to_missing_category_is_constraint_violation() {
        let (catalog, author, category) = seeded().await;
        let created = catalog
            .books
            .create(book("Parable of the Sower", author.id, category.id))
            .await
            .unwrap();

        let err = catalog
            .books
            .update(Book {
                category_id: 404,
                ..created.clone()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
        assert_eq!(err.operation, RepositoryOperation::Update);
        assert_eq!(
            catalog.books.get_by_id(created.id).await.unwrap(),
            Some(created)
        );
    }

    #[tokio::test]
    async fn test_update_persists_non_positive_price_as_given() {
        let (catalog, author, category) = seeded().await;
        let created = catalog
            .books
            .create(book("Free", author.id, category.id))
            .await
            .unwrap();

        let updated = catalog
            .books
            .update(Book {
                price: Price::from_cents(-100),
                ..created
            })
            .await
            .unwrap();
        assert_eq!(updated.price, Price::from_cents(-100));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let catalog = catalog().await;
        let err = catalog.categories.delete(7).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert_eq!(err.operation, RepositoryOperation::Delete);
    }

    #[tokio::test]
    async fn test_delete_referenced_author_is_constraint_violation() {
        let (catalog, author, category) = seeded().await;
        let created = catalog
            .books
            .create(book("Wild Seed", author.id, category.id))
            .await
            .unwrap();

        let err = catalog.authors.delete(author.id).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
        assert_eq!(
            err.message,
            format!("Author {} is still referenced by Book rows", author.id)
        );

        assert_eq!(
            catalog.authors.get_by_id(author.id).await.unwrap(),
            Some(author)
        );
        assert_eq!(
            catalog.books.get_by_id(created.id).await.unwrap(),
            Some(created)
        );
    }

    #[tokio::test]
    async fn test_delete_referenced_category_is_constraint_violation() {
        let (catalog, author, category) = seeded().await;
        catalog
            .books
            .create(book("Lilith's Brood", author.id, category.id))
            .await
            .unwrap();

        let err = catalog.categories.delete(category.id).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_absent() {
        let (catalog, author, category) = seeded().await;
        let created = catalog
            .books
            .create(book("Fledgling", author.id, category.id))
            .await
            .unwrap();

        catalog.books.delete(created.id).await.unwrap();
        assert_eq!(catalog.books.get_by_id(created.id).await.unwrap(), None);

        // Once the book is gone the author is no longer restricted.
        catalog.authors.delete(author.id).await.unwrap();
        assert_eq!(catalog.authors.get_by_id(author.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_relation_loader_finds_books_by_parent() {
        let (catalog, author, category) = seeded().await;
        let other = catalog.authors.create(new_author("Iain M. Banks")).await.unwrap();
        let first = catalog
            .books
            .create(book("Kindred", author.id, category.id))
            .await
            .unwrap();
        catalog
            .books
            .create(book("Excession", other.id, category.id))
            .await
            .unwrap();
        let second = catalog
            .books
            .create(book("Dawn", author.id, category.id))
            .await
            .unwrap();

        let by_author = RelationLoader::<Author, Book>::load_many(&catalog.books, author.id)
            .await
            .unwrap();
        assert_eq!(by_author, vec![first, second]);

        let in_category = RelationLoader::<Category, Book>::count(&catalog.books, category.id)
            .await
            .unwrap();
        assert_eq!(in_category, 3);

        let none = RelationLoader::<Author, Book>::count(&catalog.books, 999)
            .await
            .unwrap();
        assert_eq!(none, 0);
    }

    async fn file_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("catalog.db").display()),
            max_retries: 0,
            ..DatabaseConfig::default()
        };
        let pool = create_pool(&config).await.unwrap();
        apply_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_file_pool_classifies_restricted_delete() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir).await;
        let authors = SqlRepository::<Author>::new(pool.clone());
        let categories = SqlRepository::<Category>::new(pool.clone());
        let books = SqlRepository::<Book>::new(pool.clone());

        let author = authors.create(new_author("Ursula K. Le Guin")).await.unwrap();
        let category = categories
            .create(NewCategory {
                name: "Fantasy".to_string(),
            })
            .await
            .unwrap();
        books
            .create(book("A Wizard of Earthsea", author.id, category.id))
            .await
            .unwrap();

        let err = authors.delete(author.id).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
        assert_eq!(
            err.message,
            format!("Author {} is still referenced by Book rows", author.id)
        );

        let err = categories.delete(category.id).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ConstraintViolation);
        assert_eq!(
            err.message,
            format!("Category {} is still referenced by Book rows", category.id)
        );
        pool.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_across_repositories() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir).await;
        let category_id = SqlRepository::<Category>::new(pool.clone())
            .create(NewCategory {
                name: "Anthology".to_string(),
            })
            .await
            .unwrap()
            .id;

        let mut tasks = Vec::new();
        for n in 0..8 {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                let authors = SqlRepository::<Author>::new(pool.clone());
                let books = SqlRepository::<Book>::new(pool);

                let author = authors
                    .create(new_author(&format!("Contributor {}", n)))
                    .await?;
                let created = books
                    .create(book(&format!("Story {}", n), author.id, category_id))
                    .await?;
                books.list(1, 5).await?;
                authors.list(1, 5).await?;

                let restricted = authors.delete(author.id).await;
                assert!(matches!(
                    restricted,
                    Err(ref e) if e.kind == RepositoryErrorKind::ConstraintViolation
                ));

                books.delete(created.id).await?;
                authors.delete(author.id).await?;
                Ok::<_, RepositoryError>(())
            }));
        }

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let authors = SqlRepository::<Author>::new(pool.clone());
        let books = SqlRepository::<Book>::new(pool.clone());
        assert_eq!(authors.list(1, 10).await.unwrap().total_pages, 0);
        assert_eq!(books.list(1, 10).await.unwrap().total_pages, 0);
        pool.close().await;
    }
}
