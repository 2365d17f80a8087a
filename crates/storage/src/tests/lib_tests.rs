use chrono::NaiveDate;

use super::*;

fn fields(first_name: &str, family_name: &str) -> AuthorFields {
    AuthorFields {
        first_name: first_name.into(),
        family_name: family_name.into(),
        date_of_birth: None,
        date_of_death: None,
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("catalog.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn inserted_author_round_trips_with_dates() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mut input = fields("Jane", "Austen");
    input.date_of_birth = NaiveDate::from_ymd_opt(1775, 12, 16);
    input.date_of_death = NaiveDate::from_ymd_opt(1817, 7, 18);

    let id = storage.insert_author(&input).await.expect("insert");
    let author = storage.find_author(id).await.expect("find").expect("present");
    assert_eq!(
        author,
        Author {
            id,
            first_name: input.first_name,
            family_name: input.family_name,
            date_of_birth: input.date_of_birth,
            date_of_death: input.date_of_death,
        }
    );
}

#[tokio::test]
async fn ids_are_fresh_even_after_deletion() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let first = storage.insert_author(&fields("A", "One")).await.expect("insert");
    assert_eq!(
        storage.remove_author(first).await.expect("remove"),
        Removal::Removed
    );
    let second = storage.insert_author(&fields("B", "Two")).await.expect("insert");
    assert_ne!(first, second);
}

#[tokio::test]
async fn lists_authors_by_family_name() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    for family in ["Tolkien", "Austen", "Orwell"] {
        storage.insert_author(&fields("X", family)).await.expect("insert");
    }
    let families: Vec<String> = storage
        .find_all_authors()
        .await
        .expect("list")
        .into_iter()
        .map(|a| a.family_name)
        .collect();
    assert_eq!(families, ["Austen", "Orwell", "Tolkien"]);
}

#[tokio::test]
async fn replace_overwrites_every_field_and_keeps_id() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mut original = fields("Old", "Person");
    original.date_of_birth = NaiveDate::from_ymd_opt(1900, 1, 1);
    let id = storage.insert_author(&original).await.expect("insert");

    let replaced = storage
        .replace_author(id, &fields("New", "Name"))
        .await
        .expect("replace")
        .expect("present");
    assert_eq!(replaced.id, id);
    assert_eq!(replaced.first_name, "New");
    assert_eq!(replaced.family_name, "Name");
    assert_eq!(replaced.date_of_birth, None);
}

#[tokio::test]
async fn replace_of_missing_author_returns_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let replaced = storage
        .replace_author(AuthorId(99), &fields("New", "Name"))
        .await
        .expect("replace");
    assert!(replaced.is_none());
}

#[tokio::test]
async fn books_are_found_by_author_only() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let orwell = storage.insert_author(&fields("George", "Orwell")).await.expect("insert");
    let huxley = storage.insert_author(&fields("Aldous", "Huxley")).await.expect("insert");
    storage.create_book("Nineteen Eighty-Four", "", orwell).await.expect("book");
    storage.create_book("Animal Farm", "", orwell).await.expect("book");
    storage.create_book("Brave New World", "", huxley).await.expect("book");

    let books = storage.find_books_by_author(orwell).await.expect("books");
    let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Animal Farm", "Nineteen Eighty-Four"]);
    assert!(books.iter().all(|b| b.author_id == orwell));
}

#[tokio::test]
async fn remove_refuses_referenced_author() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let id = storage.insert_author(&fields("George", "Orwell")).await.expect("insert");
    let book = storage.create_book("Animal Farm", "", id).await.expect("book");

    assert_eq!(
        storage.remove_author(id).await.expect("remove"),
        Removal::Referenced
    );
    assert!(storage.find_author(id).await.expect("find").is_some());

    assert!(storage.delete_book(book).await.expect("delete book"));
    assert_eq!(
        storage.remove_author(id).await.expect("remove"),
        Removal::Removed
    );
    assert!(storage.find_author(id).await.expect("find").is_none());
}

#[tokio::test]
async fn remove_of_missing_author_reports_missing() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert_eq!(
        storage.remove_author(AuthorId(5)).await.expect("remove"),
        Removal::Missing
    );
}

#[test]
fn memory_urls_have_no_parent_dir() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert!(sqlite_path("postgres://localhost/db").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/catalog.db?mode=rwc"),
        Some(PathBuf::from("./data/catalog.db"))
    );
}
