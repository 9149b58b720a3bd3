mod common;

use common::{seed_memo, store, AUTHOR};
use tagnote_core::repo::tagging_store::{NewSpan, ProjectReviewStore, TaggingStore};
use tagnote_core::{
    open_db_in_memory, Category, CategoryCodec, DbError, SqliteTaggingStore, StoreError,
};

fn new_span(category: Category, start: usize, end: usize, text: &str) -> NewSpan {
    NewSpan {
        category,
        start,
        end,
        text: text.to_string(),
    }
}

#[tokio::test]
async fn created_spans_load_back_in_offset_order() {
    let conn = open_db_in_memory().unwrap();
    let (project_id, memo_id) = seed_memo(&conn, "found a bug in the parser");
    let store = store(&conn);

    store
        .create_span(memo_id, &new_span(Category::Solution, 19, 25, "parser"))
        .await
        .unwrap();
    store
        .create_span(memo_id, &new_span(Category::Problem, 8, 11, "bug"))
        .await
        .unwrap();

    let loaded = store.load_document(memo_id).await.unwrap();
    assert_eq!(loaded.project_id, project_id);
    assert_eq!(loaded.date, "2024-05-01");
    let spans: Vec<(Category, usize, usize, &str)> = loaded
        .spans
        .iter()
        .map(|s| (s.category, s.start, s.end, s.text.as_str()))
        .collect();
    assert_eq!(
        spans,
        vec![
            (Category::Problem, 8, 11, "bug"),
            (Category::Solution, 19, 25, "parser"),
        ]
    );
}

#[tokio::test]
async fn first_tagging_per_memo_returns_a_milestone() {
    let conn = open_db_in_memory().unwrap();
    let (_, memo_id) = seed_memo(&conn, "hello world");
    let store = store(&conn);

    let first = store
        .create_span(memo_id, &new_span(Category::Idea, 0, 5, "hello"))
        .await
        .unwrap();
    let second = store
        .create_span(memo_id, &new_span(Category::Idea, 6, 11, "world"))
        .await
        .unwrap();
    assert!(first.milestone.unwrap().success);
    assert_eq!(second.milestone, None);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn load_returns_only_the_authors_taggings() {
    let conn = open_db_in_memory().unwrap();
    let (_, memo_id) = seed_memo(&conn, "hello world");
    let other = SqliteTaggingStore::try_new(&conn, CategoryCodec::default(), "bo").unwrap();
    other
        .create_span(memo_id, &new_span(Category::Problem, 0, 11, "hello world"))
        .await
        .unwrap();

    let mine = store(&conn);
    assert!(mine.load_document(memo_id).await.unwrap().spans.is_empty());
    assert_eq!(other.load_document(memo_id).await.unwrap().spans.len(), 1);
    assert_eq!(mine.author(), AUTHOR);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let (_, memo_id) = seed_memo(&conn, "hello");
    let store = store(&conn);
    let created = store
        .create_span(memo_id, &new_span(Category::Idea, 0, 5, "hello"))
        .await
        .unwrap();

    store.delete_span(created.id).await.unwrap();
    store.delete_span(created.id).await.unwrap();
    store.delete_span(4242).await.unwrap();
    assert!(store.load_document(memo_id).await.unwrap().spans.is_empty());
}

#[tokio::test]
async fn deleting_another_members_tagging_leaves_it_in_place() {
    let conn = open_db_in_memory().unwrap();
    let (_, memo_id) = seed_memo(&conn, "hello");
    let bo = SqliteTaggingStore::try_new(&conn, CategoryCodec::default(), "bo").unwrap();
    let theirs = bo
        .create_span(memo_id, &new_span(Category::Problem, 0, 5, "hello"))
        .await
        .unwrap();

    store(&conn).delete_span(theirs.id).await.unwrap();
    let spans = bo.load_document(memo_id).await.unwrap().spans;
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].id, theirs.id);
}

#[tokio::test]
async fn milestone_is_not_earned_again_after_retagging() {
    let conn = open_db_in_memory().unwrap();
    let (_, memo_id) = seed_memo(&conn, "hello");
    let store = store(&conn);
    let first = store
        .create_span(memo_id, &new_span(Category::Problem, 0, 5, "hello"))
        .await
        .unwrap();
    assert!(first.milestone.is_some());

    store.delete_span(first.id).await.unwrap();
    let again = store
        .create_span(memo_id, &new_span(Category::Idea, 0, 5, "hello"))
        .await
        .unwrap();
    assert_eq!(again.milestone, None);

    let bo = SqliteTaggingStore::try_new(&conn, CategoryCodec::default(), "bo").unwrap();
    let theirs = bo
        .create_span(memo_id, &new_span(Category::Idea, 0, 5, "hello"))
        .await
        .unwrap();
    assert!(theirs.milestone.is_some());
}

#[tokio::test]
async fn unknown_codes_decode_to_fallback() {
    let conn = open_db_in_memory().unwrap();
    let (_, memo_id) = seed_memo(&conn, "hello");
    conn.execute(
        "INSERT INTO taggings (memo_id, user_name, tag_contents, offset_start, offset_end, tag_style)
         VALUES (?1, ?2, 'hel', 0, 3, 7);",
        rusqlite::params![memo_id, AUTHOR],
    )
    .unwrap();

    let loaded = store(&conn).load_document(memo_id).await.unwrap();
    assert_eq!(loaded.spans[0].category, Category::Problem);
}

#[tokio::test]
async fn categories_are_stored_as_codec_codes() {
    let conn = open_db_in_memory().unwrap();
    let (_, memo_id) = seed_memo(&conn, "hello");
    let created = store(&conn)
        .create_span(memo_id, &new_span(Category::Solution, 0, 5, "hello"))
        .await
        .unwrap();
    let code: i64 = conn
        .query_row(
            "SELECT tag_style FROM taggings WHERE id = ?1;",
            [created.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(code, 2);
}

#[tokio::test]
async fn missing_memo_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    assert!(matches!(
        store.load_document(77).await,
        Err(StoreError::NotFound(77))
    ));
    assert!(matches!(
        store.update_document_text(77, "x").await,
        Err(StoreError::NotFound(77))
    ));
    assert!(matches!(
        store
            .create_span(77, &new_span(Category::Idea, 0, 1, "x"))
            .await,
        Err(StoreError::NotFound(77))
    ));
}

#[test]
fn memo_dates_must_be_calendar_days() {
    let conn = open_db_in_memory().unwrap();
    let store = store(&conn);
    let project_id = store.create_project("retro", 0).unwrap();
    assert!(matches!(
        store.create_memo(project_id, "May 1st", ""),
        Err(StoreError::InvalidData(_))
    ));
}

#[tokio::test]
async fn project_listing_spans_every_member() {
    let conn = open_db_in_memory().unwrap();
    let (project_id, memo_id) = seed_memo(&conn, "hello world");
    let mine = store(&conn);
    mine.add_member(project_id, "bo").unwrap();
    let other = SqliteTaggingStore::try_new(&conn, CategoryCodec::default(), "bo").unwrap();
    mine.create_span(memo_id, &new_span(Category::Idea, 0, 5, "hello"))
        .await
        .unwrap();
    other
        .create_span(memo_id, &new_span(Category::Problem, 6, 11, "world"))
        .await
        .unwrap();

    let taggings = mine.list_project_taggings(project_id).await.unwrap();
    let users: Vec<&str> = taggings.iter().map(|t| t.user_name.as_str()).collect();
    assert_eq!(users, vec!["ana", "bo"]);

    let summary = mine.load_project(project_id).await.unwrap();
    assert_eq!(summary.name, "retro");
    assert_eq!(summary.required_taggings, 10);
    assert_eq!(summary.members, vec!["ana".to_string(), "bo".to_string()]);
}

#[test]
fn unmigrated_connection_is_refused() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = SqliteTaggingStore::try_new(&conn, CategoryCodec::default(), AUTHOR)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        StoreError::Db(DbError::MissingTable("projects"))
    ));
}
