#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use cypherforge::schema::{Entity, Field, ScalarType, SearchIndexSpec, UniquenessSpec};
use cypherforge::{Error, ReconcileOptions, Reconciler, Schema};
use support::MemoryStore;

fn schema(movie_labels: &[&str]) -> Arc<Schema> {
    let movie = Entity::new("Movie")
        .with_labels(movie_labels.iter().copied())
        .with_field(Field::scalar("id", ScalarType::Id))
        .with_field(Field::scalar("title", ScalarType::String))
        .with_field(Field::scalar("summary", ScalarType::String).aliased("description"))
        .with_search_index(SearchIndexSpec::fulltext("MovieTitle", ["title", "summary"]));
    let book = Entity::new("Book")
        .with_field(Field::scalar("isbn", ScalarType::String).required())
        .with_uniqueness(UniquenessSpec::unique("isbn"));
    Arc::new(Schema::new(vec![movie, book]).expect("schema"))
}

fn create() -> ReconcileOptions {
    ReconcileOptions {
        create: true,
        ..ReconcileOptions::default()
    }
}

fn problems(err: Error) -> Vec<String> {
    match err {
        Error::Reconcile(err) => err.problems.iter().map(ToString::to_string).collect(),
        other => panic!("expected reconcile error, got {other}"),
    }
}

#[tokio::test]
async fn reports_every_missing_object() {
    let store = MemoryStore::new();
    let reconciler = Reconciler::new(schema(&["Movie"]));
    let err = reconciler
        .assert_indexes_and_constraints(&store, &ReconcileOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        problems(err),
        vec![
            "Missing @fulltext index 'MovieTitle' on Node 'Movie'".to_owned(),
            "Missing constraint for Book.isbn".to_owned(),
        ]
    );
    assert!(store.creations().is_empty());
}

#[tokio::test]
async fn creation_is_idempotent() -> cypherforge::Result<()> {
    let store = MemoryStore::new();
    let reconciler = Reconciler::new(schema(&["Movie"]));
    reconciler
        .assert_indexes_and_constraints(&store, &create())
        .await?;
    assert_eq!(
        store.creations(),
        vec![
            "CREATE FULLTEXT INDEX MovieTitle IF NOT EXISTS FOR (n:Movie) ON EACH [n.title, n.description]"
                .to_owned(),
            "CREATE CONSTRAINT Book_isbn IF NOT EXISTS FOR (n:Book) REQUIRE n.isbn IS UNIQUE".to_owned(),
        ]
    );

    reconciler
        .assert_indexes_and_constraints(&store, &create())
        .await?;
    assert_eq!(store.creations().len(), 2);
    assert_eq!(store.indexes().len(), 1);
    assert_eq!(store.constraints().len(), 1);

    reconciler
        .assert_indexes_and_constraints(&store, &ReconcileOptions::default())
        .await?;
    Ok(())
}

#[tokio::test]
async fn objects_on_additional_labels_satisfy_the_schema() -> cypherforge::Result<()> {
    let store = MemoryStore::new()
        .with_index("film_text", "FULLTEXT", "Film", &["title", "description"])
        .with_constraint("book_isbn", "Book", "isbn");
    let reconciler = Reconciler::new(schema(&["Movie", "Film"]));
    reconciler
        .assert_indexes_and_constraints(&store, &ReconcileOptions::default())
        .await?;
    reconciler
        .assert_indexes_and_constraints(&store, &create())
        .await?;
    assert!(store.creations().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_fields_are_named_by_declared_and_stored_name() {
    let store = MemoryStore::new()
        .with_index("MovieTitle", "FULLTEXT", "Movie", &["title"])
        .with_constraint("Book_isbn", "Book", "isbn");
    let reconciler = Reconciler::new(schema(&["Movie"]));

    let err = reconciler
        .assert_indexes_and_constraints(&store, &ReconcileOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        problems(err),
        vec![
            "@fulltext index 'MovieTitle' on Node 'Movie' is missing field 'summary' aliased to field 'description'"
                .to_owned()
        ]
    );

    let err = reconciler
        .assert_indexes_and_constraints(&store, &create())
        .await
        .unwrap_err();
    assert_eq!(
        problems(err),
        vec![
            "@fulltext index 'MovieTitle' on Node 'Movie' already exists, but is missing field 'summary' aliased to field 'description'"
                .to_owned()
        ]
    );
    assert!(store.creations().is_empty());
}

#[tokio::test]
async fn unfixable_mismatches_block_every_creation() {
    let store = MemoryStore::new().with_index("MovieTitle", "FULLTEXT", "Movie", &["description"]);
    let reconciler = Reconciler::new(schema(&["Movie"]));
    let err = reconciler
        .assert_indexes_and_constraints(&store, &create())
        .await
        .unwrap_err();
    let message = err.to_string();
    assert_eq!(
        message,
        "@fulltext index 'MovieTitle' on Node 'Movie' already exists, but is missing field 'title'"
    );
    assert!(store.constraints().is_empty());
}

#[tokio::test]
async fn existence_constraints_do_not_stand_in_for_uniqueness() -> cypherforge::Result<()> {
    let store = MemoryStore::new()
        .with_index("MovieTitle", "FULLTEXT", "Movie", &["title", "description"])
        .with_constraint_of_type("book_isbn_exists", "NODE_PROPERTY_EXISTENCE", "Book", "isbn");
    let reconciler = Reconciler::new(schema(&["Movie"]));

    let err = reconciler
        .assert_indexes_and_constraints(&store, &ReconcileOptions::default())
        .await
        .unwrap_err();
    assert_eq!(problems(err), vec!["Missing constraint for Book.isbn".to_owned()]);

    reconciler
        .assert_indexes_and_constraints(&store, &create())
        .await?;
    assert_eq!(
        store.creations(),
        vec!["CREATE CONSTRAINT Book_isbn IF NOT EXISTS FOR (n:Book) REQUIRE n.isbn IS UNIQUE".to_owned()]
    );
    let constraints = store.constraints();
    assert_eq!(constraints.len(), 2);
    assert!(constraints[1].enforces_uniqueness());
    Ok(())
}

#[tokio::test]
async fn index_names_held_by_other_index_types_are_reported() {
    let store = MemoryStore::new()
        .with_index("MovieTitle", "RANGE", "Movie", &["title", "description"])
        .with_constraint("Book_isbn", "Book", "isbn");
    let reconciler = Reconciler::new(schema(&["Movie"]));
    let expected = vec![
        "@fulltext index 'MovieTitle' on Node 'Movie' conflicts with existing RANGE index of the same name on [Movie]"
            .to_owned(),
    ];
    for options in [ReconcileOptions::default(), create()] {
        let err = reconciler
            .assert_indexes_and_constraints(&store, &options)
            .await
            .unwrap_err();
        assert_eq!(problems(err), expected);
    }
    assert!(store.creations().is_empty());
}

#[tokio::test]
async fn targets_the_configured_database() -> cypherforge::Result<()> {
    let store = MemoryStore::new();
    let options = ReconcileOptions {
        database: Some("movies".to_owned()),
        create: true,
    };
    Reconciler::new(schema(&["Movie"]))
        .assert_indexes_and_constraints(&store, &options)
        .await?;
    let received = store.received();
    assert_eq!(received.len(), 4);
    assert!(received
        .iter()
        .all(|r| r.database.as_deref() == Some("movies")));
    Ok(())
}
