#[path = "../support/mod.rs"]
mod support;

use std::collections::BTreeMap;
use std::sync::Arc;

use cypherforge::executor::CONSTRAINT_VIOLATION_CODE;
use cypherforge::request::{Args, CreateRequest, FieldSelection, ReadRequest};
use cypherforge::schema::{Entity, Field, ScalarType, UniquenessSpec};
use cypherforge::{
    execute, value_map, Compiler, CompilerOptions, Error, ExecutorError, Operation,
    ReconcileOptions, Reconciler, RequestContext, Schema, Value,
};
use support::{this_row, MemoryStore};

fn schema() -> Arc<Schema> {
    let book = Entity::new("Book")
        .with_field(Field::scalar("isbn", ScalarType::String).required())
        .with_field(Field::scalar("title", ScalarType::String))
        .with_uniqueness(UniquenessSpec::unique("isbn"));
    Arc::new(Schema::new(vec![book]).expect("schema"))
}

fn create_book(isbn: &str) -> Operation {
    Operation::Create(CreateRequest {
        entity: "Book".into(),
        input: vec![BTreeMap::from([
            ("isbn".to_owned(), Value::from(isbn)),
            ("title".to_owned(), Value::from("Dune")),
        ])],
        selection: vec![FieldSelection::scalar("isbn")],
    })
}

#[tokio::test]
async fn duplicate_values_fail_with_a_stable_message() -> cypherforge::Result<()> {
    let schema = schema();
    let store = MemoryStore::new();
    Reconciler::new(schema.clone())
        .assert_indexes_and_constraints(
            &store,
            &ReconcileOptions {
                create: true,
                ..ReconcileOptions::default()
            },
        )
        .await?;
    assert_eq!(store.constraints()[0].properties, ["isbn"]);

    let compiler = Compiler::new(schema, CompilerOptions::default());
    let ctx = RequestContext::anonymous();
    let first = compiler.compile(&create_book("123"), &ctx)?;
    let second = compiler.compile(&create_book("123"), &ctx)?;
    assert_eq!(first.cypher, second.cypher);
    assert!(first
        .cypher
        .starts_with("CALL {\n    CREATE (this0:Book)\n    SET this0.isbn = $param0, this0.title = $param1"));

    store.reply(Ok(vec![this_row(value_map! { "isbn" => "123" })]));
    store.reply(Err(ExecutorError::with_code(
        CONSTRAINT_VIOLATION_CODE,
        "Node(0) already exists with label `Book` and property `isbn` = '123'",
    )));

    let created = execute(&store, &first, &ctx).await?;
    assert_eq!(created, vec![value_map! { "isbn" => "123" }]);

    let err = execute(&store, &second, &ctx).await.unwrap_err();
    assert!(matches!(err, Error::ConstraintValidationFailed));
    assert_eq!(err.to_string(), "Constraint validation failed");

    let read = Operation::Read(ReadRequest {
        entity: "Book".into(),
        args: Args {
            filter: Some(value_map! { "isbn" => "123" }),
            ..Args::default()
        },
        selection: vec![FieldSelection::scalar("isbn")],
    });
    let compiled = compiler.compile(&read, &ctx)?;
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Book)\nWHERE this.isbn = $param0\nRETURN this { .isbn } AS this"
    );
    store.reply(Ok(vec![this_row(value_map! { "isbn" => "123" })]));
    assert_eq!(execute(&store, &compiled, &ctx).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn other_store_errors_pass_through_unmodified() -> cypherforge::Result<()> {
    let store = MemoryStore::new();
    let compiler = Compiler::new(schema(), CompilerOptions::default());
    let ctx = RequestContext::anonymous();
    let compiled = compiler.compile(&create_book("9"), &ctx)?;
    store.reply(Err(ExecutorError::with_code(
        "Neo.TransientError.Transaction.DeadlockDetected",
        "deadlock",
    )));
    let err = execute(&store, &compiled, &ctx).await.unwrap_err();
    match err {
        Error::Executor(inner) => {
            assert_eq!(inner.code.as_deref(), Some("Neo.TransientError.Transaction.DeadlockDetected"));
            assert_eq!(inner.message, "deadlock");
        }
        other => panic!("unexpected error {other}"),
    }
    Ok(())
}
