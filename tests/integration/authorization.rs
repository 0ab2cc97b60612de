#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use cypherforge::auth::FORBIDDEN_MARKER;
use cypherforge::request::{Args, DeleteRequest, FieldSelection, ReadRequest};
use cypherforge::schema::{
    AuthOperation, AuthorizationRules, Entity, Field, FilterRule, ScalarType, ValidateRule,
    ValidationTiming,
};
use cypherforge::{
    execute, value_map, Claims, Compiler, CompilerOptions, Error, ExecutorError, Operation,
    RequestContext, Schema, Value,
};
use support::MemoryStore;

fn compiler() -> Compiler {
    let rules = AuthorizationRules::default()
        .with_filter(FilterRule::node(value_map! { "owner" => "$jwt.sub" }).on([AuthOperation::Read]))
        .with_filter(
            FilterRule::node(value_map! { "published" => true })
                .on([AuthOperation::Read])
                .allow_unauthenticated(),
        )
        .with_validate(
            ValidateRule::node(value_map! { "owner" => "$jwt.sub" })
                .on([AuthOperation::Delete])
                .at([ValidationTiming::Before]),
        );
    let post = Entity::new("Post")
        .with_field(Field::scalar("title", ScalarType::String))
        .with_field(Field::scalar("owner", ScalarType::String))
        .with_field(Field::scalar("published", ScalarType::Boolean))
        .with_authorization(rules);
    Compiler::new(
        Arc::new(Schema::new(vec![post]).expect("schema")),
        CompilerOptions::default(),
    )
}

fn user(sub: &str) -> RequestContext {
    RequestContext::authenticated(Claims::new(value_map! { "sub" => sub }))
}

fn read_titles(filter: Value) -> Operation {
    Operation::Read(ReadRequest {
        entity: "Post".into(),
        args: Args {
            filter: Some(filter),
            ..Args::default()
        },
        selection: vec![FieldSelection::scalar("title")],
    })
}

fn delete(title: &str) -> Operation {
    Operation::Delete(DeleteRequest {
        entity: "Post".into(),
        filter: Some(value_map! { "title" => title }),
    })
}

#[test]
fn filter_rules_are_alternatives_added_to_the_caller_filter() -> cypherforge::Result<()> {
    let op = read_titles(value_map! { "title_CONTAINS" => "rust" });
    let compiled = compiler().compile(&op, &user("u1"))?;
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Post)\n\
         WHERE this.title CONTAINS $param0 AND (this.owner = $param1 OR this.published = $param2)\n\
         RETURN this { .title } AS this"
    );
    assert_eq!(compiled.params["param1"], Value::from("u1"));
    assert_eq!(compiled.params["param2"], Value::Bool(true));
    Ok(())
}

#[test]
fn anonymous_callers_only_see_rules_open_to_them() -> cypherforge::Result<()> {
    let op = read_titles(value_map! { "title_CONTAINS" => "rust" });
    let compiled = compiler().compile(&op, &RequestContext::anonymous())?;
    assert_eq!(
        compiled.cypher,
        "MATCH (this:Post)\n\
         WHERE this.title CONTAINS $param0 AND this.published = $param1\n\
         RETURN this { .title } AS this"
    );

    // A token without the referenced claim fails the owner rule the same way.
    let no_sub = RequestContext::authenticated(Claims::new(value_map! { "name" => "ada" }));
    let compiled = compiler().compile(&op, &no_sub)?;
    assert!(!compiled.cypher.contains("this.owner"));
    Ok(())
}

#[test]
fn validate_rules_reject_before_a_statement_exists() {
    let err = compiler()
        .compile(&delete("draft"), &RequestContext::anonymous())
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden));

    let no_sub = RequestContext::authenticated(Claims::new(value_map! { "name" => "ada" }));
    let err = compiler().compile(&delete("draft"), &no_sub).unwrap_err();
    assert_eq!(err.to_string(), "Forbidden");
}

#[tokio::test]
async fn runtime_checks_surface_as_forbidden() -> cypherforge::Result<()> {
    let ctx = user("u1");
    let compiled = compiler().compile(&delete("draft"), &ctx)?;
    assert_eq!(
        compiled.cypher,
        format!(
            "MATCH (this:Post)\n\
             WHERE this.title = $param0\n\
             WITH *\n\
             CALL apoc.util.validate(NOT (this.owner = $param1), \"{FORBIDDEN_MARKER}\", [0])\n\
             DETACH DELETE this\n\
             RETURN count(*) AS this"
        )
    );

    let store = MemoryStore::new();
    store.reply(Err(ExecutorError::with_code(
        "Neo.ClientError.Procedure.ProcedureCallFailed",
        format!(
            "Failed to invoke procedure `apoc.util.validate`: Caused by: java.lang.RuntimeException: {FORBIDDEN_MARKER}"
        ),
    )));
    let err = execute(&store, &compiled, &ctx).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden));
    Ok(())
}

#[test]
fn custom_validation_procedures_are_honoured() -> cypherforge::Result<()> {
    let options = CompilerOptions {
        validate_procedure: "custom.assert".to_owned(),
        ..CompilerOptions::default()
    };
    let compiler = Compiler::new(compiler().schema().clone(), options);
    let compiled = compiler.compile(&delete("draft"), &user("u1"))?;
    assert!(compiled.cypher.contains("CALL custom.assert(NOT (this.owner = $param1)"));
    Ok(())
}
