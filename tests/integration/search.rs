#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use cypherforge::paginate::cursor;
use cypherforge::schema::{Entity, Field, ScalarType, SearchIndexSpec};
use cypherforge::{
    execute, value_map, Compiler, CompilerOptions, Operation, RequestContext, Schema, Value,
};
use support::{this_row, MemoryStore};

fn compiler() -> Compiler {
    let movie = Entity::new("Movie")
        .with_field(Field::scalar("title", ScalarType::String))
        .with_field(Field::scalar("embedding", ScalarType::Float).list(true))
        .with_search_index(SearchIndexSpec::fulltext("MovieTitle", ["title"]))
        .with_search_index(SearchIndexSpec::vector("MovieEmbedding", "embedding", 2));
    Compiler::new(
        Arc::new(Schema::new(vec![movie]).expect("schema")),
        CompilerOptions::default(),
    )
}

fn operation(json: &str) -> Operation {
    serde_json::from_str(json).expect("request")
}

fn edge(title: &str, score: f64) -> Value {
    value_map! { "score" => score, "node" => value_map! { "title" => title } }
}

#[tokio::test]
async fn fulltext_pages_are_shaped_into_connections() -> cypherforge::Result<()> {
    let op = operation(
        r#"{
            "operation": "search",
            "indexes": {"MovieTitle": {"phrase": "matrix"}},
            "first": 2,
            "selection": {
                "totalCount": true,
                "pageInfo": true,
                "edges": {"cursor": true, "score": true, "node": ["title"]}
            }
        }"#,
    );
    let ctx = RequestContext::anonymous();
    let compiled = compiler().compile(&op, &ctx)?;
    assert!(compiled.cypher.starts_with(
        "CALL db.index.fulltext.queryNodes($param0, $param1) YIELD node AS this, score AS var0\nWHERE this:Movie"
    ));
    assert!(compiled.cypher.contains("LIMIT $param2"));
    assert_eq!(compiled.params["param0"], Value::from("MovieTitle"));
    assert_eq!(compiled.params["param1"], Value::from("matrix"));
    assert_eq!(compiled.params["param2"], Value::Int(2));

    let store = MemoryStore::new();
    store.reply(Ok(vec![this_row(value_map! {
        "edges" => vec![edge("The Matrix", 2.5), edge("The Matrix Reloaded", 1.5)],
        "totalCount" => 3i64,
    })]));
    let rows = execute(&store, &compiled, &ctx).await?;
    let connection = rows[0].as_map().expect("connection map");

    let edges = connection["edges"].as_list().expect("edges");
    assert_eq!(edges[0].lookup("cursor"), Some(&Value::from(cursor::encode(0))));
    assert_eq!(edges[1].lookup("cursor"), Some(&Value::from(cursor::encode(1))));
    assert_eq!(edges[0].lookup("score"), Some(&Value::Float(2.5)));
    assert_eq!(connection["totalCount"], Value::Int(3));
    assert_eq!(
        connection["pageInfo"],
        value_map! {
            "hasNextPage" => true,
            "hasPreviousPage" => false,
            "startCursor" => cursor::encode(0),
            "endCursor" => cursor::encode(1),
        }
    );
    Ok(())
}

#[tokio::test]
async fn resuming_after_a_cursor_skips_past_it() -> cypherforge::Result<()> {
    let after = cursor::encode(1);
    let op = operation(&format!(
        r#"{{
            "operation": "search",
            "indexes": {{"moviesFulltextMovieTitle": {{"phrase": "matrix"}}}},
            "first": 2,
            "after": "{after}",
            "selection": {{"pageInfo": true, "edges": {{"cursor": true, "node": ["title"]}}}}
        }}"#
    ));
    let ctx = RequestContext::anonymous();
    let compiled = compiler().compile(&op, &ctx)?;
    assert!(compiled.cypher.contains("SKIP $param2\n    LIMIT $param3"));
    assert_eq!(compiled.params["param2"], Value::Int(2));

    let store = MemoryStore::new();
    store.reply(Ok(vec![this_row(value_map! {
        "edges" => vec![value_map! { "node" => value_map! { "title" => "The Matrix Revolutions" } }],
        "totalCount" => 3i64,
    })]));
    let rows = execute(&store, &compiled, &ctx).await?;
    let connection = rows[0].as_map().expect("connection map");
    assert!(!connection.contains_key("totalCount"));
    assert_eq!(
        connection["edges"].as_list().expect("edges")[0].lookup("cursor"),
        Some(&Value::from(cursor::encode(2)))
    );
    assert_eq!(
        connection["pageInfo"],
        value_map! {
            "hasNextPage" => false,
            "hasPreviousPage" => true,
            "startCursor" => cursor::encode(2),
            "endCursor" => cursor::encode(2),
        }
    );
    Ok(())
}

#[tokio::test]
async fn edges_without_nodes_carry_score_and_cursor() -> cypherforge::Result<()> {
    let op = operation(
        r#"{
            "operation": "search",
            "indexes": {"MovieTitle": {"phrase": "matrix"}},
            "selection": {"edges": {"score": true, "cursor": true}}
        }"#,
    );
    let ctx = RequestContext::anonymous();
    let compiled = compiler().compile(&op, &ctx)?;
    assert!(compiled.cypher.contains("RETURN collect({ score: var0 }) AS var4"));
    assert!(!compiled.cypher.contains("node: this {"));

    let store = MemoryStore::new();
    store.reply(Ok(vec![this_row(value_map! {
        "edges" => vec![value_map! { "score" => 2.5 }, value_map! { "score" => 1.0 }],
        "totalCount" => 2i64,
    })]));
    let rows = execute(&store, &compiled, &ctx).await?;
    let connection = rows[0].as_map().expect("connection map");
    assert!(!connection.contains_key("totalCount"));
    assert!(!connection.contains_key("pageInfo"));
    let edges = connection["edges"].as_list().expect("edges");
    assert_eq!(
        edges[1],
        value_map! { "score" => 1.0, "cursor" => cursor::encode(1) }
    );
    assert!(edges.iter().all(|edge| edge.lookup("node").is_none()));
    Ok(())
}

#[test]
fn vector_search_requests_enough_neighbours_for_the_page() -> cypherforge::Result<()> {
    let ctx = RequestContext::anonymous();
    let bounded = operation(
        r#"{
            "operation": "search",
            "indexes": {"MovieEmbedding": {"vector": [0.25, 0.75]}},
            "first": 3,
            "after": "YXJyYXljb25uZWN0aW9uOjE=",
            "selection": {"edges": {"score": true, "node": ["title"]}}
        }"#,
    );
    let compiled = compiler().compile(&bounded, &ctx)?;
    assert!(compiled.cypher.starts_with(
        "CALL db.index.vector.queryNodes($param0, $param1, $param2) YIELD node AS this, score AS var0"
    ));
    assert_eq!(compiled.params["param1"], Value::Int(5));
    assert_eq!(
        compiled.params["param2"],
        Value::List(vec![Value::Float(0.25), Value::Float(0.75)])
    );

    let unbounded = operation(
        r#"{
            "operation": "search",
            "indexes": {"MovieEmbedding": {"vector": [0.25, 0.75]}},
            "selection": {"totalCount": true}
        }"#,
    );
    let compiled = compiler().compile(&unbounded, &ctx)?;
    assert_eq!(compiled.params["param1"], Value::Int(100));
    assert!(!compiled.cypher.contains("UNWIND"));
    Ok(())
}

#[test]
fn phrase_input_on_a_vector_index_is_rejected() {
    let op = operation(
        r#"{
            "operation": "search",
            "indexes": {"MovieEmbedding": {"phrase": "matrix"}},
            "selection": {"totalCount": true}
        }"#,
    );
    let err = compiler()
        .compile(&op, &RequestContext::anonymous())
        .unwrap_err();
    assert!(err.is_validation());
}
