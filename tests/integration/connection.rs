#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use cypherforge::paginate::cursor;
use cypherforge::schema::{Direction, Entity, Field, LimitSpec, ScalarType};
use cypherforge::{
    execute, value_map, Compiler, CompilerOptions, Error, Operation, RequestContext, Schema, Value,
};
use support::{this_row, MemoryStore};

fn compiler() -> Compiler {
    let movie = Entity::new("Movie")
        .with_field(Field::scalar("title", ScalarType::String))
        .with_field(
            Field::relationship("actors", "ACTED_IN", Direction::In, "Actor").with_edge_properties(vec![
                Field::scalar("screenTime", ScalarType::Int).aliased("screen_time"),
            ]),
        )
        .with_limit(LimitSpec {
            default: Some(10),
            max: Some(20),
        });
    let actor = Entity::new("Actor").with_field(Field::scalar("name", ScalarType::String));
    Compiler::new(
        Arc::new(Schema::new(vec![movie, actor]).expect("schema")),
        CompilerOptions::default(),
    )
}

fn operation(json: &str) -> Operation {
    serde_json::from_str(json).expect("request")
}

const NESTED: &str = r#"{
    "operation": "connection",
    "entity": "Movie",
    "first": 1,
    "sort": [{"title": "ASC"}],
    "selection": {
        "totalCount": true,
        "pageInfo": true,
        "edges": {
            "cursor": true,
            "node": [
                "title",
                {
                    "name": "actorsConnection",
                    "args": {"first": 2, "sort": [{"edge": {"screenTime": "DESC"}}]},
                    "connection": {
                        "totalCount": true,
                        "edges": {"properties": ["screenTime"], "node": ["name"]}
                    }
                }
            ]
        }
    }
}"#;

#[test]
fn nested_connections_order_by_edge_properties() -> cypherforge::Result<()> {
    let compiled = compiler().compile(&operation(NESTED), &RequestContext::anonymous())?;
    let cypher = &compiled.cypher;
    assert!(cypher.starts_with(
        "MATCH (this:Movie)\n\
         WITH collect({ node: this }) AS var0\n\
         WITH var0, size(var0) AS var1\n"
    ));
    assert!(cypher.contains("MATCH (this)<-[this3:ACTED_IN]-(this4:Actor)"));
    assert!(cypher.contains("ORDER BY this3.screen_time DESC"));
    assert!(cypher.contains(
        "RETURN collect({ properties: this3 { screenTime: this3.screen_time }, node: this4 { .name } }) AS var9"
    ));
    assert!(cypher.contains("RETURN collect({ node: this { .title, actorsConnection: var5 } }) AS var10"));
    assert!(cypher.ends_with("RETURN { edges: var10, totalCount: var1 } AS this"));
    assert_eq!(compiled.params["param0"], Value::Int(1));
    assert_eq!(compiled.params["param1"], Value::Int(2));
    Ok(())
}

#[tokio::test]
async fn results_gain_cursors_and_page_info() -> cypherforge::Result<()> {
    let ctx = RequestContext::anonymous();
    let compiled = compiler().compile(&operation(NESTED), &ctx)?;
    let store = MemoryStore::new();
    store.reply(Ok(vec![this_row(value_map! {
        "edges" => vec![value_map! {
            "node" => value_map! {
                "title" => "The Matrix",
                "actorsConnection" => value_map! {
                    "edges" => vec![value_map! {
                        "properties" => value_map! { "screenTime" => 120i64 },
                        "node" => value_map! { "name" => "Keanu Reeves" },
                    }],
                    "totalCount" => 4i64,
                },
            },
        }],
        "totalCount" => 3i64,
    })]));

    let rows = execute(&store, &compiled, &ctx).await?;
    let movie_edge = &rows[0].lookup("edges").and_then(Value::as_list).expect("edges")[0];
    assert_eq!(movie_edge.lookup("cursor"), Some(&Value::from(cursor::encode(0))));
    assert_eq!(
        rows[0].lookup("pageInfo"),
        Some(&value_map! {
            "hasNextPage" => true,
            "hasPreviousPage" => false,
            "startCursor" => cursor::encode(0),
            "endCursor" => cursor::encode(0),
        })
    );

    let actors = movie_edge.lookup("node.actorsConnection").expect("nested connection");
    assert_eq!(actors.lookup("totalCount"), Some(&Value::Int(4)));
    assert_eq!(actors.lookup("pageInfo"), None);
    let actor_edge = &actors.lookup("edges").and_then(Value::as_list).expect("edges")[0];
    assert_eq!(actor_edge.lookup("cursor"), None);
    assert_eq!(actor_edge.lookup("properties.screenTime"), Some(&Value::Int(120)));
    Ok(())
}

#[tokio::test]
async fn empty_pages_have_null_cursors() -> cypherforge::Result<()> {
    let ctx = RequestContext::anonymous();
    let op = operation(
        r#"{"operation": "connection", "entity": "Movie",
            "selection": {"pageInfo": true, "edges": {"node": ["title"]}}}"#,
    );
    let compiled = compiler().compile(&op, &ctx)?;
    // The entity default applies when the request names no page size.
    assert!(compiled.cypher.contains("LIMIT $param0"));
    assert_eq!(compiled.params["param0"], Value::Int(10));

    let store = MemoryStore::new();
    store.reply(Ok(vec![this_row(value_map! {
        "edges" => Vec::<Value>::new(),
        "totalCount" => 0i64,
    })]));
    let rows = execute(&store, &compiled, &ctx).await?;
    assert_eq!(rows[0].lookup("totalCount"), None);
    assert_eq!(
        rows[0].lookup("pageInfo"),
        Some(&value_map! {
            "hasNextPage" => false,
            "hasPreviousPage" => false,
            "startCursor" => Value::Null,
            "endCursor" => Value::Null,
        })
    );
    Ok(())
}

#[test]
fn page_sizes_are_capped_and_validated() {
    let ctx = RequestContext::anonymous();
    let op = operation(
        r#"{"operation": "connection", "entity": "Movie", "first": 50,
            "selection": {"edges": {"node": ["title"]}}}"#,
    );
    let compiled = compiler().compile(&op, &ctx).expect("compiles");
    assert_eq!(compiled.params["param0"], Value::Int(20));

    let op = operation(
        r#"{"operation": "connection", "entity": "Movie", "first": -1,
            "selection": {"totalCount": true}}"#,
    );
    let err = compiler().compile(&op, &ctx).unwrap_err();
    assert!(matches!(err, Error::Compile(_)));

    let op = operation(
        r#"{"operation": "connection", "entity": "Movie", "after": "not-a-cursor",
            "selection": {"totalCount": true}}"#,
    );
    assert!(compiler().compile(&op, &ctx).unwrap_err().is_validation());
}
