//! Result post-processing for connection-shaped values.
//!
//! Statements return raw `{ edges, totalCount }` maps. Shaping adds Relay
//! cursors and `pageInfo`, and drops values the statement only computed for
//! internal use.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::paginate::cursor;
use crate::value::Value;

/// Where post-processing applies inside a returned value.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub enum Shape {
    /// Nothing to do.
    #[default]
    Leaf,
    /// Map whose listed keys need shaping; lists of maps are shaped per item.
    Object(BTreeMap<String, Shape>),
    /// Connection value.
    Connection(Box<ConnectionShape>),
}

/// Post-processing of one connection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConnectionShape {
    /// Offset of the first returned edge.
    pub offset: u64,
    /// Keep `totalCount`.
    pub total_count: bool,
    /// Add `pageInfo`.
    pub page_info: bool,
    /// Keep `edges`.
    pub edges: bool,
    /// Add per-edge cursors.
    pub cursor: bool,
    /// Shaping of each edge's node.
    pub node: Shape,
}

impl Shape {
    /// Object shape, collapsing to [`Shape::Leaf`] when no child needs work.
    pub fn object(children: BTreeMap<String, Shape>) -> Self {
        let children: BTreeMap<_, _> = children
            .into_iter()
            .filter(|(_, shape)| !shape.is_leaf())
            .collect();
        if children.is_empty() {
            Shape::Leaf
        } else {
            Shape::Object(children)
        }
    }

    /// Whether this shape leaves values untouched.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Shape::Leaf)
    }

    /// Shapes `value` in place.
    pub fn apply(&self, value: &mut Value) {
        if let Value::List(items) = value {
            for item in items {
                self.apply(item);
            }
            return;
        }
        match self {
            Shape::Leaf => {}
            Shape::Object(children) => {
                if let Some(map) = value.as_map_mut() {
                    for (key, shape) in children {
                        if let Some(child) = map.get_mut(key) {
                            shape.apply(child);
                        }
                    }
                }
            }
            Shape::Connection(connection) => connection.apply(value),
        }
    }
}

impl ConnectionShape {
    fn apply(&self, value: &mut Value) {
        let Some(map) = value.as_map_mut() else {
            return;
        };
        let total = map.get("totalCount").and_then(Value::as_i64);
        let mut count = 0u64;
        if let Some(Value::List(edges)) = map.get_mut("edges") {
            count = edges.len() as u64;
            for (idx, edge) in edges.iter_mut().enumerate() {
                let Some(edge) = edge.as_map_mut() else {
                    continue;
                };
                if self.cursor {
                    edge.insert(
                        "cursor".to_owned(),
                        Value::String(cursor::encode(self.offset + idx as u64)),
                    );
                }
                if let Some(node) = edge.get_mut("node") {
                    self.node.apply(node);
                }
            }
        }

        if self.page_info {
            let start = self.offset;
            let end = (self.offset + count).saturating_sub(1);
            let cursor_at = |offset: u64| {
                if count == 0 {
                    Value::Null
                } else {
                    Value::String(cursor::encode(offset))
                }
            };
            let has_next = total.is_some_and(|total| (self.offset + count) < total.max(0) as u64);
            let mut info = BTreeMap::new();
            info.insert("hasNextPage".to_owned(), Value::Bool(has_next));
            info.insert("hasPreviousPage".to_owned(), Value::Bool(self.offset > 0));
            info.insert("startCursor".to_owned(), cursor_at(start));
            info.insert("endCursor".to_owned(), cursor_at(end));
            map.insert("pageInfo".to_owned(), Value::Map(info));
        }
        if !self.total_count {
            map.remove("totalCount");
        }
        if !self.edges {
            map.remove("edges");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_map;

    fn page(edges: Vec<Value>, total: i64) -> Value {
        value_map! { "edges" => edges, "totalCount" => total }
    }

    #[test]
    fn adds_cursors_and_page_info() {
        let shape = Shape::Connection(Box::new(ConnectionShape {
            offset: 2,
            total_count: false,
            page_info: true,
            edges: true,
            cursor: true,
            node: Shape::Leaf,
        }));
        let mut value = page(
            vec![
                value_map! { "node" => value_map! { "title" => "a" } },
                value_map! { "node" => value_map! { "title" => "b" } },
            ],
            5,
        );
        shape.apply(&mut value);
        let map = value.as_map().unwrap();
        assert!(!map.contains_key("totalCount"));
        let edges = map["edges"].as_list().unwrap();
        assert_eq!(edges[0].lookup("cursor"), Some(&Value::String(cursor::encode(2))));
        assert_eq!(value.lookup("pageInfo.hasNextPage"), Some(&Value::Bool(true)));
        assert_eq!(value.lookup("pageInfo.hasPreviousPage"), Some(&Value::Bool(true)));
        assert_eq!(
            value.lookup("pageInfo.endCursor"),
            Some(&Value::String(cursor::encode(3)))
        );
    }

    #[test]
    fn empty_pages_have_null_cursors() {
        let shape = ConnectionShape {
            offset: 0,
            total_count: true,
            page_info: true,
            edges: false,
            cursor: false,
            node: Shape::Leaf,
        };
        let mut value = page(vec![], 0);
        shape.apply(&mut value);
        assert_eq!(value.lookup("pageInfo.startCursor"), Some(&Value::Null));
        assert_eq!(value.lookup("pageInfo.hasNextPage"), Some(&Value::Bool(false)));
        assert_eq!(value.lookup("totalCount"), Some(&Value::Int(0)));
        assert!(value.lookup("edges").is_none());
    }

    #[test]
    fn object_shapes_reach_nested_lists() {
        let inner = Shape::Connection(Box::new(ConnectionShape {
            offset: 0,
            total_count: false,
            page_info: false,
            edges: true,
            cursor: true,
            node: Shape::Leaf,
        }));
        let shape = Shape::object(BTreeMap::from([
            ("actorsConnection".to_owned(), inner),
            ("title".to_owned(), Shape::Leaf),
        ]));
        let mut rows = Value::List(vec![value_map! {
            "title" => "m",
            "actorsConnection" => page(vec![value_map! {}], 1),
        }]);
        shape.apply(&mut rows);
        assert_eq!(
            rows.as_list().unwrap()[0].lookup("actorsConnection.edges"),
            Some(&Value::List(vec![value_map! { "cursor" => cursor::encode(0) }]))
        );
    }
}
