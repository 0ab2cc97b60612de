//! In-memory executor shared by the integration tests.
//!
//! Answers catalogue listings from its own index and constraint tables and
//! applies `CREATE ... IF NOT EXISTS` statements to them. Every other
//! statement is recorded and answered from a reply queue (empty rows once
//! the queue runs dry).
#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use cypherforge::executor::CatalogueEntry;
use cypherforge::{Executor, ExecutorError, Params, Row, Value};
use parking_lot::Mutex;

#[derive(Default)]
struct Catalogue {
    indexes: Vec<CatalogueEntry>,
    constraints: Vec<CatalogueEntry>,
}

/// One statement as the store received it.
#[derive(Clone, Debug)]
pub struct Received {
    pub statement: String,
    pub params: Params,
    pub database: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    catalogue: Mutex<Catalogue>,
    received: Mutex<Vec<Received>>,
    replies: Mutex<VecDeque<Result<Vec<Row>, ExecutorError>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(self, name: &str, ty: &str, label: &str, properties: &[&str]) -> Self {
        self.catalogue
            .lock()
            .indexes
            .push(entry(name, ty, label, properties));
        self
    }

    pub fn with_constraint(self, name: &str, label: &str, property: &str) -> Self {
        self.with_constraint_of_type(name, "UNIQUENESS", label, property)
    }

    pub fn with_constraint_of_type(self, name: &str, ty: &str, label: &str, property: &str) -> Self {
        self.catalogue
            .lock()
            .constraints
            .push(entry(name, ty, label, &[property]));
        self
    }

    /// Queues the reply for the next non-catalogue statement.
    pub fn reply(&self, reply: Result<Vec<Row>, ExecutorError>) {
        self.replies.lock().push_back(reply);
    }

    pub fn indexes(&self) -> Vec<CatalogueEntry> {
        self.catalogue.lock().indexes.clone()
    }

    pub fn constraints(&self) -> Vec<CatalogueEntry> {
        self.catalogue.lock().constraints.clone()
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }

    /// Statements that created catalogue objects.
    pub fn creations(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .filter(|r| r.statement.starts_with("CREATE ") && r.statement.contains("IF NOT EXISTS"))
            .map(|r| r.statement.clone())
            .collect()
    }

    fn apply_creation(&self, statement: &str) -> Result<(), ExecutorError> {
        let malformed = || ExecutorError::new(format!("Invalid input: {statement}"));
        let (kind, rest) = if let Some(rest) = statement.strip_prefix("CREATE FULLTEXT INDEX ") {
            ("FULLTEXT", rest)
        } else if let Some(rest) = statement.strip_prefix("CREATE VECTOR INDEX ") {
            ("VECTOR", rest)
        } else if let Some(rest) = statement.strip_prefix("CREATE CONSTRAINT ") {
            ("UNIQUENESS", rest)
        } else {
            return Err(malformed());
        };
        let (name, rest) = rest.split_once(" IF NOT EXISTS FOR (n:").ok_or_else(malformed)?;
        let (label, rest) = rest.split_once(')').ok_or_else(malformed)?;
        let properties: Vec<&str> = match kind {
            "FULLTEXT" => {
                let (_, list) = rest.split_once('[').ok_or_else(malformed)?;
                let (list, _) = list.split_once(']').ok_or_else(malformed)?;
                list.split(", ")
                    .map(|p| p.trim_start_matches("n."))
                    .collect()
            }
            "VECTOR" => {
                let rest = rest.trim_start_matches(" ON n.");
                vec![rest.split_once(' ').map_or(rest, |(p, _)| p)]
            }
            _ => {
                let rest = rest.trim_start_matches(" REQUIRE n.");
                vec![rest.split_once(' ').map_or(rest, |(p, _)| p)]
            }
        };

        let mut catalogue = self.catalogue.lock();
        let table = if kind == "UNIQUENESS" {
            &mut catalogue.constraints
        } else {
            &mut catalogue.indexes
        };
        if !table.iter().any(|e| e.name == name) {
            table.push(entry(name, kind, label, &properties));
        }
        Ok(())
    }
}

fn entry(name: &str, ty: &str, label: &str, properties: &[&str]) -> CatalogueEntry {
    CatalogueEntry {
        name: name.to_owned(),
        object_type: ty.to_owned(),
        entity_type: "NODE".to_owned(),
        labels_or_types: vec![label.to_owned()],
        properties: properties.iter().map(|p| p.to_string()).collect(),
    }
}

fn listing(entries: &[CatalogueEntry]) -> Vec<Row> {
    entries
        .iter()
        .map(|e| {
            let strings = |items: &[String]| {
                Value::List(items.iter().map(|s| Value::from(s.as_str())).collect())
            };
            Row::from([
                ("name".to_owned(), Value::from(e.name.as_str())),
                ("type".to_owned(), Value::from(e.object_type.as_str())),
                ("entityType".to_owned(), Value::from(e.entity_type.as_str())),
                ("labelsOrTypes".to_owned(), strings(&e.labels_or_types)),
                ("properties".to_owned(), strings(&e.properties)),
            ])
        })
        .collect()
}

#[async_trait]
impl Executor for MemoryStore {
    async fn run(
        &self,
        statement: &str,
        params: &Params,
        database: Option<&str>,
    ) -> Result<Vec<Row>, ExecutorError> {
        self.received.lock().push(Received {
            statement: statement.to_owned(),
            params: params.clone(),
            database: database.map(str::to_owned),
        });
        if statement.starts_with("SHOW INDEXES") {
            return Ok(listing(&self.catalogue.lock().indexes));
        }
        if statement.starts_with("SHOW CONSTRAINTS") {
            return Ok(listing(&self.catalogue.lock().constraints));
        }
        if statement.starts_with("CREATE ") && statement.contains(" IF NOT EXISTS ") {
            self.apply_creation(statement)?;
            return Ok(Vec::new());
        }
        self.replies.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Row with a single `this` column.
pub fn this_row(value: Value) -> Row {
    Row::from([("this".to_owned(), value)])
}
