use std::collections::BTreeMap;

use super::{push_where, CompileError, Ctx};
use crate::cypher::{call_subquery, escape_name, property_access, relationship_pattern, Env};
use crate::paginate::{order_and_window, resolve_order, PagePolicy, SortScope, Window};
use crate::request::{FieldSelection, Selection};
use crate::schema::{AuthOperation, Entity, Field, FieldKind, Relationship};
use crate::shape::Shape;
use crate::Result;

/// Map projection of one node plus the subqueries feeding it.
pub(crate) struct Projection {
    /// `CALL { ... }` blocks that must run before the projection.
    pub subqueries: Vec<String>,
    /// `var { .a, b: var.c, rel: var3 }`.
    pub map: String,
    /// Shaping of the projected value.
    pub shape: Shape,
}

fn scalar_entry(key: &str, var: &str, property: &str) -> String {
    if key == property {
        format!(".{}", escape_name(property))
    } else {
        format!("{}: {}", escape_name(key), property_access(var, property))
    }
}

pub(crate) fn map_projection(var: &str, entries: &[String]) -> String {
    if entries.is_empty() {
        format!("{var} {{}}")
    } else {
        format!("{var} {{ {} }}", entries.join(", "))
    }
}

impl Ctx<'_> {
    /// Projects `selection` over the node bound to `var`.
    ///
    /// Relationship fields recurse with their own filter, sort and window;
    /// depth is bounded only by the request.
    pub(crate) fn project(
        &self,
        env: &mut Env,
        entity: &Entity,
        var: &str,
        selection: &Selection,
    ) -> Result<Projection> {
        let mut subqueries = Vec::new();
        let mut entries = Vec::with_capacity(selection.len());
        let mut shapes = BTreeMap::new();

        for selected in selection {
            let key = selected.output_key();
            if let Some(connection) = &selected.connection {
                let (field, rel) = self.connection_field(entity, &selected.name)?;
                let (subquery, out, shape) =
                    self.relationship_connection(env, entity, var, field, rel, selected, connection)?;
                subqueries.push(subquery);
                entries.push(format!("{}: {out}", escape_name(key)));
                shapes.insert(key.to_owned(), shape);
                continue;
            }

            let field = entity
                .field(&selected.name)
                .ok_or_else(|| CompileError::unknown_field(&entity.name, &selected.name))?;
            match &field.kind {
                FieldKind::Scalar(_) => {
                    if selected.selection.is_some() {
                        return Err(CompileError::NotARelationship {
                            entity: entity.name.clone(),
                            field: field.name.clone(),
                        }
                        .into());
                    }
                    entries.push(scalar_entry(key, var, field.property()));
                }
                FieldKind::Relationship(rel) => {
                    let (subquery, out, shape) =
                        self.relationship_read(env, var, field, rel, selected)?;
                    subqueries.push(subquery);
                    entries.push(format!("{}: {out}", escape_name(key)));
                    shapes.insert(key.to_owned(), shape);
                }
            }
        }

        Ok(Projection {
            subqueries,
            map: map_projection(var, &entries),
            shape: Shape::object(shapes),
        })
    }

    /// Resolves `actorsConnection` (or `actors`) to its relationship field.
    fn connection_field<'e>(
        &self,
        entity: &'e Entity,
        name: &str,
    ) -> std::result::Result<(&'e Field, &'e Relationship), CompileError> {
        let base = name.strip_suffix("Connection").unwrap_or(name);
        let field = entity
            .field(base)
            .or_else(|| entity.field(name))
            .ok_or_else(|| CompileError::unknown_field(&entity.name, name))?;
        let rel = field
            .relationship_def()
            .ok_or_else(|| CompileError::NotARelationship {
                entity: entity.name.clone(),
                field: field.name.clone(),
            })?;
        Ok((field, rel))
    }

    /// `CALL { WITH parent MATCH ... RETURN collect(...) AS varN }`.
    fn relationship_read(
        &self,
        env: &mut Env,
        parent: &str,
        field: &Field,
        rel: &Relationship,
        selected: &FieldSelection,
    ) -> Result<(String, String, Shape)> {
        let target = self.entity(&rel.target)?;
        let node = env.node_var();
        let mut lines = vec![format!(
            "MATCH {}",
            relationship_pattern(parent, "", rel, &node, target)
        )];

        let args = &selected.args;
        let pred = self.node_predicate(env, target, &node, args.filter.as_ref(), AuthOperation::Read)?;
        push_where(&mut lines, &pred);
        if let Some(check) = self.read_validation(env, target, &node, AuthOperation::Read)? {
            lines.push(check);
        }

        let scope = SortScope {
            entity: target,
            node: &node,
            edge: None,
            score: None,
        };
        let order = resolve_order(&scope, &args.sort)?;
        let window = Window::from_offset_limit(
            args.offset.as_ref(),
            args.limit.as_ref(),
            PagePolicy::for_entity(target, self.options),
        )?;
        if let Some(clause) = order_and_window(env, &order, window) {
            lines.push(clause);
        }

        let empty = Selection::new();
        let projection = self.project(env, target, &node, selected.selection.as_ref().unwrap_or(&empty))?;
        lines.extend(projection.subqueries);
        lines.push(format!("WITH {} AS {node}", projection.map));

        let out = env.value_var();
        if field.list {
            lines.push(format!("RETURN collect({node}) AS {out}"));
        } else {
            lines.push(format!("RETURN head(collect({node})) AS {out}"));
        }
        Ok((call_subquery(&[parent], &lines.join("\n")), out, projection.shape))
    }
}
