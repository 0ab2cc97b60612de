use super::projection::map_projection;
use super::{enter, push_where, CompileError, Ctx, Emitted, Phase, StatementKind, ROOT};
use crate::cypher::{call_subquery, escape_name, property_access, relationship_pattern, Env, Predicate};
use crate::filter::{ConnectionScope, Scope};
use crate::paginate::{order_and_window, resolve_order, EdgeScope, PagePolicy, SortScope, Window};
use crate::request::{Args, ConnectionRequest, ConnectionSelection, FieldSelection};
use crate::schema::{AuthOperation, Entity, Field, Relationship};
use crate::shape::{ConnectionShape, Shape};
use crate::Result;

/// Variables and arguments of one connection.
pub(crate) struct ConnectionParts<'p> {
    pub entity: &'p Entity,
    pub node: &'p str,
    pub edge: Option<EdgeScope<'p>>,
    pub score: Option<&'p str>,
    pub args: &'p Args,
    pub selection: &'p ConnectionSelection,
}

fn map_literal(entries: &[String]) -> String {
    if entries.is_empty() {
        "{}".to_owned()
    } else {
        format!("{{ {} }}", entries.join(", "))
    }
}

impl Ctx<'_> {
    /// Top-level connection read.
    pub(crate) fn connection(&self, env: &mut Env, request: &ConnectionRequest) -> Result<Emitted> {
        let entity = self.entity(&request.entity)?;
        let mut lines = vec![format!("MATCH ({ROOT}{})", entity.label_pattern())];
        let pred = self.node_predicate(
            env,
            entity,
            ROOT,
            request.args.filter.as_ref(),
            AuthOperation::Read,
        )?;
        push_where(&mut lines, &pred);
        if let Some(check) = self.read_validation(env, entity, ROOT, AuthOperation::Read)? {
            lines.push(check);
        }

        enter(Phase::Emit);
        let parts = ConnectionParts {
            entity,
            node: ROOT,
            edge: None,
            score: None,
            args: &request.args,
            selection: &request.selection,
        };
        let (rest, shape) = self.emit_connection(env, parts, ROOT)?;
        lines.extend(rest);
        Ok((lines.join("\n"), StatementKind::Read, shape))
    }

    /// `CALL { WITH parent MATCH ... RETURN { edges, totalCount } AS varN }`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn relationship_connection(
        &self,
        env: &mut Env,
        owner: &Entity,
        parent: &str,
        field: &Field,
        rel: &Relationship,
        selected: &FieldSelection,
        selection: &ConnectionSelection,
    ) -> Result<(String, String, Shape)> {
        let target = self.entity(&rel.target)?;
        let rel_var = env.node_var();
        let node = env.node_var();
        let mut lines = vec![format!(
            "MATCH {}",
            relationship_pattern(parent, &rel_var, rel, &node, target)
        )];

        enter(Phase::PredicateResolution);
        let requested = match &selected.args.filter {
            Some(filter) if !filter.is_null() => self.filters.build_connection(
                env,
                ConnectionScope {
                    node: Scope::node(target, &node),
                    edge: Some(Scope::edge(owner, &field.name, rel, &rel_var)),
                    score: None,
                },
                filter,
            )?,
            _ => Predicate::True,
        };
        let narrowed = self.auth.filter(env, target, &node, AuthOperation::Read)?;
        push_where(&mut lines, &Predicate::and([requested, narrowed]));
        if let Some(check) = self.read_validation(env, target, &node, AuthOperation::Read)? {
            lines.push(check);
        }

        let out = env.value_var();
        let parts = ConnectionParts {
            entity: target,
            node: &node,
            edge: Some(EdgeScope {
                owner,
                field: &field.name,
                rel,
                var: &rel_var,
            }),
            score: None,
            args: &selected.args,
            selection,
        };
        let (rest, shape) = self.emit_connection(env, parts, &out)?;
        lines.extend(rest);
        Ok((call_subquery(&[parent], &lines.join("\n")), out, shape))
    }

    /// Collects matched rows into edges, counts them, then orders, windows
    /// and projects the page in a subquery. The score stays internal unless
    /// an edge selects it.
    pub(crate) fn emit_connection(
        &self,
        env: &mut Env,
        parts: ConnectionParts<'_>,
        out: &str,
    ) -> Result<(Vec<String>, Shape)> {
        let scope = SortScope {
            entity: parts.entity,
            node: parts.node,
            edge: parts.edge,
            score: parts.score,
        };
        let order = resolve_order(&scope, &parts.args.sort)?;
        let window = Window::from_cursor(
            parts.args.after.as_deref(),
            parts.args.first.as_ref(),
            PagePolicy::for_entity(parts.entity, self.options),
        )?;

        let edges = env.value_var();
        let total = env.value_var();
        let mut carried = vec![format!("node: {}", parts.node)];
        if let Some(edge) = parts.edge {
            carried.push(format!("relationship: {}", edge.var));
        }
        if let Some(score) = parts.score {
            carried.push(format!("score: {score}"));
        }
        let mut lines = vec![
            format!("WITH collect({}) AS {edges}", map_literal(&carried)),
            format!("WITH {edges}, size({edges}) AS {total}"),
        ];

        let selection = parts.selection;
        let mut result = vec![format!("totalCount: {total}")];
        let mut node_shape = Shape::Leaf;
        if selection.edges.is_some() || selection.page_info {
            let edge_var = env.value_var();
            let mut rebinds = vec![format!("{edge_var}.node AS {}", parts.node)];
            if let Some(edge) = parts.edge {
                rebinds.push(format!("{edge_var}.relationship AS {}", edge.var));
            }
            if let Some(score) = parts.score {
                rebinds.push(format!("{edge_var}.score AS {score}"));
            }
            let mut body = vec![
                format!("UNWIND {edges} AS {edge_var}"),
                format!("WITH {}", rebinds.join(", ")),
            ];
            if let Some(clause) = order_and_window(env, &order, window) {
                body.push(clause);
            }

            let mut entries = Vec::new();
            if let Some(edge_selection) = &selection.edges {
                if edge_selection.score {
                    let score = parts.score.ok_or(CompileError::ScoreOutsideSearch)?;
                    entries.push(format!("score: {score}"));
                }
                if let Some(properties) = &edge_selection.properties {
                    let edge = parts.edge.ok_or(CompileError::EdgeOutsideConnection)?;
                    let mut projected = Vec::with_capacity(properties.len());
                    for name in properties {
                        let property = edge.rel.property(name).ok_or_else(|| {
                            CompileError::UnknownEdgeProperty {
                                entity: edge.owner.name.clone(),
                                field: edge.field.to_owned(),
                                property: name.clone(),
                            }
                        })?;
                        projected.push(if property.property() == name {
                            format!(".{}", escape_name(name))
                        } else {
                            format!(
                                "{}: {}",
                                escape_name(name),
                                property_access(edge.var, property.property())
                            )
                        });
                    }
                    entries.push(format!("properties: {}", map_projection(edge.var, &projected)));
                }
                if let Some(node_selection) = &edge_selection.node {
                    let projection = self.project(env, parts.entity, parts.node, node_selection)?;
                    body.extend(projection.subqueries);
                    entries.push(format!("node: {}", projection.map));
                    node_shape = projection.shape;
                }
            }

            let page = env.value_var();
            body.push(format!("RETURN collect({}) AS {page}", map_literal(&entries)));
            lines.push(call_subquery(&[&edges], &body.join("\n")));
            result.insert(0, format!("edges: {page}"));
        }
        lines.push(format!("RETURN {} AS {out}", map_literal(&result)));

        let shape = ConnectionShape {
            offset: window.offset,
            total_count: selection.total_count,
            page_info: selection.page_info,
            edges: selection.edges.is_some(),
            cursor: selection.edges.as_ref().is_some_and(|edges| edges.cursor),
            node: node_shape,
        };
        Ok((lines, Shape::Connection(Box::new(shape))))
    }
}
