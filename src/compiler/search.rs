use super::connection::ConnectionParts;
use super::{enter, push_where, CompileError, Ctx, Emitted, Phase, StatementKind, ROOT};
use crate::cypher::{Env, Predicate};
use crate::filter::{ConnectionScope, Scope};
use crate::paginate::{PagePolicy, Window};
use crate::request::{SearchQuery, SearchRequest};
use crate::schema::{AuthOperation, SearchIndexRef, SearchIndexSpec};
use crate::value::Value;
use crate::Result;

impl Ctx<'_> {
    /// Full-text or vector search shaped as a connection.
    ///
    /// The index procedure binds the node to `this` and the relevance score
    /// to an internal variable that score filters and score sorting read.
    pub(crate) fn search(&self, env: &mut Env, request: &SearchRequest) -> Result<Emitted> {
        let mut requested = request.indexes.iter();
        let (name, query) = match (requested.next(), requested.next()) {
            (Some(entry), None) => entry,
            (Some(_), Some(_)) => return Err(CompileError::MultipleSearches.into()),
            (None, _) => return Err(CompileError::NoSearch.into()),
        };
        let SearchIndexRef { entity, spec } = self
            .schema
            .search_index(name)
            .or_else(|| self.schema.search_by_query_name(name))
            .ok_or_else(|| CompileError::UnknownSearchIndex {
                index: name.clone(),
            })?;
        let window = Window::from_cursor(
            request.args.after.as_deref(),
            request.args.first.as_ref(),
            PagePolicy::for_entity(entity, self.options),
        )?;

        let score = env.value_var();
        let call = match (spec, query) {
            (SearchIndexSpec::Fulltext(_), SearchQuery::Phrase { phrase }) => {
                let index = env.param(spec.name());
                let phrase = env.param(phrase.as_str());
                format!(
                    "CALL db.index.fulltext.queryNodes({index}, {phrase}) YIELD node AS {ROOT}, score AS {score}"
                )
            }
            (SearchIndexSpec::Vector(vector_index), SearchQuery::Vector { vector }) => {
                if vector.len() != vector_index.dimensions as usize {
                    return Err(CompileError::VectorDimensions {
                        index: vector_index.name.clone(),
                        expected: vector_index.dimensions,
                        actual: vector.len(),
                    }
                    .into());
                }
                let neighbours = match window.limit {
                    Some(limit) => window.offset.saturating_add(limit),
                    None => self.options.vector_neighbours,
                };
                let index = env.param(spec.name());
                let k = env.param(Value::Int(i64::try_from(neighbours).unwrap_or(i64::MAX)));
                let embedding = env.param(Value::List(vector.iter().copied().map(Value::Float).collect()));
                format!(
                    "CALL db.index.vector.queryNodes({index}, {k}, {embedding}) YIELD node AS {ROOT}, score AS {score}"
                )
            }
            (SearchIndexSpec::Fulltext(_), _) => {
                return Err(CompileError::SearchInputMismatch {
                    directive: spec.kind().directive(),
                    index: spec.name().to_owned(),
                    expected: "phrase",
                }
                .into())
            }
            (SearchIndexSpec::Vector(_), _) => {
                return Err(CompileError::SearchInputMismatch {
                    directive: spec.kind().directive(),
                    index: spec.name().to_owned(),
                    expected: "vector",
                }
                .into())
            }
        };

        enter(Phase::PredicateResolution);
        let requested = match &request.args.filter {
            Some(filter) if !filter.is_null() => self.filters.build_connection(
                env,
                ConnectionScope {
                    node: Scope::node(entity, ROOT).with_score(Some(&score)),
                    edge: None,
                    score: Some(&score),
                },
                filter,
            )?,
            _ => Predicate::True,
        };
        let narrowed = self.auth.filter(env, entity, ROOT, AuthOperation::Read)?;
        let labelled = Predicate::expr(format!("{ROOT}{}", entity.label_pattern()));

        let mut lines = vec![call];
        push_where(&mut lines, &Predicate::and([labelled, requested, narrowed]));
        if let Some(check) = self.read_validation(env, entity, ROOT, AuthOperation::Read)? {
            lines.push(check);
        }

        enter(Phase::Emit);
        let parts = ConnectionParts {
            entity,
            node: ROOT,
            edge: None,
            score: Some(&score),
            args: &request.args,
            selection: &request.selection,
        };
        let (rest, shape) = self.emit_connection(env, parts, ROOT)?;
        lines.extend(rest);
        Ok((lines.join("\n"), StatementKind::Read, shape))
    }
}
