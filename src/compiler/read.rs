use super::{enter, push_where, Ctx, Emitted, Phase, StatementKind, ROOT};
use crate::cypher::Env;
use crate::paginate::{order_and_window, resolve_order, PagePolicy, SortScope, Window};
use crate::request::ReadRequest;
use crate::schema::AuthOperation;
use crate::Result;

impl Ctx<'_> {
    /// `MATCH ... WHERE ... ORDER BY ... SKIP ... LIMIT ... RETURN this { ... }`.
    ///
    /// Ordering and windowing apply before relationship subqueries run, so
    /// nested projections only see the page that is returned.
    pub(crate) fn read(&self, env: &mut Env, request: &ReadRequest) -> Result<Emitted> {
        let entity = self.entity(&request.entity)?;
        let args = &request.args;
        let scope = SortScope {
            entity,
            node: ROOT,
            edge: None,
            score: None,
        };
        let order = resolve_order(&scope, &args.sort)?;
        let window = Window::from_offset_limit(
            args.offset.as_ref(),
            args.limit.as_ref(),
            PagePolicy::for_entity(entity, self.options),
        )?;

        let mut lines = vec![format!("MATCH ({ROOT}{})", entity.label_pattern())];
        let pred = self.node_predicate(env, entity, ROOT, args.filter.as_ref(), AuthOperation::Read)?;
        push_where(&mut lines, &pred);
        if let Some(check) = self.read_validation(env, entity, ROOT, AuthOperation::Read)? {
            lines.push(check);
        }

        enter(Phase::Emit);
        if let Some(clause) = order_and_window(env, &order, window) {
            lines.push(clause);
        }
        let projection = self.project(env, entity, ROOT, &request.selection)?;
        lines.extend(projection.subqueries);
        lines.push(format!("RETURN {} AS {ROOT}", projection.map));
        Ok((lines.join("\n"), StatementKind::Read, projection.shape))
    }
}
