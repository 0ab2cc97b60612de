use std::collections::BTreeMap;

use super::{enter, push_where, CompileError, Ctx, Emitted, Phase, StatementKind, ROOT};
use crate::cypher::{call_subquery, property_access, Env};
use crate::filter::coerce::coerce_field;
use crate::request::{CreateRequest, DeleteRequest};
use crate::schema::{AuthOperation, Entity, FieldKind, ValidationTiming};
use crate::shape::Shape;
use crate::value::Value;
use crate::Result;

/// `SET` assignments for one create input, in input key order.
fn assignments(
    env: &mut Env,
    entity: &Entity,
    var: &str,
    input: &BTreeMap<String, Value>,
) -> std::result::Result<Vec<String>, CompileError> {
    for field in entity.scalar_fields() {
        let missing = input.get(&field.name).map_or(true, Value::is_null);
        if !field.nullable && missing {
            return Err(CompileError::MissingRequiredField {
                entity: entity.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    let mut sets = Vec::with_capacity(input.len());
    for (key, value) in input {
        let field = entity
            .field(key)
            .ok_or_else(|| CompileError::unknown_field(&entity.name, key))?;
        let FieldKind::Scalar(ty) = &field.kind else {
            return Err(CompileError::NotAScalar {
                entity: entity.name.clone(),
                field: key.clone(),
            });
        };
        if value.is_null() {
            continue;
        }
        let param = env.param(coerce_field(*ty, field.list, value)?);
        sets.push(format!("{} = {param}", property_access(var, field.property())));
    }
    Ok(sets)
}

impl Ctx<'_> {
    /// One `CALL { CREATE ... }` per input, then the created nodes are
    /// projected like a read.
    ///
    /// Claim-only rules are settled before anything is emitted; node rules
    /// run after each `CREATE` and abort the whole statement on failure.
    pub(crate) fn create(&self, env: &mut Env, request: &CreateRequest) -> Result<Emitted> {
        let entity = self.entity(&request.entity)?;
        if request.input.is_empty() {
            return Err(CompileError::EmptyCreate.into());
        }

        enter(Phase::AuthorizeBefore);
        // Without a node only claims are evaluated, so no runtime check results.
        self.auth
            .validate(env, entity, None, AuthOperation::Create, ValidationTiming::Before)?;

        enter(Phase::Emit);
        let mut lines = Vec::with_capacity(request.input.len() + 3);
        let mut created = Vec::with_capacity(request.input.len());
        for input in &request.input {
            let var = env.node_var();
            let mut body = vec![format!("CREATE ({var}{})", entity.label_pattern())];
            let sets = assignments(env, entity, &var, input)?;
            if !sets.is_empty() {
                body.push(format!("SET {}", sets.join(", ")));
            }
            if let Some(check) = self.write_validation(
                env,
                entity,
                &var,
                AuthOperation::Create,
                ValidationTiming::After,
            )? {
                body.push(check);
            }
            body.push(format!("RETURN {var}"));
            lines.push(call_subquery(&[], &body.join("\n")));
            created.push(var);
        }

        lines.push(format!("UNWIND [{}] AS {ROOT}", created.join(", ")));
        let projection = self.project(env, entity, ROOT, &request.selection)?;
        lines.extend(projection.subqueries);
        lines.push(format!("RETURN {} AS {ROOT}", projection.map));
        Ok((lines.join("\n"), StatementKind::Write, projection.shape))
    }

    /// `MATCH ... DETACH DELETE this RETURN count(*) AS this`.
    pub(crate) fn delete(&self, env: &mut Env, request: &DeleteRequest) -> Result<Emitted> {
        let entity = self.entity(&request.entity)?;
        let mut lines = vec![format!("MATCH ({ROOT}{})", entity.label_pattern())];
        let pred = self.node_predicate(env, entity, ROOT, request.filter.as_ref(), AuthOperation::Delete)?;
        push_where(&mut lines, &pred);
        if let Some(check) = self.write_validation(
            env,
            entity,
            ROOT,
            AuthOperation::Delete,
            ValidationTiming::Before,
        )? {
            lines.push(check);
        }

        enter(Phase::Emit);
        lines.push(format!("DETACH DELETE {ROOT}"));
        lines.push(format!("RETURN count(*) AS {ROOT}"));
        Ok((lines.join("\n"), StatementKind::Write, Shape::Leaf))
    }
}
