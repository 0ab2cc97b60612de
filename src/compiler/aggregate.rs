use super::{enter, push_where, CompileError, Ctx, Emitted, Phase, StatementKind, ROOT};
use crate::cypher::{call_subquery, escape_name, property_access, Env};
use crate::request::{AggregateFunction, AggregateRequest};
use crate::schema::{AuthOperation, Entity, Field};
use crate::shape::Shape;
use crate::value::Value;
use crate::Result;

fn check_field<'e>(
    entity: &'e Entity,
    name: &str,
    functions: &[AggregateFunction],
) -> std::result::Result<&'e Field, CompileError> {
    let field = entity
        .field(name)
        .ok_or_else(|| CompileError::unknown_field(&entity.name, name))?;
    let invalid = || CompileError::InvalidAggregate {
        entity: entity.name.clone(),
        field: name.to_owned(),
    };
    let ty = field.scalar_type().ok_or_else(invalid)?;
    if field.list || functions.is_empty() {
        return Err(invalid());
    }
    let supported = functions.iter().all(|function| {
        if function.is_textual() {
            ty.is_textual()
        } else {
            ty.is_numeric()
        }
    });
    if !supported {
        return Err(invalid());
    }
    Ok(field)
}

impl Ctx<'_> {
    /// Every aggregation runs in its own subquery over the same filtered
    /// match; the results are merged into one map.
    pub(crate) fn aggregate(&self, env: &mut Env, request: &AggregateRequest) -> Result<Emitted> {
        let entity = self.entity(&request.entity)?;
        let mut fields = Vec::with_capacity(request.fields.len());
        for selected in &request.fields {
            fields.push((check_field(entity, &selected.name, &selected.functions)?, selected));
        }

        let mut lines = Vec::new();
        let mut results = Vec::new();
        if request.count {
            let mut body = self.aggregate_match(env, entity, request.filter.as_ref())?;
            let out = env.value_var();
            body.push(format!("RETURN count({ROOT}) AS {out}"));
            lines.push(call_subquery(&[], &body.join("\n")));
            results.push(format!("count: {out}"));
        }

        for (field, selected) in fields {
            let mut body = self.aggregate_match(env, entity, request.filter.as_ref())?;
            let target = property_access(ROOT, field.property());
            let textual = selected.functions.iter().any(|f| f.is_textual());
            let out = env.value_var();
            let entries: Vec<String> = if textual {
                let list = env.value_var();
                body.push(format!("WITH {ROOT}\nORDER BY size({target}) DESC"));
                body.push(format!("WITH collect({target}) AS {list}"));
                selected
                    .functions
                    .iter()
                    .map(|function| match function {
                        AggregateFunction::Longest => format!("longest: head({list})"),
                        _ => format!("shortest: last({list})"),
                    })
                    .collect()
            } else {
                selected
                    .functions
                    .iter()
                    .map(|function| {
                        let call = match function {
                            AggregateFunction::Min => "min",
                            AggregateFunction::Max => "max",
                            AggregateFunction::Average => "avg",
                            _ => "sum",
                        };
                        format!("{}: {call}({target})", function.key())
                    })
                    .collect()
            };
            body.push(format!("RETURN {{ {} }} AS {out}", entries.join(", ")));
            lines.push(call_subquery(&[], &body.join("\n")));
            results.push(format!("{}: {out}", escape_name(&field.name)));
        }

        enter(Phase::Emit);
        let result = if results.is_empty() {
            "{}".to_owned()
        } else {
            format!("{{ {} }}", results.join(", "))
        };
        lines.push(format!("RETURN {result} AS {ROOT}"));
        Ok((lines.join("\n"), StatementKind::Read, Shape::Leaf))
    }

    fn aggregate_match(&self, env: &mut Env, entity: &Entity, filter: Option<&Value>) -> Result<Vec<String>> {
        let mut body = vec![format!("MATCH ({ROOT}{})", entity.label_pattern())];
        let pred = self.node_predicate(env, entity, ROOT, filter, AuthOperation::Aggregate)?;
        push_where(&mut body, &pred);
        if let Some(check) = self.read_validation(env, entity, ROOT, AuthOperation::Aggregate)? {
            body.push(check);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::compiler::{CompileError, Compiler, CompilerOptions};
    use crate::context::RequestContext;
    use crate::request::{AggregateField, AggregateFunction, AggregateRequest, Operation};
    use crate::schema::{Entity, Field, ScalarType, Schema};
    use crate::value_map;
    use crate::Error;

    fn compiler() -> Compiler {
        let movie = Entity::new("Movie")
            .with_field(Field::scalar("title", ScalarType::String))
            .with_field(Field::scalar("released", ScalarType::Int).aliased("year"));
        Compiler::new(
            Arc::new(Schema::new(vec![movie]).unwrap()),
            CompilerOptions::default(),
        )
    }

    #[test]
    fn each_aggregation_gets_its_own_subquery() {
        let op = Operation::Aggregate(AggregateRequest {
            entity: "Movie".into(),
            filter: Some(value_map! { "title_STARTS_WITH" => "The" }),
            count: true,
            fields: vec![
                AggregateField {
                    name: "title".into(),
                    functions: vec![AggregateFunction::Shortest, AggregateFunction::Longest],
                },
                AggregateField {
                    name: "released".into(),
                    functions: vec![AggregateFunction::Max],
                },
            ],
        });
        let compiled = compiler().compile(&op, &RequestContext::anonymous()).unwrap();
        assert_eq!(
            compiled.cypher,
            "CALL {\n    \
                 MATCH (this:Movie)\n    \
                 WHERE this.title STARTS WITH $param0\n    \
                 RETURN count(this) AS var0\n\
             }\n\
             CALL {\n    \
                 MATCH (this:Movie)\n    \
                 WHERE this.title STARTS WITH $param1\n    \
                 WITH this\n    \
                 ORDER BY size(this.title) DESC\n    \
                 WITH collect(this.title) AS var2\n    \
                 RETURN { shortest: last(var2), longest: head(var2) } AS var1\n\
             }\n\
             CALL {\n    \
                 MATCH (this:Movie)\n    \
                 WHERE this.title STARTS WITH $param2\n    \
                 RETURN { max: max(this.year) } AS var3\n\
             }\n\
             RETURN { count: var0, title: var1, released: var3 } AS this"
        );
    }

    #[test]
    fn rejects_mismatched_functions() {
        let op = Operation::Aggregate(AggregateRequest {
            entity: "Movie".into(),
            filter: None,
            count: false,
            fields: vec![AggregateField {
                name: "title".into(),
                functions: vec![AggregateFunction::Sum],
            }],
        });
        let err = compiler().compile(&op, &RequestContext::anonymous()).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::InvalidAggregate { .. })));
    }
}
