//! Boolean expression tree rendered into `WHERE` clauses.

use std::fmt;

/// Boolean expression fragment.
///
/// Constructors fold constants so a rule that can never match collapses to
/// [`Predicate::False`] and an empty conjunction disappears entirely.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Always true.
    True,
    /// Always false.
    False,
    /// Leaf expression, already rendered.
    Expr(String),
    /// Conjunction.
    And(Vec<Predicate>),
    /// Disjunction.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
    /// `EXISTS { MATCH <pattern> [WHERE <predicate>] }`.
    Exists {
        /// Match pattern.
        pattern: String,
        /// Optional inner filter.
        filter: Option<Box<Predicate>>,
    },
}

impl Predicate {
    /// Leaf constructor.
    pub fn expr(text: impl Into<String>) -> Self {
        Predicate::Expr(text.into())
    }

    /// Folding conjunction.
    pub fn and(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut out = Vec::new();
        for part in parts {
            match part {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Predicate::True,
            1 => out.remove(0),
            _ => Predicate::And(out),
        }
    }

    /// Folding disjunction.
    pub fn or(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut out = Vec::new();
        for part in parts {
            match part {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(inner) => out.extend(inner),
                other => out.push(other),
            }
        }
        match out.len() {
            0 => Predicate::False,
            1 => out.remove(0),
            _ => Predicate::Or(out),
        }
    }

    /// Folding negation.
    pub fn negate(self) -> Self {
        match self {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Existential subquery.
    pub fn exists(pattern: impl Into<String>, filter: Predicate) -> Self {
        let filter = match filter {
            Predicate::True => None,
            Predicate::False => return Predicate::False,
            other => Some(Box::new(other)),
        };
        Predicate::Exists {
            pattern: pattern.into(),
            filter,
        }
    }

    /// Whether the predicate is the constant `true`.
    pub fn is_true(&self) -> bool {
        matches!(self, Predicate::True)
    }

    /// Renders `WHERE <predicate>` with a leading newline, or nothing.
    pub fn where_clause(&self) -> String {
        if self.is_true() {
            String::new()
        } else {
            format!("\nWHERE {self}")
        }
    }

    fn needs_parens(&self) -> bool {
        matches!(self, Predicate::And(_) | Predicate::Or(_))
    }

    fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str) -> fmt::Result {
        for (idx, part) in parts.iter().enumerate() {
            if idx > 0 {
                f.write_str(sep)?;
            }
            if part.needs_parens() {
                write!(f, "({part})")?;
            } else {
                write!(f, "{part}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => f.write_str("true"),
            Predicate::False => f.write_str("false"),
            Predicate::Expr(text) => f.write_str(text),
            Predicate::And(parts) => Self::write_joined(f, parts, " AND "),
            Predicate::Or(parts) => Self::write_joined(f, parts, " OR "),
            Predicate::Not(inner) => write!(f, "NOT ({inner})"),
            Predicate::Exists { pattern, filter } => match filter {
                Some(filter) => write!(f, "EXISTS {{\n    MATCH {pattern}\n    WHERE {filter}\n}}"),
                None => write!(f, "EXISTS {{\n    MATCH {pattern}\n}}"),
            },
        }
    }
}
