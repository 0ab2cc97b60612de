//! Filter key parsing (`title_CONTAINS`, `actors_SOME`, ...).

/// Operator encoded in a filter key suffix.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operator {
    /// Bare field name.
    Eq,
    /// `_NOT`.
    Not,
    /// `_IN`.
    In,
    /// `_NOT_IN`.
    NotIn,
    /// `_LT`.
    Lt,
    /// `_LTE`.
    Lte,
    /// `_GT`.
    Gt,
    /// `_GTE`.
    Gte,
    /// `_CONTAINS`.
    Contains,
    /// `_NOT_CONTAINS`.
    NotContains,
    /// `_STARTS_WITH`.
    StartsWith,
    /// `_NOT_STARTS_WITH`.
    NotStartsWith,
    /// `_ENDS_WITH`.
    EndsWith,
    /// `_NOT_ENDS_WITH`.
    NotEndsWith,
    /// `_MATCHES`.
    Matches,
    /// `_INCLUDES`, list membership.
    Includes,
    /// `_NOT_INCLUDES`.
    NotIncludes,
    /// `_ALL`, every related node matches.
    All,
    /// `_SOME`, at least one related node matches.
    Some,
    /// `_NONE`, no related node matches.
    None,
    /// `_SINGLE`, exactly one related node matches.
    Single,
}

/// Suffixes ordered so longer ones win (`_NOT_IN` before `_IN`).
const SUFFIXES: &[(&str, Operator)] = &[
    ("_NOT_STARTS_WITH", Operator::NotStartsWith),
    ("_NOT_ENDS_WITH", Operator::NotEndsWith),
    ("_NOT_CONTAINS", Operator::NotContains),
    ("_NOT_INCLUDES", Operator::NotIncludes),
    ("_STARTS_WITH", Operator::StartsWith),
    ("_ENDS_WITH", Operator::EndsWith),
    ("_CONTAINS", Operator::Contains),
    ("_INCLUDES", Operator::Includes),
    ("_MATCHES", Operator::Matches),
    ("_NOT_IN", Operator::NotIn),
    ("_SINGLE", Operator::Single),
    ("_SOME", Operator::Some),
    ("_NONE", Operator::None),
    ("_NOT", Operator::Not),
    ("_ALL", Operator::All),
    ("_LTE", Operator::Lte),
    ("_GTE", Operator::Gte),
    ("_LT", Operator::Lt),
    ("_GT", Operator::Gt),
    ("_IN", Operator::In),
];

impl Operator {
    /// Suffix as written in filter keys.
    pub fn suffix(self) -> &'static str {
        if self == Operator::Eq {
            return "";
        }
        SUFFIXES
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(suffix, _)| *suffix)
            .unwrap_or_default()
    }

    /// For negated operators, the positive form they negate.
    pub fn negated_base(self) -> Option<Operator> {
        match self {
            Operator::Not => Some(Operator::Eq),
            Operator::NotIn => Some(Operator::In),
            Operator::NotContains => Some(Operator::Contains),
            Operator::NotStartsWith => Some(Operator::StartsWith),
            Operator::NotEndsWith => Some(Operator::EndsWith),
            Operator::NotIncludes => Some(Operator::Includes),
            _ => None,
        }
    }

    /// Whether this is a relationship quantifier.
    pub fn is_quantifier(self) -> bool {
        matches!(
            self,
            Operator::All | Operator::Some | Operator::None | Operator::Single
        )
    }
}

/// Splits a filter key into field name and operator.
///
/// `is_field` is consulted first so fields whose names happen to end in an
/// operator suffix still resolve to plain equality.
pub fn parse_key<'k>(key: &'k str, is_field: impl Fn(&str) -> bool) -> Option<(&'k str, Operator)> {
    if is_field(key) {
        return Some((key, Operator::Eq));
    }
    SUFFIXES.iter().find_map(|(suffix, op)| {
        key.strip_suffix(suffix)
            .filter(|field| !field.is_empty() && is_field(field))
            .map(|field| (field, *op))
    })
}

/// Splits any key on a known suffix without consulting a field list.
pub fn split_suffix(key: &str) -> (&str, Operator) {
    SUFFIXES
        .iter()
        .find_map(|(suffix, op)| {
            key.strip_suffix(suffix)
                .filter(|field| !field.is_empty())
                .map(|field| (field, *op))
        })
        .unwrap_or((key, Operator::Eq))
}
