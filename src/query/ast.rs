//! The parsed representation of a query-language expression: a boolean
//! tree of `Must`/`Should`/`MustNot` combinators over `Filter` leaves.

/// Which asset attribute a filter predicate inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Name,
    AssetType,
    Provider,
    Tag,
    Metadata,
    Description,
}

/// A comparison applied between a field and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Contains,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Range,
    /// Not produced by the parser (no surface syntax names it directly);
    /// retained for programmatically constructed filters and for rule
    /// kinds that want to assert presence of a metadata key.
    Exists,
    Regex,
}

/// The right-hand side of a filter comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Str(String),
    Range(String, String),
}

/// A single leaf predicate: `@field op value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field_type: FieldType,
    /// Dotted metadata path, set only when `field_type == Metadata`.
    pub field: Option<String>,
    pub operator: Operator,
    pub value: FilterValue,
}

/// A boolean-combinator tree over filters, as produced by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// AND: every child must match.
    Must(Vec<Node>),
    /// OR: at least one child must match.
    Should(Vec<Node>),
    /// NOT: the wrapped node must not match.
    MustNot(Box<Node>),
    Filter(Filter),
    /// A bare term with no `@field` prefix: full-text match on name/description.
    BareTerm(String),
}

impl Node {
    /// Collapse a single-element combinator list to its sole child so the
    /// tree doesn't carry redundant wrapper nodes for `a AND b` when there
    /// was only one `a`.
    pub fn must(mut children: Vec<Node>) -> Node {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Node::Must(children)
        }
    }

    pub fn should(mut children: Vec<Node>) -> Node {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Node::Should(children)
        }
    }
}
