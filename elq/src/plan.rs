//! Abstract query plans consumed from the plan front-end
//!
//! A [`Plan`] is a source type plus an ordered sequence of steps and a
//! terminal operation, the distilled form of a host-language query after
//! its front-end has resolved members into [`FieldRef`] tokens. The
//! compiler walks this tree exactly once; there is no cost-based planning.

use crate::mapping::FieldRef;
use crate::request::search::Highlight;
use crate::value::Scalar;

/// Comparison operator in a leaf predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Member-valued aggregate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOp {
    Min,
    Max,
    Sum,
    Avg,
}

impl StatOp {
    /// Operation code as it appears in stats aggregation results.
    pub fn code(&self) -> &'static str {
        match self {
            StatOp::Min => "min",
            StatOp::Max => "max",
            StatOp::Sum => "sum",
            StatOp::Avg => "avg",
        }
    }
}

/// Expression vocabulary recognized by the rebinder.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A member access. Boolean members in predicate position rebind to an
    /// equality test against `true`.
    Member(FieldRef),
    Constant(Scalar),
    /// Access to the grouping key inside a grouped projection.
    Key,
    Compare {
        field: FieldRef,
        op: CompareOp,
        value: Scalar,
    },
    In {
        field: FieldRef,
        values: Vec<Scalar>,
    },
    Prefix {
        field: FieldRef,
        value: String,
    },
    Regexp {
        field: FieldRef,
        pattern: String,
    },
    QueryString {
        query: String,
        fields: Vec<String>,
    },
    MatchAll,
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// Counting operation; with a predicate it becomes a conditional count.
    Count {
        predicate: Option<Box<Expr>>,
    },
    /// Min/max/sum/avg over a member.
    Stat {
        op: StatOp,
        field: FieldRef,
    },
    /// Projection shape producing one output column per element.
    Tuple(Vec<Expr>),
}

impl Expr {
    pub fn eq(field: FieldRef, value: Scalar) -> Expr {
        Expr::Compare {
            field,
            op: CompareOp::Eq,
            value,
        }
    }

    pub fn compare(field: FieldRef, op: CompareOp, value: Scalar) -> Expr {
        Expr::Compare { field, op, value }
    }

    pub fn count() -> Expr {
        Expr::Count { predicate: None }
    }

    pub fn count_if(predicate: Expr) -> Expr {
        Expr::Count {
            predicate: Some(Box::new(predicate)),
        }
    }

    pub fn stat(op: StatOp, field: FieldRef) -> Expr {
        Expr::Stat { op, field }
    }

    pub fn not(inner: Expr) -> Expr {
        Expr::Not(Box::new(inner))
    }
}

/// One step in the plan sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    /// Filter-context predicate (no scoring).
    Where(Expr),
    /// Query-context predicate (scored).
    Query(Expr),
    /// Grouping key: a member, a tuple of members, or a constant.
    GroupBy(Expr),
    /// Projection over hits or over grouped rows.
    Select(Expr),
    OrderBy {
        field: FieldRef,
        ascending: bool,
        ignore_unmapped: bool,
    },
    Skip(usize),
    Take(usize),
    MinScore(f64),
    Highlight(Highlight),
}

/// Terminal operation deciding result cardinality.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    List,
    First { or_default: bool },
    Single { or_default: bool },
    Any,
    /// Whole-set count, answered from the hit total rather than a facet.
    Count,
    /// Whole-set aggregate such as a top-level sum.
    Aggregate(Expr),
}

/// An abstract query plan over one document source type.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub source: String,
    pub steps: Vec<PlanStep>,
    pub terminal: Terminal,
}

impl Plan {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            steps: Vec::new(),
            terminal: Terminal::List,
        }
    }

    pub fn step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn terminal(mut self, terminal: Terminal) -> Self {
        self.terminal = terminal;
        self
    }
}
