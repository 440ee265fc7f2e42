//! Predicate AST
//!
//! Values live inline in the tree. The renderer pushes a bind value exactly
//! when it writes a placeholder, so the two always line up.

use crate::catalog::{FieldId, FieldMapping, FieldValue};

use super::render::{MySqlRenderer, RenderedSql, Renderer};

/// A physical column bound to its abstract field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub field: FieldId,
    pub name: &'static str,
}

impl From<&FieldMapping> for Column {
    fn from(mapping: &FieldMapping) -> Self {
        Self {
            field: mapping.id,
            name: mapping.column,
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gte,
    Lte,
}

impl CompareOp {
    /// SQL operator text
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
        }
    }
}

/// Leading character classes for first-letter buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Letter,
    Digit,
}

/// Predicate expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Constant truth value
    Const(bool),
    /// Conjunction
    And(Vec<Expr>),
    /// Disjunction
    Or(Vec<Expr>),
    /// `column op value`
    Compare {
        column: Column,
        op: CompareOp,
        value: FieldValue,
    },
    /// `column LIKE pattern`; `fold_case` lowers both sides explicitly
    Like {
        column: Column,
        pattern: String,
        fold_case: bool,
    },
    /// `column IN (values)`
    In {
        column: Column,
        values: Vec<FieldValue>,
    },
    /// `column IS NULL`
    IsNull(Column),
    /// Column holds a non-empty value
    NotEmpty(Column),
    /// First character of the column belongs (or not) to a class
    StartsWith {
        column: Column,
        class: CharClass,
        negated: bool,
    },
}

impl Expr {
    /// Conjunction of terms; a single term stays unwrapped
    pub fn all(mut terms: Vec<Expr>) -> Expr {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::And(terms)
        }
    }

    /// Disjunction of terms; a single term stays unwrapped
    pub fn any(mut terms: Vec<Expr>) -> Expr {
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Or(terms)
        }
    }

    /// `column = value`
    pub fn eq(column: Column, value: FieldValue) -> Expr {
        Expr::Compare {
            column,
            op: CompareOp::Eq,
            value,
        }
    }

    /// True for And/Or nodes
    pub fn is_composite(&self) -> bool {
        matches!(self, Expr::And(_) | Expr::Or(_))
    }

    /// True if the expression can be shown to match no rows
    pub fn is_unsatisfiable(&self) -> bool {
        match self {
            Expr::Const(value) => !value,
            Expr::And(terms) => terms.iter().any(Expr::is_unsatisfiable),
            Expr::Or(terms) => terms.iter().all(Expr::is_unsatisfiable),
            Expr::In { values, .. } => values.is_empty(),
            _ => false,
        }
    }
}

/// Immutable output of predicate compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPredicate {
    expr: Expr,
    expression: String,
    bound_values: Vec<FieldValue>,
}

impl CompiledPredicate {
    /// Wraps an expression, rendering it with the default renderer
    pub fn new(expr: Expr) -> Self {
        let RenderedSql { sql, params } = MySqlRenderer::default().render(&expr);
        Self {
            expr,
            expression: sql,
            bound_values: params,
        }
    }

    /// The structured predicate
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Rendered expression text with `?` placeholders
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Bind values in placeholder order
    pub fn bound_values(&self) -> &[FieldValue] {
        &self.bound_values
    }

    /// Number of `?` placeholders in the expression text
    pub fn placeholder_count(&self) -> usize {
        self.expression.matches('?').count()
    }

    /// True if the predicate is known to select no rows
    pub fn matches_nothing(&self) -> bool {
        self.expr.is_unsatisfiable()
    }

    /// Renders the predicate for another target
    pub fn render_with(&self, renderer: &dyn Renderer) -> RenderedSql {
        renderer.render(&self.expr)
    }
}
