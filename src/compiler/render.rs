//! SQL rendering of predicate ASTs
//!
//! Renderers are swappable: the compiler only produces an `Expr`, and each
//! store turns it into its own query language. Every placeholder is written
//! together with its bind value, never separately.

use crate::catalog::FieldValue;
use crate::ordering::{OrderSpec, SortDirection, StoreCollation, Tailoring};

use super::ast::{CharClass, Column, Expr};

/// Rendered expression text and its bind values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

impl RenderedSql {
    fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn push_param(&mut self, value: FieldValue) {
        self.sql.push('?');
        self.params.push(value);
    }
}

/// Renders predicates and sort orders for one store dialect
pub trait Renderer: Send + Sync {
    /// Renders a predicate expression
    fn render(&self, expr: &Expr) -> RenderedSql;

    /// Renders an ORDER BY list (without the keywords)
    fn render_order(&self, order: &OrderSpec) -> String;
}

/// MySQL dialect against the `prg_contacts` table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySqlRenderer {
    alias: &'static str,
}

impl Default for MySqlRenderer {
    fn default() -> Self {
        Self { alias: "co" }
    }
}

impl MySqlRenderer {
    /// Uses a different table alias
    pub fn with_alias(alias: &'static str) -> Self {
        Self { alias }
    }

    /// Table alias prefixed to every column
    pub fn alias(&self) -> &'static str {
        self.alias
    }

    fn column(&self, column: &Column) -> String {
        format!("{}.{}", self.alias, column.name)
    }

    fn write(&self, expr: &Expr, out: &mut RenderedSql) {
        match expr {
            Expr::Const(true) => out.push_sql("TRUE"),
            Expr::Const(false) => out.push_sql("FALSE"),
            Expr::And(terms) => self.write_joined(terms, " AND ", "TRUE", out),
            Expr::Or(terms) => self.write_joined(terms, " OR ", "FALSE", out),
            Expr::Compare { column, op, value } => {
                out.push_sql(&format!("{} {} ", self.column(column), op.as_sql()));
                out.push_param(value.clone());
            }
            Expr::Like {
                column,
                pattern,
                fold_case,
            } => {
                if *fold_case {
                    out.push_sql(&format!("LOWER({}) LIKE LOWER(", self.column(column)));
                    out.push_param(FieldValue::Text(pattern.clone()));
                    out.push_sql(")");
                } else {
                    out.push_sql(&format!("{} LIKE ", self.column(column)));
                    out.push_param(FieldValue::Text(pattern.clone()));
                }
            }
            Expr::In { values, .. } if values.is_empty() => out.push_sql("FALSE"),
            Expr::In { column, values } => {
                out.push_sql(&format!("{} IN (", self.column(column)));
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_sql(", ");
                    }
                    out.push_param(value.clone());
                }
                out.push_sql(")");
            }
            Expr::IsNull(column) => {
                out.push_sql(&format!("{} IS NULL", self.column(column)));
            }
            Expr::NotEmpty(column) => {
                let name = self.column(column);
                out.push_sql(&format!("({} IS NOT NULL AND {} <> '')", name, name));
            }
            Expr::StartsWith {
                column,
                class,
                negated,
            } => {
                let regexp = match class {
                    CharClass::Letter => "'^[[:alpha:]]'",
                    CharClass::Digit => "'^[0-9]'",
                };
                let op = if *negated { "NOT REGEXP" } else { "REGEXP" };
                out.push_sql(&format!("{} {} {}", self.column(column), op, regexp));
            }
        }
    }

    fn write_joined(&self, terms: &[Expr], connector: &str, empty: &str, out: &mut RenderedSql) {
        if terms.is_empty() {
            out.push_sql(empty);
            return;
        }
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                out.push_sql(connector);
            }
            let wrap = term.is_composite();
            if wrap {
                out.push_sql("(");
            }
            self.write(term, out);
            if wrap {
                out.push_sql(")");
            }
        }
    }

    fn collation_name(collation: StoreCollation) -> &'static str {
        match collation {
            StoreCollation::Binary => "utf8mb4_bin",
            StoreCollation::Locale(Tailoring::Root) => "utf8mb4_unicode_ci",
            StoreCollation::Locale(Tailoring::German) => "utf8mb4_german2_ci",
            StoreCollation::Locale(Tailoring::Swedish) => "utf8mb4_swedish_ci",
            StoreCollation::Locale(Tailoring::Danish) => "utf8mb4_danish_ci",
        }
    }
}

impl Renderer for MySqlRenderer {
    fn render(&self, expr: &Expr) -> RenderedSql {
        let mut out = RenderedSql::default();
        self.write(expr, &mut out);
        out
    }

    fn render_order(&self, order: &OrderSpec) -> String {
        let mut sql = self.column(&order.column);
        if let Some(collation) = order.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(Self::collation_name(collation));
        }
        sql.push_str(match order.direction {
            SortDirection::Asc => " ASC",
            SortDirection::Desc => " DESC",
        });
        if order.tiebreak != order.column {
            sql.push_str(&format!(", {} ASC", self.column(&order.tiebreak)));
        }
        sql
    }
}
