//! WHERE-clause builder.
//!
//! [`Cond`] renders every predicate immediately into a quoted SQL fragment with `?`
//! placeholders; fragments are ANDed together by [`Cond::to_sql`]. There is no deferred
//! expression tree, so a condition cannot be inspected after it is built.
//!
//! Every fragment binds at least as tightly as `AND`: raw SQL is parenthesized, so more
//! fragments (the soft-delete guard included) can always be ANDed on.
//!
//! Column arguments must be plain identifiers (`name`, `users.name`); anything else is a
//! programming error and panics. Use [`Cond::raw`] for expressions.
//!
//! # Example
//! ```ignore
//! use scoop::{Cond, Dialect};
//!
//! let cond = Cond::new(Dialect::MySql)
//!     .eq("status", "active")
//!     .gte("age", 18)
//!     .in_list("role", ["admin", "owner"])
//!     .or([
//!         Cond::new(Dialect::MySql).like("name", "bob"),
//!         Cond::new(Dialect::MySql).is_null("name"),
//!     ]);
//! assert_eq!(
//!     cond.to_sql(),
//!     "`status` = ? AND `age` >= ? AND `role` IN (?, ?) AND (`name` LIKE ? OR `name` IS NULL)"
//! );
//! ```

use crate::dialect::{Dialect, is_plain_ident};
use crate::value::{Encode, Expr, List, Value};
use std::collections::{BTreeMap, HashMap};

/// Operators accepted by [`Cond::op`] and `(column, op, value)` clauses.
const ALLOWED_OPS: &[&str] = &[
    "=", "!=", "<>", ">", ">=", "<", "<=", "LIKE", "NOT LIKE", "IN", "NOT IN",
];

/// Accumulated predicate fragments plus their bound parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cond {
    dialect: Dialect,
    fragments: Vec<String>,
    params: Vec<Value>,
    skip: bool,
}

/// One predicate in any of the shapes accepted by [`Cond::where_`].
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `false` marks the condition as matching nothing; `true` adds nothing.
    Bool(bool),
    /// `column = value`
    Eq(String, Value),
    /// `column <op> value`
    Op(String, String, Value),
    /// `column IN (...)` or `column NOT IN (...)`; the operator must be one of the two.
    In(String, String, Vec<Value>),
    /// Raw SQL with bound arguments.
    Raw(Expr),
    /// A nested condition, parenthesized.
    Group(Cond),
    /// Several clauses ANDed together.
    All(Vec<Clause>),
}

impl From<bool> for Clause {
    fn from(b: bool) -> Self {
        Clause::Bool(b)
    }
}

impl<K: Into<String>, V: Encode> From<(K, V)> for Clause {
    fn from((column, value): (K, V)) -> Self {
        Clause::Eq(column.into(), value.encode())
    }
}

impl<K: Into<String>, O: Into<String>, V: Encode> From<(K, O, V)> for Clause {
    fn from((column, op, value): (K, O, V)) -> Self {
        Clause::Op(column.into(), op.into(), value.encode())
    }
}

impl<K: Into<String>, O: Into<String>> From<(K, O, List)> for Clause {
    fn from((column, op, values): (K, O, List)) -> Self {
        Clause::In(column.into(), op.into(), values.0)
    }
}

impl From<Expr> for Clause {
    fn from(expr: Expr) -> Self {
        Clause::Raw(expr)
    }
}

impl From<Cond> for Clause {
    fn from(cond: Cond) -> Self {
        Clause::Group(cond)
    }
}

impl<C: Into<Clause>> From<Vec<C>> for Clause {
    fn from(items: Vec<C>) -> Self {
        Clause::All(items.into_iter().map(Into::into).collect())
    }
}

impl<K: AsRef<str>, V: Encode> From<BTreeMap<K, V>> for Clause {
    fn from(map: BTreeMap<K, V>) -> Self {
        Clause::All(
            map.iter()
                .map(|(k, v)| Clause::Eq(k.as_ref().to_string(), v.encode()))
                .collect(),
        )
    }
}

/// Entries are rendered in key order so the output is deterministic.
impl<K: AsRef<str>, V: Encode, S> From<HashMap<K, V, S>> for Clause {
    fn from(map: HashMap<K, V, S>) -> Self {
        let mut entries: Vec<(&str, &V)> = map.iter().map(|(k, v)| (k.as_ref(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Clause::All(
            entries
                .into_iter()
                .map(|(k, v)| Clause::Eq(k.to_string(), v.encode()))
                .collect(),
        )
    }
}

fn check_column(column: &str) {
    assert!(!column.trim().is_empty(), "scoop: empty column name in condition");
    assert!(
        is_plain_ident(column),
        "scoop: column {column:?} is not an identifier; use Cond::raw for expressions"
    );
}

fn normalize_op(op: &str) -> Option<&'static str> {
    let upper = op.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
    ALLOWED_OPS.iter().copied().find(|allowed| *allowed == upper)
}

impl Cond {
    /// An empty condition for `dialect`.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Whether the condition is statically known to match nothing.
    pub fn is_skip(&self) -> bool {
        self.skip
    }

    /// Whether no predicate has been added.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Bound parameters, in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// The fragments joined with `AND`, without the `WHERE` keyword.
    pub fn to_sql(&self) -> String {
        self.fragments.join(" AND ")
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.to_sql(), self.params)
    }

    fn push(&mut self, fragment: String, params: impl IntoIterator<Item = Value>) {
        self.fragments.push(fragment);
        self.params.extend(params);
    }

    fn quote(&self, column: &str) -> String {
        self.dialect.quote(column)
    }

    /// Add a predicate in any [`Clause`] shape.
    ///
    /// # Panics
    /// Panics on an empty column or an operator outside the allow-list.
    #[must_use]
    pub fn where_(mut self, clause: impl Into<Clause>) -> Self {
        self.apply(clause.into());
        self
    }

    fn apply(&mut self, clause: Clause) {
        match clause {
            Clause::Bool(true) => {}
            Clause::Bool(false) => self.skip = true,
            Clause::Eq(column, value) => self.apply_op(&column, "=", value),
            Clause::Op(column, op, value) => self.apply_op(&column, &op, value),
            Clause::In(column, op, values) => {
                check_column(&column);
                match normalize_op(&op) {
                    Some(op @ ("IN" | "NOT IN")) => self.apply_list(&column, op, values),
                    _ => panic!("scoop: operator {op:?} does not take a list on column {column:?}"),
                }
            }
            Clause::Raw(expr) => self.apply_raw(expr),
            Clause::Group(cond) => self.apply_group(cond),
            Clause::All(items) => {
                for item in items {
                    self.apply(item);
                }
            }
        }
    }

    fn apply_op(&mut self, column: &str, op: &str, value: Value) {
        check_column(column);
        assert!(!op.trim().is_empty(), "scoop: empty operator on column {column:?}");
        let Some(op) = normalize_op(op) else {
            panic!("scoop: operator {op:?} is not allowed on column {column:?}");
        };
        let quoted = self.quote(column);
        let null = value == Value::Null;
        match op {
            "=" if null => self.push(format!("{quoted} IS NULL"), []),
            "!=" | "<>" if null => self.push(format!("{quoted} IS NOT NULL"), []),
            "IN" | "NOT IN" => self.apply_list(column, op, vec![value]),
            _ => self.push(format!("{quoted} {op} ?"), [value]),
        }
    }

    fn apply_raw(&mut self, expr: Expr) {
        if expr.sql.trim().is_empty() {
            return;
        }
        self.push(format!("({})", expr.sql), expr.args);
    }

    fn apply_group(&mut self, cond: Cond) {
        if cond.skip {
            self.skip = true;
        }
        match cond.fragments.len() {
            0 => {}
            1 => self.push(cond.fragments.join(""), cond.params),
            _ => self.push(format!("({})", cond.fragments.join(" AND ")), cond.params),
        }
    }

    /// Raw SQL predicate with its bound arguments, wrapped in parentheses.
    #[must_use]
    pub fn raw(mut self, expr: Expr) -> Self {
        self.apply_raw(expr);
        self
    }

    /// `column <op> value` with `op` from the allow-list (case-insensitive).
    ///
    /// # Panics
    /// Panics on an empty column, an empty operator or an operator outside the allow-list.
    #[must_use]
    pub fn op(mut self, column: &str, op: &str, value: impl Encode) -> Self {
        self.apply_op(column, op, value.encode());
        self
    }

    /// `column = value`; a NULL value renders `IS NULL`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Encode) -> Self {
        self.op(column, "=", value)
    }

    /// `column != value`; a NULL value renders `IS NOT NULL`.
    #[must_use]
    pub fn ne(self, column: &str, value: impl Encode) -> Self {
        self.op(column, "!=", value)
    }

    #[must_use]
    pub fn gt(self, column: &str, value: impl Encode) -> Self {
        self.op(column, ">", value)
    }

    #[must_use]
    pub fn gte(self, column: &str, value: impl Encode) -> Self {
        self.op(column, ">=", value)
    }

    #[must_use]
    pub fn lt(self, column: &str, value: impl Encode) -> Self {
        self.op(column, "<", value)
    }

    #[must_use]
    pub fn lte(self, column: &str, value: impl Encode) -> Self {
        self.op(column, "<=", value)
    }

    fn apply_list(&mut self, column: &str, op: &str, values: Vec<Value>) {
        if values.is_empty() {
            // IN () is invalid SQL: an empty IN matches nothing, an empty NOT IN matches all.
            if op == "IN" {
                self.skip = true;
            }
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let fragment = format!("{} {op} ({placeholders})", self.quote(column));
        self.push(fragment, values);
    }

    fn list<I>(mut self, column: &str, op: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Encode,
    {
        check_column(column);
        self.apply_list(column, op, values.into_iter().map(|v| v.encode()).collect());
        self
    }

    /// `column IN (...)`.
    ///
    /// An empty list marks the whole condition as matching nothing: the owning query
    /// returns no rows without touching the database.
    #[must_use]
    pub fn in_list<I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Encode,
    {
        self.list(column, "IN", values)
    }

    /// `column NOT IN (...)`.
    ///
    /// An empty list adds no predicate (every row passes). This is intentionally not the
    /// mirror of [`Cond::in_list`].
    #[must_use]
    pub fn not_in<I>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Encode,
    {
        self.list(column, "NOT IN", values)
    }

    fn range(mut self, column: &str, op: &str, from: Value, to: Value) -> Self {
        check_column(column);
        let fragment = format!("{} {op} ? AND ?", self.quote(column));
        self.push(fragment, [from, to]);
        self
    }

    #[must_use]
    pub fn between(self, column: &str, from: impl Encode, to: impl Encode) -> Self {
        self.range(column, "BETWEEN", from.encode(), to.encode())
    }

    #[must_use]
    pub fn not_between(self, column: &str, from: impl Encode, to: impl Encode) -> Self {
        self.range(column, "NOT BETWEEN", from.encode(), to.encode())
    }

    #[must_use]
    pub fn is_null(mut self, column: &str) -> Self {
        check_column(column);
        let fragment = format!("{} IS NULL", self.quote(column));
        self.push(fragment, []);
        self
    }

    #[must_use]
    pub fn is_not_null(mut self, column: &str) -> Self {
        check_column(column);
        let fragment = format!("{} IS NOT NULL", self.quote(column));
        self.push(fragment, []);
        self
    }

    fn pattern(mut self, column: &str, negate: bool, value: &str, pattern: String) -> Self {
        // An empty needle would match every row.
        if value.is_empty() {
            return self;
        }
        let op = if negate { "NOT LIKE" } else { "LIKE" };
        self.apply_op(column, op, Value::Text(pattern));
        self
    }

    /// `column LIKE '%value%'`. An empty value adds nothing.
    #[must_use]
    pub fn like(self, column: &str, value: &str) -> Self {
        self.pattern(column, false, value, format!("%{value}%"))
    }

    /// `column LIKE '%value'`. An empty value adds nothing.
    #[must_use]
    pub fn left_like(self, column: &str, value: &str) -> Self {
        self.pattern(column, false, value, format!("%{value}"))
    }

    /// `column LIKE 'value%'`. An empty value adds nothing.
    #[must_use]
    pub fn right_like(self, column: &str, value: &str) -> Self {
        self.pattern(column, false, value, format!("{value}%"))
    }

    #[must_use]
    pub fn not_like(self, column: &str, value: &str) -> Self {
        self.pattern(column, true, value, format!("%{value}%"))
    }

    #[must_use]
    pub fn not_left_like(self, column: &str, value: &str) -> Self {
        self.pattern(column, true, value, format!("%{value}"))
    }

    #[must_use]
    pub fn not_right_like(self, column: &str, value: &str) -> Self {
        self.pattern(column, true, value, format!("{value}%"))
    }

    /// `(a OR b OR ...)` over nested conditions.
    ///
    /// Members that match nothing drop out; if every member matches nothing so does the
    /// result. A member with no predicates matches everything, so the whole group adds nothing.
    #[must_use]
    pub fn or(mut self, members: impl IntoIterator<Item = Cond>) -> Self {
        let mut parts = Vec::new();
        let mut params = Vec::new();
        let mut any = false;
        for member in members {
            any = true;
            if member.skip {
                continue;
            }
            if member.fragments.is_empty() {
                return self;
            }
            if member.fragments.len() == 1 {
                parts.push(member.fragments.join(""));
            } else {
                parts.push(format!("({})", member.fragments.join(" AND ")));
            }
            params.extend(member.params);
        }
        if !any {
            return self;
        }
        match parts.len() {
            0 => self.skip = true,
            1 => self.push(parts.join(""), params),
            _ => self.push(format!("({})", parts.join(" OR ")), params),
        }
        self
    }
}
