//! SQL dialects and their per-database quirks.
//!
//! Every dialect-specific fragment lives in one [`DialectTraits`] row.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// The target database family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// MySQL and wire-compatible servers (MariaDB, TiDB).
    MySql,
    /// PostgreSQL and wire-compatible servers.
    Postgres,
    /// SQLite, libSQL and Turso.
    Sqlite,
    /// Anything else: ANSI quoting, plain INSERT, no id retrieval.
    #[default]
    Generic,
}

/// Static description of one dialect.
#[derive(Debug)]
pub struct DialectTraits {
    /// Identifier quote character.
    pub quote: char,
    /// INSERT verb used when duplicate keys must be ignored.
    pub insert_ignore: &'static str,
    /// Suffix appended to INSERT when duplicate keys must be ignored.
    pub conflict_suffix: &'static str,
    /// Follow-up query returning the id generated by the last INSERT.
    pub last_insert_id: Option<&'static str>,
    /// Whether `INSERT ... RETURNING` can fold id retrieval into the insert.
    pub returning: bool,
    /// Whether placeholders are numbered (`$1`) instead of positional (`?`).
    pub numbered_placeholders: bool,
    /// LIMIT literal meaning "no limit", required before OFFSET by some engines.
    pub unbounded_limit: Option<&'static str>,
    /// Whether an INSERT that writes no column can use `() VALUES (), ...`.
    /// Otherwise it is rendered as `DEFAULT VALUES`, one row per statement.
    pub empty_row_tuple: bool,
}

const MYSQL: DialectTraits = DialectTraits {
    quote: '`',
    insert_ignore: "INSERT IGNORE INTO",
    conflict_suffix: "",
    last_insert_id: Some("SELECT LAST_INSERT_ID()"),
    returning: false,
    numbered_placeholders: false,
    unbounded_limit: Some("18446744073709551615"),
    empty_row_tuple: true,
};

const POSTGRES: DialectTraits = DialectTraits {
    quote: '"',
    insert_ignore: "INSERT INTO",
    conflict_suffix: " ON CONFLICT DO NOTHING",
    last_insert_id: None,
    returning: true,
    numbered_placeholders: true,
    unbounded_limit: None,
    empty_row_tuple: false,
};

const SQLITE: DialectTraits = DialectTraits {
    quote: '"',
    insert_ignore: "INSERT OR IGNORE INTO",
    conflict_suffix: "",
    last_insert_id: Some("SELECT last_insert_rowid()"),
    returning: false,
    numbered_placeholders: false,
    unbounded_limit: Some("-1"),
    empty_row_tuple: false,
};

const GENERIC: DialectTraits = DialectTraits {
    quote: '"',
    insert_ignore: "INSERT INTO",
    conflict_suffix: "",
    last_insert_id: None,
    returning: false,
    numbered_placeholders: false,
    unbounded_limit: None,
    empty_row_tuple: false,
};

impl Dialect {
    /// Resolve a dialect from a driver or database name.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" | "tidb" => Dialect::MySql,
            "postgres" | "postgresql" | "pgx" | "cockroachdb" => Dialect::Postgres,
            "sqlite" | "sqlite3" | "libsql" | "turso" => Dialect::Sqlite,
            _ => Dialect::Generic,
        }
    }

    /// The strategy row for this dialect.
    pub fn traits(self) -> &'static DialectTraits {
        match self {
            Dialect::MySql => &MYSQL,
            Dialect::Postgres => &POSTGRES,
            Dialect::Sqlite => &SQLITE,
            Dialect::Generic => &GENERIC,
        }
    }

    /// Quote an identifier, including each part of a dotted name.
    ///
    /// Expressions (`COUNT(*)`, `name DESC`, already-quoted names) are returned untouched.
    pub fn quote(self, ident: &str) -> String {
        let q = self.traits().quote;
        if ident.is_empty() || !is_plain_ident(ident) {
            return ident.to_string();
        }
        let mut out = String::with_capacity(ident.len() + 4);
        for (i, part) in ident.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            if part == "*" {
                out.push('*');
            } else {
                out.push(q);
                out.push_str(part);
                out.push(q);
            }
        }
        out
    }

    /// `INSERT` verb, honoring the ignore flag.
    pub fn insert_verb(self, ignore: bool) -> &'static str {
        if ignore {
            self.traits().insert_ignore
        } else {
            "INSERT INTO"
        }
    }

    /// Suffix appended after `VALUES (...)`, honoring the ignore flag.
    pub fn insert_suffix(self, ignore: bool) -> &'static str {
        if ignore { self.traits().conflict_suffix } else { "" }
    }

    /// Rewrite `?` placeholders into the dialect's native form.
    pub fn finalize(self, sql: &str) -> Cow<'_, str> {
        if self.traits().numbered_placeholders {
            number_placeholders(sql)
        } else {
            Cow::Borrowed(sql)
        }
    }
}

pub(crate) fn is_plain_ident(ident: &str) -> bool {
    ident
        .split('.')
        .all(|part| part == "*" || (!part.is_empty() && part.bytes().all(is_ident_byte)))
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether a table name stays within the `[A-Za-z0-9_.]` allow-list.
pub fn is_valid_table_name(name: &str) -> bool {
    static TABLE_RE: OnceLock<Regex> = OnceLock::new();
    TABLE_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_.]+$").expect("invalid built-in table regex"))
        .is_match(name)
}

#[derive(Clone, Copy)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

/// Replace positional `?` placeholders with `$1, $2, ...`.
///
/// Quoted strings, quoted identifiers and comments are copied verbatim.
/// Returns a borrowed `Cow` when the statement has no placeholders.
pub fn number_placeholders(sql: &str) -> Cow<'_, str> {
    if !sql.contains('?') {
        return Cow::Borrowed(sql);
    }

    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 8);
    let mut state = State::Normal;
    let mut n = 0usize;
    let mut start = 0usize;
    let mut idx = 0usize;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => state = State::LineComment,
                b'/' if bytes.get(idx + 1) == Some(&b'*') => state = State::BlockComment,
                b'?' => {
                    out.push_str(&sql[start..idx]);
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                    start = idx + 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    idx += 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    if n == 0 {
        return Cow::Borrowed(sql);
    }
    out.push_str(&sql[start..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_names() {
        assert_eq!(Dialect::from_name("MySQL"), Dialect::MySql);
        assert_eq!(Dialect::from_name("tidb"), Dialect::MySql);
        assert_eq!(Dialect::from_name("postgresql"), Dialect::Postgres);
        assert_eq!(Dialect::from_name("sqlite3"), Dialect::Sqlite);
        assert_eq!(Dialect::from_name("clickhouse"), Dialect::Generic);
    }

    #[test]
    fn quotes_per_dialect() {
        assert_eq!(Dialect::MySql.quote("name"), "`name`");
        assert_eq!(Dialect::Postgres.quote("name"), "\"name\"");
        assert_eq!(Dialect::Sqlite.quote("u.name"), "\"u\".\"name\"");
        assert_eq!(Dialect::MySql.quote("u.*"), "`u`.*");
    }

    #[test]
    fn expressions_are_not_quoted() {
        assert_eq!(Dialect::MySql.quote("COUNT(*)"), "COUNT(*)");
        assert_eq!(Dialect::Postgres.quote("id DESC"), "id DESC");
        assert_eq!(Dialect::Postgres.quote("\"id\""), "\"id\"");
    }

    #[test]
    fn insert_ignore_per_dialect() {
        assert_eq!(Dialect::MySql.insert_verb(true), "INSERT IGNORE INTO");
        assert_eq!(Dialect::Sqlite.insert_verb(true), "INSERT OR IGNORE INTO");
        assert_eq!(Dialect::Postgres.insert_verb(true), "INSERT INTO");
        assert_eq!(
            Dialect::Postgres.insert_suffix(true),
            " ON CONFLICT DO NOTHING"
        );
        assert_eq!(Dialect::Generic.insert_verb(true), "INSERT INTO");
        assert_eq!(Dialect::Generic.insert_suffix(true), "");
        assert_eq!(Dialect::MySql.insert_verb(false), "INSERT INTO");
    }

    #[test]
    fn numbers_placeholders_outside_literals() {
        let sql = "SELECT * FROM t WHERE a = ? AND b = '?' AND \"c?\" = ? -- ?\n AND d = ?";
        assert_eq!(
            number_placeholders(sql),
            "SELECT * FROM t WHERE a = $1 AND b = '?' AND \"c?\" = $2 -- ?\n AND d = $3"
        );
    }

    #[test]
    fn numbering_without_placeholders_borrows() {
        assert!(matches!(
            number_placeholders("SELECT 1"),
            Cow::Borrowed("SELECT 1")
        ));
        assert!(matches!(Dialect::MySql.finalize("a = ?"), Cow::Borrowed(_)));
    }

    #[test]
    fn table_allow_list() {
        assert!(is_valid_table_name("users"));
        assert!(is_valid_table_name("app.users_2"));
        assert!(!is_valid_table_name("users; DROP TABLE x"));
        assert!(!is_valid_table_name(""));
    }
}
