//! Join condition validation.
//!
//! A two-table selection is joined on a single equality predicate whose
//! sides follow the selection order exactly:
//!
//! ```text
//! tables = ["orders", "customers"]
//!
//!   orders.customer_id = customers.id     ok
//!   orders.customer_id=customers.id       ok (spacing around '=' is free)
//!   customers.id = orders.customer_id     rejected (sides swapped)
//!   o.customer_id = c.id                  rejected (no aliases)
//! ```

use regex::Regex;

/// Column names of a valid join condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinKeys {
    /// Column of `tables[0]`.
    pub left: String,
    /// Column of `tables[1]`.
    pub right: String,
}

/// Build the pattern for a table pair. Table names match literally.
fn pattern_for(left: &str, right: &str) -> Option<Regex> {
    let pattern = format!(
        r"^{}\.([a-zA-Z_]+)\s*=\s*{}\.([a-zA-Z_]+)$",
        regex::escape(left),
        regex::escape(right)
    );
    Regex::new(&pattern).ok()
}

/// Parse a join condition against the selected table pair.
///
/// Returns `None` unless exactly two tables are selected and the condition
/// has the form `<tables[0]>.<ident> = <tables[1]>.<ident>`.
pub fn parse_join_condition(condition: &str, tables: &[String]) -> Option<JoinKeys> {
    let [left, right] = tables else {
        return None;
    };
    let captures = pattern_for(left, right)?.captures(condition)?;
    Some(JoinKeys {
        left: captures[1].to_string(),
        right: captures[2].to_string(),
    })
}

/// Validate a join condition against the current table selection.
///
/// With fewer than two tables no join applies and every condition,
/// including the empty one, is accepted.
pub fn validate(condition: &str, tables: &[String]) -> bool {
    if tables.len() < 2 {
        return true;
    }
    parse_join_condition(condition, tables).is_some()
}
