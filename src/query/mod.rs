pub mod eval;
pub mod lexer;
pub mod parser;

pub use eval::FilterTarget;
pub use lexer::{CompareOp, Lexer, Token};
pub use parser::{FilterExpr, FilterParser, LitValue, Operand, QueryTarget, SystemField};

use crate::error::StoreResult;

/// Compile an optional OData filter into an executable predicate. An absent
/// or blank filter admits every record.
pub fn compile(filter: Option<&str>, target: QueryTarget) -> StoreResult<FilterExpr> {
    match filter {
        Some(f) if !f.trim().is_empty() => {
            tracing::debug!("Compiling {:?} filter: {}", target, f);
            FilterParser::new(f, target)?.parse()
        }
        _ => Ok(FilterExpr::Literal(true)),
    }
}

/// Parse a datetime literal body (or a stored datetime property) into a
/// millisecond epoch. `None` marks an unparseable value; comparisons treat
/// it like NaN.
pub(crate) fn parse_datetime_millis(body: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(body)
        .ok()
        .map(|t| t.timestamp_millis())
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc().timestamp_millis())
        })
}
