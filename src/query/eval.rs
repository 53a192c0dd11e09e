use serde_json::Value;
use std::cmp::Ordering;

use super::lexer::CompareOp;
use super::parse_datetime_millis;
use super::parser::{FilterExpr, LitValue, Operand, SystemField};
use crate::storage::record::{EntityRecord, TableRecord};

/// A record shape filters can run against.
pub trait FilterTarget {
    fn system_field(&self, field: SystemField) -> Option<&str>;
    fn property(&self, name: &str) -> Option<&Value>;
}

impl FilterTarget for TableRecord {
    fn system_field(&self, field: SystemField) -> Option<&str> {
        match field {
            SystemField::TableName => Some(&self.table),
            _ => None,
        }
    }

    fn property(&self, _name: &str) -> Option<&Value> {
        None
    }
}

impl FilterTarget for EntityRecord {
    fn system_field(&self, field: SystemField) -> Option<&str> {
        match field {
            SystemField::PartitionKey => Some(&self.partition_key),
            SystemField::RowKey => Some(&self.row_key),
            SystemField::TableName => None,
        }
    }

    fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

impl FilterExpr {
    /// Evaluate the predicate against one record.
    pub fn matches<T: FilterTarget>(&self, record: &T) -> bool {
        match self {
            FilterExpr::And(left, right) => left.matches(record) && right.matches(record),
            FilterExpr::Or(left, right) => left.matches(record) || right.matches(record),
            FilterExpr::Not(inner) => !inner.matches(record),
            FilterExpr::Literal(b) => *b,
            FilterExpr::Compare(left, op, right) => compare(record, left, *op, right),
        }
    }
}

/// A resolved operand value. `Missing` covers absent properties and
/// unparseable datetimes; it behaves like NaN in ordered comparisons.
enum Resolved {
    Str(String),
    Num(f64),
    Millis(i64),
    Bool(bool),
    Missing,
}

fn compare<T: FilterTarget>(record: &T, left: &Operand, op: CompareOp, right: &Operand) -> bool {
    // A datetime literal on either side makes the opposite property resolve
    // as a millisecond epoch.
    let left_as_datetime = matches!(right, Operand::Value(LitValue::DateTime(_)));
    let right_as_datetime = matches!(left, Operand::Value(LitValue::DateTime(_)));

    let left = resolve(record, left, left_as_datetime);
    let right = resolve(record, right, right_as_datetime);

    match (left, right) {
        (Resolved::Str(a), Resolved::Str(b)) => cmp_ordering(a.cmp(&b), op),
        (Resolved::Num(a), Resolved::Num(b)) => match a.partial_cmp(&b) {
            Some(ordering) => cmp_ordering(ordering, op),
            None => false,
        },
        (Resolved::Millis(a), Resolved::Millis(b)) => cmp_ordering(a.cmp(&b), op),
        (Resolved::Bool(a), Resolved::Bool(b)) => cmp_ordering(a.cmp(&b), op),
        (Resolved::Missing, Resolved::Missing) => matches!(op, CompareOp::Eq),
        _ => matches!(op, CompareOp::Ne),
    }
}

fn resolve<T: FilterTarget>(record: &T, operand: &Operand, as_datetime: bool) -> Resolved {
    match operand {
        Operand::System(field) => match record.system_field(*field) {
            Some(value) => Resolved::Str(value.to_string()),
            None => Resolved::Missing,
        },
        Operand::Property(name) => match record.property(name) {
            None => Resolved::Missing,
            Some(value) if as_datetime => value
                .as_str()
                .and_then(parse_datetime_millis)
                .map(Resolved::Millis)
                .unwrap_or(Resolved::Missing),
            Some(Value::String(s)) => Resolved::Str(s.clone()),
            Some(Value::Number(n)) => n.as_f64().map(Resolved::Num).unwrap_or(Resolved::Missing),
            Some(Value::Bool(b)) => Resolved::Bool(*b),
            Some(_) => Resolved::Missing,
        },
        Operand::Value(lit) => match lit {
            LitValue::Str(s) | LitValue::Long(s) => Resolved::Str(s.clone()),
            LitValue::Num(n) => Resolved::Num(*n),
            LitValue::DateTime(Some(millis)) => Resolved::Millis(*millis),
            LitValue::DateTime(None) => Resolved::Missing,
            LitValue::Bool(b) => Resolved::Bool(*b),
        },
    }
}

fn cmp_ordering(ordering: Ordering, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
    }
}
