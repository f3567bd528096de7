//! Query criterion tree, execution planner, and iteration (spec.md §4.3).

use std::collections::HashSet;
use std::marker::PhantomData;

use regex::Regex;
use shardhold_common::{Error, Result};
use shardhold_kv_engine::Transaction;

use crate::index;
use crate::keys;
use crate::meta::{FieldValue, Storer, TypeMeta, validate_field_name};

/// The pseudo-field name referring to a record's primary key.
pub const KEY_FIELD: &str = "Key";

/// A single comparison against one field's value.
pub enum Op {
    Eq(FieldValue),
    Ne(FieldValue),
    Gt(FieldValue),
    Lt(FieldValue),
    Ge(FieldValue),
    Le(FieldValue),
    In(Vec<FieldValue>),
    Nil,
    HasPrefix(String),
    HasSuffix(String),
    RegExp(Regex),
    Contains(FieldValue),
    ContainsAny(Vec<FieldValue>),
    ContainsAll(Vec<FieldValue>),
    HasKey(String),
    /// Cross-field equality: the named field must equal another field on
    /// the same record.
    Field(String),
}

pub struct FieldCriterion {
    pub field: String,
    pub op: Op,
}

/// One conjunction member: either a field comparison or a predicate
/// callback over the fully decoded record. `MatchFunc` criteria are never
/// selected to drive an index (spec.md §4.3 planner rule 1).
pub enum Criterion<R> {
    Field(FieldCriterion),
    MatchFunc(Box<dyn Fn(&R) -> bool + Send + Sync>),
}

impl<R> Criterion<R> {
    fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field(fc) => Some(fc.field.as_str()),
            Self::MatchFunc(_) => None,
        }
    }
}

/// An ordered list of AND-linked criteria, with optional OR-branches, plus
/// modifiers (index hint, skip, limit, sort-by).
pub struct Query<R> {
    pub(crate) and: Vec<Criterion<R>>,
    pub(crate) or_branches: Vec<Vec<Criterion<R>>>,
    pub(crate) index_hint: Option<String>,
    pub(crate) skip: Option<usize>,
    pub(crate) limit: Option<usize>,
    pub(crate) sort_by: Vec<String>,
    skip_calls: u32,
    limit_calls: u32,
    _marker: PhantomData<R>,
}

impl<R> Default for Query<R> {
    fn default() -> Self {
        Self {
            and: Vec::new(),
            or_branches: Vec::new(),
            index_hint: None,
            skip: None,
            limit: None,
            sort_by: Vec::new(),
            skip_calls: 0,
            limit_calls: 0,
            _marker: PhantomData,
        }
    }
}

impl<R> Query<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, field: &str, op: Op) -> Self {
        self.and.push(Criterion::Field(FieldCriterion {
            field: field.to_string(),
            op,
        }));
        self
    }

    #[must_use]
    pub fn eq(self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Eq(value.into()))
    }

    #[must_use]
    pub fn ne(self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Ne(value.into()))
    }

    #[must_use]
    pub fn gt(self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Gt(value.into()))
    }

    #[must_use]
    pub fn lt(self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Lt(value.into()))
    }

    #[must_use]
    pub fn ge(self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Ge(value.into()))
    }

    #[must_use]
    pub fn le(self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Le(value.into()))
    }

    #[must_use]
    pub fn in_(self, field: &str, values: Vec<FieldValue>) -> Self {
        self.push(field, Op::In(values))
    }

    #[must_use]
    pub fn nil(self, field: &str) -> Self {
        self.push(field, Op::Nil)
    }

    #[must_use]
    pub fn has_prefix(self, field: &str, prefix: impl Into<String>) -> Self {
        self.push(field, Op::HasPrefix(prefix.into()))
    }

    #[must_use]
    pub fn has_suffix(self, field: &str, suffix: impl Into<String>) -> Self {
        self.push(field, Op::HasSuffix(suffix.into()))
    }

    #[must_use]
    pub fn regexp(self, field: &str, pattern: Regex) -> Self {
        self.push(field, Op::RegExp(pattern))
    }

    #[must_use]
    pub fn contains(self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.push(field, Op::Contains(value.into()))
    }

    #[must_use]
    pub fn contains_any(self, field: &str, values: Vec<FieldValue>) -> Self {
        self.push(field, Op::ContainsAny(values))
    }

    #[must_use]
    pub fn contains_all(self, field: &str, values: Vec<FieldValue>) -> Self {
        self.push(field, Op::ContainsAll(values))
    }

    #[must_use]
    pub fn has_key(self, field: &str, key: impl Into<String>) -> Self {
        self.push(field, Op::HasKey(key.into()))
    }

    #[must_use]
    pub fn field_eq(self, field: &str, other_field: impl Into<String>) -> Self {
        self.push(field, Op::Field(other_field.into()))
    }

    #[must_use]
    pub fn match_func(mut self, f: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.and.push(Criterion::MatchFunc(Box::new(f)));
        self
    }

    /// Add a disjunctive branch: an independent AND-conjunction whose
    /// matches are unioned (de-duplicated by primary key) with the rest of
    /// the query.
    #[must_use]
    pub fn or(mut self, branch: Query<R>) -> Self {
        self.or_branches.push(branch.and);
        self
    }

    #[must_use]
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_hint = Some(name.into());
        self
    }

    /// Repeated calls are recorded but not faulted here — a second `Skip`
    /// is a build-time fault caught by [`Self::validate`] (spec.md §4.3),
    /// not at the call site, so the builder chain stays infallible.
    #[must_use]
    pub fn skip(mut self, n: usize) -> Self {
        self.skip_calls += 1;
        self.skip = Some(n);
        self
    }

    /// See [`Self::skip`]: a second `Limit` call faults in
    /// [`Self::validate`].
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit_calls += 1;
        self.limit = Some(n);
        self
    }

    #[must_use]
    pub fn sort_by(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sort_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Validate field names and modifier placement (spec.md §4.1, §4.3).
    /// Called once at query-build time by the store before execution.
    pub fn validate(&self) -> Result<()> {
        if self.skip.is_some() && !self.or_branches.is_empty() {
            return Err(Error::DuplicateModifier);
        }
        if self.skip_calls > 1 || self.limit_calls > 1 {
            return Err(Error::DuplicateModifier);
        }
        for branch in std::iter::once(&self.and).chain(self.or_branches.iter()) {
            for criterion in branch {
                if let Some(field) = criterion.field_name()
                    && field != KEY_FIELD
                {
                    validate_field_name(field)?;
                }
            }
        }
        for field in &self.sort_by {
            if field != KEY_FIELD {
                validate_field_name(field)?;
            }
        }
        Ok(())
    }
}

fn op_matches(op: &Op, value: Option<&FieldValue>, record_field: impl Fn(&str) -> Option<FieldValue>) -> bool {
    let none = FieldValue::None;
    let value = value.unwrap_or(&none);
    match op {
        Op::Eq(v) => value == v,
        Op::Ne(v) => value != v,
        Op::Gt(v) => value > v,
        Op::Lt(v) => value < v,
        Op::Ge(v) => value >= v,
        Op::Le(v) => value <= v,
        Op::In(values) => values.contains(value),
        Op::Nil => matches!(value, FieldValue::None),
        Op::HasPrefix(prefix) => value.as_str().is_some_and(|s| s.starts_with(prefix.as_str())),
        Op::HasSuffix(suffix) => value.as_str().is_some_and(|s| s.ends_with(suffix.as_str())),
        Op::RegExp(re) => value.as_str().is_some_and(|s| re.is_match(s)),
        Op::Contains(needle) => value.contains(needle),
        Op::ContainsAny(needles) => needles.iter().any(|n| value.contains(n)),
        Op::ContainsAll(needles) => needles.iter().all(|n| value.contains(n)),
        Op::HasKey(key) => value.has_key(key),
        Op::Field(other) => record_field(other).as_ref() == Some(value),
    }
}

/// Evaluate every criterion in `branch` against a decoded record and its
/// primary key.
fn branch_matches<R: Storer>(branch: &[Criterion<R>], pk: &[u8], record: &R) -> bool {
    branch.iter().all(|criterion| match criterion {
        Criterion::MatchFunc(f) => f(record),
        Criterion::Field(fc) => {
            let field_value = field_of(record, pk, &fc.field);
            op_matches(&fc.op, field_value.as_ref(), |other| {
                field_of(record, pk, other)
            })
        }
    })
}

fn field_of<R: Storer>(record: &R, pk: &[u8], field: &str) -> Option<FieldValue> {
    if field == KEY_FIELD {
        Some(FieldValue::Bytes(pk.to_vec()))
    } else {
        record.field_value(field)
    }
}

/// The criterion selected to drive an index scan, if any.
struct Driver<'a> {
    index_name: &'a str,
    values: Vec<FieldValue>,
}

/// Pick the driving criterion of a conjunction: an index hint, or the first
/// field with a declared index whose op is `Eq`/`In`. Predicate criteria
/// are never eligible (spec.md §4.3 planner rule 1).
fn choose_driver<'a, R>(meta: &'a TypeMeta, branch: &'a [Criterion<R>], index_hint: Option<&'a str>) -> Option<Driver<'a>> {
    if let Some(hint) = index_hint {
        let idx = meta.index(hint)?;
        for criterion in branch {
            if let Criterion::Field(fc) = criterion
                && fc.field == idx.field
            {
                match &fc.op {
                    Op::Eq(v) => return Some(Driver { index_name: idx.name, values: vec![v.clone()] }),
                    Op::In(values) => return Some(Driver { index_name: idx.name, values: values.clone() }),
                    _ => {}
                }
            }
        }
        return None;
    }
    for criterion in branch {
        let Criterion::Field(fc) = criterion else {
            continue;
        };
        let Some(idx) = meta.indexes.iter().find(|i| i.field == fc.field) else {
            continue;
        };
        match &fc.op {
            Op::Eq(v) => return Some(Driver { index_name: idx.name, values: vec![v.clone()] }),
            Op::In(values) => return Some(Driver { index_name: idx.name, values: values.clone() }),
            _ => {}
        }
    }
    None
}

/// Execute one AND-conjunction (not an OR-union) against the engine,
/// returning matching `(primary_key, decoded_record)` pairs in discovery
/// order.
pub fn execute_branch<R: Storer>(
    txn: &dyn Transaction,
    meta: &TypeMeta,
    index_hint: Option<&str>,
    branch: &[Criterion<R>],
    mut decode: impl FnMut(&[u8]) -> Result<R>,
) -> Result<Vec<(Vec<u8>, R)>> {
    let mut candidates: Vec<Vec<u8>> = Vec::new();

    if let Some(driver) = choose_driver(meta, branch, index_hint) {
        for value in &driver.values {
            let list = index::lookup(txn, meta.name, driver.index_name, value)?;
            candidates.extend(list.as_slice().iter().cloned());
        }
        candidates.sort();
        candidates.dedup();
    } else {
        let prefix = keys::primary_prefix(meta.name);
        for (key, _) in txn.iter_prefix(&prefix).map_err(Error::from)? {
            candidates.push(keys::strip_primary_prefix(meta.name, &key).to_vec());
        }
    }

    let mut out = Vec::new();
    for pk in candidates {
        let full_key = keys::primary_key(meta.name, &pk);
        let Some(bytes) = txn.get(&full_key).map_err(Error::from)? else {
            continue;
        };
        let record = decode(&bytes)?;
        if branch_matches(branch, &pk, &record) {
            out.push((pk, record));
        }
    }
    Ok(out)
}

/// Execute the full query (AND-conjunction plus any OR-branches),
/// de-duplicating by primary key across branches, then apply `Skip`/`Limit`
/// (never inside an OR-branch, enforced by [`Query::validate`]).
pub fn execute<R: Storer>(
    txn: &dyn Transaction,
    meta: &TypeMeta,
    query: &Query<R>,
    mut decode: impl FnMut(&[u8]) -> Result<R>,
) -> Result<Vec<(Vec<u8>, R)>> {
    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    let mut out = Vec::new();

    for (pk, record) in execute_branch(
        txn,
        meta,
        query.index_hint.as_deref(),
        &query.and,
        &mut decode,
    )? {
        if seen.insert(pk.clone()) {
            out.push((pk, record));
        }
    }
    for branch in &query.or_branches {
        for (pk, record) in execute_branch(txn, meta, None, branch, &mut decode)? {
            if seen.insert(pk.clone()) {
                out.push((pk, record));
            }
        }
    }

    if !query.sort_by.is_empty() {
        sort_records(&mut out, &query.sort_by);
    }

    if let Some(skip) = query.skip {
        out = out.into_iter().skip(skip).collect();
    }
    if let Some(limit) = query.limit {
        out.truncate(limit);
    }
    Ok(out)
}

fn sort_records<R: Storer>(records: &mut [(Vec<u8>, R)], sort_by: &[String]) {
    records.sort_by(|(pk_a, a), (pk_b, b)| {
        for field in sort_by {
            let va = field_of(a, pk_a, field).unwrap_or(FieldValue::None);
            let vb = field_of(b, pk_b, field).unwrap_or(FieldValue::None);
            match va.partial_cmp(&vb) {
                Some(std::cmp::Ordering::Equal) | None => continue,
                Some(ordering) => return ordering,
            }
        }
        std::cmp::Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::IndexDescriptor;

    #[derive(Clone)]
    struct Widget {
        id: u64,
        category: String,
    }

    impl Storer for Widget {
        fn type_name() -> &'static str {
            "Widget"
        }
        fn meta() -> &'static TypeMeta {
            unimplemented!("not needed for these unit tests")
        }
        fn field_value(&self, field: &str) -> Option<FieldValue> {
            match field {
                "Category" => Some(FieldValue::Str(self.category.clone())),
                _ => None,
            }
        }
        fn key_value(&self) -> Option<FieldValue> {
            Some(FieldValue::U64(self.id))
        }
        fn set_key_value(&mut self, value: FieldValue) {
            self.id = value.try_into().unwrap();
        }
    }

    fn meta_with_category_index(unique: bool) -> TypeMeta {
        TypeMeta {
            name: "Widget",
            key_field: Some("Id"),
            indexes: vec![IndexDescriptor {
                name: "Category",
                field: "Category",
                unique,
            }],
        }
    }

    #[test]
    fn chooses_eq_index_as_driver() {
        let meta = meta_with_category_index(false);
        let query: Query<Widget> = Query::new().eq("Category", "vehicle".to_string());
        let driver = choose_driver(&meta, &query.and, None);
        assert!(driver.is_some());
        assert_eq!(driver.unwrap().index_name, "Category");
    }

    #[test]
    fn match_func_is_never_a_driver() {
        let meta = meta_with_category_index(false);
        let query: Query<Widget> = Query::new().match_func(|w: &Widget| w.id > 0);
        assert!(choose_driver(&meta, &query.and, None).is_none());
    }

    #[test]
    fn validate_rejects_skip_inside_or() {
        let query: Query<Widget> = Query::new()
            .skip(1)
            .or(Query::new().eq("Category", "x".to_string()));
        assert!(query.validate().is_err());
    }

    #[test]
    fn validate_rejects_repeated_skip() {
        let query: Query<Widget> = Query::new().skip(1).skip(2);
        assert!(matches!(query.validate(), Err(Error::DuplicateModifier)));
    }

    #[test]
    fn validate_rejects_repeated_limit() {
        let query: Query<Widget> = Query::new().limit(5).limit(10);
        assert!(matches!(query.validate(), Err(Error::DuplicateModifier)));
    }

    #[test]
    fn validate_rejects_lowercase_field() {
        let query: Query<Widget> = Query::new().eq("category", "x".to_string());
        assert!(query.validate().is_err());
    }
}
