//! `FindAggregate` grouping (spec.md §4.3, final paragraph).

use crate::meta::{FieldValue, Storer};
use crate::query::KEY_FIELD;

/// One group produced by [`group_by`]: the tuple of group-by field values
/// shared by every record in the group (empty tuple if no group-by fields
/// were requested), plus the group's decoded records.
pub struct Group<R> {
    pub keys: Vec<FieldValue>,
    records: Vec<(Vec<u8>, R)>,
}

impl<R: Storer> Group<R> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// The decoded records in this group, in discovery order.
    #[must_use]
    pub fn reduction(&self) -> Vec<&R> {
        self.records.iter().map(|(_, r)| r).collect()
    }

    fn field_numbers(&self, field: &str) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|(pk, r)| {
                let value = if field == KEY_FIELD {
                    Some(FieldValue::Bytes(pk.clone()))
                } else {
                    r.field_value(field)
                };
                value.and_then(|v| match v {
                    FieldValue::I64(n) => Some(n as f64),
                    FieldValue::U64(n) => Some(n as f64),
                    FieldValue::F64(f) => Some(f),
                    _ => None,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn sum(&self, field: &str) -> f64 {
        self.field_numbers(field).iter().sum()
    }

    #[must_use]
    pub fn avg(&self, field: &str) -> f64 {
        let values = self.field_numbers(field);
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }

    /// Min/Max imply sorting the group by `field` first (spec.md §4.3:
    /// "Min/Max imply `Sort` by that field, which panics on lowercase or
    /// nonexistent fields"). Field-name validation has already happened at
    /// query-build time for regular criteria; here we surface the same
    /// fault for an aggregate field instead of panicking.
    pub fn min(&mut self, field: &str) -> shardhold_common::Result<Option<&R>> {
        crate::meta::validate_field_name(field)?;
        self.sort(field);
        Ok(self.records.first().map(|(_, r)| r))
    }

    pub fn max(&mut self, field: &str) -> shardhold_common::Result<Option<&R>> {
        crate::meta::validate_field_name(field)?;
        self.sort(field);
        Ok(self.records.last().map(|(_, r)| r))
    }

    pub fn sort(&mut self, field: &str) {
        self.records.sort_by(|(pk_a, a), (pk_b, b)| {
            let va = field_of(a, pk_a, field).unwrap_or(FieldValue::None);
            let vb = field_of(b, pk_b, field).unwrap_or(FieldValue::None);
            va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

fn field_of<R: Storer>(record: &R, pk: &[u8], field: &str) -> Option<FieldValue> {
    if field == KEY_FIELD {
        Some(FieldValue::Bytes(pk.to_vec()))
    } else {
        record.field_value(field)
    }
}

/// Group `records` (as produced by [`crate::query::execute`]) by the tuple
/// of their `group_by_fields` values, preserving first-seen group order.
pub fn group_by<R: Storer>(records: Vec<(Vec<u8>, R)>, group_by_fields: &[String]) -> Vec<Group<R>> {
    let mut groups: Vec<(Vec<FieldValue>, Vec<(Vec<u8>, R)>)> = Vec::new();

    for (pk, record) in records {
        let key: Vec<FieldValue> = group_by_fields
            .iter()
            .map(|field| field_of(&record, &pk, field).unwrap_or(FieldValue::None))
            .collect();

        if let Some(existing) = groups.iter_mut().find(|(k, _)| *k == key) {
            existing.1.push((pk, record));
        } else {
            groups.push((key, vec![(pk, record)]));
        }
    }

    groups
        .into_iter()
        .map(|(keys, records)| Group { keys, records })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::TypeMeta;

    struct Sale {
        region: String,
        amount: u64,
    }

    impl Storer for Sale {
        fn type_name() -> &'static str {
            "Sale"
        }
        fn meta() -> &'static TypeMeta {
            unimplemented!()
        }
        fn field_value(&self, field: &str) -> Option<FieldValue> {
            match field {
                "Region" => Some(FieldValue::Str(self.region.clone())),
                "Amount" => Some(FieldValue::U64(self.amount)),
                _ => None,
            }
        }
        fn key_value(&self) -> Option<FieldValue> {
            None
        }
        fn set_key_value(&mut self, _value: FieldValue) {}
    }

    fn sample() -> Vec<(Vec<u8>, Sale)> {
        vec![
            (
                b"1".to_vec(),
                Sale {
                    region: "east".to_string(),
                    amount: 10,
                },
            ),
            (
                b"2".to_vec(),
                Sale {
                    region: "west".to_string(),
                    amount: 20,
                },
            ),
            (
                b"3".to_vec(),
                Sale {
                    region: "east".to_string(),
                    amount: 5,
                },
            ),
        ]
    }

    #[test]
    fn groups_by_field_preserving_first_seen_order() {
        let groups = group_by(sample(), &["Region".to_string()]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].keys, vec![FieldValue::Str("east".to_string())]);
        assert_eq!(groups[0].count(), 2);
        assert_eq!(groups[1].count(), 1);
    }

    #[test]
    fn sum_and_avg_over_group() {
        let groups = group_by(sample(), &["Region".to_string()]);
        let east = &groups[0];
        assert_eq!(east.sum("Amount"), 15.0);
        assert_eq!(east.avg("Amount"), 7.5);
    }

    #[test]
    fn empty_group_by_fields_yields_one_group() {
        let groups = group_by(sample(), &[]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count(), 3);
    }
}
