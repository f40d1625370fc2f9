//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records, conditions and options
//! that stay within what the store accepts.

use kvquery_codec::{Record, Value};
use kvquery_core::{Condition, FieldCondition, JoinType, OperatorSet, QueryOptions};
use proptest::prelude::*;

/// Field names used by generated records. Kept small so conditions
/// and joins hit real fields often.
pub const FIELD_NAMES: [&str; 4] = ["a", "b", "c", "d"];

/// Strategy for scalar field values.
///
/// Floats are whole or half steps in the integer range, so they often
/// collide with integers under ordering operators. `NaN` is never
/// produced; it is unequal to itself and would break record equality.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-20i64..20).prop_map(Value::Integer),
        (-40i32..40).prop_map(|n| Value::Float(f64::from(n) / 2.0)),
        "[a-e]{0,3}".prop_map(Value::Text),
    ]
}

/// Strategy for valid store keys.
pub fn key_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        "[a-z]{1,8}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for records over [`FIELD_NAMES`], without a key field.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    prop::collection::btree_map(
        prop::sample::select(FIELD_NAMES.to_vec()),
        scalar_value_strategy(),
        0..FIELD_NAMES.len(),
    )
    .prop_map(|fields| fields.into_iter().collect())
}

/// Strategy for operator sets with up to two operators.
pub fn operator_set_strategy() -> impl Strategy<Value = OperatorSet> {
    (
        prop::option::of(scalar_value_strategy()),
        prop::option::of(scalar_value_strategy()),
        prop::option::of(scalar_value_strategy()),
        0usize..3,
    )
        .prop_map(|(first, second, ne, shape)| {
            let mut ops = OperatorSet::new();
            match shape {
                0 => {
                    ops.gte = first;
                    ops.lt = second;
                }
                1 => {
                    ops.gt = first;
                    ops.lte = second;
                }
                _ => ops.eq = first,
            }
            ops.ne = ne;
            ops
        })
}

/// Strategy for conditions over [`FIELD_NAMES`].
pub fn condition_strategy() -> impl Strategy<Value = Condition> {
    prop::collection::vec(
        (
            prop::sample::select(FIELD_NAMES.to_vec()),
            prop_oneof![
                scalar_value_strategy().prop_map(FieldCondition::Equals),
                operator_set_strategy().prop_map(FieldCondition::Ops),
            ],
        ),
        0..3,
    )
    .prop_map(|fields| {
        fields
            .into_iter()
            .fold(Condition::new(), |condition, (field, spec)| match spec {
                FieldCondition::Equals(literal) => condition.equals(field, literal),
                FieldCondition::Ops(ops) => condition.with_ops(field, ops),
            })
    })
}

/// Strategy for read options.
pub fn query_options_strategy() -> impl Strategy<Value = QueryOptions> {
    (
        prop::option::of(0usize..12),
        prop::option::of(0usize..12),
        any::<bool>(),
    )
        .prop_map(|(limit, offset, reverse)| {
            let options = QueryOptions {
                limit,
                offset,
                direction: None,
            };
            if reverse {
                options.reverse()
            } else {
                options
            }
        })
}

/// Strategy for join types.
pub fn join_type_strategy() -> impl Strategy<Value = JoinType> {
    prop_oneof![
        Just(JoinType::Inner),
        Just(JoinType::Left),
        Just(JoinType::Right),
        Just(JoinType::Full),
    ]
}
