//! Property tests for evaluation invariants

use duke_frame::prelude::*;
use duke_frame::{evaluate, sanitize};
use proptest::prelude::*;

fn cell() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(Value::string("")),
        Just(Value::string("  ")),
        (-1_000i64..1_000).prop_map(Value::Int),
        (-1e6f64..1e6).prop_map(Value::Float),
        (-1_000i64..1_000).prop_map(|n| Value::string(n.to_string())),
    ]
}

fn numeric_cell() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        (-1_000i64..1_000).prop_map(Value::Int),
        (-1e6f64..1e6).prop_map(Value::Float),
    ]
}

fn table_of(columns: Vec<(&str, Vec<Value>)>) -> Table {
    Table::from_columns(
        columns
            .into_iter()
            .map(|(name, values)| Column::new(name, values))
            .collect(),
    )
    .unwrap()
}

fn column_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,5}( [A-Za-z0-9_$%]{1,5})?"
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(values in prop::collection::vec(numeric_cell(), 0..40)) {
        let table = table_of(vec![("Net Sales", values)]);
        let expression = "ROUND(ZSCORE(Net Sales) * 10, 2) + CUMSUM(Net Sales) - AVG(Net Sales)";
        let first = evaluate(expression, &table).unwrap();
        let second = evaluate(expression, &table).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn isnull_matches_blank(values in prop::collection::vec(cell(), 0..40)) {
        let table = table_of(vec![("Price", values.clone())]);
        let result = evaluate("ISNULL(Price)", &table).unwrap();
        for (value, flag) in values.iter().zip(result.values()) {
            prop_assert_eq!(flag, &Value::Boolean(value.is_blank()));
        }
    }

    #[test]
    fn result_has_one_value_per_row(
        values in prop::collection::vec(numeric_cell(), 0..40),
        constant in -100i64..100,
    ) {
        let len = values.len();
        let table = table_of(vec![("A", values)]);
        for expression in [
            format!("{}", constant),
            format!("A * {}", constant),
            "SUM(A)".to_string(),
            "DIV(A, A)".to_string(),
            "LAG(A, 2)".to_string(),
        ] {
            let result = evaluate(&expression, &table).unwrap();
            prop_assert_eq!(result.len(), len);
        }
    }

    #[test]
    fn results_are_never_infinite(
        a in prop::collection::vec(numeric_cell(), 1..20),
        b in prop::collection::vec(numeric_cell(), 1..20),
    ) {
        let len = a.len().min(b.len());
        let table = table_of(vec![("A", a[..len].to_vec()), ("B", b[..len].to_vec())]);
        for expression in ["A / B", "DIV(A, B)", "A ** 3", "A % B", "ZSCORE(A)"] {
            let result = evaluate(expression, &table).unwrap();
            for value in result.values() {
                if let Value::Float(n) = value {
                    prop_assert!(n.is_finite(), "{} gave {}", expression, n);
                }
            }
        }
    }

    #[test]
    fn div_never_fails(
        a in prop::collection::vec(-50i64..50, 1..20),
        zeros in prop::collection::vec(any::<bool>(), 1..20),
    ) {
        let len = a.len().min(zeros.len());
        let divisors: Vec<Value> = zeros[..len]
            .iter()
            .map(|&zero| Value::Int(if zero { 0 } else { 3 }))
            .collect();
        let table = table_of(vec![
            ("A", a[..len].iter().map(|&n| Value::Int(n)).collect()),
            ("B", divisors),
        ]);
        let result = evaluate("DIV(A, B)", &table).unwrap();
        for ((value, &numerator), &zero) in result.values().iter().zip(&a).zip(&zeros) {
            if zero {
                prop_assert_eq!(value, &Value::Int(numerator));
            } else {
                prop_assert_eq!(value, &Value::Float(numerator as f64 / 3.0));
            }
        }
    }

    #[test]
    fn sanitizer_mapping_is_stable(names in prop::collection::btree_set(column_name(), 1..6)) {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let expression = names.join(" + ");
        let (sanitized, mapping) = sanitize(&expression, names.iter().copied()).unwrap();

        // Applying the mapping to its own output changes nothing
        prop_assert_eq!(mapping.apply(&sanitized).unwrap(), sanitized.clone());

        // Distinct columns never share a safe identifier
        let mut safe: Vec<&str> = mapping.safe_identifiers().collect();
        safe.sort_unstable();
        safe.dedup();
        prop_assert_eq!(safe.len(), mapping.len());
    }

    #[test]
    fn constant_column_zscore_is_zero(value in -1e9f64..1e9, len in 1usize..30) {
        let table = table_of(vec![("X", vec![Value::Float(value); len])]);
        let result = evaluate("ZSCORE(X)", &table).unwrap();
        prop_assert!(result.values().iter().all(|v| *v == Value::Float(0.0)));
    }
}
