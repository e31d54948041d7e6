#[cfg(test)]
mod test_estimator {
    use scorebayes::data::{ObservationTable, Value};
    use scorebayes::errors::{EstimateError, TableError};
    use scorebayes::estimate::{estimate, probability, CptRequest, MissingParentPolicy};

    fn table(columns: &[&str], rows: &[&[&str]]) -> ObservationTable {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|v| Value::from(*v)).collect())
            .collect();
        ObservationTable::from_rows(columns, rows).unwrap()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_no_parent_is_relative_frequency() {
        let t = table(&["c"], &[&["A"], &["A"], &["B"], &["B"]]);
        assert_close(&probability(&t, "c", None).unwrap(), &[0.5, 0.5]);

        let t = table(&["c"], &[&["B"], &["A"], &["C"], &["A"]]);
        let p = probability(&t, "c", None).unwrap();
        assert_close(&p, &[0.5, 0.25, 0.25]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_parent_blocks() {
        let t = table(&["p", "c"], &[&["x", "A"], &["x", "B"], &["y", "A"]]);
        let p = probability(&t, "c", Some("p")).unwrap();
        assert_close(&p, &[0.5, 0.5, 1.0, 0.0]);
        for block in p.chunks(2) {
            assert!((block.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_category_order_is_deterministic() {
        let t = table(
            &["gender", "score"],
            &[
                &["male", "MathScore>80"],
                &["female", "MathScore<=80"],
                &["male", "MathScore<=80"],
                &["female", "MathScore<=80"],
                &["female", "MathScore>80"],
            ],
        );
        let first = estimate(&t, &CptRequest::new("score").with_parent("gender")).unwrap();
        for _ in 0..5 {
            let again = estimate(&t, &CptRequest::new("score").with_parent("gender")).unwrap();
            assert_eq!(first, again);
        }
        assert_eq!(first.parent_states, vec![vec!["female".to_string(), "male".to_string()]]);
        assert_eq!(
            first.child_states,
            vec!["MathScore<=80".to_string(), "MathScore>80".to_string()]
        );
        assert!((first.get(&["female"], "MathScore>80").unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert!((first.get(&["male"], "MathScore>80").unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_two_parents_use_joint_key() {
        let t = table(
            &["a", "b", "c"],
            &[
                &["0", "0", "n"],
                &["0", "1", "y"],
                &["1", "0", "y"],
                &["1", "1", "y"],
                &["1", "1", "n"],
            ],
        );
        let cpt = estimate(&t, &CptRequest::new("c").with_parent("a").with_parent("b")).unwrap();
        assert_eq!(cpt.row_count(), 4);
        assert_eq!(
            cpt.row_labels(),
            vec![vec!["0", "0"], vec!["0", "1"], vec!["1", "0"], vec!["1", "1"]]
        );
        assert_close(
            &cpt.probabilities,
            &[1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.5, 0.5],
        );
        assert!(cpt.rows().all(|r| (r.iter().sum::<f64>() - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_unobserved_parent_combination() {
        let t = table(&["p", "c"], &[&["x", "A"], &["x", "B"]]);
        let declared = vec!["x".to_string(), "y".to_string()];

        let request = CptRequest::new("c").with_declared_parent("p", declared.clone());
        assert!(matches!(
            estimate(&t, &request),
            Err(EstimateError::UnobservedParentCategory { .. })
        ));

        let request = CptRequest::new("c")
            .with_declared_parent("p", declared)
            .with_policy(MissingParentPolicy::Uniform);
        let cpt = estimate(&t, &request).unwrap();
        assert_close(&cpt.probabilities, &[0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_declared_states_must_cover_observations() {
        let t = table(&["c"], &[&["A"], &["B"]]);
        let request = CptRequest::new("c").with_child_states(vec!["A".to_string()]);
        assert!(matches!(
            estimate(&t, &request),
            Err(EstimateError::UnknownCategory { .. })
        ));

        let request =
            CptRequest::new("c").with_child_states(vec!["B".to_string(), "A".to_string(), "C".to_string()]);
        let cpt = estimate(&t, &request).unwrap();
        assert_close(&cpt.probabilities, &[0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_invalid_invocations() {
        let t = table(&["p", "c"], &[&["x", "A"]]);
        assert!(matches!(
            probability(&t, "", None),
            Err(EstimateError::InvalidArgument(_))
        ));
        assert!(matches!(
            probability(&t, "c", Some("c")),
            Err(EstimateError::InvalidArgument(_))
        ));
        assert!(matches!(
            estimate(&t, &CptRequest::new("c").with_parent("p").with_parent("p")),
            Err(EstimateError::InvalidArgument(_))
        ));
        assert!(matches!(
            probability(&t, "missing", None),
            Err(EstimateError::Table(TableError::MissingColumn(_)))
        ));

        let empty = ObservationTable::new(&["c"]).unwrap();
        assert!(matches!(
            probability(&empty, "c", None),
            Err(EstimateError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_missing_cell_is_rejected() {
        let t = ObservationTable::from_rows(
            &["p", "c"],
            vec![
                vec![Value::from("x"), Value::from("A")],
                vec![Value::Missing, Value::from("B")],
            ],
        )
        .unwrap();
        assert!(matches!(
            probability(&t, "c", Some("p")),
            Err(EstimateError::MissingValue { .. })
        ));
    }
}
