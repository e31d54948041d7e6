#[cfg(test)]
mod test_inference {
    use scorebayes::errors::NetworkError;
    use scorebayes::network::{
        Bbn, BbnNode, Evidence, EvidenceBuilder, EvidenceType, InferenceController, Variable,
    };
    use std::collections::BTreeMap;

    fn node(id: usize, name: &str, values: &[&str], probabilities: &[f64]) -> BbnNode {
        BbnNode::new(Variable::new(id, name, values), probabilities.to_vec())
    }

    /// Gender -> MathScore, Gender -> WritingScore, WritingScore -> ReadingScore
    fn student_network() -> Bbn {
        Bbn::new()
            .add_node(node(0, "Gender", &["female", "male"], &[0.518, 0.482]))
            .unwrap()
            .add_node(node(
                1,
                "MathScore",
                &["MathScore<=80", "MathScore>80"],
                &[0.86, 0.14, 0.77, 0.23],
            ))
            .unwrap()
            .add_node(node(
                2,
                "WritingScore",
                &["WritingScore<=80", "WritingScore>80"],
                &[0.72, 0.28, 0.9, 0.1],
            ))
            .unwrap()
            .add_node(node(
                3,
                "ReadingScore",
                &["ReadingScore<=80", "ReadingScore>80"],
                &[0.93, 0.07, 0.12, 0.88],
            ))
            .unwrap()
            .add_edge(0, 1)
            .unwrap()
            .add_edge(0, 2)
            .unwrap()
            .add_edge(2, 3)
            .unwrap()
    }

    /// a -> b, a -> c, b -> d, c -> d, with a three-valued d
    fn diamond() -> Bbn {
        Bbn::new()
            .add_node(node(0, "a", &["on", "off"], &[0.3, 0.7]))
            .unwrap()
            .add_node(node(1, "b", &["on", "off"], &[0.9, 0.1, 0.2, 0.8]))
            .unwrap()
            .add_node(node(2, "c", &["on", "off"], &[0.4, 0.6, 0.75, 0.25]))
            .unwrap()
            .add_node(node(
                3,
                "d",
                &["low", "mid", "high"],
                &[
                    0.1, 0.2, 0.7, //
                    0.3, 0.3, 0.4, //
                    0.5, 0.4, 0.1, //
                    0.8, 0.15, 0.05,
                ],
            ))
            .unwrap()
            .add_edge(0, 1)
            .unwrap()
            .add_edge(0, 2)
            .unwrap()
            .add_edge(1, 3)
            .unwrap()
            .add_edge(2, 3)
            .unwrap()
    }

    /// Marginals by summing the full joint distribution
    fn enumerate(bbn: &Bbn, evidence: &[Evidence]) -> BTreeMap<usize, Vec<f64>> {
        let ids = bbn.node_ids();
        let cards: Vec<usize> = ids
            .iter()
            .map(|id| bbn.node(*id).unwrap().variable.cardinality())
            .collect();
        let mut sums: BTreeMap<usize, Vec<f64>> = ids
            .iter()
            .zip(&cards)
            .map(|(id, c)| (*id, vec![0.0; *c]))
            .collect();

        let total: usize = cards.iter().product();
        let mut assignment = vec![0usize; ids.len()];
        for mut k in 0..total {
            for (slot, card) in assignment.iter_mut().zip(&cards).rev() {
                *slot = k % card;
                k /= card;
            }
            let value_of: BTreeMap<usize, usize> =
                ids.iter().copied().zip(assignment.iter().copied()).collect();

            let mut p = 1.0;
            for id in &ids {
                let n = bbn.node(*id).unwrap();
                let mut row = 0;
                for parent in bbn.parents(*id).unwrap() {
                    row = row * bbn.node(parent).unwrap().variable.cardinality() + value_of[&parent];
                }
                p *= n.probabilities[row * n.variable.cardinality() + value_of[id]];
            }
            for e in evidence {
                p *= e.likelihoods[value_of[&e.node_id]];
            }
            for id in &ids {
                sums.get_mut(id).unwrap()[value_of[id]] += p;
            }
        }

        for values in sums.values_mut() {
            let mass: f64 = values.iter().sum();
            values.iter_mut().for_each(|v| *v /= mass);
        }
        sums
    }

    fn assert_matches_enumeration(bbn: &Bbn, evidence: Vec<Evidence>) {
        let mut tree = InferenceController::apply(bbn).unwrap();
        if !evidence.is_empty() {
            tree.set_observations(evidence.clone()).unwrap();
        }
        let expected = enumerate(bbn, &evidence);
        for (id, values) in expected {
            let marginal = tree.get_bbn_potential(id).unwrap();
            let actual = marginal.probabilities();
            for (a, e) in actual.iter().zip(&values) {
                assert!(
                    (a - e).abs() < 1e-9,
                    "node {}: {:?} vs {:?}",
                    id,
                    actual,
                    values
                );
            }
        }
    }

    fn observe(bbn: &Bbn, name: &str, value: &str) -> Evidence {
        EvidenceBuilder::new()
            .with_node(bbn.node_by_name(name).unwrap())
            .with_evidence(value, 1.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_student_network_priors_match_enumeration() {
        let bbn = student_network();
        assert_matches_enumeration(&bbn, Vec::new());

        let tree = InferenceController::apply(&bbn).unwrap();
        let gender = tree.get_bbn_potential(0).unwrap();
        assert!((gender.probability("female").unwrap() - 0.518).abs() < 1e-12);
        let writing = tree.get_bbn_potential(2).unwrap();
        let expected = 0.518 * 0.28 + 0.482 * 0.1;
        assert!((writing.probability("WritingScore>80").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_hard_evidence_on_root() {
        let bbn = student_network();
        let mut tree = InferenceController::apply(&bbn).unwrap();
        tree.set_observation(observe(&bbn, "Gender", "female")).unwrap();

        let gender = tree.get_bbn_potential(0).unwrap();
        assert_eq!(gender.probabilities(), vec![1.0, 0.0]);

        let math = tree.get_bbn_potential(1).unwrap();
        assert!((math.probability("MathScore>80").unwrap() - 0.14).abs() < 1e-12);
        let writing = tree.get_bbn_potential(2).unwrap();
        assert!((writing.probability("WritingScore>80").unwrap() - 0.28).abs() < 1e-12);
        let reading = tree.get_bbn_potential(3).unwrap();
        let expected = 0.72 * 0.07 + 0.28 * 0.88;
        assert!((reading.probability("ReadingScore>80").unwrap() - expected).abs() < 1e-12);

        assert_matches_enumeration(&bbn, vec![observe(&bbn, "Gender", "female")]);
    }

    #[test]
    fn test_evidence_on_leaf_flows_upwards() {
        let bbn = student_network();
        assert_matches_enumeration(&bbn, vec![observe(&bbn, "ReadingScore", "ReadingScore>80")]);
        assert_matches_enumeration(
            &bbn,
            vec![
                observe(&bbn, "ReadingScore", "ReadingScore<=80"),
                observe(&bbn, "MathScore", "MathScore>80"),
            ],
        );
    }

    #[test]
    fn test_diamond_matches_enumeration() {
        let bbn = diamond();
        assert_matches_enumeration(&bbn, Vec::new());
        assert_matches_enumeration(&bbn, vec![observe(&bbn, "d", "high")]);
        assert_matches_enumeration(
            &bbn,
            vec![observe(&bbn, "d", "mid"), observe(&bbn, "b", "off")],
        );
    }

    #[test]
    fn test_virtual_evidence_matches_enumeration() {
        let bbn = diamond();
        let soft = EvidenceBuilder::new()
            .with_node(bbn.node_by_name("d").unwrap())
            .with_type(EvidenceType::Virtual)
            .with_evidence("low", 0.2)
            .with_evidence("mid", 0.5)
            .with_evidence("high", 0.9)
            .build()
            .unwrap();
        assert_matches_enumeration(&bbn, vec![soft]);
    }

    #[test]
    fn test_unobserve_restores_priors() {
        let bbn = student_network();
        let mut tree = InferenceController::apply(&bbn).unwrap();
        let prior = tree.get_posteriors().unwrap();

        tree.set_observation(observe(&bbn, "WritingScore", "WritingScore>80"))
            .unwrap();
        assert_ne!(tree.get_posteriors().unwrap(), prior);
        assert_eq!(tree.evidence().len(), 1);

        tree.unobserve(&[2]).unwrap();
        let restored = tree.get_posteriors().unwrap();
        for (name, values) in &prior {
            for (value, p) in values {
                assert!((restored[name][value] - p).abs() < 1e-12);
            }
        }

        tree.set_observation(observe(&bbn, "Gender", "male")).unwrap();
        tree.unobserve_all().unwrap();
        assert!(tree.evidence().is_empty());
    }

    #[test]
    fn test_replacing_evidence_on_same_node() {
        let bbn = student_network();
        let mut tree = InferenceController::apply(&bbn).unwrap();
        tree.set_observation(observe(&bbn, "Gender", "female")).unwrap();
        tree.set_observation(observe(&bbn, "Gender", "male")).unwrap();
        let gender = tree.get_bbn_potential(0).unwrap();
        assert_eq!(gender.probabilities(), vec![0.0, 1.0]);
        let math = tree.get_bbn_potential(1).unwrap();
        assert!((math.probability("MathScore>80").unwrap() - 0.23).abs() < 1e-12);
    }

    #[test]
    fn test_impossible_evidence_keeps_previous_state() {
        let bbn = Bbn::new()
            .add_node(node(0, "x", &["t", "f"], &[1.0, 0.0]))
            .unwrap()
            .add_node(node(1, "y", &["t", "f"], &[0.6, 0.4, 0.5, 0.5]))
            .unwrap()
            .add_edge(0, 1)
            .unwrap();
        let mut tree = InferenceController::apply(&bbn).unwrap();
        tree.set_observation(observe(&bbn, "y", "t")).unwrap();

        let result = tree.set_observation(observe(&bbn, "x", "f"));
        assert!(matches!(result, Err(NetworkError::InconsistentEvidence)));
        assert_eq!(tree.evidence().len(), 1);
        let x = tree.get_bbn_potential(0).unwrap();
        assert_eq!(x.probabilities(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_conditional_query() {
        let bbn = student_network();
        let tree = InferenceController::apply(&bbn).unwrap();
        let rows = tree.conditional("ReadingScore", "Gender").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "female");
        let female = 0.72 * 0.07 + 0.28 * 0.88;
        let male = 0.9 * 0.07 + 0.1 * 0.88;
        assert!((rows[0].1.probability("ReadingScore>80").unwrap() - female).abs() < 1e-12);
        assert!((rows[1].1.probability("ReadingScore>80").unwrap() - male).abs() < 1e-12);
        // the query does not leave evidence behind
        assert!(tree.evidence().is_empty());

        assert!(matches!(
            tree.conditional("Nope", "Gender"),
            Err(NetworkError::UnknownNodeName(_))
        ));
    }

    #[test]
    fn test_marginal_display() {
        let bbn = student_network();
        let tree = InferenceController::apply(&bbn).unwrap();
        let text = tree.get_bbn_potential(0).unwrap().to_string();
        assert_eq!(text, "0=female|0.51800\n0=male|0.48200");
        assert_eq!(
            tree.get_bbn_node(0).unwrap().to_string(),
            "0|Gender|female,male"
        );
    }
}
