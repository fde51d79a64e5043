use rulinear::{MatrixKind, Node, Parameter, Problem, Row, SolverType, SparseMatrix, Trainer};

fn grid(kind: MatrixKind) -> Problem<'static> {
    let mut rows = Vec::new();
    let mut y = Vec::new();
    for i in 0..30 {
        let a = (i % 6) as f64 - 2.5;
        let b = (i / 6) as f64 - 2.0;
        let mut row = Vec::new();
        if a != 0.0 {
            row.push(Node::new(0, a));
        }
        if b != 0.0 {
            row.push(Node::new(2, b));
        }
        rows.push(row);
        y.push(if a + 0.5 * b > 0.0 { 1.0 } else { 2.0 });
    }
    Problem::from_rows(y, &rows, 3, 1.0, kind).unwrap()
}

#[test]
fn four_points_end_to_end() {
    let rows = vec![
        vec![Node::new(0, 1.0), Node::new(1, 1.0)],
        vec![Node::new(0, 2.0), Node::new(1, 2.0)],
        vec![Node::new(0, -1.0), Node::new(1, -1.0)],
        vec![Node::new(0, -2.0), Node::new(1, -2.0)],
    ];
    let prob = Problem::from_rows(
        vec![1.0, 1.0, -1.0, -1.0],
        &rows,
        2,
        -1.0,
        MatrixKind::default(),
    )
    .unwrap();
    let param = Parameter::new(SolverType::L2rL2LossSvcDual)
        .with_c(1.0)
        .with_eps(0.1);
    let model = Trainer::new().train(&prob, &param).unwrap();

    let pos = [Node::new(0, 0.5), Node::new(1, 0.5)];
    let neg = [Node::new(0, -0.5), Node::new(1, -0.5)];
    assert_eq!(model.predict(Row::from(&pos[..])), 1.0);
    assert_eq!(model.predict(Row::from(&neg[..])), -1.0);
}

#[test]
fn backends_train_the_same_model() {
    let param = Parameter::new(SolverType::L2rLr).with_c(2.0);
    let reference = Trainer::new()
        .train(&grid(MatrixKind::Compressed), &param)
        .unwrap();
    for kind in [MatrixKind::Nodes, MatrixKind::Rows, MatrixKind::Keyed] {
        let model = Trainer::new().train(&grid(kind), &param).unwrap();
        assert_eq!(model, reference, "{kind:?}");
    }
}

#[test]
fn cross_validation_is_reproducible() {
    let prob = grid(MatrixKind::Rows);
    let param = Parameter::new(SolverType::L2rL1LossSvcDual);
    let a = Trainer::with_seed(3).cross_validation(&prob, &param, 5).unwrap();
    let b = Trainer::with_seed(3).cross_validation(&prob, &param, 5).unwrap();
    assert_eq!(a.target, b.target);
    assert_eq!(a.y, prob.y());
}

#[test]
fn parameter_search_reports_every_trial() {
    let prob = grid(MatrixKind::Compressed);
    let param = Parameter::new(SolverType::L2rLr);
    let result = Trainer::new()
        .find_parameter_c(&prob, &param, 3, Some(0.5), 8.0)
        .unwrap();
    assert_eq!(result.trials[0].0, 0.5);
    assert!(result.best_rate > 0.5);
    assert!(result.trials.iter().any(|&(c, _)| c == result.best_c));
}

#[test]
fn transposing_twice_restores_the_features() {
    let prob = grid(MatrixKind::Keyed);
    let back = prob.transpose().transpose();
    assert_eq!(back.row_count(), prob.l());
    assert_eq!(back.col_count(), prob.n());
    for i in 0..prob.l() {
        let expected: Vec<(usize, f64)> = prob.x().row(i).iter().collect();
        let found: Vec<(usize, f64)> = back.row(i).iter().collect();
        assert_eq!(found, expected);
    }
}
