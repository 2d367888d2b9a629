use market_alerts::{
    models::{Condition, ConditionField, ConditionGroup, MarketSnapshot, Operator, Reference},
    services::evaluator::{evaluate, evaluate_condition},
};

fn snapshot() -> MarketSnapshot {
    MarketSnapshot {
        code: "AAPL".into(),
        close_price: 100.0,
        open_price: 98.0,
        high_price: 101.0,
        low_price: 97.5,
        pre_close_price: 97.0,
        change_percent: 3.1,
        volume: 1_000_000.0,
        volume_ratio: 1.2,
        ma5: 99.0,
        ma10: 98.0,
        ma20: 96.0,
        historical_high: 110.0,
        historical_low: 80.0,
        fetched_at: 0,
    }
}

fn cond(field: ConditionField, operator: Operator, value: f64) -> Condition {
    Condition::new(field, operator, value)
}

#[test]
fn price_change_above_threshold_fires_with_readable_message() {
    let snap = MarketSnapshot {
        change_percent: 6.2,
        ..snapshot()
    };
    let group = ConditionGroup::all(vec![cond(ConditionField::PriceChangePercent, Operator::Gt, 5.0)]);

    let v = evaluate(&group, &snap, 0.0);
    assert!(v.fired);
    assert!(v.message.contains("price_change_percent 6.20 > 5.00"), "{}", v.message);
}

#[test]
fn breakout_with_tolerance_fires_on_historical_high() {
    let snap = MarketSnapshot {
        high_price: 101.0,
        historical_high: 100.0,
        ..snapshot()
    };
    let group = ConditionGroup::all(vec![
        cond(ConditionField::HighPrice, Operator::Gt, 0.0).with_reference(Reference::HistoricalHigh),
    ]);

    assert!(evaluate(&group, &snap, 0.001).fired);

    // marginal approach inside the band still counts
    let near = MarketSnapshot {
        high_price: 99.95,
        ..snap.clone()
    };
    assert!(evaluate(&group, &near, 0.001).fired);

    let short = MarketSnapshot {
        high_price: 99.8,
        ..snap
    };
    let v = evaluate(&group, &short, 0.001);
    assert!(!v.fired);
    assert!(v.message.contains("historical_high"));
}

#[test]
fn breakdown_below_historical_low() {
    let group = ConditionGroup::all(vec![
        cond(ConditionField::LowPrice, Operator::Lt, 0.0).with_reference(Reference::HistoricalLow),
    ]);

    let inside = MarketSnapshot {
        low_price: 80.05,
        historical_low: 80.0,
        ..snapshot()
    };
    assert!(evaluate(&group, &inside, 0.001).fired);

    let above = MarketSnapshot {
        low_price: 81.0,
        historical_low: 80.0,
        ..snapshot()
    };
    assert!(!evaluate(&group, &above, 0.001).fired);
}

#[test]
fn golden_cross_is_a_proximity_check() {
    let group = ConditionGroup::all(vec![
        cond(ConditionField::Ma5, Operator::Gte, 0.0).with_reference(Reference::Ma20),
    ]);

    let close_below = MarketSnapshot {
        ma5: 9.95,
        ma20: 10.0,
        ..snapshot()
    };
    assert!(evaluate(&group, &close_below, 0.01).fired);

    let far_below = MarketSnapshot {
        ma5: 9.8,
        ma20: 10.0,
        ..snapshot()
    };
    assert!(!evaluate(&group, &far_below, 0.01).fired);
}

#[test]
fn missing_history_never_fires_reference_rules() {
    let snap = MarketSnapshot {
        historical_high: 0.0,
        ma20: 0.0,
        ..snapshot()
    };

    let breakout = cond(ConditionField::HighPrice, Operator::Gt, 0.0).with_reference(Reference::HistoricalHigh);
    let v = evaluate_condition(&breakout, &snap, 0.001);
    assert!(!v.fired);
    assert_eq!(v.message, "historical_high unavailable");

    let cross = cond(ConditionField::Ma5, Operator::Gte, 0.0).with_reference(Reference::Ma20);
    assert!(!evaluate_condition(&cross, &snap, 0.001).fired);
}

#[test]
fn unmatched_reference_falls_back_to_literal_comparison() {
    let c = cond(ConditionField::ClosePrice, Operator::Gt, 50.0).with_reference(Reference::HistoricalHigh);
    let v = evaluate_condition(&c, &snapshot(), 0.0);

    assert!(v.fired);
    assert_eq!(v.message, "close_price 100.00 > 50.00");
}

#[test]
fn and_group_with_one_failing_condition_does_not_fire() {
    let snap = MarketSnapshot {
        volume_ratio: 3.0,
        change_percent: -1.0,
        ..snapshot()
    };
    let conditions = vec![
        cond(ConditionField::VolumeRatio, Operator::Gt, 2.0),
        cond(ConditionField::PriceChangePercent, Operator::Gt, 0.0),
    ];

    let and = evaluate(&ConditionGroup::all(conditions.clone()), &snap, 0.0);
    assert!(!and.fired);
    assert_eq!(and.message, "price_change_percent -1.00 > 0.00");

    let or = evaluate(&ConditionGroup::any(conditions), &snap, 0.0);
    assert!(or.fired);
    assert_eq!(or.message, "volume_ratio 3.00 > 2.00");
}

#[test]
fn and_group_reports_first_condition_message() {
    let group = ConditionGroup::all(vec![
        cond(ConditionField::ClosePrice, Operator::Gte, 90.0),
        cond(ConditionField::Volume, Operator::Gt, 10.0),
    ]);

    let v = evaluate(&group, &snapshot(), 0.0);
    assert!(v.fired);
    assert_eq!(v.message, "close_price 100.00 >= 90.00");
}

#[test]
fn and_firing_implies_or_firing() {
    let a = cond(ConditionField::PriceChangePercent, Operator::Gt, 0.0);
    let b = cond(ConditionField::VolumeRatio, Operator::Gte, 2.0);

    for change in [-3.0, 0.0, 2.5] {
        for ratio in [0.5, 2.0, 4.0] {
            let snap = MarketSnapshot {
                change_percent: change,
                volume_ratio: ratio,
                ..snapshot()
            };
            let and = evaluate(&ConditionGroup::all(vec![a.clone(), b.clone()]), &snap, 0.0);
            let or = evaluate(&ConditionGroup::any(vec![a.clone(), b.clone()]), &snap, 0.0);

            let a_fires = evaluate_condition(&a, &snap, 0.0).fired;
            let b_fires = evaluate_condition(&b, &snap, 0.0).fired;

            assert_eq!(and.fired, a_fires && b_fires);
            assert_eq!(or.fired, a_fires || b_fires);
            if and.fired {
                assert!(or.fired);
            }
        }
    }
}

#[test]
fn equality_uses_sensitivity_band() {
    let eq = cond(ConditionField::ClosePrice, Operator::Eq, 10.25);
    let ne = cond(ConditionField::ClosePrice, Operator::Ne, 10.25);

    let on_edge = MarketSnapshot {
        close_price: 10.5,
        ..snapshot()
    };
    assert!(evaluate_condition(&eq, &on_edge, 0.25).fired);
    assert!(!evaluate_condition(&ne, &on_edge, 0.25).fired);

    let past_edge = MarketSnapshot {
        close_price: 10.5 + 1e-9,
        ..snapshot()
    };
    assert!(!evaluate_condition(&eq, &past_edge, 0.25).fired);
    assert!(evaluate_condition(&ne, &past_edge, 0.25).fired);
}

#[test]
fn unknown_field_and_operator_are_non_firing_diagnostics() {
    let group = ConditionGroup::from_json(
        r#"{"logic":"OR","conditions":[
            {"field":"turnover","operator":">","value":1},
            {"field":"close_price","operator":"=>","value":1}
        ]}"#,
    )
    .unwrap();

    let v1 = evaluate_condition(&group.conditions[0], &snapshot(), 0.0);
    assert!(!v1.fired);
    assert_eq!(v1.message, "unknown field 'turnover'");

    let v2 = evaluate_condition(&group.conditions[1], &snapshot(), 0.0);
    assert!(!v2.fired);
    assert_eq!(v2.message, "unsupported operator '=>'");

    assert!(!evaluate(&group, &snapshot(), 0.0).fired);
}

#[test]
fn empty_group_never_fires() {
    assert!(!evaluate(&ConditionGroup::all(vec![]), &snapshot(), 0.0).fired);
    assert!(!evaluate(&ConditionGroup::any(vec![]), &snapshot(), 0.0).fired);
}

#[test]
fn evaluation_is_deterministic_and_survives_serialization() {
    let group = ConditionGroup::any(vec![
        cond(ConditionField::HighPrice, Operator::Gt, 0.0).with_reference(Reference::HistoricalHigh),
        cond(ConditionField::Ma10, Operator::Lte, 98.0),
    ]);
    let snap = snapshot();

    let first = evaluate(&group, &snap, 0.01);
    let second = evaluate(&group, &snap, 0.01);
    assert_eq!(first, second);

    let restored = ConditionGroup::from_json(&group.to_json().unwrap()).unwrap();
    assert_eq!(evaluate(&restored, &snap, 0.01), first);
}
