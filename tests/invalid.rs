use expression_condition::{Condition, ExpressionCondition, Facts, ParseError, ParseOptions};
use serde_json::json;

#[test]
fn unbalanced_parentheses_fail_at_construction() {
    let err = ExpressionCondition::new("(age > 18").unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }), "{err:?}");
}

#[test]
fn empty_expression_fails_at_construction() {
    assert_eq!(ExpressionCondition::new("").unwrap_err(), ParseError::Empty);
    assert_eq!(ExpressionCondition::new(" \t").unwrap_err(), ParseError::Empty);
}

#[test]
fn malformed_expressions() {
    for expr in ["age >", "age > 18)", "a ? b", "'open", "1 +* 2", "a between 1", "#", "x.", "f(1,"] {
        assert!(ExpressionCondition::new(expr).is_err(), "{expr}");
    }
}

#[test]
fn syntax_errors_report_a_position() {
    let err = ExpressionCondition::new("age > 18 18").unwrap_err();
    assert_eq!(
        err,
        ParseError::InvalidSyntax {
            message: "trailing input".into(),
            position: 9
        }
    );
}

#[test]
fn unclosed_template() {
    let err = ExpressionCondition::with_options("#{age > 18", ParseOptions::template()).unwrap_err();
    assert!(matches!(err, ParseError::UnclosedTemplate { position: 0, .. }));
}

#[test]
fn deeply_nested_expressions_fail_at_construction() {
    for expr in [
        "(".repeat(10_000),
        format!("{}x > 1{}", "(".repeat(300), ")".repeat(300)),
        format!("{}true", "!".repeat(2_000)),
        vec!["1"; 5_000].join(" + "),
    ] {
        let err = ExpressionCondition::new(expr).unwrap_err();
        assert!(
            matches!(&err, ParseError::InvalidSyntax { message, .. } if message == "expression nested too deeply"),
            "{err:?}"
        );
    }
    let err = ExpressionCondition::with_options(format!("#{{{}}}", "[".repeat(1_000)), ParseOptions::template())
        .unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }), "{err:?}");
}

#[test]
fn nesting_within_the_limit_evaluates() {
    let facts: Facts = [("x", json!(2))].into_iter().collect();
    let nested = ExpressionCondition::new(format!("{}x > 1{}", "(".repeat(50), ")".repeat(50))).unwrap();
    assert!(nested.evaluate(&facts));
    let negated = ExpressionCondition::new(format!("{}(x > 1)", "!".repeat(200))).unwrap();
    assert!(negated.evaluate(&facts));
}
