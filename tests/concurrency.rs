use expression_condition::{Condition, ExpressionCondition, Facts};
use serde_json::json;
use std::thread;

#[test]
fn concurrent_evaluations_do_not_share_state() {
    let condition = ExpressionCondition::new("#n % 2 == 0 and n >= 0").unwrap();
    thread::scope(|s| {
        let handles: Vec<_> = (0..16_i64)
            .map(|t| {
                let condition = &condition;
                s.spawn(move || {
                    for i in 0..200_i64 {
                        let n = t * 1000 + i;
                        let facts: Facts = [("n", json!(n))].into_iter().collect();
                        assert_eq!(condition.evaluate(&facts), n % 2 == 0, "n = {n}");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    });
}

#[test]
fn failures_on_one_thread_do_not_leak_to_others() {
    let condition = ExpressionCondition::new("value > 10").unwrap();
    thread::scope(|s| {
        let good = s.spawn(|| {
            let facts: Facts = [("value", json!(11))].into_iter().collect();
            (0..500).all(|_| condition.evaluate(&facts))
        });
        let bad = s.spawn(|| {
            let facts: Facts = [("other", json!(11))].into_iter().collect();
            (0..500).all(|_| !condition.evaluate(&facts))
        });
        assert!(good.join().unwrap());
        assert!(bad.join().unwrap());
    });
}
