use crate::coercion::to_boolean;
use crate::context::EvaluationContext;
use crate::engine::{CompiledExpression, ExpressionEngine, StandardEngine};
use crate::errors::{EvalError, ParseError};
use crate::facts::Facts;
use crate::functions::Registry;
use crate::template::ParseOptions;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// A boolean predicate over a fact collection.
pub trait Condition: Send + Sync {
    fn evaluate(&self, facts: &Facts) -> bool;
}

impl<F> Condition for F
where
    F: Fn(&Facts) -> bool + Send + Sync,
{
    fn evaluate(&self, facts: &Facts) -> bool {
        self(facts)
    }
}

/// Details of one failed evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationFailure<'a> {
    pub expression: &'a str,
    pub facts: &'a Facts,
    pub error: &'a EvalError,
}

/// Receives a report for every evaluation that ended in `false` because of an error.
pub trait DiagnosticSink: Send + Sync {
    fn evaluation_failed(&self, failure: &EvaluationFailure<'_>);
}

/// Reports failures as `tracing` error events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn evaluation_failed(&self, failure: &EvaluationFailure<'_>) {
        error!(
            expression = failure.expression,
            facts = %failure.facts,
            error = %failure.error,
            "unable to evaluate expression"
        );
    }
}

/// A [`Condition`] backed by an expression parsed once at construction.
///
/// Facts are bound both as the root object (`age > 18`) and as variables
/// (`#age > 18`). Evaluation errors are reported to the diagnostic sink and
/// read as `false`.
#[derive(Clone)]
pub struct ExpressionCondition {
    expression: String,
    compiled: Arc<dyn CompiledExpression>,
    functions: Registry,
    sink: Arc<dyn DiagnosticSink>,
}

impl ExpressionCondition {
    pub fn new(expression: impl Into<String>) -> Result<Self, ParseError> {
        Self::builder(expression).build()
    }

    pub fn with_options(expression: impl Into<String>, options: ParseOptions) -> Result<Self, ParseError> {
        Self::builder(expression).options(options).build()
    }

    pub fn builder(expression: impl Into<String>) -> ConditionBuilder {
        ConditionBuilder::new(expression)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Evaluate without reporting: errors are returned to the caller.
    pub fn try_evaluate(&self, facts: &Facts) -> Result<bool, EvalError> {
        let ctx = EvaluationContext::from_facts(facts, &self.functions);
        let value = self.compiled.evaluate(&ctx)?;
        to_boolean(&value)
    }

    fn report(&self, facts: &Facts, error: &EvalError) {
        self.sink.evaluation_failed(&EvaluationFailure {
            expression: &self.expression,
            facts,
            error,
        });
    }
}

impl Condition for ExpressionCondition {
    fn evaluate(&self, facts: &Facts) -> bool {
        // Registered functions may panic. The process panic hook still runs
        // first, so a panic also prints its own message to stderr.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_evaluate(facts)))
            .unwrap_or_else(|payload| Err(EvalError::Runtime(panic_message(payload.as_ref()))));
        match outcome {
            Ok(result) => {
                debug!(expression = %self.expression, result, "condition evaluated");
                result
            }
            Err(e) => {
                self.report(facts, &e);
                false
            }
        }
    }
}

/// Turns a caught panic payload into the `Runtime` error reported to the sink.
/// This report is in addition to whatever the installed panic hook printed.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("evaluation panicked: {detail}")
}

impl fmt::Debug for ExpressionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionCondition")
            .field("expression", &self.expression)
            .field("compiled", &self.compiled)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ExpressionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

pub struct ConditionBuilder {
    expression: String,
    options: ParseOptions,
    engine: Arc<dyn ExpressionEngine>,
    functions: Registry,
    sink: Arc<dyn DiagnosticSink>,
}

impl ConditionBuilder {
    fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            options: ParseOptions::default(),
            engine: Arc::new(StandardEngine),
            functions: Registry::with_builtins(),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine(mut self, engine: Arc<dyn ExpressionEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Functions callable as methods or `#name(...)`. Defaults to the built-ins.
    pub fn registry(mut self, functions: Registry) -> Self {
        self.functions = functions;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Parse the expression. This is the only place parsing happens.
    pub fn build(self) -> Result<ExpressionCondition, ParseError> {
        let compiled = self.engine.compile(&self.expression, &self.options)?;
        Ok(ExpressionCondition {
            expression: self.expression,
            compiled,
            functions: self.functions,
            sink: self.sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// Engine that ignores the text and answers whether fact `on` exists.
    struct PresenceEngine;

    #[derive(Debug)]
    struct Presence;

    impl CompiledExpression for Presence {
        fn evaluate(&self, ctx: &EvaluationContext<'_>) -> crate::errors::Result<Value> {
            Ok(Value::Bool(ctx.root().contains_key("on")))
        }
    }

    impl ExpressionEngine for PresenceEngine {
        fn compile(&self, _text: &str, _options: &ParseOptions) -> Result<Arc<dyn CompiledExpression>, ParseError> {
            Ok(Arc::new(Presence))
        }
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn conditions_are_shareable_across_threads() {
        assert_send_sync::<ExpressionCondition>();
    }

    #[test]
    fn closures_are_conditions() {
        let adult = |facts: &Facts| facts.get("age").and_then(|v| v.as_i64()).is_some_and(|a| a >= 18);
        let facts: Facts = [("age", json!(20))].into_iter().collect();
        assert!(adult.evaluate(&facts));
    }

    #[test]
    fn try_evaluate_surfaces_the_error() {
        let condition = ExpressionCondition::new("age > 18").unwrap();
        assert_eq!(
            condition.try_evaluate(&Facts::new()).unwrap_err(),
            EvalError::UndefinedFact("age".into())
        );
        assert_eq!(condition.to_string(), "age > 18");
    }

    #[test]
    fn panicking_function_reads_as_false() {
        let mut registry = Registry::with_builtins();
        registry.register_fn("explode", 0..=0, |_| panic!("boom"));
        let condition = ExpressionCondition::builder("#explode()")
            .registry(registry)
            .build()
            .unwrap();
        assert!(!condition.evaluate(&Facts::new()));
    }

    #[test]
    fn custom_engine_is_used() {
        let condition = ExpressionCondition::builder("anything at all")
            .engine(Arc::new(PresenceEngine))
            .build()
            .unwrap();
        let facts: Facts = [("on", json!(1))].into_iter().collect();
        assert!(condition.evaluate(&facts));
        assert!(!condition.evaluate(&Facts::new()));
    }
}
