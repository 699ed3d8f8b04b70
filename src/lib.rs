pub mod errors;
pub mod facts;
pub mod context;
pub mod engine;
pub mod condition;
pub mod config;
pub mod functions;  // plugin model
pub mod template;
pub mod expression;
mod parser;
mod evaluator;
mod comparison;
mod coercion;

pub use condition::{
    Condition, ConditionBuilder, DiagnosticSink, EvaluationFailure, ExpressionCondition, TracingSink,
};
pub use config::{ConditionConfig, ConfigError, TemplateConfig};
pub use context::EvaluationContext;
pub use engine::{CompiledExpression, ExpressionEngine, StandardEngine, StandardExpression};
pub use errors::{EvalError, ParseError};
pub use facts::Facts;
pub use functions::{Function, Registry};
pub use template::ParseOptions;

/// Convenience: parse `expr` and evaluate it once against `facts`.
/// Evaluation errors read as `false` and are logged; parse errors are returned.
pub fn evaluate(expr: &str, facts: &Facts) -> Result<bool, ParseError> {
    Ok(ExpressionCondition::new(expr)?.evaluate(facts))
}
