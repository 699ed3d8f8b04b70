use crate::coercion::render;
use crate::context::EvaluationContext;
use crate::errors::{ParseError, Result};
use crate::evaluator;
use crate::template::{self, ParseOptions, Part};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A parsed expression that can be evaluated any number of times, from any thread.
pub trait CompiledExpression: Send + Sync + fmt::Debug {
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Value>;
}

/// Turns expression text into a [`CompiledExpression`].
pub trait ExpressionEngine: Send + Sync {
    fn compile(
        &self,
        text: &str,
        options: &ParseOptions,
    ) -> std::result::Result<Arc<dyn CompiledExpression>, ParseError>;
}

/// The built-in engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEngine;

impl ExpressionEngine for StandardEngine {
    fn compile(
        &self,
        text: &str,
        options: &ParseOptions,
    ) -> std::result::Result<Arc<dyn CompiledExpression>, ParseError> {
        let compiled = StandardExpression::parse(text, options)?;
        debug!(
            expression = text,
            template = options.is_template(),
            parts = compiled.parts.len(),
            "compiled expression"
        );
        Ok(Arc::new(compiled))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardExpression {
    parts: Vec<Part>,
}

impl StandardExpression {
    pub fn parse(text: &str, options: &ParseOptions) -> std::result::Result<Self, ParseError> {
        Ok(Self {
            parts: template::parse(text, options)?,
        })
    }
}

impl CompiledExpression for StandardExpression {
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Value> {
        match self.parts.as_slice() {
            [Part::Expr(e)] => evaluator::eval(e, ctx).map(Cow::into_owned),
            parts => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        Part::Literal(s) => out.push_str(s),
                        Part::Expr(e) => out.push_str(&render(&*evaluator::eval(e, ctx)?)),
                    }
                }
                Ok(Value::String(out))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::Registry;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};

    #[test]
    fn composite_templates_render_to_strings() {
        let engine = StandardEngine;
        let compiled = engine
            .compile("#{a} and #{b + 1}", &ParseOptions::template())
            .unwrap();
        let mut root = Map::new();
        root.insert("a".into(), json!("x"));
        root.insert("b".into(), json!(1));
        let registry = Registry::new();
        let ctx = EvaluationContext::new(&root, &registry);
        assert_eq!(compiled.evaluate(&ctx).unwrap(), json!("x and 2"));
    }

    #[test]
    fn single_embedded_expression_keeps_its_type() {
        let compiled = StandardEngine
            .compile("#{ 2 > 1 }", &ParseOptions::template())
            .unwrap();
        let root = Map::new();
        let registry = Registry::new();
        let ctx = EvaluationContext::new(&root, &registry);
        assert_eq!(compiled.evaluate(&ctx).unwrap(), json!(true));
    }
}
