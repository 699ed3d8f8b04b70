use crate::facts::Facts;
use crate::functions::Registry;
use serde_json::{Map, Value};

/// Per-evaluation binding of the root object, the variable scope and the
/// function registry. Built fresh for every evaluation and never shared.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    root: &'a Map<String, Value>,
    variables: &'a Map<String, Value>,
    functions: &'a Registry,
}

impl<'a> EvaluationContext<'a> {
    /// Bind `root` both as the root object and as the variable scope.
    pub fn new(root: &'a Map<String, Value>, functions: &'a Registry) -> Self {
        Self {
            root,
            variables: root,
            functions,
        }
    }

    pub fn from_facts(facts: &'a Facts, functions: &'a Registry) -> Self {
        Self::new(facts.as_map(), functions)
    }

    /// Use a separate variable scope instead of the root entries.
    pub fn with_variables(mut self, variables: &'a Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn root(&self) -> &'a Map<String, Value> {
        self.root
    }

    pub fn variable(&self, name: &str) -> Option<&'a Value> {
        self.variables.get(name)
    }

    pub fn functions(&self) -> &'a Registry {
        self.functions
    }
}
