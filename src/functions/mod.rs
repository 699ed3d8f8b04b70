use crate::errors::{EvalError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Trait for pluggable functions used by the expression evaluator.
///
/// A method call `recv.name(a, b)` passes `[recv, a, b]`; a function call
/// `#name(a, b)` passes `[a, b]`.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn arity(&self) -> RangeInclusive<usize>;
    fn call(&self, args: &[Value]) -> Result<Value>;
}

/// Thread-safe function registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(builtins::Size("size"));
        registry.register(builtins::Size("length"));
        registry.register(builtins::IsEmpty);
        registry.register(builtins::Contains);
        registry.register(builtins::ContainsKey);
        registry.register(builtins::StartsWith);
        registry.register(builtins::EndsWith);
        registry.register(builtins::ToUpperCase);
        registry.register(builtins::ToLowerCase);
        registry.register(builtins::Trim);
        registry.register(builtins::Abs);
        registry.register(builtins::Extremum::MIN);
        registry.register(builtins::Extremum::MAX);
        registry
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let map = Arc::make_mut(&mut self.inner);
        map.insert(f.name(), Arc::new(f));
    }

    /// Register a closure under `name`.
    pub fn register_fn<F>(&mut self, name: &'static str, arity: RangeInclusive<usize>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(FnFunction { name, arity, f });
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    /// Look up `name`, check the argument count and invoke it.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        let arity = f.arity();
        if !arity.contains(&args.len()) {
            return Err(EvalError::Arity {
                name: name.to_string(),
                expected: describe_arity(&arity),
                got: args.len(),
            });
        }
        f.call(args)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.inner.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("functions", &names).finish()
    }
}

fn describe_arity(arity: &RangeInclusive<usize>) -> String {
    match (*arity.start(), *arity.end()) {
        (lo, hi) if lo == hi => lo.to_string(),
        (lo, usize::MAX) => format!("{lo} or more"),
        (lo, hi) => format!("{lo} to {hi}"),
    }
}

struct FnFunction<F> {
    name: &'static str,
    arity: RangeInclusive<usize>,
    f: F,
}

impl<F> Function for FnFunction<F>
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }
    fn arity(&self) -> RangeInclusive<usize> {
        self.arity.clone()
    }
    fn call(&self, args: &[Value]) -> Result<Value> {
        (self.f)(args)
    }
}

pub mod builtins {
    use super::*;
    use crate::coercion::type_name;
    use crate::comparison::{compare_values, values_equal};
    use std::cmp::Ordering;

    fn arg(args: &[Value], i: usize) -> &Value {
        args.get(i).unwrap_or(&Value::Null)
    }

    fn not_applicable(function: &'static str, v: &Value) -> EvalError {
        EvalError::NotApplicable {
            function,
            target: type_name(v),
        }
    }

    fn string_arg<'v>(function: &'static str, v: &'v Value) -> Result<&'v str> {
        v.as_str().ok_or_else(|| not_applicable(function, v))
    }

    /// `size()` / `length()`: characters of a string, entries of a list or map.
    pub struct Size(pub &'static str);
    impl Function for Size {
        fn name(&self) -> &'static str { self.0 }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let len = match arg(args, 0) {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(m) => m.len(),
                other => return Err(not_applicable(self.0, other)),
            };
            Ok(Value::from(len))
        }
    }

    pub struct IsEmpty;
    impl Function for IsEmpty {
        fn name(&self) -> &'static str { "isEmpty" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::Bool(match arg(args, 0) {
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(m) => m.is_empty(),
                other => return Err(not_applicable(self.name(), other)),
            }))
        }
    }

    pub struct Contains;
    impl Function for Contains {
        fn name(&self) -> &'static str { "contains" }
        fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let needle = arg(args, 1);
            Ok(Value::Bool(match arg(args, 0) {
                Value::String(s) => s.contains(string_arg(self.name(), needle)?),
                Value::Array(a) => a.iter().any(|item| values_equal(item, needle)),
                other => return Err(not_applicable(self.name(), other)),
            }))
        }
    }

    pub struct ContainsKey;
    impl Function for ContainsKey {
        fn name(&self) -> &'static str { "containsKey" }
        fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            match arg(args, 0) {
                Value::Object(m) => Ok(Value::Bool(
                    m.contains_key(string_arg(self.name(), arg(args, 1))?),
                )),
                other => Err(not_applicable(self.name(), other)),
            }
        }
    }

    pub struct StartsWith;
    impl Function for StartsWith {
        fn name(&self) -> &'static str { "startsWith" }
        fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let s = string_arg(self.name(), arg(args, 0))?;
            let prefix = string_arg(self.name(), arg(args, 1))?;
            Ok(Value::Bool(s.starts_with(prefix)))
        }
    }

    pub struct EndsWith;
    impl Function for EndsWith {
        fn name(&self) -> &'static str { "endsWith" }
        fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let s = string_arg(self.name(), arg(args, 0))?;
            let suffix = string_arg(self.name(), arg(args, 1))?;
            Ok(Value::Bool(s.ends_with(suffix)))
        }
    }

    pub struct ToUpperCase;
    impl Function for ToUpperCase {
        fn name(&self) -> &'static str { "toUpperCase" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(string_arg(self.name(), arg(args, 0))?.to_uppercase()))
        }
    }

    pub struct ToLowerCase;
    impl Function for ToLowerCase {
        fn name(&self) -> &'static str { "toLowerCase" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(string_arg(self.name(), arg(args, 0))?.to_lowercase()))
        }
    }

    pub struct Trim;
    impl Function for Trim {
        fn name(&self) -> &'static str { "trim" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            Ok(Value::String(string_arg(self.name(), arg(args, 0))?.trim().to_string()))
        }
    }

    pub struct Abs;
    impl Function for Abs {
        fn name(&self) -> &'static str { "abs" }
        fn arity(&self) -> RangeInclusive<usize> { 1..=1 }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let v = arg(args, 0);
            let Value::Number(n) = v else {
                return Err(not_applicable(self.name(), v));
            };
            if let Some(i) = n.as_i64() {
                return i.checked_abs().map(Value::from).ok_or(EvalError::Overflow("abs"));
            }
            if n.is_u64() {
                return Ok(v.clone());
            }
            Ok(n.as_f64().map(|f| Value::from(f.abs())).unwrap_or(Value::Null))
        }
    }

    /// `min(...)` / `max(...)` over the arguments, or over a single list argument.
    pub struct Extremum {
        name: &'static str,
        keep: Ordering,
    }

    impl Extremum {
        pub const MIN: Extremum = Extremum { name: "min", keep: Ordering::Less };
        pub const MAX: Extremum = Extremum { name: "max", keep: Ordering::Greater };
    }

    impl Function for Extremum {
        fn name(&self) -> &'static str { self.name }
        fn arity(&self) -> RangeInclusive<usize> { 1..=usize::MAX }
        fn call(&self, args: &[Value]) -> Result<Value> {
            let items = match args {
                [Value::Array(items)] => items.as_slice(),
                _ => args,
            };
            let mut best: Option<&Value> = None;
            for item in items {
                best = match best {
                    Some(b) if compare_values(self.name, item, b)? != self.keep => Some(b),
                    _ => Some(item),
                };
            }
            best.cloned().ok_or(EvalError::NotApplicable {
                function: self.name,
                target: "empty list",
            })
        }
    }
}
