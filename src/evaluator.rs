use crate::coercion::{render, to_boolean, type_name};
use crate::comparison::{compare_values, values_equal};
use crate::context::EvaluationContext;
use crate::errors::{EvalError, Result};
use crate::expression::{BinaryOp, Expr, Pattern, UnaryOp};
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

/// Evaluate AST node → Value, borrowing from the context's facts where possible.
pub fn eval<'c>(node: &Expr, ctx: &EvaluationContext<'c>) -> Result<Cow<'c, Value>> {
    match node {
        Expr::Literal(v) => Ok(Cow::Owned(v.clone())),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, ctx).map(Cow::into_owned))
            .collect::<Result<Vec<_>>>()
            .map(|items| Cow::Owned(Value::Array(items))),
        Expr::Fact(name) => ctx
            .root()
            .get(name)
            .map(Cow::Borrowed)
            .ok_or_else(|| EvalError::UndefinedFact(name.clone())),
        Expr::Variable(name) => ctx
            .variable(name)
            .map(Cow::Borrowed)
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
        Expr::Root => Ok(Cow::Owned(Value::Object(ctx.root().clone()))),
        Expr::Property {
            target,
            name,
            null_safe,
        } => {
            let target = eval(target, ctx)?;
            if *null_safe && target.is_null() {
                return Ok(Cow::Owned(Value::Null));
            }
            match target {
                Cow::Borrowed(v) => member(v, name).map(Cow::Borrowed),
                Cow::Owned(v) => member(&v, name).map(|m| Cow::Owned(m.clone())),
            }
        }
        Expr::Index { target, index } => {
            let index = eval(index, ctx)?;
            if matches!(**target, Expr::Root) {
                return Ok(element(ctx.root(), &index)?.map_or(Cow::Owned(Value::Null), Cow::Borrowed));
            }
            match eval(target, ctx)? {
                Cow::Borrowed(v) => index_into(v, &index),
                Cow::Owned(v) => index_into(&v, &index).map(|e| Cow::Owned(e.into_owned())),
            }
        }
        Expr::Method {
            target,
            name,
            args,
            null_safe,
        } => {
            let receiver = match target {
                Some(t) => eval(t, ctx)?.into_owned(),
                None => Value::Object(ctx.root().clone()),
            };
            if receiver.is_null() {
                if *null_safe {
                    return Ok(Cow::Owned(Value::Null));
                }
                return Err(EvalError::NullReference(format!("{name}()")));
            }
            let mut call_args = Vec::with_capacity(args.len() + 1);
            call_args.push(receiver);
            for a in args {
                call_args.push(eval(a, ctx)?.into_owned());
            }
            ctx.functions().call(name, &call_args).map(Cow::Owned)
        }
        Expr::Function { name, args } => {
            let call_args = args
                .iter()
                .map(|a| eval(a, ctx).map(Cow::into_owned))
                .collect::<Result<Vec<_>>>()?;
            ctx.functions().call(name, &call_args).map(Cow::Owned)
        }
        Expr::Unary(op, inner) => {
            let v = eval(inner, ctx)?;
            unary(*op, &v).map(Cow::Owned)
        }
        Expr::Binary(op, l, r) => {
            let l = eval(l, ctx)?;
            let r = eval(r, ctx)?;
            binary(*op, &l, &r).map(Cow::Owned)
        }
        Expr::And(l, r) => {
            let result = to_boolean(&*eval(l, ctx)?)? && to_boolean(&*eval(r, ctx)?)?;
            Ok(Cow::Owned(Value::Bool(result)))
        }
        Expr::Or(l, r) => {
            let result = to_boolean(&*eval(l, ctx)?)? || to_boolean(&*eval(r, ctx)?)?;
            Ok(Cow::Owned(Value::Bool(result)))
        }
        Expr::Between { value, bounds } => {
            let v = eval(value, ctx)?;
            let bounds = eval(bounds, ctx)?;
            let [low, high] = match &*bounds {
                Value::Array(items) => match items.as_slice() {
                    [low, high] => [low, high],
                    _ => return Err(EvalError::InvalidBounds(items.len())),
                },
                other => {
                    return Err(EvalError::TypeMismatch {
                        op: "between",
                        left: type_name(&v),
                        right: type_name(other),
                    })
                }
            };
            let inside = compare_values("between", &v, low)? != Ordering::Less
                && compare_values("between", &v, high)? != Ordering::Greater;
            Ok(Cow::Owned(Value::Bool(inside)))
        }
        Expr::Matches { value, pattern } => match &*eval(value, ctx)? {
            Value::String(text) => Ok(Cow::Owned(Value::Bool(pattern.is_match(text)))),
            other => Err(EvalError::TypeMismatch {
                op: "matches",
                left: type_name(other),
                right: "string",
            }),
        },
        Expr::Ternary {
            condition,
            then,
            otherwise,
        } => {
            if to_boolean(&*eval(condition, ctx)?)? {
                eval(then, ctx)
            } else {
                eval(otherwise, ctx)
            }
        }
        Expr::Elvis(value, fallback) => {
            let v = eval(value, ctx)?;
            let absent = match &*v {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                _ => false,
            };
            if absent {
                eval(fallback, ctx)
            } else {
                Ok(v)
            }
        }
    }
}

fn member<'v>(target: &'v Value, name: &str) -> Result<&'v Value> {
    match target {
        Value::Object(m) => m.get(name).ok_or_else(|| EvalError::PropertyNotFound {
            property: name.to_string(),
            target: "map",
        }),
        Value::Null => Err(EvalError::NullReference(name.to_string())),
        other => Err(EvalError::PropertyNotFound {
            property: name.to_string(),
            target: type_name(other),
        }),
    }
}

/// Map lookup by index; a missing key yields `None` (null).
fn element<'v>(map: &'v serde_json::Map<String, Value>, index: &Value) -> Result<Option<&'v Value>> {
    match index {
        Value::String(key) => Ok(map.get(key)),
        Value::Number(_) | Value::Bool(_) => Ok(map.get(&index.to_string())),
        other => Err(EvalError::TypeMismatch {
            op: "[]",
            left: "map",
            right: type_name(other),
        }),
    }
}

fn index_into<'v>(target: &'v Value, index: &Value) -> Result<Cow<'v, Value>> {
    match (target, index) {
        (Value::Null, _) => Err(EvalError::NullReference(format!("[{index}]"))),
        (Value::Object(m), _) => Ok(element(m, index)?.map_or(Cow::Owned(Value::Null), Cow::Borrowed)),
        (Value::Array(items), Value::Number(n)) => {
            let i = n.as_i64().ok_or(EvalError::TypeMismatch {
                op: "[]",
                left: "list",
                right: "decimal",
            })?;
            usize::try_from(i)
                .ok()
                .and_then(|pos| items.get(pos))
                .map(Cow::Borrowed)
                .ok_or(EvalError::IndexOutOfBounds {
                    index: i,
                    len: items.len(),
                })
        }
        (Value::String(s), Value::Number(n)) => {
            let len = s.chars().count();
            let i = n.as_i64().unwrap_or(-1);
            usize::try_from(i)
                .ok()
                .and_then(|pos| s.chars().nth(pos))
                .map(|c| Cow::Owned(Value::String(c.to_string())))
                .ok_or(EvalError::IndexOutOfBounds { index: i, len })
        }
        (t, i) => Err(EvalError::TypeMismatch {
            op: "[]",
            left: type_name(t),
            right: type_name(i),
        }),
    }
}

fn unary(op: UnaryOp, v: &Value) -> Result<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!to_boolean(v)?)),
        UnaryOp::Neg => match as_num(v) {
            Some(Num::Int(i)) => i.checked_neg().map(Value::from).ok_or(EvalError::Overflow("-")),
            Some(Num::Float(f)) => float(-f, "-"),
            None => Err(EvalError::TypeMismatch {
                op: "-",
                left: type_name(v),
                right: type_name(v),
            }),
        },
        UnaryOp::Plus => match as_num(v) {
            Some(_) => Ok(v.clone()),
            None => Err(EvalError::TypeMismatch {
                op: "+",
                left: type_name(v),
                right: type_name(v),
            }),
        },
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    let sym = op.symbol();
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(l, r))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(l, r))),
        BinaryOp::Lt => Ok(Value::Bool(compare_values(sym, l, r)? == Ordering::Less)),
        BinaryOp::Le => Ok(Value::Bool(compare_values(sym, l, r)? != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(compare_values(sym, l, r)? == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(compare_values(sym, l, r)? != Ordering::Less)),
        BinaryOp::Matches => matches_pattern(l, r).map(Value::Bool),
        BinaryOp::Add if l.is_string() || r.is_string() => {
            Ok(Value::String(format!("{}{}", render(l), render(r))))
        }
        _ => arithmetic(op, l, r),
    }
}

fn matches_pattern(l: &Value, r: &Value) -> Result<bool> {
    let (Value::String(text), Value::String(pattern)) = (l, r) else {
        return Err(EvalError::TypeMismatch {
            op: "matches",
            left: type_name(l),
            right: type_name(r),
        });
    };
    let re = Pattern::new(pattern).map_err(|e| EvalError::InvalidPattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;
    Ok(re.is_match(text))
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

fn as_num(v: &Value) -> Option<Num> {
    let Value::Number(n) = v else {
        return None;
    };
    match n.as_i64() {
        Some(i) => Some(Num::Int(i)),
        None => n.as_f64().map(Num::Float),
    }
}

impl Num {
    fn to_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn float(f: f64, op: &'static str) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or(EvalError::Overflow(op))
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    let sym = op.symbol();
    let (Some(a), Some(b)) = (as_num(l), as_num(r)) else {
        return Err(EvalError::TypeMismatch {
            op: sym,
            left: type_name(l),
            right: type_name(r),
        });
    };
    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        let out = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::Div | BinaryOp::Mod if y == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Div => x.checked_div(y),
            BinaryOp::Mod => x.checked_rem(y),
            BinaryOp::Pow => match u32::try_from(y) {
                Ok(exp) => x.checked_pow(exp),
                Err(_) => return float((x as f64).powf(y as f64), sym),
            },
            _ => unreachable!("non-arithmetic operator {sym}"),
        };
        return out.map(Value::from).ok_or(EvalError::Overflow(sym));
    }
    let (x, y) = (a.to_f64(), b.to_f64());
    let out = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::Mod if y == 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => x / y,
        BinaryOp::Mod => x % y,
        BinaryOp::Pow => x.powf(y),
        _ => unreachable!("non-arithmetic operator {sym}"),
    };
    float(out, sym)
}
