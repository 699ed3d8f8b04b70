// src/expression.rs
use crate::errors::ParseError;
use crate::parser::Parser;
use regex::Regex;
use serde_json::Value;

/// Tree depth charged for a nested sub-expression: parentheses, arguments,
/// indexes, list items and conditional branches.
const NESTED_LEVELS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    /// Bare name, resolved against the root fact map.
    Fact(String),
    /// `#name`, resolved against the variable scope.
    Variable(String),
    /// `#root` / `#this`
    Root,
    Property {
        target: Box<Expr>,
        name: String,
        null_safe: bool,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    /// `target.name(args)`; a missing target means the root fact map.
    Method {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
        null_safe: bool,
    },
    /// `#name(args)`
    Function { name: String, args: Vec<Expr> },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// `value between bounds`; `bounds` must yield a two-element list.
    Between {
        value: Box<Expr>,
        bounds: Box<Expr>,
    },
    /// `value matches 'literal'`, with the pattern compiled once.
    Matches {
        value: Box<Expr>,
        pattern: Pattern,
    },
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Elvis(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Matches,
}

/// A full-match regular expression.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{source})$")).map(Pattern)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Matches => "matches",
        }
    }
}

/// Parse a complete expression; anything left after it is an error.
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut p = Parser::new(input);
    let node = parse_ternary(&mut p)?;
    p.skip_ws();
    if !p.eof() {
        return Err(p.error("trailing input"));
    }
    Ok(node)
}

/// Parse one expression starting at the cursor and leave the cursor right after it.
pub(crate) fn parse_embedded(p: &mut Parser) -> Result<Expr, ParseError> {
    parse_ternary(p)
}

fn boxed(e: Expr) -> Box<Expr> {
    Box::new(e)
}

fn parse_ternary(p: &mut Parser) -> Result<Expr, ParseError> {
    p.descend(NESTED_LEVELS)?;
    let node = parse_conditional(p)?;
    p.ascend(NESTED_LEVELS);
    Ok(node)
}

fn parse_conditional(p: &mut Parser) -> Result<Expr, ParseError> {
    let condition = parse_or(p)?;
    p.skip_ws();
    if p.consume_str("?:") {
        let fallback = parse_ternary(p)?;
        return Ok(Expr::Elvis(boxed(condition), boxed(fallback)));
    }
    if p.consume_char('?') {
        let then = parse_ternary(p)?;
        p.skip_ws();
        p.expect(':')?;
        let otherwise = parse_ternary(p)?;
        return Ok(Expr::Ternary {
            condition: boxed(condition),
            then: boxed(then),
            otherwise: boxed(otherwise),
        });
    }
    Ok(condition)
}

fn parse_or(p: &mut Parser) -> Result<Expr, ParseError> {
    let mut left = parse_and(p)?;
    let mut links = 0;
    loop {
        p.skip_ws();
        if p.consume_str("||") || p.consume_keyword("or") {
            p.descend(1)?;
            links += 1;
            let right = parse_and(p)?;
            left = Expr::Or(boxed(left), boxed(right));
        } else {
            break;
        }
    }
    p.ascend(links);
    Ok(left)
}

fn parse_and(p: &mut Parser) -> Result<Expr, ParseError> {
    let mut left = parse_relational(p)?;
    let mut links = 0;
    loop {
        p.skip_ws();
        if p.consume_str("&&") || p.consume_keyword("and") {
            p.descend(1)?;
            links += 1;
            let right = parse_relational(p)?;
            left = Expr::And(boxed(left), boxed(right));
        } else {
            break;
        }
    }
    p.ascend(links);
    Ok(left)
}

fn relational_op(p: &mut Parser) -> Option<BinaryOp> {
    const SYMBOLS: [(&str, BinaryOp); 6] = [
        ("==", BinaryOp::Eq),
        ("!=", BinaryOp::Ne),
        ("<=", BinaryOp::Le),
        (">=", BinaryOp::Ge),
        ("<", BinaryOp::Lt),
        (">", BinaryOp::Gt),
    ];
    const WORDS: [(&str, BinaryOp); 7] = [
        ("eq", BinaryOp::Eq),
        ("ne", BinaryOp::Ne),
        ("le", BinaryOp::Le),
        ("ge", BinaryOp::Ge),
        ("lt", BinaryOp::Lt),
        ("gt", BinaryOp::Gt),
        ("matches", BinaryOp::Matches),
    ];
    SYMBOLS
        .iter()
        .find(|(sym, _)| p.consume_str(sym))
        .or_else(|| WORDS.iter().find(|(word, _)| p.consume_keyword(word)))
        .map(|(_, op)| *op)
}

fn parse_relational(p: &mut Parser) -> Result<Expr, ParseError> {
    let left = parse_additive(p)?;
    p.skip_ws();
    if p.consume_keyword("between") {
        p.skip_ws();
        let start = p.pos();
        let bounds = parse_additive(p)?;
        match &bounds {
            Expr::List(items) if items.len() != 2 => {
                return Err(ParseError::syntax("'between' expects exactly two bounds", start));
            }
            Expr::Literal(_) => {
                return Err(ParseError::syntax("'between' expects a list {low, high}", start));
            }
            _ => {}
        }
        return Ok(Expr::Between {
            value: boxed(left),
            bounds: boxed(bounds),
        });
    }
    match relational_op(p) {
        Some(BinaryOp::Matches) => {
            let right = parse_additive(p)?;
            // an invalid literal is left for evaluation to report
            if let Expr::Literal(Value::String(source)) = &right {
                if let Ok(pattern) = Pattern::new(source) {
                    return Ok(Expr::Matches {
                        value: boxed(left),
                        pattern,
                    });
                }
            }
            Ok(Expr::Binary(BinaryOp::Matches, boxed(left), boxed(right)))
        }
        Some(op) => {
            let right = parse_additive(p)?;
            Ok(Expr::Binary(op, boxed(left), boxed(right)))
        }
        None => Ok(left),
    }
}

fn parse_additive(p: &mut Parser) -> Result<Expr, ParseError> {
    let mut left = parse_multiplicative(p)?;
    let mut links = 0;
    loop {
        p.skip_ws();
        let op = if p.consume_char('+') {
            BinaryOp::Add
        } else if p.consume_char('-') {
            BinaryOp::Sub
        } else {
            break;
        };
        p.descend(1)?;
        links += 1;
        let right = parse_multiplicative(p)?;
        left = Expr::Binary(op, boxed(left), boxed(right));
    }
    p.ascend(links);
    Ok(left)
}

fn parse_multiplicative(p: &mut Parser) -> Result<Expr, ParseError> {
    let mut left = parse_power(p)?;
    let mut links = 0;
    loop {
        p.skip_ws();
        let op = if p.consume_char('*') {
            BinaryOp::Mul
        } else if p.consume_char('/') || p.consume_keyword("div") {
            BinaryOp::Div
        } else if p.consume_char('%') || p.consume_keyword("mod") {
            BinaryOp::Mod
        } else {
            break;
        };
        p.descend(1)?;
        links += 1;
        let right = parse_power(p)?;
        left = Expr::Binary(op, boxed(left), boxed(right));
    }
    p.ascend(links);
    Ok(left)
}

fn parse_power(p: &mut Parser) -> Result<Expr, ParseError> {
    let base = parse_unary(p)?;
    p.skip_ws();
    if p.consume_char('^') {
        p.descend(1)?;
        let exponent = parse_power(p)?;
        p.ascend(1);
        return Ok(Expr::Binary(BinaryOp::Pow, boxed(base), boxed(exponent)));
    }
    Ok(base)
}

fn parse_unary(p: &mut Parser) -> Result<Expr, ParseError> {
    p.skip_ws();
    if p.consume_char('!') || p.consume_keyword("not") {
        p.descend(1)?;
        let inner = parse_unary(p)?;
        p.ascend(1);
        return Ok(Expr::Unary(UnaryOp::Not, boxed(inner)));
    }
    if p.consume_char('-') {
        if let Some(value) = negative_literal(p)? {
            return Ok(Expr::Literal(value));
        }
        p.descend(1)?;
        let inner = parse_unary(p)?;
        p.ascend(1);
        // fold negative numeric literals
        if let Expr::Literal(Value::Number(n)) = &inner {
            if let Some(i) = n.as_i64().and_then(i64::checked_neg) {
                return Ok(Expr::Literal(Value::from(i)));
            }
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    return Ok(Expr::Literal(Value::from(-f)));
                }
            }
        }
        return Ok(Expr::Unary(UnaryOp::Neg, boxed(inner)));
    }
    if p.consume_char('+') {
        p.descend(1)?;
        let inner = parse_unary(p)?;
        p.ascend(1);
        return Ok(Expr::Unary(UnaryOp::Plus, boxed(inner)));
    }
    parse_postfix(p)
}

/// A number written right after `-`, unless member access or indexing follows it.
fn negative_literal(p: &mut Parser) -> Result<Option<Value>, ParseError> {
    if !p.peek_char().is_some_and(|c| c.is_ascii_digit()) {
        return Ok(None);
    }
    let start = p.pos();
    let value = p.parse_signed_number(true)?;
    p.skip_ws();
    if matches!(p.peek_char(), Some('.' | '[')) || p.peek_str("?.") {
        p.rewind(start);
        return Ok(None);
    }
    Ok(Some(value))
}

fn parse_postfix(p: &mut Parser) -> Result<Expr, ParseError> {
    let mut node = parse_primary(p)?;
    let mut links = 0;
    loop {
        p.skip_ws();
        let null_safe = if p.consume_str("?.") {
            true
        } else if p.peek_char() == Some('.') && p.char_after(1) != Some('.') {
            p.consume_char('.');
            false
        } else if p.consume_char('[') {
            p.descend(1)?;
            links += 1;
            let index = parse_ternary(p)?;
            p.skip_ws();
            p.expect(']')?;
            node = Expr::Index {
                target: boxed(node),
                index: boxed(index),
            };
            continue;
        } else {
            break;
        };
        p.descend(1)?;
        links += 1;
        p.skip_ws();
        let name = p.parse_identifier()?;
        if p.consume_char('(') {
            let args = parse_args(p)?;
            node = Expr::Method {
                target: Some(boxed(node)),
                name,
                args,
                null_safe,
            };
        } else {
            node = Expr::Property {
                target: boxed(node),
                name,
                null_safe,
            };
        }
    }
    p.ascend(links);
    Ok(node)
}

/// Arguments after an already consumed '(' up to and including ')'.
fn parse_args(p: &mut Parser) -> Result<Vec<Expr>, ParseError> {
    parse_sequence(p, ')')
}

fn parse_sequence(p: &mut Parser, close: char) -> Result<Vec<Expr>, ParseError> {
    let mut out = Vec::new();
    p.skip_ws();
    if p.consume_char(close) {
        return Ok(out);
    }
    loop {
        out.push(parse_ternary(p)?);
        p.skip_ws();
        if p.consume_char(',') {
            continue;
        }
        break;
    }
    p.expect(close)?;
    Ok(out)
}

fn parse_primary(p: &mut Parser) -> Result<Expr, ParseError> {
    p.skip_ws();
    let Some(c) = p.peek_char() else {
        return Err(p.error("unexpected end of expression"));
    };
    match c {
        '(' => {
            p.consume_char('(');
            let inner = parse_ternary(p)?;
            p.skip_ws();
            p.expect(')')?;
            Ok(inner)
        }
        '\'' | '"' => Ok(Expr::Literal(Value::String(p.parse_quoted_string()?))),
        '[' => {
            p.consume_char('[');
            let index = parse_ternary(p)?;
            p.skip_ws();
            p.expect(']')?;
            Ok(Expr::Index {
                target: boxed(Expr::Root),
                index: boxed(index),
            })
        }
        '{' => {
            p.consume_char('{');
            Ok(Expr::List(parse_sequence(p, '}')?))
        }
        '#' => {
            p.consume_char('#');
            let name = p.parse_identifier()?;
            if p.consume_char('(') {
                let args = parse_args(p)?;
                return Ok(Expr::Function { name, args });
            }
            Ok(match name.as_str() {
                "root" | "this" => Expr::Root,
                _ => Expr::Variable(name),
            })
        }
        c if c.is_ascii_digit() => Ok(Expr::Literal(p.parse_number_literal()?)),
        _ => {
            if p.consume_keyword("true") {
                return Ok(Expr::Literal(Value::Bool(true)));
            }
            if p.consume_keyword("false") {
                return Ok(Expr::Literal(Value::Bool(false)));
            }
            if p.consume_keyword("null") {
                return Ok(Expr::Literal(Value::Null));
            }
            let start = p.pos();
            let name = p
                .parse_identifier()
                .map_err(|_| ParseError::syntax(format!("unexpected character '{c}'"), start))?;
            if p.consume_char('(') {
                let args = parse_args(p)?;
                return Ok(Expr::Method {
                    target: None,
                    name,
                    args,
                    null_safe: false,
                });
            }
            Ok(Expr::Fact(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fact(name: &str) -> Box<Expr> {
        Box::new(Expr::Fact(name.into()))
    }

    fn lit(v: Value) -> Box<Expr> {
        Box::new(Expr::Literal(v))
    }

    #[test]
    fn bare_and_variable_references() {
        assert_eq!(
            parse_expr("age > 18").unwrap(),
            Expr::Binary(BinaryOp::Gt, fact("age"), lit(json!(18)))
        );
        assert_eq!(
            parse_expr("#age gt 18").unwrap(),
            Expr::Binary(BinaryOp::Gt, Box::new(Expr::Variable("age".into())), lit(json!(18)))
        );
    }

    #[test]
    fn precedence_of_logical_operators() {
        let parsed = parse_expr("a or b and not c").unwrap();
        assert_eq!(
            parsed,
            Expr::Or(
                fact("a"),
                Box::new(Expr::And(
                    fact("b"),
                    Box::new(Expr::Unary(UnaryOp::Not, fact("c")))
                ))
            )
        );
    }

    #[test]
    fn arithmetic_binds_tighter_than_comparison() {
        assert_eq!(
            parse_expr("x + 2 * 3 >= -4").unwrap(),
            Expr::Binary(
                BinaryOp::Ge,
                Box::new(Expr::Binary(
                    BinaryOp::Add,
                    fact("x"),
                    Box::new(Expr::Binary(BinaryOp::Mul, lit(json!(2)), lit(json!(3))))
                )),
                lit(json!(-4))
            )
        );
    }

    #[test]
    fn member_chains() {
        let parsed = parse_expr("person?.name.toUpperCase()").unwrap();
        assert_eq!(
            parsed,
            Expr::Method {
                target: Some(Box::new(Expr::Property {
                    target: fact("person"),
                    name: "name".into(),
                    null_safe: true,
                })),
                name: "toUpperCase".into(),
                args: vec![],
                null_safe: false,
            }
        );
        assert_eq!(
            parse_expr("['age']").unwrap(),
            Expr::Index {
                target: Box::new(Expr::Root),
                index: lit(json!("age")),
            }
        );
        assert!(matches!(parse_expr("items[0]").unwrap(), Expr::Index { .. }));
    }

    #[test]
    fn ternary_elvis_and_between() {
        assert!(matches!(parse_expr("a ? 1 : 2").unwrap(), Expr::Ternary { .. }));
        assert!(matches!(parse_expr("a ?: 'x'").unwrap(), Expr::Elvis(..)));
        assert!(matches!(parse_expr("a between {1, 5}").unwrap(), Expr::Between { .. }));
        assert!(parse_expr("a between {1}").is_err());
        assert_eq!(
            parse_expr("a between #range").unwrap(),
            Expr::Between {
                value: fact("a"),
                bounds: Box::new(Expr::Variable("range".into())),
            }
        );
    }

    #[test]
    fn signed_and_suffixed_integers() {
        assert_eq!(
            parse_expr("x > -9223372036854775808").unwrap(),
            Expr::Binary(BinaryOp::Gt, fact("x"), lit(json!(i64::MIN)))
        );
        assert_eq!(
            parse_expr("100L > x").unwrap(),
            Expr::Binary(BinaryOp::Gt, lit(json!(100)), fact("x"))
        );
        assert!(parse_expr("9223372036854775808 > x").is_err());
        assert!(matches!(
            parse_expr("-1.abs()").unwrap(),
            Expr::Unary(UnaryOp::Neg, _)
        ));
    }

    #[test]
    fn nesting_depth_is_limited() {
        let shallow = format!("{}x > 1{}", "(".repeat(40), ")".repeat(40));
        assert!(parse_expr(&shallow).is_ok());
        for deep in [
            "(".repeat(10_000),
            format!("{}x > 1{}", "(".repeat(300), ")".repeat(300)),
            format!("{}true", "!".repeat(2_000)),
            vec!["x"; 2_000].join(" or "),
        ] {
            let err = parse_expr(&deep).unwrap_err();
            assert!(
                matches!(&err, ParseError::InvalidSyntax { message, .. } if message == "expression nested too deeply"),
                "{err:?}"
            );
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_expr("   ").unwrap_err(), ParseError::Empty);
        assert!(parse_expr("(age > 18").is_err());
        assert!(parse_expr("age > 18)").is_err());
        assert!(parse_expr("age >").is_err());
        assert!(parse_expr("a ? b").is_err());
        assert!(parse_expr("'unterminated").is_err());
    }
}
