use crate::errors::ParseError;
use crate::expression::{self, Expr};
use crate::parser::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "#{";
pub const DEFAULT_SUFFIX: &str = "}";

/// How expression text is read at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseOptions {
    /// The whole text is one expression.
    #[default]
    Standard,
    /// Literal text with expressions embedded between `prefix` and `suffix`.
    Template { prefix: String, suffix: String },
}

impl ParseOptions {
    /// Template parsing with `#{` / `}` delimiters.
    pub fn template() -> Self {
        ParseOptions::Template {
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, ParseOptions::Template { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Literal(String),
    Expr(Expr),
}

/// Split `text` into parts according to `options`.
pub fn parse(text: &str, options: &ParseOptions) -> Result<Vec<Part>, ParseError> {
    match options {
        ParseOptions::Standard => Ok(vec![Part::Expr(expression::parse_expr(text)?)]),
        ParseOptions::Template { prefix, suffix } => parse_template(text, prefix, suffix),
    }
}

fn parse_template(text: &str, prefix: &str, suffix: &str) -> Result<Vec<Part>, ParseError> {
    if prefix.is_empty() || suffix.is_empty() {
        return Err(ParseError::syntax("template delimiters must not be empty", 0));
    }
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parts = Vec::new();
    let mut i = 0;
    while let Some(offset) = text[i..].find(prefix) {
        let open = i + offset;
        if open > i {
            parts.push(Part::Literal(text[i..open].to_string()));
        }
        let mut p = Parser::at(text, open + prefix.len());
        p.skip_ws();
        if p.eof() {
            return Err(ParseError::UnclosedTemplate {
                suffix: suffix.to_string(),
                position: open,
            });
        }
        if p.peek_str(suffix) {
            return Err(ParseError::Empty);
        }
        let expr = expression::parse_embedded(&mut p)?;
        p.skip_ws();
        if !p.consume_str(suffix) {
            if p.eof() {
                return Err(ParseError::UnclosedTemplate {
                    suffix: suffix.to_string(),
                    position: open,
                });
            }
            return Err(p.error(format!("expected '{suffix}'")));
        }
        parts.push(Part::Expr(expr));
        i = p.pos();
    }
    if i < text.len() {
        parts.push(Part::Literal(text[i..].to_string()));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_literals_and_expressions() {
        let parts = parse("Hi #{name}!", &ParseOptions::template()).unwrap();
        assert_eq!(
            parts,
            vec![
                Part::Literal("Hi ".into()),
                Part::Expr(Expr::Fact("name".into())),
                Part::Literal("!".into()),
            ]
        );
    }

    #[test]
    fn nested_braces_inside_an_expression() {
        let parts = parse("#{ n between {1, 3} }", &ParseOptions::template()).unwrap();
        assert_eq!(parts.len(), 1);
        assert!(matches!(parts[0], Part::Expr(Expr::Between { .. })));
    }

    #[test]
    fn custom_delimiters() {
        let options = ParseOptions::Template {
            prefix: "${".into(),
            suffix: "}".into(),
        };
        assert!(options.is_template());
        assert!(!ParseOptions::default().is_template());
        let parts = parse("${a} and #{b}", &options).unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn malformed_templates() {
        let options = ParseOptions::template();
        assert_eq!(
            parse("x #{age > 18", &options).unwrap_err(),
            ParseError::UnclosedTemplate {
                suffix: "}".into(),
                position: 2
            }
        );
        assert_eq!(parse("#{  }", &options).unwrap_err(), ParseError::Empty);
        assert!(parse("#{a b}", &options).is_err());
    }
}
