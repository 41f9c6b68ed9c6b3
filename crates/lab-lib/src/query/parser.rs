//! Lexer and recursive-descent parser for label queries

use super::Query;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Open,
    Close,
    Quoted(String),
    Word(String),
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

impl Token {
    fn text(&self) -> String {
        match &self.kind {
            TokenKind::Open => "(".to_string(),
            TokenKind::Close => ")".to_string(),
            TokenKind::Quoted(s) => format!("'{}'", s),
            TokenKind::Word(s) => s.clone(),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '=' | '/' | '*' | '+' | '-')
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        match c {
            '(' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::Open,
                    position: pos,
                });
            }
            ')' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::Close,
                    position: pos,
                });
            }
            '\'' => {
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '\'' {
                        closed = true;
                        break;
                    }
                    literal.push(c);
                }
                if !closed {
                    return Err(ParseError::new(pos, "'", "unterminated quoted label"));
                }
                if literal.is_empty() {
                    return Err(ParseError::new(pos, "''", "empty label"));
                }
                tokens.push(Token {
                    kind: TokenKind::Quoted(literal),
                    position: pos,
                });
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_word_char(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Word(word),
                    position: pos,
                });
            }
            other => {
                return Err(ParseError::new(
                    pos,
                    other.to_string(),
                    "unexpected character",
                ));
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Or,
    Not,
}

fn operator(word: &str) -> Option<Operator> {
    match word {
        "and" => Some(Operator::And),
        "or" => Some(Operator::Or),
        "not" => Some(Operator::Not),
        _ => None,
    }
}

/// Deepest parenthesis nesting accepted
const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn query(&mut self) -> Result<Query, ParseError> {
        let token = self
            .next()
            .ok_or_else(|| ParseError::new(self.end, "", "unexpected end of query"))?;

        match token.kind {
            TokenKind::Open => {
                if self.depth == MAX_DEPTH {
                    return Err(ParseError::new(
                        token.position,
                        "(",
                        format!("query nested deeper than {} levels", MAX_DEPTH),
                    ));
                }
                self.depth += 1;
                let query = self.composite(token.position);
                self.depth -= 1;
                query
            }
            TokenKind::Close => Err(ParseError::new(token.position, ")", "unexpected ')'")),
            TokenKind::Quoted(label) => Ok(Query::Label(label)),
            TokenKind::Word(word) => {
                if word == "all" {
                    Ok(Query::All)
                } else if operator(&word).is_some() {
                    Err(ParseError::new(
                        token.position,
                        word,
                        "operator outside of parentheses, quote it to use it as a label",
                    ))
                } else {
                    Ok(Query::Label(word))
                }
            }
        }
    }

    fn composite(&mut self, open_position: usize) -> Result<Query, ParseError> {
        let token = self
            .next()
            .ok_or_else(|| ParseError::new(self.end, "", "expected operator after '('"))?;

        let op = match &token.kind {
            TokenKind::Word(word) => operator(word),
            _ => None,
        }
        .ok_or_else(|| {
            ParseError::new(token.position, token.text(), "expected one of and, or, not")
        })?;

        let mut operands = Vec::new();
        loop {
            let next = self
                .peek()
                .map(|t| (t.kind == TokenKind::Close, t.position));
            match next {
                None => return Err(ParseError::new(open_position, "(", "unclosed '('")),
                Some((true, position)) => {
                    self.cursor += 1;
                    if operands.is_empty() {
                        return Err(ParseError::new(position, ")", "operator needs an operand"));
                    }
                    if op == Operator::Not && operands.len() != 1 {
                        return Err(ParseError::new(
                            position,
                            ")",
                            "not takes exactly one operand",
                        ));
                    }
                    break;
                }
                Some((false, _)) => operands.push(self.query()?),
            }
        }

        Ok(match op {
            Operator::And => Query::And(operands),
            Operator::Or => Query::Or(operands),
            Operator::Not => Query::Not(Box::new(operands.remove(0))),
        })
    }
}

/// Parse a label query expression
pub fn parse(expr: &str) -> Result<Query, ParseError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(ParseError::new(0, "", "empty query"));
    }

    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: expr.len(),
        depth: 0,
    };
    let query = parser.query()?;

    if let Some(token) = parser.peek() {
        return Err(ParseError::new(
            token.position,
            token.text(),
            "unexpected trailing token",
        ));
    }

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("'a'").unwrap(), Query::Label("a".into()));
        assert_eq!(parse("role=x").unwrap(), Query::Label("role=x".into()));
        assert_eq!(parse("all").unwrap(), Query::All);
        assert_eq!(parse("'all'").unwrap(), Query::Label("all".into()));
    }

    #[test]
    fn test_parse_nested() {
        let q = parse("(and 'a' (or b 'c') (not 'd'))").unwrap();
        assert_eq!(
            q,
            Query::And(vec![
                Query::Label("a".into()),
                Query::Or(vec![Query::Label("b".into()), Query::Label("c".into())]),
                Query::Not(Box::new(Query::Label("d".into()))),
            ])
        );
    }

    #[test]
    fn test_parse_errors_report_position() {
        let err = parse("(and 'a'").unwrap_err();
        assert_eq!(err.position, 0);
        assert!(err.message.contains("unclosed"));

        let err = parse("(xor 'a')").unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.token, "xor");

        let err = parse("'a' 'b'").unwrap_err();
        assert_eq!(err.position, 4);
        assert_eq!(err.token, "'b'");

        let err = parse("(not 'a' 'b')").unwrap_err();
        assert_eq!(err.position, 12);

        let err = parse("'open").unwrap_err();
        assert!(err.message.contains("unterminated"));

        let err = parse("a & b").unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(err.token, "&");
    }

    #[test]
    fn test_parse_rejects_empty_and_bare_operators() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("()").is_err());
        assert!(parse("(and)").is_err());
        assert!(parse("not").is_err());
        assert_eq!(parse("'not'").unwrap(), Query::Label("not".into()));
    }

    fn nested_not(depth: usize) -> String {
        format!("{}'a'{}", "(not ".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_parse_limits_nesting() {
        assert!(parse(&nested_not(MAX_DEPTH)).is_ok());

        let err = parse(&nested_not(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(err.position, MAX_DEPTH * "(not ".len());
        assert!(err.message.contains("nested deeper"));

        assert!(parse(&nested_not(100_000)).is_err());
    }
}
