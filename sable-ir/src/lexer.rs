//! Tokenizer for the IR text format.

use sable_core::{Diagnostic, Location};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Bare words: op names, keywords, attribute keys.
    Ident(String),
    /// `%name`, stored without the sigil.
    Value(String),
    /// `@name`, stored without the sigil.
    Symbol(String),
    Int(i64),
    /// Quoted string with escapes resolved.
    Str(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Equal,
    Colon,
    Caret,
    Eof,
}

impl TokenKind {
    /// How the token reads in an error message.
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("'{s}'"),
            TokenKind::Value(s) => format!("'%{s}'"),
            TokenKind::Symbol(s) => format!("'@{s}'"),
            TokenKind::Int(v) => format!("'{v}'"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Equal => "'='".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Caret => "'^'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$')
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split `src` into tokens. The last token is always `Eof`.
///
/// The first malformed token stops lexing and is reported as an error
/// diagnostic at its position.
pub(crate) fn lex(src: &str) -> Result<Vec<Token>, Diagnostic> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line = 1usize;
    let mut line_start = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c == '/' && chars.get(pos + 1) == Some(&'/') {
            while pos < chars.len() && chars[pos] != '\n' {
                pos += 1;
            }
            continue;
        }

        if c.is_whitespace() {
            if c == '\n' {
                line += 1;
                line_start = pos + 1;
            }
            pos += 1;
            continue;
        }

        let location = Location::new(line, pos - line_start + 1);
        let mut push = |kind: TokenKind| tokens.push(Token { kind, location });

        let single = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            ',' => Some(TokenKind::Comma),
            '=' => Some(TokenKind::Equal),
            ':' => Some(TokenKind::Colon),
            '^' => Some(TokenKind::Caret),
            _ => None,
        };
        if let Some(kind) = single {
            push(kind);
            pos += 1;
            continue;
        }

        if c == '"' {
            pos += 1;
            let mut s = String::new();
            loop {
                let Some(&sc) = chars.get(pos) else {
                    return Err(Diagnostic::error(location, "unterminated string literal"));
                };
                match sc {
                    '"' => {
                        pos += 1;
                        break;
                    }
                    '\n' => {
                        return Err(Diagnostic::error(location, "unterminated string literal"));
                    }
                    '\\' => {
                        let Some(&escaped) = chars.get(pos + 1) else {
                            return Err(Diagnostic::error(location, "unterminated string literal"));
                        };
                        match escaped {
                            '"' => s.push('"'),
                            '\\' => s.push('\\'),
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            other => {
                                let at = Location::new(line, pos - line_start + 1);
                                return Err(Diagnostic::error(
                                    at,
                                    format!("unknown escape sequence '\\{other}'"),
                                ));
                            }
                        }
                        pos += 2;
                    }
                    sc => {
                        s.push(sc);
                        pos += 1;
                    }
                }
            }
            push(TokenKind::Str(s));
            continue;
        }

        if c == '-' || c.is_ascii_digit() {
            let start = pos;
            pos += 1;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            if text == "-" {
                return Err(Diagnostic::error(location, "unexpected character '-'"));
            }
            let value = text
                .parse::<i64>()
                .map_err(|_| Diagnostic::error(location, "integer literal out of range"))?;
            push(TokenKind::Int(value));
            continue;
        }

        if c == '%' || c == '@' {
            let start = pos + 1;
            pos = start;
            while pos < chars.len() && is_value_char(chars[pos]) {
                pos += 1;
            }
            if pos == start {
                return Err(Diagnostic::error(
                    location,
                    format!("expected a name after '{c}'"),
                ));
            }
            let name: String = chars[start..pos].iter().collect();
            push(if c == '%' {
                TokenKind::Value(name)
            } else {
                TokenKind::Symbol(name)
            });
            continue;
        }

        if is_ident_start(c) {
            let start = pos;
            while pos < chars.len() && is_ident_char(chars[pos]) {
                pos += 1;
            }
            push(TokenKind::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        return Err(Diagnostic::error(
            location,
            format!("unexpected character '{c}'"),
        ));
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        location: Location::new(line, pos - line_start + 1),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_op_line() {
        assert_eq!(
            kinds("%0 = add %a, %b // sum"),
            [
                TokenKind::Value("0".into()),
                TokenKind::Equal,
                TokenKind::Ident("add".into()),
                TokenKind::Value("a".into()),
                TokenKind::Comma,
                TokenKind::Value("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_locations() {
        let tokens = lex("func @f() {\n  return\n}").unwrap();
        assert_eq!(tokens[1].location, Location::new(1, 6));
        assert_eq!(tokens[5].kind, TokenKind::Ident("return".into()));
        assert_eq!(tokens[5].location, Location::new(2, 3));
    }

    #[test]
    fn test_dotted_idents_and_literals() {
        assert_eq!(
            kinds(r#"test.sink "a\"b" -12 true"#),
            [
                TokenKind::Ident("test.sink".into()),
                TokenKind::Str("a\"b".into()),
                TokenKind::Int(-12),
                TokenKind::Ident("true".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comment_only_input() {
        assert_eq!(kinds("// nothing here\n// --- \n"), [TokenKind::Eof]);
    }

    #[test]
    fn test_errors() {
        let err = lex("\n  \"open").unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!(err.location, Location::new(2, 3));

        let err = lex("add #").unwrap_err();
        assert_eq!(err.message, "unexpected character '#'");

        let err = lex("const 99999999999999999999").unwrap_err();
        assert_eq!(err.message, "integer literal out of range");
    }
}
