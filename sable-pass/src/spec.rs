//! Textual pipeline grammar.
//!
//! ```text
//! pipeline := element (',' element)*
//! element  := pass | anchor '(' pipeline ')'
//! pass     := NAME [ '{' option* '}' ]
//! option   := KEY [ '=' VALUE ]
//! ```
//!
//! Parsing only checks the shape of the text. Names are resolved later by
//! the builder, which keeps the spans recorded here for its errors.

use miette::SourceSpan;

use crate::error::{BuildError, PipelineSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ElementSpec {
    Pass {
        name: String,
        span: SourceSpan,
        options: Vec<OptionSpec>,
    },
    Nested {
        anchor: String,
        span: SourceSpan,
        elements: Vec<ElementSpec>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OptionSpec {
    pub key: String,
    pub value: Option<String>,
    pub span: SourceSpan,
}

/// Parse pipeline text. Blank text is an empty pipeline.
pub(crate) fn parse_pipeline(
    text: &str,
    source: &PipelineSource,
) -> Result<Vec<ElementSpec>, Box<BuildError>> {
    let mut parser = SpecParser {
        text,
        pos: 0,
        source,
    };
    parser.skip_whitespace();
    if parser.at_end() {
        return Ok(Vec::new());
    }
    let elements = parser.pipeline()?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(parser.error_here("unexpected trailing input"));
    }
    Ok(elements)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

struct SpecParser<'t> {
    text: &'t str,
    pos: usize,
    source: &'t PipelineSource,
}

impl SpecParser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> Box<BuildError> {
        let len = self.peek().map_or(0, char::len_utf8);
        self.source.syntax_error(message, (self.pos, len).into())
    }

    fn name(&mut self, what: &str) -> Result<(String, SourceSpan), Box<BuildError>> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error_here(format!("expected {what}")));
        }
        Ok((
            self.text[start..self.pos].to_string(),
            (start, self.pos - start).into(),
        ))
    }

    fn pipeline(&mut self) -> Result<Vec<ElementSpec>, Box<BuildError>> {
        let mut elements = vec![self.element()?];
        while self.eat(',') {
            elements.push(self.element()?);
        }
        Ok(elements)
    }

    fn element(&mut self) -> Result<ElementSpec, Box<BuildError>> {
        let (name, span) = self.name("a pass name")?;

        if self.eat('(') {
            let elements = if self.eat(')') {
                Vec::new()
            } else {
                let elements = self.pipeline()?;
                if !self.eat(')') {
                    return Err(self.error_here("expected ',' or ')'"));
                }
                elements
            };
            return Ok(ElementSpec::Nested {
                anchor: name,
                span,
                elements,
            });
        }

        let mut options = Vec::new();
        if self.eat('{') {
            loop {
                self.skip_whitespace();
                if self.eat('}') {
                    break;
                }
                if self.at_end() {
                    return Err(self.error_here("expected '}' to close the option list"));
                }
                options.push(self.option()?);
            }
        }
        Ok(ElementSpec::Pass {
            name,
            span,
            options,
        })
    }

    fn option(&mut self) -> Result<OptionSpec, Box<BuildError>> {
        let (key, key_span) = self.name("an option name")?;
        if self.peek() != Some('=') {
            return Ok(OptionSpec {
                key,
                value: None,
                span: key_span,
            });
        }
        self.bump();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != '}')
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error_here(format!("expected a value for option '{key}'")));
        }
        let span = (key_span.offset(), self.pos - key_span.offset()).into();
        Ok(OptionSpec {
            key,
            value: Some(self.text[start..self.pos].to_string()),
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<ElementSpec>, Box<BuildError>> {
        parse_pipeline(text, &PipelineSource::new(text))
    }

    fn pass(name: &str, offset: usize) -> ElementSpec {
        ElementSpec::Pass {
            name: name.to_string(),
            span: (offset, name.len()).into(),
            options: Vec::new(),
        }
    }

    #[test]
    fn test_blank_is_empty() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_flat_list() {
        assert_eq!(
            parse("dce, symbol-dce").unwrap(),
            [pass("dce", 0), pass("symbol-dce", 5)]
        );
    }

    #[test]
    fn test_nested_with_options() {
        let elements = parse("func(canonicalize{max-iterations=3 verbose}),dce").unwrap();
        let ElementSpec::Nested {
            anchor, elements: inner, ..
        } = &elements[0]
        else {
            panic!("expected nested element");
        };
        assert_eq!(anchor, "func");
        let ElementSpec::Pass { name, options, .. } = &inner[0] else {
            panic!("expected pass");
        };
        assert_eq!(name, "canonicalize");
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].key, "max-iterations");
        assert_eq!(options[0].value.as_deref(), Some("3"));
        assert_eq!(options[0].span, SourceSpan::from((18, 16)));
        assert_eq!(options[1].value, None);
        assert_eq!(elements[1], pass("dce", 45));
    }

    #[test]
    fn test_syntax_errors() {
        for (text, message) in [
            ("dce,", "invalid pass pipeline: expected a pass name"),
            ("func(dce", "invalid pass pipeline: expected ',' or ')'"),
            ("canonicalize{max-iterations=", "invalid pass pipeline: expected a value for option 'max-iterations'"),
            ("canonicalize{x", "invalid pass pipeline: expected '}' to close the option list"),
            ("dce dce", "invalid pass pipeline: unexpected trailing input"),
        ] {
            let err = parse(text).unwrap_err();
            assert_eq!(err.to_string(), message, "for {text:?}");
        }
    }
}
