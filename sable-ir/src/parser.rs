//! Parser for the IR text format.
//!
//! Parsing stops at the first syntax error. A module that parses is then
//! run through the structural verifier, and every violation is reported
//! before the parse is declared failed.

use sable_core::{Diagnostic, Location};

use crate::{
    attribute::{Attribute, Attributes},
    context::Context,
    dialect::{Syntax, builtin, namespace_of},
    lexer::{Token, TokenKind, lex},
    operation::{Operation, Region},
    verifier::verify,
};

/// The input could not be turned into a valid module.
///
/// The details have already been emitted as diagnostics through the
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse input")]
pub struct ParseError;

/// Parse `source` into a verified `module` operation.
pub fn parse(source: &str, ctx: &Context<'_>) -> Result<Operation, ParseError> {
    let module = lex(source)
        .and_then(|tokens| Parser::new(tokens, ctx).module())
        .map_err(|diagnostic| {
            ctx.emit(diagnostic);
            ParseError
        })?;

    let violations = verify(&module, ctx);
    if !violations.is_empty() {
        tracing::debug!(count = violations.len(), "parsed module failed verification");
        for diagnostic in violations {
            ctx.emit(diagnostic);
        }
        return Err(ParseError);
    }

    tracing::debug!(ops = module.nested_len(), "parsed module");
    Ok(module)
}

type PResult<T> = Result<T, Diagnostic>;

struct Parser<'c, 's> {
    tokens: Vec<Token>,
    pos: usize,
    ctx: &'c Context<'s>,
}

impl<'c, 's> Parser<'c, 's> {
    fn new(tokens: Vec<Token>, ctx: &'c Context<'s>) -> Self {
        Self {
            tokens,
            pos: 0,
            ctx,
        }
    }

    fn peek(&self) -> &Token {
        // `lex` always ends the stream with `Eof`, and `advance` never moves
        // past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn unexpected(&self, wanted: &str) -> Diagnostic {
        let token = self.peek();
        Diagnostic::error(
            token.location,
            format!("expected {wanted}, found {}", token.kind.describe()),
        )
    }

    fn module(mut self) -> PResult<Operation> {
        let mut module = Operation::module();
        let mut operations = Vec::new();
        while !self.check(&TokenKind::Eof) {
            operations.push(self.operation()?);
        }
        module.regions[0].operations = operations;
        Ok(module)
    }

    fn operation(&mut self) -> PResult<Operation> {
        let mut results = Vec::new();
        if matches!(self.peek().kind, TokenKind::Value(_)) {
            results = self.value_list()?;
            self.expect(TokenKind::Equal)?;
        }

        let token = self.advance();
        let mut op = match token.kind {
            TokenKind::Str(name) => self.generic(name, token.location)?,
            TokenKind::Ident(name) => self.custom(name, token.location)?,
            _ => {
                return Err(Diagnostic::error(
                    token.location,
                    format!("expected operation, found {}", token.kind.describe()),
                ));
            }
        };
        op.results = results;
        Ok(op)
    }

    fn generic(&mut self, name: String, location: Location) -> PResult<Operation> {
        let registry = self.ctx.dialects();
        if registry.lookup(&name).is_none() {
            let namespace = namespace_of(&name);
            if registry.dialect(namespace).is_some() {
                return Err(Diagnostic::error(location, format!("unknown op '{name}'")));
            }
            if !self.ctx.allows_unregistered() {
                return Err(Diagnostic::error(
                    location,
                    format!(
                        "op '{name}' belongs to unregistered dialect '{namespace}' \
                         (pass --allow-unregistered to accept it)"
                    ),
                ));
            }
        }

        let mut op = Operation::new(name, location);
        self.expect(TokenKind::LParen)?;
        op.operands = self.value_list_until(&TokenKind::RParen)?;
        self.expect(TokenKind::RParen)?;

        if self.check(&TokenKind::LBrace) {
            op.attributes = self.attr_dict()?;
        }
        if self.eat(&TokenKind::LParen) {
            loop {
                op.regions.push(self.region()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        Ok(op)
    }

    fn custom(&mut self, name: String, location: Location) -> PResult<Operation> {
        let Some(definition) = self.ctx.dialects().lookup(&name) else {
            return Err(Diagnostic::error(location, format!("unknown op '{name}'")));
        };
        let syntax = definition.syntax;
        let mut op = Operation::new(name, location);

        match syntax {
            Syntax::Generic => {
                return Err(Diagnostic::error(
                    location,
                    format!("'{}' op must be written in generic form", op.name),
                ));
            }
            Syntax::Function => self.function_body(&mut op)?,
            Syntax::Operands => {
                if let TokenKind::Value(_) = self.peek().kind
                    && self.peek().location.line() == location.line()
                {
                    op.operands = self.value_list()?;
                }
                self.trailing_attrs(&mut op)?;
            }
            Syntax::Constant => {
                let value = self.literal().ok_or_else(|| self.unexpected("a literal"))?;
                op.attributes.insert(builtin::VALUE.to_string(), value);
                self.trailing_attrs(&mut op)?;
            }
            Syntax::Call => {
                let callee = self.symbol()?;
                op.attributes
                    .insert(builtin::CALLEE.to_string(), Attribute::Symbol(callee));
                self.expect(TokenKind::LParen)?;
                op.operands = self.value_list_until(&TokenKind::RParen)?;
                self.expect(TokenKind::RParen)?;
                self.trailing_attrs(&mut op)?;
            }
        }
        Ok(op)
    }

    /// `[private] @name(%args) [attributes {...}] { ops }`
    fn function_body(&mut self, op: &mut Operation) -> PResult<()> {
        let private = matches!(&self.peek().kind, TokenKind::Ident(word) if word == "private");
        if private {
            self.advance();
        }

        let name = self.symbol()?;
        op.attributes
            .insert(builtin::SYM_NAME.to_string(), Attribute::Str(name));
        if private {
            op.attributes.insert(
                builtin::SYM_VISIBILITY.to_string(),
                Attribute::Str("private".to_string()),
            );
        }

        self.expect(TokenKind::LParen)?;
        let arguments = self.value_list_until(&TokenKind::RParen)?;
        self.expect(TokenKind::RParen)?;

        if matches!(&self.peek().kind, TokenKind::Ident(word) if word == "attributes") {
            self.advance();
            for (key, value) in self.attr_dict()? {
                op.attributes.insert(key, value);
            }
        }

        self.expect(TokenKind::LBrace)?;
        let mut body = Region::new(arguments);
        body.operations = self.operations_until_rbrace()?;
        op.regions.push(body);
        Ok(())
    }

    fn trailing_attrs(&mut self, op: &mut Operation) -> PResult<()> {
        if self.check(&TokenKind::LBrace) {
            for (key, value) in self.attr_dict()? {
                op.attributes.insert(key, value);
            }
        }
        Ok(())
    }

    /// `{ [^(%args):] ops }`
    fn region(&mut self) -> PResult<Region> {
        self.expect(TokenKind::LBrace)?;
        let mut region = Region::default();
        if self.eat(&TokenKind::Caret) {
            self.expect(TokenKind::LParen)?;
            region.arguments = self.value_list_until(&TokenKind::RParen)?;
            self.expect(TokenKind::RParen)?;
            self.expect(TokenKind::Colon)?;
        }
        region.operations = self.operations_until_rbrace()?;
        Ok(region)
    }

    fn operations_until_rbrace(&mut self) -> PResult<Vec<Operation>> {
        let mut operations = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            operations.push(self.operation()?);
        }
        Ok(operations)
    }

    /// `{ key [= literal], ... }`
    fn attr_dict(&mut self) -> PResult<Attributes> {
        self.expect(TokenKind::LBrace)?;
        let mut attributes = Attributes::new();
        if self.eat(&TokenKind::RBrace) {
            return Ok(attributes);
        }
        loop {
            let token = self.advance();
            let TokenKind::Ident(key) = token.kind else {
                return Err(Diagnostic::error(
                    token.location,
                    format!("expected attribute name, found {}", token.kind.describe()),
                ));
            };
            let value = if self.eat(&TokenKind::Equal) {
                self.literal()
                    .or_else(|| self.symbol().ok().map(Attribute::Symbol))
                    .ok_or_else(|| self.unexpected("an attribute value"))?
            } else {
                Attribute::Unit
            };
            if attributes.insert(key.clone(), value).is_some() {
                return Err(Diagnostic::error(
                    token.location,
                    format!("duplicate attribute '{key}'"),
                ));
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(attributes)
    }

    /// Consume an integer, string or boolean literal if one is next.
    fn literal(&mut self) -> Option<Attribute> {
        let attribute = match &self.peek().kind {
            TokenKind::Int(v) => Attribute::Int(*v),
            TokenKind::Str(s) => Attribute::Str(s.clone()),
            TokenKind::Ident(word) if word == "true" => Attribute::Bool(true),
            TokenKind::Ident(word) if word == "false" => Attribute::Bool(false),
            _ => return None,
        };
        self.advance();
        Some(attribute)
    }

    fn symbol(&mut self) -> PResult<String> {
        if let TokenKind::Symbol(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("a symbol name"))
        }
    }

    fn value(&mut self) -> PResult<String> {
        if let TokenKind::Value(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("a value name"))
        }
    }

    /// One or more comma-separated values.
    fn value_list(&mut self) -> PResult<Vec<String>> {
        let mut values = vec![self.value()?];
        while self.eat(&TokenKind::Comma) {
            values.push(self.value()?);
        }
        Ok(values)
    }

    /// Zero or more comma-separated values, stopping before `close`.
    fn value_list_until(&mut self, close: &TokenKind) -> PResult<Vec<String>> {
        if self.check(close) {
            return Ok(Vec::new());
        }
        self.value_list()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{context::ContextOptions, dialect::DialectRegistry};

    fn parse_with(
        src: &str,
        options: ContextOptions,
    ) -> (Result<Operation, ParseError>, Vec<Diagnostic>) {
        let mut sink: Vec<Diagnostic> = Vec::new();
        let result = {
            let ctx = Context::new(Arc::new(DialectRegistry::with_defaults()), options, &mut sink);
            parse(src, &ctx)
        };
        (result, sink)
    }

    fn parse_ok(src: &str) -> Operation {
        let (result, diagnostics) = parse_with(src, ContextOptions::default());
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        result.unwrap()
    }

    fn parse_err(src: &str) -> Vec<Diagnostic> {
        let (result, diagnostics) = parse_with(src, ContextOptions::default());
        assert_eq!(result, Err(ParseError));
        diagnostics
    }

    #[test]
    fn test_function_with_body() {
        let module = parse_ok(
            "func @f(%a, %b) {\n  %0 = add %a, %b\n  %1 = const 3\n  return %0\n}\n",
        );
        let func = &module.body().unwrap().operations[0];
        assert_eq!(func.symbol_name(), Some("f"));
        let body = func.body().unwrap();
        assert_eq!(body.arguments, ["a", "b"]);
        assert_eq!(body.operations.len(), 3);
        assert_eq!(body.operations[0].operands, ["a", "b"]);
        assert_eq!(body.operations[1].attribute("value"), Some(&Attribute::Int(3)));
        assert_eq!(body.operations[2].location, Location::new(4, 3));
    }

    #[test]
    fn test_operands_stay_on_the_op_line() {
        let module = parse_ok(
            "func @f() {\n  %0 = test.source\n  test.sink\n  %1 = test.source\n  return\n}",
        );
        let body = module.body().unwrap().operations[0].body().unwrap();
        assert!(body.operations[1].operands.is_empty());
        assert_eq!(body.operations[2].results, ["1"]);
    }

    #[test]
    fn test_private_function_and_attributes() {
        let module = parse_ok("func private @g() attributes {inline, cost = 2} {}");
        let func = &module.body().unwrap().operations[0];
        assert!(func.is_private());
        assert_eq!(func.attribute("inline"), Some(&Attribute::Unit));
        assert_eq!(func.attribute("cost"), Some(&Attribute::Int(2)));
    }

    #[test]
    fn test_generic_form() {
        let module = parse_ok(
            "\"func\"() {sym_name = \"f\"} ({ ^(%x):\n  \"test.sink\"(%x) {tag = @f}\n  \"return\"()\n})",
        );
        let func = &module.body().unwrap().operations[0];
        assert_eq!(func.symbol_name(), Some("f"));
        let body = func.body().unwrap();
        assert_eq!(body.arguments, ["x"]);
        assert_eq!(
            body.operations[0].attribute("tag"),
            Some(&Attribute::Symbol("f".into()))
        );
    }

    #[test]
    fn test_call() {
        let module = parse_ok(
            "func @g(%x) {\n  return\n}\nfunc @f() {\n  %0 = test.source\n  call @g(%0)\n  return\n}",
        );
        let f = &module.body().unwrap().operations[1];
        let call = &f.body().unwrap().operations[1];
        assert_eq!(call.attribute("callee"), Some(&Attribute::Symbol("g".into())));
        assert_eq!(call.operands, ["0"]);
    }

    #[test]
    fn test_unknown_custom_op() {
        let diagnostics = parse_err("\nop.bad()");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "unknown op 'op.bad'");
        assert_eq!(diagnostics[0].location, Location::new(2, 1));
    }

    #[test]
    fn test_unregistered_dialect_policy() {
        let src = "%0 = \"foo.bar\"() {k = 1}";
        let diagnostics = parse_err(src);
        assert!(diagnostics[0].message.contains("unregistered dialect 'foo'"));

        let (result, diagnostics) = parse_with(
            src,
            ContextOptions {
                allow_unregistered: true,
                ..ContextOptions::default()
            },
        );
        assert!(diagnostics.is_empty());
        assert_eq!(result.unwrap().body().unwrap().operations[0].name, "foo.bar");
    }

    #[test]
    fn test_unknown_op_in_registered_dialect() {
        let (_, diagnostics) = parse_with(
            "\"test.bogus\"()",
            ContextOptions {
                allow_unregistered: true,
                ..ContextOptions::default()
            },
        );
        assert_eq!(diagnostics[0].message, "unknown op 'test.bogus'");
    }

    #[test]
    fn test_first_syntax_error_stops_parsing() {
        let diagnostics = parse_err("func @f( {\n}\nop.bad()");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "expected a value name, found '{'");
    }

    #[test]
    fn test_unclosed_region() {
        let diagnostics = parse_err("func @f() {\n  return\n");
        assert_eq!(diagnostics[0].message, "expected '}', found end of input");
    }

    #[test]
    fn test_verifier_runs_after_parse() {
        let diagnostics = parse_err("func @f() {\n  %0 = add %x, %x\n  return\n}");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "use of undefined value '%x'");
        assert_eq!(diagnostics[0].location, Location::new(2, 8));
    }
}
