//! # Flow notation parser
//!
//! Recursive descent over the token stream, building a [`SyntaxTree`] arena.
//!
//! ```text
//! document  := member*
//! member    := property | node
//! property  := IDENT ':' atom                                 (NL | ';')
//! node      := IDENT atom? ('->' atom)? annotation* block?    (NL | ';')
//! annotation:= '@' IDENT ('(' atom (',' atom)* ')')?
//! block     := '{' member* '}'
//! atom      := IDENT | STRING | NUMBER
//! ```
//!
//! The node keyword becomes the type tag (`task` → `Task`). An arrow header
//! `flow A -> B` records `source` and `target` properties instead of a name.
//!
//! Parsing never fails: errors become diagnostics and the parser skips to the
//! next statement boundary, so a partial tree is always returned.

use crate::error::{ParseError, ParseResult};
use crate::quote::unquote;
use crate::tokenizer::{tokenize_with_errors, Spanned, Token};
use std::ops::Range;
use tandem_syntax::{
    Annotation, Atom, Body, Diagnostic, NodeData, NodeIndex, Property, SyntaxTree, TextRange,
};

pub const DOCUMENT_TYPE: &str = "Document";

#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub tree: SyntaxTree,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        tandem_syntax::has_errors(&self.diagnostics)
    }
}

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned<'src>>,
    pos: usize,
    tree: SyntaxTree,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        let (tokens, lexer_errors) = tokenize_with_errors(source);
        Self {
            source,
            tokens,
            pos: 0,
            tree: SyntaxTree::new(DOCUMENT_TYPE, TextRange::new(0, source.len())),
            errors: lexer_errors.into_iter().map(ParseError::lexer_error).collect(),
        }
    }

    pub fn parse(mut self) -> ParseOutput {
        self.parse_members(SyntaxTree::ROOT, None);

        let mut errors = self.errors;
        errors.sort_by_key(|e| e.range().start);
        ParseOutput {
            tree: self.tree,
            diagnostics: errors.iter().map(ParseError::to_diagnostic).collect(),
        }
    }

    /// Parse members into `parent` until EOF or, for a block opened at
    /// `open`, the matching `}`. Returns the end offset of the closing brace.
    fn parse_members(&mut self, parent: NodeIndex, open: Option<usize>) -> Option<usize> {
        loop {
            self.skip_terminators();

            let Some((token, span)) = self.peek().cloned() else {
                if let Some(pos) = open {
                    self.errors.push(ParseError::UnclosedBlock { pos });
                }
                return None;
            };

            let result = match token {
                Token::RBrace if open.is_some() => {
                    self.advance();
                    return Some(span.end);
                }
                Token::RBrace => {
                    self.advance();
                    Err(ParseError::invalid_syntax(span, "unmatched '}'"))
                }
                Token::Ident(_) if matches!(self.peek_ahead(1), Some((Token::Colon, _))) => {
                    self.parse_property(parent)
                }
                Token::Ident(_) => self.parse_node(parent),
                other => Err(ParseError::unexpected_token(
                    span,
                    "a node or property",
                    other.to_string(),
                )),
            };

            if let Err(error) = result {
                self.errors.push(error);
                self.recover();
            }
        }
    }

    fn parse_property(&mut self, parent: NodeIndex) -> ParseResult<()> {
        let (key, key_span) = self.expect_ident()?;
        self.expect(Token::Colon)?;
        let value = self.expect_atom("a property value")?;

        let property = Property {
            key: key.to_string(),
            key_range: key_span.clone().into(),
            range: TextRange::new(key_span.start, value.range.end),
            value,
        };
        if let Some(node) = self.tree.node_mut(parent) {
            node.properties.push(property);
        }
        self.expect_statement_end()
    }

    fn parse_node(&mut self, parent: NodeIndex) -> ParseResult<()> {
        let (keyword, keyword_span) = self.expect_ident()?;

        let mut data = NodeData::new(type_tag_for(keyword), keyword_span.clone().into());
        data.keyword_range = keyword_span.clone().into();
        let mut end = keyword_span.end;

        if self.check_atom_name() {
            let name = self.expect_atom("a name")?;
            end = name.range.end;
            data.name = Some(name);
        }

        if self.check(&Token::Arrow) {
            let arrow = self.advance_span();
            let source = data.name.take().ok_or_else(|| {
                ParseError::invalid_syntax(arrow.clone(), "edge is missing its source")
            })?;
            let target = self.expect_atom("an edge target")?;
            end = target.range.end;
            data.properties.push(reference_property("source", source));
            data.properties.push(reference_property("target", target));
        }

        while self.check(&Token::At) {
            let annotation = self.parse_annotation()?;
            end = annotation.range.end;
            data.annotations.push(annotation);
        }

        data.range = TextRange::new(keyword_span.start, end);
        let index = self.tree.add_node(parent, data);

        if self.check(&Token::LBrace) {
            let open = self.advance_span();
            let close = self.parse_members(index, Some(open.start));
            let body = match close {
                Some(close_end) => Body {
                    range: TextRange::new(open.start, close_end),
                    closed: true,
                },
                None => Body {
                    range: TextRange::new(open.start, self.source.len()),
                    closed: false,
                },
            };
            if let Some(node) = self.tree.node_mut(index) {
                node.range.end = body.range.end;
                node.body = Some(body);
            }
            if close.is_none() {
                return Ok(());
            }
        }

        self.expect_statement_end()
    }

    fn parse_annotation(&mut self) -> ParseResult<Annotation> {
        let at = self.advance_span();
        let (name, name_span) = self.expect_ident()?;
        let mut end = name_span.end;
        let mut args = Vec::new();

        if self.check(&Token::LParen) {
            self.advance();
            if !self.check(&Token::RParen) {
                loop {
                    args.push(self.expect_atom("an annotation argument")?);
                    if !self.match_token(&Token::Comma) {
                        break;
                    }
                }
            }
            end = self.expect(Token::RParen)?.end;
        }

        Ok(Annotation {
            name: name.to_string(),
            args,
            range: TextRange::new(at.start, end),
        })
    }

    fn expect_statement_end(&mut self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some((token, _)) if token.is_terminator() => {
                self.advance();
                Ok(())
            }
            // A closing brace ends the statement without being consumed
            Some((Token::RBrace, _)) => Ok(()),
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.clone(),
                "end of statement",
                token.to_string(),
            )),
        }
    }

    /// Skip to the next statement boundary. Braces are balanced so a broken
    /// header with a block does not leak its members into the parent.
    fn recover(&mut self) {
        let mut depth = 0usize;
        while let Some((token, _)) = self.peek() {
            match token {
                Token::LBrace => depth += 1,
                Token::RBrace if depth == 0 => return,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                token if token.is_terminator() && depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_terminators(&mut self) {
        while matches!(self.peek(), Some((token, _)) if token.is_terminator()) {
            self.advance();
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&Spanned<'src>> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&Spanned<'src>> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&Spanned<'src>> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn advance_span(&mut self) -> Range<usize> {
        self.advance()
            .map(|(_, span)| span.clone())
            .unwrap_or(self.source.len()..self.source.len())
    }

    fn check(&self, token: &Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(token)
        } else {
            false
        }
    }

    fn check_atom_name(&self) -> bool {
        matches!(self.peek(), Some((Token::Ident(_) | Token::String(_), _)))
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<Range<usize>> {
        if self.check(&token) {
            Ok(self.advance_span())
        } else {
            Err(self.unexpected(&format!("'{}'", token)))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<(&'src str, Range<usize>)> {
        match self.peek() {
            Some((Token::Ident(s), span)) => {
                let result = (*s, span.clone());
                self.advance();
                Ok(result)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_atom(&mut self, expected: &str) -> ParseResult<Atom> {
        let atom = match self.peek() {
            Some((Token::Ident(s), span)) | Some((Token::Number(s), span)) => {
                Atom::bare(*s, span.clone().into())
            }
            Some((Token::String(s), span)) => Atom::quoted(unquote(s), span.clone().into()),
            _ => return Err(self.unexpected(expected)),
        };
        self.advance();
        Ok(atom)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some((token, span)) => {
                ParseError::unexpected_token(span.clone(), expected, token.to_string())
            }
            None => ParseError::unexpected_eof(self.source.len(), expected),
        }
    }
}

fn reference_property(key: &str, value: Atom) -> Property {
    Property {
        key: key.to_string(),
        key_range: TextRange::empty(value.range.start),
        range: value.range,
        value,
    }
}

/// `task` → `Task`
pub fn type_tag_for(keyword: &str) -> String {
    let mut chars = keyword.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Task` → `task`
pub fn keyword_for(type_tag: &str) -> String {
    let mut chars = type_tag.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parse flow notation source into a syntax tree plus diagnostics
pub fn parse(source: &str) -> ParseOutput {
    Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_syntax::NodeRef;

    fn names<'t>(nodes: impl Iterator<Item = NodeRef<'t>>) -> Vec<String> {
        nodes
            .map(|n| n.name().map(|a| a.value.clone()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_nested_nodes() {
        let source = "activity Main {\n  task A\n  task \"Review order\"\n}\n";
        let output = parse(source);
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

        let root = output.tree.root();
        let main = root.children().next().unwrap();
        assert_eq!(main.type_tag(), "Activity");
        assert_eq!(main.range(), TextRange::new(0, source.len() - 1));
        assert_eq!(names(main.children()), vec!["A", "Review order"]);

        let review = main.children().nth(1).unwrap();
        let name = review.name().unwrap();
        assert!(name.quoted);
        assert_eq!(&source[name.range.start..name.range.end], "\"Review order\"");
    }

    #[test]
    fn test_properties_and_annotations() {
        let source = "task A @at(10, 20) @size(100, 40) {\n  owner: \"Ops\"\n  priority: 2\n}";
        let output = parse(source);
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

        let a = output.tree.root().children().next().unwrap();
        assert_eq!(a.annotation("at").unwrap().number_args(), vec![10.0, 20.0]);
        assert_eq!(a.annotation("size").unwrap().number_args(), vec![100.0, 40.0]);
        assert_eq!(a.property("owner").unwrap().value.value, "Ops");
        assert_eq!(a.property("priority").unwrap().value.value, "2");
        let body = a.body().unwrap();
        assert!(body.closed);
        assert_eq!(body.close_offset(), Some(source.len() - 1));
    }

    #[test]
    fn test_arrow_edge_records_endpoints() {
        let output = parse("task A\ntask B\nflow A -> B\n");
        let flow = output.tree.root().children().nth(2).unwrap();
        assert_eq!(flow.type_tag(), "Flow");
        assert!(flow.name().is_none());
        assert_eq!(flow.property("source").unwrap().value.value, "A");
        assert_eq!(flow.property("target").unwrap().value.value, "B");
        assert_eq!(flow.property("target").unwrap().value.range, TextRange::new(24, 25));
    }

    #[test]
    fn test_semicolons_separate_statements() {
        let output = parse("task A; task B { task C; task D }");
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        let root = output.tree.root();
        assert_eq!(names(root.children()), vec!["A", "B"]);
        let b = root.children().nth(1).unwrap();
        assert_eq!(names(b.children()), vec!["C", "D"]);
    }

    #[test]
    fn test_recovers_from_bad_statement() {
        let output = parse("task A\ntask B ( oops\ntask C\n");
        assert!(output.has_errors());
        assert_eq!(output.diagnostics[0].code, "unexpected-token");
        assert_eq!(names(output.tree.root().children()), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unclosed_block_still_builds_tree() {
        let source = "activity Main {\n  task A\n";
        let output = parse(source);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, "unclosed-block");

        let main = output.tree.root().children().next().unwrap();
        assert!(!main.body().unwrap().closed);
        assert_eq!(main.range().end, source.len());
        assert_eq!(names(main.children()), vec!["A"]);
    }

    #[test]
    fn test_unmatched_closing_brace() {
        let output = parse("task A\n}\ntask B\n");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(names(output.tree.root().children()), vec!["A", "B"]);
    }

    #[test]
    fn test_lexer_error_becomes_diagnostic() {
        let output = parse("task A\ntask $B\n");
        assert_eq!(output.diagnostics[0].code, "lexer-error");
        assert_eq!(output.diagnostics[0].range, TextRange::new(12, 13));
    }

    #[test]
    fn test_root_properties_attach_to_document() {
        let output = parse("title: Orders\ntask A\n");
        let root = output.tree.root();
        assert_eq!(root.type_tag(), DOCUMENT_TYPE);
        assert_eq!(root.property("title").unwrap().value.value, "Orders");
        assert_eq!(root.children().count(), 1);
    }

    #[test]
    fn test_keyword_type_tag_mapping() {
        assert_eq!(type_tag_for("task"), "Task");
        assert_eq!(keyword_for("Task"), "task");
        assert_eq!(type_tag_for(""), "");
    }
}
