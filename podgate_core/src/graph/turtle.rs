//! Turtle reading and writing.
//!
//! The reader covers the parts of Turtle that storage providers emit for
//! authorization documents and container listings: `@prefix`/`PREFIX`,
//! `@base`/`BASE`, IRIs (relative ones are resolved against the base),
//! prefixed names, `a`, blank node labels, `[ ... ]` property lists, and
//! string/numeric/boolean literals. RDF collections are rejected.
//!
//! The writer groups triples by subject and compacts well-known vocabulary
//! IRIs to prefixed names.

use super::{escape_iri, Graph, Iri, Literal, LiteralAnnotation, Term, Triple};
use crate::vocab::{acl, acp, foaf, ldp, rdf};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

// Labelled and anonymous blank nodes live in separate label spaces.
const LABELLED_PREFIX: &str = "b";
const ANONYMOUS_PREFIX: &str = "g";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Parses a Turtle document, resolving relative IRIs against `base`.
pub fn parse(input: &str, base: Option<&Url>) -> Result<Graph, ParseError> {
    let mut parser = Parser::new(input, base);
    parser.parse_document()?;
    Ok(parser.graph)
}

pub(crate) struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    base: Option<Url>,
    prefixes: HashMap<String, String>,
    anon_counter: usize,
    pub(crate) graph: Graph,
}

impl Parser {
    pub(crate) fn new(input: &str, base: Option<&Url>) -> Self {
        Parser {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            base: base.cloned(),
            prefixes: HashMap::new(),
            anon_counter: 0,
            graph: Graph::new(),
        }
    }

    fn parse_document(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_ws();
            if self.at_eof() {
                return Ok(());
            }

            if !self.try_directive()? {
                self.parse_triples()?;
                self.skip_ws();
                self.expect('.')?;
            }
        }
    }

    /// Parses `@prefix`, `@base`, `PREFIX` or `BASE` if one starts here.
    pub(crate) fn try_directive(&mut self) -> Result<bool, ParseError> {
        if self.peek() == Some('@') {
            self.bump();
            let keyword = self.read_while(|c| c.is_ascii_alphabetic());
            match keyword.as_str() {
                "prefix" => self.parse_prefix_body()?,
                "base" => self.parse_base_body()?,
                other => return Err(self.error(format!("unknown directive @{other}"))),
            }
            self.skip_ws();
            self.expect('.')?;
            return Ok(true);
        }

        if self.eat_keyword("PREFIX") {
            self.parse_prefix_body()?;
            return Ok(true);
        }

        if self.eat_keyword("BASE") {
            self.parse_base_body()?;
            return Ok(true);
        }

        Ok(false)
    }

    fn parse_prefix_body(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        let prefix = self.read_while(is_name_char);
        self.expect(':')?;
        self.skip_ws();
        self.expect('<')?;
        let iri = self.read_iri_ref()?;
        self.prefixes.insert(prefix, iri);
        Ok(())
    }

    fn parse_base_body(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        self.expect('<')?;
        let iri = self.read_iri_ref()?;
        let base = Url::parse(&iri).map_err(|e| self.error(format!("invalid base IRI: {e}")))?;
        self.base = Some(base);
        Ok(())
    }

    pub(crate) fn parse_triples(&mut self) -> Result<(), ParseError> {
        if self.peek() == Some('[') {
            let subject = self.parse_blank_node_property_list()?;
            self.skip_ws();
            if !matches!(self.peek(), Some('.') | Some('}') | None) {
                self.parse_predicate_object_list(&subject)?;
            }
            return Ok(());
        }

        let subject = self.parse_subject()?;
        self.parse_predicate_object_list(&subject)
    }

    fn parse_subject(&mut self) -> Result<Term, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some('<') => {
                self.bump();
                Ok(Term::Iri(self.resolved_iri_ref()?))
            }
            Some('_') if self.peek_at(1) == Some(':') => self.parse_blank_label(),
            Some('(') => Err(self.error("RDF collections are not supported")),
            Some(_) => Ok(Term::Iri(self.parse_prefixed_name()?)),
            None => Err(self.error("unexpected end of input, expected subject")),
        }
    }

    fn parse_predicate_object_list(&mut self, subject: &Term) -> Result<(), ParseError> {
        loop {
            let predicate = self.parse_verb()?;
            self.parse_object_list(subject, &predicate)?;
            self.skip_ws();

            if self.peek() != Some(';') {
                return Ok(());
            }

            while self.peek() == Some(';') {
                self.bump();
                self.skip_ws();
            }

            if matches!(self.peek(), Some('.') | Some(']') | Some('}') | None) {
                return Ok(());
            }
        }
    }

    fn parse_object_list(&mut self, subject: &Term, predicate: &Iri) -> Result<(), ParseError> {
        loop {
            let object = self.parse_object()?;
            self.graph.insert(Triple {
                subject: subject.clone(),
                predicate: predicate.clone(),
                object,
            });

            self.skip_ws();
            if self.peek() == Some(',') {
                self.bump();
            } else {
                return Ok(());
            }
        }
    }

    fn parse_verb(&mut self) -> Result<Iri, ParseError> {
        self.skip_ws();
        if self.peek() == Some('a')
            && self
                .peek_at(1)
                .map_or(true, |c| !is_name_char(c) && c != ':')
        {
            self.bump();
            return Ok(Iri::new(rdf::TYPE));
        }

        match self.peek() {
            Some('<') => {
                self.bump();
                self.resolved_iri_ref()
            }
            Some(_) => self.parse_prefixed_name(),
            None => Err(self.error("unexpected end of input, expected predicate")),
        }
    }

    fn parse_object(&mut self) -> Result<Term, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some('<') => {
                self.bump();
                Ok(Term::Iri(self.resolved_iri_ref()?))
            }
            Some('_') if self.peek_at(1) == Some(':') => self.parse_blank_label(),
            Some('[') => self.parse_blank_node_property_list(),
            Some('"') | Some('\'') => self.parse_string_literal(),
            Some('(') => Err(self.error("RDF collections are not supported")),
            Some(c) if c.is_ascii_digit() || c == '+' || c == '-' => self.parse_numeric_literal(),
            Some('.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.parse_numeric_literal()
            }
            Some(_) => {
                for keyword in ["true", "false"] {
                    if self.eat_exact_word(keyword) {
                        return Ok(Term::Literal(Literal {
                            lexical: keyword.to_string(),
                            annotation: LiteralAnnotation::Datatype(Iri::new(XSD_BOOLEAN)),
                        }));
                    }
                }
                Ok(Term::Iri(self.parse_prefixed_name()?))
            }
            None => Err(self.error("unexpected end of input, expected object")),
        }
    }

    fn parse_blank_node_property_list(&mut self) -> Result<Term, ParseError> {
        self.expect('[')?;
        let node = self.fresh_blank_node();
        self.skip_ws();
        if self.peek() != Some(']') {
            self.parse_predicate_object_list(&node)?;
            self.skip_ws();
        }
        self.expect(']')?;
        Ok(node)
    }

    fn parse_blank_label(&mut self) -> Result<Term, ParseError> {
        self.expect('_')?;
        self.expect(':')?;
        let label = self.read_name();
        if label.is_empty() {
            return Err(self.error("empty blank node label"));
        }
        Ok(Term::BlankNode(format!("{LABELLED_PREFIX}{label}")))
    }

    /// A node for `[ ... ]`. Its label cannot equal any labelled node's,
    /// whatever labels the document uses.
    fn fresh_blank_node(&mut self) -> Term {
        self.anon_counter += 1;
        Term::BlankNode(format!("{ANONYMOUS_PREFIX}{}", self.anon_counter))
    }

    fn parse_prefixed_name(&mut self) -> Result<Iri, ParseError> {
        let prefix = self.read_while(is_name_char);
        if self.peek() != Some(':') {
            return Err(self.error(format!("expected prefixed name, found {prefix:?}")));
        }
        self.bump();
        let local = self.read_name();

        let namespace = self
            .prefixes
            .get(&prefix)
            .ok_or_else(|| self.error(format!("undeclared prefix {prefix:?}")))?;
        Ok(Iri::new(format!("{namespace}{local}")))
    }

    fn parse_string_literal(&mut self) -> Result<Term, ParseError> {
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let long = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if long {
            self.bump();
            self.bump();
        }

        let mut lexical = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error("unterminated string literal"))?;

            if c == quote {
                if !long {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.bump();
                    self.bump();
                    break;
                }
                lexical.push(c);
                continue;
            }

            match c {
                '\\' => lexical.push(self.read_escape()?),
                '\n' | '\r' if !long => return Err(self.error("newline in string literal")),
                c => lexical.push(c),
            }
        }

        let annotation = match self.peek() {
            Some('@') => {
                self.bump();
                let tag = self.read_while(|c| c.is_ascii_alphanumeric() || c == '-');
                if tag.is_empty() {
                    return Err(self.error("empty language tag"));
                }
                LiteralAnnotation::Language(tag)
            }
            Some('^') if self.peek_at(1) == Some('^') => {
                self.bump();
                self.bump();
                let datatype = if self.peek() == Some('<') {
                    self.bump();
                    self.resolved_iri_ref()?
                } else {
                    self.parse_prefixed_name()?
                };
                LiteralAnnotation::Datatype(datatype)
            }
            _ => LiteralAnnotation::Plain,
        };

        Ok(Term::Literal(Literal {
            lexical,
            annotation,
        }))
    }

    fn parse_numeric_literal(&mut self) -> Result<Term, ParseError> {
        let mut lexical = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            self.bump();
            lexical.push(sign);
        }
        lexical.push_str(&self.read_while(|c| c.is_ascii_digit()));

        let mut datatype = XSD_INTEGER;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            lexical.push('.');
            lexical.push_str(&self.read_while(|c| c.is_ascii_digit()));
            datatype = XSD_DECIMAL;
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            lexical.push(self.bump().unwrap_or('e'));
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.bump();
                lexical.push(sign);
            }
            lexical.push_str(&self.read_while(|c| c.is_ascii_digit()));
            datatype = XSD_DOUBLE;
        }

        if !lexical.chars().any(|c| c.is_ascii_digit()) {
            return Err(self.error("malformed numeric literal"));
        }

        Ok(Term::Literal(Literal {
            lexical,
            annotation: LiteralAnnotation::Datatype(Iri::new(datatype)),
        }))
    }

    fn read_escape(&mut self) -> Result<char, ParseError> {
        let c = self
            .bump()
            .ok_or_else(|| self.error("unterminated escape"))?;
        match c {
            't' => Ok('\t'),
            'b' => Ok('\u{8}'),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            'f' => Ok('\u{c}'),
            '"' | '\'' | '\\' => Ok(c),
            'u' => self.read_hex_char(4),
            'U' => self.read_hex_char(8),
            other => Err(self.error(format!("invalid escape \\{other}"))),
        }
    }

    fn read_hex_char(&mut self, len: usize) -> Result<char, ParseError> {
        let mut hex = String::with_capacity(len);
        for _ in 0..len {
            hex.push(
                self.bump()
                    .ok_or_else(|| self.error("truncated unicode escape"))?,
            );
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("invalid unicode escape {hex}")))
    }

    /// Reads an IRI reference; the opening `<` has been consumed.
    fn read_iri_ref(&mut self) -> Result<String, ParseError> {
        let mut iri = String::new();
        loop {
            match self.bump() {
                Some('>') => return Ok(iri),
                Some('\\') => match self.bump() {
                    Some('u') => iri.push(self.read_hex_char(4)?),
                    Some('U') => iri.push(self.read_hex_char(8)?),
                    _ => return Err(self.error("invalid escape in IRI")),
                },
                Some(c) if c.is_whitespace() => {
                    return Err(self.error("whitespace in IRI"));
                }
                Some(c) => iri.push(c),
                None => return Err(self.error("unterminated IRI")),
            }
        }
    }

    fn resolved_iri_ref(&mut self) -> Result<Iri, ParseError> {
        let raw = self.read_iri_ref()?;
        self.resolve(&raw)
    }

    fn resolve(&self, raw: &str) -> Result<Iri, ParseError> {
        if has_scheme(raw) {
            return Ok(Iri::new(raw));
        }

        let base = self
            .base
            .as_ref()
            .ok_or_else(|| self.error(format!("relative IRI <{raw}> without a base")))?;
        base.join(raw)
            .map(|url| Iri::new(url.as_str()))
            .map_err(|e| self.error(format!("cannot resolve <{raw}>: {e}")))
    }

    /// Reads a local name or blank node label, leaving a trailing `.` alone.
    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) || c == ':' || c == '.' {
                name.push(c);
                self.bump();
            } else if c == '%' {
                name.push(c);
                self.bump();
            } else if c == '\\' {
                self.bump();
                if let Some(escaped) = self.bump() {
                    name.push(escaped);
                }
            } else {
                break;
            }
        }

        while name.ends_with('.') {
            name.pop();
            self.unbump();
        }
        name
    }

    pub(crate) fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Consumes a case-insensitive keyword followed by a non-name character.
    pub(crate) fn eat_keyword(&mut self, keyword: &str) -> bool {
        let len = keyword.chars().count();
        let candidate: String = self.chars[self.pos..].iter().take(len).collect();
        if !candidate.eq_ignore_ascii_case(keyword) {
            return false;
        }
        if self.peek_at(len).is_some_and(|c| is_name_char(c) || c == ':') {
            return false;
        }
        for _ in 0..len {
            self.bump();
        }
        true
    }

    fn eat_exact_word(&mut self, word: &str) -> bool {
        let len = word.chars().count();
        let candidate: String = self.chars[self.pos..].iter().take(len).collect();
        if candidate != word || self.peek_at(len).is_some_and(|c| is_name_char(c) || c == ':') {
            return false;
        }
        for _ in 0..len {
            self.bump();
        }
        true
    }

    pub(crate) fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn read_while<F: Fn(char) -> bool>(&mut self, pred: F) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    // Only used to give back '.' characters, which never change the line.
    fn unbump(&mut self) {
        self.pos -= 1;
        self.column -= 1;
    }

    pub(crate) fn error<S: Into<String>>(&self, message: S) -> ParseError {
        ParseError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn has_scheme(iri: &str) -> bool {
    let mut chars = iri.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    for c in chars {
        match c {
            ':' => return true,
            c if c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.' => {}
            _ => return false,
        }
    }
    false
}

const PREFIXES: [(&str, &str); 5] = [
    ("acl", acl::NS),
    ("acp", acp::NS),
    ("foaf", foaf::NS),
    ("ldp", ldp::NS),
    ("rdf", rdf::NS),
];

/// Serializes a graph as Turtle.
pub fn serialize(graph: &Graph) -> String {
    let used: Vec<(&str, &str)> = PREFIXES
        .iter()
        .copied()
        .filter(|(_, ns)| {
            graph.iter().any(|t| {
                t.predicate.as_str().starts_with(ns)
                    || t.object.as_iri().is_some_and(|o| o.as_str().starts_with(ns))
            })
        })
        .collect();

    let mut out = String::new();
    for (prefix, ns) in &used {
        out.push_str(&format!("@prefix {prefix}: <{ns}>.\n"));
    }

    let mut subjects: Vec<&Term> = Vec::new();
    for triple in graph.iter() {
        if !subjects.contains(&&triple.subject) {
            subjects.push(&triple.subject);
        }
    }

    for subject in subjects {
        out.push('\n');
        out.push_str(&subject.to_string());

        let mut predicates: Vec<&Iri> = Vec::new();
        for triple in graph.about(subject) {
            if !predicates.contains(&&triple.predicate) {
                predicates.push(&triple.predicate);
            }
        }

        for (i, predicate) in predicates.iter().enumerate() {
            let separator = if i == 0 { "\n    " } else { ";\n    " };
            out.push_str(separator);
            out.push_str(&compact_predicate(predicate, &used));
            let objects: Vec<String> = graph
                .objects(subject, predicate.as_str())
                .map(|o| compact_term(o, &used))
                .collect();
            out.push(' ');
            out.push_str(&objects.join(", "));
        }
        out.push_str(".\n");
    }

    out
}

fn compact_predicate(predicate: &Iri, prefixes: &[(&str, &str)]) -> String {
    if predicate.as_str() == rdf::TYPE {
        return "a".to_string();
    }
    compact_iri(predicate, prefixes)
}

fn compact_term(term: &Term, prefixes: &[(&str, &str)]) -> String {
    match term {
        Term::Iri(iri) => compact_iri(iri, prefixes),
        other => other.to_string(),
    }
}

fn compact_iri(iri: &Iri, prefixes: &[(&str, &str)]) -> String {
    for (prefix, ns) in prefixes {
        if let Some(local) = iri.as_str().strip_prefix(ns) {
            if !local.is_empty() && local.chars().all(is_name_char) {
                return format!("{prefix}:{local}");
            }
        }
    }
    format!("<{}>", escape_iri(iri.as_str()))
}
