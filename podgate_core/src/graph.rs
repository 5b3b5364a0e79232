//! A minimal RDF graph.
//!
//! Authorization documents are small, so the graph is a plain ordered list of
//! triples with linear-scan matching. Insertion order is preserved so that
//! serialized output is stable.

pub mod sparql;
pub mod turtle;

use derive_more::Display;
use dupe::Dupe;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// An RDF term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Iri(Iri),
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    pub fn iri<S: AsRef<str>>(iri: S) -> Self {
        Term::Iri(Iri::new(iri))
    }

    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn is_iri(&self, iri: &str) -> bool {
        matches!(self, Term::Iri(i) if i.as_str() == iri)
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Term::Iri(iri)
    }
}

impl From<&Iri> for Term {
    fn from(iri: &Iri) -> Self {
        Term::Iri(iri.dupe())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", escape_iri(iri.as_str())),
            Term::BlankNode(label) => write!(f, "_:{label}"),
            Term::Literal(literal) => literal.fmt(f),
        }
    }
}

/// An absolute IRI. Cheap to clone.
#[derive(Debug, Display, Clone, Dupe, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Iri(Arc<str>);

impl Iri {
    pub fn new<S: AsRef<str>>(iri: S) -> Self {
        Iri(Arc::from(iri.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&url::Url> for Iri {
    fn from(url: &url::Url) -> Self {
        Iri::new(url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,
    pub annotation: LiteralAnnotation,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LiteralAnnotation {
    Plain,
    Language(String),
    Datatype(Iri),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_string(&self.lexical))?;
        match &self.annotation {
            LiteralAnnotation::Plain => Ok(()),
            LiteralAnnotation::Language(tag) => write!(f, "@{tag}"),
            LiteralAnnotation::Datatype(iri) => write!(f, "^^<{}>", escape_iri(iri.as_str())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Iri,
    pub object: Term,
}

impl Triple {
    pub fn new<S: Into<Term>, O: Into<Term>>(subject: S, predicate: &str, object: O) -> Self {
        Triple {
            subject: subject.into(),
            predicate: Iri::new(predicate),
            object: object.into(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {} .",
            self.subject,
            escape_iri(self.predicate.as_str()),
            self.object
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    triples: Vec<Triple>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    /// Adds a triple unless an identical one is already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.triples.contains(&triple) {
            return false;
        }
        self.triples.push(triple);
        true
    }

    pub fn remove(&mut self, triple: &Triple) -> bool {
        let before = self.triples.len();
        self.triples.retain(|t| t != triple);
        before != self.triples.len()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// All triples with the given subject, in document order.
    pub fn about<'a>(&'a self, subject: &'a Term) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples.iter().filter(move |t| &t.subject == subject)
    }

    /// Objects of `(subject, predicate, ?)`.
    pub fn objects<'a>(
        &'a self,
        subject: &'a Term,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.triples
            .iter()
            .filter(move |t| &t.subject == subject && t.predicate.as_str() == predicate)
            .map(|t| &t.object)
    }

    /// Subjects of `(?, predicate, object)`.
    pub fn subjects<'a>(
        &'a self,
        predicate: &'a str,
        object: &'a Term,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.triples
            .iter()
            .filter(move |t| t.predicate.as_str() == predicate && &t.object == object)
            .map(|t| &t.subject)
    }

    /// Distinct subjects declared with `rdf:type <class>`.
    pub fn instances_of(&self, class: &str) -> Vec<Term> {
        let class = Term::iri(class);
        let mut found: Vec<Term> = Vec::new();
        for subject in self.subjects(crate::vocab::rdf::TYPE, &class) {
            if !found.contains(subject) {
                found.push(subject.clone());
            }
        }
        found
    }

    pub fn has_subject(&self, subject: &Term) -> bool {
        self.triples.iter().any(|t| &t.subject == subject)
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut graph = Graph::new();
        for triple in iter {
            graph.insert(triple);
        }
        graph
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        for triple in iter {
            self.insert(triple);
        }
    }
}

impl IntoIterator for Graph {
    type Item = Triple;
    type IntoIter = std::vec::IntoIter<Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.into_iter()
    }
}

pub(crate) fn escape_iri(iri: &str) -> String {
    let mut out = String::with_capacity(iri.len());
    for c in iri.chars() {
        match c {
            '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' | ' ' => {
                out.push_str(&format!("\\u{:04X}", c as u32))
            }
            c if (c as u32) <= 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
