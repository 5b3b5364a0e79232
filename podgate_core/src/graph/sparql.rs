//! `application/sparql-update` patches.
//!
//! Only the `DELETE DATA` / `INSERT DATA` forms are produced. Every term is
//! written out in full so the remote store can match deleted triples exactly.

use super::{
    turtle::{ParseError, Parser},
    Triple,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePatch {
    pub delete: Vec<Triple>,
    pub insert: Vec<Triple>,
}

impl UpdatePatch {
    pub fn new() -> Self {
        UpdatePatch::default()
    }

    pub fn delete(&mut self, triple: Triple) {
        if !self.delete.contains(&triple) {
            self.delete.push(triple);
        }
    }

    pub fn insert(&mut self, triple: Triple) {
        if !self.insert.contains(&triple) {
            self.insert.push(triple);
        }
    }

    pub fn insert_all<I: IntoIterator<Item = Triple>>(&mut self, triples: I) {
        for triple in triples {
            self.insert(triple);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.insert.is_empty()
    }

    /// Serializes the patch, `DELETE DATA` first.
    pub fn to_sparql(&self) -> String {
        let mut out = String::new();
        for (keyword, triples) in [("DELETE", &self.delete), ("INSERT", &self.insert)] {
            if triples.is_empty() {
                continue;
            }
            out.push_str(keyword);
            out.push_str(" DATA {\n");
            for triple in triples {
                out.push_str("  ");
                out.push_str(&triple.to_string());
                out.push('\n');
            }
            out.push_str("};\n");
        }
        out
    }

    /// Parses a patch made of `DELETE DATA` and `INSERT DATA` operations.
    ///
    /// Triples must use absolute IRIs (or prefixes declared with `PREFIX`).
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let mut parser = Parser::new(input, None);
        let mut patch = UpdatePatch::new();

        loop {
            parser.skip_ws();
            if parser.at_eof() {
                return Ok(patch);
            }
            if parser.try_directive()? {
                continue;
            }

            let is_delete = if parser.eat_keyword("DELETE") {
                true
            } else if parser.eat_keyword("INSERT") {
                false
            } else {
                return Err(parser.error("expected DELETE DATA or INSERT DATA"));
            };

            parser.skip_ws();
            if !parser.eat_keyword("DATA") {
                return Err(parser.error("only DATA operations are supported"));
            }
            parser.skip_ws();
            parser.expect('{')?;

            loop {
                parser.skip_ws();
                if parser.peek() == Some('}') {
                    parser.bump();
                    break;
                }
                parser.parse_triples()?;
                parser.skip_ws();
                match parser.peek() {
                    Some('.') => {
                        parser.bump();
                    }
                    Some('}') => {}
                    _ => return Err(parser.error("expected '.' or '}'")),
                }
            }

            let triples: Vec<Triple> = std::mem::take(&mut parser.graph).into_iter().collect();
            for triple in triples {
                if is_delete {
                    patch.delete(triple);
                } else {
                    patch.insert(triple);
                }
            }

            parser.skip_ws();
            if parser.peek() == Some(';') {
                parser.bump();
            }
        }
    }
}

impl std::fmt::Display for UpdatePatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sparql())
    }
}
