//! `Link` header values.

use url::Url;

/// One link from a `Link` header, with its target resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub target: String,
    pub rel: String,
}

impl Link {
    pub fn new<T: Into<String>, R: Into<String>>(target: T, rel: R) -> Self {
        Link {
            target: target.into(),
            rel: rel.into(),
        }
    }

    /// Parses a `Link` header value.
    ///
    /// A link with several space-separated relation types yields one [`Link`]
    /// per type. Entries without a `rel` parameter, or whose target cannot
    /// be resolved against `base`, are skipped.
    pub fn parse_header(value: &str, base: &Url) -> Vec<Link> {
        let mut links = Vec::new();
        for entry in split_outside_brackets(value, ',') {
            let entry = entry.trim();
            let Some(rest) = entry.strip_prefix('<') else {
                continue;
            };
            let Some((target, params)) = rest.split_once('>') else {
                continue;
            };
            let Ok(target) = base.join(target.trim()) else {
                tracing::debug!(link = target, "skipping link with unresolvable target");
                continue;
            };

            for param in params.split(';') {
                let Some((name, value)) = param.split_once('=') else {
                    continue;
                };
                if !name.trim().eq_ignore_ascii_case("rel") {
                    continue;
                }
                let value = value.trim().trim_matches('"');
                for rel in value.split_whitespace() {
                    links.push(Link::new(target.as_str(), rel));
                }
            }
        }
        links
    }
}

fn split_outside_brackets(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '<' if !in_quotes => depth += 1,
            '>' if !in_quotes => depth = depth.saturating_sub(1),
            '"' => in_quotes = !in_quotes,
            c if c == separator && depth == 0 && !in_quotes => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Finds the first link with the given relation type.
pub fn find_rel<'a>(links: &'a [Link], rel: &str) -> Option<&'a Link> {
    links.iter().find(|l| l.rel == rel)
}
