//! A small JSONPath subset for pulling leaf values out of upstream tables.
//!
//! Supported: `$` root, `.name` and `['name']` members, `[*]`/`.*` wildcards,
//! `[n]` indices (negative counts from the end) and `[a,b]` unions. Unions
//! yield their members per match in the order written, so
//! `entries[*][name,total]` produces `name1, total1, name2, total2, ...`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde_json::Value;

use crate::error::{Result, SpapiError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Key {
    Member(String),
    Index(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    Key(Key),
    Wildcard,
    Union(Vec<Key>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    selectors: Vec<Selector>,
}

impl JsonPath {
    pub fn parse(expression: &str) -> Result<Self> {
        let selectors = Parser::new(expression).parse()?;
        Ok(Self {
            source: expression.to_string(),
            selectors,
        })
    }

    /// Evaluate against `document`. Missing members and type mismatches
    /// simply produce no match.
    #[must_use]
    pub fn extract(&self, document: &Value) -> Vec<Value> {
        let mut current = vec![document];
        for selector in &self.selectors {
            let mut next = Vec::new();
            for node in current {
                selector.select(node, &mut next);
            }
            if next.is_empty() {
                return Vec::new();
            }
            current = next;
        }
        current.into_iter().cloned().collect()
    }
}

impl Display for JsonPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for JsonPath {
    type Err = SpapiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parse and evaluate in one step. An unparsable expression matches nothing.
#[must_use]
pub fn extract(expression: &str, document: &Value) -> Vec<Value> {
    match JsonPath::parse(expression) {
        Ok(path) => path.extract(document),
        Err(err) => {
            tracing::debug!(%expression, error = %err, "ignoring unparsable path expression");
            Vec::new()
        }
    }
}

impl Selector {
    fn select<'a>(&self, node: &'a Value, out: &mut Vec<&'a Value>) {
        match self {
            Self::Key(key) => {
                if let Some(found) = key.lookup(node) {
                    out.push(found);
                }
            }
            Self::Wildcard => match node {
                Value::Array(items) => out.extend(items.iter()),
                Value::Object(map) => out.extend(map.values()),
                _ => {}
            },
            Self::Union(keys) => {
                out.extend(keys.iter().filter_map(|key| key.lookup(node)));
            }
        }
    }
}

impl Key {
    fn lookup<'a>(&self, node: &'a Value) -> Option<&'a Value> {
        match (self, node) {
            (Self::Member(name), Value::Object(map)) => map.get(name),
            (Self::Index(index), Value::Array(items)) => {
                let len = i64::try_from(items.len()).ok()?;
                let resolved = if *index < 0 { len + index } else { *index };
                usize::try_from(resolved).ok().and_then(|i| items.get(i))
            }
            _ => None,
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }

    fn error(&self, message: impl Into<String>) -> SpapiError {
        SpapiError::InvalidPath(format!("{} in `{}`", message.into(), self.source))
    }

    fn parse(mut self) -> Result<Vec<Selector>> {
        match self.chars.next() {
            Some((_, '$')) => {}
            _ => return Err(self.error("expression must start with `$`")),
        }

        let mut selectors = Vec::new();
        while let Some((pos, ch)) = self.chars.next() {
            match ch {
                '.' => selectors.push(self.parse_dot(pos)?),
                '[' => selectors.push(self.parse_bracket()?),
                other => {
                    return Err(self.error(format!("unexpected `{other}` at offset {pos}")));
                }
            }
        }
        Ok(selectors)
    }

    fn parse_dot(&mut self, pos: usize) -> Result<Selector> {
        match self.chars.peek() {
            Some((_, '*')) => {
                self.chars.next();
                return Ok(Selector::Wildcard);
            }
            Some((_, '.')) => {
                return Err(self.error("recursive descent is not supported"));
            }
            _ => {}
        }

        let mut name = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch == '.' || ch == '[' {
                break;
            }
            name.push(ch);
            self.chars.next();
        }
        if name.is_empty() {
            return Err(self.error(format!("empty member name at offset {pos}")));
        }
        Ok(Selector::Key(Key::Member(name)))
    }

    fn parse_bracket(&mut self) -> Result<Selector> {
        let mut keys = Vec::new();
        let mut wildcard = false;

        loop {
            self.skip_whitespace();
            match self.chars.peek().copied() {
                Some((_, '*')) => {
                    self.chars.next();
                    wildcard = true;
                }
                Some((_, quote @ ('\'' | '"'))) => {
                    self.chars.next();
                    keys.push(Key::Member(self.parse_quoted(quote)?));
                }
                Some(_) => keys.push(self.parse_bare()?),
                None => return Err(self.error("unterminated `[`")),
            }

            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => {}
                Some((_, ']')) => break,
                Some((pos, other)) => {
                    return Err(self.error(format!("unexpected `{other}` at offset {pos}")));
                }
                None => return Err(self.error("unterminated `[`")),
            }
        }

        match (wildcard, keys.len()) {
            (true, 0) => Ok(Selector::Wildcard),
            (true, _) => Err(self.error("`*` cannot be combined with other selectors")),
            (false, 1) => Ok(Selector::Key(keys.remove(0))),
            (false, _) => Ok(Selector::Union(keys)),
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String> {
        let mut value = String::new();
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(value),
                c => value.push(c),
            }
        }
        Err(self.error("unterminated quoted member"))
    }

    fn parse_bare(&mut self) -> Result<Key> {
        let mut raw = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch == ',' || ch == ']' || ch.is_whitespace() {
                break;
            }
            raw.push(ch);
            self.chars.next();
        }
        if raw.is_empty() {
            return Err(self.error("empty bracket selector"));
        }
        Ok(raw
            .parse::<i64>()
            .map_or(Key::Member(raw), Key::Index))
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, ch)| ch.is_whitespace()).is_some() {}
    }
}
