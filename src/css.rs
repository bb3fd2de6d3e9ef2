//! Minimal CSS parser and serializer.
//!
//! Parses a stylesheet into top-level [`Node`]s: style rules and at-rules.
//! Grouping at-rules (`@media`, `@supports`, `@keyframes`, …) hold nested
//! nodes, descriptor at-rules (`@font-face`, `@page`, …) hold declarations,
//! and statement at-rules (`@import`, `@charset`) hold nothing.
//!
//! This is enough structure for the three consumers in the crate:
//! - purging and budgeting whole rules for critical CSS,
//! - compact re-serialization for minification,
//! - adding vendor-prefixed declarations.
//!
//! Values are kept as raw text. Selectors are kept as a list of raw selector
//! strings; [`compound_parts`] breaks one into tag/class/id tokens.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CssError {
    #[error("unbalanced braces at byte {0}")]
    Unbalanced(usize),
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),
    #[error("unterminated string at byte {0}")]
    UnterminatedString(usize),
    #[error("expected '{{' after selector at byte {0}")]
    MissingBlock(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stylesheet {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    /// Raw value, including any `!important`.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// Lowercased name without the `@`.
    pub name: String,
    pub prelude: String,
    pub block: Option<AtRuleBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtRuleBlock {
    Nodes(Vec<Node>),
    Declarations(Vec<Declaration>),
}

impl Declaration {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.to_string(),
            value: value.to_string(),
        }
    }
}

/// Parse `source` into a [`Stylesheet`].
pub fn parse(source: &str) -> Result<Stylesheet, CssError> {
    let stripped = strip_comments(source)?;
    let mut parser = Parser {
        src: &stripped,
        pos: 0,
    };
    let nodes = parser.parse_nodes(false)?;
    Ok(Stylesheet { nodes })
}

// ---------------------------------------------------------------------------
// Lexical helpers
// ---------------------------------------------------------------------------

/// Remove `/* … */` comments outside of strings.
fn strip_comments(source: &str) -> Result<String, CssError> {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut pos = 0;
    let mut copied = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' | b'\'' => pos = skip_string(bytes, pos)?,
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                let end = source[pos + 2..]
                    .find("*/")
                    .ok_or(CssError::UnterminatedComment(pos))?;
                out.push_str(&source[copied..pos]);
                pos += 2 + end + 2;
                copied = pos;
            }
            _ => pos += 1,
        }
    }
    out.push_str(&source[copied..]);
    Ok(out)
}

/// `pos` is on an opening quote. Returns the index just past the closing one.
fn skip_string(bytes: &[u8], pos: usize) -> Result<usize, CssError> {
    let quote = bytes[pos];
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(CssError::UnterminatedString(pos))
}

/// Index of the first byte in `stops` at paren/bracket depth zero, skipping
/// strings. `None` at end of input.
fn scan_until(bytes: &[u8], mut pos: usize, stops: &[u8]) -> Result<Option<usize>, CssError> {
    let mut depth = 0usize;
    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            b'"' | b'\'' => {
                pos = skip_string(bytes, pos)?;
                continue;
            }
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            _ if depth == 0 && stops.contains(&b) => return Ok(Some(pos)),
            _ => {}
        }
        pos += 1;
    }
    Ok(None)
}

/// Split on `sep` at paren/bracket depth zero, outside strings.
fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while let Ok(Some(i)) = scan_until(bytes, pos, &[sep]) {
        parts.push(&text[start..i]);
        start = i + 1;
        pos = i + 1;
    }
    parts.push(&text[start..]);
    parts
}

/// Collapse whitespace runs to one space outside strings.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;

    for c in text.trim().chars() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

/// Drop spaces next to `chars` outside strings. Input must already be
/// whitespace-collapsed.
fn tighten(text: &str, chars: &[char]) -> String {
    let src: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;

    for (i, &c) in src.iter().enumerate() {
        if let Some(q) = quote {
            out.push(c);
            if c == q && src.get(i.wrapping_sub(1)) != Some(&'\\') {
                quote = None;
            }
            continue;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
        }
        if c == ' ' {
            let prev = out.chars().last();
            let next = src.get(i + 1).copied();
            if prev.is_some_and(|p| chars.contains(&p)) || next.is_some_and(|n| chars.contains(&n)) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn bytes(&self) -> &[u8] {
        self.src.as_bytes()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.src.len() && self.bytes()[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Parse nodes until end of input, or until the `}` closing the current
    /// block when `nested`.
    fn parse_nodes(&mut self, nested: bool) -> Result<Vec<Node>, CssError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(&b) = self.bytes().get(self.pos) else {
                return if nested {
                    Err(CssError::Unbalanced(self.pos))
                } else {
                    Ok(nodes)
                };
            };
            match b {
                b'}' if nested => {
                    self.pos += 1;
                    return Ok(nodes);
                }
                b'}' => return Err(CssError::Unbalanced(self.pos)),
                b';' => self.pos += 1,
                b'@' => nodes.push(Node::AtRule(self.parse_at_rule()?)),
                _ => nodes.push(Node::Rule(self.parse_rule()?)),
            }
        }
    }

    fn parse_rule(&mut self) -> Result<Rule, CssError> {
        let start = self.pos;
        let open = match scan_until(self.bytes(), self.pos, b"{;}")? {
            Some(i) if self.bytes()[i] == b'{' => i,
            _ => return Err(CssError::MissingBlock(start)),
        };
        let selectors = split_top_level(&self.src[start..open], b',')
            .into_iter()
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .collect();
        self.pos = open + 1;
        let declarations = self.parse_declaration_block()?;
        Ok(Rule {
            selectors,
            declarations,
        })
    }

    /// `pos` is just past `{`. Consumes through the matching `}`.
    fn parse_declaration_block(&mut self) -> Result<Vec<Declaration>, CssError> {
        let start = self.pos;
        let close = scan_until(self.bytes(), self.pos, b"}")?
            .ok_or(CssError::Unbalanced(start))?;
        self.pos = close + 1;
        Ok(parse_declarations(&self.src[start..close]))
    }

    fn parse_at_rule(&mut self) -> Result<AtRule, CssError> {
        let at = self.pos;
        self.pos += 1;
        let name_start = self.pos;
        while self.pos < self.src.len() && is_ident_byte(self.bytes()[self.pos]) {
            self.pos += 1;
        }
        let name = self.src[name_start..self.pos].to_ascii_lowercase();

        let end = scan_until(self.bytes(), self.pos, b"{;")?.ok_or(CssError::Unbalanced(at))?;
        let prelude = collapse_whitespace(&self.src[self.pos..end]);
        self.pos = end + 1;

        let block = if self.bytes()[end] == b';' {
            None
        } else if holds_nodes(&name) {
            Some(AtRuleBlock::Nodes(self.parse_nodes(true)?))
        } else {
            Some(AtRuleBlock::Declarations(self.parse_declaration_block()?))
        };

        Ok(AtRule {
            name,
            prelude,
            block,
        })
    }
}

/// At-rules whose block contains rules rather than declarations.
fn holds_nodes(name: &str) -> bool {
    matches!(
        name,
        "media" | "supports" | "document" | "layer" | "container" | "scope" | "starting-style"
    ) || name.ends_with("keyframes")
}

fn parse_declarations(body: &str) -> Vec<Declaration> {
    split_top_level(body, b';')
        .into_iter()
        .filter_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            let property = property.trim();
            let value = collapse_whitespace(value);
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some(Declaration::new(property, &value))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

impl Declaration {
    fn to_css(&self) -> String {
        let value = tighten(&self.value, &[',']).replace(" !important", "!important");
        format!("{}:{}", self.property, value)
    }
}

fn declarations_to_css(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(Declaration::to_css)
        .collect::<Vec<_>>()
        .join(";")
}

impl Rule {
    pub fn selector_text(&self) -> String {
        self.selectors
            .iter()
            .map(|s| tighten(s, &['>', '+', '~']))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_css(&self) -> String {
        format!(
            "{}{{{}}}",
            self.selector_text(),
            declarations_to_css(&self.declarations)
        )
    }
}

impl AtRule {
    pub fn to_css(&self) -> String {
        let head = if self.prelude.is_empty() {
            format!("@{}", self.name)
        } else {
            format!("@{} {}", self.name, tighten(&self.prelude, &[',', ':']))
        };
        match &self.block {
            None => format!("{};", head),
            Some(AtRuleBlock::Nodes(nodes)) => format!("{}{{{}}}", head, nodes_to_css(nodes)),
            Some(AtRuleBlock::Declarations(decls)) => {
                format!("{}{{{}}}", head, declarations_to_css(decls))
            }
        }
    }
}

impl Node {
    /// Compact serialization of this node.
    pub fn to_css(&self) -> String {
        match self {
            Node::Rule(rule) => rule.to_css(),
            Node::AtRule(at) => at.to_css(),
        }
    }
}

fn nodes_to_css(nodes: &[Node]) -> String {
    nodes.iter().map(Node::to_css).collect()
}

impl Stylesheet {
    /// Compact serialization with no separators between nodes.
    pub fn to_css(&self) -> String {
        nodes_to_css(&self.nodes)
    }
}

// ---------------------------------------------------------------------------
// Selector analysis
// ---------------------------------------------------------------------------

/// Tag, class and id tokens of one compound selector. Pseudo-classes,
/// pseudo-elements and attribute selectors are dropped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Compound {
    /// Lowercased type selector; `None` when absent. `*` is kept.
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub ids: Vec<String>,
}

/// Split a complex selector on combinators and parse each compound.
///
/// ```
/// # use pagesmith::css::compound_parts;
/// let parts = compound_parts(".footer a:hover");
/// assert_eq!(parts.len(), 2);
/// assert_eq!(parts[0].classes, vec!["footer"]);
/// assert_eq!(parts[1].tag.as_deref(), Some("a"));
/// ```
pub fn compound_parts(selector: &str) -> Vec<Compound> {
    let chars: Vec<char> = selector.chars().collect();
    let mut compounds = Vec::new();
    let mut current = Compound::default();
    let mut has_content = false;
    let mut i = 0;

    let read_ident = |i: &mut usize| -> String {
        let mut ident = String::new();
        while *i < chars.len() {
            let c = chars[*i];
            if c == '\\' && *i + 1 < chars.len() {
                ident.push(chars[*i + 1]);
                *i += 2;
            } else if c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
                ident.push(c);
                *i += 1;
            } else {
                break;
            }
        }
        ident
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '>' | '+' | '~' => {
                if has_content {
                    compounds.push(std::mem::take(&mut current));
                    has_content = false;
                }
                i += 1;
            }
            '.' => {
                i += 1;
                current.classes.push(read_ident(&mut i));
                has_content = true;
            }
            '#' => {
                i += 1;
                current.ids.push(read_ident(&mut i));
                has_content = true;
            }
            '*' => {
                current.tag = Some("*".to_string());
                has_content = true;
                i += 1;
            }
            '[' | '(' => {
                let close = if c == '[' { ']' } else { ')' };
                let mut depth = 0;
                while i < chars.len() {
                    if chars[i] == c {
                        depth += 1;
                    } else if chars[i] == close {
                        depth -= 1;
                        if depth == 0 {
                            i += 1;
                            break;
                        }
                    }
                    i += 1;
                }
                has_content = true;
            }
            ':' => {
                i += 1;
                if chars.get(i) == Some(&':') {
                    i += 1;
                }
                let _pseudo = read_ident(&mut i);
                has_content = true;
            }
            _ => {
                let tag = read_ident(&mut i);
                if tag.is_empty() {
                    i += 1;
                } else {
                    current.tag = Some(tag.to_ascii_lowercase());
                    has_content = true;
                }
            }
        }
    }
    if has_content {
        compounds.push(current);
    }
    compounds
}

// ---------------------------------------------------------------------------
// Vendor prefixes
// ---------------------------------------------------------------------------

/// Properties that get prefixed copies inserted before them.
const PREFIXED_PROPERTIES: &[(&str, &[&str])] = &[
    ("user-select", &["-webkit-user-select", "-moz-user-select", "-ms-user-select"]),
    ("appearance", &["-webkit-appearance", "-moz-appearance"]),
    ("backdrop-filter", &["-webkit-backdrop-filter"]),
    ("text-size-adjust", &["-webkit-text-size-adjust", "-moz-text-size-adjust"]),
    ("hyphens", &["-webkit-hyphens", "-ms-hyphens"]),
    ("mask-image", &["-webkit-mask-image"]),
    ("clip-path", &["-webkit-clip-path"]),
    ("background-clip", &["-webkit-background-clip"]),
];

fn prefix_declarations(declarations: &mut Vec<Declaration>) {
    let mut out = Vec::with_capacity(declarations.len());
    for decl in declarations.drain(..) {
        let present = |out: &[Declaration], prop: &str, value: &str| {
            out.iter().any(|d| d.property == prop && d.value == value)
        };
        if let Some((_, prefixes)) = PREFIXED_PROPERTIES
            .iter()
            .find(|(prop, _)| decl.property.eq_ignore_ascii_case(prop))
        {
            for &prefixed in prefixes.iter() {
                if !present(&out, prefixed, &decl.value) {
                    out.push(Declaration::new(prefixed, &decl.value));
                }
            }
        }
        if decl.property.eq_ignore_ascii_case("position")
            && decl.value.eq_ignore_ascii_case("sticky")
            && !present(&out, "position", "-webkit-sticky")
        {
            out.push(Declaration::new("position", "-webkit-sticky"));
        }
        out.push(decl);
    }
    *declarations = out;
}

fn prefix_nodes(nodes: &mut [Node]) {
    for node in nodes {
        match node {
            Node::Rule(rule) => prefix_declarations(&mut rule.declarations),
            Node::AtRule(at) => match &mut at.block {
                Some(AtRuleBlock::Nodes(children)) => prefix_nodes(children),
                Some(AtRuleBlock::Declarations(decls)) => prefix_declarations(decls),
                None => {}
            },
        }
    }
}

impl Stylesheet {
    /// Insert vendor-prefixed copies of selected declarations.
    pub fn add_vendor_prefixes(&mut self) {
        prefix_nodes(&mut self.nodes);
    }
}
