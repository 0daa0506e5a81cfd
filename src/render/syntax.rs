//! Structural checks on mermaid source.
//!
//! The renderer parses leniently: an unknown header becomes a flowchart and
//! stray tokens are dropped. These checks run first so malformed source is
//! reported instead of drawn. They cover the header line of every diagram
//! type and the statement shapes of the types the renderer draws
//! (flowchart, sequence, class, state, ER).

const DIRECTIONS: [&str; 5] = ["TB", "TD", "BT", "RL", "LR"];

const FLOWCHART_DIRECTIVES: &[&str] = &[
    "subgraph",
    "end",
    "direction",
    "classDef",
    "class",
    "style",
    "linkStyle",
    "click",
    "accTitle",
    "accTitle:",
    "accDescr",
    "accDescr:",
];

const FLOWCHART_LINKS: [&str; 5] = ["--", "==", "-.", "~~~", "&"];

const DANGLING_LINKS: [&str; 6] = ["-->", "---", "==>", "===", "-.->", "-.-"];

const BLOCK_DIRECTIVES: &[&str] = &[
    "direction",
    "classDef",
    "cssClass",
    "style",
    "note",
    "click",
    "link",
    "callback",
    "accTitle:",
    "accDescr:",
];

const SEQUENCE_BLOCKS: &[&str] = &["loop", "alt", "opt", "par", "critical", "break", "rect", "box"];

const SEQUENCE_KEYWORDS: &[&str] = &[
    "participant",
    "actor",
    "autonumber",
    "activate",
    "deactivate",
    "note",
    "title",
    "acctitle",
    "accdescr",
    "links",
    "link",
    "properties",
    "details",
    "create",
    "destroy",
    "else",
    "and",
    "option",
];

// Longest first so ties on position pick the full arrow.
const SEQUENCE_ARROWS: [&str; 10] = [
    "<<-->>", "<<->>", "-->>", "->>", "-->", "--x", "--)", "->", "-x", "-)",
];

/// Diagram families, as named by the header keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    Class,
    State,
    Er,
    Pie,
    XyChart,
    GitGraph,
    Other,
}

impl DiagramKind {
    fn from_keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "graph" | "flowchart" | "flowchart-elk" => Self::Flowchart,
            "sequenceDiagram" => Self::Sequence,
            "classDiagram" | "classDiagram-v2" => Self::Class,
            "stateDiagram" | "stateDiagram-v2" => Self::State,
            "erDiagram" => Self::Er,
            "pie" => Self::Pie,
            "xychart-beta" => Self::XyChart,
            "gitGraph" => Self::GitGraph,
            "gantt" | "journey" | "mindmap" | "timeline" | "quadrantChart"
            | "requirementDiagram" | "C4Context" | "C4Container" | "C4Component"
            | "C4Dynamic" | "C4Deployment" | "sankey-beta" | "block-beta" | "packet-beta"
            | "architecture-beta" | "kanban" | "radar-beta" | "treemap-beta" => Self::Other,
            _ => return None,
        };
        Some(kind)
    }

    fn header_accepts(self, rest: &[&str]) -> bool {
        match (self, rest) {
            (_, []) => true,
            (Self::Flowchart, [direction]) => DIRECTIONS.contains(direction),
            (Self::Pie, [first, ..]) => matches!(*first, "showData" | "title"),
            (Self::XyChart, ["horizontal" | "vertical"])
            | (Self::GitGraph, ["LR:" | "TB:" | "BT:"]) => true,
            _ => false,
        }
    }
}

/// A malformed line, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Parse error on line {line}: {detail}")]
pub struct SyntaxError {
    pub line: usize,
    pub detail: String,
}

impl SyntaxError {
    fn new(line: usize, detail: impl Into<String>) -> Self {
        Self {
            line,
            detail: detail.into(),
        }
    }
}

/// What a successful check learned about the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outline {
    pub kind: DiagramKind,
    pub header_line: usize,
    elements: usize,
}

impl Outline {
    /// Whether the body declares nodes, so an empty parse means the
    /// renderer dropped them.
    pub const fn expects_nodes(&self) -> bool {
        matches!(self.kind, DiagramKind::Flowchart | DiagramKind::Class) && self.elements > 0
    }
}

/// Check `source` for a known header and well-formed statements.
///
/// # Errors
///
/// Returns the first malformed line found.
pub fn check(source: &str) -> Result<Outline, SyntaxError> {
    let mut lines = source.lines().zip(1..);
    let (header, header_line) = find_header(&mut lines)?;

    let (head, tail) = header.split_once(';').unwrap_or((header, ""));
    let mut words = head.split_whitespace();
    let keyword = words.next().unwrap_or_default();
    let kind = DiagramKind::from_keyword(keyword).ok_or_else(|| {
        SyntaxError::new(header_line, format!("no diagram type matches \"{keyword}\""))
    })?;
    let rest: Vec<&str> = words.collect();
    if !kind.header_accepts(&rest) {
        return Err(SyntaxError::new(
            header_line,
            format!("unexpected \"{}\" after {keyword}", rest.join(" ")),
        ));
    }

    let mut body = Body::new(kind);
    if !tail.trim().is_empty() {
        body.line(tail.trim(), header_line)?;
    }
    for (raw, number) in lines {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("%%") {
            continue;
        }
        body.line(line, number)?;
    }
    body.finish(header_line)
}

fn find_header<'a>(
    lines: &mut impl Iterator<Item = (&'a str, usize)>,
) -> Result<(&'a str, usize), SyntaxError> {
    let mut front_matter_from = None;
    for (raw, number) in lines.by_ref() {
        let line = raw.trim();
        if front_matter_from.is_some() {
            if line == "---" {
                front_matter_from = None;
            }
            continue;
        }
        if line.is_empty() || line.starts_with("%%") {
            continue;
        }
        if line == "---" {
            front_matter_from = Some(number);
            continue;
        }
        return Ok((line, number));
    }
    Err(front_matter_from.map_or_else(
        || SyntaxError::new(1, "no diagram type found"),
        |line| SyntaxError::new(line, "front matter is never closed"),
    ))
}

fn first_word(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or_default()
}

/// Walk `line` checking bracket nesting outside quoted spans.
///
/// Returns the text at depth zero with quoted and bracketed spans removed.
/// Flowchart mode also tracks `{}` and `A>text]` shapes, treats `|label|`
/// as quoted, and turns `;` into a statement break (`\n`).
fn scan(line: &str, flowchart: bool) -> Result<String, String> {
    let mut outer = String::new();
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    for ch in line.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            prev = ch;
            continue;
        }
        match ch {
            '"' => quote = Some('"'),
            '|' if flowchart && stack.is_empty() => quote = Some('|'),
            '[' | '(' => stack.push(ch),
            '{' if flowchart => stack.push(ch),
            '>' if flowchart && stack.is_empty() && (prev.is_alphanumeric() || prev == '_') => {
                stack.push('[');
            }
            ']' | ')' | '}' if flowchart || ch != '}' => {
                let open = match ch {
                    ']' => '[',
                    ')' => '(',
                    _ => '{',
                };
                if stack.pop() != Some(open) {
                    return Err(format!("unexpected '{ch}'"));
                }
            }
            ';' if flowchart && stack.is_empty() => outer.push('\n'),
            _ if stack.is_empty() => outer.push(ch),
            _ => {}
        }
        prev = ch;
    }
    if let Some(q) = quote {
        return Err(format!("missing closing '{q}'"));
    }
    match stack.last() {
        Some(open) => Err(format!("unclosed '{open}'")),
        None => Ok(outer),
    }
}

struct Body {
    kind: DiagramKind,
    open_braces: Vec<usize>,
    open_blocks: Vec<usize>,
    in_note: bool,
    elements: usize,
}

impl Body {
    const fn new(kind: DiagramKind) -> Self {
        Self {
            kind,
            open_braces: Vec::new(),
            open_blocks: Vec::new(),
            in_note: false,
            elements: 0,
        }
    }

    fn line(&mut self, line: &str, number: usize) -> Result<(), SyntaxError> {
        let result = match self.kind {
            DiagramKind::Flowchart => self.flowchart_line(line),
            DiagramKind::Sequence => self.sequence_line(line, number),
            DiagramKind::Class | DiagramKind::State | DiagramKind::Er => {
                self.block_line(line, number)
            }
            _ => Ok(()),
        };
        result.map_err(|detail| SyntaxError::new(number, detail))
    }

    fn flowchart_line(&mut self, line: &str) -> Result<(), String> {
        let outer = scan(line, true)?;
        if FLOWCHART_DIRECTIVES.contains(&first_word(line)) {
            return Ok(());
        }
        self.elements += 1;
        for statement in outer.split('\n').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(link) = DANGLING_LINKS.iter().find(|l| statement.ends_with(**l)) {
                return Err(format!("expected a node after \"{link}\""));
            }
            let linked = FLOWCHART_LINKS.iter().any(|l| statement.contains(l));
            if !linked && statement.split_whitespace().count() > 1 {
                return Err(format!("expected a node or link, got \"{statement}\""));
            }
        }
        Ok(())
    }

    fn sequence_line(&mut self, line: &str, number: usize) -> Result<(), String> {
        let first = first_word(line).trim_end_matches(':').to_ascii_lowercase();
        if SEQUENCE_BLOCKS.contains(&first.as_str()) {
            self.open_blocks.push(number);
            return Ok(());
        }
        if first == "end" {
            return self
                .open_blocks
                .pop()
                .map(|_| ())
                .ok_or_else(|| "unexpected \"end\"".to_string());
        }
        if SEQUENCE_KEYWORDS.contains(&first.as_str()) {
            return Ok(());
        }

        let head = line.split_once(':').map_or(line, |(head, _)| head).trim();
        let arrow = SEQUENCE_ARROWS
            .iter()
            .filter_map(|arrow| head.find(arrow).map(|at| (at, *arrow)))
            .min_by_key(|(at, _)| *at);
        let Some((at, arrow)) = arrow else {
            return Err(format!(
                "expected a message or keyword, got \"{}\"",
                first_word(line)
            ));
        };
        let from = head[..at].trim();
        let to = head[at + arrow.len()..].trim_start_matches(['+', '-']).trim();
        if from.is_empty() || to.is_empty() {
            return Err(format!("expected a participant on both sides of \"{arrow}\""));
        }
        self.elements += 1;
        Ok(())
    }

    fn block_line(&mut self, line: &str, number: usize) -> Result<(), String> {
        if self.in_note {
            if line == "end note" {
                self.in_note = false;
            }
            return Ok(());
        }
        let first = first_word(line);
        if self.kind == DiagramKind::State && first == "note" && !line.contains(':') {
            self.in_note = true;
            return Ok(());
        }

        let declares = match self.kind {
            DiagramKind::Class => first == "class",
            DiagramKind::State => first == "state",
            _ => false,
        };
        if declares {
            let name = line[first.len()..].trim_start();
            if !name.starts_with(|c: char| c.is_alphanumeric() || matches!(c, '_' | '"' | '`')) {
                return Err(format!("expected a name after \"{first}\""));
            }
        }

        // Labels after ':' are free text, except inside a class body where
        // members carry their own type annotations.
        let in_class_body = self.kind == DiagramKind::Class && !self.open_braces.is_empty();
        let head = if in_class_body {
            line
        } else {
            line.split_once(':').map_or(line, |(head, _)| head)
        };
        let outer = scan(head, false)?;

        let top_level = self.open_braces.is_empty();
        let relation = self.kind == DiagramKind::Er && (head.contains("--") || head.contains(".."));
        if !relation {
            for ch in outer.chars() {
                match ch {
                    '{' => self.open_braces.push(number),
                    '}' => {
                        if self.open_braces.pop().is_none() {
                            return Err("unexpected '}'".to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        if top_level && first != "}" && !BLOCK_DIRECTIVES.contains(&first) {
            self.elements += 1;
        }
        Ok(())
    }

    fn finish(self, header_line: usize) -> Result<Outline, SyntaxError> {
        if let Some(&line) = self.open_braces.first() {
            return Err(SyntaxError::new(line, "unclosed '{'"));
        }
        if let Some(&line) = self.open_blocks.last() {
            return Err(SyntaxError::new(line, "block is never closed with \"end\""));
        }
        Ok(Outline {
            kind: self.kind,
            header_line,
            elements: self.elements,
        })
    }
}
