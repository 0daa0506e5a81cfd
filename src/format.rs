//! Line re-indentation for mermaid source.

const INDENT: usize = 2;
const RELATION_MARKERS: [&str; 5] = ["--", "-->", "<--", "<|--", "--|>"];

/// Re-indent `code`, dropping blank lines.
///
/// Lines with `{` open a block, lines with `}` close one. Member lines
/// (`+`/`-` prefixed) follow the current depth, relation lines are pulled
/// to column zero, and anything else is indented only inside a block.
pub fn pretty_format(code: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut indent = 0usize;
    let mut in_block = false;

    for line in code.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let depth = if line.contains('{') {
            in_block = true;
            indent += INDENT;
            indent - INDENT
        } else if line.contains('}') {
            indent = indent.saturating_sub(INDENT);
            in_block = false;
            indent
        } else if line.starts_with('+') || line.starts_with('-') {
            indent
        } else if RELATION_MARKERS.iter().any(|m| line.contains(m)) {
            0
        } else if in_block {
            indent
        } else {
            0
        };
        out.push(format!("{}{line}", " ".repeat(depth)));
    }

    out.join("\n")
}
