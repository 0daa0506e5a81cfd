use ropey::Rope;
use unicode_width::UnicodeWidthChar;

/// Cursor position. `col` counts chars, not bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
    /// Column to return to when moving vertically through short lines.
    sticky_col: usize,
}

impl Cursor {
    pub const fn at(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            sticky_col: col,
        }
    }

    const fn set_col(&mut self, col: usize) {
        self.col = col;
        self.sticky_col = col;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Spaces inserted for a tab.
pub const TAB_WIDTH: usize = 2;

/// Rope-backed source text with a single cursor.
#[derive(Debug, Clone)]
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
}

impl EditorBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
        }
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Replace the whole text, keeping the cursor as close as possible.
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        let Cursor { line, col, .. } = self.cursor;
        self.move_to(line, col);
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line contents without the line break.
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx >= self.rope.len_lines() {
            return None;
        }
        let text = self.rope.line(idx).to_string();
        Some(text.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Length of a line in chars, without the line break.
    pub fn line_len(&self, idx: usize) -> usize {
        self.line(idx).map_or(0, |l| l.chars().count())
    }

    /// Char column under terminal column `display_col` of line `idx`.
    ///
    /// Wide characters cover two cells; a click on either lands on the char.
    pub fn col_at_display(&self, idx: usize, display_col: usize) -> usize {
        let Some(line) = self.line(idx) else {
            return 0;
        };
        let mut used = 0;
        for (col, ch) in line.chars().enumerate() {
            used += ch.width().unwrap_or(0);
            if used > display_col {
                return col;
            }
        }
        line.chars().count()
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.newline();
            return;
        }
        self.rope.insert_char(self.char_idx(), ch);
        self.cursor.set_col(self.cursor.col + 1);
    }

    /// Insert text (e.g. a paste), leaving the cursor after it.
    pub fn insert_str(&mut self, s: &str) {
        let s = s.replace("\r\n", "\n");
        if s.is_empty() {
            return;
        }
        self.rope.insert(self.char_idx(), &s);
        match s.rsplit_once('\n') {
            Some((_, tail)) => {
                self.cursor.line += s.matches('\n').count();
                self.cursor.set_col(tail.chars().count());
            }
            None => self.cursor.set_col(self.cursor.col + s.chars().count()),
        }
    }

    pub fn insert_tab(&mut self) {
        self.insert_str(&" ".repeat(TAB_WIDTH));
    }

    /// Break the line at the cursor, carrying its leading whitespace over.
    pub fn newline(&mut self) {
        let indent: String = self
            .line(self.cursor.line)
            .unwrap_or_default()
            .chars()
            .take(self.cursor.col)
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        self.rope.insert_char(self.char_idx(), '\n');
        self.cursor.line += 1;
        self.cursor.set_col(0);
        self.insert_str(&indent);
    }

    /// Backspace. Returns whether anything was removed.
    pub fn delete_back(&mut self) -> bool {
        let idx = self.char_idx();
        if idx == 0 {
            return false;
        }
        if self.cursor.col == 0 {
            let prev_len = self.line_len(self.cursor.line - 1);
            self.cursor.line -= 1;
            self.cursor.set_col(prev_len);
        } else {
            self.cursor.set_col(self.cursor.col - 1);
        }
        self.rope.remove(idx - 1..idx);
        true
    }

    /// Delete. Returns whether anything was removed.
    pub fn delete_forward(&mut self) -> bool {
        let idx = self.char_idx();
        if idx >= self.rope.len_chars() {
            return false;
        }
        let end = if self.rope.char(idx) == '\r'
            && idx + 1 < self.rope.len_chars()
            && self.rope.char(idx + 1) == '\n'
        {
            idx + 2
        } else {
            idx + 1
        };
        self.rope.remove(idx..end);
        true
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left if self.cursor.col > 0 => self.cursor.set_col(self.cursor.col - 1),
            Direction::Left if self.cursor.line > 0 => {
                self.cursor.line -= 1;
                self.cursor.set_col(self.line_len(self.cursor.line));
            }
            Direction::Right if self.cursor.col < self.line_len(self.cursor.line) => {
                self.cursor.set_col(self.cursor.col + 1);
            }
            Direction::Right if self.cursor.line + 1 < self.line_count() => {
                self.cursor.line += 1;
                self.cursor.set_col(0);
            }
            Direction::Up if self.cursor.line > 0 => self.move_vertically(self.cursor.line - 1),
            Direction::Down if self.cursor.line + 1 < self.line_count() => {
                self.move_vertically(self.cursor.line + 1);
            }
            _ => {}
        }
    }

    /// Move up or down by `lines`, clamped to the buffer.
    pub fn move_lines(&mut self, direction: Direction, lines: usize) {
        let target = match direction {
            Direction::Up => self.cursor.line.saturating_sub(lines),
            Direction::Down => (self.cursor.line + lines).min(self.line_count().saturating_sub(1)),
            Direction::Left | Direction::Right => return,
        };
        self.move_vertically(target);
    }

    pub const fn move_home(&mut self) {
        self.cursor.set_col(0);
    }

    pub fn move_end(&mut self) {
        self.cursor.set_col(self.line_len(self.cursor.line));
    }

    pub fn move_to(&mut self, line: usize, col: usize) {
        self.cursor.line = line.min(self.line_count().saturating_sub(1));
        self.cursor.set_col(col.min(self.line_len(self.cursor.line)));
    }

    pub fn move_to_end(&mut self) {
        self.move_to(usize::MAX, usize::MAX);
    }

    fn move_vertically(&mut self, line: usize) {
        self.cursor.line = line;
        self.cursor.col = self.cursor.sticky_col.min(self.line_len(line));
    }

    fn char_idx(&self) -> usize {
        self.rope.line_to_char(self.cursor.line) + self.cursor.col
    }
}
