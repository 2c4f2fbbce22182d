/// Where a diagnostic points. Self-contained so formatting does not need the
/// file system again: the offending line is captured at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  pub path: String,
  /// 1-based.
  pub line: usize,
  /// 0-based column of the caret.
  pub column: usize,
  /// How many characters the caret underlines. At least 1.
  pub length: usize,
  pub line_text: String,
}

impl Location {
  pub fn new(
    path: impl Into<String>,
    line: usize,
    column: usize,
    length: usize,
    line_text: impl Into<String>,
  ) -> Self {
    Self {
      path: path.into(),
      line,
      column,
      length: length.max(1),
      line_text: line_text.into(),
    }
  }

  /// Build a location from a 0-based (line, col) pair into `source`.
  pub fn from_source(path: impl Into<String>, source: &str, line: u32, col: u32) -> Self {
    let line_text = source
      .lines()
      .nth(line as usize)
      .unwrap_or_default()
      .to_string();
    Self::new(path, line as usize + 1, col as usize, 1, line_text)
  }

  /// `file:line:column` with a source excerpt and caret, the shape the CLI
  /// prints to stderr.
  pub fn render(&self) -> String {
    let mut out = format!("    {}:{}:{}:\n", self.path, self.line, self.column);
    out.push_str(&format!("      {}\n", self.line_text));
    let mut caret = String::from("      ");
    for ch in self.line_text.chars().take(self.column) {
      caret.push(if ch == '\t' { '\t' } else { ' ' });
    }
    caret.push('^');
    for _ in 1..self.length {
      caret.push('~');
    }
    out.push_str(&caret);
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn renders_caret_under_column() {
    let loc = Location::new("/entry.js", 3, 4, 3, "let foo = bar");
    let rendered = loc.render();
    assert!(rendered.starts_with("    /entry.js:3:4:\n"));
    assert!(rendered.ends_with("      let foo = bar\n          ^~~"));
  }

  #[test]
  fn from_source_captures_line_text() {
    let loc = Location::from_source("/a.js", "first\nsecond\nthird", 1, 2);
    assert_eq!(loc.line, 2);
    assert_eq!(loc.line_text, "second");
  }
}
