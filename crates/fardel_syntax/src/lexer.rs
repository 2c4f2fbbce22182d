use fardel_common::Loc;
use fardel_error::{Error, Location};

use crate::token::{Token, TokenKind};

/// Tokens after which a `/` starts a regular expression rather than a
/// division.
fn regex_allowed_after(prev: Option<&TokenKind>) -> bool {
  match prev {
    None => true,
    Some(TokenKind::Ident(name)) => matches!(
      name.as_str(),
      "return"
        | "case"
        | "delete"
        | "do"
        | "else"
        | "in"
        | "of"
        | "instanceof"
        | "new"
        | "typeof"
        | "void"
        | "throw"
        | "yield"
        | "await"
    ),
    Some(
      TokenKind::Num(_)
      | TokenKind::Str(_)
      | TokenKind::Template(_)
      | TokenKind::Regex(_)
      | TokenKind::RParen
      | TokenKind::RBracket
      | TokenKind::PlusPlus
      | TokenKind::MinusMinus,
    ) => false,
    Some(_) => true,
  }
}

pub struct Lexer<'a> {
  path: &'a str,
  source: &'a str,
  chars: Vec<char>,
  pos: usize,
  line: u32,
  col: u32,
}

impl<'a> Lexer<'a> {
  pub fn new(path: &'a str, source: &'a str) -> Self {
    Self {
      path,
      source,
      chars: source.chars().collect(),
      pos: 0,
      line: 0,
      col: 0,
    }
  }

  fn peek(&self) -> Option<char> {
    self.chars.get(self.pos).copied()
  }

  fn peek_at(&self, offset: usize) -> Option<char> {
    self.chars.get(self.pos + offset).copied()
  }

  fn bump(&mut self) -> Option<char> {
    let ch = self.peek()?;
    self.pos += 1;
    if ch == '\n' {
      self.line += 1;
      self.col = 0;
    } else {
      self.col += 1;
    }
    Some(ch)
  }

  fn error(&self, message: impl Into<String>) -> Error {
    let location = Location::from_source(self.path, self.source, self.line, self.col);
    Error::parse_failed(self.path, message, Some(location))
  }

  pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut newline_before = false;
    let mut pure_before = false;

    loop {
      // Skip whitespace and comments, remembering line breaks and
      // `@__PURE__` annotations.
      loop {
        match self.peek() {
          Some(ch) if ch.is_whitespace() => {
            if ch == '\n' {
              newline_before = true;
            }
            self.bump();
          }
          Some('/') if self.peek_at(1) == Some('/') => {
            while let Some(ch) = self.peek() {
              if ch == '\n' {
                break;
              }
              self.bump();
            }
          }
          Some('/') if self.peek_at(1) == Some('*') => {
            let start = self.pos;
            self.bump();
            self.bump();
            loop {
              match self.peek() {
                Some('*') if self.peek_at(1) == Some('/') => {
                  self.bump();
                  self.bump();
                  break;
                }
                Some(ch) => {
                  if ch == '\n' {
                    newline_before = true;
                  }
                  self.bump();
                }
                None => return Err(self.error("Unterminated block comment")),
              }
            }
            let text: String = self.chars[start..self.pos].iter().collect();
            if text.contains("@__PURE__") {
              pure_before = true;
            }
          }
          _ => break,
        }
      }

      let loc = Loc::new(self.line, self.col);
      let Some(ch) = self.peek() else {
        tokens.push(Token {
          kind: TokenKind::Eof,
          loc,
          newline_before,
          pure_before,
        });
        return Ok(tokens);
      };

      let kind = if ch.is_alphabetic() || ch == '_' || ch == '$' {
        self.read_ident()
      } else if ch.is_ascii_digit() || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) {
        self.read_number()?
      } else if ch == '"' || ch == '\'' {
        self.read_string()?
      } else if ch == '`' {
        self.read_template()?
      } else if ch == '/' && regex_allowed_after(tokens.last().map(|t| &t.kind)) {
        self.read_regex()?
      } else {
        self.read_punct()?
      };

      tokens.push(Token {
        kind,
        loc,
        newline_before,
        pure_before,
      });
      newline_before = false;
      pure_before = false;
    }
  }

  fn read_ident(&mut self) -> TokenKind {
    let mut name = String::new();
    while let Some(ch) = self.peek() {
      if ch.is_alphanumeric() || ch == '_' || ch == '$' {
        name.push(ch);
        self.bump();
      } else {
        break;
      }
    }
    TokenKind::Ident(name)
  }

  fn read_number(&mut self) -> Result<TokenKind, Error> {
    let start = self.pos;
    if self.peek() == Some('0')
      && matches!(self.peek_at(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'))
    {
      self.bump();
      self.bump();
      while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
        self.bump();
      }
    } else {
      while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
        self.bump();
      }
      if self.peek() == Some('.') {
        self.bump();
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
          self.bump();
        }
      }
      if matches!(self.peek(), Some('e' | 'E')) {
        self.bump();
        if matches!(self.peek(), Some('+' | '-')) {
          self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
          self.bump();
        }
      }
      if self.peek() == Some('n') {
        self.bump();
      }
    }
    Ok(TokenKind::Num(
      self.chars[start..self.pos].iter().collect(),
    ))
  }

  fn read_string(&mut self) -> Result<TokenKind, Error> {
    let start = self.pos;
    let quote = self.bump().unwrap();
    loop {
      match self.peek() {
        Some('\\') => {
          self.bump();
          self.bump();
        }
        Some(ch) if ch == quote => {
          self.bump();
          break;
        }
        Some('\n') | None => return Err(self.error("Unterminated string literal")),
        Some(_) => {
          self.bump();
        }
      }
    }
    Ok(TokenKind::Str(self.chars[start..self.pos].iter().collect()))
  }

  /// Reads a whole template literal, nested substitutions included. The
  /// parser re-lexes the substitution sources afterwards.
  fn read_template(&mut self) -> Result<TokenKind, Error> {
    let start = self.pos;
    self.bump(); // `
    let mut depth = 0usize;
    loop {
      match self.peek() {
        Some('\\') => {
          self.bump();
          self.bump();
        }
        Some('$') if self.peek_at(1) == Some('{') => {
          depth += 1;
          self.bump();
          self.bump();
        }
        Some('}') if depth > 0 => {
          depth -= 1;
          self.bump();
        }
        Some('`') if depth == 0 => {
          self.bump();
          break;
        }
        Some('`') => {
          // nested template inside a substitution
          let nested = self.read_template()?;
          drop(nested);
        }
        Some('\'') | Some('"') if depth > 0 => {
          self.read_string()?;
        }
        Some(_) => {
          self.bump();
        }
        None => return Err(self.error("Unterminated template literal")),
      }
    }
    Ok(TokenKind::Template(
      self.chars[start..self.pos].iter().collect(),
    ))
  }

  fn read_regex(&mut self) -> Result<TokenKind, Error> {
    let start = self.pos;
    self.bump(); // /
    let mut in_class = false;
    loop {
      match self.peek() {
        Some('\\') => {
          self.bump();
          self.bump();
        }
        Some('[') => {
          in_class = true;
          self.bump();
        }
        Some(']') => {
          in_class = false;
          self.bump();
        }
        Some('/') if !in_class => {
          self.bump();
          break;
        }
        Some('\n') | None => return Err(self.error("Unterminated regular expression")),
        Some(_) => {
          self.bump();
        }
      }
    }
    while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
      self.bump();
    }
    Ok(TokenKind::Regex(
      self.chars[start..self.pos].iter().collect(),
    ))
  }

  fn read_punct(&mut self) -> Result<TokenKind, Error> {
    use TokenKind::*;
    let ch = self.bump().unwrap();
    let two = self.peek();
    let three = self.peek_at(1);
    macro_rules! take {
      ($kind:expr) => {{
        self.bump();
        $kind
      }};
    }
    let kind = match ch {
      '(' => LParen,
      ')' => RParen,
      '{' => LBrace,
      '}' => RBrace,
      '[' => LBracket,
      ']' => RBracket,
      ';' => Semi,
      ',' => Comma,
      ':' => Colon,
      '~' => Tilde,
      '.' => {
        if two == Some('.') && three == Some('.') {
          self.bump();
          self.bump();
          DotDotDot
        } else {
          Dot
        }
      }
      '?' => match two {
        Some('?') => take!(Nullish),
        _ => Question,
      },
      '=' => match (two, three) {
        (Some('='), Some('=')) => {
          self.bump();
          self.bump();
          StrictEq
        }
        (Some('='), _) => take!(EqEq),
        (Some('>'), _) => take!(Arrow),
        _ => Assign,
      },
      '!' => match (two, three) {
        (Some('='), Some('=')) => {
          self.bump();
          self.bump();
          StrictNotEq
        }
        (Some('='), _) => take!(NotEq),
        _ => Bang,
      },
      '+' => match two {
        Some('+') => take!(PlusPlus),
        Some('=') => take!(PlusAssign),
        _ => Plus,
      },
      '-' => match two {
        Some('-') => take!(MinusMinus),
        Some('=') => take!(MinusAssign),
        _ => Minus,
      },
      '*' => match (two, three) {
        (Some('*'), Some('=')) => {
          self.bump();
          self.bump();
          ExpAssign
        }
        (Some('*'), _) => take!(StarStar),
        (Some('='), _) => take!(StarAssign),
        _ => Star,
      },
      '/' => match two {
        Some('=') => take!(SlashAssign),
        _ => Slash,
      },
      '%' => match two {
        Some('=') => take!(PercentAssign),
        _ => Percent,
      },
      '<' => match (two, three) {
        (Some('<'), Some('=')) => {
          self.bump();
          self.bump();
          ShlAssign
        }
        (Some('<'), _) => take!(Shl),
        (Some('='), _) => take!(LtEq),
        _ => Lt,
      },
      '>' => match (two, three) {
        (Some('>'), Some('>')) => {
          self.bump();
          self.bump();
          if self.peek() == Some('=') {
            self.bump();
            UShrAssign
          } else {
            UShr
          }
        }
        (Some('>'), Some('=')) => {
          self.bump();
          self.bump();
          ShrAssign
        }
        (Some('>'), _) => take!(Shr),
        (Some('='), _) => take!(GtEq),
        _ => Gt,
      },
      '&' => match two {
        Some('&') => take!(AndAnd),
        Some('=') => take!(AmpAssign),
        _ => Amp,
      },
      '|' => match two {
        Some('|') => take!(OrOr),
        Some('=') => take!(PipeAssign),
        _ => Pipe,
      },
      '^' => match two {
        Some('=') => take!(CaretAssign),
        _ => Caret,
      },
      other => return Err(self.error(format!("Unexpected character {other:?}"))),
    };
    Ok(kind)
  }
}

/// Decode the common escape sequences of a quoted string literal. The raw
/// text keeps its original escapes for printing; the cooked value is only
/// used where the bundler must understand the contents (import specifiers,
/// property keys).
pub fn cook_string(raw: &str) -> String {
  let inner: Vec<char> = raw.chars().collect();
  debug_assert!(inner.len() >= 2);
  let mut out = String::with_capacity(inner.len());
  let mut i = 1;
  while i < inner.len() - 1 {
    let ch = inner[i];
    if ch == '\\' && i + 1 < inner.len() - 1 {
      i += 1;
      out.push(match inner[i] {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'v' => '\u{b}',
        '\n' => {
          i += 1;
          continue;
        }
        other => other,
      });
    } else {
      out.push(ch);
    }
    i += 1;
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::new("/test.js", source)
      .tokenize()
      .unwrap()
      .into_iter()
      .map(|t| t.kind)
      .collect()
  }

  #[test]
  fn lexes_punctuation_maximally() {
    assert_eq!(
      kinds("a >>>= b !== c ?? d"),
      vec![
        TokenKind::Ident("a".into()),
        TokenKind::UShrAssign,
        TokenKind::Ident("b".into()),
        TokenKind::StrictNotEq,
        TokenKind::Ident("c".into()),
        TokenKind::Nullish,
        TokenKind::Ident("d".into()),
        TokenKind::Eof,
      ]
    );
  }

  #[test]
  fn distinguishes_regex_from_division() {
    assert!(matches!(kinds("a / b")[1], TokenKind::Slash));
    assert!(matches!(kinds("let re = /ab[/]c/g")[3], TokenKind::Regex(_)));
    assert!(matches!(kinds("return /x/")[1], TokenKind::Regex(_)));
  }

  #[test]
  fn templates_swallow_nested_substitutions() {
    let toks = kinds("`a${`b${c}`}d`");
    assert_eq!(toks.len(), 2);
    assert!(matches!(&toks[0], TokenKind::Template(raw) if raw == "`a${`b${c}`}d`"));
  }

  #[test]
  fn tracks_newline_and_pure_annotations() {
    let tokens = Lexer::new("/test.js", "a\nb /* @__PURE__ */ c()")
      .tokenize()
      .unwrap();
    assert!(tokens[1].newline_before);
    assert!(tokens[2].pure_before);
    assert_eq!(tokens[1].loc.line, 1);
  }

  #[test]
  fn cooks_escapes() {
    assert_eq!(cook_string(r#""a\nb""#), "a\nb");
    assert_eq!(cook_string(r#"'it\'s'"#), "it's");
  }
}
