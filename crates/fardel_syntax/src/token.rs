use fardel_common::Loc;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
  Ident(String),
  Num(String),
  /// Raw text including the quotes.
  Str(String),
  /// Raw text including the backticks; substitutions are split by the parser.
  Template(String),
  /// Raw text including the slashes and flags.
  Regex(String),

  LParen,
  RParen,
  LBrace,
  RBrace,
  LBracket,
  RBracket,
  Semi,
  Comma,
  Dot,
  DotDotDot,
  Arrow,
  Question,
  Colon,

  Assign,
  PlusAssign,
  MinusAssign,
  StarAssign,
  SlashAssign,
  PercentAssign,
  AmpAssign,
  PipeAssign,
  CaretAssign,
  ShlAssign,
  ShrAssign,
  UShrAssign,
  ExpAssign,

  Plus,
  Minus,
  Star,
  StarStar,
  Slash,
  Percent,
  PlusPlus,
  MinusMinus,

  EqEq,
  NotEq,
  StrictEq,
  StrictNotEq,
  Lt,
  Gt,
  LtEq,
  GtEq,
  Shl,
  Shr,
  UShr,

  Amp,
  Pipe,
  Caret,
  Tilde,
  Bang,
  AndAnd,
  OrOr,
  Nullish,

  Eof,
}

impl TokenKind {
  pub fn ident(&self) -> Option<&str> {
    match self {
      TokenKind::Ident(name) => Some(name),
      _ => None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub loc: Loc,
  pub newline_before: bool,
  /// A `/* @__PURE__ */` annotation immediately precedes this token.
  pub pure_before: bool,
}
