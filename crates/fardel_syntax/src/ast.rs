//! Tagged-variant AST. Nodes carry the source location of their first token
//! so the printer can emit source-map segments. Identifiers carry the symbol
//! they resolved to once the scanner has run.

use fardel_common::{Loc, SymbolRef};

#[derive(Debug, Clone)]
pub struct Module {
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Ident {
  pub name: String,
  pub loc: Loc,
  pub sym: Option<SymbolRef>,
}

impl Ident {
  pub fn new(name: impl Into<String>, loc: Loc) -> Self {
    Self {
      name: name.into(),
      loc,
      sym: None,
    }
  }

  pub fn with_sym(name: impl Into<String>, sym: SymbolRef) -> Self {
    Self {
      name: name.into(),
      loc: Loc::default(),
      sym: Some(sym),
    }
  }
}

#[derive(Debug, Clone)]
pub enum Lit {
  /// Raw literal text, printed verbatim.
  Num(String),
  /// Raw text including quotes.
  Str(String),
  Bool(bool),
  Null,
  Undefined,
  Regex(String),
}

#[derive(Debug, Clone)]
pub struct Template {
  /// Raw chunks; always `exprs.len() + 1` entries.
  pub quasis: Vec<String>,
  pub exprs: Vec<Expr>,
  pub loc: Loc,
}

#[derive(Debug, Clone)]
pub enum MemberProp {
  Ident(String, Loc),
  Computed(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Minus,
  Plus,
  Bang,
  Tilde,
  TypeOf,
  Void,
  Delete,
}

impl UnaryOp {
  pub fn as_str(self) -> &'static str {
    match self {
      UnaryOp::Minus => "-",
      UnaryOp::Plus => "+",
      UnaryOp::Bang => "!",
      UnaryOp::Tilde => "~",
      UnaryOp::TypeOf => "typeof",
      UnaryOp::Void => "void",
      UnaryOp::Delete => "delete",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Exp,
  Shl,
  Shr,
  UShr,
  Lt,
  Gt,
  LtEq,
  GtEq,
  EqEq,
  NotEq,
  StrictEq,
  StrictNotEq,
  BitAnd,
  BitOr,
  BitXor,
  And,
  Or,
  Nullish,
  In,
  InstanceOf,
}

impl BinOp {
  pub fn as_str(self) -> &'static str {
    match self {
      BinOp::Add => "+",
      BinOp::Sub => "-",
      BinOp::Mul => "*",
      BinOp::Div => "/",
      BinOp::Mod => "%",
      BinOp::Exp => "**",
      BinOp::Shl => "<<",
      BinOp::Shr => ">>",
      BinOp::UShr => ">>>",
      BinOp::Lt => "<",
      BinOp::Gt => ">",
      BinOp::LtEq => "<=",
      BinOp::GtEq => ">=",
      BinOp::EqEq => "==",
      BinOp::NotEq => "!=",
      BinOp::StrictEq => "===",
      BinOp::StrictNotEq => "!==",
      BinOp::BitAnd => "&",
      BinOp::BitOr => "|",
      BinOp::BitXor => "^",
      BinOp::And => "&&",
      BinOp::Or => "||",
      BinOp::Nullish => "??",
      BinOp::In => "in",
      BinOp::InstanceOf => "instanceof",
    }
  }

  /// Binding power for the precedence-climbing parser and the printer.
  pub fn precedence(self) -> u8 {
    match self {
      BinOp::Nullish => 4,
      BinOp::Or => 5,
      BinOp::And => 6,
      BinOp::BitOr => 7,
      BinOp::BitXor => 8,
      BinOp::BitAnd => 9,
      BinOp::EqEq | BinOp::NotEq | BinOp::StrictEq | BinOp::StrictNotEq => 10,
      BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq | BinOp::In | BinOp::InstanceOf => 11,
      BinOp::Shl | BinOp::Shr | BinOp::UShr => 12,
      BinOp::Add | BinOp::Sub => 13,
      BinOp::Mul | BinOp::Div | BinOp::Mod => 14,
      BinOp::Exp => 15,
    }
  }

  pub fn right_associative(self) -> bool {
    self == BinOp::Exp
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
  Assign,
  Add,
  Sub,
  Mul,
  Div,
  Mod,
  Exp,
  Shl,
  Shr,
  UShr,
  BitAnd,
  BitOr,
  BitXor,
}

impl AssignOp {
  pub fn as_str(self) -> &'static str {
    match self {
      AssignOp::Assign => "=",
      AssignOp::Add => "+=",
      AssignOp::Sub => "-=",
      AssignOp::Mul => "*=",
      AssignOp::Div => "/=",
      AssignOp::Mod => "%=",
      AssignOp::Exp => "**=",
      AssignOp::Shl => "<<=",
      AssignOp::Shr => ">>=",
      AssignOp::UShr => ">>>=",
      AssignOp::BitAnd => "&=",
      AssignOp::BitOr => "|=",
      AssignOp::BitXor => "^=",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
  Inc,
  Dec,
}

#[derive(Debug, Clone)]
pub enum Expr {
  Ident(Ident),
  Lit { value: Lit, loc: Loc },
  Template(Template),
  Array {
    elems: Vec<Option<Expr>>,
    loc: Loc,
  },
  Object {
    props: Vec<Prop>,
    loc: Loc,
  },
  Func(Box<Function>),
  Arrow(Box<Arrow>),
  ClassExpr {
    ident: Option<String>,
    class: Box<Class>,
    loc: Loc,
  },
  Unary {
    op: UnaryOp,
    arg: Box<Expr>,
    loc: Loc,
  },
  Update {
    op: UpdateOp,
    prefix: bool,
    arg: Box<Expr>,
    loc: Loc,
  },
  Binary {
    op: BinOp,
    left: Box<Expr>,
    right: Box<Expr>,
    loc: Loc,
  },
  Assign {
    op: AssignOp,
    target: Box<Expr>,
    value: Box<Expr>,
    loc: Loc,
  },
  Cond {
    test: Box<Expr>,
    cons: Box<Expr>,
    alt: Box<Expr>,
    loc: Loc,
  },
  Call {
    callee: Box<Expr>,
    args: Vec<Expr>,
    /// `/* @__PURE__ */` annotation on the call site.
    pure: bool,
    /// Set by the scanner when this is a `require(...)` of a bundled module.
    import_record: Option<u32>,
    loc: Loc,
  },
  New {
    callee: Box<Expr>,
    args: Vec<Expr>,
    /// `/* @__PURE__ */` annotation on the construction.
    pure: bool,
    loc: Loc,
  },
  Member {
    obj: Box<Expr>,
    prop: MemberProp,
    loc: Loc,
  },
  Seq {
    exprs: Vec<Expr>,
    loc: Loc,
  },
  Spread {
    arg: Box<Expr>,
    loc: Loc,
  },
  DynamicImport {
    arg: Box<Expr>,
    import_record: Option<u32>,
    loc: Loc,
  },
  This(Loc),
  TaggedTemplate {
    tag: Box<Expr>,
    quasi: Template,
    loc: Loc,
  },
  Await {
    arg: Box<Expr>,
    loc: Loc,
  },
  Yield {
    arg: Option<Box<Expr>>,
    delegate: bool,
    loc: Loc,
  },
}

impl Expr {
  pub fn loc(&self) -> Loc {
    match self {
      Expr::Ident(i) => i.loc,
      Expr::Lit { loc, .. }
      | Expr::Array { loc, .. }
      | Expr::Object { loc, .. }
      | Expr::ClassExpr { loc, .. }
      | Expr::Unary { loc, .. }
      | Expr::Update { loc, .. }
      | Expr::Binary { loc, .. }
      | Expr::Assign { loc, .. }
      | Expr::Cond { loc, .. }
      | Expr::Call { loc, .. }
      | Expr::New { loc, .. }
      | Expr::Member { loc, .. }
      | Expr::Seq { loc, .. }
      | Expr::Spread { loc, .. }
      | Expr::DynamicImport { loc, .. }
      | Expr::TaggedTemplate { loc, .. }
      | Expr::Await { loc, .. }
      | Expr::Yield { loc, .. }
      | Expr::This(loc) => *loc,
      Expr::Template(t) => t.loc,
      Expr::Func(f) => f.loc,
      Expr::Arrow(a) => a.loc,
    }
  }
}

#[derive(Debug, Clone)]
pub enum PropKey {
  Ident(String, Loc),
  Str(String, Loc),
  Num(String, Loc),
  Computed(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
  Method,
  Getter,
  Setter,
}

#[derive(Debug, Clone)]
pub enum Prop {
  KeyValue { key: PropKey, value: Expr },
  Shorthand(Ident),
  Method {
    key: PropKey,
    function: Function,
    kind: MethodKind,
  },
  Spread(Expr),
}

#[derive(Debug, Clone)]
pub struct Function {
  pub ident: Option<Ident>,
  pub params: Vec<Pat>,
  pub body: Vec<Stmt>,
  pub is_async: bool,
  pub is_generator: bool,
  pub loc: Loc,
}

#[derive(Debug, Clone)]
pub enum ArrowBody {
  Expr(Box<Expr>),
  Block(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub struct Arrow {
  pub params: Vec<Pat>,
  pub body: ArrowBody,
  pub is_async: bool,
  pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct Class {
  pub super_class: Option<Box<Expr>>,
  pub members: Vec<ClassMember>,
  pub loc: Loc,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
  Method {
    key: PropKey,
    function: Function,
    is_static: bool,
    kind: MethodKind,
  },
  Field {
    key: PropKey,
    value: Option<Expr>,
    is_static: bool,
  },
}

#[derive(Debug, Clone)]
pub enum Pat {
  Ident(Ident),
  Array {
    elems: Vec<Option<Pat>>,
    loc: Loc,
  },
  Object {
    props: Vec<ObjectPatProp>,
    loc: Loc,
  },
  Assign {
    pat: Box<Pat>,
    default: Box<Expr>,
    loc: Loc,
  },
  Rest {
    arg: Box<Pat>,
    loc: Loc,
  },
}

#[derive(Debug, Clone)]
pub enum ObjectPatProp {
  KeyValue { key: PropKey, value: Pat },
  Shorthand {
    ident: Ident,
    default: Option<Expr>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
  Var,
  Let,
  Const,
}

impl VarKind {
  pub fn as_str(self) -> &'static str {
    match self {
      VarKind::Var => "var",
      VarKind::Let => "let",
      VarKind::Const => "const",
    }
  }
}

#[derive(Debug, Clone)]
pub struct Declarator {
  pub pat: Pat,
  pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
  pub function: Function,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
  pub ident: Ident,
  pub class: Class,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
  pub param: Option<Pat>,
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
  pub test: Option<Expr>,
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum ForInit {
  VarDecl {
    kind: VarKind,
    decls: Vec<Declarator>,
  },
  Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum ForHead {
  VarDecl { kind: VarKind, pat: Pat },
  Pat(Pat),
}

#[derive(Debug, Clone)]
pub struct ImportNamedSpec {
  pub imported: String,
  pub local: Ident,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
  pub specifier: String,
  pub default: Option<Ident>,
  pub namespace: Option<Ident>,
  pub named: Vec<ImportNamedSpec>,
  pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct ExportNamedSpec {
  pub local: Ident,
  pub exported: String,
}

#[derive(Debug, Clone)]
pub struct NamedExportDecl {
  pub specifiers: Vec<ExportNamedSpec>,
  pub src: Option<String>,
  pub loc: Loc,
}

#[derive(Debug, Clone)]
pub enum ExportDefaultValue {
  Expr(Expr),
  Func(FuncDecl),
  Class(ClassDecl),
}

#[derive(Debug, Clone)]
pub enum Stmt {
  VarDecl {
    kind: VarKind,
    decls: Vec<Declarator>,
    loc: Loc,
  },
  Func(FuncDecl),
  Class(ClassDecl),
  Expr {
    expr: Expr,
    loc: Loc,
  },
  Return {
    arg: Option<Expr>,
    loc: Loc,
  },
  If {
    test: Expr,
    cons: Box<Stmt>,
    alt: Option<Box<Stmt>>,
    loc: Loc,
  },
  Block {
    stmts: Vec<Stmt>,
    loc: Loc,
  },
  For {
    init: Option<ForInit>,
    test: Option<Expr>,
    update: Option<Expr>,
    body: Box<Stmt>,
    loc: Loc,
  },
  ForIn {
    head: ForHead,
    obj: Expr,
    body: Box<Stmt>,
    is_of: bool,
    loc: Loc,
  },
  While {
    test: Expr,
    body: Box<Stmt>,
    loc: Loc,
  },
  DoWhile {
    body: Box<Stmt>,
    test: Expr,
    loc: Loc,
  },
  Labeled {
    label: String,
    body: Box<Stmt>,
    loc: Loc,
  },
  Break {
    label: Option<String>,
    loc: Loc,
  },
  Continue {
    label: Option<String>,
    loc: Loc,
  },
  Throw {
    arg: Expr,
    loc: Loc,
  },
  Try {
    block: Vec<Stmt>,
    catch: Option<CatchClause>,
    finally: Option<Vec<Stmt>>,
    loc: Loc,
  },
  Switch {
    disc: Expr,
    cases: Vec<SwitchCase>,
    loc: Loc,
  },
  Empty {
    loc: Loc,
  },

  // module items
  Import(ImportDecl),
  ExportNamed(NamedExportDecl),
  ExportDecl {
    decl: Box<Stmt>,
    loc: Loc,
  },
  ExportDefault {
    value: ExportDefaultValue,
    /// The symbol holding the default export, created by the scanner.
    sym: Option<SymbolRef>,
    loc: Loc,
  },
  ExportAll {
    specifier: String,
    as_ns: Option<Ident>,
    loc: Loc,
  },
}

impl Stmt {
  pub fn loc(&self) -> Loc {
    match self {
      Stmt::VarDecl { loc, .. }
      | Stmt::Expr { loc, .. }
      | Stmt::Return { loc, .. }
      | Stmt::If { loc, .. }
      | Stmt::Block { loc, .. }
      | Stmt::For { loc, .. }
      | Stmt::ForIn { loc, .. }
      | Stmt::While { loc, .. }
      | Stmt::DoWhile { loc, .. }
      | Stmt::Labeled { loc, .. }
      | Stmt::Break { loc, .. }
      | Stmt::Continue { loc, .. }
      | Stmt::Throw { loc, .. }
      | Stmt::Try { loc, .. }
      | Stmt::Switch { loc, .. }
      | Stmt::Empty { loc }
      | Stmt::ExportDecl { loc, .. }
      | Stmt::ExportDefault { loc, .. }
      | Stmt::ExportAll { loc, .. } => *loc,
      Stmt::Func(f) => f.function.loc,
      Stmt::Class(c) => c.ident.loc,
      Stmt::Import(i) => i.loc,
      Stmt::ExportNamed(e) => e.loc,
    }
  }

  pub fn is_module_decl(&self) -> bool {
    matches!(
      self,
      Stmt::Import(_)
        | Stmt::ExportNamed(_)
        | Stmt::ExportDecl { .. }
        | Stmt::ExportDefault { .. }
        | Stmt::ExportAll { .. }
    )
  }
}
