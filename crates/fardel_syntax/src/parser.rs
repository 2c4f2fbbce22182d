use fardel_common::Loc;
use fardel_error::{Error, Location, Result};

use crate::ast::*;
use crate::lexer::{cook_string, Lexer};
use crate::token::{Token, TokenKind};

/// Recursive-descent parser over the pre-lexed token stream. Expressions use
/// precedence climbing. The parser stops at the first syntax error of a file;
/// the driver keeps collecting errors across files.
pub struct Parser<'a> {
  path: &'a str,
  source: &'a str,
  tokens: Vec<Token>,
  pos: usize,
  no_in: bool,
  /// Labels currently in scope; cleared across function boundaries.
  labels: Vec<String>,
}

impl<'a> Parser<'a> {
  pub fn new(path: &'a str, source: &'a str) -> Result<Self> {
    let tokens = Lexer::new(path, source).tokenize()?;
    Ok(Self {
      path,
      source,
      tokens,
      pos: 0,
      no_in: false,
      labels: vec![],
    })
  }

  pub fn parse_module(mut self) -> Result<Module> {
    let mut body = vec![];
    while !self.at(&TokenKind::Eof) {
      body.push(self.parse_stmt(true)?);
    }
    Ok(Module { body })
  }

  /// Parse a standalone expression, used for template substitutions and
  /// `--define` replacement values.
  pub fn parse_expr_source(path: &str, source: &str) -> Result<Expr> {
    let mut parser = Parser::new(path, source)?;
    let expr = parser.parse_assign()?;
    parser.expect_kind(&TokenKind::Eof)?;
    Ok(expr)
  }

  // --- token plumbing

  fn cur(&self) -> &Token {
    &self.tokens[self.pos]
  }

  fn kind(&self) -> &TokenKind {
    &self.tokens[self.pos].kind
  }

  fn peek_kind(&self) -> &TokenKind {
    &self
      .tokens
      .get(self.pos + 1)
      .unwrap_or(&self.tokens[self.tokens.len() - 1])
      .kind
  }

  fn loc(&self) -> Loc {
    self.cur().loc
  }

  fn bump(&mut self) -> Token {
    let token = self.tokens[self.pos].clone();
    if self.pos + 1 < self.tokens.len() {
      self.pos += 1;
    }
    token
  }

  fn at(&self, kind: &TokenKind) -> bool {
    self.kind() == kind
  }

  fn at_ident(&self, name: &str) -> bool {
    matches!(self.kind(), TokenKind::Ident(n) if n == name)
  }

  fn eat(&mut self, kind: &TokenKind) -> bool {
    if self.at(kind) {
      self.bump();
      true
    } else {
      false
    }
  }

  fn eat_ident(&mut self, name: &str) -> bool {
    if self.at_ident(name) {
      self.bump();
      true
    } else {
      false
    }
  }

  fn error_at(&self, loc: Loc, message: impl Into<String>) -> Error {
    let location = Location::from_source(self.path, self.source, loc.line, loc.col);
    Error::parse_failed(self.path, message, Some(location))
  }

  fn unexpected(&self, what: &str) -> Error {
    self.error_at(self.loc(), format!("Unexpected token, expected {what}"))
  }

  fn expect_kind(&mut self, kind: &TokenKind) -> Result<Token> {
    if self.at(kind) {
      Ok(self.bump())
    } else {
      Err(self.unexpected(&format!("{kind:?}")))
    }
  }

  fn expect_ident_name(&mut self) -> Result<(String, Loc)> {
    let loc = self.loc();
    match self.kind().clone() {
      TokenKind::Ident(name) => {
        self.bump();
        Ok((name, loc))
      }
      _ => Err(self.unexpected("an identifier")),
    }
  }

  fn expect_string(&mut self) -> Result<String> {
    let loc = self.loc();
    match self.kind().clone() {
      TokenKind::Str(raw) => {
        self.bump();
        Ok(cook_string(&raw))
      }
      _ => Err(self.error_at(loc, "Expected a string literal")),
    }
  }

  /// Automatic semicolon insertion: an explicit `;`, a closing `}`, end of
  /// file, or a preceding line break all terminate the statement.
  fn semicolon(&mut self) -> Result<()> {
    if self.eat(&TokenKind::Semi) {
      return Ok(());
    }
    if self.at(&TokenKind::RBrace) || self.at(&TokenKind::Eof) || self.cur().newline_before {
      return Ok(());
    }
    Err(self.unexpected("\";\""))
  }

  // --- statements

  fn parse_stmt(&mut self, top_level: bool) -> Result<Stmt> {
    let loc = self.loc();
    match self.kind().clone() {
      TokenKind::Semi => {
        self.bump();
        Ok(Stmt::Empty { loc })
      }
      TokenKind::LBrace => {
        let stmts = self.parse_block()?;
        Ok(Stmt::Block { stmts, loc })
      }
      TokenKind::Ident(name) => {
        // `label: statement`
        if matches!(self.peek_kind(), TokenKind::Colon)
          && !matches!(name.as_str(), "default" | "case")
        {
          self.bump(); // label
          self.bump(); // :
          self.labels.push(name.clone());
          let body = self.parse_stmt(false);
          self.labels.pop();
          return Ok(Stmt::Labeled {
            label: name,
            body: Box::new(body?),
            loc,
          });
        }
        match name.as_str() {
          "import"
            if top_level
              && !matches!(self.peek_kind(), TokenKind::LParen | TokenKind::Dot) =>
          {
            self.parse_import_decl()
          }
          "export" if top_level => self.parse_export_decl(),
          "var" | "const" => self.parse_var_stmt(),
          "let"
            if matches!(
              self.peek_kind(),
              TokenKind::Ident(_) | TokenKind::LBracket | TokenKind::LBrace
            ) =>
          {
            self.parse_var_stmt()
          }
          "function" => {
            self.bump();
            Ok(Stmt::Func(FuncDecl {
              function: self.parse_function_tail(false, loc)?,
            }))
          }
          "async" if matches!(self.peek_kind(), TokenKind::Ident(n) if n == "function") => {
            self.bump();
            self.bump();
            Ok(Stmt::Func(FuncDecl {
              function: self.parse_function_tail(true, loc)?,
            }))
          }
          "class" => {
            self.bump();
            let ident = {
              let (name, id_loc) = self.expect_ident_name()?;
              Ident::new(name, id_loc)
            };
            let class = self.parse_class_tail(loc)?;
            Ok(Stmt::Class(ClassDecl { ident, class }))
          }
          "return" => {
            self.bump();
            let arg = if self.at(&TokenKind::Semi)
              || self.at(&TokenKind::RBrace)
              || self.at(&TokenKind::Eof)
              || self.cur().newline_before
            {
              None
            } else {
              Some(self.parse_expr()?)
            };
            self.semicolon()?;
            Ok(Stmt::Return { arg, loc })
          }
          "if" => {
            self.bump();
            self.expect_kind(&TokenKind::LParen)?;
            let test = self.parse_expr()?;
            self.expect_kind(&TokenKind::RParen)?;
            let cons = Box::new(self.parse_stmt(false)?);
            let alt = if self.eat_ident("else") {
              Some(Box::new(self.parse_stmt(false)?))
            } else {
              None
            };
            Ok(Stmt::If {
              test,
              cons,
              alt,
              loc,
            })
          }
          "for" => self.parse_for(),
          "while" => {
            self.bump();
            self.expect_kind(&TokenKind::LParen)?;
            let test = self.parse_expr()?;
            self.expect_kind(&TokenKind::RParen)?;
            let body = Box::new(self.parse_stmt(false)?);
            Ok(Stmt::While { test, body, loc })
          }
          "do" => {
            self.bump();
            let body = Box::new(self.parse_stmt(false)?);
            if !self.eat_ident("while") {
              return Err(self.unexpected("\"while\""));
            }
            self.expect_kind(&TokenKind::LParen)?;
            let test = self.parse_expr()?;
            self.expect_kind(&TokenKind::RParen)?;
            self.eat(&TokenKind::Semi);
            Ok(Stmt::DoWhile { body, test, loc })
          }
          "break" => {
            self.bump();
            let label = self.parse_jump_label()?;
            self.semicolon()?;
            Ok(Stmt::Break { label, loc })
          }
          "continue" => {
            self.bump();
            let label = self.parse_jump_label()?;
            self.semicolon()?;
            Ok(Stmt::Continue { label, loc })
          }
          "throw" => {
            self.bump();
            if self.cur().newline_before {
              return Err(self.error_at(loc, "Illegal newline after \"throw\""));
            }
            let arg = self.parse_expr()?;
            self.semicolon()?;
            Ok(Stmt::Throw { arg, loc })
          }
          "try" => self.parse_try(),
          "switch" => self.parse_switch(),
          _ => self.parse_expr_stmt(),
        }
      }
      _ => self.parse_expr_stmt(),
    }
  }

  /// Optional label after `break`/`continue`; a line break before the
  /// identifier ends the statement instead (ASI restricted production).
  fn parse_jump_label(&mut self) -> Result<Option<String>> {
    if self.cur().newline_before {
      return Ok(None);
    }
    let TokenKind::Ident(name) = self.kind().clone() else {
      return Ok(None);
    };
    let loc = self.loc();
    self.bump();
    if !self.labels.contains(&name) {
      return Err(self.error_at(loc, format!("Undefined label \"{name}\"")));
    }
    Ok(Some(name))
  }

  fn parse_expr_stmt(&mut self) -> Result<Stmt> {
    let loc = self.loc();
    let expr = self.parse_expr()?;
    self.semicolon()?;
    Ok(Stmt::Expr { expr, loc })
  }

  fn parse_block(&mut self) -> Result<Vec<Stmt>> {
    self.expect_kind(&TokenKind::LBrace)?;
    let mut stmts = vec![];
    while !self.at(&TokenKind::RBrace) {
      if self.at(&TokenKind::Eof) {
        return Err(self.unexpected("\"}\""));
      }
      stmts.push(self.parse_stmt(false)?);
    }
    self.bump();
    Ok(stmts)
  }

  fn parse_var_stmt(&mut self) -> Result<Stmt> {
    let loc = self.loc();
    let kind = self.parse_var_kind()?;
    let decls = self.parse_declarators()?;
    self.semicolon()?;
    Ok(Stmt::VarDecl { kind, decls, loc })
  }

  fn parse_var_kind(&mut self) -> Result<VarKind> {
    let (name, loc) = self.expect_ident_name()?;
    match name.as_str() {
      "var" => Ok(VarKind::Var),
      "let" => Ok(VarKind::Let),
      "const" => Ok(VarKind::Const),
      _ => Err(self.error_at(loc, "Expected a declaration keyword")),
    }
  }

  fn parse_declarators(&mut self) -> Result<Vec<Declarator>> {
    let mut decls = vec![];
    loop {
      let pat = self.parse_binding_pat()?;
      let init = if self.eat(&TokenKind::Assign) {
        Some(self.parse_assign()?)
      } else {
        None
      };
      decls.push(Declarator { pat, init });
      if !self.eat(&TokenKind::Comma) {
        break;
      }
    }
    Ok(decls)
  }

  fn parse_for(&mut self) -> Result<Stmt> {
    let loc = self.loc();
    self.bump(); // for
    self.expect_kind(&TokenKind::LParen)?;

    if self.eat(&TokenKind::Semi) {
      return self.parse_for_classic(None, loc);
    }

    let is_decl = self.at_ident("var")
      || self.at_ident("const")
      || (self.at_ident("let")
        && matches!(
          self.peek_kind(),
          TokenKind::Ident(_) | TokenKind::LBracket | TokenKind::LBrace
        ));

    if is_decl {
      let kind = self.parse_var_kind()?;
      let pat = self.parse_binding_pat()?;
      if self.at_ident("in") || self.at_ident("of") {
        let is_of = self.at_ident("of");
        self.bump();
        let obj = self.parse_assign()?;
        self.expect_kind(&TokenKind::RParen)?;
        let body = Box::new(self.parse_stmt(false)?);
        return Ok(Stmt::ForIn {
          head: ForHead::VarDecl { kind, pat },
          obj,
          body,
          is_of,
          loc,
        });
      }
      // Back to a classic for: finish this declarator and the rest.
      let init = if self.eat(&TokenKind::Assign) {
        self.no_in = true;
        let init = self.parse_assign();
        self.no_in = false;
        Some(init?)
      } else {
        None
      };
      let mut decls = vec![Declarator { pat, init }];
      if self.eat(&TokenKind::Comma) {
        self.no_in = true;
        let more = self.parse_declarators();
        self.no_in = false;
        decls.extend(more?);
      }
      self.expect_kind(&TokenKind::Semi)?;
      return self.parse_for_classic(Some(ForInit::VarDecl { kind, decls }), loc);
    }

    self.no_in = true;
    let first = self.parse_expr();
    self.no_in = false;
    let first = first?;
    if self.at_ident("in") || self.at_ident("of") {
      let is_of = self.at_ident("of");
      self.bump();
      let head = match first {
        Expr::Ident(ident) => ForHead::Pat(Pat::Ident(ident)),
        other => {
          return Err(self.error_at(
            other.loc(),
            "Unsupported assignment target in for-in/for-of",
          ))
        }
      };
      let obj = self.parse_assign()?;
      self.expect_kind(&TokenKind::RParen)?;
      let body = Box::new(self.parse_stmt(false)?);
      return Ok(Stmt::ForIn {
        head,
        obj,
        body,
        is_of,
        loc,
      });
    }
    self.expect_kind(&TokenKind::Semi)?;
    self.parse_for_classic(Some(ForInit::Expr(first)), loc)
  }

  fn parse_for_classic(&mut self, init: Option<ForInit>, loc: Loc) -> Result<Stmt> {
    let test = if self.at(&TokenKind::Semi) {
      None
    } else {
      Some(self.parse_expr()?)
    };
    self.expect_kind(&TokenKind::Semi)?;
    let update = if self.at(&TokenKind::RParen) {
      None
    } else {
      Some(self.parse_expr()?)
    };
    self.expect_kind(&TokenKind::RParen)?;
    let body = Box::new(self.parse_stmt(false)?);
    Ok(Stmt::For {
      init,
      test,
      update,
      body,
      loc,
    })
  }

  fn parse_try(&mut self) -> Result<Stmt> {
    let loc = self.loc();
    self.bump(); // try
    let block = self.parse_block()?;
    let catch = if self.eat_ident("catch") {
      let param = if self.eat(&TokenKind::LParen) {
        let pat = self.parse_binding_pat()?;
        self.expect_kind(&TokenKind::RParen)?;
        Some(pat)
      } else {
        None
      };
      let body = self.parse_block()?;
      Some(CatchClause { param, body })
    } else {
      None
    };
    let finally = if self.eat_ident("finally") {
      Some(self.parse_block()?)
    } else {
      None
    };
    if catch.is_none() && finally.is_none() {
      return Err(self.unexpected("\"catch\" or \"finally\""));
    }
    Ok(Stmt::Try {
      block,
      catch,
      finally,
      loc,
    })
  }

  fn parse_switch(&mut self) -> Result<Stmt> {
    let loc = self.loc();
    self.bump(); // switch
    self.expect_kind(&TokenKind::LParen)?;
    let disc = self.parse_expr()?;
    self.expect_kind(&TokenKind::RParen)?;
    self.expect_kind(&TokenKind::LBrace)?;
    let mut cases = vec![];
    while !self.eat(&TokenKind::RBrace) {
      let test = if self.eat_ident("case") {
        let test = self.parse_expr()?;
        Some(test)
      } else if self.eat_ident("default") {
        None
      } else {
        return Err(self.unexpected("\"case\" or \"default\""));
      };
      self.expect_kind(&TokenKind::Colon)?;
      let mut body = vec![];
      while !self.at(&TokenKind::RBrace) && !self.at_ident("case") && !self.at_ident("default") {
        body.push(self.parse_stmt(false)?);
      }
      cases.push(SwitchCase { test, body });
    }
    Ok(Stmt::Switch { disc, cases, loc })
  }

  // --- module items

  fn parse_import_decl(&mut self) -> Result<Stmt> {
    let loc = self.loc();
    self.bump(); // import

    if let TokenKind::Str(raw) = self.kind().clone() {
      self.bump();
      self.semicolon()?;
      return Ok(Stmt::Import(ImportDecl {
        specifier: cook_string(&raw),
        default: None,
        namespace: None,
        named: vec![],
        loc,
      }));
    }

    let mut default = None;
    let mut namespace = None;
    let mut named = vec![];

    if let TokenKind::Ident(name) = self.kind().clone() {
      if name != "from" {
        let id_loc = self.loc();
        self.bump();
        default = Some(Ident::new(name, id_loc));
        if self.eat(&TokenKind::Comma) {
          // fall through to * or {
        } else {
          if !self.eat_ident("from") {
            return Err(self.unexpected("\"from\""));
          }
          let specifier = self.expect_string()?;
          self.semicolon()?;
          return Ok(Stmt::Import(ImportDecl {
            specifier,
            default,
            namespace,
            named,
            loc,
          }));
        }
      }
    }

    if self.eat(&TokenKind::Star) {
      if !self.eat_ident("as") {
        return Err(self.unexpected("\"as\""));
      }
      let (name, id_loc) = self.expect_ident_name()?;
      namespace = Some(Ident::new(name, id_loc));
    } else if self.at(&TokenKind::LBrace) {
      self.bump();
      while !self.eat(&TokenKind::RBrace) {
        let (imported, spec_loc) = match self.kind().clone() {
          TokenKind::Ident(name) => {
            self.bump();
            (name, spec_loc_of(self, 1))
          }
          TokenKind::Str(raw) => {
            self.bump();
            (cook_string(&raw), spec_loc_of(self, 1))
          }
          _ => return Err(self.unexpected("an import specifier")),
        };
        let local = if self.eat_ident("as") {
          let (name, id_loc) = self.expect_ident_name()?;
          Ident::new(name, id_loc)
        } else {
          Ident::new(imported.clone(), spec_loc)
        };
        named.push(ImportNamedSpec { imported, local });
        if !self.at(&TokenKind::RBrace) {
          self.expect_kind(&TokenKind::Comma)?;
        }
      }
    } else {
      return Err(self.unexpected("\"*\" or \"{\""));
    }

    if !self.eat_ident("from") {
      return Err(self.unexpected("\"from\""));
    }
    let specifier = self.expect_string()?;
    self.semicolon()?;
    Ok(Stmt::Import(ImportDecl {
      specifier,
      default,
      namespace,
      named,
      loc,
    }))
  }

  fn parse_export_decl(&mut self) -> Result<Stmt> {
    let loc = self.loc();
    self.bump(); // export

    if self.eat(&TokenKind::Star) {
      let as_ns = if self.eat_ident("as") {
        let (name, id_loc) = self.expect_ident_name()?;
        Some(Ident::new(name, id_loc))
      } else {
        None
      };
      if !self.eat_ident("from") {
        return Err(self.unexpected("\"from\""));
      }
      let specifier = self.expect_string()?;
      self.semicolon()?;
      return Ok(Stmt::ExportAll {
        specifier,
        as_ns,
        loc,
      });
    }

    if self.at(&TokenKind::LBrace) {
      self.bump();
      let mut specifiers = vec![];
      while !self.eat(&TokenKind::RBrace) {
        let (local_name, id_loc) = self.expect_ident_name()?;
        let exported = if self.eat_ident("as") {
          let (name, _) = self.expect_ident_name()?;
          name
        } else {
          local_name.clone()
        };
        specifiers.push(ExportNamedSpec {
          local: Ident::new(local_name, id_loc),
          exported,
        });
        if !self.at(&TokenKind::RBrace) {
          self.expect_kind(&TokenKind::Comma)?;
        }
      }
      let src = if self.eat_ident("from") {
        Some(self.expect_string()?)
      } else {
        None
      };
      self.semicolon()?;
      return Ok(Stmt::ExportNamed(NamedExportDecl {
        specifiers,
        src,
        loc,
      }));
    }

    if self.eat_ident("default") {
      let value = if self.at_ident("function")
        || (self.at_ident("async")
          && matches!(self.peek_kind(), TokenKind::Ident(n) if n == "function"))
      {
        let is_async = self.eat_ident("async");
        self.bump(); // function
        let function = self.parse_function_tail_maybe_anon(is_async, loc)?;
        ExportDefaultValue::Func(FuncDecl { function })
      } else if self.at_ident("class") {
        self.bump();
        let ident = if let TokenKind::Ident(name) = self.kind().clone() {
          let id_loc = self.loc();
          self.bump();
          Ident::new(name, id_loc)
        } else {
          Ident::new("", loc)
        };
        let class = self.parse_class_tail(loc)?;
        ExportDefaultValue::Class(ClassDecl { ident, class })
      } else {
        let expr = self.parse_assign()?;
        self.semicolon()?;
        ExportDefaultValue::Expr(expr)
      };
      return Ok(Stmt::ExportDefault {
        value,
        sym: None,
        loc,
      });
    }

    // export <declaration>
    if self.at_ident("var")
      || self.at_ident("let")
      || self.at_ident("const")
      || self.at_ident("function")
      || self.at_ident("class")
      || self.at_ident("async")
    {
      let decl = self.parse_stmt(false)?;
      return Ok(Stmt::ExportDecl {
        decl: Box::new(decl),
        loc,
      });
    }

    Err(self.unexpected("a declaration after \"export\""))
  }

  // --- functions, classes, patterns

  fn parse_function_tail(&mut self, is_async: bool, loc: Loc) -> Result<Function> {
    let is_generator = self.eat(&TokenKind::Star);
    let (name, id_loc) = self.expect_ident_name()?;
    let ident = Some(Ident::new(name, id_loc));
    self.parse_function_rest(ident, is_async, is_generator, loc)
  }

  /// Function whose name is optional (`export default function () {}`).
  fn parse_function_tail_maybe_anon(&mut self, is_async: bool, loc: Loc) -> Result<Function> {
    let is_generator = self.eat(&TokenKind::Star);
    let ident = if let TokenKind::Ident(name) = self.kind().clone() {
      let id_loc = self.loc();
      self.bump();
      Some(Ident::new(name, id_loc))
    } else {
      None
    };
    self.parse_function_rest(ident, is_async, is_generator, loc)
  }

  fn parse_function_rest(
    &mut self,
    ident: Option<Ident>,
    is_async: bool,
    is_generator: bool,
    loc: Loc,
  ) -> Result<Function> {
    let params = self.parse_params()?;
    let body = self.parse_function_body()?;
    Ok(Function {
      ident,
      params,
      body,
      is_async,
      is_generator,
      loc,
    })
  }

  /// A function body opens a fresh label scope; `break outer` cannot jump
  /// across the function boundary.
  fn parse_function_body(&mut self) -> Result<Vec<Stmt>> {
    let saved = std::mem::take(&mut self.labels);
    let body = self.parse_block();
    self.labels = saved;
    body
  }

  fn parse_params(&mut self) -> Result<Vec<Pat>> {
    self.expect_kind(&TokenKind::LParen)?;
    let mut params = vec![];
    while !self.eat(&TokenKind::RParen) {
      params.push(self.parse_binding_element()?);
      if !self.at(&TokenKind::RParen) {
        self.expect_kind(&TokenKind::Comma)?;
      }
    }
    Ok(params)
  }

  fn parse_binding_element(&mut self) -> Result<Pat> {
    let loc = self.loc();
    if self.eat(&TokenKind::DotDotDot) {
      let arg = Box::new(self.parse_binding_pat()?);
      return Ok(Pat::Rest { arg, loc });
    }
    let pat = self.parse_binding_pat()?;
    if self.eat(&TokenKind::Assign) {
      let default = Box::new(self.parse_assign()?);
      return Ok(Pat::Assign {
        pat: Box::new(pat),
        default,
        loc,
      });
    }
    Ok(pat)
  }

  fn parse_binding_pat(&mut self) -> Result<Pat> {
    let loc = self.loc();
    match self.kind().clone() {
      TokenKind::Ident(name) => {
        self.bump();
        Ok(Pat::Ident(Ident::new(name, loc)))
      }
      TokenKind::LBracket => {
        self.bump();
        let mut elems = vec![];
        while !self.eat(&TokenKind::RBracket) {
          if self.eat(&TokenKind::Comma) {
            elems.push(None);
            continue;
          }
          elems.push(Some(self.parse_binding_element()?));
          if !self.at(&TokenKind::RBracket) {
            self.expect_kind(&TokenKind::Comma)?;
          }
        }
        Ok(Pat::Array { elems, loc })
      }
      TokenKind::LBrace => {
        self.bump();
        let mut props = vec![];
        while !self.eat(&TokenKind::RBrace) {
          if self.eat(&TokenKind::DotDotDot) {
            let arg = Box::new(self.parse_binding_pat()?);
            props.push(ObjectPatProp::KeyValue {
              key: PropKey::Ident(String::new(), loc),
              value: Pat::Rest { arg, loc },
            });
          } else {
            let key = self.parse_prop_key()?;
            if self.eat(&TokenKind::Colon) {
              let value = self.parse_binding_element()?;
              props.push(ObjectPatProp::KeyValue { key, value });
            } else {
              let ident = match &key {
                PropKey::Ident(name, key_loc) => Ident::new(name.clone(), *key_loc),
                _ => return Err(self.unexpected("\":\"")),
              };
              let default = if self.eat(&TokenKind::Assign) {
                Some(self.parse_assign()?)
              } else {
                None
              };
              props.push(ObjectPatProp::Shorthand { ident, default });
            }
          }
          if !self.at(&TokenKind::RBrace) {
            self.expect_kind(&TokenKind::Comma)?;
          }
        }
        Ok(Pat::Object { props, loc })
      }
      _ => Err(self.unexpected("a binding pattern")),
    }
  }

  fn parse_prop_key(&mut self) -> Result<PropKey> {
    let loc = self.loc();
    match self.kind().clone() {
      TokenKind::Ident(name) => {
        self.bump();
        Ok(PropKey::Ident(name, loc))
      }
      TokenKind::Str(raw) => {
        self.bump();
        Ok(PropKey::Str(raw, loc))
      }
      TokenKind::Num(raw) => {
        self.bump();
        Ok(PropKey::Num(raw, loc))
      }
      TokenKind::LBracket => {
        self.bump();
        let expr = self.parse_assign()?;
        self.expect_kind(&TokenKind::RBracket)?;
        Ok(PropKey::Computed(Box::new(expr)))
      }
      _ => Err(self.unexpected("a property key")),
    }
  }

  fn parse_class_tail(&mut self, loc: Loc) -> Result<Class> {
    let super_class = if self.eat_ident("extends") {
      Some(Box::new(self.parse_unary_via_postfix()?))
    } else {
      None
    };
    self.expect_kind(&TokenKind::LBrace)?;
    let mut members = vec![];
    while !self.eat(&TokenKind::RBrace) {
      if self.eat(&TokenKind::Semi) {
        continue;
      }
      members.push(self.parse_class_member()?);
    }
    Ok(Class {
      super_class,
      members,
      loc,
    })
  }

  fn parse_class_member(&mut self) -> Result<ClassMember> {
    let is_static = self.at_ident("static")
      && !matches!(
        self.peek_kind(),
        TokenKind::LParen | TokenKind::Assign | TokenKind::Semi | TokenKind::RBrace
      );
    if is_static {
      self.bump();
    }

    let is_async = self.at_ident("async")
      && !matches!(
        self.peek_kind(),
        TokenKind::LParen | TokenKind::Assign | TokenKind::Semi | TokenKind::RBrace
      );
    if is_async {
      self.bump();
    }
    let is_generator = self.eat(&TokenKind::Star);

    let accessor = if (self.at_ident("get") || self.at_ident("set"))
      && !matches!(
        self.peek_kind(),
        TokenKind::LParen | TokenKind::Assign | TokenKind::Semi | TokenKind::RBrace
      ) {
      let kind = if self.at_ident("get") {
        MethodKind::Getter
      } else {
        MethodKind::Setter
      };
      self.bump();
      Some(kind)
    } else {
      None
    };

    let loc = self.loc();
    let key = self.parse_prop_key()?;

    if self.at(&TokenKind::LParen) {
      let params = self.parse_params()?;
      let body = self.parse_function_body()?;
      return Ok(ClassMember::Method {
        key,
        function: Function {
          ident: None,
          params,
          body,
          is_async,
          is_generator,
          loc,
        },
        is_static,
        kind: accessor.unwrap_or(MethodKind::Method),
      });
    }

    let value = if self.eat(&TokenKind::Assign) {
      Some(self.parse_assign()?)
    } else {
      None
    };
    self.semicolon()?;
    Ok(ClassMember::Field {
      key,
      value,
      is_static,
    })
  }

  // --- expressions

  fn parse_expr(&mut self) -> Result<Expr> {
    let loc = self.loc();
    let first = self.parse_assign()?;
    if !self.at(&TokenKind::Comma) {
      return Ok(first);
    }
    let mut exprs = vec![first];
    while self.eat(&TokenKind::Comma) {
      exprs.push(self.parse_assign()?);
    }
    Ok(Expr::Seq { exprs, loc })
  }

  pub(crate) fn parse_assign(&mut self) -> Result<Expr> {
    if let Some(arrow) = self.try_parse_arrow()? {
      return Ok(arrow);
    }

    if self.at_ident("yield") {
      let loc = self.loc();
      self.bump();
      let delegate = self.eat(&TokenKind::Star);
      let arg = if self.at(&TokenKind::Semi)
        || self.at(&TokenKind::RParen)
        || self.at(&TokenKind::RBracket)
        || self.at(&TokenKind::RBrace)
        || self.at(&TokenKind::Comma)
        || self.at(&TokenKind::Colon)
        || self.at(&TokenKind::Eof)
        || self.cur().newline_before
      {
        None
      } else {
        Some(Box::new(self.parse_assign()?))
      };
      return Ok(Expr::Yield {
        arg,
        delegate,
        loc,
      });
    }

    let loc = self.loc();
    let left = self.parse_cond()?;

    let op = match self.kind() {
      TokenKind::Assign => Some(AssignOp::Assign),
      TokenKind::PlusAssign => Some(AssignOp::Add),
      TokenKind::MinusAssign => Some(AssignOp::Sub),
      TokenKind::StarAssign => Some(AssignOp::Mul),
      TokenKind::SlashAssign => Some(AssignOp::Div),
      TokenKind::PercentAssign => Some(AssignOp::Mod),
      TokenKind::ExpAssign => Some(AssignOp::Exp),
      TokenKind::ShlAssign => Some(AssignOp::Shl),
      TokenKind::ShrAssign => Some(AssignOp::Shr),
      TokenKind::UShrAssign => Some(AssignOp::UShr),
      TokenKind::AmpAssign => Some(AssignOp::BitAnd),
      TokenKind::PipeAssign => Some(AssignOp::BitOr),
      TokenKind::CaretAssign => Some(AssignOp::BitXor),
      _ => None,
    };

    if let Some(op) = op {
      if !matches!(left, Expr::Ident(_) | Expr::Member { .. } | Expr::Array { .. } | Expr::Object { .. })
      {
        return Err(self.error_at(left.loc(), "Invalid assignment target"));
      }
      self.bump();
      let value = Box::new(self.parse_assign()?);
      return Ok(Expr::Assign {
        op,
        target: Box::new(left),
        value,
        loc,
      });
    }

    Ok(left)
  }

  fn parse_cond(&mut self) -> Result<Expr> {
    let loc = self.loc();
    let test = self.parse_binary(0)?;
    if self.eat(&TokenKind::Question) {
      let cons = Box::new(self.parse_assign()?);
      self.expect_kind(&TokenKind::Colon)?;
      let alt = Box::new(self.parse_assign()?);
      return Ok(Expr::Cond {
        test: Box::new(test),
        cons,
        alt,
        loc,
      });
    }
    Ok(test)
  }

  fn peek_bin_op(&self) -> Option<BinOp> {
    let op = match self.kind() {
      TokenKind::Plus => BinOp::Add,
      TokenKind::Minus => BinOp::Sub,
      TokenKind::Star => BinOp::Mul,
      TokenKind::Slash => BinOp::Div,
      TokenKind::Percent => BinOp::Mod,
      TokenKind::StarStar => BinOp::Exp,
      TokenKind::Shl => BinOp::Shl,
      TokenKind::Shr => BinOp::Shr,
      TokenKind::UShr => BinOp::UShr,
      TokenKind::Lt => BinOp::Lt,
      TokenKind::Gt => BinOp::Gt,
      TokenKind::LtEq => BinOp::LtEq,
      TokenKind::GtEq => BinOp::GtEq,
      TokenKind::EqEq => BinOp::EqEq,
      TokenKind::NotEq => BinOp::NotEq,
      TokenKind::StrictEq => BinOp::StrictEq,
      TokenKind::StrictNotEq => BinOp::StrictNotEq,
      TokenKind::Amp => BinOp::BitAnd,
      TokenKind::Pipe => BinOp::BitOr,
      TokenKind::Caret => BinOp::BitXor,
      TokenKind::AndAnd => BinOp::And,
      TokenKind::OrOr => BinOp::Or,
      TokenKind::Nullish => BinOp::Nullish,
      TokenKind::Ident(name) if name == "instanceof" => BinOp::InstanceOf,
      TokenKind::Ident(name) if name == "in" && !self.no_in => BinOp::In,
      _ => return None,
    };
    Some(op)
  }

  fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
    let loc = self.loc();
    let mut left = self.parse_unary()?;
    while let Some(op) = self.peek_bin_op() {
      let prec = op.precedence();
      if prec < min_prec {
        break;
      }
      self.bump();
      let next_min = if op.right_associative() { prec } else { prec + 1 };
      let right = self.parse_binary(next_min)?;
      left = Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        loc,
      };
    }
    Ok(left)
  }

  fn parse_unary(&mut self) -> Result<Expr> {
    let loc = self.loc();
    let op = match self.kind() {
      TokenKind::Bang => Some(UnaryOp::Bang),
      TokenKind::Tilde => Some(UnaryOp::Tilde),
      TokenKind::Plus => Some(UnaryOp::Plus),
      TokenKind::Minus => Some(UnaryOp::Minus),
      TokenKind::Ident(name) => match name.as_str() {
        "typeof" => Some(UnaryOp::TypeOf),
        "void" => Some(UnaryOp::Void),
        "delete" => Some(UnaryOp::Delete),
        _ => None,
      },
      _ => None,
    };
    if let Some(op) = op {
      self.bump();
      let arg = Box::new(self.parse_unary()?);
      return Ok(Expr::Unary { op, arg, loc });
    }

    if self.at_ident("await") {
      self.bump();
      let arg = Box::new(self.parse_unary()?);
      return Ok(Expr::Await { arg, loc });
    }

    if self.at(&TokenKind::PlusPlus) || self.at(&TokenKind::MinusMinus) {
      let op = if self.at(&TokenKind::PlusPlus) {
        UpdateOp::Inc
      } else {
        UpdateOp::Dec
      };
      self.bump();
      let arg = Box::new(self.parse_unary()?);
      return Ok(Expr::Update {
        op,
        prefix: true,
        arg,
        loc,
      });
    }

    self.parse_postfix()
  }

  fn parse_postfix(&mut self) -> Result<Expr> {
    let loc = self.loc();
    let expr = self.parse_unary_via_postfix()?;
    if (self.at(&TokenKind::PlusPlus) || self.at(&TokenKind::MinusMinus))
      && !self.cur().newline_before
    {
      let op = if self.at(&TokenKind::PlusPlus) {
        UpdateOp::Inc
      } else {
        UpdateOp::Dec
      };
      self.bump();
      return Ok(Expr::Update {
        op,
        prefix: false,
        arg: Box::new(expr),
        loc,
      });
    }
    Ok(expr)
  }

  fn parse_unary_via_postfix(&mut self) -> Result<Expr> {
    let pure = self.cur().pure_before;
    let mut primary = self.parse_primary()?;
    if pure {
      if let Expr::New {
        pure: new_pure, ..
      } = &mut primary
      {
        *new_pure = true;
      }
    }
    self.parse_call_member_tail(primary, pure)
  }

  fn parse_call_member_tail(&mut self, mut expr: Expr, mut pure: bool) -> Result<Expr> {
    loop {
      let loc = self.loc();
      match self.kind().clone() {
        TokenKind::Dot => {
          self.bump();
          let (name, name_loc) = self.expect_ident_name()?;
          expr = Expr::Member {
            obj: Box::new(expr),
            prop: MemberProp::Ident(name, name_loc),
            loc,
          };
        }
        TokenKind::LBracket => {
          self.bump();
          let prop = self.parse_expr()?;
          self.expect_kind(&TokenKind::RBracket)?;
          expr = Expr::Member {
            obj: Box::new(expr),
            prop: MemberProp::Computed(Box::new(prop)),
            loc,
          };
        }
        TokenKind::LParen => {
          let args = self.parse_args()?;
          expr = Expr::Call {
            callee: Box::new(expr),
            args,
            pure,
            import_record: None,
            loc,
          };
          pure = false;
        }
        TokenKind::Template(raw) => {
          self.bump();
          let quasi = self.split_template(&raw, loc)?;
          expr = Expr::TaggedTemplate {
            tag: Box::new(expr),
            quasi,
            loc,
          };
        }
        _ => break,
      }
    }
    Ok(expr)
  }

  fn parse_args(&mut self) -> Result<Vec<Expr>> {
    self.expect_kind(&TokenKind::LParen)?;
    let mut args = vec![];
    while !self.eat(&TokenKind::RParen) {
      let loc = self.loc();
      if self.eat(&TokenKind::DotDotDot) {
        let arg = Box::new(self.parse_assign()?);
        args.push(Expr::Spread { arg, loc });
      } else {
        args.push(self.parse_assign()?);
      }
      if !self.at(&TokenKind::RParen) {
        self.expect_kind(&TokenKind::Comma)?;
      }
    }
    Ok(args)
  }

  fn parse_primary(&mut self) -> Result<Expr> {
    let loc = self.loc();
    match self.kind().clone() {
      TokenKind::Num(raw) => {
        self.bump();
        Ok(Expr::Lit {
          value: Lit::Num(raw),
          loc,
        })
      }
      TokenKind::Str(raw) => {
        self.bump();
        Ok(Expr::Lit {
          value: Lit::Str(raw),
          loc,
        })
      }
      TokenKind::Regex(raw) => {
        self.bump();
        Ok(Expr::Lit {
          value: Lit::Regex(raw),
          loc,
        })
      }
      TokenKind::Template(raw) => {
        self.bump();
        let template = self.split_template(&raw, loc)?;
        Ok(Expr::Template(template))
      }
      TokenKind::LParen => {
        self.bump();
        let expr = self.parse_expr()?;
        self.expect_kind(&TokenKind::RParen)?;
        Ok(expr)
      }
      TokenKind::LBracket => {
        self.bump();
        let mut elems = vec![];
        while !self.eat(&TokenKind::RBracket) {
          if self.eat(&TokenKind::Comma) {
            elems.push(None);
            continue;
          }
          let elem_loc = self.loc();
          if self.eat(&TokenKind::DotDotDot) {
            let arg = Box::new(self.parse_assign()?);
            elems.push(Some(Expr::Spread { arg, loc: elem_loc }));
          } else {
            elems.push(Some(self.parse_assign()?));
          }
          if !self.at(&TokenKind::RBracket) {
            self.expect_kind(&TokenKind::Comma)?;
          }
        }
        Ok(Expr::Array { elems, loc })
      }
      TokenKind::LBrace => self.parse_object_literal(),
      TokenKind::Ident(name) => match name.as_str() {
        "true" | "false" => {
          self.bump();
          Ok(Expr::Lit {
            value: Lit::Bool(name == "true"),
            loc,
          })
        }
        "null" => {
          self.bump();
          Ok(Expr::Lit {
            value: Lit::Null,
            loc,
          })
        }
        "undefined" => {
          self.bump();
          Ok(Expr::Lit {
            value: Lit::Undefined,
            loc,
          })
        }
        "this" => {
          self.bump();
          Ok(Expr::This(loc))
        }
        "function" => {
          self.bump();
          let function = self.parse_function_tail_maybe_anon(false, loc)?;
          Ok(Expr::Func(Box::new(function)))
        }
        "async" if matches!(self.peek_kind(), TokenKind::Ident(n) if n == "function") => {
          self.bump();
          self.bump();
          let function = self.parse_function_tail_maybe_anon(true, loc)?;
          Ok(Expr::Func(Box::new(function)))
        }
        "class" => {
          self.bump();
          let ident = if let TokenKind::Ident(name) = self.kind().clone() {
            if !self.at_ident("extends") {
              self.bump();
              Some(name)
            } else {
              None
            }
          } else {
            None
          };
          let class = self.parse_class_tail(loc)?;
          Ok(Expr::ClassExpr {
            ident,
            class: Box::new(class),
            loc,
          })
        }
        "new" => {
          self.bump();
          let callee = self.parse_primary()?;
          // member chain binds tighter than the construction
          let mut callee = callee;
          loop {
            match self.kind().clone() {
              TokenKind::Dot => {
                let member_loc = self.loc();
                self.bump();
                let (name, name_loc) = self.expect_ident_name()?;
                callee = Expr::Member {
                  obj: Box::new(callee),
                  prop: MemberProp::Ident(name, name_loc),
                  loc: member_loc,
                };
              }
              TokenKind::LBracket => {
                let member_loc = self.loc();
                self.bump();
                let prop = self.parse_expr()?;
                self.expect_kind(&TokenKind::RBracket)?;
                callee = Expr::Member {
                  obj: Box::new(callee),
                  prop: MemberProp::Computed(Box::new(prop)),
                  loc: member_loc,
                };
              }
              _ => break,
            }
          }
          let args = if self.at(&TokenKind::LParen) {
            self.parse_args()?
          } else {
            vec![]
          };
          let new_expr = Expr::New {
            callee: Box::new(callee),
            args,
            pure: false,
            loc,
          };
          self.parse_call_member_tail(new_expr, false)
        }
        "import" => {
          self.bump();
          if self.at(&TokenKind::Dot) {
            return Err(self.error_at(loc, "\"import.meta\" is not supported"));
          }
          self.expect_kind(&TokenKind::LParen)?;
          let arg = Box::new(self.parse_assign()?);
          self.expect_kind(&TokenKind::RParen)?;
          Ok(Expr::DynamicImport {
            arg,
            import_record: None,
            loc,
          })
        }
        _ => {
          self.bump();
          Ok(Expr::Ident(Ident::new(name, loc)))
        }
      },
      other => Err(self.error_at(loc, format!("Unexpected token {other:?}"))),
    }
  }

  fn parse_object_literal(&mut self) -> Result<Expr> {
    let loc = self.loc();
    self.expect_kind(&TokenKind::LBrace)?;
    let mut props = vec![];
    while !self.eat(&TokenKind::RBrace) {
      let prop_loc = self.loc();
      if self.eat(&TokenKind::DotDotDot) {
        let arg = self.parse_assign()?;
        props.push(Prop::Spread(arg));
      } else {
        let is_async = self.at_ident("async")
          && !matches!(
            self.peek_kind(),
            TokenKind::LParen | TokenKind::Colon | TokenKind::Comma | TokenKind::RBrace
          );
        if is_async {
          self.bump();
        }
        let is_generator = self.eat(&TokenKind::Star);
        let accessor = if (self.at_ident("get") || self.at_ident("set"))
          && !matches!(
            self.peek_kind(),
            TokenKind::LParen | TokenKind::Colon | TokenKind::Comma | TokenKind::RBrace
          ) {
          let kind = if self.at_ident("get") {
            MethodKind::Getter
          } else {
            MethodKind::Setter
          };
          self.bump();
          Some(kind)
        } else {
          None
        };

        let key = self.parse_prop_key()?;
        if self.at(&TokenKind::LParen) {
          let params = self.parse_params()?;
          let body = self.parse_function_body()?;
          props.push(Prop::Method {
            key,
            function: Function {
              ident: None,
              params,
              body,
              is_async,
              is_generator,
              loc: prop_loc,
            },
            kind: accessor.unwrap_or(MethodKind::Method),
          });
        } else if self.eat(&TokenKind::Colon) {
          let value = self.parse_assign()?;
          props.push(Prop::KeyValue { key, value });
        } else {
          let ident = match &key {
            PropKey::Ident(name, key_loc) => Ident::new(name.clone(), *key_loc),
            _ => return Err(self.unexpected("\":\"")),
          };
          props.push(Prop::Shorthand(ident));
        }
      }
      if !self.at(&TokenKind::RBrace) {
        self.expect_kind(&TokenKind::Comma)?;
      }
    }
    Ok(Expr::Object { props, loc })
  }

  // --- arrows

  /// Look ahead for `ident =>`, `(params) =>`, and the async variants.
  fn try_parse_arrow(&mut self) -> Result<Option<Expr>> {
    let loc = self.loc();
    let async_head = self.at_ident("async")
      && !self
        .tokens
        .get(self.pos + 1)
        .is_some_and(|t| t.newline_before)
      && matches!(
        self.peek_kind(),
        TokenKind::LParen | TokenKind::Ident(_)
      )
      && !matches!(self.peek_kind(), TokenKind::Ident(n) if n == "function");
    let (is_async, offset) = if async_head { (true, 1) } else { (false, 0) };

    let start = self.pos + offset;
    let start_kind = &self.tokens[start].kind;

    let is_arrow = match start_kind {
      TokenKind::Ident(name)
        if !matches!(
          name.as_str(),
          "function" | "class" | "new" | "typeof" | "void" | "delete" | "await" | "yield"
        ) =>
      {
        matches!(self.tokens.get(start + 1).map(|t| &t.kind), Some(TokenKind::Arrow))
      }
      TokenKind::LParen => {
        let mut depth = 0usize;
        let mut i = start;
        let mut after = None;
        while let Some(token) = self.tokens.get(i) {
          match token.kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
              depth -= 1;
              if depth == 0 {
                after = self.tokens.get(i + 1).map(|t| &t.kind);
                break;
              }
            }
            TokenKind::Eof => break,
            _ => {}
          }
          i += 1;
        }
        matches!(after, Some(TokenKind::Arrow))
      }
      _ => false,
    };

    if !is_arrow {
      // `async` alone could still shadow a plain identifier; fall through.
      return Ok(None);
    }

    if is_async {
      self.bump();
    }

    let params = if let TokenKind::Ident(name) = self.kind().clone() {
      let id_loc = self.loc();
      self.bump();
      vec![Pat::Ident(Ident::new(name, id_loc))]
    } else {
      self.parse_params()?
    };
    self.expect_kind(&TokenKind::Arrow)?;
    let body = if self.at(&TokenKind::LBrace) {
      ArrowBody::Block(self.parse_function_body()?)
    } else {
      ArrowBody::Expr(Box::new(self.parse_assign()?))
    };
    Ok(Some(Expr::Arrow(Box::new(Arrow {
      params,
      body,
      is_async,
      loc,
    }))))
  }

  // --- templates

  /// Split a raw template literal into quasis and parsed substitution
  /// expressions. Nested templates and strings were already swallowed by the
  /// lexer, so only brace depth matters here.
  fn split_template(&self, raw: &str, loc: Loc) -> Result<Template> {
    let chars: Vec<char> = raw.chars().collect();
    let mut quasis = vec![];
    let mut exprs = vec![];
    let mut chunk = String::new();
    let mut i = 1; // skip `
    let end = chars.len() - 1;
    while i < end {
      if chars[i] == '\\' && i + 1 < end {
        chunk.push(chars[i]);
        chunk.push(chars[i + 1]);
        i += 2;
        continue;
      }
      if chars[i] == '$' && i + 1 < end && chars[i + 1] == '{' {
        quasis.push(std::mem::take(&mut chunk));
        i += 2;
        let expr_start = i;
        let mut depth = 0usize;
        let mut in_str: Option<char> = None;
        while i < end {
          let ch = chars[i];
          if let Some(quote) = in_str {
            if ch == '\\' {
              i += 2;
              continue;
            }
            if ch == quote {
              in_str = None;
            }
          } else {
            match ch {
              '\'' | '"' | '`' => in_str = Some(ch),
              '{' => depth += 1,
              '}' if depth == 0 => break,
              '}' => depth -= 1,
              _ => {}
            }
          }
          i += 1;
        }
        let source: String = chars[expr_start..i].iter().collect();
        let expr = Parser::parse_expr_source(self.path, &source)
          .map_err(|e| e.context(format!("In template substitution at line {}", loc.line + 1)))?;
        exprs.push(expr);
        i += 1; // }
        continue;
      }
      chunk.push(chars[i]);
      i += 1;
    }
    quasis.push(chunk);
    Ok(Template { quasis, exprs, loc })
  }
}

fn spec_loc_of(parser: &Parser, back: usize) -> Loc {
  parser.tokens[parser.pos.saturating_sub(back)].loc
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(source: &str) -> Module {
    Parser::new("/test.js", source).unwrap().parse_module().unwrap()
  }

  #[test]
  fn parses_imports_and_exports() {
    let module = parse(
      "import a, { b as c } from './x'\nimport * as ns from './y'\nexport const d = 1\nexport { d as e }\nexport * from './z'\nexport default function f() {}",
    );
    assert_eq!(module.body.len(), 6);
    match &module.body[0] {
      Stmt::Import(decl) => {
        assert_eq!(decl.specifier, "./x");
        assert_eq!(decl.default.as_ref().unwrap().name, "a");
        assert_eq!(decl.named[0].imported, "b");
        assert_eq!(decl.named[0].local.name, "c");
      }
      other => panic!("expected import, got {other:?}"),
    }
    assert!(matches!(&module.body[1], Stmt::Import(decl) if decl.namespace.is_some()));
    assert!(matches!(&module.body[4], Stmt::ExportAll { as_ns: None, .. }));
  }

  #[test]
  fn parses_expression_precedence() {
    let module = parse("let x = 1 + 2 * 3 === 7 ? a.b(c) : d[e]");
    let Stmt::VarDecl { decls, .. } = &module.body[0] else {
      panic!()
    };
    let Some(Expr::Cond { test, .. }) = &decls[0].init else {
      panic!("expected conditional: {:?}", decls[0].init)
    };
    let Expr::Binary { op, .. } = test.as_ref() else {
      panic!()
    };
    assert_eq!(*op, BinOp::StrictEq);
  }

  #[test]
  fn parses_arrows_and_async_arrows() {
    let module = parse("const f = (a, { b }) => a + b; const g = async x => x; const h = y => ({ y })");
    assert_eq!(module.body.len(), 3);
    let Stmt::VarDecl { decls, .. } = &module.body[1] else {
      panic!()
    };
    let Some(Expr::Arrow(arrow)) = &decls[0].init else {
      panic!("expected arrow: {:?}", decls[0].init)
    };
    assert!(arrow.is_async);
  }

  #[test]
  fn parses_asi() {
    let module = parse("let a = 1\nlet b = 2\na\n++b");
    assert_eq!(module.body.len(), 4);
    assert!(matches!(&module.body[3], Stmt::Expr { expr: Expr::Update { .. }, .. }));
  }

  #[test]
  fn parses_dynamic_import_and_require_shapes() {
    let module = parse("const p = import('./lazy'); const q = require('./dep')");
    assert!(matches!(
      &module.body[0],
      Stmt::VarDecl { decls, .. } if matches!(&decls[0].init, Some(Expr::DynamicImport { .. }))
    ));
  }

  #[test]
  fn parses_classes_with_members() {
    let module = parse(
      "class A extends B { constructor(x) { this.x = x } static create() { return new A(1) } get value() { return this.x } count = 0 }",
    );
    let Stmt::Class(decl) = &module.body[0] else {
      panic!()
    };
    assert_eq!(decl.class.members.len(), 4);
    assert!(matches!(
      &decl.class.members[2],
      ClassMember::Method {
        kind: MethodKind::Getter,
        ..
      }
    ));
  }

  #[test]
  fn parses_templates_with_substitutions() {
    let module = parse("let s = `a${b + 1}c${`inner${d}`}e`");
    let Stmt::VarDecl { decls, .. } = &module.body[0] else {
      panic!()
    };
    let Some(Expr::Template(t)) = &decls[0].init else {
      panic!()
    };
    assert_eq!(t.quasis, vec!["a", "c", "e"]);
    assert_eq!(t.exprs.len(), 2);
  }

  #[test]
  fn parses_labeled_statements_and_jump_labels() {
    let module = parse(
      "outer: for (let i = 0; i < 3; i++) { inner: while (true) { if (i) break outer; continue inner; } }",
    );
    let Stmt::Labeled { label, body, .. } = &module.body[0] else {
      panic!("expected a labeled statement: {:?}", module.body[0])
    };
    assert_eq!(label, "outer");
    assert!(matches!(body.as_ref(), Stmt::For { .. }));
  }

  #[test]
  fn break_without_a_label_still_parses() {
    let module = parse("for (;;) { break }\nwhile (a) continue");
    assert_eq!(module.body.len(), 2);
  }

  #[test]
  fn rejects_undefined_jump_labels() {
    let err = Parser::new("/bad.js", "for (;;) { break missing }")
      .unwrap()
      .parse_module()
      .unwrap_err();
    assert!(err.to_string().contains("Undefined label"), "{err}");
  }

  #[test]
  fn labels_do_not_cross_function_boundaries() {
    let err = Parser::new("/bad.js", "outer: for (;;) { const f = () => { break outer } }")
      .unwrap()
      .parse_module()
      .unwrap_err();
    assert!(err.to_string().contains("Undefined label"), "{err}");
  }

  #[test]
  fn reports_syntax_errors_with_location() {
    let err = Parser::new("/bad.js", "let x = ;")
      .unwrap()
      .parse_module()
      .unwrap_err();
    assert!(err.kind.location().is_some());
    assert_eq!(err.kind.code(), "PARSE_ERROR");
  }
}
