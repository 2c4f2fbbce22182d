//! Text emission for chunks. Prints statements with final symbol names,
//! rewrites bundled `require`/`import()` call sites to runtime helpers, and
//! records source-map segments as it goes.

use fardel_common::{Loc, SymbolRef};
use fardel_sourcemap::{Mapping, SourceMapBuilder};

use crate::ast::*;

#[derive(Debug, Clone)]
pub enum PrintedRef {
  Name(String),
  /// Late-bound read through a namespace object: prints `<ns>.<prop>`.
  Alias { ns: String, prop: String },
}

#[derive(Debug, Clone)]
pub enum RecordTarget {
  /// Bundled wrapped module: `__require(<id>)`.
  Require(u32),
  /// Bundled dynamic import: `Promise.resolve().then(() => __import(<id>))`.
  Import(u32),
  /// External `require("...")`, kept verbatim.
  ExternalRequire(String),
  /// External `import("...")`, kept verbatim.
  ExternalImport(String),
}

pub trait SymbolResolver {
  fn printed_ref(&self, sym: SymbolRef, original: &str) -> PrintedRef;
  fn record_target(&self, record: u32) -> RecordTarget;
}

/// Prints every identifier under its original name; used by the transform
/// command and by tests.
pub struct VerbatimResolver;

impl SymbolResolver for VerbatimResolver {
  fn printed_ref(&self, _sym: SymbolRef, original: &str) -> PrintedRef {
    PrintedRef::Name(original.to_string())
  }

  fn record_target(&self, _record: u32) -> RecordTarget {
    RecordTarget::ExternalRequire(String::new())
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrintOptions {
  pub minify_whitespace: bool,
}

// Expression context precedence levels.
const PREC_COMMA: u8 = 1;
const PREC_ASSIGN: u8 = 2;
const PREC_COND: u8 = 3;
const PREC_UNARY: u8 = 16;
const PREC_POSTFIX: u8 = 17;
const PREC_CALL: u8 = 18;
const PREC_MEMBER: u8 = 19;

pub struct Printer<'m> {
  out: String,
  line: u32,
  col: u32,
  indent: usize,
  options: PrintOptions,
  map: Option<&'m mut SourceMapBuilder>,
  source_index: u32,
}

impl<'m> Printer<'m> {
  pub fn new(options: PrintOptions, map: Option<&'m mut SourceMapBuilder>) -> Self {
    Self {
      out: String::new(),
      line: 0,
      col: 0,
      indent: 0,
      options,
      map,
      source_index: 0,
    }
  }

  pub fn set_source_index(&mut self, index: u32) {
    self.source_index = index;
  }

  /// Register a source file with the attached source map, if any, and make
  /// it current. Returns its index.
  pub fn add_source(&mut self, path: &str, content: Option<String>) -> Option<u32> {
    let index = self.map.as_mut().map(|map| map.add_source(path, content));
    if let Some(index) = index {
      self.source_index = index;
    }
    index
  }

  pub fn finish(self) -> String {
    self.out
  }

  pub fn len(&self) -> usize {
    self.out.len()
  }

  pub fn is_empty(&self) -> bool {
    self.out.is_empty()
  }

  // --- low-level emission

  pub fn push(&mut self, text: &str) {
    for ch in text.chars() {
      if ch == '\n' {
        self.line += 1;
        self.col = 0;
      } else {
        self.col += 1;
      }
    }
    self.out.push_str(text);
  }

  pub fn newline(&mut self) {
    if self.options.minify_whitespace {
      return;
    }
    self.push("\n");
    for _ in 0..self.indent {
      self.push("  ");
    }
  }

  /// A line break that survives minification, used between top-level items.
  pub fn hard_newline(&mut self) {
    self.push("\n");
    if !self.options.minify_whitespace {
      for _ in 0..self.indent {
        self.push("  ");
      }
    }
  }

  fn space(&mut self) {
    if !self.options.minify_whitespace {
      self.push(" ");
    }
  }

  pub fn indent_more(&mut self) {
    self.indent += 1;
  }

  pub fn indent_less(&mut self) {
    self.indent = self.indent.saturating_sub(1);
  }

  fn add_mapping(&mut self, original: Loc, name: Option<&str>) {
    let source_index = self.source_index;
    let generated_line = self.line;
    let generated_col = self.col;
    if let Some(map) = self.map.as_mut() {
      let name = name.map(|n| map.add_name(n));
      map.add_mapping(Mapping {
        generated_line,
        generated_col,
        source: source_index,
        original_line: original.line,
        original_col: original.col,
        name,
      });
    }
  }

  pub fn quote(&mut self, value: &str) {
    self.push(&quote_string(value));
  }

  // --- statements

  pub fn print_stmt(&mut self, stmt: &Stmt, resolver: &dyn SymbolResolver) {
    self.add_mapping(stmt.loc(), None);
    match stmt {
      Stmt::VarDecl { kind, decls, .. } => {
        self.print_var_decl(*kind, decls, resolver);
        self.push(";");
      }
      Stmt::Func(decl) => self.print_function(&decl.function, true, resolver),
      Stmt::Class(decl) => {
        self.push("class ");
        self.print_binding_ident(&decl.ident, resolver);
        self.print_class_tail(&decl.class, resolver);
      }
      Stmt::Expr { expr, .. } => {
        if leftmost_needs_parens(expr) {
          self.push("(");
          self.print_expr(expr, PREC_COMMA, resolver);
          self.push(")");
        } else {
          self.print_expr(expr, PREC_COMMA, resolver);
        }
        self.push(";");
      }
      Stmt::Return { arg, .. } => {
        self.push("return");
        if let Some(arg) = arg {
          self.push(" ");
          self.print_expr(arg, PREC_COMMA, resolver);
        }
        self.push(";");
      }
      Stmt::If {
        test, cons, alt, ..
      } => {
        self.push("if");
        self.space();
        self.push("(");
        self.print_expr(test, PREC_COMMA, resolver);
        self.push(")");
        self.print_nested_stmt(cons, resolver);
        if let Some(alt) = alt {
          if matches!(cons.as_ref(), Stmt::Block { .. }) {
            self.space();
          } else {
            self.newline();
          }
          self.push("else");
          if matches!(alt.as_ref(), Stmt::If { .. }) {
            self.push(" ");
            self.print_stmt(alt, resolver);
          } else {
            self.print_nested_stmt(alt, resolver);
          }
        }
      }
      Stmt::Block { stmts, .. } => self.print_block(stmts, resolver),
      Stmt::For {
        init,
        test,
        update,
        ..
      } => {
        self.push("for");
        self.space();
        self.push("(");
        match init {
          Some(ForInit::VarDecl { kind, decls }) => {
            self.print_var_decl(*kind, decls, resolver)
          }
          Some(ForInit::Expr(expr)) => self.print_expr(expr, PREC_COMMA, resolver),
          None => {}
        }
        self.push(";");
        if let Some(test) = test {
          self.space();
          self.print_expr(test, PREC_COMMA, resolver);
        }
        self.push(";");
        if let Some(update) = update {
          self.space();
          self.print_expr(update, PREC_COMMA, resolver);
        }
        self.push(")");
        let Stmt::For { body, .. } = stmt else {
          unreachable!()
        };
        self.print_nested_stmt(body, resolver);
      }
      Stmt::ForIn {
        head,
        obj,
        body,
        is_of,
        ..
      } => {
        self.push("for");
        self.space();
        self.push("(");
        match head {
          ForHead::VarDecl { kind, pat } => {
            self.push(kind.as_str());
            self.push(" ");
            self.print_pat(pat, resolver);
          }
          ForHead::Pat(pat) => self.print_pat(pat, resolver),
        }
        self.push(if *is_of { " of " } else { " in " });
        self.print_expr(obj, PREC_ASSIGN, resolver);
        self.push(")");
        self.print_nested_stmt(body, resolver);
      }
      Stmt::While { test, body, .. } => {
        self.push("while");
        self.space();
        self.push("(");
        self.print_expr(test, PREC_COMMA, resolver);
        self.push(")");
        self.print_nested_stmt(body, resolver);
      }
      Stmt::DoWhile { body, test, .. } => {
        self.push("do");
        self.print_nested_stmt(body, resolver);
        self.space_or(" ");
        self.push("while");
        self.space();
        self.push("(");
        self.print_expr(test, PREC_COMMA, resolver);
        self.push(");");
      }
      Stmt::Labeled { label, body, .. } => {
        self.push(label);
        self.push(":");
        if matches!(body.as_ref(), Stmt::Block { .. }) {
          self.space();
          self.print_stmt(body, resolver);
        } else {
          self.push(" ");
          self.print_stmt(body, resolver);
        }
      }
      Stmt::Break { label, .. } => {
        self.push("break");
        if let Some(label) = label {
          self.push(" ");
          self.push(label);
        }
        self.push(";");
      }
      Stmt::Continue { label, .. } => {
        self.push("continue");
        if let Some(label) = label {
          self.push(" ");
          self.push(label);
        }
        self.push(";");
      }
      Stmt::Throw { arg, .. } => {
        self.push("throw ");
        self.print_expr(arg, PREC_COMMA, resolver);
        self.push(";");
      }
      Stmt::Try {
        block,
        catch,
        finally,
        ..
      } => {
        self.push("try");
        self.space();
        self.print_block(block, resolver);
        if let Some(catch) = catch {
          self.space_or(" ");
          self.push("catch");
          if let Some(param) = &catch.param {
            self.space();
            self.push("(");
            self.print_pat(param, resolver);
            self.push(")");
          }
          self.space();
          self.print_block(&catch.body, resolver);
        }
        if let Some(finally) = finally {
          self.space_or(" ");
          self.push("finally");
          self.space();
          self.print_block(finally, resolver);
        }
      }
      Stmt::Switch { disc, cases, .. } => {
        self.push("switch");
        self.space();
        self.push("(");
        self.print_expr(disc, PREC_COMMA, resolver);
        self.push(")");
        self.space();
        self.push("{");
        self.indent_more();
        for case in cases {
          self.newline();
          match &case.test {
            Some(test) => {
              self.push("case ");
              self.print_expr(test, PREC_COMMA, resolver);
              self.push(":");
            }
            None => self.push("default:"),
          }
          self.indent_more();
          for stmt in &case.body {
            self.newline();
            self.print_stmt(stmt, resolver);
          }
          self.indent_less();
        }
        self.indent_less();
        self.newline();
        self.push("}");
      }
      Stmt::Empty { .. } => self.push(";"),
      Stmt::Import(decl) => self.print_import_decl(decl, resolver),
      Stmt::ExportNamed(decl) => self.print_export_named(decl, resolver),
      Stmt::ExportDecl { decl, .. } => {
        self.push("export ");
        self.print_stmt(decl, resolver);
      }
      Stmt::ExportDefault { value, .. } => {
        self.push("export default ");
        match value {
          ExportDefaultValue::Expr(expr) => {
            self.print_expr(expr, PREC_ASSIGN, resolver);
            self.push(";");
          }
          ExportDefaultValue::Func(func) => self.print_function(&func.function, true, resolver),
          ExportDefaultValue::Class(decl) => {
            self.push("class");
            if !decl.ident.name.is_empty() {
              self.push(" ");
              self.print_binding_ident(&decl.ident, resolver);
            }
            self.print_class_tail(&decl.class, resolver);
          }
        }
      }
      Stmt::ExportAll {
        specifier, as_ns, ..
      } => {
        self.push("export *");
        if let Some(ns) = as_ns {
          self.push(" as ");
          self.push(&ns.name);
        }
        self.push(" from ");
        self.quote(specifier);
        self.push(";");
      }
    }
  }

  /// In the bundled output a default export becomes a plain declaration
  /// bound to the module's default symbol.
  pub fn print_export_default_as_decl(
    &mut self,
    value: &ExportDefaultValue,
    sym: Option<SymbolRef>,
    resolver: &dyn SymbolResolver,
  ) {
    let name = |original: &str| -> String {
      match sym {
        Some(sym) => match resolver.printed_ref(sym, original) {
          PrintedRef::Name(name) => name,
          PrintedRef::Alias { ns, prop } => format!("{ns}.{prop}"),
        },
        None => original.to_string(),
      }
    };
    match value {
      ExportDefaultValue::Func(decl) => {
        let fallback = decl
          .function
          .ident
          .as_ref()
          .map(|i| i.name.clone())
          .unwrap_or_else(|| "default".to_string());
        let final_name = name(&fallback);
        if decl.function.is_async {
          self.push("async ");
        }
        self.push("function");
        if decl.function.is_generator {
          self.push("*");
        }
        self.push(" ");
        self.push(&final_name);
        self.print_function_tail(&decl.function, resolver);
      }
      ExportDefaultValue::Class(decl) => {
        let fallback = if decl.ident.name.is_empty() {
          "default".to_string()
        } else {
          decl.ident.name.clone()
        };
        let final_name = name(&fallback);
        self.push("class ");
        self.push(&final_name);
        self.print_class_tail(&decl.class, resolver);
      }
      ExportDefaultValue::Expr(expr) => {
        let final_name = name("default");
        self.push("var ");
        self.push(&final_name);
        self.space();
        self.push("=");
        self.space();
        self.print_expr(expr, PREC_ASSIGN, resolver);
        self.push(";");
      }
    }
  }

  fn space_or(&mut self, fallback: &str) {
    if self.options.minify_whitespace {
      self.push(fallback.trim());
      if fallback.trim().is_empty() {
        return;
      }
    } else {
      self.push(fallback);
    }
  }

  fn print_nested_stmt(&mut self, stmt: &Stmt, resolver: &dyn SymbolResolver) {
    if matches!(stmt, Stmt::Block { .. }) {
      self.space();
      self.print_stmt(stmt, resolver);
    } else {
      self.indent_more();
      self.newline();
      if self.options.minify_whitespace {
        self.push(" ");
      }
      self.print_stmt(stmt, resolver);
      self.indent_less();
    }
  }

  fn print_block(&mut self, stmts: &[Stmt], resolver: &dyn SymbolResolver) {
    self.push("{");
    self.indent_more();
    for stmt in stmts {
      self.newline();
      if self.options.minify_whitespace && !self.out.ends_with(['{', ';', '}']) {
        self.push(";");
      }
      self.print_stmt(stmt, resolver);
    }
    self.indent_less();
    self.newline();
    self.push("}");
  }

  fn print_var_decl(
    &mut self,
    kind: VarKind,
    decls: &[Declarator],
    resolver: &dyn SymbolResolver,
  ) {
    self.push(kind.as_str());
    self.push(" ");
    for (i, decl) in decls.iter().enumerate() {
      if i > 0 {
        self.push(",");
        self.space();
      }
      self.print_pat(&decl.pat, resolver);
      if let Some(init) = &decl.init {
        self.space();
        self.push("=");
        self.space();
        self.print_expr(init, PREC_ASSIGN, resolver);
      }
    }
  }

  fn print_import_decl(&mut self, decl: &ImportDecl, resolver: &dyn SymbolResolver) {
    self.push("import ");
    let mut need_from = false;
    if let Some(default) = &decl.default {
      self.print_binding_ident(default, resolver);
      need_from = true;
    }
    if let Some(ns) = &decl.namespace {
      if need_from {
        self.push(",");
        self.space();
      }
      self.push("* as ");
      self.print_binding_ident(ns, resolver);
      need_from = true;
    }
    if !decl.named.is_empty() {
      if need_from {
        self.push(",");
        self.space();
      }
      self.push("{");
      self.space();
      for (i, spec) in decl.named.iter().enumerate() {
        if i > 0 {
          self.push(",");
          self.space();
        }
        if spec.imported == spec.local.name {
          self.print_binding_ident(&spec.local, resolver);
        } else {
          self.push(&spec.imported);
          self.push(" as ");
          self.print_binding_ident(&spec.local, resolver);
        }
      }
      self.space();
      self.push("}");
      need_from = true;
    }
    if need_from {
      self.push(" from ");
    }
    self.quote(&decl.specifier);
    self.push(";");
  }

  fn print_export_named(&mut self, decl: &NamedExportDecl, resolver: &dyn SymbolResolver) {
    self.push("export");
    self.space();
    self.push("{");
    self.space();
    for (i, spec) in decl.specifiers.iter().enumerate() {
      if i > 0 {
        self.push(",");
        self.space();
      }
      if decl.src.is_some() {
        self.push(&spec.local.name);
      } else {
        self.print_binding_ident(&spec.local, resolver);
      }
      if spec.exported != spec.local.name {
        self.push(" as ");
        self.push(&spec.exported);
      }
    }
    self.space();
    self.push("}");
    if let Some(src) = &decl.src {
      self.push(" from ");
      self.quote(src);
    }
    self.push(";");
  }

  // --- identifiers and patterns

  fn print_binding_ident(&mut self, ident: &Ident, resolver: &dyn SymbolResolver) {
    self.print_ident(ident, resolver);
  }

  fn print_ident(&mut self, ident: &Ident, resolver: &dyn SymbolResolver) {
    match ident.sym {
      Some(sym) => match resolver.printed_ref(sym, &ident.name) {
        PrintedRef::Name(name) => {
          if name != ident.name {
            self.add_mapping(ident.loc, Some(&ident.name));
          } else {
            self.add_mapping(ident.loc, None);
          }
          self.push(&name);
        }
        PrintedRef::Alias { ns, prop } => {
          self.add_mapping(ident.loc, Some(&ident.name));
          self.push(&ns);
          self.push(".");
          self.push(&prop);
        }
      },
      None => {
        self.add_mapping(ident.loc, None);
        self.push(&ident.name);
      }
    }
  }

  fn print_pat(&mut self, pat: &Pat, resolver: &dyn SymbolResolver) {
    match pat {
      Pat::Ident(ident) => self.print_ident(ident, resolver),
      Pat::Array { elems, .. } => {
        self.push("[");
        for (i, elem) in elems.iter().enumerate() {
          if i > 0 {
            self.push(",");
            self.space();
          }
          if let Some(elem) = elem {
            self.print_pat(elem, resolver);
          }
        }
        self.push("]");
      }
      Pat::Object { props, .. } => {
        if props.is_empty() {
          self.push("{}");
          return;
        }
        self.push("{");
        self.space();
        for (i, prop) in props.iter().enumerate() {
          if i > 0 {
            self.push(",");
            self.space();
          }
          match prop {
            ObjectPatProp::KeyValue { key, value } => {
              if let PropKey::Ident(name, _) = key {
                if name.is_empty() {
                  // rest element stored as an empty-keyed entry
                  self.print_pat(value, resolver);
                  continue;
                }
              }
              self.print_prop_key(key, resolver);
              self.push(":");
              self.space();
              self.print_pat(value, resolver);
            }
            ObjectPatProp::Shorthand { ident, default } => {
              self.print_ident(ident, resolver);
              if let Some(default) = default {
                self.space();
                self.push("=");
                self.space();
                self.print_expr(default, PREC_ASSIGN, resolver);
              }
            }
          }
        }
        self.space();
        self.push("}");
      }
      Pat::Assign { pat, default, .. } => {
        self.print_pat(pat, resolver);
        self.space();
        self.push("=");
        self.space();
        self.print_expr(default, PREC_ASSIGN, resolver);
      }
      Pat::Rest { arg, .. } => {
        self.push("...");
        self.print_pat(arg, resolver);
      }
    }
  }

  fn print_prop_key(&mut self, key: &PropKey, resolver: &dyn SymbolResolver) {
    match key {
      PropKey::Ident(name, _) => self.push(name),
      PropKey::Str(raw, _) => self.push(raw),
      PropKey::Num(raw, _) => self.push(raw),
      PropKey::Computed(expr) => {
        self.push("[");
        self.print_expr(expr, PREC_ASSIGN, resolver);
        self.push("]");
      }
    }
  }

  // --- expressions

  pub fn print_expr(&mut self, expr: &Expr, prec: u8, resolver: &dyn SymbolResolver) {
    match expr {
      Expr::Ident(ident) => self.print_ident(ident, resolver),
      Expr::Lit { value, .. } => match value {
        Lit::Num(raw) | Lit::Str(raw) | Lit::Regex(raw) => self.push(raw),
        Lit::Bool(true) => self.push("true"),
        Lit::Bool(false) => self.push("false"),
        Lit::Null => self.push("null"),
        Lit::Undefined => self.push("undefined"),
      },
      Expr::Template(template) => self.print_template(template, resolver),
      Expr::TaggedTemplate { tag, quasi, .. } => {
        self.print_expr(tag, PREC_MEMBER, resolver);
        self.print_template(quasi, resolver);
      }
      Expr::Array { elems, .. } => {
        self.push("[");
        for (i, elem) in elems.iter().enumerate() {
          if i > 0 {
            self.push(",");
            self.space();
          }
          if let Some(elem) = elem {
            self.print_expr(elem, PREC_ASSIGN, resolver);
          }
        }
        self.push("]");
      }
      Expr::Object { props, .. } => {
        if props.is_empty() {
          self.push("{}");
          return;
        }
        self.push("{");
        self.space();
        for (i, prop) in props.iter().enumerate() {
          if i > 0 {
            self.push(",");
            self.space();
          }
          match prop {
            Prop::KeyValue { key, value } => {
              self.print_prop_key(key, resolver);
              self.push(":");
              self.space();
              self.print_expr(value, PREC_ASSIGN, resolver);
            }
            Prop::Shorthand(ident) => {
              // shorthand may no longer be short once renamed
              let printed = match ident.sym {
                Some(sym) => resolver.printed_ref(sym, &ident.name),
                None => PrintedRef::Name(ident.name.clone()),
              };
              match printed {
                PrintedRef::Name(name) if name == ident.name => self.push(&name),
                PrintedRef::Name(name) => {
                  self.push(&ident.name);
                  self.push(":");
                  self.space();
                  self.push(&name);
                }
                PrintedRef::Alias { ns, prop } => {
                  self.push(&ident.name);
                  self.push(":");
                  self.space();
                  self.push(&ns);
                  self.push(".");
                  self.push(&prop);
                }
              }
            }
            Prop::Method {
              key,
              function,
              kind,
            } => {
              match kind {
                MethodKind::Getter => self.push("get "),
                MethodKind::Setter => self.push("set "),
                MethodKind::Method => {
                  if function.is_async {
                    self.push("async ");
                  }
                  if function.is_generator {
                    self.push("*");
                  }
                }
              }
              self.print_prop_key(key, resolver);
              self.print_function_tail(function, resolver);
            }
            Prop::Spread(arg) => {
              self.push("...");
              self.print_expr(arg, PREC_ASSIGN, resolver);
            }
          }
        }
        self.space();
        self.push("}");
      }
      Expr::Func(function) => {
        self.print_function(function, false, resolver);
      }
      Expr::Arrow(arrow) => {
        let wrap = prec > PREC_ASSIGN;
        if wrap {
          self.push("(");
        }
        if arrow.is_async {
          self.push("async ");
        }
        if arrow.params.len() == 1 && matches!(arrow.params[0], Pat::Ident(_)) {
          self.print_pat(&arrow.params[0], resolver);
        } else {
          self.push("(");
          for (i, param) in arrow.params.iter().enumerate() {
            if i > 0 {
              self.push(",");
              self.space();
            }
            self.print_pat(param, resolver);
          }
          self.push(")");
        }
        self.space();
        self.push("=>");
        self.space();
        match &arrow.body {
          ArrowBody::Expr(expr) => {
            if leftmost_needs_parens_for_arrow(expr) {
              self.push("(");
              self.print_expr(expr, PREC_ASSIGN, resolver);
              self.push(")");
            } else {
              self.print_expr(expr, PREC_ASSIGN, resolver);
            }
          }
          ArrowBody::Block(stmts) => self.print_block(stmts, resolver),
        }
        if wrap {
          self.push(")");
        }
      }
      Expr::ClassExpr { ident, class, .. } => {
        self.push("class");
        if let Some(name) = ident {
          self.push(" ");
          self.push(name);
        }
        self.print_class_tail(class, resolver);
      }
      Expr::Unary { op, arg, .. } => {
        let wrap = prec > PREC_UNARY;
        if wrap {
          self.push("(");
        }
        self.push(op.as_str());
        let needs_space = matches!(op, UnaryOp::TypeOf | UnaryOp::Void | UnaryOp::Delete)
          || starts_with_sign(arg, *op);
        if needs_space {
          self.push(" ");
        }
        self.print_expr(arg, PREC_UNARY, resolver);
        if wrap {
          self.push(")");
        }
      }
      Expr::Update {
        op, prefix, arg, ..
      } => {
        let symbol = match op {
          UpdateOp::Inc => "++",
          UpdateOp::Dec => "--",
        };
        let wrap = prec > PREC_POSTFIX;
        if wrap {
          self.push("(");
        }
        if *prefix {
          self.push(symbol);
          self.print_expr(arg, PREC_UNARY, resolver);
        } else {
          self.print_expr(arg, PREC_CALL, resolver);
          self.push(symbol);
        }
        if wrap {
          self.push(")");
        }
      }
      Expr::Binary {
        op, left, right, ..
      } => {
        let my_prec = op.precedence();
        let wrap = prec > my_prec || mixes_nullish(*op, left, right);
        if wrap {
          self.push("(");
        }
        let (left_prec, right_prec) = if op.right_associative() {
          (my_prec + 1, my_prec)
        } else {
          (my_prec, my_prec + 1)
        };
        self.print_expr(left, left_prec, resolver);
        if matches!(op, BinOp::In | BinOp::InstanceOf) {
          self.push(" ");
          self.push(op.as_str());
          self.push(" ");
        } else {
          self.space();
          self.push(op.as_str());
          self.space();
        }
        self.print_expr(right, right_prec, resolver);
        if wrap {
          self.push(")");
        }
      }
      Expr::Assign {
        op, target, value, ..
      } => {
        let wrap = prec > PREC_ASSIGN;
        if wrap {
          self.push("(");
        }
        self.print_expr(target, PREC_CALL, resolver);
        self.space();
        self.push(op.as_str());
        self.space();
        self.print_expr(value, PREC_ASSIGN, resolver);
        if wrap {
          self.push(")");
        }
      }
      Expr::Cond {
        test, cons, alt, ..
      } => {
        let wrap = prec > PREC_COND;
        if wrap {
          self.push("(");
        }
        self.print_expr(test, PREC_COND + 1, resolver);
        self.space();
        self.push("?");
        self.space();
        self.print_expr(cons, PREC_ASSIGN, resolver);
        self.space();
        self.push(":");
        self.space();
        self.print_expr(alt, PREC_ASSIGN, resolver);
        if wrap {
          self.push(")");
        }
      }
      Expr::Call {
        callee,
        args,
        import_record,
        ..
      } => {
        if let Some(record) = import_record {
          match resolver.record_target(*record) {
            RecordTarget::Require(id) => {
              self.push("__require(");
              self.push(&id.to_string());
              self.push(")");
              return;
            }
            RecordTarget::ExternalRequire(spec) => {
              self.push("require(");
              self.quote(&spec);
              self.push(")");
              return;
            }
            _ => {}
          }
        }
        self.print_expr(callee, PREC_CALL, resolver);
        self.print_args(args, resolver);
      }
      Expr::New {
        callee, args, ..
      } => {
        self.push("new ");
        self.print_expr(callee, PREC_MEMBER, resolver);
        self.print_args(args, resolver);
      }
      Expr::Member { obj, prop, .. } => {
        self.print_expr(obj, PREC_MEMBER, resolver);
        match prop {
          MemberProp::Ident(name, _) => {
            self.push(".");
            self.push(name);
          }
          MemberProp::Computed(expr) => {
            self.push("[");
            self.print_expr(expr, PREC_COMMA, resolver);
            self.push("]");
          }
        }
      }
      Expr::Seq { exprs, .. } => {
        let wrap = prec > PREC_COMMA;
        if wrap {
          self.push("(");
        }
        for (i, expr) in exprs.iter().enumerate() {
          if i > 0 {
            self.push(",");
            self.space();
          }
          self.print_expr(expr, PREC_ASSIGN, resolver);
        }
        if wrap {
          self.push(")");
        }
      }
      Expr::Spread { arg, .. } => {
        self.push("...");
        self.print_expr(arg, PREC_ASSIGN, resolver);
      }
      Expr::DynamicImport {
        arg,
        import_record,
        ..
      } => {
        if let Some(record) = import_record {
          match resolver.record_target(*record) {
            RecordTarget::Import(id) => {
              self.push("Promise.resolve().then(() => __import(");
              self.push(&id.to_string());
              self.push("))");
              return;
            }
            RecordTarget::ExternalImport(spec) => {
              self.push("import(");
              self.quote(&spec);
              self.push(")");
              return;
            }
            _ => {}
          }
        }
        self.push("import(");
        self.print_expr(arg, PREC_ASSIGN, resolver);
        self.push(")");
      }
      Expr::This(_) => self.push("this"),
      Expr::Await { arg, .. } => {
        let wrap = prec > PREC_UNARY;
        if wrap {
          self.push("(");
        }
        self.push("await ");
        self.print_expr(arg, PREC_UNARY, resolver);
        if wrap {
          self.push(")");
        }
      }
      Expr::Yield { arg, delegate, .. } => {
        let wrap = prec > PREC_ASSIGN;
        if wrap {
          self.push("(");
        }
        self.push("yield");
        if *delegate {
          self.push("*");
        }
        if let Some(arg) = arg {
          self.push(" ");
          self.print_expr(arg, PREC_ASSIGN, resolver);
        }
        if wrap {
          self.push(")");
        }
      }
    }
  }

  fn print_args(&mut self, args: &[Expr], resolver: &dyn SymbolResolver) {
    self.push("(");
    for (i, arg) in args.iter().enumerate() {
      if i > 0 {
        self.push(",");
        self.space();
      }
      self.print_expr(arg, PREC_ASSIGN, resolver);
    }
    self.push(")");
  }

  fn print_template(&mut self, template: &Template, resolver: &dyn SymbolResolver) {
    self.push("`");
    for (i, quasi) in template.quasis.iter().enumerate() {
      self.push(quasi);
      if i < template.exprs.len() {
        self.push("${");
        self.print_expr(&template.exprs[i], PREC_COMMA, resolver);
        self.push("}");
      }
    }
    self.push("`");
  }

  fn print_function(
    &mut self,
    function: &Function,
    _is_decl: bool,
    resolver: &dyn SymbolResolver,
  ) {
    if function.is_async {
      self.push("async ");
    }
    self.push("function");
    if function.is_generator {
      self.push("*");
    }
    if let Some(ident) = &function.ident {
      self.push(" ");
      self.print_binding_ident(ident, resolver);
    }
    self.print_function_tail(function, resolver);
  }

  fn print_function_tail(&mut self, function: &Function, resolver: &dyn SymbolResolver) {
    self.push("(");
    for (i, param) in function.params.iter().enumerate() {
      if i > 0 {
        self.push(",");
        self.space();
      }
      self.print_pat(param, resolver);
    }
    self.push(")");
    self.space();
    self.print_block(&function.body, resolver);
  }

  fn print_class_tail(&mut self, class: &Class, resolver: &dyn SymbolResolver) {
    if let Some(super_class) = &class.super_class {
      self.push(" extends ");
      self.print_expr(super_class, PREC_MEMBER, resolver);
    }
    self.space();
    self.push("{");
    self.indent_more();
    for member in &class.members {
      self.newline();
      match member {
        ClassMember::Method {
          key,
          function,
          is_static,
          kind,
        } => {
          if *is_static {
            self.push("static ");
          }
          match kind {
            MethodKind::Getter => self.push("get "),
            MethodKind::Setter => self.push("set "),
            MethodKind::Method => {
              if function.is_async {
                self.push("async ");
              }
              if function.is_generator {
                self.push("*");
              }
            }
          }
          self.print_prop_key(key, resolver);
          self.print_function_tail(function, resolver);
        }
        ClassMember::Field {
          key,
          value,
          is_static,
        } => {
          if *is_static {
            self.push("static ");
          }
          self.print_prop_key(key, resolver);
          if let Some(value) = value {
            self.space();
            self.push("=");
            self.space();
            self.print_expr(value, PREC_ASSIGN, resolver);
          }
          self.push(";");
        }
      }
    }
    self.indent_less();
    self.newline();
    self.push("}");
  }
}

/// `a ?? b || c` is a syntax error without parentheses.
fn mixes_nullish(op: BinOp, left: &Expr, right: &Expr) -> bool {
  let is_and_or = |e: &Expr| {
    matches!(
      e,
      Expr::Binary {
        op: BinOp::And | BinOp::Or,
        ..
      }
    )
  };
  op == BinOp::Nullish && (is_and_or(left) || is_and_or(right))
}

fn starts_with_sign(expr: &Expr, outer: UnaryOp) -> bool {
  match (outer, expr) {
    (
      UnaryOp::Minus,
      Expr::Unary {
        op: UnaryOp::Minus, ..
      },
    )
    | (
      UnaryOp::Plus,
      Expr::Unary {
        op: UnaryOp::Plus, ..
      },
    ) => true,
    (
      UnaryOp::Minus,
      Expr::Update {
        op: UpdateOp::Dec,
        prefix: true,
        ..
      },
    )
    | (
      UnaryOp::Plus,
      Expr::Update {
        op: UpdateOp::Inc,
        prefix: true,
        ..
      },
    ) => true,
    _ => false,
  }
}

/// Expression statements must not begin with `{`, `function`, or `class`.
fn leftmost_needs_parens(expr: &Expr) -> bool {
  match expr {
    Expr::Object { .. } | Expr::Func(_) | Expr::ClassExpr { .. } => true,
    Expr::Binary { left, .. } => leftmost_needs_parens(left),
    Expr::Seq { exprs, .. } => exprs.first().is_some_and(leftmost_needs_parens),
    Expr::Assign { target, .. } => leftmost_needs_parens(target),
    Expr::Cond { test, .. } => leftmost_needs_parens(test),
    Expr::Call { callee, .. } => leftmost_needs_parens(callee),
    Expr::Member { obj, .. } => leftmost_needs_parens(obj),
    Expr::TaggedTemplate { tag, .. } => leftmost_needs_parens(tag),
    Expr::Update {
      prefix: false, arg, ..
    } => leftmost_needs_parens(arg),
    _ => false,
  }
}

/// Arrow bodies must not begin with `{`.
fn leftmost_needs_parens_for_arrow(expr: &Expr) -> bool {
  match expr {
    Expr::Object { .. } => true,
    Expr::Binary { left, .. } => leftmost_needs_parens_for_arrow(left),
    Expr::Seq { exprs, .. } => exprs.first().is_some_and(leftmost_needs_parens_for_arrow),
    Expr::Assign { target, .. } => leftmost_needs_parens_for_arrow(target),
    Expr::Cond { test, .. } => leftmost_needs_parens_for_arrow(test),
    Expr::Call { callee, .. } => leftmost_needs_parens_for_arrow(callee),
    Expr::Member { obj, .. } => leftmost_needs_parens_for_arrow(obj),
    _ => false,
  }
}

pub fn quote_string(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for ch in value.chars() {
    match ch {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\0' => out.push_str("\\0"),
      other => out.push(other),
    }
  }
  out.push('"');
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Parser;

  fn roundtrip(source: &str) -> String {
    let module = Parser::new("/test.js", source)
      .unwrap()
      .parse_module()
      .unwrap();
    let mut printer = Printer::new(PrintOptions::default(), None);
    for (i, stmt) in module.body.iter().enumerate() {
      if i > 0 {
        printer.hard_newline();
      }
      printer.print_stmt(stmt, &VerbatimResolver);
    }
    printer.finish()
  }

  #[test]
  fn prints_declarations() {
    assert_eq!(roundtrip("const a = 1, b = [2, 3]"), "const a = 1, b = [2, 3];");
    assert_eq!(
      roundtrip("function f(a, { b } = {}) { return a + b }"),
      "function f(a, { b } = {}) {\n  return a + b;\n}"
    );
  }

  #[test]
  fn preserves_precedence_with_parens() {
    assert_eq!(roundtrip("let x = (1 + 2) * 3"), "let x = (1 + 2) * 3;");
    assert_eq!(roundtrip("let y = 1 + 2 * 3"), "let y = 1 + 2 * 3;");
    assert_eq!(roundtrip("(x => x)(1)"), "(x => x)(1);");
    assert_eq!(roundtrip("let z = (a, b)"), "let z = (a, b);");
  }

  #[test]
  fn object_at_statement_start_gets_parens() {
    assert_eq!(roundtrip("({ a: 1 }).a"), "({ a: 1 }.a);");
  }

  #[test]
  fn prints_templates_and_regex() {
    assert_eq!(roundtrip("let s = `a${b}c`"), "let s = `a${b}c`;");
    assert_eq!(roundtrip("let r = /ab+c/gi"), "let r = /ab+c/gi;");
  }

  #[test]
  fn prints_control_flow() {
    assert_eq!(
      roundtrip("if (a) b(); else { c() }"),
      "if (a)\n  b();\nelse {\n  c();\n}"
    );
    assert_eq!(
      roundtrip("for (let i = 0; i < 3; i++) sum += i"),
      "for (let i = 0; i < 3; i++)\n  sum += i;"
    );
  }

  #[test]
  fn minify_whitespace_drops_newlines() {
    let module = Parser::new("/t.js", "if (a) { b() } const x = { y: 1 }")
      .unwrap()
      .parse_module()
      .unwrap();
    let mut printer = Printer::new(
      PrintOptions {
        minify_whitespace: true,
      },
      None,
    );
    for stmt in &module.body {
      printer.print_stmt(stmt, &VerbatimResolver);
    }
    let out = printer.finish();
    assert!(!out.contains('\n'));
    assert_eq!(out, "if(a){b();}const x={y:1};");
  }

  #[test]
  fn prints_labeled_statements_and_jump_labels() {
    assert_eq!(
      roundtrip("outer: for (;;) break outer"),
      "outer: for (;;)\n  break outer;"
    );
    assert_eq!(
      roundtrip("loop: while (a) { continue loop }"),
      "loop: while (a) {\n  continue loop;\n}"
    );
  }

  #[test]
  fn nullish_mixed_with_logical_keeps_parens() {
    assert_eq!(roundtrip("let v = a ?? (b || c)"), "let v = a ?? (b || c);");
  }
}
