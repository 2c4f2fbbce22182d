//! Static purity analysis used to seed tree shaking. A top-level statement
//! without side effects can be dropped when nothing it declares stays live.

use rustc_hash::FxHashSet;

use crate::ast::*;

pub fn expr_is_pure(expr: &Expr, pure_functions: &FxHashSet<String>) -> bool {
  match expr {
    Expr::Ident(_) | Expr::Lit { .. } | Expr::This(_) => true,
    Expr::Template(t) => t.exprs.iter().all(|e| expr_is_pure(e, pure_functions)),
    Expr::TaggedTemplate { .. } => false,
    Expr::Array { elems, .. } => elems
      .iter()
      .flatten()
      .all(|e| expr_is_pure(e, pure_functions)),
    Expr::Object { props, .. } => props.iter().all(|prop| match prop {
      Prop::KeyValue { key, value } => {
        prop_key_is_pure(key, pure_functions) && expr_is_pure(value, pure_functions)
      }
      Prop::Shorthand(_) => true,
      Prop::Method { .. } => true,
      Prop::Spread(arg) => expr_is_pure(arg, pure_functions),
    }),
    Expr::Func(_) | Expr::Arrow(_) => true,
    Expr::ClassExpr { class, .. } => class_is_pure(class, pure_functions),
    Expr::Unary { op, arg, .. } => *op != UnaryOp::Delete && expr_is_pure(arg, pure_functions),
    Expr::Binary { left, right, .. } => {
      expr_is_pure(left, pure_functions) && expr_is_pure(right, pure_functions)
    }
    Expr::Cond {
      test, cons, alt, ..
    } => {
      expr_is_pure(test, pure_functions)
        && expr_is_pure(cons, pure_functions)
        && expr_is_pure(alt, pure_functions)
    }
    Expr::Seq { exprs, .. } => exprs.iter().all(|e| expr_is_pure(e, pure_functions)),
    Expr::Spread { arg, .. } => expr_is_pure(arg, pure_functions),
    Expr::Call {
      callee, args, pure, ..
    } => {
      let annotated = *pure || callee_is_declared_pure(callee, pure_functions);
      annotated && args.iter().all(|a| expr_is_pure(a, pure_functions))
    }
    Expr::New {
      callee, args, pure, ..
    } => {
      let annotated = *pure || callee_is_declared_pure(callee, pure_functions);
      annotated && args.iter().all(|a| expr_is_pure(a, pure_functions))
    }
    // Property access can hit a getter.
    Expr::Member { .. } => false,
    Expr::Assign { .. }
    | Expr::Update { .. }
    | Expr::Await { .. }
    | Expr::Yield { .. }
    | Expr::DynamicImport { .. } => false,
  }
}

fn prop_key_is_pure(key: &PropKey, pure_functions: &FxHashSet<String>) -> bool {
  match key {
    PropKey::Computed(expr) => expr_is_pure(expr, pure_functions),
    _ => true,
  }
}

fn class_is_pure(class: &Class, pure_functions: &FxHashSet<String>) -> bool {
  let super_ok = class
    .super_class
    .as_ref()
    .map_or(true, |s| expr_is_pure(s, pure_functions));
  super_ok
    && class.members.iter().all(|member| match member {
      ClassMember::Method { key, .. } => prop_key_is_pure(key, pure_functions),
      // Static field initializers run at class evaluation time.
      ClassMember::Field {
        key,
        value,
        is_static,
      } => {
        prop_key_is_pure(key, pure_functions)
          && (!*is_static
            || value
              .as_ref()
              .map_or(true, |v| expr_is_pure(v, pure_functions)))
      }
    })
}

/// The `--pure:<name>` list matches plain callee names and dotted paths like
/// `console.log`.
fn callee_is_declared_pure(callee: &Expr, pure_functions: &FxHashSet<String>) -> bool {
  if pure_functions.is_empty() {
    return false;
  }
  let mut path = String::new();
  if !callee_path(callee, &mut path) {
    return false;
  }
  pure_functions.contains(&path)
}

fn callee_path(expr: &Expr, out: &mut String) -> bool {
  match expr {
    Expr::Ident(ident) => {
      out.push_str(&ident.name);
      true
    }
    Expr::Member {
      obj,
      prop: MemberProp::Ident(name, _),
      ..
    } => {
      if !callee_path(obj, out) {
        return false;
      }
      out.push('.');
      out.push_str(name);
      true
    }
    _ => false,
  }
}

pub fn stmt_has_side_effects(stmt: &Stmt, pure_functions: &FxHashSet<String>) -> bool {
  match stmt {
    Stmt::VarDecl { decls, .. } => decls.iter().any(|d| {
      d.init
        .as_ref()
        .is_some_and(|init| !expr_is_pure(init, pure_functions))
    }),
    Stmt::Func(_) => false,
    Stmt::Class(decl) => !class_is_pure(&decl.class, pure_functions),
    Stmt::Expr { expr, .. } => !expr_is_pure(expr, pure_functions),
    Stmt::Empty { .. } => false,
    // Imports carry their effects through the import graph, not through the
    // statement itself.
    Stmt::Import(_) => false,
    Stmt::ExportNamed(_) | Stmt::ExportAll { .. } => false,
    Stmt::ExportDecl { decl, .. } => stmt_has_side_effects(decl, pure_functions),
    Stmt::ExportDefault { value, .. } => match value {
      ExportDefaultValue::Expr(expr) => !expr_is_pure(expr, pure_functions),
      ExportDefaultValue::Func(_) => false,
      ExportDefaultValue::Class(decl) => !class_is_pure(&decl.class, pure_functions),
    },
    // Control flow at the top level is conservatively kept.
    _ => true,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Parser;

  fn first_stmt(source: &str) -> Stmt {
    Parser::new("/test.js", source)
      .unwrap()
      .parse_module()
      .unwrap()
      .body
      .remove(0)
  }

  #[test]
  fn pure_declarations_have_no_side_effects() {
    let pure_fns = FxHashSet::default();
    assert!(!stmt_has_side_effects(
      &first_stmt("const a = { b: [1, 2], c: () => d }"),
      &pure_fns
    ));
    assert!(!stmt_has_side_effects(
      &first_stmt("function f() { console.log('hey') }"),
      &pure_fns
    ));
  }

  #[test]
  fn calls_are_impure_unless_annotated() {
    let pure_fns = FxHashSet::default();
    assert!(stmt_has_side_effects(&first_stmt("const a = f()"), &pure_fns));
    assert!(!stmt_has_side_effects(
      &first_stmt("const a = /* @__PURE__ */ f()"),
      &pure_fns
    ));
  }

  #[test]
  fn pure_function_list_matches_dotted_paths() {
    let mut pure_fns = FxHashSet::default();
    pure_fns.insert("console.log".to_string());
    assert!(!stmt_has_side_effects(
      &first_stmt("const a = console.log(1)"),
      &pure_fns
    ));
    assert!(stmt_has_side_effects(
      &first_stmt("const a = console.error(1)"),
      &pure_fns
    ));
  }

  #[test]
  fn mutation_is_a_side_effect() {
    let pure_fns = FxHashSet::default();
    assert!(stmt_has_side_effects(&first_stmt("a.b = 1"), &pure_fns));
    assert!(stmt_has_side_effects(&first_stmt("exports.foo = 123"), &pure_fns));
  }
}
