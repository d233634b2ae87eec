use std::collections::BTreeMap;

use kestrel::error::{GenericResult, KestrelError};
use kestrel::scanner::scan_tokens;
use kestrel::treewalk::{resolve, Expr, Stmt};
use kestrel::Interpreter;
use pretty_assertions::assert_eq;

// Map each resolved reference, written as "name@line", to its binding distance
fn distances(code: &str) -> GenericResult<BTreeMap<String, usize>> {
    let tokens = scan_tokens(code)?;
    let mut sink = Vec::new();
    let mut interpreter = Interpreter::new(&mut sink);
    let statements = interpreter.parse(&tokens)?;
    let resolutions = resolve(&statements)?;

    let mut references = Vec::new();
    for statement in &statements {
        collect_statement(statement, &mut references);
    }

    let mut table = BTreeMap::new();
    for (id, label) in references {
        if let Some(distance) = resolutions.get(&id) {
            table.insert(label, *distance);
        }
    }
    Ok(table)
}

fn collect_statement(statement: &Stmt, out: &mut Vec<(kestrel::treewalk::ExprId, String)>) {
    match statement {
        Stmt::Block { statements } => statements.iter().for_each(|s| collect_statement(s, out)),
        Stmt::Expression { expression } | Stmt::Print { expression, .. } => collect_expr(expression, out),
        Stmt::Function { declaration } => declaration.body.iter().for_each(|s| collect_statement(s, out)),
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            collect_expr(condition, out);
            collect_statement(then_branch, out);
            if let Some(else_branch) = else_branch {
                collect_statement(else_branch, out);
            }
        }
        Stmt::Return { value, .. } => value.iter().for_each(|v| collect_expr(v, out)),
        Stmt::Var { initializer, .. } => initializer.iter().for_each(|v| collect_expr(v, out)),
        Stmt::While { condition, body } => {
            collect_expr(condition, out);
            collect_statement(body, out);
        }
    }
}

fn collect_expr(expression: &Expr, out: &mut Vec<(kestrel::treewalk::ExprId, String)>) {
    match expression {
        Expr::Assign { id, name, value } => {
            collect_expr(value, out);
            out.push((*id, format!("{}={}", name.lexeme, name.line)));
        }
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            collect_expr(left, out);
            collect_expr(right, out);
        }
        Expr::Call { callee, arguments, .. } => {
            collect_expr(callee, out);
            arguments.iter().for_each(|a| collect_expr(a, out));
        }
        Expr::Grouping { expression } => collect_expr(expression, out),
        Expr::Literal { .. } => {}
        Expr::Unary { right, .. } => collect_expr(right, out),
        Expr::Variable { id, name } => out.push((*id, format!("{}@{}", name.lexeme, name.line))),
    }
}

fn table(entries: &[(&str, usize)]) -> BTreeMap<String, usize> {
    entries.iter().map(|(label, distance)| (label.to_string(), *distance)).collect()
}

#[test]
fn globals_are_not_recorded() -> GenericResult<()> {
    assert_eq!(table(&[]), distances("var a = 1;\nprint a;\na = 2;")?);

    Ok(())
}

#[test]
fn block_distances() -> GenericResult<()> {
    let code = "\
{
  var a = 1;
  {
    var b = 2;
    {
      print a;
      print b;
      b = 3;
    }
  }
}";
    assert_eq!(table(&[("a@6", 2), ("b@7", 1), ("b=8", 1)]), distances(code)?);

    Ok(())
}

#[test]
fn function_parameters_and_recursion() -> GenericResult<()> {
    let code = "\
{
  fun count(n) {
    if (n > 0) count(n - 1);
    return n;
  }
}";
    // `count` is declared in the block, one hop above the parameter scope
    assert_eq!(table(&[("count@3", 1), ("n@3", 0), ("n@4", 0)]), distances(code)?);

    Ok(())
}

#[test]
fn closure_reference_skips_call_scopes() -> GenericResult<()> {
    let code = "\
fun outer() {
  var x = 1;
  fun inner() {
    { print x; }
  }
}";
    assert_eq!(table(&[("x@4", 2)]), distances(code)?);

    Ok(())
}

#[test]
fn self_referential_initializer_is_rejected() {
    let mut sink = Vec::new();
    let mut interpreter = Interpreter::new(&mut sink);
    let result = kestrel::execute("var a = 1;\n{\n  var a = a;\n}", &mut interpreter);
    match result {
        Err(KestrelError::Resolution(error)) => {
            assert_eq!(3, error.line);
            assert!(error.message.contains("own initializer"), "{}", error.message);
        }
        other => panic!("expected a resolution error, got {other:?}"),
    }
}

#[test]
fn global_self_reference_is_allowed() -> GenericResult<()> {
    let mut buffer = Vec::new();
    let mut interpreter = Interpreter::new(&mut buffer);
    kestrel::execute("var a = 1; var a = a + 1; print a;", &mut interpreter)?;
    drop(interpreter);

    assert_eq!("2\n", std::str::from_utf8(&buffer)?);

    Ok(())
}

#[test]
fn shadowing_in_inner_block_is_allowed() -> GenericResult<()> {
    assert_eq!(
        table(&[("a@1", 0)]),
        distances("{ var a = 1; { var a = 2; } print a; }")?
    );

    Ok(())
}

#[test]
fn resolution_error_prevents_execution() {
    let mut buffer = Vec::new();
    let mut interpreter = Interpreter::new(&mut buffer);
    let result = kestrel::execute("print \"ran\";\n{ var b = b; }", &mut interpreter);
    drop(interpreter);

    assert!(matches!(result, Err(KestrelError::Resolution(_))));
    assert!(buffer.is_empty());
}

#[test]
fn top_level_return_is_rejected() {
    let mut sink = Vec::new();
    let mut interpreter = Interpreter::new(&mut sink);
    let result = kestrel::execute("return 1;", &mut interpreter);
    assert!(matches!(result, Err(KestrelError::Resolution(_))));
}
