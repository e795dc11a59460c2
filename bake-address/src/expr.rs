//! Syntactic dependency extraction: walk an `hcl::Expression` and collect the
//! absolute `Path`s it references, without evaluating anything. This mirrors
//! `hcl.Traversal`'s role upstream — a variable walk, not an evaluation.

use bake_value::Path;
use hcl::expr::{Expression, Object, ObjectKey, Traversal, TraversalOperator};

/// Every absolute path referenced anywhere inside `expr`.
pub fn variables_in(expr: &Expression) -> Vec<Path> {
    let mut out = Vec::new();
    walk(expr, &mut out);
    out
}

fn walk(expr: &Expression, out: &mut Vec<Path>) {
    match expr {
        Expression::Variable(var) => out.push(Path::root(var.as_str())),
        Expression::Traversal(traversal) => {
            if let Some(path) = traversal_to_path(traversal) {
                out.push(path);
            }
            for operator in &traversal.operators {
                if let TraversalOperator::Index(index_expr) = operator {
                    walk(index_expr, out);
                }
            }
        }
        Expression::Array(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Expression::Object(object) => walk_object(object, out),
        Expression::Parenthesis(inner) => walk(inner, out),
        Expression::Conditional(cond) => {
            walk(&cond.cond_expr, out);
            walk(&cond.true_expr, out);
            walk(&cond.false_expr, out);
        }
        Expression::Operation(op) => walk_operation(op, out),
        Expression::FuncCall(call) => {
            for arg in &call.args {
                walk(arg, out);
            }
        }
        Expression::ForExpr(for_expr) => {
            walk(&for_expr.collection_expr, out);
            walk(&for_expr.value_expr, out);
            if let Some(cond) = &for_expr.cond_expr {
                walk(cond, out);
            }
        }
        Expression::TemplateExpr(template) => {
            for part in template.elements() {
                walk(part, out);
            }
        }
        _ => {}
    }
}

fn walk_object(object: &Object<ObjectKey, Expression>, out: &mut Vec<Path>) {
    for (key, value) in object.iter() {
        if let ObjectKey::Expression(key_expr) = key {
            walk(key_expr, out);
        }
        walk(value, out);
    }
}

fn walk_operation(op: &hcl::expr::Operation, out: &mut Vec<Path>) {
    use hcl::expr::Operation;
    match op {
        Operation::Unary(unary) => walk(&unary.expr, out),
        Operation::Binary(binary) => {
            walk(&binary.lhs_expr, out);
            walk(&binary.rhs_expr, out);
        }
    }
}

/// Converts a traversal's root variable + leading `GetAttr` chain into a
/// `Path`. Index operators are stopped at (they contribute their own
/// sub-expression's variables separately, handled by the caller).
fn traversal_to_path(traversal: &Traversal) -> Option<Path> {
    let root_name = match &traversal.expr {
        Expression::Variable(var) => var.as_str().to_string(),
        _ => return None,
    };

    let mut path = Path::root(root_name);
    for operator in &traversal.operators {
        match operator {
            TraversalOperator::GetAttr(ident) => path = path.attr(ident.as_str()),
            TraversalOperator::LegacyIndex(index) => path = path.index_int(*index as i64),
            TraversalOperator::Index(Expression::String(s)) => path = path.index_str(s.clone()),
            TraversalOperator::Index(_) => break,
            _ => break,
        }
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcl::expr::Traversal as HclTraversal;
    use hcl::Expression as HclExpression;

    #[test]
    fn simple_attribute_traversal_resolves_to_a_path() {
        let expr: HclExpression = HclExpression::Traversal(Box::new(HclTraversal::new(
            HclExpression::Variable("data".parse().unwrap()),
            [TraversalOperator::GetAttr("tag".parse().unwrap())],
        )));
        let vars = variables_in(&expr);
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].to_string(), "data.tag");
    }

    #[test]
    fn bare_variable_resolves_to_its_own_path() {
        let expr = HclExpression::Variable("build".parse().unwrap());
        let vars = variables_in(&expr);
        assert_eq!(vars[0].to_string(), "build");
    }
}
