//! Tree-walking evaluator with step and depth budgets.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ftbar_core::config::EvaluatorConfig;

use crate::builtins;
use crate::error::EvaluationError;
use crate::parser::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::scope::Scope;
use crate::value::Value;

/// Evaluates one AST against a scope. Single use: the step counter is not
/// reset between calls.
pub struct Evaluator<'a> {
    scope: &'a Scope,
    limits: EvaluatorConfig,
    steps: u64,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: &'a Scope, limits: EvaluatorConfig) -> Self {
        Self {
            scope,
            limits,
            steps: 0,
            depth: 0,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, EvaluationError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(EvaluationError::StepLimitExceeded(self.limits.max_steps));
        }
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            self.depth -= 1;
            return Err(EvaluationError::DepthLimitExceeded(self.limits.max_depth));
        }
        let result = self.eval_node(expr);
        self.depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr) -> Result<Value, EvaluationError> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Ident(name) => self.resolve(name),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::array(values))
            }
            Expr::Object(fields) => {
                let mut map = BTreeMap::new();
                for (key, value) in fields {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Ok(Value::Object(map.into()))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                unary(*op, value)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                binary(*op, &lhs, &rhs)
            }
            Expr::Chain { first, rest } => {
                let mut acc = self.eval(first)?;
                for (op, operand) in rest {
                    let rhs = self.eval(operand)?;
                    acc = binary(*op, &acc, &rhs)?;
                }
                Ok(acc)
            }
            Expr::Logical { op, operands } => {
                // `and` stops at the first falsy operand, `or` at the first truthy one
                let stop_on = *op == LogicalOp::Or;
                for operand in operands {
                    if self.eval(operand)?.is_truthy() == stop_on {
                        return Ok(Value::Bool(stop_on));
                    }
                }
                Ok(Value::Bool(!stop_on))
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                member(&object, property)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                index_value(&object, &index)
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let Value::Function(func) = callee else {
                    return Err(EvaluationError::NotCallable(callee.type_name().to_string()));
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                func.call(&args)
            }
        }
    }

    /// Scope first, then the builtin allow-list.
    fn resolve(&self, name: &str) -> Result<Value, EvaluationError> {
        if let Some(value) = self.scope.get(name) {
            return Ok(value.clone());
        }
        builtins::lookup(name)
            .map(Value::Function)
            .ok_or_else(|| EvaluationError::UndefinedVariable(name.to_string()))
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvaluationError> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(n)),
        (op, value) => Err(EvaluationError::Type(format!(
            "cannot apply unary '{}' to {}",
            if op == UnaryOp::Neg { "-" } else { "+" },
            value.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvaluationError> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(lhs == rhs)),
        BinaryOp::NotEq => return Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Add if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) => {
            return Ok(Value::String(format!("{}{}", lhs, rhs)));
        }
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            return compare(op, lhs, rhs);
        }
        _ => {}
    }

    let (Value::Number(a), Value::Number(b)) = (lhs, rhs) else {
        return Err(operand_error(op, lhs, rhs));
    };
    let (a, b) = (*a, *b);
    let n = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        // floored modulo; x mod 0 is x
        BinaryOp::Rem if b == 0.0 => a,
        BinaryOp::Rem => a - b * (a / b).floor(),
        BinaryOp::Pow => a.powf(b),
        _ => return Err(operand_error(op, lhs, rhs)),
    };
    Ok(Value::Number(n))
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvaluationError> {
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => return Err(operand_error(op, lhs, rhs)),
    };
    // NaN compares false against everything
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

fn operand_error(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvaluationError {
    EvaluationError::Type(format!(
        "cannot apply '{}' to {} and {}",
        op.symbol(),
        lhs.type_name(),
        rhs.type_name()
    ))
}

fn member(object: &Value, property: &str) -> Result<Value, EvaluationError> {
    match (object, property) {
        (Value::Object(map), _) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
        (Value::String(s), "length") => Ok(Value::Number(s.chars().count() as f64)),
        (Value::Array(items), "length") => Ok(Value::Number(items.len() as f64)),
        _ => Err(EvaluationError::Type(format!(
            "cannot read property '{}' of {}",
            property,
            object.type_name()
        ))),
    }
}

/// Arrays and strings are indexed from 1.
fn index_value(object: &Value, index: &Value) -> Result<Value, EvaluationError> {
    match (object, index) {
        (Value::Object(map), Value::String(key)) => {
            Ok(map.get(key.as_str()).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(items), Value::Number(n)) => {
            let i = one_based(*n, items.len())?;
            Ok(items[i].clone())
        }
        (Value::String(s), Value::Number(n)) => {
            let i = one_based(*n, s.chars().count())?;
            Ok(s.chars().nth(i).map(String::from).unwrap_or_default().into())
        }
        _ => Err(EvaluationError::Type(format!(
            "cannot index {} with {}",
            object.type_name(),
            index.type_name()
        ))),
    }
}

fn one_based(n: f64, len: usize) -> Result<usize, EvaluationError> {
    if n.fract() != 0.0 || n < 1.0 || n > len as f64 {
        return Err(EvaluationError::Type(format!(
            "index {} out of range 1..{}",
            n, len
        )));
    }
    Ok(n as usize - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::value::Function;

    fn run_with(src: &str, scope: &Scope, limits: EvaluatorConfig) -> Result<Value, EvaluationError> {
        let expr = parse(src, limits.max_depth)?;
        Evaluator::new(scope, limits).eval(&expr)
    }

    fn run(src: &str) -> Result<Value, EvaluationError> {
        run_with(src, &sample_scope(), EvaluatorConfig::default())
    }

    fn sample_scope() -> Scope {
        let mut scope = Scope::new();
        scope.set(
            "window",
            Value::object([("name", Value::from("code")), ("title", Value::from("main.rs"))]),
        );
        scope.set("items", Value::array(vec![Value::from("a"), Value::from("b")]));
        scope.set(
            "t",
            Function::new("t", |args| Ok(Value::String(format!("tr:{}", args[0])))),
        );
        scope.set("n", 5i64);
        scope
    }

    // ====================================================================
    // Arithmetic
    // ====================================================================

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(run("(1 + 2) * 3").unwrap(), Value::Number(9.0));
        assert_eq!(run("2 ^ 3 ^ 2").unwrap(), Value::Number(512.0));
        assert_eq!(run("-2 ^ 2").unwrap(), Value::Number(-4.0));
        assert_eq!(run("7 % 3").unwrap(), Value::Number(1.0));
        assert_eq!(run("-7 mod 3").unwrap(), Value::Number(2.0));
        assert_eq!(run("n / 2").unwrap(), Value::Number(2.5));
    }

    #[test]
    fn test_division_by_zero_is_infinite() {
        assert_eq!(run("1 / 0").unwrap(), Value::Number(f64::INFINITY));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run("'a' + 1").unwrap(), Value::from("a1"));
        assert_eq!(run("1.5 + 'x'").unwrap(), Value::from("1.5x"));
        assert_eq!(run("'v' + null").unwrap(), Value::from("vnull"));
        assert_eq!(run("window.title + ' - ' + window.name").unwrap(), Value::from("main.rs - code"));
    }

    #[test]
    fn test_arithmetic_type_errors() {
        assert!(matches!(run("true + 1"), Err(EvaluationError::Type(_))));
        assert!(matches!(run("'a' * 2"), Err(EvaluationError::Type(_))));
        assert!(matches!(run("-'a'"), Err(EvaluationError::Type(_))));
    }

    // ====================================================================
    // Comparison and logic
    // ====================================================================

    #[test]
    fn test_comparisons() {
        assert_eq!(run("n > 3").unwrap(), Value::Bool(true));
        assert_eq!(run("'abc' < 'abd'").unwrap(), Value::Bool(true));
        assert_eq!(run("window.name == 'code'").unwrap(), Value::Bool(true));
        assert_eq!(run("items == ['a', 'b']").unwrap(), Value::Bool(true));
        assert_eq!(run("{a: 1} != {a: 2}").unwrap(), Value::Bool(true));
        assert!(run("1 < 'a'").is_err());
    }

    #[test]
    fn test_logic_short_circuits() {
        // the right side would fail if evaluated
        assert_eq!(run("false and missing").unwrap(), Value::Bool(false));
        assert_eq!(run("true || missing").unwrap(), Value::Bool(true));
        assert_eq!(run("'x' && 1").unwrap(), Value::Bool(true));
        assert_eq!(run("not ''").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_ternary_only_evaluates_taken_branch() {
        assert_eq!(run("n > 3 ? 'big' : missing").unwrap(), Value::from("big"));
        assert_eq!(
            run("window.name == 'None' ? '' : window.title").unwrap(),
            Value::from("main.rs")
        );
    }

    // ====================================================================
    // Access and calls
    // ====================================================================

    #[test]
    fn test_member_and_index() {
        assert_eq!(run("window.missing").unwrap(), Value::Null);
        assert_eq!(run("window['name']").unwrap(), Value::from("code"));
        assert_eq!(run("items[1]").unwrap(), Value::from("a"));
        assert_eq!(run("items.length").unwrap(), Value::Number(2.0));
        assert_eq!(run("'héllo'.length").unwrap(), Value::Number(5.0));
        assert_eq!(run("'abc'[2]").unwrap(), Value::from("b"));
        assert!(run("items[0]").is_err());
        assert!(run("items[3]").is_err());
        assert!(run("n.x").is_err());
    }

    #[test]
    fn test_calls_resolve_scope_then_builtins() {
        assert_eq!(run("t('settings.title')").unwrap(), Value::from("tr:settings.title"));
        assert_eq!(run("round(2.346, 2)").unwrap(), Value::Number(2.35));
        assert_eq!(run("max(1, n, 3)").unwrap(), Value::Number(5.0));

        let mut scope = Scope::new();
        scope.set("round", Function::new("round", |_| Ok(Value::from("shadowed"))));
        assert_eq!(
            run_with("round(1)", &scope, EvaluatorConfig::default()).unwrap(),
            Value::from("shadowed")
        );
    }

    #[test]
    fn test_undefined_symbol() {
        assert_eq!(
            run("battery.level").unwrap_err(),
            EvaluationError::UndefinedVariable("battery".into())
        );
        assert_eq!(
            run("exec('rm')").unwrap_err(),
            EvaluationError::UndefinedVariable("exec".into())
        );
    }

    #[test]
    fn test_not_callable() {
        assert_eq!(
            run("window.name()").unwrap_err(),
            EvaluationError::NotCallable("string".into())
        );
    }

    // ====================================================================
    // Budgets
    // ====================================================================

    #[test]
    fn test_step_limit() {
        let limits = EvaluatorConfig {
            max_steps: 10,
            max_depth: 64,
        };
        let src = vec!["1"; 20].join(" + ");
        assert_eq!(
            run_with(&src, &Scope::new(), limits).unwrap_err(),
            EvaluationError::StepLimitExceeded(10)
        );
        assert!(run_with("1 + 1", &Scope::new(), limits).is_ok());
    }

    #[test]
    fn test_depth_limit_at_evaluation() {
        // parenthesised runs nest one tree level each
        let src = format!("{}1{}", "(".repeat(30), " + 1)".repeat(30));
        let expr = parse(&src, 64).unwrap();
        let limits = EvaluatorConfig {
            max_steps: 10_000,
            max_depth: 16,
        };
        let scope = Scope::new();
        assert_eq!(
            Evaluator::new(&scope, limits).eval(&expr).unwrap_err(),
            EvaluationError::DepthLimitExceeded(16)
        );
    }

    #[test]
    fn test_steps_are_counted() {
        let scope = Scope::new();
        let expr = parse("1 + 2", 64).unwrap();
        let mut evaluator = Evaluator::new(&scope, EvaluatorConfig::default());
        evaluator.eval(&expr).unwrap();
        assert_eq!(evaluator.steps(), 3);

        let expr = parse("1 + 2 + 3", 64).unwrap();
        let mut evaluator = Evaluator::new(&scope, EvaluatorConfig::default());
        evaluator.eval(&expr).unwrap();
        assert_eq!(evaluator.steps(), 4);
    }

    #[test]
    fn test_long_concatenation_within_default_limits() {
        let mut scope = Scope::new();
        scope.set("b", "b");
        let src = vec!["'a' + b"; 100].join(" + ' ' + ");
        let value = run_with(&src, &scope, EvaluatorConfig::default()).unwrap();
        let expected = vec!["ab"; 100].join(" ");
        assert_eq!(value, Value::from(expected.as_str()));
    }

    #[test]
    fn test_logical_runs() {
        assert_eq!(run("true and 1 and 'x'").unwrap(), Value::Bool(true));
        assert_eq!(run("true and 0 and missing").unwrap(), Value::Bool(false));
        assert_eq!(run("false or '' or n").unwrap(), Value::Bool(true));
        assert_eq!(run("false or 0 or ''").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_huge_chain_trips_step_limit() {
        let src = vec!["1"; 300_000].join("+");
        assert_eq!(
            run_with(&src, &Scope::new(), EvaluatorConfig::default()).unwrap_err(),
            EvaluationError::StepLimitExceeded(10_000)
        );
    }
}
