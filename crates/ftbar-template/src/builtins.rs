//! Functions callable from any template without being placed in scope.
//!
//! This is the complete allow-list. Scope entries with the same name take
//! precedence.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::EvaluationError;
use crate::value::{Effect, Function, Value};

static BUILTINS: LazyLock<HashMap<&'static str, Function>> = LazyLock::new(|| {
    let entries: [(&'static str, fn(&[Value]) -> Result<Value, EvaluationError>); 9] = [
        ("concat", concat),
        ("string", string),
        ("number", number),
        ("round", round),
        ("floor", |args| unary_math("floor", args, f64::floor)),
        ("ceil", |args| unary_math("ceil", args, f64::ceil)),
        ("abs", |args| unary_math("abs", args, f64::abs)),
        ("min", |args| fold_numbers("min", args, f64::min)),
        ("max", |args| fold_numbers("max", args, f64::max)),
    ];
    entries
        .into_iter()
        .map(|(name, func)| (name, Function::new(name, func)))
        .collect()
});

/// Look up an allow-listed builtin.
pub fn lookup(name: &str) -> Option<Function> {
    BUILTINS.get(name).cloned()
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

/// The `invoke` callable installed in every item scope.
///
/// `invoke('log_out')` or `invoke('name', args)` yields an [`Effect`] that
/// the action dispatcher later hands to the host.
pub fn invoke() -> Function {
    Function::new("invoke", |args| {
        let (command, payload) = match args {
            [Value::String(command)] => (command, serde_json::Value::Null),
            [Value::String(command), payload] => (command, payload.to_json()),
            [other, ..] if other.as_str().is_none() => {
                return Err(EvaluationError::invalid_args(
                    "invoke",
                    format!("command must be a string, got {}", other.type_name()),
                ))
            }
            _ => {
                return Err(EvaluationError::invalid_args(
                    "invoke",
                    "expected a command name and optional arguments",
                ))
            }
        };
        Ok(Value::Effect(Effect {
            command: command.clone(),
            args: payload,
        }))
    })
}

fn concat(args: &[Value]) -> Result<Value, EvaluationError> {
    if !args.is_empty() && args.iter().all(|a| matches!(a, Value::Array(_))) {
        let mut out = Vec::new();
        for arg in args {
            if let Value::Array(items) = arg {
                out.extend(items.iter().cloned());
            }
        }
        return Ok(Value::array(out));
    }
    Ok(Value::String(args.iter().map(Value::to_string).collect()))
}

fn string(args: &[Value]) -> Result<Value, EvaluationError> {
    match args {
        [value] => Ok(Value::String(value.to_string())),
        _ => Err(arity("string", 1, args.len())),
    }
}

fn number(args: &[Value]) -> Result<Value, EvaluationError> {
    let value = match args {
        [value] => value,
        _ => return Err(arity("number", 1, args.len())),
    };
    match value {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
        Value::Null => Ok(Value::Number(0.0)),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Number(0.0)),
        Value::String(s) => s.trim().parse::<f64>().map(Value::Number).map_err(|_| {
            EvaluationError::invalid_args("number", format!("cannot convert '{}' to a number", s))
        }),
        other => Err(EvaluationError::invalid_args(
            "number",
            format!("cannot convert {} to a number", other.type_name()),
        )),
    }
}

fn round(args: &[Value]) -> Result<Value, EvaluationError> {
    match args {
        [x] => Ok(Value::Number(expect_number("round", x)?.round())),
        [x, digits] => {
            let x = expect_number("round", x)?;
            let digits = expect_number("round", digits)?;
            if digits.fract() != 0.0 || !(0.0..=15.0).contains(&digits) {
                return Err(EvaluationError::invalid_args(
                    "round",
                    "digits must be an integer between 0 and 15",
                ));
            }
            let factor = 10f64.powi(digits as i32);
            Ok(Value::Number((x * factor).round() / factor))
        }
        _ => Err(EvaluationError::invalid_args(
            "round",
            format!("expected 1 or 2 arguments, got {}", args.len()),
        )),
    }
}

fn unary_math(name: &str, args: &[Value], op: fn(f64) -> f64) -> Result<Value, EvaluationError> {
    match args {
        [x] => Ok(Value::Number(op(expect_number(name, x)?))),
        _ => Err(arity(name, 1, args.len())),
    }
}

/// `min(1, 2)` and `min([1, 2])` are both accepted.
fn fold_numbers(name: &str, args: &[Value], op: fn(f64, f64) -> f64) -> Result<Value, EvaluationError> {
    let items: &[Value] = match args {
        [Value::Array(items)] => items.as_slice(),
        _ => args,
    };
    let mut iter = items.iter();
    let first = iter
        .next()
        .ok_or_else(|| EvaluationError::invalid_args(name, "expected at least one number"))?;
    let mut acc = expect_number(name, first)?;
    for item in iter {
        acc = op(acc, expect_number(name, item)?);
    }
    Ok(Value::Number(acc))
}

fn expect_number(name: &str, value: &Value) -> Result<f64, EvaluationError> {
    value.as_number().ok_or_else(|| {
        EvaluationError::invalid_args(name, format!("expected a number, got {}", value.type_name()))
    })
}

fn arity(name: &str, expected: usize, got: usize) -> EvaluationError {
    EvaluationError::invalid_args(name, format!("expected {} argument(s), got {}", expected, got))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, EvaluationError> {
        lookup(name).unwrap().call(&args)
    }

    #[test]
    fn test_allow_list_is_fixed() {
        let mut all: Vec<&str> = names().collect();
        all.sort();
        assert_eq!(
            all,
            vec!["abs", "ceil", "concat", "floor", "max", "min", "number", "round", "string"]
        );
        assert!(lookup("eval").is_none());
        assert!(lookup("invoke").is_none());
    }

    #[test]
    fn test_concat_strings_and_arrays() {
        assert_eq!(
            call("concat", vec![Value::from("a"), Value::from(1i64), Value::Bool(true)]).unwrap(),
            Value::from("a1true")
        );
        let joined = call(
            "concat",
            vec![
                Value::array(vec![Value::from(1i64)]),
                Value::array(vec![Value::from(2i64)]),
            ],
        )
        .unwrap();
        assert_eq!(joined, Value::array(vec![Value::from(1i64), Value::from(2i64)]));
    }

    #[test]
    fn test_number_conversion() {
        assert_eq!(call("number", vec![Value::from(" 42 ")]).unwrap(), Value::Number(42.0));
        assert_eq!(call("number", vec![Value::Bool(true)]).unwrap(), Value::Number(1.0));
        assert!(call("number", vec![Value::from("abc")]).is_err());
        assert!(call("number", vec![]).is_err());
    }

    #[test]
    fn test_round_with_digits() {
        assert_eq!(call("round", vec![Value::Number(2.5)]).unwrap(), Value::Number(3.0));
        assert_eq!(
            call("round", vec![Value::Number(3.14159), Value::Number(2.0)]).unwrap(),
            Value::Number(3.14)
        );
        assert!(call("round", vec![Value::Number(1.0), Value::Number(0.5)]).is_err());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(
            call("min", vec![Value::Number(3.0), Value::Number(-1.0), Value::Number(2.0)]).unwrap(),
            Value::Number(-1.0)
        );
        assert_eq!(
            call("max", vec![Value::array(vec![Value::Number(3.0), Value::Number(7.0)])]).unwrap(),
            Value::Number(7.0)
        );
        assert!(call("max", vec![]).is_err());
        assert!(call("max", vec![Value::from("x")]).is_err());
    }

    #[test]
    fn test_rounding_family() {
        assert_eq!(call("floor", vec![Value::Number(1.7)]).unwrap(), Value::Number(1.0));
        assert_eq!(call("ceil", vec![Value::Number(1.2)]).unwrap(), Value::Number(2.0));
        assert_eq!(call("abs", vec![Value::Number(-4.0)]).unwrap(), Value::Number(4.0));
    }

    #[test]
    fn test_invoke_builds_effect() {
        let f = invoke();
        assert_eq!(
            f.call(&[Value::from("log_out")]).unwrap(),
            Value::Effect(Effect {
                command: "log_out".into(),
                args: serde_json::Value::Null,
            })
        );
        let with_args = f
            .call(&[Value::from("set_brightness"), Value::object([("value", Value::from(40i64))])])
            .unwrap();
        assert_eq!(
            with_args,
            Value::Effect(Effect {
                command: "set_brightness".into(),
                args: serde_json::json!({"value": 40}),
            })
        );
    }

    #[test]
    fn test_invoke_rejects_bad_arguments() {
        let f = invoke();
        assert!(f.call(&[]).is_err());
        assert!(f.call(&[Value::Number(1.0)]).is_err());
        assert!(f
            .call(&[Value::from("a"), Value::Null, Value::Null])
            .is_err());
    }
}
