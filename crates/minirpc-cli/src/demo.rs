//! Methods served by `minirpc serve`.

use minirpc_common::protocol::RemoteErrorKind;
use minirpc_server::{CallArgs, CallError, Dispatcher};
use serde_json::{json, Value};

/// A dispatcher with every demo method registered.
pub fn dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    register(&mut dispatcher);
    dispatcher
}

pub fn register(dispatcher: &mut Dispatcher) {
    dispatcher.register("ping", |args: CallArgs| {
        args.expect_at_most(0, &[])?;
        Ok(json!("pong"))
    });
    dispatcher.register("echo", echo);
    dispatcher.register("add", add);
    dispatcher.register("sum", sum);
    dispatcher.register("upper", upper);
    dispatcher.register("fail", fail);
}

/// Returns its arguments unchanged.
fn echo(args: CallArgs) -> Result<Value, CallError> {
    let (args, kwargs) = args.into_parts();
    Ok(json!({"args": args, "kwargs": kwargs}))
}

/// `add(a, b)`: integer addition when both are integers, float otherwise.
fn add(args: CallArgs) -> Result<Value, CallError> {
    args.expect_at_most(2, &["a", "b"])?;
    let a: Value = args.param(0, "a")?;
    let b: Value = args.param(1, "b")?;
    add_numbers(&a, &b)
}

/// `sum(values, start=0)`
fn sum(args: CallArgs) -> Result<Value, CallError> {
    args.expect_at_most(2, &["values", "start"])?;
    let values: Vec<Value> = args.param(0, "values")?;
    let start = args
        .optional_param::<Value>(1, "start")?
        .unwrap_or_else(|| json!(0));

    values.iter().try_fold(start, |total, value| add_numbers(&total, value))
}

/// `upper(text)`
fn upper(args: CallArgs) -> Result<Value, CallError> {
    args.expect_at_most(1, &["text"])?;
    let text: String = args.param(0, "text")?;
    Ok(json!(text.to_uppercase()))
}

/// `fail(message, kind="RuntimeError")`: always fails.
fn fail(args: CallArgs) -> Result<Value, CallError> {
    args.expect_at_most(2, &["message", "kind"])?;
    let message: String = args.param(0, "message")?;
    let kind = args
        .optional_param::<String>(1, "kind")?
        .unwrap_or_else(|| RemoteErrorKind::RUNTIME_ERROR.to_string());
    Err(CallError::new(kind, message))
}

fn add_numbers(a: &Value, b: &Value) -> Result<Value, CallError> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x
            .checked_add(y)
            .map(Value::from)
            .ok_or_else(|| CallError::new("OverflowError", "integer addition overflowed"));
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok(json!(x + y)),
        _ => Err(CallError::type_error(format!(
            "unsupported operand types for +: {} and {}",
            a, b
        ))),
    }
}
