//! Extension functions registered in every rule environment.
//!
//! The engine's standard library covers `size`, `contains`, `startsWith`,
//! `endsWith`, `matches`, and the `string`/`bytes` conversions. This module
//! adds string manipulation and base64 helpers. Indices count Unicode code
//! points, not bytes.
//!
//! | function                          | result   |
//! |-----------------------------------|----------|
//! | `s.charAt(i)`                     | string   |
//! | `s.indexOf(sub)`                  | int      |
//! | `s.lastIndexOf(sub)`              | int      |
//! | `s.lowerAscii()` / `upperAscii()` | string   |
//! | `s.replace(old, new)`             | string   |
//! | `s.split(sep)`                    | list     |
//! | `s.substring(start, end)`         | string   |
//! | `s.trim()`                        | string   |
//! | `list.join(sep)`                  | string   |
//! | `base64Encode(b)`                 | string   |
//! | `base64Decode(s)`                 | bytes    |

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cel::extractors::This;
use cel::{Context, ExecutionError, Value};

/// Names of every function this module registers.
pub const FUNCTION_NAMES: &[&str] = &[
    "charAt",
    "indexOf",
    "lastIndexOf",
    "lowerAscii",
    "upperAscii",
    "replace",
    "split",
    "substring",
    "trim",
    "join",
    "base64Encode",
    "base64Decode",
];

/// Register all extension functions in `ctx`.
pub fn register(ctx: &mut Context<'_>) {
    ctx.add_function("charAt", char_at);
    ctx.add_function("indexOf", index_of);
    ctx.add_function("lastIndexOf", last_index_of);
    ctx.add_function("lowerAscii", lower_ascii);
    ctx.add_function("upperAscii", upper_ascii);
    ctx.add_function("replace", replace);
    ctx.add_function("split", split);
    ctx.add_function("substring", substring);
    ctx.add_function("trim", trim);
    ctx.add_function("join", join);
    ctx.add_function("base64Encode", base64_encode);
    ctx.add_function("base64Decode", base64_decode);
}

type FnResult = Result<Value, ExecutionError>;

fn fail(function: &str, message: impl Into<String>) -> ExecutionError {
    ExecutionError::FunctionError {
        function: function.to_string(),
        message: message.into(),
    }
}

fn text(s: impl Into<String>) -> Value {
    Value::String(Arc::new(s.into()))
}

fn index_arg(function: &str, value: &Value) -> Result<usize, ExecutionError> {
    match value {
        Value::Int(i) if *i >= 0 => Ok(*i as usize),
        Value::UInt(u) => Ok(*u as usize),
        Value::Int(i) => Err(fail(function, format!("index {i} out of range"))),
        _ => Err(fail(function, "index must be an integer")),
    }
}

/// Code-point position of the first byte offset `byte` in `s`.
fn char_position(s: &str, byte: usize) -> i64 {
    s[..byte].chars().count() as i64
}

fn char_at(This(this): This<Arc<String>>, index: Value) -> FnResult {
    let i = index_arg("charAt", &index)?;
    let len = this.chars().count();
    if i > len {
        return Err(fail("charAt", format!("index {i} out of range for length {len}")));
    }
    Ok(text(this.chars().nth(i).map(String::from).unwrap_or_default()))
}

fn index_of(This(this): This<Arc<String>>, sub: Arc<String>) -> FnResult {
    Ok(Value::Int(
        this.find(sub.as_str())
            .map(|byte| char_position(&this, byte))
            .unwrap_or(-1),
    ))
}

fn last_index_of(This(this): This<Arc<String>>, sub: Arc<String>) -> FnResult {
    Ok(Value::Int(
        this.rfind(sub.as_str())
            .map(|byte| char_position(&this, byte))
            .unwrap_or(-1),
    ))
}

fn lower_ascii(This(this): This<Arc<String>>) -> FnResult {
    Ok(text(this.to_ascii_lowercase()))
}

fn upper_ascii(This(this): This<Arc<String>>) -> FnResult {
    Ok(text(this.to_ascii_uppercase()))
}

fn replace(This(this): This<Arc<String>>, from: Arc<String>, to: Arc<String>) -> FnResult {
    Ok(text(this.replace(from.as_str(), to.as_str())))
}

fn split(This(this): This<Arc<String>>, sep: Arc<String>) -> FnResult {
    let parts: Vec<Value> = if sep.is_empty() {
        this.chars().map(|c| text(c.to_string())).collect()
    } else {
        this.split(sep.as_str()).map(text).collect()
    };
    Ok(Value::List(Arc::new(parts)))
}

fn substring(This(this): This<Arc<String>>, start: Value, end: Value) -> FnResult {
    let start = index_arg("substring", &start)?;
    let end = index_arg("substring", &end)?;
    let len = this.chars().count();
    if start > end || end > len {
        return Err(fail(
            "substring",
            format!("range [{start}, {end}) out of bounds for length {len}"),
        ));
    }
    Ok(text(this.chars().skip(start).take(end - start).collect::<String>()))
}

fn trim(This(this): This<Arc<String>>) -> FnResult {
    Ok(text(this.trim()))
}

fn join(This(this): This<Value>, sep: Arc<String>) -> FnResult {
    let Value::List(items) = this else {
        return Err(fail("join", "receiver must be a list"));
    };
    let mut parts = Vec::with_capacity(items.len());
    for item in items.iter() {
        match item {
            Value::String(s) => parts.push(s.as_str().to_string()),
            _ => return Err(fail("join", "list elements must be strings")),
        }
    }
    Ok(text(parts.join(sep.as_str())))
}

fn base64_encode(value: Value) -> FnResult {
    match value {
        Value::Bytes(b) => Ok(text(STANDARD.encode(b.as_slice()))),
        Value::String(s) => Ok(text(STANDARD.encode(s.as_bytes()))),
        _ => Err(fail("base64Encode", "argument must be bytes or string")),
    }
}

fn base64_decode(value: Arc<String>) -> FnResult {
    STANDARD
        .decode(value.as_bytes())
        .map(|b| Value::Bytes(Arc::new(b)))
        .map_err(|e| fail("base64Decode", e.to_string()))
}
