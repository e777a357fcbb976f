//! Builtin function library
//!
//! A fixed name → function table callable from dispatch-time code through
//! [`call`] or [`RequestContext::call_builtin`](super::context::RequestContext::call_builtin).
//!
//! # Supported Built-ins
//!
//! - math: `abs min max floor ceil round sqrt pow exp log`
//! - sequences: `len push pop slice concat map filter reduce reverse sort`
//! - text: `upper lower trim split join replace contains starts ends`
//! - types: `type str int float bool array object`
//! - matrices: `matrix_multiply transpose softmax dot zeros ones`
//! - utility: `print range keys values`
//!
//! # Implementation Notes
//!
//! - Builtins never fail. Missing or mistyped arguments give a zero-like
//!   default (`null`, `0`, `""`, `false`, `[]`) or pass the first argument through
//! - `map`, `filter` and `reduce` take no callbacks and return their input
//! - Sequence builtins return new lists; arguments are never mutated
//! - Matrix shapes are taken from the first row; `matrix_multiply` returns
//!   `null` when the inner dimensions differ
//! - `range`, `zeros` and `ones` return `[]` rather than build a list longer
//!   than [`MAX_BUILTIN_LEN`]

use super::constants::MAX_BUILTIN_LEN;
use crate::memory::value::{Dict, Value};

/// Signature shared by every builtin
pub type BuiltinFn = fn(&[Value]) -> Value;

/// Every builtin name, in table order.
pub const BUILTIN_NAMES: &[&str] = &[
    "abs", "min", "max", "floor", "ceil", "round", "sqrt", "pow", "exp", "log",
    "len", "push", "pop", "slice", "concat", "map", "filter", "reduce", "reverse", "sort",
    "upper", "lower", "trim", "split", "join", "replace", "contains", "starts", "ends",
    "type", "str", "int", "float", "bool", "array", "object",
    "matrix_multiply", "transpose", "softmax", "dot", "zeros", "ones",
    "print", "range", "keys", "values",
];

/// Resolve a builtin by name.
pub fn lookup(name: &str) -> Option<BuiltinFn> {
    let f: BuiltinFn = match name {
        "abs" => |args| unary(args, f64::abs),
        "min" => |args| binary(args, f64::min),
        "max" => |args| binary(args, f64::max),
        "floor" => |args| unary(args, f64::floor),
        "ceil" => |args| unary(args, f64::ceil),
        "round" => |args| unary(args, f64::round),
        "sqrt" => |args| unary(args, f64::sqrt),
        "pow" => |args| binary(args, f64::powf),
        "exp" => |args| unary(args, f64::exp),
        "log" => |args| unary(args, f64::ln),
        "len" => len,
        "push" => push,
        "pop" => pop,
        "slice" => slice,
        "concat" => concat,
        "map" | "filter" => passthrough_list,
        "reduce" => |args| args.first().cloned().unwrap_or_default(),
        "reverse" => reverse,
        "sort" => sort,
        "upper" => |args| map_text(args, |s| s.to_uppercase()),
        "lower" => |args| map_text(args, |s| s.to_lowercase()),
        "trim" => |args| map_text(args, |s| s.trim().to_string()),
        "split" => split,
        "join" => join,
        "replace" => replace,
        "contains" => |args| text_test(args, |s, p| s.contains(p)),
        "starts" => |args| text_test(args, |s, p| s.starts_with(p)),
        "ends" => |args| text_test(args, |s, p| s.ends_with(p)),
        "type" => type_of,
        "str" => |args| Value::Text(args.first().map(Value::to_text).unwrap_or_default()),
        "int" => |args| Value::Number(args.first().map(Value::to_number).unwrap_or(0.0).trunc()),
        "float" => |args| Value::Number(args.first().map(Value::to_number).unwrap_or(0.0)),
        "bool" => |args| Value::Bool(args.first().is_some_and(Value::to_bool)),
        "array" => |args| Value::List(args.to_vec()),
        "object" => object,
        "matrix_multiply" => matrix_multiply,
        "transpose" => transpose,
        "softmax" => softmax,
        "dot" => dot,
        "zeros" => |args| filled(args, 0.0),
        "ones" => |args| filled(args, 1.0),
        "print" => print,
        "range" => range,
        "keys" => keys,
        "values" => values,
        _ => return None,
    };
    Some(f)
}

/// Call a builtin by name. `None` when no builtin has that name.
pub fn call(name: &str, args: &[Value]) -> Option<Value> {
    lookup(name).map(|f| f(args))
}

fn unary(args: &[Value], op: fn(f64) -> f64) -> Value {
    match args {
        [a, ..] => Value::Number(op(a.to_number())),
        [] => Value::Null,
    }
}

fn binary(args: &[Value], op: fn(f64, f64) -> f64) -> Value {
    match args {
        [a, b, ..] => Value::Number(op(a.to_number(), b.to_number())),
        _ => Value::Null,
    }
}

fn map_text(args: &[Value], op: fn(&str) -> String) -> Value {
    Value::Text(op(&args.first().map(Value::to_text).unwrap_or_default()))
}

fn text_test(args: &[Value], test: fn(&str, &str) -> bool) -> Value {
    match args {
        [s, p, ..] => Value::Bool(test(&s.to_text(), &p.to_text())),
        _ => Value::Bool(false),
    }
}

// ===== Sequences =====

fn len(args: &[Value]) -> Value {
    Value::from(args.first().map(Value::len).unwrap_or(0))
}

fn push(args: &[Value]) -> Value {
    match args {
        [Value::List(items), item, ..] => {
            let mut items = items.clone();
            items.push(item.clone());
            Value::List(items)
        }
        [first, ..] => first.clone(),
        [] => Value::Null,
    }
}

fn pop(args: &[Value]) -> Value {
    match args {
        [Value::List(items), ..] if !items.is_empty() => {
            Value::List(items[..items.len() - 1].to_vec())
        }
        [first, ..] => first.clone(),
        [] => Value::Null,
    }
}

fn slice(args: &[Value]) -> Value {
    let [Value::List(items), start, end, ..] = args else {
        return Value::Null;
    };
    let clamp = |v: &Value| (v.to_number().max(0.0) as usize).min(items.len());
    let (start, end) = (clamp(start), clamp(end));
    if start >= end {
        return Value::List(Vec::new());
    }
    Value::List(items[start..end].to_vec())
}

fn concat(args: &[Value]) -> Value {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::List(items) => out.extend(items.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Value::List(out)
}

fn passthrough_list(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or_default()
}

fn reverse(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::List(items)) => Value::List(items.iter().rev().cloned().collect()),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

/// Stable numeric sort.
fn sort(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::List(items)) => {
            let mut items = items.clone();
            items.sort_by(|a, b| a.to_number().total_cmp(&b.to_number()));
            Value::List(items)
        }
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

// ===== Text =====

fn split(args: &[Value]) -> Value {
    match args {
        [s, sep, ..] => {
            let (s, sep) = (s.to_text(), sep.to_text());
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::Text(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(Value::from).collect()
            };
            Value::List(parts)
        }
        _ => Value::List(Vec::new()),
    }
}

fn join(args: &[Value]) -> Value {
    match args {
        [Value::List(items), sep, ..] => Value::Text(
            items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(&sep.to_text()),
        ),
        _ => Value::Text(String::new()),
    }
}

fn replace(args: &[Value]) -> Value {
    match args {
        [s, from, to, ..] => Value::Text(s.to_text().replace(&from.to_text(), &to.to_text())),
        [first, ..] => first.clone(),
        [] => Value::Null,
    }
}

// ===== Types =====

fn type_of(args: &[Value]) -> Value {
    let name = match args.first() {
        None | Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(n)) if n.fract() == 0.0 => "int",
        Some(Value::Number(_)) => "float",
        Some(Value::Text(_)) => "string",
        Some(Value::List(_)) => "array",
        Some(Value::Dict(_)) => "object",
    };
    Value::from(name)
}

/// `object(k1, v1, k2, v2, ...)`; a trailing unpaired key is dropped.
fn object(args: &[Value]) -> Value {
    let map: Dict = args
        .chunks_exact(2)
        .map(|pair| (pair[0].to_text(), pair[1].clone()))
        .collect();
    Value::Dict(map)
}

// ===== Matrices =====

fn row(value: &Value) -> &[Value] {
    value.as_list().map(Vec::as_slice).unwrap_or(&[])
}

fn cell(matrix: &[Value], i: usize, j: usize) -> f64 {
    matrix
        .get(i)
        .and_then(|r| row(r).get(j))
        .map(Value::to_number)
        .unwrap_or(0.0)
}

fn matrix_multiply(args: &[Value]) -> Value {
    let [Value::List(a), Value::List(b), ..] = args else {
        return Value::Null;
    };
    if a.is_empty() || b.is_empty() {
        return Value::Null;
    }
    let a_cols = row(&a[0]).len();
    let b_cols = row(&b[0]).len();
    if a_cols != b.len() {
        return Value::Null;
    }

    let rows = (0..a.len())
        .map(|i| {
            let cols = (0..b_cols)
                .map(|j| Value::Number((0..a_cols).map(|k| cell(a, i, k) * cell(b, k, j)).sum()))
                .collect();
            Value::List(cols)
        })
        .collect();
    Value::List(rows)
}

fn transpose(args: &[Value]) -> Value {
    let Some(Value::List(matrix)) = args.first() else {
        return Value::Null;
    };
    if matrix.is_empty() {
        return Value::Null;
    }
    let cols = row(&matrix[0]).len();

    let rows = (0..cols)
        .map(|j| {
            Value::List(
                matrix
                    .iter()
                    .map(|r| row(r).get(j).cloned().unwrap_or(Value::Number(0.0)))
                    .collect(),
            )
        })
        .collect();
    Value::List(rows)
}

/// Numerically stable softmax (shifted by the maximum).
fn softmax(args: &[Value]) -> Value {
    let Some(Value::List(items)) = args.first() else {
        return Value::Null;
    };
    if items.is_empty() {
        return Value::Null;
    }
    let xs: Vec<f64> = items.iter().map(Value::to_number).collect();
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = xs.iter().map(|x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();

    Value::List(exps.into_iter().map(|e| Value::Number(e / sum)).collect())
}

fn dot(args: &[Value]) -> Value {
    match args {
        [Value::List(a), Value::List(b), ..] if a.len() == b.len() => Value::Number(
            a.iter()
                .zip(b)
                .map(|(x, y)| x.to_number() * y.to_number())
                .sum(),
        ),
        _ => Value::Number(0.0),
    }
}

/// `zeros(n)` / `ones(n)` for a vector, `(n, m)` for an n×m matrix.
fn filled(args: &[Value], fill: f64) -> Value {
    let size = |v: &Value| v.to_number().max(0.0) as usize;
    let (rows, cols) = match args {
        [] => return Value::List(Vec::new()),
        [n] => (None, size(n)),
        [n, m, ..] => (Some(size(n)), size(m)),
    };
    let total = rows.map_or(Some(cols), |rows| rows.checked_mul(cols));
    if total.map_or(true, |total| total > MAX_BUILTIN_LEN) {
        return Value::List(Vec::new());
    }

    let row = Value::List(vec![Value::Number(fill); cols]);
    match rows {
        None => row,
        Some(rows) => Value::List(vec![row; rows]),
    }
}

// ===== Utility =====

fn print(args: &[Value]) -> Value {
    let line = args
        .iter()
        .map(Value::to_text)
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", line);
    Value::Null
}

/// `range(end)`, `range(start, end)` or `range(start, end, step)`.
fn range(args: &[Value]) -> Value {
    let int = |v: &Value| v.to_number() as i64;
    let (start, end, step) = match args {
        [] => return Value::List(Vec::new()),
        [end] => (0, int(end), 1),
        [start, end] => (int(start), int(end), 1),
        [start, end, step, ..] => (int(start), int(end), int(step)),
    };
    if step == 0 {
        return Value::List(Vec::new());
    }

    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < end) || (step < 0 && i > end) {
        if out.len() == MAX_BUILTIN_LEN {
            return Value::List(Vec::new());
        }
        out.push(Value::from(i));
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Value::List(out)
}

fn keys(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Dict(map)) => Value::List(map.keys().map(|k| Value::from(k.as_str())).collect()),
        _ => Value::List(Vec::new()),
    }
}

fn values(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Dict(map)) => Value::List(map.values().cloned().collect()),
        _ => Value::List(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(xs: &[f64]) -> Value {
        Value::List(xs.iter().map(|x| Value::Number(*x)).collect())
    }

    fn matrix(rows: &[&[f64]]) -> Value {
        Value::List(rows.iter().map(|r| nums(r)).collect())
    }

    fn call_ok(name: &str, args: &[Value]) -> Value {
        call(name, args).expect("builtin exists")
    }

    #[test]
    fn test_every_name_resolves() {
        for name in BUILTIN_NAMES {
            assert!(lookup(name).is_some(), "missing builtin {}", name);
        }
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn test_math() {
        assert_eq!(call_ok("abs", &[Value::Number(-2.0)]), Value::Number(2.0));
        assert_eq!(call_ok("max", &[Value::from("3"), Value::Number(1.0)]), Value::Number(3.0));
        assert_eq!(call_ok("pow", &[Value::Number(2.0), Value::Number(10.0)]), Value::Number(1024.0));
        assert_eq!(call_ok("min", &[Value::Number(1.0)]), Value::Null);
        assert_eq!(call_ok("sqrt", &[]), Value::Null);
    }

    #[test]
    fn test_sequences() {
        let list = nums(&[3.0, 1.0, 2.0]);
        assert_eq!(call_ok("len", &[list.clone()]), Value::Number(3.0));
        assert_eq!(call_ok("sort", &[list.clone()]), nums(&[1.0, 2.0, 3.0]));
        assert_eq!(call_ok("reverse", &[list.clone()]), nums(&[2.0, 1.0, 3.0]));
        assert_eq!(call_ok("push", &[list.clone(), Value::Number(9.0)]), nums(&[3.0, 1.0, 2.0, 9.0]));
        assert_eq!(call_ok("pop", &[list.clone()]), nums(&[3.0, 1.0]));
        assert_eq!(
            call_ok("slice", &[list.clone(), Value::Number(1.0), Value::Number(10.0)]),
            nums(&[1.0, 2.0])
        );
        assert_eq!(
            call_ok("concat", &[list.clone(), Value::Number(4.0)]),
            nums(&[3.0, 1.0, 2.0, 4.0])
        );
        assert_eq!(call_ok("map", &[list.clone()]), list);
    }

    #[test]
    fn test_text() {
        assert_eq!(call_ok("upper", &[Value::from("abc")]), Value::from("ABC"));
        assert_eq!(
            call_ok("split", &[Value::from("a,b"), Value::from(",")]),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(
            call_ok("join", &[nums(&[1.0, 2.5]), Value::from("-")]),
            Value::from("1-2.5")
        );
        assert_eq!(
            call_ok("replace", &[Value::from("aXa"), Value::from("a"), Value::from("b")]),
            Value::from("bXb")
        );
        assert_eq!(call_ok("starts", &[Value::from("kuhul"), Value::from("ku")]), Value::Bool(true));
        assert_eq!(call_ok("contains", &[Value::from("x")]), Value::Bool(false));
    }

    #[test]
    fn test_types() {
        assert_eq!(call_ok("type", &[Value::Number(2.0)]), Value::from("int"));
        assert_eq!(call_ok("type", &[Value::Number(2.5)]), Value::from("float"));
        assert_eq!(call_ok("type", &[Value::List(vec![])]), Value::from("array"));
        assert_eq!(call_ok("int", &[Value::from("7.9")]), Value::Number(7.0));
        assert_eq!(call_ok("bool", &[Value::from("0")]), Value::Bool(false));
        assert_eq!(call_ok("str", &[Value::Null]), Value::from(""));

        let obj = call_ok("object", &[Value::from("a"), Value::Number(1.0), Value::from("dangling")]);
        assert_eq!(obj.as_dict().map(|m| m.len()), Some(1));
        assert_eq!(call_ok("keys", &[obj.clone()]), Value::List(vec![Value::from("a")]));
        assert_eq!(call_ok("values", &[obj]), nums(&[1.0]));
    }

    #[test]
    fn test_matrix_multiply() {
        let a = matrix(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let b = matrix(&[&[5.0, 6.0], &[7.0, 8.0]]);
        assert_eq!(
            call_ok("matrix_multiply", &[a.clone(), b]),
            matrix(&[&[19.0, 22.0], &[43.0, 50.0]])
        );

        let mismatched = matrix(&[&[1.0, 2.0, 3.0]]);
        assert_eq!(call_ok("matrix_multiply", &[a, mismatched]), Value::Null);
    }

    #[test]
    fn test_transpose_and_dot() {
        let m = matrix(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        assert_eq!(
            call_ok("transpose", &[m]),
            matrix(&[&[1.0, 4.0], &[2.0, 5.0], &[3.0, 6.0]])
        );
        assert_eq!(
            call_ok("dot", &[nums(&[1.0, 2.0]), nums(&[3.0, 4.0])]),
            Value::Number(11.0)
        );
        assert_eq!(call_ok("dot", &[nums(&[1.0]), nums(&[3.0, 4.0])]), Value::Number(0.0));
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let out = call_ok("softmax", &[nums(&[1.0, 2.0, 3.0])]);
        let probs: Vec<f64> = out.as_list().unwrap().iter().map(Value::to_number).collect();
        let sum: f64 = probs.iter().sum();

        assert!((sum - 1.0).abs() < 1e-9);
        assert!(probs[0] < probs[1] && probs[1] < probs[2]);
        assert_eq!(call_ok("softmax", &[Value::List(vec![])]), Value::Null);
    }

    #[test]
    fn test_fill_and_range() {
        assert_eq!(call_ok("zeros", &[Value::Number(2.0)]), nums(&[0.0, 0.0]));
        assert_eq!(
            call_ok("ones", &[Value::Number(2.0), Value::Number(1.0)]),
            matrix(&[&[1.0], &[1.0]])
        );
        assert_eq!(call_ok("range", &[Value::Number(3.0)]), nums(&[0.0, 1.0, 2.0]));
        assert_eq!(
            call_ok("range", &[Value::Number(5.0), Value::Number(0.0), Value::Number(-2.0)]),
            nums(&[5.0, 3.0, 1.0])
        );
        assert_eq!(
            call_ok("range", &[Value::Number(0.0), Value::Number(3.0), Value::Number(0.0)]),
            Value::List(vec![])
        );
    }

    #[test]
    fn test_huge_sizes_do_not_panic() {
        let empty = Value::List(vec![]);

        // The second step would pass i64::MAX.
        assert_eq!(
            call_ok("range", &[Value::Number(9e18), Value::Number(9.2e18), Value::Number(1e18)]),
            nums(&[9e18])
        );
        assert_eq!(call_ok("range", &[Value::Number(1e18)]), empty);
        assert_eq!(call_ok("zeros", &[Value::Number(1e30)]), empty);
        assert_eq!(call_ok("ones", &[Value::Number(1e10), Value::Number(1e10)]), empty);
        assert_eq!(call_ok("zeros", &[Value::Number(-3.0)]), empty);

        let limit = MAX_BUILTIN_LEN as f64;
        assert_eq!(
            call_ok("zeros", &[Value::Number(limit)]).as_list().map(Vec::len),
            Some(MAX_BUILTIN_LEN)
        );
        assert_eq!(call_ok("zeros", &[Value::Number(limit + 1.0)]), empty);
    }
}
