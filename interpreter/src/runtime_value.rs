use std::fmt;

use crate::builtins::Builtin;

/// The scope a fragment runs in, as seen through `self`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRef {
    pub name: String,
    /// 0 for the document and header scopes.
    pub level: usize,
    /// `/`-separated names of the real scopes from the root.
    pub path: String,
}

/// Methods available on `str` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrMethod {
    Upper,
    Lower,
    Strip,
    Split,
    Join,
    StartsWith,
    EndsWith,
    Replace,
}

impl StrMethod {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "upper" => StrMethod::Upper,
            "lower" => StrMethod::Lower,
            "strip" => StrMethod::Strip,
            "split" => StrMethod::Split,
            "join" => StrMethod::Join,
            "startswith" => StrMethod::StartsWith,
            "endswith" => StrMethod::EndsWith,
            "replace" => StrMethod::Replace,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            StrMethod::Upper => "upper",
            StrMethod::Lower => "lower",
            StrMethod::Strip => "strip",
            StrMethod::Split => "split",
            StrMethod::Join => "join",
            StrMethod::StartsWith => "startswith",
            StrMethod::EndsWith => "endswith",
            StrMethod::Replace => "replace",
        }
    }
}

/// A value produced by evaluating fragment code.
#[derive(Debug, Clone)]
pub enum RuntimeValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<RuntimeValue>),
    /// String-keyed, insertion ordered.
    Dict(Vec<(String, RuntimeValue)>),
    Scope(ScopeRef),
    Builtin(Builtin),
    /// A `str` method bound to its receiver.
    Method(Box<RuntimeValue>, StrMethod),
}

impl RuntimeValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeValue::None => false,
            RuntimeValue::Bool(b) => *b,
            RuntimeValue::Int(n) => *n != 0,
            RuntimeValue::Float(n) => *n != 0.0,
            RuntimeValue::Str(s) => !s.is_empty(),
            RuntimeValue::List(items) => !items.is_empty(),
            RuntimeValue::Dict(entries) => !entries.is_empty(),
            RuntimeValue::Scope(_) | RuntimeValue::Builtin(_) | RuntimeValue::Method(..) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::None => "NoneType",
            RuntimeValue::Bool(_) => "bool",
            RuntimeValue::Int(_) => "int",
            RuntimeValue::Float(_) => "float",
            RuntimeValue::Str(_) => "str",
            RuntimeValue::List(_) => "list",
            RuntimeValue::Dict(_) => "dict",
            RuntimeValue::Scope(_) => "scope",
            RuntimeValue::Builtin(_) | RuntimeValue::Method(..) => "builtin_function_or_method",
        }
    }

    /// Numeric view of ints, floats and bools.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RuntimeValue::Int(n) => Some(*n as f64),
            RuntimeValue::Float(n) => Some(*n),
            RuntimeValue::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    /// Integer view of ints and bools.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RuntimeValue::Int(n) => Some(*n),
            RuntimeValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// The `repr()` form.
    pub fn repr(&self) -> String {
        match self {
            RuntimeValue::Str(s) => repr_str(s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::None => write!(f, "None"),
            RuntimeValue::Bool(true) => write!(f, "True"),
            RuntimeValue::Bool(false) => write!(f, "False"),
            RuntimeValue::Int(n) => write!(f, "{}", n),
            RuntimeValue::Float(n) => write!(f, "{}", format_float(*n)),
            RuntimeValue::Str(s) => write!(f, "{}", s),
            RuntimeValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
            RuntimeValue::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", repr_str(key), value.repr())?;
                }
                write!(f, "}}")
            }
            RuntimeValue::Scope(scope) => write!(f, "<scope '{}'>", scope.path),
            RuntimeValue::Builtin(builtin) => write!(f, "<built-in function {}>", builtin.name()),
            RuntimeValue::Method(receiver, method) => write!(
                f,
                "<built-in method {} of {} object>",
                method.name(),
                receiver.type_name()
            ),
        }
    }
}

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeValue::None, RuntimeValue::None) => true,
            (RuntimeValue::Str(a), RuntimeValue::Str(b)) => a == b,
            (RuntimeValue::List(a), RuntimeValue::List(b)) => a == b,
            (RuntimeValue::Dict(a), RuntimeValue::Dict(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.iter().any(|(other_key, other_value)| {
                            key == other_key && value == other_value
                        })
                    })
            }
            (RuntimeValue::Scope(a), RuntimeValue::Scope(b)) => a == b,
            (RuntimeValue::Builtin(a), RuntimeValue::Builtin(b)) => a == b,
            (RuntimeValue::Method(a, m), RuntimeValue::Method(b, n)) => a == b && m == n,
            (RuntimeValue::Int(a), RuntimeValue::Int(b)) => a == b,
            (RuntimeValue::Bool(a), RuntimeValue::Bool(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y, // NaN != NaN per IEEE 754
                _ => false,
            },
        }
    }
}

fn format_float(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "inf" } else { "-inf" }).to_string()
    } else if n == n.trunc() && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

/// Quote a string the way `repr()` does: single quotes unless the text
/// contains a single quote and no double quote.
fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
