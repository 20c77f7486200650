use crate::error::RuntimeError;
use crate::evaluator::{Interrupt, iterate};
use crate::host::Host;
use crate::runtime_value::{RuntimeValue, StrMethod};

/// Longest list or string a fragment may build. Ranges, repetition and
/// concatenation past this raise `MemoryError`.
pub(crate) const MAX_SEQUENCE_LEN: usize = 10_000_000;

/// Functions bound in the global namespace of every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Text,
    Print,
    Note,
    Fail,
    Str,
    Repr,
    Int,
    Float,
    Bool,
    Len,
    Range,
}

impl Builtin {
    pub const ALL: [Builtin; 11] = [
        Builtin::Text,
        Builtin::Print,
        Builtin::Note,
        Builtin::Fail,
        Builtin::Str,
        Builtin::Repr,
        Builtin::Int,
        Builtin::Float,
        Builtin::Bool,
        Builtin::Len,
        Builtin::Range,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Text => "text",
            Builtin::Print => "print",
            Builtin::Note => "note",
            Builtin::Fail => "fail",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::Len => "len",
            Builtin::Range => "range",
        }
    }

    pub(crate) fn call(
        self,
        args: Vec<RuntimeValue>,
        kwargs: Vec<(String, RuntimeValue)>,
        host: &mut dyn Host,
    ) -> Result<RuntimeValue, Interrupt> {
        let name = self.name();
        match self {
            Builtin::Text => {
                let [value, end] = bind(name, ["value", "end"], args, kwargs)?;
                let value = value.map(|v| v.to_string()).unwrap_or_default();
                let end = end.map(|v| v.to_string()).unwrap_or_else(|| "\n".to_string());
                host.emit_text(&format!("{}{}", value, end))?;
                Ok(RuntimeValue::None)
            }
            Builtin::Print => {
                let mut sep = " ".to_string();
                let mut end = "\n".to_string();
                for (key, value) in kwargs {
                    match key.as_str() {
                        "sep" => sep = value.to_string(),
                        "end" => end = value.to_string(),
                        other => return Err(unexpected_keyword(name, other).into()),
                    }
                }
                let line = args
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(&sep);
                host.emit_text(&format!("{}{}", line, end))?;
                Ok(RuntimeValue::None)
            }
            Builtin::Note => {
                let [message] = bind(name, ["message"], args, kwargs)?;
                let message = required(name, "message", message)?;
                log::info!("{}", message);
                Ok(RuntimeValue::None)
            }
            Builtin::Fail => {
                let [message] = bind(name, ["message"], args, kwargs)?;
                let message = message.map(|v| v.to_string()).unwrap_or_default();
                Err(RuntimeError::new("Fail", message).into())
            }
            Builtin::Str => {
                let [object] = bind(name, ["object"], args, kwargs)?;
                Ok(RuntimeValue::Str(
                    object.map(|v| v.to_string()).unwrap_or_default(),
                ))
            }
            Builtin::Repr => {
                let [object] = bind(name, ["object"], args, kwargs)?;
                Ok(RuntimeValue::Str(required(name, "object", object)?.repr()))
            }
            Builtin::Int => {
                let [x] = bind(name, ["x"], args, kwargs)?;
                Ok(to_int(x.unwrap_or(RuntimeValue::Int(0)))?)
            }
            Builtin::Float => {
                let [x] = bind(name, ["x"], args, kwargs)?;
                Ok(to_float(x.unwrap_or(RuntimeValue::Float(0.0)))?)
            }
            Builtin::Bool => {
                let [x] = bind(name, ["x"], args, kwargs)?;
                Ok(RuntimeValue::Bool(x.is_some_and(|v| v.is_truthy())))
            }
            Builtin::Len => {
                let [object] = bind(name, ["object"], args, kwargs)?;
                let length = match required(name, "object", object)? {
                    RuntimeValue::Str(s) => s.chars().count(),
                    RuntimeValue::List(items) => items.len(),
                    RuntimeValue::Dict(entries) => entries.len(),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        ))
                        .into());
                    }
                };
                Ok(RuntimeValue::Int(i64::try_from(length).unwrap_or(i64::MAX)))
            }
            Builtin::Range => {
                if let Some((key, _)) = kwargs.first() {
                    return Err(unexpected_keyword(name, key).into());
                }
                Ok(range(&args)?)
            }
        }
    }
}

/// Match positional and keyword arguments to parameter names.
fn bind<const N: usize>(
    function: &str,
    params: [&str; N],
    args: Vec<RuntimeValue>,
    kwargs: Vec<(String, RuntimeValue)>,
) -> Result<[Option<RuntimeValue>; N], RuntimeError> {
    if args.len() > N {
        return Err(RuntimeError::type_error(format!(
            "{}() takes at most {} argument{} ({} given)",
            function,
            N,
            if N == 1 { "" } else { "s" },
            args.len()
        )));
    }

    let mut bound: [Option<RuntimeValue>; N] = std::array::from_fn(|_| None);
    for (slot, value) in bound.iter_mut().zip(args) {
        *slot = Some(value);
    }
    for (key, value) in kwargs {
        let Some(index) = params.iter().position(|p| *p == key) else {
            return Err(unexpected_keyword(function, &key));
        };
        if bound[index].is_some() {
            return Err(RuntimeError::type_error(format!(
                "{}() got multiple values for argument '{}'",
                function, key
            )));
        }
        bound[index] = Some(value);
    }
    Ok(bound)
}

fn required(
    function: &str,
    param: &str,
    value: Option<RuntimeValue>,
) -> Result<RuntimeValue, RuntimeError> {
    value.ok_or_else(|| {
        RuntimeError::type_error(format!(
            "{}() missing required argument '{}'",
            function, param
        ))
    })
}

fn unexpected_keyword(function: &str, key: &str) -> RuntimeError {
    RuntimeError::type_error(format!(
        "{}() got an unexpected keyword argument '{}'",
        function, key
    ))
}

fn to_int(value: RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    match value {
        RuntimeValue::Int(n) => Ok(RuntimeValue::Int(n)),
        RuntimeValue::Bool(b) => Ok(RuntimeValue::Int(i64::from(b))),
        RuntimeValue::Float(n) => {
            if n.is_nan() {
                Err(RuntimeError::value_error("cannot convert float NaN to integer"))
            } else if n.is_infinite() || n.abs() >= 9.2e18 {
                Err(RuntimeError::new(
                    "OverflowError",
                    "cannot convert float infinity to integer",
                ))
            } else {
                Ok(RuntimeValue::Int(n.trunc() as i64))
            }
        }
        RuntimeValue::Str(s) => s.trim().parse().map(RuntimeValue::Int).map_err(|_| {
            RuntimeError::value_error(format!(
                "invalid literal for int() with base 10: {}",
                RuntimeValue::Str(s.clone()).repr()
            ))
        }),
        other => Err(RuntimeError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(value: RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    match value {
        RuntimeValue::Str(s) => s.trim().parse().map(RuntimeValue::Float).map_err(|_| {
            RuntimeError::value_error(format!(
                "could not convert string to float: {}",
                RuntimeValue::Str(s.clone()).repr()
            ))
        }),
        other => other.as_f64().map(RuntimeValue::Float).ok_or_else(|| {
            RuntimeError::type_error(format!(
                "float() argument must be a string or a number, not '{}'",
                other.type_name()
            ))
        }),
    }
}

fn range(args: &[RuntimeValue]) -> Result<RuntimeValue, RuntimeError> {
    let ints = args
        .iter()
        .map(|arg| {
            arg.as_i64().ok_or_else(|| {
                RuntimeError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    arg.type_name()
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (start, stop, step) = match ints[..] {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => {
            return Err(RuntimeError::type_error(format!(
                "range expected 1 to 3 arguments, got {}",
                ints.len()
            )));
        }
    };
    if step == 0 {
        return Err(RuntimeError::value_error("range() arg 3 must not be zero"));
    }

    let span = if step > 0 {
        stop.saturating_sub(start)
    } else {
        start.saturating_sub(stop)
    };
    let len = if span <= 0 {
        0
    } else {
        (span - 1) / step.saturating_abs() + 1
    };
    if len > MAX_SEQUENCE_LEN as i64 {
        return Err(RuntimeError::new("MemoryError", "range too large"));
    }

    Ok(RuntimeValue::List(
        (0..len)
            .map(|i| RuntimeValue::Int(start + i * step))
            .collect(),
    ))
}

/// Call a `str` method on `receiver`.
pub(crate) fn call_method(
    receiver: &RuntimeValue,
    method: StrMethod,
    args: Vec<RuntimeValue>,
    kwargs: Vec<(String, RuntimeValue)>,
) -> Result<RuntimeValue, RuntimeError> {
    let name = method.name();
    if let Some((key, _)) = kwargs.first() {
        return Err(unexpected_keyword(name, key));
    }
    let RuntimeValue::Str(s) = receiver else {
        return Err(RuntimeError::type_error(format!(
            "{}() requires a 'str' object",
            name
        )));
    };

    let str_arg = |index: usize| match args.get(index) {
        Some(RuntimeValue::Str(arg)) => Ok(arg.as_str()),
        Some(other) => Err(RuntimeError::type_error(format!(
            "{}() argument must be str, not {}",
            name,
            other.type_name()
        ))),
        None => Err(RuntimeError::type_error(format!(
            "{}() missing required argument",
            name
        ))),
    };

    let result = match method {
        StrMethod::Upper => RuntimeValue::Str(s.to_uppercase()),
        StrMethod::Lower => RuntimeValue::Str(s.to_lowercase()),
        StrMethod::Strip => match args.first() {
            None | Some(RuntimeValue::None) => RuntimeValue::Str(s.trim().to_string()),
            Some(_) => {
                let chars = str_arg(0)?;
                RuntimeValue::Str(s.trim_matches(|c: char| chars.contains(c)).to_string())
            }
        },
        StrMethod::Split => {
            let parts: Vec<RuntimeValue> = match args.first() {
                None | Some(RuntimeValue::None) => s
                    .split_whitespace()
                    .map(|p| RuntimeValue::Str(p.to_string()))
                    .collect(),
                Some(_) => {
                    let sep = str_arg(0)?;
                    if sep.is_empty() {
                        return Err(RuntimeError::value_error("empty separator"));
                    }
                    s.split(sep)
                        .map(|p| RuntimeValue::Str(p.to_string()))
                        .collect()
                }
            };
            RuntimeValue::List(parts)
        }
        StrMethod::Join => {
            let items = iterate(
                args.first()
                    .cloned()
                    .ok_or_else(|| RuntimeError::type_error("join() takes exactly one argument"))?,
            )?;
            let mut pieces = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                match item {
                    RuntimeValue::Str(piece) => pieces.push(piece),
                    other => {
                        return Err(RuntimeError::type_error(format!(
                            "sequence item {}: expected str instance, {} found",
                            i,
                            other.type_name()
                        )));
                    }
                }
            }
            RuntimeValue::Str(pieces.join(s))
        }
        StrMethod::StartsWith => RuntimeValue::Bool(s.starts_with(str_arg(0)?)),
        StrMethod::EndsWith => RuntimeValue::Bool(s.ends_with(str_arg(0)?)),
        StrMethod::Replace => RuntimeValue::Str(s.replace(str_arg(0)?, str_arg(1)?)),
    };
    Ok(result)
}
