use std::cmp::Ordering;

use crate::builtins::{self, MAX_SEQUENCE_LEN};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::host::{Host, HostError};
use crate::runtime_value::{RuntimeValue, StrMethod};
use crate::script::ast::{
    BinaryOperator, BoolOperator, CompareOperator, Constant, Expr, FStringPart, Program, Stmt,
    StmtKind, Target, UnaryOperator,
};

/// Why evaluation stopped early.
#[derive(Debug)]
pub enum Interrupt {
    /// A fragment exception.
    Raise(RuntimeError),
    /// The host failed while a builtin was writing output.
    Host(HostError),
}

impl Interrupt {
    fn at_line(self, line: usize) -> Self {
        match self {
            Interrupt::Raise(error) => Interrupt::Raise(error.at_line(line)),
            other => other,
        }
    }
}

impl From<RuntimeError> for Interrupt {
    fn from(error: RuntimeError) -> Self {
        Interrupt::Raise(error)
    }
}

impl From<HostError> for Interrupt {
    fn from(error: HostError) -> Self {
        Interrupt::Host(error)
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
}

/// Tree-walking evaluator for one parsed fragment.
pub struct Evaluator<'e> {
    env: &'e mut Environment,
    host: &'e mut dyn Host,
}

impl<'e> Evaluator<'e> {
    pub fn new(env: &'e mut Environment, host: &'e mut dyn Host) -> Self {
        Evaluator { env, host }
    }

    pub fn run(&mut self, program: &Program) -> Result<(), Interrupt> {
        self.exec_block(&program.body)?;
        Ok(())
    }

    fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow, Interrupt> {
        for stmt in body {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow, Interrupt> {
        self.exec_kind(&stmt.kind)
            .map_err(|interrupt| interrupt.at_line(stmt.line))
    }

    fn exec_kind(&mut self, kind: &StmtKind) -> Result<Flow, Interrupt> {
        match kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                match target {
                    Target::Name(name) => self.env.set(name, value),
                    Target::Index { name, index } => {
                        let index = self.eval(index)?;
                        self.store_item(name, index, value)?;
                    }
                }
            }
            StmtKind::AugAssign {
                target,
                operator,
                value,
            } => match target {
                Target::Name(name) => {
                    let current = self.load(name)?;
                    let rhs = self.eval(value)?;
                    self.env.set(name, binary_op(*operator, &current, &rhs)?);
                }
                Target::Index { name, index } => {
                    let index = self.eval(index)?;
                    let current = index_value(&self.load(name)?, &index)?;
                    let rhs = self.eval(value)?;
                    let result = binary_op(*operator, &current, &rhs)?;
                    self.store_item(name, index, result)?;
                }
            },
            StmtKind::If { branches, orelse } => {
                for (condition, body) in branches {
                    if self.eval(condition)?.is_truthy() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(orelse);
            }
            StmtKind::For {
                target,
                iterable,
                body,
            } => {
                let items = iterate(self.eval(iterable)?)?;
                for item in items {
                    self.env.set(target, item);
                    if let Flow::Break = self.exec_block(body)? {
                        break;
                    }
                }
            }
            StmtKind::While { condition, body } => {
                while self.eval(condition)?.is_truthy() {
                    if let Flow::Break = self.exec_block(body)? {
                        break;
                    }
                }
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass => {}
            StmtKind::Raise(expr) => return Err(self.exception(expr.as_ref())?.into()),
            StmtKind::Assert { test, message } => {
                if !self.eval(test)?.is_truthy() {
                    let message = match message {
                        Some(message) => self.eval(message)?.to_string(),
                        None => String::new(),
                    };
                    return Err(RuntimeError::new("AssertionError", message).into());
                }
            }
        }
        Ok(Flow::Normal)
    }

    /// Build the exception a `raise` statement throws.
    ///
    /// Unbound names stand for exception classes: `raise Skip("why")`
    /// raises `Skip` with message `why`.
    fn exception(&mut self, expr: Option<&Expr>) -> Result<RuntimeError, Interrupt> {
        let Some(expr) = expr else {
            return Ok(RuntimeError::new(
                "RuntimeError",
                "No active exception to reraise",
            ));
        };

        match expr {
            Expr::Name(name) if !self.env.contains(name) => {
                return Ok(RuntimeError::new(name.as_str(), ""));
            }
            Expr::Call { callee, args, .. } => {
                if let Expr::Name(name) = callee.as_ref()
                    && !self.env.contains(name)
                {
                    let message = match args.first() {
                        Some(arg) => self.eval(arg)?.to_string(),
                        None => String::new(),
                    };
                    return Ok(RuntimeError::new(name.as_str(), message));
                }
            }
            _ => {}
        }

        let value = self.eval(expr)?;
        Ok(RuntimeError::type_error(format!(
            "exceptions must derive from BaseException, not {}",
            value.type_name()
        )))
    }

    fn load(&self, name: &str) -> Result<RuntimeValue, RuntimeError> {
        self.env
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::name_error(name))
    }

    fn store_item(
        &mut self,
        name: &str,
        index: RuntimeValue,
        value: RuntimeValue,
    ) -> Result<(), RuntimeError> {
        let container = self
            .env
            .get_mut(name)
            .ok_or_else(|| RuntimeError::name_error(name))?;
        set_item(container, index, value)
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<RuntimeValue, Interrupt> {
        match expr {
            Expr::Constant(constant) => Ok(match constant {
                Constant::None => RuntimeValue::None,
                Constant::Bool(b) => RuntimeValue::Bool(*b),
                Constant::Int(n) => RuntimeValue::Int(*n),
                Constant::Float(n) => RuntimeValue::Float(*n),
                Constant::Str(s) => RuntimeValue::Str(s.clone()),
            }),
            Expr::Name(name) => Ok(self.load(name)?),
            Expr::FString(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        FStringPart::Literal(text) => out.push_str(text),
                        FStringPart::Expr(expr) => out.push_str(&self.eval(expr)?.to_string()),
                    }
                }
                Ok(RuntimeValue::Str(out))
            }
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(RuntimeValue::List),
            Expr::Dict(entries) => {
                let mut dict = RuntimeValue::Dict(Vec::with_capacity(entries.len()));
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    set_item(&mut dict, key, value)?;
                }
                Ok(dict)
            }
            Expr::Unary { operator, operand } => {
                let operand = self.eval(operand)?;
                Ok(unary_op(*operator, &operand)?)
            }
            Expr::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary_op(*operator, &left, &right)?)
            }
            Expr::Bool {
                operator,
                left,
                right,
            } => {
                let left = self.eval(left)?;
                match (operator, left.is_truthy()) {
                    (BoolOperator::And, false) | (BoolOperator::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Compare { left, comparisons } => {
                let mut current = self.eval(left)?;
                for (operator, right) in comparisons {
                    let right = self.eval(right)?;
                    if !compare(*operator, &current, &right)? {
                        return Ok(RuntimeValue::Bool(false));
                    }
                    current = right;
                }
                Ok(RuntimeValue::Bool(true))
            }
            Expr::Call {
                callee,
                args,
                kwargs,
            } => {
                let function = self.eval(callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let kwargs = kwargs
                    .iter()
                    .map(|(name, value)| -> Result<_, Interrupt> {
                        Ok((name.clone(), self.eval(value)?))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(function, args, kwargs)
            }
            Expr::Attribute { object, name } => {
                let object = self.eval(object)?;
                Ok(attribute(object, name)?)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                Ok(index_value(&object, &index)?)
            }
        }
    }

    fn call(
        &mut self,
        function: RuntimeValue,
        args: Vec<RuntimeValue>,
        kwargs: Vec<(String, RuntimeValue)>,
    ) -> Result<RuntimeValue, Interrupt> {
        match function {
            RuntimeValue::Builtin(builtin) => builtin.call(args, kwargs, &mut *self.host),
            RuntimeValue::Method(receiver, method) => {
                Ok(builtins::call_method(&receiver, method, args, kwargs)?)
            }
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))
            .into()),
        }
    }
}

/// The items a `for` loop visits.
pub(crate) fn iterate(value: RuntimeValue) -> Result<Vec<RuntimeValue>, RuntimeError> {
    match value {
        RuntimeValue::List(items) => Ok(items),
        RuntimeValue::Str(s) => Ok(s
            .chars()
            .map(|c| RuntimeValue::Str(c.to_string()))
            .collect()),
        RuntimeValue::Dict(entries) => Ok(entries
            .into_iter()
            .map(|(key, _)| RuntimeValue::Str(key))
            .collect()),
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

fn unary_op(operator: UnaryOperator, operand: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    let symbol = match operator {
        UnaryOperator::Not => return Ok(RuntimeValue::Bool(!operand.is_truthy())),
        UnaryOperator::Neg => "-",
        UnaryOperator::Pos => "+",
    };
    match (operator, operand) {
        (UnaryOperator::Neg, RuntimeValue::Float(n)) => Ok(RuntimeValue::Float(-n)),
        (UnaryOperator::Pos, RuntimeValue::Float(n)) => Ok(RuntimeValue::Float(*n)),
        (_, value) => match value.as_i64() {
            Some(n) if operator == UnaryOperator::Pos => Ok(RuntimeValue::Int(n)),
            Some(n) => n.checked_neg().map(RuntimeValue::Int).ok_or_else(overflow),
            None => Err(RuntimeError::type_error(format!(
                "bad operand type for unary {}: '{}'",
                symbol,
                value.type_name()
            ))),
        },
    }
}

fn overflow() -> RuntimeError {
    RuntimeError::new("OverflowError", "integer overflow")
}

pub(crate) fn binary_op(
    operator: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<RuntimeValue, RuntimeError> {
    match (operator, left, right) {
        (BinaryOperator::Add, RuntimeValue::Str(a), RuntimeValue::Str(b)) => {
            sequence_len(a.len().checked_add(b.len()))?;
            Ok(RuntimeValue::Str(format!("{}{}", a, b)))
        }
        (BinaryOperator::Add, RuntimeValue::List(a), RuntimeValue::List(b)) => {
            sequence_len(a.len().checked_add(b.len()))?;
            Ok(RuntimeValue::List(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOperator::Mul, RuntimeValue::Str(s), n) | (BinaryOperator::Mul, n, RuntimeValue::Str(s))
            if n.as_i64().is_some() =>
        {
            let count = repeat_count(n);
            sequence_len(s.len().checked_mul(count))?;
            Ok(RuntimeValue::Str(s.repeat(count)))
        }
        (BinaryOperator::Mul, RuntimeValue::List(items), n)
        | (BinaryOperator::Mul, n, RuntimeValue::List(items))
            if n.as_i64().is_some() =>
        {
            let count = repeat_count(n);
            if sequence_len(items.len().checked_mul(count))? == 0 {
                return Ok(RuntimeValue::List(Vec::new()));
            }
            Ok(RuntimeValue::List(
                std::iter::repeat_n(items, count).flatten().cloned().collect(),
            ))
        }
        _ => arithmetic(operator, left, right),
    }
}

/// Negative counts repeat zero times.
fn repeat_count(n: &RuntimeValue) -> usize {
    n.as_i64()
        .and_then(|count| usize::try_from(count).ok())
        .unwrap_or(0)
}

fn sequence_len(len: Option<usize>) -> Result<usize, RuntimeError> {
    match len {
        Some(len) if len <= MAX_SEQUENCE_LEN => Ok(len),
        _ => Err(RuntimeError::new("MemoryError", "sequence too large")),
    }
}

fn arithmetic(
    operator: BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<RuntimeValue, RuntimeError> {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return int_arithmetic(operator, a, b);
    }
    if let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) {
        return float_arithmetic(operator, a, b);
    }
    Err(RuntimeError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        operator.symbol(),
        left.type_name(),
        right.type_name()
    )))
}

fn int_arithmetic(operator: BinaryOperator, a: i64, b: i64) -> Result<RuntimeValue, RuntimeError> {
    let result = match operator {
        BinaryOperator::Add => a.checked_add(b),
        BinaryOperator::Sub => a.checked_sub(b),
        BinaryOperator::Mul => a.checked_mul(b),
        BinaryOperator::Div => {
            if b == 0 {
                return Err(RuntimeError::zero_division("division by zero"));
            }
            return Ok(RuntimeValue::Float(a as f64 / b as f64));
        }
        BinaryOperator::FloorDiv => {
            if b == 0 {
                return Err(RuntimeError::zero_division(
                    "integer division or modulo by zero",
                ));
            }
            a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinaryOperator::Mod => {
            if b == 0 {
                return Err(RuntimeError::zero_division("integer modulo by zero"));
            }
            a.checked_rem(b).map(|r| {
                if r != 0 && ((r < 0) != (b < 0)) {
                    r + b
                } else {
                    r
                }
            })
        }
        BinaryOperator::Pow => match u32::try_from(b) {
            Ok(exponent) => a.checked_pow(exponent),
            Err(_) if b < 0 => return Ok(RuntimeValue::Float((a as f64).powf(b as f64))),
            Err(_) => None,
        },
    };
    result.map(RuntimeValue::Int).ok_or_else(overflow)
}

fn float_arithmetic(operator: BinaryOperator, a: f64, b: f64) -> Result<RuntimeValue, RuntimeError> {
    let result = match operator {
        BinaryOperator::Add => a + b,
        BinaryOperator::Sub => a - b,
        BinaryOperator::Mul => a * b,
        BinaryOperator::Div => {
            if b == 0.0 {
                return Err(RuntimeError::zero_division("float division by zero"));
            }
            a / b
        }
        BinaryOperator::FloorDiv => {
            if b == 0.0 {
                return Err(RuntimeError::zero_division("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinaryOperator::Mod => {
            if b == 0.0 {
                return Err(RuntimeError::zero_division("float modulo"));
            }
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinaryOperator::Pow => a.powf(b),
    };
    Ok(RuntimeValue::Float(result))
}

fn compare(
    operator: CompareOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<bool, RuntimeError> {
    let ordering = |left: &RuntimeValue, right: &RuntimeValue| -> Result<Option<Ordering>, RuntimeError> {
        match (left, right) {
            (RuntimeValue::Str(a), RuntimeValue::Str(b)) => Ok(Some(a.cmp(b))),
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
                _ => Err(RuntimeError::type_error(format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    operator.symbol(),
                    left.type_name(),
                    right.type_name()
                ))),
            },
        }
    };

    Ok(match operator {
        CompareOperator::Eq => left == right,
        CompareOperator::NotEq => left != right,
        CompareOperator::Lt => ordering(left, right)? == Some(Ordering::Less),
        CompareOperator::Gt => ordering(left, right)? == Some(Ordering::Greater),
        CompareOperator::LtEq => matches!(
            ordering(left, right)?,
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOperator::GtEq => matches!(
            ordering(left, right)?,
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOperator::In => contains(right, left)?,
        CompareOperator::NotIn => !contains(right, left)?,
    })
}

fn contains(container: &RuntimeValue, item: &RuntimeValue) -> Result<bool, RuntimeError> {
    match container {
        RuntimeValue::Str(haystack) => match item {
            RuntimeValue::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(RuntimeError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        RuntimeValue::List(items) => Ok(items.contains(item)),
        RuntimeValue::Dict(entries) => Ok(match item {
            RuntimeValue::Str(key) => entries.iter().any(|(k, _)| k == key),
            _ => false,
        }),
        other => Err(RuntimeError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Resolve a possibly negative index against a sequence of `len` items.
fn position(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn integer_index(container: &RuntimeValue, index: &RuntimeValue) -> Result<i64, RuntimeError> {
    index.as_i64().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "{} indices must be integers, not {}",
            container.type_name(),
            index.type_name()
        ))
    })
}

fn index_value(object: &RuntimeValue, index: &RuntimeValue) -> Result<RuntimeValue, RuntimeError> {
    match object {
        RuntimeValue::List(items) => position(integer_index(object, index)?, items.len())
            .map(|i| items[i].clone())
            .ok_or_else(|| RuntimeError::new("IndexError", "list index out of range")),
        RuntimeValue::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            position(integer_index(object, index)?, chars.len())
                .map(|i| RuntimeValue::Str(chars[i].to_string()))
                .ok_or_else(|| RuntimeError::new("IndexError", "string index out of range"))
        }
        RuntimeValue::Dict(entries) => {
            let found = match index {
                RuntimeValue::Str(key) => entries.iter().find(|(k, _)| k == key),
                _ => None,
            };
            found
                .map(|(_, value)| value.clone())
                .ok_or_else(|| RuntimeError::new("KeyError", index.repr()))
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn set_item(
    container: &mut RuntimeValue,
    index: RuntimeValue,
    value: RuntimeValue,
) -> Result<(), RuntimeError> {
    match container {
        RuntimeValue::List(items) => {
            let i = index.as_i64().ok_or_else(|| {
                RuntimeError::type_error(format!(
                    "list indices must be integers, not {}",
                    index.type_name()
                ))
            })?;
            let slot = position(i, items.len()).ok_or_else(|| {
                RuntimeError::new("IndexError", "list assignment index out of range")
            })?;
            items[slot] = value;
            Ok(())
        }
        RuntimeValue::Dict(entries) => {
            let RuntimeValue::Str(key) = index else {
                return Err(RuntimeError::type_error(format!(
                    "dict keys must be str, not {}",
                    index.type_name()
                )));
            };
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => entries.push((key, value)),
            }
            Ok(())
        }
        other => Err(RuntimeError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

fn attribute(object: RuntimeValue, name: &str) -> Result<RuntimeValue, RuntimeError> {
    if let RuntimeValue::Str(_) = object
        && let Some(method) = StrMethod::lookup(name)
    {
        return Ok(RuntimeValue::Method(Box::new(object), method));
    }

    match (&object, name) {
        (RuntimeValue::Scope(scope), "name") => Ok(RuntimeValue::Str(scope.name.clone())),
        (RuntimeValue::Scope(scope), "level") => Ok(RuntimeValue::Int(
            i64::try_from(scope.level).unwrap_or(i64::MAX),
        )),
        (RuntimeValue::Scope(scope), "path") => Ok(RuntimeValue::Str(scope.path.clone())),
        _ => Err(RuntimeError::new(
            "AttributeError",
            format!(
                "'{}' object has no attribute '{}'",
                object.type_name(),
                name
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ErrorAction, ScopeHandle, ScopeInfo};
    use crate::error_mapper::FragmentError;
    use crate::script::parse_program;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[derive(Default)]
    struct Capture {
        text: String,
    }

    impl Host for Capture {
        fn open_scope(&mut self, _info: &ScopeInfo) -> Result<ScopeHandle, HostError> {
            Ok(ScopeHandle(0))
        }

        fn close_scope(&mut self, _handle: ScopeHandle) -> Result<(), HostError> {
            Ok(())
        }

        fn emit_text(&mut self, text: &str) -> Result<(), HostError> {
            self.text.push_str(text);
            Ok(())
        }

        fn report_recoverable_error(&mut self, _error: &FragmentError) -> ErrorAction {
            ErrorAction::Halt
        }

        fn report_fatal_error(&mut self, _message: &str) {}
    }

    fn run(source: &str) -> (Result<(), Interrupt>, Environment, String) {
        let program = parse_program(source).unwrap();
        let mut env = Environment::new();
        let mut host = Capture::default();
        let result = Evaluator::new(&mut env, &mut host).run(&program);
        (result, env, host.text)
    }

    fn value_of(source: &str, name: &str) -> RuntimeValue {
        let (result, env, _) = run(source);
        assert!(result.is_ok(), "{:?}", result);
        env.get(name).cloned().unwrap()
    }

    fn raised(source: &str) -> RuntimeError {
        match run(source).0 {
            Err(Interrupt::Raise(error)) => error,
            other => panic!("expected an exception, got {:?}", other),
        }
    }

    #[rstest]
    #[case("x = 7 // 2", RuntimeValue::Int(3))]
    #[case("x = -7 // 2", RuntimeValue::Int(-4))]
    #[case("x = -7 % 3", RuntimeValue::Int(2))]
    #[case("x = 7 % -3", RuntimeValue::Int(-2))]
    #[case("x = 1 / 2", RuntimeValue::Float(0.5))]
    #[case("x = 2 ** 10", RuntimeValue::Int(1024))]
    #[case("x = 2 ** -1", RuntimeValue::Float(0.5))]
    #[case("x = 1 + 2.5", RuntimeValue::Float(3.5))]
    #[case("x = 'ab' * 2", RuntimeValue::Str("abab".into()))]
    #[case("x = 1 < 2 < 3", RuntimeValue::Bool(true))]
    #[case("x = 3 > 2 > 2", RuntimeValue::Bool(false))]
    #[case("x = 0 or 'fallback'", RuntimeValue::Str("fallback".into()))]
    #[case("x = 'a' in 'cat'", RuntimeValue::Bool(true))]
    #[case("x = 4 not in [1, 2]", RuntimeValue::Bool(true))]
    #[case("x = [1, 2, 3][-1]", RuntimeValue::Int(3))]
    #[case("x = {'k': 1}['k']", RuntimeValue::Int(1))]
    #[case("x = 'a-b'.split('-')[1].upper()", RuntimeValue::Str("B".into()))]
    #[case("n = 5\nx = f'n={n + 1}'", RuntimeValue::Str("n=6".into()))]
    fn expressions(#[case] source: &str, #[case] expected: RuntimeValue) {
        assert_eq!(value_of(source, "x"), expected);
    }

    #[test]
    fn loops_and_control_flow() {
        let source = "total = 0\nfor i in range(10):\n    if i % 2:\n        continue\n    if i > 6:\n        break\n    total += i\n";
        assert_eq!(value_of(source, "total"), RuntimeValue::Int(12));

        let source = "n = 0\nwhile n < 5:\n    n += 1\n";
        assert_eq!(value_of(source, "n"), RuntimeValue::Int(5));
    }

    #[test]
    fn item_assignment() {
        let source = "xs = [1, 2]\nxs[0] = 9\nd = {}\nd['a'] = 1\nd['a'] += 1\n";
        let (result, env, _) = run(source);
        assert!(result.is_ok());
        assert_eq!(
            env.get("xs").cloned().unwrap(),
            RuntimeValue::List(vec![RuntimeValue::Int(9), RuntimeValue::Int(2)])
        );
        assert_eq!(
            env.get("d").cloned().unwrap(),
            RuntimeValue::Dict(vec![("a".into(), RuntimeValue::Int(2))])
        );
    }

    #[test]
    fn builtins_write_through_host() {
        let (result, _, text) = run("text('a', end='')\nprint(1, 2, sep=',')\ntext()\n");
        assert!(result.is_ok());
        assert_eq!(text, "a1,2\n\n");
    }

    #[rstest]
    #[case("x = 1 / 0", "ZeroDivisionError", "division by zero", 1)]
    #[case("x = 1\ny = x // 0", "ZeroDivisionError", "integer division or modulo by zero", 2)]
    #[case("missing", "NameError", "name 'missing' is not defined", 1)]
    #[case("x = [1][3]", "IndexError", "list index out of range", 1)]
    #[case("x = {}['k']", "KeyError", "'k'", 1)]
    #[case("x = 1 + 'a'", "TypeError", "unsupported operand type(s) for +: 'int' and 'str'", 1)]
    #[case("raise ValueError('bad')", "ValueError", "bad", 1)]
    #[case("raise Skip", "Skip", "", 1)]
    #[case("assert 1 == 2, 'nope'", "AssertionError", "nope", 1)]
    #[case("fail('stop')", "Fail", "stop", 1)]
    #[case("x = int('abc')", "ValueError", "invalid literal for int() with base 10: 'abc'", 1)]
    #[case("x = 1\nx.foo", "AttributeError", "'int' object has no attribute 'foo'", 2)]
    fn exceptions(
        #[case] source: &str,
        #[case] exception: &str,
        #[case] message: &str,
        #[case] line: usize,
    ) {
        let error = raised(source);
        assert_eq!(error.exception, exception);
        assert_eq!(error.message, message);
        assert_eq!(error.line, line);
    }

    #[rstest]
    #[case("x = 'ab' * 9223372036854775807")]
    #[case("x = [1] * 10 ** 12")]
    #[case("x = 3 * ['a', 'b'] * 10000000")]
    #[case("s = 'x' * 10000000\nt = s + 'y'")]
    fn oversized_sequences_raise(#[case] source: &str) {
        let error = raised(source);
        assert_eq!(error.exception, "MemoryError");
    }

    #[test]
    fn empty_repetition_is_cheap() {
        assert_eq!(value_of("x = [] * 9223372036854775807", "x"), RuntimeValue::List(vec![]));
        assert_eq!(value_of("x = 'ab' * -3", "x"), RuntimeValue::Str(String::new()));
    }

    #[test]
    fn nested_statement_line_wins() {
        let error = raised("for i in [1]:\n    x = 1\n    y = i / 0\n");
        assert_eq!(error.line, 3);
    }

    #[test]
    fn scope_attributes() {
        let mut env = Environment::new();
        env.bind_unit(
            crate::runtime_value::ScopeRef {
                name: "Intro".into(),
                level: 2,
                path: "/Doc/Intro".into(),
            },
            "doc.tfd",
        );
        let program = parse_program("p = self.path\nl = self.level\nf = __file__\n").unwrap();
        let mut host = Capture::default();
        Evaluator::new(&mut env, &mut host).run(&program).unwrap();
        assert_eq!(env.get("p").cloned().unwrap(), RuntimeValue::Str("/Doc/Intro".into()));
        assert_eq!(env.get("l").cloned().unwrap(), RuntimeValue::Int(2));
        assert_eq!(env.get("f").cloned().unwrap(), RuntimeValue::Str("doc.tfd".into()));
    }
}
