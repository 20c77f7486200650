use std::collections::HashMap;

use crate::builtins::Builtin;
use crate::runtime_value::{RuntimeValue, ScopeRef};

/// Bindings shared by every unit of a document run.
///
/// Lookups search locals, then globals. Assignments always go to locals.
/// Globals start out holding the builtin functions.
#[derive(Debug)]
pub struct Environment {
    globals: HashMap<String, RuntimeValue>,
    locals: HashMap<String, RuntimeValue>,
}

impl Environment {
    pub fn new() -> Self {
        let globals = Builtin::ALL
            .iter()
            .map(|builtin| (builtin.name().to_string(), RuntimeValue::Builtin(*builtin)))
            .collect();
        Environment {
            globals,
            locals: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RuntimeValue> {
        match self.locals.get_mut(name) {
            Some(value) => Some(value),
            None => self.globals.get_mut(name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locals.contains_key(name) || self.globals.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: RuntimeValue) {
        self.locals.insert(name.to_string(), value);
    }

    pub fn set_global(&mut self, name: &str, value: RuntimeValue) {
        self.globals.insert(name.to_string(), value);
    }

    /// Bind `self` and `__file__` for the next unit.
    pub fn bind_unit(&mut self, scope: ScopeRef, file: &str) {
        self.set("self", RuntimeValue::Scope(scope));
        self.set("__file__", RuntimeValue::Str(file.to_string()));
    }

    pub fn locals(&self) -> &HashMap<String, RuntimeValue> {
        &self.locals
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_globals() {
        let env = Environment::new();
        assert!(matches!(env.get("text"), Some(RuntimeValue::Builtin(Builtin::Text))));
        assert!(env.locals().is_empty());
    }

    #[test]
    fn locals_shadow_globals() {
        let mut env = Environment::new();
        env.set("len", RuntimeValue::Int(3));
        assert_eq!(env.get("len"), Some(&RuntimeValue::Int(3)));
        env.set_global("x", RuntimeValue::Int(1));
        env.set("x", RuntimeValue::Int(2));
        assert_eq!(env.get("x"), Some(&RuntimeValue::Int(2)));
    }

    #[test]
    fn bind_unit_sets_self_and_file() {
        let mut env = Environment::new();
        let scope = ScopeRef {
            name: "A".into(),
            level: 1,
            path: "/A".into(),
        };
        env.bind_unit(scope.clone(), "<doc.tfd:3>");
        assert_eq!(env.get("self"), Some(&RuntimeValue::Scope(scope)));
        assert_eq!(
            env.get("__file__"),
            Some(&RuntimeValue::Str("<doc.tfd:3>".into()))
        );
    }
}
