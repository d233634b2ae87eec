use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::UndefinedVariable;

use super::expr::LiteralValue;
use super::stmt::FunctionDeclaration;

type LookupResult<T> = Result<T, UndefinedVariable>;

#[derive(Debug, Clone)]
pub enum KestrelValue {
    Function(Rc<KestrelFunction>),
    Literal(LiteralValue),
}

/// A declared function together with the scope it was declared in.
pub struct KestrelFunction {
    pub declaration: Rc<FunctionDeclaration>,
    pub closure: Environment,
}

impl KestrelFunction {
    pub fn arity(&self) -> usize {
        self.declaration.arity()
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
}

// The closure can hold this function, so only the name is printed
impl fmt::Debug for KestrelFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KestrelFunction")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .finish()
    }
}

impl PartialEq for KestrelFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration) && self.closure.same_scope(&other.closure)
    }
}

impl PartialEq for KestrelValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(left), Self::Literal(right)) => left == right,
            (Self::Function(left), Self::Function(right)) => Rc::ptr_eq(left, right) || left == right,
            _ => false,
        }
    }
}

impl fmt::Display for KestrelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(function) => write!(f, "<fn {}>", function.name()),
            Self::Literal(value) => write!(f, "{value}"),
        }
    }
}

impl From<LiteralValue> for KestrelValue {
    fn from(value: LiteralValue) -> KestrelValue {
        KestrelValue::Literal(value)
    }
}

impl KestrelValue {
    pub const NIL: KestrelValue = KestrelValue::Literal(LiteralValue::Nil);

    pub fn is_truthy(&self) -> bool {
        match self {
            KestrelValue::Literal(LiteralValue::Nil) => false,
            KestrelValue::Literal(LiteralValue::Boolean(value)) => *value,
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            KestrelValue::Literal(LiteralValue::Number(value)) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Scope {
    values: FxHashMap<String, KestrelValue>,
    enclosing: Option<Environment>,
}

/// Shared handle to one scope in the chain. Cloning the handle never copies
/// the bindings, so closures and blocks observe each other's writes.
#[derive(Debug, Clone)]
pub struct Environment {
    scope: Rc<RefCell<Scope>>,
}

impl Environment {
    /// A root scope with no enclosing scope.
    pub fn new_global() -> Environment {
        Environment {
            scope: Rc::new(RefCell::new(Scope::default())),
        }
    }

    pub fn new_enclosed(enclosing: &Environment) -> Environment {
        Environment {
            scope: Rc::new(RefCell::new(Scope {
                values: FxHashMap::default(),
                enclosing: Some(enclosing.clone()),
            })),
        }
    }

    pub fn enclosing(&self) -> Option<Environment> {
        self.scope.borrow().enclosing.clone()
    }

    pub fn same_scope(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.scope, &other.scope)
    }

    /// Bind `name` in this scope, replacing any previous binding here.
    pub fn define(&self, name: &str, value: KestrelValue) {
        self.scope.borrow_mut().values.insert(name.to_string(), value);
    }

    /// Walk `distance` enclosing links. Distance 0 is this scope.
    pub fn ancestor(&self, distance: usize) -> Option<Environment> {
        let mut environment = self.clone();
        for _ in 0..distance {
            environment = environment.enclosing()?;
        }
        Some(environment)
    }

    /// Search this scope and then each enclosing scope for `name`.
    pub fn get(&self, name: &str) -> LookupResult<KestrelValue> {
        let mut environment = Some(self.clone());
        while let Some(current) = environment {
            if let Some(value) = current.get_local(name) {
                return Ok(value);
            }
            environment = current.enclosing();
        }
        Err(undefined(name))
    }

    pub fn get_at(&self, distance: usize, name: &str) -> LookupResult<KestrelValue> {
        self.ancestor(distance)
            .and_then(|environment| environment.get_local(name))
            .ok_or_else(|| undefined(name))
    }

    pub fn assign(&self, name: &str, value: KestrelValue) -> LookupResult<()> {
        let mut environment = Some(self.clone());
        while let Some(current) = environment {
            if current.assign_local(name, &value) {
                return Ok(());
            }
            environment = current.enclosing();
        }
        Err(undefined(name))
    }

    pub fn assign_at(&self, distance: usize, name: &str, value: KestrelValue) -> LookupResult<()> {
        match self.ancestor(distance) {
            Some(environment) if environment.assign_local(name, &value) => Ok(()),
            _ => Err(undefined(name)),
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scope.borrow().values.keys().cloned().collect();
        names.sort();
        names
    }

    fn get_local(&self, name: &str) -> Option<KestrelValue> {
        self.scope.borrow().values.get(name).cloned()
    }

    fn assign_local(&self, name: &str, value: &KestrelValue) -> bool {
        let mut scope = self.scope.borrow_mut();
        match scope.values.get_mut(name) {
            Some(slot) => {
                *slot = value.clone();
                true
            }
            None => false,
        }
    }
}

fn undefined(name: &str) -> UndefinedVariable {
    UndefinedVariable { name: name.to_string() }
}
