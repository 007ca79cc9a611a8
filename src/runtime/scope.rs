//! Lexical scopes for the script frontend
//!
//! Scopes form a parent chain. The host owns one `Global` scope that outlives
//! individual runs; each run pushes a `Block` scope over it for `let`/`const`
//! declarations, and each call pushes a `Function` scope. `var` declarations
//! and assignments to undeclared names land in the nearest `Function` scope
//! or, at the top level, the persistent `Global` scope.

use crate::runtime::value::Value;
use rustc_hash::FxHashMap as HashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared reference to a scope
pub type ScopeRef = Rc<Scope>;

/// What kind of binding region a scope is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The host's persistent namespace
    Global,
    /// A function call body
    Function,
    /// A block or per-run scope
    Block,
}

/// A single binding
#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    /// false for `const` declarations
    mutable: bool,
}

/// A lexical scope
pub struct Scope {
    kind: ScopeKind,
    vars: RefCell<HashMap<String, Binding>>,
    parent: Option<ScopeRef>,
}

impl Scope {
    /// Create the host's persistent global scope
    pub fn global() -> ScopeRef {
        Rc::new(Scope {
            kind: ScopeKind::Global,
            vars: RefCell::new(HashMap::default()),
            parent: None,
        })
    }

    /// Create a child scope
    pub fn child(parent: &ScopeRef, kind: ScopeKind) -> ScopeRef {
        Rc::new(Scope {
            kind,
            vars: RefCell::new(HashMap::default()),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// The scope kind
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Look up a name through the scope chain
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.vars.borrow().get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Check whether a name is bound anywhere in the chain
    pub fn is_bound(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.is_bound(name))
    }

    /// Declare a name in this scope (`let`/`const`, parameters, catch bindings)
    pub fn declare(&self, name: &str, value: Value, mutable: bool) {
        self.vars
            .borrow_mut()
            .insert(name.to_string(), Binding { value, mutable });
    }

    /// Declare a `var` name: walks to the nearest Function or Global scope
    pub fn declare_var(self: &Rc<Self>, name: &str, value: Value) {
        let mut scope = Rc::clone(self);
        loop {
            if scope.kind != ScopeKind::Block {
                scope.declare(name, value, true);
                return;
            }
            let parent = match &scope.parent {
                Some(p) => Rc::clone(p),
                None => {
                    scope.declare(name, value, true);
                    return;
                }
            };
            scope = parent;
        }
    }

    /// Assign to an existing binding, walking the chain. Returns false when
    /// the binding is a `const`; returns true on success. If the name is
    /// unbound anywhere, it is created in the outermost (global) scope,
    /// reproducing the undeclared-assignment persistence rule.
    pub fn assign(self: &Rc<Self>, name: &str, value: Value) -> bool {
        let mut scope = Rc::clone(self);
        loop {
            {
                let mut vars = scope.vars.borrow_mut();
                if let Some(binding) = vars.get_mut(name) {
                    if !binding.mutable {
                        return false;
                    }
                    binding.value = value;
                    return true;
                }
            }
            let parent = match &scope.parent {
                Some(p) => Rc::clone(p),
                None => {
                    // Unbound: create in the global scope
                    scope.declare(name, value, true);
                    return true;
                }
            };
            scope = parent;
        }
    }

}
