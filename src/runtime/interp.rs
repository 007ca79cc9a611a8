//! Tree-walking interpreter for the script frontend
//!
//! Executes a parsed program against a scope chain. All native-object access
//! funnels through the bridge dispatcher; bridge failures surface in script
//! as catchable error values, and uncaught script throws surface to the host
//! as `Error::ScriptError`.
//!
//! Statements propagate a completion value, so the result of a run is the
//! value of the last expression statement executed, including one inside a
//! trailing try/catch.

use crate::ast::*;
use crate::bridge::{BindingTable, Dispatcher, HandleRegistry};
use crate::error::{Error, Result};
use crate::runtime::scope::{Scope, ScopeKind, ScopeRef};
use crate::runtime::value::{NativeFunction, ScriptFunction, Value};
use std::rc::Rc;
use tracing::trace;

/// Hard cap on script call nesting
const MAX_CALL_DEPTH: usize = 256;

/// Control-flow signals that unwind statement evaluation
enum Flow {
    Return(Value),
    Break,
    Continue,
    Raise(Value),
}

type Exec<T> = std::result::Result<T, Flow>;

fn raise_host(err: Error) -> Flow {
    Flow::Raise(Value::from_host_error(&err))
}

fn raise(name: &str, message: String) -> Flow {
    Flow::Raise(Value::error(name, message))
}

/// The interpreter
pub struct Interpreter<'a> {
    registry: &'a mut HandleRegistry,
    bindings: &'a BindingTable,
    call_depth: usize,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter over the host's registry and binding table
    pub fn new(registry: &'a mut HandleRegistry, bindings: &'a BindingTable) -> Self {
        Self {
            registry,
            bindings,
            call_depth: 0,
        }
    }

    fn dispatcher(&mut self) -> Dispatcher<'_> {
        Dispatcher::new(self.registry, self.bindings)
    }

    /// Run a program to completion, returning the completion value of the
    /// last expression statement
    pub fn run_program(&mut self, program: &Program, scope: &ScopeRef) -> Result<Value> {
        let mut completion = Value::Undefined;
        for stmt in &program.body {
            match self.eval_stmt(stmt, scope) {
                Ok(Some(value)) => completion = value,
                Ok(None) => {}
                Err(Flow::Raise(value)) => {
                    return Err(Error::script_error(value.to_display()));
                }
                Err(Flow::Return(_)) => {
                    return Err(Error::script_error("return outside of function"));
                }
                Err(Flow::Break) | Err(Flow::Continue) => {
                    return Err(Error::script_error("break or continue outside of loop"));
                }
            }
        }
        Ok(completion)
    }

    /// Call a callable value from the native side
    pub fn call_value(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        match self.call_callable(callee, args) {
            Ok(value) => Ok(value),
            Err(Flow::Raise(value)) => Err(Error::script_error(value.to_display())),
            Err(_) => Err(Error::script_error("break or continue outside of loop")),
        }
    }

    // ========== Statements ==========

    fn eval_stmt(&mut self, stmt: &Statement, scope: &ScopeRef) -> Exec<Option<Value>> {
        match stmt {
            Statement::Empty(_) => Ok(None),
            Statement::Expression(e) => Ok(Some(self.eval_expr(&e.expression, scope)?)),
            Statement::Block(block) => {
                let inner = Scope::child(scope, ScopeKind::Block);
                self.eval_stmts(&block.body, &inner)
            }
            Statement::VariableDeclaration(decl) => {
                self.eval_variable_declaration(decl, scope)?;
                Ok(None)
            }
            Statement::FunctionDeclaration(func) => {
                let value = Value::Function(Rc::new(ScriptFunction {
                    name: func.name.name.clone(),
                    params: func.params.clone(),
                    body: func.body.clone(),
                    closure: Rc::clone(scope),
                }));
                // Function declarations persist like var bindings
                scope.declare_var(&func.name.name, value);
                Ok(None)
            }
            Statement::If(stmt) => {
                if self.eval_expr(&stmt.condition, scope)?.to_boolean() {
                    self.eval_stmt(&stmt.consequent, scope)
                } else if let Some(alternate) = &stmt.alternate {
                    self.eval_stmt(alternate, scope)
                } else {
                    Ok(None)
                }
            }
            Statement::While(stmt) => {
                let mut completion = None;
                while self.eval_expr(&stmt.condition, scope)?.to_boolean() {
                    match self.eval_stmt(&stmt.body, scope) {
                        Ok(value) => completion = value.or(completion),
                        Err(Flow::Break) => break,
                        Err(Flow::Continue) => continue,
                        Err(flow) => return Err(flow),
                    }
                }
                Ok(completion)
            }
            Statement::ForIn(stmt) => self.eval_for_in(stmt, scope),
            Statement::ForOf(stmt) => self.eval_for_of(stmt, scope),
            Statement::Break(_) => Err(Flow::Break),
            Statement::Continue(_) => Err(Flow::Continue),
            Statement::Return(stmt) => {
                let value = match &stmt.argument {
                    Some(expr) => self.eval_expr(expr, scope)?,
                    None => Value::Undefined,
                };
                Err(Flow::Return(value))
            }
            Statement::Throw(stmt) => {
                let value = self.eval_expr(&stmt.argument, scope)?;
                Err(Flow::Raise(value))
            }
            Statement::Try(stmt) => self.eval_try(stmt, scope),
        }
    }

    fn eval_stmts(&mut self, stmts: &[Statement], scope: &ScopeRef) -> Exec<Option<Value>> {
        let mut completion = None;
        for stmt in stmts {
            if let Some(value) = self.eval_stmt(stmt, scope)? {
                completion = Some(value);
            }
        }
        Ok(completion)
    }

    fn eval_variable_declaration(
        &mut self,
        decl: &VariableDeclaration,
        scope: &ScopeRef,
    ) -> Exec<()> {
        for declarator in &decl.declarations {
            let value = match &declarator.init {
                Some(init) => self.eval_expr(init, scope)?,
                None => Value::Undefined,
            };
            match decl.kind {
                VariableKind::Var => scope.declare_var(&declarator.id.name, value),
                VariableKind::Let => scope.declare(&declarator.id.name, value, true),
                VariableKind::Const => scope.declare(&declarator.id.name, value, false),
            }
        }
        Ok(())
    }

    fn eval_for_in(&mut self, stmt: &ForInStatement, scope: &ScopeRef) -> Exec<Option<Value>> {
        let object = self.eval_expr(&stmt.object, scope)?;
        let keys: Vec<Value> = match &object {
            Value::Map(map) => map
                .borrow()
                .keys()
                .cloned()
                .map(Value::String)
                .collect(),
            Value::Array(items) => (0..items.borrow().len())
                .map(|i| Value::String(i.to_string()))
                .collect(),
            other => {
                return Err(raise(
                    "TypeError",
                    format!("cannot enumerate keys of {}", other.type_of()),
                ))
            }
        };

        let mut completion = None;
        for key in keys {
            let iteration = Scope::child(scope, ScopeKind::Block);
            self.bind_loop_value(&stmt.binding, key, &iteration, scope)?;
            match self.eval_stmt(&stmt.body, &iteration) {
                Ok(value) => completion = value.or(completion),
                Err(Flow::Break) => break,
                Err(Flow::Continue) => continue,
                Err(flow) => return Err(flow),
            }
        }
        Ok(completion)
    }

    fn eval_for_of(&mut self, stmt: &ForOfStatement, scope: &ScopeRef) -> Exec<Option<Value>> {
        let iterable = self.eval_expr(&stmt.iterable, scope)?;
        let items: Vec<Value> = match &iterable {
            Value::Array(items) => items.borrow().clone(),
            other => {
                return Err(raise(
                    "TypeError",
                    format!("{} is not iterable", other.type_of()),
                ))
            }
        };

        let mut completion = None;
        for item in items {
            let iteration = Scope::child(scope, ScopeKind::Block);
            self.bind_loop_value(&stmt.binding, item, &iteration, scope)?;
            match self.eval_stmt(&stmt.body, &iteration) {
                Ok(value) => completion = value.or(completion),
                Err(Flow::Break) => break,
                Err(Flow::Continue) => continue,
                Err(flow) => return Err(flow),
            }
        }
        Ok(completion)
    }

    fn bind_loop_value(
        &mut self,
        binding: &ForBinding,
        value: Value,
        iteration: &ScopeRef,
        enclosing: &ScopeRef,
    ) -> Exec<()> {
        match (&binding.pattern, &binding.kind) {
            (Pattern::Identifier(id), Some(kind)) => {
                let mutable = *kind != VariableKind::Const;
                iteration.declare(&id.name, value, mutable);
            }
            (Pattern::Identifier(id), None) => {
                // No declaration: assign into the enclosing chain
                if !enclosing.assign(&id.name, value) {
                    return Err(raise(
                        "TypeError",
                        format!("assignment to constant variable '{}'", id.name),
                    ));
                }
            }
            (Pattern::Array(ids), kind) => {
                let elements: Vec<Value> = match &value {
                    Value::Array(items) => items.borrow().clone(),
                    other => {
                        return Err(raise(
                            "TypeError",
                            format!("cannot destructure {}", other.type_of()),
                        ))
                    }
                };
                let mutable = !matches!(kind, Some(VariableKind::Const));
                for (i, id) in ids.iter().enumerate() {
                    let element = elements.get(i).cloned().unwrap_or(Value::Undefined);
                    iteration.declare(&id.name, element, mutable);
                }
            }
            (Pattern::Rest(id), _) => {
                return Err(raise(
                    "TypeError",
                    format!("rest pattern '{}' is not a loop binding", id.name),
                ))
            }
        }
        Ok(())
    }

    fn eval_try(&mut self, stmt: &TryStatement, scope: &ScopeRef) -> Exec<Option<Value>> {
        let block_scope = Scope::child(scope, ScopeKind::Block);
        let result = self.eval_stmts(&stmt.block.body, &block_scope);

        let result = match result {
            Err(Flow::Raise(thrown)) => {
                if let Some(handler) = &stmt.handler {
                    trace!("caught script-level throw");
                    let catch_scope = Scope::child(scope, ScopeKind::Block);
                    if let Some(param) = &handler.param {
                        catch_scope.declare(&param.name, thrown, true);
                    }
                    self.eval_stmts(&handler.body.body, &catch_scope)
                } else {
                    Err(Flow::Raise(thrown))
                }
            }
            other => other,
        };

        if let Some(finalizer) = &stmt.finalizer {
            let finally_scope = Scope::child(scope, ScopeKind::Block);
            // A flow out of finally wins over the try/catch outcome
            self.eval_stmts(&finalizer.body, &finally_scope)?;
        }

        result
    }

    // ========== Expressions ==========

    fn eval_expr(&mut self, expr: &Expression, scope: &ScopeRef) -> Exec<Value> {
        match expr {
            Expression::Literal(literal) => Ok(match &literal.value {
                LiteralValue::Null => Value::Null,
                LiteralValue::Undefined => Value::Undefined,
                LiteralValue::Boolean(b) => Value::Boolean(*b),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::String(s) => Value::String(s.clone()),
            }),
            Expression::Identifier(id) => self.lookup_identifier(&id.name, scope),
            Expression::TemplateLiteral(template) => {
                let mut result = String::new();
                for (i, quasi) in template.quasis.iter().enumerate() {
                    result.push_str(quasi);
                    if let Some(expr) = template.expressions.get(i) {
                        let value = self.eval_expr(expr, scope)?;
                        result.push_str(&value.to_display());
                    }
                }
                Ok(Value::String(result))
            }
            Expression::Array(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    elements.push(self.eval_expr(element, scope)?);
                }
                Ok(Value::new_array(elements))
            }
            Expression::Object(object) => {
                let mut map = rustc_hash::FxHashMap::default();
                for (key, value) in &object.properties {
                    map.insert(key.clone(), self.eval_expr(value, scope)?);
                }
                Ok(Value::new_map(map))
            }
            Expression::Member(member) => {
                let object = self.eval_expr(&member.object, scope)?;
                self.get_member(&object, &member.member, scope)
            }
            Expression::Call(call) => self.eval_call(call, scope),
            Expression::New(new) => {
                let mut args = Vec::with_capacity(new.arguments.len());
                for arg in &new.arguments {
                    args.push(self.eval_expr(arg, scope)?);
                }
                self.dispatcher()
                    .construct(&new.callee.name, &args)
                    .map_err(raise_host)
            }
            Expression::Unary(unary) => {
                let operand = self.eval_expr(&unary.operand, scope)?;
                Ok(match unary.operator {
                    UnaryOperator::Not => Value::Boolean(!operand.to_boolean()),
                    UnaryOperator::Negate => Value::Number(-operand.to_number()),
                    UnaryOperator::Plus => Value::Number(operand.to_number()),
                })
            }
            Expression::Binary(binary) => {
                let left = self.eval_expr(&binary.left, scope)?;
                let right = self.eval_expr(&binary.right, scope)?;
                self.eval_binary(binary.operator, left, right)
            }
            Expression::Logical(logical) => {
                let left = self.eval_expr(&logical.left, scope)?;
                match logical.operator {
                    LogicalOperator::And => {
                        if left.to_boolean() {
                            self.eval_expr(&logical.right, scope)
                        } else {
                            Ok(left)
                        }
                    }
                    LogicalOperator::Or => {
                        if left.to_boolean() {
                            Ok(left)
                        } else {
                            self.eval_expr(&logical.right, scope)
                        }
                    }
                }
            }
            Expression::Assignment(assignment) => self.eval_assignment(assignment, scope),
            Expression::Conditional(conditional) => {
                if self.eval_expr(&conditional.condition, scope)?.to_boolean() {
                    self.eval_expr(&conditional.consequent, scope)
                } else {
                    self.eval_expr(&conditional.alternate, scope)
                }
            }
        }
    }

    fn lookup_identifier(&mut self, name: &str, scope: &ScopeRef) -> Exec<Value> {
        if let Some(value) = scope.lookup(name) {
            return Ok(value);
        }
        // Injected free functions are visible as globals
        if let Some(func) = self.bindings.function(name) {
            return Ok(Value::NativeFunction(Rc::new(NativeFunction {
                name: name.to_string(),
                func: func.clone(),
            })));
        }
        Err(raise(
            "ReferenceError",
            format!("'{}' is not defined", name),
        ))
    }

    fn member_name(&mut self, key: &MemberKey, scope: &ScopeRef) -> Exec<String> {
        match key {
            MemberKey::Named(name) => Ok(name.clone()),
            MemberKey::Computed(expr) => Ok(self.eval_expr(expr, scope)?.to_display()),
        }
    }

    fn get_member(&mut self, object: &Value, key: &MemberKey, scope: &ScopeRef) -> Exec<Value> {
        match object {
            Value::Native(handle) => {
                let name = self.member_name(key, scope)?;
                self.dispatcher()
                    .get_property(handle, &name)
                    .map_err(raise_host)
            }
            Value::Map(map) => {
                let name = self.member_name(key, scope)?;
                Ok(map.borrow().get(&name).cloned().unwrap_or(Value::Undefined))
            }
            Value::Array(items) => match key {
                MemberKey::Named(name) if name == "length" => {
                    Ok(Value::Number(items.borrow().len() as f64))
                }
                MemberKey::Named(name) => Err(raise(
                    "TypeError",
                    format!("arrays have no property '{}'", name),
                )),
                MemberKey::Computed(expr) => {
                    let index = self.eval_expr(expr, scope)?.to_number();
                    if index.is_nan() || index < 0.0 {
                        return Ok(Value::Undefined);
                    }
                    Ok(items
                        .borrow()
                        .get(index as usize)
                        .cloned()
                        .unwrap_or(Value::Undefined))
                }
            },
            Value::String(s) => {
                let name = self.member_name(key, scope)?;
                if name == "length" {
                    Ok(Value::Number(s.chars().count() as f64))
                } else {
                    Err(raise(
                        "TypeError",
                        format!("strings have no property '{}'", name),
                    ))
                }
            }
            Value::Error(e) => {
                let name = self.member_name(key, scope)?;
                match name.as_str() {
                    "name" => Ok(Value::String(e.name.clone())),
                    "message" => Ok(Value::String(e.message.clone())),
                    other => Err(raise(
                        "TypeError",
                        format!("errors have no property '{}'", other),
                    )),
                }
            }
            other => Err(raise(
                "TypeError",
                format!("cannot read properties of {}", other.type_of()),
            )),
        }
    }

    fn eval_call(&mut self, call: &CallExpression, scope: &ScopeRef) -> Exec<Value> {
        // Method-style call: evaluate the receiver once, then route by kind
        if let Expression::Member(member) = &call.callee {
            let object = self.eval_expr(&member.object, scope)?;
            let name = self.member_name(&member.member, scope)?;

            let mut args = Vec::with_capacity(call.arguments.len());
            for arg in &call.arguments {
                args.push(self.eval_expr(arg, scope)?);
            }

            return match &object {
                Value::Native(handle) => self
                    .dispatcher()
                    .invoke(handle, &name, &args)
                    .map_err(raise_host),
                Value::Array(_) => self.call_array_builtin(&object, &name, &args),
                Value::Map(map) => {
                    // A callable stored in a mapping entry
                    let callee = map.borrow().get(&name).cloned();
                    match callee {
                        Some(callee) => self.call_callable(&callee, &args),
                        None => Err(raise(
                            "TypeError",
                            format!("'{}' is not a function", name),
                        )),
                    }
                }
                other => Err(raise(
                    "TypeError",
                    format!("{} has no method '{}'", other.type_of(), name),
                )),
            };
        }

        let callee = self.eval_expr(&call.callee, scope)?;
        let mut args = Vec::with_capacity(call.arguments.len());
        for arg in &call.arguments {
            args.push(self.eval_expr(arg, scope)?);
        }
        self.call_callable(&callee, &args)
    }

    fn call_array_builtin(&mut self, object: &Value, name: &str, args: &[Value]) -> Exec<Value> {
        let items = match object {
            Value::Array(items) => items,
            _ => unreachable!("caller checked the receiver is an array"),
        };
        match name {
            "join" => {
                let separator = match args.first() {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_display(),
                    None => ",".to_string(),
                };
                let joined: Vec<String> =
                    items.borrow().iter().map(|v| v.to_display()).collect();
                Ok(Value::String(joined.join(&separator)))
            }
            "entries" => {
                let pairs: Vec<Value> = items
                    .borrow()
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(i, v)| Value::new_array(vec![Value::Number(i as f64), v]))
                    .collect();
                Ok(Value::new_array(pairs))
            }
            "push" => {
                let mut items = items.borrow_mut();
                for arg in args {
                    items.push(arg.clone());
                }
                Ok(Value::Number(items.len() as f64))
            }
            other => Err(raise(
                "TypeError",
                format!("arrays have no method '{}'", other),
            )),
        }
    }

    fn call_callable(&mut self, callee: &Value, args: &[Value]) -> Exec<Value> {
        match callee {
            Value::Function(func) => self.call_script_function(func, args),
            Value::NativeFunction(func) => {
                trace!(name = %func.name, "calling injected function from script");
                (func.func)(args).map_err(raise_host)
            }
            other => Err(raise(
                "TypeError",
                format!("{} is not a function", other.type_of()),
            )),
        }
    }

    fn call_script_function(&mut self, func: &ScriptFunction, args: &[Value]) -> Exec<Value> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(raise(
                "RangeError",
                "maximum call depth exceeded".to_string(),
            ));
        }

        let call_scope = Scope::child(&func.closure, ScopeKind::Function);
        let mut index = 0;
        for param in &func.params {
            match param {
                Pattern::Identifier(id) => {
                    let value = args.get(index).cloned().unwrap_or(Value::Undefined);
                    call_scope.declare(&id.name, value, true);
                    index += 1;
                }
                Pattern::Rest(id) => {
                    let rest: Vec<Value> = args.get(index..).unwrap_or(&[]).to_vec();
                    call_scope.declare(&id.name, Value::new_array(rest), true);
                    index = args.len();
                }
                Pattern::Array(_) => {
                    return Err(raise(
                        "TypeError",
                        "destructuring parameters are not supported".to_string(),
                    ))
                }
            }
        }

        self.call_depth += 1;
        let result = self.eval_stmts(&func.body, &call_scope);
        self.call_depth -= 1;

        match result {
            Ok(_) => Ok(Value::Undefined),
            Err(Flow::Return(value)) => Ok(value),
            Err(flow) => Err(flow),
        }
    }

    fn eval_binary(&mut self, operator: BinaryOperator, left: Value, right: Value) -> Exec<Value> {
        use BinaryOperator::*;
        Ok(match operator {
            Add => match (&left, &right) {
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Value::String(format!("{}{}", left.to_display(), right.to_display()))
                }
                _ => Value::Number(left.to_number() + right.to_number()),
            },
            Subtract => Value::Number(left.to_number() - right.to_number()),
            Multiply => Value::Number(left.to_number() * right.to_number()),
            Divide => Value::Number(left.to_number() / right.to_number()),
            Remainder => Value::Number(left.to_number() % right.to_number()),
            Equals => Value::Boolean(left.equals(&right)),
            NotEquals => Value::Boolean(!left.equals(&right)),
            StrictEquals => Value::Boolean(left.strict_equals(&right)),
            StrictNotEquals => Value::Boolean(!left.strict_equals(&right)),
            // Identity: same registry slot for handles, strict equality otherwise
            Is => Value::Boolean(left.strict_equals(&right)),
            Less | Greater | LessEquals | GreaterEquals => {
                let result = match (&left, &right) {
                    (Value::String(a), Value::String(b)) => match operator {
                        Less => a < b,
                        Greater => a > b,
                        LessEquals => a <= b,
                        _ => a >= b,
                    },
                    _ => {
                        let (a, b) = (left.to_number(), right.to_number());
                        match operator {
                            Less => a < b,
                            Greater => a > b,
                            LessEquals => a <= b,
                            _ => a >= b,
                        }
                    }
                };
                Value::Boolean(result)
            }
        })
    }

    fn eval_assignment(
        &mut self,
        assignment: &AssignmentExpression,
        scope: &ScopeRef,
    ) -> Exec<Value> {
        match &assignment.target {
            Expression::Identifier(id) => {
                let value = match assignment.operator {
                    AssignmentOperator::Assign => self.eval_expr(&assignment.value, scope)?,
                    AssignmentOperator::AddAssign => {
                        let old = self.lookup_identifier(&id.name, scope)?;
                        let rhs = self.eval_expr(&assignment.value, scope)?;
                        self.eval_binary(BinaryOperator::Add, old, rhs)?
                    }
                    AssignmentOperator::SubtractAssign => {
                        let old = self.lookup_identifier(&id.name, scope)?;
                        let rhs = self.eval_expr(&assignment.value, scope)?;
                        self.eval_binary(BinaryOperator::Subtract, old, rhs)?
                    }
                };
                if !scope.assign(&id.name, value.clone()) {
                    return Err(raise(
                        "TypeError",
                        format!("assignment to constant variable '{}'", id.name),
                    ));
                }
                Ok(value)
            }
            Expression::Member(member) => {
                let object = self.eval_expr(&member.object, scope)?;
                let name = self.member_name(&member.member, scope)?;

                let value = match assignment.operator {
                    AssignmentOperator::Assign => self.eval_expr(&assignment.value, scope)?,
                    AssignmentOperator::AddAssign => {
                        let old = self.get_member(&object, &member.member, scope)?;
                        let rhs = self.eval_expr(&assignment.value, scope)?;
                        self.eval_binary(BinaryOperator::Add, old, rhs)?
                    }
                    AssignmentOperator::SubtractAssign => {
                        let old = self.get_member(&object, &member.member, scope)?;
                        let rhs = self.eval_expr(&assignment.value, scope)?;
                        self.eval_binary(BinaryOperator::Subtract, old, rhs)?
                    }
                };

                match &object {
                    Value::Native(handle) => {
                        self.dispatcher()
                            .set_property(handle, &name, &value)
                            .map_err(raise_host)?;
                    }
                    Value::Map(map) => {
                        map.borrow_mut().insert(name, value.clone());
                    }
                    Value::Array(items) => {
                        let index = name.parse::<usize>().map_err(|_| {
                            raise(
                                "TypeError",
                                format!("invalid array index '{}'", name),
                            )
                        })?;
                        let mut items = items.borrow_mut();
                        if index >= items.len() {
                            items.resize(index + 1, Value::Undefined);
                        }
                        items[index] = value.clone();
                    }
                    other => {
                        return Err(raise(
                            "TypeError",
                            format!("cannot set properties of {}", other.type_of()),
                        ))
                    }
                }
                Ok(value)
            }
            _ => Err(raise(
                "TypeError",
                "invalid assignment target".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(source: &str) -> Result<Value> {
        let mut registry = HandleRegistry::new();
        let bindings = BindingTable::new();
        let globals = Scope::global();
        let run_scope = Scope::child(&globals, ScopeKind::Block);
        let program = parse(source)?;
        Interpreter::new(&mut registry, &bindings).run_program(&program, &run_scope)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run("1 + 2 * 3").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(
            run("'hello' + ' ' + 'world'").unwrap(),
            Value::String("hello world".to_string())
        );
    }

    #[test]
    fn test_template_interpolation() {
        assert_eq!(
            run("let x = 23; `add = ${x}`").unwrap(),
            Value::String("add = 23".to_string())
        );
    }

    #[test]
    fn test_function_call() {
        assert_eq!(
            run("function add(a, b) { return a + b; } add(3, 4)").unwrap(),
            Value::Number(7.0)
        );
    }

    #[test]
    fn test_rest_params_and_join() {
        assert_eq!(
            run("function concat(...args) { return args.join(''); } concat(1, 2, true, 'x')")
                .unwrap(),
            Value::String("12truex".to_string())
        );
    }

    #[test]
    fn test_try_catch_completion_value() {
        // The completion of the try statement is the run result
        assert_eq!(
            run("try { 'ok'; } catch (e) { 'caught'; }").unwrap(),
            Value::String("ok".to_string())
        );
        assert_eq!(
            run("try { throw 'x'; } catch (e) { 'caught'; }").unwrap(),
            Value::String("caught".to_string())
        );
    }

    #[test]
    fn test_uncaught_throw_is_script_error() {
        let err = run("throw 'boom';").unwrap_err();
        assert!(matches!(err, Error::ScriptError { .. }));
        assert_eq!(err.to_string(), "ScriptError: boom");
    }

    #[test]
    fn test_caught_error_exposes_name_and_message() {
        assert_eq!(
            run("try { missing_name; } catch (e) { e.name }").unwrap(),
            Value::String("ReferenceError".to_string())
        );
    }

    #[test]
    fn test_finally_runs() {
        assert_eq!(
            run("let log = ''; try { log += 't'; } finally { log += 'f'; } log").unwrap(),
            Value::String("tf".to_string())
        );
    }

    #[test]
    fn test_for_of_entries_destructuring() {
        let source = "
            let out = '';
            for (const [k, v] of [10, 20].entries()) {
                out += k + ':' + v + ';';
            }
            out
        ";
        assert_eq!(run(source).unwrap(), Value::String("0:10;1:20;".to_string()));
    }

    #[test]
    fn test_for_in_over_map() {
        let source = "
            let count = 0;
            let m = { a: 1, b: 2, c: 3 };
            for (const k in m) { count += m[k]; }
            count
        ";
        assert_eq!(run(source).unwrap(), Value::Number(6.0));
    }

    #[test]
    fn test_while_with_break() {
        let source = "
            let i = 0;
            while (true) {
                i += 1;
                if (i >= 5) { break; }
            }
            i
        ";
        assert_eq!(run(source).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_const_reassignment_throws() {
        let err = run("const x = 1; x = 2;").unwrap_err();
        assert!(err.to_string().contains("constant"));
    }

    #[test]
    fn test_recursion_depth_guard() {
        let err = run("function f() { return f(); } f()").unwrap_err();
        assert!(err.to_string().contains("maximum call depth"));
    }

    #[test]
    fn test_is_operator_on_aggregates() {
        assert_eq!(run("let a = [1]; let b = a; a is b").unwrap(), Value::Boolean(true));
        assert_eq!(run("[1] is [1]").unwrap(), Value::Boolean(false));
    }
}
