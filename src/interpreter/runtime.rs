use std::collections::HashMap;

use log::{trace, warn};

use crate::ast::{
    AssignTarget, Assignment, BinaryOperator, Block, Expr, ExprKind, FunctionDef, Stmt,
    UnaryOperator,
};
use crate::scope::{ScopeId, ScopeTree};

use super::error::{RuntimeError, RuntimeResult};
use super::value::{ArrayRef, Value};

/// Control-flow marker for statement execution.
pub(super) enum ExecResult {
    Continue,
    Return(Value),
}

/// Evaluator state for a single run.
pub(super) struct Runtime<'p> {
    pub(super) functions: HashMap<&'p str, &'p FunctionDef>,
    pub(super) scopes: ScopeTree<Value>,
    pub(super) output: String,
    pub(super) call_depth: usize,
    pub(super) max_call_depth: usize,
    pub(super) eval_depth: usize,
    pub(super) max_eval_depth: usize,
    pub(super) max_output_bytes: Option<usize>,
}

impl<'p> Runtime<'p> {
    fn within_scope<T>(
        &mut self,
        parent: ScopeId,
        run: impl FnOnce(&mut Self) -> RuntimeResult<T>,
    ) -> RuntimeResult<T> {
        let previous = self.scopes.enter(parent);
        let result = run(self);
        self.scopes.exit(previous);
        result
    }

    /// Charges one level of evaluation depth while `run` executes. Every
    /// recursive path through the evaluator passes through here.
    fn descend<T>(
        &mut self,
        line: usize,
        run: impl FnOnce(&mut Self) -> RuntimeResult<T>,
    ) -> RuntimeResult<T> {
        if self.eval_depth >= self.max_eval_depth {
            warn!(
                "evaluation depth limit of {} reached at line {line}",
                self.max_eval_depth
            );
            return Err(RuntimeError::EvaluationTooDeep {
                limit: self.max_eval_depth,
                line,
            });
        }
        self.eval_depth += 1;
        let result = run(self);
        self.eval_depth -= 1;
        result
    }

    pub(super) fn exec_statements(&mut self, statements: &'p [Stmt]) -> RuntimeResult<ExecResult> {
        for statement in statements {
            if let ExecResult::Return(value) = self.exec_statement(statement)? {
                return Ok(ExecResult::Return(value));
            }
        }
        Ok(ExecResult::Continue)
    }

    fn exec_block(&mut self, block: &'p Block) -> RuntimeResult<ExecResult> {
        self.within_scope(self.scopes.current(), |runtime| {
            runtime.exec_statements(&block.statements)
        })
    }

    fn exec_statement(&mut self, statement: &'p Stmt) -> RuntimeResult<ExecResult> {
        self.descend(statement.line(), |runtime| runtime.execute(statement))
    }

    fn execute(&mut self, statement: &'p Stmt) -> RuntimeResult<ExecResult> {
        match statement {
            Stmt::VarDecl { name, init, .. } => {
                let value = self.eval_expression(init)?;
                self.scopes.define(name.as_str(), value);
            }
            Stmt::Assign(assignment) => self.exec_assignment(assignment)?,
            Stmt::Print { value, line } => {
                let value = self.eval_expression(value)?;
                self.print(&value, *line)?;
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                if self.eval_condition(condition)? {
                    return self.exec_block(then_block);
                }
                if let Some(else_block) = else_block {
                    return self.exec_block(else_block);
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                while self.eval_condition(condition)? {
                    if let ExecResult::Return(value) = self.exec_block(body)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                return self.within_scope(self.scopes.current(), |runtime| {
                    runtime.exec_statement(init)?;
                    while runtime.eval_condition(condition)? {
                        if let ExecResult::Return(value) = runtime.exec_block(body)? {
                            return Ok(ExecResult::Return(value));
                        }
                        runtime.exec_assignment(update)?;
                    }
                    Ok(ExecResult::Continue)
                });
            }
            // Definitions are collected before the run starts.
            Stmt::FuncDef(_) => {}
            Stmt::Return { value, .. } => {
                let value = self.eval_expression(value)?;
                return Ok(ExecResult::Return(value));
            }
            Stmt::Expr(expr) => match &expr.kind {
                ExprKind::Call { name, args } => {
                    self.eval_call(name, args, expr.line)?;
                }
                _ => {
                    self.eval_expression(expr)?;
                }
            },
        }
        Ok(ExecResult::Continue)
    }

    fn exec_assignment(&mut self, assignment: &'p Assignment) -> RuntimeResult<()> {
        match &assignment.target {
            AssignTarget::Variable(name) => {
                let value = self.eval_expression(&assignment.value)?;
                let slot = self
                    .scopes
                    .resolve_mut(name)
                    .ok_or_else(|| unresolved_variable(name))?;
                *slot = value;
            }
            AssignTarget::Index { name, index } => {
                let elements = self.array(name)?;
                let index = self.eval_index(index)?;
                let value = self.eval_expression(&assignment.value)?;
                let mut elements = elements.borrow_mut();
                let position = checked_index(index, elements.len(), assignment.line)?;
                elements[position] = value;
            }
        }
        Ok(())
    }

    fn print(&mut self, value: &Value, line: usize) -> RuntimeResult<()> {
        let rendered = value.to_string();
        if let Some(limit) = self.max_output_bytes {
            if self.output.len() + rendered.len() + 1 > limit {
                warn!("output limit of {limit} bytes reached at line {line}");
                return Err(RuntimeError::OutputLimit { limit, line });
            }
        }
        self.output.push_str(&rendered);
        self.output.push('\n');
        Ok(())
    }

    fn eval_condition(&mut self, condition: &'p Expr) -> RuntimeResult<bool> {
        match self.eval_expression(condition)? {
            Value::Bool(value) => Ok(value),
            other => Err(RuntimeError::internal(format!(
                "condition evaluated to {} at line {}",
                other.type_name(),
                condition.line
            ))),
        }
    }

    fn eval_index(&mut self, index: &'p Expr) -> RuntimeResult<i64> {
        match self.eval_expression(index)? {
            Value::Int(value) => Ok(value),
            other => Err(RuntimeError::internal(format!(
                "array index evaluated to {} at line {}",
                other.type_name(),
                index.line
            ))),
        }
    }

    fn array(&self, name: &str) -> RuntimeResult<ArrayRef> {
        match self.scopes.resolve(name) {
            Some(Value::Array(elements)) => Ok(elements.clone()),
            Some(other) => Err(RuntimeError::internal(format!(
                "'{name}' holds {} where an array was expected",
                other.type_name()
            ))),
            None => Err(unresolved_variable(name)),
        }
    }

    fn eval_expression(&mut self, expr: &'p Expr) -> RuntimeResult<Value> {
        self.descend(expr.line, |runtime| runtime.evaluate(expr))
    }

    fn evaluate(&mut self, expr: &'p Expr) -> RuntimeResult<Value> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Float(value) => Ok(Value::Float(*value)),
            ExprKind::Str(value) => Ok(Value::Str(value.clone())),
            ExprKind::Char(value) => Ok(Value::Char(*value)),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::Var(name) => self
                .scopes
                .resolve(name)
                .cloned()
                .ok_or_else(|| unresolved_variable(name)),
            ExprKind::Binary { op, left, right } => {
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                binary(*op, left, right, line)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.eval_expression(operand)?;
                unary(*op, operand, line)
            }
            ExprKind::Call { name, args } => {
                self.eval_call(name, args, line)?
                    .ok_or_else(|| RuntimeError::MissingReturnValue {
                        name: name.clone(),
                        line,
                    })
            }
            ExprKind::ArrayLiteral(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expression(element)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::ArrayAccess { name, index } => {
                let elements = self.array(name)?;
                let index = self.eval_index(index)?;
                let elements = elements.borrow();
                let position = checked_index(index, elements.len(), line)?;
                Ok(elements[position].clone())
            }
        }
    }

    /// Runs a call. Arguments are evaluated in the caller's environment; the
    /// callee's frame hangs off the global frame. `None` means the body ran
    /// off its end without a `return`.
    fn eval_call(&mut self, name: &str, args: &'p [Expr], line: usize) -> RuntimeResult<Option<Value>> {
        let function = *self
            .functions
            .get(name)
            .ok_or_else(|| RuntimeError::internal(format!("function '{name}' is not defined")))?;
        if function.params.len() != args.len() {
            return Err(RuntimeError::internal(format!(
                "function '{name}' called with {} arguments at line {line}",
                args.len()
            )));
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expression(arg)?);
        }

        if self.call_depth >= self.max_call_depth {
            warn!(
                "call depth limit of {} reached calling '{name}' at line {line}",
                self.max_call_depth
            );
            return Err(RuntimeError::RecursionLimit {
                limit: self.max_call_depth,
                line,
            });
        }
        trace!("call {name} at line {line}, depth {}", self.call_depth + 1);

        self.call_depth += 1;
        let result = self.within_scope(self.scopes.global(), |runtime| {
            for (param, value) in function.params.iter().zip(values) {
                runtime.scopes.define(param.name.as_str(), value);
            }
            runtime.exec_block(&function.body)
        });
        self.call_depth -= 1;

        match result? {
            ExecResult::Return(value) => Ok(Some(value)),
            ExecResult::Continue => Ok(None),
        }
    }
}

fn unresolved_variable(name: &str) -> RuntimeError {
    RuntimeError::internal(format!("variable '{name}' is not defined"))
}

fn checked_index(index: i64, len: usize, line: usize) -> RuntimeResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|position| *position < len)
        .ok_or(RuntimeError::IndexOutOfBounds { index, len, line })
}

fn binary(op: BinaryOperator, left: Value, right: Value, line: usize) -> RuntimeResult<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => int_binary(op, *a, *b, line),
        (Value::Int(a), Value::Float(b)) => float_binary(op, *a as f64, *b, line),
        (Value::Float(a), Value::Int(b)) => float_binary(op, *a, *b as f64, line),
        (Value::Float(a), Value::Float(b)) => float_binary(op, *a, *b, line),
        _ => match op {
            BinaryOperator::Equal => Ok(Value::Bool(left == right)),
            BinaryOperator::NotEqual => Ok(Value::Bool(left != right)),
            _ => Err(RuntimeError::internal(format!(
                "unsupported operands for '{op}': {} and {} at line {line}",
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

fn int_binary(op: BinaryOperator, a: i64, b: i64, line: usize) -> RuntimeResult<Value> {
    let overflow = RuntimeError::Overflow { line };
    let value = match op {
        BinaryOperator::Add => Value::Int(a.checked_add(b).ok_or(overflow)?),
        BinaryOperator::Sub => Value::Int(a.checked_sub(b).ok_or(overflow)?),
        BinaryOperator::Mul => Value::Int(a.checked_mul(b).ok_or(overflow)?),
        BinaryOperator::Div => {
            if b == 0 {
                return Err(RuntimeError::DivisionByZero { line });
            }
            // Truncates toward zero; only `i64::MIN / -1` can overflow.
            Value::Int(a.checked_div(b).ok_or(overflow)?)
        }
        BinaryOperator::Equal => Value::Bool(a == b),
        BinaryOperator::NotEqual => Value::Bool(a != b),
        BinaryOperator::Less => Value::Bool(a < b),
        BinaryOperator::Greater => Value::Bool(a > b),
        BinaryOperator::LessEqual => Value::Bool(a <= b),
        BinaryOperator::GreaterEqual => Value::Bool(a >= b),
    };
    Ok(value)
}

fn float_binary(op: BinaryOperator, a: f64, b: f64, line: usize) -> RuntimeResult<Value> {
    let value = match op {
        BinaryOperator::Add => Value::Float(a + b),
        BinaryOperator::Sub => Value::Float(a - b),
        BinaryOperator::Mul => Value::Float(a * b),
        BinaryOperator::Div => {
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero { line });
            }
            Value::Float(a / b)
        }
        BinaryOperator::Equal => Value::Bool(a == b),
        BinaryOperator::NotEqual => Value::Bool(a != b),
        BinaryOperator::Less => Value::Bool(a < b),
        BinaryOperator::Greater => Value::Bool(a > b),
        BinaryOperator::LessEqual => Value::Bool(a <= b),
        BinaryOperator::GreaterEqual => Value::Bool(a >= b),
    };
    Ok(value)
}

fn unary(op: UnaryOperator, operand: Value, line: usize) -> RuntimeResult<Value> {
    match (op, operand) {
        (UnaryOperator::Not, Value::Bool(value)) => Ok(Value::Bool(!value)),
        (UnaryOperator::Negate, Value::Int(value)) => value
            .checked_neg()
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow { line }),
        (UnaryOperator::Negate, Value::Float(value)) => Ok(Value::Float(-value)),
        (op, operand) => Err(RuntimeError::internal(format!(
            "unsupported operand for '{op}': {} at line {line}",
            operand.type_name()
        ))),
    }
}
