//! Static checker run between parsing and interpretation.
//!
//! One depth-first pass assigns a [`Type`] to every expression and validates
//! every statement. Scopes are opened exactly where the interpreter opens
//! frames, including the global-rooted frame of each function body, so a
//! program accepted here never hits an unresolved name at runtime.

pub mod error;
pub mod types;

use std::collections::HashMap;

use log::debug;

use crate::ast::{
    AssignTarget, Assignment, BinaryOperator, Block, Expr, ExprKind, FunctionDef, Program, Stmt,
    UnaryOperator,
};
use crate::scope::{ScopeId, ScopeTree};

pub use error::{SemanticError, SemanticResult};
pub use types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<Type>,
}

impl From<&FunctionDef> for FunctionSignature {
    fn from(function: &FunctionDef) -> Self {
        Self {
            name: function.name.clone(),
            return_type: function.return_type.into(),
            params: function.params.iter().map(|param| param.ty.into()).collect(),
        }
    }
}

pub struct SemanticAnalyzer {
    scopes: ScopeTree<Type>,
    functions: HashMap<String, FunctionSignature>,
    current_function: Option<FunctionSignature>,
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            scopes: ScopeTree::new(),
            functions: HashMap::new(),
            current_function: None,
        }
    }

    pub fn analyze(mut self, program: &Program) -> SemanticResult<()> {
        for statement in &program.statements {
            self.check_statement(statement)?;
        }
        debug!(
            "analysis passed: {} statements, {} functions",
            program.statements.len(),
            self.functions.len()
        );
        Ok(())
    }

    fn within_scope<T>(
        &mut self,
        parent: ScopeId,
        check: impl FnOnce(&mut Self) -> SemanticResult<T>,
    ) -> SemanticResult<T> {
        let previous = self.scopes.enter(parent);
        let result = check(self);
        self.scopes.exit(previous);
        result
    }

    fn check_block(&mut self, block: &Block) -> SemanticResult<()> {
        self.within_scope(self.scopes.current(), |analyzer| {
            for statement in &block.statements {
                analyzer.check_statement(statement)?;
            }
            Ok(())
        })
    }

    fn check_statement(&mut self, statement: &Stmt) -> SemanticResult<()> {
        match statement {
            Stmt::VarDecl {
                ty,
                name,
                init,
                line,
            } => {
                let found = self.check_expression(init)?;
                let declared = Type::from(*ty);
                if !declared.accepts(&found) {
                    return Err(SemanticError::DeclarationMismatch {
                        name: name.clone(),
                        declared,
                        found,
                        line: *line,
                    });
                }
                if self.scopes.is_declared_locally(name) {
                    return Err(SemanticError::Redeclaration {
                        name: name.clone(),
                        line: *line,
                    });
                }
                self.scopes.define(name.as_str(), declared);
                Ok(())
            }
            Stmt::Assign(assignment) => self.check_assignment(assignment),
            Stmt::Print { value, .. } => self.check_expression(value).map(drop),
            Stmt::If {
                condition,
                then_block,
                else_block,
                line,
            } => {
                self.check_condition("if statement", condition, *line)?;
                self.check_block(then_block)?;
                if let Some(else_block) = else_block {
                    self.check_block(else_block)?;
                }
                Ok(())
            }
            Stmt::While {
                condition,
                body,
                line,
            } => {
                self.check_condition("while loop", condition, *line)?;
                self.check_block(body)
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
                line,
            } => self.within_scope(self.scopes.current(), |analyzer| {
                analyzer.check_statement(init)?;
                analyzer.check_condition("for loop", condition, *line)?;
                analyzer.check_assignment(update)?;
                analyzer.check_block(body)
            }),
            Stmt::FuncDef(function) => self.check_function(function),
            Stmt::Return { value, line } => {
                let found = self.check_expression(value)?;
                let Some(function) = &self.current_function else {
                    return Err(SemanticError::ReturnOutsideFunction { line: *line });
                };
                if found != function.return_type {
                    return Err(SemanticError::ReturnMismatch {
                        function: function.name.clone(),
                        expected: function.return_type.clone(),
                        found,
                        line: *line,
                    });
                }
                Ok(())
            }
            Stmt::Expr(expr) => self.check_expression(expr).map(drop),
        }
    }

    fn check_assignment(&mut self, assignment: &Assignment) -> SemanticResult<()> {
        let target = match &assignment.target {
            AssignTarget::Variable(name) => self.resolve_variable(name, assignment.line)?,
            AssignTarget::Index { name, index } => {
                self.check_array_access(name, index, assignment.line)?
            }
        };
        let found = self.check_expression(&assignment.value)?;
        if target != found {
            return Err(SemanticError::AssignmentMismatch {
                target,
                found,
                line: assignment.line,
            });
        }
        Ok(())
    }

    fn check_condition(
        &mut self,
        construct: &'static str,
        condition: &Expr,
        line: usize,
    ) -> SemanticResult<()> {
        let found = self.check_expression(condition)?;
        if found != Type::Bool {
            return Err(SemanticError::NonBooleanCondition {
                construct,
                found,
                line,
            });
        }
        Ok(())
    }

    fn check_function(&mut self, function: &FunctionDef) -> SemanticResult<()> {
        if self.functions.contains_key(&function.name) {
            return Err(SemanticError::FunctionRedefinition {
                name: function.name.clone(),
                line: function.line,
            });
        }
        // Registered before the body is checked so the body may recurse.
        let signature = FunctionSignature::from(function);
        self.functions
            .insert(function.name.clone(), signature.clone());

        let enclosing = self.current_function.replace(signature);
        let result = self.within_scope(self.scopes.global(), |analyzer| {
            for param in &function.params {
                if analyzer.scopes.is_declared_locally(&param.name) {
                    return Err(SemanticError::Redeclaration {
                        name: param.name.clone(),
                        line: function.line,
                    });
                }
                analyzer
                    .scopes
                    .define(param.name.as_str(), Type::from(param.ty));
            }
            analyzer.check_block(&function.body)
        });
        self.current_function = enclosing;
        result
    }

    fn resolve_variable(&self, name: &str, line: usize) -> SemanticResult<Type> {
        self.scopes
            .resolve(name)
            .cloned()
            .ok_or_else(|| SemanticError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
    }

    fn check_array_access(&mut self, name: &str, index: &Expr, line: usize) -> SemanticResult<Type> {
        let array = self.resolve_variable(name, line)?;
        let Some(element) = array.element().cloned() else {
            return Err(SemanticError::NotAnArray {
                name: name.to_string(),
                line,
            });
        };
        let index_type = self.check_expression(index)?;
        if index_type != Type::Int {
            return Err(SemanticError::NonIntegerIndex {
                found: index_type,
                line,
            });
        }
        Ok(element)
    }

    fn check_expression(&mut self, expr: &Expr) -> SemanticResult<Type> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Int(_) => Ok(Type::Int),
            ExprKind::Float(_) => Ok(Type::Float),
            ExprKind::Str(_) => Ok(Type::String),
            ExprKind::Char(_) => Ok(Type::Char),
            ExprKind::Bool(_) => Ok(Type::Bool),
            ExprKind::Var(name) => self.resolve_variable(name, line),
            ExprKind::Binary { op, left, right } => {
                let left = self.check_expression(left)?;
                let right = self.check_expression(right)?;
                binary_result(*op, &left, &right).ok_or(SemanticError::BinaryOperands {
                    op: *op,
                    left,
                    right,
                    line,
                })
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.check_expression(operand)?;
                match op {
                    UnaryOperator::Not if operand == Type::Bool => Ok(Type::Bool),
                    UnaryOperator::Negate if operand.is_numeric() => Ok(operand),
                    _ => Err(SemanticError::UnaryOperand {
                        op: *op,
                        operand,
                        line,
                    }),
                }
            }
            ExprKind::Call { name, args } => self.check_call(name, args, line),
            ExprKind::ArrayLiteral(elements) => {
                let Some((first, rest)) = elements.split_first() else {
                    return Ok(Type::array_of(Type::Any));
                };
                let first = self.check_expression(first)?;
                for element in rest {
                    let other = self.check_expression(element)?;
                    if other != first {
                        return Err(SemanticError::MixedArrayElements { first, other, line });
                    }
                }
                Ok(Type::array_of(first))
            }
            ExprKind::ArrayAccess { name, index } => self.check_array_access(name, index, line),
        }
    }

    fn check_call(&mut self, name: &str, args: &[Expr], line: usize) -> SemanticResult<Type> {
        let Some(signature) = self.functions.get(name).cloned() else {
            return Err(SemanticError::UndefinedFunction {
                name: name.to_string(),
                line,
            });
        };
        if args.len() != signature.params.len() {
            return Err(SemanticError::ArgumentCount {
                name: name.to_string(),
                expected: signature.params.len(),
                found: args.len(),
                line,
            });
        }
        for (position, (arg, expected)) in args.iter().zip(&signature.params).enumerate() {
            let found = self.check_expression(arg)?;
            if !expected.accepts(&found) {
                return Err(SemanticError::ArgumentType {
                    name: name.to_string(),
                    position: position + 1,
                    expected: expected.clone(),
                    found,
                    line,
                });
            }
        }
        Ok(signature.return_type)
    }
}

/// Result type of `left op right`, or `None` when the operands do not fit.
fn binary_result(op: BinaryOperator, left: &Type, right: &Type) -> Option<Type> {
    if op.is_arithmetic() {
        if !left.is_numeric() || !right.is_numeric() {
            return None;
        }
        if *left == Type::Float || *right == Type::Float {
            return Some(Type::Float);
        }
        return Some(Type::Int);
    }
    if op.is_comparison() {
        return (left.is_numeric() && right.is_numeric()).then_some(Type::Bool);
    }
    (left == right).then_some(Type::Bool)
}

pub fn analyze(program: &Program) -> SemanticResult<()> {
    SemanticAnalyzer::new().analyze(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use indoc::indoc;

    fn check(input: &str) -> SemanticResult<()> {
        let tokens = tokenize(input).expect("tokenize should succeed");
        let program = parse_tokens(tokens).expect("parse should succeed");
        analyze(&program)
    }

    fn check_err(input: &str) -> SemanticError {
        check(input).expect_err("expected semantic error")
    }

    #[test]
    fn accepts_well_typed_program() {
        let input = indoc! {r#"
            int[] xs = {3, 1, 2};
            float scale = 1.5;
            def float scaled(int n) {
                return n * scale;
            }
            for (int i = 0; i < 3; i = i + 1) {
                if (xs[i] >= 2) {
                    print(scaled(xs[i]));
                } else {
                    print("small");
                }
            }
            char[] none = {};
            string s = "done";
            print(s == "done");
        "#};
        check(input).expect("program should type-check");
    }

    #[test]
    fn rejects_float_initializer_for_int() {
        let err = check_err("int x = 5.0;");
        assert_eq!(
            err,
            SemanticError::DeclarationMismatch {
                name: "x".to_string(),
                declared: Type::Int,
                found: Type::Float,
                line: 1,
            }
        );
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn rejects_return_type_mismatch() {
        let err = check_err("def float f() {\n    return 1;\n}");
        assert_eq!(
            err,
            SemanticError::ReturnMismatch {
                function: "f".to_string(),
                expected: Type::Float,
                found: Type::Int,
                line: 2,
            }
        );
    }

    #[test]
    fn rejects_return_outside_function() {
        let err = check_err("int x = 1;\nreturn x;");
        assert_eq!(err, SemanticError::ReturnOutsideFunction { line: 2 });
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn block_locals_are_not_visible_after_the_block() {
        let input = indoc! {"
            if (true) {
                int inner = 1;
            }
            print(inner);
        "};
        assert_eq!(
            check_err(input),
            SemanticError::UndefinedVariable {
                name: "inner".to_string(),
                line: 4,
            }
        );
    }

    #[test]
    fn for_loop_variable_is_scoped_to_the_loop() {
        let input = indoc! {"
            for (int i = 0; i < 2; i = i + 1) { print(i); }
            for (int i = 0; i < 2; i = i + 1) { print(i); }
            print(i);
        "};
        assert_eq!(check_err(input).kind(), ErrorKind::Name);
    }

    #[test]
    fn function_bodies_cannot_see_enclosing_locals() {
        let input = indoc! {"
            int global = 1;
            if (true) {
                int local = 2;
                def int peek() {
                    return global + local;
                }
            }
        "};
        assert_eq!(
            check_err(input),
            SemanticError::UndefinedVariable {
                name: "local".to_string(),
                line: 5,
            }
        );
    }

    #[test]
    fn rejects_redeclaration_in_same_scope_but_allows_shadowing() {
        assert_eq!(
            check_err("int x = 1;\nint x = 2;"),
            SemanticError::Redeclaration {
                name: "x".to_string(),
                line: 2,
            }
        );
        check("int x = 1; if (true) { bool x = false; }").expect("shadowing is allowed");
    }

    #[test]
    fn conditions_must_be_boolean() {
        let err = check_err("while (1) { }");
        assert_eq!(
            err,
            SemanticError::NonBooleanCondition {
                construct: "while loop",
                found: Type::Int,
                line: 1,
            }
        );
    }

    #[test]
    fn arithmetic_promotes_to_float() {
        check("float f = 1 + 2.5 * 2;").expect("mixed arithmetic is float");
        assert_eq!(check_err("int i = 1 + 2.5;").kind(), ErrorKind::Type);
    }

    #[test]
    fn equality_requires_identical_types() {
        check("bool b = 'a' == 'b';").expect("char equality");
        let err = check_err("bool b = 1 == 1.0;");
        assert!(matches!(
            err,
            SemanticError::BinaryOperands {
                op: BinaryOperator::Equal,
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_numeric_arithmetic_and_bad_unary() {
        assert!(matches!(
            check_err("string s = \"a\" + \"b\";"),
            SemanticError::BinaryOperands { .. }
        ));
        assert!(matches!(
            check_err("bool b = !1;"),
            SemanticError::UnaryOperand { .. }
        ));
        check("float f = -2.5; int i = --3;").expect("negation keeps type");
    }

    #[test]
    fn array_rules() {
        assert_eq!(
            check_err("int[] a = {1, 'x'};"),
            SemanticError::MixedArrayElements {
                first: Type::Int,
                other: Type::Char,
                line: 1,
            }
        );
        assert!(matches!(
            check_err("int a = 1; print(a[0]);"),
            SemanticError::NotAnArray { .. }
        ));
        assert!(matches!(
            check_err("int[] a = {1}; print(a[true]);"),
            SemanticError::NonIntegerIndex { .. }
        ));
        assert!(matches!(
            check_err("int[] a = {1}; a[0] = 2.0;"),
            SemanticError::AssignmentMismatch { .. }
        ));
        assert!(matches!(
            check_err("float[] a = {1, 2};"),
            SemanticError::DeclarationMismatch { .. }
        ));
    }

    #[test]
    fn calls_are_checked_against_signatures() {
        let prelude = "def int add(int a, int b) { return a + b; }\n";
        check(&format!("{prelude}int x = add(1, 2);")).expect("valid call");
        assert!(matches!(
            check_err(&format!("{prelude}int x = add(1);")),
            SemanticError::ArgumentCount {
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert!(matches!(
            check_err(&format!("{prelude}int x = add(1, 'c');")),
            SemanticError::ArgumentType { position: 2, .. }
        ));
        assert!(matches!(
            check_err("int x = missing();"),
            SemanticError::UndefinedFunction { .. }
        ));
        assert!(matches!(
            check_err(&format!("{prelude}def int add(int a) {{ return a; }}")),
            SemanticError::FunctionRedefinition { .. }
        ));
    }

    #[test]
    fn recursive_functions_resolve_themselves() {
        let input = indoc! {"
            def int fact(int n) {
                if (n <= 1) {
                    return 1;
                }
                return n * fact(n - 1);
            }
            print(fact(5));
        "};
        check(input).expect("recursion type-checks");
    }

    #[test]
    fn array_parameters_accept_empty_literals() {
        let input = indoc! {"
            def int first(int[] xs) {
                return xs[0];
            }
            print(first({}));
        "};
        check(input).expect("empty literal fits int[] parameter");
    }
}
