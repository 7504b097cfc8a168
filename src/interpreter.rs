//! Tree-walking evaluator for analyzed programs.

use std::collections::HashMap;

use log::debug;

use crate::ast::{FunctionDef, Program, Stmt};
use crate::scope::ScopeTree;

mod error;
mod runtime;
mod value;

pub use error::{RuntimeError, RuntimeResult};
pub use value::{ArrayRef, Value};

use runtime::{ExecResult, Runtime};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;
/// Statements and expressions that may be under evaluation at once, counting
/// every active call frame.
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 2048;

/// Result of one run: everything printed, and how the run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub stdout: String,
    pub result: RuntimeResult<()>,
}

impl Execution {
    pub fn into_result(self) -> RuntimeResult<String> {
        self.result.map(|()| self.stdout)
    }
}

pub struct Interpreter {
    max_call_depth: usize,
    max_eval_depth: usize,
    max_output_bytes: Option<usize>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_eval_depth: DEFAULT_MAX_EVAL_DEPTH,
            max_output_bytes: None,
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn with_max_eval_depth(mut self, max_eval_depth: usize) -> Self {
        self.max_eval_depth = max_eval_depth;
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: Option<usize>) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    /// Executes `program`, which must already have passed analysis. Output
    /// printed before a failure is kept in [`Execution::stdout`].
    pub fn run(&self, program: &Program) -> Execution {
        let mut functions = HashMap::new();
        collect_functions(&program.statements, &mut functions);
        debug!("running program with {} functions", functions.len());

        let mut runtime = Runtime {
            functions,
            scopes: ScopeTree::new(),
            output: String::new(),
            call_depth: 0,
            max_call_depth: self.max_call_depth,
            eval_depth: 0,
            max_eval_depth: self.max_eval_depth,
            max_output_bytes: self.max_output_bytes,
        };
        let result = match runtime.exec_statements(&program.statements) {
            Ok(ExecResult::Continue) => Ok(()),
            Ok(ExecResult::Return(_)) => {
                Err(RuntimeError::internal("return escaped to the top level"))
            }
            Err(error) => Err(error),
        };
        Execution {
            stdout: runtime.output,
            result,
        }
    }
}

/// Gathers every function definition, however deeply nested in blocks, into
/// one flat table.
fn collect_functions<'p>(statements: &'p [Stmt], functions: &mut HashMap<&'p str, &'p FunctionDef>) {
    for statement in statements {
        match statement {
            Stmt::FuncDef(function) => {
                functions.insert(function.name.as_str(), function);
                collect_functions(&function.body.statements, functions);
            }
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                collect_functions(&then_block.statements, functions);
                if let Some(else_block) = else_block {
                    collect_functions(&else_block.statements, functions);
                }
            }
            Stmt::While { body, .. } | Stmt::For { body, .. } => {
                collect_functions(&body.statements, functions)
            }
            Stmt::VarDecl { .. }
            | Stmt::Assign(_)
            | Stmt::Print { .. }
            | Stmt::Return { .. }
            | Stmt::Expr(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::lexer::tokenize;
    use crate::parser::parse_tokens;
    use indoc::indoc;

    fn execute_with(interpreter: Interpreter, input: &str) -> Execution {
        let tokens = tokenize(input).expect("tokenize should succeed");
        let program = parse_tokens(tokens).expect("parse should succeed");
        analyze(&program).expect("analysis should succeed");
        interpreter.run(&program)
    }

    fn execute(input: &str) -> Execution {
        execute_with(Interpreter::new(), input)
    }

    fn output(input: &str) -> String {
        execute(input)
            .into_result()
            .expect("program should run")
    }

    #[test]
    fn prints_declared_variable() {
        assert_eq!(output("int x = 5; print(x);"), "5\n");
    }

    #[test]
    fn for_loop_counts() {
        assert_eq!(
            output("for(int i=0;i<3;i=i+1){print(i);}"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn arithmetic_and_formatting() {
        let input = indoc! {r#"
            print(7 / 2);
            print(-7 / 2);
            print(7 / 2.0);
            print(1 + 1.0);
            print(2 * 3 - 4);
            print(1 < 2);
            print('a' != 'b');
            print("hello world");
            print({1, 2, 3});
            print(!true);
        "#};
        assert_eq!(
            output(input),
            "3\n-3\n3.5\n2.0\n2\ntrue\ntrue\nhello world\n[1, 2, 3]\nfalse\n"
        );
    }

    #[test]
    fn while_loop_and_reassignment() {
        let input = indoc! {"
            int n = 10;
            int steps = 0;
            while (n != 1) {
                if (n / 2 * 2 == n) {
                    n = n / 2;
                } else {
                    n = 3 * n + 1;
                }
                steps = steps + 1;
            }
            print(steps);
        "};
        assert_eq!(output(input), "6\n");
    }

    #[test]
    fn recursion_returns_values() {
        let input = indoc! {"
            def int fib(int n) {
                if (n < 2) {
                    return n;
                }
                return fib(n - 1) + fib(n - 2);
            }
            print(fib(15));
        "};
        assert_eq!(output(input), "610\n");
    }

    #[test]
    fn return_unwinds_out_of_loops() {
        let input = indoc! {"
            def int first_over(int[] xs, int limit) {
                for (int i = 0; i < 4; i = i + 1) {
                    while (true) {
                        if (xs[i] > limit) {
                            return xs[i];
                        }
                        i = i + 1;
                    }
                }
                return -1;
            }
            print(first_over({1, 5, 9, 2}, 4));
        "};
        assert_eq!(output(input), "5\n");
    }

    #[test]
    fn arrays_are_shared_by_reference() {
        let input = indoc! {"
            def int fill(int[] xs, int value) {
                xs[0] = value;
                return 0;
            }
            int[] a = {1, 2};
            int[] b = a;
            b[1] = 20;
            int ignored = fill(a, 10);
            print(a);
        "};
        assert_eq!(output(input), "[10, 20]\n");
    }

    #[test]
    fn functions_see_globals_not_caller_locals() {
        let input = indoc! {"
            int shared = 1;
            def int read() {
                return shared;
            }
            if (true) {
                int shared = 99;
                print(read());
            }
            shared = 2;
            print(read());
        "};
        assert_eq!(output(input), "1\n2\n");
    }

    #[test]
    fn call_statement_may_discard_missing_value() {
        let input = indoc! {"
            def int log(int x) {
                print(x);
            }
            log(4);
        "};
        assert_eq!(output(input), "4\n");

        let execution = execute(indoc! {"
            def int log(int x) {
                print(x);
            }
            int y = log(4);
        "});
        assert_eq!(execution.stdout, "4\n");
        assert_eq!(
            execution.result,
            Err(RuntimeError::MissingReturnValue {
                name: "log".to_string(),
                line: 4,
            })
        );
    }

    #[test]
    fn index_out_of_bounds_keeps_earlier_output() {
        let execution = execute("print(1);\nint[] a = {1, 2, 3};\nprint(a[5]);");
        assert_eq!(execution.stdout, "1\n");
        assert_eq!(
            execution.result,
            Err(RuntimeError::IndexOutOfBounds {
                index: 5,
                len: 3,
                line: 3,
            })
        );
        assert!(matches!(
            execute("int[] a = {1}; a[-1] = 2;").result,
            Err(RuntimeError::IndexOutOfBounds { index: -1, .. })
        ));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(
            execute("print(5/0);").result,
            Err(RuntimeError::DivisionByZero { line: 1 })
        );
        assert_eq!(
            execute("float z = 0.0;\nprint(1.5 / z);").result,
            Err(RuntimeError::DivisionByZero { line: 2 })
        );
    }

    #[test]
    fn integer_overflow_is_reported() {
        let execution = execute("int big = 9223372036854775807;\nprint(big + 1);");
        assert_eq!(execution.result, Err(RuntimeError::Overflow { line: 2 }));
    }

    #[test]
    fn call_depth_is_limited() {
        let input = indoc! {"
            def int down(int n) {
                return down(n + 1);
            }
            print(down(0));
        "};
        let execution = execute_with(Interpreter::new().with_max_call_depth(32), input);
        assert_eq!(
            execution.result,
            Err(RuntimeError::RecursionLimit { limit: 32, line: 2 })
        );
    }

    #[test]
    fn evaluation_depth_spans_calls_and_blocks() {
        let input = indoc! {"
            def int down(int n) {
                if (n == 0) {
                    return 0;
                }
                if (true) {
                    if (true) {
                        return 1 + down(n - 1);
                    }
                }
                return 0;
            }
            print(down(3));
            print(down(100));
        "};
        let execution = execute_with(Interpreter::new().with_max_eval_depth(64), input);
        assert_eq!(execution.stdout, "3\n");
        assert!(matches!(
            execution.result,
            Err(RuntimeError::EvaluationTooDeep { limit: 64, .. })
        ));
    }

    #[test]
    fn output_is_capped() {
        let input = "for (int i = 0; i < 100; i = i + 1) { print(i); }";
        let execution =
            execute_with(Interpreter::new().with_max_output_bytes(Some(8)), input);
        assert_eq!(execution.stdout, "0\n1\n2\n3\n");
        assert_eq!(
            execution.result,
            Err(RuntimeError::OutputLimit { limit: 8, line: 1 })
        );
    }

    #[test]
    fn functions_defined_in_blocks_are_global() {
        let input = indoc! {"
            if (true) {
                def int twice(int x) {
                    return x * 2;
                }
            }
            print(twice(21));
        "};
        assert_eq!(output(input), "42\n");
    }
}
