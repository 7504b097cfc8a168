use std::path::Path;

use test_support::load_cases;
use tinylang::ast::Program;

/// `(label, source)` for every fixture that opts into benchmarking.
pub fn workloads() -> Vec<(String, String)> {
    let cases = load_cases(Path::new("tests/programs"))
        .unwrap_or_else(|err| panic!("load fixtures: {err:#}"));
    cases
        .into_iter()
        .filter(|case| case.spec.bench.enabled)
        .map(|case| {
            let source = case
                .source()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            (case.name, source)
        })
        .collect()
}

pub fn load_program(label: &str, source: &str) -> Program {
    tinylang::compile(source).unwrap_or_else(|err| panic!("compile {label}: {}", err.render()))
}
