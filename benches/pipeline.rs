mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tinylang::interpreter::Interpreter;
use tinylang::{lexer, parser};

fn bench_frontend(c: &mut Criterion) {
    for (label, source) in common::workloads() {
        let tokens = lexer::tokenize(&source).expect("tokenize");

        c.bench_function(&format!("frontend_tokenize_{label}"), |b| {
            b.iter(|| {
                let out = lexer::tokenize(black_box(&source)).expect("tokenize");
                black_box(out);
            })
        });

        c.bench_function(&format!("frontend_parse_only_{label}"), |b| {
            b.iter(|| {
                let out = parser::parse_tokens(black_box(tokens.clone())).expect("parse");
                black_box(out);
            })
        });

        c.bench_function(&format!("frontend_compile_{label}"), |b| {
            b.iter(|| {
                let out = tinylang::compile(black_box(&source)).expect("compile");
                black_box(out);
            })
        });
    }
}

fn bench_interpreter(c: &mut Criterion) {
    for (label, source) in common::workloads() {
        let program = common::load_program(&label, &source);

        c.bench_function(&format!("interpreter_execute_{label}"), |b| {
            let interpreter = Interpreter::new();
            b.iter(|| {
                let output = interpreter
                    .run(black_box(&program))
                    .into_result()
                    .expect("run");
                black_box(output);
            })
        });

        c.bench_function(&format!("pipeline_run_{label}"), |b| {
            b.iter(|| {
                let outcome = tinylang::run(black_box(&source));
                black_box(outcome);
            })
        });
    }
}

criterion_group!(benches, bench_frontend, bench_interpreter);
criterion_main!(benches);
