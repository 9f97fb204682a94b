use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ou_filter_compiler::config::RegistryConfig;
use ou_filter_compiler::rows;
use ou_filter_compiler::{ConditionCompiler, ConditionDecompiler, CustomFieldRecord, FieldKeyRegistry};
use serde_json::{json, Value};
use std::hint::black_box;

// 创建带字段映射的注册表
fn create_registry() -> FieldKeyRegistry {
    RegistryConfig::from_json_str(
        r#"{"field_keys": {"project_name": "projects", "job_normalized_full_name": "job_normalized_full_names"}}"#,
    )
    .expect("配置应该合法")
    .into_registry()
}

fn create_catalog() -> Vec<CustomFieldRecord> {
    vec![
        CustomFieldRecord::new("customfield_10020"),
        CustomFieldRecord::transformed("wi_storypoints", "wi_"),
    ]
}

fn test_cases() -> Vec<(&'static str, Value)> {
    vec![
        ("simple", json!([{"key": "status", "param": "EQUALS", "value": "open"}])),
        ("medium", json!([
            {"key": "status", "param": "EQUALS", "value": "open"},
            {"key": "custom_field_team", "param": "DOES_NOT_EQUAL", "value": "ops"},
            {"key": "title", "param": "CONTAINS", "value": "bug"}
        ])),
        ("complex", json!([
            {"key": "rollback", "param": "EQUALS", "value": "true"},
            {"key": "teams", "param": "EQUALS", "value": ["core", "infra"]},
            {"key": "customfield_10020", "param": "DOES_NOT_EQUAL", "value": ["s1"]},
            {"key": "wi_storypoints", "param": "IS_BETWEEN", "value": {"lowerBound": "1", "upperBound": "8"},
             "metadata": {"transformed": "wi_"}},
            {"key": "projects", "param": "STARTS_WITH", "value": "plat"},
            {"key": "created_at", "param": "IS_BETWEEN", "value": {"ageSeconds": "604800"}}
        ])),
    ]
}

// 基准测试：行解析性能
fn benchmark_row_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_parsing");
    for (name, rows_json) in test_cases() {
        group.bench_with_input(BenchmarkId::new("parse_rows", name), &rows_json, |b, rows_json| {
            b.iter(|| black_box(rows::parse_rows(black_box(rows_json)).expect("解析应该成功")))
        });
    }
    group.finish();
}

// 基准测试：编译性能
fn benchmark_compile(c: &mut Criterion) {
    let registry = create_registry();
    let mut group = c.benchmark_group("compile");
    for (name, rows_json) in test_cases() {
        let conditions = rows::parse_rows(&rows_json).expect("解析应该成功");
        group.bench_with_input(BenchmarkId::new("compile", name), &conditions, |b, conditions| {
            b.iter(|| {
                let compiler = ConditionCompiler::new(&registry);
                black_box(compiler.compile(black_box(conditions)).expect("编译应该成功"))
            })
        });
    }
    group.finish();
}

// 基准测试：还原性能
fn benchmark_decompile(c: &mut Criterion) {
    let registry = create_registry();
    let catalog = create_catalog();
    let mut group = c.benchmark_group("decompile");
    for (name, rows_json) in test_cases() {
        let document = ConditionCompiler::new(&registry)
            .compile_rows(&rows_json)
            .expect("编译应该成功")
            .to_wire();
        group.bench_with_input(BenchmarkId::new("decompile_value", name), &document, |b, document| {
            b.iter(|| {
                let decompiler = ConditionDecompiler::new(&registry, &catalog);
                black_box(decompiler.decompile_value(black_box(document)).expect("还原应该成功"))
            })
        });
    }
    group.finish();
}

// 基准测试：完整的往返流程
fn benchmark_round_trip(c: &mut Criterion) {
    let registry = create_registry();
    let catalog = create_catalog();
    let mut group = c.benchmark_group("round_trip");
    for (name, rows_json) in test_cases() {
        group.bench_with_input(BenchmarkId::new("full_pipeline", name), &rows_json, |b, rows_json| {
            b.iter(|| {
                let document = ConditionCompiler::new(&registry)
                    .compile_rows(black_box(rows_json))
                    .expect("编译应该成功");
                let conditions = ConditionDecompiler::new(&registry, &catalog).decompile(&document);
                black_box(rows::to_rows(&conditions))
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_row_parsing,
    benchmark_compile,
    benchmark_decompile,
    benchmark_round_trip
);
criterion_main!(benches);
