//! Policy Enforcement Engine benchmarks.
//!
//! Per §4.6: "Target p95 latency of the engine <= 100ms under
//! 100-request concurrent load."

use agentkern_policy::{Enforcement, PolicyContext, PolicyEngine, PolicyRecord, PolicyRequest, RuleSpec};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::HashMap;

fn sample_policies() -> Vec<PolicyRecord> {
    vec![
        PolicyRecord {
            id: "rbac".into(),
            name: "RBAC".into(),
            version: 1,
            enabled: true,
            enforcement: Enforcement::Blocking,
            rules: vec![RuleSpec::Rbac { required_action: "read".into() }],
        },
        PolicyRecord {
            id: "injection".into(),
            name: "Prompt Injection".into(),
            version: 1,
            enabled: true,
            enforcement: Enforcement::Blocking,
            rules: vec![RuleSpec::PromptInjection { patterns: agentkern_policy::default_prompt_injection_patterns() }],
        },
        PolicyRecord {
            id: "pii".into(),
            name: "PII".into(),
            version: 1,
            enabled: true,
            enforcement: Enforcement::Logging,
            rules: vec![RuleSpec::PiiRedaction],
        },
    ]
}

fn benchmark_single_evaluation(c: &mut Criterion) {
    let engine = PolicyEngine::new();
    let policies = sample_policies();
    let context = PolicyContext { authenticated: true, user_id: "bench-user".into(), role: "*".into(), tenant_id: "acme".into(), env: "prod".into() };
    let request = PolicyRequest { prompt: Some("What is the weather today?".into()), action: Some("read".into()), fields: HashMap::new() };

    let mut group = c.benchmark_group("policy_evaluate");
    group.throughput(Throughput::Elements(1));
    group.bench_with_input(BenchmarkId::from_parameter("clean_request"), &request, |b, request| {
        b.iter(|| engine.evaluate(black_box("bench-req"), black_box(request), black_box(&context), black_box(&policies)));
    });
    group.finish();
}

fn benchmark_concurrent_like_load(c: &mut Criterion) {
    let engine = PolicyEngine::new();
    let policies = sample_policies();
    let context = PolicyContext { authenticated: true, user_id: "bench-user".into(), role: "*".into(), tenant_id: "acme".into(), env: "prod".into() };
    let request = PolicyRequest { prompt: Some("My SSN is 123-45-6789".into()), action: Some("read".into()), fields: HashMap::new() };

    let mut group = c.benchmark_group("policy_evaluate_burst");
    group.throughput(Throughput::Elements(100));
    group.bench_function("100_sequential_evaluations", |b| {
        b.iter(|| {
            for i in 0..100 {
                let _ = engine.evaluate(black_box(&format!("bench-req-{i}")), black_box(&request), black_box(&context), black_box(&policies));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, benchmark_single_evaluation, benchmark_concurrent_like_load);
criterion_main!(benches);
