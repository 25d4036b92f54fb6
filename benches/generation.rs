use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use form_fsm::{
    Event, FieldConfig, FormConfig, Interpreter, RunnerOptions, ValidationRule, create_form_machine,
    spawn,
};
use serde_json::json;
use tokio::runtime::Runtime;

fn form(fields: usize) -> FormConfig {
    let fields = (0..fields).map(|i| {
        let name = format!("field{i}");
        let empty = name.clone();
        let short = name.clone();
        FieldConfig::new(name)
            .on_input(ValidationRule::new("empty", move |ctx, _| ctx.value(&empty).is_empty()))
            .on_input(ValidationRule::new("tooShort", move |ctx, _| ctx.value(&short).len() < 3))
            .on_submit(ValidationRule::new("required", |_, _| false))
    });
    FormConfig::new("bench")
        .fields(fields)
        .submit(|_, _| async { Ok::<_, serde_json::Value>(json!(null)) })
}

fn benchmark_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_form_machine");
    for fields in [1, 10, 50] {
        let config = form(fields);
        group.bench_with_input(BenchmarkId::from_parameter(fields), &config, |b, config| {
            b.iter(|| create_form_machine(config).unwrap())
        });
    }
    group.finish();
}

fn benchmark_interpreter(c: &mut Criterion) {
    let machine = create_form_machine(&form(10)).unwrap();

    c.bench_function("interpreter_1000_inputs", |b| {
        b.iter(|| {
            let mut form = Interpreter::new(&machine).unwrap();
            for i in 0..1000 {
                let value = if i % 2 == 0 { "ab" } else { "abcdef" };
                form.send(&Event::input(format!("field{}", i % 10), value)).unwrap();
            }
            form
        })
    });
}

fn benchmark_runner(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let machine = create_form_machine(&form(10)).unwrap();

    c.bench_function("runner_1000_inputs", |b| {
        b.to_async(&rt).iter(|| async {
            let (handle, task) = spawn(&machine, RunnerOptions::default()).unwrap();
            for i in 0..1000 {
                handle
                    .send(Event::input(format!("field{}", i % 10), "abcdef"))
                    .await
                    .unwrap();
            }
            handle.shutdown_graceful();
            task.await.unwrap()
        })
    });
}

criterion_group!(benches, benchmark_generation, benchmark_interpreter, benchmark_runner);
criterion_main!(benches);
