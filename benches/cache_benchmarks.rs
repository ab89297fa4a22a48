use criterion::{black_box, criterion_group, criterion_main, Criterion};
use section_settings::configurator::ProgrammaticConfigurator;
use section_settings::{ServiceRegistry, SettingsFactory};
use std::sync::Arc;

fn factory(capacity: usize) -> SettingsFactory {
    let configurator = ProgrammaticConfigurator::new(|section: &str, registry: &mut ServiceRegistry| {
        registry.register_instance(section.to_string());
        Ok(())
    });
    SettingsFactory::with_capacity(Arc::new(configurator), capacity).unwrap()
}

fn benchmark_cache_hit(c: &mut Criterion) {
    let factory = factory(16);
    factory.get("Mail").unwrap();

    c.bench_function("settings_cache_hit", |b| {
        b.iter(|| factory.get(black_box("Mail")).unwrap())
    });
}

fn benchmark_resolve_through_settings(c: &mut Criterion) {
    let factory = factory(16);
    let settings = factory.get("Mail").unwrap();

    c.bench_function("settings_resolve_default", |b| {
        b.iter(|| settings.resolve::<String>().unwrap())
    });
}

fn benchmark_eviction_churn(c: &mut Criterion) {
    let factory = factory(8);
    let sections: Vec<String> = (0..32).map(|i| format!("Section{i}")).collect();

    c.bench_function("settings_cache_eviction_churn", |b| {
        b.iter(|| {
            for section in &sections {
                black_box(factory.get(section).unwrap());
            }
        })
    });
}

criterion_group!(
    benches,
    benchmark_cache_hit,
    benchmark_resolve_through_settings,
    benchmark_eviction_churn
);
criterion_main!(benches);
