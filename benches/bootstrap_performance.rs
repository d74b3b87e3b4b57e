use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use env_bootstrap::{Bootstrapper, Config, EnvFile, EnvSnapshot, SecretSpec, generate_password};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_env_file(path: &Path, var_count: usize) -> std::io::Result<()> {
    let mut content = String::new();
    content.push_str("# Generated for benchmarking\n\n");

    for i in 0..var_count {
        content.push_str(&format!("ENV_VAR_{}=\"{}\"\n", i, generate_password(32, "")));
    }

    fs::write(path, content)
}

fn bench_password_by_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("password_by_length");

    for length in [16, 64, 256, 1024].iter() {
        group.throughput(Throughput::Elements(*length as u64));
        group.bench_with_input(BenchmarkId::from_parameter(length), length, |b, &length| {
            b.iter(|| black_box(generate_password(black_box(length), "!@#^*()")))
        });
    }
    group.finish();
}

fn bench_read_env_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_env_file");

    for var_count in [10, 100, 1000].iter() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");
        create_env_file(&path, *var_count).unwrap();
        let env_file = EnvFile::new(&path);

        group.throughput(Throughput::Elements(*var_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(var_count), var_count, |b, _| {
            b.iter(|| black_box(env_file.read().unwrap()))
        });
    }
    group.finish();
}

fn bench_check_satisfied(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(".env");
    create_env_file(&path, 200).unwrap();

    let config = Config {
        env_file: Some(path.to_string_lossy().into_owned()),
        required: Some((0..100).map(|i| format!("ENV_VAR_{}", i)).collect()),
        secrets: Some((100..200).map(|i| SecretSpec::new(format!("ENV_VAR_{}", i))).collect()),
    };
    let bootstrapper = Bootstrapper::with_config(config).unwrap();

    c.bench_function("check_satisfied_200_vars", |b| {
        b.iter(|| black_box(bootstrapper.check_with(EnvSnapshot::new()).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_password_by_length,
    bench_read_env_file,
    bench_check_satisfied
);
criterion_main!(benches);
