use criterion::{black_box, criterion_group, criterion_main, Criterion};

use warden_auth::{Role, TokenCodec};
use warden_core::UserId;

fn bench_access_tokens(c: &mut Criterion) {
    let codec = TokenCodec::new("bench-secret");
    let token = codec
        .issue_access_token(UserId::new(42), "maria123", Role::User)
        .unwrap();

    let mut group = c.benchmark_group("access_token");
    group.bench_function("issue", |b| {
        b.iter(|| {
            codec
                .issue_access_token(black_box(UserId::new(42)), black_box("maria123"), Role::User)
                .unwrap()
        })
    });
    group.bench_function("verify", |b| {
        b.iter(|| codec.verify_access_token(black_box(&token)).unwrap())
    });
    group.finish();
}

fn bench_refresh_tokens(c: &mut Criterion) {
    let codec = TokenCodec::new("bench-secret");
    let token = codec.issue_refresh_token("maria123").unwrap();

    let mut group = c.benchmark_group("refresh_token");
    group.bench_function("issue", |b| {
        b.iter(|| codec.issue_refresh_token(black_box("maria123")).unwrap())
    });
    group.bench_function("verify", |b| {
        b.iter(|| codec.verify_refresh_token(black_box(&token)).unwrap())
    });
    // A refresh token presented as an access token must fail fast.
    group.bench_function("reject_as_access", |b| {
        b.iter(|| codec.verify_access_token(black_box(&token)).is_err())
    });
    group.finish();
}

criterion_group!(benches, bench_access_tokens, bench_refresh_tokens);
criterion_main!(benches);
