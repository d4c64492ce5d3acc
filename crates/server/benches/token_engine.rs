use criterion::{Criterion, criterion_group, criterion_main};
use id_server::oauth2::OAuthService;
use id_server::oauth2::password::{PasswordVerifier, hash_password};
use id_server::oauth2::scope::scope_not_greater;
use std::hint::black_box;

const LEGACY_HASH: &str = "$P$9IQRaTwmfeRo7ud9Fh4E2PdI0S3r.L0";

fn bench_generate_token(c: &mut Criterion) {
    c.bench_function("generate_token", |b| b.iter(OAuthService::generate_token));
}

fn bench_password_verify(c: &mut Criterion) {
    let verifier = PasswordVerifier::default();
    let bcrypt_hash = hash_password("test_password").expect("hash");

    let mut group = c.benchmark_group("password_verify");
    group.sample_size(10);
    group.bench_function("bcrypt", |b| {
        b.iter(|| verifier.verify(black_box("test_password"), black_box(&bcrypt_hash)))
    });
    group.bench_function("phpass", |b| {
        b.iter(|| verifier.verify(black_box("test12345"), black_box(LEGACY_HASH)))
    });
    group.finish();
}

fn bench_scope_not_greater(c: &mut Criterion) {
    c.bench_function("scope_not_greater", |b| {
        b.iter(|| {
            scope_not_greater(
                black_box("read_write tenantadmin"),
                black_box("read read_write tenantadmin artist"),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_generate_token,
    bench_password_verify,
    bench_scope_not_greater
);
criterion_main!(benches);
