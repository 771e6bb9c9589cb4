use divan::{AllocProfiler, Bencher};
use tessera::jose::{
    AlgorithmRegistry, Claims, JWA, Key, KeySet, Signer, SignerConfig, Verifier,
};

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    // Run registered benchmarks.
    divan::main();
}

const ALGORITHMS: [&str; 6] = ["HS256", "RS256", "PS256", "ES256", "ES384", "ES512"];

fn setup(alg: &str) -> (Signer, Verifier) {
    let alg: JWA = alg.parse().unwrap();
    let registry = AlgorithmRegistry::with_defaults();
    let key = Key::generate(alg, None).unwrap();
    let keys = KeySet::new().with_key(key.clone()).unwrap();
    let signer = Signer::new(&keys, SignerConfig::new("auth.example.com", key.kid()), &registry)
        .unwrap();
    let verifier = Verifier::new(&keys, "auth.example.com", &registry).unwrap();
    (signer, verifier)
}

fn claims() -> Claims {
    Claims {
        sub: Some("gG26se5wyWDOEjaNHwlXm2i9G3mnYGbG62BBq3ZE".to_owned()),
        aud: Some("testing".into()),
        scopes: Some(vec!["owner".to_owned(), "vehicle".to_owned()]),
        ..Default::default()
    }
}

#[divan::bench(args = ALGORITHMS)]
fn create_token(bencher: Bencher, alg: &str) {
    let (signer, _) = setup(alg);
    bencher
        .with_inputs(claims)
        .bench_values(|claims| signer.create(claims).unwrap());
}

#[divan::bench(args = ALGORITHMS)]
fn verify_token(bencher: Bencher, alg: &str) {
    let (signer, verifier) = setup(alg);
    let token = signer.create(claims()).unwrap();
    bencher.bench(|| verifier.verify(divan::black_box(&token)).unwrap());
}
