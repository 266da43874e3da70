use criterion::Criterion;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};


fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .init();

    let mut c = Criterion::default()
        .significance_level(0.1)
        .sample_size(10)
        .configure_from_args();

    compile::compile_benchmark(&mut c);

    c.final_summary();
}
