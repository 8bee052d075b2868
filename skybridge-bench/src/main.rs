//! Drives the classical, PQC-only, and hybrid handshake configurations to
//! completion repeatedly over an in-memory transport and writes three
//! stable CSV artifacts: per-handshake wall time, the driver-reported
//! round-trip time, and wire sizes. The shape of the tool mirrors the
//! teacher's `scripts/analyze_hpke_rekey_bench.rs`: collect samples, reduce
//! to summary statistics, write CSV. No part of this binary is consumed by
//! `skybridge-crypto`; it only reads the public `SessionKeys` /
//! `HandshakeMetrics` surface.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use skybridge_crypto::driver::{CancellationToken, HandshakeDriver, Identity};
use skybridge_crypto::provider::{CryptoProvider, IdentityPublicKeys};
use skybridge_crypto::providers::classical::ClassicalProvider;
use skybridge_crypto::providers::hybrid::HybridProvider;
use skybridge_crypto::providers::pqc::PqcProvider;
use skybridge_crypto::registry::{CryptoPolicy, HandshakePolicy, Strategy};
use skybridge_crypto::transport::{InMemoryTransport, Transport};
use skybridge_crypto::trust::InMemoryTrustProvider;
use skybridge_crypto::types::{HandshakeMetrics, PeerId};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

struct ScenarioResult {
    wall_ms: Vec<f64>,
    rtt_ms: Vec<f64>,
    wire: HandshakeMetrics,
}

/// Run one (provider, strategy, policy) configuration `warmup + iterations`
/// times, discarding the warmup samples, and returning the timed and wire
/// results of the rest.
fn run_scenario<P>(
    strategy: Strategy,
    crypto_policy: CryptoPolicy,
    handshake_policy: HandshakePolicy,
    new_provider: impl Fn() -> P,
    iterations: usize,
    warmup: usize,
) -> anyhow::Result<ScenarioResult>
where
    P: CryptoProvider + Send + 'static,
{
    let alg = new_provider().supported_suites()[0].mandated_signature_algorithm();

    let initiator_provider = new_provider();
    let (init_signing_key, init_public) = initiator_provider
        .generate_signing_keypair(alg)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let initiator_identity = Identity {
        public_keys: IdentityPublicKeys::software(init_public, alg),
        signing_key: init_signing_key,
    };

    let responder_provider = new_provider();
    let (resp_signing_key, resp_public) = responder_provider
        .generate_signing_keypair(alg)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let responder_identity = Identity {
        public_keys: IdentityPublicKeys::software(resp_public, alg),
        signing_key: resp_signing_key,
    };

    let mut initiator_driver = HandshakeDriver::new(
        initiator_provider,
        initiator_identity,
        Box::new(InMemoryTrustProvider::new()),
        crypto_policy.clone(),
        handshake_policy,
        strategy,
        Duration::from_secs(5),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    let mut responder_driver = HandshakeDriver::new(
        responder_provider,
        responder_identity,
        Box::new(InMemoryTrustProvider::new()),
        crypto_policy,
        handshake_policy,
        strategy,
        Duration::from_secs(5),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    let initiator_peer = PeerId::new("bench-initiator");
    let responder_peer = PeerId::new("bench-responder");

    let mut wall_ms = Vec::with_capacity(iterations);
    let mut rtt_ms = Vec::with_capacity(iterations);
    let mut last_wire: Option<HandshakeMetrics> = None;

    for i in 0..(warmup + iterations) {
        let (transport_a, transport_b) =
            InMemoryTransport::pair(initiator_peer.clone(), responder_peer.clone());
        let token = CancellationToken::new();

        let started = Instant::now();
        let keys_result = thread::scope(|scope| {
            scope.spawn(|| {
                let deadline = Instant::now() + Duration::from_secs(5);
                // Exactly two frames ever reach the responder: MessageA, then
                // MessageC. MessageB is sent, not received, on this side.
                for _ in 0..2 {
                    match transport_b.recv(deadline) {
                        Ok(Some(bytes)) => {
                            let _ = responder_driver.handle_message(&bytes, &initiator_peer, &transport_b);
                        }
                        _ => break,
                    }
                }
            });
            initiator_driver.initiate_handshake(responder_peer.clone(), &transport_a, &token)
        });
        let elapsed = started.elapsed();
        let keys = keys_result.map_err(|e| anyhow::anyhow!("{e}"))?;
        drop(keys);

        if i >= warmup {
            wall_ms.push(elapsed.as_secs_f64() * 1000.0);
            if let Some(metrics) = initiator_driver.get_last_metrics() {
                rtt_ms.push(metrics.rtt_ms as f64);
                last_wire = Some(metrics);
            }
        }
    }

    let wire = last_wire.ok_or_else(|| anyhow::anyhow!("scenario produced no metrics"))?;
    Ok(ScenarioResult { wall_ms, rtt_ms, wire })
}

struct SummaryRow {
    configuration: &'static str,
    iteration_count: usize,
    mean_ms: f64,
    stddev_ms: f64,
    p50_ms: f64,
    p95_ms: f64,
    p99_ms: f64,
}

struct WireRow {
    configuration: &'static str,
    message_a_bytes: usize,
    message_b_bytes: usize,
    finished_bytes: usize,
}

fn summarize(configuration: &'static str, samples: &[f64]) -> SummaryRow {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("benchmark samples are never NaN"));
    let n = sorted.len();
    let mean = if n == 0 { 0.0 } else { sorted.iter().sum::<f64>() / n as f64 };
    let stddev = if n > 1 {
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };
    SummaryRow {
        configuration,
        iteration_count: n,
        mean_ms: mean,
        stddev_ms: stddev,
        p50_ms: percentile(&sorted, 50.0),
        p95_ms: percentile(&sorted, 95.0),
        p99_ms: percentile(&sorted, 99.0),
    }
}

/// Nearest-rank percentile over an already-sorted sample.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}

fn write_summary_csv(path: &Path, rows: &[SummaryRow]) -> anyhow::Result<()> {
    let mut out = String::from("configuration,iteration_count,mean_ms,stddev_ms,p50_ms,p95_ms,p99_ms\n");
    for r in rows {
        out.push_str(&format!(
            "{},{},{:.3},{:.3},{:.3},{:.3},{:.3}\n",
            r.configuration, r.iteration_count, r.mean_ms, r.stddev_ms, r.p50_ms, r.p95_ms, r.p99_ms
        ));
    }
    fs::write(path, out)?;
    Ok(())
}

fn write_wire_csv(path: &Path, rows: &[WireRow]) -> anyhow::Result<()> {
    let mut out = String::from("configuration,messageA_bytes,messageB_bytes,finished_bytes,total_bytes\n");
    for r in rows {
        let total = r.message_a_bytes + r.message_b_bytes + r.finished_bytes;
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            r.configuration, r.message_a_bytes, r.message_b_bytes, r.finished_bytes, total
        ));
    }
    fs::write(path, out)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let iterations = env_usize("BENCH_ITERATIONS", 1000);
    let warmup = env_usize("BENCH_WARMUP", 10);
    info!(iterations, warmup, "starting handshake benchmark");

    let classical = run_scenario(
        Strategy::ClassicOnly,
        CryptoPolicy::default(),
        HandshakePolicy::default(),
        ClassicalProvider::new,
        iterations,
        warmup,
    )?;
    info!("classical configuration complete");

    let pqc = run_scenario(
        Strategy::PqcOnly,
        CryptoPolicy::default(),
        HandshakePolicy::default(),
        PqcProvider::new,
        iterations,
        warmup,
    )?;
    info!("pqc configuration complete");

    let hybrid_policy = CryptoPolicy {
        advertise_hybrid: true,
        allow_experimental_hybrid: true,
        ..CryptoPolicy::default()
    };
    let hybrid = run_scenario(
        Strategy::HybridPreferred,
        hybrid_policy,
        HandshakePolicy::default(),
        HybridProvider::new,
        iterations,
        warmup,
    )?;
    info!("hybrid configuration complete");

    let bench_rows = vec![
        summarize("classical", &classical.wall_ms),
        summarize("pqc", &pqc.wall_ms),
        summarize("hybrid", &hybrid.wall_ms),
    ];
    let rtt_rows = vec![
        summarize("classical", &classical.rtt_ms),
        summarize("pqc", &pqc.rtt_ms),
        summarize("hybrid", &hybrid.rtt_ms),
    ];
    let wire_rows = vec![
        WireRow {
            configuration: "classical",
            message_a_bytes: classical.wire.message_a_wire_bytes,
            message_b_bytes: classical.wire.message_b_wire_bytes,
            finished_bytes: classical.wire.finished_wire_bytes,
        },
        WireRow {
            configuration: "pqc",
            message_a_bytes: pqc.wire.message_a_wire_bytes,
            message_b_bytes: pqc.wire.message_b_wire_bytes,
            finished_bytes: pqc.wire.finished_wire_bytes,
        },
        WireRow {
            configuration: "hybrid",
            message_a_bytes: hybrid.wire.message_a_wire_bytes,
            message_b_bytes: hybrid.wire.message_b_wire_bytes,
            finished_bytes: hybrid.wire.finished_wire_bytes,
        },
    ];

    let date = chrono::Local::now().format("%Y-%m-%d");
    write_summary_csv(Path::new(&format!("handshake_bench_{date}.csv")), &bench_rows)?;
    write_summary_csv(Path::new(&format!("handshake_rtt_{date}.csv")), &rtt_rows)?;
    write_wire_csv(Path::new(&format!("handshake_wire_{date}.csv")), &wire_rows)?;

    info!("benchmark artifacts written");
    Ok(())
}
