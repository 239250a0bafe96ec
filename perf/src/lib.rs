// ─── Statistics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub median: u64,
    pub stddev: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub count: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BenchResult {
    pub name: String,
    pub unit: String,
    pub stats: Stats,
}

pub fn compute_stats(samples: &mut [u64]) -> Stats {
    assert!(!samples.is_empty(), "cannot compute stats on empty samples");
    samples.sort_unstable();

    let count = samples.len();
    let sum: u64 = samples.iter().sum();
    let mean = sum as f64 / count as f64;

    let variance = samples
        .iter()
        .map(|&x| {
            let diff = x as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / count as f64;

    Stats {
        min: samples[0],
        max: samples[count - 1],
        mean,
        median: percentile_sorted(samples, 50.0),
        stddev: variance.sqrt(),
        p50: percentile_sorted(samples, 50.0),
        p90: percentile_sorted(samples, 90.0),
        p99: percentile_sorted(samples, 99.0),
        p999: percentile_sorted(samples, 99.9),
        count,
    }
}

fn percentile_sorted(sorted: &[u64], pct: f64) -> u64 {
    let len = sorted.len();
    if len == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0 * len as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(len - 1)]
}

// ─── Measurement Harness ────────────────────────────────────────────────────

/// Measures `f` in fixed-size batches and reports per-op nanoseconds.
///
/// Timing uses [`mono_now_ns`], the clock the cycle loop paces against.
/// Every batch runs identically; the first `warmup_batches` are timed and
/// then thrown away, so the retained samples start from a warm cache. Each
/// retained batch contributes one ceiling-divided per-op sample: the
/// percentiles describe batch-to-batch spread, not individual calls.
pub fn measure_batched<F: FnMut()>(
    name: &str,
    batches: usize,
    batch_size: usize,
    warmup_batches: usize,
    mut f: F,
) -> BenchResult {
    let mut samples = Vec::with_capacity(batches);
    for batch in 0..warmup_batches + batches {
        let start = mono_now_ns();
        for _ in 0..batch_size {
            f();
        }
        let elapsed = mono_now_ns().saturating_sub(start);
        if batch >= warmup_batches {
            samples.push(elapsed.div_ceil(batch_size as u64).max(1));
        }
    }

    BenchResult {
        name: name.to_string(),
        unit: "ns/op".to_string(),
        stats: compute_stats(&mut samples),
    }
}

// ─── Clock ──────────────────────────────────────────────────────────────────

/// Monotonic nanoseconds from the same OS clock the cycle loop paces against.
#[inline(always)]
pub fn mono_now_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    (ts.tv_sec as u64) * 1_000_000_000 + ts.tv_nsec as u64
}

// ─── Display ────────────────────────────────────────────────────────────────

pub fn print_table_header() {
    println!(
        "  {:<36} {:>8} {:>8} {:>8} {:>8} {:>8}  unit",
        "Benchmark", "min", "p50", "p90", "p99", "max",
    );
    println!("  {}", "─".repeat(88));
}

pub fn print_result_row(r: &BenchResult) {
    println!(
        "  {:<36} {:>8} {:>8} {:>8} {:>8} {:>8}  {}",
        r.name, r.stats.min, r.stats.p50, r.stats.p90, r.stats.p99, r.stats.max, r.unit,
    );
}

pub fn section_header(title: &str) {
    println!("\n{}", "─".repeat(88));
    println!("  {title}");
    println!("{}\n", "─".repeat(88));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_uniform_samples() {
        let mut samples = vec![5u64; 100];
        let s = compute_stats(&mut samples);
        assert_eq!(s.min, 5);
        assert_eq!(s.max, 5);
        assert_eq!(s.p99, 5);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.stddev, 0.0);
    }

    #[test]
    fn percentiles_of_a_ramp() {
        let mut samples: Vec<u64> = (1..=100).collect();
        let s = compute_stats(&mut samples);
        assert_eq!(s.min, 1);
        assert_eq!(s.max, 100);
        assert_eq!(s.p50, 50);
        assert_eq!(s.p90, 90);
        assert_eq!(s.p99, 99);
    }

    #[test]
    fn mono_clock_is_monotonic() {
        let a = mono_now_ns();
        let b = mono_now_ns();
        assert!(b >= a);
    }

    #[test]
    fn measure_batched_keeps_only_post_warmup_samples() {
        let mut calls = 0u64;
        let r = measure_batched("noop", 8, 16, 4, || calls += 1);
        assert_eq!(calls, (8 + 4) * 16, "warmup batches still run the op");
        assert_eq!(r.stats.count, 8, "only post-warmup batches are sampled");
        assert!(r.stats.min >= 1, "per-op samples are clamped to 1ns");
        assert_eq!(r.unit, "ns/op");
    }
}
