use std::time::Instant;

use clap::Parser;
use hdrhistogram::Histogram;
use rand::Rng;
use tracing::info;

use redis_quicklist::config::QuickListConfig;
use redis_quicklist::{Direction, QuickList, Result, Where};

#[derive(Parser, Clone)]
struct BenchmarkConfig {
    /// toml or json file with list-max-listpack-size and friends
    #[arg(long)]
    pub config: Option<String>,
    /// overrides list_max_listpack_size from the config file
    #[arg(short, long, allow_negative_numbers = true)]
    pub fill: Option<i32>,
    /// overrides list_compress_depth from the config file
    #[arg(short, long)]
    pub compress: Option<i32>,
    #[arg(short, long, default_value_t = 100000)]
    pub entries: u32,
    #[arg(short, long, default_value_t = 32)]
    pub data_size: u32,
    #[arg(short, long, num_args = 1..)]
    pub tests: Vec<String>,
}

fn gen_benchmark_data(count: u32) -> Vec<u8> {
    let mut state: u32 = 1234;
    let mut data = Vec::with_capacity(count as usize);

    for _ in 0..count {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push(b'0' + ((state >> 16) & 63) as u8);
    }
    data
}

fn test_is_selected(tests: &[String], name: &str) -> bool {
    tests.is_empty() || tests.iter().any(|t| t == name)
}

fn new_histogram() -> Result<Histogram<u64>> {
    Ok(Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3)?)
}

fn report(name: &str, ops: u32, elapsed_ns: u128, hist: &Histogram<u64>, ql: &QuickList) {
    let secs = elapsed_ns as f64 / 1e9;
    info!("======{}======", name.to_uppercase());
    info!(" {} operations completed in {:.3} seconds", ops, secs);
    info!(" {:.2} operations per second", ops as f64 / secs.max(f64::EPSILON));
    info!(" list holds {} entries in {} nodes", ql.count(), ql.len());
    info!(
        " latency (ns): min {} p50 {} p95 {} p99 {} max {}",
        hist.min(),
        hist.value_at_quantile(0.5),
        hist.value_at_quantile(0.95),
        hist.value_at_quantile(0.99),
        hist.max()
    );
}

fn fill_list(ql: &mut QuickList, config: &BenchmarkConfig, data: &[u8]) -> Result<()> {
    while ql.count() < config.entries as u64 {
        ql.push_tail(data)?;
    }
    Ok(())
}

fn bench_push(ql: &mut QuickList, config: &BenchmarkConfig, data: &[u8]) -> Result<()> {
    let mut hist = new_histogram()?;
    let st = Instant::now();
    for i in 0..config.entries {
        let where_ = if i % 2 == 0 { Where::Tail } else { Where::Head };
        let t = Instant::now();
        ql.push(data, where_)?;
        hist.record(t.elapsed().as_nanos() as u64)?;
    }
    report("push", config.entries, st.elapsed().as_nanos(), &hist, ql);
    Ok(())
}

fn bench_index(ql: &mut QuickList, config: &BenchmarkConfig, data: &[u8]) -> Result<()> {
    fill_list(ql, config, data)?;
    let mut rng = rand::rng();
    let mut hist = new_histogram()?;
    let count = ql.count() as i64;
    if count == 0 {
        return Ok(());
    }
    let st = Instant::now();
    for _ in 0..config.entries {
        let idx = rng.random_range(-count..count);
        let t = Instant::now();
        ql.get(idx)?;
        hist.record(t.elapsed().as_nanos() as u64)?;
    }
    report("index", config.entries, st.elapsed().as_nanos(), &hist, ql);
    Ok(())
}

fn bench_iter(ql: &mut QuickList, config: &BenchmarkConfig, data: &[u8]) -> Result<()> {
    fill_list(ql, config, data)?;
    let mut hist = new_histogram()?;
    let mut seen = 0u32;
    let st = Instant::now();
    let mut t = Instant::now();
    for entry in ql.iter(Direction::StartHead) {
        entry?;
        hist.record(t.elapsed().as_nanos() as u64)?;
        seen += 1;
        t = Instant::now();
    }
    report("iter", seen, st.elapsed().as_nanos(), &hist, ql);
    Ok(())
}

fn bench_pop(ql: &mut QuickList, config: &BenchmarkConfig, data: &[u8]) -> Result<()> {
    fill_list(ql, config, data)?;
    let mut hist = new_histogram()?;
    let mut popped = 0u32;
    let st = Instant::now();
    loop {
        let where_ = if popped % 2 == 0 { Where::Head } else { Where::Tail };
        let t = Instant::now();
        if ql.pop(where_)?.is_none() {
            break;
        }
        hist.record(t.elapsed().as_nanos() as u64)?;
        popped += 1;
    }
    report("pop", popped, st.elapsed().as_nanos(), &hist, ql);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::try_init()?;
    let config = BenchmarkConfig::parse();
    let mut list_config = QuickListConfig::new(config.config.as_deref());
    if let Some(fill) = config.fill {
        list_config.list_max_listpack_size = fill;
    }
    if let Some(compress) = config.compress {
        list_config.list_compress_depth = compress;
    }
    info!("{:?}", list_config);

    let data = gen_benchmark_data(config.data_size);
    let tests = &config.tests;
    if test_is_selected(tests, "push") {
        bench_push(&mut QuickList::from_config(&list_config), &config, &data)?;
    }
    if test_is_selected(tests, "index") {
        bench_index(&mut QuickList::from_config(&list_config), &config, &data)?;
    }
    if test_is_selected(tests, "iter") {
        bench_iter(&mut QuickList::from_config(&list_config), &config, &data)?;
    }
    if test_is_selected(tests, "pop") {
        bench_pop(&mut QuickList::from_config(&list_config), &config, &data)?;
    }

    Ok(())
}
