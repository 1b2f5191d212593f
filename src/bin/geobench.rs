use geobench::{BenchConfig, BenchRunner};
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        let program = args.first().map_or("geobench", String::as_str);
        eprintln!("usage: {} <config.(toml|json)> <points-file>", program);
        return Ok(ExitCode::from(2));
    }

    let config = BenchConfig::load(&args[1])?;
    let runner = BenchRunner::new(config)?;

    let mut points = BufReader::with_capacity(1 << 16, File::open(&args[2])?);
    let report = runner.run(&mut points)?;

    for partition in &report.partitions {
        println!(
            "{}: {} docs in {} segments ({:.1} sec)",
            partition.name, partition.docs, partition.segments, partition.ingest_secs
        );
    }
    let best = report.throughput.best;
    println!("BEST M hits/sec: {:.2}", best.million_hits_per_second());
    println!("BEST QPS: {:.2}", best.queries_per_second);

    Ok(ExitCode::SUCCESS)
}
