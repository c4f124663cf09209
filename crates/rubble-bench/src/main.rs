use std::path::PathBuf;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use rubble_bench::report;
use rubble_bench::runner::BenchmarkRunner;
use rubble_bench::scenes;

fn usage() {
    eprintln!("Usage: bench-runner [OPTIONS]");
    eprintln!("  --baseline <path>              Load baseline JSON for comparison");
    eprintln!("  --output <path>                Save current results as JSON baseline");
    eprintln!("  --regression-threshold <pct>   Regression threshold percentage (default: 10)");
    eprintln!("  --rounds <n>                   Rounds per scene (default: 20)");
    eprintln!("  --scene <name>                 Run only the named scene");
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v,
        None => {
            eprintln!("Missing value for {flag}");
            process::exit(1);
        }
    }
}

fn parse<T: std::str::FromStr>(raw: &str, flag: &str) -> T {
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("Invalid {flag} value: {raw}");
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut baseline_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut regression_threshold = 10.0f64;
    let mut rounds = 20u32;
    let mut only_scene: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--baseline" => {
                i += 1;
                baseline_path = Some(PathBuf::from(value(&args, i, "--baseline")));
            }
            "--output" => {
                i += 1;
                output_path = Some(PathBuf::from(value(&args, i, "--output")));
            }
            "--regression-threshold" => {
                i += 1;
                regression_threshold =
                    parse(value(&args, i, "--regression-threshold"), "--regression-threshold");
            }
            "--rounds" => {
                i += 1;
                rounds = parse(value(&args, i, "--rounds"), "--rounds");
            }
            "--scene" => {
                i += 1;
                only_scene = Some(value(&args, i, "--scene").to_string());
            }
            "--help" | "-h" => {
                usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let runner = match BenchmarkRunner::new(rounds) {
        Ok(runner) => runner,
        Err(err) => {
            log::error!("{err}");
            process::exit(1);
        }
    };

    let scene_configs: Vec<_> = scenes::standard_scenes()
        .into_iter()
        .filter(|s| only_scene.as_deref().map_or(true, |name| s.name == name))
        .collect();
    if scene_configs.is_empty() {
        log::error!("No scene matches {:?}", only_scene);
        process::exit(1);
    }

    let mut results = Vec::new();
    for config in &scene_configs {
        match runner.run_scene(config) {
            Ok(result) => results.push(result),
            Err(err) => {
                log::error!("Scene '{}' failed: {err}", config.name);
                process::exit(1);
            }
        }
    }

    println!("\n## Benchmark Results\n");
    println!("{}", report::format_markdown(&results));

    if let Some(ref path) = output_path {
        let baseline = report::Baseline {
            timestamp: timestamp(),
            results: results.clone(),
        };
        if let Err(err) = report::save_baseline(path, &baseline) {
            log::error!("Failed to save baseline to {}: {err}", path.display());
            process::exit(1);
        }
        log::info!("Saved baseline to {}", path.display());
    }

    if let Some(ref path) = baseline_path {
        if let Some(baseline) = report::load_baseline(path) {
            let regressions = report::compare(&results, &baseline, regression_threshold);
            println!(
                "{}",
                report::format_comparison(&regressions, regression_threshold)
            );
            if !regressions.is_empty() {
                eprintln!(
                    "ERROR: {} regressions detected, exiting with code 1",
                    regressions.len()
                );
                process::exit(1);
            }
        } else {
            log::warn!("Baseline file not found: {}", path.display());
        }
    }

    log::info!("Benchmark complete.");
}

/// Seconds since the epoch, tagged for the baseline file.
fn timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("bench-{secs}")
}
