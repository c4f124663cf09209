use std::path::Path;

use crate::runner::BenchmarkResult;

/// A complete baseline containing results from all scenes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

/// Load a baseline from a JSON file. Returns None if the file is missing or
/// was written by an incompatible version.
pub fn load_baseline(path: &Path) -> Option<Baseline> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(baseline) => Some(baseline),
        Err(err) => {
            log::warn!("Ignoring unreadable baseline {}: {err}", path.display());
            None
        }
    }
}

/// Save a baseline to a JSON file.
pub fn save_baseline(path: &Path, baseline: &Baseline) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(baseline).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// Compare mean round times against a baseline. Returns (scene name,
/// percent change) for every scene slower than the threshold. Scenes missing
/// from either side are skipped.
pub fn compare(
    current: &[BenchmarkResult],
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<(String, f64)> {
    let mut regressions = Vec::new();

    for result in current {
        if let Some(base) = baseline
            .results
            .iter()
            .find(|b| b.scene_name == result.scene_name)
        {
            if base.timings.mean_ms <= 0.0 {
                continue;
            }
            let pct_change =
                (result.timings.mean_ms - base.timings.mean_ms) / base.timings.mean_ms * 100.0;
            if pct_change > threshold_pct {
                regressions.push((result.scene_name.clone(), pct_change));
            }
        }
    }

    regressions
}

/// Format results as a markdown summary table.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    out.push_str("| Scene | Cells | Chunks | Destroyed | Objects | Ticks | Mean (ms) | Median (ms) | P95 (ms) | P99 (ms) | Min (ms) | Max (ms) |\n");
    out.push_str("|-------|-------|--------|-----------|---------|-------|-----------|-------------|----------|----------|----------|----------|\n");

    for r in results {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} |\n",
            r.scene_name,
            r.solid_cells,
            r.chunk_count,
            r.cells_destroyed,
            r.objects_created,
            r.ticks,
            r.timings.mean_ms,
            r.timings.median_ms,
            r.timings.p95_ms,
            r.timings.p99_ms,
            r.timings.min_ms,
            r.timings.max_ms,
        ));
    }

    out
}

/// Format a comparison report showing regressions.
pub fn format_comparison(regressions: &[(String, f64)], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!(
            "All scenes within {:.0}% threshold. No regressions detected.\n",
            threshold_pct
        );
    }

    let mut out = String::new();
    out.push_str(&format!(
        "REGRESSIONS DETECTED (>{:.0}% threshold):\n",
        threshold_pct
    ));
    for (scene, pct) in regressions {
        out.push_str(&format!("  - {}: +{:.1}%\n", scene, pct));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::compute_timings;

    fn result(name: &str, times: &[f64]) -> BenchmarkResult {
        BenchmarkResult {
            scene_name: name.to_string(),
            solid_cells: 100,
            chunk_count: 1,
            rounds: times.len() as u32,
            cells_destroyed: 10,
            objects_created: 1,
            oversized_groups: 0,
            ticks: 3,
            timings: compute_timings(times),
        }
    }

    #[test]
    fn test_compare_flags_regressions() {
        let baseline = Baseline {
            timestamp: "bench-0".into(),
            results: vec![result("pillar", &[1.0]), result("slab", &[2.0])],
        };
        let current = vec![result("pillar", &[1.05]), result("slab", &[3.0]), result("new", &[9.0])];
        let regressions = compare(&current, &baseline, 10.0);
        assert_eq!(regressions.len(), 1);
        assert_eq!(regressions[0].0, "slab");
        assert!((regressions[0].1 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_json_shape() {
        let baseline = Baseline {
            timestamp: "bench-1".into(),
            results: vec![result("tower", &[1.0, 2.0])],
        };
        let json = serde_json::to_string(&baseline).expect("serializes");
        let back: Baseline = serde_json::from_str(&json).expect("parses");
        assert_eq!(back.results[0].scene_name, "tower");
        assert_eq!(back.results[0].timings.max_ms, 2.0);
    }

    #[test]
    fn test_markdown_has_row_per_scene() {
        let table = format_markdown(&[result("pillar", &[1.0]), result("bridge", &[1.0])]);
        assert_eq!(table.lines().count(), 4);
        assert!(table.contains("| bridge |"));
    }

    #[test]
    fn test_missing_baseline_is_none() {
        assert!(load_baseline(Path::new("/nonexistent/rubble-baseline.json")).is_none());
    }
}
