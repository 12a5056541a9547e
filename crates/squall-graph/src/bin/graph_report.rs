//! Offline memory report for a persisted computation graph.
//!
//! Usage: graph_report <graph.json> [--detailed]

use std::path::Path;
use std::process::ExitCode;

use squall_graph::memory::count_memory_from_path;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let detailed = args.iter().any(|a| a == "--detailed");
    let path = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => path,
        None => {
            eprintln!("usage: graph_report <graph.json> [--detailed]");
            return ExitCode::FAILURE;
        }
    };

    match count_memory_from_path(Path::new(path), detailed) {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
