//! Reports its argument vector and library path as one JSON object.
//!
//! The test runner installs this binary both as a stand-in interpreter and
//! as a directly launched target, then compares what it received byte for
//! byte against what the stub was asked to pass through.

use std::env;

fn main() {
    let argv: Vec<String> = env::args().collect();
    let library_path = env::var("LD_LIBRARY_PATH").ok();
    println!(
        "{}",
        serde_json::json!({
            "argv": argv,
            "library_path": library_path,
        })
    );
}
