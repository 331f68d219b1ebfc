//! Stamps absound-ab with the identity logged on startup
//!
//! Exposes `GIT_HASH`, `BUILD_TIMESTAMP` and `BUILD_PROFILE` to `env!`.

use std::process::Command;

/// Short commit of the checkout, or "unknown" outside a git tree
fn commit_hash() -> String {
    let output = match Command::new("git").args(["rev-parse", "--short=8", "HEAD"]).output() {
        Ok(output) if output.status.success() => output,
        _ => return "unknown".to_string(),
    };
    String::from_utf8(output.stdout)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

fn main() {
    let stamped_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    for (name, value) in [
        ("GIT_HASH", commit_hash()),
        ("BUILD_TIMESTAMP", stamped_at),
        ("BUILD_PROFILE", profile),
    ] {
        println!("cargo:rustc-env={}={}", name, value);
    }

    // Track HEAD so a new commit restamps the binary
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}
