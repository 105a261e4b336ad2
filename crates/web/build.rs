//! Build script for the web crate.
//!
//! Hashes the fingerprinted static assets into the `ASSET_HASH` compile-time
//! env var so templates can append a cache-busting query parameter while
//! `/static` is served with immutable cache headers.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Assets whose content feeds the version hash.
const ASSETS: [&str; 3] = [
    "static/css/main.css",
    "static/js/charts.js",
    "static/js/cart-badge.js",
];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");

    let mut hasher = Sha256::new();
    let mut missing = false;
    for asset in ASSETS {
        let path = Path::new(&manifest_dir).join(asset);
        println!("cargo:rerun-if-changed={}", path.display());

        match fs::read(&path) {
            Ok(content) => hasher.update(&content),
            Err(e) => {
                // Assets may be absent in fresh checkouts; keep the build
                // going with a placeholder version.
                println!("cargo:warning=Could not read {asset}: {e}");
                missing = true;
            }
        }
    }

    if missing {
        println!("cargo:rustc-env=ASSET_HASH=dev");
    } else {
        let digest = format!("{:x}", hasher.finalize());
        let short = digest.get(..8).unwrap_or(&digest);
        println!("cargo:rustc-env=ASSET_HASH={short}");
    }
}
