//! Build script for symtree-core
//!
//! This script checks the toolchain before compilation:
//! - Minimum Rust version (addr2line and gimli need Rust 1.81.0+)
//!
//! ## Requirements
//!
//! - **Rust**: 1.81.0 or newer

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    // Check minimum Rust version
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 81, 0);

        if rustc_version < min_rust_version {
            panic!(
                "symtree-core requires Rust {} or newer, found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }
}
