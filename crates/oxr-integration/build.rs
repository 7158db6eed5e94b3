use std::env;
use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR environment variable not set"),
    );
    let log_source = manifest_dir.join("csrc").join("core_log.c");

    // Variadic log callback for cores
    cc::Build::new()
        .file(&log_source)
        .warnings(true)
        .compile("oxr_core_log");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", log_source.display());
}
