//! Build script for jac-compiler.
//!
//! Locates the jac-runtime static library built as this crate's build
//! dependency so it can be embedded into the compiler binary/library and
//! later extracted at compile-time to link against generated object code.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    if env::var("CARGO_FEATURE_DOCSRS").is_ok() {
        // docs.rs builds skip runtime embedding entirely.
        return;
    }

    verify_runtime_version();

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // OUT_DIR looks like target/<profile>/build/jac-compiler-<hash>/out.
    // Walk back up to the profile directory where cargo places the
    // build-dependency's staticlib (or its deps/ subdirectory).
    let target_dir = out_dir
        .parent()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .expect("could not locate target directory from OUT_DIR");

    let direct_lib = target_dir.join("libjac_runtime.a");
    let runtime_lib = if direct_lib.exists() {
        direct_lib
    } else {
        let deps_dir = target_dir.join("deps");
        find_runtime_in_deps(&deps_dir).unwrap_or_else(|| {
            panic!(
                "jac-runtime static library not found.\nLooked in: {}\nAnd deps: {}\nOUT_DIR was: {}",
                direct_lib.display(),
                deps_dir.display(),
                out_dir.display()
            )
        })
    };

    println!(
        "cargo:rustc-env=JAC_RUNTIME_LIB_PATH={}",
        runtime_lib.display()
    );
    println!("cargo:rerun-if-changed={}", runtime_lib.display());
}

fn find_runtime_in_deps(deps_dir: &PathBuf) -> Option<PathBuf> {
    if !deps_dir.exists() {
        return None;
    }
    fs::read_dir(deps_dir).ok()?.find_map(|entry| {
        let entry = entry.ok()?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with("libjac_runtime") && name_str.ends_with(".a") {
            Some(entry.path())
        } else {
            None
        }
    })
}

/// The embedded runtime must be built from the exact same workspace
/// version as the compiler, otherwise the ABI the compiler emits calls
/// to may not match what the embedded `.a` actually exports.
fn verify_runtime_version() {
    let compiler_version = env!("CARGO_PKG_VERSION");
    let cargo_toml = fs::read_to_string("Cargo.toml").expect("failed to read Cargo.toml");

    let runtime_version = cargo_toml
        .lines()
        .find(|line| line.contains("jac-runtime") && line.contains("version"))
        .and_then(|line| line.split("version = \"").nth(1))
        .and_then(|s| s.split('"').next())
        .expect("could not find jac-runtime version in Cargo.toml");

    let runtime_version = runtime_version.trim_start_matches('=');

    if compiler_version != runtime_version {
        panic!(
            "version mismatch: jac-compiler {compiler_version} vs jac-runtime {runtime_version}; \
             the embedded runtime must be pinned to the exact compiler version"
        );
    }
}
