//! Build information module.
//!
//! Compile-time details (version, commit, rustc) for `--version` and the
//! startup debug line.

#[cfg(feature = "build-info")]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get formatted version information.
///
/// Output:
/// ```text
/// nsc-user-creator 0.1.0 (x86_64-unknown-linux-gnu)
/// Built: Fri, 16 Oct 2026 12:34:56 +0000
/// Commit: a1b2c3d
/// Rustc: rustc 1.80.0
/// ```
#[cfg(feature = "build-info")]
pub fn version_info() -> String {
    format!(
        "{} {} ({})\nBuilt: {}\nCommit: {}\nRustc: {}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::TARGET,
        built_info::BUILT_TIME_UTC,
        built_info::GIT_COMMIT_HASH.unwrap_or("unknown"),
        built_info::RUSTC_VERSION
    )
}

/// Get short version string (package version only).
#[cfg(feature = "build-info")]
pub fn version_short() -> &'static str {
    built_info::PKG_VERSION
}

/// Get package name.
#[cfg(feature = "build-info")]
pub fn package_name() -> &'static str {
    built_info::PKG_NAME
}

#[cfg(not(feature = "build-info"))]
pub fn version_info() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(not(feature = "build-info"))]
pub fn version_short() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(not(feature = "build-info"))]
pub fn package_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
