//! Version banner.

/// Returns the package name, semantic version, and git commit (when the
/// binary was built with `BOXINIT_GIT_SHA` set), e.g. `boxinit 0.1.0 (a1b2c3d)`.
pub fn banner() -> String {
    match option_env!("BOXINIT_GIT_SHA") {
        Some(sha) if !sha.is_empty() => {
            format!("{} {} ({})", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), sha)
        }
        _ => format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    }
}
