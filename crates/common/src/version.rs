use std::fmt;

use serde::Serialize;

/// Build metadata captured at compile time
///
/// Populated by [`build_info!`](crate::build_info) in the crate that invokes it,
/// from the variables its build script reports.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub repo_version: &'static str,
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    pub build_target: &'static str,
    pub build_host: &'static str,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version: {}", self.version)?;
        writeln!(f, "repo version: {}", self.repo_version)?;
        writeln!(f, "profile: {}", self.build_profile)?;
        writeln!(f, "features: {}", self.build_features)?;
        writeln!(f, "built at: {}", self.build_timestamp)?;
        writeln!(f, "rustc: {}", self.rust_version)?;
        write!(f, "target: {} (host {})", self.build_target, self.build_host)
    }
}

#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            repo_version: option_env!("REPO_VERSION").unwrap_or("unknown"),
            build_profile: option_env!("BUILD_PROFILE").unwrap_or("unknown"),
            build_features: option_env!("BUILD_FEATURES").unwrap_or("none"),
            build_timestamp: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            rust_version: option_env!("RUST_VERSION").unwrap_or("unknown"),
            build_target: option_env!("BUILD_TARGET").unwrap_or("unknown"),
            build_host: option_env!("BUILD_HOST").unwrap_or("unknown"),
        }
    };
}
