//! Build metadata for `muninn --version` and startup logs.
//!
//! `build.rs` asks vergen for the git branch, commit and dirty flag. Builds
//! from a source tarball have none of these and report "unknown".

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

/// Full commit hash; see [`short_sha`] for the display form.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// True when the build had uncommitted changes.
pub fn git_dirty() -> bool {
    matches!(option_env!("VERGEN_GIT_DIRTY"), Some("true"))
}

/// The first seven characters of the commit hash.
pub fn short_sha() -> &'static str {
    GIT_SHA.get(..7).unwrap_or(GIT_SHA)
}

/// `0.1.0+main.1a2b3c4`, with `.dirty` appended for uncommitted builds.
pub fn version_string() -> String {
    let mut version = format!("{PKG_VERSION}+{GIT_BRANCH}.{}", short_sha());
    if git_dirty() {
        version.push_str(".dirty");
    }
    version
}
