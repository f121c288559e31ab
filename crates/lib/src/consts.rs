pub const APP_NAME: &str = "bslua";

/// Build description loaded from the invocation directory.
pub const DEFAULT_BUILD_FILE: &str = "BSFile";

/// Project description searched from the filesystem root down to the invocation directory.
pub const DEFAULT_PROJECT_FILE: &str = "BSProject";

/// Per-directory dependency cache file.
pub const DEPS_CACHE_FILE: &str = ".bsdeps.json";

/// Bumped whenever the dependency cache layout changes.
pub const DEPS_CACHE_VERSION: u32 = 1;

/// Lua function invoked when no action is named on the command line.
pub const DEFAULT_ACTION: &str = "default";

/// Upper bound on substitution rounds before a template is considered self-referential.
pub const MAX_SUBSTITUTION_ROUNDS: usize = 32;
