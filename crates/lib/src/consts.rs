/// Default prefix of the per-process extraction directory
pub const EXTRACT_DIR_PREFIX: &str = "natpack";

/// Overrides the base directory the extraction directory is created in
pub const TMPDIR_ENV: &str = "NATPACK_TMPDIR";

/// Overrides the cleanup policy (`auto`, `immediate` or `deferred`)
pub const CLEANUP_ENV: &str = "NATPACK_CLEANUP";

/// Shortest filename a resource path may end with
pub const MIN_FILENAME_LEN: usize = 3;
