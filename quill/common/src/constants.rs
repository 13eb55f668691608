/// Name of the schema created in every freshly attached catalog.
pub const DEFAULT_SCHEMA: &str = "main";

/// Reserved name of the process-wide catalog holding built-in functions and
/// types. Read-only once populated.
pub const SYSTEM_CATALOG: &str = "system";

/// Reserved name of the session-local catalog. Its entries die with the
/// session.
pub const TEMP_CATALOG: &str = "temp";

/// Sentinel for "no catalog specified" in partially qualified names.
pub const INVALID_CATALOG: &str = "";

/// Sentinel for "no schema specified" in partially qualified names.
pub const INVALID_SCHEMA: &str = "";
