//! Static registry of functions and settings shipped by optional
//! extensions. Consulted when a lookup misses so the diagnostic can point
//! at the extension to install.
//!
//! Both tables are sorted by name and binary-searched; lookups are
//! case-insensitive.

pub struct ExtensionEntry {
    pub name: &'static str,
    pub extension: &'static str,
}

macro_rules! ext {
    ($name:literal, $extension:literal) => {
        ExtensionEntry {
            name: $name,
            extension: $extension,
        }
    };
}

pub static EXTENSION_FUNCTIONS: &[ExtensionEntry] = &[
    ext!("dbgen", "tpch"),
    ext!("dsdgen", "tpcds"),
    ext!("from_substrait", "substrait"),
    ext!("fuzzyduck", "sqlsmith"),
    ext!("get_substrait", "substrait"),
    ext!("get_substrait_json", "substrait"),
    ext!("h3_cell_to_lat", "h3"),
    ext!("h3_cell_to_lng", "h3"),
    ext!("h3_latlng", "h3"),
    ext!("h3_latlng_to_cell", "h3"),
    ext!("iceberg_scan", "iceberg"),
    ext!("icu_calendar_names", "icu"),
    ext!("icu_sort_key", "icu"),
    ext!("json_extract", "json"),
    ext!("json_serialize_sql", "json"),
    ext!("json_structure", "json"),
    ext!("make_timestamptz", "icu"),
    ext!("parquet_metadata", "parquet"),
    ext!("parquet_scan", "parquet"),
    ext!("parquet_schema", "parquet"),
    ext!("pg_clear_cache", "postgres_scanner"),
    ext!("postgres_attach", "postgres_scanner"),
    ext!("postgres_scan", "postgres_scanner"),
    ext!("postgres_scan_pushdown", "postgres_scanner"),
    ext!("read_json", "json"),
    ext!("read_json_auto", "json"),
    ext!("read_json_objects", "json"),
    ext!("read_parquet", "parquet"),
    ext!("scan_arrow_ipc", "arrow"),
    ext!("sqlite_attach", "sqlite_scanner"),
    ext!("sqlite_scan", "sqlite_scanner"),
    ext!("st_area", "spatial"),
    ext!("st_asgeojson", "spatial"),
    ext!("st_astext", "spatial"),
    ext!("st_contains", "spatial"),
    ext!("st_distance", "spatial"),
    ext!("st_point", "spatial"),
    ext!("to_arrow_ipc", "arrow"),
    ext!("tpcds", "tpcds"),
    ext!("tpch", "tpch"),
    ext!("tpch_answers", "tpch"),
    ext!("tpch_queries", "tpch"),
];

pub static EXTENSION_SETTINGS: &[ExtensionEntry] = &[
    ext!("binary_as_string", "parquet"),
    ext!("calendar", "icu"),
    ext!("http_retries", "httpfs"),
    ext!("http_retry_backoff", "httpfs"),
    ext!("http_timeout", "httpfs"),
    ext!("pg_debug_show_queries", "postgres_scanner"),
    ext!("pg_use_binary_copy", "postgres_scanner"),
    ext!("s3_access_key_id", "httpfs"),
    ext!("s3_endpoint", "httpfs"),
    ext!("s3_region", "httpfs"),
    ext!("s3_secret_access_key", "httpfs"),
    ext!("s3_session_token", "httpfs"),
    ext!("s3_url_style", "httpfs"),
    ext!("s3_use_ssl", "httpfs"),
    ext!("sqlite_all_varchar", "sqlite_scanner"),
    ext!("timezone", "icu"),
];

fn find_extension_generic(name: &str, entries: &[ExtensionEntry]) -> &'static str {
    let lcase = name.to_lowercase();
    match entries.binary_search_by(|entry| entry.name.cmp(lcase.as_str())) {
        Ok(idx) => entries[idx].extension,
        Err(_) => "",
    }
}

/// Extension shipping a function of this name, or `""`.
pub fn find_extension_for_function(name: &str) -> &'static str {
    find_extension_generic(name, EXTENSION_FUNCTIONS)
}

/// Extension shipping a setting of this name, or `""`.
pub fn find_extension_for_setting(name: &str) -> &'static str {
    find_extension_generic(name, EXTENSION_SETTINGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted() {
        for table in [EXTENSION_FUNCTIONS, EXTENSION_SETTINGS] {
            for pair in table.windows(2) {
                assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
            }
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(find_extension_for_function("h3_latlng"), "h3");
        assert_eq!(find_extension_for_function("H3_LatLng"), "h3");
        assert_eq!(find_extension_for_function("no_such_function"), "");
        assert_eq!(find_extension_for_setting("s3_region"), "httpfs");
        assert_eq!(find_extension_for_setting("S3_REGION"), "httpfs");
        assert_eq!(find_extension_for_setting("nope"), "");
    }
}
