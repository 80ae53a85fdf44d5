//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::str::FromStr;
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Store used when neither `DATABASE_URL` nor `DB_URL` is set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://harvard.db";

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        // Working directory first, then the crate root (cargo run from a subdirectory).
        if dotenv::dotenv().is_err() {
            let candidate = format!("{}/.env", env!("CARGO_MANIFEST_DIR"));
            let _ = dotenv::from_filename(candidate);
        }
    });
}

/// Common bootstrap for CLI binaries: dotenv once, then a redacted configuration snapshot.
pub fn bootstrap_cli(bin_name: &str) {
    init_env();
    let _ = preflight_check(
        bin_name,
        &[],
        &[
            "HARVARD_API_KEY",
            "HARVARD_BASE_URL",
            "DATABASE_URL",
            "RUST_LOG",
        ],
    );
}

/// Get required env var; error if missing.
pub fn env_req(key: &str) -> anyhow::Result<String> {
    init_env();
    env_opt(key).ok_or_else(|| anyhow::anyhow!("missing env var {key}"))
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Get parsed value with default fallback.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Clone,
{
    init_env();
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Boolean flag; accepts 1/true/on/yes (case-insensitive) as true.
pub fn env_flag(key: &str, default: bool) -> bool {
    init_env();
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        }
        Err(_) => default,
    }
}

/// Optional parsed value.
pub fn env_parse_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    init_env();
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Database URL: `DATABASE_URL`, then `DB_URL`, then the local SQLite default.
pub fn db_url() -> String {
    for k in ["DATABASE_URL", "DB_URL"] {
        if let Some(v) = env_opt(k) {
            return v;
        }
    }
    info!(target = "env", default = DEFAULT_DATABASE_URL, "no database URL set; using default");
    DEFAULT_DATABASE_URL.to_string()
}

fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD")
        || k.contains("SECRET")
        || k.contains("KEY")
        || k.contains("TOKEN")
    {
        if val.is_empty() {
            return String::new();
        }
        return "***".to_string();
    }

    let val_trim = val.trim();

    // URLs may embed credentials or an apikey query parameter.
    if let Ok(mut u) = url::Url::parse(val_trim) {
        if u.password().is_some() {
            let _ = u.set_password(Some("***"));
        }
        let redacted: Vec<(String, String)> = u
            .query_pairs()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("apikey") {
                    (name.into_owned(), "***".to_string())
                } else {
                    (name.into_owned(), value.into_owned())
                }
            })
            .collect();
        if !redacted.is_empty() {
            u.query_pairs_mut().clear().extend_pairs(redacted);
        }
        return u.to_string();
    }

    val_trim.to_string()
}

/// Validate required keys and log a consolidated, redacted snapshot of configuration.
/// Returns error if any required key is missing.
pub fn preflight_check(title: &str, required: &[&str], also_log: &[&str]) -> anyhow::Result<()> {
    init_env();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|k| env_opt(k).is_none())
        .collect();
    let snapshot: Vec<(String, String)> = also_log
        .iter()
        .map(|&k| {
            let v = env_opt(k).unwrap_or_default();
            (k.to_string(), redact_value(k, &v))
        })
        .collect();
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
    if !missing.is_empty() {
        return Err(anyhow::anyhow!("missing required env: {:?}", missing));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_secret_keys() {
        assert_eq!(redact_value("HARVARD_API_KEY", "abc-123"), "***");
        assert_eq!(redact_value("API_SECRET", ""), "");
    }

    #[test]
    fn redacts_apikey_query_param() {
        let out = redact_value(
            "HARVARD_BASE_URL",
            "https://api.harvardartmuseums.org/object?apikey=abc&size=10",
        );
        assert!(!out.contains("abc"));
        assert!(out.contains("size=10"));
    }

    #[test]
    fn leaves_plain_values_alone() {
        assert_eq!(redact_value("RUST_LOG", " info "), "info");
    }

    #[test]
    fn flag_accepts_common_truthy_values() {
        for (raw, expected) in [("1", true), ("Yes", true), (" on ", true), ("off", false), ("0", false)] {
            std::env::set_var("HARVARD_TEST_FLAG", raw);
            assert_eq!(env_flag("HARVARD_TEST_FLAG", !expected), expected, "{raw:?}");
        }
        std::env::remove_var("HARVARD_TEST_FLAG");
        assert!(env_flag("HARVARD_TEST_FLAG", true));
    }
}
