use std::env;
use std::str::FromStr;

use tracing::warn;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Read an env var, falling back to `default` when unset.
pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an env var, treating an empty value as unset.
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Parse an env var into `T`. Unparseable values are logged and replaced by `default`.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env_opt(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(key, value = %raw, "ignoring unparseable env value");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns a distinct key so parallel test threads never race.

    #[test]
    fn env_or_falls_back_when_unset() {
        assert_eq!(env_or("CADENCE_TEST_UNSET_OR", "fallback"), "fallback");
    }

    #[test]
    fn env_opt_treats_empty_as_unset() {
        env::set_var("CADENCE_TEST_EMPTY", "");
        assert_eq!(env_opt("CADENCE_TEST_EMPTY"), None);
    }

    #[test]
    fn env_parse_reads_value() {
        env::set_var("CADENCE_TEST_PARSE_OK", " 42 ");
        assert_eq!(env_parse("CADENCE_TEST_PARSE_OK", 0u64), 42);
    }

    #[test]
    fn env_parse_uses_default_on_garbage() {
        env::set_var("CADENCE_TEST_PARSE_BAD", "not-a-bool");
        assert!(env_parse("CADENCE_TEST_PARSE_BAD", true));
    }
}
