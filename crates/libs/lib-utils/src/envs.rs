//! # Environment Variables
//!
//! Utilities for reading and parsing environment variables.

use std::env;
use std::str::FromStr;

/// Get an environment variable by name.
pub fn get_env(name: &'static str) -> Result<String, Error> {
    env::var(name).map_err(|_| Error::MissingEnv(name))
}

/// Get an environment variable, falling back to `default` when unset.
pub fn get_env_or(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an environment variable.
pub fn get_env_parse<T: FromStr>(name: &'static str) -> Result<T, Error> {
    let val = get_env(name)?;
    val.trim().parse::<T>().map_err(|_| Error::WrongFormat(name))
}

/// Parse an environment variable if present, otherwise return `default`.
///
/// A variable that is set but fails to parse is an error, not a silent fallback.
pub fn get_env_parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, Error> {
    match env::var(name) {
        Ok(val) => val.trim().parse::<T>().map_err(|_| Error::WrongFormat(name)),
        Err(_) => Ok(default),
    }
}

// region:    --- Error
#[derive(Debug)]
pub enum Error {
    MissingEnv(&'static str),
    WrongFormat(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}
// endregion: --- Error

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_parse_or_uses_default_when_unset() {
        let value: u32 = get_env_parse_or("LIB_UTILS_TEST_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_get_env_parse_or_rejects_bad_value() {
        env::set_var("LIB_UTILS_TEST_BAD_NUMBER", "not-a-number");
        let result: Result<u32, Error> = get_env_parse_or("LIB_UTILS_TEST_BAD_NUMBER", 7);
        assert!(matches!(result, Err(Error::WrongFormat("LIB_UTILS_TEST_BAD_NUMBER"))));
    }

    #[test]
    fn test_get_env_missing() {
        assert!(matches!(
            get_env("LIB_UTILS_TEST_MISSING_VAR"),
            Err(Error::MissingEnv("LIB_UTILS_TEST_MISSING_VAR"))
        ));
    }
}
// endregion: --- Tests
