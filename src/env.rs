/// Environment variable names used by this crate for convenient
/// configuration from services.
///
/// These are purely helpers; `Core` and the sinks never read the
/// environment themselves.

/// Preset to start from: `production` (default) or `development`.
pub const CLOUD_LOGGING_PRESET_ENV: &str = "CLOUD_LOGGING_PRESET";

/// Minimum level override, e.g. `warn`.
pub const CLOUD_LOGGING_LEVEL_ENV: &str = "CLOUD_LOGGING_LEVEL";

/// Project that owns the log, used to build `projects/{id}/logs/{log}`.
pub const CLOUD_LOGGING_PROJECT_ENV: &str = "CLOUD_LOGGING_PROJECT";

/// Log id within the project.
pub const CLOUD_LOGGING_LOG_ID_ENV: &str = "CLOUD_LOGGING_LOG_ID";

/// Full URL of the `entries:write` endpoint.
pub const CLOUD_LOGGING_ENDPOINT_ENV: &str = "CLOUD_LOGGING_ENDPOINT";

/// Optional bearer token sent with every request.
pub const CLOUD_LOGGING_TOKEN_ENV: &str = "CLOUD_LOGGING_TOKEN";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating an empty value as unset.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
