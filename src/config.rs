//! Runtime configuration.
//!
//! Values come from the process environment, which may first be seeded from a `.env`
//! file. Credentials are not part of [`Config`]; the CLI reads them from flags or
//! `TADO_USERNAME` / `TADO_PASSWORD` / `TADO_CLIENT_SECRET`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::DEFAULT_API_URL;
use crate::models::tado::TemperatureUnit;
use crate::session::{AuthEndpoint, AuthFlow};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Resource base URL including the version segment.
    pub api_url: String,
    pub auth_flow: AuthFlow,
    /// Overrides the flow's token endpoint.
    pub auth_url: Option<String>,
    /// Overrides the flow's OAuth client id.
    pub client_id: Option<String>,
    pub timeout: Duration,
    /// Unit the home is configured in; temperature overrides are sent in it.
    pub temperature_unit: TemperatureUnit,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            auth_flow: AuthFlow::default(),
            auth_url: None,
            client_id: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature_unit: TemperatureUnit::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = var("TADO_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let auth_flow = match var("TADO_AUTH_FLOW") {
            Some(s) => s.parse::<AuthFlow>().map_err(|e| format!("TADO_AUTH_FLOW: {}", e))?,
            None => AuthFlow::default(),
        };

        let timeout_secs = match var("TADO_TIMEOUT_SECS") {
            Some(s) => s
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| "TADO_TIMEOUT_SECS must be a positive integer".to_string())?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let temperature_unit = match var("TADO_TEMPERATURE_UNIT").map(|s| s.to_ascii_lowercase()).as_deref() {
            None | Some("celsius") | Some("c") => TemperatureUnit::Celsius,
            Some("fahrenheit") | Some("f") => TemperatureUnit::Fahrenheit,
            Some(other) => return Err(format!("TADO_TEMPERATURE_UNIT must be celsius or fahrenheit, got {}", other)),
        };

        Ok(Config {
            api_url,
            auth_flow,
            auth_url: var("TADO_AUTH_URL"),
            client_id: var("TADO_CLIENT_ID"),
            timeout: Duration::from_secs(timeout_secs),
            temperature_unit,
        })
    }

    /// The flow's default endpoint with any configured overrides applied.
    pub fn auth_endpoint(&self) -> AuthEndpoint {
        let mut endpoint = self.auth_flow.endpoint();
        if let Some(url) = &self.auth_url {
            endpoint.token_url = url.clone();
        }
        if let Some(id) = &self.client_id {
            endpoint.client_id = id.clone();
        }
        endpoint
    }
}

// =====================
// .env files
// =====================

#[derive(Debug)]
pub struct LoadedEnvFile {
    pub path: PathBuf,
    /// Named with `--env-file` rather than picked up from the working directory.
    pub explicit: bool,
    /// Variables set from the file; ones already present in the environment are skipped.
    pub applied: usize,
}

/// Load `explicit` if given, else `./.env` when it exists.
pub fn load_dotenv(explicit: Option<&Path>) -> Result<Option<LoadedEnvFile>, String> {
    let (path, explicit) = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(format!("env file not found: {}", path.display()));
            }
            (path.to_path_buf(), true)
        }
        None => {
            let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
            let candidate = cwd.join(".env");
            if !candidate.is_file() {
                return Ok(None);
            }
            (candidate, false)
        }
    };

    let applied = load_env_file(&path)?;
    Ok(Some(LoadedEnvFile { path, explicit, applied }))
}

/// Set every assignment in `path` that is not already in the process environment.
pub fn load_env_file(path: &Path) -> Result<usize, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

    let mut applied = 0;
    for (key, value) in parse_env_file(&contents).map_err(|e| format!("{}:{}", path.display(), e))? {
        if std::env::var_os(&key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(&key, value);
            }
            applied += 1;
        }
    }
    Ok(applied)
}

/// Parse `.env` contents into ordered assignments. Errors are prefixed with the line number.
pub fn parse_env_file(contents: &str) -> Result<Vec<(String, String)>, String> {
    let mut out = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if let Some(pair) = parse_env_line(line).map_err(|e| format!("{}: {}", index + 1, e))? {
            out.push(pair);
        }
    }
    Ok(out)
}

/// `KEY=value`, optionally prefixed with `export`. Blank lines and `#` comments yield `None`.
pub fn parse_env_line(line: &str) -> Result<Option<(String, String)>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

    let (key, raw) = line
        .split_once('=')
        .ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("environment variable name cannot be empty".to_string());
    }
    if key.contains(char::is_whitespace) {
        return Err(format!("environment variable name contains whitespace: {}", key));
    }

    Ok(Some((key.to_string(), parse_env_value(raw.trim())?)))
}

fn parse_env_value(raw: &str) -> Result<String, String> {
    let (value, rest) = if let Some(body) = raw.strip_prefix('"') {
        take_double_quoted(body)?
    } else if let Some(body) = raw.strip_prefix('\'') {
        let end = body.find('\'').ok_or_else(|| "unterminated single-quoted value".to_string())?;
        (body[..end].to_string(), &body[end + 1..])
    } else {
        // unquoted: ` #` starts a comment, a bare `#` is part of the value
        let value = raw.split(" #").next().unwrap_or_default().trim_end();
        return Ok(value.to_string());
    };

    let rest = rest.trim();
    if rest.is_empty() || rest.starts_with('#') {
        Ok(value)
    } else {
        Err("unexpected characters after closing quote".to_string())
    }
}

fn take_double_quoted(body: &str) -> Result<(String, &str), String> {
    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => return Ok((value, &body[i + 1..])),
            '\\' => {
                let (_, escaped) = chars
                    .next()
                    .ok_or_else(|| "unterminated escape sequence in double-quoted value".to_string())?;
                value.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            }
            other => value.push(other),
        }
    }
    Err("unterminated double-quoted value".to_string())
}
