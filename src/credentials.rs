use serde_json::{Map, Value};
use std::fmt;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::fs::HomeFs;

const API_KEY_FIELDS: &[&str] = &["apiKey", "api_key"];
const OAUTH_FIELDS: &[&str] = &["token", "accessToken", "user", "userID"];
const ENDPOINT_FIELDS: &[&str] = &["apiEndpoint", "api_endpoint", "endpoint"];
const USER_ID_DISPLAY_LEN: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthKind {
    OAuth,
    ApiKey,
    #[default]
    Unknown,
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthKind::OAuth => "OAuth",
            AuthKind::ApiKey => "API Key",
            AuthKind::Unknown => "Unknown",
        })
    }
}

/// Who a credentials file belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Email(String),
    UserId(String),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Email(email) => f.write_str(email),
            Identity::UserId(id) => {
                let short: String = id.chars().take(USER_ID_DISPLAY_LEN).collect();
                write!(f, "{short}...")
            }
        }
    }
}

/// Read-only view of a credentials file. Missing or malformed files read as
/// unknown and invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsSummary {
    pub identity: Option<Identity>,
    pub auth: AuthKind,
    pub endpoint: Option<String>,
    pub valid: bool,
}

impl CredentialsSummary {
    pub fn read<F: HomeFs + ?Sized>(fs: &F, path: &Path) -> Self {
        let bytes = match fs.read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    debug!("Cannot read credentials {:?}: {}", path, err);
                }
                return Self::default();
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Self::from_value(&value),
            Err(err) => {
                debug!("Credentials {:?} are not valid JSON: {}", path, err);
                Self::default()
            }
        }
    }

    pub fn from_value(value: &Value) -> Self {
        let Some(data) = value.as_object() else {
            return Self::default();
        };

        let identity = data
            .get("user")
            .and_then(|user| user.get("email"))
            .filter(|email| truthy(email))
            .and_then(as_text)
            .map(Identity::Email)
            .or_else(|| {
                data.get("userID")
                    .filter(|id| truthy(id))
                    .and_then(as_text)
                    .map(Identity::UserId)
            });

        let auth = if API_KEY_FIELDS.iter().any(|field| data.contains_key(*field)) {
            AuthKind::ApiKey
        } else if OAUTH_FIELDS.iter().any(|field| data.contains_key(*field)) {
            AuthKind::OAuth
        } else {
            AuthKind::Unknown
        };

        let endpoint = first_truthy(data, ENDPOINT_FIELDS).and_then(as_text);

        let valid = match auth {
            AuthKind::OAuth => {
                data.get("userID").is_some_and(truthy)
                    || first_truthy(data, &["token", "accessToken"]).is_some()
                    || matches!(identity, Some(Identity::Email(_)))
            }
            AuthKind::ApiKey => first_truthy(data, API_KEY_FIELDS).is_some() && endpoint.is_some(),
            AuthKind::Unknown => false,
        };

        Self {
            identity,
            auth,
            endpoint,
            valid,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match &self.identity {
            Some(Identity::Email(email)) => Some(email),
            _ => None,
        }
    }
}

/// Write `key` and `endpoint` into the credentials file at `path`, keeping
/// every other field. Missing files are created.
pub fn write_api_key<F: HomeFs + ?Sized>(
    fs: &F,
    path: &Path,
    key: &str,
    endpoint: &str,
) -> Result<()> {
    let credentials_error = |message: String| Error::Credentials {
        path: path.to_path_buf(),
        message,
    };

    let mut data = match fs.read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
        Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(credentials_error("expected a JSON object".to_string())),
            Err(err) => return Err(credentials_error(err.to_string())),
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => Map::new(),
        Err(err) => return Err(credentials_error(err.to_string())),
    };

    data.insert("apiKey".to_string(), Value::from(key));
    data.insert("apiEndpoint".to_string(), Value::from(endpoint));
    data.entry("installMethod")
        .or_insert_with(|| Value::from("unknown"));
    data.entry("autoUpdates").or_insert(Value::Bool(true));

    let contents = serde_json::to_string_pretty(&Value::Object(data))
        .map_err(|err| credentials_error(err.to_string()))?;

    if let Some(parent) = path.parent() {
        fs.create_dir_all(parent)
            .map_err(|err| credentials_error(err.to_string()))?;
    }
    fs.write(path, contents.as_bytes())
        .map_err(|err| credentials_error(err.to_string()))
}

/// `sk-ant-a...wxyz`; short keys are hidden entirely.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn first_truthy<'a>(data: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| data.get(*field))
        .find(|value| truthy(value))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use rstest::rstest;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_oauth_file_with_email() {
        let summary = CredentialsSummary::from_value(&json!({
            "userID": "0123456789abcdef0123",
            "user": { "email": "dev@example.com" }
        }));

        assert_eq!(summary.auth, AuthKind::OAuth);
        assert_eq!(summary.email(), Some("dev@example.com"));
        assert!(summary.valid);
    }

    #[test]
    fn test_user_id_is_truncated_for_display() {
        let summary = CredentialsSummary::from_value(&json!({ "userID": "0123456789abcdef0123" }));

        assert_eq!(
            summary.identity.as_ref().map(ToString::to_string).as_deref(),
            Some("0123456789ab...")
        );
        assert_eq!(summary.email(), None);
    }

    #[rstest]
    #[case(json!({ "apiKey": "sk-1", "apiEndpoint": "https://api.example.com" }), true)]
    #[case(json!({ "api_key": "sk-1", "endpoint": "https://api.example.com" }), true)]
    #[case(json!({ "apiKey": "sk-1" }), false)]
    #[case(json!({ "apiKey": "", "apiEndpoint": "https://api.example.com" }), false)]
    fn test_api_key_validity_needs_key_and_endpoint(#[case] value: Value, #[case] valid: bool) {
        let summary = CredentialsSummary::from_value(&value);
        assert_eq!(summary.auth, AuthKind::ApiKey);
        assert_eq!(summary.valid, valid);
    }

    #[rstest]
    #[case(json!({ "token": "abc" }), true)]
    #[case(json!({ "accessToken": "" }), false)]
    #[case(json!({ "user": {} }), false)]
    #[case(json!({ "userID": "" , "user": { "email": "a@b.c" } }), true)]
    fn test_oauth_validity(#[case] value: Value, #[case] valid: bool) {
        let summary = CredentialsSummary::from_value(&value);
        assert_eq!(summary.auth, AuthKind::OAuth);
        assert_eq!(summary.valid, valid);
    }

    #[test]
    fn test_endpoint_field_precedence() {
        let summary = CredentialsSummary::from_value(&json!({
            "apiKey": "k",
            "endpoint": "https://third.example.com",
            "api_endpoint": "https://second.example.com"
        }));
        assert_eq!(summary.endpoint.as_deref(), Some("https://second.example.com"));
    }

    #[test]
    fn test_missing_or_malformed_file_reads_as_unknown() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        assert_eq!(CredentialsSummary::read(&LocalFs, &path), CredentialsSummary::default());

        fs::write(&path, "{ not json").unwrap();
        let summary = CredentialsSummary::read(&LocalFs, &path);
        assert_eq!(summary.auth, AuthKind::Unknown);
        assert!(!summary.valid);
    }

    #[test]
    fn test_write_api_key_preserves_other_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        fs::write(
            &path,
            r#"{"numStartups": 4, "installMethod": "npm", "apiKey": "old"}"#,
        )
        .unwrap();

        write_api_key(&LocalFs, &path, "sk-new", "https://api.example.com").unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["numStartups"], 4);
        assert_eq!(written["installMethod"], "npm");
        assert_eq!(written["apiKey"], "sk-new");
        assert_eq!(written["apiEndpoint"], "https://api.example.com");
        assert_eq!(written["autoUpdates"], true);
    }

    #[test]
    fn test_write_api_key_creates_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("work/.claude.json");

        write_api_key(&LocalFs, &path, "sk-new", "https://api.example.com").unwrap();

        let summary = CredentialsSummary::read(&LocalFs, &path);
        assert_eq!(summary.auth, AuthKind::ApiKey);
        assert!(summary.valid);
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["installMethod"], "unknown");
    }

    #[test]
    fn test_write_api_key_refuses_to_clobber_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        fs::write(&path, "{ broken").unwrap();

        let err = write_api_key(&LocalFs, &path, "k", "e").unwrap_err();

        assert!(matches!(err, Error::Credentials { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ broken");
    }

    #[rstest]
    #[case("sk-ant-REDACTED", "sk-ant-a...wxyz")]
    #[case("short", "*****")]
    fn test_mask_api_key(#[case] key: &str, #[case] masked: &str) {
        assert_eq!(mask_api_key(key), masked);
    }
}
