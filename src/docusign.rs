//! DocuSign account settings, kept in config.json next to settings.json
//!
//! The password is stored in clear text when the user chooses to store it.
//! Leave it empty to be prompted by DocuSign instead.

use crate::error::{AdminError, AdminResult};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use tracing::info;

pub const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_LOGIN_PAGE: &str = "https://account.docusign.com";

const KEY_LOGIN_PAGE: &str = "docusign_login_page";
const KEY_EMAIL: &str = "docusign_email";
const KEY_PASSWORD: &str = "docusign_password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocuSignConfig {
    pub login_page: String,
    pub email: String,
    pub password: Option<String>,
}

impl Default for DocuSignConfig {
    fn default() -> Self {
        Self {
            login_page: DEFAULT_LOGIN_PAGE.to_string(),
            email: String::new(),
            password: None,
        }
    }
}

fn read_object(path: &Path) -> AdminResult<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let raw = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(AdminError::Validation(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
    }
}

impl DocuSignConfig {
    pub fn load(config_dir: &Path) -> AdminResult<Self> {
        let map = read_object(&config_dir.join(CONFIG_FILE))?;
        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

        let defaults = Self::default();
        Ok(Self {
            login_page: text(KEY_LOGIN_PAGE)
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.login_page),
            email: text(KEY_EMAIL).unwrap_or_default(),
            password: text(KEY_PASSWORD).filter(|s| !s.is_empty()),
        })
    }

    /// Merge into the existing config.json, keeping any other keys
    pub fn save(&self, config_dir: &Path) -> AdminResult<()> {
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(AdminError::Validation(format!(
                "'{}' is not an email address",
                self.email
            )));
        }
        if !self.login_page.starts_with("https://") && !self.login_page.starts_with("http://") {
            return Err(AdminError::Validation(format!(
                "login page must be an http(s) URL, got '{}'",
                self.login_page
            )));
        }

        std::fs::create_dir_all(config_dir)?;
        let path = config_dir.join(CONFIG_FILE);
        let mut map = read_object(&path)?;

        map.insert(KEY_LOGIN_PAGE.into(), Value::String(self.login_page.clone()));
        map.insert(KEY_EMAIL.into(), Value::String(self.email.clone()));
        map.insert(
            KEY_PASSWORD.into(),
            Value::String(self.password.clone().unwrap_or_default()),
        );

        std::fs::write(&path, serde_json::to_string_pretty(&Value::Object(map))?)?;
        info!(path = %path.display(), "DocuSign settings saved");
        Ok(())
    }
}

impl fmt::Display for DocuSignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Login page: {}", self.login_page)?;
        writeln!(f, "Email:      {}", self.email)?;
        let password = match &self.password {
            Some(_) => "********",
            None => "(not stored)",
        };
        write!(f, "Password:   {}", password)
    }
}
