// src/config.rs
use serde::Serialize;

pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MODEL_TAG: &str = "gpt-4o";
const DEV_JWT_SECRET: &str = "default_secret";

/// Page URLs derived from the site base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Routes {
    pub site: String,
    pub dashboard: String,
    pub login: String,
    pub sign_up: String,
    pub chat: String,
}

impl Routes {
    pub fn from_site_url(site_url: &str) -> Self {
        let site = site_url.trim_end_matches('/').to_string();
        let dashboard = format!("{}/dashboard", site);
        Self {
            login: format!("{}/login", site),
            sign_up: format!("{}/sign-up", site),
            chat: format!("{}/chat", dashboard),
            dashboard,
            site,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Absent means the in-memory store is used.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    pub bind_addr: String,
    pub site_url: String,
    pub default_model_tag: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = non_empty("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set - using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let db_max_connections = match non_empty("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid DB_MAX_CONNECTIONS '{}', using 5", raw);
                5
            }),
            None => 5,
        };

        let bcrypt_cost = non_empty("BCRYPT_COST")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(bcrypt::DEFAULT_COST);

        Self {
            database_url: non_empty("DATABASE_URL"),
            db_max_connections,
            jwt_secret,
            bcrypt_cost,
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            site_url: non_empty("SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            default_model_tag: non_empty("DEFAULT_MODEL_TAG").unwrap_or_else(|| DEFAULT_MODEL_TAG.to_string()),
        }
    }

    pub fn routes(&self) -> Routes {
        Routes::from_site_url(&self.site_url)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn routes_derive_from_site_url() {
        let routes = Routes::from_site_url("https://chat.example.com/");
        assert_eq!(routes.dashboard, "https://chat.example.com/dashboard");
        assert_eq!(routes.login, "https://chat.example.com/login");
        assert_eq!(routes.sign_up, "https://chat.example.com/sign-up");
        assert_eq!(routes.chat, "https://chat.example.com/dashboard/chat");
    }

    #[test]
    fn missing_variables_fall_back_to_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.site_url, DEFAULT_SITE_URL);
        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(settings.default_model_tag, "gpt-4o");
        assert_eq!(settings.db_max_connections, 5);
        assert_eq!(settings.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(settings.database_url.is_none());
        assert_eq!(settings.routes().chat, "http://localhost:3000/dashboard/chat");
    }

    #[test]
    fn variables_override_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/chat"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("SITE_URL", "https://example.org"),
            ("JWT_SECRET", "s3cret"),
            ("DEFAULT_MODEL_TAG", ""),
        ]);
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/chat"));
        assert_eq!(settings.db_max_connections, 12);
        assert_eq!(settings.jwt_secret, "s3cret");
        assert_eq!(settings.default_model_tag, DEFAULT_MODEL_TAG);
        assert_eq!(settings.routes().login, "https://example.org/login");
    }
}
