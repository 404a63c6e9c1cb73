use serde::Deserialize;

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub run_migrations: bool,
    /// Per-IP rate limit for the public API. `None` disables limiting.
    pub rate_limit: Option<RateLimitConfig>,
    /// Transactional mail settings. `None` means mail is not configured and
    /// every send fails.
    pub mail: Option<MailConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub per_second: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Sender address used for every outgoing email.
    pub from_address: String,
    /// Fixed recipient of the internal new-lead notice.
    pub sales_address: String,
    pub transport: MailTransport,
}

#[derive(Debug, Clone, Deserialize)]
pub enum MailTransport {
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    },
    HttpApi {
        api_url: String,
        api_key: String,
    },
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Database URL: {}...", url_prefix(&config.database_url));
        tracing::debug!("Server Port: {}", config.port);
        match &config.mail {
            Some(mail) => match &mail.transport {
                MailTransport::Smtp { host, port, .. } => {
                    tracing::info!("Mail transport: SMTP {}:{}", host, port)
                }
                MailTransport::HttpApi { api_url, .. } => {
                    tracing::info!("Mail transport: HTTP API {}", api_url)
                }
            },
            None => tracing::warn!("No mail transport configured; lead emails will fail"),
        }

        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL")
            .or_else(|| var("DB_URL"))
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required"))
            .and_then(|url| {
                if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                    anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                }
                Ok(url)
            })?;

        let port = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;

        let run_migrations = parse_flag(var("RUN_MIGRATIONS").as_deref(), false)?;

        let rate_limit = if parse_flag(var("RATE_LIMIT_ENABLED").as_deref(), true)? {
            Some(RateLimitConfig {
                per_second: var("RATE_LIMIT_PER_SECOND")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a number"))?,
                burst_size: var("RATE_LIMIT_BURST")
                    .unwrap_or_else(|| "20".to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a number"))?,
            })
        } else {
            None
        };

        let mail = Self::mail_from_lookup(&var)?;

        Ok(Self {
            database_url,
            port,
            run_migrations,
            rate_limit,
            mail,
        })
    }

    fn mail_from_lookup<F>(var: &F) -> anyhow::Result<Option<MailConfig>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = if let Some(host) = var("SMTP_HOST") {
            let username = var("SMTP_USER");
            let password = var("SMTP_PASSWORD");
            if username.is_some() != password.is_some() {
                anyhow::bail!("SMTP_USER and SMTP_PASSWORD must be set together");
            }
            MailTransport::Smtp {
                host,
                port: var("SMTP_PORT")
                    .map(|p| p.parse())
                    .transpose()
                    .map_err(|_| anyhow::anyhow!("SMTP_PORT must be a valid port number"))?
                    .unwrap_or(DEFAULT_SMTP_PORT),
                username,
                password,
            }
        } else if let Some(api_url) = var("MAIL_API_URL") {
            let parsed = url::Url::parse(&api_url)
                .map_err(|e| anyhow::anyhow!("MAIL_API_URL is not a valid URL: {}", e))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                anyhow::bail!("MAIL_API_URL must start with http:// or https://");
            }
            let api_key = var("MAIL_API_KEY").ok_or_else(|| {
                anyhow::anyhow!("MAIL_API_KEY environment variable required with MAIL_API_URL")
            })?;
            MailTransport::HttpApi { api_url, api_key }
        } else {
            return Ok(None);
        };

        let from_address = var("MAIL_FROM")
            .ok_or_else(|| anyhow::anyhow!("MAIL_FROM environment variable required"))?;

        let sales_address = match var("SALES_EMAIL") {
            Some(address) => address,
            None => {
                let domain = from_address
                    .rsplit_once('@')
                    .map(|(_, domain)| domain.trim_end_matches('>'))
                    .filter(|domain| !domain.is_empty())
                    .ok_or_else(|| {
                        anyhow::anyhow!("SALES_EMAIL required when MAIL_FROM has no domain")
                    })?;
                format!("sales@{}", domain)
            }
        };

        Ok(Some(MailConfig {
            from_address,
            sales_address,
            transport,
        }))
    }
}

fn parse_flag(value: Option<&str>, default: bool) -> anyhow::Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => anyhow::bail!("invalid boolean flag value: {}", v),
    }
}

/// Leading characters of a connection URL, enough to identify it in logs.
fn url_prefix(url: &str) -> String {
    url.chars().take(20).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/crm")])).unwrap();

        assert_eq!(config.port, 3000);
        assert!(!config.run_migrations);
        assert!(config.mail.is_none());
        let rate_limit = config.rate_limit.unwrap();
        assert_eq!(rate_limit.per_second, 10);
        assert_eq!(rate_limit.burst_size, 20);
    }

    #[test]
    fn test_database_url_is_required_and_validated() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "mysql://x")])).is_err());
        assert!(Config::from_lookup(lookup(&[("DB_URL", "postgresql://x")])).is_ok());
    }

    #[test]
    fn test_smtp_transport_and_derived_sales_address() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/crm"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "mailer"),
            ("SMTP_PASSWORD", "secret"),
            ("MAIL_FROM", "Acme <hello@acme.io>"),
        ]))
        .unwrap();

        let mail = config.mail.unwrap();
        assert_eq!(mail.sales_address, "sales@acme.io");
        match mail.transport {
            MailTransport::Smtp { host, port, username, .. } => {
                assert_eq!(host, "smtp.example.com");
                assert_eq!(port, DEFAULT_SMTP_PORT);
                assert_eq!(username.as_deref(), Some("mailer"));
            }
            other => panic!("expected SMTP transport, got {:?}", other),
        }
    }

    #[test]
    fn test_smtp_credentials_must_come_in_pairs() {
        for partial in [("SMTP_USER", "mailer"), ("SMTP_PASSWORD", "secret")] {
            let result = Config::from_lookup(lookup(&[
                ("DATABASE_URL", "postgres://localhost/crm"),
                ("SMTP_HOST", "smtp.example.com"),
                ("MAIL_FROM", "hello@acme.io"),
                partial,
            ]));
            assert!(result.is_err(), "only {} set", partial.0);
        }

        let anonymous = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/crm"),
            ("SMTP_HOST", "relay.internal"),
            ("MAIL_FROM", "hello@acme.io"),
        ]))
        .unwrap();
        assert!(anonymous.mail.is_some());
    }

    #[test]
    fn test_url_prefix_respects_char_boundaries() {
        assert_eq!(url_prefix("postgres://abcd用户@h/db"), "postgres://abcd用户@h/");
        assert_eq!(url_prefix("postgres://x"), "postgres://x");
    }

    #[test]
    fn test_http_transport_requires_key_and_valid_url() {
        let base = [
            ("DATABASE_URL", "postgres://localhost/crm"),
            ("MAIL_FROM", "hello@acme.io"),
        ];

        let mut missing_key = base.to_vec();
        missing_key.push(("MAIL_API_URL", "https://mail.example.com/emails"));
        assert!(Config::from_lookup(lookup(&missing_key)).is_err());

        let mut bad_url = base.to_vec();
        bad_url.push(("MAIL_API_URL", "ftp://mail.example.com"));
        bad_url.push(("MAIL_API_KEY", "key"));
        assert!(Config::from_lookup(lookup(&bad_url)).is_err());

        let mut ok = base.to_vec();
        ok.push(("MAIL_API_URL", "https://mail.example.com/emails"));
        ok.push(("MAIL_API_KEY", "key"));
        ok.push(("SALES_EMAIL", "leads@acme.io"));
        let mail = Config::from_lookup(lookup(&ok)).unwrap().mail.unwrap();
        assert_eq!(mail.sales_address, "leads@acme.io");
        assert!(matches!(mail.transport, MailTransport::HttpApi { .. }));
    }

    #[test]
    fn test_rate_limit_can_be_disabled() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/crm"),
            ("RATE_LIMIT_ENABLED", "false"),
            ("RUN_MIGRATIONS", "true"),
        ]))
        .unwrap();

        assert!(config.rate_limit.is_none());
        assert!(config.run_migrations);
    }
}
