use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Where outgoing mail goes.
#[derive(Debug, Clone, Deserialize)]
pub enum EmailTransportConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        use_tls: bool,
    },
    /// Writes each message to a directory instead of sending it. Handy in dev.
    File { path: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub transport: EmailTransportConfig,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub payment_secret: String,
    pub public_base_url: Option<String>,
    pub static_dir: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "kina-resort".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "kina-resort-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 7),
        };

        let smtp_user = std::env::var("SMTP_USER").unwrap_or_default();
        let transport = match std::env::var("EMAIL_FILE_DIR") {
            Ok(path) => EmailTransportConfig::File { path },
            Err(_) => EmailTransportConfig::Smtp {
                host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
                port: env_parse("SMTP_PORT").unwrap_or(587),
                username: smtp_user.clone(),
                password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
                use_tls: env_parse("SMTP_TLS").unwrap_or(true),
            },
        };
        let email = EmailConfig {
            transport,
            from_email: std::env::var("EMAIL_FROM").unwrap_or(smtp_user),
            from_name: std::env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Kina Resort".into()),
        };

        let payment_secret = std::env::var("PAYMENT_SECRET").unwrap_or_else(|_| jwt.secret.clone());

        Ok(Self {
            database_url,
            jwt,
            email,
            payment_secret,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            static_dir: std::env::var("STATIC_DIR").ok().filter(|d| !d.is_empty()),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
