//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration, loaded from environment variables
///
/// | Environment variable | Default | Notes |
/// |----------------------|---------|-------|
/// | DATABASE_URL | (none) | required |
/// | HTTP_PORT | 8080 | |
/// | ENVIRONMENT | development | development / staging / production |
/// | JWT_SECRET | dev placeholder | required outside development |
/// | PESAPAL_CONSUMER_KEY | dev placeholder | required outside development |
/// | PESAPAL_CONSUMER_SECRET | dev placeholder | required outside development |
/// | PESAPAL_ENV | sandbox | production selects the live base URL |
/// | PESAPAL_IPN_URL | localhost default | public URL of GET /api/payments/ipn |
/// | PESAPAL_CALLBACK_URL | localhost default | browser redirect-back URL |
/// | PESAPAL_CURRENCY | KES | |
/// | SES_FROM_EMAIL | noreply@gallery.local | |
/// | ADMIN_EMAIL / ADMIN_PASSWORD | (none) | optional first-admin bootstrap |
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for admin authentication
    pub jwt_secret: String,
    /// PesaPal API base URL (derived from PESAPAL_ENV)
    pub pesapal_base_url: String,
    /// PesaPal consumer key
    pub pesapal_consumer_key: String,
    /// PesaPal consumer secret
    pub pesapal_consumer_secret: String,
    /// Public URL PesaPal calls back with payment notifications
    pub pesapal_ipn_url: String,
    /// URL the customer is redirected to after the hosted payment page
    pub pesapal_callback_url: String,
    /// Operating currency for gateway submissions
    pub currency: String,
    /// SES sender email address
    pub ses_from_email: String,
    /// Optional first-admin bootstrap credentials
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in
    /// non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let pesapal_base_url = match std::env::var("PESAPAL_ENV").as_deref() {
            Ok("production") => "https://pay.pesapal.com/v3".to_string(),
            _ => "https://cybqa.pesapal.com/pesapalv3".to_string(),
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            pesapal_base_url,
            pesapal_consumer_key: Self::require_secret("PESAPAL_CONSUMER_KEY", &environment)?,
            pesapal_consumer_secret: Self::require_secret("PESAPAL_CONSUMER_SECRET", &environment)?,
            pesapal_ipn_url: std::env::var("PESAPAL_IPN_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api/payments/ipn".into()),
            pesapal_callback_url: std::env::var("PESAPAL_CALLBACK_URL")
                .unwrap_or_else(|_| "http://localhost:5173/order-confirmation".into()),
            currency: std::env::var("PESAPAL_CURRENCY").unwrap_or_else(|_| "KES".into()),
            ses_from_email: std::env::var("SES_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@gallery.local".into()),
            admin_email: std::env::var("ADMIN_EMAIL").ok().filter(|s| !s.is_empty()),
            admin_password: std::env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
            environment,
        })
    }

    /// Whether this is a production environment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
