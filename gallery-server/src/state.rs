//! Application state

use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth;
use crate::config::Config;
use crate::db::admin_users;
use crate::db::orders::PgOrderStore;
use crate::email::{Notifier, SesNotifier};
use crate::payments::pesapal::PaymentGateway;
use crate::payments::{PesapalClient, Reconciler};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// JWT secret for admin authentication
    pub jwt_secret: String,
    /// Customer email notifier (fire-and-forget)
    pub notifier: Arc<dyn Notifier>,
    /// Order-payment reconciler
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    /// Connect to Postgres, run migrations, and wire the services
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ses = SesClient::new(&aws_config);
        let notifier: Arc<dyn Notifier> =
            Arc::new(SesNotifier::new(ses, config.ses_from_email.clone()));

        let gateway: Arc<dyn PaymentGateway> = Arc::new(PesapalClient::new(config));
        let reconciler = Arc::new(Reconciler::with_pg(
            PgOrderStore::new(pool.clone()),
            gateway,
            notifier.clone(),
        ));

        let state = Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            notifier,
            reconciler,
        };

        state.bootstrap_admin(config).await?;

        Ok(state)
    }

    /// Create the first admin account from ADMIN_EMAIL / ADMIN_PASSWORD
    /// when the table is empty. No-op otherwise.
    async fn bootstrap_admin(&self, config: &Config) -> Result<(), BoxError> {
        let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
            return Ok(());
        };

        if admin_users::count(&self.pool).await? > 0 {
            return Ok(());
        }

        let hashed = auth::hash_password(password).map_err(|e| -> BoxError { Box::new(e) })?;
        let now = chrono::Utc::now().timestamp_millis();
        admin_users::create(&self.pool, email, &hashed, "Administrator", now).await?;
        tracing::info!(email = %email, "Bootstrapped first admin account");
        Ok(())
    }
}
