use crate::{
    config::Config,
    middleware::{CheckInRateLimiter, RateLimitConfig},
    services::{availability::CheckInWindow, CheckInService, CreditsService, TurmasService},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub credits_service: Arc<CreditsService>,
    pub turmas_service: Arc<TurmasService>,
    pub checkin_service: Arc<CheckInService>,
    pub checkin_rate_limiter: CheckInRateLimiter,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database
        let db = sea_orm::Database::connect(&config.database.url).await?;

        // Connect to Redis
        let redis = Arc::new(redis::Client::open(config.redis.url.as_str())?);
        let rate_limiter = CheckInRateLimiter::new(
            redis,
            RateLimitConfig {
                limit: config.checkin.attempts_per_minute,
                window_seconds: 60,
            },
        );

        Self::with_rate_limiter(db, config, rate_limiter)
    }

    /// State over an existing connection with rate limiting turned off
    pub fn from_parts(db: DatabaseConnection, config: Config) -> Result<Self, anyhow::Error> {
        Self::with_rate_limiter(db, config, CheckInRateLimiter::disabled())
    }

    fn with_rate_limiter(
        db: DatabaseConnection,
        config: Config,
        checkin_rate_limiter: CheckInRateLimiter,
    ) -> Result<Self, anyhow::Error> {
        let window = CheckInWindow::new(
            config.checkin.window_before_minutes,
            config.checkin.window_after_minutes,
        );
        let utc_offset = config.academy.utc_offset()?;

        // Initialize services
        let credits_service = Arc::new(CreditsService::new(db.clone()));
        let turmas_service = Arc::new(TurmasService::new(
            db.clone(),
            window,
            config.checkin.upcoming_limit,
            utc_offset,
        ));
        let checkin_service = Arc::new(CheckInService::new(
            db.clone(),
            window,
            config.checkin.credits_per_lesson,
            utc_offset,
        ));

        Ok(Self {
            db,
            credits_service,
            turmas_service,
            checkin_service,
            checkin_rate_limiter,
            config: Arc::new(config),
        })
    }
}
