use advisor_core::analysis::ScriptAnalysisRunner;
use advisor_core::pipeline::{Pipeline, ReviewMode};
use advisor_core::storage::RecommendationStore;
use advisor_core::time::monthly;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod routes;
mod scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = advisor_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let review = match ReviewMode::from_settings(&settings) {
        Ok(review) => review,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            return Err(e);
        }
    };
    if settings.review_enabled && settings.review_fallback_auto_approve {
        tracing::warn!("review fallback enabled: reviewer outages will auto-approve recommendations");
    }

    let store = RecommendationStore::new(&settings.recommendations_path);
    let analysis = Arc::new(ScriptAnalysisRunner::from_settings(&settings));
    let pipeline = Arc::new(Pipeline::load(store, analysis, review).await);

    if settings.schedule_enabled {
        let offset = monthly::schedule_offset(settings.schedule_utc_offset_minutes);
        scheduler::spawn(pipeline.clone(), offset);
    } else {
        tracing::info!("monthly update schedule disabled");
    }

    let app = routes::router(routes::AppState { pipeline });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(
        %addr,
        ai_review = settings.review_enabled,
        "api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &advisor_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
