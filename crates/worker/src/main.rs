use advisor_core::analysis::{AnalysisRunner, ScriptAnalysisRunner};
use advisor_core::storage::RecommendationStore;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod submit;

#[derive(Debug, Parser)]
#[command(name = "advisor_worker")]
struct Args {
    /// Send the new recommendations to the running API's review endpoint.
    #[arg(long, conflicts_with = "apply")]
    submit: bool,

    /// Back up the current data file and replace it with the new recommendations.
    #[arg(long)]
    apply: bool,

    /// Base URL of the running API (used with --submit).
    #[arg(long, default_value = "http://localhost:3001")]
    backend_url: String,

    /// Run the analysis and validate its output without submitting or applying.
    #[arg(long)]
    dry_run: bool,
}

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

    let args = Args::parse();

    let runner = ScriptAnalysisRunner::from_settings(&settings);
    let staged = runner.output_path().to_path_buf();
    let candidate = match runner.run().await {
        Ok(candidate) => candidate,
        Err(err) => {
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "analysis run failed");
            return Err(err);
        }
    };
    let current = &settings.recommendations_path;

    tracing::info!(
        staged = %staged.display(),
        summary = ?candidate.summary(),
        "analysis completed"
    );

    if args.dry_run || (!args.submit && !args.apply) {
        tracing::info!(
            dry_run = args.dry_run,
            "recommendations not applied; copy {} to {} to apply manually",
            staged.display(),
            current.display()
        );
        return Ok(());
    }

    if args.submit {
        let backend = submit::BackendClient::new(&args.backend_url)?;
        let result: anyhow::Result<String> = async {
            backend.ensure_online().await?;
            backend.submit_for_review(&candidate).await
        }
        .await;

        return match result {
            Ok(response) => {
                tracing::info!(backend = %args.backend_url, %response, "recommendations sent for review");
                Ok(())
            }
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(
                    error = %err,
                    "review submission failed; copy {} to {} to apply manually",
                    staged.display(),
                    current.display()
                );
                Err(err)
            }
        };
    }

    let store = RecommendationStore::new(current);
    if let Some(backup) = store.backup(chrono::Utc::now()).await? {
        tracing::info!(backup = %backup.display(), "backed up current recommendations");
    }
    store.persist(&candidate).await?;
    tracing::info!(path = %current.display(), "recommendations applied directly");
    tracing::warn!("a running API keeps serving its in-memory set until it is restarted or approves new data");

    Ok(())
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
