use library_loans::{
    adapters::{
        memory::{InMemoryCatalogStore, InMemoryLoanStore},
        postgres::{PostgresCatalogStore, PostgresLoanStore},
        tracing_notifier::TracingNotificationSender,
    },
    api::{handlers::AppState, router::create_router},
    application::{ServiceDependencies, loan::OverdueNotifier},
    config::Config,
    scheduler::spawn_overdue_scan,
};
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_loans=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let notification_sender = Arc::new(
        TracingNotificationSender::new(config.mail_default_sender.clone())
            .with_subject(config.mail_overdue_subject.clone()),
    );

    let service_deps = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("connected to PostgreSQL, migrations applied");

            ServiceDependencies {
                catalog: Arc::new(PostgresCatalogStore::new(pool.clone())),
                loan_store: Arc::new(PostgresLoanStore::new(pool)),
                notification_sender,
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");

            let catalog = Arc::new(InMemoryCatalogStore::new());
            ServiceDependencies {
                loan_store: Arc::new(InMemoryLoanStore::new(&catalog)),
                catalog,
                notification_sender,
            }
        }
    };

    let overdue_notifier = Arc::new(OverdueNotifier::new(
        service_deps.clone(),
        config.overdue_settings(),
    ));
    let _scan_task = spawn_overdue_scan(overdue_notifier.clone(), config.overdue_scan_interval);

    let app_state = Arc::new(AppState {
        service_deps,
        overdue_notifier,
    });
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
