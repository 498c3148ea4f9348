use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use furever_engine::{
    api,
    care::CareService,
    collab::{ClassifierClient, EnrichmentClient},
    migrator,
    notify::{LocalLiveRegistry, NotificationSink},
    outbreak::OutbreakPipeline,
    scheduler::ExpirationScheduler,
    store::{EngineStore, OrmStore},
};
use sea_orm::Database;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    furever_engine::telemetry::init_telemetry("furever-engine");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    use sea_orm_migration::MigratorTrait;
    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    furever_engine::metrics::init_metrics(&db).await;

    let store: Arc<dyn EngineStore> = Arc::new(OrmStore::new(db));
    let live = Arc::new(LocalLiveRegistry::new());
    let sink = Arc::new(NotificationSink::new(store.clone(), live.clone()));
    let care = Arc::new(CareService::new(store.clone(), sink.clone()));
    let scheduler = Arc::new(ExpirationScheduler::new(
        store.clone(),
        care.clone(),
        sink.clone(),
    ));
    let pipeline = Arc::new(OutbreakPipeline::new(store.clone(), sink.clone()));
    let classifier = Arc::new(ClassifierClient::new());
    let enrichment = Arc::new(EnrichmentClient::new());

    let poll_secs = std::env::var("SCHEDULER_POLL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);
    let sweep_hour = std::env::var("SWEEP_HOUR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);
    tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run_poll_loop(poll_secs).await }
    });
    tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run_sweep_loop(sweep_hour).await }
    });

    let app = app(
        store,
        sink,
        care,
        scheduler,
        pipeline,
        classifier,
        enrichment,
        prometheus_layer,
        metric_handle,
    );

    let port = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health_check() -> &'static str {
    "OK"
}

#[allow(clippy::too_many_arguments)]
fn app(
    store: Arc<dyn EngineStore>,
    sink: Arc<NotificationSink>,
    care: Arc<CareService>,
    scheduler: Arc<ExpirationScheduler>,
    pipeline: Arc<OutbreakPipeline>,
    classifier: Arc<ClassifierClient>,
    enrichment: Arc<EnrichmentClient>,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/pets/:id/temporary-care",
            post(api::care::begin_temporary_care),
        )
        .route(
            "/pets/:id/temporary-care/extensions",
            post(api::care::request_extension),
        )
        .route(
            "/pets/:id/temporary-care/extensions/:request_id/respond",
            post(api::care::respond_to_extension),
        )
        .route(
            "/pets/:id/temporary-care/end",
            post(api::care::end_temporary_care),
        )
        .route(
            "/pets/:id/detections/analyze",
            post(api::detections::analyze_detection),
        )
        .route("/detections", post(api::detections::report_detection))
        .route("/alerts/active", get(api::alerts::list_active_alerts))
        .route("/alerts/:id/deactivate", post(api::alerts::deactivate_alert))
        .route(
            "/alerts/receipts/:id/read",
            post(api::alerts::mark_receipt_read),
        )
        .route(
            "/users/:id/notifications",
            get(api::notifications::list_user_notifications),
        )
        .route(
            "/notifications/:id/read",
            post(api::notifications::mark_notification_read),
        )
        .route("/internal/run_sweep", post(api::notifications::run_sweep))
        .layer(Extension(store))
        .layer(Extension(sink))
        .layer(Extension(care))
        .layer(Extension(scheduler))
        .layer(Extension(pipeline))
        .layer(Extension(classifier))
        .layer(Extension(enrichment))
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };
                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        pet_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        alert_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                    )
                },
            ),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }))
}
