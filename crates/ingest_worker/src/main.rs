use aws_config::BehaviorVersion;
use aws_lambda_events::event::sqs::SqsEvent;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Acquire, Pool, Postgres};
use std::sync::Arc;
use tender_core::db::{self, SourceCache};
use tender_core::types::{NormalizedItem, ObjectNotification, PublishIntent, Source};
use tender_core::Config;
use tracing::{error, info, warn};

const BATCH_SIZE: usize = 100;

struct AppState {
    pool: Pool<Postgres>,
    s3: S3Client,
    publisher: notification_publisher::Publisher,
    tz_offset: chrono::FixedOffset,
}

#[derive(Debug, Serialize)]
struct Response {
    notifications_processed: usize,
    items_upserted: usize,
    items_skipped: usize,
    notifications_published: usize,
}

async fn function_handler(
    state: Arc<AppState>,
    event: LambdaEvent<SqsEvent>,
) -> Result<Response, Error> {
    info!("=== INGEST WORKER STARTED ===");
    info!("received {} SQS records", event.payload.records.len());

    let source_cache = SourceCache::load(&state.pool)
        .await
        .map_err(|e| Error::from(format!("failed to load source cache: {e}")))?;

    let mut items_upserted = 0;
    let mut items_skipped = 0;
    let mut publish_intents: Vec<PublishIntent> = Vec::new();
    let mut notifications_processed = 0;

    for record in event.payload.records {
        let Some(body) = record.body else {
            warn!("SQS record has no body, skipping");
            continue;
        };

        let notification: ObjectNotification = match serde_json::from_str(&body) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "malformed object notification, skipping");
                continue;
            }
        };

        let Some(source) = Source::from_key_prefix(&notification.key) else {
            warn!(key = %notification.key, "unrecognized source prefix, skipping");
            continue;
        };

        let payload = match fetch_object(&state.s3, &notification).await {
            Ok(p) => p,
            Err(e) => {
                // Fetch failures are transient: surface them so the queue redelivers.
                return Err(Error::from(format!(
                    "failed to fetch s3://{}/{}: {e}",
                    notification.bucket, notification.key
                )));
            }
        };

        let raw: serde_json::Value = match serde_json::from_slice(&payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %notification.key, error = %e, "malformed JSON body, skipping");
                continue;
            }
        };

        let items = tender_normalize::normalize_batch(source, &raw, &state.tz_offset);
        notifications_processed += 1;
        info!(key = %notification.key, items = items.len(), "normalized object");

        for chunk in items.chunks(BATCH_SIZE) {
            let (upserted, skipped, mut intents) =
                process_batch(&state.pool, &source_cache, source, chunk)
                    .await
                    .map_err(|e| Error::from(format!("batch transaction failed: {e}")))?;
            items_upserted += upserted;
            items_skipped += skipped;
            publish_intents.append(&mut intents);
        }
    }

    let notifications_published = state.publisher.publish_all(&publish_intents).await;

    info!("=== INGEST WORKER COMPLETED ===");
    Ok(Response {
        notifications_processed,
        items_upserted,
        items_skipped,
        notifications_published,
    })
}

async fn fetch_object(
    s3: &S3Client,
    notification: &ObjectNotification,
) -> anyhow::Result<Vec<u8>> {
    let output = s3
        .get_object()
        .bucket(&notification.bucket)
        .key(&notification.key)
        .send()
        .await?;
    let bytes = output.body.collect().await?;
    Ok(bytes.into_bytes().to_vec())
}

/// Runs one batch inside a single transaction: `OPEN -> UPSERTING -> COMMITTED`, or
/// `OPEN -> ABORTED` if the transaction itself fails. Each row runs inside its own
/// savepoint so a failing upsert only rolls back that row; Postgres aborts the whole
/// transaction on the first error otherwise, which would silently roll back every row
/// already counted as upserted once `tx.commit()` ran on an aborted transaction.
async fn process_batch(
    pool: &Pool<Postgres>,
    source_cache: &SourceCache,
    source: Source,
    items: &[NormalizedItem],
) -> Result<(usize, usize, Vec<PublishIntent>), sqlx::Error> {
    let source_id = source_cache.id_of(source);
    let mut tx = pool.begin().await?;

    let mut upserted = 0;
    let mut skipped = 0;
    let mut intents = Vec::new();

    for item in items {
        let mut savepoint = tx.begin().await?;
        match db::upsert_tender(&mut savepoint, source_id, item).await {
            Ok(tender_id) => {
                savepoint.commit().await?;
                upserted += 1;
                intents.push(PublishIntent {
                    tender_id,
                    title: item.tender.title.clone(),
                    category: item.tender.category.clone(),
                    source,
                    published_at: item.tender.published_at,
                    closing_at: item.tender.closing_at,
                    url: item.tender.url.clone(),
                    description: item.tender.description.clone(),
                });
            }
            Err(e) => {
                savepoint.rollback().await?;
                error!(external_id = %item.tender.external_id, error = %e, "row upsert failed, skipping");
                skipped += 1;
            }
        }
    }

    tx.commit().await?;
    Ok((upserted, skipped, intents))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env()
        .await
        .map_err(|e| Error::from(e.to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| Error::from(format!("failed to connect to database: {e}")))?;
    db::ensure_schema(&pool)
        .await
        .map_err(|e| Error::from(format!("failed to ensure schema: {e}")))?;

    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let s3 = S3Client::new(&aws_config);

    let topic_arn = config
        .tender_topic_arn
        .clone()
        .ok_or_else(|| Error::from("TENDER_TOPIC_ARN not set"))?;
    let publisher = notification_publisher::Publisher::new(topic_arn).await;

    let tz_offset = tender_parsers::parse_offset(&config.tz_offset);

    let state = Arc::new(AppState {
        pool,
        s3,
        publisher,
        tz_offset,
    });

    lambda_runtime::run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { function_handler(state, event).await }
    }))
    .await
}
