use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres, QueryBuilder};
use tender_core::db;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 20;
const MIN_LIMIT: i64 = 1;
const MAX_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tenders", get(list_tenders))
        .route("/tenders/:id", get(get_tender))
        .route("/tenders/:id/documents", get(get_documents))
        .route("/tenders/:id/contacts", get(get_contacts))
        .route("/user/preferences", post(save_preferences))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    source: Option<String>,
    status: Option<String>,
    buyer: Option<String>,
    category: Option<String>,
    q: Option<String>,
    closing_from: Option<DateTime<Utc>>,
    closing_to: Option<DateTime<Utc>>,
    published_from: Option<DateTime<Utc>>,
    published_to: Option<DateTime<Utc>>,
    limit: Option<i64>,
    offset: Option<i64>,
    sort: Option<String>,
    order: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct TenderSummary {
    id: i64,
    external_id: String,
    title: String,
    category: Option<String>,
    buyer: Option<String>,
    status: Option<String>,
    source: String,
    published_at: Option<DateTime<Utc>>,
    closing_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    total: i64,
    limit: i64,
    offset: i64,
    results: Vec<TenderSummary>,
}

/// The sort field allow-list: anything else falls back to the default.
fn sort_column(sort: Option<&str>) -> &'static str {
    match sort {
        Some("published_at") => "t.published_at",
        Some("id") => "t.id",
        _ => "t.closing_at",
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
    if let Some(source) = &query.source {
        qb.push(" AND s.name = ").push_bind(source.clone());
    }
    if let Some(status) = &query.status {
        qb.push(" AND t.status = ").push_bind(status.clone());
    }
    if let Some(buyer) = &query.buyer {
        qb.push(" AND t.buyer = ").push_bind(buyer.clone());
    }
    if let Some(category) = &query.category {
        qb.push(" AND t.category = ").push_bind(category.clone());
    }
    if let Some(q) = &query.q {
        qb.push(" AND (t.title || ' ' || coalesce(t.description, '')) ILIKE ")
            .push_bind(format!("%{q}%"));
    }
    if let Some(from) = query.closing_from {
        qb.push(" AND t.closing_at >= ").push_bind(from);
    }
    if let Some(to) = query.closing_to {
        qb.push(" AND t.closing_at <= ").push_bind(to);
    }
    if let Some(from) = query.published_from {
        qb.push(" AND t.published_at >= ").push_bind(from);
    }
    if let Some(to) = query.published_to {
        qb.push(" AND t.published_at <= ").push_bind(to);
    }
}

async fn list_tenders(
    State((pool, _)): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut count_qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM tenders t JOIN sources s ON s.id = t.source_id WHERE 1=1");
    push_filters(&mut count_qb, &query);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(&pool)
        .await
        .map_err(ApiError::from)?;

    let mut select_qb: QueryBuilder<Postgres> = QueryBuilder::new(
        r#"SELECT t.id, t.external_id, t.title, t.category, t.buyer, t.status, s.name AS source,
                  t.published_at, t.closing_at
           FROM tenders t JOIN sources s ON s.id = t.source_id WHERE 1=1"#,
    );
    push_filters(&mut select_qb, &query);

    let column = sort_column(query.sort.as_deref());
    let direction = match query.order.as_deref() {
        Some("desc") | Some("DESC") => "DESC",
        _ => "ASC",
    };
    select_qb.push(format!(" ORDER BY {column} {direction} NULLS LAST"));
    select_qb.push(" LIMIT ").push_bind(limit);
    select_qb.push(" OFFSET ").push_bind(offset);

    let results: Vec<TenderSummary> = select_qb
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ListResponse {
        total,
        limit,
        offset,
        results,
    }))
}

#[derive(Debug, Serialize)]
struct TenderDetail {
    #[serde(flatten)]
    tender: tender_core::types::Tender,
    source: String,
    documents: Vec<tender_core::types::Document>,
    contacts: Vec<tender_core::types::Contact>,
}

async fn source_name(pool: &Pool<Postgres>, source_id: i32) -> Result<String, ApiError> {
    let row: (String,) = sqlx::query_as("SELECT name FROM sources WHERE id = $1")
        .bind(source_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

async fn get_tender(
    State((pool, _)): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TenderDetail>, ApiError> {
    let tender = db::fetch_tender(&pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("tender not found".to_string()))?;
    let source = source_name(&pool, tender.source_id).await?;
    let documents = db::fetch_documents(&pool, id).await?;
    let contacts = db::fetch_contacts(&pool, id).await?;

    Ok(Json(TenderDetail {
        tender,
        source,
        documents,
        contacts,
    }))
}

async fn get_documents(
    State((pool, _)): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<tender_core::types::Document>>, ApiError> {
    db::fetch_tender(&pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("tender not found".to_string()))?;
    Ok(Json(db::fetch_documents(&pool, id).await?))
}

async fn get_contacts(
    State((pool, _)): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<tender_core::types::Contact>>, ApiError> {
    db::fetch_tender(&pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("tender not found".to_string()))?;
    Ok(Json(db::fetch_contacts(&pool, id).await?))
}

#[derive(Debug, Deserialize)]
struct PreferencesRequest {
    email: String,
    categories: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PreferencesResponse {
    email: String,
    categories: Vec<String>,
    subscriptions_created: usize,
}

/// Replaces a user's preference rows and creates one SNS subscription per category,
/// each filtered by a `{category:[c]}` attribute so the subscriber only receives
/// notifications for the categories they asked for.
async fn save_preferences(
    State((pool, state)): State<AppState>,
    Json(body): Json<PreferencesRequest>,
) -> Result<Json<PreferencesResponse>, ApiError> {
    let user_id: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&pool)
        .await?;
    let Some((user_id,)) = user_id else {
        return Err(ApiError::NotFound("user not found".to_string()));
    };

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM user_preferences WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    for category in &body.categories {
        sqlx::query(
            "INSERT INTO user_preferences (user_id, tender_category) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(category)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let mut subscriptions_created = 0;
    if let Some(topic_arn) = &state.config.tender_topic_arn {
        for category in &body.categories {
            let filter_policy =
                serde_json::json!({ "category": [category.to_lowercase()] }).to_string();
            match state
                .sns
                .subscribe()
                .topic_arn(topic_arn)
                .protocol("email")
                .endpoint(&body.email)
                .attributes("FilterPolicy", filter_policy)
                .send()
                .await
            {
                Ok(_) => subscriptions_created += 1,
                Err(e) => warn!(category = %category, error = %e, "failed to create subscription"),
            }
        }
    } else {
        warn!("TENDER_TOPIC_ARN not set; skipping subscription creation");
    }

    info!(email = %body.email, subscriptions_created, "preferences saved");
    Ok(Json(PreferencesResponse {
        email: body.email,
        categories: body.categories,
        subscriptions_created,
    }))
}
