use aws_config::BehaviorVersion;
use aws_sdk_lambda::types::InvocationType;
use aws_sdk_lambda::Client as LambdaClient;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use tender_core::Config;
use tracing::{error, info, warn};

const CONTINUATION_THRESHOLD: Duration = Duration::from_secs(260);
const HTTP_TIMEOUT: Duration = Duration::from_secs(45);
const MAX_RETRIES: u32 = 3;
const TRANSIENT_BACKOFF_SECS: [u64; 3] = [5, 10, 20];
const RATE_LIMIT_BACKOFF_SECS: [u64; 3] = [10, 20, 30];

#[derive(Debug, Serialize, Deserialize, Default)]
struct Request {
    max_pages: Option<u32>,
    test_mode: Option<bool>,
    start_page: Option<u32>,
    total_saved: Option<u32>,
    failed_pages: Option<Vec<u32>>,
}

#[derive(Debug, Serialize)]
struct Response {
    pages_saved: u32,
    failed_pages: Vec<u32>,
    continued: bool,
    message: String,
}

enum FetchOutcome {
    Saved,
    NoSuchPage,
}

enum FetchError {
    /// Transient failure: connection reset, timeout, bad response, or a 5xx status.
    Transient,
    /// The API explicitly signalled we're going too fast.
    RateLimited,
    /// A non-retriable failure that should abort the crawl.
    Fatal(String),
}

/// Fixed parameters shared across every page fetch in a crawl.
struct FetchSpec<'a> {
    client: &'a reqwest::Client,
    s3: &'a S3Client,
    bucket: &'a str,
    base_url: &'a str,
    page_size: u32,
    date_from: &'a str,
    date_to: &'a str,
}

async fn fetch_page(
    spec: &FetchSpec<'_>,
    page: u32,
) -> Result<Option<serde_json::Value>, FetchError> {
    let response = spec
        .client
        .get(spec.base_url)
        .query(&[
            ("pageSize", spec.page_size.to_string()),
            ("pageNumber", page.to_string()),
            ("dateFrom", spec.date_from.to_string()),
            ("dateTo", spec.date_to.to_string()),
        ])
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                warn!(page, error = %e, "connection reset/timeout");
                FetchError::Transient
            } else {
                FetchError::Fatal(e.to_string())
            }
        })?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited);
    }
    if status.is_server_error() {
        warn!(page, %status, "upstream 5xx");
        return Err(FetchError::Transient);
    }
    if !status.is_success() {
        return Err(FetchError::Fatal(format!("HTTP {status}")));
    }

    let body: serde_json::Value = response.json().await.map_err(|e| {
        warn!(page, error = %e, "ERR_BAD_RESPONSE");
        FetchError::Transient
    })?;
    Ok(Some(body))
}

/// Fetches one page with up to [`MAX_RETRIES`] retries on transient/rate-limit
/// failures. A 404 resolves to [`FetchOutcome::NoSuchPage`] without retrying; a
/// fatal error propagates immediately.
async fn fetch_page_with_retry(spec: &FetchSpec<'_>, page: u32) -> Result<FetchOutcome, FetchError> {
    let mut attempt = 0;
    loop {
        match fetch_page(spec, page).await {
            Ok(None) => return Ok(FetchOutcome::NoSuchPage),
            Ok(Some(body)) => {
                persist_page(spec.s3, spec.bucket, page, &body)
                    .await
                    .map_err(|e| FetchError::Fatal(e.to_string()))?;
                return Ok(FetchOutcome::Saved);
            }
            Err(FetchError::Fatal(msg)) => return Err(FetchError::Fatal(msg)),
            Err(err @ (FetchError::Transient | FetchError::RateLimited)) => {
                if attempt >= MAX_RETRIES {
                    return Err(err);
                }
                let delay = match &err {
                    FetchError::RateLimited => RATE_LIMIT_BACKOFF_SECS[attempt as usize],
                    _ => TRANSIENT_BACKOFF_SECS[attempt as usize],
                };
                warn!(page, attempt, delay, "retrying page after transient failure");
                tokio::time::sleep(Duration::from_secs(delay)).await;
                attempt += 1;
            }
        }
    }
}

async fn persist_page(
    s3: &S3Client,
    bucket: &str,
    page: u32,
    body: &serde_json::Value,
) -> anyhow::Result<()> {
    let timestamp_ms = Utc::now().timestamp_millis();
    let key = format!("etenders/etenders-p{page:04}-{timestamp_ms}.json");
    let bytes = serde_json::to_vec(body)?;

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(bytes))
        .metadata("page", page.to_string())
        .metadata("timestamp", timestamp_ms.to_string())
        .send()
        .await?;

    info!(key, "persisted page");
    Ok(())
}

async fn invoke_continuation(
    lambda: &LambdaClient,
    function_name: &str,
    request: &Request,
) -> anyhow::Result<()> {
    let payload = serde_json::to_vec(request)?;
    lambda
        .invoke()
        .function_name(function_name)
        .invocation_type(InvocationType::Event)
        .payload(payload.into())
        .send()
        .await?;
    Ok(())
}

/// How many pages one iteration of the crawl loop advances by: 3 in concurrent mode
/// (up to three in-flight fetches with independent error capture), 1 sequentially.
const CONCURRENT_BATCH: u32 = 3;

async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    info!("=== OCDS FETCHER STARTED ===");

    let config = Config::from_env()
        .await
        .map_err(|e| Error::from(e.to_string()))?;
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let s3 = S3Client::new(&aws_config);
    let lambda = LambdaClient::new(&aws_config);
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::from(format!("failed to build http client: {e}")))?;

    let test_mode = event.payload.test_mode.unwrap_or(false);
    let start_page = event.payload.start_page.unwrap_or(1);
    let max_pages = if test_mode { 1 } else { event.payload.max_pages.unwrap_or(config.max_pages) };
    let mut total_saved = event.payload.total_saved.unwrap_or(0);
    let mut failed_pages = event.payload.failed_pages.clone().unwrap_or_default();

    let base_url = "https://ocds-api.etenders.gov.za/api/OCDSReleases";
    let date_from = "2020-01-01";
    let date_to = "2030-01-01";

    let start = Instant::now();
    let mut page = start_page;
    let last_page = start_page + max_pages;
    let spec = FetchSpec {
        client: &http,
        s3: &s3,
        bucket: &config.bucket,
        base_url,
        page_size: config.page_size,
        date_from,
        date_to,
    };

    while page < last_page {
        if !test_mode && start.elapsed() >= CONTINUATION_THRESHOLD {
            let continuation = Request {
                max_pages: Some(last_page - page),
                test_mode: Some(false),
                start_page: Some(page),
                total_saved: Some(total_saved),
                failed_pages: Some(failed_pages.clone()),
            };
            let function_name = env::var("AWS_LAMBDA_FUNCTION_NAME").unwrap_or_default();
            invoke_continuation(&lambda, &function_name, &continuation)
                .await
                .map_err(|e| Error::from(format!("failed to self-invoke: {e}")))?;

            return Ok(Response {
                pages_saved: total_saved,
                failed_pages,
                continued: true,
                message: format!("continuation scheduled from page {page}"),
            });
        }

        if config.use_concurrent && !test_mode {
            let batch_end = (page + CONCURRENT_BATCH).min(last_page);
            let fetches = (page..batch_end).map(|p| fetch_page_with_retry(&spec, p));
            let results = futures::future::join_all(fetches).await;

            let mut hit_end = false;
            for (p, result) in (page..batch_end).zip(results) {
                match result {
                    Ok(FetchOutcome::Saved) => total_saved += 1,
                    Ok(FetchOutcome::NoSuchPage) => {
                        info!(page = p, "no such page, terminating crawl");
                        hit_end = true;
                    }
                    Err(FetchError::Fatal(msg)) => {
                        return Err(Error::from(format!("fatal error on page {p}: {msg}")));
                    }
                    Err(_) => {
                        error!(page = p, "page failed after exhausting retries");
                        failed_pages.push(p);
                    }
                }
            }
            page = batch_end;
            if hit_end {
                break;
            }
        } else {
            match fetch_page_with_retry(&spec, page).await {
                Ok(FetchOutcome::Saved) => {
                    total_saved += 1;
                }
                Ok(FetchOutcome::NoSuchPage) => {
                    info!(page, "no such page, terminating crawl");
                    break;
                }
                Err(FetchError::Fatal(msg)) => {
                    return Err(Error::from(format!("fatal error on page {page}: {msg}")));
                }
                Err(_) => {
                    error!(page, "page failed after exhausting retries");
                    failed_pages.push(page);
                }
            }
            page += 1;
        }

        if config.throttle_ms > 0 && !test_mode {
            tokio::time::sleep(Duration::from_millis(config.throttle_ms)).await;
        }
    }

    info!("=== OCDS FETCHER COMPLETED ===");
    Ok(Response {
        pages_saved: total_saved,
        failed_pages: failed_pages.clone(),
        continued: false,
        message: format!("saved {total_saved} pages, {} failed", failed_pages.len()),
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    lambda_runtime::run(service_fn(function_handler)).await
}
