use std::env;
use std::sync::OnceLock;
use tokio::sync::OnceCell;

/// Process-wide memoized DB password. Fetched at most once per cold start, per
/// the "fetch once per instance, never inline in configuration" rule.
static DB_PASSWORD: OnceCell<String> = OnceCell::const_new();
static SSM_PARAM_NAME: OnceLock<String> = OnceLock::new();

/// Fetch the DB password from SSM Parameter Store, memoizing it for the lifetime of
/// the process. `DB_PASSWORD_PARAM` names the parameter; it is always fetched with
/// decryption enabled since it is expected to be a SecureString.
pub async fn fetch_db_password() -> anyhow::Result<String> {
    DB_PASSWORD
        .get_or_try_init(|| async {
            let param_name = SSM_PARAM_NAME
                .get_or_init(|| env::var("DB_PASSWORD_PARAM").unwrap_or_default())
                .clone();
            if param_name.is_empty() {
                anyhow::bail!("DB_PASSWORD_PARAM not set");
            }

            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .load()
                .await;
            let ssm = aws_sdk_ssm::Client::new(&aws_config);

            let response = ssm
                .get_parameter()
                .name(&param_name)
                .with_decryption(true)
                .send()
                .await?;

            let value = response
                .parameter()
                .and_then(|p| p.value())
                .ok_or_else(|| anyhow::anyhow!("parameter {param_name} has no value"))?
                .to_string();

            tracing::info!("fetched and memoized DB password from parameter store");
            Ok::<_, anyhow::Error>(value)
        })
        .await
        .cloned()
}
