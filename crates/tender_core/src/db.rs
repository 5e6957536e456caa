use crate::types::{Contact, Document, NewContact, NewDocument, NormalizedItem, Source, Tender};
use sqlx::{Pool, Postgres, Transaction};
use std::collections::HashMap;

/// Creates all tables this schema needs if they don't already exist. Matches the
/// teacher's `ensure_tables_exist` style: idempotent DDL run once at cold start,
/// not a separate migration tool.
pub async fn ensure_schema(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    for name in ["eskom", "sanral", "transnet", "etenders"] {
        sqlx::query("INSERT INTO sources (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenders (
            id BIGSERIAL PRIMARY KEY,
            source_id INTEGER NOT NULL REFERENCES sources(id),
            external_id TEXT NOT NULL,
            source_tender_id TEXT,
            title TEXT NOT NULL,
            description TEXT,
            category TEXT,
            location TEXT,
            buyer TEXT,
            procurement_method TEXT,
            procurement_method_details TEXT,
            status TEXT,
            tender_type TEXT,
            published_at TIMESTAMP WITH TIME ZONE,
            briefing_at TIMESTAMP WITH TIME ZONE,
            tender_start_at TIMESTAMP WITH TIME ZONE,
            closing_at TIMESTAMP WITH TIME ZONE,
            briefing_venue TEXT,
            briefing_compulsory BOOLEAN,
            briefing_details TEXT,
            value_amount DECIMAL(18,2),
            value_currency TEXT,
            hash TEXT NOT NULL,
            last_seen_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT now(),
            tender_box_address TEXT,
            target_audience TEXT,
            contract_type TEXT,
            project_type TEXT,
            queries_to TEXT,
            url TEXT,
            UNIQUE (source_id, external_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id BIGSERIAL PRIMARY KEY,
            tender_id BIGINT NOT NULL REFERENCES tenders(id) ON DELETE CASCADE,
            url TEXT,
            name TEXT,
            mime_type TEXT,
            published_at TIMESTAMP WITH TIME ZONE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id BIGSERIAL PRIMARY KEY,
            tender_id BIGINT NOT NULL REFERENCES tenders(id) ON DELETE CASCADE,
            name TEXT,
            email TEXT,
            phone TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            email TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_preferences (
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            tender_category TEXT NOT NULL,
            PRIMARY KEY (user_id, tender_category)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Cache-through lookup of a source's id, to avoid a round trip per item in a batch.
pub struct SourceCache {
    ids: HashMap<&'static str, i32>,
}

impl SourceCache {
    pub async fn load(pool: &Pool<Postgres>) -> Result<Self, sqlx::Error> {
        let mut ids = HashMap::new();
        for source in [
            Source::Eskom,
            Source::Sanral,
            Source::Transnet,
            Source::Etenders,
        ] {
            let row: (i32,) = sqlx::query_as("SELECT id FROM sources WHERE name = $1")
                .bind(source.as_str())
                .fetch_one(pool)
                .await?;
            ids.insert(source.as_str(), row.0);
        }
        Ok(Self { ids })
    }

    pub fn id_of(&self, source: Source) -> i32 {
        self.ids[source.as_str()]
    }
}

/// The canonical upsert (§6.2): insert-or-update on `(source_id, external_id)`,
/// followed by a full delete+reinsert of the tender's owned documents and contacts.
/// Runs inside the caller's transaction; returns the tender's id.
pub async fn upsert_tender(
    tx: &mut Transaction<'_, Postgres>,
    source_id: i32,
    item: &NormalizedItem,
) -> Result<i64, sqlx::Error> {
    let t = &item.tender;

    let (tender_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO tenders (
            source_id, external_id, source_tender_id, title, description, category,
            location, buyer, procurement_method, procurement_method_details, status,
            tender_type, published_at, briefing_at, tender_start_at, closing_at,
            briefing_venue, briefing_compulsory, briefing_details, value_amount,
            value_currency, hash, last_seen_at, tender_box_address, target_audience,
            contract_type, project_type, queries_to, url
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
            $17, $18, $19, $20, $21, $22, now(), $23, $24, $25, $26, $27, $28
        )
        ON CONFLICT (source_id, external_id) DO UPDATE SET
            source_tender_id = EXCLUDED.source_tender_id,
            title = EXCLUDED.title,
            description = EXCLUDED.description,
            category = EXCLUDED.category,
            location = EXCLUDED.location,
            buyer = EXCLUDED.buyer,
            procurement_method = EXCLUDED.procurement_method,
            procurement_method_details = EXCLUDED.procurement_method_details,
            status = EXCLUDED.status,
            tender_type = EXCLUDED.tender_type,
            published_at = EXCLUDED.published_at,
            briefing_at = EXCLUDED.briefing_at,
            tender_start_at = EXCLUDED.tender_start_at,
            closing_at = EXCLUDED.closing_at,
            briefing_venue = EXCLUDED.briefing_venue,
            briefing_compulsory = EXCLUDED.briefing_compulsory,
            briefing_details = EXCLUDED.briefing_details,
            value_amount = EXCLUDED.value_amount,
            value_currency = EXCLUDED.value_currency,
            hash = EXCLUDED.hash,
            last_seen_at = now(),
            tender_box_address = EXCLUDED.tender_box_address,
            target_audience = EXCLUDED.target_audience,
            contract_type = EXCLUDED.contract_type,
            project_type = EXCLUDED.project_type,
            queries_to = EXCLUDED.queries_to,
            url = EXCLUDED.url
        RETURNING id
        "#,
    )
    .bind(source_id)
    .bind(&t.external_id)
    .bind(&t.source_tender_id)
    .bind(&t.title)
    .bind(&t.description)
    .bind(&t.category)
    .bind(&t.location)
    .bind(&t.buyer)
    .bind(&t.procurement_method)
    .bind(&t.procurement_method_details)
    .bind(&t.status)
    .bind(&t.tender_type)
    .bind(t.published_at)
    .bind(t.briefing_at)
    .bind(t.tender_start_at)
    .bind(t.closing_at)
    .bind(&t.briefing_venue)
    .bind(t.briefing_compulsory)
    .bind(&t.briefing_details)
    .bind(&t.value_amount)
    .bind(&t.value_currency)
    .bind(&t.hash)
    .bind(&t.tender_box_address)
    .bind(&t.target_audience)
    .bind(&t.contract_type)
    .bind(&t.project_type)
    .bind(&t.queries_to)
    .bind(&t.url)
    .fetch_one(&mut **tx)
    .await?;

    replace_documents(tx, tender_id, &item.documents).await?;
    replace_contacts(tx, tender_id, &item.contacts).await?;

    Ok(tender_id)
}

async fn replace_documents(
    tx: &mut Transaction<'_, Postgres>,
    tender_id: i64,
    documents: &[NewDocument],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM documents WHERE tender_id = $1")
        .bind(tender_id)
        .execute(&mut **tx)
        .await?;

    for doc in documents {
        sqlx::query(
            "INSERT INTO documents (tender_id, url, name, mime_type, published_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(tender_id)
        .bind(&doc.url)
        .bind(&doc.name)
        .bind(&doc.mime_type)
        .bind(doc.published_at)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn replace_contacts(
    tx: &mut Transaction<'_, Postgres>,
    tender_id: i64,
    contacts: &[NewContact],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM contacts WHERE tender_id = $1")
        .bind(tender_id)
        .execute(&mut **tx)
        .await?;

    for contact in contacts {
        sqlx::query("INSERT INTO contacts (tender_id, name, email, phone) VALUES ($1, $2, $3, $4)")
            .bind(tender_id)
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

pub async fn fetch_tender(pool: &Pool<Postgres>, id: i64) -> Result<Option<Tender>, sqlx::Error> {
    sqlx::query_as::<_, Tender>("SELECT * FROM tenders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_documents(pool: &Pool<Postgres>, tender_id: i64) -> Result<Vec<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE tender_id = $1 ORDER BY id")
        .bind(tender_id)
        .fetch_all(pool)
        .await
}

pub async fn fetch_contacts(pool: &Pool<Postgres>, tender_id: i64) -> Result<Vec<Contact>, sqlx::Error> {
    sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE tender_id = $1 ORDER BY id")
        .bind(tender_id)
        .fetch_all(pool)
        .await
}
