use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the four portals this pipeline ingests from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Eskom,
    Sanral,
    Transnet,
    Etenders,
}

impl Source {
    /// The `name` stored in the `sources` table and used as the object-store key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Eskom => "eskom",
            Source::Sanral => "sanral",
            Source::Transnet => "transnet",
            Source::Etenders => "etenders",
        }
    }

    /// Resolve a source from an object-store key prefix (`"eskom/..."` etc). Unknown
    /// prefixes return `None` so the caller can skip the notification.
    pub fn from_key_prefix(key: &str) -> Option<Self> {
        let prefix = key.split('/').next()?;
        match prefix {
            "eskom" => Some(Source::Eskom),
            "sanral" => Some(Source::Sanral),
            "transnet" => Some(Source::Transnet),
            "etenders" => Some(Source::Etenders),
            _ => None,
        }
    }
}

/// A tender row as it exists in (or is about to be upserted into) the `tenders` table.
/// This is the shape produced by a normalizer and consumed by the canonical upsert;
/// it carries no `id` because that's only known once the row is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTender {
    pub external_id: String,
    pub source_tender_id: Option<String>,

    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub buyer: Option<String>,
    pub procurement_method: Option<String>,
    pub procurement_method_details: Option<String>,
    pub status: Option<String>,
    pub tender_type: Option<String>,

    pub published_at: Option<DateTime<Utc>>,
    pub briefing_at: Option<DateTime<Utc>>,
    pub tender_start_at: Option<DateTime<Utc>>,
    pub closing_at: Option<DateTime<Utc>>,

    pub briefing_venue: Option<String>,
    pub briefing_compulsory: Option<bool>,
    pub briefing_details: Option<String>,

    pub value_amount: Option<BigDecimal>,
    pub value_currency: Option<String>,

    pub hash: String,

    pub tender_box_address: Option<String>,
    pub target_audience: Option<String>,
    pub contract_type: Option<String>,
    pub project_type: Option<String>,
    pub queries_to: Option<String>,
    pub url: Option<String>,
}

/// A document as extracted by a normalizer, not yet tied to a `tender_id`.
/// `url` is optional: some source records carry only a file name (see DESIGN.md,
/// open question (a)) and such entries are still worth keeping for their `name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub url: Option<String>,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A contact as extracted by a normalizer, not yet tied to a `tender_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The full result of normalizing one raw record: a tender plus its owned children.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub tender: NewTender,
    pub documents: Vec<NewDocument>,
    pub contacts: Vec<NewContact>,
}

/// A persisted tender row, as read back from the `tenders` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tender {
    pub id: i64,
    pub source_id: i32,
    pub external_id: String,
    pub source_tender_id: Option<String>,

    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub buyer: Option<String>,
    pub procurement_method: Option<String>,
    pub procurement_method_details: Option<String>,
    pub status: Option<String>,
    pub tender_type: Option<String>,

    pub published_at: Option<DateTime<Utc>>,
    pub briefing_at: Option<DateTime<Utc>>,
    pub tender_start_at: Option<DateTime<Utc>>,
    pub closing_at: Option<DateTime<Utc>>,

    pub briefing_venue: Option<String>,
    pub briefing_compulsory: Option<bool>,
    pub briefing_details: Option<String>,

    pub value_amount: Option<BigDecimal>,
    pub value_currency: Option<String>,

    pub hash: String,
    pub last_seen_at: DateTime<Utc>,

    pub tender_box_address: Option<String>,
    pub target_audience: Option<String>,
    pub contract_type: Option<String>,
    pub project_type: Option<String>,
    pub queries_to: Option<String>,
    pub url: Option<String>,
}

/// A persisted document row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: i64,
    pub tender_id: i64,
    pub url: Option<String>,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// A persisted contact row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub tender_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// One object-store notification the Ingest Worker acts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectNotification {
    pub bucket: String,
    pub key: String,
}

/// A publish intent queued by the Ingest Worker for the Notification Publisher,
/// materialized only after the owning batch has committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishIntent {
    pub tender_id: i64,
    pub title: String,
    pub category: Option<String>,
    pub source: Source,
    pub published_at: Option<DateTime<Utc>>,
    pub closing_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub description: Option<String>,
}
