pub mod config;
pub mod db;
pub mod error;
pub mod hash;
pub mod secrets;
pub mod types;

pub use config::Config;
pub use error::{IngestError, NormalizeError};
pub use types::{
    Contact, Document, NewContact, NewDocument, NewTender, NormalizedItem, ObjectNotification,
    PublishIntent, Source, Tender,
};
