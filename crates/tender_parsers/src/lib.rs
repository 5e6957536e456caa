//! Pure, total string -> value extractors shared by every source normalizer.
//! Every parser here returns `None` for unrecognized input; none of them panic.

pub mod dates;
pub mod text;
pub mod tz;

pub use dates::{
    combine_date_time, extract_numeric_date_time, extract_textual_date, extract_textual_date_time,
    extract_time_range, parse_eskom_date, parse_iso, parse_sanral_numeric_date,
    parse_transnet_date, TimeRange,
};
pub use text::{clean_htmlish, extract_emails, extract_urls, guess_venue_from_line, squash_whitespace};
pub use tz::parse_offset;
