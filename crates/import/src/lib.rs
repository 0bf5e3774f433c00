//! Statement reading and payment matching. Everything here is pure and
//! synchronous; persistence lives in `kodi-storage` and orchestration in
//! `kodi-ingest`.

pub mod config;
pub mod detect;
pub mod dialects;
pub mod error;
pub mod extract;
pub mod match_engine;
pub mod statement;

pub use config::MatcherConfig;
pub use detect::{detect, detect_with_signal, DetectionSignal};
pub use error::{ConfigError, DateParseError, RowParseError, StatementError};
pub use extract::{
    extract_account_ref, extract_paybill, extract_phone_number, extract_reference_code,
    parse_amount, parse_date,
};
pub use match_engine::ReconciliationMatcher;
pub use statement::{parse_statement, parse_with_dialect, ParsedStatement};
