//! 도메인 모델.

pub mod filters;
pub mod permission;
pub mod record;
pub mod token;
pub mod user;

pub use filters::{Filters, Metadata, SortDirection, RECORD_SORT_SAFELIST};
pub use permission::{Permissions, RECORDS_READ, RECORDS_WRITE};
pub use record::{validate_record, Record, RecordPatch, Runtime, RuntimeParseError};
pub use token::{
    generate_token, token_digest, validate_token_plaintext, IssuedToken, Token, TokenError,
    TokenScope, TOKEN_BYTES, TOKEN_PLAINTEXT_LEN,
};
pub use user::{Identity, NewUser, User};
