//! Relay array-connection cursors: base64 of `arrayconnection:<offset>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::compiler::CompileError;

const PREFIX: &str = "arrayconnection:";

/// Encodes the cursor of the edge at `offset`.
pub fn encode(offset: u64) -> String {
    STANDARD.encode(format!("{PREFIX}{offset}"))
}

/// Decodes a cursor back into its offset.
pub fn decode(cursor: &str) -> Result<u64, CompileError> {
    let invalid = || CompileError::InvalidCursor {
        cursor: cursor.to_owned(),
    };
    let bytes = STANDARD.decode(cursor).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    text.strip_prefix(PREFIX)
        .and_then(|offset| offset.parse::<u64>().ok())
        .ok_or_else(invalid)
}

/// First offset of the page following `after`.
pub fn start_after(after: Option<&str>) -> Result<u64, CompileError> {
    match after {
        Some(cursor) => Ok(decode(cursor)?.saturating_add(1)),
        None => Ok(0),
    }
}
