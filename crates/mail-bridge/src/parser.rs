//! Header decoding for fetched messages.

use mail_parser::MessageParser;
use tracing::trace;

use crate::{MailError, ParsedMessage, RawMessage};

/// Decode sender and subject from a fetched header section.
///
/// The input must be complete: a section that stops mid-line is treated as
/// truncated. RFC 2047 encoded words are decoded, so an encoded trigger
/// subject compares equal to its plain form.
pub fn parse(raw: RawMessage) -> Result<ParsedMessage, MailError> {
    let seq = raw.seq;
    let fail = |reason: &str| MailError::Parse {
        seq,
        reason: reason.to_string(),
    };

    if raw.bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(fail("empty message"));
    }

    if raw.bytes.last() != Some(&b'\n') {
        return Err(fail("truncated header section"));
    }

    let parsed = MessageParser::default()
        .parse(&raw.bytes)
        .ok_or_else(|| fail("undecodable MIME headers"))?;

    let sender = parsed
        .from()
        .and_then(|from| from.first())
        .and_then(|addr| addr.address())
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .ok_or_else(|| fail("missing From address"))?
        .to_string();

    let subject = parsed.subject().unwrap_or_default().to_string();

    trace!(seq, sender = %sender, subject = %subject, "Parsed message headers");

    Ok(ParsedMessage {
        seq,
        sender,
        subject,
    })
}
