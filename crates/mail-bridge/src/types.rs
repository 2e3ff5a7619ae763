/// An email message to send.
#[derive(Debug, Clone)]
pub struct Email {
    /// Primary recipients
    pub to: Vec<String>,
    /// Email subject
    pub subject: String,
    /// Plain text body
    pub body: String,
}

impl Email {
    /// Create a new email with a single recipient.
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// A fetched message section as the server delivered it.
///
/// Owned by the parser while it is decoded, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Message sequence number in the open mailbox
    pub seq: u32,
    /// Header bytes (`FROM` and `SUBJECT` fields)
    pub bytes: Vec<u8>,
}

impl RawMessage {
    pub fn new(seq: u32, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            seq,
            bytes: bytes.into(),
        }
    }
}

/// Sender and subject decoded from a [`RawMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Sequence number the message was fetched under
    pub seq: u32,
    /// First address of the `From` list
    pub sender: String,
    /// Decoded `Subject`, empty when the header is absent
    pub subject: String,
}

/// State of the selected mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Mailbox name
    pub name: String,
    /// Total message count reported by the server
    pub exists: u32,
    /// Whether the mailbox was opened with EXAMINE
    pub read_only: bool,
}

/// Search criteria for `SEARCH`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Only messages without `\Seen`
    pub unseen: bool,
    /// Subject substring (server-side matching is case-insensitive)
    pub subject: Option<String>,
}

impl SearchQuery {
    /// Unseen messages whose subject contains `subject`.
    pub fn unseen_with_subject(subject: impl Into<String>) -> Self {
        Self {
            unseen: true,
            subject: Some(subject.into()),
        }
    }

    /// Render as IMAP search keys.
    pub fn to_imap(&self) -> String {
        let mut keys = Vec::new();
        if self.unseen {
            keys.push("UNSEEN".to_string());
        }
        if let Some(subject) = &self.subject {
            keys.push(format!("SUBJECT {}", quote(subject)));
        }
        if keys.is_empty() {
            keys.push("ALL".to_string());
        }
        keys.join(" ")
    }
}

/// Quote a string as an IMAP quoted string.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Which messages to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRange {
    /// Explicit sequence numbers
    Ids(Vec<u32>),
    /// `start` through `end`, inclusive
    Span { start: u32, end: u32 },
    /// `start` through the newest message (`start:*`)
    From(u32),
}

impl FetchRange {
    /// Render as an IMAP sequence set, or `None` when nothing would be fetched.
    pub fn to_sequence_set(&self) -> Option<String> {
        match self {
            FetchRange::Ids(ids) if ids.is_empty() => None,
            FetchRange::Ids(ids) => Some(
                ids.iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            FetchRange::Span { start, end } if start > end => None,
            FetchRange::Span { start, end } if start == end => Some(start.to_string()),
            FetchRange::Span { start, end } => Some(format!("{}:{}", start, end)),
            FetchRange::From(start) => Some(format!("{}:*", start)),
        }
    }
}

/// Mailbox change pushed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailEvent {
    /// New total message count
    Exists(u32),
    /// A message was removed; later sequence numbers shift down by one
    Expunge(u32),
}
