use std::time::Duration;

use async_imap::extensions::idle::IdleResponse;
use async_imap::types::UnsolicitedResponse;
use async_imap::Session;
use async_native_tls::TlsStream;
use async_std::net::TcpStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use imap_proto::types::{MailboxDatum, Response};
use tracing::{debug, info, instrument, warn};

use crate::config::TlsMode;
use crate::transport::{MailConnector, MailTransport, HEADER_FIELDS};
use crate::{FetchRange, MailConfig, MailError, MailEvent, MailboxStatus, RawMessage, SearchQuery};

type ImapSession = Session<TlsStream<TcpStream>>;

/// IMAP session over TLS.
///
/// The session is held in an `Option` because IDLE consumes it for the
/// duration of the wait; it is `None` only after a failure that lost it.
pub struct ImapClient {
    session: Option<ImapSession>,
}

impl ImapClient {
    /// Connect and authenticate to the IMAP server.
    #[instrument(skip(config), fields(host = %config.imap_host, port = config.imap_port, tls = ?config.imap_tls))]
    pub async fn connect(config: &MailConfig) -> Result<Self, MailError> {
        let addr = format!("{}:{}", config.imap_host, config.imap_port);
        debug!("Connecting to IMAP server at {}", addr);

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| MailError::Connection(format!("Failed to connect to {}: {}", addr, e)))?;

        let client = match config.imap_tls {
            TlsMode::Implicit => {
                let tls_stream = tls_connector(config)
                    .connect(&config.imap_host, stream)
                    .await
                    .map_err(|e| MailError::Tls(format!("TLS handshake failed: {}", e)))?;

                let mut client = async_imap::Client::new(tls_stream);
                read_greeting(&mut client).await?;
                client
            }
            TlsMode::StartTls => {
                let mut client = async_imap::Client::new(stream);
                read_greeting(&mut client).await?;

                debug!("Received server greeting, initiating STARTTLS");
                client
                    .run_command_and_check_ok("STARTTLS", None)
                    .await
                    .map_err(|e| MailError::Tls(format!("STARTTLS command failed: {}", e)))?;

                let tls_stream = tls_connector(config)
                    .connect(&config.imap_host, client.into_inner())
                    .await
                    .map_err(|e| MailError::Tls(format!("TLS upgrade failed: {}", e)))?;

                // No greeting after STARTTLS
                async_imap::Client::new(tls_stream)
            }
        };

        let session = client
            .login(&config.username, config.password())
            .await
            .map_err(|(e, _)| MailError::Auth(format!("Login failed: {}", e)))?;

        info!(username = %config.username, "Connected to IMAP server");
        Ok(Self {
            session: Some(session),
        })
    }

    fn session(&mut self) -> Result<&mut ImapSession, MailError> {
        self.session
            .as_mut()
            .ok_or_else(|| MailError::Connection("session lost".to_string()))
    }

    /// Mailbox changes the server reported while other commands were running.
    fn drain_unsolicited(&mut self) -> Vec<MailEvent> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        while let Ok(response) = session.unsolicited_responses.try_recv() {
            match response {
                UnsolicitedResponse::Exists(n) => events.push(MailEvent::Exists(n)),
                UnsolicitedResponse::Expunge(n) => events.push(MailEvent::Expunge(n)),
                other => debug!("Ignoring unsolicited response: {:?}", other),
            }
        }
        events
    }
}

fn tls_connector(config: &MailConfig) -> async_native_tls::TlsConnector {
    async_native_tls::TlsConnector::new()
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .danger_accept_invalid_hostnames(config.accept_invalid_certs)
}

async fn read_greeting<T>(client: &mut async_imap::Client<T>) -> Result<(), MailError>
where
    T: futures::AsyncRead + futures::AsyncWrite + Unpin + std::fmt::Debug + Send,
{
    client
        .read_response()
        .await
        .ok_or_else(|| MailError::Connection("No greeting from server".to_string()))?
        .map_err(|e| MailError::Connection(format!("IO error reading greeting: {}", e)))?;
    Ok(())
}

fn event_from_idle(response: &Response<'_>) -> Option<MailEvent> {
    match response {
        Response::MailboxData(MailboxDatum::Exists(n)) => Some(MailEvent::Exists(*n)),
        Response::Expunge(n) => Some(MailEvent::Expunge(*n)),
        _ => None,
    }
}

#[async_trait]
impl MailTransport for ImapClient {
    #[instrument(skip(self))]
    async fn open_mailbox(&mut self, name: &str, read_only: bool) -> Result<MailboxStatus, MailError> {
        let session = self.session()?;
        let mailbox = if read_only {
            session.examine(name).await
        } else {
            session.select(name).await
        }
        .map_err(|e| MailError::from_imap(&format!("open '{}'", name), e))?;

        debug!("Opened mailbox '{}' with {} messages", name, mailbox.exists);
        Ok(MailboxStatus {
            name: name.to_string(),
            exists: mailbox.exists,
            read_only,
        })
    }

    #[instrument(skip(self), fields(query = %query.to_imap()))]
    async fn search(&mut self, query: &SearchQuery) -> Result<Vec<u32>, MailError> {
        let ids = self
            .session()?
            .search(query.to_imap())
            .await
            .map_err(|e| MailError::from_imap("SEARCH", e))?;

        let mut result: Vec<u32> = ids.into_iter().collect();
        result.sort_unstable();
        debug!("Search found {} messages", result.len());
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn fetch_headers(&mut self, range: &FetchRange) -> Result<Vec<RawMessage>, MailError> {
        let Some(set) = range.to_sequence_set() else {
            return Ok(Vec::new());
        };

        let fetches: Vec<_> = self
            .session()?
            .fetch(&set, HEADER_FIELDS)
            .await
            .map_err(|e| MailError::from_imap("FETCH", e))?
            .try_collect()
            .await
            .map_err(|e| MailError::from_imap("FETCH (collect)", e))?;

        let mut messages = Vec::with_capacity(fetches.len());
        for fetch in fetches.iter() {
            match fetch.header().or_else(|| fetch.body()) {
                Some(bytes) => messages.push(RawMessage::new(fetch.message, bytes.to_vec())),
                None => warn!(seq = fetch.message, "Fetch response carried no header section"),
            }
        }

        messages.sort_by_key(|m| m.seq);
        debug!("Fetched {} messages for {}", messages.len(), set);
        Ok(messages)
    }

    #[instrument(skip(self))]
    async fn mark_seen(&mut self, ids: &[u32]) -> Result<(), MailError> {
        let Some(set) = FetchRange::Ids(ids.to_vec()).to_sequence_set() else {
            return Ok(());
        };

        let _: Vec<_> = self
            .session()?
            .store(&set, "+FLAGS.SILENT (\\Seen)")
            .await
            .map_err(|e| MailError::from_imap("STORE", e))?
            .try_collect()
            .await
            .map_err(|e| MailError::from_imap("STORE (collect)", e))?;
        Ok(())
    }

    async fn wait_for_mail(&mut self, timeout: Duration) -> Result<Vec<MailEvent>, MailError> {
        // EXISTS responses that arrived during earlier commands come first
        let pending = self.drain_unsolicited();
        if !pending.is_empty() {
            debug!("Delivering {} queued mailbox events", pending.len());
            return Ok(pending);
        }

        let session = self
            .session
            .take()
            .ok_or_else(|| MailError::Connection("session lost".to_string()))?;

        let mut idle = session.idle();
        idle.init()
            .await
            .map_err(|e| MailError::from_imap("IDLE", e))?;

        let response = {
            let (wait, _stop) = idle.wait_with_timeout(timeout);
            wait.await
        };

        let session = idle
            .done()
            .await
            .map_err(|e| MailError::from_imap("DONE", e))?;
        self.session = Some(session);

        let mut events: Vec<MailEvent> =
            match response.map_err(|e| MailError::from_imap("IDLE wait", e))? {
                IdleResponse::NewData(data) => event_from_idle(data.parsed()).into_iter().collect(),
                IdleResponse::Timeout | IdleResponse::ManualInterrupt => Vec::new(),
            };
        events.extend(self.drain_unsolicited());
        Ok(events)
    }

    async fn logout(&mut self) -> Result<(), MailError> {
        if let Some(mut session) = self.session.take() {
            session
                .logout()
                .await
                .map_err(|e| MailError::from_imap("LOGOUT", e))?;
        }
        Ok(())
    }
}

/// Opens [`ImapClient`] sessions from a fixed configuration.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    config: MailConfig,
}

impl ImapConnector {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }
}

#[async_trait]
impl MailConnector for ImapConnector {
    type Transport = ImapClient;

    async fn connect(&self) -> Result<ImapClient, MailError> {
        ImapClient::connect(&self.config).await
    }
}
