//! Time bounds on mail store commands.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use mail_bridge::{
    FetchRange, MailError, MailEvent, MailTransport, MailboxStatus, RawMessage, SearchQuery,
};
use tokio::time::timeout;
use tracing::warn;

/// Wraps a transport so no command can stall the subsystem.
///
/// IDLE gets its own wait plus the command bound. After a timeout or a lost
/// connection the wrapper refuses further commands: the protocol state of
/// the session is unknown and the supervisor must reconnect.
pub struct DeadlineTransport<T> {
    inner: T,
    op_timeout: Duration,
    broken: bool,
}

impl<T: MailTransport> DeadlineTransport<T> {
    pub fn new(inner: T, op_timeout: Duration) -> Self {
        Self {
            inner,
            op_timeout,
            broken: false,
        }
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn check(&self) -> Result<(), MailError> {
        if self.broken {
            return Err(MailError::Connection(
                "session abandoned after an earlier failure".to_string(),
            ));
        }
        Ok(())
    }

    fn settle<R>(&mut self, result: Result<R, MailError>) -> Result<R, MailError> {
        if let Err(e) = &result {
            if e.is_connection_loss() {
                self.broken = true;
            }
        }
        result
    }
}

async fn bounded<R>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<R, MailError>>,
) -> Result<R, MailError> {
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, ?limit, "Mail command timed out");
            Err(MailError::Timeout {
                operation,
                elapsed: limit,
            })
        }
    }
}

#[async_trait]
impl<T: MailTransport> MailTransport for DeadlineTransport<T> {
    async fn open_mailbox(&mut self, name: &str, read_only: bool) -> Result<MailboxStatus, MailError> {
        self.check()?;
        let result = bounded("open mailbox", self.op_timeout, self.inner.open_mailbox(name, read_only)).await;
        self.settle(result)
    }

    async fn search(&mut self, query: &SearchQuery) -> Result<Vec<u32>, MailError> {
        self.check()?;
        let result = bounded("search", self.op_timeout, self.inner.search(query)).await;
        self.settle(result)
    }

    async fn fetch_headers(&mut self, range: &FetchRange) -> Result<Vec<RawMessage>, MailError> {
        self.check()?;
        let result = bounded("fetch", self.op_timeout, self.inner.fetch_headers(range)).await;
        self.settle(result)
    }

    async fn mark_seen(&mut self, ids: &[u32]) -> Result<(), MailError> {
        self.check()?;
        let result = bounded("store flags", self.op_timeout, self.inner.mark_seen(ids)).await;
        self.settle(result)
    }

    async fn wait_for_mail(&mut self, idle: Duration) -> Result<Vec<MailEvent>, MailError> {
        self.check()?;
        let limit = idle.saturating_add(self.op_timeout);
        let result = bounded("idle", limit, self.inner.wait_for_mail(idle)).await;
        self.settle(result)
    }

    async fn logout(&mut self) -> Result<(), MailError> {
        self.check()?;
        let result = bounded("logout", self.op_timeout, self.inner.logout()).await;
        self.settle(result)
    }
}
