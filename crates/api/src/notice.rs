//! Recharge instructions sent to users whose credits ran out.

use async_trait::async_trait;
use mail_bridge::{Email, MailError, MailSender};
use recharge::RechargeConfig;

/// Delivers the recharge notice.
#[async_trait]
pub trait NoticeSender: Send + Sync {
    async fn send_recharge_notice(&self, email: &str) -> Result<(), MailError>;
}

/// [`NoticeSender`] over SMTP.
///
/// The reply address is the account the recharge supervisor watches, so the
/// user only has to answer with the trigger subject.
pub struct MailNotifier {
    sender: MailSender,
    subject: String,
    credits: i64,
}

impl MailNotifier {
    pub fn new(sender: MailSender, recharge: &RechargeConfig) -> Self {
        Self {
            sender,
            subject: recharge.trigger_subject.clone(),
            credits: recharge.replenish_credits,
        }
    }

    pub fn notice(&self, to: &str) -> Email {
        recharge_notice(to, self.sender.from_address(), &self.subject, self.credits)
    }
}

/// The notice itself. Its subject is the trigger, so a plain reply recharges.
pub fn recharge_notice(to: &str, mailbox: &str, subject: &str, credits: i64) -> Email {
    let body = format!(
        "Your query credits have reached 0. To recharge with {} more credits send an email to \
         {} with subject as: \"{}\".",
        credits, mailbox, subject
    );
    Email::new(to, subject, body)
}

#[async_trait]
impl NoticeSender for MailNotifier {
    async fn send_recharge_notice(&self, email: &str) -> Result<(), MailError> {
        self.sender.send(&self.notice(email)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_text() {
        let email = recharge_notice("a@x.com", "bot@x.com", "recharge 5 credits", 5);
        assert_eq!(email.to, vec!["a@x.com".to_string()]);
        assert_eq!(email.subject, "recharge 5 credits");
        assert_eq!(
            email.body,
            "Your query credits have reached 0. To recharge with 5 more credits send an email to \
             bot@x.com with subject as: \"recharge 5 credits\"."
        );
    }
}
