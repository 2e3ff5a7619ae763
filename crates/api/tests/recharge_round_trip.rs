//! Spend all credits, reply to the notice, query again.

use std::sync::{Arc, Mutex};

use api::{Classifier, ClassifierError, CreditGate, NoticeSender};
use async_trait::async_trait;
use database::{mentor, Database};
use mail_bridge::{MailError, RawMessage};
use recharge::{Disposition, MessageRouter, RechargeTrigger, SqlLedger};

struct EchoClassifier;

#[async_trait]
impl Classifier for EchoClassifier {
    async fn classify(&self, _prompt: &str) -> Result<String, ClassifierError> {
        Ok("Ada".to_string())
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl NoticeSender for Outbox {
    async fn send_recharge_notice(&self, email: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.to_string());
        Ok(())
    }
}

async fn setup() -> (Database, CreditGate, Arc<Outbox>) {
    // One connection: the in-memory store is shared-cache and rejects parallel writers
    let db = Database::connect_with_pool_size("sqlite::memory:", 1).await.unwrap();
    db.migrate().await.unwrap();
    mentor::insert_mentor(db.pool(), "Ada", "fintech", "").await.unwrap();

    let outbox = Arc::new(Outbox::default());
    let gate = CreditGate::new(db.clone(), Arc::new(EchoClassifier), outbox.clone());
    (db, gate, outbox)
}

fn reply(seq: u32, from: &str, subject: &str) -> RawMessage {
    RawMessage::new(
        seq,
        format!("From: {}\r\nSubject: {}\r\n\r\n", from, subject).into_bytes(),
    )
}

#[tokio::test]
async fn test_reply_restores_credits() {
    let (db, gate, outbox) = setup().await;
    gate.register("User@X.com").await.unwrap();

    for _ in 0..5 {
        assert!(!gate.answer("user@x.com", "q").await.unwrap().exhausted);
    }
    assert!(gate.answer("user@x.com", "q").await.unwrap().exhausted);

    // The notice goes out on a background task
    for _ in 0..50 {
        if !outbox.sent.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(*outbox.sent.lock().unwrap(), vec!["user@x.com".to_string()]);

    let router = MessageRouter::new(RechargeTrigger::default(), SqlLedger::new(db, 5));

    // Mail clients keep the sender's capitalization
    let disposition = router.route(reply(1, "User@X.com", "recharge 5 credits")).await;
    assert_eq!(
        disposition,
        Disposition::Granted {
            email: "User@X.com".to_string(),
            credits: 5
        }
    );

    // A duplicate reply does not stack credits
    let duplicate = router.route(reply(2, "user@x.com", "recharge 5 credits")).await;
    assert!(matches!(duplicate, Disposition::AlreadyFunded { credits: 5, .. }));

    let answer = gate.answer("user@x.com", "q").await.unwrap();
    assert_eq!(answer.answer, "Ada");
    assert_eq!(answer.credits_remaining, 4);
}

#[tokio::test]
async fn test_concurrent_debits_and_grant_stay_in_bounds() {
    let (db, gate, _) = setup().await;
    gate.register("a@x.com").await.unwrap();
    database::credit::set_credits(db.pool(), "a@x.com", 0).await.unwrap();

    let gate = Arc::new(gate);
    let router = Arc::new(MessageRouter::new(
        RechargeTrigger::default(),
        SqlLedger::new(db.clone(), 5),
    ));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let gate = Arc::clone(&gate);
        tasks.push(tokio::spawn(async move {
            gate.answer("a@x.com", &format!("q{}", i)).await.map(|a| !a.exhausted)
        }));
    }
    let grant = {
        let router = Arc::clone(&router);
        tokio::spawn(async move { router.route(reply(1, "a@x.com", "recharge 5 credits")).await })
    };

    let mut answered = 0;
    for task in tasks {
        if task.await.unwrap().unwrap() {
            answered += 1;
        }
    }
    assert_eq!(
        grant.await.unwrap(),
        Disposition::Granted {
            email: "a@x.com".to_string(),
            credits: 5
        }
    );

    let balance = gate.balance("a@x.com").await.unwrap();
    assert!(answered <= 5);
    assert_eq!(balance, 5 - answered as i64);
}
