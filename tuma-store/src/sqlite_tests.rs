//! SQLite store integration tests.

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use tuma_types::{
        Clock, Currency, DailyLimitPolicy, DomainError, EventPublisher, FxService, IdempotencyKey,
        LedgerEntry, LedgerRepository, LockedRate, Money, OneTimeSecretStore, OutboxStatus,
        RepoError, Transaction, TransactionId, TransactionRepository, TransactionStatus,
        TransactionType, UserId, topics,
    };

    use crate::fx::IndicativeFxService;
    use crate::limits::SqliteLimitPolicy;
    use crate::secrets::InMemorySecretStore;
    use crate::sqlite::SqliteStore;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    struct TestClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl TestClock {
        fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::seconds(seconds);
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    async fn setup_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    fn deposit_tx(user: UserId, key: &str) -> Transaction {
        let rate =
            LockedRate::lock(0.0076, Currency::KES, Currency::USD, fixed_now(), 45).unwrap();
        Transaction::new(
            TransactionId::new_at(fixed_now()),
            user,
            TransactionType::Deposit,
            Money::new(50_000, Currency::KES).unwrap(),
            IdempotencyKey::new(key).unwrap(),
            rate,
            fixed_now(),
        )
        .unwrap()
    }

    /// Confirms the transaction in memory and builds its balanced pair.
    fn settled(mut tx: Transaction, occurred_at: DateTime<Utc>) -> (Transaction, LedgerEntry, LedgerEntry) {
        tx.confirm_external("mm-ref".into(), occurred_at).unwrap();
        let usd = tx.rate.convert(tx.amount).unwrap();
        let (user_entry, house_entry) = LedgerEntry::balanced_pair(&tx, usd, tx.amount, occurred_at);
        (tx, user_entry, house_entry)
    }

    fn generous_cap() -> Money {
        Money::new(10_000_000, Currency::KES).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────
    // Transaction repository
    // ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_insert_and_find_roundtrip() {
        let store = setup_store().await;
        let user = UserId::new();
        let tx = deposit_tx(user, "round-trip");

        store.insert(&tx).await.unwrap();

        let found = store.find_by_id(tx.id).await.unwrap().unwrap();
        assert_eq!(found.id, tx.id);
        assert_eq!(found.user_id, user);
        assert_eq!(found.kind, TransactionType::Deposit);
        assert_eq!(found.status, TransactionStatus::Created);
        assert_eq!(found.amount.cents(), 50_000);
        assert_eq!(found.amount.currency(), Currency::KES);
        assert_eq!(found.idempotency_key.as_str(), "round-trip");
        assert_eq!(found.rate.rate(), 0.0076);
        assert_eq!(found.rate.ttl_seconds(), 45);
        assert_eq!(found.created_at, fixed_now());
    }

    #[tokio::test]
    async fn test_duplicate_idempotency_key_conflicts() {
        let store = setup_store().await;
        let user = UserId::new();

        store.insert(&deposit_tx(user, "dup-key")).await.unwrap();
        let result = store.insert(&deposit_tx(user, "dup-key")).await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));

        // keys are scoped per user
        store
            .insert(&deposit_tx(UserId::new(), "dup-key"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_exists_by_idempotency_key() {
        let store = setup_store().await;
        let user = UserId::new();
        let key = IdempotencyKey::new("probe").unwrap();

        assert!(!store.exists_by_idempotency_key(user, &key).await.unwrap());
        store.insert(&deposit_tx(user, "probe")).await.unwrap();
        assert!(store.exists_by_idempotency_key(user, &key).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts_keep_one_row() {
        let store = Arc::new(setup_store().await);
        let user = UserId::new();
        let a = deposit_tx(user, "race-key");
        let b = deposit_tx(user, "race-key");

        let (ra, rb) = tokio::join!(store.insert(&a), store.insert(&b));

        assert!(
            ra.is_ok() != rb.is_ok(),
            "exactly one submission must win the insert race"
        );
        let key = IdempotencyKey::new("race-key").unwrap();
        let winner = store
            .find_by_idempotency_key(user, &key)
            .await
            .unwrap()
            .unwrap();
        assert!(winner.id == a.id || winner.id == b.id);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM transactions WHERE user_id = ?")
                .bind(user.to_string())
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_update_refuses_terminal_rows() {
        let store = setup_store().await;
        let mut tx = deposit_tx(UserId::new(), "terminal");
        store.insert(&tx).await.unwrap();

        tx.mark_failed("provider timeout".into(), fixed_now()).unwrap();
        store.update(&tx).await.unwrap();

        let stored = store.find_by_id(tx.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some("provider timeout"));

        // a second write to the settled row is refused
        let result = store.update(&tx).await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_unknown_row_is_not_found() {
        let store = setup_store().await;
        let tx = deposit_tx(UserId::new(), "ghost");
        let result = store.update(&tx).await;
        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    // ─────────────────────────────────────────────────────────────────
    // Ledger repository
    // ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_commit_settlement_writes_balanced_pair() {
        let store = setup_store().await;
        let user = UserId::new();
        let tx = deposit_tx(user, "settle");
        store.insert(&tx).await.unwrap();

        let (tx, user_entry, house_entry) = settled(tx, fixed_now());
        store
            .commit_settlement(&tx, user_entry, house_entry, generous_cap())
            .await
            .unwrap();

        let entries = store.entries_for_transaction(tx.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        for currency in [Currency::USD, Currency::KES] {
            let sum: i64 = entries.iter().map(|e| e.signed_cents(currency)).sum();
            assert_eq!(sum, 0, "{currency} pair must balance");
        }

        let account = store.of_user(user).await.unwrap();
        assert_eq!(account.balance_cents(Currency::USD), 380);
        assert_eq!(account.balance_cents(Currency::KES), 50_000);
        let house = store.house().await.unwrap();
        assert_eq!(house.balance_cents(Currency::USD), -380);

        let stored = store.find_by_id(tx.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert_eq!(stored.external_reference.as_deref(), Some("mm-ref"));
    }

    #[tokio::test]
    async fn test_commit_settlement_refuses_double_settlement() {
        let store = setup_store().await;
        let tx = deposit_tx(UserId::new(), "settle-twice");
        store.insert(&tx).await.unwrap();

        let (tx, user_entry, house_entry) = settled(tx, fixed_now());
        store
            .commit_settlement(&tx, user_entry.clone(), house_entry.clone(), generous_cap())
            .await
            .unwrap();

        let result = store
            .commit_settlement(&tx, user_entry, house_entry, generous_cap())
            .await;
        assert!(matches!(result, Err(RepoError::Conflict(_))));

        // still exactly one pair
        assert_eq!(store.entries_for_transaction(tx.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_commit_settlement_recheck_trips_cap() {
        let store = setup_store().await;
        let user = UserId::new();

        // first settlement consumes most of the cap
        let tx1 = deposit_tx(user, "cap-1");
        store.insert(&tx1).await.unwrap();
        let (tx1, ue1, he1) = settled(tx1, fixed_now());
        let cap = Money::new(60_000, Currency::KES).unwrap();
        store.commit_settlement(&tx1, ue1, he1, cap).await.unwrap();

        // the second would cross it: 50_000 moved + 50_000 > 60_000
        let tx2 = deposit_tx(user, "cap-2");
        store.insert(&tx2).await.unwrap();
        let (tx2, ue2, he2) = settled(tx2, fixed_now());
        let result = store.commit_settlement(&tx2, ue2, he2, cap).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::LimitExceeded {
                moved_cents: 50_000,
                requested_cents: 50_000,
                limit_cents: 60_000,
            }))
        ));
        // nothing was written and the row is still settleable
        assert!(store.entries_for_transaction(tx2.id).await.unwrap().is_empty());
        let stored = store.find_by_id(tx2.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Created);
    }

    // ─────────────────────────────────────────────────────────────────
    // Daily limit policy
    // ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_policy_counts_only_today_and_matching_user() {
        let store = setup_store().await;
        let clock = Arc::new(TestClock::new(fixed_now()));
        let user = UserId::new();
        let other = UserId::new();

        // settled today
        let tx1 = deposit_tx(user, "today");
        store.insert(&tx1).await.unwrap();
        let (tx1, ue, he) = settled(tx1, fixed_now());
        store
            .commit_settlement(&tx1, ue, he, generous_cap())
            .await
            .unwrap();

        // settled yesterday: outside today's window
        let tx2 = deposit_tx(user, "yesterday");
        store.insert(&tx2).await.unwrap();
        let (tx2, ue, he) = settled(tx2, fixed_now() - Duration::days(1));
        store
            .commit_settlement(&tx2, ue, he, generous_cap())
            .await
            .unwrap();

        let policy = SqliteLimitPolicy::new(
            store.pool().clone(),
            clock.clone(),
            10_000_000,
            500_000,
        );

        let moved = policy
            .amount_moved_today(user, TransactionType::Deposit)
            .await
            .unwrap();
        assert_eq!(moved.cents(), 50_000);
        assert_eq!(moved.currency(), Currency::KES);

        let other_moved = policy
            .amount_moved_today(other, TransactionType::Deposit)
            .await
            .unwrap();
        assert_eq!(other_moved.cents(), 0);

        let limit = policy
            .limit_for_user(user, TransactionType::Withdrawal)
            .await
            .unwrap();
        assert_eq!(limit.cents(), 500_000);
        assert_eq!(limit.currency(), Currency::USD);
    }

    // ─────────────────────────────────────────────────────────────────
    // Event outbox
    // ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_outbox_roundtrip() {
        let store = setup_store().await;

        store
            .publish(
                topics::DEPOSIT_INITIATED,
                serde_json::json!({"transaction_id": "t-1", "amount_kes_cents": 50_000}),
            )
            .await
            .unwrap();

        let pending = store.pending_events(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        let event = &pending[0];
        assert_eq!(event.topic, topics::DEPOSIT_INITIATED);
        assert_eq!(event.status, OutboxStatus::Pending);
        assert_eq!(event.payload["amount_kes_cents"], 50_000);
        assert_eq!(event.attempts, 0);

        store
            .mark_event_status(event.id, OutboxStatus::Dispatched, None)
            .await
            .unwrap();

        assert!(store.pending_events(10).await.unwrap().is_empty());
    }

    // ─────────────────────────────────────────────────────────────────
    // One-time secret store
    // ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_secret_consumed_exactly_once() {
        let clock = Arc::new(TestClock::new(fixed_now()));
        let secrets = InMemorySecretStore::new(clock);

        secrets.store("wvk_abc", "sealed-code", 600).await.unwrap();

        assert_eq!(
            secrets.get_and_delete("wvk_abc").await.unwrap().as_deref(),
            Some("sealed-code")
        );
        // second retrieval observes absence
        assert!(secrets.get_and_delete("wvk_abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_secret_expires() {
        let clock = Arc::new(TestClock::new(fixed_now()));
        let secrets = InMemorySecretStore::new(clock.clone());

        secrets.store("wvk_ttl", "sealed-code", 600).await.unwrap();
        clock.advance(601);

        assert!(secrets.get_and_delete("wvk_ttl").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_drops_abandoned_keys() {
        let clock = Arc::new(TestClock::new(fixed_now()));
        let secrets = InMemorySecretStore::new(clock.clone());

        secrets.store("wvk_old", "a", 60).await.unwrap();
        secrets.store("wvk_new", "b", 600).await.unwrap();
        clock.advance(120);

        assert_eq!(secrets.purge_expired(), 1);
        assert_eq!(
            secrets.get_and_delete("wvk_new").await.unwrap().as_deref(),
            Some("b")
        );
    }

    // ─────────────────────────────────────────────────────────────────
    // FX service
    // ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_fx_locks_fresh_rate_for_corridor() {
        let clock = Arc::new(TestClock::new(fixed_now()));
        let fx = IndicativeFxService::new(clock.clone());

        let rate = fx.lock_rate(Currency::KES, Currency::USD).await.unwrap();
        assert_eq!(rate.from_currency(), Currency::KES);
        assert_eq!(rate.to_currency(), Currency::USD);
        assert!(rate.rate() > 0.0);
        // variance stays within 0.3% of the mid
        assert!((rate.rate() - 0.0076).abs() <= 0.0076 * 0.003 + f64::EPSILON);
        assert!(!rate.is_expired(fixed_now()));
        assert!(rate.is_expired(fixed_now() + Duration::seconds(45)));
    }

    #[tokio::test]
    async fn test_fx_rejects_unsupported_pair() {
        let clock = Arc::new(TestClock::new(fixed_now()));
        let fx = IndicativeFxService::new(clock);

        let result = fx.lock_rate(Currency::USD, Currency::USD).await;
        assert!(matches!(
            result,
            Err(tuma_types::FxError::RateNotAvailable(_, _))
        ));
    }
}
