// ═══════════════════════════════════════════════════════════════════
// Store Tests: InMemoryHoldingsStore, InMemoryPriceStore,
// PriceStoreOracle, per-key atomicity under concurrency
// ═══════════════════════════════════════════════════════════════════

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use stock_ledger_core::errors::CoreError;
use stock_ledger_core::models::holding::Holding;
use stock_ledger_core::models::identity::UserId;
use stock_ledger_core::models::price::PriceObservation;
use stock_ledger_core::models::symbol::Symbol;
use stock_ledger_core::store::{
    HoldingsStore, InMemoryHoldingsStore, InMemoryPriceStore, PriceStore, PriceStoreOracle,
    SymbolOracle,
};

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn user(id: &str) -> UserId {
    UserId::new(id)
}

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

// ═══════════════════════════════════════════════════════════════════
// Holdings
// ═══════════════════════════════════════════════════════════════════

mod holdings {
    use super::*;

    #[tokio::test]
    async fn first_increment_creates_holding() {
        let store = InMemoryHoldingsStore::new();
        let created = ts("2025-01-15T10:00:00Z");

        let holding = store
            .increment(&user("u1"), &sym("AAPL"), dec!(10), created)
            .await
            .unwrap();

        assert_eq!(holding.quantity, dec!(10));
        assert_eq!(holding.created_at, created);
        assert_eq!(holding.symbol, sym("AAPL"));
        assert_eq!(holding.user_id, user("u1"));
    }

    #[tokio::test]
    async fn later_increments_accumulate_and_keep_identity() {
        let store = InMemoryHoldingsStore::new();
        let first = store
            .increment(&user("u1"), &sym("AAPL"), dec!(10), ts("2025-01-15T10:00:00Z"))
            .await
            .unwrap();
        let second = store
            .increment(&user("u1"), &sym("AAPL"), dec!(5), ts("2025-02-01T10:00:00Z"))
            .await
            .unwrap();

        assert_eq!(second.quantity, dec!(15));
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn decrement_subtracts() {
        let store = InMemoryHoldingsStore::new();
        store
            .increment(&user("u1"), &sym("AAPL"), dec!(15), Utc::now())
            .await
            .unwrap();

        let remaining = store
            .decrement(&user("u1"), &sym("AAPL"), dec!(4.5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(remaining.quantity, dec!(10.5));
    }

    #[tokio::test]
    async fn decrement_to_zero_deletes() {
        let store = InMemoryHoldingsStore::new();
        store
            .increment(&user("u1"), &sym("AAPL"), dec!(15), Utc::now())
            .await
            .unwrap();

        let remaining = store
            .decrement(&user("u1"), &sym("AAPL"), dec!(15))
            .await
            .unwrap();
        assert!(remaining.is_none());
        assert!(store.get(&user("u1"), &sym("AAPL")).await.unwrap().is_none());
        assert!(store.list_for_user(&user("u1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn over_decrement_is_rejected_and_state_unchanged() {
        let store = InMemoryHoldingsStore::new();
        store
            .increment(&user("u1"), &sym("AAPL"), dec!(15), Utc::now())
            .await
            .unwrap();

        let err = store
            .decrement(&user("u1"), &sym("AAPL"), dec!(20))
            .await
            .unwrap_err();
        match err {
            CoreError::InsufficientQuantity {
                symbol,
                requested,
                held,
            } => {
                assert_eq!(symbol, "AAPL");
                assert_eq!(requested, dec!(20));
                assert_eq!(held, dec!(15));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let holding = store.get(&user("u1"), &sym("AAPL")).await.unwrap().unwrap();
        assert_eq!(holding.quantity, dec!(15));
    }

    #[tokio::test]
    async fn decrement_of_absent_holding_is_insufficient() {
        let store = InMemoryHoldingsStore::new();
        let err = store
            .decrement(&user("u1"), &sym("AAPL"), dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientQuantity { held, .. } if held == Decimal::ZERO
        ));

        // Same for a user who holds something else.
        store
            .increment(&user("u1"), &sym("MSFT"), dec!(1), Utc::now())
            .await
            .unwrap();
        assert!(store
            .decrement(&user("u1"), &sym("AAPL"), dec!(1))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = InMemoryHoldingsStore::new();
        store
            .increment(&user("u1"), &sym("AAPL"), dec!(3), Utc::now())
            .await
            .unwrap();

        assert!(store.remove(&user("u1"), &sym("AAPL")).await.unwrap());
        assert!(!store.remove(&user("u1"), &sym("AAPL")).await.unwrap());
        assert!(!store.remove(&user("nobody"), &sym("AAPL")).await.unwrap());
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = InMemoryHoldingsStore::new();
        store
            .increment(&user("u1"), &sym("AAPL"), dec!(3), Utc::now())
            .await
            .unwrap();
        store
            .increment(&user("u2"), &sym("AAPL"), dec!(7), Utc::now())
            .await
            .unwrap();

        let u1 = store.list_for_user(&user("u1")).await.unwrap();
        let u2 = store.list_for_user(&user("u2")).await.unwrap();
        assert_eq!(u1.len(), 1);
        assert_eq!(u1[0].quantity, dec!(3));
        assert_eq!(u2[0].quantity, dec!(7));
    }

    #[test]
    fn export_and_rebuild() {
        let holdings = vec![
            Holding::new(user("u2"), sym("MSFT"), dec!(2), Utc::now()),
            Holding::new(user("u1"), sym("AAPL"), dec!(1), Utc::now()),
            Holding::new(user("u1"), sym("ZERO"), dec!(0), Utc::now()),
        ];
        let store = InMemoryHoldingsStore::from_holdings(holdings);

        let all = store.all_holdings();
        assert_eq!(all.len(), 2, "non-positive holdings are skipped");
        assert_eq!(all[0].user_id, user("u1"));
        assert_eq!(all[1].symbol, sym("MSFT"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Prices
// ═══════════════════════════════════════════════════════════════════

mod prices {
    use super::*;

    async fn seeded() -> InMemoryPriceStore {
        let store = InMemoryPriceStore::new();
        for (s, t, p) in [
            ("AAPL", "2025-01-01T00:00:00Z", dec!(100)),
            ("AAPL", "2025-01-03T00:00:00Z", dec!(120)),
            ("AAPL", "2025-01-02T00:00:00Z", dec!(110)),
            ("MSFT", "2025-01-01T00:00:00Z", dec!(400)),
        ] {
            store
                .append(PriceObservation::new(s, p, ts(t)))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn latest_uses_greatest_timestamp() {
        let store = seeded().await;
        let latest = store.latest(&sym("AAPL")).await.unwrap().unwrap();
        assert_eq!(latest.price, dec!(120));
        assert_eq!(latest.timestamp, ts("2025-01-03T00:00:00Z"));
    }

    #[tokio::test]
    async fn latest_tie_break_is_last_inserted() {
        let store = InMemoryPriceStore::new();
        let t = ts("2025-01-01T00:00:00Z");
        store.append(PriceObservation::new("AAPL", dec!(1), t)).await.unwrap();
        store.append(PriceObservation::new("AAPL", dec!(2), t)).await.unwrap();
        assert_eq!(store.latest(&sym("AAPL")).await.unwrap().unwrap().price, dec!(2));
    }

    #[tokio::test]
    async fn unknown_symbol_reads_are_empty() {
        let store = seeded().await;
        assert!(store.latest(&sym("NOPE")).await.unwrap().is_none());
        assert!(store.recent(&sym("NOPE"), 2).await.unwrap().is_empty());
        assert!(store
            .range(&sym("NOPE"), ts("1970-01-01T00:00:00Z"), Utc::now())
            .await
            .unwrap()
            .is_empty());
        assert!(!store.symbol_exists(&sym("NOPE")).await.unwrap());
    }

    #[tokio::test]
    async fn range_is_ascending_and_half_open() {
        let store = seeded().await;
        let range = store
            .range(&sym("AAPL"), ts("2025-01-01T00:00:00Z"), ts("2025-01-03T00:00:00Z"))
            .await
            .unwrap();
        let prices: Vec<_> = range.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![dec!(100), dec!(110)]);
        assert!(range.iter().all(|o| o.symbol == sym("AAPL")));
    }

    #[tokio::test]
    async fn recent_returns_newest_first() {
        let store = seeded().await;
        let recent = store.recent(&sym("AAPL"), 2).await.unwrap();
        let prices: Vec<_> = recent.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![dec!(120), dec!(110)]);
    }

    #[tokio::test]
    async fn non_positive_prices_are_recorded() {
        let store = InMemoryPriceStore::new();
        store
            .append(PriceObservation::new("ODD", dec!(-5), Utc::now()))
            .await
            .unwrap();
        store
            .append(PriceObservation::new("ODD", dec!(0), Utc::now()))
            .await
            .unwrap();
        assert!(store.symbol_exists(&sym("ODD")).await.unwrap());
        assert_eq!(store.total_entries(), 2);
    }

    #[tokio::test]
    async fn symbols_are_sorted() {
        let store = seeded().await;
        assert_eq!(store.symbols().await.unwrap(), vec![sym("AAPL"), sym("MSFT")]);
    }

    #[tokio::test]
    async fn duplicate_fact_is_idempotent() {
        let store = InMemoryPriceStore::new();
        let observation = PriceObservation::new("AAPL", dec!(100), ts("2025-01-01T00:00:00Z"));
        store.append(observation.clone()).await.unwrap();
        store.append(observation).await.unwrap();
        assert_eq!(store.total_entries(), 1);
    }

    #[tokio::test]
    async fn replayed_older_price_wins_latest() {
        let store = InMemoryPriceStore::new();
        let at = ts("2025-01-01T00:00:00Z");
        for price in [dec!(100), dec!(110), dec!(100)] {
            store
                .append(PriceObservation::new("AAPL", price, at))
                .await
                .unwrap();
        }

        let latest = store.latest(&sym("AAPL")).await.unwrap().unwrap();
        assert_eq!(latest.price, dec!(100));
        assert_eq!(store.total_entries(), 3);
    }

    #[tokio::test]
    async fn export_and_rebuild_preserve_order() {
        let store = seeded().await;
        let exported = store.all_observations();
        assert_eq!(exported.len(), 4);
        assert_eq!(exported[0].symbol, sym("AAPL"));
        assert_eq!(exported[2].price, dec!(120));
        assert_eq!(exported[3].symbol, sym("MSFT"));

        let rebuilt = InMemoryPriceStore::from_observations(exported.clone());
        assert_eq!(rebuilt.all_observations(), exported);
    }

    #[tokio::test]
    async fn oracle_follows_price_store() {
        let store = Arc::new(seeded().await);
        let oracle = PriceStoreOracle::new(store.clone());
        assert!(oracle.symbol_exists(&sym("MSFT")).await.unwrap());
        assert!(!oracle.symbol_exists(&sym("TSLA")).await.unwrap());

        store
            .append(PriceObservation::new("TSLA", dec!(250), Utc::now()))
            .await
            .unwrap();
        assert!(oracle.symbol_exists(&sym("TSLA")).await.unwrap());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Concurrency
// ═══════════════════════════════════════════════════════════════════

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_never_lose_updates() {
        let store = Arc::new(InMemoryHoldingsStore::new());
        let mut tasks = Vec::new();

        for i in 0..200 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                // Interleave with unrelated keys.
                let symbol = if i % 4 == 0 { sym("MSFT") } else { sym("AAPL") };
                store
                    .increment(&user("u1"), &symbol, dec!(1), Utc::now())
                    .await
                    .unwrap();
                store
                    .increment(&user("u2"), &sym("AAPL"), dec!(2), Utc::now())
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let aapl = store.get(&user("u1"), &sym("AAPL")).await.unwrap().unwrap();
        let msft = store.get(&user("u1"), &sym("MSFT")).await.unwrap().unwrap();
        let other = store.get(&user("u2"), &sym("AAPL")).await.unwrap().unwrap();
        assert_eq!(aapl.quantity, dec!(150));
        assert_eq!(msft.quantity, dec!(50));
        assert_eq!(other.quantity, dec!(400));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_decrements_never_go_negative() {
        let store = Arc::new(InMemoryHoldingsStore::new());
        store
            .increment(&user("u1"), &sym("AAPL"), dec!(50), Utc::now())
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..100 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.decrement(&user("u1"), &sym("AAPL"), dec!(1)).await.is_ok()
            }));
        }

        let mut succeeded = 0;
        for task in tasks {
            if task.await.unwrap() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 50);
        assert!(store.get(&user("u1"), &sym("AAPL")).await.unwrap().is_none());
    }
}
