//! Concurrent writers against a file database.

mod common;

use common::*;
use ledger_core::Currency;
use ledger_db::DbConfig;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

struct TempDb(PathBuf);

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.0.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sales_get_distinct_receipts() {
    let temp = TempDb(std::env::temp_dir().join(format!("ledger-{}.db", uuid::Uuid::new_v4())));
    let fx = setup_with(
        DbConfig::new(&temp.0)
            .max_connections(4)
            .busy_timeout(Duration::from_secs(30)),
    )
    .await;

    let tree = product(&fx, "Chalk", Currency::Usd, vec![lot("CH-1", 20, date(2024, 1, 1), 100)]).await;
    allocate(&fx, &tree, 8).await;
    let lot_id = lots_of(&tree)[0].id;

    let fx = Arc::new(fx);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let fx = Arc::clone(&fx);
        let product_id = tree.product.id;
        handles.push(tokio::spawn(async move {
            fx.db
                .sales()
                .process_sale(fx.tenant.id, &sale_request(&fx, &[(product_id, 1)], vec![]))
                .await
                .map(|full| full.sale.receipt_number)
        }));
    }

    let mut receipts = HashSet::new();
    for handle in handles {
        let receipt = handle.await.unwrap().unwrap();
        assert!(receipts.insert(receipt));
    }

    let expected: HashSet<String> = (1..=8)
        .map(|n| format!("T{}SM2024-{:04}", fx.tenant.id, n))
        .collect();
    assert_eq!(receipts, expected);
    assert_eq!(held(&fx, fx.store_wh.id, lot_id).await, 0);

    fx.db.close().await;
}
