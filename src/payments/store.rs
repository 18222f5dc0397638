//! Trait seams to the persistence layer. Gateways depend on these traits
//! only; Postgres implementations live in `crate::database`.

use crate::payments::error::PaymentResult;
use crate::payments::types::{
    LedgerTransaction, NewLedgerEntry, OrderSummary, PaymentProcess, ProcessAttributes,
    ProcessKey, SubscriptionPlan,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Read access to payable domain models, plus the documented side effect of
/// materializing dependent order-detail rows before a payment is built.
#[async_trait]
pub trait DomainReader: Send + Sync {
    async fn find_order(&self, id: i64) -> PaymentResult<Option<OrderSummary>>;

    async fn find_order_for_cart(&self, cart_id: i64) -> PaymentResult<Option<OrderSummary>>;

    async fn find_subscription(&self, id: i64) -> PaymentResult<Option<SubscriptionPlan>>;

    async fn prepare_order_details(&self, order_id: i64) -> PaymentResult<()>;
}

/// Idempotent upsert of payment-process records. At most one live record per
/// key; re-initiating a payment for the same target overwrites the prior
/// pending record. Concurrent writers race last-writer-wins (no locking).
#[async_trait]
pub trait ProcessStore: Send + Sync {
    async fn upsert_process(
        &self,
        key: ProcessKey,
        attributes: ProcessAttributes,
    ) -> PaymentResult<PaymentProcess>;
}

/// Append-only transaction ledger used by split payments.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Look up or create the parent ledger row the split children hang off.
    async fn split_parent(
        &self,
        order_id: i64,
        user_id: Option<i64>,
        payment_id: i64,
        price: Decimal,
    ) -> PaymentResult<LedgerTransaction>;

    async fn create_child(&self, entry: NewLedgerEntry) -> PaymentResult<LedgerTransaction>;
}

#[cfg(test)]
pub mod testing {
    //! In-memory doubles shared by the gateway unit tests.

    use super::*;
    use crate::payments::types::{TargetKind, TransactionStatus};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryReader {
        pub orders: Vec<OrderSummary>,
        pub subscriptions: Vec<SubscriptionPlan>,
        pub cart_orders: HashMap<i64, i64>,
        pub prepared: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl DomainReader for MemoryReader {
        async fn find_order(&self, id: i64) -> PaymentResult<Option<OrderSummary>> {
            Ok(self.orders.iter().find(|o| o.id == id).cloned())
        }

        async fn find_order_for_cart(&self, cart_id: i64) -> PaymentResult<Option<OrderSummary>> {
            match self.cart_orders.get(&cart_id) {
                Some(order_id) => self.find_order(*order_id).await,
                None => Ok(None),
            }
        }

        async fn find_subscription(&self, id: i64) -> PaymentResult<Option<SubscriptionPlan>> {
            Ok(self.subscriptions.iter().find(|s| s.id == id).cloned())
        }

        async fn prepare_order_details(&self, order_id: i64) -> PaymentResult<()> {
            self.prepared.lock().unwrap().push(order_id);
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MemoryProcessStore {
        pub processes: Mutex<HashMap<(Option<i64>, i64, TargetKind), PaymentProcess>>,
    }

    impl MemoryProcessStore {
        pub fn len(&self) -> usize {
            self.processes.lock().unwrap().len()
        }

        pub fn get(&self, key: &ProcessKey) -> Option<PaymentProcess> {
            self.processes
                .lock()
                .unwrap()
                .get(&(key.user_id, key.model_id, key.model_type))
                .cloned()
        }
    }

    #[async_trait]
    impl ProcessStore for MemoryProcessStore {
        async fn upsert_process(
            &self,
            key: ProcessKey,
            attributes: ProcessAttributes,
        ) -> PaymentResult<PaymentProcess> {
            let now = Utc::now();
            let process = PaymentProcess {
                id: attributes.id,
                user_id: key.user_id,
                model_id: key.model_id,
                model_type: key.model_type,
                data: attributes.data,
                created_at: now,
                updated_at: now,
            };
            self.processes.lock().unwrap().insert(
                (key.user_id, key.model_id, key.model_type),
                process.clone(),
            );
            Ok(process)
        }
    }

    #[derive(Default)]
    pub struct MemoryLedger {
        pub rows: Mutex<Vec<LedgerTransaction>>,
        next_id: AtomicI64,
    }

    impl MemoryLedger {
        pub fn children_of(&self, parent_id: i64) -> Vec<LedgerTransaction> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|row| row.parent_id == Some(parent_id))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl TransactionLedger for MemoryLedger {
        async fn split_parent(
            &self,
            order_id: i64,
            user_id: Option<i64>,
            payment_id: i64,
            price: Decimal,
        ) -> PaymentResult<LedgerTransaction> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(existing) = rows
                .iter()
                .find(|row| row.order_id == order_id && row.parent_id.is_none())
            {
                return Ok(existing.clone());
            }
            let row = LedgerTransaction {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                order_id,
                user_id,
                payment_id,
                price,
                status: TransactionStatus::Progress,
                status_description: None,
                note: None,
                perform_time: None,
                parent_id: None,
                created_at: Utc::now(),
            };
            rows.push(row.clone());
            Ok(row)
        }

        async fn create_child(&self, entry: NewLedgerEntry) -> PaymentResult<LedgerTransaction> {
            let row = LedgerTransaction {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                order_id: entry.order_id,
                user_id: entry.user_id,
                payment_id: entry.payment_id,
                price: entry.price,
                status: entry.status,
                status_description: entry.status_description,
                note: entry.note,
                perform_time: entry.perform_time,
                parent_id: entry.parent_id,
                created_at: Utc::now(),
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }
    }
}
