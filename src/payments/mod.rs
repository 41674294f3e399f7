use async_trait::async_trait;

use crate::error::{AppError, Result};

pub mod razorpay;

pub use razorpay::RazorpayClient;

/// A created gateway order. `order_id` is what the client-side checkout
/// flow needs to complete the charge.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Monetary transactions. Amounts are always minor currency units (paise,
/// cents). Calls are per-member with no batching or automatic retry.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt_id: &str,
    ) -> Result<GatewayOrder>;
}

/// Stand-in when no gateway is configured: every charge fails loudly
/// instead of pretending to succeed.
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_order(
        &self,
        _amount_minor: i64,
        _currency: &str,
        _receipt_id: &str,
    ) -> Result<GatewayOrder> {
        Err(AppError::Gateway("Payment gateway not configured".to_string()))
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use fake::FakeGateway;

#[cfg(any(test, feature = "test-utils"))]
mod fake {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    /// In-memory gateway for tests. Succeeds by default; flip `fail` to
    /// simulate a declining provider.
    pub struct FakeGateway {
        fail: AtomicBool,
        counter: AtomicU64,
        pub orders: Mutex<Vec<GatewayOrder>>,
    }

    impl FakeGateway {
        pub fn new() -> Self {
            Self {
                fail: AtomicBool::new(false),
                counter: AtomicU64::new(0),
                orders: Mutex::new(Vec::new()),
            }
        }

        pub fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }

        pub fn order_count(&self) -> usize {
            self.orders.lock().unwrap().len()
        }
    }

    impl Default for FakeGateway {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_order(
            &self,
            amount_minor: i64,
            currency: &str,
            _receipt_id: &str,
        ) -> Result<GatewayOrder> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Gateway("card declined".to_string()));
            }

            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let order = GatewayOrder {
                order_id: format!("order_fake_{:06}", n),
                amount_minor,
                currency: currency.to_string(),
            };
            self.orders.lock().unwrap().push(order.clone());
            Ok(order)
        }
    }
}
