//! In-memory backend.
//!
//! State lives behind one `tokio` mutex. A unit of work holds the owned guard
//! for its whole lifetime and edits a private copy of the state, so units are
//! serialized and a dropped unit leaves no trace.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use pazar_core::stock::StockKey;
use pazar_core::{
    CartLineId, OrderId, OrderLineId, OrderStatus, PaymentId, PaymentStatus, Price, ProductId,
    SizeId, StoreId, UserId,
};

use super::{MarketStore, MarketTx, RepositoryError};
use crate::models::{
    CartLine, CatalogEntry, NewOrder, NewOrderLine, NewPayment, Order, OrderLine, Payment,
    PaymentOutcome,
};
use crate::seed::{DEMO_PROFILES, DEMO_STORES, size_position};

#[derive(Debug, Clone, Default)]
struct Sequences {
    store: i32,
    product: i32,
    cart_line: i32,
    order: i32,
    order_line: i32,
    payment: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Default)]
struct MarketState {
    stores: BTreeMap<StoreId, String>,
    products: BTreeMap<ProductId, CatalogEntry>,
    addresses: HashMap<UserId, String>,
    stock: BTreeMap<StockKey, i64>,
    cart: BTreeMap<CartLineId, CartLine>,
    orders: BTreeMap<OrderId, Order>,
    order_lines: BTreeMap<OrderLineId, OrderLine>,
    payments: BTreeMap<PaymentId, Payment>,
    seq: Sequences,
}

impl MarketState {
    fn add_store(&mut self, name: &str) -> StoreId {
        let id = StoreId::new(next(&mut self.seq.store));
        self.stores.insert(id, name.to_owned());
        id
    }

    fn add_product(&mut self, store_id: StoreId, name: &str, price: Price) -> ProductId {
        let product_id = ProductId::new(next(&mut self.seq.product));
        self.products.insert(
            product_id,
            CatalogEntry {
                product_id,
                store_id,
                name: name.to_owned(),
                price,
                active: true,
            },
        );
        product_id
    }

    fn order_mut(&mut self, order_id: OrderId) -> Result<&mut Order, RepositoryError> {
        self.orders
            .get_mut(&order_id)
            .ok_or(RepositoryError::NotFound)
    }

    fn payment_mut(&mut self, payment_id: PaymentId) -> Result<&mut Payment, RepositoryError> {
        self.payments
            .get_mut(&payment_id)
            .ok_or(RepositoryError::NotFound)
    }
}

/// Process-local marketplace store.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryMarketStore {
    state: Arc<Mutex<MarketState>>,
}

impl MemoryMarketStore {
    /// An empty store with no catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the demo catalog from [`crate::seed`].
    ///
    /// Stores, products and sizes get sequential ids starting at 1 in the
    /// order they are listed.
    #[must_use]
    pub fn with_demo_catalog() -> Self {
        let mut state = MarketState::default();
        for store in DEMO_STORES {
            let store_id = state.add_store(store.name);
            for product in store.products {
                let product_id =
                    state.add_product(store_id, product.name, Price::from_minor(product.price_minor));
                for (label, quantity) in product.stock {
                    if let Some(size) = size_position(label) {
                        let key = StockKey::new(product_id, SizeId::new(size));
                        state.stock.insert(key, i64::from(*quantity));
                    }
                }
            }
        }
        for (user_id, address) in DEMO_PROFILES {
            state
                .addresses
                .insert(UserId::new(*user_id), (*address).to_owned());
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Activate or deactivate a product. Returns `false` for unknown products.
    pub async fn set_product_active(&self, product_id: ProductId, active: bool) -> bool {
        let mut state = self.state.lock().await;
        state
            .products
            .get_mut(&product_id)
            .map(|entry| entry.active = active)
            .is_some()
    }

    /// Change a product's list price. Returns `false` for unknown products.
    pub async fn set_product_price(&self, product_id: ProductId, price: Price) -> bool {
        let mut state = self.state.lock().await;
        state
            .products
            .get_mut(&product_id)
            .map(|entry| entry.price = price)
            .is_some()
    }

    pub async fn set_default_address(&self, user_id: UserId, address: &str) {
        self.state
            .lock()
            .await
            .addresses
            .insert(user_id, address.to_owned());
    }

    /// Overwrite a stored stock level without any checks.
    pub async fn set_stock(&self, key: StockKey, quantity: i64) {
        self.state.lock().await.stock.insert(key, quantity);
    }

    /// Committed stock level. A missing row reads as zero.
    pub async fn stock_level(&self, key: StockKey) -> i64 {
        self.state
            .lock()
            .await
            .stock
            .get(&key)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl MarketStore for MemoryMarketStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = (*guard).clone();
        Ok(MemoryTx { guard, work })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// A unit of work over [`MemoryMarketStore`].
pub struct MemoryTx {
    guard: OwnedMutexGuard<MarketState>,
    work: MarketState,
}

#[async_trait]
impl MarketTx for MemoryTx {
    async fn catalog_entry(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<CatalogEntry>, RepositoryError> {
        Ok(self.work.products.get(&product_id).cloned())
    }

    async fn default_address(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(self.work.addresses.get(&user_id).cloned())
    }

    async fn lock_stock(&mut self, key: StockKey) -> Result<i64, RepositoryError> {
        Ok(self.work.stock.get(&key).copied().unwrap_or(0))
    }

    async fn peek_stock(&mut self, key: StockKey) -> Result<i64, RepositoryError> {
        Ok(self.work.stock.get(&key).copied().unwrap_or(0))
    }

    async fn write_stock(&mut self, key: StockKey, quantity: u32) -> Result<(), RepositoryError> {
        self.work.stock.insert(key, i64::from(quantity));
        Ok(())
    }

    async fn lock_cart(&mut self, _user_id: UserId) -> Result<(), RepositoryError> {
        // Units are already serialized by the state mutex.
        Ok(())
    }

    async fn cart_lines(&mut self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        Ok(self
            .work
            .cart
            .values()
            .filter(|line| line.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_cart_line(
        &mut self,
        user_id: UserId,
        key: StockKey,
        quantity: u32,
    ) -> Result<CartLine, RepositoryError> {
        let duplicate = self.work.cart.values().any(|line| {
            line.user_id == user_id && line.stock_key() == key
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "cart already has a line for {key}"
            )));
        }

        let line = CartLine {
            id: CartLineId::new(next(&mut self.work.seq.cart_line)),
            user_id,
            product_id: key.product_id,
            size_id: key.size_id,
            quantity,
        };
        self.work.cart.insert(line.id, line.clone());
        Ok(line)
    }

    async fn set_cart_line_quantity(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<Option<CartLine>, RepositoryError> {
        Ok(self
            .work
            .cart
            .get_mut(&line_id)
            .filter(|line| line.user_id == user_id)
            .map(|line| {
                line.quantity = quantity;
                line.clone()
            }))
    }

    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<bool, RepositoryError> {
        let owned = self
            .work
            .cart
            .get(&line_id)
            .is_some_and(|line| line.user_id == user_id);
        if owned {
            self.work.cart.remove(&line_id);
        }
        Ok(owned)
    }

    async fn clear_cart(&mut self, user_id: UserId) -> Result<u64, RepositoryError> {
        let before = self.work.cart.len();
        self.work.cart.retain(|_, line| line.user_id != user_id);
        Ok((before - self.work.cart.len()) as u64)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let now = Utc::now();
        let created = Order {
            id: OrderId::new(next(&mut self.work.seq.order)),
            user_id: order.user_id,
            store_id: order.store_id,
            total_amount: order.total_amount,
            delivery_address: order.delivery_address.clone(),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.work.orders.insert(created.id, created.clone());
        Ok(created)
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &NewOrderLine,
    ) -> Result<OrderLine, RepositoryError> {
        if !self.work.orders.contains_key(&order_id) {
            return Err(RepositoryError::NotFound);
        }
        let created = OrderLine {
            id: OrderLineId::new(next(&mut self.work.seq.order_line)),
            order_id,
            product_id: line.product_id,
            size_id: line.size_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.unit_price.times(line.quantity),
        };
        self.work.order_lines.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.work.orders.get(&order_id).cloned())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.work.orders.get(&order_id).cloned())
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        Ok(self
            .work
            .order_lines
            .values()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn set_order_line_quantity(
        &mut self,
        line_id: OrderLineId,
        quantity: u32,
    ) -> Result<OrderLine, RepositoryError> {
        let line = self
            .work
            .order_lines
            .get_mut(&line_id)
            .ok_or(RepositoryError::NotFound)?;
        line.quantity = quantity;
        line.line_total = line.unit_price.times(quantity);
        Ok(line.clone())
    }

    async fn delete_order_line(&mut self, line_id: OrderLineId) -> Result<(), RepositoryError> {
        self.work
            .order_lines
            .remove(&line_id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_order_lines(&mut self, order_id: OrderId) -> Result<u64, RepositoryError> {
        let before = self.work.order_lines.len();
        self.work
            .order_lines
            .retain(|_, line| line.order_id != order_id);
        Ok((before - self.work.order_lines.len()) as u64)
    }

    async fn update_order(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        total_amount: Price,
    ) -> Result<Order, RepositoryError> {
        let order = self.work.order_mut(order_id)?;
        order.status = status;
        order.total_amount = total_amount;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .work
            .orders
            .values()
            .rev()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn orders_for_store(
        &mut self,
        store_id: StoreId,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .work
            .orders
            .values()
            .rev()
            .filter(|order| order.store_id == store_id)
            .cloned()
            .collect())
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment, RepositoryError> {
        if self.work.payments.values().any(|p| p.token == payment.token) {
            return Err(RepositoryError::Conflict(
                "payment token already exists".to_owned(),
            ));
        }
        let created = Payment {
            id: PaymentId::new(next(&mut self.work.seq.payment)),
            user_id: payment.user_id,
            order_id: None,
            amount: payment.amount,
            token: payment.token,
            status: PaymentStatus::Pending,
            delivery_address: payment.delivery_address.clone(),
            card_brand: None,
            card_last4: None,
            failure_reason: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.work.payments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn lock_payment(&mut self, token: Uuid) -> Result<Option<Payment>, RepositoryError> {
        Ok(self
            .work
            .payments
            .values()
            .find(|p| p.token == token)
            .cloned())
    }

    async fn finish_payment(
        &mut self,
        payment_id: PaymentId,
        outcome: &PaymentOutcome,
    ) -> Result<Payment, RepositoryError> {
        let payment = self.work.payment_mut(payment_id)?;
        if payment.status != PaymentStatus::Pending {
            return Err(RepositoryError::NotFound);
        }
        payment.status = outcome.status;
        payment.order_id = outcome.order_id;
        payment.card_brand = outcome.card_brand;
        payment.card_last4.clone_from(&outcome.card_last4);
        payment.failure_reason.clone_from(&outcome.failure_reason);
        payment.completed_at = Some(Utc::now());
        Ok(payment.clone())
    }

    async fn set_payment_status(
        &mut self,
        payment_id: PaymentId,
        status: PaymentStatus,
    ) -> Result<Payment, RepositoryError> {
        let payment = self.work.payment_mut(payment_id)?;
        payment.status = status;
        Ok(payment.clone())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        let Self { mut guard, work } = self;
        *guard = work;
        Ok(())
    }
}
