//! In-memory repository implementations.
//!
//! Same semantics as the `PostgreSQL` backend, including the uniqueness
//! checks and compare-and-swap guards, so tests exercise the real contract.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use marigold_core::{
    AddressId, CartId, CartItemId, OrderId, OrderItemId, OrderStatus, Price, ProductId,
    ReturnRequestId, ReturnStatus, UserId,
};

use super::{
    AddressRepository, CartRepository, OrderRepository, ProductRepository, RepoResult,
    RepositoryError,
};
use crate::models::{
    Address, Cart, CartItem, NewAddress, NewCartItem, NewOrder, NewOrderItem, NewProduct, Order,
    OrderItem, Product, ReturnRequest,
};

fn next(counter: &AtomicI32) -> i32 {
    counter.fetch_add(1, Ordering::SeqCst)
}

// =============================================================================
// Products
// =============================================================================

/// In-memory product repository.
#[derive(Clone, Default)]
pub struct MemoryProducts {
    rows: Arc<RwLock<HashMap<ProductId, Product>>>,
    next_id: Arc<AtomicI32>,
}

impl MemoryProducts {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }

    /// Overwrite a product's stock directly (test hook).
    pub async fn set_stock(&self, id: ProductId, stock: u32) {
        if let Some(product) = self.rows.write().await.get_mut(&id) {
            product.stock = stock;
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryProducts {
    async fn get(&self, id: ProductId) -> RepoResult<Option<Product>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn insert(&self, product: NewProduct) -> RepoResult<Product> {
        let id = ProductId::new(next(&self.next_id));
        let row = Product {
            id,
            name: product.name,
            price: product.price,
            stock: product.stock,
            is_active: product.is_active,
            variants: product.variants,
            created_at: Utc::now(),
        };
        self.rows.write().await.insert(id, row.clone());
        Ok(row)
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        let product = rows
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::Conflict(format!("product {id} not found")))?;

        if product.stock < quantity {
            return Err(RepositoryError::Conflict(format!(
                "insufficient stock for product {id}: have {}, need {quantity}",
                product.stock
            )));
        }

        product.stock -= quantity;
        Ok(())
    }

    async fn set_active(&self, id: ProductId, is_active: bool) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        let product = rows
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("product {id}")))?;
        product.is_active = is_active;
        Ok(())
    }
}

// =============================================================================
// Carts
// =============================================================================

#[derive(Default)]
struct CartState {
    carts: HashMap<UserId, Cart>,
    items: HashMap<CartId, Vec<CartItem>>,
}

/// In-memory authenticated-cart repository.
#[derive(Clone, Default)]
pub struct MemoryCarts {
    state: Arc<RwLock<CartState>>,
    next_cart_id: Arc<AtomicI32>,
    next_item_id: Arc<AtomicI32>,
}

impl MemoryCarts {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(CartState::default())),
            next_cart_id: Arc::new(AtomicI32::new(1)),
            next_item_id: Arc::new(AtomicI32::new(1)),
        }
    }
}

#[async_trait]
impl CartRepository for MemoryCarts {
    async fn get_or_create(&self, owner: UserId) -> RepoResult<Cart> {
        let mut state = self.state.write().await;
        if let Some(cart) = state.carts.get(&owner) {
            return Ok(cart.clone());
        }

        let cart = Cart {
            id: CartId::new(next(&self.next_cart_id)),
            owner_id: owner,
            created_at: Utc::now(),
        };
        state.items.insert(cart.id, Vec::new());
        state.carts.insert(owner, cart.clone());
        Ok(cart)
    }

    async fn list_items(&self, cart_id: CartId) -> RepoResult<Vec<CartItem>> {
        Ok(self
            .state
            .read()
            .await
            .items
            .get(&cart_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_item(&self, cart_id: CartId, item: NewCartItem) -> RepoResult<CartItem> {
        let mut state = self.state.write().await;
        let items = state
            .items
            .get_mut(&cart_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("cart {cart_id}")))?;

        if let Some(existing) = items
            .iter_mut()
            .find(|row| row.matches(item.product_id, item.variant.as_deref()))
        {
            existing.quantity += item.quantity;
            return Ok(existing.clone());
        }

        let row = CartItem {
            id: CartItemId::new(next(&self.next_item_id)),
            product_id: item.product_id,
            quantity: item.quantity,
            variant: item.variant,
            unit_price: item.unit_price,
        };
        items.push(row.clone());
        Ok(row)
    }

    async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let items = state
            .items
            .get_mut(&cart_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("cart {cart_id}")))?;
        let item = items
            .iter_mut()
            .find(|row| row.id == item_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("cart item {item_id}")))?;
        item.quantity = quantity;
        Ok(())
    }

    async fn remove_item(&self, cart_id: CartId, item_id: CartItemId) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let items = state
            .items
            .get_mut(&cart_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("cart {cart_id}")))?;
        items.retain(|row| row.id != item_id);
        Ok(())
    }

    async fn clear(&self, cart_id: CartId) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if let Some(items) = state.items.get_mut(&cart_id) {
            items.clear();
        }
        Ok(())
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// In-memory address repository.
#[derive(Clone, Default)]
pub struct MemoryAddresses {
    rows: Arc<RwLock<HashMap<AddressId, Address>>>,
    next_id: Arc<AtomicI32>,
}

impl MemoryAddresses {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicI32::new(1)),
        }
    }
}

#[async_trait]
impl AddressRepository for MemoryAddresses {
    async fn list(&self, owner: UserId) -> RepoResult<Vec<Address>> {
        let rows = self.rows.read().await;
        let mut addresses: Vec<_> = rows
            .values()
            .filter(|row| row.owner_id == owner)
            .cloned()
            .collect();
        addresses.sort_by_key(|row| (std::cmp::Reverse(row.is_default), row.id));
        Ok(addresses)
    }

    async fn get(&self, id: AddressId) -> RepoResult<Option<Address>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn create(&self, owner: UserId, data: NewAddress) -> RepoResult<Address> {
        let mut rows = self.rows.write().await;

        let count = rows.values().filter(|row| row.owner_id == owner).count() as i64;
        if count >= Address::MAX_PER_OWNER {
            return Err(RepositoryError::Conflict(format!(
                "address limit of {} reached",
                Address::MAX_PER_OWNER
            )));
        }

        // Unset siblings before setting the new default
        if data.is_default {
            for row in rows.values_mut().filter(|row| row.owner_id == owner) {
                row.is_default = false;
            }
        }

        let now = Utc::now();
        let address = Address {
            id: AddressId::new(next(&self.next_id)),
            owner_id: owner,
            full_name: data.full_name,
            line1: data.line1,
            city: data.city,
            state: data.state,
            pin_code: data.pin_code,
            phone: data.phone,
            is_default: data.is_default,
            created_at: now,
            updated_at: now,
        };
        rows.insert(address.id, address.clone());
        Ok(address)
    }

    async fn update(&self, id: AddressId, owner: UserId, data: NewAddress) -> RepoResult<Address> {
        let mut rows = self.rows.write().await;

        if !rows
            .get(&id)
            .is_some_and(|row| row.owner_id == owner)
        {
            return Err(RepositoryError::NotFound(format!("address {id}")));
        }

        if data.is_default {
            for row in rows
                .values_mut()
                .filter(|row| row.owner_id == owner && row.id != id)
            {
                row.is_default = false;
            }
        }

        let row = rows
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("address {id}")))?;
        row.full_name = data.full_name;
        row.line1 = data.line1;
        row.city = data.city;
        row.state = data.state;
        row.pin_code = data.pin_code;
        row.phone = data.phone;
        row.is_default = data.is_default;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Default)]
struct OrderState {
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderItemId, OrderItem>,
    returns: HashMap<ReturnRequestId, ReturnRequest>,
}

/// In-memory order repository.
#[derive(Clone, Default)]
pub struct MemoryOrders {
    state: Arc<RwLock<OrderState>>,
    next_order_id: Arc<AtomicI32>,
    next_item_id: Arc<AtomicI32>,
    next_return_id: Arc<AtomicI32>,
}

impl MemoryOrders {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(OrderState::default())),
            next_order_id: Arc::new(AtomicI32::new(1)),
            next_item_id: Arc::new(AtomicI32::new(1)),
            next_return_id: Arc::new(AtomicI32::new(1)),
        }
    }

    /// Number of persisted orders (test hook).
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrders {
    async fn order_number_exists(&self, number: &str) -> RepoResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .orders
            .values()
            .any(|order| order.order_number == number))
    }

    async fn create(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> RepoResult<(Order, Vec<OrderItem>)> {
        if items.is_empty() {
            return Err(RepositoryError::Conflict(
                "order must contain at least one item".to_owned(),
            ));
        }

        let mut state = self.state.write().await;

        // Unique constraint on order_number
        if state
            .orders
            .values()
            .any(|existing| existing.order_number == order.order_number)
        {
            return Err(RepositoryError::Conflict(format!(
                "order number {} already exists",
                order.order_number
            )));
        }

        // Order row commits first; items reference its ID
        let order_id = OrderId::new(next(&self.next_order_id));
        let row = Order {
            id: order_id,
            order_number: order.order_number,
            owner_id: order.owner_id,
            status: order.status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            subtotal: order.subtotal,
            shipping: order.shipping,
            total: order.total,
            shipping_address: order.shipping_address,
            gateway_order_id: order.gateway_order_id,
            gateway_payment_id: order.gateway_payment_id,
            created_at: Utc::now(),
        };
        state.orders.insert(order_id, row.clone());

        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let item_row = OrderItem {
                id: OrderItemId::new(next(&self.next_item_id)),
                order_id,
                product_id: item.product_id,
                product_name: item.product_name,
                unit_price: item.unit_price,
                quantity: item.quantity,
                total_price: item.total_price,
                variant: item.variant,
                cancelled_quantity: 0,
            };
            state.items.insert(item_row.id, item_row.clone());
            inserted.push(item_row);
        }

        Ok((row, inserted))
    }

    async fn get(&self, id: OrderId) -> RepoResult<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn items(&self, order_id: OrderId) -> RepoResult<Vec<OrderItem>> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state
            .items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    async fn get_item(&self, id: OrderItemId) -> RepoResult<Option<OrderItem>> {
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn list_for_owner(&self, owner: UserId) -> RepoResult<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|order| order.owner_id == Some(owner))
            .cloned()
            .collect();
        orders.sort_by_key(|order| std::cmp::Reverse(order.id));
        Ok(orders)
    }

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("order {id}")))?;
        order.status = status;
        Ok(())
    }

    async fn apply_cancellation(
        &self,
        item_id: OrderItemId,
        expected_cancelled: u32,
        new_cancelled: u32,
        new_item_total: Price,
        new_order_total: Price,
        new_order_status: OrderStatus,
    ) -> RepoResult<Order> {
        let mut state = self.state.write().await;

        let order_id = {
            let item = state
                .items
                .get_mut(&item_id)
                .ok_or_else(|| RepositoryError::NotFound(format!("order item {item_id}")))?;

            if item.cancelled_quantity != expected_cancelled {
                return Err(RepositoryError::Conflict(
                    "order item was cancelled concurrently".to_owned(),
                ));
            }

            item.cancelled_quantity = new_cancelled;
            item.total_price = new_item_total;
            item.order_id
        };

        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("order {order_id}")))?;
        order.total = new_order_total;
        order.status = new_order_status;
        Ok(order.clone())
    }

    async fn return_requests(&self, item_id: OrderItemId) -> RepoResult<Vec<ReturnRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<_> = state
            .returns
            .values()
            .filter(|request| request.order_item_id == item_id)
            .cloned()
            .collect();
        requests.sort_by_key(|request| request.id);
        Ok(requests)
    }

    async fn get_return_request(&self, id: ReturnRequestId) -> RepoResult<Option<ReturnRequest>> {
        Ok(self.state.read().await.returns.get(&id).cloned())
    }

    async fn create_return_request(
        &self,
        item_id: OrderItemId,
        quantity: u32,
        reason: &str,
    ) -> RepoResult<ReturnRequest> {
        let mut state = self.state.write().await;

        if !state.items.contains_key(&item_id) {
            return Err(RepositoryError::NotFound(format!("order item {item_id}")));
        }

        let request = ReturnRequest {
            id: ReturnRequestId::new(next(&self.next_return_id)),
            order_item_id: item_id,
            requested_quantity: quantity,
            approved_quantity: None,
            reason: reason.to_owned(),
            status: ReturnStatus::Pending,
            created_at: Utc::now(),
        };
        state.returns.insert(request.id, request.clone());
        Ok(request)
    }

    async fn update_return_request(
        &self,
        id: ReturnRequestId,
        status: ReturnStatus,
        approved_quantity: Option<u32>,
    ) -> RepoResult<ReturnRequest> {
        let mut state = self.state.write().await;
        let request = state
            .returns
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("return request {id}")))?;

        // Repeating a transition is a no-op
        if request.status == status {
            return Ok(request.clone());
        }

        if request.status.is_terminal() {
            return Err(RepositoryError::Conflict(format!(
                "return request {id} already resolved as {}",
                request.status
            )));
        }

        request.status = status;
        if approved_quantity.is_some() {
            request.approved_quantity = approved_quantity;
        }
        Ok(request.clone())
    }

    async fn apply_refund(
        &self,
        id: ReturnRequestId,
        refund_amount: Price,
    ) -> RepoResult<(ReturnRequest, Order)> {
        let mut state = self.state.write().await;

        // Conditional on the approved status, so a racing duplicate loses
        let (request, item_id) = {
            let request = state
                .returns
                .get_mut(&id)
                .ok_or_else(|| RepositoryError::NotFound(format!("return request {id}")))?;
            if request.status != ReturnStatus::Approved {
                return Err(RepositoryError::Conflict(format!(
                    "return request {id} is {}, not approved",
                    request.status
                )));
            }
            request.status = ReturnStatus::Refunded;
            (request.clone(), request.order_item_id)
        };

        let order_id = state
            .items
            .get(&item_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("order item {item_id}")))?
            .order_id;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("order {order_id}")))?;
        order.total = order.total - refund_amount;
        Ok((request, order.clone()))
    }
}
