//! Order service endpoints.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::{OrderId, OrderStatus, ProductId, UserId};
use saga::OrderDraft;
use serde::{Deserialize, Serialize};
use store::Order;

use crate::error::ApiError;
use crate::extract::Authenticated;
use crate::state::OrderAppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: OrderId,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct OrderSummaryResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl From<&Order> for OrderSummaryResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            status: order.status,
            total_price: order.total_price,
            created_at: order.created_at,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_price: order.total_price,
            created_at: order.created_at,
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id,
                    name: item.product_name,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        }
    }
}

// -- Handlers --

/// POST /orders: prices, stores and announces a new order.
pub async fn create(
    State(state): State<OrderAppState>,
    Authenticated(principal): Authenticated,
    body: Result<Json<OrderDraft>, JsonRejection>,
) -> Result<Json<OrderCreatedResponse>, ApiError> {
    let Json(draft) = body?;
    let order = state.creation.execute(&principal, draft).await?;

    Ok(Json(OrderCreatedResponse {
        order_id: order.id,
        message: "Order created successfully",
    }))
}

/// GET /orders: all orders for admins, orders with own products for sellers.
pub async fn list(
    State(state): State<OrderAppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let orders = state.orders.list_orders(&principal).await?;
    Ok(Json(orders.iter().map(OrderSummaryResponse::from).collect()))
}

/// GET /orders/me: orders the caller placed.
pub async fn list_mine(
    State(state): State<OrderAppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let orders = state.orders.list_own_orders(&principal).await?;
    Ok(Json(orders.iter().map(OrderSummaryResponse::from).collect()))
}

/// GET /orders/{id}
pub async fn get(
    State(state): State<OrderAppState>,
    Authenticated(principal): Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Path(id) = id?;
    let order = state.orders.get_order(&principal, OrderId::new(id)).await?;
    Ok(Json(order.into()))
}

/// PUT /orders/{id}/status: admin only.
pub async fn update_status(
    State(state): State<OrderAppState>,
    Authenticated(principal): Authenticated,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    let Json(request) = body?;
    state
        .orders
        .update_status(&principal, OrderId::new(id), &request.status)
        .await?;

    Ok(Json(MessageResponse {
        message: "Order status updated successfully",
    }))
}
