//! Order Collection
//! Mission: Order persistence, status transitions and revenue totals

use super::{
    count_where, delete_where, encode_json, encode_ts, read_id, read_json, read_opt_ts,
    read_parsed, read_ts, select_one, select_page, update_where, Assignments, Database, Predicate,
    StoreError,
};
use crate::models::{DocumentId, Order, OrderStatus, Page, PageRequest};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

const ORDER_COLUMNS: &str = "id, order_number, user_id, user_email, items_json, total_amount, \
     status, payment_status, payment_method, shipping_address_json, billing_address_json, \
     tracking_number, notes, created_at, updated_at, shipped_at, delivered_at";

#[derive(Debug, Clone)]
pub enum OrderFilter {
    Id(DocumentId),
    /// Listing query: optional status, optional search over order number and customer email
    Matching {
        status: Option<OrderStatus>,
        search: Option<String>,
    },
    All,
}

impl OrderFilter {
    fn predicate(&self) -> Predicate {
        let mut predicate = Predicate::default();
        match self {
            OrderFilter::Id(id) => predicate = predicate.eq("id", id.to_string()),
            OrderFilter::Matching { status, search } => {
                if let Some(status) = status {
                    predicate = predicate.eq("status", status.as_str().to_string());
                }
                if let Some(needle) = search.as_deref().filter(|s| !s.is_empty()) {
                    predicate = predicate.search(&["order_number", "user_email"], needle);
                }
            }
            OrderFilter::All => {}
        }
        predicate
    }
}

/// Status transition plus optional fulfilment details.
#[derive(Debug, Clone)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

impl OrderStatusUpdate {
    fn into_assignments(self, now: DateTime<Utc>) -> Assignments {
        let stamp = encode_ts(&now);
        let mut set = Assignments::default();
        set.set("status", self.status.as_str().to_string());
        set.set_opt("tracking_number", self.tracking_number);
        set.set_opt("notes", self.notes);
        match self.status {
            OrderStatus::Shipped => set.set("shipped_at", stamp.clone()),
            OrderStatus::Delivered => set.set("delivered_at", stamp.clone()),
            _ => {}
        }
        set.set("updated_at", stamp);
        set
    }
}

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    let billing: Option<String> = row.get(10)?;
    Ok(Order {
        id: read_id(row, 0)?,
        order_number: row.get(1)?,
        user_id: row.get(2)?,
        user_email: row.get(3)?,
        items: read_json(row, 4)?,
        total_amount: row.get(5)?,
        status: read_parsed(row, 6)?,
        payment_status: read_parsed(row, 7)?,
        payment_method: row.get(8)?,
        shipping_address: read_json(row, 9)?,
        billing_address: match billing {
            Some(_) => Some(read_json(row, 10)?),
            None => None,
        },
        tracking_number: row.get(11)?,
        notes: row.get(12)?,
        created_at: read_ts(row, 13)?,
        updated_at: read_ts(row, 14)?,
        shipped_at: read_opt_ts(row, 15)?,
        delivered_at: read_opt_ts(row, 16)?,
    })
}

impl Database {
    /// Orders are placed by the storefront; this exists for imports and fixtures.
    pub async fn insert_order(&self, order: Order) -> Result<Order, StoreError> {
        self.call(move |conn| {
            let billing = order.billing_address.as_ref().map(encode_json).transpose()?;
            conn.execute(
                &format!(
                    "INSERT INTO orders ({ORDER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                             ?16, ?17)"
                ),
                params![
                    order.id.to_string(),
                    order.order_number,
                    order.user_id,
                    order.user_email,
                    encode_json(&order.items)?,
                    order.total_amount,
                    order.status.as_str(),
                    order.payment_status.as_str(),
                    order.payment_method,
                    encode_json(&order.shipping_address)?,
                    billing,
                    order.tracking_number,
                    order.notes,
                    encode_ts(&order.created_at),
                    encode_ts(&order.updated_at),
                    order.shipped_at.as_ref().map(encode_ts),
                    order.delivered_at.as_ref().map(encode_ts),
                ],
            )?;
            Ok(order)
        })
        .await
    }

    pub async fn find_order(&self, filter: OrderFilter) -> Result<Option<Order>, StoreError> {
        self.call(move |conn| {
            select_one(conn, "orders", ORDER_COLUMNS, &filter.predicate(), order_from_row)
        })
        .await
    }

    pub async fn count_orders(&self, filter: OrderFilter) -> Result<u64, StoreError> {
        self.call(move |conn| count_where(conn, "orders", &filter.predicate()))
            .await
    }

    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        request: PageRequest,
    ) -> Result<Page<Order>, StoreError> {
        self.call(move |conn| {
            select_page(
                conn,
                "orders",
                ORDER_COLUMNS,
                &filter.predicate(),
                request,
                order_from_row,
            )
        })
        .await
    }

    /// Moving to `shipped` or `delivered` stamps the matching timestamp.
    pub async fn update_order_status(
        &self,
        filter: OrderFilter,
        update: OrderStatusUpdate,
    ) -> Result<bool, StoreError> {
        self.call(move |conn| {
            let set = update.into_assignments(Utc::now());
            update_where(conn, "orders", set, &filter.predicate())
        })
        .await
    }

    pub async fn delete_order(&self, filter: OrderFilter) -> Result<bool, StoreError> {
        self.call(move |conn| delete_where(conn, "orders", &filter.predicate()))
            .await
    }

    /// Sum of `total_amount` over every order that was not cancelled.
    pub async fn order_revenue(&self) -> Result<f64, StoreError> {
        self.call(|conn| {
            let revenue: f64 = conn.query_row(
                "SELECT COALESCE(SUM(total_amount), 0.0) FROM orders WHERE status <> ?1",
                params![OrderStatus::Cancelled.as_str()],
                |row| row.get(0),
            )?;
            Ok(revenue)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, OrderItem, PaymentStatus};
    use crate::store::test_support::temp_db;

    fn order(number: &str, email: &str, total: f64, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: DocumentId::new(),
            order_number: number.to_string(),
            user_id: DocumentId::new().to_string(),
            user_email: email.to_string(),
            items: vec![OrderItem {
                product_id: DocumentId::new().to_string(),
                product_name: "Kettle".to_string(),
                price: total,
                quantity: 1,
                total,
                image: None,
            }],
            total_amount: total,
            status,
            payment_status: PaymentStatus::Paid,
            payment_method: Some("card".to_string()),
            shipping_address: Address {
                kind: "home".to_string(),
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip_code: "62701".to_string(),
                country: "US".to_string(),
                is_default: true,
            },
            billing_address: None,
            tracking_number: None,
            notes: None,
            created_at: now,
            updated_at: now,
            shipped_at: None,
            delivered_at: None,
        }
    }

    #[tokio::test]
    async fn test_roundtrip_and_unique_number() {
        let (db, _temp) = temp_db();
        let placed = db
            .insert_order(order("ORD-1001", "ann@mail.example", 40.0, OrderStatus::Pending))
            .await
            .unwrap();

        let stored = db
            .find_order(OrderFilter::Id(placed.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.items, placed.items);
        assert_eq!(stored.shipping_address, placed.shipping_address);
        assert!(stored.billing_address.is_none());
        assert_eq!(stored.payment_status, PaymentStatus::Paid);

        let err = db
            .insert_order(order("ORD-1001", "bob@mail.example", 5.0, OrderStatus::Pending))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "order number" }));
    }

    #[tokio::test]
    async fn test_status_update_stamps_fulfilment_times() {
        let (db, _temp) = temp_db();
        let placed = db
            .insert_order(order("ORD-2001", "ann@mail.example", 15.0, OrderStatus::Processing))
            .await
            .unwrap();

        db.update_order_status(
            OrderFilter::Id(placed.id),
            OrderStatusUpdate {
                status: OrderStatus::Shipped,
                tracking_number: Some("1Z999".to_string()),
                notes: None,
            },
        )
        .await
        .unwrap();

        let shipped = db
            .find_order(OrderFilter::Id(placed.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(shipped.tracking_number.as_deref(), Some("1Z999"));
        assert!(shipped.shipped_at.is_some());
        assert!(shipped.delivered_at.is_none());

        db.update_order_status(
            OrderFilter::Id(placed.id),
            OrderStatusUpdate {
                status: OrderStatus::Delivered,
                tracking_number: None,
                notes: Some("Left at front desk".to_string()),
            },
        )
        .await
        .unwrap();

        let delivered = db
            .find_order(OrderFilter::Id(placed.id))
            .await
            .unwrap()
            .unwrap();
        assert!(delivered.delivered_at.is_some());
        assert_eq!(delivered.shipped_at, shipped.shipped_at);
        assert_eq!(delivered.tracking_number.as_deref(), Some("1Z999"));
    }

    #[tokio::test]
    async fn test_filters_and_revenue() {
        let (db, _temp) = temp_db();
        db.insert_order(order("ORD-1", "ann@mail.example", 10.0, OrderStatus::Pending))
            .await
            .unwrap();
        db.insert_order(order("ORD-2", "bob@mail.example", 20.0, OrderStatus::Delivered))
            .await
            .unwrap();
        db.insert_order(order("ORD-3", "ann@mail.example", 99.0, OrderStatus::Cancelled))
            .await
            .unwrap();

        let pending = db
            .count_orders(OrderFilter::Matching {
                status: Some(OrderStatus::Pending),
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(pending, 1);

        let anns = db
            .list_orders(
                OrderFilter::Matching {
                    status: None,
                    search: Some("ANN@".to_string()),
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(anns.total, 2);

        assert_eq!(db.order_revenue().await.unwrap(), 30.0);
        assert_eq!(db.count_orders(OrderFilter::All).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_revenue_of_empty_store() {
        let (db, _temp) = temp_db();
        assert_eq!(db.order_revenue().await.unwrap(), 0.0);
    }
}
