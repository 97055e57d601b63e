//! End-to-end order flows against an in-memory database.

use chrono::NaiveDate;

use pharma_core::{CoreError, Dispensary, MedicationRef, NewCategory, NewMedication, PostalAddress};
use pharma_db::{Database, DbConfig, OrderService, ServiceError};

fn shipping_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 17).unwrap()
}

struct Fixture {
    db: Database,
    service: OrderService,
    paracetamol: MedicationRef,
    aspirin: MedicationRef,
}

impl Fixture {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        for (code, city) in [("ALFKI", "Berlin"), ("BONAP", "Marseille")] {
            catalog
                .insert_dispensary(&Dispensary {
                    code: code.to_string(),
                    name: format!("Pharmacie {code}"),
                    contact: None,
                    title: None,
                    address: PostalAddress {
                        city: Some(city.to_string()),
                        ..Default::default()
                    },
                    phone: None,
                    fax: None,
                })
                .await
                .unwrap();
        }

        let category = catalog
            .insert_category(&NewCategory {
                label: "Antalgique".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let paracetamol = catalog
            .insert_medication(&NewMedication::new("Paracetamol", category.code).with_stock(500, 50))
            .await
            .unwrap();
        let aspirin = catalog
            .insert_medication(&NewMedication::new("Aspirin", category.code).with_stock(20, 5))
            .await
            .unwrap();

        let service = db.order_service().with_clock(shipping_day);
        Fixture {
            db,
            service,
            paracetamol: paracetamol.reference,
            aspirin: aspirin.reference,
        }
    }

    async fn stock(&self, reference: MedicationRef) -> (i64, i64) {
        let medication = self.db.catalog().get_medication(reference).await.unwrap().unwrap();
        (medication.stock.units_on_hand(), medication.stock.units_committed())
    }

    /// Ships a single-line order of `units` paracetamol for `code`.
    async fn ship_units(&self, code: &str, units: i64) {
        let order = self.service.create_order(code).await.unwrap();
        self.service.add_line(order.number(), self.paracetamol, units).await.unwrap();
        self.service.ship_order(order.number()).await.unwrap();
    }
}

fn rule(err: ServiceError) -> CoreError {
    match err {
        ServiceError::Rule(rule) => rule,
        other => panic!("expected a business rule violation, got {other:?}"),
    }
}

#[tokio::test]
async fn adding_twice_merges_into_one_line() {
    let fx = Fixture::new().await;
    let order = fx.service.create_order("ALFKI").await.unwrap();

    fx.service.add_line(order.number(), fx.paracetamol, 10).await.unwrap();
    let line = fx.service.add_line(order.number(), fx.paracetamol, 3).await.unwrap();
    assert_eq!(line.quantity, 13);

    let stored = fx.service.get_order(order.number()).await.unwrap();
    assert_eq!(stored.line_count(), 1);
    assert_eq!(stored.total_units(), 13);
    assert_eq!(fx.stock(fx.paracetamol).await, (500, 13));
}

#[tokio::test]
async fn out_of_stock_leaves_everything_unchanged() {
    let fx = Fixture::new().await;
    let first = fx.service.create_order("ALFKI").await.unwrap();
    fx.service.add_line(first.number(), fx.paracetamol, 13).await.unwrap();

    let second = fx.service.create_order("ALFKI").await.unwrap();
    let err = fx
        .service
        .add_line(second.number(), fx.paracetamol, 999)
        .await
        .unwrap_err();
    assert!(matches!(
        rule(err),
        CoreError::OutOfStock {
            available: 487,
            requested: 999,
            ..
        }
    ));

    assert_eq!(fx.stock(fx.paracetamol).await, (500, 13));
    assert_eq!(fx.service.get_order(second.number()).await.unwrap().line_count(), 0);
}

#[tokio::test]
async fn discount_requires_more_than_threshold_shipped() {
    let fx = Fixture::new().await;

    fx.ship_units("ALFKI", 150).await;
    let rewarded = fx.service.create_order("ALFKI").await.unwrap();
    assert_eq!(rewarded.discount().bps(), 1500);

    fx.ship_units("BONAP", 40).await;
    assert_eq!(fx.service.create_order("BONAP").await.unwrap().discount().bps(), 0);

    fx.ship_units("BONAP", 60).await;
    // Exactly at the threshold
    assert_eq!(fx.service.create_order("BONAP").await.unwrap().discount().bps(), 0);
}

#[tokio::test]
async fn open_orders_do_not_count_towards_discount() {
    let fx = Fixture::new().await;
    let open = fx.service.create_order("ALFKI").await.unwrap();
    fx.service.add_line(open.number(), fx.paracetamol, 200).await.unwrap();

    let next = fx.service.create_order("ALFKI").await.unwrap();
    assert_eq!(next.discount().bps(), 0);
}

#[tokio::test]
async fn shipping_consumes_committed_stock() {
    let fx = Fixture::new().await;
    let order = fx.service.create_order("ALFKI").await.unwrap();
    fx.service.add_line(order.number(), fx.paracetamol, 10).await.unwrap();

    let shipped = fx.service.ship_order(order.number()).await.unwrap();
    assert!(shipped.is_shipped());
    assert_eq!(shipped.ship_date(), Some(shipping_day()));
    assert_eq!(fx.stock(fx.paracetamol).await, (490, 0));
}

#[tokio::test]
async fn shipped_orders_are_frozen() {
    let fx = Fixture::new().await;
    let order = fx.service.create_order("ALFKI").await.unwrap();
    let line = fx.service.add_line(order.number(), fx.paracetamol, 10).await.unwrap();
    fx.service.ship_order(order.number()).await.unwrap();
    let after_ship = fx.stock(fx.paracetamol).await;

    let err = fx.service.ship_order(order.number()).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::OrderShipped { .. }));

    let err = fx.service.add_line(order.number(), fx.aspirin, 1).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::OrderShipped { .. }));

    let err = fx.service.remove_line(&line.id).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::OrderShipped { .. }));

    assert_eq!(fx.stock(fx.paracetamol).await, after_ship);
    assert_eq!(fx.stock(fx.aspirin).await, (20, 0));
    assert_eq!(fx.service.get_order(order.number()).await.unwrap().total_units(), 10);
}

#[tokio::test]
async fn removing_a_line_releases_its_stock() {
    let fx = Fixture::new().await;
    let order = fx.service.create_order("ALFKI").await.unwrap();
    let line = fx.service.add_line(order.number(), fx.aspirin, 7).await.unwrap();
    assert_eq!(fx.stock(fx.aspirin).await, (20, 7));

    let removed = fx.service.remove_line(&line.id).await.unwrap().unwrap();
    assert_eq!(removed.quantity, 7);
    assert_eq!(fx.stock(fx.aspirin).await, (20, 0));
    assert_eq!(fx.service.get_order(order.number()).await.unwrap().line_count(), 0);

    // Second removal is a no-op
    assert!(fx.service.remove_line(&line.id).await.unwrap().is_none());
    assert!(fx.service.remove_line("no-such-line").await.unwrap().is_none());
    assert_eq!(fx.stock(fx.aspirin).await, (20, 0));
}

#[tokio::test]
async fn unknown_references_are_not_found() {
    let fx = Fixture::new().await;

    let err = fx.service.create_order("NOPE").await.unwrap_err();
    assert!(matches!(rule(err), CoreError::NotFound { ref entity, .. } if entity == "Dispensary"));

    let err = fx.service.add_line(4242, fx.paracetamol, 1).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::NotFound { ref entity, .. } if entity == "Order"));

    let order = fx.service.create_order("ALFKI").await.unwrap();
    let err = fx.service.add_line(order.number(), 9999, 1).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::NotFound { ref entity, .. } if entity == "Medication"));

    let err = fx.service.ship_order(4242).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::NotFound { .. }));

    let err = fx.service.get_order(4242).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::NotFound { .. }));
}

#[tokio::test]
async fn unavailable_medication_is_rejected_before_order_lookup() {
    let fx = Fixture::new().await;
    fx.db.catalog().set_unavailable(fx.aspirin, true).await.unwrap();

    let err = fx.service.add_line(4242, fx.aspirin, 1).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::Unavailable { .. }));

    let order = fx.service.create_order("ALFKI").await.unwrap();
    let err = fx.service.add_line(order.number(), fx.aspirin, 1).await.unwrap_err();
    assert!(matches!(rule(err), CoreError::Unavailable { .. }));
    assert_eq!(fx.stock(fx.aspirin).await, (20, 0));
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let fx = Fixture::new().await;
    let order = fx.service.create_order("ALFKI").await.unwrap();

    for qty in [0, -3] {
        let err = fx.service.add_line(order.number(), fx.paracetamol, qty).await.unwrap_err();
        assert!(matches!(rule(err), CoreError::InvalidQuantity { quantity } if quantity == qty));
    }
    assert_eq!(fx.stock(fx.paracetamol).await, (500, 0));
}

#[tokio::test]
async fn committed_never_exceeds_on_hand() {
    let fx = Fixture::new().await;
    let order = fx.service.create_order("ALFKI").await.unwrap();

    let mut lines = Vec::new();
    for qty in [6, 6, 6, 6, 6] {
        if let Ok(line) = fx.service.add_line(order.number(), fx.aspirin, qty).await {
            lines.push(line);
        }
        let (on_hand, committed) = fx.stock(fx.aspirin).await;
        assert!(committed <= on_hand);
    }
    assert_eq!(fx.stock(fx.aspirin).await, (20, 18));

    let line = fx.service.get_order(order.number()).await.unwrap().line_for(fx.aspirin).cloned().unwrap();
    fx.service.reduce_line(&line.id, 10).await.unwrap();
    assert_eq!(fx.stock(fx.aspirin).await, (20, 8));

    fx.service.add_line(order.number(), fx.aspirin, 12).await.unwrap();
    assert_eq!(fx.stock(fx.aspirin).await, (20, 20));
    assert!(fx.service.add_line(order.number(), fx.aspirin, 1).await.is_err());

    fx.service.ship_order(order.number()).await.unwrap();
    assert_eq!(fx.stock(fx.aspirin).await, (0, 0));
}

#[tokio::test]
async fn in_progress_orders_are_newest_first() {
    let fx = Fixture::new().await;
    let older = fx.service.create_order("ALFKI").await.unwrap();
    let shipped = fx.service.create_order("ALFKI").await.unwrap();
    fx.service.add_line(shipped.number(), fx.aspirin, 1).await.unwrap();
    fx.service.ship_order(shipped.number()).await.unwrap();
    let newer = fx.service.create_order("ALFKI").await.unwrap();
    fx.service.create_order("BONAP").await.unwrap();

    let in_progress = fx.service.orders_in_progress_for("ALFKI").await.unwrap();
    let numbers: Vec<_> = in_progress.iter().map(|o| o.number()).collect();
    assert_eq!(numbers, vec![newer.number(), older.number()]);

    assert!(fx.service.orders_in_progress_for("NOPE").await.unwrap().is_empty());
}

#[tokio::test]
async fn new_orders_deliver_to_the_dispensary() {
    let fx = Fixture::new().await;
    let order = fx.service.create_order("BONAP").await.unwrap();

    assert_eq!(order.entry_date(), shipping_day());
    assert_eq!(order.delivery_address().city.as_deref(), Some("Marseille"));
    assert_eq!(order.ship_date(), None);
    assert_eq!(order.line_count(), 0);
}
