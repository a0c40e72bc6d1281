//! End-to-end workflows on a file-backed database.

mod common;

use common::*;
use meridian_core::{
    CashTransactionType, CoreError, CustomerTransactionType, ErrorKind, NewAdjustment,
    NewCustomerPayment, NewSaleLine, NewTransfer, NewTransferItem, PaymentMethod, RefundLine,
    RefundRequest, SaleStatus, TransferStatus,
};

#[tokio::test]
async fn transfer_round_trip_creates_destination_record() {
    let (_dir, db) = file_database().await;
    let a = branch(&db, "A").await;
    let b = branch(&db, "B").await;
    let p = product(&db, "P1", 100).await;
    stock(&db, &a.id, &p.id, 10).await;

    let outbound = db
        .transfers()
        .create_transfer(
            &NewTransfer {
                from_branch_id: a.id.clone(),
                to_branch_id: b.id.clone(),
                items: vec![NewTransferItem {
                    product_id: p.id.clone(),
                    quantity: 6,
                }],
                notes: Some("weekly restock".into()),
            },
            CASHIER,
        )
        .await
        .unwrap();
    assert_eq!(on_hand(&db, &b.id, &p.id).await, None);

    db.transfers()
        .complete_transfer(&outbound.transfer.id, CASHIER)
        .await
        .unwrap();
    assert_eq!(on_hand(&db, &a.id, &p.id).await, Some(4));
    assert_eq!(on_hand(&db, &b.id, &p.id).await, Some(6));

    let back = db
        .transfers()
        .create_transfer(
            &NewTransfer {
                from_branch_id: b.id.clone(),
                to_branch_id: a.id.clone(),
                items: vec![NewTransferItem {
                    product_id: p.id.clone(),
                    quantity: 6,
                }],
                notes: None,
            },
            CASHIER,
        )
        .await
        .unwrap();
    let done = db
        .transfers()
        .complete_transfer(&back.transfer.id, CASHIER)
        .await
        .unwrap();
    assert_eq!(done.transfer.status, TransferStatus::Completed);

    assert_eq!(on_hand(&db, &a.id, &p.id).await, Some(10));
    assert_eq!(on_hand(&db, &b.id, &p.id).await, Some(0));
}

#[tokio::test]
async fn credit_sale_then_payment() {
    let (_dir, db) = file_database().await;
    let b = branch(&db, "MAIN").await;
    let p = product(&db, "P1", 10000).await;
    let c = customer(&db, "Ana").await;
    stock(&db, &b.id, &p.id, 2).await;

    let mut req = sale(&b.id, PaymentMethod::Credit, vec![NewSaleLine::new(p.id.clone(), 1)]);
    req.customer_id = Some(c.id.clone());
    let detail = db.sales().create_sale(&req, CASHIER).await.unwrap();
    assert_eq!(detail.sale.paid_amount_cents, 0);

    let debt = db.customer_ledger().balance(&c.id, None).await.unwrap();
    assert_eq!(debt.balance_cents, 10000);

    db.customer_ledger()
        .record_payment(
            &NewCustomerPayment {
                customer_id: c.id.clone(),
                amount_cents: 4000,
                notes: None,
            },
            CASHIER,
        )
        .await
        .unwrap();

    let first = db.customer_ledger().balance(&c.id, None).await.unwrap();
    let second = db.customer_ledger().balance(&c.id, None).await.unwrap();
    assert_eq!(first.balance_cents, 6000);
    assert_eq!(first, second);

    let history = db.customer_ledger().history(&c.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].transaction_type, CustomerTransactionType::Sale);
    assert_eq!(history[0].sale_id.as_deref(), Some(detail.sale.id.as_str()));

    // A credit sale puts nothing in the register.
    assert!(db
        .cash_register()
        .entries_for_sale(&detail.sale.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn discounted_sale_refunds_to_the_cent() {
    let (_dir, db) = file_database().await;
    let b = branch(&db, "MAIN").await;
    let p1 = product(&db, "P1", 333).await;
    let p2 = product(&db, "P2", 1000).await;
    stock(&db, &b.id, &p1.id, 10).await;
    stock(&db, &b.id, &p2.id, 10).await;

    let mut req = sale(
        &b.id,
        PaymentMethod::Cash,
        vec![NewSaleLine::new(p1.id.clone(), 3), NewSaleLine::new(p2.id.clone(), 1)],
    );
    req.discount_cents = 100;
    req.paid_amount_cents = Some(2000);
    let detail = db.sales().create_sale(&req, CASHIER).await.unwrap();
    assert_eq!(detail.sale.subtotal_cents, 1999);
    assert_eq!(detail.sale.total_cents, 1899);
    assert_eq!(detail.sale.change_amount_cents, 101);

    let first = db
        .sales()
        .refund_sale(
            &detail.sale.id,
            &RefundRequest {
                lines: Some(vec![RefundLine {
                    sale_item_id: detail.items[0].id.clone(),
                    quantity: 1,
                }]),
                reason: None,
            },
            CASHIER,
        )
        .await
        .unwrap();
    assert_eq!(first.sale.status, SaleStatus::PartiallyRefunded);

    let rest = db
        .sales()
        .refund_sale(&detail.sale.id, &RefundRequest::default(), CASHIER)
        .await
        .unwrap();
    assert_eq!(rest.sale.status, SaleStatus::Refunded);
    assert_eq!(
        first.refund.amount_cents + rest.refund.amount_cents,
        detail.sale.total_cents
    );

    let register = db.cash_register().balance(&b.id, None).await.unwrap();
    assert_eq!(register.balance_cents, 0);
    let entries = db.cash_register().entries_for_sale(&detail.sale.id).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].transaction_type, CashTransactionType::SaleIn);

    assert_eq!(on_hand(&db, &b.id, &p1.id).await, Some(10));
    assert_eq!(on_hand(&db, &b.id, &p2.id).await, Some(10));
}

#[tokio::test]
async fn adjustment_and_sale_share_the_guard() {
    let (_dir, db) = file_database().await;
    let b = branch(&db, "MAIN").await;
    let p = product(&db, "P1", 100).await;
    stock(&db, &b.id, &p.id, 4).await;

    db.adjustments()
        .record_adjustment(
            &NewAdjustment {
                branch_id: b.id.clone(),
                product_id: p.id.clone(),
                quantity_delta: -3,
                reason: "breakage".into(),
                notes: None,
            },
            CASHIER,
        )
        .await
        .unwrap();

    let err = db
        .sales()
        .create_sale(
            &sale(&b.id, PaymentMethod::Cash, vec![NewSaleLine::new(p.id.clone(), 2)]),
            CASHIER,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BusinessRule);
    assert!(matches!(
        err.as_domain(),
        Some(CoreError::InsufficientStock { available: 1, requested: 2, .. })
    ));
    assert_eq!(on_hand(&db, &b.id, &p.id).await, Some(1));
}

#[tokio::test]
async fn duplicate_codes_are_validation_errors() {
    let (_dir, db) = file_database().await;
    branch(&db, "MAIN").await;
    product(&db, "SKU-1", 100).await;

    let err = db
        .branches()
        .insert(&meridian_core::NewBranch {
            code: "MAIN".into(),
            name: "Again".into(),
            address: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = db
        .products()
        .insert(&meridian_core::NewProduct {
            sku: "SKU-1".into(),
            barcode: None,
            name: "Again".into(),
            description: None,
            price_cents: 100,
            cost_cents: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
