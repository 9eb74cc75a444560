use billing_domain::{
    Bill, BillItem, BillPayment, Patient, Price, PriceGroup, PriceKey, PriceList, RecordId,
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{
    catalog::PriceCatalog,
    computation::ComputationEngine,
    guard::{MutationGuard, PaymentOutcome, ProposedPayment},
    ledger::BillLedger,
    patient::{reconcile_references, PatientDirectory, PatientService},
    CoreError,
};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 2, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn two_list_catalog() -> PriceCatalog {
    PriceCatalog::new(
        vec![PriceList::new(1, "Standard"), PriceList::new(2, "Insured")],
        vec![
            Price::new(1, PriceGroup::Medical, "12", "Amoxicillin", dec!(4.00)),
            Price::new(1, PriceGroup::Exam, "7", "X-ray", dec!(30.00)),
            Price::new(2, PriceGroup::Medical, "12", "Amoxicillin 500mg", dec!(3.20)),
        ],
        Vec::new(),
    )
}

struct Directory {
    patients: Vec<Patient>,
    pending: Vec<(RecordId, RecordId)>,
}

impl PatientDirectory for Directory {
    fn find_patient_by_id(&self, id: RecordId) -> Result<Option<Patient>, CoreError> {
        Ok(self.patients.iter().find(|patient| patient.id == id).cloned())
    }

    fn pending_bills(&self, patient_id: RecordId) -> Result<Vec<RecordId>, CoreError> {
        Ok(self
            .pending
            .iter()
            .filter(|(patient, _)| *patient == patient_id)
            .map(|(_, bill)| *bill)
            .collect())
    }
}

#[test]
fn totals_match_sum_of_products_and_are_idempotent() {
    let amounts = [
        dec!(12.35),
        dec!(-3.10),
        dec!(0.05),
        dec!(99.99),
        dec!(-0.01),
        dec!(7.00),
    ];
    let mut ledger = BillLedger::new(Bill::new(at(3, 8), "clerk"));
    for (position, amount) in amounts.iter().enumerate() {
        let quantity = (position as u32 % 3) + 1;
        ledger.append_item(BillItem {
            quantity,
            ..BillItem::custom(format!("line {position}"), *amount)
        });

        let expected_big: Decimal = ledger
            .items()
            .iter()
            .map(|item| item.unit_amount * Decimal::from(item.quantity))
            .sum();
        let first = ComputationEngine::compute(&ledger);
        let second = ComputationEngine::compute(&ledger);
        assert_eq!(first, second);
        assert_eq!(first.big_total, expected_big);
        assert!(first.total >= first.big_total);
    }
}

#[test]
fn balance_is_big_total_minus_payments_after_every_mutation() {
    let mut ledger = BillLedger::new(Bill::new(at(3, 8), "clerk"));
    ledger.append_item(BillItem::custom("Ward", dec!(50.00)));
    let payments = [dec!(10.00), dec!(-2.50), dec!(45.00)];
    for (hour, amount) in payments.iter().enumerate() {
        MutationGuard::post_payment(
            &mut ledger,
            ProposedPayment::new(at(3, 9 + hour as u32), *amount, "clerk"),
            at(3, 20),
        )
        .unwrap();
        let totals = ComputationEngine::compute(&ledger);
        let paid: Decimal = ledger.payments().iter().map(|p| p.amount).sum();
        assert_eq!(totals.big_total - paid, totals.balance);
    }
    let totals = ComputationEngine::compute(&ledger);
    assert_eq!(totals.balance, dec!(-2.50));
    assert!(!totals.eligibility().can_mark_paid);
}

#[test]
fn direct_append_sorts_out_of_order_payment() {
    let mut ledger = BillLedger::new(Bill::new(at(3, 8), "clerk"));
    ledger.append_payment(BillPayment::new(at(5, 9), dec!(1.00), "clerk"));
    ledger.append_payment(BillPayment::new(at(6, 9), dec!(2.00), "clerk"));
    let index = ledger.append_payment(BillPayment::new(at(4, 9), dec!(3.00), "clerk"));

    assert_eq!(index, 0);
    let dates: Vec<_> = ledger.payments().iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![at(4, 9), at(5, 9), at(6, 9)]);
}

#[test]
fn payment_on_invoice_timestamp_is_accepted_but_earlier_is_not() {
    let mut ledger = BillLedger::new(Bill::new(at(3, 8), "clerk"));
    let outcome = MutationGuard::post_payment(
        &mut ledger,
        ProposedPayment::new(at(3, 8), dec!(1.00), "clerk"),
        at(3, 12),
    )
    .unwrap();
    assert_eq!(outcome, PaymentOutcome::Appended { index: 0 });

    let err = MutationGuard::post_payment(
        &mut ledger,
        ProposedPayment::new(at(2, 23), dec!(1.00), "clerk"),
        at(3, 12),
    )
    .unwrap_err();
    assert_eq!(err.reason_code(), "payment_precedes_bill_date");
}

#[test]
fn switching_price_list_reprices_catalog_lines_and_reports_missing() {
    let catalog = two_list_catalog();
    let list = catalog.list(1).unwrap().clone();
    let mut ledger = BillLedger::new(Bill::new(at(3, 8), "clerk").with_price_list(&list));

    let med = MutationGuard::catalog_item(
        &catalog,
        1,
        &PriceKey::new(PriceGroup::Medical, "12"),
        Some("2"),
    )
    .unwrap();
    let exam =
        MutationGuard::catalog_item(&catalog, 1, &PriceKey::new(PriceGroup::Exam, "7"), None)
            .unwrap();
    ledger.append_item(med);
    ledger.append_item(exam);
    ledger.append_item(BillItem::custom("Donation", dec!(-5.00)));

    let report = MutationGuard::switch_price_list(&mut ledger, &catalog, 2).unwrap();

    assert_eq!(report.repriced, 1);
    assert_eq!(report.custom_untouched, 1);
    assert!(!report.is_complete());
    assert_eq!(report.missing[0].line, Some(1));
    assert_eq!(report.missing[0].to_string(), "price EXA7 not found in list 2 (line #1)");

    let items = ledger.items();
    assert_eq!(items[0].description, "Amoxicillin 500mg");
    assert_eq!(items[0].unit_amount, dec!(3.20));
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[1].unit_amount, dec!(30.00));
    assert_eq!(items[2].unit_amount, dec!(-5.00));
    assert_eq!(ledger.bill().price_list_id, Some(2));
    assert_eq!(ledger.bill().price_list_name, "Insured");
}

#[test]
fn switching_to_unknown_list_changes_nothing() {
    let catalog = two_list_catalog();
    let mut ledger = BillLedger::new(Bill::new(at(3, 8), "clerk"));
    let err = MutationGuard::switch_price_list(&mut ledger, &catalog, 99).unwrap_err();
    assert_eq!(err.reason_code(), "price_list_not_found");
    assert!(!ledger.is_modified());
}

#[test]
fn selecting_patient_with_pending_bill_respects_configuration() {
    let directory = Directory {
        patients: vec![Patient::new(3, "Ada Obi")],
        pending: vec![(3, 41)],
    };
    let patient = Patient::new(3, "Ada Obi");
    let mut ledger = BillLedger::new(Bill::new(at(3, 8), "clerk"));

    let err = PatientService::select(&mut ledger, &patient, &directory, false).unwrap_err();
    assert!(matches!(err, CoreError::PendingBillExists { ref bills, .. } if bills == &vec![41]));
    assert!(!ledger.bill().has_patient);

    let pending = PatientService::select(&mut ledger, &patient, &directory, true).unwrap();
    assert_eq!(pending, vec![41]);
    assert_eq!(ledger.bill().patient_name, "Ada Obi");

    let err = PatientService::set_payer_name(&mut ledger, "Someone").unwrap_err();
    assert_eq!(err.reason_code(), "invalid_operation");
    PatientService::clear(&mut ledger);
    PatientService::set_payer_name(&mut ledger, " Walk-in ").unwrap();
    assert_eq!(ledger.bill().patient_name, "Walk-in");
}

#[test]
fn reconcile_repairs_missing_list_and_patient() {
    let catalog = two_list_catalog();
    let directory = Directory {
        patients: Vec::new(),
        pending: Vec::new(),
    };
    let mut bill = Bill::new(at(3, 8), "clerk")
        .with_price_list(&PriceList::new(7, "Retired"))
        .with_patient(&Patient::new(5, "Gone Away"));
    bill.id = 12;
    let mut ledger = BillLedger::load(bill, Vec::new(), Vec::new());

    let warnings = reconcile_references(&mut ledger, Some(&catalog), &directory).unwrap();

    assert_eq!(warnings.len(), 2);
    assert_eq!(ledger.bill().price_list_id, Some(1));
    assert!(!ledger.bill().has_patient);
    assert_eq!(ledger.bill().patient_name, "Gone Away");
}

#[test]
fn reconcile_leaves_bills_without_price_list_alone() {
    let catalog = two_list_catalog();
    let directory = Directory {
        patients: Vec::new(),
        pending: Vec::new(),
    };
    let mut bill = Bill::new(at(3, 8), "clerk");
    bill.id = 13;
    bill.uses_price_list = false;
    let mut ledger = BillLedger::load(bill, Vec::new(), Vec::new());

    let warnings = reconcile_references(&mut ledger, Some(&catalog), &directory).unwrap();

    assert!(warnings.is_empty());
    assert_eq!(ledger.bill().price_list_id, None);
    assert!(!ledger.is_modified());
}
