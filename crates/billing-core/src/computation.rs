//! Derived bill figures. Everything is recomputed from the ledger rows on each call.

use billing_domain::{Amounted, BillItem, BillPayment};
use rust_decimal::Decimal;

use crate::ledger::BillLedger;

/// Figures shown beneath the item and payment tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BillTotals {
    /// Positive (billable) lines only.
    pub total: Decimal,
    /// All lines, credits included: the amount due.
    pub big_total: Decimal,
    pub paid: Decimal,
    /// `big_total - paid`. Negative means overpayment.
    pub balance: Decimal,
}

impl BillTotals {
    /// Which balance-dependent actions the caller may offer.
    pub fn eligibility(&self) -> Eligibility {
        let available = self.balance >= Decimal::ZERO;
        Eligibility {
            can_mark_paid: available,
            can_give_change: available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub can_mark_paid: bool,
    pub can_give_change: bool,
}

/// Stateless calculator over ledger rows.
pub struct ComputationEngine;

impl ComputationEngine {
    pub fn compute(ledger: &BillLedger) -> BillTotals {
        Self::compute_rows(ledger.items(), ledger.payments())
    }

    pub fn compute_rows(items: &[BillItem], payments: &[BillPayment]) -> BillTotals {
        let total = Self::total(items);
        let big_total = Self::big_total(items);
        let paid = Self::paid(payments);
        BillTotals {
            total,
            big_total,
            paid,
            balance: big_total - paid,
        }
    }

    pub fn total(items: &[BillItem]) -> Decimal {
        items
            .iter()
            .filter(|item| !item.is_credit())
            .map(BillItem::line_total)
            .sum()
    }

    pub fn big_total(items: &[BillItem]) -> Decimal {
        items.iter().map(Amounted::amount).sum()
    }

    pub fn paid(payments: &[BillPayment]) -> Decimal {
        payments.iter().map(Amounted::amount).sum()
    }

    /// Same figures as [`compute_rows`](Self::compute_rows), but `None` when any product or
    /// sum overflows or would have to drop decimal places to fit.
    pub fn checked_totals<'a, I, P>(items: I, payments: P) -> Option<BillTotals>
    where
        I: IntoIterator<Item = &'a BillItem>,
        P: IntoIterator<Item = &'a BillPayment>,
    {
        let mut total = Decimal::ZERO;
        let mut big_total = Decimal::ZERO;
        for item in items {
            let line = item.checked_line_total()?;
            big_total = exact_add(big_total, line)?;
            if !item.is_credit() {
                total = exact_add(total, line)?;
            }
        }
        let mut paid = Decimal::ZERO;
        for payment in payments {
            paid = exact_add(paid, payment.amount)?;
        }
        let balance = exact_add(big_total, -paid)?;
        Some(BillTotals {
            total,
            big_total,
            paid,
            balance,
        })
    }

    /// Recomputes and writes the derived header fields (`total`, `balance`,
    /// last payment date) back onto the bill.
    pub fn refresh(ledger: &mut BillLedger) -> BillTotals {
        let totals = Self::compute(ledger);
        let last_payment = ledger.latest_payment_date();
        let bill = ledger.bill_mut();
        bill.total = totals.total;
        bill.balance = totals.balance;
        bill.last_payment_date = last_payment;
        totals
    }
}

fn exact_add(left: Decimal, right: Decimal) -> Option<Decimal> {
    let sum = left.checked_add(right)?;
    (sum.scale() >= left.scale().max(right.scale())).then_some(sum)
}
