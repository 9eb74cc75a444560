//! OPEN -> CLOSED transition and the give-change calculation.

use billing_domain::BillStatus;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    computation::{BillTotals, ComputationEngine},
    error::ValidationError,
    guard::{MutationGuard, ProposedPayment},
    ledger::BillLedger,
    CoreError,
};

/// What "mark paid" did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkPaidOutcome {
    /// Index of the generated settling payment, when the balance was positive.
    pub settling_payment: Option<usize>,
    pub totals: BillTotals,
}

pub struct BillLifecycle;

impl BillLifecycle {
    /// Closes the bill, first settling any positive balance with a payment for exactly that amount.
    ///
    /// Only bills that have been saved can be closed. `supplied_date` is only consulted when
    /// the bill is dated in a past day. Nothing changes when a rule refuses the transition.
    pub fn mark_paid(
        ledger: &mut BillLedger,
        now: NaiveDateTime,
        supplied_date: Option<NaiveDateTime>,
        user: &str,
    ) -> Result<MarkPaidOutcome, CoreError> {
        if ledger.is_inserting() {
            warn!("mark paid refused for unsaved bill");
            return Err(CoreError::InvalidOperation(
                "bill must be saved before it can be marked paid".into(),
            ));
        }
        if ledger.bill().is_closed() {
            return Err(ValidationError::BillClosed.into());
        }
        let totals = ComputationEngine::compute(ledger);
        if totals.balance < Decimal::ZERO {
            warn!(balance = %totals.balance, "mark paid refused");
            return Err(ValidationError::NegativeBalance {
                balance: totals.balance,
            }
            .into());
        }

        let mut settling_payment = None;
        if totals.balance > Decimal::ZERO {
            let date = MutationGuard::resolve_payment_date(ledger.bill(), now, supplied_date)?;
            let validated =
                ProposedPayment::new(date, totals.balance, user).validate(ledger, now)?;
            settling_payment = Some(validated.append(ledger));
        }

        ledger.update_bill(|bill| bill.status = BillStatus::Closed);
        let totals = ComputationEngine::refresh(ledger);
        info!(
            bill_id = ledger.bill().id,
            settled = settling_payment.is_some(),
            "bill closed"
        );
        Ok(MarkPaidOutcome {
            settling_payment,
            totals,
        })
    }

    /// Change owed for `cash` handed over against the current balance.
    pub fn give_change(totals: &BillTotals, cash: Decimal) -> Result<Decimal, ValidationError> {
        if !totals.eligibility().can_give_change {
            return Err(ValidationError::NegativeBalance {
                balance: totals.balance,
            });
        }
        if cash <= Decimal::ZERO || cash < totals.balance {
            return Err(ValidationError::InsufficientCash {
                cash,
                balance: totals.balance,
            });
        }
        Ok(cash - totals.balance)
    }
}
