//! Rules deciding which ledger mutations are allowed: payment dating, protected rows,
//! item entry, period lock, and price-list re-pricing.

use std::{iter, str::FromStr};

use billing_domain::{Bill, BillItem, BillPayment, PriceGroup, PriceKey, RecordId};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::{
    catalog::PriceCatalog,
    computation::ComputationEngine,
    error::{PriceNotFound, ValidationError},
    ledger::BillLedger,
    CoreError,
};

/// A payment as entered by the operator, before any rule has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedPayment {
    pub date: NaiveDateTime,
    pub amount: Decimal,
    pub user: String,
}

impl ProposedPayment {
    pub fn new(date: NaiveDateTime, amount: Decimal, user: impl Into<String>) -> Self {
        Self {
            date,
            amount,
            user: user.into(),
        }
    }

    /// Runs the date rules against `ledger`. First failing rule wins.
    pub fn validate(
        self,
        ledger: &BillLedger,
        now: NaiveDateTime,
    ) -> Result<ValidatedPayment, ValidationError> {
        MutationGuard::validate_payment_date(ledger, self.date, now)?;
        Ok(ValidatedPayment(BillPayment::new(
            self.date,
            self.amount,
            self.user,
        )))
    }
}

/// A payment that passed every date rule and may be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayment(BillPayment);

impl ValidatedPayment {
    pub fn payment(&self) -> &BillPayment {
        &self.0
    }

    pub fn append(self, ledger: &mut BillLedger) -> usize {
        ledger.append_payment(self.0)
    }
}

/// Result of posting a payment that was not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Appended { index: usize },
    /// Zero amounts are dropped before any date rule runs.
    IgnoredZeroAmount,
}

/// Operator answers collected while adding an `OTH` catalog charge.
///
/// `None` means the corresponding prompt was cancelled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtherChargeInput {
    pub price: Option<String>,
    pub days: Option<String>,
}

/// Outcome of a price-list switch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepriceReport {
    pub list_id: RecordId,
    pub repriced: usize,
    pub custom_untouched: usize,
    /// Catalog-bound lines whose key is absent from the new list; they keep their prior values.
    pub missing: Vec<PriceNotFound>,
}

impl RepriceReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct MutationGuard;

impl MutationGuard {
    pub fn validate_payment_date(
        ledger: &BillLedger,
        date: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<(), ValidationError> {
        let bill_date = ledger.bill().date;
        let last = ledger.latest_payment_date().unwrap_or(bill_date);
        if date < bill_date {
            return Err(ValidationError::PaymentBeforeBillDate { date, bill_date });
        }
        if date < last {
            return Err(ValidationError::PaymentBeforeLastPayment { date, last });
        }
        if date > now {
            return Err(ValidationError::FuturePayment { date, now });
        }
        Ok(())
    }

    /// Drives a payment through `PROPOSED -> VALIDATED -> APPENDED`, or rejects it.
    pub fn post_payment(
        ledger: &mut BillLedger,
        proposed: ProposedPayment,
        now: NaiveDateTime,
    ) -> Result<PaymentOutcome, CoreError> {
        if proposed.amount.is_zero() {
            debug!("zero-amount payment ignored");
            return Ok(PaymentOutcome::IgnoredZeroAmount);
        }
        let validated = proposed
            .validate(ledger, now)
            .and_then(|validated| {
                Self::ensure_totals_in_range(
                    ledger.items(),
                    ledger.payments().iter().chain(iter::once(validated.payment())),
                )?;
                Ok(validated)
            })
            .map_err(|err| {
                warn!(reason = err.reason_code(), "payment rejected");
                err
            })?;
        let index = validated.append(ledger);
        Ok(PaymentOutcome::Appended { index })
    }

    /// Picks the payment timestamp: now for a bill dated today, the operator's date otherwise.
    pub fn resolve_payment_date(
        bill: &Bill,
        now: NaiveDateTime,
        supplied: Option<NaiveDateTime>,
    ) -> Result<NaiveDateTime, ValidationError> {
        if bill.date.date() >= now.date() {
            return Ok(now);
        }
        supplied.ok_or(ValidationError::PaymentDateRequired)
    }

    /// Existing bills from an earlier month no longer accept item changes.
    pub fn ensure_items_editable(
        ledger: &BillLedger,
        today: NaiveDate,
    ) -> Result<(), ValidationError> {
        if ledger.is_inserting() {
            return Ok(());
        }
        let bill_date = ledger.bill().date.date();
        if (bill_date.year(), bill_date.month()) < (today.year(), today.month()) {
            return Err(ValidationError::ItemsLocked {
                bill_month: bill_date.format("%Y-%m").to_string(),
            });
        }
        Ok(())
    }

    pub fn add_item(
        ledger: &mut BillLedger,
        item: BillItem,
        today: NaiveDate,
    ) -> Result<usize, CoreError> {
        Self::ensure_items_editable(ledger, today)?;
        Self::ensure_totals_in_range(
            ledger.items().iter().chain(iter::once(&item)),
            ledger.payments(),
        )
        .map_err(|err| {
            warn!(reason = err.reason_code(), "item refused");
            err
        })?;
        Ok(ledger.append_item(item))
    }

    /// Refuses rows whose totals cannot be computed exactly.
    pub fn ensure_totals_in_range<'a, I, P>(items: I, payments: P) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = &'a BillItem>,
        P: IntoIterator<Item = &'a BillPayment>,
    {
        ComputationEngine::checked_totals(items, payments)
            .map(|_| ())
            .ok_or(ValidationError::TotalsOutOfRange)
    }

    pub fn remove_item(
        ledger: &mut BillLedger,
        index: usize,
        today: NaiveDate,
    ) -> Result<BillItem, CoreError> {
        Self::ensure_items_editable(ledger, today)?;
        ledger.remove_item(index).map_err(|err| {
            warn!(index, reason = err.reason_code(), "item removal refused");
            err
        })
    }

    pub fn remove_payment(ledger: &mut BillLedger, index: usize) -> Result<BillPayment, CoreError> {
        ledger.remove_payment(index).map_err(|err| {
            warn!(index, reason = err.reason_code(), "payment removal refused");
            err
        })
    }

    /// Moves the invoice date. It may not pass the earliest recorded payment.
    pub fn set_bill_date(ledger: &mut BillLedger, date: NaiveDateTime) -> Result<(), CoreError> {
        if let Some(first_payment) = ledger.earliest_payment_date() {
            if date > first_payment {
                return Err(ValidationError::BillDateAfterPayments {
                    date,
                    first_payment,
                }
                .into());
            }
        }
        ledger.update_bill(|bill| bill.date = date);
        Ok(())
    }

    /// Re-resolves every catalog-bound line against `list_id` and points the bill at that list.
    ///
    /// Lines whose key is missing keep their last-known description and amount and are listed
    /// in the report. Custom lines are never touched.
    pub fn switch_price_list(
        ledger: &mut BillLedger,
        catalog: &PriceCatalog,
        list_id: RecordId,
    ) -> Result<RepriceReport, CoreError> {
        let list = catalog
            .list(list_id)
            .ok_or(CoreError::PriceListNotFound(list_id))?
            .clone();

        let mut report = RepriceReport {
            list_id,
            ..RepriceReport::default()
        };
        let mut replacements = Vec::new();
        for (index, item) in ledger.items().iter().enumerate() {
            let key = match (&item.price_key, item.from_catalog) {
                (Some(key), true) => key,
                _ => {
                    report.custom_untouched += 1;
                    continue;
                }
            };
            match catalog.lookup(list_id, key) {
                Ok(price) => replacements.push((index, item.repriced(price))),
                Err(mut missing) => {
                    missing.line = Some(index);
                    warn!(%missing, "catalog line kept at previous price");
                    report.missing.push(missing);
                }
            }
        }

        let candidate = ledger.items().iter().enumerate().map(|(index, item)| {
            replacements
                .iter()
                .find(|(replaced, _)| *replaced == index)
                .map_or(item, |(_, repriced)| repriced)
        });
        Self::ensure_totals_in_range(candidate, ledger.payments())?;

        report.repriced = replacements.len();
        for (index, item) in replacements {
            ledger.replace_item(index, item)?;
        }
        ledger.update_bill(|bill| bill.assign_price_list(&list));
        info!(
            list_id,
            list = %list.name,
            repriced = report.repriced,
            missing = report.missing.len(),
            "price list switched"
        );
        Ok(report)
    }

    /// Builds a `MED`/`OPE`/`EXA` line from the active list.
    ///
    /// `quantity` is the operator's answer; `None` means the default of one.
    pub fn catalog_item(
        catalog: &PriceCatalog,
        list_id: RecordId,
        key: &PriceKey,
        quantity: Option<&str>,
    ) -> Result<BillItem, CoreError> {
        let price = catalog.lookup(list_id, key)?;
        let quantity = match quantity {
            Some(raw) => parse_quantity(raw)?,
            None => 1,
        };
        Ok(BillItem::from_price(price, quantity))
    }

    /// Builds an `OTH` line honouring its undefined/discharge/daily rules.
    ///
    /// Returns `Ok(None)` when the operator cancelled a required prompt.
    pub fn other_item(
        catalog: &PriceCatalog,
        list_id: RecordId,
        item_code: &str,
        input: &OtherChargeInput,
        scale: u32,
    ) -> Result<Option<BillItem>, CoreError> {
        let key = PriceKey::new(PriceGroup::Other, item_code);
        let price = catalog.lookup(list_id, &key)?;
        let rules = catalog.other_for(price).ok_or_else(|| {
            CoreError::InvalidOperation(format!("no charge definition for {key}"))
        })?;

        let mut item = BillItem::from_price(price, 1);
        if rules.undefined {
            let Some(raw) = input.price.as_deref() else {
                debug!(%key, "undefined price prompt cancelled");
                return Ok(None);
            };
            item.unit_amount = parse_amount(raw, scale)?;
            item.from_catalog = false;
        }
        if rules.discharge {
            item.unit_amount = -item.unit_amount;
        }
        if rules.daily {
            match input.days.as_deref().map(str::trim) {
                None | Some("") => {
                    debug!(%key, "day count prompt cancelled");
                    return Ok(None);
                }
                Some(raw) => item.quantity = parse_quantity(raw)?,
            }
        }
        Ok(Some(item))
    }

    pub fn custom_item(
        description: &str,
        amount: &str,
        scale: u32,
    ) -> Result<BillItem, ValidationError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        Ok(BillItem::custom(description, parse_amount(amount, scale)?))
    }
}

/// Parses an operator-entered amount as an exact decimal at the currency scale.
pub fn parse_amount(raw: &str, scale: u32) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim();
    let mut value =
        Decimal::from_str(trimmed).map_err(|_| ValidationError::InvalidAmount(raw.to_string()))?;
    if value.scale() > scale {
        return Err(ValidationError::AmountScale {
            value: trimmed.to_string(),
            scale,
        });
    }
    value.rescale(scale);
    if value.scale() != scale {
        return Err(ValidationError::AmountOutOfRange {
            value: trimmed.to_string(),
            scale,
        });
    }
    Ok(value)
}

/// Parses a positive integer quantity.
pub fn parse_quantity(raw: &str) -> Result<u32, ValidationError> {
    match raw.trim().parse::<u32>() {
        Ok(quantity) if quantity >= 1 => Ok(quantity),
        _ => Err(ValidationError::InvalidQuantity(raw.to_string())),
    }
}
