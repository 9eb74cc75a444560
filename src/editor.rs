//! Session facade that owns the bill being edited and routes every operator command
//! through the mutation rules before recomputing totals.

use billing_core::{
    reconcile_references, BillCommitted, BillLedger, BillLifecycle, BillTotals, CommitListener,
    CommitMode, ComputationEngine, CoreError, Eligibility, MarkPaidOutcome, MutationGuard,
    OtherChargeInput, PatientService, PaymentOutcome, PriceCatalog, ProposedPayment, ReceiptKind,
    RepriceReport,
};
use billing_domain::{Bill, BillItem, BillPayment, Displayable, PriceGroup, PriceKey, RecordId};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    errors::BillingError,
    listeners::CommitListeners,
    session::{EditorServices, SessionSettings},
};

/// Catalog snapshot of the session. Custom lines stay available when the catalog is not.
#[derive(Debug, Clone)]
pub enum CatalogState {
    Loaded(PriceCatalog),
    Unavailable(String),
}

impl CatalogState {
    pub fn catalog(&self) -> Option<&PriceCatalog> {
        match self {
            CatalogState::Loaded(catalog) => Some(catalog),
            CatalogState::Unavailable(_) => None,
        }
    }

    fn require(&self) -> Result<&PriceCatalog, CoreError> {
        match self {
            CatalogState::Loaded(catalog) => Ok(catalog),
            CatalogState::Unavailable(reason) => Err(CoreError::CatalogUnavailable(reason.clone())),
        }
    }
}

/// Result of opening a bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenReport {
    pub bill_id: RecordId,
    pub inserting: bool,
    /// References repaired on open and catalog problems.
    pub warnings: Vec<String>,
    pub catalog_available: bool,
}

/// Result of a confirmed save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub bill_id: RecordId,
    pub mode: CommitMode,
    pub receipts_printed: Vec<ReceiptKind>,
    /// Printing problems; the bill is saved regardless.
    pub print_failures: Vec<String>,
}

struct OpenBill {
    ledger: BillLedger,
    closed_at_open: bool,
}

/// Facade coordinating one bill ledger, the catalog snapshot and the external collaborators.
pub struct BillEditor {
    services: EditorServices,
    settings: SessionSettings,
    listeners: CommitListeners,
    session_id: Uuid,
    catalog: CatalogState,
    current: Option<OpenBill>,
}

impl BillEditor {
    pub fn new(services: EditorServices, settings: SessionSettings) -> Self {
        Self {
            services,
            settings,
            listeners: CommitListeners::new(),
            session_id: Uuid::new_v4(),
            catalog: CatalogState::Unavailable("catalog not loaded".into()),
            current: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn subscribe(&mut self, listener: Box<dyn CommitListener>) {
        self.listeners.subscribe(listener);
    }

    pub fn catalog_state(&self) -> &CatalogState {
        &self.catalog
    }

    pub fn catalog(&self) -> Option<&PriceCatalog> {
        self.catalog.catalog()
    }

    pub fn ledger(&self) -> Option<&BillLedger> {
        self.current.as_ref().map(|open| &open.ledger)
    }

    pub fn bill(&self) -> Option<&Bill> {
        self.ledger().map(BillLedger::bill)
    }

    /// Starts a new bill on the remembered last bill day at the current time, or now.
    pub fn open_new(&mut self) -> Result<OpenReport, BillingError> {
        let mut warnings = self.refresh_catalog();
        let now = self.services.clock.now();
        let date = self
            .settings
            .last_bill_date
            .map_or(now, |remembered| remembered.date().and_time(now.time()));
        let mut bill = Bill::new(date, self.settings.user.clone());
        match self.catalog.catalog().and_then(PriceCatalog::default_list) {
            Some(list) => bill.assign_price_list(list),
            None => warnings.push("no price list available; only custom items can be added".into()),
        }

        let mut ledger = BillLedger::new(bill);
        ComputationEngine::refresh(&mut ledger);
        info!(session = %self.session_id, %date, "new bill opened");
        self.current = Some(OpenBill {
            ledger,
            closed_at_open: false,
        });
        Ok(self.open_report(warnings))
    }

    /// Loads a persisted bill for editing. Rows loaded here are protected for the session.
    pub fn open_existing(&mut self, id: RecordId) -> Result<OpenReport, BillingError> {
        let mut warnings = self.refresh_catalog();
        let persisted = self.services.persistence.load_bill(id)?;
        let mut ledger = BillLedger::load(persisted.bill, persisted.items, persisted.payments);
        warnings.extend(reconcile_references(
            &mut ledger,
            self.catalog.catalog(),
            self.services.patients.as_ref(),
        )?);
        ComputationEngine::refresh(&mut ledger);
        let closed_at_open = ledger.bill().is_closed();
        info!(
            session = %self.session_id,
            bill = %ledger.bill().display_label(),
            items = ledger.items().len(),
            payments = ledger.payments().len(),
            "bill opened for editing"
        );
        self.current = Some(OpenBill {
            ledger,
            closed_at_open,
        });
        Ok(self.open_report(warnings))
    }

    pub fn totals(&self) -> Result<BillTotals, BillingError> {
        Ok(ComputationEngine::compute(&self.open()?.ledger))
    }

    /// Balance-based eligibility; an unsaved bill can never be marked paid.
    pub fn eligibility(&self) -> Result<Eligibility, BillingError> {
        let ledger = &self.open()?.ledger;
        let mut eligibility = ComputationEngine::compute(ledger).eligibility();
        eligibility.can_mark_paid &= !ledger.is_inserting();
        Ok(eligibility)
    }

    pub fn is_modified(&self) -> bool {
        self.ledger().map(BillLedger::is_modified).unwrap_or(false)
    }

    /// Adds a `MED`/`OPE`/`EXA` line from the bill's price list.
    pub fn add_catalog_item(
        &mut self,
        key: &PriceKey,
        quantity: Option<&str>,
    ) -> Result<usize, BillingError> {
        if key.group == PriceGroup::Other {
            return Err(CoreError::InvalidOperation(format!(
                "{key} is an other charge; add it through add_other"
            ))
            .into());
        }
        let (catalog, list_id) = self.active_list()?;
        let item = MutationGuard::catalog_item(catalog, list_id, key, quantity)?;
        self.push_item(item)
    }

    /// Adds an `OTH` line. `Ok(None)` means the operator cancelled a required prompt.
    pub fn add_other(
        &mut self,
        item_code: &str,
        input: &OtherChargeInput,
    ) -> Result<Option<usize>, BillingError> {
        let (catalog, list_id) = self.active_list()?;
        let item = MutationGuard::other_item(
            catalog,
            list_id,
            item_code,
            input,
            self.settings.currency_scale,
        )?;
        match item {
            Some(item) => self.push_item(item).map(Some),
            None => Ok(None),
        }
    }

    pub fn add_custom(&mut self, description: &str, amount: &str) -> Result<usize, BillingError> {
        let item = MutationGuard::custom_item(description, amount, self.settings.currency_scale)?;
        self.push_item(item)
    }

    pub fn remove_item(&mut self, index: usize) -> Result<BillItem, BillingError> {
        let today = self.services.clock.today();
        let ledger = self.ledger_mut()?;
        let removed = MutationGuard::remove_item(ledger, index, today)?;
        ComputationEngine::refresh(ledger);
        Ok(removed)
    }

    /// Records a payment. `date` is required only for bills dated in a past day.
    pub fn add_payment(
        &mut self,
        amount: &str,
        date: Option<NaiveDateTime>,
    ) -> Result<PaymentOutcome, BillingError> {
        let amount = billing_core::parse_amount(amount, self.settings.currency_scale)?;
        self.post_payment(amount, date)
    }

    /// Records a refund for the positive `amount` entered by the operator.
    pub fn add_refund(
        &mut self,
        amount: &str,
        date: Option<NaiveDateTime>,
    ) -> Result<PaymentOutcome, BillingError> {
        let amount = billing_core::parse_amount(amount, self.settings.currency_scale)?;
        self.post_payment(-amount, date)
    }

    pub fn remove_payment(&mut self, index: usize) -> Result<BillPayment, BillingError> {
        let ledger = self.ledger_mut()?;
        let removed = MutationGuard::remove_payment(ledger, index)?;
        ComputationEngine::refresh(ledger);
        Ok(removed)
    }

    pub fn switch_price_list(&mut self, list_id: RecordId) -> Result<RepriceReport, BillingError> {
        let catalog = self.catalog.require()?;
        let open = self.current.as_mut().ok_or(BillingError::NoBillOpen)?;
        let report = MutationGuard::switch_price_list(&mut open.ledger, catalog, list_id)?;
        ComputationEngine::refresh(&mut open.ledger);
        Ok(report)
    }

    /// Associates a directory patient and returns that patient's other pending bills.
    pub fn select_patient(&mut self, patient_id: RecordId) -> Result<Vec<RecordId>, BillingError> {
        let patient = self
            .services
            .patients
            .find_patient_by_id(patient_id)?
            .ok_or(CoreError::PatientNotFound(patient_id))?;
        let open = self.current.as_mut().ok_or(BillingError::NoBillOpen)?;
        Ok(PatientService::select(
            &mut open.ledger,
            &patient,
            self.services.patients.as_ref(),
            self.settings.allow_multiple_open_bills,
        )?)
    }

    pub fn clear_patient(&mut self) -> Result<(), BillingError> {
        PatientService::clear(self.ledger_mut()?);
        Ok(())
    }

    pub fn set_payer_name(&mut self, name: &str) -> Result<(), BillingError> {
        Ok(PatientService::set_payer_name(self.ledger_mut()?, name)?)
    }

    pub fn set_bill_date(&mut self, date: NaiveDateTime) -> Result<(), BillingError> {
        Ok(MutationGuard::set_bill_date(self.ledger_mut()?, date)?)
    }

    /// Closes the bill, settling a positive balance first.
    pub fn mark_paid(
        &mut self,
        date: Option<NaiveDateTime>,
    ) -> Result<MarkPaidOutcome, BillingError> {
        let now = self.services.clock.now();
        let user = self.settings.user.clone();
        let ledger = self.ledger_mut()?;
        Ok(BillLifecycle::mark_paid(ledger, now, date, &user)?)
    }

    /// Change owed for `cash`. Leaves the bill untouched.
    pub fn give_change(&self, cash: &str) -> Result<Decimal, BillingError> {
        let cash = billing_core::parse_amount(cash, self.settings.currency_scale)?;
        let totals = self.totals()?;
        Ok(BillLifecycle::give_change(&totals, cash)?)
    }

    /// Commits the bill. On failure the in-memory ledger is left exactly as it was.
    pub fn save(&mut self) -> Result<SaveOutcome, BillingError> {
        let open = self.current.as_mut().ok_or(BillingError::NoBillOpen)?;
        ComputationEngine::refresh(&mut open.ledger);
        let ledger = &open.ledger;
        let mode = if ledger.is_inserting() {
            CommitMode::Inserted
        } else {
            CommitMode::Updated
        };
        let had_new_payments = ledger.has_new_payments();
        let new_payments = ledger.new_payments().len();

        let result = match mode {
            CommitMode::Inserted => self.services.persistence.create_bill(
                ledger.bill(),
                ledger.items(),
                ledger.payments(),
            ),
            CommitMode::Updated => self.services.persistence.update_bill(
                ledger.bill(),
                ledger.items(),
                ledger.payments(),
            ),
        };
        let persisted = result.map_err(|err| {
            warn!(session = %self.session_id, error = %err, "bill save failed");
            err
        })?;

        let closed_now = persisted.bill.is_closed() && !open.closed_at_open;
        open.closed_at_open = persisted.bill.is_closed();
        open.ledger
            .mark_committed(persisted.bill, persisted.items, persisted.payments);
        let bill = open.ledger.bill().clone();
        self.settings.last_bill_date = Some(bill.date);
        info!(
            session = %self.session_id,
            bill_id = bill.id,
            ?mode,
            new_payments,
            "bill committed"
        );

        let event = BillCommitted {
            last_bill_date: bill.date,
            bill,
            mode,
            new_payments,
        };
        self.listeners.notify(&event);

        let (receipts_printed, print_failures) = self.print_after_save(had_new_payments, closed_now);
        Ok(SaveOutcome {
            bill_id: event.bill.id,
            mode,
            receipts_printed,
            print_failures,
        })
    }

    /// Prints the payments receipt of a bill that has already been saved.
    pub fn print_payment_receipt(&self) -> Result<(), BillingError> {
        let ledger = &self.open()?.ledger;
        if ledger.is_inserting() {
            return Err(CoreError::InvalidOperation("bill has not been saved yet".into()).into());
        }
        let printer = self
            .services
            .printer
            .as_ref()
            .ok_or_else(|| CoreError::InvalidOperation("no receipt printer configured".into()))?;
        printer.print_payments(ledger.bill(), ledger.payments())?;
        Ok(())
    }

    /// Drops the open bill without saving. Returns whether unsaved changes were lost.
    pub fn discard(&mut self) -> bool {
        let lost = self.is_modified();
        if let Some(open) = self.current.take() {
            debug!(bill_id = open.ledger.bill().id, lost, "bill discarded");
        }
        lost
    }

    fn open(&self) -> Result<&OpenBill, BillingError> {
        self.current.as_ref().ok_or(BillingError::NoBillOpen)
    }

    fn ledger_mut(&mut self) -> Result<&mut BillLedger, BillingError> {
        self.current
            .as_mut()
            .map(|open| &mut open.ledger)
            .ok_or(BillingError::NoBillOpen)
    }

    fn active_list(&self) -> Result<(&PriceCatalog, RecordId), BillingError> {
        let catalog = self.catalog.require()?;
        let list_id = self
            .open()?
            .ledger
            .bill()
            .price_list_id
            .ok_or_else(|| CoreError::InvalidOperation("bill has no price list".into()))?;
        Ok((catalog, list_id))
    }

    fn push_item(&mut self, item: BillItem) -> Result<usize, BillingError> {
        let today = self.services.clock.today();
        let ledger = self.ledger_mut()?;
        let index = MutationGuard::add_item(ledger, item, today)?;
        ComputationEngine::refresh(ledger);
        Ok(index)
    }

    fn post_payment(
        &mut self,
        amount: Decimal,
        date: Option<NaiveDateTime>,
    ) -> Result<PaymentOutcome, BillingError> {
        let now = self.services.clock.now();
        let user = self.settings.user.clone();
        let ledger = self.ledger_mut()?;
        if amount.is_zero() {
            return Ok(MutationGuard::post_payment(
                ledger,
                ProposedPayment::new(now, amount, user),
                now,
            )?);
        }
        let date = MutationGuard::resolve_payment_date(ledger.bill(), now, date)?;
        let outcome =
            MutationGuard::post_payment(ledger, ProposedPayment::new(date, amount, user), now)?;
        ComputationEngine::refresh(ledger);
        Ok(outcome)
    }

    /// Pulls a fresh catalog snapshot; failure is kept as state, not raised.
    fn refresh_catalog(&mut self) -> Vec<String> {
        match PriceCatalog::load(self.services.catalog.as_ref()) {
            Ok(catalog) => {
                self.catalog = CatalogState::Loaded(catalog);
                Vec::new()
            }
            Err(err) => {
                let reason = err.to_string();
                self.catalog = CatalogState::Unavailable(reason.clone());
                vec![reason]
            }
        }
    }

    fn open_report(&self, warnings: Vec<String>) -> OpenReport {
        let (bill_id, inserting) = self
            .ledger()
            .map(|ledger| (ledger.bill().id, ledger.is_inserting()))
            .unwrap_or_default();
        OpenReport {
            bill_id,
            inserting,
            warnings,
            catalog_available: self.catalog.catalog().is_some(),
        }
    }

    fn print_after_save(
        &self,
        had_new_payments: bool,
        closed_now: bool,
    ) -> (Vec<ReceiptKind>, Vec<String>) {
        let due = self
            .settings
            .receipts
            .receipts_after_save(had_new_payments, closed_now);
        let mut printed = Vec::new();
        let mut failures = Vec::new();
        if due.is_empty() {
            return (printed, failures);
        }
        let Some(printer) = self.services.printer.as_ref() else {
            debug!(?due, "no receipt printer configured");
            return (printed, failures);
        };
        let Some(ledger) = self.ledger() else {
            return (printed, failures);
        };
        for kind in due {
            let result = match kind {
                ReceiptKind::Payments => printer.print_payments(ledger.bill(), ledger.payments()),
                ReceiptKind::PaidBill => printer.print_bill(ledger.bill()),
            };
            match result {
                Ok(()) => printed.push(kind),
                Err(err) => {
                    warn!(?kind, error = %err, "receipt printing failed");
                    failures.push(err.to_string());
                }
            }
        }
        (printed, failures)
    }
}
