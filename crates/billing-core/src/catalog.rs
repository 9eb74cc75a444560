//! Read-only price catalog snapshot and the contract of the service that supplies it.

use std::collections::HashMap;

use billing_domain::{Price, PriceGroup, PriceKey, PriceList, PricesOthers, RecordId};
use tracing::{debug, warn};

use crate::{error::PriceNotFound, CoreError};

/// External price catalog service. Reads are expected to be idempotent and side-effect free.
pub trait PriceCatalogSource: Send + Sync {
    fn get_prices(&self) -> Result<Vec<Price>, CoreError>;
    fn get_lists(&self) -> Result<Vec<PriceList>, CoreError>;
    fn get_others(&self) -> Result<Vec<PricesOthers>, CoreError>;
}

/// Snapshot of the catalog taken once per editing session.
#[derive(Debug, Clone, Default)]
pub struct PriceCatalog {
    lists: Vec<PriceList>,
    prices: Vec<Price>,
    index: HashMap<(RecordId, PriceKey), usize>,
    others: HashMap<RecordId, PricesOthers>,
}

impl PriceCatalog {
    pub fn new(lists: Vec<PriceList>, prices: Vec<Price>, others: Vec<PricesOthers>) -> Self {
        let index = prices
            .iter()
            .enumerate()
            .map(|(position, price)| ((price.list_id, price.key()), position))
            .collect();
        let others = others.into_iter().map(|other| (other.id, other)).collect();
        Self {
            lists,
            prices,
            index,
            others,
        }
    }

    /// Pulls a fresh snapshot from `source`.
    ///
    /// Any collaborator failure is reported as [`CoreError::CatalogUnavailable`].
    pub fn load(source: &dyn PriceCatalogSource) -> Result<Self, CoreError> {
        let fetch = || -> Result<Self, CoreError> {
            let lists = source.get_lists()?;
            let prices = source.get_prices()?;
            let others = source.get_others()?;
            Ok(Self::new(lists, prices, others))
        };
        match fetch() {
            Ok(catalog) => {
                debug!(
                    lists = catalog.lists.len(),
                    prices = catalog.prices.len(),
                    others = catalog.others.len(),
                    "price catalog loaded"
                );
                Ok(catalog)
            }
            Err(CoreError::CatalogUnavailable(reason)) => {
                warn!(%reason, "price catalog unavailable");
                Err(CoreError::CatalogUnavailable(reason))
            }
            Err(err) => {
                warn!(error = %err, "price catalog unavailable");
                Err(CoreError::CatalogUnavailable(err.to_string()))
            }
        }
    }

    pub fn lists(&self) -> &[PriceList] {
        &self.lists
    }

    pub fn list(&self, id: RecordId) -> Option<&PriceList> {
        self.lists.iter().find(|list| list.id == id)
    }

    /// The list used when a bill names none, or names one that no longer exists.
    pub fn default_list(&self) -> Option<&PriceList> {
        self.lists.first()
    }

    /// Prices of `list_id` in catalog order.
    pub fn prices_for_list(&self, list_id: RecordId) -> Vec<&Price> {
        self.prices
            .iter()
            .filter(|price| price.list_id == list_id)
            .collect()
    }

    pub fn prices_in_group(&self, list_id: RecordId, group: PriceGroup) -> Vec<&Price> {
        self.prices
            .iter()
            .filter(|price| price.list_id == list_id && price.group == group)
            .collect()
    }

    pub fn lookup(&self, list_id: RecordId, key: &PriceKey) -> Result<&Price, PriceNotFound> {
        self.index
            .get(&(list_id, key.clone()))
            .map(|position| &self.prices[*position])
            .ok_or_else(|| PriceNotFound {
                list_id,
                key: key.clone(),
                line: None,
            })
    }

    pub fn others_by_code(&self) -> &HashMap<RecordId, PricesOthers> {
        &self.others
    }

    /// Resolves the charging rules of an `OTH` price. The item code holds the definition id.
    pub fn other_for(&self, price: &Price) -> Option<&PricesOthers> {
        if price.group != PriceGroup::Other {
            return None;
        }
        let id = price.item_code.trim().parse::<RecordId>().ok()?;
        self.others.get(&id)
    }
}
