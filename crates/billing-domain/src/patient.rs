use serde::{Deserialize, Serialize};

use crate::common::*;

/// Patient reference as supplied by the patient directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub id: RecordId,
    pub name: String,
}

impl Patient {
    pub fn new(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Identifiable for Patient {
    fn id(&self) -> RecordId {
        self.id
    }
}
