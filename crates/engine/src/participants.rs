//! Participant primitives.
//!
//! A `Participant` is any party that can owe or be owed money: an expense
//! payer, a splitter, or a settlement counterparty. The directory is used to
//! enrich display only; balance arithmetic works on ids.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub display_name: String,
    pub image_url: Option<String>,
}

impl Participant {
    pub fn new(display_name: &str, image_url: Option<String>) -> ResultEngine<Self> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(EngineError::InvalidId(
                "participant name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            image_url,
        })
    }
}

/// Canonical form used for uniqueness and name lookup (NFC, lowercase).
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().nfc().collect::<String>().to_lowercase()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub display_name: String,
    pub normalized_name: String,
    pub image_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Participant> for ActiveModel {
    fn from(participant: &Participant) -> Self {
        Self {
            id: ActiveValue::Set(participant.id.to_string()),
            display_name: ActiveValue::Set(participant.display_name.clone()),
            normalized_name: ActiveValue::Set(normalize_name(&participant.display_name)),
            image_url: ActiveValue::Set(participant.image_url.clone()),
        }
    }
}

impl TryFrom<Model> for Participant {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid participant id".to_string()))?,
            display_name: model.display_name,
            image_url: model.image_url,
        })
    }
}
