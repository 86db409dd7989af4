use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Participant, ResultEngine,
    participants::{self, normalize_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a new participant. Display names are unique after
    /// normalization (trim, NFC, lowercase).
    pub async fn new_participant(
        &self,
        display_name: &str,
        image_url: Option<String>,
    ) -> ResultEngine<Participant> {
        let participant = Participant::new(display_name, image_url)?;
        let normalized = normalize_name(&participant.display_name);

        with_tx!(self, |db_tx| {
            let existing = participants::Entity::find()
                .filter(participants::Column::NormalizedName.eq(normalized.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(participant.display_name.clone()));
            }

            participants::ActiveModel::from(&participant)
                .insert(&db_tx)
                .await?;
            Ok(participant)
        })
    }

    /// Return a [`Participant`] by id.
    pub async fn participant(&self, id: Uuid) -> ResultEngine<Participant> {
        let model = participants::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("participant not exists".to_string()))?;
        Participant::try_from(model)
    }

    /// Display-only convenience lookup; never used for balance arithmetic.
    pub async fn participant_by_name(&self, name: &str) -> ResultEngine<Participant> {
        let model = participants::Entity::find()
            .filter(participants::Column::NormalizedName.eq(normalize_name(name)))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("participant not exists".to_string()))?;
        Participant::try_from(model)
    }

    pub async fn list_participants(&self) -> ResultEngine<Vec<Participant>> {
        let models = participants::Entity::find()
            .order_by_asc(participants::Column::NormalizedName)
            .all(&self.database)
            .await?;
        models.into_iter().map(Participant::try_from).collect()
    }

    /// Ensures every id refers to a registered participant.
    pub(crate) async fn require_participants(&self, ids: &[Uuid]) -> ResultEngine<()> {
        for id in ids {
            participants::Entity::find_by_id(id.to_string())
                .one(&self.database)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("participant not exists".to_string()))?;
        }
        Ok(())
    }
}
