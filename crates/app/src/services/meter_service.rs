//! Meter service — use-cases for managing the meter registry.

use serde::Deserialize;
use wattlog_domain::error::{NotFoundError, WattlogError};
use wattlog_domain::id::MeterId;
use wattlog_domain::meter::Meter;
use wattlog_domain::time::Timestamp;

use crate::ports::MeterRepository;

/// Partial update of a meter; absent fields are left untouched.
///
/// An empty `location` or `device_id` clears the field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeterUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub device_id: Option<String>,
    pub active: Option<bool>,
}

impl MeterUpdate {
    fn apply(self, mut meter: Meter) -> Meter {
        if let Some(name) = self.name {
            meter.name = name;
        }
        if let Some(location) = self.location {
            meter.location = non_blank(location);
        }
        if let Some(device_id) = self.device_id {
            meter.device_id = non_blank(device_id);
        }
        if let Some(active) = self.active {
            meter.active = active;
        }
        meter
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Application service for meter CRUD operations.
pub struct MeterService<R> {
    repo: R,
}

impl<R: MeterRepository> MeterService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Register a new meter after validating domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(skip(self, meter), fields(meter_name = %meter.name))]
    pub async fn register_meter(&self, meter: Meter) -> Result<Meter, WattlogError> {
        meter.validate()?;
        self.repo.create(meter).await
    }

    /// Look up a meter by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::NotFound`] when no meter with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_meter(&self, id: MeterId) -> Result<Meter, WattlogError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Meter",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all meters ordered by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_meters(&self) -> Result<Vec<Meter>, WattlogError> {
        self.repo.get_all().await
    }

    /// List the meters collection runs will visit.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_active_meters(&self) -> Result<Vec<Meter>, WattlogError> {
        self.repo.get_active().await
    }

    /// Apply a partial update to an existing meter.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::NotFound`] for an unknown id,
    /// [`WattlogError::Validation`] if the result breaks invariants, or a
    /// storage error from the repository.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_meter(
        &self,
        id: MeterId,
        update: MeterUpdate,
    ) -> Result<Meter, WattlogError> {
        let meter = update.apply(self.get_meter(id).await?);
        meter.validate()?;
        self.repo.update(meter).await
    }

    /// Delete a meter together with its readings.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::NotFound`] for an unknown id, or a storage
    /// error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_meter(&self, id: MeterId) -> Result<(), WattlogError> {
        self.get_meter(id).await?;
        self.repo.delete(id).await
    }

    /// Record that data was just received for a meter.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn touch_last_reading(&self, id: MeterId, at: Timestamp) -> Result<(), WattlogError> {
        self.repo.touch_last_reading(id, at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::InMemoryMeterRepo;
    use wattlog_domain::error::ValidationError;
    use wattlog_domain::time::now;

    fn make_service() -> MeterService<InMemoryMeterRepo> {
        MeterService::new(InMemoryMeterRepo::default())
    }

    fn valid_meter() -> Meter {
        Meter::builder()
            .name("Main panel")
            .location("Garage")
            .device_id("bf1234")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_register_meter_when_valid() {
        let svc = make_service();
        let meter = valid_meter();
        let id = meter.id;

        let created = svc.register_meter(meter).await.unwrap();

        assert_eq!(created.id, id);
        assert_eq!(svc.get_meter(id).await.unwrap().name, "Main panel");
    }

    #[tokio::test]
    async fn should_reject_meter_with_blank_name() {
        let svc = make_service();
        let mut meter = valid_meter();
        meter.name = "  ".to_owned();

        let err = svc.register_meter(meter).await.unwrap_err();

        assert!(matches!(
            err,
            WattlogError::Validation(ValidationError::EmptyName)
        ));
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_meter() {
        let svc = make_service();

        let err = svc.get_meter(MeterId::new()).await.unwrap_err();

        assert!(matches!(err, WattlogError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_list_active_meters_only() {
        let svc = make_service();
        svc.register_meter(valid_meter()).await.unwrap();
        let idle = Meter::builder().name("Idle").active(false).build().unwrap();
        svc.register_meter(idle).await.unwrap();

        assert_eq!(svc.list_meters().await.unwrap().len(), 2);
        let active = svc.list_active_meters().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Main panel");
    }

    #[tokio::test]
    async fn should_apply_partial_update() {
        let svc = make_service();
        let meter = svc.register_meter(valid_meter()).await.unwrap();

        let updated = svc
            .update_meter(
                meter.id,
                MeterUpdate {
                    name: Some("Kitchen".to_owned()),
                    location: Some(String::new()),
                    active: Some(false),
                    ..MeterUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Kitchen");
        assert_eq!(updated.location, None);
        assert_eq!(updated.device_id.as_deref(), Some("bf1234"));
        assert!(!updated.active);
        assert_eq!(updated.created_at, meter.created_at);
    }

    #[tokio::test]
    async fn should_reject_update_that_blanks_name() {
        let svc = make_service();
        let meter = svc.register_meter(valid_meter()).await.unwrap();

        let err = svc
            .update_meter(
                meter.id,
                MeterUpdate {
                    name: Some(String::new()),
                    ..MeterUpdate::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WattlogError::Validation(_)));
        assert_eq!(svc.get_meter(meter.id).await.unwrap().name, "Main panel");
    }

    #[tokio::test]
    async fn should_delete_existing_meter() {
        let svc = make_service();
        let meter = svc.register_meter(valid_meter()).await.unwrap();

        svc.delete_meter(meter.id).await.unwrap();

        assert!(matches!(
            svc.get_meter(meter.id).await,
            Err(WattlogError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete_meter(meter.id).await,
            Err(WattlogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_touch_last_reading() {
        let svc = make_service();
        let meter = svc.register_meter(valid_meter()).await.unwrap();
        let at = now();

        svc.touch_last_reading(meter.id, at).await.unwrap();

        assert_eq!(svc.get_meter(meter.id).await.unwrap().last_reading_at, Some(at));
    }
}
