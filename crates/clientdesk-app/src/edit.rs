// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{ClientField, ClientId, ClientPatch, ClientRecord, RecordError, parse_birth_date};

/// Raw text typed into the fields the user touched. Untouched fields render
/// from the committed record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOverlay {
    values: BTreeMap<ClientField, String>,
}

impl FieldOverlay {
    pub fn set(&mut self, field: ClientField, value: &str) {
        self.values.insert(field, value.to_owned());
    }

    pub fn get(&self, field: ClientField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fields(&self) -> Vec<ClientField> {
        self.values.keys().copied().collect()
    }

    /// Converts the overlay to a typed patch. Blank values and malformed
    /// dates are rejected.
    pub fn to_patch(&self) -> Result<ClientPatch, RecordError> {
        let mut patch = ClientPatch::default();
        for (field, raw) in &self.values {
            if raw.trim().is_empty() {
                return Err(RecordError::validation(format!(
                    "{} is required -- enter a value or cancel the edit",
                    field.label()
                )));
            }
            match field {
                ClientField::LicenseNumber => patch.license_number = Some(raw.clone()),
                ClientField::Phone => patch.phone = Some(raw.clone()),
                ClientField::Address => patch.address = Some(raw.clone()),
                ClientField::BirthDate => patch.birth_date = Some(parse_birth_date(raw)?),
            }
        }
        Ok(patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Closed,
    Editing {
        target: ClientId,
        draft: FieldOverlay,
        error: Option<String>,
    },
    /// A save for `target` is in flight.
    Saving {
        target: ClientId,
        draft: FieldOverlay,
    },
}

/// Draft thrown away when another row was put into edit mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedDraft {
    pub target: ClientId,
    pub draft: FieldOverlay,
}

/// Inline edit of at most one table row.
///
/// Opening a row while another one has unsaved changes discards those
/// changes and hands them back to the caller, which must report the loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    state: EditState,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    pub const fn new() -> Self {
        Self {
            state: EditState::Closed,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn target(&self) -> Option<ClientId> {
        match &self.state {
            EditState::Closed => None,
            EditState::Editing { target, .. } | EditState::Saving { target, .. } => Some(*target),
        }
    }

    pub fn draft(&self) -> Option<&FieldOverlay> {
        match &self.state {
            EditState::Closed => None,
            EditState::Editing { draft, .. } | EditState::Saving { draft, .. } => Some(draft),
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            EditState::Editing { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, EditState::Closed)
    }

    pub fn is_saving(&self, id: ClientId) -> bool {
        matches!(self.state, EditState::Saving { target, .. } if target == id)
    }

    pub fn begin(&mut self, id: ClientId) -> Result<Option<DiscardedDraft>, RecordError> {
        let previous = std::mem::replace(&mut self.state, EditState::Closed);
        let discarded = match previous {
            EditState::Saving { target, draft } => {
                self.state = EditState::Saving { target, draft };
                return Err(RecordError::Busy(target));
            }
            EditState::Editing { target, draft, error } if target == id => {
                self.state = EditState::Editing { target, draft, error };
                return Ok(None);
            }
            EditState::Editing { target, draft, .. } if !draft.is_empty() => {
                warn!(
                    discarded = target.get(),
                    next = id.get(),
                    "discarding unsaved inline edit"
                );
                Some(DiscardedDraft { target, draft })
            }
            EditState::Editing { .. } | EditState::Closed => None,
        };
        self.state = EditState::Editing {
            target: id,
            draft: FieldOverlay::default(),
            error: None,
        };
        Ok(discarded)
    }

    pub fn set_field(&mut self, field: ClientField, value: &str) -> Result<(), RecordError> {
        match &mut self.state {
            EditState::Editing { draft, .. } => {
                draft.set(field, value);
                Ok(())
            }
            EditState::Saving { target, .. } => Err(RecordError::Busy(*target)),
            EditState::Closed => Err(RecordError::validation(
                "no client is being edited -- start with `edit <id>`",
            )),
        }
    }

    /// Value to render for `field`: the draft if touched, else the record.
    pub fn display_value(&self, field: ClientField, record: &ClientRecord) -> String {
        if self.target() == Some(record.id)
            && let Some(value) = self.draft().and_then(|draft| draft.get(field))
        {
            return value.to_owned();
        }
        record.field_value(field)
    }

    pub fn cancel(&mut self) -> Result<bool, RecordError> {
        match &self.state {
            EditState::Closed => Ok(false),
            EditState::Saving { target, .. } => Err(RecordError::Busy(*target)),
            EditState::Editing { .. } => {
                self.state = EditState::Closed;
                Ok(true)
            }
        }
    }

    /// Moves to `Saving` and returns the changed fields to send.
    ///
    /// Returns `None` and closes when nothing differs from `record`.
    pub fn start_save(
        &mut self,
        record: &ClientRecord,
    ) -> Result<Option<(ClientId, ClientPatch)>, RecordError> {
        let EditState::Editing { target, draft, error } = &mut self.state else {
            return match &self.state {
                EditState::Saving { target, .. } => Err(RecordError::Busy(*target)),
                _ => Err(RecordError::validation(
                    "no client is being edited -- start with `edit <id>`",
                )),
            };
        };
        if *target != record.id {
            return Err(RecordError::NotFound(*target));
        }

        let patch = match draft.to_patch() {
            Ok(patch) => patch.changes_from(record),
            Err(failure) => {
                *error = Some(failure.to_string());
                return Err(failure);
            }
        };

        let target = *target;
        if patch.is_empty() {
            debug!(id = target.get(), "inline edit closed without changes");
            self.state = EditState::Closed;
            return Ok(None);
        }

        let draft = std::mem::take(draft);
        self.state = EditState::Saving { target, draft };
        Ok(Some((target, patch)))
    }

    /// Applies the outcome of the in-flight save.
    ///
    /// Success closes the session. `NotFound` for the target also closes it,
    /// since the row is gone. Any other failure returns to `Editing` with the
    /// draft untouched and the message kept for display.
    pub fn finish_save(&mut self, result: &Result<ClientRecord, RecordError>) {
        let (target, draft) = match std::mem::replace(&mut self.state, EditState::Closed) {
            EditState::Saving { target, draft } => (target, draft),
            other => {
                warn!("save result arrived with no save in flight");
                self.state = other;
                return;
            }
        };
        match result {
            Ok(_) => {}
            Err(RecordError::NotFound(id)) if *id == target => {
                warn!(id = target.get(), "edited client disappeared during save");
            }
            Err(failure) => {
                self.state = EditState::Editing {
                    target,
                    draft,
                    error: Some(failure.to_string()),
                };
            }
        }
    }

    /// Closes an `Editing` session whose row was removed. An in-flight save
    /// is left to finish and resolve as `NotFound`.
    pub fn record_removed(&mut self, id: ClientId) -> bool {
        if matches!(self.state, EditState::Editing { target, .. } if target == id) {
            self.state = EditState::Closed;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{EditSession, EditState, FieldOverlay};
    use crate::{ClientField, ClientId, ClientRecord, RecordError};
    use anyhow::Result;
    use time::{Date, Month};

    fn record(id: i64) -> Result<ClientRecord> {
        Ok(ClientRecord {
            id: ClientId::new(id),
            owner_name: "Inès Moreau".to_owned(),
            license_number: format!("LIC-{id}"),
            phone: "0601020304".to_owned(),
            address: "8 quai des Chartrons".to_owned(),
            birth_date: Date::from_calendar_date(1992, Month::October, 20)?,
        })
    }

    #[test]
    fn begin_on_other_row_discards_previous_draft() -> Result<()> {
        let mut session = EditSession::new();
        session.begin(ClientId::new(1))?;
        session.set_field(ClientField::Phone, "0700")?;

        let discarded = session
            .begin(ClientId::new(2))?
            .expect("draft for row 1 should be reported");
        assert_eq!(discarded.target, ClientId::new(1));
        assert_eq!(discarded.draft.get(ClientField::Phone), Some("0700"));
        assert_eq!(session.target(), Some(ClientId::new(2)));
        assert!(session.draft().is_some_and(FieldOverlay::is_empty));
        Ok(())
    }

    #[test]
    fn begin_on_same_row_keeps_draft() -> Result<()> {
        let mut session = EditSession::new();
        session.begin(ClientId::new(1))?;
        session.set_field(ClientField::Address, "new")?;
        assert!(session.begin(ClientId::new(1))?.is_none());
        assert_eq!(
            session.draft().and_then(|d| d.get(ClientField::Address)),
            Some("new")
        );
        Ok(())
    }

    #[test]
    fn display_value_overlays_draft_on_target_only() -> Result<()> {
        let target = record(1)?;
        let other = record(2)?;
        let mut session = EditSession::new();
        session.begin(target.id)?;
        session.set_field(ClientField::Phone, "0999")?;

        assert_eq!(session.display_value(ClientField::Phone, &target), "0999");
        assert_eq!(
            session.display_value(ClientField::LicenseNumber, &target),
            "LIC-1"
        );
        assert_eq!(
            session.display_value(ClientField::Phone, &other),
            "0601020304"
        );
        Ok(())
    }

    #[test]
    fn start_save_sends_only_changed_fields() -> Result<()> {
        let target = record(5)?;
        let mut session = EditSession::new();
        session.begin(target.id)?;
        session.set_field(ClientField::Phone, "09")?;
        session.set_field(ClientField::LicenseNumber, "LIC-5")?;

        let (id, patch) = session.start_save(&target)?.expect("phone changed");
        assert_eq!(id, ClientId::new(5));
        assert_eq!(patch.fields(), vec![ClientField::Phone]);
        assert!(session.is_saving(id));
        Ok(())
    }

    #[test]
    fn start_save_without_changes_closes() -> Result<()> {
        let target = record(5)?;
        let mut session = EditSession::new();
        session.begin(target.id)?;
        session.set_field(ClientField::Phone, "0601020304")?;

        assert!(session.start_save(&target)?.is_none());
        assert_eq!(session.state(), &EditState::Closed);
        Ok(())
    }

    #[test]
    fn blank_field_fails_validation_and_keeps_editing() -> Result<()> {
        let target = record(5)?;
        let mut session = EditSession::new();
        session.begin(target.id)?;
        session.set_field(ClientField::Address, "   ")?;

        let error = session.start_save(&target).expect_err("blank address");
        assert!(matches!(error, RecordError::Validation(_)));
        assert!(session.error().is_some_and(|m| m.contains("address")));
        assert_eq!(session.target(), Some(target.id));
        Ok(())
    }

    #[test]
    fn network_failure_keeps_draft_and_surfaces_error() -> Result<()> {
        let target = record(5)?;
        let mut session = EditSession::new();
        session.begin(target.id)?;
        session.set_field(ClientField::Phone, "09")?;
        session.start_save(&target)?;

        session.finish_save(&Err(RecordError::network("connection reset")));

        match session.state() {
            EditState::Editing {
                target: id,
                draft,
                error,
            } => {
                assert_eq!(*id, ClientId::new(5));
                assert_eq!(draft.get(ClientField::Phone), Some("09"));
                assert!(error.as_deref().is_some_and(|m| m.contains("network")));
            }
            other => panic!("expected editing state, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn success_and_not_found_close_session() -> Result<()> {
        let target = record(5)?;
        let mut session = EditSession::new();
        session.begin(target.id)?;
        session.set_field(ClientField::Phone, "09")?;
        session.start_save(&target)?;
        session.finish_save(&Ok(target.clone()));
        assert!(!session.is_open());

        session.begin(target.id)?;
        session.set_field(ClientField::Phone, "08")?;
        session.start_save(&target)?;
        session.finish_save(&Err(RecordError::NotFound(target.id)));
        assert!(!session.is_open());
        Ok(())
    }

    #[test]
    fn saving_rejects_changes_cancel_and_new_targets() -> Result<()> {
        let target = record(5)?;
        let mut session = EditSession::new();
        session.begin(target.id)?;
        session.set_field(ClientField::Phone, "09")?;
        session.start_save(&target)?;

        assert_eq!(
            session.set_field(ClientField::Phone, "10"),
            Err(RecordError::Busy(target.id))
        );
        assert_eq!(session.cancel(), Err(RecordError::Busy(target.id)));
        assert_eq!(
            session.begin(ClientId::new(6)),
            Err(RecordError::Busy(target.id))
        );
        assert!(!session.record_removed(target.id));
        assert!(session.is_saving(target.id));
        Ok(())
    }

    #[test]
    fn cancel_and_record_removal_close_editing() -> Result<()> {
        let mut session = EditSession::new();
        session.begin(ClientId::new(3))?;
        assert!(session.cancel()?);
        assert!(!session.cancel()?);

        session.begin(ClientId::new(3))?;
        assert!(!session.record_removed(ClientId::new(4)));
        assert!(session.record_removed(ClientId::new(3)));
        assert_eq!(session.target(), None);
        Ok(())
    }

    #[test]
    fn set_field_requires_open_session() {
        let mut session = EditSession::new();
        assert!(matches!(
            session.set_field(ClientField::Phone, "1"),
            Err(RecordError::Validation(_))
        ));
    }

    #[test]
    fn malformed_birth_date_is_validation_error() -> Result<()> {
        let mut overlay = FieldOverlay::default();
        overlay.set(ClientField::BirthDate, "31/12/1990");
        assert!(matches!(
            overlay.to_patch(),
            Err(RecordError::Validation(_))
        ));
        overlay.set(ClientField::BirthDate, "1990-12-31");
        assert_eq!(
            overlay.to_patch()?.birth_date,
            Some(Date::from_calendar_date(1990, Month::December, 31)?)
        );
        Ok(())
    }
}
