// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{
    AuthProvider, ClientField, ClientId, ClientPatch, ClientRecord, ClientRecordSet, Countdown,
    Credential, NewClient, RecordError, RemoteStore, UserId, format_birth_date, parse_birth_date,
    require_session,
};

pub const DEFAULT_SUBMIT_LATENCY: Duration = Duration::from_millis(600);
pub const DEFAULT_FEEDBACK_RESET: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFormInput {
    pub license_number: String,
    pub phone: String,
    pub address: String,
    pub birth_date: String,
}

impl ClientFormInput {
    pub fn from_record(record: &ClientRecord) -> Self {
        Self {
            license_number: record.license_number.clone(),
            phone: record.phone.clone(),
            address: record.address.clone(),
            birth_date: format_birth_date(record.birth_date),
        }
    }

    pub fn value(&self, field: ClientField) -> &str {
        match field {
            ClientField::LicenseNumber => &self.license_number,
            ClientField::Phone => &self.phone,
            ClientField::Address => &self.address,
            ClientField::BirthDate => &self.birth_date,
        }
    }

    pub fn set(&mut self, field: ClientField, value: &str) {
        let slot = match field {
            ClientField::LicenseNumber => &mut self.license_number,
            ClientField::Phone => &mut self.phone,
            ClientField::Address => &mut self.address,
            ClientField::BirthDate => &mut self.birth_date,
        };
        *slot = value.to_owned();
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        for field in ClientField::ALL {
            if self.value(field).trim().is_empty() {
                return Err(RecordError::validation(format!(
                    "{} is required -- fill it in and retry",
                    field.label()
                )));
            }
        }
        parse_birth_date(&self.birth_date)?;
        Ok(())
    }

    pub fn to_new_client(&self, owner_id: UserId) -> Result<NewClient, RecordError> {
        self.validate()?;
        Ok(NewClient {
            license_number: self.license_number.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            birth_date: parse_birth_date(&self.birth_date)?,
            owner_id,
        })
    }

    /// Full-record patch used by the form's edit mode.
    pub fn to_patch(&self) -> Result<ClientPatch, RecordError> {
        self.validate()?;
        Ok(ClientPatch {
            license_number: Some(self.license_number.clone()),
            phone: Some(self.phone.clone()),
            address: Some(self.address.clone()),
            birth_date: Some(parse_birth_date(&self.birth_date)?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(ClientId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormTiming {
    /// Deliberate pause before the remote call, so the spinner is visible.
    pub latency: Duration,
    /// How long the success message stays before the form resets.
    pub reset_after: Duration,
}

impl Default for FormTiming {
    fn default() -> Self {
        Self {
            latency: DEFAULT_SUBMIT_LATENCY,
            reset_after: DEFAULT_FEEDBACK_RESET,
        }
    }
}

impl FormTiming {
    pub const fn immediate() -> Self {
        Self {
            latency: Duration::ZERO,
            reset_after: DEFAULT_FEEDBACK_RESET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    /// A create or update went through; dependent lists should reload.
    RecordChanged,
    Reset,
}

/// Request produced by `begin_submit`, to be sent to the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSubmit {
    Create {
        client: NewClient,
        credential: Credential,
    },
    Update {
        id: ClientId,
        patch: ClientPatch,
        credential: Credential,
    },
}

impl PendingSubmit {
    /// Sends the request and mirrors the confirmed record into `records`.
    pub fn send(
        self,
        records: &mut ClientRecordSet,
        store: &mut dyn RemoteStore,
    ) -> Result<ClientRecord, RecordError> {
        match self {
            Self::Create { client, credential } => records.create(store, &client, &credential),
            Self::Update {
                id,
                patch,
                credential,
            } => records.update(store, id, &patch, &credential),
        }
    }
}

/// Full-form workflow for creating a client or rewriting an existing one.
///
/// After a success the form shows feedback for `reset_after`, then resets on
/// the next `tick` and emits `RecordChanged` exactly once. Reinitializing the
/// form drops the reset but not the notification; only `teardown` cancels
/// both.
#[derive(Debug, Clone)]
pub struct CreateFormSession {
    mode: FormMode,
    input: ClientFormInput,
    state: SubmissionState,
    feedback: Option<Feedback>,
    touched: BTreeSet<ClientField>,
    timing: FormTiming,
    reset: Option<Countdown>,
    notify: Option<Countdown>,
    torn_down: bool,
}

impl CreateFormSession {
    pub fn new(timing: FormTiming) -> Self {
        Self {
            mode: FormMode::Create,
            input: ClientFormInput::default(),
            state: SubmissionState::Idle,
            feedback: None,
            touched: BTreeSet::new(),
            timing,
            reset: None,
            notify: None,
            torn_down: false,
        }
    }

    pub fn for_record(record: &ClientRecord, timing: FormTiming) -> Self {
        Self {
            mode: FormMode::Edit(record.id),
            input: ClientFormInput::from_record(record),
            ..Self::new(timing)
        }
    }

    pub const fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn input(&self) -> &ClientFormInput {
        &self.input
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn touched(&self) -> &BTreeSet<ClientField> {
        &self.touched
    }

    /// Resets the form when its initial record changes identity. Returns
    /// whether a reset happened.
    pub fn reinitialize(&mut self, initial: Option<&ClientRecord>) -> bool {
        let mode = initial.map_or(FormMode::Create, |record| FormMode::Edit(record.id));
        if mode == self.mode {
            return false;
        }
        self.mode = mode;
        self.input = initial.map(ClientFormInput::from_record).unwrap_or_default();
        self.state = SubmissionState::Idle;
        self.feedback = None;
        self.touched.clear();
        // A pending record-changed notice still fires.
        self.reset = None;
        true
    }

    pub fn set_field(&mut self, field: ClientField, value: &str) {
        self.input.set(field, value);
        self.touched.insert(field);
    }

    pub fn can_submit(&self) -> bool {
        !self.torn_down
            && matches!(
                self.state,
                SubmissionState::Idle | SubmissionState::Failed(_)
            )
    }

    /// Checks the session and the input, then moves to `Submitting`.
    ///
    /// Returns `None` while a submission is in flight or its success is
    /// still on screen; nothing is sent in that case.
    pub fn begin_submit(
        &mut self,
        auth: &dyn AuthProvider,
    ) -> Result<Option<PendingSubmit>, RecordError> {
        if !self.can_submit() {
            debug!(state = ?self.state, "submit ignored");
            return Ok(None);
        }

        let session = match require_session(auth) {
            Ok(session) => session,
            Err(error) => {
                self.fail(&error);
                return Err(error);
            }
        };

        let request = match self.mode {
            FormMode::Create => {
                self.input
                    .to_new_client(session.user_id)
                    .map(|client| PendingSubmit::Create {
                        client,
                        credential: session.credential,
                    })
            }
            FormMode::Edit(id) => self.input.to_patch().map(|patch| PendingSubmit::Update {
                id,
                patch,
                credential: session.credential,
            }),
        };

        match request {
            Ok(request) => {
                self.state = SubmissionState::Submitting;
                self.feedback = None;
                Ok(Some(request))
            }
            Err(error) => {
                self.fail(&error);
                Err(error)
            }
        }
    }

    pub fn finish_submit(&mut self, result: &Result<ClientRecord, RecordError>, now: Instant) {
        if self.state != SubmissionState::Submitting {
            warn!(state = ?self.state, "submit result arrived with no submit in flight");
            return;
        }
        match result {
            Ok(record) => {
                let message = match self.mode {
                    FormMode::Create => format!("client {} added", record.id),
                    FormMode::Edit(_) => {
                        self.input = ClientFormInput::from_record(record);
                        format!("client {} updated", record.id)
                    }
                };
                self.state = SubmissionState::Succeeded;
                self.feedback = Some(Feedback {
                    kind: FeedbackKind::Success,
                    message,
                });
                if !self.torn_down {
                    let deadline = Countdown::start(now, self.timing.reset_after);
                    self.reset = Some(deadline);
                    self.notify = Some(deadline);
                }
            }
            Err(error) => self.fail(error),
        }
    }

    /// Runs a whole submission against `records`, blocking for the configured
    /// latency. Interactive callers send the `begin_submit` request themselves
    /// once the latency has elapsed.
    pub fn submit(
        &mut self,
        records: &mut ClientRecordSet,
        store: &mut dyn RemoteStore,
        auth: &dyn AuthProvider,
    ) -> Result<Option<ClientRecord>, RecordError> {
        let Some(pending) = self.begin_submit(auth)? else {
            return Ok(None);
        };
        if !self.timing.latency.is_zero() {
            thread::sleep(self.timing.latency);
        }
        let result = pending.send(records, store);
        self.finish_submit(&result, Instant::now());
        result.map(Some)
    }

    pub fn tick(&mut self, now: Instant) -> Vec<FormEvent> {
        let mut events = Vec::new();
        if self.torn_down {
            return events;
        }

        if self.notify.is_some_and(|notify| notify.is_due(now)) {
            self.notify = None;
            events.push(FormEvent::RecordChanged);
        }

        if self.reset.is_some_and(|reset| reset.is_due(now)) {
            self.reset = None;
            self.state = SubmissionState::Idle;
            self.feedback = None;
            if self.mode == FormMode::Create {
                self.input = ClientFormInput::default();
                self.touched.clear();
            }
            events.push(FormEvent::Reset);
        }
        events
    }

    fn fail(&mut self, error: &RecordError) {
        let message = error.to_string();
        self.state = SubmissionState::Failed(message.clone());
        self.feedback = Some(Feedback {
            kind: FeedbackKind::Error,
            message,
        });
    }

    /// Cancels a pending reset and notification; later ticks do nothing.
    pub fn teardown(&mut self) {
        self.reset = None;
        self.notify = None;
        self.torn_down = true;
    }
}
