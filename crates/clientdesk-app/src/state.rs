// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, warn};

use crate::{
    AuthProvider, ClientField, ClientId, ClientListView, ClientPatch, ClientRecord,
    ClientRecordSet, CreateFormSession, Credential, DiscardedDraft, EditSession, PendingSubmit,
    RecordError, RemoteStore, require_session,
};

/// Update produced by `ClientsPage::start_save`, to be sent to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    pub id: ClientId,
    pub patch: ClientPatch,
    pub credential: Credential,
}

/// Page controller for the client table. It is the only owner of the record
/// set; the list view and the inline edit session refer to rows by id.
#[derive(Debug, Clone, Default)]
pub struct ClientsPage {
    records: ClientRecordSet,
    view: ClientListView,
    edit: EditSession,
    pub status_line: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientsCommand {
    Reload,
    Search(String),
    GoToPage(usize),
    NextPage,
    PrevPage,
    SetPageSize(usize),
    BeginEdit(ClientId),
    EditField(ClientField, String),
    SaveEdit,
    CancelEdit,
    Delete(ClientId),
    /// A record was added or updated elsewhere; the list must reload.
    RecordChanged,
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientsEvent {
    Loaded(usize),
    QueryChanged(String),
    PageChanged(usize),
    PageSizeChanged(usize),
    EditStarted(ClientId),
    EditDiscarded(ClientId),
    FieldChanged(ClientField),
    EditClosed(ClientId),
    Saved(ClientId),
    Deleted(ClientId),
    Failed(RecordError),
    StatusUpdated(String),
    StatusCleared,
}

impl ClientsPage {
    pub fn new(page_size: usize) -> Self {
        Self {
            view: ClientListView::new(page_size),
            ..Self::default()
        }
    }

    pub fn records(&self) -> &ClientRecordSet {
        &self.records
    }

    pub fn view(&self) -> &ClientListView {
        &self.view
    }

    pub fn edit(&self) -> &EditSession {
        &self.edit
    }

    pub fn visible_rows(&self) -> Vec<&ClientRecord> {
        self.view.rows(self.records.records())
    }

    pub fn page_count(&self) -> usize {
        self.view.page_count(self.records.records())
    }

    pub fn match_count(&self) -> usize {
        self.view.filtered(self.records.records()).len()
    }

    pub fn reload(
        &mut self,
        store: &mut dyn RemoteStore,
        auth: &dyn AuthProvider,
    ) -> Result<usize, RecordError> {
        let session = require_session(auth)?;
        let count = self.records.load(store, &session.credential)?.len();
        if let Some(target) = self.edit.target()
            && !self.records.contains(target)
            && self.edit.record_removed(target)
        {
            debug!(id = target.get(), "edited client gone after reload");
        }
        self.view.clamp_page(self.records.records());
        Ok(count)
    }

    pub fn set_query(&mut self, query: &str) {
        self.view.set_query(query);
    }

    pub fn go_to_page(&mut self, page: usize) -> Result<(), RecordError> {
        let count = self.page_count();
        if page >= count.max(1) {
            return Err(RecordError::validation(format!(
                "page {} does not exist -- pick a page between 1 and {}",
                page + 1,
                count.max(1)
            )));
        }
        self.view.set_page(page);
        Ok(())
    }

    pub fn next_page(&mut self) -> bool {
        let page = self.view.page();
        if page + 1 < self.page_count() {
            self.view.set_page(page + 1);
            return true;
        }
        false
    }

    pub fn prev_page(&mut self) -> bool {
        let page = self.view.page();
        if page > 0 {
            self.view.set_page(page - 1);
            return true;
        }
        false
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), RecordError> {
        self.view.set_page_size(page_size)
    }

    pub fn begin_edit(&mut self, id: ClientId) -> Result<Option<DiscardedDraft>, RecordError> {
        if !self.records.contains(id) {
            return Err(RecordError::NotFound(id));
        }
        self.edit.begin(id)
    }

    pub fn edit_field(&mut self, field: ClientField, value: &str) -> Result<(), RecordError> {
        self.edit.set_field(field, value)
    }

    pub fn cancel_edit(&mut self) -> Result<bool, RecordError> {
        self.edit.cancel()
    }

    /// First half of an inline save: checks the session and the draft, then
    /// marks the session as saving. `None` means nothing changed.
    pub fn start_save(
        &mut self,
        auth: &dyn AuthProvider,
    ) -> Result<Option<PendingSave>, RecordError> {
        let Some(target) = self.edit.target() else {
            return Err(RecordError::validation(
                "no client is being edited -- start with `edit <id>`",
            ));
        };
        let session = require_session(auth)?;
        let Some(record) = self.records.get(target) else {
            self.edit.record_removed(target);
            return Err(RecordError::NotFound(target));
        };
        let pending = self.edit.start_save(record)?;
        Ok(pending.map(|(id, patch)| PendingSave {
            id,
            patch,
            credential: session.credential,
        }))
    }

    /// Second half of an inline save. The server copy replaces the row only
    /// if the row is still listed.
    pub fn finish_save(
        &mut self,
        id: ClientId,
        outcome: Result<ClientRecord, RecordError>,
    ) -> Result<ClientRecord, RecordError> {
        let result = outcome.and_then(|record| self.records.apply_update(id, record));
        self.edit.finish_save(&result);
        result
    }

    pub fn save_edit(
        &mut self,
        store: &mut dyn RemoteStore,
        auth: &dyn AuthProvider,
    ) -> Result<Option<ClientRecord>, RecordError> {
        let Some(pending) = self.start_save(auth)? else {
            return Ok(None);
        };
        let outcome = store
            .update(pending.id, &pending.patch, &pending.credential)
            .map(|reply| reply.client);
        self.finish_save(pending.id, outcome).map(Some)
    }

    /// Runs a full-form submission against the page's record set.
    pub fn submit_form(
        &mut self,
        form: &mut CreateFormSession,
        store: &mut dyn RemoteStore,
        auth: &dyn AuthProvider,
    ) -> Result<Option<ClientRecord>, RecordError> {
        form.submit(&mut self.records, store, auth)
    }

    /// Sends a form request prepared earlier by `begin_submit`.
    pub fn send_submit(
        &mut self,
        pending: PendingSubmit,
        store: &mut dyn RemoteStore,
    ) -> Result<ClientRecord, RecordError> {
        pending.send(&mut self.records, store)
    }

    /// Deletes `id` remotely, then locally. An open inline edit of `id` is
    /// closed; a save of `id` still in flight makes the delete fail `Busy`.
    pub fn delete(
        &mut self,
        store: &mut dyn RemoteStore,
        auth: &dyn AuthProvider,
        id: ClientId,
    ) -> Result<(), RecordError> {
        if self.edit.is_saving(id) {
            warn!(id = id.get(), "delete rejected while save is in flight");
            return Err(RecordError::Busy(id));
        }
        let session = require_session(auth)?;
        if !self.records.contains(id) {
            return Err(RecordError::NotFound(id));
        }
        self.records.delete(store, id, &session.credential)?;
        self.edit.record_removed(id);
        self.view.clamp_page(self.records.records());
        Ok(())
    }

    pub fn dispatch(
        &mut self,
        command: ClientsCommand,
        store: &mut dyn RemoteStore,
        auth: &dyn AuthProvider,
    ) -> Vec<ClientsEvent> {
        match command {
            ClientsCommand::Reload | ClientsCommand::RecordChanged => {
                let before = self.edit.target();
                match self.reload(store, auth) {
                    Ok(count) => {
                        let mut events = vec![ClientsEvent::Loaded(count)];
                        if let Some(target) = before
                            && self.edit.target().is_none()
                        {
                            events.push(ClientsEvent::EditClosed(target));
                        }
                        events.push(self.set_status(&format!("{count} clients loaded")));
                        events
                    }
                    Err(error) => self.fail(error),
                }
            }
            ClientsCommand::Search(query) => {
                self.set_query(&query);
                let query = self.view.query().to_owned();
                let label = if query.is_empty() {
                    "search cleared".to_owned()
                } else {
                    format!("{} matches for \"{query}\"", self.match_count())
                };
                vec![ClientsEvent::QueryChanged(query), self.set_status(&label)]
            }
            ClientsCommand::GoToPage(page) => match self.go_to_page(page) {
                Ok(()) => self.page_changed(),
                Err(error) => self.fail(error),
            },
            ClientsCommand::NextPage => {
                if self.next_page() {
                    self.page_changed()
                } else {
                    vec![self.set_status("already on the last page")]
                }
            }
            ClientsCommand::PrevPage => {
                if self.prev_page() {
                    self.page_changed()
                } else {
                    vec![self.set_status("already on the first page")]
                }
            }
            ClientsCommand::SetPageSize(size) => match self.set_page_size(size) {
                Ok(()) => vec![
                    ClientsEvent::PageSizeChanged(size),
                    self.set_status(&format!("{size} rows per page")),
                ],
                Err(error) => self.fail(error),
            },
            ClientsCommand::BeginEdit(id) => match self.begin_edit(id) {
                Ok(discarded) => {
                    let mut events = Vec::new();
                    if let Some(discarded) = discarded {
                        events.push(ClientsEvent::EditDiscarded(discarded.target));
                    }
                    events.push(ClientsEvent::EditStarted(id));
                    let label = match events.first() {
                        Some(ClientsEvent::EditDiscarded(previous)) => format!(
                            "editing client {id} (unsaved changes to client {previous} discarded)"
                        ),
                        _ => format!("editing client {id}"),
                    };
                    events.push(self.set_status(&label));
                    events
                }
                Err(error) => self.fail(error),
            },
            ClientsCommand::EditField(field, value) => match self.edit_field(field, &value) {
                Ok(()) => vec![ClientsEvent::FieldChanged(field)],
                Err(error) => self.fail(error),
            },
            ClientsCommand::SaveEdit => {
                let target = self.edit.target();
                match self.save_edit(store, auth) {
                    Ok(Some(record)) => vec![
                        ClientsEvent::Saved(record.id),
                        ClientsEvent::EditClosed(record.id),
                        self.set_status(&format!("client {} saved", record.id)),
                    ],
                    Ok(None) => {
                        let mut events = Vec::new();
                        if let Some(target) = target {
                            events.push(ClientsEvent::EditClosed(target));
                        }
                        events.push(self.set_status("no changes to save"));
                        events
                    }
                    Err(error) => {
                        let mut events = Vec::new();
                        if let Some(target) = target
                            && !self.edit.is_open()
                        {
                            events.push(ClientsEvent::EditClosed(target));
                        }
                        events.extend(self.fail(error));
                        events
                    }
                }
            }
            ClientsCommand::CancelEdit => {
                let target = self.edit.target();
                match self.cancel_edit() {
                    Ok(true) => {
                        let mut events = Vec::new();
                        if let Some(target) = target {
                            events.push(ClientsEvent::EditClosed(target));
                        }
                        events.push(self.set_status("edit cancelled"));
                        events
                    }
                    Ok(false) => vec![self.set_status("nothing to cancel")],
                    Err(error) => self.fail(error),
                }
            }
            ClientsCommand::Delete(id) => {
                let was_editing = self.edit.target() == Some(id);
                match self.delete(store, auth, id) {
                    Ok(()) => {
                        let mut events = vec![ClientsEvent::Deleted(id)];
                        if was_editing {
                            events.push(ClientsEvent::EditClosed(id));
                        }
                        events.push(self.set_status(&format!("client {id} deleted")));
                        events
                    }
                    Err(error) => self.fail(error),
                }
            }
            ClientsCommand::ClearStatus => {
                self.status_line = None;
                vec![ClientsEvent::StatusCleared]
            }
        }
    }

    fn page_changed(&mut self) -> Vec<ClientsEvent> {
        let page = self.view.page();
        let label = format!("page {} of {}", page + 1, self.page_count().max(1));
        vec![ClientsEvent::PageChanged(page), self.set_status(&label)]
    }

    fn fail(&mut self, error: RecordError) -> Vec<ClientsEvent> {
        let status = self.set_status(&error.to_string());
        vec![ClientsEvent::Failed(error), status]
    }

    fn set_status(&mut self, message: &str) -> ClientsEvent {
        self.status_line = Some(message.to_owned());
        ClientsEvent::StatusUpdated(message.to_owned())
    }
}
