// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    ClientId, ClientPatch, ClientRecord, Credential, NewClient, RecordError, RemoteStore,
    StoreOp, StoreReply, UserId,
};

/// In-memory remote store used for demo mode and tests.
///
/// Behaves like the server: it assigns ids, resolves owner names, trims
/// string fields on write, and reports unknown ids as `NotFound`. Failures can
/// be injected per operation and every call is counted.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    clients: Vec<ClientRecord>,
    owners: BTreeMap<UserId, String>,
    next_id: i64,
    accepted_token: Option<String>,
    failures: BTreeMap<StoreOp, RecordError>,
    calls: BTreeMap<StoreOp, usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
            owners: BTreeMap::new(),
            next_id: 1,
            accepted_token: None,
            failures: BTreeMap::new(),
            calls: BTreeMap::new(),
        }
    }

    pub fn with_owner(mut self, id: UserId, name: &str) -> Self {
        self.owners.insert(id, name.to_owned());
        self
    }

    /// Rejects every call whose credential differs from `token`.
    pub fn require_token(mut self, token: &str) -> Self {
        self.accepted_token = Some(token.to_owned());
        self
    }

    /// Adds a row directly, as if another user had created it.
    pub fn insert(&mut self, client: &NewClient) -> ClientRecord {
        let record = ClientRecord {
            id: ClientId::new(self.next_id),
            owner_name: self.owner_name(client.owner_id),
            license_number: client.license_number.trim().to_owned(),
            phone: client.phone.trim().to_owned(),
            address: client.address.trim().to_owned(),
            birth_date: client.birth_date,
        };
        self.next_id += 1;
        self.clients.push(record.clone());
        record
    }

    /// Deletes a row behind the client's back.
    pub fn remove(&mut self, id: ClientId) -> bool {
        let before = self.clients.len();
        self.clients.retain(|client| client.id != id);
        self.clients.len() != before
    }

    pub fn fail_next(&mut self, op: StoreOp, error: RecordError) {
        self.failures.insert(op, error);
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.calls.get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        StoreOp::ALL.into_iter().map(|op| self.calls(op)).sum()
    }

    pub fn clients(&self) -> &[ClientRecord] {
        &self.clients
    }

    fn owner_name(&self, id: UserId) -> String {
        self.owners.get(&id).cloned().unwrap_or_default()
    }

    fn begin(&mut self, op: StoreOp, credential: &Credential) -> Result<(), RecordError> {
        *self.calls.entry(op).or_insert(0) += 1;
        debug!(op = op.as_str(), "memory store call");
        if let Some(token) = &self.accepted_token
            && token != credential.expose()
        {
            return Err(RecordError::SessionExpired);
        }
        match self.failures.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn position(&self, id: ClientId) -> Result<usize, RecordError> {
        self.clients
            .iter()
            .position(|client| client.id == id)
            .ok_or(RecordError::NotFound(id))
    }
}

impl RemoteStore for MemoryStore {
    fn list(&mut self, credential: &Credential) -> Result<Vec<ClientRecord>, RecordError> {
        self.begin(StoreOp::List, credential)?;
        Ok(self.clients.clone())
    }

    fn get(&mut self, id: ClientId, credential: &Credential) -> Result<ClientRecord, RecordError> {
        self.begin(StoreOp::Get, credential)?;
        let index = self.position(id)?;
        Ok(self.clients[index].clone())
    }

    fn create(
        &mut self,
        client: &NewClient,
        credential: &Credential,
    ) -> Result<StoreReply, RecordError> {
        self.begin(StoreOp::Create, credential)?;
        let record = self.insert(client);
        Ok(StoreReply {
            status: "success".to_owned(),
            message: "client created".to_owned(),
            client: record,
        })
    }

    fn update(
        &mut self,
        id: ClientId,
        patch: &ClientPatch,
        credential: &Credential,
    ) -> Result<StoreReply, RecordError> {
        self.begin(StoreOp::Update, credential)?;
        let index = self.position(id)?;
        let trimmed = ClientPatch {
            license_number: patch.license_number.as_deref().map(|v| v.trim().to_owned()),
            phone: patch.phone.as_deref().map(|v| v.trim().to_owned()),
            address: patch.address.as_deref().map(|v| v.trim().to_owned()),
            birth_date: patch.birth_date,
        };
        let updated = trimmed.apply_to(&self.clients[index]);
        self.clients[index] = updated.clone();
        Ok(StoreReply {
            status: "success".to_owned(),
            message: "client updated".to_owned(),
            client: updated,
        })
    }

    fn delete(&mut self, id: ClientId, credential: &Credential) -> Result<(), RecordError> {
        self.begin(StoreOp::Delete, credential)?;
        let index = self.position(id)?;
        self.clients.remove(index);
        Ok(())
    }
}
