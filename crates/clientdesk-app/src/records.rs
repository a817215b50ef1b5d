// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::{
    ClientId, ClientPatch, ClientRecord, Credential, NewClient, RecordError, RemoteStore,
};

/// Local mirror of the remote client collection.
///
/// Ids are unique and rows keep the order of the last successful `load`, with
/// created rows appended and updated rows replaced in place. Nothing here is
/// changed before the remote store confirms it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientRecordSet {
    records: Vec<ClientRecord>,
}

impl ClientRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ClientId) -> Option<&ClientRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn position(&self, id: ClientId) -> Option<usize> {
        self.records.iter().position(|record| record.id == id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.position(id).is_some()
    }

    /// Replaces the whole set with the remote list.
    pub fn load(
        &mut self,
        store: &mut dyn RemoteStore,
        credential: &Credential,
    ) -> Result<&[ClientRecord], RecordError> {
        let fetched = store.list(credential)?;
        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(fetched.len());
        for record in fetched {
            if seen.insert(record.id) {
                records.push(record);
            } else {
                warn!(id = record.id.get(), "dropping duplicate client id from list");
            }
        }
        debug!(count = records.len(), "client list loaded");
        self.records = records;
        Ok(&self.records)
    }

    pub fn create(
        &mut self,
        store: &mut dyn RemoteStore,
        client: &NewClient,
        credential: &Credential,
    ) -> Result<ClientRecord, RecordError> {
        let reply = store.create(client, credential)?;
        let record = reply.client;
        match self.position(record.id) {
            Some(index) => self.records[index] = record.clone(),
            None => self.records.push(record.clone()),
        }
        debug!(id = record.id.get(), "client created");
        Ok(record)
    }

    pub fn update(
        &mut self,
        store: &mut dyn RemoteStore,
        id: ClientId,
        patch: &ClientPatch,
        credential: &Credential,
    ) -> Result<ClientRecord, RecordError> {
        if !self.contains(id) {
            return Err(RecordError::NotFound(id));
        }
        let reply = store.update(id, patch, credential)?;
        self.apply_update(id, reply.client)
    }

    /// Puts the server's copy of `id` at its current position.
    ///
    /// Fails with `NotFound` when `id` left the set while the request was in
    /// flight, so a deleted row is never brought back.
    pub fn apply_update(
        &mut self,
        id: ClientId,
        record: ClientRecord,
    ) -> Result<ClientRecord, RecordError> {
        let Some(index) = self.position(id) else {
            warn!(id = id.get(), "discarding update for client no longer listed");
            return Err(RecordError::NotFound(id));
        };
        if record.id != id {
            return Err(RecordError::network(format!(
                "server answered update of client {id} with client {}",
                record.id
            )));
        }
        self.records[index] = record.clone();
        debug!(id = id.get(), "client updated");
        Ok(record)
    }

    pub fn delete(
        &mut self,
        store: &mut dyn RemoteStore,
        id: ClientId,
        credential: &Credential,
    ) -> Result<(), RecordError> {
        store.delete(id, credential)?;
        self.records.retain(|record| record.id != id);
        debug!(id = id.get(), "client deleted");
        Ok(())
    }
}
