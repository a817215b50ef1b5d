// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::{ClientId, ClientPatch, ClientRecord, Credential, NewClient, RecordError};

/// Server acknowledgement of a create or update, carrying the canonical row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub client: ClientRecord,
}

/// Remote collection of client records. Every call requires a credential.
pub trait RemoteStore {
    fn list(&mut self, credential: &Credential) -> Result<Vec<ClientRecord>, RecordError>;
    fn get(&mut self, id: ClientId, credential: &Credential) -> Result<ClientRecord, RecordError>;
    fn create(
        &mut self,
        client: &NewClient,
        credential: &Credential,
    ) -> Result<StoreReply, RecordError>;
    fn update(
        &mut self,
        id: ClientId,
        patch: &ClientPatch,
        credential: &Credential,
    ) -> Result<StoreReply, RecordError>;
    fn delete(&mut self, id: ClientId, credential: &Credential) -> Result<(), RecordError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOp {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl StoreOp {
    pub const ALL: [Self; 5] = [
        Self::List,
        Self::Get,
        Self::Create,
        Self::Update,
        Self::Delete,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}
