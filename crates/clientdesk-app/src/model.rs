// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::{ClientId, RecordError, UserId};

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub fn parse_birth_date(raw: &str) -> Result<Date, RecordError> {
    Date::parse(raw.trim(), ISO_DATE).map_err(|_| {
        RecordError::validation(format!(
            "birth date {raw:?} is not a date -- use YYYY-MM-DD, for example 1990-01-31"
        ))
    })
}

pub fn format_birth_date(date: Date) -> String {
    date.format(ISO_DATE).unwrap_or_else(|_| date.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientField {
    LicenseNumber,
    Phone,
    Address,
    BirthDate,
}

impl ClientField {
    pub const ALL: [Self; 4] = [
        Self::LicenseNumber,
        Self::Phone,
        Self::Address,
        Self::BirthDate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LicenseNumber => "license_number",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::BirthDate => "birth_date",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "license_number" | "license" => Some(Self::LicenseNumber),
            "phone" => Some(Self::Phone),
            "address" => Some(Self::Address),
            "birth_date" | "birthdate" => Some(Self::BirthDate),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::LicenseNumber => "license number",
            Self::Phone => "phone",
            Self::Address => "address",
            Self::BirthDate => "birth date",
        }
    }
}

/// Canonical client row as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: ClientId,
    /// Display name of the owning user; read-only on this side.
    #[serde(default)]
    pub owner_name: String,
    pub license_number: String,
    pub phone: String,
    pub address: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
}

impl ClientRecord {
    pub fn field_value(&self, field: ClientField) -> String {
        match field {
            ClientField::LicenseNumber => self.license_number.clone(),
            ClientField::Phone => self.phone.clone(),
            ClientField::Address => self.address.clone(),
            ClientField::BirthDate => format_birth_date(self.birth_date),
        }
    }

    /// Case-insensitive match of an already lower-cased needle against the
    /// owner name, license number, and phone.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        [&self.owner_name, &self.license_number, &self.phone]
            .into_iter()
            .any(|value| value.to_lowercase().contains(needle))
    }
}

/// Create payload. The server assigns the id and resolves the owner name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub license_number: String,
    pub phone: String,
    pub address: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    pub owner_id: UserId,
}

/// Partial update; only present fields go over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "iso_date::option"
    )]
    pub birth_date: Option<Date>,
}

impl ClientPatch {
    pub fn is_empty(&self) -> bool {
        self.license_number.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.birth_date.is_none()
    }

    pub fn fields(&self) -> Vec<ClientField> {
        let mut fields = Vec::new();
        if self.license_number.is_some() {
            fields.push(ClientField::LicenseNumber);
        }
        if self.phone.is_some() {
            fields.push(ClientField::Phone);
        }
        if self.address.is_some() {
            fields.push(ClientField::Address);
        }
        if self.birth_date.is_some() {
            fields.push(ClientField::BirthDate);
        }
        fields
    }

    /// Drops every field whose value already matches `record`.
    pub fn changes_from(&self, record: &ClientRecord) -> Self {
        Self {
            license_number: self
                .license_number
                .clone()
                .filter(|value| *value != record.license_number),
            phone: self.phone.clone().filter(|value| *value != record.phone),
            address: self.address.clone().filter(|value| *value != record.address),
            birth_date: self.birth_date.filter(|value| *value != record.birth_date),
        }
    }

    pub fn apply_to(&self, record: &ClientRecord) -> ClientRecord {
        let mut updated = record.clone();
        if let Some(license_number) = &self.license_number {
            updated.license_number = license_number.clone();
        }
        if let Some(phone) = &self.phone {
            updated.phone = phone.clone();
        }
        if let Some(address) = &self.address {
            updated.address = address.clone();
        }
        if let Some(birth_date) = self.birth_date {
            updated.birth_date = birth_date;
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientField, ClientPatch, ClientRecord, parse_birth_date};
    use crate::ClientId;
    use anyhow::Result;
    use time::{Date, Month};

    fn record() -> Result<ClientRecord> {
        Ok(ClientRecord {
            id: ClientId::new(1),
            owner_name: "Camille Martin".to_owned(),
            license_number: "A1-2024".to_owned(),
            phone: "0611223344".to_owned(),
            address: "12 rue Victor Hugo\n75001 Paris".to_owned(),
            birth_date: Date::from_calendar_date(1990, Month::January, 1)?,
        })
    }

    #[test]
    fn record_serializes_birth_date_as_iso_string() -> Result<()> {
        let json = serde_json::to_value(record()?)?;
        assert_eq!(json["birth_date"], "1990-01-01");
        assert_eq!(json["id"], 1);
        Ok(())
    }

    #[test]
    fn record_tolerates_missing_owner_name() -> Result<()> {
        let parsed: ClientRecord = serde_json::from_str(
            r#"{"id":4,"license_number":"B2","phone":"07","address":"x","birth_date":"2001-12-31"}"#,
        )?;
        assert_eq!(parsed.owner_name, "");
        assert_eq!(
            parsed.birth_date,
            Date::from_calendar_date(2001, Month::December, 31)?
        );
        Ok(())
    }

    #[test]
    fn patch_serializes_only_present_fields() -> Result<()> {
        let patch = ClientPatch {
            phone: Some("09".to_owned()),
            ..ClientPatch::default()
        };
        assert_eq!(serde_json::to_string(&patch)?, r#"{"phone":"09"}"#);
        Ok(())
    }

    #[test]
    fn patch_changes_from_drops_unchanged_values() -> Result<()> {
        let record = record()?;
        let patch = ClientPatch {
            license_number: Some(record.license_number.clone()),
            phone: Some("0799".to_owned()),
            address: None,
            birth_date: Some(record.birth_date),
        };
        let changes = patch.changes_from(&record);
        assert_eq!(changes.fields(), vec![ClientField::Phone]);
        assert_eq!(changes.apply_to(&record).phone, "0799");
        Ok(())
    }

    #[test]
    fn birth_date_parse_rejects_non_iso_values() {
        assert!(parse_birth_date("1990-01-01").is_ok());
        let error = parse_birth_date("01/01/1990").expect_err("slash date should fail");
        assert!(error.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn field_names_parse_with_aliases() {
        for field in ClientField::ALL {
            assert_eq!(ClientField::parse(field.as_str()), Some(field));
        }
        assert_eq!(
            ClientField::parse("license"),
            Some(ClientField::LicenseNumber)
        );
        assert_eq!(ClientField::parse("owner_name"), None);
    }
}
