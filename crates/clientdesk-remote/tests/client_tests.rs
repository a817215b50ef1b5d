// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use clientdesk_app::{
    ClientId, ClientPatch, ClientRecordSet, Credential, NewClient, RecordError, RemoteStore,
    UserId,
};
use clientdesk_remote::HttpStore;
use std::io::Read;
use std::thread;
use std::time::Duration;
use time::{Date, Month};
use tiny_http::{Header, Method, Request, Response, Server};

const RECORD_ONE: &str = r#"{"id":1,"owner_name":"Ana Lopes","license_number":"A1","phone":"06","address":"1 rue A","birth_date":"1990-01-01"}"#;
const RECORD_TWO: &str = r#"{"id":2,"owner_name":"Ana Lopes","license_number":"B2","phone":"07","address":"2 rue B","birth_date":"1985-06-30"}"#;

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

fn bearer(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv("Authorization"))
        .map(|header| header.value.as_str().to_owned())
}

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());
    Ok((server, addr))
}

#[test]
fn unreachable_server_reports_actionable_network_error() -> Result<()> {
    let mut store = HttpStore::new("http://127.0.0.1:1/api", Duration::from_millis(50))?;

    let error = store
        .list(&Credential::new("t"))
        .expect_err("nothing listens on port 1");
    match error {
        RecordError::Network(message) => assert!(message.contains("cannot reach")),
        other => panic!("expected network error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn list_sends_bearer_token_and_feeds_record_set() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.url(), "/api/clients/");
        assert_eq!(bearer(&request).as_deref(), Some("Bearer secret"));
        let body = format!("[{RECORD_ONE},{RECORD_TWO}]");
        request
            .respond(json_response(&body, 200))
            .expect("response should succeed");
    });

    let mut store = HttpStore::new(&addr, Duration::from_secs(1))?;
    let mut records = ClientRecordSet::new();
    records.load(&mut store, &Credential::new("secret"))?;

    assert_eq!(records.len(), 2);
    let first = records.get(ClientId::new(1)).expect("row 1 listed");
    assert_eq!(first.owner_name, "Ana Lopes");
    assert_eq!(first.birth_date, Date::from_calendar_date(1990, Month::January, 1)?);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn create_posts_payload_and_decodes_reply() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/api/clients/");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("request body readable");
        let sent: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(sent["license_number"], "X9");
        assert_eq!(sent["birth_date"], "1990-01-01");
        assert_eq!(sent["owner_id"], 4);

        let reply = r#"{"status":"success","message":"Client created","client":{"id":9,"owner_name":"Ana Lopes","license_number":"X9","phone":"07","address":"12 rue Y","birth_date":"1990-01-01"}}"#;
        request
            .respond(json_response(reply, 201))
            .expect("response should succeed");
    });

    let mut store = HttpStore::new(&addr, Duration::from_secs(1))?;
    let reply = store.create(
        &NewClient {
            license_number: "X9".to_owned(),
            phone: "07".to_owned(),
            address: "12 rue Y".to_owned(),
            birth_date: Date::from_calendar_date(1990, Month::January, 1)?,
            owner_id: UserId::new(4),
        },
        &Credential::new("secret"),
    )?;

    assert_eq!(reply.status, "success");
    assert_eq!(reply.client.id, ClientId::new(9));
    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn patch_sends_only_changed_fields() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Patch);
        assert_eq!(request.url(), "/api/clients/2/");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("request body readable");
        assert_eq!(body, r#"{"phone":"09"}"#);

        let reply = format!(
            r#"{{"status":"success","message":"updated","client":{}}}"#,
            RECORD_TWO.replace(r#""phone":"07""#, r#""phone":"09""#)
        );
        request
            .respond(json_response(&reply, 200))
            .expect("response should succeed");
    });

    let mut store = HttpStore::new(&addr, Duration::from_secs(1))?;
    let patch = ClientPatch {
        phone: Some("09".to_owned()),
        ..ClientPatch::default()
    };
    let reply = store.update(ClientId::new(2), &patch, &Credential::new("secret"))?;
    assert_eq!(reply.client.phone, "09");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn error_statuses_map_to_record_errors() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let replies = [
            (401, r#"{"detail":"Invalid token."}"#),
            (404, r#"{"detail":"Not found."}"#),
            (400, r#"{"message":"birth date is required"}"#),
            (500, "boom"),
        ];
        for (status, body) in replies {
            let request = server.recv().expect("request expected");
            request
                .respond(json_response(body, status))
                .expect("response should succeed");
        }
    });

    let mut store = HttpStore::new(&addr, Duration::from_secs(1))?;
    let credential = Credential::new("secret");

    assert_eq!(
        store.list(&credential).expect_err("401"),
        RecordError::SessionExpired
    );
    assert_eq!(
        store.get(ClientId::new(5), &credential).expect_err("404"),
        RecordError::NotFound(ClientId::new(5))
    );
    assert_eq!(
        store
            .update(ClientId::new(5), &ClientPatch::default(), &credential)
            .expect_err("400"),
        RecordError::validation("birth date is required")
    );
    assert_eq!(
        store.delete(ClientId::new(5), &credential).expect_err("500"),
        RecordError::network("server error (500): boom")
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn delete_accepts_no_content() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Delete);
        assert_eq!(request.url(), "/api/clients/7/");
        request
            .respond(Response::empty(204))
            .expect("response should succeed");
    });

    let mut store = HttpStore::new(&addr, Duration::from_secs(1))?;
    store.delete(ClientId::new(7), &Credential::new("secret"))?;

    handle.join().expect("server thread should join");
    Ok(())
}
