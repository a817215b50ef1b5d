// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use clientdesk_app::{
    AuthProvider, ClientField, ClientId, ClientRecord, ClientsCommand, ClientsPage, Countdown,
    CreateFormSession, FeedbackKind, FormEvent, FormMode, FormTiming, PAGE_SIZE_OPTIONS,
    PendingSubmit, RecordError, RemoteStore, SubmissionState,
};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const ADDRESS_WIDTH: usize = 28;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    Search(String),
    Page(usize),
    Next,
    Prev,
    Size(usize),
    Reload,
    Edit(ClientId),
    Set(ClientField, String),
    Save,
    Cancel,
    Delete(ClientId),
    New,
    Open(ClientId),
    Form(ClientField, String),
    Submit,
    Close,
    Help,
    Quit,
}

/// Parses one shell line. `\n` inside a value becomes a line break so
/// multi-line addresses can be typed on one line.
pub fn parse_command(line: &str) -> Result<ShellCommand> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb {
        "list" | "ls" => ShellCommand::List,
        "search" | "find" => ShellCommand::Search(rest.to_owned()),
        "page" => {
            let page = parse_number(rest, "page")?;
            if page == 0 {
                return Err(anyhow!("pages start at 1 -- try `page 1`"));
            }
            ShellCommand::Page(page - 1)
        }
        "next" | "n" => ShellCommand::Next,
        "prev" | "p" => ShellCommand::Prev,
        "size" => ShellCommand::Size(parse_number(rest, "size")?),
        "reload" => ShellCommand::Reload,
        "edit" => ShellCommand::Edit(parse_id(rest, "edit")?),
        "set" => {
            let (field, value) = parse_assignment(rest, "set")?;
            ShellCommand::Set(field, value)
        }
        "save" => ShellCommand::Save,
        "cancel" => ShellCommand::Cancel,
        "delete" | "rm" => ShellCommand::Delete(parse_id(rest, "delete")?),
        "new" => ShellCommand::New,
        "open" => ShellCommand::Open(parse_id(rest, "open")?),
        "form" => {
            let (field, value) = parse_assignment(rest, "form")?;
            ShellCommand::Form(field, value)
        }
        "submit" => ShellCommand::Submit,
        "close" => ShellCommand::Close,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        "" => return Err(anyhow!("empty command -- type `help` for the list")),
        other => {
            return Err(anyhow!(
                "unknown command {other:?} -- type `help` for the list"
            ));
        }
    };
    Ok(command)
}

fn parse_number(raw: &str, verb: &str) -> Result<usize> {
    raw.parse()
        .with_context(|| format!("`{verb}` needs a number, got {raw:?}"))
}

fn parse_id(raw: &str, verb: &str) -> Result<ClientId> {
    let id: i64 = raw
        .parse()
        .with_context(|| format!("`{verb}` needs a client id, got {raw:?}"))?;
    Ok(ClientId::new(id))
}

fn parse_assignment(raw: &str, verb: &str) -> Result<(ClientField, String)> {
    let (name, value) = raw.split_once(char::is_whitespace).unwrap_or((raw, ""));
    let field = ClientField::parse(name).ok_or_else(|| {
        anyhow!(
            "`{verb}` needs a field: license_number, phone, address, or birth_date; got {name:?}"
        )
    })?;
    Ok((field, value.trim().replace("\\n", "\n")))
}

/// Form request waiting out the submit latency before it is sent.
struct InFlightSubmit {
    pending: PendingSubmit,
    send_at: Countdown,
}

/// Line-oriented front end over a `ClientsPage` and an optional full form.
pub struct Shell<S, A> {
    page: ClientsPage,
    form: Option<CreateFormSession>,
    in_flight: Option<InFlightSubmit>,
    store: S,
    auth: A,
    timing: FormTiming,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl<S: RemoteStore, A: AuthProvider> Shell<S, A> {
    pub fn new(store: S, auth: A, page_size: usize, timing: FormTiming) -> Self {
        Self {
            page: ClientsPage::new(page_size),
            form: None,
            in_flight: None,
            store,
            auth,
            timing,
        }
    }

    #[cfg(test)]
    pub fn page(&self) -> &ClientsPage {
        &self.page
    }

    #[cfg(test)]
    pub fn form(&self) -> Option<&CreateFormSession> {
        self.form.as_ref()
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Initial load, shown before the first prompt.
    pub fn start(&mut self) -> Vec<String> {
        self.dispatch(ClientsCommand::Reload);
        self.table_with_status()
    }

    pub fn handle_line(&mut self, line: &str) -> ShellOutput {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(error) => {
                return ShellOutput {
                    lines: vec![format!("{error:#}")],
                    quit: false,
                };
            }
        };
        debug!(?command, "shell command");

        let lines = match command {
            ShellCommand::Quit => {
                if let Some(form) = self.form.as_mut() {
                    form.teardown();
                }
                return ShellOutput {
                    lines: Vec::new(),
                    quit: true,
                };
            }
            ShellCommand::Help => help_lines(),
            ShellCommand::List => self.table_with_status(),
            ShellCommand::Search(query) => self.list_command(ClientsCommand::Search(query)),
            ShellCommand::Page(page) => self.list_command(ClientsCommand::GoToPage(page)),
            ShellCommand::Next => self.list_command(ClientsCommand::NextPage),
            ShellCommand::Prev => self.list_command(ClientsCommand::PrevPage),
            ShellCommand::Size(size) => {
                if !PAGE_SIZE_OPTIONS.contains(&size) {
                    debug!(size, "page size outside the usual options");
                }
                self.list_command(ClientsCommand::SetPageSize(size))
            }
            ShellCommand::Reload => self.list_command(ClientsCommand::Reload),
            ShellCommand::Edit(id) => self.list_command(ClientsCommand::BeginEdit(id)),
            ShellCommand::Set(field, value) => {
                self.list_command(ClientsCommand::EditField(field, value))
            }
            ShellCommand::Save => self.list_command(ClientsCommand::SaveEdit),
            ShellCommand::Cancel => self.list_command(ClientsCommand::CancelEdit),
            ShellCommand::Delete(id) => self.list_command(ClientsCommand::Delete(id)),
            ShellCommand::New => self.open_form(None),
            ShellCommand::Open(id) => self.open_form(Some(id)),
            ShellCommand::Form(field, value) => match self.form.as_mut() {
                Some(form) => {
                    form.set_field(field, &value);
                    self.form_lines()
                }
                None => vec!["no form is open -- start one with `new` or `open <id>`".to_owned()],
            },
            ShellCommand::Submit => self.submit_form(Instant::now()),
            ShellCommand::Close => match self.form.take() {
                Some(mut form) => {
                    form.teardown();
                    vec!["form closed".to_owned()]
                }
                None => vec!["no form is open".to_owned()],
            },
        };
        ShellOutput { lines, quit: false }
    }

    /// Sends a form request whose latency elapsed, then drives the form's
    /// auto-reset. A record-changed notice reloads the list.
    pub fn tick(&mut self, now: Instant) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(in_flight) = self
            .in_flight
            .take_if(|in_flight| in_flight.send_at.is_due(now))
        {
            let result = self.page.send_submit(in_flight.pending, &mut self.store);
            match self.form.as_mut() {
                Some(form) => {
                    form.finish_submit(&result, now);
                    lines.extend(self.form_lines());
                }
                None => debug!(ok = result.is_ok(), "form closed before its submission resolved"),
            }
        }

        let Some(form) = self.form.as_mut() else {
            return lines;
        };
        let events = form.tick(now);
        for event in events {
            match event {
                FormEvent::RecordChanged => {
                    self.dispatch(ClientsCommand::RecordChanged);
                    lines.extend(self.table_with_status());
                }
                FormEvent::Reset => lines.push("form ready".to_owned()),
            }
        }
        lines
    }

    fn dispatch(&mut self, command: ClientsCommand) {
        let events = self.page.dispatch(command, &mut self.store, &self.auth);
        debug!(?events, "page events");
    }

    fn list_command(&mut self, command: ClientsCommand) -> Vec<String> {
        self.dispatch(command);
        self.table_with_status()
    }

    fn open_form(&mut self, id: Option<ClientId>) -> Vec<String> {
        if self.in_flight.is_some() {
            return vec!["a submission is in flight -- wait for it before switching forms".to_owned()];
        }
        let record = match id {
            Some(id) => match self.page.records().get(id) {
                Some(record) => Some(record.clone()),
                None => return vec![RecordError::NotFound(id).to_string()],
            },
            None => None,
        };
        match self.form.as_mut() {
            Some(form) => {
                form.reinitialize(record.as_ref());
            }
            None => {
                self.form = Some(match &record {
                    Some(record) => CreateFormSession::for_record(record, self.timing),
                    None => CreateFormSession::new(self.timing),
                });
            }
        }
        self.form_lines()
    }

    /// Starts a submission. The request goes out from `tick` once the
    /// configured latency has passed, so `Submitting` stays visible meanwhile.
    fn submit_form(&mut self, now: Instant) -> Vec<String> {
        let Some(form) = self.form.as_mut() else {
            return vec!["no form is open -- start one with `new` or `open <id>`".to_owned()];
        };
        let mut lines = match form.begin_submit(&self.auth) {
            Ok(Some(pending)) => {
                self.in_flight = Some(InFlightSubmit {
                    pending,
                    send_at: Countdown::start(now, self.timing.latency),
                });
                if self.timing.latency.is_zero() {
                    return self.tick(now);
                }
                Vec::new()
            }
            Ok(None) => vec![
                "submit ignored -- a submission is in flight or still showing".to_owned(),
            ],
            Err(error) => {
                debug!(%error, "form submit rejected");
                Vec::new()
            }
        };
        lines.extend(self.form_lines());
        lines
    }

    fn table_with_status(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(status) = &self.page.status_line {
            lines.push(status.clone());
        }
        lines.extend(self.table_lines());
        lines
    }

    fn table_lines(&self) -> Vec<String> {
        let rows = self.page.visible_rows();
        let view = self.page.view();
        let mut lines = vec![format!(
            "  {:>4}  {:<20}  {:<12}  {:<16}  {:<10}  {}",
            "id", "owner", "license", "phone", "born", "address"
        )];
        if rows.is_empty() {
            lines.push("  (no clients)".to_owned());
        }
        for record in rows {
            lines.push(self.row_line(record));
        }
        if let Some(error) = self.page.edit().error() {
            lines.push(format!("  edit error: {error}"));
        }
        lines.push(format!(
            "  page {}/{} · {} per page · {} of {} clients{}",
            view.page() + 1,
            self.page.page_count().max(1),
            view.page_size(),
            self.page.match_count(),
            self.page.records().len(),
            if view.query().is_empty() {
                String::new()
            } else {
                format!(" · search \"{}\"", view.query())
            }
        ));
        lines
    }

    fn row_line(&self, record: &ClientRecord) -> String {
        let edit = self.page.edit();
        let marker = match edit.target() {
            Some(target) if target == record.id && edit.is_saving(target) => '~',
            Some(target) if target == record.id => '*',
            _ => ' ',
        };
        let value = |field| edit.display_value(field, record);
        let address = value(ClientField::Address).replace('\n', ", ");
        format!(
            "{marker} {:>4}  {:<20}  {:<12}  {:<16}  {:<10}  {}",
            record.id.get(),
            truncate(&record.owner_name, 20),
            truncate(&value(ClientField::LicenseNumber), 12),
            truncate(&value(ClientField::Phone), 16),
            value(ClientField::BirthDate),
            truncate(&address, ADDRESS_WIDTH),
        )
    }

    fn form_lines(&self) -> Vec<String> {
        let Some(form) = self.form.as_ref() else {
            return Vec::new();
        };
        let title = match form.mode() {
            FormMode::Create => "new client".to_owned(),
            FormMode::Edit(id) => format!("client {id}"),
        };
        let state = match form.state() {
            SubmissionState::Idle => "ready".to_owned(),
            SubmissionState::Submitting => "submitting...".to_owned(),
            SubmissionState::Succeeded => "saved".to_owned(),
            SubmissionState::Failed(message) => format!("failed: {message}"),
        };
        let mut lines = vec![format!("form: {title} [{state}]")];
        for field in ClientField::ALL {
            let touched = if form.touched().contains(&field) {
                '*'
            } else {
                ' '
            };
            lines.push(format!(
                "{touched} {:<15} {}",
                field.label(),
                form.input().value(field).replace('\n', "\\n")
            ));
        }
        if let Some(feedback) = form.feedback() {
            let kind = match feedback.kind {
                FeedbackKind::Success => "ok",
                FeedbackKind::Error => "error",
            };
            lines.push(format!("{kind}: {}", feedback.message));
        }
        lines
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_owned();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn help_lines() -> Vec<String> {
    [
        "list                     show the current page",
        "search <text>            filter by owner, license number, or phone",
        "page <n> | next | prev   move between pages",
        "size <n>                 rows per page (5, 10, or 25)",
        "reload                   fetch the list again",
        "edit <id>                edit a row inline",
        "set <field> <value>      change a field of the row being edited",
        "save | cancel            save or drop the inline edit",
        "delete <id>              delete a client",
        "new | open <id>          open the full form empty or for a client",
        "form <field> <value>     fill a form field (use \\n for line breaks)",
        "submit | close           send or close the form",
        "quit                     leave",
        "fields: license_number, phone, address, birth_date (YYYY-MM-DD)",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

/// Reads stdin on a helper thread and ticks the shell between lines.
pub fn run_shell<S: RemoteStore, A: AuthProvider>(mut shell: Shell<S, A>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_lines(&mut out, &shell.start())?;
    print_prompt(&mut out)?;

    let (tx, rx) = mpsc::channel::<io::Result<String>>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                let line = line.context("read command")?;
                if line.trim().is_empty() {
                    print_prompt(&mut out)?;
                    continue;
                }
                let output = shell.handle_line(&line);
                print_lines(&mut out, &output.lines)?;
                if output.quit {
                    break;
                }
                print_prompt(&mut out)?;
            }
            Err(RecvTimeoutError::Timeout) => {
                let lines = shell.tick(Instant::now());
                if !lines.is_empty() {
                    writeln!(out).context("write output")?;
                    print_lines(&mut out, &lines)?;
                    print_prompt(&mut out)?;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

fn print_lines(out: &mut impl Write, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(out, "{line}").context("write output")?;
    }
    Ok(())
}

fn print_prompt(out: &mut impl Write) -> Result<()> {
    write!(out, "> ").context("write prompt")?;
    out.flush().context("flush prompt")
}
