//! Background delivery of an exported file: SMTP email, or a WhatsApp Web
//! hand-off in the system browser. Jobs snapshot everything they need at
//! launch time and report back over the app event channel; they never touch
//! session state and cannot be cancelled.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::error::{Error, Result};
use crate::AppEvent;

/// Applies to the SMTP connection only; an accepted send runs to completion.
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone)]
pub enum SendOutcome {
    Sent { detail: String },
    /// The transport got as far as it can on its own; the user finishes in
    /// the opened browser session.
    ManualFinishRequired { detail: String },
}

impl SendOutcome {
    pub fn detail(&self) -> &str {
        match self {
            SendOutcome::Sent { detail } => detail,
            SendOutcome::ManualFinishRequired { detail } => detail,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailJob {
    /// "host:port", e.g. "smtp.gmail.com:587".
    pub server: String,
    pub sender: String,
    pub password: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WhatsAppJob {
    /// International phone number without the leading '+'.
    pub phone: String,
    pub message: String,
    pub attachment: PathBuf,
}

pub fn spawn_email(job: EmailJob, events: Sender<AppEvent>) {
    thread::spawn(move || {
        let result = send_email(&job);
        let _ = events.send(AppEvent::Transport(result));
    });
}

pub fn spawn_whatsapp(job: WhatsAppJob, events: Sender<AppEvent>) {
    thread::spawn(move || {
        let result = open_whatsapp(&job);
        let _ = events.send(AppEvent::Transport(result));
    });
}

/// Deliver the attachment by SMTP with STARTTLS and credential auth.
pub fn send_email(job: &EmailJob) -> Result<SendOutcome> {
    let (host, port) = split_server(&job.server)?;
    let bytes = std::fs::read(&job.attachment).map_err(|e| Error::read(&job.attachment, e))?;
    let filename = job
        .attachment
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("export.xlsx")
        .to_string();

    let from: Mailbox = job
        .sender
        .parse()
        .map_err(|e| Error::Transport(format!("bad sender address '{}': {e}", job.sender)))?;
    let mut builder = Message::builder().from(from).subject(job.subject.clone());
    for recipient in &job.recipients {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| Error::Transport(format!("bad recipient '{recipient}': {e}")))?;
        builder = builder.to(to);
    }

    let content_type =
        ContentType::parse(XLSX_MIME).map_err(|e| Error::Transport(e.to_string()))?;
    let message = builder
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(job.body.clone()))
                .singlepart(Attachment::new(filename).body(bytes, content_type)),
        )
        .map_err(|e| Error::Transport(e.to_string()))?;

    let transport = SmtpTransport::starttls_relay(&host)
        .map_err(|e| Error::Transport(e.to_string()))?
        .port(port)
        .credentials(Credentials::new(job.sender.clone(), job.password.clone()))
        .timeout(Some(SMTP_TIMEOUT))
        .build();
    transport
        .send(&message)
        .map_err(|e| Error::Transport(e.to_string()))?;

    Ok(SendOutcome::Sent {
        detail: format!("email sent to {}", job.recipients.join(", ")),
    })
}

/// Open the prefilled WhatsApp Web chat in the system browser. The file
/// itself cannot be attached from outside the page, so success means
/// "finish manually in the opened chat".
pub fn open_whatsapp(job: &WhatsAppJob) -> Result<SendOutcome> {
    let url = whatsapp_url(job);
    open_in_browser(&url)
        .map_err(|e| Error::AutomationUi(format!("could not launch a browser: {e}")))?;
    Ok(SendOutcome::ManualFinishRequired {
        detail: format!(
            "chat with {} opened in your browser; attach {} there to finish",
            job.phone,
            job.attachment.display()
        ),
    })
}

fn whatsapp_url(job: &WhatsAppJob) -> String {
    format!(
        "https://web.whatsapp.com/send?phone={}&text={}",
        job.phone.trim(),
        urlencoding::encode(&job.message)
    )
}

fn open_in_browser(url: &str) -> std::io::Result<()> {
    let mut command = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };
    command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}

fn split_server(server: &str) -> Result<(String, u16)> {
    let (host, port) = server
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| Error::Transport(format!("expected host:port, got '{server}'")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| Error::Transport(format!("bad port in '{server}'")))?;
    Ok((host.to_string(), port))
}
