// src/bin/chat.rs
// A line ending in `\` continues the message (shift+enter); any other line sends it.

use chat_dashboard::client::{
    form::Key,
    scroll::{spawn_scroller, SCROLL_DEBOUNCE},
    ChatForm, ChatSession, ClientError, Entry, FormEvent, HttpRpcClient,
};
use chat_dashboard::config::Settings;
use chat_dashboard::models::auth::UserResponse;
use chat_dashboard::models::chat::Role;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let settings = Settings::from_env();
    let base_url = std::env::var("CHAT_SERVER_URL").unwrap_or_else(|_| settings.site_url.clone());
    let sign_up = std::env::args().any(|arg| arg == "--sign-up");

    println!("💬 chat-dashboard ({})", base_url);
    println!("==========================================");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut client = HttpRpcClient::new(&base_url)?;
    let user = match authenticate(&mut client, &mut input, sign_up).await? {
        Some(user) => user,
        None => return Ok(()),
    };
    println!("✅ Signed in as {}", user.email);

    let api = Arc::new(client);
    let mut session = ChatSession::new(api.clone(), user.id.to_string());
    let cancel = session.cancellation_token();

    // the transcript is redrawn from the scroller, not after each call
    let (redraw_tx, mut redraw_rx) = mpsc::unbounded_channel();
    let (scroll, _scroller) = spawn_scroller(SCROLL_DEBOUNCE, cancel.clone(), move || {
        let _ = redraw_tx.send(());
    });
    session = session.with_scroll(scroll);
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    // models and history share one request
    match api.prefetch().await {
        Ok(prefetched) => session.prime(prefetched.models.ok(), prefetched.history.ok()),
        Err(e) => tracing::warn!("prefetch failed: {}", e),
    }

    let mut form = ChatForm::new(settings.default_model_tag.clone());
    match session.load_models().await {
        Ok(models) => form.set_catalog(&models),
        Err(e) => {
            eprintln!("⚠️  Error loading models: {}", e);
            form.catalog_failed();
        }
    }
    let _ = session.load_history().await;
    let mut shown = 0;
    println!("Model: {}   (/models, /model <tag>, /quit)", form.model());

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            Some(()) = redraw_rx.recv() => {
                shown = render_tail(session.conversation().entries(), shown);
                continue;
            }
            line = input.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };

        match line.trim() {
            "/quit" => break,
            "/models" => {
                for tag in form.catalog() {
                    let marker = if tag == form.model() { "*" } else { " " };
                    println!(" {} {}", marker, tag);
                }
                continue;
            }
            command if command.starts_with("/model ") => {
                let tag = command.trim_start_matches("/model ").trim();
                match form.select_model(tag) {
                    Ok(()) => println!("Model: {}", form.model()),
                    Err(e) => eprintln!("⚠️  {}", e),
                }
                continue;
            }
            _ => {}
        }

        let (text, continued) = match line.strip_suffix('\\') {
            Some(text) => (text, true),
            None => (line.as_str(), false),
        };
        for c in text.chars() {
            form.handle_key(Key::Char(c));
        }

        match form.handle_key(Key::Enter { shift: continued }) {
            FormEvent::Edited => {}
            FormEvent::Rejected => {
                if let Some(error) = form.error() {
                    eprintln!("⚠️  {}", error);
                }
            }
            FormEvent::Submit(submission) => {
                let outcome = session.submit(&submission.model_tag, &submission.content).await;
                form.finish_submission();
                match outcome {
                    Ok(_) => {}
                    Err(ClientError::Cancelled) => break,
                    Err(e) => eprintln!("❌ Failed to send message: {}", e),
                }
            }
        }
    }

    session.logout();
    println!("👋 Bye");
    Ok(())
}

async fn authenticate(
    client: &mut HttpRpcClient,
    input: &mut Input,
    sign_up: bool,
) -> Result<Option<UserResponse>, Box<dyn std::error::Error>> {
    loop {
        print!("Email: ");
        io::stdout().flush()?;
        let email = match input.next_line().await? {
            Some(email) => email.trim().to_string(),
            None => return Ok(None),
        };
        let password = rpassword::prompt_password("Password: ")?;

        let result = if sign_up {
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            client.sign_up(&email, &password, &confirm).await
        } else {
            client.sign_in(&email, &password).await
        };

        match result {
            Ok(user) => return Ok(Some(user)),
            Err(e) => eprintln!("❌ {}", e),
        }
    }
}

/// Prints the messages after the first `shown` and returns the new count.
/// A pending reply is shown as a typing line but not counted.
fn render_tail(entries: &[Entry], shown: usize) -> usize {
    let mut shown = shown.min(entries.len());
    for entry in &entries[shown..] {
        match entry {
            Entry::Message(message) => {
                let who = match message.role {
                    Role::User => "You",
                    Role::Assistant => "Assistant",
                    Role::System => "System",
                };
                let tag = if message.model_tag.is_empty() {
                    String::new()
                } else {
                    format!(" · {}", message.model_tag)
                };
                println!(
                    "[{}] {}{}: {}",
                    message.created_at.format("%H:%M:%S"),
                    who,
                    tag,
                    message.content
                );
                shown += 1;
            }
            Entry::PendingReply { .. } => {
                println!("   … typing");
                break;
            }
        }
    }
    shown
}
