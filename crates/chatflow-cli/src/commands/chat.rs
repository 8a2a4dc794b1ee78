use anyhow::{Context, Result};
use chatflow_application::{
    sources_markup, Pacer, SessionIdentityManager, StreamOrchestrator, SyncAgent,
};
use chatflow_core::config::PacerConfig;
use chatflow_core::delivery::{SessionClearNotifier, TranscriptDelivery};
use chatflow_core::session::NavigationKind;
use chatflow_core::transcript::Transcript;
use chatflow_infrastructure::{ActiveTranscriptStore, DurableTranscriptStore, IdentityStore};
use chatflow_transport::{AssistantClient, HttpTranscriptDelivery, TransportConfig};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

pub async fn run(no_stream: bool, reload: bool, page_url: Option<String>) -> Result<()> {
    let transport = TransportConfig::load().context("failed to load transport configuration")?;
    let client = AssistantClient::new(transport.clone());

    let identity = Arc::new(IdentityStore::default_location()?);
    let active = Arc::new(ActiveTranscriptStore::default_location()?);
    let durable = Arc::new(DurableTranscriptStore::default_location()?);

    let manager = SessionIdentityManager::new(
        Arc::clone(&identity),
        Arc::clone(&active),
        Arc::new(client.clone()) as Arc<dyn SessionClearNotifier>,
    );
    let navigation = if reload {
        NavigationKind::Reload
    } else {
        NavigationKind::Navigate
    };
    let session = manager.establish(navigation)?;

    // Resume the durable transcript if one survived a previous run,
    // otherwise start fresh.
    let transcript = durable
        .load(&session.session_id)?
        .unwrap_or_else(|| Transcript::new(&session.session_id, &session.visitor_id));
    if !transcript.is_empty() {
        println!("-- resuming conversation ({} messages) --", transcript.len());
        for message in transcript.messages() {
            let who = match message.role {
                chatflow_core::message::MessageRole::User => "you",
                chatflow_core::message::MessageRole::Assistant => "assistant",
            };
            println!("[{who}] {}", message.content);
        }
    }
    let transcript = Arc::new(Mutex::new(transcript));

    let delivery = Arc::new(HttpTranscriptDelivery::new(&transport)) as Arc<dyn TranscriptDelivery>;
    let sync = Arc::new(SyncAgent::new(
        Arc::clone(&transcript),
        delivery,
        Arc::clone(&durable),
    ));

    let mut orchestrator = StreamOrchestrator::new(
        session.clone(),
        transcript,
        Arc::new(client),
        Pacer::new(PacerConfig::default()),
        sync,
        active,
    );
    if let Some(url) = page_url {
        orchestrator = orchestrator.with_page_url(url);
    }

    println!("session {} (visitor {})", session.session_id, session.visitor_id);
    println!("type a message, or 'exit' to quit");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "exit" || message == "quit" {
            break;
        }

        if no_stream || !transport.use_stream {
            let turn = orchestrator.send_json(message).await?;
            println!("{}", turn.content);
            if !turn.sources.is_empty() {
                println!("{}", sources_markup(&turn.sources));
            }
        } else {
            let mut shown = String::new();
            let turn = orchestrator
                .send_streaming(message, |safe| {
                    // Print only what the reveal added; re-print in full when
                    // sanitization rewrote earlier output.
                    if let Some(suffix) = safe.strip_prefix(shown.as_str()) {
                        print!("{suffix}");
                    } else {
                        print!("\n{safe}");
                    }
                    let _ = io::stdout().flush();
                    shown = safe.to_string();
                })
                .await?;
            println!();
            if turn.failed {
                tracing::debug!("turn ended with an error notice");
            }
        }
    }

    orchestrator.dispose();
    Ok(())
}
