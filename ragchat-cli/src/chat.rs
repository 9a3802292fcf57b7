//! Interactive chat loop on top of the session store

use anyhow::{anyhow, bail, Result};
use console::style;
use ragchat_core::models::Session;
use ragchat_session::{SessionStore, StoreError, StoreEvent};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::warn;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

pub struct ChatOptions {
    pub session: Option<String>,
    pub domain: Option<i64>,
    pub scenario: Option<i64>,
}

pub async fn run(store: SessionStore, opts: ChatOptions) -> Result<()> {
    if let Some(domain) = opts.domain {
        store.set_selected_domain(domain).await?;
    }
    if let Some(scenario) = opts.scenario {
        store.set_selected_scenario(scenario).await?;
    }

    let mut events = store.subscribe();
    let session_id = match opts.session {
        Some(id) => {
            let session = store.get_session(&id).await?;
            print_history(&session);
            id
        }
        None => store.create_session().await?,
    };

    wait_connected(&mut events).await?;

    let selection = store.selection().await;
    println!(
        "{} session {}",
        style("Connected:").green().bold(),
        style(&session_id).bold()
    );
    println!(
        "  domain: {}  scenario: {}",
        describe(selection.domain_id),
        describe(selection.scenario_id)
    );
    println!("{}", style("Type /quit to exit, /cancel or Ctrl+C to stop waiting.").dim());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/cancel" => {
                store.cancel_request().await;
                continue;
            }
            text => {
                drain(&mut events);
                match store.send_message(text).await {
                    Ok(()) => {}
                    Err(StoreError::NoActiveSession) => {
                        println!("{}", style("Not connected yet, try again in a moment.").yellow());
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }

                if !stream_answer(&store, &mut events).await? {
                    break;
                }
            }
        }
    }

    store.disconnect().await;
    Ok(())
}

async fn wait_connected(events: &mut broadcast::Receiver<StoreEvent>) -> Result<()> {
    let waited = tokio::time::timeout(CONNECT_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(StoreEvent::Connected { .. }) => return Ok(()),
                Ok(StoreEvent::ReconnectExhausted { .. }) => bail!("Could not connect to the chat socket"),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => bail!("Session store closed"),
            }
        }
    })
    .await;

    waited.map_err(|_| anyhow!("Timed out waiting for the chat socket"))?
}

/// Print chunks until the answer ends. Returns false once the connection is gone for good.
async fn stream_answer(
    store: &SessionStore,
    events: &mut broadcast::Receiver<StoreEvent>,
) -> Result<bool> {
    let mut stdout = std::io::stdout();
    print!("{} ", style("bot>").magenta().bold());
    stdout.flush()?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(StoreEvent::Chunk { content }) => {
                    print!("{}", content);
                    stdout.flush()?;
                }
                Ok(StoreEvent::AnswerFinished) => {
                    println!();
                    return Ok(true);
                }
                Ok(StoreEvent::ChatError { message }) => {
                    println!("\n{} {}", style("error:").red().bold(), message);
                    return Ok(true);
                }
                Ok(StoreEvent::Reconnecting { attempt, delay, .. }) => {
                    println!(
                        "\n{}",
                        style(format!("connection lost, retry {} in {:?}", attempt, delay)).yellow()
                    );
                }
                Ok(StoreEvent::Connected { .. }) => {
                    println!("{}", style("reconnected, the answer was interrupted").yellow());
                    return Ok(true);
                }
                Ok(StoreEvent::ReconnectExhausted { .. }) => {
                    println!("{}", style("connection lost, giving up").red().bold());
                    return Ok(false);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Dropped {} chat events", skipped),
                Err(RecvError::Closed) => return Ok(false),
            },
            _ = tokio::signal::ctrl_c() => {
                store.cancel_request().await;
                println!("\n{}", style("cancelled").yellow());
                return Ok(true);
            }
        }
    }
}

/// Discard events left over from the previous answer
fn drain(events: &mut broadcast::Receiver<StoreEvent>) {
    loop {
        match events.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

fn prompt() -> Result<()> {
    print!("{} ", style(">").cyan().bold());
    std::io::stdout().flush()?;
    Ok(())
}

fn print_history(session: &Session) {
    let title = if session.title.is_empty() {
        "(untitled)"
    } else {
        session.title.as_str()
    };
    println!("{}", style(title).bold().cyan());

    for pair in &session.content {
        println!("{} {}", style(">").cyan().bold(), pair.query.content);
        println!("{} {}", style("bot>").magenta().bold(), pair.response.content);
    }
    println!();
}

fn describe(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}
