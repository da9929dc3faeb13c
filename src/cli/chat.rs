//! Interactive health chat on stdin/stdout.

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use flowfriend::chat::{
    ChatMessage, ChatSession, ChatState, MessageKind, RetryPolicy, Sender, TokioSleeper,
};
use flowfriend::llm;

use super::AppContext;

fn print_message(message: &ChatMessage) {
    match (message.sender, message.kind) {
        (Sender::User, _) => {}
        (Sender::Assistant, MessageKind::Retrying) => println!("  {}", message.text),
        (Sender::Assistant, _) => println!("floppy> {}", message.text),
    }
}

fn spinner_message(state: ChatState) -> String {
    match state {
        ChatState::Retrying { attempts_left, delay } => {
            let secs = delay.as_millis().div_ceil(1000);
            format!("waiting {secs}s before retrying ({attempts_left} attempts left)")
        }
        _ => "thinking...".to_string(),
    }
}

/// Run the chat loop until EOF or `/quit`.
pub async fn chat(ctx: &AppContext) -> Result<()> {
    let model = llm::create_model(&ctx.config.model)?;
    let policy = RetryPolicy::from(&ctx.config.chat);
    let mut session = ChatSession::with_retry(model, policy, Arc::new(TokioSleeper));

    println!("HEALTH CHAT  (type /quit to leave)");
    println!();
    for message in session.messages() {
        print_message(message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(spinner_message(ChatState::AwaitingResponse));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let mut states = session.watch_state();
        let progress = spinner.clone();
        let follower = tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = *states.borrow_and_update();
                progress.set_message(spinner_message(state));
            }
        });

        let appended = session.send(line).await.to_vec();
        follower.abort();
        spinner.finish_and_clear();

        for message in &appended {
            print_message(message);
        }
    }

    Ok(())
}
