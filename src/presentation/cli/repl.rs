use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};

use crate::application::services::{ChatSession, ChatSnapshot, ScrollRequest, SendOutcome};
use crate::domain::{ConversationId, ImageAttachment};

use super::{HELP, ReplCommand, SnapshotRenderer};

/// Line-oriented front end over a [`ChatSession`]. Sends and history loads
/// run on their own tasks so `/new` and `/open` stay usable mid-stream.
pub struct ChatRepl {
    session: ChatSession,
}

impl ChatRepl {
    pub fn new(session: ChatSession) -> Self {
        Self { session }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let render = tokio::spawn(render_loop(
            self.session.subscribe(),
            self.session.scroll_requests(),
        ));

        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match ReplCommand::parse(&line) {
                Ok(ReplCommand::Quit) => break,
                Ok(command) => self.dispatch(command).await,
                Err(message) => println!("{}", message),
            }
        }

        self.session.reset_for_new_conversation();
        render.abort();
        Ok(())
    }

    async fn dispatch(&self, command: ReplCommand) {
        match command {
            ReplCommand::Send(text) => {
                let session = self.session.clone();
                tokio::spawn(async move { report(session.send(&text, None).await) });
            }
            ReplCommand::Retry => {
                let session = self.session.clone();
                tokio::spawn(async move { report(session.retry_last_user_message().await) });
            }
            ReplCommand::Image(path) => match ImageAttachment::from_path(&path).await {
                Ok(image) => {
                    println!("attached {} ({} bytes)", image.filename, image.size_bytes());
                    self.session.set_pending_image(Some(image));
                }
                Err(e) => println!("cannot read {}: {}", path.display(), e),
            },
            ReplCommand::NoImage => self.session.set_pending_image(None),
            ReplCommand::Dismiss => self.session.clear_error(),
            ReplCommand::New => self.session.reset_for_new_conversation(),
            ReplCommand::Open(id) => {
                let session = self.session.clone();
                tokio::spawn(async move {
                    if let Err(e) = session.load_history(ConversationId::new(id)).await {
                        tracing::warn!(conversation_id = id, error = %e, "Opening conversation failed");
                    }
                });
            }
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => {}
        }
    }
}

fn report(outcome: SendOutcome) {
    match outcome {
        SendOutcome::Completed | SendOutcome::Failed(_) => {}
        SendOutcome::Rejected(rejection) => println!("(not sent: {:?})", rejection),
        SendOutcome::Cancelled => tracing::debug!("Turn cancelled"),
    }
}

async fn render_loop(
    mut updates: watch::Receiver<ChatSnapshot>,
    mut scrolls: broadcast::Receiver<ScrollRequest>,
) {
    let mut renderer = SnapshotRenderer::new();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let output = renderer.render(&updates.borrow_and_update());
                if stdout.write_all(output.as_bytes()).await.is_err() {
                    break;
                }
                let _ = stdout.flush().await;
            }
            scroll = scrolls.recv() => match scroll {
                Ok(request) => {
                    tracing::trace!(message_count = request.message_count, "Scroll to latest");
                    let _ = stdout.flush().await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Scroll requests lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}
