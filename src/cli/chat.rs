//! `gemi chat`: the interactive REPL around [`ChatSession`].

use std::io;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::backend::GenerativeBackend;
use crate::chat::{Action, ChatConfig, ChatSession};
use crate::cli::config::GlobalConfig;
use crate::cli::{models, spinner};
use crate::render::{PlainTextRenderer, Renderer, USER_LABEL};
use crate::{Error, Result};

pub async fn run(global: &GlobalConfig, config: ChatConfig) -> Result<()> {
    if config.list_models {
        return models::run(global).await;
    }
    let client = global.client(config.model.clone())?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color).with_markdown(global.markdown());
    let mut editor = DefaultEditor::new().map_err(readline_error)?;
    let mut session = ChatSession::new(client);

    renderer.print_title("Gemi Chat");
    renderer.print_info(&format!(
        "Chatting with {}. Type /help for commands, /quit to exit.",
        session.current_model()
    ));

    while !session.is_closed() {
        let line = match editor.readline(USER_LABEL) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                session.close();
                break;
            }
            Err(err) => return Err(readline_error(err)),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }
        if !run_line(&mut session, &line, &mut renderer).await {
            renderer.print_interrupted();
            break;
        }
    }

    renderer.print_info("Goodbye!");
    Ok(())
}

/// Handles one line of input, printing whatever it produces.
///
/// Returns false if the user pressed Ctrl+C while the line was being
/// processed, in which case the session is closed.
async fn run_line<B: GenerativeBackend>(
    session: &mut ChatSession<B>,
    line: &str,
    renderer: &mut dyn Renderer,
) -> bool {
    let action = match session.submit(line) {
        Ok(Some(action)) => action,
        Ok(None) => return true,
        Err(err) => {
            renderer.print_error(&err.to_string());
            return true;
        }
    };
    let shown = session.history().len();

    let progress = match action {
        Action::Prompt(_) => Some(spinner("Thinking ")),
        Action::SwitchModel(_) | Action::ListModels => Some(spinner("Working ")),
        Action::Help => None,
    };
    let outcome = tokio::select! {
        outcome = session.execute(action) => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    let Some(outcome) = outcome else {
        tracing::debug!("request abandoned by Ctrl+C");
        session.close();
        return false;
    };
    session.complete(outcome);

    for message in &session.history()[shown..] {
        if !message.is_user() {
            renderer.print_assistant(message.content());
        }
    }
    if let Some(err) = session.take_pending_error() {
        renderer.print_error(&err.to_string());
    }
    true
}

fn readline_error(err: ReadlineError) -> Error {
    match err {
        ReadlineError::Io(err) => Error::io("line editor failed", err),
        err => Error::io("line editor failed", io::Error::other(err.to_string())),
    }
}
