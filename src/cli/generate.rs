//! `gemi generate`: one prompt, one reply.

use std::future::Future;
use std::io::{self, Write};

use crate::accumulating_stream::AccumulatingStream;
use crate::backend::GenerativeBackend;
use crate::cli::config::{GenerateConfig, GlobalConfig};
use crate::cli::{models, spinner};
use crate::render::Renderer;
use crate::{Error, Result};

/// The text of a streamed reply and whether the user cut it short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamedReply {
    pub text: String,
    pub interrupted: bool,
}

/// The Markdown echo of `prompt` printed before the reply.
pub fn prompt_markdown(prompt: &str) -> String {
    format!("# Prompt\n\n```\n{prompt}\n```\n\n# Response\n")
}

pub async fn run(global: &GlobalConfig, config: GenerateConfig) -> Result<()> {
    if config.list_models {
        return models::run(global).await;
    }
    if config.prompt.trim().is_empty() {
        return Err(Error::validation(
            "Prompt is required. Use --prompt flag.",
            Some("prompt".to_string()),
        ));
    }
    let client = global.client(config.model.clone())?;
    tracing::debug!(model = %config.model, stream = config.stream, "generating");

    let mut renderer = global.renderer();
    renderer.print_markdown(&prompt_markdown(&config.prompt));

    if config.stream {
        let stream = AccumulatingStream::new(renderer.markdown(), io::stdout());
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "could not listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        let reply = stream_reply(&client, &config.prompt, stream, ctrl_c).await?;
        if reply.interrupted {
            renderer.print_interrupted();
        }
        if let Some(path) = &config.output {
            renderer.print_warning(&format!(
                "--output is ignored with --stream; {} was not written",
                path.display()
            ));
        }
        return Ok(());
    }

    let progress = spinner("Generating ");
    let reply = client.generate_text(&config.prompt).await;
    progress.finish_and_clear();
    let text = reply?;
    renderer.print_markdown(&text);

    if let Some(path) = &config.output {
        std::fs::write(path, &text)
            .map_err(|err| Error::io(format!("could not save to {}", path.display()), err))?;
        renderer.print_success(&format!("Response saved to {}", path.display()));
    }
    Ok(())
}

/// Streams the reply to `prompt` into `stream`.
///
/// The request is abandoned as soon as `interrupt` completes, even while the
/// backend is waiting on the network; the text received until then is
/// returned rather than an error.  A failed request reports its own error
/// ahead of any failure to finish the output.
pub async fn stream_reply<B, W, I>(
    backend: &B,
    prompt: &str,
    mut stream: AccumulatingStream<W>,
    interrupt: I,
) -> Result<StreamedReply>
where
    B: GenerativeBackend,
    W: Write + Send,
    I: Future<Output = ()>,
{
    let outcome = {
        let mut on_fragment = |text: &str| stream.on_fragment(text);
        tokio::select! {
            outcome = backend.send_prompt_streaming(prompt, &mut on_fragment) => Some(outcome),
            _ = interrupt => None,
        }
    };
    match outcome {
        Some(Ok(())) => Ok(StreamedReply {
            text: stream.finish()?,
            interrupted: false,
        }),
        Some(Err(err)) => {
            if let Err(finish) = stream.finish() {
                tracing::warn!(error = %finish, "could not finish streamed output");
            }
            Err(err)
        }
        None => {
            tracing::debug!("stream abandoned by Ctrl+C");
            Ok(StreamedReply {
                text: stream.finish()?,
                interrupted: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::backend::Conversation;
    use crate::markdown::{MarkdownStyle, TerminalMarkdown};
    use crate::types::{Model, ModelInfo};
    use async_trait::async_trait;

    struct Fragments {
        model: Model,
        fragments: Vec<&'static str>,
        fail_after: Option<usize>,
        stall: bool,
    }

    #[async_trait]
    impl GenerativeBackend for Fragments {
        fn model(&self) -> &Model {
            &self.model
        }

        fn start_session(&self) -> Conversation {
            Conversation::new(self.model.clone())
        }

        async fn send_prompt(&self, _: &mut Conversation, _: &str) -> Result<String> {
            Ok(self.fragments.concat())
        }

        async fn send_prompt_streaming(
            &self,
            _: &str,
            on_fragment: &mut (dyn for<'f> FnMut(&'f str) -> Result<()> + Send),
        ) -> Result<()> {
            for (idx, fragment) in self.fragments.iter().enumerate() {
                if self.fail_after == Some(idx) {
                    return Err(Error::connection("reset", None));
                }
                on_fragment(fragment)?;
            }
            if self.stall {
                pending::<()>().await;
            }
            Ok(())
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }

        async fn switch_model(&mut self, _: &str) -> Result<()> {
            Ok(())
        }
    }

    fn backend(fail_after: Option<usize>) -> Fragments {
        Fragments {
            model: Model::default(),
            fragments: vec!["Hel", "lo, ", "world"],
            fail_after,
            stall: false,
        }
    }

    /// Sends its first fragment and then waits forever on the network.
    fn stalled() -> Fragments {
        Fragments {
            model: Model::default(),
            fragments: vec!["Hel"],
            fail_after: None,
            stall: true,
        }
    }

    /// Accepts `budget` writes, then fails every one after.
    struct Flaky {
        budget: usize,
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            self.budget -= 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn stream_to<W: Write>(out: W) -> AccumulatingStream<W> {
        AccumulatingStream::new(Arc::new(TerminalMarkdown::new(MarkdownStyle::NoTty)), out)
            .with_columns(80)
    }

    fn stream() -> AccumulatingStream<Vec<u8>> {
        stream_to(Vec::new())
    }

    #[test]
    fn prompt_echo() {
        assert_eq!(
            prompt_markdown("Say hi"),
            "# Prompt\n\n```\nSay hi\n```\n\n# Response\n"
        );
    }

    #[tokio::test]
    async fn streamed_reply_is_concatenated() {
        let reply = stream_reply(&backend(None), "hi", stream(), pending())
            .await
            .unwrap();
        assert_eq!(reply.text, "Hello, world");
        assert!(!reply.interrupted);
    }

    #[tokio::test]
    async fn interrupt_before_first_fragment() {
        let reply = stream_reply(&stalled(), "hi", stream(), async {})
            .await
            .unwrap();
        assert!(reply.interrupted);
        assert!(reply.text.is_empty() || reply.text == "Hel");
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_while_waiting_keeps_partial_text() {
        let interrupt = tokio::time::sleep(Duration::from_millis(50));
        let reply = stream_reply(&stalled(), "hi", stream(), interrupt)
            .await
            .unwrap();
        assert_eq!(reply.text, "Hel");
        assert!(reply.interrupted);
    }

    #[tokio::test]
    async fn transport_failure_is_returned() {
        let err = stream_reply(&backend(Some(2)), "hi", stream(), pending())
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn transport_failure_outranks_output_failure() {
        // One frame gets drawn; the closing newline cannot be written.
        let out = stream_to(Flaky { budget: 1 });
        let err = stream_reply(&backend(Some(1)), "hi", out, pending())
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn missing_prompt_is_rejected() {
        let global = GlobalConfig::new().with_api_key("key");
        let config = GenerateConfig {
            prompt: "  ".to_string(),
            model: Model::default(),
            output: None,
            stream: false,
            list_models: false,
        };
        let err = run(&global, config).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Prompt is required"));
    }
}
