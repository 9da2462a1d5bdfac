//! Interactive command-line host.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::agent::{Agent, ConversationHistory};

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "salir"];
const RESET_COMMAND: &str = "/reset";

/// Read questions line by line and print each answer, until an exit command
/// or end of input.
pub async fn run<R, W>(agent: &Agent, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut history = ConversationHistory::new();
    let mut lines = reader.lines();

    writer
        .write_all(b"Ask me anything (type 'exit' to quit, '/reset' to start over).\n> ")
        .await?;
    writer.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();

        if EXIT_COMMANDS
            .iter()
            .any(|cmd| input.eq_ignore_ascii_case(cmd))
        {
            break;
        }

        if input == RESET_COMMAND {
            history.reset();
            writer.write_all(b"Conversation cleared.\n").await?;
        } else if !input.is_empty() {
            let output = agent.run_turn(&mut history, input).await;
            writer
                .write_all(format!("Assistant: {}\n", output.answer).as_bytes())
                .await?;
        }

        writer.write_all(b"> ").await?;
        writer.flush().await?;
    }

    Ok(())
}
