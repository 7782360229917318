use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Line-oriented terminal input.
pub struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Next trimmed input line, or `None` at end of input.
    ///
    /// Cancel safe, so it can race a timer inside `tokio::select!`.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_owned()))
    }

    /// Print `label` without a newline and read the answer.
    pub async fn prompt(&mut self, label: &str) -> std::io::Result<Option<String>> {
        print!("{label}: ");
        std::io::stdout().flush()?;
        self.next_line().await
    }

    /// Like `prompt`, but treats end of input as an error.
    pub async fn require(&mut self, label: &str) -> std::io::Result<String> {
        self.prompt(label).await?.ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "input closed")
        })
    }
}
