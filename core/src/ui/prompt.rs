use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

/// Line-based questions to the operator. Generic over the streams so runs
/// can be driven from scripted input.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{}", line)
    }

    /// Ask a question and read one line. `None` at end of input.
    pub fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Yes/no question, case-insensitive, asked again until the answer is
    /// recognized. An empty answer takes `default` when there is one; end
    /// of input takes `default`, or no.
    pub fn confirm(&mut self, question: &str, default: Option<bool>) -> io::Result<bool> {
        loop {
            let Some(answer) = self.ask(question)? else {
                self.say("")?;
                return Ok(default.unwrap_or(false));
            };

            match answer.to_lowercase().as_str() {
                "y" => return Ok(true),
                "n" => return Ok(false),
                "" if default.is_some() => return Ok(default.unwrap_or(false)),
                _ => self.say("Unrecognized response, please answer y or n.")?,
            }
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
