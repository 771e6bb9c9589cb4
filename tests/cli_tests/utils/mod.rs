use std::{
    io::Write,
    process::{Output, Stdio},
};

#[derive(Debug, Default)]
/// A single invocation of the tessera binary.
pub(crate) struct TesseraCommand {
    args: Vec<String>,
    stdin: Option<String>,
}

impl TesseraCommand {
    pub(crate) fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
        }
    }

    pub(crate) fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Run the command, returning its output whatever its exit status.
    pub(crate) fn output(self) -> Output {
        let mut child = escargot::CargoBuild::new()
            .package("tessera-cli")
            .bin("tessera")
            .target_dir("./target/")
            .run()
            .unwrap()
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .args(&self.args)
            .spawn()
            .unwrap();

        let mut stdin = child.stdin.take().unwrap();
        if let Some(input) = &self.stdin {
            stdin.write_all(input.as_bytes()).unwrap();
        }
        drop(stdin);

        child.wait_with_output().unwrap()
    }

    /// Run the command, expecting it to succeed, and return its stdout.
    pub(crate) fn run(self) -> String {
        let output = self.output();
        assert!(
            output.status.success(),
            "tessera failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }
}
