use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::sync::Mutex;
use std::thread;

/// Exit status and combined output of a streamed command
#[derive(Debug)]
pub struct Transcript {
    pub status: ExitStatus,
    /// stdout and stderr lines in the order they were forwarded
    pub output: String,
}

impl Transcript {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run a command, forwarding each stdout/stderr line to `on_line` as soon
/// as it is read
///
/// `stdin` is written to the child and then closed; without it the child
/// gets an empty stdin. Blocks until the child exits.
pub fn run_streaming<S, F>(
    program: &OsStr,
    args: &[S],
    stdin: Option<&[u8]>,
    on_line: F,
) -> io::Result<Transcript>
where
    S: AsRef<OsStr>,
    F: Fn(&str) + Sync,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;
    let pipe = child.stdin.take();

    let transcript = Mutex::new(String::new());
    let forward = |line: &str| {
        on_line(line);
        if let Ok(mut output) = transcript.lock() {
            output.push_str(line);
            output.push('\n');
        }
    };

    let streamed = thread::scope(|s| -> io::Result<()> {
        let writer = stdin
            .zip(pipe)
            .map(|(data, pipe)| s.spawn(move || feed(pipe, data)));
        let out = s.spawn(|| forward_lines(stdout, &forward));
        let err = s.spawn(|| forward_lines(stderr, &forward));

        let mut result = Ok(());
        for handle in [out, err] {
            let joined = handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("output reader panicked")));
            result = result.and(joined);
        }
        if let Some(handle) = writer {
            let joined = handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            result = result.and(joined);
        }
        result
    });

    // Reap the child even when a reader failed
    let status = child.wait()?;
    streamed?;

    Ok(Transcript {
        status,
        output: transcript.into_inner().unwrap_or_default(),
    })
}

/// Run a command and capture its output without streaming
pub fn run_capture<S: AsRef<OsStr>>(program: &OsStr, args: &[S]) -> io::Result<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
}

fn feed(mut pipe: impl Write, data: &[u8]) -> io::Result<()> {
    match pipe.write_all(data) {
        // The child may exit without reading its input
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn forward_lines(reader: impl Read, forward: &impl Fn(&str)) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        forward(line.trim_end_matches(['\n', '\r']));
    }
}
