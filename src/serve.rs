//! Line-delimited JSON transport
//!
//! Each input line is one request `{"id", "method", "params"}`; each
//! output line is either a response `{"id", "result"}` / `{"id", "error"}`
//! or a host log event `{"method": "log", "params": {...}}`. Requests are
//! served concurrently, so responses may come back in any order.

use anyhow::{Context, Result, anyhow};
use declarative::{HostLogger, ResourceProvider, Severity, Urn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl Response {
    fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, message: String) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody { message }),
        }
    }
}

#[derive(Debug, Serialize)]
struct LogEvent<'a> {
    method: &'static str,
    params: LogParams<'a>,
}

#[derive(Debug, Serialize)]
struct LogParams<'a> {
    severity: Severity,
    urn: &'a Urn,
    message: &'a str,
}

/// Writer shared by responses and log events; one message per line
pub struct Outbox<W> {
    writer: Mutex<W>,
}

impl<W: Write> Outbox<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    fn send(&self, message: &impl Serialize) -> io::Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("output lock poisoned"))?;
        writer.write_all(&line)?;
        writer.flush()
    }
}

impl<W: Write + Send> HostLogger for Outbox<W> {
    fn log(&self, severity: Severity, urn: &Urn, message: &str) {
        let event = LogEvent {
            method: "log",
            params: LogParams {
                severity,
                urn,
                message,
            },
        };
        if let Err(e) = self.send(&event) {
            log::warn!("Failed to forward log line: {e}");
            log::log!(severity.into(), "[{}] {message}", urn.name());
        }
    }
}

/// Serve requests from `input` until it is exhausted
///
/// At most `jobs` requests run at once. Returns after every started
/// request has been answered.
pub fn serve<P, R, W>(provider: &P, input: R, outbox: &Outbox<W>, jobs: usize) -> Result<()>
where
    P: ResourceProvider + ?Sized,
    R: BufRead,
    W: Write + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|i| format!("rpc-{i}"))
        .build()
        .context("Failed to create request thread pool")?;

    log::info!("Serving with {} worker(s)", jobs.max(1));

    pool.in_place_scope(|scope| {
        for line in input.lines() {
            let line = line.context("Failed to read request")?;
            if line.trim().is_empty() {
                continue;
            }
            scope.spawn(move |_| {
                let response = handle_line(provider, &line);
                if let Err(e) = outbox.send(&response) {
                    log::error!("Failed to write response: {e}");
                }
            });
        }
        Ok(())
    })
}

fn handle_line<P: ResourceProvider + ?Sized>(provider: &P, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return Response::failure(Value::Null, format!("invalid request: {e}")),
    };

    log::debug!("{} {}", request.method, request.id);
    match dispatch(provider, &request.method, request.params) {
        Ok(result) => Response::success(request.id, result),
        Err(e) => {
            log::warn!("{} failed: {e:#}", request.method);
            Response::failure(request.id, format!("{e:#}"))
        }
    }
}

fn dispatch<P: ResourceProvider + ?Sized>(
    provider: &P,
    method: &str,
    params: Value,
) -> Result<Value> {
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    match method {
        "CheckConfig" => call(params, |req| provider.check_config(req)),
        "DiffConfig" => call(params, |req| provider.diff_config(req)),
        "Configure" => call(params, |req| provider.configure(req)),
        "Invoke" => call(params, |req| provider.invoke(req)),
        "StreamInvoke" => call(params, |req| provider.stream_invoke(req)),
        "Check" => call(params, |req| provider.check(req)),
        "Diff" => call(params, |req| provider.diff(req)),
        "Create" => call(params, |req| provider.create(req)),
        "Read" => call(params, |req| provider.read(req)),
        "Update" => call(params, |req| provider.update(req)),
        "Delete" => call(params, |req| provider.delete(req)),
        "Construct" => call(params, |req| provider.construct(req)),
        "Call" => call(params, |req| provider.call(req)),
        "GetSchema" => call(params, |req| provider.get_schema(req)),
        "GetPluginInfo" => Ok(serde_json::to_value(provider.get_plugin_info()?)?),
        "Cancel" => {
            provider.cancel()?;
            Ok(Value::Null)
        }
        other => Err(anyhow!("unknown method '{other}'")),
    }
}

fn call<Req, Resp>(
    params: Value,
    handler: impl FnOnce(Req) -> declarative::Result<Resp>,
) -> Result<Value>
where
    Req: DeserializeOwned,
    Resp: Serialize,
{
    let request = serde_json::from_value(params).context("invalid request parameters")?;
    let response = handler(request)?;
    Ok(serde_json::to_value(response)?)
}
