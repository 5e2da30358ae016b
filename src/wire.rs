//! HTTP/JSON glue. A minimal synchronous server on `tiny_http`
//! and a blocking client on `ureq` — the synchronous counterparts to an
//! async framework/client pair, matching the rest of this crate's
//! thread-per-connection concurrency model rather than introducing an
//! async runtime for one layer of it.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::error::WireError;

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterResponse {
    pub client_id: u32,
    pub other_clients: HashMap<u32, String>,
    pub server_addr: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterConfirmBody {
    pub client_id: u32,
    pub client_addr: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BalanceResponse {
    pub balance: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ResultResponse {
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResultResponse {
    pub fn success() -> Self {
        Self {
            result: "success".to_string(),
            reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            result: "failure".to_string(),
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub addr: String,
    pub peer_count: usize,
}

// ---- client side -----------------------------------------------------

fn url(addr: &str, path: &str) -> String {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        format!("{addr}{path}")
    } else {
        format!("http://{addr}{path}")
    }
}

pub fn get_json<R: DeserializeOwned>(addr: &str, path: &str, timeout: Duration) -> Result<R, WireError> {
    let response = ureq::get(&url(addr, path))
        .timeout(timeout)
        .call()
        .map_err(|err| to_wire_error(addr, err))?;
    response.into_json().map_err(WireError::from)
}

pub fn post_json<B: Serialize, R: DeserializeOwned>(
    addr: &str,
    path: &str,
    body: &B,
    timeout: Duration,
) -> Result<R, WireError> {
    let response = ureq::post(&url(addr, path))
        .timeout(timeout)
        .send_json(serde_json::to_value(body)?)
        .map_err(|err| to_wire_error(addr, err))?;
    response.into_json().map_err(WireError::from)
}

fn to_wire_error(addr: &str, err: ureq::Error) -> WireError {
    match err {
        ureq::Error::Status(status, _) => WireError::Status {
            addr: addr.to_string(),
            status,
        },
        ureq::Error::Transport(transport) => {
            if transport.to_string().to_lowercase().contains("timed out") {
                WireError::Timeout {
                    addr: addr.to_string(),
                }
            } else {
                WireError::Connect {
                    addr: addr.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, transport.to_string()),
                }
            }
        }
    }
}

// ---- server side -------------------------------------------------------

/// Reads and deserializes the JSON body of an inbound request.
pub fn read_json_body<T: DeserializeOwned>(request: &mut Request) -> Result<T, WireError> {
    let mut body = String::new();
    request.as_reader().read_to_string(&mut body)?;
    Ok(serde_json::from_str(&body)?)
}

pub fn respond_json<T: Serialize>(request: Request, status: u16, body: &T) {
    let payload = serde_json::to_vec(body).expect("response types always serialize");
    let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("static header is valid");
    let response = Response::from_data(payload)
        .with_status_code(StatusCode(status))
        .with_header(header);
    let _ = request.respond(response);
}

pub fn respond_not_found(request: Request, error: impl Into<String>) {
    respond_json(request, 404, &ErrorResponse { error: error.into() });
}

pub fn respond_success(request: Request) {
    respond_json(request, 200, &ResultResponse::success());
}

pub fn respond_failure(request: Request, reason: impl Into<String>) {
    respond_json(request, 200, &ResultResponse::failure(reason));
}

/// Extracts the trailing path segment of routes shaped `/thing/{id}`.
pub fn path_tail_as_u32(url: &str) -> Option<u32> {
    url.rsplit('/').next()?.parse().ok()
}

pub fn method_and_path(request: &Request) -> (&Method, &str) {
    (request.method(), request.url())
}
