use std::{collections::HashMap, net::IpAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::debug;

/// API key the stub refuses with 401.
pub const INVALID_KEY: &str = "invalid";

/// Address used for `/ip` when the request carries no `x-forwarded-for`.
pub const FALLBACK_CALLER: &str = "127.0.0.1";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeoRecord {
    pub ip: String,
    pub country: String,
    pub country_code: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupParams {
    pub key: Option<String>,
    pub format: Option<String>,
    pub callback: Option<String>,
}

/// Read-only record table shared by every request.
pub type Db = Arc<HashMap<String, GeoRecord>>;

#[derive(Debug, PartialEq)]
enum Rendering {
    Json,
    Xml,
    Yaml,
    Jsonp(String),
}

fn record(ip: &str, country: &str, code: &str, city: &str, lat: f64, lon: f64) -> GeoRecord {
    GeoRecord {
        ip: ip.to_string(),
        country: country.to_string(),
        country_code: code.to_string(),
        city: city.to_string(),
        latitude: lat,
        longitude: lon,
    }
}

/// Records the stub knows about out of the box.
pub fn seed() -> HashMap<String, GeoRecord> {
    [
        record("8.8.8.8", "United States", "US", "Mountain View", 37.386, -122.0838),
        record("1.1.1.1", "Australia", "AU", "Sydney", -33.8688, 151.2093),
        record("1.2.3.4", "United States", "US", "Los Angeles", 34.0522, -118.2437),
        record("2001:4860:4860::8888", "United States", "US", "Mountain View", 37.386, -122.0838),
        record(FALLBACK_CALLER, "Loopback", "ZZ", "Localhost", 0.0, 0.0),
    ]
    .into_iter()
    .map(|r| (r.ip.clone(), r))
    .collect()
}

pub fn app() -> Router {
    app_with(seed())
}

pub fn app_with(records: HashMap<String, GeoRecord>) -> Router {
    let db: Db = Arc::new(records);
    Router::new()
        .route("/ip", get(lookup_caller))
        .route("/ip/{ip}", get(lookup_ip))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn lookup_caller(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<LookupParams>,
) -> Response {
    let ip = caller_ip(&headers);
    respond(&db, &ip, params)
}

async fn lookup_ip(
    State(db): State<Db>,
    Path(ip): Path<String>,
    Query(params): Query<LookupParams>,
) -> Response {
    respond(&db, &ip, params)
}

fn caller_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(FALLBACK_CALLER)
        .to_string()
}

fn respond(db: &Db, ip: &str, params: LookupParams) -> Response {
    debug!(ip, format = ?params.format, "stub lookup");

    let rendering = match params.format.as_deref().unwrap_or("") {
        "" | "json" => Rendering::Json,
        "xml" => Rendering::Xml,
        "yaml" => Rendering::Yaml,
        "jsonp" => Rendering::Jsonp(
            params
                .callback
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "callback".to_string()),
        ),
        other => {
            return (StatusCode::BAD_REQUEST, format!("unsupported format: {other}")).into_response()
        }
    };

    if params.callback.is_some() && !matches!(rendering, Rendering::Jsonp(_)) {
        return render(
            &Rendering::Json,
            StatusCode::BAD_REQUEST,
            failure("callback requires format=jsonp"),
        );
    }

    let (status, payload) = resolve(db, ip, params.key.as_deref());
    render(&rendering, status, payload)
}

fn resolve(db: &Db, ip: &str, key: Option<&str>) -> (StatusCode, Map<String, Value>) {
    if key == Some(INVALID_KEY) {
        return (StatusCode::UNAUTHORIZED, failure("invalid API key"));
    }
    if ip.parse::<IpAddr>().is_err() {
        return (StatusCode::BAD_REQUEST, failure("invalid IP address"));
    }
    match db.get(ip) {
        Some(found) => (StatusCode::OK, success(found)),
        None => (StatusCode::NOT_FOUND, failure(&format!("no record for {ip}"))),
    }
}

fn success(found: &GeoRecord) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("success".to_string(), Value::Bool(true));
    payload.insert("ip".to_string(), json!(found.ip));
    payload.insert("country".to_string(), json!(found.country));
    payload.insert("country_code".to_string(), json!(found.country_code));
    payload.insert("city".to_string(), json!(found.city));
    payload.insert("latitude".to_string(), json!(found.latitude));
    payload.insert("longitude".to_string(), json!(found.longitude));
    payload
}

fn failure(message: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("success".to_string(), Value::Bool(false));
    payload.insert("error".to_string(), Value::String(message.to_string()));
    payload
}

fn render(rendering: &Rendering, status: StatusCode, payload: Map<String, Value>) -> Response {
    let (content_type, body) = match rendering {
        Rendering::Json => ("application/json", Value::Object(payload).to_string()),
        Rendering::Xml => ("application/xml", to_xml(&payload)),
        Rendering::Yaml => ("application/x-yaml", to_yaml(&payload)),
        Rendering::Jsonp(callback) => (
            "application/javascript",
            format!("{callback}({});", Value::Object(payload)),
        ),
    };
    (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

fn to_xml(payload: &Map<String, Value>) -> String {
    let mut out = String::from("<response>");
    for (key, value) in payload {
        let text = match value {
            Value::String(s) => escape_xml(s),
            other => other.to_string(),
        };
        out.push_str(&format!("<{key}>{text}</{key}>"));
    }
    out.push_str("</response>");
    out
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// JSON scalars are valid YAML flow scalars, so strings stay quoted.
fn to_yaml(payload: &Map<String, Value>) -> String {
    payload
        .iter()
        .map(|(key, value)| format!("{key}: {value}\n"))
        .collect()
}
