//! In-memory stand-in for the adoption platform API, used by unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::{Value, json};

use crate::checks::EXPECTED_GREETING;
use crate::http::{ApiRequest, ApiResponse, Transport};
use crate::types::Fault;

const REQUIRED_LISTING_FIELDS: &[&str] = &[
    "title",
    "dogName",
    "description",
    "age",
    "size",
    "gender",
    "contactName",
    "contactEmail",
    "province",
    "city",
];
const REQUIRED_MESSAGE_FIELDS: &[&str] = &["listing_id", "senderName", "senderEmail", "message"];

pub struct FakeBackend {
    greeting: String,
    provinces: Vec<Value>,
    cities: Vec<Value>,
    overrides: BTreeMap<String, (u16, Value)>,
    unreachable: bool,
    panic_on: Option<String>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    dogs: Vec<Value>,
    messages: Vec<Value>,
    next_id: u64,
    calls: Vec<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let provinces = ["Madrid", "Barcelona", "Valencia", "Sevilla"]
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"id": i + 1, "name": name}))
            .collect();
        let cities = vec![
            json!({"id": "c-1", "province_id": 1, "name": "Alcalá de Henares"}),
            json!({"id": "c-2", "province_id": 1, "name": "Getafe"}),
            json!({"id": "c-3", "province_id": 2, "name": "Sabadell"}),
        ];
        FakeBackend {
            greeting: EXPECTED_GREETING.to_string(),
            provinces,
            cities,
            overrides: BTreeMap::new(),
            unreachable: false,
            panic_on: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_greeting(mut self, greeting: &str) -> Self {
        self.greeting = greeting.to_string();
        self
    }

    /// Replace the province table; cities of provinces that no longer exist are dropped.
    pub fn with_provinces(mut self, names: &[&str]) -> Self {
        self.provinces = names
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"id": i + 1, "name": name}))
            .collect();
        let count = self.provinces.len() as u64;
        self.cities.retain(|c| c["province_id"].as_u64().is_some_and(|p| p <= count));
        self
    }

    pub fn with_cities(mut self, cities: Vec<Value>) -> Self {
        self.cities = cities;
        self
    }

    /// Answer every request to `path` with a canned response.
    pub fn with_route_override(mut self, path: &str, status: u16, body: Value) -> Self {
        self.overrides.insert(path.to_string(), (status, body));
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn panicking_on(mut self, path: &str) -> Self {
        self.panic_on = Some(path.to_string());
        self
    }

    /// Requests seen so far, as `METHOD /path?query` labels.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn listing(&self, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state.dogs.iter().find(|d| d["id"] == id).cloned()
    }

    fn route(&self, request: &ApiRequest) -> (u16, Value) {
        if let Some((status, body)) = self.overrides.get(&request.path) {
            return (*status, body.clone());
        }

        let mut state = self.state.lock().unwrap();
        let path = request.path.as_str();
        match (request.method.as_str(), path) {
            ("GET", "") => (200, json!({"message": self.greeting})),
            ("POST", "/setup") => (200, json!({"message": "Database setup completed successfully"})),
            ("GET", "/provinces") => (200, Value::Array(self.provinces.clone())),
            ("GET", "/cities") => {
                let cities = self
                    .cities
                    .iter()
                    .filter(|c| param(request, "province").is_none_or(|p| c["province_id"].to_string() == p))
                    .cloned()
                    .collect();
                (200, Value::Array(cities))
            }
            ("GET", "/dogs") => {
                let dogs = state
                    .dogs
                    .iter()
                    .filter(|d| param(request, "size").is_none_or(|s| d["size"] == s))
                    .filter(|d| param(request, "gender").is_none_or(|g| d["gender"] == g))
                    .filter(|d| param(request, "urgent").is_none_or(|u| u != "true" || d["isUrgent"] == true))
                    .cloned()
                    .collect();
                (200, Value::Array(dogs))
            }
            ("POST", "/dogs") => {
                let body = request.body.clone().unwrap_or(Value::Null);
                if let Some(field) = missing_field(&body, REQUIRED_LISTING_FIELDS) {
                    return (400, json!({"error": format!("Missing required field: {field}")}));
                }
                state.next_id += 1;
                let mut dog = body;
                dog["id"] = json!(format!("dog-{}", state.next_id));
                state.dogs.push(dog.clone());
                (200, dog)
            }
            ("GET", p) if p.starts_with("/dogs/") => {
                let id = &p["/dogs/".len()..];
                match state.dogs.iter().find(|d| d["id"] == id) {
                    Some(dog) => (200, dog.clone()),
                    None => (404, json!({"error": "Dog not found"})),
                }
            }
            ("GET", "/messages") => {
                let messages = state
                    .messages
                    .iter()
                    .filter(|m| param(request, "listing_id").is_none_or(|l| m["listing_id"] == l))
                    .cloned()
                    .collect();
                (200, Value::Array(messages))
            }
            ("POST", "/messages") => {
                let body = request.body.clone().unwrap_or(Value::Null);
                if let Some(field) = missing_field(&body, REQUIRED_MESSAGE_FIELDS) {
                    return (400, json!({"error": format!("Missing required field: {field}")}));
                }
                state.next_id += 1;
                let mut message = body;
                message["id"] = json!(format!("msg-{}", state.next_id));
                state.messages.push(message.clone());
                (200, message)
            }
            ("GET", "/search") => {
                let term = param(request, "q").unwrap_or_default().to_lowercase();
                let hits = state
                    .dogs
                    .iter()
                    .filter(|d| {
                        ["dogName", "title", "description"].iter().any(|k| {
                            d[*k].as_str().is_some_and(|v| v.to_lowercase().contains(&term))
                        })
                    })
                    .filter(|d| param(request, "size").is_none_or(|s| d["size"] == s))
                    .filter(|d| param(request, "gender").is_none_or(|g| d["gender"] == g))
                    .cloned()
                    .collect();
                (200, Value::Array(hits))
            }
            ("GET", "/stats") => {
                let mut by_province = serde_json::Map::new();
                for dog in &state.dogs {
                    let name = self
                        .provinces
                        .iter()
                        .find(|p| p["id"] == dog["province"])
                        .and_then(|p| p["name"].as_str())
                        .unwrap_or("Unknown")
                        .to_string();
                    let count = by_province.get(&name).and_then(Value::as_u64).unwrap_or(0);
                    by_province.insert(name, json!(count + 1));
                }
                (
                    200,
                    json!({
                        "totalDogs": state.dogs.len(),
                        "urgentDogs": state.dogs.iter().filter(|d| d["isUrgent"] == true).count(),
                        "totalMessages": state.messages.len(),
                        "dogsByProvince": by_province,
                    }),
                )
            }
            _ => (404, json!({"error": "Route not found"})),
        }
    }
}

impl Transport for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Fault> {
        self.state.lock().unwrap().calls.push(request.label());

        if self.panic_on.as_deref() == Some(request.path.as_str()) {
            panic!("injected failure on {}", request.path);
        }
        if self.unreachable {
            return Err(Fault::Transport("connection refused".to_string()));
        }

        let (status, body) = self.route(&request);
        Ok(ApiResponse::new(&request, status, body.to_string()))
    }
}

fn param<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn missing_field<'a>(body: &Value, required: &[&'a str]) -> Option<&'a str> {
    required
        .iter()
        .copied()
        .find(|field| body.get(field).is_none_or(Value::is_null))
}
