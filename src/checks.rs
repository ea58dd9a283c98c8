//! The twelve backend checks, in execution order.
//!
//! Each check returns `Result<Passed, Fault>`; nothing here panics on bad
//! input from the backend. Checks that depend on an earlier one read the id it
//! stored in [`RunContext`] and fail fast without a request when it is absent.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::http::{ApiRequest, Transport};
use crate::payloads::{self, LISTING_DOG_NAME, LISTING_GENDER, LISTING_SIZE, SENDER_NAME};
use crate::runner::RunContext;
use crate::types::{Fault, Passed};

pub const EXPECTED_GREETING: &str = "adoptaunpana.es API";
const SETUP_COMPLETED: &str = "setup completed successfully";
const REFERENCE_PROVINCES: &[&str] = &["Madrid", "Barcelona", "Valencia", "Sevilla"];
const MIN_REFERENCE_PROVINCES: usize = 2;
const STATS_FIELDS: &[&str] = &["totalDogs", "urgentDogs", "totalMessages", "dogsByProvince"];
const SEARCH_TERM: &str = "Luna";

static MISSING_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Missing required field(?::\s*(\w+))?").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Root,
    Setup,
    Provinces,
    Cities,
    CreateListing,
    GetListings,
    GetSingleListing,
    SendMessage,
    GetMessages,
    Search,
    Stats,
    ErrorHandling,
}

/// Fixed execution order. Later entries may depend on ids stored by earlier ones.
pub const ALL: [CheckKind; 12] = [
    CheckKind::Root,
    CheckKind::Setup,
    CheckKind::Provinces,
    CheckKind::Cities,
    CheckKind::CreateListing,
    CheckKind::GetListings,
    CheckKind::GetSingleListing,
    CheckKind::SendMessage,
    CheckKind::GetMessages,
    CheckKind::Search,
    CheckKind::Stats,
    CheckKind::ErrorHandling,
];

impl CheckKind {
    pub fn name(self) -> &'static str {
        match self {
            CheckKind::Root => "Root Endpoint",
            CheckKind::Setup => "Database Setup",
            CheckKind::Provinces => "Provinces Endpoint",
            CheckKind::Cities => "Cities Endpoint",
            CheckKind::CreateListing => "Create Dog Listing",
            CheckKind::GetListings => "Get Dog Listings",
            CheckKind::GetSingleListing => "Get Single Dog",
            CheckKind::SendMessage => "Send Message",
            CheckKind::GetMessages => "Get Messages",
            CheckKind::Search => "Search Functionality",
            CheckKind::Stats => "Stats Endpoint",
            CheckKind::ErrorHandling => "Error Handling",
        }
    }

    /// Endpoints exercised, as shown by `list`.
    pub fn endpoints(self) -> &'static str {
        match self {
            CheckKind::Root => "GET /",
            CheckKind::Setup => "POST /setup",
            CheckKind::Provinces => "GET /provinces",
            CheckKind::Cities => "GET /cities, GET /cities?province=",
            CheckKind::CreateListing => "GET /provinces, GET /cities?province=, POST /dogs",
            CheckKind::GetListings => "GET /dogs, GET /dogs?size=|gender=|urgent=",
            CheckKind::GetSingleListing => "GET /dogs/{id}",
            CheckKind::SendMessage => "POST /messages",
            CheckKind::GetMessages => "GET /messages, GET /messages?listing_id=",
            CheckKind::Search => "GET /search?q=, GET /search?q=&size=&gender=",
            CheckKind::Stats => "GET /stats",
            CheckKind::ErrorHandling => "POST /dogs (incomplete)",
        }
    }

    pub async fn run<T: Transport>(self, ctx: &mut RunContext, transport: &T) -> Result<Passed, Fault> {
        match self {
            CheckKind::Root => root(ctx, transport).await,
            CheckKind::Setup => setup(ctx, transport).await,
            CheckKind::Provinces => provinces(ctx, transport).await,
            CheckKind::Cities => cities(ctx, transport).await,
            CheckKind::CreateListing => create_listing(ctx, transport).await,
            CheckKind::GetListings => get_listings(ctx, transport).await,
            CheckKind::GetSingleListing => get_single_listing(ctx, transport).await,
            CheckKind::SendMessage => send_message(ctx, transport).await,
            CheckKind::GetMessages => get_messages(ctx, transport).await,
            CheckKind::Search => search(ctx, transport).await,
            CheckKind::Stats => stats(ctx, transport).await,
            CheckKind::ErrorHandling => error_handling(ctx, transport).await,
        }
    }
}

async fn root<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let data = transport
        .send(ApiRequest::get("", ctx.timeouts.read))
        .await?
        .expect_json(200)?;

    if str_field(&data, "message") == Some(EXPECTED_GREETING) {
        Ok(Passed::new("API root endpoint working correctly").with_payload(data))
    } else {
        Err(Fault::shape(format!("Unexpected response message: {data}"), &data))
    }
}

async fn setup<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let data = transport
        .send(ApiRequest::post("/setup", None, ctx.timeouts.setup))
        .await?
        .expect_json(200)?;

    let message = str_field(&data, "message").unwrap_or_default().to_lowercase();
    if message.contains(SETUP_COMPLETED) {
        Ok(Passed::new("Database tables created successfully").with_payload(data))
    } else {
        Err(Fault::shape(format!("Unexpected setup response: {data}"), &data))
    }
}

async fn provinces<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let data = transport
        .send(ApiRequest::get("/provinces", ctx.timeouts.read))
        .await?
        .expect_json(200)?;

    let provinces = as_list(&data, "provinces")?;
    if provinces.is_empty() {
        return Err(Fault::shape("Expected a non-empty array of provinces", &data));
    }

    let names: Vec<&str> = provinces.iter().filter_map(|p| str_field(p, "name")).collect();
    let found: Vec<&str> = REFERENCE_PROVINCES
        .iter()
        .copied()
        .filter(|expected| names.contains(expected))
        .collect();

    if found.len() >= MIN_REFERENCE_PROVINCES {
        Ok(Passed::new(format!(
            "Found {} provinces including: {}",
            provinces.len(),
            found.join(", ")
        )))
    } else {
        Err(Fault::shape(
            format!("Missing expected Spanish provinces. Found: {names:?}"),
            &data,
        ))
    }
}

async fn cities<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let data = transport
        .send(ApiRequest::get("/cities", ctx.timeouts.read))
        .await?
        .expect_json(200)?;

    let cities = as_list(&data, "cities")?;
    let Some(first) = cities.first() else {
        return Err(Fault::shape("Expected a non-empty array of cities", &data));
    };
    let Some(province_id) = first.get("province_id").and_then(id_string) else {
        return Err(Fault::shape("Cities missing province_id field", first));
    };

    let filtered = transport
        .send(ApiRequest::get("/cities", ctx.timeouts.read).query("province", &province_id))
        .await?
        .expect_json(200)?;
    let filtered_cities = as_list(&filtered, "filtered cities")?;

    Ok(Passed::new(format!(
        "Found {} cities; province filter returned {} cities for province {}",
        cities.len(),
        filtered_cities.len(),
        province_id
    )))
}

async fn create_listing<T: Transport>(ctx: &mut RunContext, transport: &T) -> Result<Passed, Fault> {
    // Listings need real foreign keys, so borrow the first province and one of its cities.
    let provinces = transport
        .send(ApiRequest::get("/provinces", ctx.timeouts.read))
        .await?
        .expect_json(200)?;
    let Some(province) = as_list(&provinces, "provinces")?.first() else {
        return Err(Fault::shape("No provinces available for test", &provinces));
    };
    let Some((province_id, province_key)) = province
        .get("id")
        .and_then(|id| id_string(id).map(|key| (id, key)))
    else {
        return Err(Fault::shape("Province missing id field", province));
    };

    let cities = transport
        .send(ApiRequest::get("/cities", ctx.timeouts.read).query("province", &province_key))
        .await?
        .expect_json(200)?;
    let Some(city) = as_list(&cities, "cities")?.first() else {
        return Err(Fault::shape("No cities available for test", &cities));
    };
    let Some(city_id) = city.get("id").filter(|id| !id.is_null()) else {
        return Err(Fault::shape("City missing id field", city));
    };

    let data = transport
        .send(ApiRequest::post(
            "/dogs",
            Some(payloads::listing(province_id, city_id)),
            ctx.timeouts.write,
        ))
        .await?
        .expect_json(200)?;

    match data.get("id").and_then(id_string) {
        Some(id) if str_field(&data, "dogName") == Some(LISTING_DOG_NAME) => {
            tracing::debug!(listing_id = %id, "listing created");
            let message = format!("Dog listing created successfully with ID: {id}");
            ctx.created_listing_id = Some(id);
            Ok(Passed::new(message))
        }
        _ => Err(Fault::shape(format!("Invalid response data: {data}"), &data)),
    }
}

async fn get_listings<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let read = ctx.timeouts.read;

    let all = transport.send(ApiRequest::get("/dogs", read)).await?.expect_json(200)?;
    let all_count = as_list(&all, "dog listings")?.len();

    let by_size = transport
        .send(ApiRequest::get("/dogs", read).query("size", LISTING_SIZE))
        .await?
        .expect_json(200)?;
    let size_list = as_list(&by_size, "size-filtered listings")?;
    if ctx.created_listing_id.is_some()
        && !size_list
            .iter()
            .any(|dog| str_field(dog, "dogName") == Some(LISTING_DOG_NAME))
    {
        return Err(Fault::shape(
            format!("Size filter did not return the created listing '{LISTING_DOG_NAME}'"),
            &by_size,
        ));
    }

    let by_gender = transport
        .send(ApiRequest::get("/dogs", read).query("gender", LISTING_GENDER))
        .await?
        .expect_json(200)?;
    let gender_count = as_list(&by_gender, "gender-filtered listings")?.len();

    let urgent = transport
        .send(ApiRequest::get("/dogs", read).query("urgent", true))
        .await?
        .expect_json(200)?;
    let urgent_count = as_list(&urgent, "urgent listings")?.len();

    Ok(Passed::new(format!(
        "Found {all_count} dog listings; filters returned {} medium, {gender_count} female, {urgent_count} urgent",
        size_list.len()
    )))
}

async fn get_single_listing<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let id = require_listing(ctx)?;

    let data = transport
        .send(ApiRequest::get(format!("/dogs/{id}"), ctx.timeouts.read))
        .await?
        .expect_json(200)?;

    let same_id = data.get("id").and_then(id_string).as_deref() == Some(id);
    if same_id && str_field(&data, "dogName") == Some(LISTING_DOG_NAME) {
        Ok(Passed::new(format!("Successfully retrieved dog: {LISTING_DOG_NAME}")))
    } else {
        Err(Fault::shape(format!("Invalid dog data: {data}"), &data))
    }
}

async fn send_message<T: Transport>(ctx: &mut RunContext, transport: &T) -> Result<Passed, Fault> {
    let listing_id = require_listing(ctx)?;

    let data = transport
        .send(ApiRequest::post(
            "/messages",
            Some(payloads::contact_message(listing_id)),
            ctx.timeouts.write,
        ))
        .await?
        .expect_json(200)?;

    match data.get("id").and_then(id_string) {
        Some(id) if str_field(&data, "senderName") == Some(SENDER_NAME) => {
            let message = format!("Message sent successfully with ID: {id}");
            ctx.created_message_id = Some(id);
            Ok(Passed::new(message))
        }
        _ => Err(Fault::shape(format!("Invalid message response: {data}"), &data)),
    }
}

async fn get_messages<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let all = transport
        .send(ApiRequest::get("/messages", ctx.timeouts.read))
        .await?
        .expect_json(200)?;
    let all_count = as_list(&all, "messages")?.len();

    // The listing filter only makes sense once a listing exists.
    let Some(listing_id) = ctx.created_listing_id.as_deref() else {
        return Ok(Passed::new(format!("Found {all_count} messages")));
    };

    let filtered = transport
        .send(ApiRequest::get("/messages", ctx.timeouts.read).query("listing_id", listing_id))
        .await?
        .expect_json(200)?;
    let filtered_count = as_list(&filtered, "filtered messages")?.len();

    Ok(Passed::new(format!(
        "Found {all_count} messages; listing filter returned {filtered_count} for dog {listing_id}"
    )))
}

async fn search<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let text = transport
        .send(ApiRequest::get("/search", ctx.timeouts.read).query("q", SEARCH_TERM))
        .await?
        .expect_json(200)?;
    let text_count = as_list(&text, "search results")?.len();

    let filtered = transport
        .send(
            ApiRequest::get("/search", ctx.timeouts.read)
                .query("q", SEARCH_TERM)
                .query("size", LISTING_SIZE)
                .query("gender", LISTING_GENDER),
        )
        .await?
        .expect_json(200)?;
    let filtered_count = as_list(&filtered, "filtered search results")?.len();

    Ok(Passed::new(format!(
        "Text search returned {text_count} results for '{SEARCH_TERM}'; filtered search returned {filtered_count}"
    )))
}

async fn stats<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let data = transport
        .send(ApiRequest::get("/stats", ctx.timeouts.read))
        .await?
        .expect_json(200)?;

    let missing: Vec<&str> = STATS_FIELDS
        .iter()
        .copied()
        .filter(|field| data.get(field).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(Fault::shape(format!("Missing fields: {missing:?}"), &data));
    }
    if !data["dogsByProvince"].is_object() {
        return Err(Fault::shape("dogsByProvince is not a mapping", &data));
    }

    let count = |field: &str| {
        data[field]
            .as_u64()
            .ok_or_else(|| Fault::shape(format!("{field} is not a count"), &data))
    };
    let total_dogs = count("totalDogs")?;
    let urgent_dogs = count("urgentDogs")?;
    let total_messages = count("totalMessages")?;

    if ctx.created_listing_id.is_some() && total_dogs < 1 {
        return Err(Fault::shape("totalDogs is 0 after a listing was created", &data));
    }
    if ctx.created_message_id.is_some() && total_messages < 1 {
        return Err(Fault::shape("totalMessages is 0 after a message was sent", &data));
    }

    Ok(Passed::new(format!(
        "Statistics working correctly - Dogs: {total_dogs}, Urgent: {urgent_dogs}, Messages: {total_messages}"
    )))
}

async fn error_handling<T: Transport>(ctx: &RunContext, transport: &T) -> Result<Passed, Fault> {
    let data = transport
        .send(ApiRequest::post(
            "/dogs",
            Some(payloads::incomplete_listing()),
            ctx.timeouts.read,
        ))
        .await?
        .expect_json(400)?;

    let error = str_field(&data, "error").unwrap_or_default();
    match MISSING_FIELD.captures(error) {
        Some(caps) => {
            let message = match caps.get(1) {
                Some(field) => format!("Validation errors handled correctly (missing field: {})", field.as_str()),
                None => "Validation errors handled correctly".to_string(),
            };
            Ok(Passed::new(message))
        }
        None => Err(Fault::shape(format!("Unexpected error response: {data}"), &data)),
    }
}

fn require_listing(ctx: &RunContext) -> Result<&str, Fault> {
    ctx.created_listing_id
        .as_deref()
        .ok_or_else(|| Fault::Precondition("No dog ID available for testing".to_string()))
}

fn as_list<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, Fault> {
    value
        .as_array()
        .ok_or_else(|| Fault::shape(format!("Expected array of {what}, got: {}", type_name(value)), value))
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Ids come back as strings (uuids) or numbers depending on the backend.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
