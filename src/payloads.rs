//! Fixed request bodies sent by the checks.

use serde_json::{Value, json};

pub const LISTING_DOG_NAME: &str = "Luna";
pub const LISTING_SIZE: &str = "mediano";
pub const LISTING_GENDER: &str = "hembra";
pub const SENDER_NAME: &str = "Carlos Rodríguez";

/// Full listing with every required field; `province` and `city` must be real ids.
pub fn listing(province: &Value, city: &Value) -> Value {
    json!({
        "title": "Perro Adorable Busca Hogar",
        "dogName": LISTING_DOG_NAME,
        "description": "Luna es una perra muy cariñosa que busca una familia amorosa. Es muy buena con niños y otros animales.",
        // months
        "age": 24,
        "size": LISTING_SIZE,
        "gender": LISTING_GENDER,
        "breed": "Mestizo",
        "isUrgent": true,
        "isVaccinated": true,
        "isNeutered": true,
        "contactName": "María García",
        "contactEmail": "maria.garcia@example.com",
        "contactPhone": "+34 600 123 456",
        "province": province,
        "city": city,
        "imageUrls": ["https://example.com/dog1.jpg", "https://example.com/dog2.jpg"]
    })
}

pub fn contact_message(listing_id: &str) -> Value {
    json!({
        "listing_id": listing_id,
        "senderName": SENDER_NAME,
        "senderEmail": "carlos.rodriguez@example.com",
        "senderPhone": "+34 600 987 654",
        "message": "Hola, estoy muy interesado en adoptar a Luna. ¿Podríamos hablar por teléfono? Tengo experiencia con perros y un jardín grande."
    })
}

/// Listing missing everything but the title; the backend must reject it.
pub fn incomplete_listing() -> Value {
    json!({ "title": "Test Dog" })
}
