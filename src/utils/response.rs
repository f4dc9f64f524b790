use rocket_okapi::okapi::Map;
use serde::{Deserialize, Serialize};
use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::Request;
use std::io::Cursor;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{MediaType, Response as OpenApiResponse, Responses};

/// -----------------------------
/// Generic API response envelope
/// -----------------------------
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: 200,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: 200,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: 201,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    pub fn message_only(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            status_code: 200,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<'r, T: Serialize> Responder<'r, 'static> for ApiResponse<T> {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = Status::from_code(self.status_code).unwrap_or(Status::Ok);
        let body = serde_json::to_string(&self)
            .unwrap_or_else(|_| r#"{"success":false,"statusCode":500,"message":"Internal error"}"#.to_string());

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

/// -----------------------------
/// Field-level validation detail
/// -----------------------------
#[derive(Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// -----------------------------
/// API Error
/// -----------------------------
#[derive(Debug, Serialize, JsonSchema)]
pub struct ApiError {
    #[schemars(skip)]
    #[serde(skip_serializing)]
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: Status::BadRequest,
            message: message.into(),
            errors: None,
        }
    }

    /// Missing/malformed input, reported against a single field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        ApiError {
            status: Status::BadRequest,
            message: message.clone(),
            errors: Some(vec![FieldError { field, message }]),
        }
    }

    /// Duplicate entries and invalid state transitions share the 400 family.
    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError {
            status: Status::BadRequest,
            message: message.into(),
            errors: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError {
            status: Status::Unauthorized,
            message: message.into(),
            errors: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError {
            status: Status::Forbidden,
            message: message.into(),
            errors: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: Status::NotFound,
            message: message.into(),
            errors: None,
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        ApiError {
            status: Status::InternalServerError,
            message: message.into(),
            errors: None,
        }
    }
}

/// Central translator for store failures. Duplicate-key writes surface as
/// conflicts; everything else is an internal error that must not leak detail.
impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            return ApiError::conflict("Entry with this value already exists");
        }
        log::error!("store error: {}", err);
        ApiError::internal_error("Internal server error")
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        ErrorKind::Command(ce) => ce.code == 11000,
        _ => false,
    }
}

/// -----------------------------
/// Rocket Responder
/// -----------------------------
impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body = serde_json::json!({
            "success": false,
            "statusCode": self.status.code,
            "message": self.message,
        });
        let body = match self.errors {
            Some(errors) => {
                let mut body = body;
                body["errors"] = serde_json::json!(errors);
                body
            }
            None => body,
        };
        let body = body.to_string();

        Response::build()
            .status(self.status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

/// -----------------------------
/// OpenAPI integration
/// -----------------------------
impl OpenApiResponderInner for ApiError {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let schema = generator.json_schema::<ApiResponse<()>>();

        let mut content = Map::new();
        content.insert(
            "application/json".to_owned(),
            MediaType {
                schema: Some(schema),
                ..Default::default()
            },
        );

        let mut responses = Responses::default();

        for (code, description) in [
            ("400", "Bad request"),
            ("401", "Unauthorized"),
            ("403", "Forbidden"),
            ("404", "Not found"),
            ("500", "Internal server error"),
        ] {
            responses.responses.insert(
                code.to_string(),
                rocket_okapi::okapi::openapi3::RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    content: content.clone(),
                    ..Default::default()
                }),
            );
        }

        Ok(responses)
    }
}

impl<T: Serialize + JsonSchema> OpenApiResponderInner for ApiResponse<T> {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let schema = generator.json_schema::<ApiResponse<T>>();

        let mut content = Map::new();
        content.insert(
            "application/json".to_owned(),
            MediaType {
                schema: Some(schema),
                ..Default::default()
            },
        );

        let mut responses = Responses::default();
        responses.responses.insert(
            "200".to_string(),
            rocket_okapi::okapi::openapi3::RefOr::Object(OpenApiResponse {
                description: "Success".to_string(),
                content,
                ..Default::default()
            }),
        );

        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let resp = ApiResponse::success(serde_json::json!({ "id": "abc" }));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["statusCode"], 200);
        assert!(value.get("message").is_none());
        assert_eq!(value["data"]["id"], "abc");
    }

    #[test]
    fn created_envelope_uses_201() {
        let resp = ApiResponse::created("Created", serde_json::json!({}));
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["statusCode"], 201);
        assert_eq!(value["message"], "Created");
    }

    #[test]
    fn message_only_omits_data() {
        let resp: ApiResponse<serde_json::Value> = ApiResponse::message_only("Deleted");
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value.get("data").is_none());
    }

    #[test]
    fn validation_error_carries_field_detail() {
        let err = ApiError::validation("email", "Email is required");
        assert_eq!(err.status, Status::BadRequest);
        let errors = err.errors.unwrap();
        assert_eq!(errors[0].field, "email");
        assert_eq!(errors[0].message, "Email is required");
    }

    #[test]
    fn conflict_maps_to_400() {
        let err = ApiError::conflict("Provider is already approved");
        assert_eq!(err.status, Status::BadRequest);
    }

    #[test]
    fn taxonomy_status_codes() {
        assert_eq!(ApiError::unauthorized("x").status, Status::Unauthorized);
        assert_eq!(ApiError::forbidden("x").status, Status::Forbidden);
        assert_eq!(ApiError::not_found("x").status, Status::NotFound);
        assert_eq!(ApiError::internal_error("x").status, Status::InternalServerError);
    }
}
