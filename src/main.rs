#[macro_use]
extern crate rocket;

mod config;
mod db;
mod guards;
mod models;
mod routes;
mod services;
mod utils;

use dotenvy::dotenv;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

use guards::GuardFailure;

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

#[catch(400)]
fn bad_request(req: &Request) -> rocket::serde::json::Value {
    let failure = req.local_cache(|| GuardFailure {
        message: "Bad request".to_string(),
    });
    rocket::serde::json::json!({
        "success": false,
        "statusCode": 400,
        "message": failure.message
    })
}

#[catch(401)]
fn unauthorized(req: &Request) -> rocket::serde::json::Value {
    let failure = req.local_cache(|| GuardFailure {
        message: "Authentication required.".to_string(),
    });
    rocket::serde::json::json!({
        "success": false,
        "statusCode": 401,
        "message": failure.message
    })
}

#[catch(403)]
fn forbidden(req: &Request) -> rocket::serde::json::Value {
    let failure = req.local_cache(|| GuardFailure {
        message: "Access denied.".to_string(),
    });
    rocket::serde::json::json!({
        "success": false,
        "statusCode": 403,
        "message": failure.message
    })
}

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "statusCode": 404,
        "message": "Resource not found (check /api/v1 prefix)"
    })
}

#[catch(422)]
fn unprocessable() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "statusCode": 400,
        "message": "Invalid request body"
    })
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "statusCode": 500,
        "message": "Internal server error"
    })
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/api/v1/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- LAUNCH ----------------------------- */

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    log::info!("🚀 Homebridge API running");
    log::info!("📚 Swagger UI → http://localhost:8000/api/docs");

    rocket::build()
        .attach(db::init())
        .attach(CORS)
        .mount("/", routes![options_handler])
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Auth
                routes::auth::register,
                routes::auth::login,
                routes::auth::logout,
                // Users
                routes::user::create_user,
                routes::user::get_user,
                routes::user::update_user,
                routes::user::delete_user,
                routes::user::get_all_customers,
                // Providers
                routes::provider::get_all_providers,
                routes::provider::get_pending_providers,
                routes::provider::get_provider_by_id,
                routes::provider::approve_provider,
                routes::provider::reject_provider,
                routes::provider::delete_provider,
                routes::provider::check_approval_status,
                routes::provider::get_profile,
                routes::provider::update_profile,
                // Services
                routes::service::get_all_services,
                routes::service::get_all_categories,
                routes::service::get_service_by_id,
                routes::service::get_providers_by_service,
                routes::service::create_service,
                routes::service::update_service,
                routes::service::delete_service,
                // Job Posts
                routes::job_post::get_all_job_posts,
                routes::job_post::get_job_post_by_id,
                routes::job_post::create_job_post,
                routes::job_post::update_job_post,
                routes::job_post::apply_to_job_post,
                routes::job_post::approve_application,
                routes::job_post::reject_application,
                routes::job_post::delete_job_post,
                // Subscriptions
                routes::subscription::get_all_subscriptions,
                routes::subscription::get_subscription_by_id,
                routes::subscription::create_subscription,
                routes::subscription::update_subscription,
                routes::subscription::delete_subscription,
                // Reviews
                routes::review::get_all_reviews,
                routes::review::get_review_by_id,
                routes::review::create_review,
                routes::review::update_review,
                routes::review::delete_review,
                // Price Lists
                routes::price_list::get_all_price_lists,
                routes::price_list::get_price_lists_by_service,
                routes::price_list::get_price_list_by_id,
                routes::price_list::create_price_list,
                routes::price_list::update_price_list,
                routes::price_list::delete_price_list,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable,
                internal_error
            ],
        )
}
