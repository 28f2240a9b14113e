use actix_web::dev::Server;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{middleware::DefaultHeaders, middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::Settings;
use crate::logger::RequestLogger;
use crate::middleware::BearerGuard;
use crate::notify::HttpNotificationClient;
use crate::routes::{
    deactivate, forgot_email, forgot_password, health_check, login, logout, logout_all, me,
    refresh, register, reset_password, step_up, verify_email, verify_sms,
};
use crate::security::SecurityHeaders;
use crate::store::PgCredentialStore;

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    configuration: Settings,
) -> Result<Server, std::io::Error> {
    let store = web::Data::new(PgCredentialStore::new(connection));
    // A stuck notification provider must not pin request handlers.
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let dispatcher = web::Data::new(HttpNotificationClient::new(
        configuration.notifications.clone(),
        http_client,
    ));
    let jwt_config = configuration.jwt.clone();
    let jwt_config_data = web::Data::new(jwt_config.clone());
    let app_settings = web::Data::new(configuration.application.clone());

    let server = HttpServer::new(move || {
        let mut default_headers = DefaultHeaders::new();
        for (name, value) in SecurityHeaders::get_headers() {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                default_headers = default_headers.add((name, value));
            }
        }

        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(RequestLogger)
            .wrap(default_headers)

            // Shared state
            .app_data(store.clone())
            .app_data(dispatcher.clone())
            .app_data(jwt_config_data.clone())
            .app_data(app_settings.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/login/step-up", web::post().to(step_up))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            .route("/auth/verify-email", web::get().to(verify_email))
            .route("/auth/verify-sms", web::post().to(verify_sms))
            .route("/auth/forgot-password", web::post().to(forgot_password))
            .route("/auth/reset-password", web::post().to(reset_password))
            .route("/auth/forgot-email", web::post().to(forgot_email))

            // Protected routes (require a bearer token)
            .service(
                web::scope("/account")
                    .wrap(BearerGuard::new(jwt_config.clone()))
                    .route("/me", web::get().to(me))
                    .route("/logout-all", web::post().to(logout_all))
                    .route("", web::delete().to(deactivate)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
