use std::str::FromStr;

use actix_files::NamedFile;
use actix_identity::Identity;
use actix_web::{
    get,
    http::StatusCode,
    post,
    web::{self, Data},
    HttpMessage, HttpRequest, HttpResponse, Responder,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tera::Context;

use crate::{
    auth::AuthUser, db, errors::AppError, metrics::DashboardMetrics, utils, AppState, TEMPLATES,
};

mod clients;
mod invoices;
mod jobs;
mod products;
mod quotes;
mod settings;

/// Register every page handler. Literal paths such as `/quotes/new` are added
/// before their `/{id}` siblings so they are matched first.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(favicon_handler)
        .service(index_handler)
        .service(register_handler)
        .service(register_form_handler)
        .service(login_handler)
        .service(login_form_handler)
        .service(logout_handler)
        .service(dashboard_handler)
        .service(change_pwd_handler)
        .service(change_pwd_form_handler);
    clients::configure(cfg);
    quotes::configure(cfg);
    jobs::configure(cfg);
    invoices::configure(cfg);
    products::configure(cfg);
    settings::configure(cfg);
}

pub(crate) fn page(title: &str) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context
}

pub(crate) fn render(template: &str, context: &Context) -> Result<HttpResponse, AppError> {
    render_with_status(StatusCode::OK, template, context)
}

pub(crate) fn render_with_status(
    status: StatusCode,
    template: &str,
    context: &Context,
) -> Result<HttpResponse, AppError> {
    let rendered = TEMPLATES.render(template, context).map_err(|e| {
        log::error!("Failed to render template {}: {}", template, e);
        AppError::TemplateError(e)
    })?;

    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(rendered))
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header(("Location", location))
        .finish()
}

/// A select box value; blank or non-numeric means nothing was chosen.
pub(crate) fn parse_id(value: &Option<String>) -> Option<i64> {
    utils::non_blank(value).and_then(|v| v.parse().ok())
}

/// An `<input type="date">` value; blank means no date.
pub(crate) fn parse_date(value: &Option<String>) -> Result<Option<NaiveDate>, AppError> {
    match utils::non_blank(value) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(&v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::validation(format!("Invalid date: {}", v))),
    }
}

/// A status field; blank falls back to the vocabulary default, anything
/// outside the vocabulary is rejected.
pub(crate) fn parse_status<T>(value: &Option<String>) -> Result<T, AppError>
where
    T: FromStr<Err = String> + Default,
{
    match utils::non_blank(value) {
        None => Ok(T::default()),
        Some(v) => v.parse().map_err(AppError::Validation),
    }
}

/// A status change posted on its own; a blank value is rejected rather than
/// resetting the record.
pub(crate) fn parse_required_status<T>(value: &Option<String>) -> Result<T, AppError>
where
    T: FromStr<Err = String>,
{
    match utils::non_blank(value) {
        None => Err(AppError::validation("Please choose a status.")),
        Some(v) => v.parse().map_err(AppError::Validation),
    }
}

pub(crate) fn is_checked(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("on" | "true" | "1"))
}

fn login_session(request: &HttpRequest, user_id: i64) -> Result<(), AppError> {
    Identity::login(&request.extensions(), user_id.to_string()).map_err(|e| {
        log::error!("Failed to attach identity: {}", e);
        AppError::IdentityError(e.to_string())
    })?;
    Ok(())
}

#[get("/favicon")]
pub async fn favicon_handler() -> Result<impl Responder, AppError> {
    Ok(NamedFile::open("static/favicon.svg")?)
}

#[get("/")]
pub async fn index_handler(identity: Option<Identity>) -> Result<HttpResponse, AppError> {
    if identity.is_some() {
        return Ok(redirect("/dashboard"));
    }
    let mut context = page("TradieFlow");
    context.insert("version", env!("CARGO_PKG_VERSION"));
    render("index.html", &context)
}

#[derive(Deserialize)]
pub struct Register {
    email: String,
    password: String,
    password2: String,
}

#[get("/register")]
pub async fn register_handler() -> Result<HttpResponse, AppError> {
    render("register.html", &page("Create your account"))
}

fn register_error(email: &str, message: &str) -> Result<HttpResponse, AppError> {
    let mut context = page("Create your account");
    context.insert("email", email);
    context.insert("error", message);
    render_with_status(StatusCode::BAD_REQUEST, "register.html", &context)
}

#[post("/register")]
pub async fn register_form_handler(
    web::Form(form): web::Form<Register>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let email = form.email.trim().to_lowercase();

    if email.is_empty() || form.password.is_empty() || form.password2.is_empty() {
        return register_error(&email, "All fields are required");
    }
    if !email.contains('@') {
        return register_error(&email, "Invalid email address");
    }
    if form.password != form.password2 {
        return register_error(&email, "Passwords do not match");
    }
    if let Err(msg) = utils::check_password_strength(&form.password) {
        return register_error(&email, msg);
    }
    if db::get_user_by_email(&state, &email).await?.is_some() {
        return register_error(&email, "An account with this email already exists");
    }

    let user = db::create_user(&state, email, form.password).await?;
    login_session(&request, user.id)?;

    Ok(redirect("/dashboard"))
}

#[derive(Deserialize)]
pub struct Login {
    email: String,
    password: String,
}

#[get("/login")]
pub async fn login_handler() -> Result<HttpResponse, AppError> {
    render("login.html", &page("Log in"))
}

#[post("/login")]
pub async fn login_form_handler(
    web::Form(form): web::Form<Login>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let email = form.email.trim().to_lowercase();

    let user = match db::get_user_by_email(&state, &email).await? {
        Some(user) if utils::verify_password(&form.password, &user.pwd_hash)? => user,
        _ => {
            log::warn!("Failed login attempt for {}", email);
            let mut context = page("Log in");
            context.insert("email", &email);
            context.insert("error", "Invalid email or password");
            return render_with_status(StatusCode::UNAUTHORIZED, "login.html", &context);
        }
    };

    login_session(&request, user.id)?;
    log::info!("User {} logged in", user.id);
    Ok(redirect("/dashboard"))
}

#[post("/logout")]
pub async fn logout_handler(identity: Option<Identity>) -> HttpResponse {
    if let Some(identity) = identity {
        identity.logout();
    }
    redirect("/login")
}

#[get("/dashboard")]
pub async fn dashboard_handler(
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let account = db::get_user_by_id(&state, user.id).await?;
    let invoices = db::get_invoices(&state, user.id).await?;
    let jobs = db::get_jobs(&state, user.id).await?;
    let metrics = DashboardMetrics::compute(&invoices, &jobs);

    let mut context = page("Dashboard");
    context.insert("email", &account.email);
    context.insert("metrics", &metrics);
    context.insert("recent_jobs", &jobs.iter().take(5).collect::<Vec<_>>());
    render("dashboard.html", &context)
}

#[get("/change-pwd")]
pub async fn change_pwd_handler(_user: AuthUser) -> Result<HttpResponse, AppError> {
    render("change-pwd.html", &page("Change password"))
}

#[derive(Deserialize)]
pub struct ChangePwdForm {
    old_password: String,
    password: String,
    password2: String,
}

#[post("/change-pwd")]
pub async fn change_pwd_form_handler(
    web::Form(form): web::Form<ChangePwdForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let fail = |message: &str| {
        let mut context = page("Change password");
        context.insert("error", message);
        render_with_status(StatusCode::BAD_REQUEST, "change-pwd.html", &context)
    };

    if form.old_password.is_empty() || form.password.is_empty() || form.password2.is_empty() {
        return fail("All fields are required");
    }
    if form.password != form.password2 {
        return fail("Passwords do not match");
    }
    if let Err(msg) = utils::check_password_strength(&form.password) {
        return fail(msg);
    }

    let account = db::get_user_by_id(&state, user.id).await?;
    if !utils::verify_password(&form.old_password, &account.pwd_hash)? {
        log::warn!("Old password verification failed for user ID: {}", user.id);
        return fail("Old password is incorrect");
    }

    db::update_password(&state, user.id, &form.password).await?;
    log::info!("Password changed successfully for user ID: {}", user.id);
    Ok(redirect("/settings"))
}
