use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};
use serde::Deserialize;

use super::{page, redirect, render};
use crate::{
    auth::AuthUser,
    db::{self, CompanyProfileInput},
    errors::AppError,
    utils::non_blank,
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(settings_handler)
        .service(company_handler)
        .service(company_form_handler);
}

#[derive(Deserialize)]
pub struct CompanyForm {
    business_name: Option<String>,
    logo_url: Option<String>,
    abn: Option<String>,
    address: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[get("/settings")]
pub async fn settings_handler(user: AuthUser, state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let account = db::get_user_by_id(&state, user.id).await?;
    let plan = db::get_current_plan(&state, user.id).await?;

    let mut context = page("Settings");
    context.insert("email", &account.email);
    context.insert("plan", &plan);
    render("settings.html", &context)
}

#[get("/settings/company")]
pub async fn company_handler(user: AuthUser, state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let profile = db::get_or_create_company_profile(&state, user.id).await?;

    let mut context = page("Company profile");
    context.insert("profile", &profile);
    render("company.html", &context)
}

#[post("/settings/company")]
pub async fn company_form_handler(
    web::Form(form): web::Form<CompanyForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let input = CompanyProfileInput {
        business_name: non_blank(&form.business_name),
        logo_url: non_blank(&form.logo_url),
        abn: non_blank(&form.abn),
        address: non_blank(&form.address),
        email: non_blank(&form.email),
        phone: non_blank(&form.phone),
    };
    db::update_company_profile(&state, user.id, &input).await?;
    Ok(redirect("/settings/company"))
}

#[cfg(test)]
mod tests {
    use actix_web::{
        http::StatusCode,
        test::{self as actix_test, TestRequest},
    };

    use crate::db::testing;
    use crate::routes::tests::{body_text, sign_up, test_app};

    #[actix_web::test]
    async fn settings_show_plan_and_company() {
        let app = test_app!(testing::state().await);
        let cookie = sign_up!(app, "sam@example.com");

        let req = TestRequest::get().uri("/settings").cookie(cookie.clone()).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("Starter"));
        assert!(body.contains("sam@example.com"));

        let req = TestRequest::post()
            .uri("/settings/company")
            .cookie(cookie.clone())
            .set_form([("business_name", "Sam Builds"), ("abn", "12 345 678 901")])
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let req = TestRequest::get()
            .uri("/settings/company")
            .cookie(cookie)
            .to_request();
        let body = body_text(actix_test::call_service(&app, req).await).await;
        assert!(body.contains("Sam Builds"));
        assert!(body.contains("12 345 678 901"));
    }
}
