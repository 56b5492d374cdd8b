use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};
use serde::Deserialize;

use super::{page, redirect, render};
use crate::{
    auth::AuthUser,
    db::{self, ClientInput},
    errors::AppError,
    utils::non_blank,
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(clients_handler)
        .service(create_client_handler)
        .service(client_handler)
        .service(edit_client_handler)
        .service(edit_client_form_handler);
}

#[derive(Deserialize)]
pub struct ClientForm {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

impl ClientForm {
    fn into_input(self, missing_name: &str) -> Result<ClientInput, AppError> {
        let name = non_blank(&self.name).ok_or_else(|| AppError::validation(missing_name))?;
        Ok(ClientInput {
            name,
            email: non_blank(&self.email),
            phone: non_blank(&self.phone),
        })
    }
}

#[get("/clients")]
pub async fn clients_handler(user: AuthUser, state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let clients = db::get_clients(&state, user.id).await?;

    let mut context = page("Clients");
    context.insert("clients", &clients);
    render("clients.html", &context)
}

#[post("/clients")]
pub async fn create_client_handler(
    web::Form(form): web::Form<ClientForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let input = form.into_input("Client name is required.")?;
    db::create_client(&state, user.id, &input).await?;
    Ok(redirect("/clients"))
}

#[get("/clients/{id}")]
pub async fn client_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let client = db::get_client(&state, user.id, path.into_inner()).await?;
    let quotes = db::get_quotes_for_client(&state, user.id, client.id).await?;
    let jobs = db::get_jobs_for_client(&state, user.id, client.id).await?;

    let mut context = page(&client.name);
    context.insert("client", &client);
    context.insert("quote_count", &quotes.len());
    context.insert("job_count", &jobs.len());
    context.insert("quotes", &quotes);
    context.insert("jobs", &jobs);
    render("client.html", &context)
}

#[get("/clients/{id}/edit")]
pub async fn edit_client_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let client = db::get_client(&state, user.id, path.into_inner()).await?;

    let mut context = page("Edit client");
    context.insert("client", &client);
    render("client_edit.html", &context)
}

#[post("/clients/{id}/edit")]
pub async fn edit_client_form_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<ClientForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let input = form.into_input("Name is required.")?;
    let client = db::update_client(&state, user.id, path.into_inner(), &input).await?;
    Ok(redirect(&format!("/clients/{}", client.id)))
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
    async fn create_then_view_client() {
        let app = test_app!(testing::state().await);
        let cookie = sign_up!(app, "sam@example.com");

        let req = TestRequest::post()
            .uri("/clients")
            .cookie(cookie.clone())
            .set_form([("name", "  Ann Lee "), ("email", ""), ("phone", "0412 345 678")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let req = TestRequest::get().uri("/clients").cookie(cookie.clone()).to_request();
        let body = body_text(actix_test::call_service(&app, req).await).await;
        assert!(body.contains("Ann Lee"));
        assert!(body.contains("0412 345 678"));
    }

    #[actix_web::test]
    async fn blank_name_is_rejected() {
        let app = test_app!(testing::state().await);
        let cookie = sign_up!(app, "sam@example.com");

        let req = TestRequest::post()
            .uri("/clients")
            .cookie(cookie)
            .set_form([("name", "   ")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("Client name is required."));
    }

    #[actix_web::test]
    async fn edit_client_page_and_form() {
        let state = testing::state().await;
        let app = test_app!(state.clone());
        let cookie = sign_up!(app, "sam@example.com");
        let user = crate::db::get_user_by_email(&state, "sam@example.com")
            .await
            .unwrap()
            .unwrap();
        let client = crate::db::create_client(
            &state,
            user.id,
            &crate::db::ClientInput {
                name: "Ann".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let uri = format!("/clients/{}/edit", client.id);

        let req = TestRequest::get().uri(&uri).cookie(cookie.clone()).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Ann"));

        let req = TestRequest::post()
            .uri(&uri)
            .cookie(cookie.clone())
            .set_form([("name", ""), ("email", "ann@example.com")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("Name is required."));

        let req = TestRequest::post()
            .uri(&uri)
            .cookie(cookie)
            .set_form([("name", "Ann Lee"), ("email", " ann@example.com ")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let client = crate::db::get_client(&state, user.id, client.id).await.unwrap();
        assert_eq!(client.name, "Ann Lee");
        assert_eq!(client.email.as_deref(), Some("ann@example.com"));
    }

    #[actix_web::test]
    async fn other_users_clients_are_not_found() {
        let state = testing::state().await;
        let owner = testing::user(&state, "owner@example.com").await;
        let client = crate::db::create_client(
            &state,
            owner.id,
            &crate::db::ClientInput {
                name: "Ann".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let app = test_app!(state);
        let cookie = sign_up!(app, "sam@example.com");
        let req = TestRequest::get()
            .uri(&format!("/clients/{}", client.id))
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
