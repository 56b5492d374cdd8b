use actix_web::{
    get, post,
    web::{self, Data},
    HttpResponse,
};
use serde::Deserialize;

use super::{page, parse_date, parse_id, parse_required_status, parse_status, redirect, render};
use crate::{
    auth::AuthUser,
    db::{self, AttachmentInput, ClientInput, JobInput},
    errors::AppError,
    status::{AttachmentKind, JobStatus, NoteKind},
    structs::Job,
    utils::non_blank,
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(jobs_handler)
        .service(new_job_handler)
        .service(new_job_form_handler)
        .service(job_handler)
        .service(edit_job_handler)
        .service(edit_job_form_handler)
        .service(job_status_handler)
        .service(job_details_handler)
        .service(job_client_handler)
        .service(add_note_handler)
        .service(edit_note_handler)
        .service(add_attachment_handler)
        .service(delete_job_handler);
}

#[derive(Deserialize)]
pub struct NewJobQuery {
    client: Option<String>,
}

#[derive(Deserialize)]
pub struct JobForm {
    title: Option<String>,
    client_id: Option<String>,
    address: Option<String>,
    start_date: Option<String>,
    due_date: Option<String>,
    status: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusForm {
    status: Option<String>,
}

#[derive(Deserialize)]
pub struct DetailsForm {
    address: Option<String>,
    start_date: Option<String>,
    due_date: Option<String>,
}

#[derive(Deserialize)]
pub struct ClientDetailsForm {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Deserialize)]
pub struct NoteForm {
    content: Option<String>,
    kind: Option<String>,
}

#[derive(Deserialize)]
pub struct AttachmentForm {
    kind: Option<String>,
    file_name: Option<String>,
    file_url: Option<String>,
    mime_type: Option<String>,
    size_bytes: Option<String>,
}

impl JobForm {
    async fn into_input(self, state: &AppState, user_id: i64) -> Result<JobInput, AppError> {
        let title = non_blank(&self.title).ok_or_else(|| AppError::validation("Job title is required."))?;
        let client_id = match parse_id(&self.client_id) {
            Some(id) => Some(db::get_client(state, user_id, id).await?.id),
            None => None,
        };
        Ok(JobInput {
            client_id,
            quote_id: None,
            title,
            address: non_blank(&self.address),
            status: parse_status(&self.status)?,
            start_date: parse_date(&self.start_date)?,
            due_date: parse_date(&self.due_date)?,
            notes: non_blank(&self.notes),
        })
    }
}

impl AttachmentForm {
    fn into_input(self) -> Result<AttachmentInput, AppError> {
        let (file_name, file_url) = match (non_blank(&self.file_name), non_blank(&self.file_url)) {
            (Some(name), Some(url)) => (name, url),
            _ => return Err(AppError::validation("File name and URL are required.")),
        };
        let mime_type = non_blank(&self.mime_type);
        let kind = match non_blank(&self.kind) {
            Some(kind) => kind.parse().map_err(AppError::Validation)?,
            None if mime_type.as_deref().is_some_and(|m| m.starts_with("image/")) => {
                AttachmentKind::Photo
            }
            None => AttachmentKind::Document,
        };
        let size_bytes = match non_blank(&self.size_bytes) {
            Some(size) => Some(
                size.parse::<i64>()
                    .map_err(|_| AppError::validation("File size must be a whole number of bytes."))?,
            ),
            None => None,
        };
        Ok(AttachmentInput {
            kind,
            file_name,
            file_url,
            mime_type,
            size_bytes,
        })
    }
}

/// Split jobs into the pending, active and completed board columns.
fn board_columns(jobs: Vec<Job>) -> (Vec<Job>, Vec<Job>, Vec<Job>) {
    let mut pending = Vec::new();
    let mut active = Vec::new();
    let mut completed = Vec::new();
    for job in jobs {
        match job.status() {
            JobStatus::Pending => pending.push(job),
            JobStatus::Active => active.push(job),
            JobStatus::Completed => completed.push(job),
            JobStatus::Cancelled => {}
        }
    }
    (pending, active, completed)
}

#[get("/jobs")]
pub async fn jobs_handler(user: AuthUser, state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let quotes = db::get_quotes(&state, user.id).await?;
    let jobs = db::get_jobs(&state, user.id).await?;
    let (pending, active, completed) = board_columns(jobs);

    let mut context = page("Jobs");
    context.insert("quotes", &quotes);
    context.insert("pending", &pending);
    context.insert("active", &active);
    context.insert("completed", &completed);
    render("jobs.html", &context)
}

#[get("/jobs/new")]
pub async fn new_job_handler(
    query: web::Query<NewJobQuery>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let clients = db::get_clients_by_name(&state, user.id).await?;

    let mut context = page("New job");
    context.insert("clients", &clients);
    context.insert("selected_client", &parse_id(&query.client));
    context.insert("statuses", JobStatus::ALL);
    render("job_new.html", &context)
}

#[post("/jobs/new")]
pub async fn new_job_form_handler(
    web::Form(form): web::Form<JobForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let input = form.into_input(&state, user.id).await?;
    let job = db::create_job(&state, user.id, &input).await?;
    Ok(redirect(&format!("/jobs/{}", job.id)))
}

#[get("/jobs/{id}")]
pub async fn job_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let job = db::get_job(&state, user.id, path.into_inner()).await?;
    let client = match job.client_id {
        Some(client_id) => Some(db::get_client(&state, user.id, client_id).await?),
        None => None,
    };
    let quote = match job.quote_id {
        Some(quote_id) => Some(db::get_quote(&state, user.id, quote_id).await?),
        None => None,
    };
    let notes = db::get_job_notes(&state, user.id, job.id).await?;
    let (photos, documents): (Vec<_>, Vec<_>) = db::get_job_attachments(&state, user.id, job.id)
        .await?
        .into_iter()
        .partition(|a| a.kind() == AttachmentKind::Photo);

    let mut context = page(job.title.as_deref().unwrap_or("Job"));
    context.insert("status", &job.status());
    context.insert("job", &job);
    context.insert("client", &client);
    context.insert("quote", &quote);
    context.insert("notes", &notes);
    context.insert("photos", &photos);
    context.insert("documents", &documents);
    context.insert("statuses", JobStatus::ALL);
    context.insert("note_kinds", NoteKind::ALL);
    context.insert("attachment_kinds", AttachmentKind::ALL);
    render("job.html", &context)
}

#[get("/jobs/{id}/edit")]
pub async fn edit_job_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let job = db::get_job(&state, user.id, path.into_inner()).await?;
    let clients = db::get_clients_by_name(&state, user.id).await?;

    let mut context = page("Edit job");
    context.insert("status", &job.status());
    context.insert("job", &job);
    context.insert("clients", &clients);
    context.insert("statuses", JobStatus::ALL);
    render("job_edit.html", &context)
}

#[post("/jobs/{id}/edit")]
pub async fn edit_job_form_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<JobForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = form.into_input(&state, user.id).await?;
    db::update_job(&state, user.id, id, &input).await?;
    Ok(redirect(&format!("/jobs/{}", id)))
}

#[post("/jobs/{id}/status")]
pub async fn job_status_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<StatusForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let status: JobStatus = parse_required_status(&form.status)?;
    db::update_job_status(&state, user.id, path.into_inner(), status).await?;
    Ok(redirect("/jobs"))
}

#[post("/jobs/{id}/details")]
pub async fn job_details_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<DetailsForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::update_job_details(
        &state,
        user.id,
        id,
        non_blank(&form.address),
        parse_date(&form.start_date)?,
        parse_date(&form.due_date)?,
    )
    .await?;
    Ok(redirect(&format!("/jobs/{}", id)))
}

#[post("/jobs/{id}/client")]
pub async fn job_client_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<ClientDetailsForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let job = db::get_job(&state, user.id, path.into_inner()).await?;

    if let Some(client_id) = job.client_id {
        let input = ClientInput {
            name: non_blank(&form.name).unwrap_or_else(|| "Unnamed client".to_owned()),
            email: non_blank(&form.email),
            phone: non_blank(&form.phone),
        };
        db::update_client(&state, user.id, client_id, &input).await?;
    }
    Ok(redirect(&format!("/jobs/{}", job.id)))
}

#[post("/jobs/{id}/notes")]
pub async fn add_note_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<NoteForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let kind: NoteKind = parse_status(&form.kind)?;
    db::add_job_note(
        &state,
        user.id,
        id,
        form.content.as_deref().unwrap_or_default(),
        kind,
    )
    .await?;
    Ok(redirect(&format!("/jobs/{}", id)))
}

#[post("/jobs/{id}/notes/{note_id}")]
pub async fn edit_note_handler(
    path: web::Path<(i64, i64)>,
    web::Form(form): web::Form<NoteForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (id, note_id) = path.into_inner();
    db::update_job_note(
        &state,
        user.id,
        id,
        note_id,
        form.content.as_deref().unwrap_or_default(),
    )
    .await?;
    Ok(redirect(&format!("/jobs/{}", id)))
}

#[post("/jobs/{id}/attachments")]
pub async fn add_attachment_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<AttachmentForm>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    db::add_job_attachment(&state, user.id, id, &form.into_input()?).await?;
    Ok(redirect(&format!("/jobs/{}", id)))
}

#[post("/jobs/{id}/delete")]
pub async fn delete_job_handler(
    path: web::Path<i64>,
    user: AuthUser,
    state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    db::delete_job(&state, user.id, path.into_inner()).await?;
    Ok(redirect("/jobs"))
}

#[cfg(test)]
mod tests {
    use actix_web::{
        http::StatusCode,
        test::{self as actix_test, TestRequest},
    };

    use super::*;
    use crate::db::testing;
    use crate::routes::tests::{body_text, sign_up, test_app};

    fn attachment(kind: &str, mime: &str) -> AttachmentForm {
        AttachmentForm {
            kind: Some(kind.into()),
            file_name: Some("site.jpg".into()),
            file_url: Some("https://files.example.com/site.jpg".into()),
            mime_type: Some(mime.into()),
            size_bytes: Some("2048".into()),
        }
    }

    #[test]
    fn attachment_kind_follows_mime_type_when_blank() {
        let input = attachment("", "image/jpeg").into_input().unwrap();
        assert_eq!(input.kind, AttachmentKind::Photo);
        assert_eq!(input.size_bytes, Some(2048));

        let input = attachment("", "application/pdf").into_input().unwrap();
        assert_eq!(input.kind, AttachmentKind::Document);

        let input = attachment("Document", "image/png").into_input().unwrap();
        assert_eq!(input.kind, AttachmentKind::Document);

        let mut missing = attachment("photo", "image/png");
        missing.file_url = None;
        assert!(missing.into_input().is_err());
    }

    #[actix_web::test]
    async fn job_lifecycle_through_the_pages() {
        let state = testing::state().await;
        let app = test_app!(state.clone());
        let cookie = sign_up!(app, "sam@example.com");

        let req = TestRequest::post()
            .uri("/jobs/new")
            .cookie(cookie.clone())
            .set_form([
                ("title", "Fence replacement"),
                ("client_id", ""),
                ("start_date", "2025-03-05"),
                ("status", ""),
            ])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let location = resp.headers().get("Location").unwrap().to_str().unwrap().to_owned();

        let req = TestRequest::post()
            .uri(&format!("{}/notes", location))
            .cookie(cookie.clone())
            .set_form([("content", "Posts delivered"), ("kind", "progress")])
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let req = TestRequest::post()
            .uri(&format!("{}/status", location))
            .cookie(cookie.clone())
            .set_form([("status", "active")])
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let req = TestRequest::get().uri(&location).cookie(cookie.clone()).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("Fence replacement"));
        assert!(body.contains("Posts delivered"));
        assert!(body.contains("05 Mar 2025"));

        let req = TestRequest::get().uri("/jobs").cookie(cookie).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    /// A signed-up user with one client and a job for that client.
    async fn job_for_ann(state: &AppState) -> (i64, i64) {
        let user = db::get_user_by_email(state, "sam@example.com")
            .await
            .unwrap()
            .unwrap();
        let client = db::create_client(
            state,
            user.id,
            &ClientInput {
                name: "Ann".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let job = db::create_job(
            state,
            user.id,
            &db::JobInput {
                client_id: Some(client.id),
                title: "Fence replacement".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (user.id, job.id)
    }

    #[actix_web::test]
    async fn inline_client_update_names_blank_clients() {
        let state = testing::state().await;
        let app = test_app!(state.clone());
        let cookie = sign_up!(app, "sam@example.com");
        let (user_id, job_id) = job_for_ann(&state).await;

        let req = TestRequest::post()
            .uri(&format!("/jobs/{}/client", job_id))
            .cookie(cookie)
            .set_form([("name", " "), ("email", ""), ("phone", "0400 111 222")])
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let job = db::get_job(&state, user_id, job_id).await.unwrap();
        let client = db::get_client(&state, user_id, job.client_id.unwrap()).await.unwrap();
        assert_eq!(client.name, "Unnamed client");
        assert_eq!(client.phone.as_deref(), Some("0400 111 222"));
        assert_eq!(client.email, None);
    }

    #[actix_web::test]
    async fn edit_job_page_and_form() {
        let state = testing::state().await;
        let app = test_app!(state.clone());
        let cookie = sign_up!(app, "sam@example.com");
        let (user_id, job_id) = job_for_ann(&state).await;

        for uri in ["/jobs/new".to_owned(), format!("/jobs/{}/edit", job_id)] {
            let req = TestRequest::get().uri(&uri).cookie(cookie.clone()).to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
            assert!(body_text(resp).await.contains("Ann"));
        }

        let req = TestRequest::post()
            .uri(&format!("/jobs/{}/edit", job_id))
            .cookie(cookie.clone())
            .set_form([("title", ""), ("status", "active")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("Job title is required."));

        let req = TestRequest::post()
            .uri(&format!("/jobs/{}/edit", job_id))
            .cookie(cookie)
            .set_form([
                ("title", "Fence and gate"),
                ("client_id", ""),
                ("due_date", "2025-04-01"),
                ("status", "completed"),
            ])
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let job = db::get_job(&state, user_id, job_id).await.unwrap();
        assert_eq!(job.title.as_deref(), Some("Fence and gate"));
        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.due_date, chrono::NaiveDate::from_ymd_opt(2025, 4, 1));
    }

    #[actix_web::test]
    async fn notes_and_attachments_over_http() {
        let state = testing::state().await;
        let app = test_app!(state.clone());
        let cookie = sign_up!(app, "sam@example.com");
        let (user_id, job_id) = job_for_ann(&state).await;
        let note = db::add_job_note(&state, user_id, job_id, "Posts ordered", NoteKind::Note)
            .await
            .unwrap()
            .unwrap();

        let req = TestRequest::post()
            .uri(&format!("/jobs/{}/notes/{}", job_id, note.id))
            .cookie(cookie.clone())
            .set_form([("content", "Posts delivered")])
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let req = TestRequest::post()
            .uri(&format!("/jobs/{}/notes/{}", job_id, note.id))
            .cookie(cookie.clone())
            .set_form([("content", "   ")])
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let notes = db::get_job_notes(&state, user_id, job_id).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "Posts delivered");

        let req = TestRequest::post()
            .uri(&format!("/jobs/{}/attachments", job_id))
            .cookie(cookie.clone())
            .set_form([
                ("kind", ""),
                ("file_name", "gate.jpg"),
                ("file_url", "https://files.example.com/gate.jpg"),
                ("mime_type", "image/jpeg"),
                ("size_bytes", ""),
            ])
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

        let req = TestRequest::post()
            .uri(&format!("/jobs/{}/attachments", job_id))
            .cookie(cookie.clone())
            .set_form([("file_name", "plan.pdf")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("File name and URL are required."));

        let attachments = db::get_job_attachments(&state, user_id, job_id).await.unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].kind(), AttachmentKind::Photo);
        assert_eq!(attachments[0].size_bytes, None);

        let req = TestRequest::get()
            .uri(&format!("/jobs/{}", job_id))
            .cookie(cookie)
            .to_request();
        let body = body_text(actix_test::call_service(&app, req).await).await;
        assert!(body.contains("gate.jpg"));
        assert!(body.contains("Posts delivered"));
    }

    #[actix_web::test]
    async fn blank_job_status_is_rejected() {
        let state = testing::state().await;
        let app = test_app!(state.clone());
        let cookie = sign_up!(app, "sam@example.com");
        let (user_id, job_id) = job_for_ann(&state).await;
        db::update_job_status(&state, user_id, job_id, JobStatus::Active)
            .await
            .unwrap();

        let req = TestRequest::post()
            .uri(&format!("/jobs/{}/status", job_id))
            .cookie(cookie)
            .set_form([("status", "")])
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let job = db::get_job(&state, user_id, job_id).await.unwrap();
        assert_eq!(job.status(), JobStatus::Active);
    }

    #[actix_web::test]
    async fn job_title_is_required() {
        let app = test_app!(testing::state().await);
        let cookie = sign_up!(app, "sam@example.com");

        let req = TestRequest::post()
            .uri("/jobs/new")
            .cookie(cookie)
            .set_form([("title", " ")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("Job title is required."));
    }
}
