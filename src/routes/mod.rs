mod attendance;
mod auth;
mod dashboard;
mod receipt;
mod resources;

use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use tera::Context;

use crate::{
    api::{ApiError, RequestContext},
    auth::{flash_error, take_flash, SessionUser, ENTITY_KEY},
    errors::AppError,
    resources::Resource,
    tenant::{client_label, ClientConfig},
    AppState, TEMPLATES,
};

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(dashboard::index_handler)
        .service(auth::login_handler)
        .service(auth::login_form_handler)
        .service(auth::logout_handler)
        .service(dashboard::entities_handler)
        .service(dashboard::select_entity_handler)
        .service(attendance::attendance_handler)
        .service(attendance::attendance_form_handler)
        .service(attendance::checklist_handler)
        .service(attendance::checklist_form_handler)
        .service(receipt::receipt_handler)
        .service(resources::pay_due_handler)
        // catch-all resource pages go last
        .service(resources::list_handler)
        .service(resources::new_handler)
        .service(resources::create_handler)
        .service(resources::edit_handler)
        .service(resources::update_handler)
        .service(resources::delete_handler);
}

/// The client a request is served for, and the context backend calls carry.
pub struct Tenant<'a> {
    pub client: &'a ClientConfig,
    pub ctx: RequestContext,
}

pub fn tenant<'a>(
    req: &HttpRequest,
    state: &'a AppState,
    session: &Session,
    user: Option<&SessionUser>,
) -> Tenant<'a> {
    let host = req.connection_info().host().to_string();
    let client = state.tenants.lookup(&host);
    let selected = session.get::<String>(ENTITY_KEY).ok().flatten();
    let entity = client
        .active_entity(selected.as_deref())
        .map(|e| e.id.clone());

    Tenant {
        client,
        ctx: RequestContext {
            client: client_label(&host).to_string(),
            token: user.map(|u| u.token.clone()).filter(|t| !t.is_empty()),
            entity,
        },
    }
}

#[derive(Serialize)]
struct NavItem {
    href: String,
    title: &'static str,
}

fn nav(user: &SessionUser) -> Vec<NavItem> {
    let mut items = vec![
        NavItem {
            href: "/".to_string(),
            title: "Dashboard",
        },
        NavItem {
            href: "/attendance".to_string(),
            title: "Attendance",
        },
        NavItem {
            href: "/checklist".to_string(),
            title: "Checklist",
        },
    ];
    items.extend(
        Resource::ALL
            .iter()
            .filter(|r| user.is_admin || !r.admin_only())
            .map(|r| NavItem {
                href: format!("/{}", r.slug()),
                title: r.title(),
            }),
    );
    items
}

/// Context shared by every page: branding, the user, the pending flash
/// message and entity scope.
pub fn base_context(tenant: &Tenant, session: &Session, user: Option<&SessionUser>) -> Context {
    let mut context = Context::new();
    context.insert("client", tenant.client);
    context.insert("flash", &take_flash(session));
    context.insert("version", env!("CARGO_PKG_VERSION"));
    context.insert(
        "active_entity",
        &tenant
            .ctx
            .entity
            .as_deref()
            .and_then(|id| tenant.client.entity(id)),
    );
    if let Some(user) = user {
        context.insert("user", user);
        context.insert("nav", &nav(user));
    }
    context
}

pub fn render(template: &str, context: &Context) -> Result<String, AppError> {
    TEMPLATES.render(template, context).map_err(|e| {
        log::error!("Failed to render template {}: {}", template, e);
        AppError::TemplateError(e)
    })
}

pub fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

pub fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header(("Location", location))
        .finish()
}

/// Log a failed backend call and queue the generic notification.
pub fn report_failure(session: &Session, action: &str, err: &ApiError) {
    log::error!("Failed to {}: {}", action, err);
    flash_error(session, GENERIC_FAILURE);
}

/// Backend record path for a path-supplied id. Ids are restricted to URL-safe
/// characters so they cannot escape the collection.
pub fn record_path(collection: &str, id: &str) -> Result<String, AppError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(format!("{}/{}", collection, id))
    } else {
        Err(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_identity::{Identity, IdentityMiddleware};
    use actix_session::{storage::CookieSessionStore, SessionMiddleware};
    use actix_web::{
        cookie::{Cookie, Key},
        http::{header, StatusCode},
        test as actix_test,
        web::Data,
        App, HttpMessage,
    };
    use serde_json::json;

    use super::*;
    use crate::{api::testing::RecordingBackend, auth::USER_KEY, tenant::TenantRegistry};

    const CLIENTS: &str = r#"
        [clients.baitulaman]
        name = "Baitul Aman Jame Masjid"
        currency = "Tk"
        entities = [
            { id = "masjid", name = "Jame Masjid" },
            { id = "graveyard", name = "Graveyard" },
        ]
    "#;

    async fn seed_malformed_user(req: HttpRequest, session: Session) -> HttpResponse {
        Identity::login(&req.extensions(), "7".to_string()).unwrap();
        session.insert(USER_KEY, "{not json").unwrap();
        HttpResponse::Ok().finish()
    }

    macro_rules! test_app {
        ($backend:expr) => {
            actix_test::init_service(
                App::new()
                    .wrap(IdentityMiddleware::default())
                    .wrap(
                        SessionMiddleware::builder(CookieSessionStore::default(), Key::from(&[7u8; 64]))
                            .cookie_secure(false)
                            .build(),
                    )
                    .app_data(Data::new(AppState {
                        backend: $backend.clone(),
                        tenants: Arc::new(TenantRegistry::from_toml(CLIENTS).unwrap()),
                    }))
                    .route("/test/seed-malformed", web::get().to(seed_malformed_user))
                    .configure(configure),
            )
            .await
        };
    }

    /// Log in through the login form and return the session cookie.
    macro_rules! login {
        ($app:expr) => {{
            let req = actix_test::TestRequest::post()
                .uri("/login")
                .set_form([("email", "imam@baitulaman.org"), ("password", "bismillah")])
                .to_request();
            let resp = actix_test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&resp), "/");
            session_cookie(&resp)
        }};
    }

    fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    fn session_cookie<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Cookie<'static> {
        resp.response()
            .cookies()
            .find(|c| c.name() == "id")
            .expect("session cookie")
            .into_owned()
    }

    fn login_backend(is_admin: bool) -> RecordingBackend {
        RecordingBackend::new().respond(
            "POST",
            "auth/login",
            json!({
                "token": "tok-123",
                "user": {"id": 7, "name": "Imam", "email": "imam@baitulaman.org", "is_admin": is_admin}
            }),
        )
    }

    fn backend(is_admin: bool) -> Arc<RecordingBackend> {
        Arc::new(login_backend(is_admin))
    }

    async fn body_text<B: actix_web::body::MessageBody>(
        resp: actix_web::dev::ServiceResponse<B>,
    ) -> String {
        String::from_utf8_lossy(&actix_test::read_body(resp).await).to_string()
    }

    #[actix_web::test]
    async fn protected_pages_redirect_to_login_without_session() {
        let backend = backend(false);
        let app = test_app!(backend);
        for uri in [
            "/",
            "/categories",
            "/users",
            "/attendance",
            "/checklist",
            "/transactions/4/receipt",
            "/entities",
        ] {
            let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(location(&resp), "/login", "{}", uri);
        }
        assert!(backend.calls().is_empty());
    }

    #[actix_web::test]
    async fn login_stores_session_user_and_calls_backend_with_client_header() {
        let backend = backend(false);
        let app = test_app!(backend);
        let req = actix_test::TestRequest::post()
            .uri("/login")
            .insert_header((header::HOST, "baitulaman.example.org"))
            .set_form([("email", "imam@baitulaman.org"), ("password", "bismillah")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/");

        let calls = backend.calls_to("POST", "auth/login");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].ctx.client, "baitulaman");
        assert_eq!(calls[0].ctx.token, None);
        assert_eq!(calls[0].ctx.entity, None);
        assert_eq!(
            calls[0].body,
            Some(json!({"email": "imam@baitulaman.org", "password": "bismillah"}))
        );
    }

    #[actix_web::test]
    async fn rejected_login_goes_back_to_login() {
        let backend = Arc::new(RecordingBackend::new().fail("POST", "auth/login", 401));
        let app = test_app!(backend);
        let req = actix_test::TestRequest::post()
            .uri("/login")
            .set_form([("email", "imam@baitulaman.org"), ("password", "wrong")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/login");
    }

    #[actix_web::test]
    async fn login_form_rejects_missing_fields_without_backend_call() {
        let backend = backend(false);
        let app = test_app!(backend);
        let req = actix_test::TestRequest::post()
            .uri("/login")
            .set_form([("email", "not-an-email"), ("password", "")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/login");
        assert!(backend.calls().is_empty());
    }

    #[actix_web::test]
    async fn non_admin_is_sent_home_from_users() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get().uri("/users").cookie(cookie).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        assert!(backend.calls_to("GET", "users").is_empty());
    }

    #[actix_web::test]
    async fn admin_sees_users() {
        let backend = backend(true);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get().uri("/users").cookie(cookie).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(backend.calls_to("GET", "users").len(), 1);
    }

    #[actix_web::test]
    async fn category_without_name_is_rejected_before_backend() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::post()
            .uri("/categories/new")
            .cookie(cookie)
            .set_form([("name", ""), ("type", "income")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = actix_test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&body).contains("Name is required"));
        assert!(backend.calls_to("POST", "categories").is_empty());
    }

    #[actix_web::test]
    async fn valid_category_is_posted_with_entity_scope() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::post()
            .uri("/categories/new")
            .insert_header((header::HOST, "baitulaman.example.org"))
            .cookie(cookie)
            .set_form([("name", "Zakat"), ("type", "income")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/categories");

        let calls = backend.calls_to("POST", "categories");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].ctx.token.as_deref(), Some("tok-123"));
        assert_eq!(calls[0].ctx.entity.as_deref(), Some("masjid"));
        assert_eq!(calls[0].body.as_ref().unwrap()["name"], "Zakat");
    }

    #[actix_web::test]
    async fn filters_trigger_exactly_one_fetch_with_their_params() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get()
            .uri("/due-payments?month=2024-05&status=paid")
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let calls = backend.calls_to("GET", "due-payments");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].query,
            vec![
                ("status".to_string(), "paid".to_string()),
                ("month".to_string(), "2024-05".to_string()),
            ]
        );
    }

    #[actix_web::test]
    async fn malformed_session_user_is_treated_as_no_session() {
        let backend = backend(false);
        let app = test_app!(backend);
        let seeded =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri("/test/seed-malformed").to_request())
                .await;
        let cookie = session_cookie(&seeded);

        let req = actix_test::TestRequest::get().uri("/categories").cookie(cookie).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/login");
        assert!(backend.calls().is_empty());
    }

    #[actix_web::test]
    async fn list_failure_renders_empty_table_with_notice() {
        let backend = Arc::new(
            RecordingBackend::new()
                .respond(
                    "POST",
                    "auth/login",
                    json!({"token": "t", "user": {"id": 1, "name": "Clerk"}}),
                )
                .fail("GET", "donors", 500),
        );
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get().uri("/donors").cookie(cookie).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = actix_test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&body).contains(GENERIC_FAILURE));
    }

    #[actix_web::test]
    async fn attendance_merges_roster_and_submits_marked_rows() {
        let backend = Arc::new(
            RecordingBackend::new()
                .respond(
                    "POST",
                    "auth/login",
                    json!({"token": "t", "user": {"id": 1, "name": "Clerk"}}),
                )
                .respond(
                    "GET",
                    "staff",
                    json!([{"id": 1, "name": "Hafiz Karim"}, {"id": 2, "name": "Muazzin Ali"}]),
                )
                .respond(
                    "GET",
                    "attendance",
                    json!({"data": [{"person_id": 2, "status": "absent"}]}),
                ),
        );
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get()
            .uri("/attendance?kind=staff&date=2024-05-01")
            .cookie(cookie.clone())
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8_lossy(&actix_test::read_body(resp).await).to_string();
        assert!(body.contains("Hafiz Karim"));
        assert!(body.contains("Muazzin Ali"));

        let reads = backend.calls_to("GET", "attendance");
        assert_eq!(reads.len(), 1);
        assert_eq!(
            reads[0].query,
            vec![
                ("kind".to_string(), "staff".to_string()),
                ("date".to_string(), "2024-05-01".to_string()),
            ]
        );

        let req = actix_test::TestRequest::post()
            .uri("/attendance")
            .cookie(cookie)
            .set_form([
                ("kind", "staff"),
                ("date", "2024-05-01"),
                ("status_1", "present"),
                ("status_2", "unmarked"),
            ])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/attendance?kind=staff&date=2024-05-01");

        let writes = backend.calls_to("POST", "attendance");
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0].body,
            Some(json!({
                "kind": "staff",
                "date": "2024-05-01",
                "records": [{"person_id": "1", "status": "present"}]
            }))
        );
    }

    #[actix_web::test]
    async fn checklist_submits_binary_values_only_for_set_tasks() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::post()
            .uri("/checklist")
            .cookie(cookie)
            .set_form([
                ("date", "2024-05-01"),
                ("task_1", "yes"),
                ("task_2", "no"),
                ("task_3", ""),
            ])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let writes = backend.calls_to("POST", "checklist");
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0].body.as_ref().unwrap()["records"],
            json!([{"task_id": "1", "done": 1}, {"task_id": "2", "done": 0}])
        );
    }

    #[actix_web::test]
    async fn receipt_renders_server_receipt_number() {
        let backend = Arc::new(
            RecordingBackend::new()
                .respond(
                    "POST",
                    "auth/login",
                    json!({"token": "t", "user": {"id": 1, "name": "Clerk"}}),
                )
                .respond(
                    "GET",
                    "transactions/41",
                    json!({"id": 41, "receipt_no": "INC-0041", "type": "income", "amount": 5000}),
                ),
        );
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get()
            .uri("/transactions/41/receipt")
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8_lossy(&actix_test::read_body(resp).await).to_string();
        assert!(body.contains("INC-0041"));
        assert!(body.contains("https://wa.me/?text="));
    }

    #[actix_web::test]
    async fn selecting_unknown_entity_keeps_scope() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::post()
            .uri("/entities/select")
            .insert_header((header::HOST, "baitulaman.example.org"))
            .cookie(cookie.clone())
            .set_form([("entity_id", "graveyard")])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/");
        let cookie = session_cookie(&resp);

        let req = actix_test::TestRequest::get()
            .uri("/donors")
            .insert_header((header::HOST, "baitulaman.example.org"))
            .cookie(cookie.clone())
            .to_request();
        actix_test::call_service(&app, req).await;

        let req = actix_test::TestRequest::post()
            .uri("/entities/select")
            .insert_header((header::HOST, "baitulaman.example.org"))
            .cookie(cookie.clone())
            .set_form([("entity_id", "nowhere")])
            .to_request();
        actix_test::call_service(&app, req).await;

        let req = actix_test::TestRequest::get()
            .uri("/donors")
            .insert_header((header::HOST, "baitulaman.example.org"))
            .cookie(cookie)
            .to_request();
        actix_test::call_service(&app, req).await;

        let entities: Vec<Option<String>> = backend
            .calls_to("GET", "donors")
            .into_iter()
            .map(|c| c.ctx.entity)
            .collect();
        assert_eq!(
            entities,
            vec![Some("graveyard".to_string()), Some("graveyard".to_string())]
        );
    }

    #[actix_web::test]
    async fn unknown_resource_is_not_found() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get().uri("/mosques").cookie(cookie).to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(resp).await.contains("Page not found"));
    }

    #[actix_web::test]
    async fn list_rows_offer_receipts_and_payments() {
        let backend = Arc::new(
            login_backend(false)
                .respond(
                    "GET",
                    "transactions",
                    json!([{"id": 41, "date": "2024-05-03", "type": "income", "amount": 5000}]),
                )
                .respond(
                    "GET",
                    "due-payments",
                    json!({"data": [
                        {"id": 9, "title": "Electricity", "amount": 12500, "due_date": "2024-05-10", "status": "pending"},
                        {"id": 10, "title": "Water", "amount": 800, "due_date": "2024-05-12", "status": "paid"}
                    ]}),
                ),
        );
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get()
            .uri("/transactions")
            .cookie(cookie.clone())
            .to_request();
        let body = body_text(actix_test::call_service(&app, req).await).await;
        assert!(body.contains("/transactions/41/receipt"));
        assert!(body.contains("5,000.00"));

        let req = actix_test::TestRequest::get()
            .uri("/due-payments")
            .cookie(cookie)
            .to_request();
        let body = body_text(actix_test::call_service(&app, req).await).await;
        assert!(body.contains("Electricity"));
        assert!(body.contains("/due-payments/9/pay"));
        assert!(!body.contains("/due-payments/10/pay"));
        assert!(!body.contains("/receipt"));
    }

    #[actix_web::test]
    async fn edit_page_is_filled_from_the_record() {
        let backend = Arc::new(login_backend(false).respond(
            "GET",
            "students/5",
            json!({"data": {"id": 5, "name": "Yusuf Ali", "class_name": "Hifz"}}),
        ));
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get()
            .uri("/students/5/edit")
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("Edit Students"));
        assert!(body.contains(r#"value="Yusuf Ali""#));
        assert!(body.contains(r#"value="Hifz""#));
        assert_eq!(backend.calls_to("GET", "students/5").len(), 1);
    }

    #[actix_web::test]
    async fn failed_edit_load_returns_to_the_list() {
        let backend = Arc::new(login_backend(false).fail("GET", "students/5", 404));
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get()
            .uri("/students/5/edit")
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/students");
    }

    #[actix_web::test]
    async fn update_leaves_out_a_blank_password() {
        let backend = backend(true);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::post()
            .uri("/users/3/edit")
            .cookie(cookie)
            .set_form([
                ("name", "Bilal"),
                ("email", "bilal@baitulaman.org"),
                ("password", ""),
            ])
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/users");

        let writes = backend.calls_to("PUT", "users/3");
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0].body,
            Some(json!({"name": "Bilal", "email": "bilal@baitulaman.org", "is_admin": false}))
        );
    }

    #[actix_web::test]
    async fn delete_removes_record_and_returns_to_list() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::post()
            .uri("/donors/8/delete")
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/donors");
        assert_eq!(backend.calls_to("DELETE", "donors/8").len(), 1);
    }

    #[actix_web::test]
    async fn due_payment_is_marked_paid() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::post()
            .uri("/due-payments/4/pay")
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/due-payments");

        let writes = backend.calls_to("PUT", "due-payments/4/pay");
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].body, Some(json!({})));
    }

    #[actix_web::test]
    async fn checklist_page_merges_tasks_with_stored_values() {
        let backend = Arc::new(
            login_backend(false)
                .respond(
                    "GET",
                    "checklist-tasks",
                    json!([{"id": 1, "title": "Fajr adhan"}, {"id": 2, "title": "Lock gate"}]),
                )
                .respond(
                    "GET",
                    "checklist",
                    json!([{"task_id": 1, "done": "1"}, {"task_id": 2, "done": 0}]),
                ),
        );
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::get()
            .uri("/checklist?date=2024-05-01")
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains("Fajr adhan"));
        assert!(body.contains(r#"name="task_1" value="yes" checked"#));
        assert!(body.contains(r#"name="task_2" value="no" checked"#));
        assert!(!body.contains(r#"name="task_1" value="no" checked"#));

        let reads = backend.calls_to("GET", "checklist");
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].query, vec![("date".to_string(), "2024-05-01".to_string())]);
    }

    #[actix_web::test]
    async fn logout_returns_to_login() {
        let backend = backend(false);
        let app = test_app!(backend);
        let cookie = login!(app);

        let req = actix_test::TestRequest::post()
            .uri("/logout")
            .cookie(cookie)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/login");
    }

    #[test]
    fn record_paths_reject_traversal() {
        assert_eq!(record_path("students", "12").unwrap(), "students/12");
        assert_eq!(record_path("users", "a1-b_2").unwrap(), "users/a1-b_2");
        assert!(record_path("students", "..").is_err());
        assert!(record_path("students", "").is_err());
        assert!(record_path("students", "1?x=2").is_err());
    }
}
