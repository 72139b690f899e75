use std::collections::HashMap;

use actix_session::Session;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;

use super::{base_context, html, record_path, render, report_failure, see_other, tenant, Tenant};
use crate::{
    api::{record, records},
    auth::{flash_success, AuthUser, SessionUser},
    errors::AppError,
    resources::{record_values, Resource},
    AppState,
};

/// Resolve the page for a slug, enforcing the admin flag where needed.
fn resource_for(slug: &str, user: &AuthUser) -> Result<Resource, AppError> {
    let resource = Resource::from_slug(slug).ok_or(AppError::NotFound)?;
    if resource.admin_only() {
        user.require_admin()?;
    }
    Ok(resource)
}

#[get("/{resource}")]
pub async fn list_handler(
    req: HttpRequest,
    path: web::Path<String>,
    web::Query(params): web::Query<HashMap<String, String>>,
    user: AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let resource = resource_for(&path, &user)?;
    let AuthUser(user) = user;
    let tenant = tenant(&req, &state, &session, Some(&user));

    let query = resource.list_query(&params);
    let rows = match state
        .backend
        .get(&tenant.ctx, resource.api_path(), &query)
        .await
    {
        Ok(value) => records(value)
            .iter()
            .map(|r| resource.table_row(r, &tenant.client.currency))
            .collect(),
        Err(e) => {
            report_failure(&session, &format!("list {}", resource.slug()), &e);
            Vec::new()
        }
    };

    let mut context = base_context(&tenant, &session, Some(&user));
    context.insert("title", resource.title());
    context.insert("slug", resource.slug());
    context.insert("columns", &resource.columns());
    context.insert("rows", &rows);
    context.insert("filters", &resource.filter_inputs(&params));
    context.insert("has_receipts", &(resource == Resource::Transactions));
    context.insert("can_pay", &(resource == Resource::DuePayments));

    Ok(html(render("list.html", &context)?))
}

fn form_page(
    resource: Resource,
    tenant: &Tenant,
    session: &Session,
    user: &SessionUser,
    values: &HashMap<String, String>,
    errors: &HashMap<&'static str, String>,
    record_id: Option<&str>,
) -> Result<String, AppError> {
    let editing = record_id.is_some();
    let mut context = base_context(tenant, session, Some(user));
    let verb = if editing { "Edit" } else { "New" };
    context.insert("title", &format!("{} {}", verb, resource.title()));
    context.insert("slug", resource.slug());
    context.insert("inputs", &resource.form_inputs(values, errors, editing));
    let action = match record_id {
        Some(id) => format!("/{}/{}/edit", resource.slug(), id),
        None => format!("/{}/new", resource.slug()),
    };
    context.insert("action", &action);
    render("form.html", &context)
}

#[get("/{resource}/new")]
pub async fn new_handler(
    req: HttpRequest,
    path: web::Path<String>,
    user: AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let resource = resource_for(&path, &user)?;
    let AuthUser(user) = user;
    let tenant = tenant(&req, &state, &session, Some(&user));

    let page = form_page(
        resource,
        &tenant,
        &session,
        &user,
        &HashMap::new(),
        &HashMap::new(),
        None,
    )?;
    Ok(html(page))
}

fn rejected_form(page: String) -> HttpResponse {
    HttpResponse::BadRequest()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

#[post("/{resource}/new")]
pub async fn create_handler(
    req: HttpRequest,
    path: web::Path<String>,
    web::Form(form): web::Form<HashMap<String, String>>,
    user: AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let resource = resource_for(&path, &user)?;
    let AuthUser(user) = user;
    let tenant = tenant(&req, &state, &session, Some(&user));

    let body = match resource.validate(&form, false) {
        Ok(body) => body,
        Err(errors) => {
            log::debug!("Rejected {} form: {:?}", resource.slug(), errors);
            let page = form_page(resource, &tenant, &session, &user, &form, &errors, None)?;
            return Ok(rejected_form(page));
        }
    };

    match state.backend.post(&tenant.ctx, resource.api_path(), body).await {
        Ok(_) => {
            log::info!("User {} created a {} record", user.id, resource.slug());
            flash_success(&session, &format!("{} saved", resource.title()));
            Ok(see_other(&format!("/{}", resource.slug())))
        }
        Err(e) => {
            report_failure(&session, &format!("create {}", resource.slug()), &e);
            let page = form_page(
                resource,
                &tenant,
                &session,
                &user,
                &form,
                &HashMap::new(),
                None,
            )?;
            Ok(html(page))
        }
    }
}

#[get("/{resource}/{id}/edit")]
pub async fn edit_handler(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    user: AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (slug, id) = path.into_inner();
    let resource = resource_for(&slug, &user)?;
    let AuthUser(user) = user;
    let record_url = record_path(resource.api_path(), &id)?;
    let tenant = tenant(&req, &state, &session, Some(&user));

    match state.backend.get(&tenant.ctx, &record_url, &[]).await {
        Ok(value) => {
            let values = record_values(&record(value));
            let page = form_page(
                resource,
                &tenant,
                &session,
                &user,
                &values,
                &HashMap::new(),
                Some(&id),
            )?;
            Ok(html(page))
        }
        Err(e) => {
            report_failure(&session, &format!("load {} {}", resource.slug(), id), &e);
            Ok(see_other(&format!("/{}", resource.slug())))
        }
    }
}

#[post("/{resource}/{id}/edit")]
pub async fn update_handler(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    web::Form(form): web::Form<HashMap<String, String>>,
    user: AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (slug, id) = path.into_inner();
    let resource = resource_for(&slug, &user)?;
    let AuthUser(user) = user;
    let record_url = record_path(resource.api_path(), &id)?;
    let tenant = tenant(&req, &state, &session, Some(&user));

    let body = match resource.validate(&form, true) {
        Ok(body) => body,
        Err(errors) => {
            let page = form_page(resource, &tenant, &session, &user, &form, &errors, Some(&id))?;
            return Ok(rejected_form(page));
        }
    };

    match state.backend.put(&tenant.ctx, &record_url, body).await {
        Ok(_) => {
            log::info!("User {} updated {} {}", user.id, resource.slug(), id);
            flash_success(&session, &format!("{} updated", resource.title()));
            Ok(see_other(&format!("/{}", resource.slug())))
        }
        Err(e) => {
            report_failure(&session, &format!("update {} {}", resource.slug(), id), &e);
            let page = form_page(
                resource,
                &tenant,
                &session,
                &user,
                &form,
                &HashMap::new(),
                Some(&id),
            )?;
            Ok(html(page))
        }
    }
}

#[post("/{resource}/{id}/delete")]
pub async fn delete_handler(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    user: AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (slug, id) = path.into_inner();
    let resource = resource_for(&slug, &user)?;
    let AuthUser(user) = user;
    let record_url = record_path(resource.api_path(), &id)?;
    let tenant = tenant(&req, &state, &session, Some(&user));

    match state.backend.delete(&tenant.ctx, &record_url).await {
        Ok(()) => {
            log::info!("User {} deleted {} {}", user.id, resource.slug(), id);
            flash_success(&session, &format!("{} deleted", resource.title()));
        }
        Err(e) => report_failure(&session, &format!("delete {} {}", resource.slug(), id), &e),
    }

    Ok(see_other(&format!("/{}", resource.slug())))
}

/// Mark a due payment as paid; the backend records the payment.
#[post("/due-payments/{id}/pay")]
pub async fn pay_due_handler(
    req: HttpRequest,
    path: web::Path<String>,
    AuthUser(user): AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    let pay_url = format!(
        "{}/pay",
        record_path(Resource::DuePayments.api_path(), &id)?
    );
    let tenant = tenant(&req, &state, &session, Some(&user));

    match state.backend.put(&tenant.ctx, &pay_url, json!({})).await {
        Ok(_) => {
            log::info!("User {} marked due payment {} paid", user.id, id);
            flash_success(&session, "Payment marked as paid");
        }
        Err(e) => report_failure(&session, &format!("pay due payment {}", id), &e),
    }

    Ok(see_other("/due-payments"))
}
