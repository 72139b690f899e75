use std::collections::HashMap;

use actix_session::Session;
use actix_web::{get, post, web, HttpRequest, Responder};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::{base_context, html, render, report_failure, see_other, tenant};
use crate::{
    api::records,
    attendance::{
        attendance_records, checklist_records, reconcile_attendance, reconcile_checklist,
        AttendanceStatus, RosterKind,
    },
    auth::{flash_error, flash_success, AuthUser},
    errors::AppError,
    utils::date_or_today,
    AppState,
};

#[derive(Deserialize)]
pub struct DayQuery {
    kind: Option<String>,
    date: Option<String>,
}

#[get("/attendance")]
pub async fn attendance_handler(
    req: HttpRequest,
    web::Query(query): web::Query<DayQuery>,
    AuthUser(user): AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let kind = RosterKind::parse(query.kind.as_deref());
    let date = date_or_today(query.date.as_deref()).to_string();
    let tenant = tenant(&req, &state, &session, Some(&user));

    let day = [
        ("kind".to_string(), kind.as_str().to_string()),
        ("date".to_string(), date.clone()),
    ];
    let rows = match tokio::try_join!(
        state.backend.get(&tenant.ctx, kind.roster_path(), &[]),
        state.backend.get(&tenant.ctx, "attendance", &day),
    ) {
        Ok((roster, marked)) => reconcile_attendance(&records(roster), &records(marked)),
        Err(e) => {
            report_failure(&session, "load attendance", &e);
            Vec::new()
        }
    };

    let mut context = base_context(&tenant, &session, Some(&user));
    context.insert("title", "Attendance");
    context.insert("kind", kind.as_str());
    context.insert("date", &date);
    context.insert("rows", &rows);
    context.insert("statuses", &AttendanceStatus::CHOICES);

    Ok(html(render("attendance.html", &context)?))
}

/// The submitted day, rejected when it is not a `YYYY-MM-DD` date.
fn submitted_date(form: &HashMap<String, String>) -> Option<String> {
    let raw = form.get("date")?.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.to_string())
}

#[post("/attendance")]
pub async fn attendance_form_handler(
    req: HttpRequest,
    web::Form(form): web::Form<HashMap<String, String>>,
    AuthUser(user): AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let kind = RosterKind::parse(form.get("kind").map(String::as_str));
    let Some(date) = submitted_date(&form) else {
        flash_error(&session, "Pick a valid date");
        return Ok(see_other(&format!("/attendance?kind={}", kind.as_str())));
    };
    let tenant = tenant(&req, &state, &session, Some(&user));

    let body = json!({
        "kind": kind.as_str(),
        "date": date,
        "records": attendance_records(&form),
    });
    match state.backend.post(&tenant.ctx, "attendance", body).await {
        Ok(_) => {
            log::info!("User {} saved {} attendance for {}", user.id, kind.as_str(), date);
            flash_success(&session, "Attendance saved");
        }
        Err(e) => report_failure(&session, "save attendance", &e),
    }

    Ok(see_other(&format!(
        "/attendance?kind={}&date={}",
        kind.as_str(),
        date
    )))
}

#[get("/checklist")]
pub async fn checklist_handler(
    req: HttpRequest,
    web::Query(query): web::Query<DayQuery>,
    AuthUser(user): AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let date = date_or_today(query.date.as_deref()).to_string();
    let tenant = tenant(&req, &state, &session, Some(&user));

    let day = [("date".to_string(), date.clone())];
    let rows = match tokio::try_join!(
        state.backend.get(&tenant.ctx, "checklist-tasks", &[]),
        state.backend.get(&tenant.ctx, "checklist", &day),
    ) {
        Ok((tasks, stored)) => reconcile_checklist(&records(tasks), &records(stored)),
        Err(e) => {
            report_failure(&session, "load checklist", &e);
            Vec::new()
        }
    };

    let mut context = base_context(&tenant, &session, Some(&user));
    context.insert("title", "Checklist");
    context.insert("date", &date);
    context.insert("rows", &rows);

    Ok(html(render("checklist.html", &context)?))
}

#[post("/checklist")]
pub async fn checklist_form_handler(
    req: HttpRequest,
    web::Form(form): web::Form<HashMap<String, String>>,
    AuthUser(user): AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let Some(date) = submitted_date(&form) else {
        flash_error(&session, "Pick a valid date");
        return Ok(see_other("/checklist"));
    };
    let tenant = tenant(&req, &state, &session, Some(&user));

    let body = json!({"date": date, "records": checklist_records(&form)});
    match state.backend.post(&tenant.ctx, "checklist", body).await {
        Ok(_) => {
            log::info!("User {} saved checklist for {}", user.id, date);
            flash_success(&session, "Checklist saved");
        }
        Err(e) => report_failure(&session, "save checklist", &e),
    }

    Ok(see_other(&format!("/checklist?date={}", date)))
}
