use actix_session::Session;
use actix_web::{get, post, web, HttpRequest, Responder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{base_context, html, render, report_failure, see_other, tenant};
use crate::{
    api::{record, records},
    auth::{flash_error, flash_success, AuthUser, ENTITY_KEY},
    errors::AppError,
    utils::{display_value, format_money},
    AppState,
};

#[derive(Serialize, Debug, PartialEq)]
struct CategoryTotal {
    name: String,
    kind: String,
    total: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct Summary {
    total_income: String,
    total_expense: String,
    total_assets: String,
    balance: String,
    categories: Vec<CategoryTotal>,
}

impl Summary {
    /// Totals are computed by the backend; only formatting happens here.
    fn from_value(value: &Value, currency: &str) -> Summary {
        let money = |key: &str| format_money(value.get(key).unwrap_or(&Value::from(0)), currency);
        let categories = value
            .get("categories")
            .cloned()
            .map(records)
            .unwrap_or_default()
            .iter()
            .map(|c| CategoryTotal {
                name: c.get("name").map(display_value).unwrap_or_default(),
                kind: c.get("type").map(display_value).unwrap_or_default(),
                total: format_money(c.get("total").unwrap_or(&Value::from(0)), currency),
            })
            .collect();
        Summary {
            total_income: money("total_income"),
            total_expense: money("total_expense"),
            total_assets: money("total_assets"),
            balance: money("balance"),
            categories,
        }
    }
}

#[get("/")]
pub async fn index_handler(
    req: HttpRequest,
    AuthUser(user): AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let tenant = tenant(&req, &state, &session, Some(&user));

    let summary = match state.backend.get(&tenant.ctx, "dashboard/summary", &[]).await {
        Ok(value) => Some(Summary::from_value(&record(value), &tenant.client.currency)),
        Err(e) => {
            report_failure(&session, "load dashboard summary", &e);
            None
        }
    };

    let mut context = base_context(&tenant, &session, Some(&user));
    context.insert("title", "Dashboard");
    context.insert("summary", &summary);

    Ok(html(render("dashboard.html", &context)?))
}

#[get("/entities")]
pub async fn entities_handler(
    req: HttpRequest,
    AuthUser(user): AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let tenant = tenant(&req, &state, &session, Some(&user));

    let mut context = base_context(&tenant, &session, Some(&user));
    context.insert("title", "Select entity");
    context.insert("entities", &tenant.client.entities);

    Ok(html(render("entities.html", &context)?))
}

#[derive(Deserialize)]
pub struct SelectEntity {
    entity_id: String,
}

#[post("/entities/select")]
pub async fn select_entity_handler(
    web::Form(form): web::Form<SelectEntity>,
    req: HttpRequest,
    AuthUser(user): AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<impl Responder, AppError> {
    let tenant = tenant(&req, &state, &session, Some(&user));

    match tenant.client.entity(form.entity_id.trim()) {
        Some(entity) => {
            session.insert(ENTITY_KEY, &entity.id)?;
            log::info!("User {} switched to entity {}", user.id, entity.id);
            flash_success(&session, &format!("Now working in {}", entity.name));
        }
        None => {
            log::warn!("User {} picked unknown entity {}", user.id, form.entity_id);
            flash_error(&session, "Unknown entity");
        }
    }

    Ok(see_other("/"))
}
