use actix_session::Session;
use actix_web::{get, web, HttpRequest, HttpResponse};

use super::{base_context, html, record_path, render, report_failure, see_other, tenant};
use crate::{
    api::record, auth::AuthUser, errors::AppError, receipt::ReceiptView, resources::Resource,
    AppState,
};

#[get("/transactions/{id}/receipt")]
pub async fn receipt_handler(
    req: HttpRequest,
    path: web::Path<String>,
    AuthUser(user): AuthUser,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let record_url = record_path(Resource::Transactions.api_path(), &id)?;
    let tenant = tenant(&req, &state, &session, Some(&user));

    let transaction = match state.backend.get(&tenant.ctx, &record_url, &[]).await {
        Ok(value) => record(value),
        Err(e) => {
            report_failure(&session, &format!("load receipt for transaction {}", id), &e);
            return Ok(see_other("/transactions"));
        }
    };

    let mut context = base_context(&tenant, &session, Some(&user));
    context.insert("title", "Receipt");
    context.insert("receipt", &ReceiptView::new(&transaction, tenant.client));

    Ok(html(render("receipt.html", &context)?))
}
