use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use futures::join;
use serde::Serialize;
use serde_json::json;

use crate::{
    dto::{ActionForm, EventStats, PageQuery, UpdateEventDto},
    errors::AppError,
    handlers::{redirect, render},
    models::{Category, Event, User},
    service::{
        self,
        auth::{AuthMiddleware, Permissions},
        event::{
            moderation::{self, parse_token, ModerationAction},
            parse_id, parse_page,
        },
        user::UserAction,
    },
    AppState,
};

fn action_of(form: &ActionForm) -> Result<&str, AppError> {
    form.action
        .as_deref()
        .filter(|a| !a.is_empty())
        .ok_or(AppError::BadClientData)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView {
    stats: EventStats,
    stats_unavailable: Option<String>,
}

#[get("")]
pub async fn dashboard(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stats = service::event::get_stats(state.events.as_ref()).await;
    render(
        &req,
        &state,
        DashboardView {
            stats_unavailable: stats.cause().map(str::to_string),
            stats: stats.into_value(),
        },
    )
}

/// Every event regardless of status, 10 per page.
#[get("/events")]
pub async fn event_table(
    req: HttpRequest,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let page = service::event::list_all(parse_page(query.page.as_deref()), state.events.as_ref()).await?;
    render(&req, &state, json!({ "events": page }))
}

/// Applies an `<action>-<id>` token from the table.
#[post("/events")]
pub async fn moderate_from_table(
    form: web::Form<ActionForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (action, id) = parse_token::<ModerationAction>(action_of(&form)?)?;
    moderation::apply(action, id, state.events.as_ref()).await?;
    Ok(redirect("/admin/events"))
}

#[get("/events/{id}")]
pub async fn event_detail(
    req: HttpRequest,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let event = service::event::get_by_id(&id, state.events.as_ref()).await?;
    render(&req, &state, json!({ "event": event }))
}

#[post("/events/{id}")]
pub async fn moderate_event(
    id: web::Path<String>,
    form: web::Form<ActionForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&id)?;
    let action: ModerationAction = action_of(&form)?.parse()?;
    moderation::apply(action, id, state.events.as_ref()).await?;
    match action {
        ModerationAction::Delete => Ok(redirect("/admin/events")),
        _ => Ok(redirect(&format!("/admin/events/{id}"))),
    }
}

#[put("/events/{id}")]
pub async fn edit_event(
    id: web::Path<String>,
    fields: web::Json<UpdateEventDto>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let touched = service::event::update(&id, fields.into_inner(), state.events.as_ref()).await?;
    if touched == 0 {
        return Err(AppError::NotFound);
    }
    let event = service::event::get_by_id(&id, state.events.as_ref()).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportView {
    stats: EventStats,
    user_count: u64,
    approved_per_category: Vec<CategoryCount>,
    recent_events: Vec<Event>,
    unavailable: Vec<String>,
}

#[derive(Serialize)]
struct CategoryCount {
    category: Category,
    count: u64,
}

#[get("/report")]
pub async fn report(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let (stats, per_category, user_count, recent) = join!(
        service::event::get_stats(state.events.as_ref()),
        service::event::approved_per_category(state.events.as_ref()),
        service::user::count(state.users.as_ref()),
        service::event::recent(state.events.as_ref())
    );
    let mut unavailable: Vec<String> = [stats.cause(), per_category.cause()]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    let user_count = user_count.unwrap_or_else(|e| {
        unavailable.push(e.to_string());
        0
    });
    let recent_events = recent.unwrap_or_else(|e| {
        unavailable.push(e.to_string());
        Vec::new()
    });
    render(
        &req,
        &state,
        ReportView {
            stats: stats.into_value(),
            user_count,
            approved_per_category: per_category
                .into_value()
                .into_iter()
                .map(|(category, count)| CategoryCount { category, count })
                .collect(),
            recent_events,
            unavailable,
        },
    )
}

#[get("")]
pub async fn user_table(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let accounts: Vec<User> = service::user::get_all(state.users.as_ref()).await?;
    render(&req, &state, json!({ "users": accounts }))
}

#[post("")]
pub async fn manage_from_table(
    form: web::Form<ActionForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (action, id) = parse_token::<UserAction>(action_of(&form)?)?;
    service::user::apply(action, id, state.users.as_ref()).await?;
    Ok(redirect("/admin/users"))
}

#[get("/{id}")]
pub async fn user_detail(
    req: HttpRequest,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let account = service::user::get_by_id(&id, state.users.as_ref()).await?;
    render(&req, &state, json!({ "user": account }))
}

#[post("/{id}")]
pub async fn manage_user(
    id: web::Path<String>,
    form: web::Form<ActionForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&id)?;
    let action: UserAction = action_of(&form)?.parse()?;
    service::user::apply(action, id, state.users.as_ref()).await?;
    match action {
        UserAction::Delete => Ok(redirect("/admin/users")),
        _ => Ok(redirect(&format!("/admin/users/{id}"))),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // registered first so the broader /admin scope does not swallow it
    cfg.service(
        web::scope("/admin/users")
            .wrap(AuthMiddleware {
                required: Permissions::MANAGE_USERS,
            })
            .service(user_table)
            .service(manage_from_table)
            .service(user_detail)
            .service(manage_user),
    )
    .service(
        web::scope("/admin")
            .wrap(AuthMiddleware {
                required: Permissions::MODERATE_EVENTS,
            })
            .service(dashboard)
            .service(event_table)
            .service(moderate_from_table)
            .service(report)
            .service(event_detail)
            .service(moderate_event)
            .service(edit_event),
    );
}
