use actix_web::{get, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::{
    dto::{EventCard, ListingQuery, NewEventForm, Page, PageQuery},
    errors::AppError,
    handlers::{load_session, redirect_with, render},
    models::{Category, CategoryFilter, Event},
    service::{
        self,
        auth::{session::FlashKind, AuthMiddleware, Permissions},
        event::{parse_page, LISTING_PAGE_SIZE},
        filter::{category_links, event_card, filter_events, paginate},
    },
    AppState,
};

pub const SUBMITTED: &str = "Event submitted! It will be listed once an admin approves it.";

fn cards(events: Vec<Event>) -> Vec<EventCard> {
    events.into_iter().map(event_card).collect()
}

fn card_page(page: Page<Event>) -> Page<EventCard> {
    Page {
        items: cards(page.items),
        page: page.page,
        total_pages: page.total_pages,
        total: page.total,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListingView {
    events: Page<EventCard>,
    q: String,
    category: Option<Category>,
    categories: Vec<crate::dto::CategoryLink>,
}

#[get("/")]
pub async fn home(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let upcoming = service::event::upcoming(Utc::now(), state.events.as_ref()).await?;
    render(
        &req,
        &state,
        json!({ "upcoming": cards(upcoming), "categories": category_links() }),
    )
}

/// Approved events narrowed by `q` and `category`, 12 per page.
#[get("/events")]
pub async fn list(
    req: HttpRequest,
    query: web::Query<ListingQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let term = query.q.as_deref().unwrap_or_default().trim().to_string();
    let filter = query.category.as_deref().unwrap_or_default().parse::<CategoryFilter>().ok();
    let page = parse_page(query.page.as_deref());

    let approved = service::event::list_approved(state.events.as_ref()).await?;
    let matched = match filter {
        Some(filter) => filter_events(&approved, &term, filter),
        None => Vec::new(),
    };
    let selected = match filter {
        Some(CategoryFilter::Only(c)) => Some(c),
        _ => None,
    };
    render(
        &req,
        &state,
        ListingView {
            events: card_page(paginate(&matched, page, LISTING_PAGE_SIZE)),
            q: term,
            category: selected,
            categories: category_links(),
        },
    )
}

#[get("/events/category/{slug}")]
pub async fn by_category(
    req: HttpRequest,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let page = parse_page(query.page.as_deref());
    let category = Category::from_slug(&slug);
    let events = match category {
        Some(c) => service::event::list_by_category(c, None, None, state.events.as_ref()).await?,
        None => Vec::new(),
    };
    render(
        &req,
        &state,
        ListingView {
            events: card_page(paginate(&events, page, LISTING_PAGE_SIZE)),
            q: String::new(),
            category,
            categories: category_links(),
        },
    )
}

#[get("/events/{id}")]
pub async fn detail(
    req: HttpRequest,
    id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let event = service::event::get_public(&id, state.events.as_ref()).await?;
    let similar = service::event::similar_events(&event, state.events.as_ref()).await?;
    render(
        &req,
        &state,
        json!({ "event": event_card(event), "similar": cards(similar) }),
    )
}

pub async fn new_event_form(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    render(&req, &state, json!({ "categories": Category::ALL }))
}

/// Invalid submissions come back with every error and the values as entered.
pub async fn submit(
    req: HttpRequest,
    form: web::Form<NewEventForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    match service::event::submit(&form, state.events.as_ref()).await {
        Ok(_) => {
            let mut session = load_session(&req, &state);
            session.set_flash(FlashKind::Success, SUBMITTED);
            redirect_with("/", &session, &state)
        }
        Err(AppError::Validation(errors)) => {
            Ok(HttpResponse::UnprocessableEntity().json(json!({ "errors": errors, "values": form })))
        }
        Err(err) => Err(err),
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home)
        .service(
            web::resource("/events/new")
                .wrap(AuthMiddleware {
                    required: Permissions::SUBMIT_EVENTS,
                })
                .route(web::get().to(new_event_form))
                .route(web::post().to(submit)),
        )
        .service(by_category)
        .service(detail)
        .service(list);
}
