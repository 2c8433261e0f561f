use actix_session::{Session, SessionExt};
use actix_web::{
    error::{InternalError, UrlencodedError},
    get,
    http::header,
    post,
    web::{self, Data},
    HttpRequest, HttpResponse, Responder,
};
use serde::Deserialize;
use tera::Context;

use crate::{
    credentials::CredentialStore,
    errors::AppError,
    flash,
    inventory::InventoryService,
    session::{self, CurrentSeller},
    structs::Product,
    utils, AppState, TEMPLATES,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(form_error_handler))
        .service(index_handler)
        .service(register_handler)
        .service(register_form_handler)
        .service(login_handler)
        .service(login_form_handler)
        .service(logout_handler)
        .service(add_product_handler)
        .service(add_product_form_handler)
        .service(edit_product_handler)
        .service(edit_product_form_handler)
        .service(delete_product_handler);
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location))
        .finish()
}

/// Turns a domain outcome into a notice plus a redirect; infrastructure
/// failures propagate.
fn recover(session: &Session, err: AppError, location: &str) -> Result<HttpResponse, AppError> {
    if !err.is_recoverable() {
        return Err(err);
    }
    flash::push(session, err.notice());
    Ok(redirect(location))
}

/// Bodies that cannot be read as a form at all go back to the listing with a
/// notice. Missing fields are handled by the form types' defaults.
fn form_error_handler(err: UrlencodedError, req: &HttpRequest) -> actix_web::Error {
    log::warn!("Unreadable form posted to {}: {}", req.path(), err);
    flash::push(
        &req.get_session(),
        "The submitted form could not be read, please try again.",
    );
    InternalError::from_response(err, redirect("/")).into()
}

fn page_context(title: &str, session: &Session) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("messages", &flash::take(session));
    context.insert("version", env!("CARGO_PKG_VERSION"));
    context
}

fn render(template: &str, context: &Context) -> Result<HttpResponse, AppError> {
    let rendered = TEMPLATES.render(template, context).map_err(|e| {
        log::error!("Failed to render template: {}", e);
        AppError::TemplateError(e)
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(rendered))
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct Credentials {
    username: String,
    password: String,
}

#[get("/register")]
pub async fn register_handler(session: Session) -> Result<impl Responder, AppError> {
    render("register.html", &page_context("Register", &session))
}

#[post("/register")]
pub async fn register_form_handler(
    web::Form(form): web::Form<Credentials>,
    state: Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    match CredentialStore::new(&state.repo)
        .register(&form.username, &form.password)
        .await
    {
        Ok(_) => {
            flash::push(&session, "Registration successful, please log in.");
            Ok(redirect("/login"))
        }
        Err(err) => recover(&session, err, "/register"),
    }
}

#[get("/login")]
pub async fn login_handler(session: Session) -> Result<impl Responder, AppError> {
    render("login.html", &page_context("Log in", &session))
}

#[post("/login")]
pub async fn login_form_handler(
    web::Form(form): web::Form<Credentials>,
    state: Data<AppState>,
    session: Session,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let seller = match CredentialStore::new(&state.repo)
        .verify(&form.username, &form.password)
        .await
    {
        Ok(seller) => seller,
        Err(err) => return recover(&session, err, "/login"),
    };

    session::establish(&request, &seller)?;
    flash::push(&session, format!("Welcome, {}!", seller.username));
    Ok(redirect("/"))
}

#[get("/logout")]
pub async fn logout_handler(seller: CurrentSeller, session: Session) -> impl Responder {
    seller.logout();
    flash::push(&session, "You have been logged out.");
    redirect("/login")
}

#[get("/")]
pub async fn index_handler(
    seller: CurrentSeller,
    state: Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let Some(account) = state.repo.find_seller_by_id(seller.seller_id).await? else {
        log::warn!("Session names unknown seller {}", seller.seller_id);
        seller.logout();
        return recover(&session, AppError::Unauthenticated, "/login");
    };

    let products = InventoryService::new(&state.repo)
        .list_owned(account.id)
        .await?;

    let mut context = page_context("My products", &session);
    context.insert("username", &account.username);
    context.insert("products", &products);
    render("index.html", &context)
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ProductForm {
    name: String,
    price: String,
    quantity: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct StockForm {
    price: String,
    quantity: String,
}

async fn add_from_form(
    state: &AppState,
    seller_id: i64,
    form: &ProductForm,
) -> Result<Product, AppError> {
    let price = utils::parse_non_negative("Price", &form.price)?;
    let quantity = utils::parse_non_negative("Quantity", &form.quantity)?;
    InventoryService::new(&state.repo)
        .add_or_merge(seller_id, &form.name, price, quantity)
        .await
}

async fn update_from_form(
    inventory: &InventoryService<'_>,
    owned: &Product,
    form: &StockForm,
) -> Result<Product, AppError> {
    let price = utils::parse_non_negative("Price", &form.price)?;
    let quantity = utils::parse_non_negative("Quantity", &form.quantity)?;
    inventory.apply_price_quantity(owned, price, quantity).await
}

#[get("/add")]
pub async fn add_product_handler(
    _seller: CurrentSeller,
    session: Session,
) -> Result<impl Responder, AppError> {
    render("add_product.html", &page_context("Add product", &session))
}

#[post("/add")]
pub async fn add_product_form_handler(
    seller: CurrentSeller,
    web::Form(form): web::Form<ProductForm>,
    state: Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let result = add_from_form(&state, seller.seller_id, &form).await;

    match result {
        Ok(_) => Ok(redirect("/")),
        Err(err) => recover(&session, err, "/add"),
    }
}

#[get("/edit/{id}")]
pub async fn edit_product_handler(
    seller: CurrentSeller,
    path: web::Path<i64>,
    state: Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let product = match InventoryService::new(&state.repo)
        .get_owned(seller.seller_id, path.into_inner())
        .await
    {
        Ok(product) => product,
        Err(err) => return recover(&session, err, "/"),
    };

    let mut context = page_context("Edit product", &session);
    context.insert("product", &product);
    render("edit_product.html", &context)
}

#[post("/edit/{id}")]
pub async fn edit_product_form_handler(
    seller: CurrentSeller,
    path: web::Path<i64>,
    web::Form(form): web::Form<StockForm>,
    state: Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    let product_id = path.into_inner();
    let inventory = InventoryService::new(&state.repo);

    // ownership is settled before the form is looked at
    let owned = match inventory.get_owned(seller.seller_id, product_id).await {
        Ok(product) => product,
        Err(err) => return recover(&session, err, "/"),
    };

    let result = update_from_form(&inventory, &owned, &form).await;

    match result {
        Ok(_) => Ok(redirect("/")),
        Err(err @ AppError::Validation(_)) => {
            recover(&session, err, &format!("/edit/{}", product_id))
        }
        Err(err) => recover(&session, err, "/"),
    }
}

#[post("/delete/{id}")]
pub async fn delete_product_handler(
    seller: CurrentSeller,
    path: web::Path<i64>,
    state: Data<AppState>,
    session: Session,
) -> Result<impl Responder, AppError> {
    match InventoryService::new(&state.repo)
        .delete(seller.seller_id, path.into_inner())
        .await
    {
        Ok(()) => Ok(redirect("/")),
        Err(err) => recover(&session, err, "/"),
    }
}
