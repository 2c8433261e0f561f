use actix_identity::error::LoginError;
use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use sqlx::{migrate::MigrateError, Error as SqlxError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("Invalid username or password")]
    AuthenticationFailure,

    #[error("{0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Login required")]
    Unauthenticated,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Migration error: {0}")]
    MigrateError(#[from] MigrateError),

    #[error("Template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Password hashing error: {0}")]
    PasswordError(String),

    #[error("Login error: {0}")]
    LoginError(#[from] LoginError),

    #[error("Blocking task failed: {0}")]
    BlockingError(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Domain outcomes that handlers turn into a notice plus a redirect.
    /// Everything else is an infrastructure failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::DuplicateUsername
                | AppError::AuthenticationFailure
                | AppError::Validation(_)
                | AppError::NotFound
                | AppError::Forbidden
                | AppError::Unauthenticated
        )
    }

    /// Notice shown to the user for a recoverable outcome.
    pub fn notice(&self) -> String {
        match self {
            AppError::DuplicateUsername => {
                "That username already exists, please choose another one.".to_owned()
            }
            AppError::AuthenticationFailure => {
                "Login failed, please check your username and password.".to_owned()
            }
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound => "The requested product does not exist.".to_owned(),
            AppError::Forbidden => {
                "You do not have permission to modify this product.".to_owned()
            }
            AppError::Unauthenticated => "Please log in to access this page.".to_owned(),
            _ => "Something went wrong, please try again later.".to_owned(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DuplicateUsername => StatusCode::CONFLICT,
            AppError::AuthenticationFailure => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthenticated => StatusCode::SEE_OTHER,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Unauthenticated => HttpResponse::SeeOther()
                .append_header((header::LOCATION, "/login"))
                .finish(),
            err if err.is_recoverable() => {
                HttpResponse::build(self.status_code()).body(self.notice())
            }
            err => {
                log::error!("Request failed: {}", err);
                HttpResponse::build(self.status_code()).body("Internal server error")
            }
        }
    }
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}
