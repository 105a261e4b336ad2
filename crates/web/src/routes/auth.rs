//! Authentication route handlers.
//!
//! Login, registration, email verification, and password reset, all backed by
//! the remote Garge API. Local validation runs before any mutating call and
//! failures are rendered inline on the form the user submitted.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use garge_core::Email;

use crate::error::clear_sentry_user;
use crate::filters;
use crate::garge::types::RegisterRequest;
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

// =============================================================================
// Validation
// =============================================================================

/// Per-field validation messages, in submission order.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    /// Record a message against a field.
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    /// Whether validation passed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for one field.
    #[must_use]
    pub fn for_field(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
            .collect()
    }
}

/// Names must carry at least two non-whitespace-trimmed characters.
const MIN_NAME_CHARS: usize = 2;

fn validate_name(value: &str, field: &'static str, label: &str, errors: &mut FieldErrors) {
    if value.trim().chars().count() < MIN_NAME_CHARS {
        errors.push(field, format!("{label} must be at least 2 characters."));
    }
}

/// Password policy shared by registration and password reset.
fn validate_password(password: &str, field: &'static str, errors: &mut FieldErrors) {
    if password.chars().count() < 8 {
        errors.push(field, "Password must be at least 8 characters.");
    }
    if !password.chars().any(char::is_alphabetic) {
        errors.push(field, "Password must contain a letter.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(field, "Password must contain a digit.");
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        errors.push(field, "Password must contain a special character.");
    }
}

fn validate_registration(form: &RegisterForm) -> FieldErrors {
    let mut errors = FieldErrors::default();
    validate_name(&form.first_name, "first_name", "First name", &mut errors);
    validate_name(&form.last_name, "last_name", "Last name", &mut errors);
    validate_name(&form.user_name, "user_name", "Username", &mut errors);
    if Email::parse(form.email.trim()).is_err() {
        errors.push("email", "Enter a valid email address.");
    }
    validate_password(&form.password, "password", &mut errors);
    errors
}

/// Only same-site relative paths are acceptable post-login targets.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
}

/// Email verification form data.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailForm {
    pub email: String,
    pub code: String,
}

/// Resend-verification form data.
#[derive(Debug, Deserialize)]
pub struct ResendVerificationForm {
    pub email: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Path to return to after a successful login.
    pub next: Option<String>,
}

/// Query parameter carrying a prefilled email address.
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub email: String,
    pub next: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
    pub errors: FieldErrors,
    pub form: RegisterForm,
}

/// Registration success page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register_success.html")]
pub struct RegisterSuccessTemplate {
    pub email: String,
}

/// Email verification page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/verify_email.html")]
pub struct VerifyEmailTemplate {
    pub email: String,
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub email: String,
    pub notice: Option<String>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub email: String,
    pub code: String,
    pub error: Option<String>,
    pub errors: FieldErrors,
}

/// Terminal page for completed verify/reset flows, linking back to login.
#[derive(Template, WebTemplate)]
#[template(path = "auth/done.html")]
pub struct AuthDoneTemplate {
    pub title: &'static str,
    pub message: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Logged-in users go straight to their profile.
pub async fn login_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<LoginQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/profile").into_response();
    }
    LoginTemplate {
        error: None,
        email: String::new(),
        next: safe_next(query.next.as_deref()).map(ToString::to_string),
    }
    .into_response()
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).map(ToString::to_string);

    let render_error = |error: String, email: String, next: Option<String>| {
        LoginTemplate {
            error: Some(error),
            email,
            next,
        }
        .into_response()
    };

    let auth = match state.garge().login(form.email.trim(), &form.password).await {
        Ok(auth) => auth,
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            return render_error(e.user_message(), form.email, next);
        }
    };

    let user = match CurrentUser::from_token(auth.token) {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Login token is not decodable: {e}");
            return render_error(
                "Login failed, please try again.".to_string(),
                form.email,
                next,
            );
        }
    };

    // Fresh session id on privilege change
    if let Err(e) = session.cycle_id().await {
        tracing::error!("Failed to cycle session id: {e}");
    }
    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!("Failed to set session: {e}");
        return render_error(
            "Could not store your session, please try again.".to_string(),
            form.email,
            next,
        );
    }

    tracing::info!(sub = %user.sub, "User logged in");
    Redirect::to(next.as_deref().unwrap_or("/profile")).into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page() -> impl IntoResponse {
    RegisterTemplate {
        error: None,
        errors: FieldErrors::default(),
        form: RegisterForm::default(),
    }
}

/// Handle registration form submission.
///
/// Validates locally first; the API sends the verification email on success.
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let errors = validate_registration(&form);
    if !errors.is_empty() {
        return RegisterTemplate {
            error: None,
            errors,
            form,
        }
        .into_response();
    }

    let request = RegisterRequest {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        user_name: form.user_name.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password.clone(),
    };

    match state.garge().register(&request).await {
        Ok(_) => RegisterSuccessTemplate {
            email: request.email,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            RegisterTemplate {
                error: Some(e.user_message()),
                errors: FieldErrors::default(),
                form,
            }
            .into_response()
        }
    }
}

// =============================================================================
// Email Verification Routes
// =============================================================================

/// Display the email verification page.
pub async fn verify_email_page(Query(query): Query<EmailQuery>) -> impl IntoResponse {
    VerifyEmailTemplate {
        email: query.email.unwrap_or_default(),
        error: None,
        notice: None,
    }
}

/// Handle email verification form submission.
pub async fn verify_email(
    State(state): State<AppState>,
    Form(form): Form<VerifyEmailForm>,
) -> Response {
    let email = form.email.trim();
    let code = form.code.trim();
    if email.is_empty() || code.is_empty() {
        return VerifyEmailTemplate {
            email: email.to_string(),
            error: Some("Enter your email address and the code from the mail.".to_string()),
            notice: None,
        }
        .into_response();
    }

    match state.garge().verify_email(email, code).await {
        Ok(message) => AuthDoneTemplate {
            title: "Email verified",
            message: message
                .message
                .unwrap_or_else(|| "Your email address is confirmed.".to_string()),
        }
        .into_response(),
        Err(e) => {
            tracing::warn!("Email verification failed: {e}");
            VerifyEmailTemplate {
                email: email.to_string(),
                error: Some(e.user_message()),
                notice: None,
            }
            .into_response()
        }
    }
}

/// Send a fresh verification mail.
pub async fn resend_verification(
    State(state): State<AppState>,
    Form(form): Form<ResendVerificationForm>,
) -> Response {
    let email = form.email.trim().to_string();
    match state.garge().resend_email_verification(&email).await {
        Ok(message) => VerifyEmailTemplate {
            email,
            error: None,
            notice: Some(
                message
                    .message
                    .unwrap_or_else(|| "A new verification mail is on its way.".to_string()),
            ),
        }
        .into_response(),
        Err(e) => {
            tracing::warn!("Resend verification failed: {e}");
            VerifyEmailTemplate {
                email,
                error: Some(e.user_message()),
                notice: None,
            }
            .into_response()
        }
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page() -> impl IntoResponse {
    ForgotPasswordTemplate {
        email: String::new(),
        notice: None,
    }
}

/// Handle forgot password form submission.
///
/// Always reports success so the form cannot be used to probe which
/// addresses have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> impl IntoResponse {
    let email = form.email.trim().to_string();
    if let Err(e) = state.garge().request_password_reset(&email).await {
        tracing::warn!("Password reset request failed: {e}");
    }

    ForgotPasswordTemplate {
        email,
        notice: Some("If that address has an account, a reset code is on its way.".to_string()),
    }
}

/// Display the reset password page.
pub async fn reset_password_page(Query(query): Query<EmailQuery>) -> impl IntoResponse {
    ResetPasswordTemplate {
        email: query.email.unwrap_or_default(),
        code: String::new(),
        error: None,
        errors: FieldErrors::default(),
    }
}

/// Handle reset password form submission.
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let email = form.email.trim().to_string();
    let code = form.code.trim().to_string();

    let mut errors = FieldErrors::default();
    if email.is_empty() {
        errors.push("email", "Enter your email address.");
    }
    if code.is_empty() {
        errors.push("code", "Enter the code from the mail.");
    }
    validate_password(&form.new_password, "new_password", &mut errors);

    if !errors.is_empty() {
        return ResetPasswordTemplate {
            email,
            code,
            error: None,
            errors,
        }
        .into_response();
    }

    match state
        .garge()
        .reset_password(&email, &code, &form.new_password)
        .await
    {
        Ok(message) => AuthDoneTemplate {
            title: "Password reset",
            message: message
                .message
                .unwrap_or_else(|| "Your password has been changed.".to_string()),
        }
        .into_response(),
        Err(e) => {
            tracing::warn!("Password reset failed: {e}");
            ResetPasswordTemplate {
                email,
                code,
                error: Some(e.user_message()),
                errors: FieldErrors::default(),
            }
            .into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout: drop the identity and destroy the whole session.
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session user: {e}");
    }
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegisterForm {
        RegisterForm {
            first_name: "Kari".to_string(),
            last_name: "Nordmann".to_string(),
            user_name: "kari".to_string(),
            email: "kari@example.com".to_string(),
            password: "hunter2!x".to_string(),
        }
    }

    #[test]
    fn test_validate_registration_accepts_valid_form() {
        assert!(validate_registration(&valid_form()).is_empty());
    }

    #[test]
    fn test_validate_registration_rejects_short_names() {
        let mut form = valid_form();
        form.first_name = " K ".to_string();
        let errors = validate_registration(&form);
        assert_eq!(errors.for_field("first_name").len(), 1);
        assert!(errors.for_field("last_name").is_empty());
    }

    #[test]
    fn test_validate_registration_rejects_bad_email() {
        let mut form = valid_form();
        form.email = "not-an-email".to_string();
        let errors = validate_registration(&form);
        assert_eq!(errors.for_field("email"), vec!["Enter a valid email address."]);
    }

    #[test]
    fn test_validate_password_policy() {
        let mut errors = FieldErrors::default();
        validate_password("aB3!aB3!", "password", &mut errors);
        assert!(errors.is_empty());

        let mut errors = FieldErrors::default();
        validate_password("short1!", "password", &mut errors);
        assert_eq!(errors.for_field("password").len(), 1);

        let mut errors = FieldErrors::default();
        validate_password("lettersonly!", "password", &mut errors);
        assert_eq!(errors.for_field("password"), vec!["Password must contain a digit."]);

        let mut errors = FieldErrors::default();
        validate_password("12345678!", "password", &mut errors);
        assert_eq!(
            errors.for_field("password"),
            vec!["Password must contain a letter."]
        );

        let mut errors = FieldErrors::default();
        validate_password("abcd1234", "password", &mut errors);
        assert_eq!(
            errors.for_field("password"),
            vec!["Password must contain a special character."]
        );
    }

    #[test]
    fn test_safe_next_only_allows_local_paths() {
        assert_eq!(safe_next(Some("/sensors")), Some("/sensors"));
        assert_eq!(safe_next(Some("/sockets/3?range=7d")), Some("/sockets/3?range=7d"));
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(None), None);
    }
}
