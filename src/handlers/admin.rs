use crate::accounts::{self, Activation};
use crate::catalog::{self, ContentDraft};
use crate::error::{AppError, Result};
use crate::handlers::{back_with_error, notice};
use crate::models::{AccountKind, ContentKind};
use axum::{
    extract::{Multipart, Path, State},
    response::Redirect,
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub description: String,
}

/// Fields used by the per-row account actions; each action reads its own.
#[derive(Debug, Default, Deserialize)]
pub struct AccountForm {
    pub days: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub whatsapp: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub description: String,
    pub days: String,
}

#[derive(Debug, Deserialize)]
pub struct SiteForm {
    pub site_name: String,
    pub expiration_days: String,
    pub test_duration_days: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

fn account_kind(segment: &str) -> Result<AccountKind> {
    AccountKind::from_segment(segment).ok_or_else(|| AppError::NotFound(format!("account list {}", segment)))
}

fn content_kind(segment: &str) -> Result<ContentKind> {
    ContentKind::from_segment(segment).ok_or_else(|| AppError::NotFound(format!("content list {}", segment)))
}

fn parse_days(value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("'{}' is not a number of days", value.trim())))
}

async fn generate(state: &crate::AppState, kind: AccountKind, description: &str) -> Result<Redirect> {
    let now = Utc::now();
    let back = format!("/admin/{}/new", kind.segment());
    let result = state
        .store
        .update(|doc| {
            let mut rng = rand::thread_rng();
            match kind {
                AccountKind::Client => accounts::generate_client(doc, description, now, &mut rng),
                AccountKind::Test => accounts::generate_test(doc, description, now, &mut rng),
            }
        })
        .await;

    match result {
        Ok(account) => Ok(Redirect::to(&format!("{}?created={}", back, account.username))),
        Err(e) => back_with_error(&back, e),
    }
}

pub async fn generate_client(
    State(state): State<Arc<crate::AppState>>,
    Form(form): Form<GenerateForm>,
) -> Result<Redirect> {
    generate(&state, AccountKind::Client, &form.description).await
}

pub async fn generate_test(
    State(state): State<Arc<crate::AppState>>,
    Form(form): Form<GenerateForm>,
) -> Result<Redirect> {
    generate(&state, AccountKind::Test, &form.description).await
}

/// Row actions of the client and test tables.
pub async fn account_action(
    State(state): State<Arc<crate::AppState>>,
    Path((segment, username, action)): Path<(String, String, String)>,
    Form(form): Form<AccountForm>,
) -> Result<Redirect> {
    let kind = account_kind(&segment)?;
    let back = format!("/admin/{}", kind.segment());
    let now = Utc::now();

    let result = state
        .store
        .update(|doc| match action.as_str() {
            "renew" if kind == AccountKind::Client => {
                let expires = accounts::renew_client(doc, &username, now)?;
                Ok(format!("Client {} renewed until {}", username, expires.format("%d/%m/%Y")))
            }
            "add-days" => {
                let days = parse_days(form.days.as_deref().unwrap_or_default())?;
                let expires = accounts::add_days(doc, kind, &username, days)?;
                Ok(format!("{} day(s) added; {} now expires {}", days, username, expires.format("%d/%m/%Y")))
            }
            "block" => {
                let blocked = accounts::toggle_block(doc, kind, &username)?;
                Ok(format!("{} {}", username, if blocked { "blocked" } else { "unblocked" }))
            }
            "reset-password" => {
                let password = accounts::reset_password(doc, kind, &username, &mut rand::thread_rng())?;
                Ok(format!("New password for {}: {}", username, password))
            }
            "description" => {
                accounts::edit_description(doc, kind, &username, form.description.as_deref().unwrap_or_default())?;
                Ok(format!("Description of {} updated", username))
            }
            "delete" => {
                accounts::delete_account(doc, kind, &username)?;
                Ok(format!("{} deleted", username))
            }
            other => Err(AppError::NotFound(format!("account action {}", other))),
        })
        .await;

    match result {
        Ok(message) => {
            if action == "delete" {
                state.store.clear_history(&username).await?;
            }
            tracing::info!("Account action {} on {} {}", action, kind.label(), username);
            Ok(notice(&back, &message))
        }
        Err(e) => back_with_error(&back, e),
    }
}

pub async fn activate_test(
    State(state): State<Arc<crate::AppState>>,
    Path(username): Path<String>,
    Form(form): Form<ActivationForm>,
) -> Result<Redirect> {
    let now = Utc::now();
    let result = state
        .store
        .update(|doc| {
            let activation = Activation {
                name: form.name,
                whatsapp: form.whatsapp,
                email: form.email,
                description: form.description,
                days: parse_days(&form.days)?,
            };
            accounts::activate_test(doc, &username, activation, now)
        })
        .await;

    match result {
        Ok(account) => Ok(notice(
            "/admin/clients",
            &format!(
                "Test {} activated as client until {}",
                account.username,
                account.expires_at.format("%d/%m/%Y")
            ),
        )),
        Err(e) => back_with_error("/admin/tests", e),
    }
}

/// Reads the add/edit content form. The cover is converted to a data URL
/// here; an empty file input leaves `cover` unset.
async fn read_content_form(mut multipart: Multipart, max_cover_size: usize) -> Result<ContentDraft> {
    let mut draft = ContentDraft::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "cover" {
            let has_file = field.file_name().map(|f| !f.is_empty()).unwrap_or(false);
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read cover: {}", e)))?;
            if has_file && !bytes.is_empty() {
                draft.cover = Some(catalog::cover_data_url(&content_type, &bytes, max_cover_size)?);
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read form: {}", e)))?;
        match name.as_str() {
            "name" => draft.name = value,
            "description" => draft.description = value,
            "category" => draft.category = value,
            "release_year" => draft.release_year = value,
            "link" => draft.link = value,
            "seasons" => draft.seasons = value,
            _ => {}
        }
    }

    Ok(draft)
}

pub async fn create_content(
    State(state): State<Arc<crate::AppState>>,
    Path(segment): Path<String>,
    multipart: Multipart,
) -> Result<Redirect> {
    let kind = content_kind(&segment)?;
    let back = format!("/admin/{}", kind.segment());
    let now = Utc::now();

    let draft = match read_content_form(multipart, state.config.max_cover_size_bytes()).await {
        Ok(draft) => draft,
        Err(e) => return back_with_error(&back, e),
    };
    let name = draft.name.trim().to_string();

    let result = state
        .store
        .update(|doc| catalog::add_content(doc, kind, draft, now, &mut rand::thread_rng()))
        .await;

    match result {
        Ok(_) => Ok(notice(&back, &format!("{} added", name))),
        Err(e) => back_with_error(&back, e),
    }
}

pub async fn update_content(
    State(state): State<Arc<crate::AppState>>,
    Path((segment, id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<Redirect> {
    let kind = content_kind(&segment)?;
    let back = format!("/admin/{}/{}", kind.segment(), id);

    let draft = match read_content_form(multipart, state.config.max_cover_size_bytes()).await {
        Ok(draft) => draft,
        Err(e) => return back_with_error(&back, e),
    };
    let name = draft.name.trim().to_string();

    match state
        .store
        .update(|doc| catalog::update_content(doc, kind, &id, draft))
        .await
    {
        Ok(()) => Ok(notice(&format!("/admin/{}", kind.segment()), &format!("{} updated", name))),
        Err(e) => back_with_error(&back, e),
    }
}

pub async fn delete_content(
    State(state): State<Arc<crate::AppState>>,
    Path((segment, id)): Path<(String, String)>,
) -> Result<Redirect> {
    let kind = content_kind(&segment)?;
    let back = format!("/admin/{}", kind.segment());

    match state
        .store
        .update(|doc| catalog::delete_content(doc, kind, &id))
        .await
    {
        Ok(()) => Ok(notice(&back, "Item deleted")),
        Err(e) => back_with_error(&back, e),
    }
}

pub async fn update_site(
    State(state): State<Arc<crate::AppState>>,
    Form(form): Form<SiteForm>,
) -> Result<Redirect> {
    let result = state
        .store
        .update(|doc| {
            let expiration_days = accounts::validate_days(parse_days(&form.expiration_days)?)?;
            let test_duration_days = accounts::validate_days(parse_days(&form.test_duration_days)?)?;
            let site_name = form.site_name.trim();
            if site_name.is_empty() {
                return Err(AppError::BadRequest("Site name is required".to_string()));
            }

            doc.config.expiration_days = expiration_days;
            doc.config.test_duration_days = test_duration_days;
            doc.config.site_name = site_name.to_string();
            Ok(())
        })
        .await;

    match result {
        Ok(()) => Ok(notice("/admin/settings", "Settings saved")),
        Err(e) => back_with_error("/admin/settings", e),
    }
}

pub async fn change_password(
    State(state): State<Arc<crate::AppState>>,
    Form(form): Form<PasswordForm>,
) -> Result<Redirect> {
    let result = state
        .store
        .update(|doc| {
            if !accounts::verify_admin_password(&doc.users.admin.password, &form.current_password) {
                return Err(AppError::BadRequest("Current password is incorrect".to_string()));
            }
            if form.new_password != form.confirm_password {
                return Err(AppError::BadRequest("New passwords do not match".to_string()));
            }
            accounts::change_admin_password(doc, &form.new_password)
        })
        .await;

    match result {
        Ok(()) => {
            tracing::info!("Admin password changed");
            Ok(notice("/admin/settings", "Password changed"))
        }
        Err(e) => back_with_error("/admin/settings", e),
    }
}
