use crate::auth::{Role, Session};
use crate::error::{AppError, Result};
use crate::models::{Account, AccountKind, AccountStatus, Document, ADMIN_USERNAME};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashSet;

/// Length of generated usernames and passwords.
pub const CREDENTIAL_LENGTH: usize = 5;

/// Largest day count accepted for durations and extensions (about 100 years).
pub const MAX_DAYS: i64 = 36_500;

/// Random draws before falling back to a sequential scan.
const RANDOM_USERNAME_ATTEMPTS: usize = 1_000;

/// Days a test account can be activated for.
pub const ACTIVATION_DURATIONS: [i64; 6] = [15, 30, 60, 90, 180, 365];

/// Warn about expiry this many days ahead.
const EXPIRY_WARNING_DAYS: i64 = 7;

/// Random digit string; leading zeros are allowed.
pub fn generate_numeric_id<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// A username present in neither the client nor the test list. Random
/// candidates are tried first; a crowded namespace is scanned in order.
pub fn unique_username<R: Rng>(doc: &Document, rng: &mut R) -> Result<String> {
    let taken: HashSet<&str> = doc
        .users
        .clients
        .iter()
        .chain(doc.users.tests.iter())
        .map(|a| a.username.as_str())
        .collect();

    for _ in 0..RANDOM_USERNAME_ATTEMPTS {
        let candidate = generate_numeric_id(rng, CREDENTIAL_LENGTH);
        if !taken.contains(candidate.as_str()) {
            return Ok(candidate);
        }
    }

    let space = 10usize.pow(CREDENTIAL_LENGTH as u32);
    (0..space)
        .map(|n| format!("{:0width$}", n, width = CREDENTIAL_LENGTH))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .ok_or_else(|| AppError::Conflict("Every username is already in use".to_string()))
}

/// Rejects day counts outside `1..=MAX_DAYS`.
pub fn validate_days(days: i64) -> Result<i64> {
    if (1..=MAX_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(AppError::BadRequest(format!(
            "Days must be between 1 and {}",
            MAX_DAYS
        )))
    }
}

/// `from` moved forward by `days`, or an error when the date would leave
/// the representable range.
pub fn shift_days(from: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|delta| from.checked_add_signed(delta))
        .ok_or_else(|| AppError::BadRequest(format!("{} days is out of range", days)))
}

fn new_account<R: Rng>(
    doc: &Document,
    description: &str,
    now: DateTime<Utc>,
    days: i64,
    rng: &mut R,
) -> Result<Account> {
    let days = validate_days(days)?;
    Ok(Account {
        username: unique_username(doc, rng)?,
        password: generate_numeric_id(rng, CREDENTIAL_LENGTH),
        description: description.trim().to_string(),
        created_at: now,
        expires_at: shift_days(now, days)?,
        status: AccountStatus::Active,
        favorites: Vec::new(),
        name: None,
        whatsapp: None,
        email: None,
    })
}

pub fn generate_client<R: Rng>(
    doc: &mut Document,
    description: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Account> {
    let account = new_account(doc, description, now, doc.config.expiration_days, rng)?;
    doc.users.clients.push(account.clone());
    tracing::info!("Generated client {}", account.username);
    Ok(account)
}

pub fn generate_test<R: Rng>(
    doc: &mut Document,
    description: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Account> {
    let account = new_account(doc, description, now, doc.config.test_duration_days, rng)?;
    doc.users.tests.push(account.clone());
    tracing::info!("Generated test account {}", account.username);
    Ok(account)
}

fn account_mut<'a>(doc: &'a mut Document, kind: AccountKind, username: &str) -> Result<&'a mut Account> {
    doc.find_account_mut(kind, username)
        .ok_or_else(|| AppError::NotFound(format!("{} {}", kind.label(), username)))
}

/// Extends from the later of now and the current expiry, so renewing never
/// shortens an account.
pub fn renew_client(doc: &mut Document, username: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let days = validate_days(doc.config.expiration_days)?;
    let account = account_mut(doc, AccountKind::Client, username)?;
    account.expires_at = shift_days(account.expires_at.max(now), days)?;
    if account.status == AccountStatus::Expired {
        account.status = AccountStatus::Active;
    }
    Ok(account.expires_at)
}

pub fn add_days(doc: &mut Document, kind: AccountKind, username: &str, days: i64) -> Result<DateTime<Utc>> {
    let days = validate_days(days)?;
    let account = account_mut(doc, kind, username)?;
    account.expires_at = shift_days(account.expires_at, days)?;
    Ok(account.expires_at)
}

/// Flips between blocked and active; returns true when now blocked.
pub fn toggle_block(doc: &mut Document, kind: AccountKind, username: &str) -> Result<bool> {
    let account = account_mut(doc, kind, username)?;
    account.status = match account.status {
        AccountStatus::Blocked => AccountStatus::Active,
        _ => AccountStatus::Blocked,
    };
    Ok(account.status == AccountStatus::Blocked)
}

pub fn reset_password<R: Rng>(
    doc: &mut Document,
    kind: AccountKind,
    username: &str,
    rng: &mut R,
) -> Result<String> {
    let account = account_mut(doc, kind, username)?;
    account.password = generate_numeric_id(rng, CREDENTIAL_LENGTH);
    Ok(account.password.clone())
}

pub fn edit_description(doc: &mut Document, kind: AccountKind, username: &str, description: &str) -> Result<()> {
    let account = account_mut(doc, kind, username)?;
    account.description = description.trim().to_string();
    Ok(())
}

pub fn delete_account(doc: &mut Document, kind: AccountKind, username: &str) -> Result<()> {
    let list = doc.accounts_mut(kind);
    let before = list.len();
    list.retain(|a| a.username != username);
    if list.len() == before {
        return Err(AppError::NotFound(format!("{} {}", kind.label(), username)));
    }
    Ok(())
}

/// Contact details captured when a test becomes a paying client.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    pub name: String,
    pub whatsapp: String,
    pub email: String,
    pub description: String,
    pub days: i64,
}

/// Moves a test account into the client list, keeping its credentials.
pub fn activate_test(doc: &mut Document, username: &str, activation: Activation, now: DateTime<Utc>) -> Result<Account> {
    if !ACTIVATION_DURATIONS.contains(&activation.days) {
        return Err(AppError::BadRequest(format!(
            "Unsupported duration: {} days",
            activation.days
        )));
    }

    let index = doc
        .users
        .tests
        .iter()
        .position(|t| t.username == username)
        .ok_or_else(|| AppError::NotFound(format!("test {}", username)))?;

    if doc.find_account(AccountKind::Client, username).is_some() {
        return Err(AppError::Conflict(format!("Client {} already exists", username)));
    }

    let expires_at = shift_days(now, activation.days)?;
    let mut account = doc.users.tests.remove(index);
    account.name = non_empty(&activation.name);
    account.whatsapp = non_empty(&activation.whatsapp);
    account.email = non_empty(&activation.email);
    if !activation.description.trim().is_empty() {
        account.description = activation.description.trim().to_string();
    }
    account.created_at = now;
    account.expires_at = expires_at;
    account.status = AccountStatus::Active;

    doc.users.clients.push(account.clone());
    tracing::info!("Activated test {} as client for {} days", username, activation.days);
    Ok(account)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Status as seen at `now`: blocked wins, then expiry, then the stored value.
pub fn effective_status(account: &Account, now: DateTime<Utc>) -> AccountStatus {
    match account.status {
        AccountStatus::Blocked => AccountStatus::Blocked,
        _ if account.expires_at <= now => AccountStatus::Expired,
        status => status,
    }
}

/// Whole days until expiry, rounded up; zero or negative once expired.
pub fn days_remaining(account: &Account, now: DateTime<Utc>) -> i64 {
    let seconds = (account.expires_at - now).num_seconds();
    if seconds <= 0 {
        return seconds.div_euclid(86_400);
    }
    (seconds + 86_399) / 86_400
}

/// Human-readable status and a CSS class for the admin tables.
pub fn status_label(account: &Account, now: DateTime<Utc>) -> (String, &'static str) {
    match effective_status(account, now) {
        AccountStatus::Blocked => ("Blocked".to_string(), "blocked"),
        AccountStatus::Expired => ("Expired".to_string(), "expired"),
        AccountStatus::Active => {
            let days = days_remaining(account, now);
            if days <= EXPIRY_WARNING_DAYS {
                (format!("{} day(s) left", days), "pending")
            } else {
                ("Active".to_string(), "active")
            }
        }
    }
}

/// Remaining time as "Xd Yh Zm" for the test table countdown.
pub fn remaining_time(account: &Account, now: DateTime<Utc>) -> String {
    let diff = account.expires_at - now;
    if diff <= Duration::zero() {
        return "Expired".to_string();
    }
    format!(
        "{}d {}h {}m",
        diff.num_days(),
        diff.num_hours() % 24,
        diff.num_minutes() % 60
    )
}

/// Checks login credentials against the document.
///
/// Usernames with letters are admin logins; five-digit usernames are looked
/// up among clients first, then tests.
pub fn authenticate(doc: &Document, username: &str, password: &str, now: DateTime<Utc>) -> Result<Session> {
    let username = username.trim();

    if username.chars().any(|c| c.is_ascii_alphabetic()) {
        let admin = &doc.users.admin;
        if username == admin.username && verify_admin_password(&admin.password, password) {
            return Ok(Session::new(ADMIN_USERNAME, Role::Admin));
        }
        return Err(AppError::Unauthorized(
            "Invalid administrator credentials".to_string(),
        ));
    }

    let five_digits = username.len() == CREDENTIAL_LENGTH && username.chars().all(|c| c.is_ascii_digit());
    if !five_digits {
        return Err(AppError::Unauthorized("Invalid username format".to_string()));
    }

    let matches = |a: &&Account| a.username == username && a.password == password;

    if let Some(client) = doc.users.clients.iter().find(matches) {
        return match effective_status(client, now) {
            AccountStatus::Active => Ok(Session::new(&client.username, Role::Client)),
            _ => Err(AppError::Unauthorized(
                "Your account is expired or invalid".to_string(),
            )),
        };
    }

    if let Some(test) = doc.users.tests.iter().find(matches) {
        return match effective_status(test, now) {
            AccountStatus::Active => Ok(Session::new(&test.username, Role::Client)),
            AccountStatus::Blocked => Err(AppError::Unauthorized(
                "This test account has been blocked".to_string(),
            )),
            AccountStatus::Expired => Err(AppError::Unauthorized(
                "Your test account is expired or invalid".to_string(),
            )),
        };
    }

    Err(AppError::Unauthorized(
        "Invalid or expired credentials".to_string(),
    ))
}

/// Whether a session's user record still grants access.
pub fn session_active(doc: &Document, session: &Session, now: DateTime<Utc>) -> bool {
    match session.role {
        Role::Admin => session.username == doc.users.admin.username,
        Role::Client => doc
            .find_any_account(&session.username)
            .map(|a| effective_status(a, now) == AccountStatus::Active)
            .unwrap_or(false),
    }
}

/// Accepts both argon2 PHC strings and legacy plaintext passwords.
pub fn verify_admin_password(stored: &str, given: &str) -> bool {
    if stored.starts_with("$argon2") {
        return match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(given.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Stored admin password hash is invalid: {}", e);
                false
            }
        };
    }
    !stored.is_empty() && stored == given
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn change_admin_password(doc: &mut Document, new_password: &str) -> Result<()> {
    if new_password.len() < 8 {
        return Err(AppError::BadRequest(
            "New password must be at least 8 characters".to_string(),
        ));
    }
    doc.users.admin.password = hash_password(new_password)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn empty_doc() -> Document {
        Document::new(&Config::default().catalog)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn is_five_digits(s: &str) -> bool {
        s.len() == 5 && s.chars().all(|c| c.is_ascii_digit())
    }

    #[test]
    fn test_generate_test_user_demo() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let test = generate_test(&mut doc, "demo", now, &mut rng()).unwrap();

        assert!(is_five_digits(&test.username));
        assert!(is_five_digits(&test.password));
        assert_eq!(test.status, AccountStatus::Active);
        assert_eq!(serde_json::to_value(test.status).unwrap(), "ativo");
        assert_eq!(test.description, "demo");
        assert_eq!(test.expires_at - now, Duration::days(7));
        assert_eq!(doc.users.tests.len(), 1);
        assert!(doc.users.clients.is_empty());
    }

    #[test]
    fn test_generated_usernames_unique_across_lists() {
        let mut doc = empty_doc();
        let mut rng = rng();
        let now = Utc::now();

        for i in 0..200 {
            let before: Vec<String> = doc
                .users
                .clients
                .iter()
                .chain(doc.users.tests.iter())
                .map(|a| a.username.clone())
                .collect();
            let created = if i % 2 == 0 {
                generate_client(&mut doc, "", now, &mut rng).unwrap()
            } else {
                generate_test(&mut doc, "", now, &mut rng).unwrap()
            };
            assert!(!before.contains(&created.username));
        }
    }

    #[test]
    fn test_unique_username_skips_taken_candidates() {
        let mut doc = empty_doc();
        // Seed the document with the first candidate this rng will produce
        let taken = generate_numeric_id(&mut rng(), CREDENTIAL_LENGTH);
        let now = Utc::now();
        let mut client = generate_client(&mut doc, "", now, &mut StdRng::seed_from_u64(99)).unwrap();
        client.username = taken.clone();
        doc.users.clients[0] = client;

        let fresh = unique_username(&doc, &mut rng()).unwrap();
        assert_ne!(fresh, taken);
    }

    #[test]
    fn test_client_uses_configured_expiration() {
        let mut doc = empty_doc();
        doc.config.expiration_days = 45;
        let now = Utc::now();
        let client = generate_client(&mut doc, " Loja X ", now, &mut rng()).unwrap();
        assert_eq!(client.expires_at - now, Duration::days(45));
        assert_eq!(client.description, "Loja X");
    }

    #[test]
    fn test_renew_strictly_increases_expiry() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let client = generate_client(&mut doc, "", now, &mut rng()).unwrap();

        // Still valid: extends from the current expiry
        let renewed = renew_client(&mut doc, &client.username, now).unwrap();
        assert!(renewed > client.expires_at);
        assert_eq!(renewed - client.expires_at, Duration::days(31));

        // Long expired: extends from now
        doc.users.clients[0].expires_at = now - Duration::days(100);
        let renewed = renew_client(&mut doc, &client.username, now).unwrap();
        assert_eq!(renewed, now + Duration::days(31));
        assert!(renewed > now - Duration::days(100));
    }

    #[test]
    fn test_add_days_increases_expiry() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let test = generate_test(&mut doc, "", now, &mut rng()).unwrap();

        let new_expiry = add_days(&mut doc, AccountKind::Test, &test.username, 3).unwrap();
        assert_eq!(new_expiry - test.expires_at, Duration::days(3));

        assert!(add_days(&mut doc, AccountKind::Test, &test.username, 0).is_err());
        assert!(add_days(&mut doc, AccountKind::Client, &test.username, 3).is_err());
    }

    #[test]
    fn test_add_days_is_bounded() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let client = generate_client(&mut doc, "", now, &mut rng()).unwrap();

        for days in [MAX_DAYS + 1, 100_000_000, i64::MAX] {
            let err = add_days(&mut doc, AccountKind::Client, &client.username, days).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
        let stored = doc.find_account(AccountKind::Client, &client.username).unwrap();
        assert_eq!(stored.expires_at, client.expires_at);

        let extended = add_days(&mut doc, AccountKind::Client, &client.username, MAX_DAYS).unwrap();
        assert_eq!(extended - client.expires_at, Duration::days(MAX_DAYS));
    }

    #[test]
    fn test_oversized_configured_durations_fail_cleanly() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let client = generate_client(&mut doc, "", now, &mut rng()).unwrap();

        doc.config.expiration_days = 100_000_000;
        doc.config.test_duration_days = 100_000_000;

        assert!(matches!(
            generate_client(&mut doc, "", now, &mut rng()),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            generate_test(&mut doc, "", now, &mut rng()),
            Err(AppError::BadRequest(_))
        ));
        assert!(renew_client(&mut doc, &client.username, now).is_err());
        assert_eq!(doc.users.clients.len(), 1);
        assert!(doc.users.tests.is_empty());
    }

    #[test]
    fn test_shift_days_rejects_overflow() {
        let now = Utc::now();
        assert_eq!(shift_days(now, 2).unwrap() - now, Duration::days(2));
        assert!(shift_days(now, i64::MAX).is_err());
        assert!(shift_days(DateTime::<Utc>::MAX_UTC, 1).is_err());
    }

    #[test]
    fn test_unique_username_when_namespace_is_crowded() {
        let mut doc = empty_doc();
        let template = generate_client(&mut doc, "", Utc::now(), &mut rng()).unwrap();
        doc.users.clients = (0..100_000)
            .filter(|n| *n != 4242)
            .map(|n| Account {
                username: format!("{:05}", n),
                ..template.clone()
            })
            .collect();

        assert_eq!(unique_username(&doc, &mut rng()).unwrap(), "04242");

        doc.users.tests.push(Account {
            username: "04242".to_string(),
            ..template
        });
        assert!(matches!(
            unique_username(&doc, &mut rng()),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_toggle_block_and_status() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let client = generate_client(&mut doc, "", now, &mut rng()).unwrap();

        assert!(toggle_block(&mut doc, AccountKind::Client, &client.username).unwrap());
        let stored = doc.find_account(AccountKind::Client, &client.username).unwrap();
        assert_eq!(effective_status(stored, now), AccountStatus::Blocked);

        assert!(!toggle_block(&mut doc, AccountKind::Client, &client.username).unwrap());
        let stored = doc.find_account(AccountKind::Client, &client.username).unwrap();
        assert_eq!(effective_status(stored, now), AccountStatus::Active);
    }

    #[test]
    fn test_expiry_is_derived_not_stored() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let client = generate_client(&mut doc, "", now, &mut rng()).unwrap();

        let later = now + Duration::days(40);
        let stored = doc.find_account(AccountKind::Client, &client.username).unwrap();
        assert_eq!(effective_status(stored, later), AccountStatus::Expired);
        assert_eq!(stored.status, AccountStatus::Active);
        assert_eq!(status_label(stored, later).1, "expired");
    }

    #[test]
    fn test_status_label_warns_before_expiry() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let test = generate_test(&mut doc, "", now, &mut rng()).unwrap();
        let (label, class) = status_label(&test, now);
        assert_eq!(label, "7 day(s) left");
        assert_eq!(class, "pending");

        let client = generate_client(&mut doc, "", now, &mut rng()).unwrap();
        assert_eq!(status_label(&client, now).1, "active");
    }

    #[test]
    fn test_reset_password_and_delete() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let client = generate_client(&mut doc, "", now, &mut StdRng::seed_from_u64(1)).unwrap();

        let new_password =
            reset_password(&mut doc, AccountKind::Client, &client.username, &mut StdRng::seed_from_u64(2))
                .unwrap();
        assert!(is_five_digits(&new_password));
        assert_eq!(doc.users.clients[0].password, new_password);

        delete_account(&mut doc, AccountKind::Client, &client.username).unwrap();
        assert!(doc.users.clients.is_empty());
        assert!(delete_account(&mut doc, AccountKind::Client, &client.username).is_err());
    }

    #[test]
    fn test_activate_test_moves_account() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let test = generate_test(&mut doc, "trial", now, &mut rng()).unwrap();

        let activation = Activation {
            name: "João".to_string(),
            whatsapp: "".to_string(),
            email: "joao@example.com".to_string(),
            description: "".to_string(),
            days: 30,
        };
        let client = activate_test(&mut doc, &test.username, activation, now).unwrap();

        assert!(doc.users.tests.is_empty());
        assert_eq!(doc.users.clients.len(), 1);
        assert_eq!(client.password, test.password);
        assert_eq!(client.description, "trial");
        assert_eq!(client.name.as_deref(), Some("João"));
        assert_eq!(client.whatsapp, None);
        assert_eq!(client.expires_at - now, Duration::days(30));
    }

    #[test]
    fn test_activate_test_rejects_unknown_duration() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let test = generate_test(&mut doc, "", now, &mut rng()).unwrap();
        let activation = Activation {
            days: 10,
            ..Activation::default()
        };
        assert!(activate_test(&mut doc, &test.username, activation, now).is_err());
        assert_eq!(doc.users.tests.len(), 1);
    }

    #[test]
    fn test_authenticate_admin() {
        let doc = empty_doc();
        let now = Utc::now();
        let session = authenticate(&doc, "admin", "admin", now).unwrap();
        assert_eq!(session.role, Role::Admin);
        assert!(authenticate(&doc, "admin", "wrong", now).is_err());
    }

    #[test]
    fn test_authenticate_hashed_admin_password() {
        let mut doc = empty_doc();
        change_admin_password(&mut doc, "new-secret-pw").unwrap();
        assert!(doc.users.admin.password.starts_with("$argon2"));

        let now = Utc::now();
        assert!(authenticate(&doc, "admin", "new-secret-pw", now).is_ok());
        assert!(authenticate(&doc, "admin", "admin", now).is_err());
        assert!(change_admin_password(&mut doc, "short").is_err());
    }

    #[test]
    fn test_authenticate_clients_and_tests() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let client = generate_client(&mut doc, "", now, &mut StdRng::seed_from_u64(3)).unwrap();
        let test = generate_test(&mut doc, "", now, &mut StdRng::seed_from_u64(4)).unwrap();

        let session = authenticate(&doc, &client.username, &client.password, now).unwrap();
        assert_eq!(session.role, Role::Client);
        assert_eq!(session.username, client.username);
        assert!(authenticate(&doc, &test.username, &test.password, now).is_ok());

        toggle_block(&mut doc, AccountKind::Test, &test.username).unwrap();
        let err = authenticate(&doc, &test.username, &test.password, now).unwrap_err();
        assert!(err.to_string().contains("blocked"));

        let later = now + Duration::days(60);
        assert!(authenticate(&doc, &client.username, &client.password, later).is_err());

        assert!(authenticate(&doc, "1234", "x", now).is_err());
        assert!(authenticate(&doc, &client.username, "wrong", now).is_err());
    }

    #[test]
    fn test_session_follows_user_record() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let client = generate_client(&mut doc, "", now, &mut rng()).unwrap();
        let session = Session::new(&client.username, Role::Client);

        assert!(session_active(&doc, &session, now));
        toggle_block(&mut doc, AccountKind::Client, &client.username).unwrap();
        assert!(!session_active(&doc, &session, now));
        delete_account(&mut doc, AccountKind::Client, &client.username).unwrap();
        assert!(!session_active(&doc, &session, now));

        assert!(session_active(&doc, &Session::new("admin", Role::Admin), now));
    }

    #[test]
    fn test_remaining_time_format() {
        let mut doc = empty_doc();
        let now = Utc::now();
        let mut test = generate_test(&mut doc, "", now, &mut rng()).unwrap();
        test.expires_at = now + Duration::days(2) + Duration::hours(3) + Duration::minutes(4);
        assert_eq!(remaining_time(&test, now), "2d 3h 4m");
        test.expires_at = now - Duration::minutes(1);
        assert_eq!(remaining_time(&test, now), "Expired");
    }
}
