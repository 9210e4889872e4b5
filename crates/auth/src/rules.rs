//! Field rules for account input (registration, profile updates, promotion).
//!
//! Each check appends to a shared [`Violations`] so a request reports every
//! broken rule at once.

use std::sync::LazyLock;

use regex::Regex;

use warden_core::Violations;

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 100;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 30;
pub const EMAIL_MAX: usize = 50;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

pub fn check_username(username: &str, out: &mut Violations) {
    if username.trim().is_empty() {
        out.push("username", "Username can't be empty");
        return;
    }
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        out.push(
            "username",
            format!("Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters long"),
        );
    }
}

pub fn check_password(password: &str, out: &mut Violations) {
    if password.is_empty() {
        out.push("password", "Password can't be empty");
        return;
    }
    let len = password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) {
        out.push(
            "password",
            format!("Password must be between {PASSWORD_MIN} and {PASSWORD_MAX} characters long"),
        );
    }
    if password.chars().any(char::is_whitespace) {
        out.push("password", "Password must not contain whitespace");
    }
}

pub fn check_email(email: &str, out: &mut Violations) {
    if email.trim().is_empty() {
        out.push("email", "Email can't be empty");
        return;
    }
    if !EMAIL_RE.is_match(email) {
        out.push("email", "Email should be valid");
    }
    if email.chars().count() > EMAIL_MAX {
        out.push(
            "email",
            format!("Email can contain a maximum of {EMAIL_MAX} characters"),
        );
    }
}

/// Promotion codes are six-digit numbers divisible by four.
pub fn check_promotion_code(code: &str) -> Result<(), Violations> {
    let valid = code
        .trim()
        .parse::<u32>()
        .map(|v| (100_000..=999_999).contains(&v) && v % 4 == 0)
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(Violations::single(
            "code",
            "Code must be a six-digit number divisible by 4",
        ))
    }
}
