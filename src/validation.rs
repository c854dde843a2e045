//! Synchronous form validation, run before any request is sent
//!
//! Every validator reports problems as a field -> message map; an empty
//! map means the form may be submitted.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

use powerflow_auth::AuthField;

use crate::devices::{Category, Device, DeviceInput};

pub const FIELD_NAME: &str = "nombre";
pub const FIELD_CATEGORY: &str = "categoria";
pub const FIELD_POWER: &str = "potencia_watts";
pub const FIELD_HOURS: &str = "horas_uso_dia";
pub const FIELD_EMAIL: &str = "correo";
pub const FIELD_PASSWORD: &str = "password";

pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MAX_PASSWORD_CHARS: usize = 50;
pub const MIN_FULL_NAME_CHARS: usize = 3;

/// Hours prefilled in a new device form
pub const DEFAULT_FORM_HOURS: &str = "6";

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Field-scoped validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// `Ok(value)` when there are no errors
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join("; "))
    }
}

pub fn validate_device_name(name: &str) -> Result<String, &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err("El nombre es obligatorio")
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn validate_category(category: &str) -> Result<Category, &'static str> {
    if category.trim().is_empty() {
        return Err("Selecciona una categoría");
    }
    category.parse().map_err(|_| "Categoría no válida")
}

/// Empty input means "unknown power"
pub fn validate_power(power: &str) -> Result<Option<f64>, &'static str> {
    let power = power.trim();
    if power.is_empty() {
        return Ok(None);
    }

    let watts: f64 = power
        .parse()
        .ok()
        .filter(|w: &f64| w.is_finite())
        .ok_or("Debe ser un número válido")?;

    if watts < 0.0 {
        Err("No puede ser negativo")
    } else {
        Ok(Some(watts))
    }
}

pub fn validate_hours(hours: &str) -> Result<f64, &'static str> {
    let hours: f64 = hours
        .trim()
        .parse()
        .ok()
        .filter(|h: &f64| h.is_finite())
        .ok_or("Ingresa horas válidas")?;

    if (0.0..=24.0).contains(&hours) {
        Ok(hours)
    } else {
        Err("Debe estar entre 0 y 24 horas")
    }
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.trim().is_empty() {
        Err("El correo es obligatorio")
    } else if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err("Formato de correo inválido")
    }
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_CHARS {
        Err("Mínimo 6 caracteres")
    } else if length > MAX_PASSWORD_CHARS {
        Err("Máximo 50 caracteres")
    } else {
        Ok(())
    }
}

pub fn validate_full_name(name: &str) -> Result<(), &'static str> {
    if name.trim().chars().count() < MIN_FULL_NAME_CHARS {
        Err("Mínimo 3 caracteres")
    } else {
        Ok(())
    }
}

/// Device form as typed by the user
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceForm {
    pub name: String,
    pub category: String,
    pub power_watts: String,
    pub daily_usage_hours: String,
}

impl Default for DeviceForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: String::new(),
            power_watts: String::new(),
            daily_usage_hours: DEFAULT_FORM_HOURS.to_string(),
        }
    }
}

/// Number as a form would show it: "1500", "7.5"
pub(crate) fn format_number(value: f64) -> String {
    format!("{}", value)
}

impl DeviceForm {
    /// Empty form for a new device
    pub fn new() -> Self {
        Self::default()
    }

    /// Form prefilled for editing `device`
    pub fn from_device(device: &Device) -> Self {
        Self {
            name: device.name.clone(),
            category: device
                .category
                .map(|c| c.as_str().to_string())
                .unwrap_or_default(),
            power_watts: device.power_watts.map(format_number).unwrap_or_default(),
            daily_usage_hours: format_number(device.daily_usage_hours),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        match self.to_input() {
            Ok(_) => FieldErrors::new(),
            Err(errors) => errors,
        }
    }

    /// Parse the form into a request body
    pub fn to_input(&self) -> Result<DeviceInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = validate_device_name(&self.name)
            .map_err(|e| errors.insert(FIELD_NAME, e))
            .ok();
        let category = validate_category(&self.category)
            .map_err(|e| errors.insert(FIELD_CATEGORY, e))
            .ok();
        let power_watts = validate_power(&self.power_watts)
            .map_err(|e| errors.insert(FIELD_POWER, e))
            .ok();
        let daily_usage_hours = validate_hours(&self.daily_usage_hours)
            .map_err(|e| errors.insert(FIELD_HOURS, e))
            .ok();

        match (name, category, power_watts, daily_usage_hours) {
            (Some(name), Some(category), Some(power_watts), Some(daily_usage_hours)) => {
                Ok(DeviceInput {
                    name,
                    category,
                    power_watts,
                    daily_usage_hours,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Login form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Err(e) = validate_email(&self.email) {
            errors.insert(FIELD_EMAIL, e);
        }
        if let Err(e) = validate_password(&self.password) {
            errors.insert(FIELD_PASSWORD, e);
        }
        errors
    }

    /// Clear the fields a backend rejection asks the user to re-enter
    pub fn clear_rejected(&mut self, field: Option<AuthField>) {
        for cleared in AuthField::cleared_by(field) {
            match cleared {
                AuthField::Email => self.email.clear(),
                AuthField::Password => self.password.clear(),
                AuthField::Name => {}
            }
        }
    }
}

/// Registration form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Err(e) = validate_full_name(&self.name) {
            errors.insert(FIELD_NAME, e);
        }
        if let Err(e) = validate_email(&self.email) {
            errors.insert(FIELD_EMAIL, e);
        }
        if let Err(e) = validate_password(&self.password) {
            errors.insert(FIELD_PASSWORD, e);
        }
        errors
    }

    /// Meter level for the password typed so far
    pub fn password_strength(&self) -> Option<PasswordStrength> {
        password_strength(&self.password)
    }

    /// Clear the fields a backend rejection asks the user to re-enter
    pub fn clear_rejected(&mut self, field: Option<AuthField>) {
        for cleared in AuthField::cleared_by(field) {
            match cleared {
                AuthField::Name => self.name.clear(),
                AuthField::Email => self.email.clear(),
                AuthField::Password => self.password.clear(),
            }
        }
    }
}

/// Password strength meter level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PasswordStrength {
    Weak,
    Medium,
    Good,
    Excellent,
}

impl PasswordStrength {
    pub fn label(&self) -> &'static str {
        match self {
            PasswordStrength::Weak => "Débil",
            PasswordStrength::Medium => "Media",
            PasswordStrength::Good => "Buena",
            PasswordStrength::Excellent => "Excelente",
        }
    }
}

/// Strength of `password`, `None` while it is empty
///
/// One point each for reaching 6, 8 and 12 characters, and for containing
/// lowercase, uppercase, digits and other characters.
pub fn password_strength(password: &str) -> Option<PasswordStrength> {
    if password.is_empty() {
        return None;
    }

    let length = password.chars().count();
    let checks = [
        length >= 6,
        length >= 8,
        length >= 12,
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    let score = checks.iter().filter(|&&passed| passed).count();

    Some(match score {
        0..=2 => PasswordStrength::Weak,
        3..=4 => PasswordStrength::Medium,
        5 => PasswordStrength::Good,
        _ => PasswordStrength::Excellent,
    })
}
