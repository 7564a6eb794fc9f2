//! Types for authentication and user management

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Gender codes used by the user records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeneroUsuario {
    #[serde(rename = "F")]
    Feminino,
    #[serde(rename = "M")]
    Masculino,
    #[serde(rename = "NB")]
    NaoBinario,
    #[serde(rename = "PND")]
    PrefiroNaoDizer,
    #[default]
    #[serde(rename = "NI", other)]
    NaoInformado,
}

impl GeneroUsuario {
    /// Parse a backend code, unknown codes meaning "not informed"
    pub fn from_code(code: &str) -> Self {
        match code {
            "F" => Self::Feminino,
            "M" => Self::Masculino,
            "NB" => Self::NaoBinario,
            "PND" => Self::PrefiroNaoDizer,
            _ => Self::NaoInformado,
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Feminino => "Feminino",
            Self::Masculino => "Masculino",
            Self::NaoBinario => "Não-binário",
            Self::PrefiroNaoDizer => "Prefiro não dizer",
            Self::NaoInformado => "Não informado",
        }
    }
}

/// A user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usuario {
    pub id: u64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub nome: String,
    #[serde(rename = "CPF", default)]
    pub cpf: String,
    #[serde(default)]
    pub telefone: String,
    #[serde(default)]
    pub genero: GeneroUsuario,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt_nasc: Option<String>,
    #[serde(default)]
    pub date_joined: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub email_is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_staff: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foto_de_perfil: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Credentials for `/auth/login/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

/// Answer of `/auth/login/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: Usuario,
    pub refresh: String,
    pub access: String,
}

/// Body of `/auth/refresh/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Account creation payload for `/usuarios/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub nome: String,
    #[serde(rename = "CPF")]
    pub cpf: String,
    pub telefone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genero: Option<GeneroUsuario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dt_nasc: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

/// Raw registration form input, validated before it becomes a
/// [`RegisterRequest`]
#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub nome: String,
    pub email: String,
    pub cpf: String,
    pub telefone: String,
    pub dt_nasc: String,
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterForm {
    /// All problems with the form, in display order. Empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let required = [
            (&self.nome, "Nome é obrigatório"),
            (&self.email, "Email é obrigatório"),
            (&self.cpf, "CPF é obrigatório"),
            (&self.telefone, "Telefone é obrigatório"),
            (&self.dt_nasc, "Data de nascimento é obrigatória"),
            (&self.username, "Nome de usuário é obrigatório"),
            (&self.password, "Senha é obrigatória"),
            (&self.password_confirm, "Confirmação de senha é obrigatória"),
        ];
        for (value, message) in required {
            if value.is_empty() {
                errors.push(message.to_string());
            }
        }

        if !self.password.is_empty()
            && !self.password_confirm.is_empty()
            && self.password != self.password_confirm
        {
            errors.push("As senhas não coincidem".to_string());
        }

        if !self.email.is_empty() && !is_valid_email(&self.email) {
            errors.push("Email inválido".to_string());
        }

        if !self.cpf.is_empty() && !is_valid_cpf_format(&self.cpf) {
            errors.push("CPF inválido (use o formato 000.000.000-00 ou 11 dígitos)".to_string());
        }

        errors
    }

    /// Validate and build the request
    pub fn into_request(self) -> Result<RegisterRequest> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        Ok(RegisterRequest {
            email: self.email,
            username: self.username,
            nome: self.nome,
            cpf: self.cpf,
            telefone: self.telefone,
            genero: None,
            dt_nasc: Some(self.dt_nasc),
            password: self.password,
            password_confirm: self.password_confirm,
        })
    }
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

static CPF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}\.\d{3}\.\d{3}-\d{2}$|^\d{11}$").expect("Invalid regex"));

/// `local@domain.tld` with no whitespace or extra `@`
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// `000.000.000-00` or eleven bare digits; check digits are not verified
pub fn is_valid_cpf_format(cpf: &str) -> bool {
    CPF_RE.is_match(cpf)
}

/// Message for a failed registration, translating the backend's duplicate
/// account answer
pub fn registration_error_message(error: &Error) -> String {
    let text = error.to_string();
    if text.contains("já existe") {
        "Este email ou nome de usuário já está em uso".to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> RegisterForm {
        RegisterForm {
            nome: "Clarice Lispector".into(),
            email: "clarice@example.com".into(),
            cpf: "123.456.789-09".into(),
            telefone: "11987654321".into(),
            dt_nasc: "1920-12-10".into(),
            username: "clarice".into(),
            password: "hora-da-estrela".into(),
            password_confirm: "hora-da-estrela".into(),
        }
    }

    #[test]
    fn test_valid_form() {
        assert!(filled_form().validate().is_empty());
        let request = filled_form().into_request().unwrap();
        assert_eq!(request.dt_nasc.as_deref(), Some("1920-12-10"));
    }

    #[test]
    fn test_empty_form_lists_every_required_field() {
        let errors = RegisterForm::default().validate();
        assert_eq!(errors.len(), 8);
        assert_eq!(errors[0], "Nome é obrigatório");
    }

    #[test]
    fn test_password_mismatch_and_bad_formats() {
        let mut form = filled_form();
        form.password_confirm = "outra".into();
        form.email = "clarice@example".into();
        form.cpf = "123456789".into();

        let errors = form.validate();
        assert!(errors.contains(&"As senhas não coincidem".to_string()));
        assert!(errors.contains(&"Email inválido".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("CPF inválido")));
        assert!(matches!(form.into_request(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@b."));
    }

    #[test]
    fn test_cpf_shapes() {
        assert!(is_valid_cpf_format("12345678909"));
        assert!(is_valid_cpf_format("123.456.789-09"));
        assert!(!is_valid_cpf_format("123-456-789.09"));
        assert!(!is_valid_cpf_format("1234567890a"));
    }

    #[test]
    fn test_usuario_genero_fallback() {
        let user: Usuario = serde_json::from_value(serde_json::json!({
            "id": 3,
            "email": "x@y.z",
            "username": "x",
            "CPF": "12345678909",
            "genero": "XYZ"
        }))
        .unwrap();
        assert_eq!(user.genero, GeneroUsuario::NaoInformado);
        assert!(user.is_active);
    }

    #[test]
    fn test_duplicate_account_message() {
        let err = Error::general("API Error: usuário com este email já existe.");
        assert_eq!(
            registration_error_message(&err),
            "Este email ou nome de usuário já está em uso"
        );
    }
}
