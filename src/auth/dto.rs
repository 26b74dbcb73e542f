use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::{repo_types::User, services::Registration};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(alias = "username")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub image_url: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(r: RegisterRequest) -> Self {
        Registration {
            name: r.name,
            email: r.email,
            password: r.password,
            image_url: r.image_url,
        }
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        PublicUser { id: u.id, username: u.name, email: u.email }
    }
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_accepts_username_alias() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","email":"a@b.com","password":"secret123","imageUrl":"x.png"}"#,
        )
        .unwrap();
        assert_eq!(req.name.as_deref(), Some("alice"));
        assert_eq!(req.image_url.as_deref(), Some("x.png"));
    }

    #[test]
    fn auth_response_is_flat() {
        let id = Uuid::new_v4();
        let body = AuthResponse {
            message: "Login successful",
            user: PublicUser { id, username: "alice".into(), email: "a@b.com".into() },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Login successful");
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["username"], "alice");
        assert!(json.get("password").is_none());
    }
}
