use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

use crate::{
    auth::jwt::verify_token, config::Config, error::LeaveError, model::role::Role, models::Claims,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Option<Self> {
        Some(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role: Role::from_id(claims.role)?,
            employee_id: claims.employee_id,
        })
    }

    /// The employee record acting on the leave engine.
    pub fn employee(&self) -> Result<u64, LeaveError> {
        self.employee_id
            .ok_or_else(|| LeaveError::Forbidden("No employee profile".into()))
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        match AuthUser::from_claims(claims) {
            Some(user) => ready(Ok(user)),
            None => ready(Err(ErrorUnauthorized("Invalid role"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenType;

    fn claims(role: u8, employee_id: Option<u64>) -> Claims {
        Claims {
            user_id: 9,
            sub: "lan".into(),
            role,
            exp: 0,
            jti: "j".into(),
            token_type: TokenType::Access,
            employee_id,
        }
    }

    #[test]
    fn unknown_role_ids_are_refused() {
        assert!(AuthUser::from_claims(claims(42, None)).is_none());
    }

    #[test]
    fn users_without_employee_record_cannot_act() {
        let user = AuthUser::from_claims(claims(2, None)).unwrap();
        assert!(matches!(user.employee(), Err(LeaveError::Forbidden(_))));
    }
}
