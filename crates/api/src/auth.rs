//! API密钥认证
//!
//! 请求携带 X-API-Key 头，密钥在配置中映射到调用方名称和权限集。
//! 认证关闭时注入一个拥有全部权限的默认调用方，便于嵌入式部署和测试。

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use tracing::warn;

use shift_domain::{CallerCredential, Capability};

pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    /// 密钥 -> 调用方信息
    pub api_keys: HashMap<String, ApiKeyInfo>,
}

#[derive(Debug, Clone)]
pub struct ApiKeyInfo {
    pub name: String,
    pub permissions: Vec<Permission>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Permission {
    IngestSubmit,
    SystemRead,
    Admin,
}

#[derive(Debug)]
pub enum AuthError {
    MissingApiKey,
    InvalidApiKey,
    InsufficientPermissions,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingApiKey => write!(f, "Missing API key"),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
            AuthError::InsufficientPermissions => write!(f, "Insufficient permissions"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for StatusCode {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingApiKey | AuthError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
        }
    }
}

/// 已通过认证的调用方
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub permissions: Vec<Permission>,
}

impl AuthenticatedUser {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission) || self.permissions.contains(&Permission::Admin)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), AuthError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }

    /// 转换为动作层使用的调用方凭证
    pub fn to_credential(&self) -> CallerCredential {
        let mut capabilities = Vec::new();
        if self.has_permission(Permission::IngestSubmit) {
            capabilities.push(Capability::SubmitIngest);
        }
        CallerCredential::new(self.user_id.clone(), capabilities)
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

impl AuthConfig {
    /// 从配置文件的认证段构造，未知权限字符串被忽略
    pub fn from_settings(settings: &shift_core::AuthSettings) -> Self {
        let api_keys = settings
            .api_keys
            .iter()
            .map(|(key, entry)| {
                let permissions = entry
                    .permissions
                    .iter()
                    .filter_map(|p| parse_permission(p))
                    .collect();
                (
                    key.clone(),
                    ApiKeyInfo {
                        name: entry.name.clone(),
                        permissions,
                        is_active: entry.is_active,
                    },
                )
            })
            .collect();

        Self {
            enabled: settings.enabled,
            api_keys,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            api_keys: HashMap::new(),
        }
    }

    pub fn validate_api_key(&self, api_key: &str) -> Result<&ApiKeyInfo, AuthError> {
        self.api_keys
            .get(api_key)
            .filter(|info| info.is_active)
            .ok_or(AuthError::InvalidApiKey)
    }
}

pub fn parse_permission(permission_str: &str) -> Option<Permission> {
    match permission_str {
        "ingest_submit" => Some(Permission::IngestSubmit),
        "system_read" => Some(Permission::SystemRead),
        "admin" => Some(Permission::Admin),
        _ => None,
    }
}

/// 认证中间件
///
/// 认证开启时校验 X-API-Key 并注入调用方身份，校验失败直接拒绝;
/// 认证关闭时注入拥有全部权限的默认调用方。
pub async fn auth_middleware(
    State(state): State<crate::routes::AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !state.auth_config.enabled {
        req.extensions_mut().insert(AuthenticatedUser {
            user_id: "system".to_string(),
            permissions: vec![Permission::Admin],
        });
        return Ok(next.run(req).await);
    }

    match extract_auth_info(&req, &state.auth_config) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(err) => {
            warn!("认证失败: {}", err);
            Err(err.into())
        }
    }
}

fn extract_auth_info(req: &Request, config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingApiKey)?;

    let key_info = config.validate_api_key(api_key)?;
    Ok(AuthenticatedUser {
        user_id: key_info.name.clone(),
        permissions: key_info.permissions.clone(),
    })
}
