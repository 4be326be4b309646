//! 动作入参的结构校验
//!
//! 在进入服务层之前逐字段检查请求体，错误按字段聚合后由
//! ApiError统一转换为带字段明细的400响应。

use shift_actions::{HookRequest, SubmitRequest};
use validator::{ValidationError, ValidationErrors};

/// 验证资源ID格式
pub fn validate_resource_id(resource_id: &str) -> Result<(), ValidationError> {
    if resource_id.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("资源ID不能为空".into()));
    }

    if resource_id.len() > 128 {
        return Err(
            ValidationError::new("length").with_message("资源ID长度不能超过128个字符".into())
        );
    }

    // 平台资源ID只包含字母、数字、下划线和连字符
    if !resource_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::new("charset").with_message("资源ID包含非法字符".into()));
    }

    Ok(())
}

/// 验证作业状态字符串
///
/// 未知状态值是合法的（原样落库），这里只拒绝空值和超长值。
pub fn validate_status(status: &str) -> Result<(), ValidationError> {
    if status.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("status不能为空".into()));
    }

    if status.len() > 64 {
        return Err(ValidationError::new("length").with_message("status长度不能超过64个字符".into()));
    }

    Ok(())
}

/// 验证 shift_submit 请求体
pub fn validate_submit_request(request: &SubmitRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if let Err(e) = validate_resource_id(&request.resource_id) {
        errors.add("resource_id", e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// 验证 shift_hook 请求体
pub fn validate_hook_request(request: &HookRequest) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if let Err(e) = validate_resource_id(&request.metadata.resource_id) {
        errors.add("metadata.resource_id", e);
    }
    if let Err(e) = validate_status(&request.status) {
        errors.add("status", e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shift_actions::HookMetadata;

    #[test]
    fn test_valid_resource_ids() {
        assert!(validate_resource_id("res-1").is_ok());
        assert!(validate_resource_id("6f54b1c0_aa11").is_ok());
        assert!(validate_resource_id("6f54b1c0-aa11-4b52-9642-0de64fe5b87a").is_ok());
    }

    #[test]
    fn test_invalid_resource_ids() {
        assert!(validate_resource_id("").is_err());
        assert!(validate_resource_id("   ").is_err());
        assert!(validate_resource_id("res 1").is_err());
        assert!(validate_resource_id("res/1").is_err());
        assert!(validate_resource_id(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_status_validation() {
        assert!(validate_status("complete").is_ok());
        // 未知状态不被这里拒绝
        assert!(validate_status("reticulating").is_ok());
        assert!(validate_status("").is_err());
        assert!(validate_status(&"s".repeat(65)).is_err());
    }

    #[test]
    fn test_submit_request_validation() {
        assert!(validate_submit_request(&SubmitRequest::new("res-1")).is_ok());

        let errors = validate_submit_request(&SubmitRequest::new("")).unwrap_err();
        assert!(errors.field_errors().contains_key("resource_id"));
    }

    #[test]
    fn test_hook_request_collects_all_field_errors() {
        let request = HookRequest {
            metadata: HookMetadata {
                resource_id: "".to_string(),
                task_created: None,
                original_url: None,
            },
            status: "".to_string(),
        };

        let errors = validate_hook_request(&request).unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("metadata.resource_id"));
        assert!(fields.contains_key("status"));
    }
}
