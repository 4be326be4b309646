//! Shift 动作层
//!
//! 对外暴露 shift_submit / shift_hook 两个动作的服务实现,
//! API 层只做协议转换,业务规则全部集中在这里。

pub mod requests;
pub mod service;

pub use requests::{HookMetadata, HookOutcome, HookRequest, SubmitRequest};
pub use service::ShiftService;
